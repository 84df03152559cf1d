use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskdeck-{nanos}-{file_name}"))
}

fn run_interactive(api_url: &str, cookie_path: &Path, input: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_taskdeck"))
        .env("TASKDECK_COOKIE_PATH", cookie_path)
        .env("TASKDECK_CONFIG_PATH", temp_path("absent-config.json"))
        .env("TASKDECK_API_URL", api_url)
        .env("TASKDECK_DISABLE_NOTIFICATIONS", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    child
        .wait_with_output()
        .expect("failed to read interactive output")
}

fn signed_in_cookie(file_name: &str) -> PathBuf {
    let cookie_path = temp_path(file_name);
    std::fs::write(
        &cookie_path,
        "token=abc; expires=Fri, 01 Jan 2100 00:00:00 GMT; path=/\n",
    )
    .unwrap();
    cookie_path
}

#[test]
fn interactive_help_shows_usage() {
    let cookie_path = temp_path("help-cookies.txt");
    let output = run_interactive("http://127.0.0.1:9", &cookie_path, "help\n?\nexit\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
    assert!(stdout.contains("search"));
    assert!(stdout.contains("confirm"));
}

#[test]
fn interactive_invalid_command_prints_error_and_continues() {
    let cookie_path = temp_path("invalid-cookies.txt");
    let output = run_interactive("http://127.0.0.1:9", &cookie_path, "nope\nlist\nquit\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    assert!(stderr.contains("ERROR: unauthenticated"));
}

#[tokio::test(flavor = "multi_thread")]
async fn interactive_filters_work_on_fetched_list() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tasks": [
                {"id": "t-1", "title": "Buy milk", "status": "PENDING"},
                {"id": "t-2", "title": "Walk dog", "status": "COMPLETED"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let cookie_path = signed_in_cookie("filters-cookies.txt");

    let output = run_interactive(
        &server.uri(),
        &cookie_path,
        "list\nstatus all\nsearch dog --json\nsearch\nstatus canceled\nexit\n",
    );

    std::fs::remove_file(&cookie_path).ok();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Walk dog"));
    assert!(stdout.contains(r#""id":"t-2""#));
    assert!(!stdout.contains(r#""id":"t-1""#));
    assert!(stdout.contains("No tasks found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn interactive_delete_waits_for_confirm() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tasks": [
                {"id": "t-1", "title": "Buy milk"},
                {"id": "t-2", "title": "Walk dog"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/tasks/t-2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let cookie_path = signed_in_cookie("confirm-cookies.txt");

    let output = run_interactive(
        &server.uri(),
        &cookie_path,
        "list\nmenu t-1\ndelete t-1\ncancel\ndelete t-2\nconfirm\nshow\nexit\n",
    );

    std::fs::remove_file(&cookie_path).ok();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Actions for 'Buy milk'"));
    assert!(stdout.contains("Delete cancelled"));
    assert!(stdout.contains("Deleted task: Walk dog (t-2)"));

    let after_confirm = stdout.split("Deleted task: Walk dog (t-2)").nth(1).unwrap();
    assert!(after_confirm.contains("Buy milk"));
    assert!(!after_confirm.contains("Walk dog"));
}
