use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::{self, BufRead, Write};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskdeck_cli::cli::{
    Cli, Command, EditArgs, ListArgs, ReplCommand, ReplLine, collect_config_overrides,
    normalize_parse_error, split_command_line,
};
use taskdeck_core::auth_api::{AuthService, Registration};
use taskdeck_core::client::ApiClient;
use taskdeck_core::config::{self, Config, ConfigOverrides, merge_overrides};
use taskdeck_core::cookie::{CookieStore, cookie_path};
use taskdeck_core::error::AppError;
use taskdeck_core::guard::{Route, require};
use taskdeck_core::model::{Task, TaskUpdate, display_date, parse_calendar_date};
use taskdeck_core::notify::Toaster;
use taskdeck_core::session::Session;
use taskdeck_core::task_api::TaskService;
use taskdeck_core::task_form::TaskDraft;
use taskdeck_core::task_list::TaskListState;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    OneShot,
    Interactive,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Due")]
    due: String,
}

impl TaskRow {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority.to_string(),
            status: task.status.to_string(),
            start: display_date(task.start_date.as_deref()),
            due: display_date(task.due_date.as_deref()),
        }
    }
}

struct App {
    config: Config,
    toaster: Toaster,
}

impl App {
    fn load(overrides: &ConfigOverrides) -> Self {
        let loaded = config::load_config_with_fallback();
        if let Some(err) = loaded.error.as_ref() {
            tracing::warn!(error = %err, "ignoring unreadable config file");
        }
        let config = merge_overrides(&loaded.config, overrides);
        let toaster = Toaster::from_config(&config);
        Self { config, toaster }
    }

    fn session(&self) -> Result<Session, AppError> {
        let store = CookieStore::open(cookie_path()?);
        Ok(Session::with_ttl(store, self.config.cookie_ttl_days()))
    }

    fn client(&self) -> Result<ApiClient, AppError> {
        self.client_with(self.session()?)
    }

    /// Client for the task view; fails before any request when signed out.
    fn guarded_client(&self) -> Result<ApiClient, AppError> {
        let session = self.session()?;
        require(Route::Tasks, &session)?;
        self.client_with(session)
    }

    fn client_with(&self, session: Session) -> Result<ApiClient, AppError> {
        let base_url = config::resolve_api_url(&self.config)?;
        ApiClient::new(base_url.as_str(), session)
    }
}

fn print_tasks(tasks: &[&Task], json: bool) {
    if json {
        println!("{}", serde_json::json!(tasks));
        return;
    }
    if tasks.is_empty() {
        println!("No tasks found");
        return;
    }

    let rows: Vec<TaskRow> = tasks.iter().map(|task| TaskRow::from_task(task)).collect();
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
}

fn print_task_json(task: &Task) {
    println!("{}", serde_json::json!(task));
}

fn render_view(state: &TaskListState, json: bool) {
    print_tasks(&state.filtered(), json);
}

fn print_help() {
    let mut cmd = ReplLine::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn confirm_on_stdin(question: &str) -> Result<bool, AppError> {
    print!("{question} [y/N] ");
    io::stdout()
        .flush()
        .map_err(|err| AppError::io(err.to_string()))?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn apply_list_args(state: &mut TaskListState, args: ListArgs) -> Result<(), AppError> {
    if let Some(search) = args.search {
        state.filter.search = search;
    }
    if let Some(status) = args.status {
        state.filter.status = status.parse()?;
    }
    if let Some(priority) = args.priority {
        state.filter.priority = priority.parse()?;
    }
    Ok(())
}

fn build_update(args: &EditArgs) -> Result<TaskUpdate, AppError> {
    let title = match args.title.as_deref().map(str::trim) {
        Some("") => return Err(AppError::invalid_input("title cannot be empty")),
        Some(title) => Some(title.to_string()),
        None => None,
    };

    Ok(TaskUpdate {
        title,
        description: args.description.clone(),
        priority: args.priority.as_deref().map(str::parse).transpose()?,
        start_date: checked_date(args.start.as_deref())?,
        due_date: checked_date(args.due.as_deref())?,
        status: args.status.as_deref().map(str::parse).transpose()?,
    })
}

/// A blank value clears the date.
fn checked_date(raw: Option<&str>) -> Result<Option<Option<String>>, AppError> {
    match raw.map(str::trim) {
        Some("") => Ok(Some(None)),
        Some(value) => {
            parse_calendar_date(value)?;
            Ok(Some(Some(value.to_string())))
        }
        None => Ok(None),
    }
}

/// Makes sure `id` is in the local list, fetching once if it is not.
async fn ensure_loaded(
    state: &mut TaskListState,
    service: &TaskService<'_>,
    id: &str,
) -> Result<(), AppError> {
    if state.get(id).is_none() {
        state.refresh(service).await?;
    }
    if state.get(id).is_none() {
        return Err(AppError::invalid_input(format!("task '{id}' not found")));
    }
    Ok(())
}

async fn finish_delete(
    app: &App,
    state: &mut TaskListState,
    service: &TaskService<'_>,
    json: bool,
) -> Result<(), AppError> {
    let removed = state.confirm_delete(service).await?;
    if json {
        println!(
            "{}",
            serde_json::json!({"id": removed.id, "title": removed.title, "deleted": true})
        );
    } else {
        app.toaster
            .success(format!("Deleted task: {} ({})", removed.title, removed.id));
    }
    Ok(())
}

async fn run_command(
    app: &App,
    state: &mut TaskListState,
    command: Command,
    json: bool,
    mode: Mode,
) -> Result<(), AppError> {
    match command {
        Command::Login { email, password } => {
            let client = app.client()?;
            let response = AuthService::new(&client).login(&email, &password).await?;
            let route = client.session().complete_login(&response)?;
            if !json {
                app.toaster.success(format!(
                    "Signed in as {}",
                    client.session().display_name()
                ));
            }
            if route == Route::Tasks {
                state.refresh(&TaskService::new(&client)).await?;
                render_view(state, json);
            }
        }
        Command::Register {
            user_name,
            email,
            password,
            agree_terms,
        } => {
            let client = app.client()?;
            let form = Registration {
                user_name,
                email,
                password,
                agree_terms,
            };
            let response = AuthService::new(&client).register(&form).await?;
            if !response.success {
                let message = if response.message.trim().is_empty() {
                    "registration failed".to_string()
                } else {
                    response.message
                };
                return Err(AppError::rejected(message));
            }
            if json {
                println!(
                    "{}",
                    serde_json::json!({"success": true, "message": response.message})
                );
            } else {
                app.toaster.success(response.message);
            }
        }
        Command::Logout => {
            let session = app.session()?;
            session.clear()?;
            state.replace(Vec::new());
            if !json {
                app.toaster.info("Signed out");
            }
        }
        Command::Whoami => {
            let session = app.session()?;
            require(Route::Tasks, &session)?;
            let name = session.display_name();
            if json {
                println!("{}", serde_json::json!({"user_name": name}));
            } else {
                println!("Signed in as {name}");
            }
        }
        Command::List(args) => {
            let client = app.guarded_client()?;
            apply_list_args(state, args)?;
            state.refresh(&TaskService::new(&client)).await?;
            render_view(state, json);
        }
        Command::Add {
            title,
            description,
            start,
            due,
            priority,
        } => {
            let client = app.guarded_client()?;
            let service = TaskService::new(&client);
            let mut draft = TaskDraft {
                title,
                description,
                start_date: start,
                due_date: due,
                priority: priority.as_deref().map(str::parse).transpose()?,
            };
            let submitted = draft.submit(&service, state).await?;
            let created = &submitted.task;
            if json {
                print_task_json(created);
            } else {
                app.toaster
                    .success(format!("Added task: {} ({})", created.title, created.id));
            }
            match submitted.refresh_error {
                Some(err) => app.toaster.error(&err),
                None if !json => render_view(state, false),
                None => {}
            }
        }
        Command::Done { id } => {
            let client = app.guarded_client()?;
            let service = TaskService::new(&client);
            ensure_loaded(state, &service, &id).await?;
            let task = state.toggle_completion(&service, &id).await?;
            if json {
                print_task_json(&task);
            } else {
                app.toaster
                    .success(format!("Marked '{}' as {}", task.title, task.status));
            }
        }
        Command::Edit(args) => {
            let update = build_update(&args)?;
            let client = app.guarded_client()?;
            let service = TaskService::new(&client);
            ensure_loaded(state, &service, &args.id).await?;
            let task = state.edit(&service, &args.id, &update).await?;
            if json {
                print_task_json(&task);
            } else {
                app.toaster
                    .success(format!("Updated task: {} ({})", task.title, task.id));
            }
        }
        Command::Delete { id, yes } => {
            let client = app.guarded_client()?;
            let service = TaskService::new(&client);
            ensure_loaded(state, &service, &id).await?;
            let title = state.request_delete(&id)?.title.clone();

            if yes {
                return finish_delete(app, state, &service, json).await;
            }
            match mode {
                Mode::OneShot => {
                    if confirm_on_stdin(&format!("Delete task '{title}'?"))? {
                        finish_delete(app, state, &service, json).await?;
                    } else {
                        state.cancel_delete();
                        app.toaster.info("Delete cancelled");
                    }
                }
                Mode::Interactive => {
                    app.toaster.info(format!(
                        "Delete task '{title}'? Type `confirm` to delete it or `cancel` to keep it."
                    ));
                }
            }
        }
    }

    Ok(())
}

async fn run_view_command(
    app: &App,
    state: &mut TaskListState,
    command: ReplCommand,
    json: bool,
) -> Result<(), AppError> {
    match command {
        ReplCommand::Task(command) => {
            return run_command(app, state, command, json, Mode::Interactive).await;
        }
        ReplCommand::Search { term } => {
            state.filter.search = term.join(" ");
            render_view(state, json);
        }
        ReplCommand::Status { filter } => {
            state.filter.status = filter.parse()?;
            render_view(state, json);
        }
        ReplCommand::Priority { filter } => {
            state.filter.priority = filter.parse()?;
            render_view(state, json);
        }
        ReplCommand::Show => {
            require(Route::Tasks, &app.session()?)?;
            render_view(state, json);
        }
        ReplCommand::Refresh => {
            let client = app.guarded_client()?;
            state.refresh(&TaskService::new(&client)).await?;
            render_view(state, json);
        }
        ReplCommand::Menu { id } => {
            let Some(task) = state.get(&id) else {
                return Err(AppError::invalid_input(format!("task '{id}' not found")));
            };
            let title = task.title.clone();
            state.toggle_menu(&id);
            if state.open_menu() == Some(id.as_str()) {
                println!("Actions for '{title}': done {id} | edit {id} | delete {id}");
            } else {
                println!("Menu closed");
            }
        }
        ReplCommand::Confirm => {
            if state.pending_delete().is_none() {
                return Err(AppError::invalid_input("no delete awaiting confirmation"));
            }
            let client = app.guarded_client()?;
            finish_delete(app, state, &TaskService::new(&client), json).await?;
        }
        ReplCommand::Cancel => {
            if state.pending_delete().is_some() {
                state.cancel_delete();
                app.toaster.info("Delete cancelled");
            } else {
                app.toaster.info("Nothing to cancel");
            }
        }
    }

    Ok(())
}

async fn run_interactive(app: &App) -> Result<(), AppError> {
    let mut state = TaskListState::new();
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                app.toaster.error(&err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let parsed = match ReplLine::try_parse_from(args) {
            Ok(parsed) => parsed,
            Err(err) => {
                app.toaster.error(&normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_view_command(app, &mut state, parsed.command, parsed.json).await {
            app.toaster.error(&err);
        }
    }

    Ok(())
}

fn main() {
    taskdeck_core::logging::init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("ERROR: {}", AppError::io(err.to_string()));
            std::process::exit(1);
        }
    };

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        let app = App::load(&ConfigOverrides::default());
        if let Err(err) = runtime.block_on(run_interactive(&app)) {
            app.toaster.error(&err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                err.exit();
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let overrides = match collect_config_overrides(&cli.config_override) {
        Ok(overrides) => overrides,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
    };

    let app = App::load(&overrides);
    let mut state = TaskListState::new();
    let result = runtime.block_on(run_command(
        &app,
        &mut state,
        cli.command,
        cli.json,
        Mode::OneShot,
    ));
    if let Err(err) = result {
        app.toaster.error(&err);
        std::process::exit(1);
    }
}
