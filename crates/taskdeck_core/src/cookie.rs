//! Named credential cookies persisted the way a browser jar keeps them:
//! one `name=value; expires=...; path=/` entry per cookie, expired entries
//! dropped on every access.

use crate::config::app_config_dir;
use crate::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use url::form_urlencoded;

pub const TOKEN_COOKIE: &str = "token";
pub const DEFAULT_TTL_DAYS: u32 = 1;
const COOKIE_FILE_NAME: &str = "cookies.txt";
const COOKIE_ENV_VAR: &str = "TASKDECK_COOKIE_PATH";
const SITE_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    /// URL-encoded value as it appears on the wire.
    pub value: String,
    /// `None` is a session cookie.
    pub expires: Option<OffsetDateTime>,
    pub path: String,
}

impl Cookie {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    fn to_line(&self) -> String {
        let mut line = format!("{}={}", self.name, self.value);
        if let Some(expires) = self.expires {
            line.push_str("; expires=");
            line.push_str(&format_http_date(expires));
        }
        line.push_str("; path=");
        line.push_str(&self.path);
        line
    }

    fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie {
            name: name.to_string(),
            value: value.trim().to_string(),
            expires: None,
            path: SITE_PATH.to_string(),
        };

        for attribute in parts {
            let Some((key, raw)) = attribute.split_once('=') else {
                continue;
            };
            if key.trim().eq_ignore_ascii_case("expires") {
                cookie.expires = parse_http_date(raw.trim());
            } else if key.trim().eq_ignore_ascii_case("path") {
                cookie.path = raw.trim().to_string();
            }
        }

        Some(cookie)
    }
}

enum Backing {
    File(PathBuf),
    Memory(Mutex<Vec<Cookie>>),
}

pub struct CookieStore {
    backing: Backing,
}

impl std::fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backing {
            Backing::File(path) => f.debug_tuple("CookieStore").field(path).finish(),
            Backing::Memory(_) => f.write_str("CookieStore(memory)"),
        }
    }
}

impl CookieStore {
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            backing: Backing::File(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory(Mutex::new(Vec::new())),
        }
    }

    /// Writes `name` with an expiry `ttl_days` from now, replacing any
    /// previous value under the same name. An expiry past the last
    /// representable date is rejected.
    pub fn set(&self, name: &str, value: &str, ttl_days: u32) -> Result<(), AppError> {
        let expires = OffsetDateTime::now_utc()
            .checked_add(Duration::days(i64::from(ttl_days)))
            .ok_or_else(|| {
                AppError::invalid_input(format!("cookie lifetime of {ttl_days} days is too long"))
            })?;
        self.write(Cookie {
            name: name.to_string(),
            value: encode_component(value),
            expires: Some(expires),
            path: SITE_PATH.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<String> {
        parse_cookie_header(&self.header(), name)
    }

    /// Overwrites `name` with an already expired entry, which drops it.
    pub fn delete(&self, name: &str) -> Result<(), AppError> {
        self.write(Cookie {
            name: name.to_string(),
            value: String::new(),
            expires: Some(OffsetDateTime::UNIX_EPOCH),
            path: SITE_PATH.to_string(),
        })
    }

    /// Live cookies rendered as a request `Cookie` header.
    pub fn header(&self) -> String {
        let now = OffsetDateTime::now_utc();
        self.load()
            .iter()
            .filter(|cookie| !cookie.is_expired(now))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn load(&self) -> Vec<Cookie> {
        match &self.backing {
            Backing::Memory(cookies) => match cookies.lock() {
                Ok(cookies) => cookies.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            },
            Backing::File(path) => match read_cookie_file(path) {
                Ok(cookies) => cookies,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable cookie file");
                    Vec::new()
                }
            },
        }
    }

    fn write(&self, cookie: Cookie) -> Result<(), AppError> {
        let now = OffsetDateTime::now_utc();
        let mut cookies = self.load();
        cookies.retain(|existing| {
            !(existing.name == cookie.name && existing.path == cookie.path)
                && !existing.is_expired(now)
        });
        if !cookie.is_expired(now) {
            cookies.push(cookie);
        }

        match &self.backing {
            Backing::Memory(slot) => {
                let mut guard = match slot.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *guard = cookies;
                Ok(())
            }
            Backing::File(path) => write_cookie_file(path, &cookies),
        }
    }
}

pub fn cookie_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(COOKIE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_config_dir()?.join(COOKIE_FILE_NAME))
}

/// Returns the decoded value of the first non-empty `name` entry in a
/// `Cookie` header.
pub fn parse_cookie_header(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| decode_component(value))
}

fn read_cookie_file(path: &Path) -> Result<Vec<Cookie>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(Cookie::parse_line)
        .collect())
}

fn write_cookie_file(path: &Path, cookies: &[Cookie]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    // Session cookies do not outlive the process.
    let mut content = String::new();
    for cookie in cookies.iter().filter(|cookie| cookie.expires.is_some()) {
        content.push_str(&cookie.to_line());
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}

fn format_http_date(value: OffsetDateTime) -> String {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    let utc = value.to_offset(time::UtcOffset::UTC);
    utc.format(&format).unwrap_or_else(|_| "Thu, 01 Jan 1970 00:00:00 GMT".to_string())
}

fn parse_http_date(raw: &str) -> Option<OffsetDateTime> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    PrimitiveDateTime::parse(raw, &format)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn decode_component(value: &str) -> String {
    // Encoded values never contain a raw `&` or `=`, so the whole value is a
    // single key.
    form_urlencoded::parse(value.replace('+', "%2B").as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}
