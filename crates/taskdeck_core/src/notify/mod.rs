use crate::config::Config;
use crate::error::AppError;
use std::io::Write;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const DISABLE_ENV_VAR: &str = "TASKDECK_DISABLE_NOTIFICATIONS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        Self::error(err.to_string())
    }
}

pub trait Notifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notice: &Notice) -> Result<(), AppError> {
        Ok(())
    }
}

/// Writes success and info notices to stdout and errors to stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        let written = match notice.level {
            NoticeLevel::Error => writeln!(std::io::stderr(), "ERROR: {}", notice.message),
            NoticeLevel::Success | NoticeLevel::Info => {
                writeln!(std::io::stdout(), "{}", notice.message)
            }
        };
        written.map_err(|err| AppError::io(err.to_string()))
    }
}

/// Fans a notice out to the terminal and, when enabled, the desktop.
pub struct Toaster {
    terminal: Box<dyn Notifier>,
    desktop: Option<Box<dyn Notifier>>,
}

impl Toaster {
    pub fn new(terminal: Box<dyn Notifier>, desktop: Option<Box<dyn Notifier>>) -> Self {
        Self { terminal, desktop }
    }

    pub fn from_config(config: &Config) -> Self {
        let desktop = if config.desktop_notifications {
            desktop_notifier_from_env()
        } else {
            None
        };
        Self::new(Box::new(TerminalNotifier), desktop)
    }

    pub fn has_desktop(&self) -> bool {
        self.desktop.is_some()
    }

    /// Desktop delivery problems are logged and otherwise ignored.
    pub fn show(&self, notice: &Notice) {
        if let Err(err) = self.terminal.notify(notice) {
            tracing::warn!(error = %err, "failed to write notice");
        }
        if let Some(desktop) = self.desktop.as_ref()
            && let Err(err) = desktop.notify(notice)
        {
            tracing::warn!(error = %err, "desktop notification failed");
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(&Notice::success(message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.show(&Notice::info(message));
    }

    pub fn error(&self, err: &AppError) {
        self.show(&Notice::from_error(err));
    }
}

pub fn desktop_notifier_from_env() -> Option<Box<dyn Notifier>> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return None;
    }

    match platform_notifier() {
        Ok(notifier) => Some(notifier),
        Err(err) => {
            tracing::debug!(error = %err, "desktop notifications unavailable");
            None
        }
    }
}

fn summary_for(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success => "taskdeck",
        NoticeLevel::Info => "taskdeck",
        NoticeLevel::Error => "taskdeck error",
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::{Notice, NoticeLevel, Notifier, Toaster, summary_for};
    use crate::config::Config;
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};

    struct Recording(Arc<Mutex<Vec<Notice>>>);

    impl Notifier for Recording {
        fn notify(&self, notice: &Notice) -> Result<(), AppError> {
            self.0.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    struct Broken;

    impl Notifier for Broken {
        fn notify(&self, _notice: &Notice) -> Result<(), AppError> {
            Err(AppError::io("no notification daemon"))
        }
    }

    #[test]
    fn error_notice_carries_code_and_message() {
        let notice = Notice::from_error(&AppError::rejected("User not found"));
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "rejected - User not found");
    }

    #[test]
    fn toaster_fans_out_to_both_notifiers() {
        let terminal = Arc::new(Mutex::new(Vec::new()));
        let desktop = Arc::new(Mutex::new(Vec::new()));
        let toaster = Toaster::new(
            Box::new(Recording(terminal.clone())),
            Some(Box::new(Recording(desktop.clone()))),
        );

        toaster.success("Task added");

        assert_eq!(terminal.lock().unwrap().as_slice(), [Notice::success("Task added")]);
        assert_eq!(desktop.lock().unwrap().len(), 1);
    }

    #[test]
    fn desktop_failure_is_not_fatal() {
        let terminal = Arc::new(Mutex::new(Vec::new()));
        let toaster = Toaster::new(Box::new(Recording(terminal.clone())), Some(Box::new(Broken)));

        toaster.info("Signed out");

        assert_eq!(terminal.lock().unwrap().len(), 1);
    }

    #[test]
    fn desktop_is_off_unless_configured() {
        let toaster = Toaster::from_config(&Config::default());
        assert!(!toaster.has_desktop());
    }

    #[test]
    fn error_summary_is_marked() {
        assert_eq!(summary_for(NoticeLevel::Error), "taskdeck error");
        assert_eq!(summary_for(NoticeLevel::Success), "taskdeck");
    }
}
