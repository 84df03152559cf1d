use crate::error::AppError;
use crate::notify::{Notice, NoticeLevel, Notifier, summary_for};
use notify_rust::{Notification, Urgency};

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        let urgency = match notice.level {
            NoticeLevel::Error => Urgency::Critical,
            NoticeLevel::Success | NoticeLevel::Info => Urgency::Normal,
        };

        Notification::new()
            .summary(summary_for(notice.level))
            .body(&notice.message)
            .urgency(urgency)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
