use crate::error::AppError;
use crate::notify::{Notice, Notifier, summary_for};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(summary_for(notice.level))
            .text1(&notice.message)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
