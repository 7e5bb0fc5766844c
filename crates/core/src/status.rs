//! Status-string conventions shared with the web front end.
//!
//! The progress bar, warning list, and failure detection in the browser all
//! key off literal Russian status strings; every producer and consumer in
//! this workspace goes through the constants here so the wire convention
//! lives in one place.

/// Prefix marking a status string as an error state.
///
/// Any status beginning with this marker signals failure to the reconciler,
/// on a completion event or mid-stream.
pub const FAILURE_PREFIX: &str = "Ошибка";

/// Initial status of a freshly created job record.
pub const STATUS_QUEUED: &str = "В очереди...";

/// Status shown between submission dispatch and the first channel event.
pub const STATUS_UPLOADING: &str = "Загрузка файлов на сервер...";

/// Fallback label when a progress event carries no status text.
pub const STATUS_PROCESSING: &str = "Обработка...";

/// Terminal status of a successful run.
pub const STATUS_DONE: &str = "Готово!";

/// Maximum number of warning lines shown verbatim; the rest collapse into
/// one summary line.
pub const MAX_WARNINGS_SHOWN: usize = 50;

/// Whether a status string signals an error state.
pub fn is_failure(status: &str) -> bool {
    status.starts_with(FAILURE_PREFIX)
}

/// Build a failure status from an error message: `Ошибка: <message>`.
pub fn failure_status(message: &str) -> String {
    format!("{FAILURE_PREFIX}: {message}")
}

/// The synthetic summary line appended when more than
/// [`MAX_WARNINGS_SHOWN`] warnings exist.
pub fn omitted_warnings_line(omitted: usize) -> String {
    format!("... и еще {omitted} замечаний.")
}
