/// Stable identifier of one prompt's lifecycle, supplied by the caller.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
