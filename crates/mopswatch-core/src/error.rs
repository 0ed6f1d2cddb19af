use thiserror::Error;

/// Invalid run parameters. Raised before any request is issued.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown range mode: {0:?} (expected \"single\" or \"range\")")]
    UnknownMode(String),

    #[error("range mode requires a start era year")]
    MissingStartYear,

    #[error("invalid start era year: {0}")]
    InvalidStartYear(i32),

    #[error("start era year {start} is after the current era year {today}")]
    StartYearInFuture { start: i32, today: i32 },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
