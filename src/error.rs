use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("CSV header has {found} column(s), need at least code and display")]
    MissingColumns { found: usize },
    #[error("Row on line {line} has {found} field(s), need at least code and display")]
    ShortRow { line: u64, found: usize },
    #[error("Unknown catalog: {0}")]
    UnknownCatalog(String),
    #[error("Catalog config error: {0}")]
    Config(String),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid canonical base URL '{0}'")]
    InvalidUrl(String),
}

impl From<std::io::Error> for BundleError {
    fn from(err: std::io::Error) -> Self {
        BundleError::Io(err.to_string())
    }
}

impl From<csv::Error> for BundleError {
    fn from(err: csv::Error) -> Self {
        BundleError::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for BundleError {
    fn from(err: serde_json::Error) -> Self {
        BundleError::Json(err.to_string())
    }
}
