use std::path::PathBuf;
use thiserror::Error;

/// Failures of the page renderer
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Renderer session error: {0}")]
    Session(String),
}

impl RenderError {
    /// Errors caused by our own code rather than by the page or the network
    pub fn is_programming_error(&self) -> bool {
        matches!(self, RenderError::InvalidSelector(_))
    }
}

/// Failures while extracting details for a single listing
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Malformed {field}: {value:?}")]
    MalformedField { field: &'static str, value: String },

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ExtractError {
    pub fn malformed(field: &'static str, value: impl Into<String>) -> Self {
        ExtractError::MalformedField {
            field,
            value: value.into(),
        }
    }

    /// Short classification used in log records
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::MalformedField { .. } => "malformed_field",
            ExtractError::Render(RenderError::Navigation { .. }) => "renderer_io",
            ExtractError::Render(RenderError::Session(_)) => "renderer_session",
            ExtractError::Render(RenderError::InvalidSelector(_)) => "invalid_selector",
        }
    }
}

/// Failures of the durable key-value store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt data in store namespace {namespace}: {source}")]
    Corrupt {
        namespace: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode store value: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced by discovery operations
#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Renderer error: {0}")]
    Render(#[from] RenderError),

    #[error("Failed to launch renderer: {0}")]
    Launch(String),

    #[error("Source {0} is not open")]
    NotOpen(String),
}

impl ScoutError {
    /// Store failures and programming errors must stop the poll; anything
    /// else only affects the source that raised it.
    pub fn is_fatal(&self) -> bool {
        match self {
            ScoutError::Store(_) | ScoutError::NotOpen(_) => true,
            ScoutError::Render(e) => e.is_programming_error(),
            ScoutError::Launch(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: ScoutError = StoreError::io("/state/immoweb.json", io_err).into();
        assert!(matches!(err, ScoutError::Store(StoreError::Io { .. })));
        assert!(err.to_string().contains("/state/immoweb.json"));
    }

    #[test]
    fn test_extract_error_kinds() {
        assert_eq!(ExtractError::malformed("price", "n/a").kind(), "malformed_field");
        let nav = RenderError::Navigation {
            url: "https://example.test".to_string(),
            reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        };
        assert_eq!(ExtractError::from(nav).kind(), "renderer_io");
    }

    #[test]
    fn test_malformed_field_message() {
        let err = ExtractError::malformed("area", "about 80");
        assert_eq!(err.to_string(), "Malformed area: \"about 80\"");
    }

    #[test]
    fn test_only_selectors_are_programming_errors() {
        assert!(RenderError::InvalidSelector("div[".to_string()).is_programming_error());
        assert!(!RenderError::Session("closed".to_string()).is_programming_error());
    }

    #[test]
    fn test_fatal_errors() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(ScoutError::from(StoreError::io("/state/x.json", io_err)).is_fatal());
        assert!(ScoutError::from(RenderError::InvalidSelector("a[".to_string())).is_fatal());
        assert!(!ScoutError::from(RenderError::Session("tab crashed".to_string())).is_fatal());
        assert!(!ScoutError::Launch("no chrome".to_string()).is_fatal());
    }
}
