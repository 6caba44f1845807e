pub mod config;
pub mod error;
pub mod file_config;
pub mod security;
pub mod taxonomy;
pub mod types;

pub use config::AppConfig;
pub use error::{CurationError, CurationResult, ErrorKind, SecurityError, SecurityResult};
pub use file_config::FileConfig;
pub use security::UrlValidator;
pub use types::*;

/// Strip HTML down to readable plain text — used by the generic extractor
/// and by the classifier's content excerpt.
pub fn html_to_plain_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 80).unwrap_or_default()
}
