//! Configuration errors.

use camino::Utf8PathBuf;

/// Why a configuration file or value was refused.
///
/// # Examples
///
/// ```
/// use ms_core::ConfigError;
///
/// let error = ConfigError::invalid("scan.extract_dir", "must be a single folder name");
/// assert!(error.to_string().contains("scan.extract_dir"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds a value the crawler cannot use.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// Dotted path of the field, e.g. `scan.registry_url`.
        option: String,
        /// What the value must look like.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// The file given with `--config`.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON, or a field has the wrong type.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an [`InvalidOption`](Self::InvalidOption) error.
    #[must_use]
    pub fn invalid(option: &str, reason: &str) -> Self {
        Self::InvalidOption {
            option: option.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid("scan.extract_dir", "must be a single folder name");
        let msg = error.to_string();
        assert!(msg.contains("scan.extract_dir"));
        assert!(msg.contains("single folder name"));
    }

    #[test]
    fn test_read_error_names_the_file() {
        let error = ConfigError::Read {
            path: Utf8PathBuf::from("/etc/modspec.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(error.to_string().contains("/etc/modspec.json"));
    }

    #[test]
    fn test_parse_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = ConfigError::from(serde_err);
        assert!(error.to_string().starts_with("failed to parse configuration"));
    }
}
