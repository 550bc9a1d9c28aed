//! Engine and request configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default identifier quote character.
pub const DEFAULT_IDENTIFIER_QUOTE: char = '`';

/// Request-scoped settings consulted while reading and serializing values.
///
/// Passed explicitly into every operation that depends on it; there is no
/// process-wide mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestContext {
    /// Suppress unpublished relation targets on read.
    pub hide_unpublished: bool,
    /// Drop provider-supplied options when serializing definitions.
    pub remove_dynamic_options: bool,
}

impl RequestContext {
    /// Create a context with everything visible.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether unpublished relation targets are hidden.
    pub fn with_hide_unpublished(mut self, hide: bool) -> Self {
        self.hide_unpublished = hide;
        self
    }

    /// Set whether dynamic options are stripped from serialized definitions.
    pub fn with_remove_dynamic_options(mut self, remove: bool) -> Self {
        self.remove_dynamic_options = remove;
        self
    }
}

/// Engine configuration.
///
/// Can be built in code or loaded from JSON:
///
/// ```json
/// { "identifierQuote": "\"", "hideUnpublished": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Character used to quote column identifiers in generated conditions.
    pub identifier_quote: char,
    /// Default for [`RequestContext::hide_unpublished`].
    pub hide_unpublished: bool,
    /// Default for [`RequestContext::remove_dynamic_options`].
    pub remove_dynamic_options: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identifier_quote: DEFAULT_IDENTIFIER_QUOTE,
            hide_unpublished: false,
            remove_dynamic_options: false,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identifier quote character.
    pub fn with_identifier_quote(mut self, quote: char) -> Self {
        self.identifier_quote = quote;
        self
    }

    /// Set the default unpublished visibility.
    pub fn with_hide_unpublished(mut self, hide: bool) -> Self {
        self.hide_unpublished = hide;
        self
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.identifier_quote.is_alphanumeric() || self.identifier_quote.is_whitespace() {
            return Err(Error::Config(format!(
                "invalid identifier quote: {:?}",
                self.identifier_quote
            )));
        }
        Ok(())
    }

    /// Request context seeded from this configuration.
    pub fn request_context(&self) -> RequestContext {
        RequestContext {
            hide_unpublished: self.hide_unpublished,
            remove_dynamic_options: self.remove_dynamic_options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.identifier_quote, '`');
        assert!(!config.request_context().hide_unpublished);
    }

    #[test]
    fn test_from_json() {
        let config = EngineConfig::from_json(r#"{"identifierQuote": "\"", "hideUnpublished": true}"#)
            .unwrap();
        assert_eq!(config.identifier_quote, '"');
        assert!(config.request_context().hide_unpublished);
        assert!(!config.remove_dynamic_options);
    }

    #[test]
    fn test_rejects_bad_quote() {
        assert!(EngineConfig::from_json(r#"{"identifierQuote": "a"}"#).is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"removeDynamicOptions": true}}"#).unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert!(config.remove_dynamic_options);
        assert!(EngineConfig::from_path("/nonexistent/objdef.json").is_err());
    }

    #[test]
    fn test_request_context_builder() {
        let ctx = RequestContext::new()
            .with_hide_unpublished(true)
            .with_remove_dynamic_options(true);
        assert!(ctx.hide_unpublished);
        assert!(ctx.remove_dynamic_options);
    }
}
