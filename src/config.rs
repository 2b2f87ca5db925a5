use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QueryError, Result};

/// Naming policy of the default mapping
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Lower-case the first letter of member and type names
    pub camel_case: bool,
    /// Append an `s` to type names that don't already end in one
    pub pluralize_type_names: bool,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            camel_case: true,
            pluralize_type_names: true,
        }
    }
}

/// Settings of a search context
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Index queried by the context, if any
    pub index: Option<String>,
    /// Dotted namespace prepended to every resolved field name
    pub field_prefix: String,
    /// Page size applied to hit queries that don't `take` explicitly
    pub default_size: Option<usize>,
    pub mapping: MappingSettings,
}

impl QuerySettings {
    /// Parse settings from JSON. Missing keys fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: QuerySettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_field_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.field_prefix = prefix.into();
        self
    }

    pub fn with_default_size(mut self, size: usize) -> Self {
        self.default_size = Some(size);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.field_prefix.starts_with('.') || self.field_prefix.ends_with('.') {
            return Err(QueryError::Config(format!(
                "field_prefix must not start or end with '.': {:?}",
                self.field_prefix
            )));
        }
        if let Some(index) = &self.index {
            if index.is_empty() || index.contains('/') {
                return Err(QueryError::Config(format!("invalid index name: {:?}", index)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = QuerySettings::default();
        assert!(settings.index.is_none());
        assert_eq!(settings.field_prefix, "");
        assert!(settings.mapping.camel_case);
        assert!(settings.mapping.pluralize_type_names);
    }

    #[test]
    fn test_from_json_partial() {
        let settings =
            QuerySettings::from_json_str(r#"{ "index": "fleet", "mapping": { "camel_case": false } }"#)
                .unwrap();
        assert_eq!(settings.index.as_deref(), Some("fleet"));
        assert!(!settings.mapping.camel_case);
        assert!(settings.mapping.pluralize_type_names);
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let err = QuerySettings::from_json_str(r#"{ "field_prefix": "doc." }"#).unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "field_prefix": "doc", "default_size": 25 }}"#).unwrap();

        let settings = QuerySettings::from_file(file.path()).unwrap();
        assert_eq!(settings.field_prefix, "doc");
        assert_eq!(settings.default_size, Some(25));
    }
}
