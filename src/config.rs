//! JSON configuration for the knowledge base.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::Error;
use crate::knowledge::KnowledgeBase;

/// User overrides layered over the built-in knowledge base.
///
/// ```json
/// {
///   "allowedIndentationChars": [" ", "\t"],
///   "properties": { "my-property": true, "zoom": false },
///   "atRules": { "tailwind": true },
///   "atRulesProperties": { "font-face": { "font-named-instance": true } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LintConfig {
    pub allowed_indentation_chars: Option<Vec<char>>,
    pub properties: BTreeMap<String, bool>,
    pub at_rules: BTreeMap<String, bool>,
    pub at_rules_properties: BTreeMap<String, BTreeMap<String, bool>>,
}

impl LintConfig {
    /// Parse a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::Config`] when its content is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Built-in knowledge base with this configuration applied.
    #[must_use]
    pub fn knowledge_base(&self) -> KnowledgeBase {
        KnowledgeBase::with_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_section() {
        let config = LintConfig::from_json(
            r#"{
                "allowedIndentationChars": [" ", "\t"],
                "properties": { "my-property": true, "zoom": false },
                "atRules": { "tailwind": true },
                "atRulesProperties": { "font-face": { "font-named-instance": true } }
            }"#,
        )
        .expect("valid config");

        assert_eq!(config.allowed_indentation_chars, Some(vec![' ', '\t']));
        let knowledge = config.knowledge_base();
        assert!(knowledge.property_exists("my-property"));
        assert!(!knowledge.property_exists("zoom"));
        assert!(knowledge.at_rule_exists("tailwind"));
        assert!(knowledge.at_rule_property_exists("font-face", "font-named-instance"));
        assert!(knowledge.at_rule_property_exists("font-face", "src"));
        assert!(knowledge.is_allowed_indentation_char('\t'));
    }

    #[test]
    fn empty_object_keeps_defaults() {
        let config = LintConfig::from_json("{}").expect("valid config");
        assert_eq!(config, LintConfig::default());
        assert_eq!(config.knowledge_base(), KnowledgeBase::default());
    }

    #[test]
    fn rejects_unknown_keys() {
        let result = LintConfig::from_json(r#"{ "propertys": {} }"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = LintConfig::from_path("/nonexistent/csslint.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
