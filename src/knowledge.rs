//! Lookup tables the semantic linters validate against.

use std::collections::{HashMap, HashSet};

use crate::config::LintConfig;
use crate::data::{AT_RULE_PROPERTIES, AT_RULES, PROPERTIES, VENDOR_PREFIXES};

/// Known properties, at-rules, at-rule descriptors and indentation
/// characters.
///
/// Names are stored and matched case-insensitively. A vendor-prefixed name
/// is known when the name itself or its unprefixed form is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBase {
    properties: HashSet<String>,
    at_rules: HashSet<String>,
    at_rule_properties: HashMap<String, HashSet<String>>,
    indentation_chars: Vec<char>,
}

impl KnowledgeBase {
    /// An empty knowledge base: nothing is known and only spaces indent.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            properties: HashSet::new(),
            at_rules: HashSet::new(),
            at_rule_properties: HashMap::new(),
            indentation_chars: vec![' '],
        }
    }

    /// Built-in tables with `config` applied on top.
    #[must_use]
    pub fn with_config(config: &LintConfig) -> Self {
        let mut knowledge = Self::default();
        knowledge.configure(config);
        knowledge
    }

    /// Apply a configuration: `true` entries register names, `false`
    /// entries remove them.
    pub fn configure(&mut self, config: &LintConfig) {
        if let Some(chars) = &config.allowed_indentation_chars {
            self.set_allowed_indentation_chars(chars.iter().copied());
        }
        for (name, &known) in &config.properties {
            if known {
                self.add_property(name);
            } else {
                self.remove_property(name);
            }
        }
        for (name, &known) in &config.at_rules {
            if known {
                self.add_at_rule(name);
            } else {
                self.remove_at_rule(name);
            }
        }
        for (at_rule, properties) in &config.at_rules_properties {
            for (name, &known) in properties {
                if known {
                    self.add_at_rule_property(at_rule, name);
                } else {
                    self.remove_at_rule_property(at_rule, name);
                }
            }
        }
    }

    // -- Properties --

    #[must_use]
    pub fn property_exists(&self, name: &str) -> bool {
        lookup_names(name).any(|name| self.properties.contains(&name))
    }

    pub fn add_property(&mut self, name: &str) {
        self.properties.insert(name.to_ascii_lowercase());
    }

    pub fn remove_property(&mut self, name: &str) {
        self.properties.remove(&name.to_ascii_lowercase());
    }

    // -- At-rules --

    /// Whether an at-rule name (without `@`) is known.
    #[must_use]
    pub fn at_rule_exists(&self, name: &str) -> bool {
        lookup_names(name).any(|name| self.at_rules.contains(&name))
    }

    pub fn add_at_rule(&mut self, name: &str) {
        self.at_rules.insert(name.to_ascii_lowercase());
    }

    pub fn remove_at_rule(&mut self, name: &str) {
        self.at_rules.remove(&name.to_ascii_lowercase());
    }

    // -- At-rule descriptors --

    /// Whether blocks of `at_rule` are restricted to a descriptor subset.
    #[must_use]
    pub fn at_rule_has_properties(&self, at_rule: &str) -> bool {
        self.descriptors(at_rule)
            .is_some_and(|properties| !properties.is_empty())
    }

    #[must_use]
    pub fn at_rule_property_exists(&self, at_rule: &str, name: &str) -> bool {
        self.descriptors(at_rule).is_some_and(|properties| {
            lookup_names(name).any(|name| properties.contains(&name))
        })
    }

    pub fn add_at_rule_property(&mut self, at_rule: &str, name: &str) {
        self.at_rule_properties
            .entry(at_rule.to_ascii_lowercase())
            .or_default()
            .insert(name.to_ascii_lowercase());
    }

    pub fn remove_at_rule_property(&mut self, at_rule: &str, name: &str) {
        if let Some(properties) = self
            .at_rule_properties
            .get_mut(&at_rule.to_ascii_lowercase())
        {
            properties.remove(&name.to_ascii_lowercase());
        }
    }

    fn descriptors(&self, at_rule: &str) -> Option<&HashSet<String>> {
        lookup_names(at_rule).find_map(|name| self.at_rule_properties.get(&name))
    }

    // -- Indentation --

    #[must_use]
    pub fn is_allowed_indentation_char(&self, ch: char) -> bool {
        self.indentation_chars.contains(&ch)
    }

    #[must_use]
    pub fn allowed_indentation_chars(&self) -> &[char] {
        &self.indentation_chars
    }

    /// Replace the allowed indentation characters. Line breaks are always
    /// allowed.
    pub fn set_allowed_indentation_chars(&mut self, chars: impl IntoIterator<Item = char>) {
        self.indentation_chars = chars.into_iter().collect();
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        let mut knowledge = Self::empty();
        knowledge
            .properties
            .extend(PROPERTIES.iter().map(|name| (*name).to_string()));
        knowledge
            .at_rules
            .extend(AT_RULES.iter().map(|name| (*name).to_string()));
        for (at_rule, properties) in AT_RULE_PROPERTIES {
            knowledge.at_rule_properties.insert(
                (*at_rule).to_string(),
                properties.iter().map(|name| (*name).to_string()).collect(),
            );
        }
        knowledge
    }
}

/// Lowercased `name`, then its form without a vendor prefix.
fn lookup_names(name: &str) -> impl Iterator<Item = String> {
    let name = name.to_ascii_lowercase();
    let unprefixed = VENDOR_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string);
    std::iter::once(name).chain(unprefixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_properties() {
        let knowledge = KnowledgeBase::default();
        assert!(knowledge.property_exists("display"));
        assert!(knowledge.property_exists("DISPLAY"));
        assert!(!knowledge.property_exists("displady"));
    }

    #[test]
    fn vendor_prefixes_are_stripped() {
        let knowledge = KnowledgeBase::default();
        assert!(knowledge.property_exists("-webkit-transition"));
        assert!(knowledge.property_exists("-moz-user-select"));
        assert!(knowledge.at_rule_exists("-webkit-keyframes"));
        assert!(!knowledge.property_exists("-webkit-"));
        assert!(!knowledge.property_exists("-khtml-transition"));
    }

    #[test]
    fn at_rule_descriptors() {
        let knowledge = KnowledgeBase::default();
        assert!(knowledge.at_rule_has_properties("font-face"));
        assert!(!knowledge.at_rule_has_properties("media"));
        assert!(knowledge.at_rule_property_exists("font-face", "src"));
        assert!(!knowledge.at_rule_property_exists("font-face", "color"));
        assert!(!knowledge.at_rule_property_exists("media", "color"));
    }

    #[test]
    fn add_and_remove() {
        let mut knowledge = KnowledgeBase::empty();
        knowledge.add_property("Zoom");
        assert!(knowledge.property_exists("zoom"));
        knowledge.remove_property("ZOOM");
        assert!(!knowledge.property_exists("zoom"));

        knowledge.add_at_rule_property("font-face", "font-named-instance");
        assert!(knowledge.at_rule_has_properties("font-face"));
        knowledge.remove_at_rule_property("font-face", "font-named-instance");
        assert!(!knowledge.at_rule_has_properties("font-face"));
    }

    #[test]
    fn default_indentation_is_spaces() {
        let knowledge = KnowledgeBase::default();
        assert!(knowledge.is_allowed_indentation_char(' '));
        assert!(!knowledge.is_allowed_indentation_char('\t'));
        assert_eq!(knowledge.allowed_indentation_chars(), &[' ']);
    }
}
