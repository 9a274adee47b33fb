/*!
 * Registry of quality checks known to the data layer.
 *
 * Checks themselves run elsewhere; the data layer only needs to know each
 * check's name and whether it applies to source strings, translations or
 * both, so it can scope the stored check results when filtering units.
 */

use std::collections::BTreeMap;

/// Description of a registered check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckDescriptor {
    /// Identifier stored in the checks table
    pub name: String,
    /// Short human readable name
    pub label: String,
    /// Check is evaluated on source strings
    pub source: bool,
    /// Check is evaluated on translations
    pub target: bool,
}

impl CheckDescriptor {
    /// Check that only looks at translations
    pub fn target(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            source: false,
            target: true,
        }
    }

    /// Check that only looks at source strings
    pub fn source(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            source: true,
            target: false,
        }
    }

    /// Check that applies to both sides
    pub fn both(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            source: true,
            target: true,
        }
    }
}

/// Name-indexed set of checks
#[derive(Debug, Clone)]
pub struct CheckRegistry {
    checks: BTreeMap<String, CheckDescriptor>,
}

impl CheckRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            checks: BTreeMap::new(),
        }
    }

    /// Register (or replace) a check
    pub fn register(&mut self, check: CheckDescriptor) {
        self.checks.insert(check.name.clone(), check);
    }

    /// Builder-style registration
    pub fn with(mut self, check: CheckDescriptor) -> Self {
        self.register(check);
        self
    }

    /// Look up a check by name
    pub fn get(&self, name: &str) -> Option<&CheckDescriptor> {
        self.checks.get(name)
    }

    /// Whether a check of this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// Iterate registered checks in name order
    pub fn iter(&self) -> impl Iterator<Item = &CheckDescriptor> {
        self.checks.values()
    }

    /// Number of registered checks
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether no checks are registered
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::empty()
            .with(CheckDescriptor::target("same", "Not translated"))
            .with(CheckDescriptor::target("begin_newline", "Starting newline"))
            .with(CheckDescriptor::target("end_newline", "Trailing newline"))
            .with(CheckDescriptor::target("begin_space", "Starting spaces"))
            .with(CheckDescriptor::target("end_space", "Trailing space"))
            .with(CheckDescriptor::target("end_stop", "Trailing stop"))
            .with(CheckDescriptor::target("end_colon", "Trailing colon"))
            .with(CheckDescriptor::target("end_question", "Trailing question"))
            .with(CheckDescriptor::target("end_exclamation", "Trailing exclamation"))
            .with(CheckDescriptor::target("end_ellipsis", "Trailing ellipsis"))
            .with(CheckDescriptor::target("python_format", "Python format"))
            .with(CheckDescriptor::target("python_brace_format", "Python brace format"))
            .with(CheckDescriptor::target("php_format", "PHP format"))
            .with(CheckDescriptor::target("c_format", "C format"))
            .with(CheckDescriptor::target("plurals", "Missing plurals"))
            .with(CheckDescriptor::target("inconsistent", "Inconsistent"))
            .with(CheckDescriptor::target("escaped_newline", "Mismatched \\n"))
            .with(CheckDescriptor::target("bbcode", "Mismatched BBcode"))
            .with(CheckDescriptor::target("zero-width-space", "Zero-width space"))
            .with(CheckDescriptor::target("xmltags", "XML tags mismatch"))
            .with(CheckDescriptor::source("optional_plural", "Optional plural"))
            .with(CheckDescriptor::source("ellipsis", "Ellipsis"))
            .with(CheckDescriptor::source("multiple_failures", "Multiple failing checks"))
    }
}
