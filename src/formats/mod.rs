/*!
 * Translation file formats.
 *
 * The managers never look at file syntax. They consume parsed entries
 * through the `TranslatableUnit` capability trait, which each format adapter
 * implements:
 * - `po`: GNU gettext PO/POT files (bilingual, plurals, fuzzy flags)
 * - `json`: key/value JSON documents (monolingual)
 *
 * `load_store` picks the adapter from the file extension, falling back to
 * sniffing the content.
 */

pub mod json;
pub mod po;

use std::fmt;
use std::path::Path;

use log::debug;

use crate::errors::FormatError;

pub use json::JsonUnit;
pub use po::PoUnit;

/// Capability interface of a parsed translation entry
pub trait TranslatableUnit {
    /// Source text (plural forms joined)
    fn source(&self) -> &str;

    /// Translated text (plural forms joined)
    fn target(&self) -> &str;

    /// Disambiguating context, empty when absent
    fn context(&self) -> &str;

    /// Whether the entry is a real message (not a header or obsolete entry)
    fn is_translatable(&self) -> bool;

    /// Whether the entry carries a usable translation
    fn is_translated(&self) -> bool;

    /// Whether the translation needs review
    fn is_fuzzy(&self) -> bool {
        false
    }

    /// Source code references
    fn location(&self) -> &str {
        ""
    }

    /// Comments for translators
    fn comment(&self) -> &str {
        ""
    }

    /// Format flags
    fn flags(&self) -> &str {
        ""
    }

    /// Source text before the last update, when the format tracks it
    fn previous_source(&self) -> &str {
        ""
    }
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// GNU gettext PO
    Po,
    /// JSON key/value file
    Json,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Po => write!(f, "po"),
            FileFormat::Json => write!(f, "json"),
        }
    }
}

impl FileFormat {
    /// Detect format from a file name
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "po" | "pot" => Some(FileFormat::Po),
            "json" => Some(FileFormat::Json),
            _ => None,
        }
    }

    /// Guess format from content
    pub fn sniff(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            FileFormat::Json
        } else {
            FileFormat::Po
        }
    }
}

/// A parsed translation file
pub struct TranslationStore {
    /// Detected format
    pub format: FileFormat,
    /// Parsed entries in file order
    pub units: Vec<Box<dyn TranslatableUnit>>,
}

impl TranslationStore {
    /// Parse content in the given format
    pub fn parse(content: &str, format: FileFormat) -> Result<Self, FormatError> {
        let units: Vec<Box<dyn TranslatableUnit>> = match format {
            FileFormat::Po => po::parse(content)?
                .into_iter()
                .map(|u| Box::new(u) as Box<dyn TranslatableUnit>)
                .collect(),
            FileFormat::Json => json::parse(content)?
                .into_iter()
                .map(|u| Box::new(u) as Box<dyn TranslatableUnit>)
                .collect(),
        };
        debug!("Parsed {} {} units", units.len(), format);
        Ok(Self { format, units })
    }

    /// Find the entry with the given context
    pub fn find_by_context(&self, context: &str) -> Option<&dyn TranslatableUnit> {
        self.units
            .iter()
            .find(|u| u.context() == context)
            .map(|u| u.as_ref())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the store has no entries
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Load a translation file, detecting its format
pub fn load_store(path: &Path) -> Result<TranslationStore, FormatError> {
    let content = std::fs::read_to_string(path)?;
    let format = FileFormat::from_path(path).unwrap_or_else(|| FileFormat::sniff(&content));
    TranslationStore::parse(&content, format)
}

/// Entry of a monolingual template with no translation yet
pub struct UntranslatedUnit<'a> {
    template: &'a dyn TranslatableUnit,
}

impl<'a> UntranslatedUnit<'a> {
    /// Wrap a template entry
    pub fn new(template: &'a dyn TranslatableUnit) -> Self {
        Self { template }
    }
}

impl TranslatableUnit for UntranslatedUnit<'_> {
    fn source(&self) -> &str {
        self.template.target()
    }

    fn target(&self) -> &str {
        ""
    }

    fn context(&self) -> &str {
        self.template.context()
    }

    fn is_translatable(&self) -> bool {
        self.template.is_translatable()
    }

    fn is_translated(&self) -> bool {
        false
    }
}
