/*!
 * Field validators for subproject settings.
 *
 * Each validator is a plain function returning `Err(ValidationError)` with a
 * user facing message when the value is rejected.
 */

use log::debug;

use crate::errors::{LookupError, ValidationError};
use crate::managers::SubProjectManager;
use crate::python_format::{format_mapping, FormatValue};

/// Message used for every format string failure
fn bad_format(detail: impl std::fmt::Display) -> ValidationError {
    ValidationError::new(format!("Bad format string ({})", detail), "bad_format")
}

/// Validates whether URL for repository browser is valid and can be filled in
/// using format string.
pub fn validate_repoweb(val: &str) -> Result<(), ValidationError> {
    let values = [
        ("file", FormatValue::from("file.po")),
        ("line", FormatValue::from("9")),
        ("branch", FormatValue::from("master")),
    ];
    format_mapping(val, &values).map(|_| ()).map_err(bad_format)
}

/// Sample values a commit message template must accept
pub fn commit_message_sample() -> Vec<(&'static str, FormatValue)> {
    vec![
        ("language", FormatValue::from("cs")),
        ("language_name", FormatValue::from("Czech")),
        ("project", FormatValue::from("Weblate")),
        ("subproject", FormatValue::from("master")),
        ("total", FormatValue::Int(200)),
        ("fuzzy", FormatValue::Int(20)),
        ("fuzzy_percent", FormatValue::Float(10.0)),
        ("translated", FormatValue::Int(40)),
        ("translated_percent", FormatValue::Float(20.0)),
    ]
}

/// Validates that commit message is a valid format string.
pub fn validate_commit_message(val: &str) -> Result<(), ValidationError> {
    format_mapping(val, &commit_message_sample())
        .map(|_| ())
        .map_err(bad_format)
}

/// Validates file mask that it contains `*`.
pub fn validate_filemask(val: &str) -> Result<(), ValidationError> {
    if !val.contains('*') {
        return Err(ValidationError::new(
            "File mask does not contain * as a language placeholder!",
            "filemask",
        ));
    }
    Ok(())
}

/// Validates repository URL, and special `weblate://` links.
///
/// A link must point at an existing subproject which itself is not a link.
pub fn validate_repo(val: &str, subprojects: &SubProjectManager) -> Result<(), ValidationError> {
    match subprojects.get_linked(val) {
        Ok(Some(repo)) if repo.is_repo_link() => Err(ValidationError::new(
            "Can not link to linked repository!",
            "linked_link",
        )),
        Ok(_) => Ok(()),
        Err(LookupError::DoesNotExist { lookup, .. }) => {
            debug!("Repository link target missing: {}", lookup);
            Err(ValidationError::new("Invalid link to repository!", "invalid_link"))
        }
        Err(e) => Err(ValidationError::new(
            format!("Invalid link to repository! ({})", e),
            "invalid_link",
        )),
    }
}
