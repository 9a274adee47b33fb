/*!
 * Small helpers shared by the managers, validators and file adapters.
 */

use sha2::{Digest, Sha256};

/// Separator used to join plural forms into a single string
pub const PLURAL_SEPARATOR: &str = "\x1e\x1e";

/// Prefix of repository URLs that point at another subproject
pub const REPO_LINK_PREFIX: &str = "weblate://";

/// Compute the checksum identifying a message by its source and context.
///
/// The same string with the same context hashes identically in every
/// translation of a project, which is what lets suggestions, checks and
/// comments be joined by checksum.
pub fn msg_checksum(source: &str, context: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(context.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compute SHA256 hash of arbitrary content (used for file revisions)
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Join plural forms the way they are stored in the database
pub fn join_plural(forms: &[String]) -> String {
    forms.join(PLURAL_SEPARATOR)
}

/// Split a stored string back into its plural forms
pub fn split_plural(text: &str) -> Vec<&str> {
    text.split(PLURAL_SEPARATOR).collect()
}

/// Check whether a repository string is a link to another subproject
pub fn is_repo_link(val: &str) -> bool {
    val.starts_with(REPO_LINK_PREFIX)
}

/// Split a repository link into `(project slug, subproject slug)`
pub fn parse_repo_link(val: &str) -> Option<(&str, &str)> {
    let rest = val.strip_prefix(REPO_LINK_PREFIX)?;
    rest.split_once('/')
}
