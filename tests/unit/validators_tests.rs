/*!
 * Tests for subproject field validators
 */

use weblate_trans::validators::{validate_commit_message, validate_filemask, validate_repo, validate_repoweb};

use crate::common::{create_subproject, managers};

#[test]
fn test_validateRepoweb_withUnknownKey_shouldNameKey() {
    let err = validate_repoweb("https://example.com/%(path)s").unwrap_err();
    assert_eq!(err.message, "Bad format string ('path')");
    assert_eq!(err.code, "bad_format");
}

#[test]
fn test_validateRepoweb_withoutPlaceholders_shouldPass() {
    assert!(validate_repoweb("https://example.com/browse").is_ok());
}

#[test]
fn test_validateCommitMessage_withAllKeys_shouldPass() {
    let message = "Translated using Weblate (%(language_name)s)\n\n\
        Currently translated at %(translated_percent)s%% (%(translated)s of %(total)s strings)";
    assert!(validate_commit_message(message).is_ok());
}

#[test]
fn test_validateCommitMessage_withNumberFormatOnString_shouldFail() {
    let err = validate_commit_message("%(language)d").unwrap_err();
    assert!(err.message.starts_with("Bad format string ("));
}

#[test]
fn test_validateFilemask_withoutWildcard_shouldFail() {
    let err = validate_filemask("po/cs.po").unwrap_err();
    assert_eq!(err.message, "File mask does not contain * as a language placeholder!");
    assert!(validate_filemask("po/*.po").is_ok());
}

#[test]
fn test_validateRepo_withPlainUrl_shouldPass() {
    let managers = managers();
    assert!(validate_repo("git://github.com/nijel/weblate.git", &managers.subprojects).is_ok());
}

#[test]
fn test_validateRepo_withLinkToExisting_shouldPass() {
    let managers = managers();
    create_subproject(&managers, "weblate", "master");
    assert!(validate_repo("weblate://weblate/master", &managers.subprojects).is_ok());
}

#[test]
fn test_validateRepo_withLinkToMissing_shouldFail() {
    let managers = managers();
    let err = validate_repo("weblate://weblate/missing", &managers.subprojects).unwrap_err();
    assert_eq!(err.message, "Invalid link to repository!");

    let err = validate_repo("weblate://no-slash", &managers.subprojects).unwrap_err();
    assert_eq!(err.message, "Invalid link to repository!");
}

#[test]
fn test_validateRepo_withLinkToLink_shouldFail() {
    let managers = managers();
    let master = create_subproject(&managers, "weblate", "master");
    let project = managers.projects.get_by_slug("weblate").unwrap();

    let linked = weblate_trans::database::SubProjectRecord::new(
        &project,
        "linked",
        "linked",
        &format!("weblate://weblate/{}", master.slug),
        "po/*.po",
    );
    managers.create_subproject(&linked).unwrap();

    let err = validate_repo("weblate://weblate/linked", &managers.subprojects).unwrap_err();
    assert_eq!(err.message, "Can not link to linked repository!");
}
