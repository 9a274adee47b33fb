/*!
 * Glossary upload and lookups, change history
 */

use weblate_trans::database::models::ChangeAction;
use weblate_trans::database::User;
use weblate_trans::formats::{FileFormat, TranslationStore};

use crate::common::{create_checkout, create_subproject, create_temp_dir, create_test_file, import, managers};

const GLOSSARY: &str = r#"msgid ""
msgstr ""
"Language: cs\n"

msgid "document"
msgstr "dokument"

msgid "Window"
msgstr "okno"

#, fuzzy
msgid "file"
msgstr "soubor"

msgid "folder"
msgstr ""
"#;

fn glossary(content: &str) -> TranslationStore {
    TranslationStore::parse(content, FileFormat::Po).unwrap()
}

#[test]
fn test_upload_shouldTakeOnlyTranslatedEntries() {
    let managers = managers();
    let subproject = create_subproject(&managers, "demo", "app");
    let project = managers.projects.get_by_slug("demo").unwrap();
    assert_eq!(subproject.project_id, project.id);
    let cs = managers.repository.get_or_create_language("cs").unwrap();

    let written = managers
        .dictionary
        .upload(&project, &cs, &glossary(GLOSSARY), false)
        .unwrap();
    assert_eq!(written, 2);

    let words: Vec<(String, String)> = managers
        .dictionary
        .for_language(project.id, cs.id)
        .fetch()
        .unwrap()
        .into_iter()
        .map(|d| (d.source, d.target))
        .collect();
    assert_eq!(
        words,
        vec![
            ("Window".to_string(), "okno".to_string()),
            ("document".to_string(), "dokument".to_string()),
        ]
    );
}

#[test]
fn test_upload_withExistingWords_shouldHonorOverwrite() {
    let managers = managers();
    create_subproject(&managers, "demo", "app");
    let project = managers.projects.get_by_slug("demo").unwrap();
    let cs = managers.repository.get_or_create_language("cs").unwrap();
    managers
        .dictionary
        .upload(&project, &cs, &glossary(GLOSSARY), false)
        .unwrap();

    let updated = GLOSSARY.replace("msgstr \"okno\"", "msgstr \"okénko\"");
    let skipped = managers
        .dictionary
        .upload(&project, &cs, &glossary(&updated), false)
        .unwrap();
    assert_eq!(skipped, 0);

    let written = managers
        .dictionary
        .upload(&project, &cs, &glossary(&updated), true)
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(managers.dictionary.all().count().unwrap(), 2);

    let window = managers
        .dictionary
        .all()
        .fetch()
        .unwrap()
        .into_iter()
        .find(|d| d.source == "Window")
        .unwrap();
    assert_eq!(window.target, "okénko");
}

#[test]
fn test_upload_withLongEntries_shouldSkipThem() {
    let managers = managers();
    create_subproject(&managers, "demo", "app");
    let project = managers.projects.get_by_slug("demo").unwrap();
    let cs = managers.repository.get_or_create_language("cs").unwrap();

    // 200 characters is still fine, multi-byte characters count once
    let limit = "ž".repeat(200);
    let too_long = "x".repeat(201);
    let content = format!(
        "msgid \"limit\"\nmsgstr \"{}\"\n\nmsgid \"{}\"\nmsgstr \"long\"\n\nmsgid \"short\"\nmsgstr \"{}\"\n",
        limit, too_long, too_long
    );

    let written = managers
        .dictionary
        .upload(&project, &cs, &glossary(&content), false)
        .unwrap();
    assert_eq!(written, 1);
}

#[test]
fn test_getWords_shouldMatchWordsOfSourceIgnoringCase() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let translation = import(&managers, &subproject, checkout.path(), "cs");
    let project = managers.projects.get_by_slug("demo").unwrap();
    let cs = managers.repository.get_or_create_language("cs").unwrap();
    let de = managers.repository.get_or_create_language("de").unwrap();

    managers
        .dictionary
        .upload(&project, &cs, &glossary(GLOSSARY), false)
        .unwrap();
    managers
        .dictionary
        .upload(&project, &de, &glossary(GLOSSARY), false)
        .unwrap();

    let close = managers
        .units
        .for_translation(&translation)
        .fetch()
        .unwrap()
        .into_iter()
        .find(|u| u.source == "Close the document window")
        .unwrap();

    let words: Vec<String> = managers
        .dictionary
        .get_words(&close)
        .fetch()
        .unwrap()
        .into_iter()
        .map(|d| d.target)
        .collect();
    assert_eq!(words, vec!["okno", "dokument"]);
}

#[test]
fn test_getWords_withNonAsciiUppercase_shouldMatch() {
    let managers = managers();
    let checkout = create_temp_dir().unwrap();
    create_test_file(
        checkout.path(),
        "po/cs.po",
        "msgid \"Über the window\"\nmsgstr \"\"\n",
    )
    .unwrap();
    let subproject = create_subproject(&managers, "demo", "app");
    let translation = import(&managers, &subproject, checkout.path(), "cs");
    let project = managers.projects.get_by_slug("demo").unwrap();
    let cs = managers.repository.get_or_create_language("cs").unwrap();

    let glossary_po = "msgid \"Über\"\nmsgstr \"přes\"\n\nmsgid \"Window\"\nmsgstr \"okno\"\n";
    managers
        .dictionary
        .upload(&project, &cs, &glossary(glossary_po), false)
        .unwrap();

    let unit = managers.units.for_translation(&translation).get().unwrap();
    let words: Vec<String> = managers
        .dictionary
        .get_words(&unit)
        .fetch()
        .unwrap()
        .into_iter()
        .map(|d| d.source)
        .collect();
    assert_eq!(words, vec!["Window", "Über"]);
}

#[test]
fn test_changesContent_shouldKeepUserEdits() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let cs = import(&managers, &subproject, checkout.path(), "cs");
    let de = import(&managers, &subproject, checkout.path(), "de");
    let repo = &managers.repository;
    let joe = User::new("joe");

    repo.record_change(cs.id, None, &joe, ChangeAction::Change).unwrap();
    repo.record_change(cs.id, None, &joe, ChangeAction::New).unwrap();
    repo.record_change(cs.id, None, &joe, ChangeAction::Comment).unwrap();
    repo.record_change(cs.id, None, &User::anonymous(), ChangeAction::New).unwrap();
    repo.record_change(de.id, None, &joe, ChangeAction::Change).unwrap();

    let content = managers.changes.content().fetch().unwrap();
    assert_eq!(content.len(), 3);
    assert!(content.iter().all(|c| c.username.as_deref() == Some("joe")));
    assert!(content
        .iter()
        .all(|c| matches!(c.action, ChangeAction::Change | ChangeAction::New)));

    assert_eq!(managers.changes.for_translation(&cs).count().unwrap(), 4);
    assert_eq!(managers.changes.all().count().unwrap(), 5);
}
