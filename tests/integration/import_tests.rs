/*!
 * Importing translation files and unit synchronization
 */

use weblate_trans::database::{ProjectRecord, SubProjectRecord, UnitRecord};
use weblate_trans::formats::{FileFormat, TranslationStore};
use weblate_trans::query::Condition;
use weblate_trans::util::msg_checksum;

use crate::common::{create_checkout, create_subproject, create_temp_dir, create_test_file, import, managers, CS_PO};

#[test]
fn test_updateFromFile_withNewFile_shouldCreateUnitsAndStats() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");

    let summary = managers
        .translations
        .update_from_file(&subproject, checkout.path(), "cs", "po/cs.po", false)
        .unwrap();

    assert!(!summary.skipped);
    assert_eq!(summary.created, 5);
    let translation = summary.translation;
    assert_eq!(translation.language_code, "cs");
    assert_eq!(translation.filename, "po/cs.po");
    assert_eq!(translation.total, 5);
    assert_eq!(translation.translated, 3);
    assert_eq!(translation.fuzzy, 1);
    assert!((translation.translated_percent() - 60.0).abs() < 0.01);

    let units = managers.units.for_translation(&translation).fetch().unwrap();
    let positions: Vec<i64> = units.iter().map(|u| u.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    assert_eq!(units[1].comment, "Window title");
    assert_eq!(units[1].location, "main.c:12");
    assert!(units[4].is_plural());
}

#[test]
fn test_updateFromFile_shouldCreateLanguageWithName() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    import(&managers, &subproject, checkout.path(), "cs");

    let language = managers.repository.get_or_create_language("cs").unwrap();
    assert_eq!(language.name, "Czech");
}

#[test]
fn test_updateFromFile_withUnchangedFile_shouldSkip() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    import(&managers, &subproject, checkout.path(), "cs");

    let again = managers
        .translations
        .update_from_file(&subproject, checkout.path(), "cs", "po/cs.po", false)
        .unwrap();
    assert!(again.skipped);

    let forced = managers
        .translations
        .update_from_file(&subproject, checkout.path(), "cs", "po/cs.po", true)
        .unwrap();
    assert!(!forced.skipped);
    assert_eq!((forced.created, forced.updated, forced.deleted), (0, 0, 0));
}

#[test]
fn test_updateFromFile_withEditedFile_shouldUpdateAndDeleteStale() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    import(&managers, &subproject, checkout.path(), "cs");

    let edited = CS_PO
        .replace("msgstr \"Ahoj světe!\"", "msgstr \"Nazdar světe!\"")
        .replace(
            "#: main.c:30\nmsgid \"Close the document window\"\nmsgstr \"\"\n",
            "",
        );
    create_test_file(checkout.path(), "po/cs.po", &edited).unwrap();

    let summary = managers
        .translations
        .update_from_file(&subproject, checkout.path(), "cs", "po/cs.po", false)
        .unwrap();
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.created, 0);
    // Changed target plus the shifted position of the plural
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.translation.total, 4);

    let hello = managers
        .units
        .for_translation(&summary.translation)
        .filter(Condition::eq("u.checksum", msg_checksum("Hello, world!", "")))
        .get()
        .unwrap();
    assert_eq!(hello.target, "Nazdar světe!");
}

#[test]
fn test_updateFromUnit_withExistingUnchangedUnit_shouldNotReportCreated() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let translation = import(&managers, &subproject, checkout.path(), "cs");

    let store = TranslationStore::parse(CS_PO, FileFormat::Po).unwrap();
    let (unit, created) = managers
        .units
        .update_from_unit(&translation, store.units[1].as_ref(), 1, None)
        .unwrap();
    assert!(!created);
    assert_eq!(unit.source, "Hello, world!");
}

#[test]
fn test_updateFromUnit_withDuplicateRows_shouldRecreateSingleRow() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let translation = import(&managers, &subproject, checkout.path(), "cs");

    let mut duplicate = UnitRecord::new(&translation, "Hello, world!", "");
    managers.repository.save_unit(&mut duplicate).unwrap();
    let checksum = Condition::eq("u.checksum", msg_checksum("Hello, world!", ""));
    let matching = managers.units.for_translation(&translation).filter(checksum);
    assert_eq!(matching.count().unwrap(), 2);

    let store = TranslationStore::parse(CS_PO, FileFormat::Po).unwrap();
    let (unit, created) = managers
        .units
        .update_from_unit(&translation, store.units[1].as_ref(), 1, None)
        .unwrap();

    assert!(created);
    assert_eq!(unit.target, "Ahoj světe!");
    assert_eq!(matching.count().unwrap(), 1);
}

#[test]
fn test_scanSubproject_shouldImportEveryMatchingFile() {
    let managers = managers();
    let checkout = create_checkout();
    create_test_file(checkout.path(), "po/README.txt", "not a translation").unwrap();
    create_test_file(checkout.path(), "po/extra/cs.po", CS_PO).unwrap();
    let subproject = create_subproject(&managers, "demo", "app");

    let summaries = managers
        .translations
        .scan_subproject(&subproject, checkout.path(), false)
        .unwrap();

    let codes: Vec<String> = summaries
        .iter()
        .map(|s| s.translation.language_code.clone())
        .collect();
    assert_eq!(codes, vec!["cs", "de"]);
    assert_eq!(managers.translations.enabled().count().unwrap(), 2);
}

#[test]
fn test_enabled_shouldSkipDisabledTranslations() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let cs = import(&managers, &subproject, checkout.path(), "cs");
    import(&managers, &subproject, checkout.path(), "de");

    managers.repository.set_translation_enabled(cs.id, false).unwrap();
    let enabled = managers.translations.enabled().fetch().unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].language_code, "de");
}

#[test]
fn test_updateFromFile_withTemplate_shouldDriveUnitsByContext() {
    let managers = managers();
    let project = managers
        .create_project(&ProjectRecord::new("Demo", "demo"))
        .unwrap();

    let checkout = create_temp_dir().unwrap();
    create_test_file(
        checkout.path(),
        "locales/en.json",
        r#"{"menu": {"open": "Open", "close": "Close"}, "title": "Editor"}"#,
    )
    .unwrap();
    create_test_file(checkout.path(), "locales/cs.json", r#"{"menu": {"open": "Otevřít"}}"#).unwrap();

    let mut subproject = SubProjectRecord::new(
        &project,
        "Mono",
        "mono",
        "https://example.com/mono.git",
        "locales/*.json",
    );
    subproject.template = "locales/en.json".to_string();
    let subproject = managers.create_subproject(&subproject).unwrap();

    let summaries = managers
        .translations
        .scan_subproject(&subproject, checkout.path(), false)
        .unwrap();
    assert_eq!(summaries.len(), 1);

    let translation = &summaries[0].translation;
    assert_eq!(translation.total, 3);
    assert_eq!(translation.translated, 1);

    let units = managers.units.for_translation(translation).fetch().unwrap();
    let open = units.iter().find(|u| u.context == "menu.open").unwrap();
    assert_eq!(open.source, "Open");
    assert_eq!(open.target, "Otevřít");
    assert_eq!(open.checksum, msg_checksum("Open", "menu.open"));

    let title = units.iter().find(|u| u.context == "title").unwrap();
    assert_eq!(title.source, "Editor");
    assert!(title.target.is_empty());
    assert!(!title.translated);

    // Changing only the template still triggers a reload
    create_test_file(
        checkout.path(),
        "locales/en.json",
        r#"{"menu": {"open": "Open", "close": "Close"}}"#,
    )
    .unwrap();
    let summary = managers
        .translations
        .update_from_file(&subproject, checkout.path(), "cs", "locales/cs.json", false)
        .unwrap();
    assert!(!summary.skipped);
    assert_eq!(summary.deleted, 1);
}
