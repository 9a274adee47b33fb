/*!
 * Full-text search, similar messages and the offloaded index queue
 */

use std::collections::HashSet;

use weblate_trans::app_config::Config;
use weblate_trans::database::{TranslationRecord, UnitRecord};
use weblate_trans::managers::{Managers, SearchFields};
use weblate_trans::util::msg_checksum;

use crate::common::{
    create_checkout, create_subproject, create_temp_dir, create_test_file, import, managers, managers_with,
};

fn unit(managers: &Managers, translation: &TranslationRecord, source: &str) -> UnitRecord {
    managers
        .units
        .for_translation(translation)
        .fetch()
        .unwrap()
        .into_iter()
        .find(|u| u.source == source)
        .unwrap()
}

fn checksums(sources: &[&str]) -> HashSet<String> {
    sources.iter().map(|s| msg_checksum(s, "")).collect()
}

#[test]
fn test_search_inSource_shouldFindImportedUnits() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    import(&managers, &subproject, checkout.path(), "cs");

    let hits = managers
        .units
        .search("document", SearchFields::source_only(), "cs")
        .unwrap();
    assert_eq!(
        hits,
        checksums(&["Open the document", "Save the document", "Close the document window"])
    );
}

#[test]
fn test_search_inTarget_shouldUseLanguageIndex() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    import(&managers, &subproject, checkout.path(), "cs");
    import(&managers, &subproject, checkout.path(), "de");

    let target_only = SearchFields {
        source: false,
        context: false,
        target: true,
    };
    assert_eq!(
        managers.units.search("dokument", target_only, "cs").unwrap(),
        checksums(&["Open the document", "Save the document"])
    );
    assert!(managers.units.search("uložit", target_only, "de").unwrap().is_empty());
    assert_eq!(
        managers.units.search("DOKUMENT", target_only, "de").unwrap(),
        checksums(&["Open the document"])
    );
}

#[test]
fn test_searchUnits_shouldScopeToTranslation() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let cs = import(&managers, &subproject, checkout.path(), "cs");
    let de = import(&managers, &subproject, checkout.path(), "de");

    let cs_hits = managers
        .units
        .search_units(&cs, "document", SearchFields::all())
        .unwrap();
    assert_eq!(cs_hits.count().unwrap(), 3);

    let de_hits = managers
        .units
        .search_units(&de, "document", SearchFields::all())
        .unwrap()
        .fetch()
        .unwrap();
    assert_eq!(de_hits.len(), 1);
    assert_eq!(de_hits[0].target, "Dokument öffnen");
}

#[test]
fn test_similar_shouldReturnTranslatedNeighbours() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let cs = import(&managers, &subproject, checkout.path(), "cs");
    import(&managers, &subproject, checkout.path(), "de");

    let close = unit(&managers, &cs, "Close the document window");
    let similar: Vec<String> = managers
        .units
        .similar(&close)
        .unwrap()
        .fetch()
        .unwrap()
        .into_iter()
        .map(|u| u.target)
        .collect();

    // The unit itself has no translation and other languages are excluded
    assert_eq!(similar, vec!["Otevřít dokument", "Uložit dokument"]);
}

#[test]
fn test_similar_shouldExcludeIdenticalTranslations() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let cs = import(&managers, &subproject, checkout.path(), "cs");

    let open = unit(&managers, &cs, "Open the document");
    let similar: Vec<String> = managers
        .units
        .similar(&open)
        .unwrap()
        .fetch()
        .unwrap()
        .into_iter()
        .map(|u| u.source)
        .collect();
    assert_eq!(similar, vec!["Save the document"]);
}

#[test]
fn test_similar_shouldIgnoreOtherProjects() {
    let managers = managers();
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let cs = import(&managers, &subproject, checkout.path(), "cs");

    // Same messages in another project, all of them translated
    let other_checkout = create_temp_dir().unwrap();
    create_test_file(
        other_checkout.path(),
        "po/cs.po",
        "msgid \"Close the document window\"\nmsgstr \"Zavřít okno dokumentu\"\n\n\
         msgid \"Print the document\"\nmsgstr \"Vytisknout dokument\"\n",
    )
    .unwrap();
    let other = create_subproject(&managers, "other", "app");
    let other_cs = import(&managers, &other, other_checkout.path(), "cs");
    assert_eq!(other_cs.translated, 2);

    let close = unit(&managers, &cs, "Close the document window");
    let similar = managers.units.similar(&close).unwrap().fetch().unwrap();

    assert!(similar.iter().all(|u| u.translation_id == cs.id));
    let targets: Vec<&str> = similar.iter().map(|u| u.target.as_str()).collect();
    assert_eq!(targets, vec!["Otevřít dokument", "Uložit dokument"]);
}

#[test]
fn test_offloadedIndexing_shouldQueueUntilProcessed() {
    let mut config = Config::default();
    config.offload_indexing = true;
    let managers = managers_with(&config);
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    import(&managers, &subproject, checkout.path(), "cs");

    assert_eq!(managers.queue.pending().unwrap(), 5);
    assert!(managers
        .units
        .search("document", SearchFields::source_only(), "cs")
        .unwrap()
        .is_empty());

    assert_eq!(managers.units.process_index_queue(2).unwrap(), 2);
    assert_eq!(managers.queue.pending().unwrap(), 3);
    assert_eq!(managers.units.process_index_queue(100).unwrap(), 3);
    assert_eq!(managers.queue.pending().unwrap(), 0);
    assert_eq!(managers.units.process_index_queue(100).unwrap(), 0);

    let hits = managers
        .units
        .search("document", SearchFields::all(), "cs")
        .unwrap();
    assert_eq!(hits.len(), 3);
}

#[test]
fn test_addToIndex_withOffloading_shouldDeduplicate() {
    let mut config = Config::default();
    config.offload_indexing = true;
    let managers = managers_with(&config);
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let cs = import(&managers, &subproject, checkout.path(), "cs");

    let hello = unit(&managers, &cs, "Hello, world!");
    managers.units.add_to_index(&hello, true).unwrap();
    managers.units.add_to_index(&hello, false).unwrap();
    managers.units.add_to_index(&hello, false).unwrap();

    assert_eq!(managers.queue.pending().unwrap(), 6);
}

#[test]
fn test_processIndexQueue_withDeletedUnit_shouldDropUpdate() {
    let mut config = Config::default();
    config.offload_indexing = true;
    let managers = managers_with(&config);
    let checkout = create_checkout();
    let subproject = create_subproject(&managers, "demo", "app");
    let cs = import(&managers, &subproject, checkout.path(), "cs");

    managers
        .units
        .for_translation(&cs)
        .filter(weblate_trans::query::Condition::eq(
            "u.checksum",
            msg_checksum("Hello, world!", ""),
        ))
        .delete()
        .unwrap();

    // Queue rows of deleted units go away with them
    assert_eq!(managers.queue.pending().unwrap(), 4);
    assert_eq!(managers.units.process_index_queue(100).unwrap(), 4);
}
