/*!
 * Tests for the full-text index facade and text analysis
 */

use std::collections::HashSet;

use weblate_trans::fulltext::terms::{analyze, bo1_weight, combinations, top_terms, IGNORE_SIMILAR};
use weblate_trans::fulltext::{Document, FulltextIndex};

fn index_with_targets(language: &str, docs: &[(&str, &str)]) -> FulltextIndex {
    let index = FulltextIndex::in_memory().unwrap();
    {
        let mut writer = index.target_writer(language).unwrap();
        for (checksum, target) in docs {
            writer
                .update_document(&Document::Target { checksum, target })
                .unwrap();
        }
        assert_eq!(writer.commit().unwrap(), docs.len());
    }
    index
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_search_withPhrase_shouldRequireAdjacentWords() {
    let index = index_with_targets(
        "de",
        &[("a", "Datei speichern unter"), ("b", "unter der Datei speichern")],
    );
    let searcher = index.target_searcher("de").unwrap();

    assert_eq!(searcher.search("target", "\"speichern unter\"").unwrap(), set(&["a"]));
    assert_eq!(searcher.search("target", "speichern unter").unwrap(), set(&["a", "b"]));
}

#[test]
fn test_search_withOperators_shouldCombine() {
    let index = index_with_targets(
        "de",
        &[("a", "Datei öffnen"), ("b", "Fenster öffnen"), ("c", "Datei schließen")],
    );
    let searcher = index.target_searcher("de").unwrap();

    assert_eq!(searcher.search("target", "Fenster OR schließen").unwrap(), set(&["b", "c"]));
    assert_eq!(searcher.search("target", "öffnen NOT Datei").unwrap(), set(&["b"]));
}

#[test]
fn test_search_shouldBeCaseInsensitiveAndKeepDiacritics() {
    let index = index_with_targets("cs", &[("a", "Otevřít SOUBOR")]);
    let searcher = index.target_searcher("cs").unwrap();

    assert_eq!(searcher.search("target", "soubor").unwrap(), set(&["a"]));
    assert_eq!(searcher.search("target", "otevřít").unwrap(), set(&["a"]));
    assert!(searcher.search("target", "otevrit").unwrap().is_empty());
}

#[test]
fn test_searcher_forUnwrittenLanguage_shouldBeEmpty() {
    let index = FulltextIndex::in_memory().unwrap();
    let searcher = index.target_searcher("fr").unwrap();
    assert_eq!(searcher.doc_count().unwrap(), 0);
    assert!(searcher.search("target", "bonjour").unwrap().is_empty());
    assert!(searcher.key_terms("target", "bonjour", 5).unwrap().is_empty());
}

#[test]
fn test_deleteDocument_shouldRemoveFromResults() {
    let index = index_with_targets("de", &[("a", "Datei"), ("b", "Datei")]);
    {
        let mut writer = index.target_writer("de").unwrap();
        writer.delete_document("a").unwrap();
        writer.commit().unwrap();
    }
    let searcher = index.target_searcher("de").unwrap();
    assert_eq!(searcher.search("target", "datei").unwrap(), set(&["b"]));
}

#[test]
fn test_analyze_shouldDropStopWordsAndSingleLetters() {
    assert_eq!(
        analyze("Open the file, and a window!"),
        vec!["open", "file", "window"]
    );
}

#[test]
fn test_ignoreSimilar_shouldExtendStopWords() {
    assert!(IGNORE_SIMILAR.contains("the"));
    assert!(IGNORE_SIMILAR.contains("href"));
}

#[test]
fn test_bo1Weight_shouldFavorRareTerms() {
    let rare = bo1_weight(1, 1, 100);
    let common = bo1_weight(1, 90, 100);
    assert!(rare > common);
    assert_eq!(bo1_weight(1, 0, 100), 0.0);
}

#[test]
fn test_topTerms_shouldSortByScoreThenName() {
    let ranked = top_terms(
        vec![
            ("beta".to_string(), 1.0),
            ("alpha".to_string(), 1.0),
            ("gamma".to_string(), 3.0),
        ],
        2,
    );
    let names: Vec<&str> = ranked.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(names, vec!["gamma", "alpha"]);
}

#[test]
fn test_combinations_shouldEnumerateSubsetsInOrder() {
    let items = ["a", "b", "c"];
    assert_eq!(
        combinations(&items, 2),
        vec![vec!["a", "b"], vec!["a", "c"], vec!["b", "c"]]
    );
    assert_eq!(combinations(&items, 3).len(), 1);
    assert!(combinations(&items, 0).is_empty());
    assert!(combinations(&items, 4).is_empty());
}
