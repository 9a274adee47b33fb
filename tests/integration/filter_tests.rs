/*!
 * Unit filters by request type, cached counters and review listings
 */

use std::sync::Arc;

use chrono::{Duration, Utc};
use weblate_trans::app_config::Config;
use weblate_trans::cache::MemoryCache;
use weblate_trans::checks::{CheckDescriptor, CheckRegistry};
use weblate_trans::database::models::ChangeAction;
use weblate_trans::database::{DatabaseConnection, TranslationRecord, UnitRecord, User};
use weblate_trans::fulltext::FulltextIndex;
use weblate_trans::managers::{Managers, RequestType, UnitManager};

use crate::common::{create_checkout, create_subproject, import, managers_with};

fn registry() -> CheckRegistry {
    CheckRegistry::empty()
        .with(CheckDescriptor::target("same", "Not translated"))
        .with(CheckDescriptor::source("optional_plural", "Optional plural"))
        .with(CheckDescriptor::both("inconsistent", "Inconsistent"))
}

struct Fixture {
    managers: Managers,
    cs: TranslationRecord,
    de: TranslationRecord,
    _checkout: tempfile::TempDir,
}

impl Fixture {
    fn new(config: &Config) -> Self {
        let managers = Managers::new(
            DatabaseConnection::new_in_memory().unwrap(),
            Arc::new(MemoryCache::new(config.cache.enabled, config.cache.default_ttl())),
            Arc::new(FulltextIndex::in_memory().unwrap()),
            Arc::new(registry()),
            config,
        );
        let checkout = create_checkout();
        let subproject = create_subproject(&managers, "demo", "app");
        let cs = import(&managers, &subproject, checkout.path(), "cs");
        let de = import(&managers, &subproject, checkout.path(), "de");
        Self {
            managers,
            cs,
            de,
            _checkout: checkout,
        }
    }

    fn unit(&self, translation: &TranslationRecord, source: &str) -> UnitRecord {
        self.managers
            .units
            .for_translation(translation)
            .fetch()
            .unwrap()
            .into_iter()
            .find(|u| u.source.starts_with(source))
            .unwrap()
    }

    fn sources(&self, rqtype: &str, translation: &TranslationRecord) -> Vec<String> {
        let rqtype = RequestType::parse(rqtype, self.managers.units.checks());
        self.managers
            .units
            .filter_type(&rqtype, translation)
            .fetch()
            .unwrap()
            .into_iter()
            .map(|u| u.source)
            .collect()
    }
}

#[test]
fn test_requestTypeParse_shouldMapKnownNames() {
    let checks = registry();
    assert_eq!(RequestType::parse("fuzzy", &checks), RequestType::Fuzzy);
    assert_eq!(RequestType::parse("sourcecomments", &checks), RequestType::SourceComments);
    assert_eq!(
        RequestType::parse("same", &checks),
        RequestType::Check("same".to_string())
    );
    assert_eq!(RequestType::parse("bogus", &checks), RequestType::All);
    assert_eq!(RequestType::Check("same".to_string()).to_string(), "same");
}

#[test]
fn test_filterType_withStateFilters_shouldMatchFlags() {
    let fx = Fixture::new(&Config::default());

    assert_eq!(fx.sources("fuzzy", &fx.cs), vec!["Save the document"]);
    assert_eq!(
        fx.sources("untranslated", &fx.cs),
        vec!["Save the document", "Close the document window"]
    );
    assert_eq!(fx.sources("all", &fx.cs).len(), 5);
    assert_eq!(fx.sources("unknown-type", &fx.cs).len(), 5);
}

#[test]
fn test_filterType_suggestions_shouldBeScopedToLanguage() {
    let fx = Fixture::new(&Config::default());
    let hello_de = fx.unit(&fx.de, "Hello");
    fx.managers
        .repository
        .add_suggestion(&hello_de, "Servus Welt!", &User::new("joe"))
        .unwrap();

    assert_eq!(fx.sources("suggestions", &fx.de), vec!["Hello, world!"]);
    assert!(fx.sources("suggestions", &fx.cs).is_empty());
}

#[test]
fn test_filterType_comments_shouldSeparateSourceAndTarget() {
    let fx = Fixture::new(&Config::default());
    let joe = User::new("joe");
    let open_de = fx.unit(&fx.de, "Open");
    let hello_cs = fx.unit(&fx.cs, "Hello");

    fx.managers.repository.add_comment(&open_de, "Ambiguous verb", &joe, true).unwrap();
    fx.managers.repository.add_comment(&hello_cs, "Too informal", &joe, false).unwrap();

    // Source comments are shared by every language of the project
    assert_eq!(fx.sources("sourcecomments", &fx.cs), vec!["Open the document"]);
    assert_eq!(fx.sources("sourcecomments", &fx.de), vec!["Open the document"]);
    assert_eq!(fx.sources("targetcomments", &fx.cs), vec!["Hello, world!"]);
    assert!(fx.sources("targetcomments", &fx.de).is_empty());
}

#[test]
fn test_filterType_targetCheck_shouldRequireTranslated() {
    let fx = Fixture::new(&Config::default());
    let repo = &fx.managers.repository;
    repo.add_check(&fx.unit(&fx.cs, "Hello"), "same", false, false).unwrap();
    repo.add_check(&fx.unit(&fx.cs, "Save"), "same", false, false).unwrap();
    repo.add_check(&fx.unit(&fx.cs, "Open"), "same", false, true).unwrap();

    assert_eq!(fx.sources("same", &fx.cs), vec!["Hello, world!"]);
    assert_eq!(fx.sources("allchecks", &fx.cs), vec!["Hello, world!"]);
    assert!(fx.sources("same", &fx.de).is_empty());
}

#[test]
fn test_filterType_sourceCheck_shouldIgnoreTranslationState() {
    let fx = Fixture::new(&Config::default());
    let close = fx.unit(&fx.cs, "Close");
    fx.managers
        .repository
        .add_check(&close, "optional_plural", true, false)
        .unwrap();

    assert_eq!(fx.sources("optional_plural", &fx.cs), vec!["Close the document window"]);
    assert_eq!(fx.sources("sourcechecks", &fx.cs), vec!["Close the document window"]);
    assert!(fx.sources("allchecks", &fx.cs).is_empty());
}

#[test]
fn test_filterType_checkForBoth_shouldMatchLanguageOrSource() {
    let fx = Fixture::new(&Config::default());
    let repo = &fx.managers.repository;
    repo.add_check(&fx.unit(&fx.cs, "Save"), "inconsistent", false, false).unwrap();
    repo.add_check(&fx.unit(&fx.de, "Hello"), "inconsistent", true, false).unwrap();
    repo.add_check(&fx.unit(&fx.de, "Open"), "inconsistent", false, false).unwrap();

    assert_eq!(
        fx.sources("inconsistent", &fx.cs),
        vec!["Hello, world!", "Save the document"]
    );
}

#[test]
fn test_countType_shouldUseAggregatesAndCache() {
    let fx = Fixture::new(&Config::default());
    let units = &fx.managers.units;

    assert_eq!(units.count_type(&RequestType::All, &fx.cs).unwrap(), 5);
    assert_eq!(units.count_type(&RequestType::Fuzzy, &fx.cs).unwrap(), 1);
    assert_eq!(units.count_type(&RequestType::Untranslated, &fx.cs).unwrap(), 2);

    let hello = fx.unit(&fx.cs, "Hello");
    let joe = User::new("joe");
    fx.managers.repository.add_suggestion(&hello, "Čau", &joe).unwrap();
    assert_eq!(units.count_type(&RequestType::Suggestions, &fx.cs).unwrap(), 1);

    // Served from the cache until the entry expires
    let open = fx.unit(&fx.cs, "Open");
    fx.managers.repository.add_suggestion(&open, "Otevři", &joe).unwrap();
    assert_eq!(units.count_type(&RequestType::Suggestions, &fx.cs).unwrap(), 1);
}

#[test]
fn test_countType_withDisabledCache_shouldRecount() {
    let mut config = Config::default();
    config.cache.enabled = false;
    let fx = Fixture::new(&config);
    let units = &fx.managers.units;
    let joe = User::new("joe");

    fx.managers.repository.add_suggestion(&fx.unit(&fx.cs, "Hello"), "Čau", &joe).unwrap();
    assert_eq!(units.count_type(&RequestType::Suggestions, &fx.cs).unwrap(), 1);
    fx.managers.repository.add_suggestion(&fx.unit(&fx.cs, "Open"), "Otevři", &joe).unwrap();
    assert_eq!(units.count_type(&RequestType::Suggestions, &fx.cs).unwrap(), 2);
}

#[test]
fn test_countCacheKey_shouldIncludeSlugLanguageAndType() {
    let fx = Fixture::new(&Config::default());
    assert_eq!(
        UnitManager::count_cache_key(&RequestType::Suggestions, &fx.cs),
        "counts-demo__app-cs-suggestions"
    );
}

#[test]
fn test_review_shouldListChangesByOtherUsers() {
    let fx = Fixture::new(&Config::default());
    let repo = &fx.managers.repository;
    let alice = User::new("alice");
    let bob = User::new("bob");

    let hello = fx.unit(&fx.cs, "Hello");
    let open = fx.unit(&fx.cs, "Open");
    let save = fx.unit(&fx.cs, "Save");
    repo.record_change(fx.cs.id, Some(&hello), &alice, ChangeAction::Change).unwrap();
    repo.record_change(fx.cs.id, Some(&open), &bob, ChangeAction::Change).unwrap();
    repo.record_change(fx.cs.id, Some(&save), &User::anonymous(), ChangeAction::Update).unwrap();

    let since = Utc::now() - Duration::hours(1);
    let reviewed: Vec<String> = fx
        .managers
        .units
        .review(&fx.cs, since, &bob)
        .fetch()
        .unwrap()
        .into_iter()
        .map(|u| u.source)
        .collect();
    assert_eq!(reviewed, vec!["Hello, world!", "Save the document"]);

    let future = Utc::now() + Duration::hours(1);
    assert_eq!(fx.managers.units.review(&fx.cs, future, &bob).count().unwrap(), 0);
    assert_eq!(
        fx.managers.units.review(&fx.cs, since, &User::anonymous()).count().unwrap(),
        0
    );
}

#[test]
fn test_same_shouldFindUnitsAcrossSubprojects() {
    let config = Config::default();
    let managers = managers_with(&config);
    let checkout = create_checkout();
    let first = create_subproject(&managers, "demo", "app");
    let second = create_subproject(&managers, "demo", "lib");
    let cs = import(&managers, &first, checkout.path(), "cs");
    import(&managers, &second, checkout.path(), "cs");
    import(&managers, &second, checkout.path(), "de");

    let hello = managers
        .units
        .for_translation(&cs)
        .fetch()
        .unwrap()
        .into_iter()
        .find(|u| u.source == "Hello, world!")
        .unwrap();
    assert_eq!(managers.units.same(&hello).count().unwrap(), 2);
}
