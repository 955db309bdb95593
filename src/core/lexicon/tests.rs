use std::sync::Arc;

use rusqlite::params;
use serde_json::json;

use super::*;
use crate::core::storage::{KeyValueStorage, MemoryStorage, StorageSlot};
use crate::core::sync::{BroadcastNotifier, ChangeNotifier};

fn open(profile: SchemaProfile, storage: &MemoryStorage) -> Lexicon {
    let slot = StorageSlot::new(storage.clone(), profile.storage_key.clone());
    let mut lexicon = Lexicon::new(profile, slot);
    lexicon.init().unwrap();
    lexicon
}

fn standard() -> (Lexicon, MemoryStorage) {
    let storage = MemoryStorage::new();
    (open(SchemaProfile::standard(), &storage), storage)
}

fn empty_standard() -> (Lexicon, MemoryStorage) {
    let storage = MemoryStorage::new();
    (
        open(SchemaProfile::standard().without_samples(), &storage),
        storage,
    )
}

fn headwords(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.headword.as_str()).collect()
}

#[test]
fn test_init_seeds_categories_and_samples() {
    let (lexicon, storage) = standard();

    assert_eq!(lexicon.categories().len(), DEFAULT_CATEGORIES.len());
    assert_eq!(lexicon.total_entries(), 3);
    assert!(lexicon
        .search(&SearchFilter::default())
        .iter()
        .all(|e| e.verified));
    assert!(storage.get_item(STANDARD_KEY).unwrap().is_some());
}

const STANDARD_KEY: &str = crate::core::storage::STANDARD_DB_KEY;

#[test]
fn test_shared_profile_seeds_five_samples() {
    let storage = MemoryStorage::new();
    let lexicon = open(SchemaProfile::shared(), &storage);
    assert_eq!(lexicon.total_entries(), 5);
    assert!(storage
        .get_item(crate::core::storage::SHARED_DB_KEY)
        .unwrap()
        .is_some());
}

#[test]
fn test_init_is_reentrant() {
    let (mut lexicon, _storage) = standard();
    lexicon.add_entry(&NewEntry::new("nyumba", "casa")).unwrap();
    lexicon.init().unwrap();
    assert_eq!(lexicon.total_entries(), 4);
}

#[test]
fn test_init_restores_persisted_snapshot() {
    let (mut lexicon, storage) = empty_standard();
    lexicon
        .add_entry(&NewEntry::new("nyumba", "casa").word_class("substantivo"))
        .unwrap();

    let reopened = open(SchemaProfile::standard().without_samples(), &storage);
    let found = reopened.search(&SearchFilter::default().term("nyumba"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].gloss, "casa");
    // Categories are not seeded a second time
    assert_eq!(reopened.categories().len(), DEFAULT_CATEGORIES.len());
}

#[test]
fn test_corrupted_slot_fails_init_and_is_left_alone() {
    let storage = MemoryStorage::new();
    storage.set_item(STANDARD_KEY, "[not bytes").unwrap();

    let slot = StorageSlot::new(storage.clone(), STANDARD_KEY);
    let mut lexicon = Lexicon::new(SchemaProfile::standard(), slot);
    assert!(matches!(lexicon.init(), Err(StoreError::Snapshot(_))));
    assert!(!lexicon.is_initialized());
    assert_eq!(
        storage.get_item(STANDARD_KEY).unwrap(),
        Some("[not bytes".to_string())
    );
}

#[test]
fn test_uninitialized_store() {
    let slot = StorageSlot::new(MemoryStorage::new(), STANDARD_KEY);
    let mut lexicon = Lexicon::new(SchemaProfile::standard(), slot);

    assert!(lexicon.search(&SearchFilter::default()).is_empty());
    assert!(lexicon.get_by_id(1).is_none());
    assert_eq!(lexicon.statistics(), Statistics::default());
    assert!(matches!(
        lexicon.add_entry(&NewEntry::new("muti", "árvore")),
        Err(StoreError::NotInitialized)
    ));
    assert!(matches!(lexicon.remove(1), Err(StoreError::NotInitialized)));
}

#[test]
fn test_close_makes_store_uninitialized() {
    let (mut lexicon, _storage) = standard();
    lexicon.close();
    assert!(!lexicon.is_initialized());
    assert!(lexicon.search(&SearchFilter::default()).is_empty());
    lexicon.init().unwrap();
    assert_eq!(lexicon.total_entries(), 3);
}

#[test]
fn test_add_then_search_is_case_insensitive_and_ordered() {
    let (mut lexicon, _storage) = empty_standard();
    lexicon.add_entry(&NewEntry::new("Nyumba", "casa")).unwrap();
    lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();
    lexicon.add_entry(&NewEntry::new("kulowa", "comer")).unwrap();

    let all = lexicon.search(&SearchFilter::default());
    assert_eq!(headwords(&all), vec!["kulowa", "muti", "Nyumba"]);

    let by_gloss = lexicon.search(&SearchFilter::default().term("CASA"));
    assert_eq!(headwords(&by_gloss), vec!["Nyumba"]);

    let by_headword = lexicon.search(&SearchFilter::default().term("nyu"));
    assert_eq!(headwords(&by_headword), vec!["Nyumba"]);
}

#[test]
fn test_search_treats_wildcards_literally() {
    let (mut lexicon, _storage) = empty_standard();
    lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();
    assert!(lexicon.search(&SearchFilter::default().term("%")).is_empty());
    assert!(lexicon.search(&SearchFilter::default().term("m_ti")).is_empty());
}

#[test]
fn test_search_filters_combine() {
    let (mut lexicon, _storage) = empty_standard();
    lexicon
        .add_entry(&NewEntry::new("muti", "árvore").word_class("substantivo").verified(true))
        .unwrap();
    lexicon
        .add_entry(&NewEntry::new("mutu", "pessoa").word_class("substantivo"))
        .unwrap();
    lexicon
        .add_entry(&NewEntry::new("mulowa", "comer").word_class("verbo").verified(true))
        .unwrap();

    let nouns = lexicon.search(&SearchFilter::default().word_class("substantivo"));
    assert_eq!(nouns.len(), 2);

    let verified_nouns = lexicon.search(
        &SearchFilter::default()
            .term("mu")
            .word_class("substantivo")
            .verified(true),
    );
    assert_eq!(headwords(&verified_nouns), vec!["muti"]);

    let limited = lexicon.search(&SearchFilter::default().term("mu").limit(2));
    assert_eq!(headwords(&limited), vec!["mulowa", "muti"]);

    let other_dialect = lexicon.search(&SearchFilter::default().dialect("litoral"));
    assert!(other_dialect.is_empty());
}

#[test]
fn test_search_direction() {
    let (mut lexicon, _storage) = empty_standard();
    lexicon
        .add_entry(&NewEntry::new("casa", "nyumba").verified(true))
        .unwrap();
    lexicon
        .add_entry(&NewEntry::new("nyumba", "casa").verified(true))
        .unwrap();
    lexicon
        .add_entry(&NewEntry::new("nyumbani", "em casa"))
        .unwrap();

    let forward = lexicon.search_direction("nyumba", SearchDirection::EmakhuaToPortuguese);
    assert_eq!(headwords(&forward), vec!["nyumba"]);

    let backward = lexicon.search_direction("nyumba", SearchDirection::PortugueseToEmakhua);
    assert_eq!(headwords(&backward), vec!["casa"]);
}

#[test]
fn test_add_requires_headword_and_gloss() {
    let (mut lexicon, storage) = empty_standard();
    let before = storage.get_item(STANDARD_KEY).unwrap();

    let err = lexicon.add_entry(&NewEntry::new("  ", "casa")).unwrap_err();
    assert!(err.is_validation());
    let err = lexicon.add_entry(&NewEntry::new("nyumba", "")).unwrap_err();
    assert!(err.is_validation());

    assert_eq!(lexicon.total_entries(), 0);
    assert_eq!(storage.get_item(STANDARD_KEY).unwrap(), before);
}

#[test]
fn test_add_applies_defaults() {
    let storage = MemoryStorage::new();
    let mut standard = open(SchemaProfile::standard().without_samples(), &storage);
    let mut shared = open(SchemaProfile::shared().without_samples(), &storage);

    let id = standard.add_entry(&NewEntry::new("muti", "árvore")).unwrap();
    let entry = standard.get_by_id(id).unwrap();
    assert_eq!(entry.dialect, DEFAULT_DIALECT);
    assert_eq!(entry.created_by, DEFAULT_AUTHOR);
    assert!(entry.active);
    assert!(!entry.verified);
    assert!(!entry.created_at.is_empty());

    let id = shared.add_entry(&NewEntry::new("muti", "árvore")).unwrap();
    assert!(shared.get_by_id(id).unwrap().verified);
}

#[test]
fn test_duplicate_headword_is_constraint_violation() {
    let (mut lexicon, _storage) = empty_standard();
    lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();

    let err = lexicon
        .add_entry(&NewEntry::new("muti", "pau").dialect("litoral"))
        .unwrap_err();
    assert!(err.is_constraint(), "unexpected error: {err:?}");
    assert!(err.to_string().contains("UNIQUE"));
    assert_eq!(lexicon.total_entries(), 1);
}

#[test]
fn test_dialect_scope_allows_homographs_across_dialects() {
    let storage = MemoryStorage::new();
    let profile = SchemaProfile::standard()
        .without_samples()
        .with_uniqueness(UniquenessScope::PerDialect);
    let mut lexicon = open(profile, &storage);

    lexicon
        .add_entry(&NewEntry::new("muti", "árvore").dialect("central"))
        .unwrap();
    lexicon
        .add_entry(&NewEntry::new("muti", "pau").dialect("litoral"))
        .unwrap();
    let err = lexicon
        .add_entry(&NewEntry::new("muti", "lenha").dialect("litoral"))
        .unwrap_err();
    assert!(err.is_constraint());
    assert_eq!(lexicon.total_entries(), 2);
}

#[test]
fn test_add_with_unknown_category_leaves_no_row() {
    let (mut lexicon, _storage) = empty_standard();
    let err = lexicon
        .add_entry(&NewEntry::new("muti", "árvore").categories([999]))
        .unwrap_err();
    assert!(err.is_constraint());
    assert_eq!(lexicon.total_entries(), 0);
}

#[test]
fn test_get_by_id_resolves_categories() {
    let (mut lexicon, _storage) = empty_standard();
    let categories = lexicon.categories();
    let nature = categories.iter().find(|c| c.name == "Natureza").unwrap().id;
    let animals = categories.iter().find(|c| c.name == "Animais").unwrap().id;

    let id = lexicon
        .add_entry(&NewEntry::new("muti", "árvore").categories([nature, animals]))
        .unwrap();

    let entry = lexicon.get_by_id(id).unwrap();
    let names: Vec<_> = entry.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Animais", "Natureza"]);
    assert!(lexicon.get_by_id(id + 100).is_none());
}

#[test]
fn test_update_changes_fields_and_refreshes_timestamp() {
    let (mut lexicon, _storage) = empty_standard();
    let id = lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();
    lexicon
        .conn()
        .unwrap()
        .execute(
            "UPDATE entries SET updated_at = '2000-01-01 00:00:00' WHERE id = ?1",
            params![id],
        )
        .unwrap();

    let patch = EntryPatch::from_json(&json!({
        "portugues": "árvore, pau",
        "tom": "HL",
        "verificada": true,
        "campo_desconhecido": "ignored"
    }))
    .unwrap();
    lexicon.update(id, &patch).unwrap();

    let entry = lexicon.get_by_id(id).unwrap();
    assert_eq!(entry.gloss, "árvore, pau");
    assert_eq!(entry.tone.as_deref(), Some("HL"));
    assert!(entry.verified);
    assert_ne!(entry.updated_at, "2000-01-01 00:00:00");
}

#[test]
fn test_update_rejects_empty_patch() {
    let (mut lexicon, _storage) = empty_standard();
    let id = lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();

    let patch = EntryPatch::from_json(&json!({"bogus": 1})).unwrap();
    assert!(lexicon.update(id, &patch).unwrap_err().is_validation());
}

#[test]
fn test_update_rejects_blank_required_field() {
    let (mut lexicon, _storage) = empty_standard();
    let id = lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();

    let patch = EntryPatch::new().text(EntryField::Headword, " ");
    assert!(lexicon.update(id, &patch).unwrap_err().is_validation());
    assert_eq!(lexicon.get_by_id(id).unwrap().headword, "muti");
}

#[test]
fn test_update_respects_profile_allow_list() {
    let storage = MemoryStorage::new();
    let mut profile = SchemaProfile::standard().without_samples();
    profile.updatable.retain(|f| *f != EntryField::Verified);
    let mut lexicon = open(profile, &storage);
    let id = lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();

    let patch = EntryPatch::new().flag(EntryField::Verified, true);
    assert!(lexicon.update(id, &patch).unwrap_err().is_validation());
    assert!(!lexicon.get_by_id(id).unwrap().verified);
}

#[test]
fn test_update_missing_entry_is_not_found() {
    let (mut lexicon, _storage) = empty_standard();
    let patch = EntryPatch::new().text(EntryField::Notes, "x");
    assert!(matches!(
        lexicon.update(42, &patch),
        Err(StoreError::NotFound(42))
    ));
}

#[test]
fn test_update_categories_only_replaces_links() {
    let (mut lexicon, _storage) = empty_standard();
    let ids: Vec<i64> = lexicon.categories().iter().map(|c| c.id).collect();
    let id = lexicon
        .add_entry(&NewEntry::new("muti", "árvore").categories([ids[0], ids[1]]))
        .unwrap();

    lexicon
        .update(id, &EntryPatch::new().categories([ids[2]]))
        .unwrap();

    let linked: Vec<i64> = lexicon.entry_categories(id).iter().map(|c| c.id).collect();
    assert_eq!(linked, vec![ids[2]]);
}

#[test]
fn test_hard_remove_cascades() {
    let (mut lexicon, _storage) = empty_standard();
    let category = lexicon.categories()[0].id;
    let id = lexicon
        .add_entry(&NewEntry::new("muti", "árvore").categories([category]))
        .unwrap();
    lexicon.record_search_hit(id);

    lexicon.remove(id).unwrap();

    assert!(lexicon.get_by_id(id).is_none());
    assert!(lexicon.usage(id).is_none());
    let links: i64 = lexicon
        .conn()
        .unwrap()
        .query_row(
            "SELECT COUNT(*) FROM entry_categories WHERE entry_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(links, 0);
    assert!(matches!(lexicon.remove(id), Err(StoreError::NotFound(_))));
}

#[test]
fn test_soft_remove_hides_entry() {
    let storage = MemoryStorage::new();
    let mut lexicon = open(SchemaProfile::shared().without_samples(), &storage);
    let id = lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();

    lexicon.remove(id).unwrap();

    assert!(lexicon.search(&SearchFilter::default().term("muti")).is_empty());
    assert_eq!(lexicon.statistics().total, 0);
    let entry = lexicon.get_by_id(id).unwrap();
    assert!(!entry.active);
}

#[test]
fn test_soft_removed_headword_can_be_added_again() {
    let storage = MemoryStorage::new();
    let mut lexicon = open(SchemaProfile::shared().without_samples(), &storage);
    let old = lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();
    lexicon.remove(old).unwrap();

    let new = lexicon.add_entry(&NewEntry::new("muti", "pau")).unwrap();
    assert_ne!(old, new);

    let found = lexicon.search(&SearchFilter::default().term("muti"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].gloss, "pau");

    // Only active rows compete for the headword
    let err = lexicon
        .add_entry(&NewEntry::new("muti", "madeira"))
        .unwrap_err();
    assert!(err.is_constraint());
}

#[test]
fn test_record_search_hit_counts() {
    let (mut lexicon, _storage) = empty_standard();
    let id = lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();

    assert!(lexicon.usage(id).is_none());
    lexicon.record_search_hit(id);
    lexicon.record_search_hit(id);

    let usage = lexicon.usage(id).unwrap();
    assert_eq!(usage.searches, 2);
    assert_eq!(usage.views, 0);
    assert!(usage.last_search.is_some());

    // Unknown entries are ignored
    lexicon.record_search_hit(9999);
    assert!(lexicon.usage(9999).is_none());
}

#[test]
fn test_statistics() {
    let (mut lexicon, _storage) = empty_standard();
    for (headword, class, verified) in [
        ("muti", "substantivo", true),
        ("nyumba", "substantivo", false),
        ("kulowa", "verbo", true),
        ("orera", "adjetivo", false),
        ("moha", "substantivo", false),
        ("nthowa", "substantivo", false),
    ] {
        lexicon
            .add_entry(
                &NewEntry::new(headword, "x")
                    .word_class(class)
                    .verified(verified),
            )
            .unwrap();
    }

    let stats = lexicon.statistics();
    assert_eq!(stats.total, 6);
    assert_eq!(stats.verified, 2);
    assert_eq!(
        stats.by_class[0],
        ClassCount {
            class: "substantivo".to_string(),
            total: 4
        }
    );
    assert_eq!(stats.by_class.len(), 3);
    assert_eq!(stats.recent.len(), 5);
    assert_eq!(stats.recent[0].headword, "nthowa");
    assert!(stats.recent.iter().all(|r| r.headword != "muti"));
}

#[test]
fn test_snapshot_export_import() {
    let (mut source, _a) = empty_standard();
    source
        .add_entry(&NewEntry::new("muti", "árvore").word_class("substantivo").verified(true))
        .unwrap();
    source
        .add_entry(&NewEntry::new("kulowa", "comer").word_class("verbo"))
        .unwrap();
    let bytes = source.export_snapshot().unwrap();

    let (mut target, storage) = standard();
    target.import_snapshot(&bytes).unwrap();
    assert_eq!(
        headwords(&target.search(&SearchFilter::default())),
        vec!["kulowa", "muti"]
    );
    assert_eq!(target.statistics(), source.statistics());

    // Persisted too
    let reopened = open(SchemaProfile::standard(), &storage);
    assert_eq!(reopened.total_entries(), 2);
}

#[test]
fn test_snapshot_import_rejects_garbage_and_keeps_state() {
    let (mut lexicon, _storage) = standard();
    assert!(lexicon.import_snapshot(&vec![7u8; 4096]).is_err());
    assert_eq!(lexicon.total_entries(), 3);
}

#[test]
fn test_backup_reports_size() {
    let (lexicon, _storage) = standard();
    let backup = lexicon.backup().unwrap();
    assert_eq!(backup.size, backup.data.len());
    assert!(backup.data.starts_with(b"SQLite format 3\0"));
}

#[test]
fn test_portable_roundtrip_preserves_ids_and_links() {
    let (mut source, _a) = empty_standard();
    let category = source.categories()[3].id;
    let id = source
        .add_entry(
            &NewEntry::new("muti", "árvore")
                .word_class("substantivo")
                .categories([category]),
        )
        .unwrap();
    source.add_entry(&NewEntry::new("nyumba", "casa")).unwrap();
    let json = source.export_portable().unwrap();

    let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(doc["metadados"]["versao"], json!(SCHEMA_VERSION));
    assert_eq!(doc["metadados"]["total_palavras"], json!(2));
    assert_eq!(doc["palavras"][0]["emakhua"], json!("muti"));

    let (mut target, _b) = standard();
    assert_eq!(target.import_portable(&json).unwrap(), 2);

    assert_eq!(target.total_entries(), 2);
    let entry = target.get_by_id(id).unwrap();
    assert_eq!(entry.headword, "muti");
    assert_eq!(entry.categories.len(), 1);
    assert_eq!(entry.categories[0].id, category);
    assert_eq!(target.categories(), source.categories());
}

#[test]
fn test_portable_import_malformed_record_changes_nothing() {
    let (mut lexicon, _storage) = standard();
    let doc = json!({
        "palavras": [
            {"id": 1, "emakhua": "muti", "portugues": "árvore"},
            {"id": 2, "emakhua": "nyumba"}
        ],
        "categorias": []
    });

    let err = lexicon.import_portable(&doc.to_string()).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(lexicon.total_entries(), 3);
}

#[test]
fn test_portable_import_rejects_blank_required_fields() {
    let (mut lexicon, _storage) = standard();
    let before = lexicon.statistics();
    let doc = json!({
        "palavras": [
            {"id": 1, "emakhua": "muti", "portugues": "árvore"},
            {"id": 2, "emakhua": "", "portugues": "   "}
        ],
        "categorias": []
    });

    let err = lexicon.import_portable(&doc.to_string()).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("Record 2"));
    assert_eq!(lexicon.statistics(), before);
    assert_eq!(lexicon.total_entries(), 3);
}

#[test]
fn test_portable_import_rolls_back_on_constraint_failure() {
    let (mut lexicon, _storage) = standard();
    let doc = json!({
        "palavras": [
            {"id": 1, "emakhua": "muti", "portugues": "árvore"},
            {"id": 2, "emakhua": "muti", "portugues": "pau"}
        ],
        "categorias": []
    });

    let err = lexicon.import_portable(&doc.to_string()).unwrap_err();
    assert!(matches!(err, StoreError::Transaction { .. }));
    assert_eq!(lexicon.total_entries(), 3);
    assert_eq!(lexicon.categories().len(), DEFAULT_CATEGORIES.len());
}

#[test]
fn test_mutations_publish_markers() {
    let notifier = Arc::new(BroadcastNotifier::new());
    let rx = notifier.subscribe();

    let slot = StorageSlot::new(MemoryStorage::new(), STANDARD_KEY);
    let mut lexicon = Lexicon::new(SchemaProfile::standard(), slot)
        .with_notifier(notifier.clone() as Arc<dyn ChangeNotifier>);
    lexicon.init().unwrap();

    let first = rx.try_recv().unwrap();
    assert_eq!(lexicon.last_marker(), Some(first.as_str()));

    lexicon.add_entry(&NewEntry::new("muti", "árvore")).unwrap();
    let second = rx.try_recv().unwrap();
    assert_ne!(first, second);
    assert_eq!(notifier.latest(), Some(second));
}

#[test]
fn test_second_handle_sees_changes_after_reload() {
    let storage = MemoryStorage::new();
    let mut writer = open(SchemaProfile::shared(), &storage);
    let mut reader = open(SchemaProfile::shared(), &storage);

    writer.add_entry(&NewEntry::new("ekuwo", "roupa")).unwrap();
    assert!(reader.search(&SearchFilter::default().term("ekuwo")).is_empty());

    reader.reload().unwrap();
    assert_eq!(reader.search(&SearchFilter::default().term("ekuwo")).len(), 1);
}
