use mrkyoto_core::persist::{PreferenceStore, Preferences, SledStore};
use mrkyoto_core::{Kind, Language, QuerySpec};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

// sled's flusher thread can hold the file lock briefly after the last handle drops
fn reopen(path: &Path) -> SledStore {
    let mut attempt = 0;
    loop {
        match SledStore::open(path) {
            Ok(store) => return store,
            Err(err) if attempt < 20 => {
                attempt += 1;
                eprintln!("reopen attempt {attempt} failed: {err}");
                thread::sleep(Duration::from_millis(50 * attempt));
            }
            Err(err) => panic!("could not reopen {}: {err}", path.display()),
        }
    }
}

#[test]
fn sled_store_round_trips_raw_values() {
    let dir = tempdir().unwrap();
    let mut store = SledStore::open(dir.path().join("prefs")).unwrap();
    assert_eq!(store.get("missing").unwrap(), None);
    store.set("theme", "dark").unwrap();
    assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    store.remove("theme").unwrap();
    assert_eq!(store.get("theme").unwrap(), None);
}

#[test]
fn preferences_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prefs");
    {
        let mut prefs = Preferences::new(SledStore::open(&path).unwrap());
        prefs.toggle_favorite(Kind::Properties, "prop-gion-apartment").unwrap();
        prefs.set_language(Language::Ja).unwrap();
        let mut spec = QuerySpec { search: "garden".into(), sort: Some("walk-score".into()), ..Default::default() };
        spec.filters.insert("bedrooms".into(), "2,3".into());
        prefs.save_search(Kind::Properties, "family", spec).unwrap();
    }
    let prefs = Preferences::new(reopen(&path));
    assert_eq!(prefs.favorites(Kind::Properties).unwrap(), vec!["prop-gion-apartment"]);
    assert_eq!(prefs.language().unwrap(), Language::Ja);
    let saved = prefs.saved_search(Kind::Properties, "family").unwrap().unwrap();
    assert_eq!(saved.spec.search, "garden");
    assert_eq!(saved.spec.filters.get("bedrooms").map(String::as_str), Some("2,3"));
    assert!(!saved.saved_at.is_empty());
    assert!(prefs.saved_searches(Kind::Activities).unwrap().is_empty());
}
