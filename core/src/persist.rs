use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

use crate::i18n::Language;
use crate::listing::Kind;
use crate::query::QuerySpec;

/// String key-value storage for user preferences, the local equivalent of a
/// browser's localStorage.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> { Ok(self.entries.get(key).cloned()) }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// On-disk store backed by a sled database under `root`.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let db = sled::open(root.as_ref())?;
        Ok(Self { db })
    }
}

impl PreferenceStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.db.remove(key.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub name: String,
    pub spec: QuerySpec,
    pub saved_at: String,
}

/// Typed preferences over any [`PreferenceStore`]: favorites, saved searches
/// and the display language.
pub struct Preferences<S> {
    store: S,
}

impl<S: PreferenceStore> Preferences<S> {
    pub fn new(store: S) -> Self { Self { store } }

    fn favorites_key(kind: Kind) -> String { format!("favorites:{kind}") }
    fn searches_key(kind: Kind) -> String { format!("searches:{kind}") }
    const LANGUAGE_KEY: &'static str = "language";

    /// Stored JSON that no longer parses is treated as absent.
    fn read_json<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let Some(raw) = self.store.get(key)? else { return Ok(T::default()) };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(v),
            Err(err) => {
                tracing::warn!(key, %err, "discarding unreadable preference");
                Ok(T::default())
            }
        }
    }

    fn write_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)
    }

    pub fn favorites(&self, kind: Kind) -> Result<Vec<String>> {
        let ids: BTreeSet<String> = self.read_json(&Self::favorites_key(kind))?;
        Ok(ids.into_iter().collect())
    }

    pub fn is_favorite(&self, kind: Kind, id: &str) -> Result<bool> {
        Ok(self.favorites(kind)?.iter().any(|f| f == id))
    }

    /// Returns whether `id` is a favorite after the toggle.
    pub fn toggle_favorite(&mut self, kind: Kind, id: &str) -> Result<bool> {
        let key = Self::favorites_key(kind);
        let mut ids: BTreeSet<String> = self.read_json(&key)?;
        let now_favorite = if ids.remove(id) { false } else { ids.insert(id.to_string()) };
        self.write_json(&key, &ids)?;
        tracing::info!(%kind, id, now_favorite, "favorite toggled");
        Ok(now_favorite)
    }

    pub fn saved_searches(&self, kind: Kind) -> Result<Vec<SavedSearch>> {
        self.read_json(&Self::searches_key(kind))
    }

    pub fn saved_search(&self, kind: Kind, name: &str) -> Result<Option<SavedSearch>> {
        Ok(self.saved_searches(kind)?.into_iter().find(|s| s.name == name))
    }

    /// Saving under an existing name replaces that entry.
    pub fn save_search(&mut self, kind: Kind, name: &str, spec: QuerySpec) -> Result<SavedSearch> {
        let saved = SavedSearch {
            name: name.to_string(),
            spec,
            saved_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into()),
        };
        let mut all = self.saved_searches(kind)?;
        all.retain(|s| s.name != name);
        all.push(saved.clone());
        self.write_json(&Self::searches_key(kind), &all)?;
        Ok(saved)
    }

    /// Returns whether anything was deleted.
    pub fn delete_search(&mut self, kind: Kind, name: &str) -> Result<bool> {
        let mut all = self.saved_searches(kind)?;
        let before = all.len();
        all.retain(|s| s.name != name);
        if all.len() == before {
            return Ok(false);
        }
        self.write_json(&Self::searches_key(kind), &all)?;
        Ok(true)
    }

    pub fn language(&self) -> Result<Language> {
        Ok(self
            .store
            .get(Self::LANGUAGE_KEY)?
            .and_then(|code| code.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_language(&mut self, lang: Language) -> Result<()> {
        self.store.set(Self::LANGUAGE_KEY, lang.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_favorites_toggle() {
        let mut prefs = Preferences::new(MemoryStore::new());
        assert!(prefs.toggle_favorite(Kind::Activities, "b").unwrap());
        assert!(prefs.toggle_favorite(Kind::Activities, "a").unwrap());
        assert_eq!(prefs.favorites(Kind::Activities).unwrap(), vec!["a", "b"]);
        assert!(!prefs.toggle_favorite(Kind::Activities, "b").unwrap());
        assert!(!prefs.is_favorite(Kind::Activities, "b").unwrap());
        assert!(prefs.favorites(Kind::Properties).unwrap().is_empty());
    }

    #[test]
    fn corrupt_entries_read_as_empty() {
        let mut store = MemoryStore::new();
        store.set("favorites:activities", "{not json").unwrap();
        store.set("language", "klingon").unwrap();
        let prefs = Preferences::new(store);
        assert!(prefs.favorites(Kind::Activities).unwrap().is_empty());
        assert_eq!(prefs.language().unwrap(), Language::En);
    }

    #[test]
    fn saved_search_replaces_by_name() {
        let mut prefs = Preferences::new(MemoryStore::new());
        let spec = QuerySpec { search: "tea".into(), ..Default::default() };
        prefs.save_search(Kind::Experiences, "tea", spec.clone()).unwrap();
        let newer = QuerySpec { search: "matcha".into(), ..Default::default() };
        prefs.save_search(Kind::Experiences, "tea", newer.clone()).unwrap();
        let all = prefs.saved_searches(Kind::Experiences).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].spec, newer);
        assert!(prefs.delete_search(Kind::Experiences, "tea").unwrap());
        assert!(!prefs.delete_search(Kind::Experiences, "tea").unwrap());
    }
}
