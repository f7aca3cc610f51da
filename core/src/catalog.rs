use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::CatalogError;
use crate::listing::{Activity, Experience, Kind, Listing, Property};
use crate::query::{categories, PriceTiers};

const BUNDLED_PROPERTIES: &str = include_str!("../data/properties.json");
const BUNDLED_ACTIVITIES: &str = include_str!("../data/activities.json");
const BUNDLED_EXPERIENCES: &str = include_str!("../data/experiences.json");

/// A concrete listing type that can be loaded and mutated in place.
pub trait Record: Listing + DeserializeOwned + Clone {
    const KIND: Kind;
    fn rating_mut(&mut self) -> &mut f32;
    fn price_mut(&mut self) -> &mut String;
}

impl Record for Property {
    const KIND: Kind = Kind::Properties;
    fn rating_mut(&mut self) -> &mut f32 { &mut self.rating }
    fn price_mut(&mut self) -> &mut String { &mut self.price }
}

impl Record for Activity {
    const KIND: Kind = Kind::Activities;
    fn rating_mut(&mut self) -> &mut f32 { &mut self.rating }
    fn price_mut(&mut self) -> &mut String { &mut self.price }
}

impl Record for Experience {
    const KIND: Kind = Kind::Experiences;
    fn rating_mut(&mut self) -> &mut f32 { &mut self.rating }
    fn price_mut(&mut self) -> &mut String { &mut self.price }
}

/// One validated dataset plus the price tiers that apply to it.
#[derive(Debug, Clone)]
pub struct Catalog<L> {
    listings: Vec<L>,
    tiers: PriceTiers,
}

impl<L: Record> Catalog<L> {
    /// Validates ids and coerces out-of-domain ratings to 0 (unrated).
    pub fn from_listings(mut listings: Vec<L>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for listing in listings.iter_mut() {
            if listing.id().trim().is_empty() {
                return Err(CatalogError::MissingId(listing.title().to_string()));
            }
            if !seen.insert(listing.id().to_string()) {
                return Err(CatalogError::DuplicateId(listing.id().to_string()));
            }
            let rating = listing.rating();
            if rating.is_nan() || (rating != 0.0 && !(1.0..=5.0).contains(&rating)) {
                tracing::warn!(id = listing.id(), rating, "rating out of range, treating as unrated");
                *listing.rating_mut() = 0.0;
            }
            if !categories(L::KIND).contains(&listing.category()) {
                tracing::warn!(id = listing.id(), category = listing.category(), "category outside the known set");
            }
        }
        let kind = L::KIND;
        tracing::info!(%kind, count = listings.len(), "catalog loaded");
        Ok(Self { listings, tiers: PriceTiers::for_kind(L::KIND) })
    }

    /// Accepts a JSON array, a single JSON object, or JSON Lines.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        Self::from_listings(parse_records(text)?)
    }

    /// The dataset compiled into the crate for this listing kind.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json_str(match L::KIND {
            Kind::Properties => BUNDLED_PROPERTIES,
            Kind::Activities => BUNDLED_ACTIVITIES,
            Kind::Experiences => BUNDLED_EXPERIENCES,
        })
    }

    /// Load a file, or every `.json` / `.jsonl` file under a directory.
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let mut files: Vec<PathBuf> = Vec::new();
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
                let p = entry.path();
                if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                    files.push(p.to_path_buf());
                }
            }
        } else {
            files.push(path.to_path_buf());
        }

        let mut listings = Vec::new();
        for file in files {
            let io_err = |source: std::io::Error| CatalogError::Io { path: file.display().to_string(), source };
            if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                let reader = BufReader::new(File::open(&file).map_err(io_err)?);
                for line in reader.lines() {
                    let line = line.map_err(io_err)?;
                    if line.trim().is_empty() { continue; }
                    listings.push(serde_json::from_str(&line)?);
                }
            } else {
                let text = std::fs::read_to_string(&file).map_err(io_err)?;
                listings.extend(parse_records::<L>(&text)?);
            }
        }
        Self::from_listings(listings)
    }

    pub fn kind(&self) -> Kind { L::KIND }
    pub fn listings(&self) -> &[L] { &self.listings }
    pub fn listings_mut(&mut self) -> &mut [L] { &mut self.listings }
    pub fn tiers(&self) -> &PriceTiers { &self.tiers }
    pub fn len(&self) -> usize { self.listings.len() }
    pub fn is_empty(&self) -> bool { self.listings.is_empty() }

    pub fn get(&self, id: &str) -> Option<&L> {
        self.listings.iter().find(|l| l.id() == id)
    }
}

fn parse_records<L: DeserializeOwned>(text: &str) -> Result<Vec<L>, CatalogError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    // a single object, or one object per line
    match serde_json::from_str::<L>(trimmed) {
        Ok(one) => Ok(vec![one]),
        Err(_) => trimmed
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(CatalogError::from))
            .collect(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_datasets_load() {
        assert!(Catalog::<Property>::bundled().unwrap().len() >= 8);
        assert!(Catalog::<Activity>::bundled().unwrap().len() >= 8);
        assert!(Catalog::<Experience>::bundled().unwrap().len() >= 8);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"[{"id":"a","title":"A","category":"Nature"},{"id":"a","title":"B","category":"Nature"}]"#;
        assert!(matches!(Catalog::<Activity>::from_json_str(json), Err(CatalogError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn coerces_bad_ratings_and_defaults_missing_fields() {
        let json = r#"{"id":"x","title":"X","category":"Nature","rating":7.5}"#;
        let catalog = Catalog::<Activity>::from_json_str(json).unwrap();
        let x = catalog.get("x").unwrap();
        assert_eq!(x.rating, 0.0);
        assert_eq!(x.price, "");
        assert!(x.tags.is_empty());
        assert!(!x.featured);
    }

    #[test]
    fn parses_json_lines() {
        let jsonl = "{\"id\":\"a\",\"title\":\"A\",\"category\":\"Nature\"}\n\n{\"id\":\"b\",\"title\":\"B\",\"category\":\"Cultural\"}\n";
        let catalog = Catalog::<Activity>::from_json_str(jsonl).unwrap();
        assert_eq!(catalog.len(), 2);
    }
}
