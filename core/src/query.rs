use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::error::QueryError;
use crate::listing::{Field, Kind};
use crate::text::fold;

/// Sentinel filter value meaning "no constraint".
pub const ALL: &str = "all";
pub const DEFAULT_PER_PAGE: usize = 12;
pub const MAX_PER_PAGE: usize = 100;

/// Closed category enumeration per dataset.
pub fn categories(kind: Kind) -> &'static [&'static str] {
    match kind {
        Kind::Properties => &["Machiya", "House", "Apartment", "Land"],
        Kind::Activities => &["Cultural", "Nature", "Culinary", "Adventure", "Wellness", "Nightlife"],
        Kind::Experiences => &["Tea Ceremony", "Crafts", "Performing Arts", "Spiritual", "Culinary", "Fashion"],
    }
}

/// One row of a price tier table: `[min, max)`, `max = None` for the top tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub name: String,
    pub min: u64,
    pub max: Option<u64>,
}

impl PriceTier {
    fn new(name: &str, min: u64, max: Option<u64>) -> Self {
        Self { name: name.to_string(), min, max }
    }
}

/// Resolved numeric band a price filter tests against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBand {
    pub min: u64,
    pub max: Option<u64>,
}

impl PriceBand {
    /// Lower-inclusive, upper-exclusive. A coerced price of 0 never matches.
    pub fn contains(&self, value: u64) -> bool {
        value != 0 && value >= self.min && self.max.map_or(true, |max| value < max)
    }
}

/// Contiguous tier table: starts at 0, each tier's `max` is the next tier's
/// `min`, and only the last tier is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTiers {
    tiers: Vec<PriceTier>,
}

impl PriceTiers {
    pub fn new(tiers: Vec<PriceTier>) -> Result<Self, QueryError> {
        let first = tiers.first().ok_or_else(|| QueryError::InvalidTiers("empty table".into()))?;
        if first.min != 0 {
            return Err(QueryError::InvalidTiers(format!("first tier `{}` must start at 0", first.name)));
        }
        let mut names = BTreeSet::new();
        for (i, tier) in tiers.iter().enumerate() {
            if !names.insert(tier.name.as_str()) || tier.name == ALL {
                return Err(QueryError::InvalidTiers(format!("duplicate or reserved tier name `{}`", tier.name)));
            }
            let last = i + 1 == tiers.len();
            match (tier.max, last) {
                (None, true) => {}
                (None, false) => {
                    return Err(QueryError::InvalidTiers(format!("only the last tier may be unbounded, not `{}`", tier.name)))
                }
                (Some(_), true) => {
                    return Err(QueryError::InvalidTiers(format!("last tier `{}` must be unbounded", tier.name)))
                }
                (Some(max), false) => {
                    if max <= tier.min {
                        return Err(QueryError::InvalidTiers(format!("tier `{}` is empty", tier.name)));
                    }
                    let next = &tiers[i + 1];
                    if next.min != max {
                        return Err(QueryError::InvalidTiers(format!(
                            "gap or overlap between `{}` (ends {}) and `{}` (starts {})",
                            tier.name, max, next.name, next.min
                        )));
                    }
                }
            }
        }
        Ok(Self { tiers })
    }

    pub fn for_kind(kind: Kind) -> Self {
        let tiers = match kind {
            Kind::Activities => vec![PriceTier::new("low", 0, Some(10_000)), PriceTier::new("high", 10_000, None)],
            Kind::Experiences => vec![
                PriceTier::new("budget", 0, Some(5_000)),
                PriceTier::new("moderate", 5_000, Some(15_000)),
                PriceTier::new("premium", 15_000, None),
            ],
            Kind::Properties => vec![
                PriceTier::new("low", 0, Some(20_000_000)),
                PriceTier::new("medium", 20_000_000, Some(50_000_000)),
                PriceTier::new("high", 50_000_000, Some(100_000_000)),
                PriceTier::new("luxury", 100_000_000, None),
            ],
        };
        // built-in tables are covered by `default_tables_validate`
        Self { tiers }
    }

    pub fn tiers(&self) -> &[PriceTier] { &self.tiers }

    pub fn band(&self, name: &str) -> Result<PriceBand, QueryError> {
        self.tiers
            .iter()
            .find(|t| t.name == name)
            .map(|t| PriceBand { min: t.min, max: t.max })
            .ok_or_else(|| QueryError::UnknownPriceTier(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationBucket {
    Short,
    Medium,
    Long,
}

impl DurationBucket {
    /// short (0, 2], medium (2, 4], long (4, ∞). Zero hours matches nothing.
    pub fn contains(&self, hours: f64) -> bool {
        if hours <= 0.0 {
            return false;
        }
        match self {
            DurationBucket::Short => hours <= 2.0,
            DurationBucket::Medium => hours > 2.0 && hours <= 4.0,
            DurationBucket::Long => hours > 4.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationBucket::Short => "short",
            DurationBucket::Medium => "medium",
            DurationBucket::Long => "long",
        }
    }
}

impl FromStr for DurationBucket {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(DurationBucket::Short),
            "medium" => Ok(DurationBucket::Medium),
            "long" => Ok(DurationBucket::Long),
            other => Err(QueryError::UnknownDuration(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    /// Insertion order; datasets are stored newest-first.
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
    Rating,
    Featured,
    Size,
    WalkScore,
    YearBuilt,
}

impl SortKey {
    pub const ALL: [SortKey; 8] = [
        SortKey::Newest,
        SortKey::PriceLow,
        SortKey::PriceHigh,
        SortKey::Rating,
        SortKey::Featured,
        SortKey::Size,
        SortKey::WalkScore,
        SortKey::YearBuilt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::PriceLow => "price-low",
            SortKey::PriceHigh => "price-high",
            SortKey::Rating => "rating",
            SortKey::Featured => "featured",
            SortKey::Size => "size",
            SortKey::WalkScore => "walk-score",
            SortKey::YearBuilt => "year-built",
        }
    }

    pub fn applies_to(&self, kind: Kind) -> bool {
        match self {
            SortKey::Size | SortKey::WalkScore | SortKey::YearBuilt => kind == Kind::Properties,
            _ => true,
        }
    }
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| QueryError::UnknownSort(s.to_string()))
    }
}

/// One active filter clause. "all" and empty selections never become a clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Category(String),
    Price(PriceBand),
    Duration(DurationBucket),
    Exact { field: Field, value: String },
    AnyOf { field: Field, values: BTreeSet<String> },
    /// Folded needles; a listing passes if any feature contains any needle.
    Features(Vec<String>),
}

impl Filter {
    /// Position in the pipeline: category, price, duration, then field filters.
    pub(crate) fn stage(&self) -> u8 {
        match self {
            Filter::Category(_) => 0,
            Filter::Price(_) => 1,
            Filter::Duration(_) => 2,
            Filter::Exact { .. } | Filter::AnyOf { .. } | Filter::Features(_) => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page: page.max(1), per_page: per_page.clamp(1, MAX_PER_PAGE) }
    }
}

impl Default for PageRequest {
    fn default() -> Self { Self::new(1, DEFAULT_PER_PAGE) }
}

/// Validated, immutable query parameters for one engine run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub search: String,
    pub filters: Vec<Filter>,
    pub sort: SortKey,
    pub page: Option<PageRequest>,
}

impl Query {
    pub fn new() -> Self { Self::default() }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }
}

/// Raw query as it arrives from the user (CLI flags, saved searches).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

impl QuerySpec {
    /// Validate every filter name/value for `kind` and build the typed query.
    pub fn compile(&self, kind: Kind, tiers: &PriceTiers) -> Result<Query, QueryError> {
        let mut query = Query::new().search(self.search.trim());
        for (name, value) in &self.filters {
            if let Some(filter) = parse_filter(kind, tiers, name, value)? {
                query = query.filter(filter);
            }
        }
        if let Some(sort) = &self.sort {
            let key: SortKey = sort.parse()?;
            if !key.applies_to(kind) {
                return Err(QueryError::SortNotApplicable { kind, sort: sort.clone() });
            }
            query = query.sort(key);
        }
        if self.page.is_some() || self.per_page.is_some() {
            query = query.page(PageRequest::new(
                self.page.unwrap_or(1),
                self.per_page.unwrap_or(DEFAULT_PER_PAGE),
            ));
        }
        Ok(query)
    }
}

fn split_values(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ALL)
        .map(str::to_string)
        .collect()
}

fn parse_filter(kind: Kind, tiers: &PriceTiers, name: &str, value: &str) -> Result<Option<Filter>, QueryError> {
    let value = value.trim();
    let unknown = || QueryError::UnknownFilter { kind, name: name.to_string() };
    let has_duration = kind != Kind::Properties;
    let has_neighborhood = kind != Kind::Activities;

    // name validity is checked before the "all" short-circuit so typos never pass silently
    match name {
        "category" | "price" | "location" => {}
        "duration" if has_duration => {}
        "neighborhood" | "neighborhoods" if has_neighborhood => {}
        "bedrooms" | "features" if kind == Kind::Properties => {}
        _ => return Err(unknown()),
    }
    if value.is_empty() || value == ALL {
        return Ok(None);
    }

    let filter = match name {
        "category" => {
            if !categories(kind).contains(&value) {
                return Err(QueryError::UnknownCategory { kind, value: value.to_string() });
            }
            Filter::Category(value.to_string())
        }
        "price" => Filter::Price(tiers.band(value)?),
        "duration" => Filter::Duration(value.parse()?),
        "location" => Filter::Exact { field: Field::Location, value: value.to_string() },
        "neighborhood" => Filter::Exact { field: Field::Neighborhood, value: value.to_string() },
        "neighborhoods" | "bedrooms" => {
            let values = split_values(value);
            if values.is_empty() {
                return Ok(None);
            }
            let field = if name == "bedrooms" { Field::Bedrooms } else { Field::Neighborhood };
            Filter::AnyOf { field, values }
        }
        "features" => {
            let needles: Vec<String> = split_values(value).iter().map(|v| fold(v)).collect();
            if needles.is_empty() {
                return Ok(None);
            }
            Filter::Features(needles)
        }
        _ => return Err(unknown()),
    };
    Ok(Some(filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(filters: &[(&str, &str)]) -> QuerySpec {
        QuerySpec {
            filters: filters.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn default_tables_validate() {
        for kind in Kind::ALL {
            let table = PriceTiers::for_kind(kind);
            assert_eq!(PriceTiers::new(table.tiers().to_vec()), Ok(table));
        }
    }

    #[test]
    fn tiers_reject_gap_and_overlap() {
        let gap = vec![PriceTier::new("a", 0, Some(100)), PriceTier::new("b", 150, None)];
        assert!(PriceTiers::new(gap).is_err());
        let overlap = vec![PriceTier::new("a", 0, Some(100)), PriceTier::new("b", 50, None)];
        assert!(PriceTiers::new(overlap).is_err());
        let bounded_top = vec![PriceTier::new("a", 0, Some(100))];
        assert!(PriceTiers::new(bounded_top).is_err());
        assert!(PriceTiers::new(vec![]).is_err());
    }

    #[test]
    fn band_boundaries() {
        let band = PriceTiers::for_kind(Kind::Activities).band("high").unwrap();
        assert!(!band.contains(9_999));
        assert!(band.contains(10_000));
        let low = PriceTiers::for_kind(Kind::Activities).band("low").unwrap();
        assert!(low.contains(9_999));
        assert!(!low.contains(0));
    }

    #[test]
    fn all_produces_no_clause() {
        let tiers = PriceTiers::for_kind(Kind::Activities);
        let q = spec(&[("category", "all"), ("price", "all"), ("duration", "all")]).compile(Kind::Activities, &tiers).unwrap();
        assert!(q.filters.is_empty());
    }

    #[test]
    fn rejects_unknown_names_and_values() {
        let tiers = PriceTiers::for_kind(Kind::Activities);
        assert!(matches!(
            spec(&[("bedrooms", "all")]).compile(Kind::Activities, &tiers),
            Err(QueryError::UnknownFilter { .. })
        ));
        assert!(matches!(
            spec(&[("category", "cultural")]).compile(Kind::Activities, &tiers),
            Err(QueryError::UnknownCategory { .. })
        ));
        assert_eq!(
            spec(&[("price", "luxury")]).compile(Kind::Activities, &tiers),
            Err(QueryError::UnknownPriceTier("luxury".into()))
        );
        let bad_sort = QuerySpec { sort: Some("walk-score".into()), ..Default::default() };
        assert!(matches!(bad_sort.compile(Kind::Activities, &tiers), Err(QueryError::SortNotApplicable { .. })));
    }

    #[test]
    fn multi_select_splits_values() {
        let tiers = PriceTiers::for_kind(Kind::Properties);
        let q = spec(&[("bedrooms", "2, 3"), ("features", "Garden,all")]).compile(Kind::Properties, &tiers).unwrap();
        assert!(q.filters.contains(&Filter::AnyOf {
            field: Field::Bedrooms,
            values: ["2".to_string(), "3".to_string()].into_iter().collect()
        }));
        assert!(q.filters.contains(&Filter::Features(vec!["garden".into()])));
    }

    #[test]
    fn page_request_clamps() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, per_page: 1 });
        assert_eq!(PageRequest::new(3, 1_000).per_page, MAX_PER_PAGE);
    }
}
