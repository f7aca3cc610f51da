//! The listing query engine: search, filter, sort and page over an in-memory
//! slice of listings. Every stage is pure; none of them can fail.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::listing::{Field, Listing};
use crate::query::{DurationBucket, Filter, PageRequest, PriceBand, Query, SortKey, ALL};
use crate::text::{contains_folded, fold, parse_duration_hours, parse_leading_number, parse_price_value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// Keeps listings whose title, description or any tag contains the query,
/// case-insensitively. A blank query keeps everything.
pub fn filter_by_search<L: Listing + Clone>(listings: &[L], query: &str) -> Vec<L> {
    let needle = fold(query.trim());
    if needle.is_empty() {
        return listings.to_vec();
    }
    listings
        .iter()
        .filter(|l| {
            contains_folded(l.title(), &needle)
                || contains_folded(l.description(), &needle)
                || l.tags().iter().any(|t| contains_folded(t, &needle))
        })
        .cloned()
        .collect()
}

pub fn filter_by_category<L: Listing + Clone>(listings: &[L], category: &str) -> Vec<L> {
    if category == ALL {
        return listings.to_vec();
    }
    listings.iter().filter(|l| l.category() == category).cloned().collect()
}

/// `None` is the "all" tier.
pub fn filter_by_price_range<L: Listing + Clone>(listings: &[L], band: Option<PriceBand>) -> Vec<L> {
    match band {
        None => listings.to_vec(),
        Some(band) => listings
            .iter()
            .filter(|l| band.contains(parse_price_value(l.price())))
            .cloned()
            .collect(),
    }
}

/// `None` is the "all" bucket. Listings without a parseable duration never
/// match a bucket.
pub fn filter_by_duration<L: Listing + Clone>(listings: &[L], bucket: Option<DurationBucket>) -> Vec<L> {
    match bucket {
        None => listings.to_vec(),
        Some(bucket) => listings
            .iter()
            .filter(|l| bucket.contains(l.duration().map(parse_duration_hours).unwrap_or(0.0)))
            .cloned()
            .collect(),
    }
}

pub fn filter_by_exact_field<L: Listing + Clone>(listings: &[L], field: Field, value: &str) -> Vec<L> {
    if value == ALL {
        return listings.to_vec();
    }
    listings
        .iter()
        .filter(|l| l.field(field).map_or(false, |v| v == value))
        .cloned()
        .collect()
}

/// Multi-select: the field value must be one of `values`. Empty set keeps all.
pub fn filter_by_any_of<L: Listing + Clone>(listings: &[L], field: Field, values: &BTreeSet<String>) -> Vec<L> {
    if values.is_empty() {
        return listings.to_vec();
    }
    listings
        .iter()
        .filter(|l| l.field(field).map_or(false, |v| values.contains(&*v)))
        .cloned()
        .collect()
}

/// Free-text multi-select over `features`: any feature containing any needle.
pub fn filter_by_features<L: Listing + Clone, S: AsRef<str>>(listings: &[L], needles: &[S]) -> Vec<L> {
    let needles: Vec<String> = needles
        .iter()
        .map(|n| fold(n.as_ref().trim()))
        .filter(|n| !n.is_empty())
        .collect();
    if needles.is_empty() {
        return listings.to_vec();
    }
    listings
        .iter()
        .filter(|l| {
            l.features().iter().any(|f| {
                let f = fold(f);
                needles.iter().any(|n| f.contains(n.as_str()))
            })
        })
        .cloned()
        .collect()
}

/// Returns a new, stably sorted vector.
pub fn sort_listings<L: Listing + Clone>(listings: &[L], key: SortKey) -> Vec<L> {
    let mut out = listings.to_vec();
    match key {
        SortKey::Newest => {}
        SortKey::PriceLow => out.sort_by_cached_key(|l| parse_price_value(l.price())),
        SortKey::PriceHigh => out.sort_by_cached_key(|l| std::cmp::Reverse(parse_price_value(l.price()))),
        SortKey::Rating => out.sort_by(|a, b| {
            b.rating()
                .total_cmp(&a.rating())
                .then_with(|| b.reviews().unwrap_or(0).cmp(&a.reviews().unwrap_or(0)))
        }),
        SortKey::Featured => out.sort_by_key(|l| !l.featured()),
        SortKey::Size => sort_desc_missing_last(&mut out, |l| l.size().and_then(parse_leading_number)),
        SortKey::WalkScore => sort_desc_missing_last(&mut out, |l| l.walk_score().map(f64::from)),
        SortKey::YearBuilt => sort_desc_missing_last(&mut out, |l| l.year_built().map(f64::from)),
    }
    out
}

fn sort_desc_missing_last<L, F>(items: &mut [L], key: F)
where
    F: Fn(&L) -> Option<f64>,
{
    items.sort_by(|a, b| match (key(a), key(b)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Slice one page out of an already ordered result.
pub fn paginate<T: Clone>(items: &[T], request: PageRequest) -> Page<T> {
    let request = PageRequest::new(request.page, request.per_page);
    let total = items.len();
    let total_pages = total.div_ceil(request.per_page);
    let start = (request.page - 1).saturating_mul(request.per_page).min(total);
    let end = start.saturating_add(request.per_page).min(total);
    Page {
        items: items[start..end].to_vec(),
        total,
        page: request.page,
        per_page: request.per_page,
        total_pages,
    }
}

/// Category facet counts, most frequent first, ties by name.
pub fn category_counts<L: Listing>(listings: &[L]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for l in listings {
        *counts.entry(l.category()).or_insert(0) += 1;
    }
    let mut out: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

fn apply<L: Listing + Clone>(listings: &[L], filter: &Filter) -> Vec<L> {
    match filter {
        Filter::Category(c) => filter_by_category(listings, c),
        Filter::Price(band) => filter_by_price_range(listings, Some(*band)),
        Filter::Duration(bucket) => filter_by_duration(listings, Some(*bucket)),
        Filter::Exact { field, value } => filter_by_exact_field(listings, *field, value),
        Filter::AnyOf { field, values } => filter_by_any_of(listings, *field, values),
        Filter::Features(needles) => filter_by_features(listings, needles.as_slice()),
    }
}

/// Full pipeline without pagination: search, category, price, duration,
/// field filters, then sort.
pub fn run<'a, L: Listing>(listings: &'a [L], query: &Query) -> Vec<&'a L> {
    let all: Vec<&L> = listings.iter().collect();
    let mut out = filter_by_search(&all, &query.search);
    tracing::debug!(stage = "search", remaining = out.len());

    let mut filters: Vec<&Filter> = query.filters.iter().collect();
    filters.sort_by_key(|f| f.stage());
    for filter in filters {
        out = apply(&out, filter);
        tracing::debug!(?filter, remaining = out.len());
    }
    sort_listings(&out, query.sort)
}

/// [`paginate`] when a page was requested, otherwise everything as one page.
pub fn page_of<T: Clone>(items: &[T], request: Option<PageRequest>) -> Page<T> {
    match request {
        Some(request) => paginate(items, request),
        None => {
            let total = items.len();
            Page { items: items.to_vec(), total, page: 1, per_page: total, total_pages: usize::from(total > 0) }
        }
    }
}

/// [`run`] followed by [`page_of`].
pub fn execute<'a, L: Listing>(listings: &'a [L], query: &Query) -> Page<&'a L> {
    page_of(&run(listings, query), query.page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Activity;

    fn act(id: &str, price: &str, rating: f32, reviews: Option<u32>) -> Activity {
        Activity {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            category: "Cultural".into(),
            price: price.into(),
            rating,
            reviews,
            duration: String::new(),
            location: String::new(),
            tags: vec![],
            featured: false,
        }
    }

    fn ids<L: Listing>(items: &[L]) -> Vec<&str> { items.iter().map(|l| l.id()).collect() }

    #[test]
    fn rating_ties_break_on_reviews() {
        let items = vec![act("a", "", 4.5, Some(10)), act("b", "", 4.5, Some(90)), act("c", "", 4.9, None)];
        assert_eq!(ids(&sort_listings(&items, SortKey::Rating)), vec!["c", "b", "a"]);
    }

    #[test]
    fn price_sorts_are_stable() {
        let items = vec![act("a", "¥500", 0.0, None), act("b", "¥100", 0.0, None), act("c", "¥500", 0.0, None)];
        assert_eq!(ids(&sort_listings(&items, SortKey::PriceLow)), vec!["b", "a", "c"]);
        assert_eq!(ids(&sort_listings(&items, SortKey::PriceHigh)), vec!["a", "c", "b"]);
        assert_eq!(ids(&items), vec!["a", "b", "c"]);
    }

    #[test]
    fn paginate_reports_totals() {
        let items: Vec<u32> = (1..=25).collect();
        let page = paginate(&items, PageRequest::new(3, 10));
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!((page.total, page.total_pages), (25, 3));
        let past_end = paginate(&items, PageRequest::new(9, 10));
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 25);
    }

    #[test]
    fn counts_order_by_frequency_then_name() {
        let mut items = vec![act("a", "", 0.0, None), act("b", "", 0.0, None), act("c", "", 0.0, None)];
        items[0].category = "Nature".into();
        items[1].category = "Culinary".into();
        items[2].category = "Nature".into();
        assert_eq!(category_counts(&items), vec![("Nature".to_string(), 2), ("Culinary".to_string(), 1)]);
    }
}
