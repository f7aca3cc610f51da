//! Simulated "live" market updates: each tick nudges one listing's rating or
//! price in place. Callers re-run their query after every tick.

use rand::Rng;
use serde::Serialize;

use crate::catalog::Record;
use crate::text::{format_thousands, parse_price_value, single_digit_group};

const RATING_STEP: f32 = 0.1;
const MAX_PRICE_SWING: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field", rename_all = "lowercase")]
pub enum Change {
    Rating { id: String, from: f32, to: f32 },
    Price { id: String, from: String, to: String },
}

/// Perturb one randomly chosen listing. Returns `None` when the pick was a
/// no-op: an empty slice, an unrated listing, or a price that is not a single
/// digit group.
pub fn tick<L: Record, R: Rng>(listings: &mut [L], rng: &mut R) -> Option<Change> {
    if listings.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..listings.len());
    let listing = &mut listings[idx];
    let change = if rng.gen_bool(0.5) {
        nudge_rating(listing, rng)
    } else {
        nudge_price(listing, rng)
    };
    if let Some(change) = &change {
        tracing::debug!(?change, "live update");
    }
    change
}

fn nudge_rating<L: Record, R: Rng>(listing: &mut L, rng: &mut R) -> Option<Change> {
    let from = listing.rating();
    if from == 0.0 {
        return None;
    }
    let delta = if rng.gen_bool(0.5) { RATING_STEP } else { -RATING_STEP };
    let to = (((from + delta) * 10.0).round() / 10.0).clamp(1.0, 5.0);
    *listing.rating_mut() = to;
    Some(Change::Rating { id: listing.id().to_string(), from, to })
}

fn nudge_price<L: Record, R: Rng>(listing: &mut L, rng: &mut R) -> Option<Change> {
    single_digit_group(listing.price())?;
    let value = parse_price_value(listing.price());
    if value == 0 {
        return None;
    }
    let swing = rng.gen_range(-MAX_PRICE_SWING..=MAX_PRICE_SWING);
    let next = ((value as f64) * (1.0 + swing)).round().max(1.0) as u64;
    let from = listing.price().to_string();
    let to = reprice(&from, next)?;
    *listing.price_mut() = to.clone();
    Some(Change::Price { id: listing.id().to_string(), from, to })
}

/// Replace the digit run of a formatted price, keeping currency prefix and
/// unit suffix: `reprice("¥120,000/month", 126000) == "¥126,000/month"`.
/// Prices with several digit runs are left alone.
pub fn reprice(price: &str, value: u64) -> Option<String> {
    let span = single_digit_group(price)?;
    Some(format!("{}{}{}", &price[..span.start], format_thousands(value), &price[span.end..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::listing::{Activity, Experience};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn reprice_keeps_prefix_and_suffix() {
        assert_eq!(reprice("¥120,000/month", 126_000).as_deref(), Some("¥126,000/month"));
        assert_eq!(reprice("¥8,500", 8_900).as_deref(), Some("¥8,900"));
        assert_eq!(reprice("Contact for pricing", 10), None);
    }

    #[test]
    fn multi_number_prices_are_never_repriced() {
        assert_eq!(reprice("¥3,000 for 2 people", 30_102), None);
        let json = r#"[{"id":"pair","title":"Pair","description":"","category":"Crafts",
            "price":"¥3,000 for 2 people","rating":0,"duration":"2 hours","location":"Gion","tags":[],"featured":false}]"#;
        let mut catalog = Catalog::<Experience>::from_json_str(json).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(tick(catalog.listings_mut(), &mut rng), None);
        }
        assert_eq!(catalog.get("pair").unwrap().price, "¥3,000 for 2 people");
    }

    #[test]
    fn ticks_stay_in_domain() {
        let mut catalog = Catalog::<Activity>::bundled().unwrap();
        let originals: Vec<u64> = catalog.listings().iter().map(|a| parse_price_value(&a.price)).collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            tick(catalog.listings_mut(), &mut rng);
        }
        for (a, original) in catalog.listings().iter().zip(originals) {
            assert!(a.rating == 0.0 || (1.0..=5.0).contains(&a.rating), "{} drifted to {}", a.id, a.rating);
            if original == 0 {
                assert_eq!(parse_price_value(&a.price), 0);
            } else {
                assert!(a.price.starts_with('¥'));
                assert!(parse_price_value(&a.price) > 0);
            }
        }
    }

    #[test]
    fn unrated_listings_are_left_alone() {
        let mut catalog = Catalog::<Activity>::bundled().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            tick(catalog.listings_mut(), &mut rng);
        }
        assert_eq!(catalog.get("act-private-temple").unwrap().rating, 0.0);
    }

    #[test]
    fn empty_slice_is_noop() {
        let mut empty: Vec<Activity> = Vec::new();
        assert_eq!(tick(&mut empty, &mut StdRng::seed_from_u64(0)), None);
    }
}
