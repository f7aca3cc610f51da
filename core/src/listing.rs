use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// The three datasets the site browses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Properties,
    Activities,
    Experiences,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Properties, Kind::Activities, Kind::Experiences];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Properties => "properties",
            Kind::Activities => "activities",
            Kind::Experiences => "experiences",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Kind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "properties" | "property" | "real-estate" => Ok(Kind::Properties),
            "activities" | "activity" => Ok(Kind::Activities),
            "experiences" | "experience" | "culture" => Ok(Kind::Experiences),
            other => Err(QueryError::UnknownKind(other.to_string())),
        }
    }
}

/// String-valued fields usable as exact-match or multi-select filter keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Location,
    Neighborhood,
    Bedrooms,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Location => "location",
            Field::Neighborhood => "neighborhood",
            Field::Bedrooms => "bedrooms",
        }
    }
}

/// Read-only view over a listing record. Optional accessors default to
/// "absent", which every filter and comparator treats as the minimum.
pub trait Listing {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> &str;
    /// Formatted price, e.g. "¥8,500" or "¥120,000/month".
    fn price(&self) -> &str;
    /// 1.0..=5.0, or 0 when unrated.
    fn rating(&self) -> f32;
    fn tags(&self) -> &[String];
    fn featured(&self) -> bool;

    fn reviews(&self) -> Option<u32> { None }
    fn duration(&self) -> Option<&str> { None }
    fn field(&self, _field: Field) -> Option<Cow<'_, str>> { None }
    fn features(&self) -> &[String] { &[] }
    fn size(&self) -> Option<&str> { None }
    fn walk_score(&self) -> Option<u32> { None }
    fn year_built(&self) -> Option<u32> { None }
}

impl<L: Listing + ?Sized> Listing for &L {
    fn id(&self) -> &str { (**self).id() }
    fn title(&self) -> &str { (**self).title() }
    fn description(&self) -> &str { (**self).description() }
    fn category(&self) -> &str { (**self).category() }
    fn price(&self) -> &str { (**self).price() }
    fn rating(&self) -> f32 { (**self).rating() }
    fn tags(&self) -> &[String] { (**self).tags() }
    fn featured(&self) -> bool { (**self).featured() }
    fn reviews(&self) -> Option<u32> { (**self).reviews() }
    fn duration(&self) -> Option<&str> { (**self).duration() }
    fn field(&self, field: Field) -> Option<Cow<'_, str>> { (**self).field(field) }
    fn features(&self) -> &[String] { (**self).features() }
    fn size(&self) -> Option<&str> { (**self).size() }
    fn walk_score(&self) -> Option<u32> { (**self).walk_score() }
    fn year_built(&self) -> Option<u32> { (**self).year_built() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub bedrooms: Option<u8>,
    /// Floor area as displayed, e.g. "85 m²".
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub walk_score: Option<u32>,
    #[serde(default)]
    pub year_built: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Listing for Property {
    fn id(&self) -> &str { &self.id }
    fn title(&self) -> &str { &self.title }
    fn description(&self) -> &str { &self.description }
    fn category(&self) -> &str { &self.category }
    fn price(&self) -> &str { &self.price }
    fn rating(&self) -> f32 { self.rating }
    fn tags(&self) -> &[String] { &self.tags }
    fn featured(&self) -> bool { self.featured }

    fn field(&self, field: Field) -> Option<Cow<'_, str>> {
        match field {
            Field::Location => Some(Cow::Borrowed(self.location.as_str())),
            Field::Neighborhood => Some(Cow::Borrowed(self.neighborhood.as_str())),
            Field::Bedrooms => self.bedrooms.map(|b| Cow::Owned(b.to_string())),
        }
    }

    fn features(&self) -> &[String] { &self.features }
    fn size(&self) -> Option<&str> { self.size.as_deref() }
    fn walk_score(&self) -> Option<u32> { self.walk_score }
    fn year_built(&self) -> Option<u32> { self.year_built }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub reviews: Option<u32>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

impl Listing for Activity {
    fn id(&self) -> &str { &self.id }
    fn title(&self) -> &str { &self.title }
    fn description(&self) -> &str { &self.description }
    fn category(&self) -> &str { &self.category }
    fn price(&self) -> &str { &self.price }
    fn rating(&self) -> f32 { self.rating }
    fn tags(&self) -> &[String] { &self.tags }
    fn featured(&self) -> bool { self.featured }
    fn reviews(&self) -> Option<u32> { self.reviews }
    fn duration(&self) -> Option<&str> { Some(&self.duration) }

    fn field(&self, field: Field) -> Option<Cow<'_, str>> {
        match field {
            Field::Location => Some(Cow::Borrowed(self.location.as_str())),
            _ => None,
        }
    }
}

/// A hosted cultural experience (tea ceremony, kimono fitting, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub reviews: Option<u32>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

impl Listing for Experience {
    fn id(&self) -> &str { &self.id }
    fn title(&self) -> &str { &self.title }
    fn description(&self) -> &str { &self.description }
    fn category(&self) -> &str { &self.category }
    fn price(&self) -> &str { &self.price }
    fn rating(&self) -> f32 { self.rating }
    fn tags(&self) -> &[String] { &self.tags }
    fn featured(&self) -> bool { self.featured }
    fn reviews(&self) -> Option<u32> { self.reviews }
    fn duration(&self) -> Option<&str> { Some(&self.duration) }

    fn field(&self, field: Field) -> Option<Cow<'_, str>> {
        match field {
            Field::Location => Some(Cow::Borrowed(self.location.as_str())),
            Field::Neighborhood => Some(Cow::Borrowed(self.neighborhood.as_str())),
            Field::Bedrooms => None,
        }
    }
}
