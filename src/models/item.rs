//! Marketplace records decoded from the inventory API.
//!
//! Responses are decoded into these types once, at the pipeline boundary.
//! Missing optional fields fall back to defaults so downstream stages never
//! probe raw JSON.

use std::fmt;

use serde::{Deserialize, Deserializer};

/// Identifier shared by a cluster of related listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One marketplace listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default = "unknown")]
    pub name: String,

    #[serde(default, rename = "price", deserialize_with = "cents")]
    pub price_cents: i64,

    #[serde(default, rename = "storePrice", deserialize_with = "cents")]
    pub store_price_cents: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub stickers: Vec<Sticker>,
}

/// A priced decoration attached to an item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sticker {
    #[serde(default = "unknown")]
    pub name: String,

    #[serde(default, rename = "price", deserialize_with = "cents")]
    pub price_cents: i64,
}

/// Entry of the top-level listing. Only the group matters here, so nothing is required.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListingEntry {
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,

    #[serde(default, rename = "groupId", deserialize_with = "optional_group")]
    pub group_id: Option<GroupId>,
}

/// A page of the top-level listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<ListingEntry>,
}

/// A page of a group's items.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Item>,
}

/// Response of the per-item image endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub data: Option<ImageData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub front: Option<String>,
}

impl ImageResponse {
    /// Front image path, if the service returned one.
    pub fn front(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.front.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn unknown() -> String {
    "Unknown".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
            RawId::Float(f) => f.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_string)
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(RawId::into_string))
}

fn optional_group<'de, D>(deserializer: D) -> Result<Option<GroupId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| GroupId(raw.into_string())))
}

fn cents<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCents {
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<RawCents>::deserialize(deserializer)? {
        Some(RawCents::Int(n)) => n,
        Some(RawCents::Float(f)) => f.round() as i64,
        None => 0,
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
