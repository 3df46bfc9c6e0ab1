//! Domain types for scene synchronization.
//!
//! Snapshots, baselines, and history entries are value objects: every
//! mutation produces a new value, nothing is edited in place.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Catalog product identifier in canonical string form.
///
/// Upstream sources hand out ids as JSON numbers or strings; both collapse to
/// the same normalized value here so comparisons never mix types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_f64(value: f64) -> Self {
        // Integral floats (`12.0`) come from loosely typed clients; they name
        // the same product as `12`.
        if value.is_finite() && value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
            Self((value as i64).to_string())
        } else {
            Self(value.to_string())
        }
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<i64> for ProductId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl From<u64> for ProductId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<u32> for ProductId {
    fn from(n: u32) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Signed(i64),
            Unsigned(u64),
            Float(f64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Signed(n) => Self::from(n),
            RawId::Unsigned(n) => Self::from(n),
            RawId::Float(f) => Self::from_f64(f),
            RawId::Text(s) => Self::new(s),
        })
    }
}

/// Reference to a rendered or uploaded image: a URL or a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` when the reference carries nothing usable.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a design session issued by the session-lifecycle service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Placed items and snapshots
// ---------------------------------------------------------------------------

fn default_quantity() -> u32 {
    1
}

/// One product instance placed in the room.
///
/// Only `quantity` may change for an item that stays in the scene across
/// turns. `price` and `image_url` are display metadata and never take part in
/// synchronization decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub id: ProductId,
    #[serde(default, alias = "displayName")]
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PlacedItem {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity: 1,
            category: None,
            price: None,
            image_url: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// The set of placed items at one point in time.
///
/// Construction normalizes the raw list: repeated ids are merged into one
/// entry (quantities summed, first occurrence keeps its position) and
/// zero-quantity entries are dropped, so every id appears at most once with a
/// positive quantity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PlacedItem>", into = "Vec<PlacedItem>")]
pub struct SceneSnapshot {
    items: Vec<PlacedItem>,
}

impl SceneSnapshot {
    pub fn new(items: impl IntoIterator<Item = PlacedItem>) -> Self {
        let mut merged: Vec<PlacedItem> = Vec::new();
        let mut positions: HashMap<ProductId, usize> = HashMap::new();
        for item in items {
            if item.quantity == 0 {
                continue;
            }
            match positions.get(&item.id) {
                Some(&idx) => {
                    let existing = &mut merged[idx];
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => {
                    positions.insert(item.id.clone(), merged.len());
                    merged.push(item);
                }
            }
        }
        Self { items: merged }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[PlacedItem] {
        &self.items
    }

    pub fn get(&self, id: &ProductId) -> Option<&PlacedItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> BTreeSet<ProductId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn quantities(&self) -> BTreeMap<ProductId, u32> {
        self.items
            .iter()
            .map(|item| (item.id.clone(), item.quantity))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// SHA-256 hex digest of the sorted `(id, quantity)` pairs.
    ///
    /// Metadata and item order do not affect the digest.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (id, quantity) in self.quantities() {
            hasher.update(id.as_str().as_bytes());
            hasher.update(b"\t");
            hasher.update(quantity.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

impl From<Vec<PlacedItem>> for SceneSnapshot {
    fn from(items: Vec<PlacedItem>) -> Self {
        Self::new(items)
    }
}

impl From<SceneSnapshot> for Vec<PlacedItem> {
    fn from(snapshot: SceneSnapshot) -> Self {
        snapshot.items
    }
}

impl FromIterator<PlacedItem> for SceneSnapshot {
    fn from_iter<T: IntoIterator<Item = PlacedItem>>(iter: T) -> Self {
        Self::new(iter)
    }
}

// ---------------------------------------------------------------------------
// Baselines and history
// ---------------------------------------------------------------------------

/// The snapshot that the currently displayed rendered image shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedBaseline {
    pub image: ImageRef,
    #[serde(rename = "items")]
    pub snapshot: SceneSnapshot,
    #[serde(default = "Utc::now")]
    pub rendered_at: DateTime<Utc>,
}

impl RenderedBaseline {
    pub fn new(image: ImageRef, snapshot: SceneSnapshot) -> Self {
        Self {
            image,
            snapshot,
            rendered_at: Utc::now(),
        }
    }
}

/// A navigable undo/redo checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub image: ImageRef,
    #[serde(rename = "items")]
    pub snapshot: SceneSnapshot,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(image: ImageRef, snapshot: SceneSnapshot) -> Self {
        Self {
            image,
            snapshot,
            recorded_at: Utc::now(),
        }
    }

    /// Per-item quantities at the time the entry was recorded.
    pub fn quantities(&self) -> BTreeMap<ProductId, u32> {
        self.snapshot.quantities()
    }

    /// The baseline this entry restores.
    pub fn to_baseline(&self) -> RenderedBaseline {
        RenderedBaseline {
            image: self.image.clone(),
            snapshot: self.snapshot.clone(),
            rendered_at: self.recorded_at,
        }
    }
}

impl From<&RenderedBaseline> for HistoryEntry {
    fn from(baseline: &RenderedBaseline) -> Self {
        Self {
            image: baseline.image.clone(),
            snapshot: baseline.snapshot.clone(),
            recorded_at: baseline.rendered_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
