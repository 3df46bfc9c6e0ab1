//! Change classification between the current scene and the rendered baseline.
//!
//! Precedence, first match wins:
//! 1. `Initial` (no baseline, or an empty baseline with no rendered image)
//! 2. `Reset` (baseline items exist but no rendered image shows them)
//! 3. `RemoveAndAdd` (items removed and items added)
//! 4. `Removal` (items removed)
//!
//!    Both removal kinds also carry unit decreases on retained items, so the
//!    removal step erases those units too.
//! 5. `QuantityDecrease` (only decreases)
//! 6. `Reset` (decreases mixed with increases or new items)
//! 7. `Additive` (new items and/or increases)
//! 8. `NoChange`
//!
//! Classification is pure: the same pair of inputs always yields the same
//! descriptor, and nothing is mutated.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use scenesync_core::{PlacedItem, ProductId, RenderedBaseline, SceneSnapshot};

/// Reason carried by `Reset` when increases and decreases arrive together.
pub const MIXED_QUANTITY_CHANGES: &str = "mixed quantity changes";

/// Reason carried by `Reset` when a non-empty baseline has no image.
pub const MISSING_BASELINE_IMAGE: &str = "baseline has no rendered image";

/// Whether an add-list entry is a product new to the scene or extra units of
/// one already shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddKind {
    New,
    More,
}

/// "Add `quantity` units of this product."
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddItem {
    pub id: ProductId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub quantity: u32,
    pub kind: AddKind,
}

impl AddItem {
    fn new_product(item: &PlacedItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
            quantity: item.quantity,
            kind: AddKind::New,
        }
    }

    fn more_of(item: &PlacedItem, delta: u32) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
            quantity: delta,
            kind: AddKind::More,
        }
    }
}

/// A product that was shown in the baseline and is gone now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedItem {
    pub id: ProductId,
    pub name: String,
    /// Units that the baseline image shows.
    pub quantity: u32,
}

impl From<&PlacedItem> for RemovedItem {
    fn from(item: &PlacedItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
        }
    }
}

/// A product still present with fewer units than the baseline shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReducedItem {
    pub id: ProductId,
    pub name: String,
    pub from: u32,
    pub to: u32,
    pub delta: u32,
}

/// Tagged classification of current scene vs. rendered baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeDescriptor {
    Initial,
    NoChange,
    Additive {
        items_to_add: Vec<AddItem>,
    },
    Removal {
        items_removed: Vec<RemovedItem>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        items_reduced: Vec<ReducedItem>,
    },
    RemoveAndAdd {
        items_removed: Vec<RemovedItem>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        items_reduced: Vec<ReducedItem>,
        items_to_add: Vec<AddItem>,
    },
    QuantityDecrease {
        items_reduced: Vec<ReducedItem>,
    },
    Reset {
        reason: String,
    },
}

impl ChangeDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeDescriptor::Initial => "initial",
            ChangeDescriptor::NoChange => "no_change",
            ChangeDescriptor::Additive { .. } => "additive",
            ChangeDescriptor::Removal { .. } => "removal",
            ChangeDescriptor::RemoveAndAdd { .. } => "remove_and_add",
            ChangeDescriptor::QuantityDecrease { .. } => "quantity_decrease",
            ChangeDescriptor::Reset { .. } => "reset",
        }
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, ChangeDescriptor::NoChange)
    }

    /// `true` for descriptors that regenerate from the bare room photo.
    pub fn is_full_render(&self) -> bool {
        matches!(self, ChangeDescriptor::Initial | ChangeDescriptor::Reset { .. })
    }

    /// One-line human summary, e.g. `additive: +1 Sofa, +2 more Chair`.
    pub fn summary(&self) -> String {
        let adds = |items: &[AddItem]| {
            items
                .iter()
                .map(|item| match item.kind {
                    AddKind::New => format!("+{} {}", item.quantity, label(&item.id, &item.name)),
                    AddKind::More => {
                        format!("+{} more {}", item.quantity, label(&item.id, &item.name))
                    }
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        let removes = |items: &[RemovedItem], reduced: &[ReducedItem]| {
            items
                .iter()
                .map(|item| format!("-{}", label(&item.id, &item.name)))
                .chain(reduced.iter().map(reduction))
                .collect::<Vec<_>>()
                .join(", ")
        };

        match self {
            ChangeDescriptor::Initial => "initial: full scene".to_string(),
            ChangeDescriptor::NoChange => "no_change".to_string(),
            ChangeDescriptor::Additive { items_to_add } => format!("additive: {}", adds(items_to_add)),
            ChangeDescriptor::Removal {
                items_removed,
                items_reduced,
            } => format!("removal: {}", removes(items_removed, items_reduced)),
            ChangeDescriptor::RemoveAndAdd {
                items_removed,
                items_reduced,
                items_to_add,
            } => format!(
                "remove_and_add: {}; {}",
                removes(items_removed, items_reduced),
                adds(items_to_add)
            ),
            ChangeDescriptor::QuantityDecrease { items_reduced } => format!(
                "quantity_decrease: {}",
                items_reduced
                    .iter()
                    .map(reduction)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ChangeDescriptor::Reset { reason } => format!("reset: {reason}"),
        }
    }
}

fn reduction(item: &ReducedItem) -> String {
    format!("-{} {}", item.delta, label(&item.id, &item.name))
}

fn label(id: &ProductId, name: &str) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

/// Classify `current` against the last rendered baseline.
pub fn classify(current: &SceneSnapshot, baseline: Option<&RenderedBaseline>) -> ChangeDescriptor {
    classify_with_fallback(current, baseline, None)
}

/// Like [`classify`], with the previously rendered item list available for
/// repairing an inconsistent baseline.
///
/// When an image exists but the baseline item list is empty while `current`
/// is not, `previous_rendered` stands in for the baseline. Without it,
/// `current` is compared against itself (`NoChange`) rather than misreading
/// a legitimate incremental turn as `Initial`.
pub fn classify_with_fallback(
    current: &SceneSnapshot,
    baseline: Option<&RenderedBaseline>,
    previous_rendered: Option<&SceneSnapshot>,
) -> ChangeDescriptor {
    let Some(baseline) = baseline else {
        return ChangeDescriptor::Initial;
    };
    let has_image = !baseline.image.is_blank();
    let effective = effective_baseline(current, baseline, has_image, previous_rendered);
    diff(current, effective, has_image)
}

fn effective_baseline<'a>(
    current: &'a SceneSnapshot,
    baseline: &'a RenderedBaseline,
    has_image: bool,
    previous_rendered: Option<&'a SceneSnapshot>,
) -> &'a SceneSnapshot {
    if !has_image || !baseline.snapshot.is_empty() || current.is_empty() {
        return &baseline.snapshot;
    }
    match previous_rendered.filter(|previous| !previous.is_empty()) {
        Some(previous) => {
            tracing::warn!(
                items = previous.len(),
                "baseline item list empty despite rendered image; using previous rendered items",
            );
            previous
        }
        None => {
            tracing::warn!(
                items = current.len(),
                "baseline item list empty despite rendered image and no previous list; treating scene as rendered",
            );
            current
        }
    }
}

fn diff(current: &SceneSnapshot, baseline: &SceneSnapshot, has_image: bool) -> ChangeDescriptor {
    if !has_image {
        return if baseline.is_empty() {
            ChangeDescriptor::Initial
        } else {
            ChangeDescriptor::Reset {
                reason: MISSING_BASELINE_IMAGE.to_string(),
            }
        };
    }

    let items_removed: Vec<RemovedItem> = baseline
        .items()
        .iter()
        .filter(|shown| !current.contains(&shown.id))
        .map(RemovedItem::from)
        .collect();

    let mut new_items = Vec::new();
    let mut increases = Vec::new();
    let mut decreases = Vec::new();
    for item in current.items() {
        let Some(shown) = baseline.get(&item.id) else {
            new_items.push(AddItem::new_product(item));
            continue;
        };
        match item.quantity.cmp(&shown.quantity) {
            Ordering::Greater => increases.push(AddItem::more_of(item, item.quantity - shown.quantity)),
            Ordering::Less => decreases.push(ReducedItem {
                id: item.id.clone(),
                name: item.name.clone(),
                from: shown.quantity,
                to: item.quantity,
                delta: shown.quantity - item.quantity,
            }),
            Ordering::Equal => {}
        }
    }

    let has_additions = !new_items.is_empty() || !increases.is_empty();
    let items_to_add = dedup_add_list(new_items.into_iter().chain(increases).collect());

    if !items_removed.is_empty() {
        let items_reduced = decreases;
        if !items_to_add.is_empty() {
            return ChangeDescriptor::RemoveAndAdd {
                items_removed,
                items_reduced,
                items_to_add,
            };
        }
        return ChangeDescriptor::Removal {
            items_removed,
            items_reduced,
        };
    }

    if !decreases.is_empty() {
        if !has_additions {
            return ChangeDescriptor::QuantityDecrease {
                items_reduced: decreases,
            };
        }
        return ChangeDescriptor::Reset {
            reason: MIXED_QUANTITY_CHANGES.to_string(),
        };
    }

    if !items_to_add.is_empty() && !baseline.is_empty() {
        return ChangeDescriptor::Additive { items_to_add };
    }

    ChangeDescriptor::NoChange
}

/// Keep the first entry per id. A repeat means the snapshot bookkeeping is
/// broken upstream; it is dropped, never summed.
pub(crate) fn dedup_add_list(items: Vec<AddItem>) -> Vec<AddItem> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .filter(|item| {
            if seen.insert(item.id.clone()) {
                true
            } else {
                tracing::warn!(product = %item.id, "duplicate id in add-list; dropping repeat");
                false
            }
        })
        .collect()
}
