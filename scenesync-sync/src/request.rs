//! Turns a [`ChangeDescriptor`] into the outbound [`RenderRequest`].

use scenesync_client::{PhaseAction, RemovedProductRef, RenderMode, RenderPhase, RenderRequest, WireProduct};
use scenesync_core::{ImageRef, SceneSnapshot, SessionId};

use crate::classifier::{AddItem, AddKind, ChangeDescriptor, ReducedItem, RemovedItem};
use crate::error::SyncError;
use crate::prompt::{display_label, PromptContext, PromptKind, PromptProduct, PromptRemoval, PromptRenderer};

/// Build the request for `descriptor`.
///
/// Returns `Ok(None)` for `NoChange`: there is nothing to send. Incremental
/// descriptors without a usable baseline image fall back to a full render
/// from `room_image`.
pub fn build(
    descriptor: &ChangeDescriptor,
    current: &SceneSnapshot,
    baseline_image: Option<&ImageRef>,
    room_image: &ImageRef,
    session: Option<&SessionId>,
    prompts: &PromptRenderer,
) -> Result<Option<RenderRequest>, SyncError> {
    if descriptor.is_no_change() {
        return Ok(None);
    }

    let base = baseline_image.filter(|image| !image.is_blank());
    let (base, draft) = match (descriptor, base) {
        (ChangeDescriptor::Initial | ChangeDescriptor::Reset { .. }, _) => {
            (room_image, full(current))
        }
        (_, None) => {
            tracing::warn!(
                descriptor = descriptor.kind(),
                "incremental render without a baseline image; regenerating from room photo",
            );
            (room_image, full(current))
        }
        (ChangeDescriptor::Additive { items_to_add }, Some(base)) => (base, additive(items_to_add)),
        (
            ChangeDescriptor::Removal {
                items_removed,
                items_reduced,
            },
            Some(base),
        ) => (base, removal(current, items_removed, items_reduced)),
        (
            ChangeDescriptor::RemoveAndAdd {
                items_removed,
                items_reduced,
                items_to_add,
            },
            Some(base),
        ) => (base, remove_and_add(items_removed, items_reduced, items_to_add)),
        (ChangeDescriptor::QuantityDecrease { items_reduced }, Some(base)) => {
            (base, quantity_decrease(current, items_reduced))
        }
        (ChangeDescriptor::NoChange, Some(_)) => return Ok(None),
    };

    let instruction = prompts.render(draft.prompt, &draft.context)?;
    tracing::debug!(mode = ?draft.mode, products = draft.products.len(), "render request built");

    Ok(Some(RenderRequest {
        base_image: base.clone(),
        products: draft.products,
        mode: draft.mode,
        removed_product_refs: draft.removed,
        phases: draft.phases,
        force_full: draft.mode == RenderMode::Full,
        session_id: session.cloned(),
        instruction,
    }))
}

// ---------------------------------------------------------------------------
// Per-mode shaping
// ---------------------------------------------------------------------------

struct Draft {
    mode: RenderMode,
    prompt: PromptKind,
    products: Vec<WireProduct>,
    removed: Vec<RemovedProductRef>,
    phases: Vec<RenderPhase>,
    context: PromptContext,
}

fn full(current: &SceneSnapshot) -> Draft {
    let products: Vec<WireProduct> = current.items().iter().map(WireProduct::from).collect();
    Draft {
        mode: RenderMode::Full,
        prompt: PromptKind::Full,
        context: PromptContext {
            products: products.iter().map(|p| prompt_product(p, false)).collect(),
            removed_products: vec![],
        },
        products,
        removed: vec![],
        phases: vec![],
    }
}

fn additive(items_to_add: &[AddItem]) -> Draft {
    Draft {
        mode: RenderMode::Incremental,
        prompt: PromptKind::Incremental,
        products: items_to_add.iter().map(wire_add).collect(),
        removed: vec![],
        phases: vec![],
        context: PromptContext {
            products: items_to_add.iter().map(prompt_add).collect(),
            removed_products: vec![],
        },
    }
}

fn removal(current: &SceneSnapshot, items_removed: &[RemovedItem], items_reduced: &[ReducedItem]) -> Draft {
    let products: Vec<WireProduct> = current.items().iter().map(WireProduct::from).collect();
    let removed = removal_refs(items_removed, items_reduced);
    Draft {
        mode: RenderMode::Removal,
        prompt: PromptKind::Removal,
        context: PromptContext {
            products: products.iter().map(|p| prompt_product(p, false)).collect(),
            removed_products: removed.iter().map(prompt_removal).collect(),
        },
        products,
        removed,
        phases: vec![],
    }
}

fn remove_and_add(
    items_removed: &[RemovedItem],
    items_reduced: &[ReducedItem],
    items_to_add: &[AddItem],
) -> Draft {
    let products: Vec<WireProduct> = items_to_add.iter().map(wire_add).collect();
    let removed = removal_refs(items_removed, items_reduced);
    let phases = vec![
        RenderPhase {
            action: PhaseAction::Remove,
            products: vec![],
            removed_product_refs: removed.clone(),
        },
        RenderPhase {
            action: PhaseAction::Add,
            products: products.clone(),
            removed_product_refs: vec![],
        },
    ];
    Draft {
        mode: RenderMode::RemoveAndAdd,
        prompt: PromptKind::RemoveAndAdd,
        context: PromptContext {
            products: items_to_add.iter().map(prompt_add).collect(),
            removed_products: removed.iter().map(prompt_removal).collect(),
        },
        products,
        removed,
        phases,
    }
}

fn quantity_decrease(current: &SceneSnapshot, items_reduced: &[ReducedItem]) -> Draft {
    let products: Vec<WireProduct> = current.items().iter().map(WireProduct::from).collect();
    let removed: Vec<RemovedProductRef> = items_reduced.iter().map(reduced_ref).collect();
    Draft {
        mode: RenderMode::Removal,
        prompt: PromptKind::QuantityDecrease,
        context: PromptContext {
            products: products.iter().map(|p| prompt_product(p, false)).collect(),
            removed_products: removed.iter().map(prompt_removal).collect(),
        },
        products,
        removed,
        phases: vec![],
    }
}

fn wire_add(item: &AddItem) -> WireProduct {
    WireProduct {
        id: item.id.clone(),
        name: item.name.clone(),
        quantity: item.quantity,
        category: item.category.clone(),
    }
}

fn removed_ref(item: &RemovedItem) -> RemovedProductRef {
    RemovedProductRef {
        id: item.id.clone(),
        name: item.name.clone(),
        units: None,
    }
}

fn reduced_ref(item: &ReducedItem) -> RemovedProductRef {
    RemovedProductRef {
        id: item.id.clone(),
        name: item.name.clone(),
        units: Some(item.delta),
    }
}

/// Whole products first, then unit reductions on products that stay.
fn removal_refs(items_removed: &[RemovedItem], items_reduced: &[ReducedItem]) -> Vec<RemovedProductRef> {
    items_removed
        .iter()
        .map(removed_ref)
        .chain(items_reduced.iter().map(reduced_ref))
        .collect()
}

fn prompt_product(product: &WireProduct, more: bool) -> PromptProduct {
    PromptProduct {
        id: product.id.to_string(),
        label: display_label(product.id.as_str(), &product.name),
        quantity: product.quantity,
        category: product.category.clone(),
        more,
    }
}

fn prompt_add(item: &AddItem) -> PromptProduct {
    prompt_product(&wire_add(item), item.kind == AddKind::More)
}

fn prompt_removal(removed: &RemovedProductRef) -> PromptRemoval {
    PromptRemoval {
        id: removed.id.to_string(),
        label: display_label(removed.id.as_str(), &removed.name),
        units: removed.units,
    }
}
