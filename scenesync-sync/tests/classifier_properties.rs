use std::collections::BTreeSet;

use rstest::rstest;
use scenesync_core::{ImageRef, PlacedItem, ProductId, RenderedBaseline, SceneSnapshot};
use scenesync_sync::{classify, ChangeDescriptor};

fn scene(items: &[(&str, u32)]) -> SceneSnapshot {
    items
        .iter()
        .map(|(id, q)| PlacedItem::new(*id, id.to_uppercase()).with_quantity(*q))
        .collect()
}

fn rendered(items: &[(&str, u32)]) -> RenderedBaseline {
    RenderedBaseline::new(ImageRef::from("https://cdn/render.png"), scene(items))
}

fn ids<'a>(iter: impl Iterator<Item = &'a ProductId>) -> BTreeSet<ProductId> {
    iter.cloned().collect()
}

#[rstest]
#[case::first_render(&[], None, "initial")]
#[case::add_new_item(&[("a", 1), ("b", 1)], Some(&[("a", 1)][..]), "additive")]
#[case::add_more_units(&[("a", 3)], Some(&[("a", 2)][..]), "additive")]
#[case::remove_item(&[("b", 1)], Some(&[("a", 1), ("b", 1)][..]), "removal")]
#[case::swap_items(&[("b", 1)], Some(&[("a", 1)][..]), "remove_and_add")]
#[case::fewer_units(&[("a", 1)], Some(&[("a", 2)][..]), "quantity_decrease")]
#[case::up_and_down(&[("a", 2), ("b", 1)], Some(&[("a", 1), ("b", 2)][..]), "reset")]
#[case::clear_room(&[], Some(&[("a", 1)][..]), "removal")]
#[case::remove_one_reduce_other(&[("a", 1)], Some(&[("a", 2), ("b", 1)][..]), "removal")]
#[case::swap_and_reduce(&[("a", 1), ("c", 1)], Some(&[("a", 2), ("b", 1)][..]), "remove_and_add")]
#[case::remove_one_grow_other(&[("a", 3)], Some(&[("a", 2), ("b", 1)][..]), "remove_and_add")]
#[case::unchanged(&[("a", 1)], Some(&[("a", 1)][..]), "no_change")]
fn classifies_scenarios(
    #[case] now: &[(&str, u32)],
    #[case] shown: Option<&[(&str, u32)]>,
    #[case] expected: &str,
) {
    let baseline = shown.map(rendered);
    assert_eq!(classify(&scene(now), baseline.as_ref()).kind(), expected);
}

#[rstest]
#[case(&[("a", 1), ("b", 2)], &[("a", 1)])]
#[case(&[("b", 1)], &[("a", 1), ("b", 1)])]
#[case(&[("a", 2), ("b", 1)], &[("a", 1), ("b", 2)])]
#[case(&[], &[("a", 3)])]
fn classification_is_idempotent(#[case] now: &[(&str, u32)], #[case] shown: &[(&str, u32)]) {
    let current = scene(now);
    let baseline = rendered(shown);
    assert_eq!(classify(&current, Some(&baseline)), classify(&current, Some(&baseline)));
}

#[rstest]
#[case(&[("a", 1), ("b", 2), ("c", 1)], &[("a", 1), ("b", 1)])]
#[case(&[("a", 4)], &[("a", 1)])]
#[case(&[("a", 1)], &[("a", 5)])]
fn additive_and_decrease_lists_cover_current_ids(
    #[case] now: &[(&str, u32)],
    #[case] shown: &[(&str, u32)],
) {
    let current = scene(now);
    let baseline = rendered(shown);
    let changed = match classify(&current, Some(&baseline)) {
        ChangeDescriptor::Additive { items_to_add } => ids(items_to_add.iter().map(|item| &item.id)),
        ChangeDescriptor::QuantityDecrease { items_reduced } => {
            ids(items_reduced.iter().map(|item| &item.id))
        }
        other => panic!("expected additive or quantity_decrease, got {other:?}"),
    };

    let unchanged: BTreeSet<ProductId> = current
        .items()
        .iter()
        .filter(|item| baseline.snapshot.get(&item.id).map(|b| b.quantity) == Some(item.quantity))
        .map(|item| item.id.clone())
        .collect();
    assert!(changed.is_disjoint(&unchanged));
    let union: BTreeSet<ProductId> = changed.union(&unchanged).cloned().collect();
    assert_eq!(union, current.ids());
}

#[rstest]
#[case(&[("b", 1)], &[("a", 1), ("b", 1), ("c", 2)])]
#[case(&[], &[("a", 1)])]
#[case(&[("d", 1)], &[("a", 1), ("b", 1)])]
fn removed_and_retained_cover_baseline_ids(#[case] now: &[(&str, u32)], #[case] shown: &[(&str, u32)]) {
    let current = scene(now);
    let baseline = rendered(shown);
    let removed = match classify(&current, Some(&baseline)) {
        ChangeDescriptor::Removal { items_removed, .. } => ids(items_removed.iter().map(|item| &item.id)),
        ChangeDescriptor::RemoveAndAdd { items_removed, .. } => {
            ids(items_removed.iter().map(|item| &item.id))
        }
        other => panic!("expected a removal, got {other:?}"),
    };
    let retained: BTreeSet<ProductId> = baseline
        .snapshot
        .ids()
        .into_iter()
        .filter(|id| current.contains(id))
        .collect();
    assert!(removed.is_disjoint(&retained));
    let union: BTreeSet<ProductId> = removed.union(&retained).cloned().collect();
    assert_eq!(union, baseline.snapshot.ids());
}

/// Ids the descriptor instructs the renderer to touch. Full renders redraw
/// every current product.
fn touched_ids(descriptor: &ChangeDescriptor, current: &SceneSnapshot) -> BTreeSet<ProductId> {
    match descriptor {
        ChangeDescriptor::Initial | ChangeDescriptor::Reset { .. } => current.ids(),
        ChangeDescriptor::NoChange => BTreeSet::new(),
        ChangeDescriptor::Additive { items_to_add } => ids(items_to_add.iter().map(|item| &item.id)),
        ChangeDescriptor::QuantityDecrease { items_reduced } => {
            ids(items_reduced.iter().map(|item| &item.id))
        }
        ChangeDescriptor::Removal {
            items_removed,
            items_reduced,
        } => ids(items_removed
            .iter()
            .map(|item| &item.id)
            .chain(items_reduced.iter().map(|item| &item.id))),
        ChangeDescriptor::RemoveAndAdd {
            items_removed,
            items_reduced,
            items_to_add,
        } => ids(items_removed
            .iter()
            .map(|item| &item.id)
            .chain(items_reduced.iter().map(|item| &item.id))
            .chain(items_to_add.iter().map(|item| &item.id))),
    }
}

#[rstest]
#[case::removal_with_decrease(&[("a", 1)], &[("a", 2), ("b", 1)])]
#[case::removal_with_increase(&[("a", 3)], &[("a", 2), ("b", 1)])]
#[case::swap_with_decrease(&[("a", 1), ("c", 1)], &[("a", 2), ("b", 1)])]
#[case::swap_with_increase(&[("a", 4), ("c", 2)], &[("a", 2), ("b", 1)])]
#[case::removal_with_both(&[("a", 1), ("c", 3)], &[("a", 2), ("b", 1), ("c", 1)])]
#[case::remove_two_reduce_two(&[("c", 1), ("d", 2)], &[("a", 1), ("b", 1), ("c", 3), ("d", 5)])]
fn every_changed_id_reaches_the_descriptor(#[case] now: &[(&str, u32)], #[case] shown: &[(&str, u32)]) {
    let current = scene(now);
    let baseline = rendered(shown);
    let descriptor = classify(&current, Some(&baseline));
    let touched = touched_ids(&descriptor, &current);

    for item in current.items() {
        let before = baseline.snapshot.get(&item.id).map(|b| b.quantity);
        if before != Some(item.quantity) {
            assert!(
                touched.contains(&item.id),
                "{} changed {before:?} -> {} but {descriptor:?} omits it",
                item.id,
                item.quantity
            );
        }
    }
    for id in baseline.snapshot.ids() {
        if !current.contains(&id) {
            assert!(touched.contains(&id), "{id} was removed but {descriptor:?} omits it");
        }
    }
}

#[test]
fn numeric_and_string_ids_compare_equal() {
    let current: SceneSnapshot =
        serde_json::from_str(r#"[{"id": 7, "name": "Lamp"}]"#).expect("current");
    let baseline: RenderedBaseline = serde_json::from_str(
        r#"{"image": "https://cdn/render.png", "items": [{"id": "7", "name": "Lamp"}]}"#,
    )
    .expect("baseline");
    assert_eq!(classify(&current, Some(&baseline)), ChangeDescriptor::NoChange);
}
