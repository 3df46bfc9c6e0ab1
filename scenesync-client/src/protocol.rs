//! Wire shapes exchanged with the rendering, session, and history services.
//!
//! All bodies are camelCase JSON. Errors come back as `{"detail": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use scenesync_core::{HistoryEntry, ImageRef, PlacedItem, ProductId, SceneSnapshot, SessionId};

use crate::error::CallError;

/// How the renderer should treat `baseImage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Regenerate the scene from the bare room photo.
    Full,
    /// Add the listed products to the previous render.
    Incremental,
    /// Erase the referenced products (or some of their units).
    Removal,
    /// Erase first, then add, both on the previous render.
    RemoveAndAdd,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Full => "full",
            RenderMode::Incremental => "incremental",
            RenderMode::Removal => "removal",
            RenderMode::RemoveAndAdd => "remove_and_add",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireProduct {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<&PlacedItem> for WireProduct {
    fn from(item: &PlacedItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            category: item.category.clone(),
        }
    }
}

impl From<&WireProduct> for PlacedItem {
    fn from(product: &WireProduct) -> Self {
        let mut item = PlacedItem::new(product.id.clone(), product.name.clone())
            .with_quantity(product.quantity);
        item.category = product.category.clone();
        item
    }
}

/// A product the renderer must erase from the base image.
///
/// `units` is set when only some of the shown units go away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedProductRef {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseAction {
    Remove,
    Add,
}

/// One ordered step of a `remove_and_add` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPhase {
    pub action: PhaseAction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<WireProduct>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_product_refs: Vec<RemovedProductRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub base_image: ImageRef,
    pub products: Vec<WireProduct>,
    pub mode: RenderMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_product_refs: Vec<RemovedProductRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<RenderPhase>,
    #[serde(default)]
    pub force_full: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    #[serde(default)]
    pub rendered_image: Option<ImageRef>,
    #[serde(default)]
    pub products_in_scene: Vec<WireProduct>,
}

impl RenderResponse {
    /// The rendered image, or `EmptyResult` when the service answered
    /// successfully without one.
    pub fn image(&self) -> Result<&ImageRef, CallError> {
        match &self.rendered_image {
            Some(image) if !image.is_blank() => Ok(image),
            _ => Err(CallError::EmptyResult(
                "renderer returned no image".to_string(),
            )),
        }
    }

    /// Whether the service's reported scene has the same ids and quantities
    /// as `expected`. `None` when the service reported no products.
    pub fn confirms(&self, expected: &SceneSnapshot) -> Option<bool> {
        if self.products_in_scene.is_empty() {
            return None;
        }
        let reported: SceneSnapshot = self.products_in_scene.iter().map(PlacedItem::from).collect();
        Some(reported.fingerprint() == expected.fingerprint())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(alias = "session_id")]
    pub session_id: SessionId,
}

/// Undo/redo state as stored by the server-side history service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedHistory {
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
    #[serde(default)]
    pub cursor: Option<usize>,
    #[serde(default)]
    pub can_undo: bool,
    #[serde(default)]
    pub can_redo: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Extract the human-readable `detail` from an error body.
///
/// Non-string details (validation error lists) are passed through as JSON;
/// bodies that are not JSON at all are returned trimmed.
pub fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "no detail provided".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_camel_case_and_omits_empty_lists() {
        let request = RenderRequest {
            base_image: ImageRef::from("https://cdn/room.jpg"),
            products: vec![WireProduct {
                id: ProductId::from(5u32),
                name: "Lamp".to_string(),
                quantity: 1,
                category: Some("lighting".to_string()),
            }],
            mode: RenderMode::Incremental,
            removed_product_refs: vec![],
            phases: vec![],
            force_full: false,
            session_id: None,
            instruction: "Add a lamp.".to_string(),
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["baseImage"], "https://cdn/room.jpg");
        assert_eq!(json["mode"], "incremental");
        assert_eq!(json["products"][0]["id"], "5");
        assert!(json.get("removedProductRefs").is_none());
        assert!(json.get("phases").is_none());
        assert!(json.get("sessionId").is_none());
    }

    #[test]
    fn response_without_image_is_empty_result() {
        let response: RenderResponse =
            serde_json::from_str(r#"{"productsInScene": []}"#).expect("decode");
        assert!(matches!(response.image(), Err(CallError::EmptyResult(_))));

        let blank: RenderResponse =
            serde_json::from_str(r#"{"renderedImage": "  "}"#).expect("decode");
        assert!(matches!(blank.image(), Err(CallError::EmptyResult(_))));
    }

    #[test]
    fn reported_scene_is_checked_by_ids_and_quantities() {
        let expected = SceneSnapshot::new([
            PlacedItem::new("7", "Lamp").with_quantity(2),
            PlacedItem::new("9", "Sofa"),
        ]);

        let silent: RenderResponse =
            serde_json::from_str(r#"{"renderedImage": "https://cdn/r.png"}"#).expect("decode");
        assert_eq!(silent.confirms(&expected), None);

        let same: RenderResponse = serde_json::from_str(
            r#"{"renderedImage": "https://cdn/r.png",
                "productsInScene": [{"id": 9, "quantity": 1}, {"id": "7", "name": "Lamp", "quantity": 2}]}"#,
        )
        .expect("decode");
        assert_eq!(same.confirms(&expected), Some(true));

        let stale: RenderResponse = serde_json::from_str(
            r#"{"renderedImage": "https://cdn/r.png",
                "productsInScene": [{"id": "7", "quantity": 1}, {"id": "9", "quantity": 1}]}"#,
        )
        .expect("decode");
        assert_eq!(stale.confirms(&expected), Some(false));
    }

    #[test]
    fn error_detail_handles_string_list_and_plain_bodies() {
        assert_eq!(error_detail(r#"{"detail": "room image missing"}"#), "room image missing");
        assert_eq!(
            error_detail(r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#),
            r#"[{"loc":["body"],"msg":"field required"}]"#
        );
        assert_eq!(error_detail("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_detail(""), "no detail provided");
    }

    #[test]
    fn session_response_accepts_snake_case() {
        let response: SessionResponse =
            serde_json::from_str(r#"{"session_id": "s-1"}"#).expect("decode");
        assert_eq!(response.session_id, SessionId::from("s-1"));
    }
}
