//! Natural-language render instructions, one tera template per render mode.
//!
//! | Kind               | Template                  |
//! |--------------------|---------------------------|
//! | `Full`             | `full.tera`               |
//! | `Incremental`      | `incremental.tera`        |
//! | `Removal`          | `removal.tera`            |
//! | `QuantityDecrease` | `quantity_decrease.tera`  |
//! | `RemoveAndAdd`     | `remove_and_add.tera`     |
//!
//! A template directory passed to [`PromptRenderer::new`] may hold `.tera`
//! files with the same names; they replace the embedded ones.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::Tera;

use crate::error::{template_io_err, SyncError};

// ---------------------------------------------------------------------------
// Embedded templates
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("full.tera", include_str!("templates/full.tera")),
    ("incremental.tera", include_str!("templates/incremental.tera")),
    ("removal.tera", include_str!("templates/removal.tera")),
    ("quantity_decrease.tera", include_str!("templates/quantity_decrease.tera")),
    ("remove_and_add.tera", include_str!("templates/remove_and_add.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SyncError> {
    let entries = std::fs::read_dir(dir).map_err(|e| template_io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| template_io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| template_io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() && path.extension().and_then(|s| s.to_str()) == Some("tera") {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, SyncError> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "prompt override directory missing; using built-ins");
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;

    let mut templates = Vec::with_capacity(files.len());
    for path in files {
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| template_io_err(&path, e))?;
        tracing::debug!(template = %name, "prompt template override loaded");
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, SyncError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| ((*name).to_string(), (*content).to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        templates.extend(load_user_templates(dir)?);
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Full,
    Incremental,
    Removal,
    QuantityDecrease,
    RemoveAndAdd,
}

impl PromptKind {
    pub fn all() -> &'static [PromptKind] {
        &[
            PromptKind::Full,
            PromptKind::Incremental,
            PromptKind::Removal,
            PromptKind::QuantityDecrease,
            PromptKind::RemoveAndAdd,
        ]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            PromptKind::Full => "full.tera",
            PromptKind::Incremental => "incremental.tera",
            PromptKind::Removal => "removal.tera",
            PromptKind::QuantityDecrease => "quantity_decrease.tera",
            PromptKind::RemoveAndAdd => "remove_and_add.tera",
        }
    }
}

/// A product line in an instruction. `label` is the display name, or the id
/// when the name is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptProduct {
    pub id: String,
    pub label: String,
    pub quantity: u32,
    pub category: Option<String>,
    /// Extra units of a product already in the image.
    pub more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptRemoval {
    pub id: String,
    pub label: String,
    pub units: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptContext {
    pub products: Vec<PromptProduct>,
    pub removed_products: Vec<PromptRemoval>,
}

pub(crate) fn display_label(id: &str, name: &str) -> String {
    if name.trim().is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

// ---------------------------------------------------------------------------
// PromptRenderer
// ---------------------------------------------------------------------------

/// Renders render instructions from the embedded templates plus overrides.
pub struct PromptRenderer {
    tera: Tera,
}

impl std::fmt::Debug for PromptRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRenderer")
            .field("templates", &self.tera.get_template_names().count())
            .finish()
    }
}

impl PromptRenderer {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, SyncError> {
        Ok(Self {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Render the instruction for `kind`, trimmed of surrounding whitespace.
    pub fn render(&self, kind: PromptKind, ctx: &PromptContext) -> Result<String, SyncError> {
        let tera_ctx = tera::Context::from_serialize(ctx)?;
        let rendered = self.tera.render(kind.template_name(), &tera_ctx)?;
        Ok(rendered.trim().to_string())
    }
}
