//! Bullet style catalogue.
//!
//! A list node stores the id of its style in [`BULLET_STYLE_ATTR`] together
//! with the rendering hints from [`BulletStyle::hints`], so a renderer can
//! paint the marker without consulting the registry again.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::Attrs;

pub const BULLET_STYLE_ATTR: &str = "data-bullet-style";
pub const BULLET_CONTENT_ATTR: &str = "data-bullet-content";
pub const BULLET_ICON_ATTR: &str = "data-bullet-icon";
pub const BULLET_COLOR_ATTR: &str = "data-bullet-color";
pub const BULLET_SIZE_ATTR: &str = "data-bullet-size";

pub const BULLET_HINT_ATTRS: [&str; 4] = [
    BULLET_CONTENT_ATTR,
    BULLET_ICON_ATTR,
    BULLET_COLOR_ATTR,
    BULLET_SIZE_ATTR,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// A code point from the icon font.
    Icon,
    /// A plain character rendered with the text font.
    #[default]
    Glyph,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletStyle {
    pub id: String,
    pub label: String,
    pub marker: String,
    #[serde(default)]
    pub kind: MarkerKind,
    pub color: String,
    pub size: String,
}

impl BulletStyle {
    pub fn glyph(
        id: impl Into<String>,
        label: impl Into<String>,
        marker: impl Into<String>,
        color: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            marker: marker.into(),
            kind: MarkerKind::Glyph,
            color: color.into(),
            size: size.into(),
        }
    }

    pub fn icon(
        id: impl Into<String>,
        label: impl Into<String>,
        marker: impl Into<String>,
        color: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            kind: MarkerKind::Icon,
            ..Self::glyph(id, label, marker, color, size)
        }
    }

    pub fn is_icon(&self) -> bool {
        self.kind == MarkerKind::Icon
    }

    pub fn hints(&self) -> Attrs {
        let mut attrs = Attrs::new();
        attrs.insert(BULLET_CONTENT_ATTR.to_string(), self.marker.clone());
        if self.is_icon() {
            attrs.insert(BULLET_ICON_ATTR.to_string(), "true".to_string());
        }
        attrs.insert(BULLET_COLOR_ATTR.to_string(), self.color.clone());
        attrs.insert(BULLET_SIZE_ATTR.to_string(), self.size.clone());
        attrs
    }
}

pub fn builtin_bullet_styles() -> Vec<BulletStyle> {
    vec![
        BulletStyle::glyph("dot", "Dot", "\u{2022}", "#1f2937", "1em"),
        BulletStyle::glyph("circle", "Hollow circle", "\u{25e6}", "#1f2937", "1em"),
        BulletStyle::glyph("check", "Check", "\u{2713}", "#16a34a", "0.9em"),
        BulletStyle::glyph("star", "Star", "\u{2605}", "#eab308", "0.9em"),
        BulletStyle::icon(
            "check-circle-orange",
            "Orange check circle",
            "\u{f058}",
            "#f97316",
            "0.85em",
        ),
        BulletStyle::glyph("check-orange", "Orange check", "\u{2714}", "#f97316", "0.9em"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulletRegistryError {
    #[error("duplicate bullet style id: {0}")]
    DuplicateId(String),
}

#[derive(Debug, Clone)]
pub struct BulletRegistry {
    styles: Vec<BulletStyle>,
    index: HashMap<String, usize>,
}

impl BulletRegistry {
    pub fn new(styles: Vec<BulletStyle>) -> Result<Self, BulletRegistryError> {
        let mut index = HashMap::with_capacity(styles.len());
        for (ix, style) in styles.iter().enumerate() {
            if index.insert(style.id.clone(), ix).is_some() {
                return Err(BulletRegistryError::DuplicateId(style.id.clone()));
            }
        }
        Ok(Self { styles, index })
    }

    pub fn builtin() -> Self {
        Self::new(builtin_bullet_styles()).expect("builtin bullet styles must be unique")
    }

    /// Builds the effective registry: the caller's catalogue when one is
    /// given, otherwise the built-in styles.
    pub fn from_catalogue(
        catalogue: Option<Vec<BulletStyle>>,
    ) -> Result<Self, BulletRegistryError> {
        match catalogue {
            Some(styles) if !styles.is_empty() => Self::new(styles),
            _ => Ok(Self::builtin()),
        }
    }

    pub fn resolve(&self, id: &str) -> Option<&BulletStyle> {
        self.index.get(id).map(|&ix| &self.styles[ix])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn styles(&self) -> &[BulletStyle] {
        &self.styles
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl Default for BulletRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
