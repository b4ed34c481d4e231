use serde::{Deserialize, Serialize};

use crate::bullet::{BulletRegistry, BulletStyle};
use crate::core::SessionConfig;
use crate::dialog::DEFAULT_HTML_LABEL;
use crate::normalize::BulletPolicy;
use crate::toolbar::ToolbarOptions;

/// Typography of the editable surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub color: Option<String>,
    pub font_weight: Option<String>,
    pub font_size: Option<String>,
    pub line_height: Option<String>,
}

impl TextStyle {
    /// Inline CSS declarations for the set properties.
    pub fn to_css(&self) -> String {
        [
            ("color", &self.color),
            ("font-weight", &self.font_weight),
            ("font-size", &self.font_size),
            ("line-height", &self.line_height),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}: {v};")))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletConfig {
    /// Replaces the built-in styles when non-empty.
    pub catalogue: Option<Vec<BulletStyle>>,
    pub level_map: Vec<String>,
    pub default_style: Option<String>,
    pub nested_style: Option<String>,
}

impl BulletConfig {
    pub fn policy(&self) -> BulletPolicy {
        let defaults = BulletPolicy::default();
        BulletPolicy {
            level_map: self.level_map.clone(),
            default_style: self
                .default_style
                .clone()
                .unwrap_or(defaults.default_style),
            nested_style: self.nested_style.clone().unwrap_or(defaults.nested_style),
        }
    }

    /// The effective registry. A broken catalogue falls back to the
    /// built-in styles.
    pub fn registry(&self) -> BulletRegistry {
        BulletRegistry::from_catalogue(self.catalogue.clone()).unwrap_or_else(|err| {
            tracing::warn!(target: "manos_rich_editor::config", %err, "invalid bullet catalogue, using built-in styles");
            BulletRegistry::builtin()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateInsert {
    pub enabled: bool,
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlInsert {
    pub enabled: bool,
    pub seed: String,
    pub label: String,
}

impl Default for HtmlInsert {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: String::new(),
            label: DEFAULT_HTML_LABEL.to_string(),
        }
    }
}

/// Owner-supplied editor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorProps {
    /// Controlled value. When set, the owner drives content through
    /// `sync_value`.
    pub value: Option<String>,
    pub default_value: Option<String>,
    pub placeholder: Option<String>,
    pub disabled: bool,
    pub max_length: Option<usize>,
    pub show_character_count: bool,
    pub text_style: TextStyle,
    pub show_text_color: bool,
    pub bullets: BulletConfig,
    pub template: TemplateInsert,
    pub html_insert: HtmlInsert,
    pub session: SessionConfig,
}

impl EditorProps {
    pub fn with_defaults(mut self) -> Self {
        self.session = self.session.with_defaults();
        if self.html_insert.label.trim().is_empty() {
            self.html_insert.label = DEFAULT_HTML_LABEL.to_string();
        }
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(s).map(Self::with_defaults)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn is_controlled(&self) -> bool {
        self.value.is_some()
    }

    /// Markup the surface starts with.
    pub fn initial_markup(&self) -> &str {
        self.value
            .as_deref()
            .or(self.default_value.as_deref())
            .unwrap_or_default()
    }

    pub fn toolbar_options(&self) -> ToolbarOptions {
        ToolbarOptions {
            disabled: self.disabled,
            show_text_color: self.show_text_color,
            text_color: self.text_style.color.clone(),
            show_template: self.template.enabled,
            show_html_insert: self.html_insert.enabled,
            html_label: Some(self.html_insert.label.clone()),
        }
    }
}
