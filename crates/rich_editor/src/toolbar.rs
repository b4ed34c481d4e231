use serde::{Deserialize, Serialize};

use crate::bullet::BulletRegistry;
use crate::selection::FormatState;

/// What a toolbar control asks the editor to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum ToolbarAction {
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    ToggleList,
    SelectBulletStyle(String),
    ChangeColor(String),
    InsertTemplate,
    OpenHtmlDialog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolbarControlKind {
    Mark,
    List,
    Bullet,
    Color,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarControl {
    pub id: String,
    pub label: String,
    pub kind: ToolbarControlKind,
    pub active: bool,
    pub disabled: bool,
    action: ToolbarAction,
}

impl ToolbarControl {
    fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        kind: ToolbarControlKind,
        action: ToolbarAction,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            active: false,
            disabled: false,
            action,
        }
    }

    fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn action(&self) -> &ToolbarAction {
        &self.action
    }

    /// The action to dispatch, or `None` for a disabled control.
    pub fn click(&self) -> Option<ToolbarAction> {
        (!self.disabled).then(|| self.action.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarOptions {
    pub disabled: bool,
    pub show_text_color: bool,
    /// Value the color control applies.
    pub text_color: Option<String>,
    pub show_template: bool,
    pub show_html_insert: bool,
    pub html_label: Option<String>,
}

pub const DEFAULT_TEXT_COLOR: &str = "#000000";

pub struct Toolbar;

impl Toolbar {
    pub fn controls(
        state: &FormatState,
        registry: &BulletRegistry,
        options: &ToolbarOptions,
    ) -> Vec<ToolbarControl> {
        let mut controls = vec![
            ToolbarControl::new("bold", "Bold", ToolbarControlKind::Mark, ToolbarAction::ToggleBold)
                .active(state.bold),
            ToolbarControl::new(
                "italic",
                "Italic",
                ToolbarControlKind::Mark,
                ToolbarAction::ToggleItalic,
            )
            .active(state.italic),
            ToolbarControl::new(
                "underline",
                "Underline",
                ToolbarControlKind::Mark,
                ToolbarAction::ToggleUnderline,
            )
            .active(state.underline),
            ToolbarControl::new(
                "list",
                "Bulleted list",
                ToolbarControlKind::List,
                ToolbarAction::ToggleList,
            )
            .active(state.list_active),
        ];

        for style in registry.styles() {
            let active =
                state.list_active && state.current_bullet_style.as_deref() == Some(style.id.as_str());
            controls.push(
                ToolbarControl::new(
                    format!("bullet:{}", style.id),
                    style.label.clone(),
                    ToolbarControlKind::Bullet,
                    ToolbarAction::SelectBulletStyle(style.id.clone()),
                )
                .active(active),
            );
        }

        if options.show_text_color {
            let color = options
                .text_color
                .clone()
                .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string());
            controls.push(ToolbarControl::new(
                "color",
                "Text color",
                ToolbarControlKind::Color,
                ToolbarAction::ChangeColor(color),
            ));
        }
        if options.show_template {
            controls.push(ToolbarControl::new(
                "template",
                "Insert template",
                ToolbarControlKind::Insert,
                ToolbarAction::InsertTemplate,
            ));
        }
        if options.show_html_insert {
            let label = options
                .html_label
                .clone()
                .unwrap_or_else(|| crate::dialog::DEFAULT_HTML_LABEL.to_string());
            controls.push(ToolbarControl::new(
                "html",
                label,
                ToolbarControlKind::Insert,
                ToolbarAction::OpenHtmlDialog,
            ));
        }

        if options.disabled {
            for control in &mut controls {
                control.disabled = true;
            }
        }
        controls
    }

    pub fn find<'a>(controls: &'a [ToolbarControl], id: &str) -> Option<&'a ToolbarControl> {
        controls.iter().find(|control| control.id == id)
    }
}
