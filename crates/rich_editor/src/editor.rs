//! The editor component: a command port plus the bullet normalizer, the
//! selection reflector, the toolbar model and the HTML dialog.
//!
//! Every mutating entry point runs the same pipeline afterwards: list
//! normalization, format reflection, character recount and the change
//! callback. Failures inside the pipeline are logged and swallowed; nothing
//! propagates to the owner.

use std::sync::Arc;
use std::time::Instant;

use crate::bullet::{BulletRegistry, BulletStyle};
use crate::commands;
use crate::config::EditorProps;
use crate::core::{Document, EditSession, ElementNode, Point, Selection};
use crate::dialog::HtmlInsertDialog;
use crate::markup::{is_blank, parse_markup, plain_text, to_markup};
use crate::normalize::{BulletAssignment, ListNormalizer, NormalizePass};
use crate::ops::{Op, Transaction};
use crate::port::{CommandPort, PortError};
use crate::selection::{
    FormatState, SelectionChange, SelectionHub, SelectionReflector, SelectionSubscription,
    SurfaceId,
};
use crate::serde_value::EditorContent;
use crate::surface::MemorySurface;
use crate::toolbar::{Toolbar, ToolbarAction, ToolbarControl};

const LOG_TARGET: &str = "manos_rich_editor::editor";

/// Text a Tab outside a list inserts.
pub const TAB_TEXT: &str = "    ";

type ChangeCallback = Box<dyn FnMut(&EditorContent)>;
type TemplateOverride = Box<dyn FnMut()>;
type HtmlOverride = Box<dyn FnMut(&str)>;

#[derive(Default)]
pub struct EditorCallbacks {
    on_change: Option<ChangeCallback>,
    on_insert_template: Option<TemplateOverride>,
    on_open_html: Option<HtmlOverride>,
}

impl EditorCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_change(mut self, f: impl FnMut(&EditorContent) + 'static) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }

    /// Replaces the built-in template insertion.
    pub fn on_insert_template(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_insert_template = Some(Box::new(f));
        self
    }

    /// Replaces the built-in HTML dialog; receives the configured seed.
    pub fn on_open_html(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.on_open_html = Some(Box::new(f));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterCount {
    pub count: usize,
    pub max_length: Option<usize>,
    pub over_limit: bool,
}

impl CharacterCount {
    pub fn new(count: usize, max_length: Option<usize>) -> Self {
        Self {
            count,
            max_length,
            over_limit: max_length.is_some_and(|max| count > max),
        }
    }

    pub fn of(doc: &Document, max_length: Option<usize>) -> Self {
        Self::new(plain_text(doc).chars().count(), max_length)
    }

    pub fn label(&self) -> String {
        match self.max_length {
            Some(max) => format!("{}/{} characters", self.count, max),
            None => format!("{} characters", self.count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Tab,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: EditorKey,
    pub shift: bool,
}

impl KeyPress {
    pub fn tab() -> Self {
        Self {
            key: EditorKey::Tab,
            shift: false,
        }
    }

    pub fn shift_tab() -> Self {
        Self {
            key: EditorKey::Tab,
            shift: true,
        }
    }
}

pub struct RichTextEditor<P: CommandPort = MemorySurface> {
    id: SurfaceId,
    port: P,
    props: EditorProps,
    registry: Arc<BulletRegistry>,
    normalizer: ListNormalizer,
    reflector: SelectionReflector,
    subscription: Option<SelectionSubscription>,
    dialog: HtmlInsertDialog,
    callbacks: EditorCallbacks,
    count: CharacterCount,
}

impl RichTextEditor<MemorySurface> {
    pub fn new(props: EditorProps, callbacks: EditorCallbacks) -> Self {
        let props = props.with_defaults();
        let doc = parse_markup(props.initial_markup());
        let port = MemorySurface::with_config(doc, props.session);
        Self::build(port, props, callbacks)
    }
}

impl<P: CommandPort> RichTextEditor<P> {
    /// Wraps an existing surface. A configured value or default value
    /// replaces the surface content.
    pub fn with_port(mut port: P, props: EditorProps, callbacks: EditorCallbacks) -> Self {
        let props = props.with_defaults();
        if props.value.is_some() || props.default_value.is_some() {
            port.replace_document(parse_markup(props.initial_markup()));
        }
        Self::build(port, props, callbacks)
    }

    fn build(port: P, props: EditorProps, callbacks: EditorCallbacks) -> Self {
        let registry = Arc::new(props.bullets.registry());
        let normalizer = ListNormalizer::new(props.bullets.policy(), Arc::clone(&registry));
        let id = SurfaceId::next();
        let dialog = HtmlInsertDialog::new(
            props.html_insert.seed.clone(),
            props.html_insert.label.clone(),
        );
        let count = CharacterCount::of(port.document(), props.max_length);
        let mut editor = Self {
            id,
            port,
            props,
            registry,
            normalizer,
            reflector: SelectionReflector::new(id),
            subscription: None,
            dialog,
            callbacks,
            count,
        };
        // Initial content is normalized but never reported as a change.
        editor.normalize();
        editor.reflector.refresh(&editor.port);
        editor.recount();
        editor
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn props(&self) -> &EditorProps {
        &self.props
    }

    pub fn registry(&self) -> &BulletRegistry {
        &self.registry
    }

    pub fn document(&self) -> &Document {
        self.port.document()
    }

    pub fn selection(&self) -> &Selection {
        self.port.selection()
    }

    pub fn markup(&self) -> String {
        to_markup(self.port.document())
    }

    pub fn content(&self) -> EditorContent {
        EditorContent::from_document(self.port.document())
    }

    pub fn format_state(&self) -> &FormatState {
        self.reflector.state()
    }

    pub fn character_count(&self) -> CharacterCount {
        self.count
    }

    /// Counter text, when the counter is shown.
    pub fn character_count_label(&self) -> Option<String> {
        self.props
            .show_character_count
            .then(|| self.count.label())
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.props.placeholder.as_deref()
    }

    pub fn placeholder_visible(&self) -> bool {
        self.props.placeholder.is_some() && self.count.count == 0
    }

    pub fn surface_style(&self) -> String {
        self.props.text_style.to_css()
    }

    pub fn is_disabled(&self) -> bool {
        self.props.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.props.disabled = disabled;
    }

    pub fn toolbar_controls(&self) -> Vec<ToolbarControl> {
        Toolbar::controls(
            self.reflector.state(),
            &self.registry,
            &self.props.toolbar_options(),
        )
    }

    pub fn dialog(&self) -> &HtmlInsertDialog {
        &self.dialog
    }

    /// Brings a controlled editor in line with the owner's value. Content is
    /// only replaced when the normalized value differs from the surface, so
    /// echoing back an emitted value never disturbs the caret.
    pub fn sync_value(&mut self, value: Option<&str>) {
        let Some(value) = value else {
            return;
        };
        self.props.value = Some(value.to_string());

        let next = self.normalized_document(value);
        if to_markup(&next) == to_markup(self.port.document()) {
            return;
        }
        tracing::debug!(target: LOG_TARGET, surface = self.id.get(), "controlled value replaced surface content");
        self.port.replace_document(next);
        self.normalize();
        self.reflector.refresh(&self.port);
        self.recount();
    }

    pub fn type_text(&mut self, text: &str) {
        if self.props.disabled {
            return;
        }
        let result = self.port.insert_text(text);
        self.finish("insert_text", result);
    }

    pub fn delete_backward(&mut self) {
        if self.props.disabled {
            return;
        }
        let result = self.port.delete_backward();
        self.finish("delete_backward", result);
    }

    /// Returns whether the key's default behavior was prevented.
    pub fn handle_key(&mut self, key: KeyPress) -> bool {
        if key.key != EditorKey::Tab || self.props.disabled {
            return false;
        }
        let in_list = self
            .port
            .document()
            .list_item_ancestor(&self.port.selection().focus.path)
            .is_some();
        let result = match (in_list, key.shift) {
            (true, false) => self.port.indent(),
            (true, true) => self.port.outdent(),
            (false, _) => self.port.insert_text(TAB_TEXT),
        };
        self.finish("tab", result);
        true
    }

    pub fn dispatch(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::ToggleBold => self.toggle_bold(),
            ToolbarAction::ToggleItalic => self.toggle_italic(),
            ToolbarAction::ToggleUnderline => self.toggle_underline(),
            ToolbarAction::ToggleList => self.toggle_list(),
            ToolbarAction::SelectBulletStyle(id) => self.select_bullet_style(&id),
            ToolbarAction::ChangeColor(color) => self.change_color(&color),
            ToolbarAction::InsertTemplate => self.insert_template(),
            ToolbarAction::OpenHtmlDialog => self.open_html_dialog(),
        }
    }

    pub fn toggle_bold(&mut self) {
        if self.props.disabled {
            return;
        }
        let result = self.port.toggle_bold();
        self.finish("bold", result);
    }

    pub fn toggle_italic(&mut self) {
        if self.props.disabled {
            return;
        }
        let result = self.port.toggle_italic();
        self.finish("italic", result);
    }

    pub fn toggle_underline(&mut self) {
        if self.props.disabled {
            return;
        }
        let result = self.port.toggle_underline();
        self.finish("underline", result);
    }

    pub fn toggle_list(&mut self) {
        if self.props.disabled {
            return;
        }
        let result = self.port.toggle_list();
        self.finish("toggle_list", result);
    }

    pub fn change_color(&mut self, color: &str) {
        if self.props.disabled {
            return;
        }
        let result = self.port.set_foreground_color(color);
        self.finish("fore_color", result);
    }

    /// Puts the focused list under `id`, creating a list first when the
    /// caret is not in an unordered one.
    pub fn select_bullet_style(&mut self, id: &str) {
        if self.props.disabled {
            return;
        }
        let focus = self.port.selection().focus.clone();
        if !commands::in_unordered_list(self.port.document(), &focus) {
            if let Err(err) = self.port.toggle_list() {
                self.finish("select_bullet_style", Err(err));
                return;
            }
        }
        let result = match self.bullet_style_tx(id) {
            Some(tx) => self.port.apply_transaction(tx),
            None => Ok(()),
        };
        self.finish("select_bullet_style", result);
    }

    fn bullet_style_tx(&self, id: &str) -> Option<Transaction> {
        let doc = self.port.document();
        let list_path = doc.list_ancestor(&self.port.selection().focus.path)?;
        let el = doc.element(&list_path)?;
        let depth = (1..=list_path.len())
            .filter(|&n| doc.element(&list_path[..n]).is_some_and(ElementNode::is_list))
            .count();
        let assignment = BulletAssignment {
            path: list_path.clone(),
            depth,
            style_id: id.to_string(),
            hints: self.registry.resolve(id).map(BulletStyle::hints),
            kept_existing: false,
        };
        let patch = assignment.patch_for(el);
        if patch.is_empty() {
            return None;
        }
        Some(
            Transaction::new(vec![Op::SetNodeAttrs {
                path: list_path,
                patch,
            }])
            .source("command:list.select_bullet_style"),
        )
    }

    /// Runs the owner's override when one is set, otherwise inserts the
    /// configured template. Nothing happens while templates are disabled.
    pub fn insert_template(&mut self) {
        if self.props.disabled || !self.props.template.enabled {
            return;
        }
        if let Some(on_insert) = self.callbacks.on_insert_template.as_mut() {
            on_insert();
            return;
        }
        let markup = self.props.template.markup.clone();
        self.insert_html(&markup);
    }

    pub fn open_html_dialog(&mut self) {
        if self.props.disabled || !self.props.html_insert.enabled {
            return;
        }
        if let Some(on_open) = self.callbacks.on_open_html.as_mut() {
            on_open(&self.props.html_insert.seed);
            return;
        }
        self.dialog.open();
    }

    pub fn set_html_draft(&mut self, draft: impl Into<String>) {
        self.dialog.set_draft(draft);
    }

    pub fn cancel_html_dialog(&mut self) {
        self.dialog.cancel();
    }

    /// Inserts the dialog draft and closes the dialog.
    pub fn confirm_html_dialog(&mut self) {
        if let Some(markup) = self.dialog.confirm() {
            self.insert_html(&markup);
        }
    }

    /// Follows a changed seed after the dialog's debounce.
    pub fn sync_html_seed(&mut self, seed: impl Into<String>, now: Instant) {
        let seed = seed.into();
        self.props.html_insert.seed = seed.clone();
        self.dialog.sync_seed(seed, now);
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        self.dialog.tick(now)
    }

    /// Inserts raw markup at the caret. When the surface refuses, the parsed
    /// markup is appended to the end of the document instead.
    pub fn insert_html(&mut self, markup: &str) {
        if self.props.disabled {
            return;
        }
        let fragment = parse_markup(markup);
        if is_blank(&fragment) {
            return;
        }
        if let Err(err) = self.port.insert_raw_markup(markup) {
            tracing::debug!(target: LOG_TARGET, %err, "raw markup insertion refused, appending");
            let tx = append_tx(self.port.document(), fragment);
            let result = self.port.apply_transaction(tx);
            self.finish("insert_html.append", result);
            return;
        }
        self.finish("insert_html", Ok(()));
    }

    pub fn undo(&mut self) {
        if self.props.disabled {
            return;
        }
        if self.port.undo() {
            self.finish("undo", Ok(()));
        }
    }

    pub fn redo(&mut self) {
        if self.props.disabled {
            return;
        }
        if self.port.redo() {
            self.finish("redo", Ok(()));
        }
    }

    /// Moves the caret without going through a hub.
    pub fn select(&mut self, selection: Selection) {
        let change = SelectionChange::inside(self.id, selection);
        self.handle_selection_change(&change);
    }

    /// Reacts to a page-wide selection change. Returns whether the change was
    /// inside this editor.
    pub fn handle_selection_change(&mut self, change: &SelectionChange) -> bool {
        self.reflector.reflect(&mut self.port, change)
    }

    pub fn attach(&mut self, hub: &mut SelectionHub) {
        self.subscription = Some(hub.subscribe(self.id));
    }

    /// Applies selection changes queued by the hub since the last poll.
    pub fn poll_selection(&mut self) -> bool {
        let Some(subscription) = &self.subscription else {
            return false;
        };
        let pending = subscription.drain();
        let mut reflected = false;
        for selection in pending {
            let change = SelectionChange::inside(self.id, selection);
            reflected |= self.reflector.reflect(&mut self.port, &change);
        }
        reflected
    }

    fn finish(&mut self, action: &'static str, result: Result<(), PortError>) {
        if let Err(err) = result {
            tracing::debug!(target: LOG_TARGET, action, %err, "command failed");
        }
        self.normalize();
        self.reflector.refresh(&self.port);
        self.recount();
        self.emit();
    }

    fn normalize(&mut self) {
        let limit = self.props.session.max_normalize_iterations.max(1);
        for _ in 0..limit {
            let ops = self.normalizer.run(self.port.document());
            if ops.is_empty() {
                return;
            }
            tracing::trace!(target: LOG_TARGET, ops = ops.len(), "bullet normalization");
            if let Err(err) = self.port.apply_normalization(ops) {
                tracing::warn!(target: LOG_TARGET, %err, "bullet normalization failed");
                return;
            }
        }
        tracing::warn!(target: LOG_TARGET, "bullet normalization did not converge");
    }

    fn normalized_document(&self, markup: &str) -> Document {
        let mut session = EditSession::from_document(parse_markup(markup));
        for _ in 0..self.props.session.max_normalize_iterations.max(1) {
            let ops = self.normalizer.run(session.doc());
            if ops.is_empty() {
                break;
            }
            if let Err(err) = session.apply_normalization(ops) {
                tracing::warn!(target: LOG_TARGET, %err, "controlled value normalization failed");
                break;
            }
        }
        session.doc().clone()
    }

    fn recount(&mut self) {
        self.count = CharacterCount::of(self.port.document(), self.props.max_length);
    }

    fn emit(&mut self) {
        let Some(on_change) = self.callbacks.on_change.as_mut() else {
            return;
        };
        let content = EditorContent::from_document(self.port.document());
        on_change(&content);
    }
}

fn append_tx(doc: &Document, fragment: Document) -> Transaction {
    let base = doc.children.len();
    let mut preview = doc.clone();
    preview.children.extend(fragment.children.iter().cloned());
    let caret = preview
        .end_point()
        .unwrap_or_else(|| Point::new(Vec::new(), 0));

    let ops = fragment
        .children
        .into_iter()
        .enumerate()
        .map(|(i, node)| Op::InsertNode {
            path: vec![base + i],
            node,
        })
        .collect();
    Transaction::new(ops)
        .selection_after(Selection::collapsed(caret))
        .source("command:insert_html.append")
}
