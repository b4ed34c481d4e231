use std::collections::BTreeSet;

use crate::commands;
use crate::core::{Document, EditSession, Marks, Selection, SessionConfig};
use crate::markup::parse_markup;
use crate::ops::{Op, Transaction};
use crate::port::{ActiveFormats, CommandPort, NativeCommand, PortError};

/// An editable surface held entirely in memory.
///
/// Marks toggled on a collapsed caret are remembered as pending and applied
/// to the next typed text, the way a browser surface behaves.
pub struct MemorySurface {
    session: EditSession,
    pending_marks: Option<Marks>,
    unavailable: BTreeSet<NativeCommand>,
    rejected: BTreeSet<NativeCommand>,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::from_document(Document::default())
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: Document) -> Self {
        Self::with_session(EditSession::from_document(doc))
    }

    pub fn from_markup(markup: &str) -> Self {
        Self::from_document(parse_markup(markup))
    }

    pub fn with_config(doc: Document, config: SessionConfig) -> Self {
        Self::with_session(EditSession::at_end(doc, config))
    }

    fn with_session(session: EditSession) -> Self {
        Self {
            session,
            pending_marks: None,
            unavailable: BTreeSet::new(),
            rejected: BTreeSet::new(),
        }
    }

    /// Makes `command` report [`PortError::Unavailable`].
    pub fn without(mut self, command: NativeCommand) -> Self {
        self.unavailable.insert(command);
        self
    }

    /// Makes `command` report [`PortError::Rejected`].
    pub fn rejecting(mut self, command: NativeCommand) -> Self {
        self.rejected.insert(command);
        self
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn pending_marks(&self) -> Option<&Marks> {
        self.pending_marks.as_ref()
    }

    fn check(&self, command: NativeCommand) -> Result<(), PortError> {
        if self.unavailable.contains(&command) {
            return Err(PortError::Unavailable(command));
        }
        if self.rejected.contains(&command) {
            return Err(PortError::rejected(command, "refused by surface"));
        }
        Ok(())
    }

    fn run(
        &mut self,
        command: NativeCommand,
        build: impl FnOnce(&Document, &Selection) -> Result<Transaction, String>,
    ) -> Result<(), PortError> {
        self.check(command)?;
        let tx = build(self.session.doc(), self.session.selection())
            .map_err(|reason| PortError::rejected(command, reason))?;
        if tx.is_empty() {
            return Ok(());
        }
        self.session.apply(tx)?;
        Ok(())
    }

    fn caret_marks(&self) -> Marks {
        self.pending_marks.clone().unwrap_or_else(|| {
            commands::marks_at(self.session.doc(), &self.session.selection().focus)
        })
    }

    fn toggle_mark(
        &mut self,
        command: NativeCommand,
        get: fn(&Marks) -> bool,
        set: fn(&mut Marks, bool),
    ) -> Result<(), PortError> {
        self.check(command)?;
        let selection = self.session.selection().clone();
        if selection.is_collapsed() {
            let mut marks = self.caret_marks();
            let on = get(&marks);
            set(&mut marks, !on);
            self.pending_marks = Some(marks);
            return Ok(());
        }

        let all = commands::selection_has_mark(self.session.doc(), &selection, get)
            .unwrap_or_else(|| get(&self.caret_marks()));
        let target = !all;
        self.run(command, |doc, sel| {
            commands::apply_mark_range(doc, sel, &|mut marks| {
                set(&mut marks, target);
                marks
            })
        })
    }
}

impl CommandPort for MemorySurface {
    fn toggle_bold(&mut self) -> Result<(), PortError> {
        self.toggle_mark(NativeCommand::Bold, |m| m.bold, |m, on| m.bold = on)
    }

    fn toggle_italic(&mut self) -> Result<(), PortError> {
        self.toggle_mark(NativeCommand::Italic, |m| m.italic, |m, on| m.italic = on)
    }

    fn toggle_underline(&mut self) -> Result<(), PortError> {
        self.toggle_mark(NativeCommand::Underline, |m| m.underline, |m, on| {
            m.underline = on
        })
    }

    fn toggle_list(&mut self) -> Result<(), PortError> {
        self.run(NativeCommand::InsertUnorderedList, commands::toggle_unordered_list)
    }

    fn indent(&mut self) -> Result<(), PortError> {
        self.run(NativeCommand::Indent, |doc, sel| {
            commands::indent_list_item(doc, sel).map(Option::unwrap_or_default)
        })
    }

    fn outdent(&mut self) -> Result<(), PortError> {
        self.run(NativeCommand::Outdent, |doc, sel| {
            commands::outdent_list_item(doc, sel).map(Option::unwrap_or_default)
        })
    }

    fn set_foreground_color(&mut self, color: &str) -> Result<(), PortError> {
        self.check(NativeCommand::ForeColor)?;
        if self.session.selection().is_collapsed() {
            let mut marks = self.caret_marks();
            marks.text_color = Some(color.to_string());
            self.pending_marks = Some(marks);
            return Ok(());
        }
        self.run(NativeCommand::ForeColor, |doc, sel| {
            commands::apply_mark_range(doc, sel, &|mut marks| {
                marks.text_color = Some(color.to_string());
                marks
            })
        })
    }

    fn insert_raw_markup(&mut self, markup: &str) -> Result<(), PortError> {
        let fragment = parse_markup(markup);
        self.run(NativeCommand::InsertHtml, |doc, sel| {
            commands::insert_fragment(doc, sel, &fragment)
        })
    }

    fn insert_text(&mut self, text: &str) -> Result<(), PortError> {
        let pending = self.pending_marks.take();
        let result = self.run(NativeCommand::InsertText, |doc, sel| {
            commands::insert_text(doc, sel, text, pending.as_ref())
        });
        if result.is_err() {
            self.pending_marks = pending;
        }
        result
    }

    fn delete_backward(&mut self) -> Result<(), PortError> {
        self.pending_marks = None;
        self.run(NativeCommand::Delete, commands::delete_backward)
    }

    fn query_active_formats(&self) -> Result<ActiveFormats, PortError> {
        self.check(NativeCommand::QueryState)?;
        let doc = self.session.doc();
        let selection = self.session.selection();
        let caret = self.caret_marks();
        let active = |get: fn(&Marks) -> bool| {
            if selection.is_collapsed() {
                get(&caret)
            } else {
                commands::selection_has_mark(doc, selection, get).unwrap_or_else(|| get(&caret))
            }
        };
        Ok(ActiveFormats {
            bold: active(|m| m.bold),
            italic: active(|m| m.italic),
            underline: active(|m| m.underline),
            unordered_list: commands::in_unordered_list(doc, &selection.focus),
        })
    }

    fn undo(&mut self) -> bool {
        self.pending_marks = None;
        self.session.undo()
    }

    fn redo(&mut self) -> bool {
        self.pending_marks = None;
        self.session.redo()
    }

    fn document(&self) -> &Document {
        self.session.doc()
    }

    fn selection(&self) -> &Selection {
        self.session.selection()
    }

    fn set_selection(&mut self, selection: Selection) {
        if selection != *self.session.selection() {
            self.pending_marks = None;
        }
        self.session.set_selection(selection);
    }

    fn replace_document(&mut self, doc: Document) {
        self.pending_marks = None;
        self.session.replace_document(doc);
    }

    fn apply_transaction(&mut self, tx: Transaction) -> Result<(), PortError> {
        self.session.apply(tx)?;
        Ok(())
    }

    fn apply_normalization(&mut self, ops: Vec<Op>) -> Result<(), PortError> {
        self.session.apply_normalization(ops)?;
        Ok(())
    }
}
