//! Selection tracking.
//!
//! Selection changes are global: every editor on the page hears about every
//! change. [`SelectionHub`] fans changes out over channels and each
//! [`SelectionSubscription`] filters to its own surface. The
//! [`SelectionReflector`] turns the surface's selection into the toolbar's
//! [`FormatState`].

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};

use crate::bullet::BULLET_STYLE_ATTR;
use crate::core::{Document, Selection};
use crate::port::CommandPort;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one editable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A selection change somewhere on the page. `surface` is `None` when the
/// selection left every editable surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub surface: Option<SurfaceId>,
    pub selection: Selection,
}

impl SelectionChange {
    pub fn inside(surface: SurfaceId, selection: Selection) -> Self {
        Self {
            surface: Some(surface),
            selection,
        }
    }

    pub fn outside(selection: Selection) -> Self {
        Self {
            surface: None,
            selection,
        }
    }
}

#[derive(Debug, Default)]
pub struct SelectionHub {
    subscribers: Vec<Sender<SelectionChange>>,
}

impl SelectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, root: SurfaceId) -> SelectionSubscription {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        SelectionSubscription { root, rx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers `change` to every live subscriber. Channels are unbounded, so
    /// a send only fails once the subscription is dropped, and those are
    /// pruned.
    pub fn broadcast(&mut self, change: SelectionChange) {
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

/// Receiving end of a [`SelectionHub`] for one surface.
#[derive(Debug)]
pub struct SelectionSubscription {
    root: SurfaceId,
    rx: Receiver<SelectionChange>,
}

impl SelectionSubscription {
    pub fn root(&self) -> SurfaceId {
        self.root
    }

    /// Pending changes that happened inside this subscription's surface.
    pub fn drain(&self) -> Vec<Selection> {
        self.rx
            .try_iter()
            .filter(|change| change.surface == Some(self.root))
            .map(|change| change.selection)
            .collect()
    }
}

/// Formatting state mirrored into the toolbar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub list_active: bool,
    pub current_bullet_style: Option<String>,
}

#[derive(Debug)]
pub struct SelectionReflector {
    root: SurfaceId,
    state: FormatState,
}

impl SelectionReflector {
    pub fn new(root: SurfaceId) -> Self {
        Self {
            root,
            state: FormatState::default(),
        }
    }

    pub fn root(&self) -> SurfaceId {
        self.root
    }

    pub fn state(&self) -> &FormatState {
        &self.state
    }

    /// Handles a page-wide selection change. Changes outside the root leave
    /// the state untouched; returns whether the state was recomputed.
    pub fn reflect<P: CommandPort + ?Sized>(&mut self, port: &mut P, change: &SelectionChange) -> bool {
        if change.surface != Some(self.root) {
            tracing::trace!(target: "manos_rich_editor::selection", "selection change outside surface ignored");
            return false;
        }
        port.set_selection(change.selection.clone());
        self.refresh(port);
        true
    }

    /// Recomputes the state from the surface's current selection.
    pub fn refresh<P: CommandPort + ?Sized>(&mut self, port: &P) {
        let bullet = bullet_style_at(port.document(), port.selection())
            .or_else(|| self.state.current_bullet_style.clone());
        self.state.current_bullet_style = bullet;

        // A failed query leaves the previous flags showing.
        match port.query_active_formats() {
            Ok(formats) => {
                self.state.bold = formats.bold;
                self.state.italic = formats.italic;
                self.state.underline = formats.underline;
                self.state.list_active = formats.unordered_list;
            }
            Err(err) => {
                tracing::debug!(target: "manos_rich_editor::selection", %err, "format query failed");
            }
        }
    }
}

/// Bullet style id of the list nearest the selection anchor.
pub fn bullet_style_at(doc: &Document, selection: &Selection) -> Option<String> {
    let list = doc.list_ancestor(&selection.anchor.path)?;
    doc.element(&list)?
        .attr(BULLET_STYLE_ATTR)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
