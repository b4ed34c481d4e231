use std::time::{Duration, Instant};

pub const DEFAULT_HTML_LABEL: &str = "Insert HTML";

/// How long a changed seed must stay put before the draft follows it.
pub const SEED_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
struct PendingSeed {
    seed: String,
    due: Instant,
}

/// Draft state of the "insert raw markup" dialog.
#[derive(Debug, Clone)]
pub struct HtmlInsertDialog {
    open: bool,
    draft: String,
    label: String,
    seed: String,
    pending: Option<PendingSeed>,
}

impl Default for HtmlInsertDialog {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_HTML_LABEL)
    }
}

impl HtmlInsertDialog {
    pub fn new(seed: impl Into<String>, label: impl Into<String>) -> Self {
        let seed = seed.into();
        Self {
            open: false,
            draft: seed.clone(),
            label: label.into(),
            seed,
            pending: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Opens with the draft reset to the current seed.
    pub fn open(&mut self) {
        self.draft = self.seed.clone();
        self.open = true;
    }

    pub fn cancel(&mut self) {
        self.open = false;
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    /// Records a new seed; the draft follows once [`SEED_DEBOUNCE`] has
    /// elapsed without a further change.
    pub fn sync_seed(&mut self, seed: impl Into<String>, now: Instant) {
        let seed = seed.into();
        if seed == self.seed && self.pending.is_none() {
            return;
        }
        self.pending = Some(PendingSeed {
            seed,
            due: now + SEED_DEBOUNCE,
        });
    }

    /// Applies a due seed change. Returns whether the draft changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.pending.take() {
            Some(pending) if now >= pending.due => {
                self.seed = pending.seed;
                let changed = self.draft != self.seed;
                self.draft = self.seed.clone();
                changed
            }
            still_waiting => {
                self.pending = still_waiting;
                false
            }
        }
    }

    /// Closes the dialog and hands back the markup to insert, or `None` for a
    /// blank draft.
    pub fn confirm(&mut self) -> Option<String> {
        self.open = false;
        let draft = std::mem::replace(&mut self.draft, self.seed.clone());
        (!draft.trim().is_empty()).then_some(draft)
    }
}
