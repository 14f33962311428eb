//! Shared view-state machinery for page controllers.
//!
//! Every page moves through the same phases: it mounts in `Loading`, and a
//! single outer handler guarantees it always leaves `Loading` for one of
//! the three loaded states. `NotConnected` is terminal; the operator fixes
//! the environment and reloads.
//!
//! State is an immutable snapshot: transitions consume the old value and
//! return the new one, so a late-arriving result can never scribble over a
//! nested branch of newer state.

use crate::pagination::Pager;

// ─────────────────────────────────────────────────────────
// Page phase
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Loading,
    /// Provider, accounts or a required contract is missing. Terminal.
    NotConnected,
    /// Loaded, but the viewer holds no valid session; pages render their
    /// public variant or point at login.
    Unauthenticated,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Connectivity failed or the mount sequence threw: fail to a visible
    /// error panel, not a spinner.
    ConnectFailed,
    NotLoggedIn,
    LoggedIn,
}

impl Phase {
    pub fn on(self, event: PhaseEvent) -> Phase {
        match (self, event) {
            (Phase::NotConnected, _) => Phase::NotConnected,
            (_, PhaseEvent::ConnectFailed) => Phase::NotConnected,
            (_, PhaseEvent::NotLoggedIn) => Phase::Unauthenticated,
            (_, PhaseEvent::LoggedIn) => Phase::Ready,
        }
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self, Phase::Loading)
    }
}

// ─────────────────────────────────────────────────────────
// Paginated list snapshot
// ─────────────────────────────────────────────────────────

/// A fetched list plus its pager. `items` stays `None` until the first
/// load completes, which lets a renderer distinguish "still empty" from
/// "loaded empty".
#[derive(Debug, Clone)]
pub struct ListView<T> {
    items: Option<Vec<T>>,
    pager: Pager,
}

impl<T> ListView<T> {
    pub fn new(per_page: usize) -> Self {
        ListView {
            items: None,
            pager: Pager::new(per_page),
        }
    }

    pub fn loaded(self, items: Vec<T>) -> Self {
        let pager = self.pager.clamped(items.len());
        ListView {
            items: Some(items),
            pager,
        }
    }

    pub fn page_clicked(self, page: usize) -> Self {
        let len = self.len();
        ListView {
            pager: self.pager.clicked(page, len),
            ..self
        }
    }

    /// Edit one row in place (after an action re-queried its fields).
    pub fn with_item(mut self, index: usize, edit: impl FnOnce(&mut T)) -> Self {
        if let Some(items) = self.items.as_mut() {
            if let Some(item) = items.get_mut(index) {
                edit(item);
            }
        }
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.items.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> &[T] {
        self.items.as_deref().unwrap_or(&[])
    }

    /// The rows on the active page.
    pub fn visible(&self) -> &[T] {
        let window = self.pager.window(self.len());
        &self.items()[window]
    }

    pub fn placeholder_rows(&self) -> usize {
        self.pager.placeholder_rows(self.len())
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }
}

// ─────────────────────────────────────────────────────────
// Mutating-action sub-protocol
// ─────────────────────────────────────────────────────────

/// Uniform lifecycle of every write: validate, submit, settle. A failure
/// keeps the form input so the human can retry; nothing retries itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormStatus {
    #[default]
    Idle,
    Submitting,
    Failed(String),
    Succeeded,
}

impl FormStatus {
    pub fn failed(message: impl Into<String>) -> Self {
        FormStatus::Failed(message.into())
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, FormStatus::Submitting)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FormStatus::Failed(_))
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, FormStatus::Succeeded)
    }
}

/// A field-level validation failure, keyed by the field name the form
/// rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            field,
            message: message.into(),
        }
    }
}
