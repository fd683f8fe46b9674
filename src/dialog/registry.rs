//! Open-dialog registry
//!
//! Ordered record of the dialogs currently shown, most recent last. The
//! topmost entry owns Escape handling, and the transitions between zero and
//! one entries engage and release the page scroll-lock.
//!
//! Dialogs receive the registry through their [`Host`](crate::Host), so
//! independent hosts (and tests) never share bookkeeping.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use super::types::DialogId;

/// Shared handle to an ordered stack of open dialog ids
#[derive(Debug, Clone, Default)]
pub struct DialogRegistry {
    open: Rc<RefCell<Vec<DialogId>>>,
}

impl DialogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dialog as the new topmost entry
    pub fn push(&self, id: DialogId) {
        let mut open = self.open.borrow_mut();
        open.push(id);
        debug!(dialog_id = %open[open.len() - 1], depth = open.len(), "dialog registered");
    }

    /// Remove a dialog by id wherever it sits. Returns whether it was present.
    pub fn remove(&self, id: &DialogId) -> bool {
        let mut open = self.open.borrow_mut();
        let Some(position) = open.iter().rposition(|entry| entry == id) else {
            return false;
        };
        if position + 1 != open.len() {
            warn!(
                dialog_id = %id,
                top = %open[open.len() - 1],
                "closing a dialog that is not the topmost one"
            );
        }
        open.remove(position);
        debug!(dialog_id = %id, depth = open.len(), "dialog unregistered");
        true
    }

    /// The most recently opened dialog still shown
    pub fn top(&self) -> Option<DialogId> {
        self.open.borrow().last().cloned()
    }

    pub fn is_top(&self, id: &DialogId) -> bool {
        self.open.borrow().last() == Some(id)
    }

    pub fn contains(&self, id: &DialogId) -> bool {
        self.open.borrow().contains(id)
    }

    pub fn len(&self) -> usize {
        self.open.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.borrow().is_empty()
    }

    /// Open dialog ids, bottom first
    pub fn ids(&self) -> Vec<DialogId> {
        self.open.borrow().clone()
    }
}
