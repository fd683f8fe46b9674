//! Transition completion strategies
//!
//! Opening and closing a dialog toggles the show class on its backdrop; the
//! stylesheet animates that change. A [`TransitionDriver`] decides when the
//! animation counts as finished, which is when `on_open` / `on_close` fire and
//! a destroying close tears the tree down.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

use crate::dom::{Document, DomEvent, ElementRef, EventKind, EventTarget, ListenerId};
use crate::error::DialogResult;
use crate::scheduler::{Scheduler, Task};

/// Property whose transition marks the end of an open/close animation
pub const DEFAULT_TRANSITION_PROPERTY: &str = "transform";

/// Signals the end of a backdrop's visibility transition
pub trait TransitionDriver {
    /// Arrange for `done` to run once the transition just started on
    /// `backdrop` finishes.
    ///
    /// Returns the listener bound for that purpose, if any. The dialog
    /// unbinds it when a newer transition supersedes this one.
    fn watch(
        &self,
        document: &dyn Document,
        scheduler: &dyn Scheduler,
        backdrop: ElementRef,
        done: Task,
    ) -> DialogResult<Option<ListenerId>>;
}

/// Waits for the stylesheet's `transitionend` on one property.
///
/// Completions of other animated properties (opacity, colors) are ignored.
/// If the stylesheet defines no transition on the property the completion
/// never arrives.
#[derive(Debug, Clone)]
pub struct CssTransition {
    property: String,
}

impl CssTransition {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }
}

impl Default for CssTransition {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSITION_PROPERTY)
    }
}

impl TransitionDriver for CssTransition {
    fn watch(
        &self,
        document: &dyn Document,
        _scheduler: &dyn Scheduler,
        backdrop: ElementRef,
        done: Task,
    ) -> DialogResult<Option<ListenerId>> {
        let property = self.property.clone();
        let done = RefCell::new(Some(done));
        let listener = document.add_listener(
            EventTarget::Element(backdrop),
            EventKind::TransitionEnd,
            Rc::new(move |event: &DomEvent| {
                if event.property_name.as_deref() != Some(property.as_str()) {
                    return;
                }
                // Release the borrow before running, the task may unbind us
                let task = done.borrow_mut().take();
                if let Some(task) = task {
                    task();
                }
            }),
        )?;
        Ok(Some(listener))
    }
}

/// No animation: the transition is complete as soon as it starts
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl TransitionDriver for Immediate {
    fn watch(
        &self,
        _document: &dyn Document,
        _scheduler: &dyn Scheduler,
        _backdrop: ElementRef,
        done: Task,
    ) -> DialogResult<Option<ListenerId>> {
        trace!("transition completes immediately");
        done();
        Ok(None)
    }
}

/// Completes a fixed time after the transition starts
#[derive(Debug, Clone, Copy)]
pub struct Timed(pub Duration);

impl TransitionDriver for Timed {
    fn watch(
        &self,
        _document: &dyn Document,
        scheduler: &dyn Scheduler,
        _backdrop: ElementRef,
        done: Task,
    ) -> DialogResult<Option<ListenerId>> {
        scheduler.defer_for(self.0, done);
        Ok(None)
    }
}
