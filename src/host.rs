//! The collaborators every dialog is constructed with

use std::rc::Rc;

use crate::dialog::transition::{CssTransition, TransitionDriver};
use crate::dialog::DialogRegistry;
use crate::dom::Document;
use crate::scheduler::Scheduler;

/// Page, event loop, transition strategy and open-dialog registry shared by
/// a family of dialogs.
///
/// Cloning is cheap; clones share the same registry, so dialogs built from
/// one host see each other for Escape routing and scroll-lock.
#[derive(Clone)]
pub struct Host {
    document: Rc<dyn Document>,
    scheduler: Rc<dyn Scheduler>,
    transition: Rc<dyn TransitionDriver>,
    registry: DialogRegistry,
}

impl Host {
    /// A host with CSS `transform` transitions and a fresh registry
    pub fn new(document: Rc<dyn Document>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            document,
            scheduler,
            transition: Rc::new(CssTransition::default()),
            registry: DialogRegistry::new(),
        }
    }

    pub fn with_transition(mut self, transition: Rc<dyn TransitionDriver>) -> Self {
        self.transition = transition;
        self
    }

    /// Share an existing registry instead of the host's own
    pub fn with_registry(mut self, registry: DialogRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn document(&self) -> &Rc<dyn Document> {
        &self.document
    }

    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn transition(&self) -> &Rc<dyn TransitionDriver> {
        &self.transition
    }

    pub fn registry(&self) -> &DialogRegistry {
        &self.registry
    }
}

#[cfg(feature = "web")]
impl Host {
    /// Host for the current browser page: `window.document`, `setTimeout`
    /// and CSS transitions
    pub fn for_window() -> crate::error::DomResult<Self> {
        let document = crate::dom::WebDocument::from_window()?;
        Ok(Self::new(
            Rc::new(document),
            Rc::new(crate::scheduler::TimeoutScheduler),
        ))
    }
}
