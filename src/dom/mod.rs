//! Document abstraction the dialog renders into
//!
//! The dialog never talks to a concrete DOM. It is written against the
//! [`Document`] trait, which exposes the handful of operations a modal needs:
//! - element creation, template cloning and tree mutation
//! - class list and inline style manipulation
//! - layout metrics (scroll/client/offset sizes) and computed style reads
//! - event listener registration
//!
//! Two backends ship with the crate: [`MemoryDocument`], a headless document
//! used by tests and non-browser hosts, and `WebDocument` (behind the `web`
//! feature) which drives a live page through `web-sys`.

pub mod memory;
#[cfg(feature = "web")]
pub mod web;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::DomResult;

pub use memory::{Metrics, MemoryDocument};
#[cfg(feature = "web")]
pub use web::WebDocument;

/// Opaque handle to an element owned by a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(u32);

impl ElementRef {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u32);

impl ListenerId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Events the dialog listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    KeyDown,
    TransitionEnd,
}

impl EventKind {
    /// DOM event type name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::KeyDown => "keydown",
            Self::TransitionEnd => "transitionend",
        }
    }
}

/// Where a listener is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// The page document itself (page-level key handling)
    Document,
    Element(ElementRef),
}

/// An event delivered to a listener.
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    pub kind: EventKind,
    /// Element the event originated from, not the one the listener sits on
    pub target: Option<ElementRef>,
    /// Key name for key events (`"Escape"`, `"Enter"`, ...)
    pub key: Option<String>,
    /// Animated property for transition events (`"transform"`, `"opacity"`, ...)
    pub property_name: Option<String>,
    default_prevented: Cell<bool>,
    /// Already acted on by a dialog; separate from the page's default-prevented bit
    handled: Cell<bool>,
}

impl DomEvent {
    /// A bare event; backends fill in `key` / `property_name` as applicable
    pub fn new(kind: EventKind, target: Option<ElementRef>) -> Self {
        Self {
            kind,
            target,
            key: None,
            property_name: None,
            default_prevented: Cell::new(false),
            handled: Cell::new(false),
        }
    }

    pub fn click(target: ElementRef) -> Self {
        Self::new(EventKind::Click, Some(target))
    }

    pub fn key_down(key: impl Into<String>) -> Self {
        let mut event = Self::new(EventKind::KeyDown, None);
        event.key = Some(key.into());
        event
    }

    pub fn transition_end(target: ElementRef, property_name: impl Into<String>) -> Self {
        let mut event = Self::new(EventKind::TransitionEnd, Some(target));
        event.property_name = Some(property_name.into());
        event
    }

    /// Cancel the page's default action for the event
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub(crate) fn mark_handled(&self) {
        self.handled.set(true);
    }

    pub(crate) fn is_handled(&self) -> bool {
        self.handled.get()
    }
}

/// Event callback. Shared so backends can invoke it without holding their own state borrowed.
pub type Listener = Rc<dyn Fn(&DomEvent)>;

/// The page operations a dialog relies on.
///
/// Mutations are fallible because browser backends surface script
/// exceptions; reads fall back to neutral values (`0.0`, empty string,
/// `false`) for handles the backend does not know.
pub trait Document {
    /// Create a detached element
    fn create_element(&self, tag: &str) -> DomResult<ElementRef>;

    /// The `<body>` element
    fn body(&self) -> ElementRef;

    /// The root `<html>` element
    fn document_element(&self) -> ElementRef;

    /// Resolve a `<template>` element by its id
    fn template_by_id(&self, id: &str) -> Option<ElementRef>;

    /// Deep-clone a template's content into a detached fragment
    fn clone_template_content(&self, template: ElementRef) -> DomResult<ElementRef>;

    fn append_child(&self, parent: ElementRef, child: ElementRef) -> DomResult<()>;

    /// Insert `child` before the first child of `parent`
    fn prepend_child(&self, parent: ElementRef, child: ElementRef) -> DomResult<()>;

    /// Detach an element from its parent
    fn remove(&self, element: ElementRef) -> DomResult<()>;

    /// Replace the element's children with the given markup
    fn set_inner_html(&self, element: ElementRef, html: &str) -> DomResult<()>;

    fn set_class_name(&self, element: ElementRef, class_name: &str) -> DomResult<()>;

    fn add_class(&self, element: ElementRef, class_name: &str) -> DomResult<()>;

    fn remove_class(&self, element: ElementRef, class_name: &str) -> DomResult<()>;

    fn has_class(&self, element: ElementRef, class_name: &str) -> bool;

    /// Set an inline style property (`padding-right`, `overflow`, ...)
    fn set_style(&self, element: ElementRef, property: &str, value: &str) -> DomResult<()>;

    /// Clear an inline style property
    fn remove_style(&self, element: ElementRef, property: &str) -> DomResult<()>;

    /// Resolved value of a style property
    fn computed_style(&self, element: ElementRef, property: &str) -> String;

    fn scroll_height(&self, element: ElementRef) -> f64;

    fn client_height(&self, element: ElementRef) -> f64;

    fn offset_width(&self, element: ElementRef) -> f64;

    fn client_width(&self, element: ElementRef) -> f64;

    fn add_listener(
        &self,
        target: EventTarget,
        kind: EventKind,
        listener: Listener,
    ) -> DomResult<ListenerId>;

    /// Unbind a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Forget an element the caller no longer needs, detaching it first.
    /// The handle is invalid afterwards. Page-owned elements (root, body,
    /// templates) and unknown handles are ignored.
    fn release(&self, element: ElementRef);
}
