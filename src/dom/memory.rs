//! Headless in-memory document
//!
//! `MemoryDocument` keeps a small node arena with classes, styles, markup and
//! settable layout metrics. It is what the test-suite renders dialogs into,
//! and it is usable by any host that wants to drive dialogs without a browser.
//!
//! Simplifications compared to a real page:
//! - markup passed to `set_inner_html` is stored verbatim, not parsed
//! - fragments stay in the tree as transparent nodes instead of dissolving
//! - elements with an inline `overflow: scroll` style reserve the configured
//!   scrollbar width between their offset and client widths
//! - released handles are never reused

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use super::{Document, DomEvent, ElementRef, EventKind, EventTarget, Listener, ListenerId};
use crate::error::{DomError, DomResult};

const FRAGMENT_TAG: &str = "#fragment";

/// Scrollbar width emulated for `overflow: scroll` elements unless configured otherwise
pub const DEFAULT_SCROLLBAR_WIDTH: f64 = 15.0;

/// Offset width given to scroll containers that have no explicit metrics
const SCROLL_CONTAINER_WIDTH: f64 = 100.0;

/// Layout metrics of an element
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub scroll_height: f64,
    pub client_height: f64,
    pub offset_width: f64,
    pub client_width: f64,
}

impl Metrics {
    /// A viewport-sized box whose content is taller than the box
    pub fn overflowing() -> Self {
        Self {
            scroll_height: 2400.0,
            client_height: 800.0,
            offset_width: 1280.0,
            client_width: 1280.0,
        }
    }

    /// A viewport-sized box whose content fits
    pub fn fitting() -> Self {
        Self {
            scroll_height: 600.0,
            client_height: 800.0,
            offset_width: 1280.0,
            client_width: 1280.0,
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    tag: String,
    classes: Vec<String>,
    inline_styles: BTreeMap<String, String>,
    sheet_styles: BTreeMap<String, String>,
    markup: String,
    children: Vec<ElementRef>,
    parent: Option<ElementRef>,
    metrics: Metrics,
    released: bool,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }
}

struct Registered {
    id: ListenerId,
    target: EventTarget,
    kind: EventKind,
    listener: Listener,
}

/// In-memory [`Document`] implementation.
pub struct MemoryDocument {
    nodes: RefCell<Vec<Node>>,
    templates: RefCell<HashMap<String, ElementRef>>,
    listeners: RefCell<Vec<Registered>>,
    next_listener: Cell<u32>,
    created: Cell<usize>,
    scrollbar_width: Cell<f64>,
    document_element: ElementRef,
    body: ElementRef,
}

impl MemoryDocument {
    /// Create an empty page: `<html>` containing an empty `<body>`
    pub fn new() -> Self {
        let document_element = ElementRef::new(0);
        let body = ElementRef::new(1);

        let mut html = Node::new("html");
        html.children.push(body);
        let mut body_node = Node::new("body");
        body_node.parent = Some(document_element);

        Self {
            nodes: RefCell::new(vec![html, body_node]),
            templates: RefCell::new(HashMap::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
            created: Cell::new(0),
            scrollbar_width: Cell::new(DEFAULT_SCROLLBAR_WIDTH),
            document_element,
            body,
        }
    }

    /// Emulate a platform whose scrollbars take `width` pixels (0 for overlay scrollbars)
    pub fn with_scrollbar_width(self, width: f64) -> Self {
        self.scrollbar_width.set(width);
        self
    }

    pub fn set_metrics(&self, element: ElementRef, metrics: Metrics) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(index(element)) {
            node.metrics = metrics;
        }
    }

    /// Set a style coming from a stylesheet; inline styles take precedence over it
    pub fn set_sheet_style(&self, element: ElementRef, property: &str, value: &str) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(index(element)) {
            node.sheet_styles
                .insert(property.to_string(), value.to_string());
        }
    }

    /// Register a `<template id="...">` whose content is `markup`
    pub fn add_template(&self, id: &str, markup: &str) -> ElementRef {
        let template = self.alloc("template");
        if let Some(node) = self.nodes.borrow_mut().get_mut(index(template)) {
            node.markup = markup.to_string();
        }
        self.templates.borrow_mut().insert(id.to_string(), template);
        template
    }

    /// Markup inside the element: its own markup followed by its rendered children
    pub fn inner_html(&self, element: ElementRef) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        render_inner(&nodes, element, &mut out);
        out
    }

    pub fn outer_html(&self, element: ElementRef) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        render_outer(&nodes, element, &mut out);
        out
    }

    pub fn children(&self, element: ElementRef) -> Vec<ElementRef> {
        self.nodes
            .borrow()
            .get(index(element))
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, element: ElementRef) -> Option<ElementRef> {
        self.nodes
            .borrow()
            .get(index(element))
            .and_then(|node| node.parent)
    }

    pub fn tag(&self, element: ElementRef) -> Option<String> {
        self.nodes
            .borrow()
            .get(index(element))
            .map(|node| node.tag.clone())
    }

    pub fn classes(&self, element: ElementRef) -> Vec<String> {
        self.nodes
            .borrow()
            .get(index(element))
            .map(|node| node.classes.clone())
            .unwrap_or_default()
    }

    pub fn inline_style(&self, element: ElementRef, property: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(index(element))
            .and_then(|node| node.inline_styles.get(property).cloned())
    }

    /// Whether the element is reachable from the document root
    pub fn is_attached(&self, element: ElementRef) -> bool {
        let mut current = Some(element);
        while let Some(el) = current {
            if el == self.document_element {
                return true;
            }
            current = self.parent(el);
        }
        false
    }

    /// Attached elements carrying `class_name`, in document order
    pub fn elements_with_class(&self, class_name: &str) -> Vec<ElementRef> {
        let nodes = self.nodes.borrow();
        let mut found = Vec::new();
        let mut stack = vec![self.document_element];
        while let Some(el) = stack.pop() {
            let Some(node) = nodes.get(index(el)) else {
                continue;
            };
            if node.classes.iter().any(|c| c == class_name) {
                found.push(el);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    /// Number of elements created through [`Document::create_element`]
    pub fn created_count(&self) -> usize {
        self.created.get()
    }

    /// Elements not yet released, page-owned ones included. Released
    /// handles are never reused, so stale handles stay distinguishable.
    pub fn live_count(&self) -> usize {
        self.nodes.borrow().iter().filter(|node| !node.released).count()
    }

    pub fn is_released(&self, element: ElementRef) -> bool {
        self.nodes
            .borrow()
            .get(index(element))
            .is_some_and(|node| node.released)
    }

    pub fn listener_count(&self, target: EventTarget, kind: EventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|r| r.target == target && r.kind == kind)
            .count()
    }

    /// Deliver an event, bubbling from its target through the ancestors to
    /// the document. Returns how many listeners were invoked.
    pub fn dispatch(&self, event: &DomEvent) -> usize {
        let mut path = Vec::new();
        let mut current = event.target;
        while let Some(el) = current {
            path.push(EventTarget::Element(el));
            current = self.parent(el);
        }
        path.push(EventTarget::Document);

        // Snapshot so listeners can mutate the document while running
        let handlers: Vec<(ListenerId, Listener)> = {
            let listeners = self.listeners.borrow();
            path.iter()
                .flat_map(|target| {
                    listeners
                        .iter()
                        .filter(move |r| r.target == *target && r.kind == event.kind)
                        .map(|r| (r.id, r.listener.clone()))
                })
                .collect()
        };

        let mut invoked = 0;
        for (id, handler) in handlers {
            // Listeners removed by an earlier handler of this dispatch are skipped
            if !self.listeners.borrow().iter().any(|r| r.id == id) {
                continue;
            }
            handler(event);
            invoked += 1;
        }
        trace!(kind = event.kind.as_str(), invoked, "dispatched event");
        invoked
    }

    pub fn click(&self, element: ElementRef) -> usize {
        self.dispatch(&DomEvent::click(element))
    }

    pub fn key_down(&self, key: &str) -> usize {
        self.dispatch(&DomEvent::key_down(key))
    }

    pub fn transition_end(&self, element: ElementRef, property_name: &str) -> usize {
        self.dispatch(&DomEvent::transition_end(element, property_name))
    }

    fn alloc(&self, tag: &str) -> ElementRef {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Node::new(tag));
        ElementRef::new((nodes.len() - 1) as u32)
    }

    fn with_node<R>(&self, element: ElementRef, f: impl FnOnce(&Node) -> R) -> Option<R> {
        self.nodes
            .borrow()
            .get(index(element))
            .filter(|node| !node.released)
            .map(f)
    }

    fn with_node_mut<R>(
        &self,
        element: ElementRef,
        f: impl FnOnce(&mut Node) -> R,
    ) -> DomResult<R> {
        self.nodes
            .borrow_mut()
            .get_mut(index(element))
            .filter(|node| !node.released)
            .map(f)
            .ok_or(DomError::UnknownElement(element))
    }

    fn insert_child(&self, parent: ElementRef, child: ElementRef, at_start: bool) -> DomResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        for el in [parent, child] {
            if !is_live(&nodes, el) {
                return Err(DomError::UnknownElement(el));
            }
        }

        let mut ancestor = Some(parent);
        while let Some(el) = ancestor {
            if el == child {
                return Err(DomError::Operation(format!(
                    "cannot insert {child} into its own descendant {parent}"
                )));
            }
            ancestor = nodes[index(el)].parent;
        }

        detach(&mut nodes, child);
        let siblings = &mut nodes[index(parent)].children;
        if at_start {
            siblings.insert(0, child);
        } else {
            siblings.push(child);
        }
        nodes[index(child)].parent = Some(parent);
        Ok(())
    }

    fn overflow_scroll(&self, element: ElementRef) -> bool {
        self.with_node(element, |node| {
            node.inline_styles.get("overflow").map(String::as_str) == Some("scroll")
        })
        .unwrap_or(false)
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MemoryDocument {
    fn create_element(&self, tag: &str) -> DomResult<ElementRef> {
        self.created.set(self.created.get() + 1);
        Ok(self.alloc(tag))
    }

    fn body(&self) -> ElementRef {
        self.body
    }

    fn document_element(&self) -> ElementRef {
        self.document_element
    }

    fn template_by_id(&self, id: &str) -> Option<ElementRef> {
        self.templates.borrow().get(id).copied()
    }

    fn clone_template_content(&self, template: ElementRef) -> DomResult<ElementRef> {
        let markup = self
            .with_node(template, |node| node.markup.clone())
            .ok_or(DomError::UnknownElement(template))?;
        let fragment = self.alloc(FRAGMENT_TAG);
        self.with_node_mut(fragment, |node| node.markup = markup)?;
        Ok(fragment)
    }

    fn append_child(&self, parent: ElementRef, child: ElementRef) -> DomResult<()> {
        self.insert_child(parent, child, false)
    }

    fn prepend_child(&self, parent: ElementRef, child: ElementRef) -> DomResult<()> {
        self.insert_child(parent, child, true)
    }

    fn remove(&self, element: ElementRef) -> DomResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        if !is_live(&nodes, element) {
            return Err(DomError::UnknownElement(element));
        }
        detach(&mut nodes, element);
        Ok(())
    }

    fn set_inner_html(&self, element: ElementRef, html: &str) -> DomResult<()> {
        let mut nodes = self.nodes.borrow_mut();
        let children = match nodes.get_mut(index(element)) {
            Some(node) => {
                node.markup = html.to_string();
                std::mem::take(&mut node.children)
            }
            None => return Err(DomError::UnknownElement(element)),
        };
        for child in children {
            nodes[index(child)].parent = None;
        }
        Ok(())
    }

    fn set_class_name(&self, element: ElementRef, class_name: &str) -> DomResult<()> {
        self.with_node_mut(element, |node| {
            node.classes = class_name.split_whitespace().map(str::to_string).collect();
        })
    }

    fn add_class(&self, element: ElementRef, class_name: &str) -> DomResult<()> {
        self.with_node_mut(element, |node| {
            if !node.classes.iter().any(|c| c == class_name) {
                node.classes.push(class_name.to_string());
            }
        })
    }

    fn remove_class(&self, element: ElementRef, class_name: &str) -> DomResult<()> {
        self.with_node_mut(element, |node| node.classes.retain(|c| c != class_name))
    }

    fn has_class(&self, element: ElementRef, class_name: &str) -> bool {
        self.with_node(element, |node| node.classes.iter().any(|c| c == class_name))
            .unwrap_or(false)
    }

    fn set_style(&self, element: ElementRef, property: &str, value: &str) -> DomResult<()> {
        self.with_node_mut(element, |node| {
            node.inline_styles
                .insert(property.to_string(), value.to_string());
        })
    }

    fn remove_style(&self, element: ElementRef, property: &str) -> DomResult<()> {
        self.with_node_mut(element, |node| {
            node.inline_styles.remove(property);
        })
    }

    fn computed_style(&self, element: ElementRef, property: &str) -> String {
        self.with_node(element, |node| {
            node.inline_styles
                .get(property)
                .or_else(|| node.sheet_styles.get(property))
                .cloned()
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    fn scroll_height(&self, element: ElementRef) -> f64 {
        self.with_node(element, |node| node.metrics.scroll_height)
            .unwrap_or(0.0)
    }

    fn client_height(&self, element: ElementRef) -> f64 {
        self.with_node(element, |node| node.metrics.client_height)
            .unwrap_or(0.0)
    }

    fn offset_width(&self, element: ElementRef) -> f64 {
        let width = self
            .with_node(element, |node| node.metrics.offset_width)
            .unwrap_or(0.0);
        if width == 0.0 && self.overflow_scroll(element) {
            SCROLL_CONTAINER_WIDTH
        } else {
            width
        }
    }

    fn client_width(&self, element: ElementRef) -> f64 {
        if self.overflow_scroll(element) {
            (self.offset_width(element) - self.scrollbar_width.get()).max(0.0)
        } else {
            self.with_node(element, |node| node.metrics.client_width)
                .unwrap_or(0.0)
        }
    }

    fn add_listener(
        &self,
        target: EventTarget,
        kind: EventKind,
        listener: Listener,
    ) -> DomResult<ListenerId> {
        if let EventTarget::Element(el) = target {
            if self.with_node(el, |_| ()).is_none() {
                return Err(DomError::UnknownElement(el));
            }
        }
        let id = ListenerId::new(self.next_listener.get());
        self.next_listener.set(id.raw() + 1);
        self.listeners.borrow_mut().push(Registered {
            id,
            target,
            kind,
            listener,
        });
        Ok(id)
    }

    fn remove_listener(&self, id: ListenerId) {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            listeners
                .iter()
                .position(|r| r.id == id)
                .map(|position| listeners.remove(position))
        };
        // Dropped outside the borrow: a handler may own the last handle of a dialog
        drop(removed);
    }

    fn release(&self, element: ElementRef) {
        if element == self.document_element
            || element == self.body
            || self.templates.borrow().values().any(|t| *t == element)
        {
            return;
        }
        let mut nodes = self.nodes.borrow_mut();
        if !is_live(&nodes, element) {
            return;
        }
        detach(&mut nodes, element);
        for child in std::mem::take(&mut nodes[index(element)].children) {
            nodes[index(child)].parent = None;
        }
        nodes[index(element)] = Node {
            released: true,
            ..Node::default()
        };
    }
}

fn index(element: ElementRef) -> usize {
    element.raw() as usize
}

fn is_live(nodes: &[Node], element: ElementRef) -> bool {
    nodes.get(index(element)).is_some_and(|node| !node.released)
}

fn detach(nodes: &mut [Node], element: ElementRef) {
    if let Some(parent) = nodes[index(element)].parent.take() {
        nodes[index(parent)].children.retain(|c| *c != element);
    }
}

fn render_inner(nodes: &[Node], element: ElementRef, out: &mut String) {
    let Some(node) = nodes.get(index(element)) else {
        return;
    };
    out.push_str(&node.markup);
    for child in &node.children {
        render_outer(nodes, *child, out);
    }
}

fn render_outer(nodes: &[Node], element: ElementRef, out: &mut String) {
    let Some(node) = nodes.get(index(element)) else {
        return;
    };
    if node.tag == FRAGMENT_TAG {
        render_inner(nodes, element, out);
        return;
    }
    out.push('<');
    out.push_str(&node.tag);
    if !node.classes.is_empty() {
        out.push_str(" class=\"");
        out.push_str(&node.classes.join(" "));
        out.push('"');
    }
    out.push('>');
    render_inner(nodes, element, out);
    out.push_str("</");
    out.push_str(&node.tag);
    out.push('>');
}
