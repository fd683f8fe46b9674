//! Browser backend over `web-sys`
//!
//! Element handles index into a slab of nodes. Released slots are reused,
//! so the slab only holds what dialogs currently keep.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{error, trace};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlElement, HtmlTemplateElement, KeyboardEvent, TransitionEvent};

use super::{Document, DomEvent, ElementRef, EventKind, EventTarget, Listener, ListenerId};
use crate::error::{DomError, DomResult};
use crate::scheduler::{Scheduler, Task};

type Callback = Closure<dyn FnMut(web_sys::Event)>;

struct Binding {
    target: web_sys::EventTarget,
    kind: &'static str,
    callback: Callback,
}

struct WebInner {
    window: web_sys::Window,
    document: web_sys::Document,
    nodes: RefCell<Vec<Option<web_sys::Node>>>,
    /// Released slots, reused by `register`
    free: RefCell<Vec<u32>>,
    bindings: RefCell<HashMap<u32, Binding>>,
    next_listener: Cell<u32>,
    /// Listener callbacks currently on the stack
    depth: Cell<u32>,
    /// Callbacks unbound while a listener was running; dropped on the next
    /// top-level dispatch
    retired: RefCell<Vec<Callback>>,
    /// Last event a dialog acted on, so later listeners of the same event see it
    handled: RefCell<Option<web_sys::Event>>,
}

/// A [`Document`] driving the live page
#[derive(Clone)]
pub struct WebDocument {
    inner: Rc<WebInner>,
}

impl WebDocument {
    pub fn new(window: web_sys::Window) -> DomResult<Self> {
        let document = window
            .document()
            .ok_or_else(|| DomError::Operation("window has no document".to_string()))?;
        let root = document
            .document_element()
            .ok_or_else(|| DomError::Operation("document has no root element".to_string()))?;
        let body = document
            .body()
            .ok_or_else(|| DomError::Operation("document has no body".to_string()))?;

        Ok(Self {
            inner: Rc::new(WebInner {
                window,
                document,
                nodes: RefCell::new(vec![Some(root.into()), Some(body.into())]),
                free: RefCell::new(Vec::new()),
                bindings: RefCell::new(HashMap::new()),
                next_listener: Cell::new(0),
                depth: Cell::new(0),
                retired: RefCell::new(Vec::new()),
                handled: RefCell::new(None),
            }),
        })
    }

    /// The current `window`'s document
    pub fn from_window() -> DomResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| DomError::Operation("no global window".to_string()))?;
        Self::new(window)
    }

    fn register(&self, node: web_sys::Node) -> ElementRef {
        let mut nodes = self.inner.nodes.borrow_mut();
        if let Some(slot) = self.inner.free.borrow_mut().pop() {
            nodes[slot as usize] = Some(node);
            return ElementRef::new(slot);
        }
        nodes.push(Some(node));
        ElementRef::new((nodes.len() - 1) as u32)
    }

    fn node(&self, element: ElementRef) -> DomResult<web_sys::Node> {
        self.inner
            .nodes
            .borrow()
            .get(element.raw() as usize)
            .cloned()
            .flatten()
            .ok_or(DomError::UnknownElement(element))
    }

    fn element(&self, element: ElementRef) -> DomResult<web_sys::Element> {
        self.node(element)?
            .dyn_into::<web_sys::Element>()
            .map_err(|_| DomError::Operation(format!("{element} is not an element")))
    }

    fn html_element(&self, element: ElementRef) -> DomResult<HtmlElement> {
        self.node(element)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| DomError::Operation(format!("{element} is not an HTML element")))
    }

    fn event_target(&self, target: EventTarget) -> DomResult<web_sys::EventTarget> {
        match target {
            EventTarget::Document => Ok(self.inner.document.clone().into()),
            EventTarget::Element(element) => Ok(self.node(element)?.into()),
        }
    }
}

impl WebInner {
    fn lookup(&self, node: &web_sys::Node) -> Option<ElementRef> {
        self.nodes
            .borrow()
            .iter()
            .position(|known| {
                known
                    .as_ref()
                    .is_some_and(|known| known.is_same_node(Some(node)))
            })
            .map(|index| ElementRef::new(index as u32))
    }

    fn translate(&self, kind: EventKind, event: &web_sys::Event) -> DomEvent {
        let target = event
            .target()
            .and_then(|target| target.dyn_into::<web_sys::Node>().ok())
            .and_then(|node| self.lookup(&node));

        let mut translated = DomEvent::new(kind, target);
        translated.key = event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key);
        translated.property_name = event
            .dyn_ref::<TransitionEvent>()
            .map(TransitionEvent::property_name);
        if event.default_prevented() {
            translated.prevent_default();
        }
        if self.handled.borrow().as_ref() == Some(event) {
            translated.mark_handled();
        }
        translated
    }
}

fn js_error(operation: &'static str) -> impl FnOnce(JsValue) -> DomError {
    move |value| DomError::Operation(format!("{operation}: {value:?}"))
}

impl Document for WebDocument {
    fn create_element(&self, tag: &str) -> DomResult<ElementRef> {
        let element = self
            .inner
            .document
            .create_element(tag)
            .map_err(js_error("createElement"))?;
        Ok(self.register(element.into()))
    }

    fn body(&self) -> ElementRef {
        ElementRef::new(1)
    }

    fn document_element(&self) -> ElementRef {
        ElementRef::new(0)
    }

    fn template_by_id(&self, id: &str) -> Option<ElementRef> {
        let template = self
            .inner
            .document
            .get_element_by_id(id)?
            .dyn_into::<HtmlTemplateElement>()
            .ok()?;
        Some(self.register(template.into()))
    }

    fn clone_template_content(&self, template: ElementRef) -> DomResult<ElementRef> {
        let template = self
            .node(template)?
            .dyn_into::<HtmlTemplateElement>()
            .map_err(|_| DomError::Operation(format!("{template} is not a template")))?;
        let fragment = template
            .content()
            .clone_node_with_deep(true)
            .map_err(js_error("cloneNode"))?;
        Ok(self.register(fragment))
    }

    fn append_child(&self, parent: ElementRef, child: ElementRef) -> DomResult<()> {
        self.node(parent)?
            .append_child(&self.node(child)?)
            .map_err(js_error("appendChild"))?;
        Ok(())
    }

    fn prepend_child(&self, parent: ElementRef, child: ElementRef) -> DomResult<()> {
        let parent = self.node(parent)?;
        parent
            .insert_before(&self.node(child)?, parent.first_child().as_ref())
            .map_err(js_error("insertBefore"))?;
        Ok(())
    }

    fn remove(&self, element: ElementRef) -> DomResult<()> {
        let node = self.node(element)?;
        if let Some(parent) = node.parent_node() {
            parent.remove_child(&node).map_err(js_error("removeChild"))?;
        }
        Ok(())
    }

    fn set_inner_html(&self, element: ElementRef, html: &str) -> DomResult<()> {
        self.element(element)?.set_inner_html(html);
        Ok(())
    }

    fn set_class_name(&self, element: ElementRef, class_name: &str) -> DomResult<()> {
        self.element(element)?.set_class_name(class_name);
        Ok(())
    }

    fn add_class(&self, element: ElementRef, class_name: &str) -> DomResult<()> {
        self.element(element)?
            .class_list()
            .add_1(class_name)
            .map_err(js_error("classList.add"))
    }

    fn remove_class(&self, element: ElementRef, class_name: &str) -> DomResult<()> {
        self.element(element)?
            .class_list()
            .remove_1(class_name)
            .map_err(js_error("classList.remove"))
    }

    fn has_class(&self, element: ElementRef, class_name: &str) -> bool {
        self.element(element)
            .map(|el| el.class_list().contains(class_name))
            .unwrap_or(false)
    }

    fn set_style(&self, element: ElementRef, property: &str, value: &str) -> DomResult<()> {
        self.html_element(element)?
            .style()
            .set_property(property, value)
            .map_err(js_error("style.setProperty"))
    }

    fn remove_style(&self, element: ElementRef, property: &str) -> DomResult<()> {
        self.html_element(element)?
            .style()
            .remove_property(property)
            .map_err(js_error("style.removeProperty"))?;
        Ok(())
    }

    fn computed_style(&self, element: ElementRef, property: &str) -> String {
        let Ok(element) = self.element(element) else {
            return String::new();
        };
        self.inner
            .window
            .get_computed_style(&element)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value(property).ok())
            .unwrap_or_default()
    }

    fn scroll_height(&self, element: ElementRef) -> f64 {
        self.element(element)
            .map(|el| f64::from(el.scroll_height()))
            .unwrap_or(0.0)
    }

    fn client_height(&self, element: ElementRef) -> f64 {
        self.element(element)
            .map(|el| f64::from(el.client_height()))
            .unwrap_or(0.0)
    }

    fn offset_width(&self, element: ElementRef) -> f64 {
        self.html_element(element)
            .map(|el| f64::from(el.offset_width()))
            .unwrap_or(0.0)
    }

    fn client_width(&self, element: ElementRef) -> f64 {
        self.element(element)
            .map(|el| f64::from(el.client_width()))
            .unwrap_or(0.0)
    }

    fn add_listener(
        &self,
        target: EventTarget,
        kind: EventKind,
        listener: Listener,
    ) -> DomResult<ListenerId> {
        let js_target = self.event_target(target)?;
        let weak: Weak<WebInner> = Rc::downgrade(&self.inner);

        let callback = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.depth.get() == 0 {
                let retired = std::mem::take(&mut *inner.retired.borrow_mut());
                drop(retired);
            }

            let translated = inner.translate(kind, &event);
            inner.depth.set(inner.depth.get() + 1);
            listener(&translated);
            inner.depth.set(inner.depth.get() - 1);

            if translated.is_default_prevented() {
                event.prevent_default();
            }
            if translated.is_handled() {
                *inner.handled.borrow_mut() = Some(event);
            }
        }) as Box<dyn FnMut(web_sys::Event)>);

        js_target
            .add_event_listener_with_callback(kind.as_str(), callback.as_ref().unchecked_ref())
            .map_err(js_error("addEventListener"))?;

        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner.bindings.borrow_mut().insert(
            id,
            Binding {
                target: js_target,
                kind: kind.as_str(),
                callback,
            },
        );
        trace!(listener = id, kind = kind.as_str(), "listener bound");
        Ok(ListenerId::new(id))
    }

    fn remove_listener(&self, id: ListenerId) {
        let Some(binding) = self.inner.bindings.borrow_mut().remove(&id.raw()) else {
            return;
        };
        if let Err(err) = binding.target.remove_event_listener_with_callback(
            binding.kind,
            binding.callback.as_ref().unchecked_ref(),
        ) {
            error!(listener = id.raw(), ?err, "failed to unbind listener");
        }
        // The callback may be the one running right now
        if self.inner.depth.get() > 0 {
            self.inner.retired.borrow_mut().push(binding.callback);
        }
    }

    fn release(&self, element: ElementRef) {
        let slot = element.raw();
        if element == self.document_element() || element == self.body() {
            return;
        }
        let released = {
            let mut nodes = self.inner.nodes.borrow_mut();
            nodes.get_mut(slot as usize).and_then(Option::take)
        };
        let Some(node) = released else {
            return;
        };
        if let Some(parent) = node.parent_node() {
            if let Err(err) = parent.remove_child(&node) {
                error!(%element, ?err, "failed to detach released element");
            }
        }
        self.inner.free.borrow_mut().push(slot);
        trace!(%element, "element released");
    }
}

/// Scheduler backed by `window.setTimeout`
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn defer(&self, task: Task) {
        self.defer_for(Duration::ZERO, task);
    }

    fn defer_for(&self, delay: Duration, task: Task) {
        let Some(window) = web_sys::window() else {
            error!("no global window to schedule on");
            return;
        };
        let callback = Closure::once_into_js(move || task());
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        if let Err(err) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            millis,
        ) {
            error!(?err, "setTimeout failed");
        }
    }
}
