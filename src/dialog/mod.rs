//! Modal dialog
//!
//! A [`Dialog`] owns one overlay and its lifecycle:
//! - lazily building the tree (backdrop → container → content + footer)
//! - opening: registering with the host's [`DialogRegistry`], scheduling the
//!   show class, engaging the page scroll-lock and wiring close affordances
//! - closing: hiding, waiting for the transition, then optionally tearing the
//!   tree down and releasing the scroll-lock
//!
//! Every open and close starts a new generation. Deferred work (the show
//! class, transition completions) carries the generation it was scheduled
//! for and is dropped when a newer open/close has superseded it.

pub mod registry;
pub mod scroll_lock;
pub mod transition;
pub mod types;


use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace};

use crate::dom::{Document, DomEvent, ElementRef, EventKind, EventTarget, Listener, ListenerId};
use crate::error::{DialogError, DialogResult, DomResult};
use crate::host::Host;
use crate::scheduler::Task;

pub use registry::DialogRegistry;
pub use scroll_lock::ScrollbarGauge;
pub use transition::{CssTransition, Immediate, Timed, TransitionDriver};
pub use types::{
    class_names, ClickHandler, CloseBehavior, CloseMethod, ContentSource, DialogId,
    DialogOptions, DialogState, Hook, ScrollLockTarget,
};

use types::FooterButton;

const ESCAPE_KEY: &str = "Escape";
const CLOSE_BUTTON_LABEL: &str = "&times;";

/// Content resolved against the page at construction
enum Source {
    Markup(String),
    Template(ElementRef),
}

/// The built visual tree
struct Tree {
    backdrop: ElementRef,
    container: ElementRef,
    content: ElementRef,
    footer: Option<ElementRef>,
    close_button: Option<ElementRef>,
    /// Template copy rendered into the content region
    fragment: Option<ElementRef>,
    /// Overlay and close-button listeners, unbound on teardown
    listeners: Vec<ListenerId>,
    /// Whether the show class landed since the last open
    shown: bool,
}

struct Inner {
    id: DialogId,
    host: Host,
    options: DialogOptions,
    close: CloseBehavior,
    source: Option<Source>,
    fault: Option<DialogError>,
    footer_content: Option<String>,
    footer_buttons: Vec<FooterButton>,
    tree: Option<Tree>,
    state: DialogState,
    generation: u64,
    destroy_pending: bool,
    transition_listener: Option<ListenerId>,
    escape_listener: Option<ListenerId>,
    gauge: ScrollbarGauge,
    /// Self-reference held from `open` until the close completes
    keep_alive: Option<Rc<RefCell<Inner>>>,
}

/// A modal dialog instance.
///
/// Cloning yields another handle to the same dialog. Event listeners hold
/// weak handles. A shown dialog keeps itself alive until its close
/// completes, so dropping every clone of an open dialog leaves it working.
/// Dropping the last clone of a closed dialog tears its tree down.
#[derive(Clone)]
pub struct Dialog {
    inner: Rc<RefCell<Inner>>,
}

impl Dialog {
    /// Create a dialog with a generated id.
    ///
    /// Content problems do not fail construction: a missing content source or
    /// an unknown template is logged, reported by [`error`](Self::error), and
    /// makes [`open`](Self::open) refuse without touching the page until
    /// [`set_content`](Self::set_content) supplies markup.
    pub fn new(host: &Host, options: DialogOptions) -> Self {
        Self::with_id(host, DialogId::generate(), options)
    }

    pub fn with_id(host: &Host, id: impl Into<DialogId>, options: DialogOptions) -> Self {
        let id = id.into();
        let (source, fault) = match options.content_source() {
            Ok(ContentSource::Markup(markup)) => (Some(Source::Markup(markup)), None),
            Ok(ContentSource::Template(template_id)) => {
                match host.document().template_by_id(&template_id) {
                    Some(template) => (Some(Source::Template(template)), None),
                    None => {
                        let err = DialogError::UnresolvedTemplate(template_id);
                        error!(dialog_id = %id, "{err}");
                        (None, Some(err))
                    }
                }
            }
            Err(err) => {
                error!(dialog_id = %id, "{err}");
                (None, Some(err))
            }
        };

        debug!(dialog_id = %id, "dialog created");
        Self {
            inner: Rc::new(RefCell::new(Inner {
                id,
                host: host.clone(),
                close: options.close_behavior(),
                options,
                source,
                fault,
                footer_content: None,
                footer_buttons: Vec::new(),
                tree: None,
                state: DialogState::Closed,
                generation: 0,
                destroy_pending: false,
                transition_listener: None,
                escape_listener: None,
                gauge: ScrollbarGauge::new(),
                keep_alive: None,
            })),
        }
    }

    pub fn id(&self) -> DialogId {
        self.inner.borrow().id.clone()
    }

    pub fn state(&self) -> DialogState {
        self.inner.borrow().state
    }

    /// Opening or open
    pub fn is_open(&self) -> bool {
        self.state().is_shown()
    }

    /// Whether this dialog is shown and the most recently opened one
    pub fn is_topmost(&self) -> bool {
        let inner = self.inner.borrow();
        inner.state.is_shown() && inner.host.registry().is_top(&inner.id)
    }

    /// Configuration fault recorded at construction, if still uncorrected
    pub fn error(&self) -> Option<DialogError> {
        self.inner.borrow().fault.clone()
    }

    pub fn close_behavior(&self) -> CloseBehavior {
        self.inner.borrow().close
    }

    pub fn backdrop(&self) -> Option<ElementRef> {
        self.inner.borrow().tree.as_ref().map(|tree| tree.backdrop)
    }

    pub fn container(&self) -> Option<ElementRef> {
        self.inner.borrow().tree.as_ref().map(|tree| tree.container)
    }

    pub fn content_region(&self) -> Option<ElementRef> {
        self.inner.borrow().tree.as_ref().map(|tree| tree.content)
    }

    pub fn footer_region(&self) -> Option<ElementRef> {
        self.inner.borrow().tree.as_ref().and_then(|tree| tree.footer)
    }

    /// Show the dialog, building its tree first if needed. Returns the backdrop.
    pub fn open(&self) -> DialogResult<ElementRef> {
        let handle = self.downgrade();
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        if inner.state.is_shown() {
            if let Some(tree) = &inner.tree {
                debug!(dialog_id = %inner.id, "open ignored, dialog already shown");
                return Ok(tree.backdrop);
            }
        }

        let backdrop = match inner.tree.as_ref().map(|tree| tree.backdrop) {
            Some(backdrop) => backdrop,
            None => inner.build(&handle)?,
        };

        let document = inner.host.document().clone();
        if inner.close.escape && inner.escape_listener.is_none() {
            let escape = handle.clone();
            let listener = document.add_listener(
                EventTarget::Document,
                EventKind::KeyDown,
                Rc::new(move |event: &DomEvent| {
                    if event.key.as_deref() != Some(ESCAPE_KEY) || event.is_handled() {
                        return;
                    }
                    let Some(dialog) = Dialog::upgrade(&escape) else {
                        return;
                    };
                    if !dialog.is_topmost() {
                        return;
                    }
                    // The next dialog down becomes topmost before its listener runs
                    event.mark_handled();
                    if let Err(err) = dialog.close() {
                        error!(dialog_id = %dialog.id(), "failed to close on Escape: {err}");
                    }
                }),
            )?;
            inner.escape_listener = Some(listener);
        }

        let registry = inner.host.registry().clone();
        registry.push(inner.id.clone());
        inner.state = DialogState::Opening;
        inner.generation += 1;
        inner.destroy_pending = false;
        inner.unbind_transition();
        inner.keep_alive = Some(self.inner.clone());

        // Next turn, so the page renders the hidden state before the shown one
        let generation = inner.generation;
        let show = handle.clone();
        inner.host.scheduler().defer(Box::new(move || {
            if let Some(dialog) = Dialog::upgrade(&show) {
                dialog.show(generation);
            }
        }));

        if inner.options.enable_scroll_lock && registry.len() == 1 {
            if let Err(err) = inner.lock_scroll() {
                error!(dialog_id = %inner.id, "failed to lock page scroll: {err}");
            }
        }

        debug!(dialog_id = %inner.id, depth = registry.len(), "dialog opening");
        Ok(backdrop)
    }

    /// Close with the configured `destroy_on_close` behavior
    pub fn close(&self) -> DialogResult<()> {
        let destroy = self.inner.borrow().options.destroy_on_close;
        self.close_with(destroy)
    }

    /// Hide the dialog. Once the hide transition completes the tree is torn
    /// down if `destroy` is set, the scroll-lock is released if this was the
    /// last open dialog, and `on_close` fires.
    ///
    /// Closing a dialog that is not shown does nothing.
    pub fn close_with(&self, destroy: bool) -> DialogResult<()> {
        let (document, scheduler, transition, animating, generation) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;

            if !inner.state.is_shown() {
                debug!(dialog_id = %inner.id, state = ?inner.state, "close ignored, dialog not shown");
                return Ok(());
            }

            let document = inner.host.document().clone();
            let animating = match inner.tree.as_mut() {
                Some(tree) => {
                    document.remove_class(tree.backdrop, class_names::SHOW)?;
                    std::mem::replace(&mut tree.shown, false).then_some(tree.backdrop)
                }
                None => None,
            };

            inner.host.registry().remove(&inner.id);
            inner.state = DialogState::Closing;
            inner.generation += 1;
            inner.destroy_pending = destroy;
            inner.unbind_transition();

            debug!(dialog_id = %inner.id, destroy, "dialog closing");
            (
                document,
                inner.host.scheduler().clone(),
                inner.host.transition().clone(),
                animating,
                inner.generation,
            )
        };

        let handle = self.downgrade();
        let done: Task = Box::new(move || {
            if let Some(dialog) = Dialog::upgrade(&handle) {
                dialog.finish_close(generation);
            }
        });

        match animating {
            Some(backdrop) => match transition.watch(&*document, &*scheduler, backdrop, done) {
                Ok(listener) => self.bind_transition(generation, listener),
                Err(err) => {
                    // No completion is coming, so settle the close now
                    error!(dialog_id = %self.id(), "failed to watch close transition: {err}");
                    self.finish_close(generation);
                    return Err(err);
                }
            },
            // The show class never landed, so there is no transition to wait for
            None => done(),
        }
        Ok(())
    }

    /// Close and always tear the tree down, whatever `destroy_on_close` says
    pub fn destroy(&self) -> DialogResult<()> {
        match self.state() {
            DialogState::Opening | DialogState::Open => self.close_with(true),
            DialogState::Closing => {
                self.inner.borrow_mut().destroy_pending = true;
                Ok(())
            }
            DialogState::Closed => self.inner.borrow_mut().teardown(),
        }
    }

    /// Replace the content markup, re-rendering it in place once built
    pub fn set_content(&self, content: impl Into<String>) -> DialogResult<()> {
        let content = content.into();
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        let document = inner.host.document().clone();
        if let Some(tree) = &inner.tree {
            document.set_inner_html(tree.content, &content)?;
        }
        if let Some(Source::Template(template)) = inner.source.replace(Source::Markup(content)) {
            document.release(template);
        }
        inner.fault = None;
        Ok(())
    }

    /// Replace the markup leading the footer. Footer buttons are kept.
    pub fn set_footer_content(&self, content: impl Into<String>) -> DialogResult<()> {
        let content = content.into();
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        if let Some(footer) = inner.tree.as_ref().and_then(|tree| tree.footer) {
            let document = inner.host.document().clone();
            document.set_inner_html(footer, &content)?;
            // Replacing the markup detached the rendered buttons
            for (button, _) in inner.footer_buttons.iter().filter_map(|b| b.rendered) {
                document.append_child(footer, button)?;
            }
        }
        inner.footer_content = Some(content);
        Ok(())
    }

    /// Queue a footer button. Rendered right away if the footer exists,
    /// otherwise when the tree is built.
    pub fn add_footer_button(
        &self,
        label: impl Into<String>,
        class_name: impl Into<String>,
        on_click: impl Fn(&DomEvent) + 'static,
    ) -> DialogResult<()> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        inner.footer_buttons.push(FooterButton {
            label: label.into(),
            class_name: class_name.into(),
            on_click: Rc::new(on_click),
            rendered: None,
        });

        if let Some(footer) = inner.tree.as_ref().and_then(|tree| tree.footer) {
            let document = inner.host.document().clone();
            render_footer_buttons(&*document, footer, &mut inner.footer_buttons)?;
        }
        Ok(())
    }

    /// Width of the platform scrollbar, measured on first call
    pub fn scrollbar_width(&self) -> DialogResult<f64> {
        let inner = self.inner.borrow();
        let document = inner.host.document().clone();
        inner.gauge.width(&*document)
    }

    /// Whether `target` currently has overflowing content
    pub fn has_scrollbar(&self, target: ElementRef) -> bool {
        let document = self.inner.borrow().host.document().clone();
        scroll_lock::has_scrollbar(&*document, target)
    }

    fn downgrade(&self) -> Weak<RefCell<Inner>> {
        Rc::downgrade(&self.inner)
    }

    fn upgrade(handle: &Weak<RefCell<Inner>>) -> Option<Self> {
        handle.upgrade().map(|inner| Self { inner })
    }

    /// Deferred half of `open`: apply the show class and wait for its transition
    fn show(&self, generation: u64) {
        let (document, scheduler, transition, backdrop) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;

            if inner.generation != generation || inner.state != DialogState::Opening {
                trace!(dialog_id = %inner.id, "deferred show superseded");
                return;
            }
            let document = inner.host.document().clone();
            let Some(tree) = inner.tree.as_mut() else {
                return;
            };
            if let Err(err) = document.add_class(tree.backdrop, class_names::SHOW) {
                error!(dialog_id = %inner.id, "failed to show dialog: {err}");
                return;
            }
            tree.shown = true;
            (
                document,
                inner.host.scheduler().clone(),
                inner.host.transition().clone(),
                tree.backdrop,
            )
        };

        let handle = self.downgrade();
        let done: Task = Box::new(move || {
            if let Some(dialog) = Dialog::upgrade(&handle) {
                dialog.finish_open(generation);
            }
        });
        match transition.watch(&*document, &*scheduler, backdrop, done) {
            Ok(listener) => self.bind_transition(generation, listener),
            Err(err) => error!(dialog_id = %self.id(), "failed to watch open transition: {err}"),
        }
    }

    /// Keep `listener` as the dialog's single pending completion binding
    fn bind_transition(&self, generation: u64, listener: Option<ListenerId>) {
        let Some(listener) = listener else {
            return;
        };
        let mut inner = self.inner.borrow_mut();
        let document = inner.host.document().clone();
        if inner.generation != generation {
            document.remove_listener(listener);
            return;
        }
        if let Some(previous) = inner.transition_listener.replace(listener) {
            document.remove_listener(previous);
        }
    }

    fn finish_open(&self, generation: u64) {
        let hook = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;

            if inner.generation != generation || inner.state != DialogState::Opening {
                trace!(dialog_id = %inner.id, "stale open completion ignored");
                return;
            }
            inner.state = DialogState::Open;
            inner.unbind_transition();
            debug!(dialog_id = %inner.id, "dialog open");
            inner.options.on_open.clone()
        };

        if let Some(hook) = hook {
            hook();
        }
    }

    fn finish_close(&self, generation: u64) {
        let (hook, keep_alive) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;

            if inner.generation != generation || inner.state != DialogState::Closing {
                trace!(dialog_id = %inner.id, "stale close completion ignored");
                return;
            }
            inner.state = DialogState::Closed;
            inner.unbind_transition();

            if std::mem::take(&mut inner.destroy_pending) {
                if let Err(err) = inner.teardown() {
                    error!(dialog_id = %inner.id, "failed to destroy dialog: {err}");
                }
            }
            if inner.options.enable_scroll_lock && inner.host.registry().is_empty() {
                if let Err(err) = inner.unlock_scroll() {
                    error!(dialog_id = %inner.id, "failed to release page scroll: {err}");
                }
            }

            debug!(dialog_id = %inner.id, "dialog closed");
            (inner.options.on_close.clone(), inner.keep_alive.take())
        };

        if let Some(hook) = hook {
            hook();
        }
        drop(keep_alive);
    }
}

impl fmt::Debug for Dialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Dialog")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("built", &inner.tree.is_some())
            .field("footer_buttons", &inner.footer_buttons.len())
            .finish()
    }
}

impl Inner {
    fn build(&mut self, handle: &Weak<RefCell<Inner>>) -> DialogResult<ElementRef> {
        let document = self.host.document().clone();

        // Nothing touches the page until the content is known to be renderable
        if self.source.is_none() {
            return Err(self
                .fault
                .clone()
                .unwrap_or(DialogError::MissingContentSource));
        }

        let backdrop = document.create_element("div")?;
        document.set_class_name(backdrop, class_names::BACKDROP)?;

        let container = document.create_element("div")?;
        document.set_class_name(container, class_names::CONTAINER)?;
        for class_name in &self.options.css_class {
            document.add_class(container, class_name)?;
        }

        let mut listeners = Vec::new();
        let close_button = if self.close.button {
            let close = handle.clone();
            let (button, listener) = create_button(
                &*document,
                CLOSE_BUTTON_LABEL,
                class_names::CLOSE_BUTTON,
                Rc::new(move |_: &DomEvent| close_from_event(&close, "close button")),
            )?;
            document.prepend_child(container, button)?;
            listeners.push(listener);
            Some(button)
        } else {
            None
        };

        let content = document.create_element("div")?;
        document.set_class_name(content, class_names::CONTENT)?;
        let fragment = match &self.source {
            Some(Source::Markup(markup)) => {
                document.set_inner_html(content, markup)?;
                None
            }
            Some(Source::Template(template)) => {
                let fragment = document.clone_template_content(*template)?;
                document.append_child(content, fragment)?;
                Some(fragment)
            }
            None => None,
        };
        document.append_child(container, content)?;

        let footer = if self.options.footer {
            let footer = document.create_element("div")?;
            document.set_class_name(footer, class_names::FOOTER)?;
            if let Some(markup) = &self.footer_content {
                document.set_inner_html(footer, markup)?;
            }
            render_footer_buttons(&*document, footer, &mut self.footer_buttons)?;
            document.append_child(container, footer)?;
            Some(footer)
        } else {
            None
        };

        document.append_child(backdrop, container)?;
        document.append_child(document.body(), backdrop)?;

        if self.close.overlay {
            let close = handle.clone();
            let listener = document.add_listener(
                EventTarget::Element(backdrop),
                EventKind::Click,
                Rc::new(move |event: &DomEvent| {
                    // Clicks bubbling up from the container do not count
                    if event.target == Some(backdrop) {
                        close_from_event(&close, "overlay");
                    }
                }),
            )?;
            listeners.push(listener);
        }

        self.tree = Some(Tree {
            backdrop,
            container,
            content,
            footer,
            close_button,
            fragment,
            listeners,
            shown: false,
        });
        debug!(dialog_id = %self.id, "dialog built");
        Ok(backdrop)
    }

    /// Detach the tree, unbind everything it owns and release its elements
    /// back to the document. Queued footer buttons stay queued for the next
    /// build.
    fn teardown(&mut self) -> DialogResult<()> {
        let document = self.host.document().clone();
        self.unbind_transition();
        if let Some(listener) = self.escape_listener.take() {
            document.remove_listener(listener);
        }
        for button in &mut self.footer_buttons {
            if let Some((element, listener)) = button.rendered.take() {
                document.remove_listener(listener);
                document.release(element);
            }
        }

        let Some(tree) = self.tree.take() else {
            return Ok(());
        };
        for listener in tree.listeners {
            document.remove_listener(listener);
        }
        let detached = document.remove(tree.backdrop);
        let elements = [tree.backdrop, tree.container, tree.content]
            .into_iter()
            .chain(tree.footer)
            .chain(tree.close_button)
            .chain(tree.fragment);
        for element in elements {
            document.release(element);
        }
        detached?;
        debug!(dialog_id = %self.id, "dialog destroyed");
        Ok(())
    }

    fn unbind_transition(&mut self) {
        if let Some(listener) = self.transition_listener.take() {
            self.host.document().remove_listener(listener);
        }
    }

    fn lock_target(&self) -> ElementRef {
        match &self.options.scroll_lock_target {
            Some(target) => target(),
            None => self.host.document().body(),
        }
    }

    fn lock_scroll(&self) -> DialogResult<()> {
        let document = self.host.document().clone();
        let target = self.lock_target();
        if !scroll_lock::has_scrollbar(&*document, target) || scroll_lock::is_locked(&*document, target) {
            return Ok(());
        }
        let width = self.gauge.width(&*document)?;
        scroll_lock::engage(&*document, target, width)
    }

    fn unlock_scroll(&self) -> DialogResult<()> {
        let document = self.host.document().clone();
        let target = self.lock_target();
        if scroll_lock::is_locked(&*document, target) {
            scroll_lock::release(&*document, target)?;
        }
        Ok(())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            error!(dialog_id = %self.id, "failed to tear down dropped dialog: {err}");
        }
        if let Some(Source::Template(template)) = self.source.take() {
            self.host.document().release(template);
        }
        trace!(dialog_id = %self.id, "dialog dropped");
    }
}

fn create_button(
    document: &dyn Document,
    label: &str,
    class_name: &str,
    on_click: Listener,
) -> DomResult<(ElementRef, ListenerId)> {
    let button = document.create_element("button")?;
    document.set_inner_html(button, label)?;
    document.set_class_name(button, class_name)?;
    let listener = document.add_listener(EventTarget::Element(button), EventKind::Click, on_click)?;
    Ok((button, listener))
}

/// Render the queued buttons that have no element yet, in queue order
fn render_footer_buttons(
    document: &dyn Document,
    footer: ElementRef,
    buttons: &mut [FooterButton],
) -> DomResult<()> {
    for button in buttons.iter_mut().filter(|b| b.rendered.is_none()) {
        let (element, listener) = create_button(
            document,
            &button.label,
            &button.class_name,
            button.on_click.clone(),
        )?;
        document.append_child(footer, element)?;
        button.rendered = Some((element, listener));
    }
    Ok(())
}

fn close_from_event(handle: &Weak<RefCell<Inner>>, origin: &str) {
    let Some(dialog) = Dialog::upgrade(handle) else {
        return;
    };
    if let Err(err) = dialog.close() {
        error!(dialog_id = %dialog.id(), origin, "failed to close dialog: {err}");
    }
}
