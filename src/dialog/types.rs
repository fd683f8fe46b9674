//! Core dialog types
//!
//! Identifiers, configuration, content sources and lifecycle state shared by
//! the dialog, its registry and the configuration loader.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dom::{DomEvent, ElementRef, ListenerId};
use crate::error::{DialogError, DialogResult};

/// Unique identifier for dialog instances
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogId(pub String);

impl DialogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DialogId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DialogId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interactions that may close a dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseMethod {
    /// The `×` button in the container's corner
    Button,
    /// A click on the empty backdrop area
    Overlay,
    /// The Escape key, for the topmost dialog
    Escape,
}

impl CloseMethod {
    pub const ALL: [CloseMethod; 3] = [Self::Button, Self::Overlay, Self::Escape];
}

/// Which close affordances a dialog wires up. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseBehavior {
    pub button: bool,
    pub overlay: bool,
    pub escape: bool,
}

impl CloseBehavior {
    pub fn from_methods(methods: &[CloseMethod]) -> Self {
        Self {
            button: methods.contains(&CloseMethod::Button),
            overlay: methods.contains(&CloseMethod::Overlay),
            escape: methods.contains(&CloseMethod::Escape),
        }
    }
}

/// Callback fired when an open or close transition completes
pub type Hook = Rc<dyn Fn()>;

/// Resolves the element whose scrolling is suppressed while dialogs are open
pub type ScrollLockTarget = Rc<dyn Fn() -> ElementRef>;

/// Click handler for footer buttons; receives the originating event
pub type ClickHandler = Rc<dyn Fn(&DomEvent)>;

/// Dialog configuration options
///
/// Everything except the hooks is serializable so dialogs can be declared
/// in configuration files (see [`crate::config`]). Field names follow the
/// camelCase keys hosts already use (`closeMethod`, `cssClass`,
/// `destroyZodal`, ...).
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DialogOptions {
    /// Raw markup rendered into the content region
    pub content: Option<String>,
    /// Id of a `<template>` whose content is cloned into the content region
    pub template_id: Option<String>,
    pub close_method: Vec<CloseMethod>,
    /// Extra classes for the container
    pub css_class: Vec<String>,
    /// Whether a footer region is rendered
    pub footer: bool,
    /// Whether `close()` tears the tree down
    #[serde(rename = "destroyZodal")]
    pub destroy_on_close: bool,
    pub enable_scroll_lock: bool,
    #[serde(skip)]
    pub scroll_lock_target: Option<ScrollLockTarget>,
    #[serde(skip)]
    pub on_open: Option<Hook>,
    #[serde(skip)]
    pub on_close: Option<Hook>,
}

impl Default for DialogOptions {
    fn default() -> Self {
        Self {
            content: None,
            template_id: None,
            close_method: CloseMethod::ALL.to_vec(),
            css_class: Vec::new(),
            footer: false,
            destroy_on_close: true,
            enable_scroll_lock: true,
            scroll_lock_target: None,
            on_open: None,
            on_close: None,
        }
    }
}

impl fmt::Debug for DialogOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogOptions")
            .field("content", &self.content)
            .field("template_id", &self.template_id)
            .field("close_method", &self.close_method)
            .field("css_class", &self.css_class)
            .field("footer", &self.footer)
            .field("destroy_on_close", &self.destroy_on_close)
            .field("enable_scroll_lock", &self.enable_scroll_lock)
            .field("scroll_lock_target", &self.scroll_lock_target.is_some())
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

impl DialogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    pub fn with_close_methods(mut self, methods: &[CloseMethod]) -> Self {
        self.close_method = methods.to_vec();
        self
    }

    pub fn with_css_class(mut self, class_name: impl Into<String>) -> Self {
        self.css_class.push(class_name.into());
        self
    }

    pub fn with_footer(mut self, footer: bool) -> Self {
        self.footer = footer;
        self
    }

    pub fn destroy_on_close(mut self, destroy: bool) -> Self {
        self.destroy_on_close = destroy;
        self
    }

    pub fn scroll_lock(mut self, enabled: bool) -> Self {
        self.enable_scroll_lock = enabled;
        self
    }

    pub fn with_scroll_lock_target(mut self, target: impl Fn() -> ElementRef + 'static) -> Self {
        self.scroll_lock_target = Some(Rc::new(target));
        self
    }

    pub fn on_open(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_open = Some(Rc::new(hook));
        self
    }

    pub fn on_close(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_close = Some(Rc::new(hook));
        self
    }

    pub fn close_behavior(&self) -> CloseBehavior {
        CloseBehavior::from_methods(&self.close_method)
    }

    /// Resolve the configured content fields into a single source
    pub fn content_source(&self) -> DialogResult<ContentSource> {
        ContentSource::resolve(self.content.clone(), self.template_id.clone())
    }
}

/// Where the content region's markup comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Markup(String),
    /// Id of a `<template>` element in the page
    Template(String),
}

impl ContentSource {
    /// Pick the authoritative source. Markup wins when both are given.
    pub fn resolve(content: Option<String>, template_id: Option<String>) -> DialogResult<Self> {
        match (content, template_id) {
            (Some(markup), Some(template_id)) => {
                warn!(
                    %template_id,
                    "Both 'content' and 'templateId' are specified. 'content' will take precedence, and 'templateId' ignored"
                );
                Ok(Self::Markup(markup))
            }
            (Some(markup), None) => Ok(Self::Markup(markup)),
            (None, Some(template_id)) => Ok(Self::Template(template_id)),
            (None, None) => Err(DialogError::MissingContentSource),
        }
    }
}

/// Dialog lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogState {
    /// Hidden; the tree may still exist if it was closed without destroying
    #[default]
    Closed,
    /// Open requested; waiting for the show class and its transition
    Opening,
    Open,
    /// Close requested; waiting for the hide transition
    Closing,
}

impl DialogState {
    /// Opening or open
    pub fn is_shown(&self) -> bool {
        matches!(self, Self::Opening | Self::Open)
    }
}

/// A queued footer button and, once rendered, its element
pub(crate) struct FooterButton {
    pub label: String,
    pub class_name: String,
    pub on_click: ClickHandler,
    pub rendered: Option<(ElementRef, ListenerId)>,
}

/// Class names the stylesheet must define
pub mod class_names {
    pub const BACKDROP: &str = "zodal-backdrop";
    /// Added to the backdrop while visible; its `transform` transition drives open/close completion
    pub const SHOW: &str = "zodal-show";
    pub const CONTAINER: &str = "zodal-container";
    pub const CONTENT: &str = "zodal-content";
    pub const FOOTER: &str = "zodal-footer";
    pub const CLOSE_BUTTON: &str = "zodal-btn-close";
    /// Applied to the scroll-lock target while any dialog is open
    pub const NO_SCROLL: &str = "zodal-no-scroll";
}
