//! Zodal: a lightweight modal dialog widget
//!
//! A [`Dialog`] renders a backdrop-and-container overlay into a page, shows
//! and hides it with a CSS transition, stacks with other open dialogs,
//! locks page scrolling while any dialog is open and can be dismissed by a
//! close button, an overlay click or the Escape key.
//!
//! The page is reached through the [`dom::Document`] trait, so the same
//! dialog logic runs against a live browser page (`web` feature) or the
//! headless [`dom::MemoryDocument`].
//!
//! ```
//! use std::rc::Rc;
//! use zodal::{Dialog, DialogOptions, Document, Host, ManualScheduler, MemoryDocument};
//!
//! let document = Rc::new(MemoryDocument::new());
//! let scheduler = Rc::new(ManualScheduler::new());
//! let host = Host::new(document.clone(), scheduler.clone());
//!
//! let dialog = Dialog::new(&host, DialogOptions::new().with_content("<p>Hi</p>").with_footer(true));
//! let backdrop = dialog.open().unwrap();
//! scheduler.run_pending();
//! assert!(document.has_class(backdrop, "zodal-show"));
//! ```

pub mod config;
pub mod dialog;
pub mod dom;
pub mod error;
pub mod host;
pub mod logging;
pub mod scheduler;

pub use config::{DialogPresets, PresetFormat};
pub use dialog::{
    class_names, CloseMethod, ContentSource, CssTransition, Dialog, DialogId, DialogOptions,
    DialogRegistry, DialogState, Immediate, Timed, TransitionDriver,
};
pub use dom::{Document, DomEvent, ElementRef, MemoryDocument};
pub use error::{DialogError, DialogResult, DomError, DomResult};
pub use host::Host;
pub use logging::init_logging;
pub use scheduler::{ManualScheduler, Scheduler};
#[cfg(not(target_arch = "wasm32"))]
pub use scheduler::TokioScheduler;
#[cfg(feature = "web")]
pub use dom::WebDocument;
#[cfg(feature = "web")]
pub use scheduler::TimeoutScheduler;
