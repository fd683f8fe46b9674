//! Page scroll-lock
//!
//! While any dialog is open the lock target gets the no-scroll class, which
//! hides its scrollbar. To avoid the page shifting sideways when that
//! happens, the target's right padding grows by the scrollbar width.

use std::cell::Cell;

use tracing::debug;

use super::types::class_names;
use crate::dom::{Document, ElementRef};
use crate::error::DialogResult;

const PADDING_RIGHT: &str = "padding-right";

/// Measures the platform scrollbar width once and remembers it
#[derive(Debug, Default)]
pub struct ScrollbarGauge {
    cached: Cell<Option<f64>>,
}

impl ScrollbarGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self) -> Option<f64> {
        self.cached.get()
    }

    /// Width a rendered scrollbar takes, measured with an offscreen scroll
    /// container on first use. Overlay scrollbars measure as 0, which is cached too.
    pub fn width(&self, document: &dyn Document) -> DialogResult<f64> {
        if let Some(width) = self.cached.get() {
            return Ok(width);
        }

        let sample = document.create_element("div")?;
        document.set_style(sample, "overflow", "scroll")?;
        document.set_style(sample, "position", "absolute")?;
        document.set_style(sample, "top", "-9999px")?;
        document.append_child(document.body(), sample)?;

        let width = (document.offset_width(sample) - document.client_width(sample)).max(0.0);

        document.remove(sample)?;
        document.release(sample);
        debug!(width, "measured scrollbar width");
        self.cached.set(Some(width));
        Ok(width)
    }
}

/// Whether the target's content overflows it.
///
/// The root element and body both count as "the page"; browsers differ in
/// which of the two actually scrolls, so either overflowing is enough.
pub fn has_scrollbar(document: &dyn Document, target: ElementRef) -> bool {
    let overflows = |el: ElementRef| document.scroll_height(el) > document.client_height(el);

    let root = document.document_element();
    let body = document.body();
    if target == root || target == body {
        overflows(root) || overflows(body)
    } else {
        overflows(target)
    }
}

pub fn is_locked(document: &dyn Document, target: ElementRef) -> bool {
    document.has_class(target, class_names::NO_SCROLL)
}

/// Suppress scrolling on `target`, padding it by `scrollbar_width`
pub fn engage(document: &dyn Document, target: ElementRef, scrollbar_width: f64) -> DialogResult<()> {
    let padding = parse_px(&document.computed_style(target, PADDING_RIGHT));
    document.add_class(target, class_names::NO_SCROLL)?;
    document.set_style(target, PADDING_RIGHT, &format!("{}px", padding + scrollbar_width))?;
    debug!(%target, padding, scrollbar_width, "scroll lock engaged");
    Ok(())
}

/// Undo [`engage`]: drop the class and the inline padding override
pub fn release(document: &dyn Document, target: ElementRef) -> DialogResult<()> {
    document.remove_class(target, class_names::NO_SCROLL)?;
    document.remove_style(target, PADDING_RIGHT)?;
    debug!(%target, "scroll lock released");
    Ok(())
}

/// Leading number of a CSS length (`"12.5px"` → 12.5); anything unparseable is 0
fn parse_px(value: &str) -> f64 {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(value.len(), |(i, _)| i);
    value[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, Metrics};

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("12px"), 12.0);
        assert_eq!(parse_px(" 7.5px "), 7.5);
        assert_eq!(parse_px("0"), 0.0);
        assert_eq!(parse_px(""), 0.0);
        assert_eq!(parse_px("auto"), 0.0);
        assert_eq!(parse_px("-3px"), -3.0);
    }

    #[test]
    fn test_gauge_measures_once() {
        let doc = MemoryDocument::new().with_scrollbar_width(17.0);
        let gauge = ScrollbarGauge::new();

        assert_eq!(gauge.width(&doc).unwrap(), 17.0);
        let created = doc.created_count();
        assert_eq!(gauge.width(&doc).unwrap(), 17.0);
        assert_eq!(doc.created_count(), created);
        // The measuring element never stays in the page
        assert!(doc.children(doc.body()).is_empty());
        assert_eq!(doc.live_count(), 2);
    }

    #[test]
    fn test_gauge_caches_zero_width() {
        let doc = MemoryDocument::new().with_scrollbar_width(0.0);
        let gauge = ScrollbarGauge::new();

        assert_eq!(gauge.width(&doc).unwrap(), 0.0);
        assert_eq!(gauge.cached(), Some(0.0));
        assert_eq!(doc.created_count(), 1);
        gauge.width(&doc).unwrap();
        assert_eq!(doc.created_count(), 1);
    }

    #[test]
    fn test_page_scrollbar_checks_root_and_body() {
        let doc = MemoryDocument::new();
        let (root, body) = (doc.document_element(), doc.body());
        assert!(!has_scrollbar(&doc, body));

        // Only the root scrolls, yet the body target still counts as scrollable
        doc.set_metrics(root, Metrics::overflowing());
        doc.set_metrics(body, Metrics::fitting());
        assert!(has_scrollbar(&doc, body));
        assert!(has_scrollbar(&doc, root));
    }

    #[test]
    fn test_element_scrollbar_checks_only_itself() {
        let doc = MemoryDocument::new();
        doc.set_metrics(doc.document_element(), Metrics::overflowing());
        let panel = doc.create_element("div").unwrap();
        assert!(!has_scrollbar(&doc, panel));

        doc.set_metrics(panel, Metrics::overflowing());
        assert!(has_scrollbar(&doc, panel));
    }

    #[test]
    fn test_engage_and_release() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        doc.set_sheet_style(body, "padding-right", "10px");

        engage(&doc, body, 15.0).unwrap();
        assert!(is_locked(&doc, body));
        assert_eq!(doc.inline_style(body, "padding-right").as_deref(), Some("25px"));

        release(&doc, body).unwrap();
        assert!(!is_locked(&doc, body));
        assert_eq!(doc.inline_style(body, "padding-right"), None);
    }
}
