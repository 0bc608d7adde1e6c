//! Target resolution against the live document
//!
//! Maps a step's CSS selector to a measured [`ElementRect`] in document
//! coordinates. Asynchronously-rendered targets get one bounded retry
//! (scheduled by the runtime); a zero-sized match counts as hidden and is
//! treated like not-found so the tooltip falls back to a centered placement.

use tour_core::{ElementRect, Size, TourError, TourResult};
use web_sys::{Element, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition};

/// Delay before the single re-resolution attempt
pub const RETRY_DELAY_MS: i32 = 500;

/// Delay before the first measurement of a newly shown step, so layout can
/// settle
pub const SETTLE_DELAY_MS: i32 = 100;

/// A located target: the live element plus its measured rect
pub struct ResolvedTarget {
    pub element: Element,
    pub rect: ElementRect,
}

/// Locate the first element matching `selector` and measure it.
pub fn resolve(selector: &str) -> TourResult<ResolvedTarget> {
    let not_found = || TourError::TargetNotFound {
        selector: selector.to_string(),
    };

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(not_found)?;

    let element = document
        .query_selector(selector)
        .map_err(|err| {
            log::warn!("invalid tour target selector '{selector}': {err:?}");
            not_found()
        })?
        .ok_or_else(not_found)?;

    let bounds = element.get_bounding_client_rect();
    let (scroll_x, scroll_y) = scroll_offsets();
    let rect = ElementRect::from_viewport(
        bounds.top(),
        bounds.left(),
        bounds.width(),
        bounds.height(),
        scroll_x,
        scroll_y,
    );

    if rect.is_empty() {
        return Err(TourError::TargetHidden {
            selector: selector.to_string(),
        });
    }

    Ok(ResolvedTarget { element, rect })
}

/// Best-effort smooth scroll that centers the target in the viewport.
pub fn scroll_into_view(element: &Element) {
    let options = ScrollIntoViewOptions::new();
    options.set_behavior(ScrollBehavior::Smooth);
    options.set_block(ScrollLogicalPosition::Center);
    options.set_inline(ScrollLogicalPosition::Center);
    element.scroll_into_view_with_scroll_into_view_options(&options);
}

/// Current window scroll offsets, falling back to the document element when
/// `pageX/YOffset` is unavailable.
pub fn scroll_offsets() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (0.0, 0.0);
    };
    let fallback = |horizontal: bool| {
        window
            .document()
            .and_then(|d| d.document_element())
            .map(|e| {
                if horizontal {
                    e.scroll_left() as f64
                } else {
                    e.scroll_top() as f64
                }
            })
            .unwrap_or(0.0)
    };
    let x = window.page_x_offset().unwrap_or_else(|_| fallback(true));
    let y = window.page_y_offset().unwrap_or_else(|_| fallback(false));
    (x, y)
}

/// Current viewport dimensions
pub fn viewport_size() -> Size {
    let Some(window) = web_sys::window() else {
        return Size::new(0.0, 0.0);
    };
    let width = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let height = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    Size::new(width, height)
}
