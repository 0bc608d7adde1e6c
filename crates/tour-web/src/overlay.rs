//! DOM overlay renderer
//!
//! Paints the dimmed backdrop with a cutout around the target, the highlight
//! border and pulse ring, and the tooltip card with navigation controls.
//! The root element is fixed to the viewport, so everything here works in
//! viewport coordinates: resolved rects (document coordinates) are shifted
//! by the current scroll offsets at paint time, and the placement engine is
//! fed the shifted rect so its viewport clamp applies directly.

use serde::{Deserialize, Serialize};
use tour_core::{compute_placement, ElementRect, Position, Size, TourStep};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element};

use crate::resolver;
use crate::TourHandle;

/// How far the highlight border extends beyond the target
const HIGHLIGHT_PADDING: f64 = 4.0;

/// How far the pulse ring extends beyond the target
const PULSE_PADDING: f64 = 8.0;

const STYLE_ELEMENT_ID: &str = "guided-tour-style";

/// Visual knobs the embedder may override
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub primary_color: String,
    pub backdrop_color: String,
    pub text_color: String,
    pub muted_color: String,
    pub surface_color: String,
    pub border_radius: String,
    pub z_index: i32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#3b82f6".to_string(),
            backdrop_color: "rgba(0, 0, 0, 0.6)".to_string(),
            text_color: "#111827".to_string(),
            muted_color: "#6b7280".to_string(),
            surface_color: "#ffffff".to_string(),
            border_radius: "8px".to_string(),
            z_index: 50,
        }
    }
}

/// Everything the renderer needs to paint one frame
pub(crate) struct OverlayFrame<'a> {
    pub step: &'a TourStep,
    pub step_number: usize,
    pub total_steps: usize,
    pub is_first: bool,
    pub is_last: bool,
    /// Resolved target rect in document coordinates, `None` while unresolved
    pub rect: Option<ElementRect>,
    /// True while the single not-found retry is still pending
    pub searching: bool,
}

pub(crate) struct OverlayRenderer {
    theme: Theme,
    root: Option<Element>,
    closures: Vec<Closure<dyn FnMut()>>,
    // Closures from the previous frame; one of them may still be executing
    // (a button click triggered this render), so they are dropped one frame
    // later.
    retired_closures: Vec<Closure<dyn FnMut()>>,
}

impl OverlayRenderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            root: None,
            closures: Vec::new(),
            retired_closures: Vec::new(),
        }
    }

    /// Remove the overlay subtree. Safe to call when nothing is mounted.
    pub fn unmount(&mut self) {
        if let Some(root) = self.root.take() {
            root.remove();
        }
        self.retired_closures.clear();
        self.retired_closures.append(&mut self.closures);
    }

    /// Rebuild the overlay for the given frame.
    pub fn render(&mut self, frame: &OverlayFrame<'_>, handle: &TourHandle) -> Result<(), JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("No document object"))?;

        let root = self.ensure_root(&document)?;
        root.set_inner_html("");
        self.retired_closures.clear();
        self.retired_closures.append(&mut self.closures);

        // Everything below is painted in viewport coordinates.
        let (scroll_x, scroll_y) = resolver::scroll_offsets();
        let rect = frame.rect.map(|r| {
            ElementRect::new(r.top - scroll_y, r.left - scroll_x, r.width, r.height)
        });

        self.render_backdrop(&document, &root, rect.as_ref(), handle)?;
        if let Some(rect) = &rect {
            self.render_highlight(&document, &root, rect)?;
        }
        self.render_tooltip(&document, &root, frame, rect.as_ref(), handle)?;
        Ok(())
    }

    fn ensure_root(&mut self, document: &Document) -> Result<Element, JsValue> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }

        inject_stylesheet(document, &self.theme)?;

        let root = document.create_element("div")?;
        root.set_attribute("data-guided-tour", "")?;
        root.set_attribute(
            "style",
            &format!(
                "position:fixed;inset:0;z-index:{};pointer-events:none;\
                 isolation:isolate;overflow:hidden;",
                self.theme.z_index
            ),
        )?;
        document
            .body()
            .ok_or_else(|| JsValue::from_str("No document body"))?
            .append_child(&root)?;
        self.root = Some(root.clone());
        Ok(root)
    }

    fn render_backdrop(
        &mut self,
        document: &Document,
        root: &Element,
        rect: Option<&ElementRect>,
        handle: &TourHandle,
    ) -> Result<(), JsValue> {
        let backdrop = document.create_element("div")?;
        let mut style = format!(
            "position:absolute;inset:0;background:{};pointer-events:auto;",
            self.theme.backdrop_color
        );
        if let Some(rect) = rect {
            style.push_str(&format!("clip-path:{};", cutout_clip_path(rect)));
        }
        backdrop.set_attribute("style", &style)?;
        let h = handle.clone();
        self.on_click(&backdrop, move || h.skip())?;
        root.append_child(&backdrop)?;
        Ok(())
    }

    fn render_highlight(
        &self,
        document: &Document,
        root: &Element,
        rect: &ElementRect,
    ) -> Result<(), JsValue> {
        let border = document.create_element("div")?;
        border.set_attribute(
            "style",
            &format!(
                "{}border:4px solid {};border-radius:{};pointer-events:none;\
                 box-shadow:0 0 12px {}33;",
                inflated_box_style(rect, HIGHLIGHT_PADDING),
                self.theme.primary_color,
                self.theme.border_radius,
                self.theme.primary_color,
            ),
        )?;
        root.append_child(&border)?;

        let pulse = document.create_element("div")?;
        pulse.set_attribute(
            "style",
            &format!(
                "{}border:2px solid {}4d;border-radius:{};pointer-events:none;\
                 animation:guided-tour-pulse 2s ease-in-out infinite;",
                inflated_box_style(rect, PULSE_PADDING),
                self.theme.primary_color,
                self.theme.border_radius,
            ),
        )?;
        root.append_child(&pulse)?;
        Ok(())
    }

    fn render_tooltip(
        &mut self,
        document: &Document,
        root: &Element,
        frame: &OverlayFrame<'_>,
        rect: Option<&ElementRect>,
        handle: &TourHandle,
    ) -> Result<(), JsValue> {
        let theme = self.theme.clone();
        let tooltip = document.create_element("div")?;
        tooltip.set_attribute(
            "style",
            &format!(
                "position:absolute;left:0;top:0;pointer-events:auto;width:320px;\
                 max-width:calc(100vw - 40px);background:{};color:{};\
                 border-radius:{};padding:24px;box-shadow:0 20px 50px rgba(0,0,0,0.3);\
                 font-family:system-ui,sans-serif;",
                theme.surface_color, theme.text_color, theme.border_radius
            ),
        )?;

        // Header: step badge + close
        let header = styled(
            document,
            "div",
            "display:flex;align-items:center;justify-content:space-between;margin-bottom:8px;",
        )?;
        let badge = styled(
            document,
            "span",
            &format!(
                "font-size:12px;color:{};background:{}1a;padding:2px 8px;border-radius:4px;",
                theme.primary_color, theme.primary_color
            ),
        )?;
        badge.set_text_content(Some(&format!(
            "Step {} of {}",
            frame.step_number + 1,
            frame.total_steps
        )));
        header.append_child(&badge)?;

        let close = styled(
            document,
            "button",
            &format!(
                "border:none;background:none;cursor:pointer;color:{};font-size:14px;",
                theme.muted_color
            ),
        )?;
        close.set_text_content(Some("\u{2715}"));
        let h = handle.clone();
        self.on_click(&close, move || h.skip())?;
        header.append_child(&close)?;
        tooltip.append_child(&header)?;

        // Progress bar
        let track = styled(
            document,
            "div",
            "width:100%;background:#e5e7eb;border-radius:9999px;height:4px;margin-bottom:16px;",
        )?;
        let fill = styled(
            document,
            "div",
            &format!(
                "background:{};height:4px;border-radius:9999px;width:{}%;",
                theme.primary_color,
                progress_percent(frame.step_number, frame.total_steps)
            ),
        )?;
        track.append_child(&fill)?;
        tooltip.append_child(&track)?;

        // Title and body
        let title = styled(
            document,
            "h3",
            "margin:0 0 8px;font-size:18px;font-weight:600;",
        )?;
        title.set_text_content(Some(&frame.step.title));
        tooltip.append_child(&title)?;

        let body = styled(
            document,
            "p",
            &format!(
                "margin:0 0 20px;font-size:14px;line-height:1.6;color:{};",
                theme.muted_color
            ),
        )?;
        body.set_text_content(Some(&frame.step.content));
        tooltip.append_child(&body)?;

        if frame.searching {
            let note = styled(document, "p", "margin:0 0 16px;font-size:12px;color:#f97316;")?;
            note.set_text_content(Some(&format!(
                "Finding target element \"{}\"...",
                frame.step.target
            )));
            tooltip.append_child(&note)?;
        }

        self.render_controls(document, &tooltip, frame, handle)?;
        root.append_child(&tooltip)?;

        // Measure the card, then place it. An unresolved target renders
        // centered regardless of the step's requested position.
        let bounds = tooltip.get_bounding_client_rect();
        let measured = Size::new(bounds.width(), bounds.height());
        let position = if rect.is_some() {
            frame.step.position
        } else {
            Position::Center
        };
        let placement = compute_placement(rect, position, measured, resolver::viewport_size());
        let style = tooltip.get_attribute("style").unwrap_or_default();
        tooltip.set_attribute(
            "style",
            &style.replace(
                "left:0;top:0;",
                &format!("left:{}px;top:{}px;", placement.x, placement.y),
            ),
        )?;
        Ok(())
    }

    fn render_controls(
        &mut self,
        document: &Document,
        tooltip: &Element,
        frame: &OverlayFrame<'_>,
        handle: &TourHandle,
    ) -> Result<(), JsValue> {
        let theme = self.theme.clone();
        let row = styled(
            document,
            "div",
            "display:flex;align-items:center;justify-content:space-between;gap:12px;",
        )?;
        let left = styled(document, "div", "display:flex;gap:8px;")?;

        if !frame.is_first && frame.step.show_previous {
            let prev = styled(
                document,
                "button",
                &format!(
                    "padding:8px 12px;font-size:14px;border:1px solid #d1d5db;\
                     border-radius:6px;background:none;cursor:pointer;color:{};",
                    theme.text_color
                ),
            )?;
            prev.set_text_content(Some("\u{2190} Previous"));
            let h = handle.clone();
            self.on_click(&prev, move || h.previous())?;
            left.append_child(&prev)?;
        }

        if frame.step.show_skip && !frame.is_last {
            let skip = styled(
                document,
                "button",
                &format!(
                    "padding:8px 12px;font-size:14px;border:none;background:none;\
                     cursor:pointer;color:{};",
                    theme.muted_color
                ),
            )?;
            skip.set_text_content(Some("Skip \u{2192}"));
            let h = handle.clone();
            self.on_click(&skip, move || h.skip())?;
            left.append_child(&skip)?;
        }
        row.append_child(&left)?;

        let forward_style = format!(
            "padding:8px 16px;font-size:14px;border:none;border-radius:6px;\
             background:{};color:#ffffff;cursor:pointer;",
            theme.primary_color
        );
        if frame.is_last {
            let complete = styled(document, "button", &forward_style)?;
            complete.set_text_content(Some("\u{1F389} Complete Tour"));
            let h = handle.clone();
            self.on_click(&complete, move || h.complete_requested())?;
            row.append_child(&complete)?;
        } else if frame.step.show_next {
            let next = styled(document, "button", &forward_style)?;
            next.set_text_content(Some("Next \u{2192}"));
            let h = handle.clone();
            self.on_click(&next, move || h.next())?;
            row.append_child(&next)?;
        }

        tooltip.append_child(&row)?;
        Ok(())
    }

    fn on_click(&mut self, element: &Element, callback: impl FnMut() + 'static) -> Result<(), JsValue> {
        let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut()>);
        element.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        self.closures.push(closure);
        Ok(())
    }
}

fn styled(document: &Document, tag: &str, style: &str) -> Result<Element, JsValue> {
    let element = document.create_element(tag)?;
    element.set_attribute("style", style)?;
    Ok(element)
}

fn inject_stylesheet(document: &Document, _theme: &Theme) -> Result<(), JsValue> {
    if document.get_element_by_id(STYLE_ELEMENT_ID).is_some() {
        return Ok(());
    }
    let style = document.create_element("style")?;
    style.set_id(STYLE_ELEMENT_ID);
    style.set_text_content(Some(
        "@keyframes guided-tour-pulse {\
         0%, 100% { opacity: 0.5; transform: scale(1); }\
         50% { opacity: 0.2; transform: scale(1.05); } }",
    ));
    document
        .head()
        .ok_or_else(|| JsValue::from_str("No document head"))?
        .append_child(&style)?;
    Ok(())
}

/// `position:absolute` box inflated by `padding` on every side
fn inflated_box_style(rect: &ElementRect, padding: f64) -> String {
    format!(
        "position:absolute;top:{}px;left:{}px;width:{}px;height:{}px;",
        rect.top - padding,
        rect.left - padding,
        rect.width + padding * 2.0,
        rect.height + padding * 2.0,
    )
}

/// Clip-path polygon covering the viewport with a rectangular hole over the
/// target, so the highlighted element stays unobscured and clickable
fn cutout_clip_path(rect: &ElementRect) -> String {
    let left = rect.left - HIGHLIGHT_PADDING;
    let top = rect.top - HIGHLIGHT_PADDING;
    let right = rect.right() + HIGHLIGHT_PADDING;
    let bottom = rect.bottom() + HIGHLIGHT_PADDING;
    format!(
        "polygon(0% 0%, 0% 100%, {left}px 100%, {left}px {top}px, {right}px {top}px, \
         {right}px {bottom}px, {left}px {bottom}px, {left}px 100%, 100% 100%, 100% 0%)"
    )
}

/// Progress through the tour, as a percentage of steps entered
fn progress_percent(step_number: usize, total_steps: usize) -> f64 {
    if total_steps == 0 {
        return 0.0;
    }
    (step_number + 1) as f64 / total_steps as f64 * 100.0
}
