//! Shared data model for the guided-tour engine
//!
//! These types are plain data with serde derives so step definitions can be
//! supplied from JavaScript (via `serde-wasm-bindgen`) or from JSON config.
//! Geometry is carried in `f64` document coordinates (viewport-relative rect
//! plus the current scroll offsets).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Side effect to run when a step becomes current.
///
/// Actions are fallible; a failed action is logged by the state machine and
/// never blocks the transition.
pub type StepAction = Rc<dyn Fn() -> Result<(), String>>;

/// Logical tooltip placement relative to the highlighted element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    Top,
    TopLeft,
    TopRight,
    #[default]
    Bottom,
    BottomLeft,
    BottomRight,
    Left,
    LeftTop,
    LeftBottom,
    Right,
    RightTop,
    RightBottom,
    /// Centered in the viewport, ignoring the target
    Center,
    /// Best-fit based on available space around the target
    Auto,
}

/// One unit of a tour: a target element, title/content, and display options
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourStep {
    /// Unique id within a tour
    pub id: String,

    /// CSS selector for the element to highlight
    pub target: String,

    pub title: String,
    pub content: String,

    #[serde(default)]
    pub position: Position,

    #[serde(default = "default_true")]
    pub show_next: bool,

    #[serde(default = "default_true")]
    pub show_previous: bool,

    #[serde(default = "default_true")]
    pub show_skip: bool,

    /// Optional side effect to run when this step is shown
    #[serde(skip)]
    pub on_enter: Option<StepAction>,
}

fn default_true() -> bool {
    true
}

impl TourStep {
    pub fn new(
        id: impl Into<String>,
        target: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            target: target.into(),
            title: title.into(),
            content: content.into(),
            position: Position::default(),
            show_next: true,
            show_previous: true,
            show_skip: true,
            on_enter: None,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_on_enter(mut self, action: StepAction) -> Self {
        self.on_enter = Some(action);
        self
    }
}

impl fmt::Debug for TourStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TourStep")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("title", &self.title)
            .field("position", &self.position)
            .field("show_next", &self.show_next)
            .field("show_previous", &self.show_previous)
            .field("show_skip", &self.show_skip)
            .field("on_enter", &self.on_enter.is_some())
            .finish()
    }
}

/// Bounding box of a resolved target element, in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl ElementRect {
    /// Build a rect already expressed in document coordinates
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
            center_x: left + width / 2.0,
            center_y: top + height / 2.0,
        }
    }

    /// Build a rect from a viewport-relative measurement plus scroll offsets
    pub fn from_viewport(
        top: f64,
        left: f64,
        width: f64,
        height: f64,
        scroll_x: f64,
        scroll_y: f64,
    ) -> Self {
        Self::new(top + scroll_y, left + scroll_x, width, height)
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// A zero-sized rect means the element is rendered but not visible
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// Width/height pair for the tooltip or the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Final clamped document coordinates for the tooltip's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TooltipPlacement {
    pub x: f64,
    pub y: f64,
}

impl TooltipPlacement {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Mutable state of one tour instance
#[derive(Debug, Clone, Default)]
pub struct TourState {
    pub is_active: bool,
    pub step_index: usize,
    pub steps: Vec<TourStep>,
    pub tour_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_defaults_from_json() {
        // "##" delimiters: the selector contains a `"#` sequence
        let json = r##"{
            "id": "welcome",
            "target": "#hero",
            "title": "Welcome",
            "content": "This is the hero section."
        }"##;

        let step: TourStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.position, Position::Bottom);
        assert!(step.show_next);
        assert!(step.show_previous);
        assert!(step.show_skip);
        assert!(step.on_enter.is_none());
    }

    #[test]
    fn test_position_kebab_case_names() {
        let pos: Position = serde_json::from_str(r#""top-left""#).unwrap();
        assert_eq!(pos, Position::TopLeft);

        let pos: Position = serde_json::from_str(r#""right-bottom""#).unwrap();
        assert_eq!(pos, Position::RightBottom);

        assert_eq!(serde_json::to_string(&Position::Auto).unwrap(), r#""auto""#);
    }

    #[test]
    fn test_rect_document_coordinates() {
        let rect = ElementRect::from_viewport(100.0, 50.0, 40.0, 20.0, 10.0, 200.0);
        assert_eq!(rect.top, 300.0);
        assert_eq!(rect.left, 60.0);
        assert_eq!(rect.center_x, 80.0);
        assert_eq!(rect.center_y, 310.0);
        assert_eq!(rect.right(), 100.0);
        assert_eq!(rect.bottom(), 320.0);
    }

    #[test]
    fn test_empty_rect() {
        assert!(ElementRect::new(0.0, 0.0, 0.0, 0.0).is_empty());
        assert!(!ElementRect::new(0.0, 0.0, 1.0, 0.0).is_empty());
    }
}
