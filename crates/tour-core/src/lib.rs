//! Core logic for the guided-tour engine
//!
//! This crate contains everything that does not touch the browser: the tour
//! data model, the error taxonomy, the tooltip placement geometry, and the
//! step state machine. The browser-facing crates (`tour-storage`,
//! `tour-web`) build on these types, which keeps the interesting logic
//! testable with a plain `cargo test`.

pub mod errors;
pub mod placement;
pub mod state;
pub mod types;

pub use errors::{TourError, TourResult};
pub use placement::{
    compute_placement, FALLBACK_TOOLTIP_HEIGHT, FALLBACK_TOOLTIP_WIDTH, TOOLTIP_GAP,
    VIEWPORT_MARGIN,
};
pub use state::{CompletionStore, MemoryCompletionStore, TourController, COMPLETION_KEY_PREFIX};
pub use types::{ElementRect, Position, Size, StepAction, TooltipPlacement, TourState, TourStep};
