//! Tooltip placement geometry
//!
//! Pure functions that convert (target rect, requested position, tooltip
//! size, viewport size) into document coordinates for the tooltip's top-left
//! corner. The same code path handles the `auto` best-fit heuristic, the
//! unresolved-target fallback, and the final viewport-margin clamp, so the
//! two fallbacks cannot drift apart.

use crate::types::{ElementRect, Position, Size, TooltipPlacement};

/// Gap between the tooltip and the highlighted element
pub const TOOLTIP_GAP: f64 = 20.0;

/// Minimum distance kept between the tooltip and every viewport edge
pub const VIEWPORT_MARGIN: f64 = 20.0;

/// Tooltip width assumed before the card has been measured
pub const FALLBACK_TOOLTIP_WIDTH: f64 = 320.0;

/// Tooltip height assumed before the card has been measured
pub const FALLBACK_TOOLTIP_HEIGHT: f64 = 200.0;

/// Extra clearance (beyond the tooltip itself) a side must offer before the
/// `auto` heuristic picks it
const AUTO_CLEARANCE: f64 = 40.0;

/// Compute the tooltip position for one frame.
///
/// `target` is `None` when the resolver could not find or measure the
/// element; the tooltip is then centered in the viewport. The result is
/// always clamped to [`VIEWPORT_MARGIN`] from every edge, shifting the box
/// rather than shrinking it.
pub fn compute_placement(
    target: Option<&ElementRect>,
    position: Position,
    tooltip: Size,
    viewport: Size,
) -> TooltipPlacement {
    let tooltip = effective_size(tooltip);
    let raw = match target {
        Some(rect) => place_relative(rect, position, tooltip, viewport),
        None => centered(tooltip, viewport),
    };
    clamp_to_viewport(raw, tooltip, viewport)
}

/// Substitute the fallback dimensions for axes that have not been measured
/// yet (a zero dimension means the card has not been laid out).
fn effective_size(measured: Size) -> Size {
    Size {
        width: if measured.width > 0.0 {
            measured.width
        } else {
            FALLBACK_TOOLTIP_WIDTH
        },
        height: if measured.height > 0.0 {
            measured.height
        } else {
            FALLBACK_TOOLTIP_HEIGHT
        },
    }
}

fn place_relative(
    rect: &ElementRect,
    position: Position,
    tooltip: Size,
    viewport: Size,
) -> TooltipPlacement {
    let Size {
        width: tw,
        height: th,
    } = tooltip;

    let above = rect.top - th - TOOLTIP_GAP;
    let below = rect.bottom() + TOOLTIP_GAP;
    let before = rect.left - tw - TOOLTIP_GAP;
    let after = rect.right() + TOOLTIP_GAP;

    match position {
        Position::Top => TooltipPlacement::new(rect.center_x - tw / 2.0, above),
        Position::TopLeft => TooltipPlacement::new(rect.left, above),
        Position::TopRight => TooltipPlacement::new((rect.right() - tw).max(0.0), above),
        Position::Bottom => TooltipPlacement::new(rect.center_x - tw / 2.0, below),
        Position::BottomLeft => TooltipPlacement::new(rect.left, below),
        Position::BottomRight => TooltipPlacement::new((rect.right() - tw).max(0.0), below),
        Position::Left => TooltipPlacement::new(before, rect.center_y - th / 2.0),
        Position::LeftTop => TooltipPlacement::new(before, rect.top),
        Position::LeftBottom => TooltipPlacement::new(before, (rect.bottom() - th).max(0.0)),
        Position::Right => TooltipPlacement::new(after, rect.center_y - th / 2.0),
        Position::RightTop => TooltipPlacement::new(after, rect.top),
        Position::RightBottom => TooltipPlacement::new(after, (rect.bottom() - th).max(0.0)),
        Position::Center => centered(tooltip, viewport),
        Position::Auto => auto_place(rect, tooltip, viewport),
    }
}

/// Best-fit heuristic: prefer above, then below, then left, then right,
/// falling back to viewport-centered when nothing offers enough clearance.
/// The coordinate on the non-chosen axis is re-centered on the target.
fn auto_place(rect: &ElementRect, tooltip: Size, viewport: Size) -> TooltipPlacement {
    let Size {
        width: tw,
        height: th,
    } = tooltip;

    let space_above = rect.top.max(0.0);
    let space_below = (viewport.height - rect.bottom()).max(0.0);
    let space_left = rect.left.max(0.0);
    let space_right = (viewport.width - rect.right()).max(0.0);

    if space_above > th + AUTO_CLEARANCE {
        TooltipPlacement::new(rect.center_x - tw / 2.0, rect.top - th - TOOLTIP_GAP)
    } else if space_below > th + AUTO_CLEARANCE {
        TooltipPlacement::new(rect.center_x - tw / 2.0, rect.bottom() + TOOLTIP_GAP)
    } else if space_left > tw + AUTO_CLEARANCE {
        TooltipPlacement::new(rect.left - tw - TOOLTIP_GAP, rect.center_y - th / 2.0)
    } else if space_right > tw + AUTO_CLEARANCE {
        TooltipPlacement::new(rect.right() + TOOLTIP_GAP, rect.center_y - th / 2.0)
    } else {
        centered(tooltip, viewport)
    }
}

fn centered(tooltip: Size, viewport: Size) -> TooltipPlacement {
    TooltipPlacement::new(
        (viewport.width / 2.0 - tooltip.width / 2.0).max(0.0),
        (viewport.height / 2.0 - tooltip.height / 2.0).max(0.0),
    )
}

/// Shift the box so it stays [`VIEWPORT_MARGIN`] away from every edge. When
/// the tooltip is wider/taller than the available area, the top-left edge
/// wins and the placement pins to the margin.
fn clamp_to_viewport(placement: TooltipPlacement, tooltip: Size, viewport: Size) -> TooltipPlacement {
    let mut x = placement.x;
    let mut y = placement.y;

    if x < VIEWPORT_MARGIN {
        x = VIEWPORT_MARGIN;
    } else if x + tooltip.width > viewport.width - VIEWPORT_MARGIN {
        x = (viewport.width - tooltip.width - VIEWPORT_MARGIN).max(VIEWPORT_MARGIN);
    }

    if y < VIEWPORT_MARGIN {
        y = VIEWPORT_MARGIN;
    } else if y + tooltip.height > viewport.height - VIEWPORT_MARGIN {
        y = (viewport.height - tooltip.height - VIEWPORT_MARGIN).max(VIEWPORT_MARGIN);
    }

    TooltipPlacement::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ElementRect {
        ElementRect::new(100.0, 100.0, 50.0, 50.0)
    }

    fn tooltip() -> Size {
        Size::new(200.0, 100.0)
    }

    fn viewport() -> Size {
        Size::new(800.0, 600.0)
    }

    fn place(position: Position) -> TooltipPlacement {
        compute_placement(Some(&target()), position, tooltip(), viewport())
    }

    #[test]
    fn test_bottom_placement() {
        // centerX - tw/2 = 125 - 100, targetBottom + gap = 150 + 20
        assert_eq!(place(Position::Bottom), TooltipPlacement::new(25.0, 170.0));
    }

    #[test]
    fn test_center_placement() {
        assert_eq!(place(Position::Center), TooltipPlacement::new(300.0, 250.0));
    }

    #[test]
    fn test_explicit_placements() {
        // top would be y = 100 - 100 - 20 = -20, clamped to the margin
        assert_eq!(place(Position::Top), TooltipPlacement::new(25.0, 20.0));
        assert_eq!(place(Position::TopLeft), TooltipPlacement::new(100.0, 20.0));
        // left + width - tw = 150 - 200 < 0, clamped to 0 then to the margin
        assert_eq!(place(Position::TopRight), TooltipPlacement::new(20.0, 20.0));
        assert_eq!(place(Position::BottomLeft), TooltipPlacement::new(100.0, 170.0));
        assert_eq!(place(Position::BottomRight), TooltipPlacement::new(20.0, 170.0));
        // left - tw - gap = 100 - 220 < margin
        assert_eq!(place(Position::Left), TooltipPlacement::new(20.0, 75.0));
        assert_eq!(place(Position::LeftTop), TooltipPlacement::new(20.0, 100.0));
        assert_eq!(place(Position::LeftBottom), TooltipPlacement::new(20.0, 50.0));
        assert_eq!(place(Position::Right), TooltipPlacement::new(170.0, 75.0));
        assert_eq!(place(Position::RightTop), TooltipPlacement::new(170.0, 100.0));
        assert_eq!(place(Position::RightBottom), TooltipPlacement::new(170.0, 50.0));
    }

    #[test]
    fn test_unresolved_target_centers() {
        let placement = compute_placement(None, Position::Bottom, tooltip(), viewport());
        assert_eq!(placement, TooltipPlacement::new(300.0, 250.0));
    }

    #[test]
    fn test_fallback_size_when_unmeasured() {
        // Unmeasured tooltip uses the 320x200 fallback for the center math
        let placement =
            compute_placement(None, Position::Center, Size::new(0.0, 0.0), viewport());
        assert_eq!(placement, TooltipPlacement::new(240.0, 200.0));
    }

    #[test]
    fn test_auto_prefers_space_above() {
        let rect = ElementRect::new(400.0, 300.0, 50.0, 50.0);
        let placement = compute_placement(Some(&rect), Position::Auto, tooltip(), viewport());
        // re-centered horizontally on the target, placed above
        assert_eq!(placement, TooltipPlacement::new(225.0, 280.0));
    }

    #[test]
    fn test_auto_falls_back_to_below() {
        let rect = ElementRect::new(50.0, 300.0, 50.0, 50.0);
        let placement = compute_placement(Some(&rect), Position::Auto, tooltip(), viewport());
        assert_eq!(placement, TooltipPlacement::new(225.0, 120.0));
    }

    #[test]
    fn test_auto_uses_horizontal_side_when_vertical_is_tight() {
        // Tall target leaves < th + 40 above and below, but plenty to the left
        let rect = ElementRect::new(80.0, 500.0, 60.0, 460.0);
        let placement = compute_placement(Some(&rect), Position::Auto, tooltip(), viewport());
        // left of the target, re-centered vertically
        assert_eq!(placement, TooltipPlacement::new(280.0, 260.0));
    }

    #[test]
    fn test_auto_prefers_left_over_right() {
        let rect = ElementRect::new(80.0, 300.0, 60.0, 460.0);
        let placement = compute_placement(Some(&rect), Position::Auto, tooltip(), viewport());
        assert_eq!(placement, TooltipPlacement::new(80.0, 260.0));
    }

    #[test]
    fn test_auto_centers_when_no_side_fits() {
        let rect = ElementRect::new(60.0, 60.0, 680.0, 480.0);
        let placement = compute_placement(Some(&rect), Position::Auto, tooltip(), viewport());
        assert_eq!(placement, TooltipPlacement::new(300.0, 250.0));
    }

    #[test]
    fn test_auto_is_deterministic() {
        let rect = ElementRect::new(400.0, 300.0, 50.0, 50.0);
        let a = compute_placement(Some(&rect), Position::Auto, tooltip(), viewport());
        let b = compute_placement(Some(&rect), Position::Auto, tooltip(), viewport());
        assert_eq!(a, b);
    }

    #[test]
    fn test_clamp_keeps_tooltip_inside_viewport() {
        let vp = viewport();
        let tt = tooltip();
        let rects = [
            ElementRect::new(-200.0, -200.0, 50.0, 50.0),
            ElementRect::new(0.0, 0.0, 10.0, 10.0),
            ElementRect::new(590.0, 790.0, 50.0, 50.0),
            ElementRect::new(1200.0, 2000.0, 300.0, 300.0),
        ];
        let positions = [
            Position::Top,
            Position::Bottom,
            Position::Left,
            Position::Right,
            Position::TopRight,
            Position::LeftBottom,
            Position::Center,
            Position::Auto,
        ];

        for rect in &rects {
            for &position in &positions {
                let p = compute_placement(Some(rect), position, tt, vp);
                assert!(p.x >= VIEWPORT_MARGIN, "{position:?} {rect:?} -> {p:?}");
                assert!(p.y >= VIEWPORT_MARGIN, "{position:?} {rect:?} -> {p:?}");
                assert!(
                    p.x + tt.width <= vp.width - VIEWPORT_MARGIN,
                    "{position:?} {rect:?} -> {p:?}"
                );
                assert!(
                    p.y + tt.height <= vp.height - VIEWPORT_MARGIN,
                    "{position:?} {rect:?} -> {p:?}"
                );
            }
        }
    }

    #[test]
    fn test_oversized_tooltip_pins_to_margin() {
        let placement = compute_placement(
            Some(&target()),
            Position::Center,
            Size::new(1000.0, 900.0),
            viewport(),
        );
        assert_eq!(placement, TooltipPlacement::new(20.0, 20.0));
    }
}
