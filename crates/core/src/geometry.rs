//! Click hit-testing against normalized answer regions.
//!
//! Case images are rendered with CSS `object-fit: contain`, so the visible
//! picture is letterboxed (top/bottom padding) or pillarboxed (left/right
//! padding) inside its container. A click has to be mapped through that
//! letterbox before it can be compared against the answer rectangles, which
//! are stored as fractions of the natural image size.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A point in either page pixels or normalized image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Natural (intrinsic) pixel size of an image.
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

/// The rendered box of the image element, in the same coordinate space as
/// the click.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// A correct-answer rectangle, all fields normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Display-only hint shown when the answer is revealed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AnswerRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            description: None,
        }
    }

    /// Inclusive containment on all four edges.
    pub fn contains(&self, p: Point) -> bool {
        self.x <= p.x && p.x <= self.x + self.width && self.y <= p.y && p.y <= self.y + self.height
    }
}

/// Where the image content actually sits inside its container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayedImage {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Compute the `object-fit: contain` placement of `natural` inside
/// `container`.
///
/// Returns `None` while either box has a non-positive dimension (image not
/// measured yet).
pub fn displayed_image(natural: Size, container: BoundingBox) -> Option<DisplayedImage> {
    if natural.width <= 0.0
        || natural.height <= 0.0
        || container.width <= 0.0
        || container.height <= 0.0
    {
        return None;
    }

    let image_aspect = natural.width / natural.height;
    let container_aspect = container.width / container.height;

    let displayed = if image_aspect > container_aspect {
        let height = container.width / image_aspect;
        DisplayedImage {
            width: container.width,
            height,
            offset_x: 0.0,
            offset_y: (container.height - height) / 2.0,
        }
    } else {
        let width = container.height * image_aspect;
        DisplayedImage {
            width,
            height: container.height,
            offset_x: (container.width - width) / 2.0,
            offset_y: 0.0,
        }
    };

    if displayed.width <= 0.0 || displayed.height <= 0.0 {
        return None;
    }
    Some(displayed)
}

/// Map a click into normalized image space. No clamping: clicks in the
/// letterbox padding land outside `[0, 1]`.
pub fn normalize_click(click: Point, natural: Size, container: BoundingBox) -> Option<Point> {
    let shown = displayed_image(natural, container)?;
    Some(Point {
        x: (click.x - container.left - shown.offset_x) / shown.width,
        y: (click.y - container.top - shown.offset_y) / shown.height,
    })
}

/// `true` if a normalized point falls in any of `regions`.
pub fn hits_any(point: Point, regions: &[AnswerRegion]) -> bool {
    regions.iter().any(|r| r.contains(point))
}

/// Decide whether a click on the rendered image answers the question.
///
/// An unmeasured image never produces a hit.
pub fn check_answer(
    click: Point,
    regions: &[AnswerRegion],
    natural: Size,
    container: BoundingBox,
) -> bool {
    match normalize_click(click, natural, container) {
        Some(p) => hits_any(p, regions),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: Point, x: f64, y: f64) -> bool {
        (a.x - x).abs() < EPS && (a.y - y).abs() < EPS
    }

    // A 2:1 image inside a square container at (10, 20): letterboxed,
    // displayed 100x50 with 25px of padding above and below.
    fn wide_image() -> (Size, BoundingBox) {
        (Size::new(200.0, 100.0), BoundingBox::new(10.0, 20.0, 100.0, 100.0))
    }

    #[test]
    fn letterbox_placement() {
        let (natural, container) = wide_image();
        let shown = displayed_image(natural, container).unwrap();
        assert_eq!(shown.width, 100.0);
        assert_eq!(shown.height, 50.0);
        assert_eq!(shown.offset_x, 0.0);
        assert_eq!(shown.offset_y, 25.0);
    }

    #[test]
    fn letterbox_corners_map_to_unit_square() {
        let (natural, container) = wide_image();
        let tl = normalize_click(Point::new(10.0, 45.0), natural, container).unwrap();
        let br = normalize_click(Point::new(110.0, 95.0), natural, container).unwrap();
        assert!(close(tl, 0.0, 0.0));
        assert!(close(br, 1.0, 1.0));
    }

    #[test]
    fn letterbox_padding_click_misses_everything() {
        let (natural, container) = wide_image();
        let p = normalize_click(Point::new(60.0, 30.0), natural, container).unwrap();
        assert!(p.y < 0.0);

        // A region covering the whole image still cannot be hit from the padding.
        let whole = [AnswerRegion::new(0.0, 0.0, 1.0, 1.0)];
        assert!(!check_answer(Point::new(60.0, 30.0), &whole, natural, container));
        assert!(!check_answer(Point::new(60.0, 118.0), &whole, natural, container));
        assert!(check_answer(Point::new(60.0, 70.0), &whole, natural, container));
    }

    #[test]
    fn pillarbox_placement_and_corners() {
        // 1:2 portrait image in a 100x100 box: displayed 50x100, 25px each side.
        let natural = Size::new(100.0, 200.0);
        let container = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let shown = displayed_image(natural, container).unwrap();
        assert_eq!(shown.width, 50.0);
        assert_eq!(shown.offset_x, 25.0);
        assert_eq!(shown.offset_y, 0.0);

        let tl = normalize_click(Point::new(25.0, 0.0), natural, container).unwrap();
        let br = normalize_click(Point::new(75.0, 100.0), natural, container).unwrap();
        assert!(close(tl, 0.0, 0.0));
        assert!(close(br, 1.0, 1.0));

        let pad = normalize_click(Point::new(10.0, 50.0), natural, container).unwrap();
        assert!(pad.x < 0.0);
    }

    #[test]
    fn equal_aspect_fills_container() {
        let natural = Size::new(400.0, 300.0);
        let container = BoundingBox::new(0.0, 0.0, 800.0, 600.0);
        let shown = displayed_image(natural, container).unwrap();
        assert_eq!(shown.width, 800.0);
        assert_eq!(shown.height, 600.0);
        assert_eq!(shown.offset_x, 0.0);
        assert_eq!(shown.offset_y, 0.0);
    }

    #[test]
    fn region_containment_is_inclusive() {
        let region = AnswerRegion::new(0.2, 0.3, 0.1, 0.1);
        assert!(region.contains(Point::new(0.25, 0.35)));
        assert!(!region.contains(Point::new(0.31, 0.35)));
        assert!(region.contains(Point::new(0.2 + 0.1, 0.35)));
        assert!(region.contains(Point::new(0.2, 0.3)));
        assert!(!region.contains(Point::new(0.25, 0.41)));
    }

    #[test]
    fn any_region_is_enough() {
        let regions = [
            AnswerRegion::new(0.0, 0.0, 0.1, 0.1),
            AnswerRegion::new(0.8, 0.8, 0.1, 0.1),
        ];
        assert!(hits_any(Point::new(0.85, 0.85), &regions));
        assert!(!hits_any(Point::new(0.5, 0.5), &regions));
        assert!(!hits_any(Point::new(0.5, 0.5), &[]));
    }

    #[test]
    fn unmeasured_image_never_hits() {
        let whole = [AnswerRegion::new(0.0, 0.0, 1.0, 1.0)];
        let container = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert!(!check_answer(Point::new(50.0, 50.0), &whole, Size::new(0.0, 0.0), container));
        assert!(!check_answer(
            Point::new(50.0, 50.0),
            &whole,
            Size::new(100.0, 100.0),
            BoundingBox::new(0.0, 0.0, 0.0, 100.0)
        ));
    }
}
