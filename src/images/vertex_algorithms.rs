/*!
Maps pixel rectangles into the coordinate spaces the compositor draws with.

Corner order is fixed for every quad: top-left, bottom-left, bottom-right, top-right.  The
compositor draws the four corners as a triangle fan, so reordering them flips or shears the
output.
*/

/// A point in device or texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned quad in triangle-fan order.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Quad {
    pub top_left: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
    pub top_right: Point,
}

impl Quad {
    /// Builds a quad over the rectangle `(x, y, w, h)`, mapping each coordinate with `map`.
    fn from_rect(x: f32, y: f32, w: f32, h: f32, map: impl Fn(f32, f32) -> Point) -> Self {
        Quad {
            top_left: map(x, y),
            bottom_left: map(x, y + h),
            bottom_right: map(x + w, y + h),
            top_right: map(x + w, y),
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [self.top_left, self.bottom_left, self.bottom_right, self.top_right]
    }

    /// The corners as interleaved `x, y` pairs, ready for a vertex buffer.
    pub fn to_array(&self) -> [f32; 8] {
        bytemuck::cast(*self)
    }

    /// Smallest and largest corner coordinates, as `(min, max)`.
    pub fn bounds(&self) -> (Point, Point) {
        let c = self.corners();
        let fold = |f: fn(f32, f32) -> f32, pick: fn(&Point) -> f32| c.iter().map(pick).reduce(f).unwrap_or(0.0);
        (
            Point::new(fold(f32::min, |p| p.x), fold(f32::min, |p| p.y)),
            Point::new(fold(f32::max, |p| p.x), fold(f32::max, |p| p.y)),
        )
    }
}

/**
Maps the pixel rectangle `(x, y, w, h)` of a `canvas_w` x `canvas_h` canvas into device
coordinates, `2 * (pixel / dimension) - 1` per axis.

```
use planes_and_pixels::images::vertex_algorithms::vertex_quad;

let q = vertex_quad(1920.0, 1080.0, 100.0, 200.0, 600.0, 48.0);
assert!((q.top_left.x - (2.0 * 100.0 / 1920.0 - 1.0)).abs() < 1e-6);
assert!((q.top_left.y - (2.0 * 200.0 / 1080.0 - 1.0)).abs() < 1e-6);
assert!((q.bottom_right.x - (2.0 * 700.0 / 1920.0 - 1.0)).abs() < 1e-6);
```
*/
pub fn vertex_quad(canvas_w: f32, canvas_h: f32, x: f32, y: f32, w: f32, h: f32) -> Quad {
    Quad::from_rect(x, y, w, h, |px, py| {
        Point::new(2.0 * (px / canvas_w) - 1.0, 2.0 * (py / canvas_h) - 1.0)
    })
}

/**
Maps the pixel rectangle `(x, y, w, h)` of a `space_w` x `space_h` texture into texture
coordinates, `pixel / dimension` per axis.

```
use planes_and_pixels::images::vertex_algorithms::{texture_quad, Point};

let q = texture_quad(600.0, 48.0, 0.0, 0.0, 600.0, 48.0);
assert_eq!(q.corners(), [Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(1.0, 1.0), Point::new(1.0, 0.0)]);
```
*/
pub fn texture_quad(space_w: f32, space_h: f32, x: f32, y: f32, w: f32, h: f32) -> Quad {
    Quad::from_rect(x, y, w, h, |px, py| Point::new(px / space_w, py / space_h))
}

/// Destination quad plus one texture quad per sampled surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub position: Quad,
    pub overlay: Quad,
    pub background: Quad,
}

impl Geometry {
    /**
    Places an entire `overlay_w` x `overlay_h` overlay at `(x, y)` on a `canvas_w` x `canvas_h`
    background, sampling the background under the same rectangle.
    */
    pub fn overlay_at(canvas_w: u32, canvas_h: u32, overlay_w: u32, overlay_h: u32, x: u32, y: u32) -> Self {
        let (cw, ch) = (canvas_w as f32, canvas_h as f32);
        let (ow, oh) = (overlay_w as f32, overlay_h as f32);
        let (x, y) = (x as f32, y as f32);
        Geometry {
            position: vertex_quad(cw, ch, x, y, ow, oh),
            overlay: texture_quad(ow, oh, 0.0, 0.0, ow, oh),
            background: texture_quad(cw, ch, x, y, ow, oh),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn vertex_quad_formula() {
        let q = vertex_quad(1920.0, 1080.0, 100.0, 200.0, 600.0, 48.0);
        let expect = |px: f32, py: f32| Point::new(2.0 * (px / 1920.0) - 1.0, 2.0 * (py / 1080.0) - 1.0);
        assert_eq!(q.top_left, expect(100.0, 200.0));
        assert_eq!(q.bottom_left, expect(100.0, 248.0));
        assert_eq!(q.bottom_right, expect(700.0, 248.0));
        assert_eq!(q.top_right, expect(700.0, 200.0));
        assert!(close(q.top_left.x, -0.895833));
        assert!(close(q.top_left.y, -0.629630));
    }

    #[test]
    fn full_canvas_is_unit_square_in_device_space() {
        let q = vertex_quad(64.0, 32.0, 0.0, 0.0, 64.0, 32.0);
        assert_eq!(q.to_array(), [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, -1.0]);
    }

    #[test]
    fn texture_unit_square() {
        let q = texture_quad(600.0, 48.0, 0.0, 0.0, 600.0, 48.0);
        assert_eq!(q.to_array(), [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn overlay_placement() {
        let g = Geometry::overlay_at(1920, 1080, 600, 48, 100, 200);
        assert_eq!(g.position, vertex_quad(1920.0, 1080.0, 100.0, 200.0, 600.0, 48.0));
        assert_eq!(g.overlay, texture_quad(600.0, 48.0, 0.0, 0.0, 600.0, 48.0));
        assert_eq!(g.background, texture_quad(1920.0, 1080.0, 100.0, 200.0, 600.0, 48.0));
        let (min, max) = g.background.bounds();
        assert!(close(min.x, 100.0 / 1920.0) && close(max.y, 248.0 / 1080.0));
    }
}
