//! Rasterization of a single triangle.

use crate::image::Image;
use crate::math::{project_point, Mat4, Vec3, Vec4};

use super::buffer::DepthBuffer;
use super::shader::{Fragment, Shader};

/// Triangles whose doubled signed area is at most this fraction of `|b - a| * |c - a|` are
/// treated as degenerate.
const DEGENERATE_EPSILON: f64 = 1e-9;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum RasterError {
    #[error("depth buffer is {depth_width}x{depth_height}, image is {image_width}x{image_height}")]
    BufferMismatch {
        image_width: u32,
        image_height: u32,
        depth_width: u32,
        depth_height: u32,
    },

    #[error("vertex has w == 0 or a non-finite screen position")]
    VertexAtInfinity,

    #[error("triangle has zero area on screen")]
    Degenerate,
}

/// Screen position of a clip space vertex: viewport, then perspective divide.
pub fn to_screen(clip: Vec4, viewport: &Mat4) -> Result<Vec3, RasterError> {
    let screen = project_point(viewport * clip).map_err(|_| RasterError::VertexAtInfinity)?;
    if !(screen.x.is_finite() && screen.y.is_finite() && screen.z.is_finite()) {
        return Err(RasterError::VertexAtInfinity);
    }
    return Ok(screen);
}

/// Precomputed part of the barycentric solve for one screen space triangle.
///
/// With `v0 = b - a`, `v1 = c - a` and `v2 = p - a`, Cramer's rule on
/// `beta * v0 + gamma * v1 = v2` gives `beta = (v2 x v1) / (v0 x v1)` and
/// `gamma = (v0 x v2) / (v0 x v1)`, where `x` is the 2d cross product.
#[derive(Debug, Clone, Copy)]
pub struct Barycentric {
    a: (f64, f64),
    v0: (f64, f64),
    v1: (f64, f64),
    // Twice the signed area of the triangle.
    denominator: f64,
}

fn cross(u: (f64, f64), v: (f64, f64)) -> f64 {
    return u.0 * v.1 - u.1 * v.0;
}

impl Barycentric {
    pub fn new(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Result<Self, RasterError> {
        let v0 = (b.0 - a.0, b.1 - a.1);
        let v1 = (c.0 - a.0, c.1 - a.1);
        let denominator = cross(v0, v1);
        let scale = v0.0.hypot(v0.1) * v1.0.hypot(v1.1);
        if !(denominator.abs() > DEGENERATE_EPSILON * scale) {
            return Err(RasterError::Degenerate);
        }
        return Ok(Self { a, v0, v1, denominator });
    }

    /// Weights (alpha, beta, gamma) of a, b and c at point `p`. They sum to 1.
    pub fn at(&self, p: (f64, f64)) -> Vec3 {
        let v2 = (p.0 - self.a.0, p.1 - self.a.1);
        let beta = cross(v2, self.v1) / self.denominator;
        let gamma = cross(self.v0, v2) / self.denominator;
        return Vec3::new(1.0 - beta - gamma, beta, gamma);
    }
}

/// Barycentric coordinates of `p` with respect to the screen space triangle a, b, c.
pub fn barycentric(a: (f64, f64), b: (f64, f64), c: (f64, f64), p: (f64, f64)) -> Result<Vec3, RasterError> {
    return Ok(Barycentric::new(a, b, c)?.at(p));
}

/// Inclusive pixel range covered by the triangle, clamped to a `width` x `height` image.
/// `None` if the triangle is completely off screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl BoundingBox {
    pub fn of(points: &[Vec3; 3], width: u32, height: u32) -> Option<BoundingBox> {
        if width == 0 || height == 0 {
            return None;
        }
        let (x_lo, x_hi) = min_max(points.map(|p| p.x));
        let (y_lo, y_hi) = min_max(points.map(|p| p.y));
        let (x_lo, x_hi) = (x_lo.floor(), x_hi.ceil());
        let (y_lo, y_hi) = (y_lo.floor(), y_hi.ceil());
        let last_x = width as f64 - 1.0;
        let last_y = height as f64 - 1.0;
        if x_hi < 0.0 || y_hi < 0.0 || x_lo > last_x || y_lo > last_y {
            return None;
        }
        return Some(BoundingBox {
            min_x: x_lo.max(0.0) as i64,
            min_y: y_lo.max(0.0) as i64,
            max_x: x_hi.min(last_x) as i64,
            max_y: y_hi.min(last_y) as i64,
        });
    }
}

fn min_max(values: [f64; 3]) -> (f64, f64) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    return (min, max);
}

/// Rasterizes one triangle given by its clip space vertices.
///
/// Every pixel `(x, y)` of the bounding box is sampled at exactly that point. Pixels with a
/// negative barycentric coordinate are outside. Inside pixels take the depth test; the winner
/// updates the depth buffer first and only then runs the fragment stage, so a discarded fragment
/// still occludes whatever comes later.
///
/// Returns the number of pixels whose color was written.
pub fn rasterize_triangle<S: Shader + ?Sized>(
    clip: [Vec4; 3],
    viewport: &Mat4,
    shader: &S,
    image: &mut Image,
    depth: &mut DepthBuffer,
) -> Result<usize, RasterError> {
    if image.width != depth.width || image.height != depth.height {
        return Err(RasterError::BufferMismatch {
            image_width: image.width,
            image_height: image.height,
            depth_width: depth.width,
            depth_height: depth.height,
        });
    }

    let screen = [
        to_screen(clip[0], viewport)?,
        to_screen(clip[1], viewport)?,
        to_screen(clip[2], viewport)?,
    ];
    let solve = Barycentric::new(
        (screen[0].x, screen[0].y),
        (screen[1].x, screen[1].y),
        (screen[2].x, screen[2].y),
    )?;
    let bbox = match BoundingBox::of(&screen, image.width, image.height) {
        Some(bbox) => bbox,
        None => return Ok(0),
    };

    let mut drawn = 0;
    for y in bbox.min_y..=bbox.max_y {
        for x in bbox.min_x..=bbox.max_x {
            let bar = solve.at((x as f64, y as f64));
            if bar.x < 0.0 || bar.y < 0.0 || bar.z < 0.0 {
                // If any of the coordinates are negative, point is not in the triangle.
                continue;
            }
            let z = bar.x * screen[0].z + bar.y * screen[1].z + bar.z * screen[2].z;
            if !depth.test_and_set(x, y, z) {
                continue;
            }
            if let Fragment::Color(color) = shader.fragment(bar) {
                image.set(x, y, color);
                drawn += 1;
            }
        }
    }
    return Ok(drawn);
}
