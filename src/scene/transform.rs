//! Model-view, projection and viewport transforms.
//!
//! Camera space convention: after `look_at` the look-at center sits at the origin and the eye on
//! the +z axis, so the camera looks down -z and `(0, 0, 1)` points back at it. `perspective` and
//! `viewport` both keep z increasing towards the eye, which is what lets the rasterizer keep the
//! fragment with the greater depth.

use crate::math::{normalized, MathError, Mat4, Vec3};

/// Depth resolution of the viewport transform, z in [-1, 1] goes to [0, DEPTH].
pub const DEPTH: f64 = 255.0;

/// Where the camera is and where it looks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
}

impl Camera {
    pub fn distance(&self) -> f64 {
        return (self.eye - self.center).norm();
    }
}

/// The three pipeline matrices for one render pass. Built once and then only read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transforms {
    pub model_view: Mat4,
    pub projection: Mat4,
    pub viewport: Mat4,
}

impl Transforms {
    /// Full pipeline for a camera rendering into a `width` x `height` frame buffer.
    pub fn for_camera(camera: &Camera, width: u32, height: u32) -> Result<Self, MathError> {
        let distance = camera.distance();
        if distance == 0.0 {
            return Err(MathError::ZeroNorm);
        }
        return Ok(Self {
            model_view: look_at(camera.eye, camera.center, camera.up)?,
            projection: perspective(-1.0 / distance),
            viewport: viewport(0.0, 0.0, width as f64, height as f64),
        });
    }

    /// Identity model-view and projection, viewport covering the whole frame buffer.
    pub fn identity(width: u32, height: u32) -> Self {
        return Self {
            model_view: Mat4::identity(),
            projection: Mat4::identity(),
            viewport: viewport(0.0, 0.0, width as f64, height as f64),
        };
    }
}

/// New coordinate system around the camera: z from the center to the eye, y as close to `up` as
/// possible, translation moving `center` to the origin.
pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Result<Mat4, MathError> {
    let z = normalized(&(eye - center))?;
    let x = normalized(&up.cross(&z))?;
    let y = normalized(&z.cross(&x))?;
    let basis = Mat4::new(
        x.x, x.y, x.z, 0.0,
        y.x, y.y, y.z, 0.0,
        z.x, z.y, z.z, 0.0,
        0.0, 0.0, 0.0, 1.0,
    );
    let translation = Mat4::new(
        1.0, 0.0, 0.0, -center.x,
        0.0, 1.0, 0.0, -center.y,
        0.0, 0.0, 1.0, -center.z,
        0.0, 0.0, 0.0, 1.0,
    );
    return Ok(basis * translation);
}

/// Simple central projection. `coeff` is usually `-1 / distance to the camera`, 0 gives an
/// orthographic projection.
pub fn perspective(coeff: f64) -> Mat4 {
    let mut projection = Mat4::identity();
    projection[(3, 2)] = coeff;
    return projection;
}

/// Maps [-1, 1]^2 onto the `w` x `h` rectangle at (`x`, `y`) and z onto [0, DEPTH].
pub fn viewport(x: f64, y: f64, w: f64, h: f64) -> Mat4 {
    return Mat4::new(
        w / 2.0, 0.0,     0.0,           x + w / 2.0,
        0.0,     h / 2.0, 0.0,           y + h / 2.0,
        0.0,     0.0,     DEPTH / 2.0,   DEPTH / 2.0,
        0.0,     0.0,     0.0,           1.0,
    );
}
