//! Programmable part of the pipeline.
//!
//! A shader is driven per triangle: `vertex` is called for vertex 0, 1 and 2 of a face, filling
//! the shader's varyings as a side effect, then `fragment` is called for every covered pixel that
//! passed the depth test. `fragment` only borrows the shader, so it can't carry state from one
//! pixel to the next.

use crate::image::{Color, BLACK};
use crate::math::{embed_point, embed_vector, inverse_transpose, normalized, truncate, MathError, Mat4, Vec2, Vec3, Vec4};
use crate::model::Model;

use super::transform::Transforms;

/// Result of the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    /// Leave the pixel color as it is.
    Discard,
    Color(Color),
}

pub trait Shader {
    /// Clip space position of vertex `vert` (0, 1 or 2) of face `face`.
    fn vertex(&mut self, face: usize, vert: usize) -> Vec4;

    /// Color at barycentric coordinates `bar` of the last triangle passed through `vertex`.
    fn fragment(&self, bar: Vec3) -> Fragment;
}

/// Barycentric interpolation of three per-vertex values.
fn interpolate<T>(values: &[T; 3], bar: Vec3) -> T
where
    T: Copy + std::ops::Mul<f64, Output = T> + std::ops::Add<Output = T>,
{
    return values[0] * bar.x + values[1] * bar.y + values[2] * bar.z;
}

/// Sampled normals shorter than this don't override the interpolated one.
const NORMAL_MAP_EPSILON: f64 = 1e-6;

fn clamp_channel(value: f64) -> u8 {
    return value.clamp(0.0, 255.0) as u8;
}

/// Phong lighting with diffuse, specular and normal maps. Normals from the normal map are used
/// as they are, without rotating them out of tangent space.
pub struct PhongShader<'a> {
    model: &'a Model,
    model_view: Mat4,
    projection: Mat4,
    // Inverse-transpose of model_view, applied to normals.
    normal_matrix: Mat4,
    // View space, unit length, pointing towards the light.
    light_direction: Vec3,
    pub ambient: f64,
    pub shininess: f64,
    varying_uv: [Vec2; 3],
    varying_normal: [Vec3; 3],
    varying_view_position: [Vec3; 3],
}

impl<'a> PhongShader<'a> {
    pub fn new(model: &'a Model, transforms: &Transforms, light_direction: Vec3) -> Result<Self, MathError> {
        let normal_matrix = inverse_transpose(&transforms.model_view)?;
        let light_direction = normalized(&truncate(transforms.model_view * embed_vector(light_direction)))?;
        return Ok(Self {
            model,
            model_view: transforms.model_view,
            projection: transforms.projection,
            normal_matrix,
            light_direction,
            ambient: 0.1,
            shininess: 32.0,
            varying_uv: [Vec2::zeros(); 3],
            varying_normal: [Vec3::zeros(); 3],
            varying_view_position: [Vec3::zeros(); 3],
        });
    }

    /// View space position of vertex `vert` of the last shaded triangle.
    pub fn view_position(&self, vert: usize) -> Vec3 {
        return self.varying_view_position[vert];
    }
}

impl<'a> Shader for PhongShader<'a> {
    fn vertex(&mut self, face: usize, vert: usize) -> Vec4 {
        let view = self.model_view * embed_point(self.model.vertex(face, vert));
        self.varying_view_position[vert] = truncate(view) / view.w;
        self.varying_normal[vert] = truncate(self.normal_matrix * embed_vector(self.model.normal(face, vert)));
        self.varying_uv[vert] = self.model.tex_coord(face, vert);
        return self.projection * view;
    }

    fn fragment(&self, bar: Vec3) -> Fragment {
        let uv = interpolate(&self.varying_uv, bar);
        let mut n = normalized(&interpolate(&self.varying_normal, bar)).unwrap_or_else(|_| Vec3::z());
        if self.model.has_normal_map() {
            let mapped = self.model.sample_normal(uv);
            let norm = mapped.norm();
            if norm > NORMAL_MAP_EPSILON {
                n = mapped / norm;
            }
        }
        let l = self.light_direction;
        let n_dot_l = n.dot(&l);
        let diffuse = n_dot_l.max(0.0);
        // Reflected light direction, compared against the view direction (0, 0, 1).
        let r = n * (2.0 * n_dot_l) - l;
        let specular = r.z.max(0.0).powf(self.shininess);
        let specular_intensity = self.model.sample_specular(uv).r as f64 / 255.0;

        let base = self.model.sample_diffuse(uv);
        let shade = |channel: u8| {
            clamp_channel(channel as f64 * (self.ambient + diffuse) + 255.0 * specular * specular_intensity)
        };
        return Fragment::Color(Color::rgb(shade(base.r), shade(base.g), shade(base.b)));
    }
}

/// One light intensity for the whole face, computed from the view space face normal.
pub struct FlatShader<'a> {
    model: &'a Model,
    model_view: Mat4,
    projection: Mat4,
    light_direction: Vec3,
    pub ambient: f64,
    varying_uv: [Vec2; 3],
    varying_view_position: [Vec3; 3],
    face_intensity: f64,
}

impl<'a> FlatShader<'a> {
    pub fn new(model: &'a Model, transforms: &Transforms, light_direction: Vec3) -> Result<Self, MathError> {
        let light_direction = normalized(&truncate(transforms.model_view * embed_vector(light_direction)))?;
        return Ok(Self {
            model,
            model_view: transforms.model_view,
            projection: transforms.projection,
            light_direction,
            ambient: 0.0,
            varying_uv: [Vec2::zeros(); 3],
            varying_view_position: [Vec3::zeros(); 3],
            face_intensity: 0.0,
        });
    }
}

impl<'a> Shader for FlatShader<'a> {
    fn vertex(&mut self, face: usize, vert: usize) -> Vec4 {
        let view = self.model_view * embed_point(self.model.vertex(face, vert));
        self.varying_view_position[vert] = truncate(view) / view.w;
        self.varying_uv[vert] = self.model.tex_coord(face, vert);
        if vert == 2 {
            let p = &self.varying_view_position;
            self.face_intensity = match normalized(&(p[1] - p[0]).cross(&(p[2] - p[0]))) {
                Ok(face_normal) => face_normal.dot(&self.light_direction).max(0.0),
                Err(_) => 0.0,
            };
        }
        return self.projection * view;
    }

    fn fragment(&self, bar: Vec3) -> Fragment {
        let uv = interpolate(&self.varying_uv, bar);
        let color = self.model.sample_diffuse(uv);
        let t = (self.ambient + self.face_intensity).min(1.0);
        return Fragment::Color(Color::blend(color, BLACK, t));
    }
}

/// Takes clip space triangles as they are and paints them in one color.
/// Face indices passed to `vertex` must be below `face_count()`.
pub struct UniformShader {
    pub triangles: Vec<[Vec4; 3]>,
    pub color: Color,
}

impl UniformShader {
    pub fn new(triangles: Vec<[Vec4; 3]>, color: Color) -> Self {
        return Self { triangles, color };
    }

    pub fn face_count(&self) -> usize {
        return self.triangles.len();
    }
}

impl Shader for UniformShader {
    fn vertex(&mut self, face: usize, vert: usize) -> Vec4 {
        return self.triangles[face][vert];
    }

    fn fragment(&self, _bar: Vec3) -> Fragment {
        return Fragment::Color(self.color);
    }
}
