pub mod buffer;
pub mod raster;
pub mod shader;
pub mod transform;

pub use buffer::DepthBuffer;
pub use raster::{rasterize_triangle, RasterError};
pub use shader::{FlatShader, Fragment, PhongShader, Shader, UniformShader};
pub use transform::{Camera, Transforms};

use crate::image::{Color, Format, Image};
use crate::math::Mat4;

/// Relative depth spread below which `depth_image` treats all drawn pixels as equally deep.
const FLAT_DEPTH_EPSILON: f64 = 1e-9;

/// What happened during one `draw_mesh` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub faces: usize,
    pub skipped: usize,
    pub pixels: usize,
}

impl std::ops::AddAssign for RenderStats {
    fn add_assign(&mut self, other: RenderStats) {
        self.faces += other.faces;
        self.skipped += other.skipped;
        self.pixels += other.pixels;
    }
}

/// Scene, holding the rendered image and the z-buffer that goes with it.
/// Both keep their contents across draw calls until `clear` is called, so several meshes can be
/// drawn into one frame.
pub struct Scene {
    pub image: Image,
    pub depth: DepthBuffer,
}

impl Scene {
    /// Generates new scene with specified width and height, rgb pixel format.
    pub fn new(width: u32, height: u32) -> Scene {
        return Scene {
            image: Image::new(width, height, Format::Rgb),
            depth: DepthBuffer::new(width, height),
        };
    }

    pub fn width(&self) -> u32 {
        return self.image.width;
    }

    pub fn height(&self) -> u32 {
        return self.image.height;
    }

    /// Sets all rendered pixels to black and clears z-buffer.
    pub fn clear(&mut self) {
        self.image.clear();
        self.depth.clear();
    }

    /// Draws one triangle given in clip space, see `raster::rasterize_triangle`.
    pub fn draw_triangle<S: Shader + ?Sized>(
        &mut self,
        clip: [crate::math::Vec4; 3],
        viewport: &Mat4,
        shader: &S,
    ) -> Result<usize, RasterError> {
        return rasterize_triangle(clip, viewport, shader, &mut self.image, &mut self.depth);
    }

    /// Draws faces `0..face_count` through `shader`. The vertex stage runs for vertex 0, 1 and 2
    /// of a face before any of its pixels are shaded. Faces that can't be rasterized are
    /// skipped and counted, the rest of the mesh is still drawn.
    pub fn draw_mesh<S: Shader + ?Sized>(&mut self, shader: &mut S, face_count: usize, viewport: &Mat4) -> RenderStats {
        let mut stats = RenderStats::default();
        for face in 0..face_count {
            let clip = [shader.vertex(face, 0), shader.vertex(face, 1), shader.vertex(face, 2)];
            stats.faces += 1;
            match self.draw_triangle(clip, viewport, &*shader) {
                Ok(pixels) => stats.pixels += pixels,
                Err(error) => {
                    log::debug!("skipping face {}: {}", face, error);
                    stats.skipped += 1;
                }
            }
        }
        return stats;
    }

    /// Get grayscale image, representing z-buffer values scaled to [0, 255] over the drawn
    /// range. Pixels nothing was drawn to stay black.
    pub fn depth_image(&self) -> Image {
        let drawn = || self.depth.as_slice().iter().cloned().filter(|z| *z != DepthBuffer::EMPTY);
        let z_min = drawn().fold(f64::INFINITY, f64::min);
        let z_max = drawn().fold(f64::NEG_INFINITY, f64::max);
        // Rounding noise on a flat range must not be stretched over the whole gray scale.
        let flat = z_max - z_min <= FLAT_DEPTH_EPSILON * z_max.abs().max(1.0);
        let scale = if flat { 1.0 } else { z_max - z_min };

        let mut image = Image::new(self.width(), self.height(), Format::Grayscale);
        for y in 0..self.height() as i64 {
            for x in 0..self.width() as i64 {
                let z = match self.depth.get(x, y) {
                    Some(z) if z != DepthBuffer::EMPTY => z,
                    _ => continue,
                };
                // Closest drawn pixel is white, farthest is the darkest non-black shade.
                let value = (1.0 + 254.0 * (z - z_min) / scale).round() as u8;
                image.set(x, y, Color::rgb(value, value, value));
            }
        }
        return image;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Vec3, Vec4};
    use std::cell::{Cell, RefCell};

    fn triangle(z: f64) -> [Vec4; 3] {
        return [Vec4::new(1.0, 1.0, z, 1.0), Vec4::new(8.0, 1.0, z, 1.0), Vec4::new(1.0, 8.0, z, 1.0)];
    }

    #[test]
    fn draw_mesh_counts_faces_and_skips() {
        let mut scene = Scene::new(10, 10);
        let degenerate = [Vec4::new(1.0, 1.0, 0.0, 1.0); 3];
        let mut shader = UniformShader::new(vec![triangle(0.0), degenerate], Color::rgb(5, 5, 5));
        let faces = shader.face_count();
        let stats = scene.draw_mesh(&mut shader, faces, &Mat4::identity());
        assert_eq!(stats.faces, 2);
        assert_eq!(stats.skipped, 1);
        assert!(stats.pixels > 0);
        assert_eq!(scene.image.get(2, 2), Color::rgb(5, 5, 5));
    }

    #[test]
    fn depth_image_scales_drawn_range() {
        let mut scene = Scene::new(10, 10);
        let mut shader = UniformShader::new(vec![triangle(2.0)], Color::rgb(5, 5, 5));
        let faces = shader.face_count();
        scene.draw_mesh(&mut shader, faces, &Mat4::identity());
        let depth = scene.depth_image();
        assert_eq!(depth.format, Format::Grayscale);
        assert_eq!(depth.get(2, 2).r, 1);
        assert_eq!(depth.get(9, 9).r, 0);

        scene.clear();
        assert_eq!(scene.image.get(2, 2), Color::rgb(0, 0, 0));
        assert_eq!(scene.depth.get(2, 2), Some(DepthBuffer::EMPTY));
    }

    #[test]
    fn depth_image_spreads_a_real_range() {
        let mut scene = Scene::new(10, 10);
        let sloped = [Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::new(9.0, 0.0, 9.0, 1.0), Vec4::new(0.0, 9.0, 0.0, 1.0)];
        let mut shader = UniformShader::new(vec![sloped], Color::rgb(5, 5, 5));
        let faces = shader.face_count();
        scene.draw_mesh(&mut shader, faces, &Mat4::identity());
        let depth = scene.depth_image();
        assert_eq!(depth.get(0, 0).r, 1);
        assert_eq!(depth.get(9, 0).r, 255);
        assert!(depth.get(4, 0).r > 1 && depth.get(4, 0).r < 255);
    }

    /// Logs every vertex call and checks, on each fragment, that the three vertices of the
    /// current face were the last ones processed, in order.
    struct Recording {
        triangles: Vec<[Vec4; 3]>,
        log: RefCell<Vec<(usize, usize)>>,
        fragments: Cell<usize>,
    }

    impl Shader for Recording {
        fn vertex(&mut self, face: usize, vert: usize) -> Vec4 {
            self.log.borrow_mut().push((face, vert));
            return self.triangles[face][vert];
        }

        fn fragment(&self, _bar: Vec3) -> Fragment {
            let log = self.log.borrow();
            assert!(log.len() >= 3 && log.len() % 3 == 0, "{:?}", log);
            let face = log[log.len() - 1].0;
            assert_eq!(&log[log.len() - 3..], &[(face, 0), (face, 1), (face, 2)]);
            self.fragments.set(self.fragments.get() + 1);
            return Fragment::Color(Color::rgb(1, 1, 1));
        }
    }

    #[test]
    fn vertex_stage_runs_three_times_before_fragments() {
        let mut scene = Scene::new(10, 10);
        let mut shader = Recording {
            triangles: vec![triangle(1.0), triangle(2.0)],
            log: RefCell::new(Vec::new()),
            fragments: Cell::new(0),
        };
        let stats = scene.draw_mesh(&mut shader, 2, &Mat4::identity());
        assert_eq!(stats.skipped, 0);
        assert_eq!(*shader.log.borrow(), vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
        assert_eq!(shader.fragments.get(), stats.pixels);
        assert!(stats.pixels > 0);
    }
}
