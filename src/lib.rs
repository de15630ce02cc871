//! Software triangle rasterizer.
//!
//! Meshes go through a model-view / projection / viewport pipeline, get rasterized with a
//! z-buffer and shaded by a two-stage (vertex, fragment) shader. Results are persisted with the
//! truevision raster codec in `image::tga`.

pub mod image;
pub mod math;
pub mod model;
pub mod scene;
