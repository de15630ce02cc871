//! Triangle mesh with its textures, as consumed by the shaders.
//!
//! Meshes come from wavefront obj files through `obj-rs`. Textures are found next to the mesh by
//! naming convention: `<stem>_diffuse.tga`, `<stem>_nm_tangent.tga` and `<stem>_spec.tga`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use obj::raw::object::Polygon;

use crate::image::{Color, Image, BLACK, TRANSPARENT, WHITE};
use crate::math::{Vec2, Vec3};

pub const DIFFUSE_SUFFIX: &str = "_diffuse.tga";
pub const NORMAL_SUFFIX: &str = "_nm_tangent.tga";
pub const SPECULAR_SUFFIX: &str = "_spec.tga";

/// Statements the obj parser gets to see, everything else is dropped beforehand.
const KEPT_STATEMENTS: [&str; 7] = ["v", "vt", "vn", "f", "o", "g", "s"];

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse obj: {0}")]
    Parse(#[from] obj::ObjError),

    #[error("face {face} refers to {kind} {index}, but there are only {count}")]
    IndexOutOfRange {
        face: usize,
        kind: &'static str,
        index: usize,
        count: usize,
    },
}

/// Indices of one face corner into the position, texture coordinate and normal lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub tex_coord: Option<usize>,
    pub normal: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Model {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    // v already flipped, so v = 0 is the top row of a texture.
    tex_coords: Vec<Vec2>,
    faces: Vec<[FaceVertex; 3]>,
    diffuse_map: Option<Image>,
    normal_map: Option<Image>,
    specular_map: Option<Image>,
}

impl Model {
    /// Builds a model from already flipped texture coordinates, checking every face index.
    pub fn from_parts(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        tex_coords: Vec<Vec2>,
        faces: Vec<[FaceVertex; 3]>,
    ) -> Result<Model, ModelError> {
        for (face, corners) in faces.iter().enumerate() {
            for corner in corners {
                check_index(face, "position", Some(corner.position), positions.len())?;
                check_index(face, "texture coordinate", corner.tex_coord, tex_coords.len())?;
                check_index(face, "normal", corner.normal, normals.len())?;
            }
        }
        return Ok(Model {
            positions,
            normals,
            tex_coords,
            faces,
            diffuse_map: None,
            normal_map: None,
            specular_map: None,
        });
    }

    /// Parses obj text. Polygons are split into triangle fans, texture v is flipped.
    pub fn from_obj<R: io::Read>(mut reader: R) -> Result<Model, ModelError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let (sanitized, dropped) = sanitize_obj(&text);
        if dropped > 0 {
            log::debug!("dropped {} unsupported obj lines", dropped);
        }
        let raw = obj::raw::parse_obj(sanitized.as_bytes())?;

        let positions = raw.positions.iter().map(|p| Vec3::new(p.0 as f64, p.1 as f64, p.2 as f64)).collect();
        let normals = raw.normals.iter().map(|n| Vec3::new(n.0 as f64, n.1 as f64, n.2 as f64)).collect();
        let tex_coords = raw.tex_coords.iter().map(|t| Vec2::new(t.0 as f64, 1.0 - t.1 as f64)).collect();

        let mut faces = Vec::with_capacity(raw.polygons.len());
        for polygon in &raw.polygons {
            let corners: Vec<FaceVertex> = match polygon {
                Polygon::P(p) => p.iter().map(|&position| FaceVertex { position, tex_coord: None, normal: None }).collect(),
                Polygon::PT(pt) => pt
                    .iter()
                    .map(|&(position, t)| FaceVertex { position, tex_coord: Some(t), normal: None })
                    .collect(),
                Polygon::PN(pn) => pn
                    .iter()
                    .map(|&(position, n)| FaceVertex { position, tex_coord: None, normal: Some(n) })
                    .collect(),
                Polygon::PTN(ptn) => ptn
                    .iter()
                    .map(|&(position, t, n)| FaceVertex { position, tex_coord: Some(t), normal: Some(n) })
                    .collect(),
            };
            if corners.len() < 3 {
                log::warn!("dropping face with {} vertices", corners.len());
                continue;
            }
            for i in 1..corners.len() - 1 {
                faces.push([corners[0], corners[i], corners[i + 1]]);
            }
        }

        return Model::from_parts(positions, normals, tex_coords, faces);
    }

    /// Loads the mesh at `path` and whichever of its conventionally named textures exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Model, ModelError> {
        let path = path.as_ref();
        let mut model = Model::from_obj(io::BufReader::new(fs::File::open(path)?))?;
        log::info!(
            "{}: {} vertices, {} faces",
            path.display(),
            model.vertex_count(),
            model.face_count()
        );
        model.diffuse_map = load_texture(path, DIFFUSE_SUFFIX);
        model.normal_map = load_texture(path, NORMAL_SUFFIX);
        model.specular_map = load_texture(path, SPECULAR_SUFFIX);
        return Ok(model);
    }

    pub fn with_diffuse_map(mut self, texture: Image) -> Model {
        self.diffuse_map = Some(texture);
        return self;
    }

    pub fn with_normal_map(mut self, texture: Image) -> Model {
        self.normal_map = Some(texture);
        return self;
    }

    pub fn with_specular_map(mut self, texture: Image) -> Model {
        self.specular_map = Some(texture);
        return self;
    }

    pub fn vertex_count(&self) -> usize {
        return self.positions.len();
    }

    pub fn face_count(&self) -> usize {
        return self.faces.len();
    }

    /// Position of corner `vert` (0, 1 or 2) of face `face`.
    pub fn vertex(&self, face: usize, vert: usize) -> Vec3 {
        return self.positions[self.faces[face][vert].position];
    }

    /// Normal of a face corner, +z if the mesh has none.
    pub fn normal(&self, face: usize, vert: usize) -> Vec3 {
        return match self.faces[face][vert].normal {
            Some(index) => self.normals[index],
            None => Vec3::z(),
        };
    }

    /// Texture coordinate of a face corner, (0, 0) if the mesh has none.
    pub fn tex_coord(&self, face: usize, vert: usize) -> Vec2 {
        return match self.faces[face][vert].tex_coord {
            Some(index) => self.tex_coords[index],
            None => Vec2::zeros(),
        };
    }

    pub fn has_normal_map(&self) -> bool {
        return self.normal_map.is_some();
    }

    /// Diffuse color, white without a diffuse map.
    pub fn sample_diffuse(&self, uv: Vec2) -> Color {
        return match &self.diffuse_map {
            Some(texture) => sample(texture, uv),
            None => WHITE,
        };
    }

    /// Specular color, black without a specular map.
    pub fn sample_specular(&self, uv: Vec2) -> Color {
        return match &self.specular_map {
            Some(texture) => sample(texture, uv),
            None => BLACK,
        };
    }

    /// Normal map direction with every channel mapped from [0, 255] to [-1, 1], +z without a
    /// normal map.
    pub fn sample_normal(&self, uv: Vec2) -> Vec3 {
        let texture = match &self.normal_map {
            Some(texture) => texture,
            None => return Vec3::z(),
        };
        let color = sample(texture, uv);
        let to_unit = |c: u8| c as f64 / 255.0 * 2.0 - 1.0;
        return Vec3::new(to_unit(color.r), to_unit(color.g), to_unit(color.b));
    }
}

fn check_index(face: usize, kind: &'static str, index: Option<usize>, count: usize) -> Result<(), ModelError> {
    return match index {
        Some(index) if index >= count => Err(ModelError::IndexOutOfRange { face, kind, index, count }),
        _ => Ok(()),
    };
}

/// Nearest texel lookup, uv clamped to the texture.
fn sample(texture: &Image, uv: Vec2) -> Color {
    if texture.width == 0 || texture.height == 0 {
        return TRANSPARENT;
    }
    let x = ((uv.x * texture.width as f64) as i64).clamp(0, texture.width as i64 - 1);
    let y = ((uv.y * texture.height as f64) as i64).clamp(0, texture.height as i64 - 1);
    return texture.get(x, y);
}

/// Keeps the statements the parser understands, returns the text and how many lines were dropped.
fn sanitize_obj(text: &str) -> (String, usize) {
    let mut kept = String::with_capacity(text.len());
    let mut dropped = 0;
    for line in text.lines() {
        let trimmed = line.trim();
        let keep = match trimmed.split_whitespace().next() {
            None => true,
            Some(statement) => statement.starts_with('#') || KEPT_STATEMENTS.contains(&statement),
        };
        if keep {
            kept.push_str(trimmed);
            kept.push('\n');
        } else {
            dropped += 1;
        }
    }
    return (kept, dropped);
}

/// Path of a texture belonging to the mesh at `mesh_path`.
pub fn texture_path(mesh_path: &Path, suffix: &str) -> PathBuf {
    let stem = mesh_path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    return mesh_path.with_file_name(format!("{}{}", stem, suffix));
}

fn load_texture(mesh_path: &Path, suffix: &str) -> Option<Image> {
    let path = texture_path(mesh_path, suffix);
    if !path.exists() {
        log::warn!("texture {} not found, using default", path.display());
        return None;
    }
    return match Image::read_tga(&path) {
        Ok(texture) => {
            log::info!("loaded texture {} ({}x{})", path.display(), texture.width, texture.height);
            Some(texture)
        }
        Err(error) => {
            log::warn!("can't read texture {}: {}, using default", path.display(), error);
            None
        }
    };
}
