use soft_raster::image::{Color, Format, Image};
use soft_raster::math::{Mat4, Vec3, Vec4};
use soft_raster::model::{FaceVertex, Model};
use soft_raster::scene::raster::{barycentric, to_screen};
use soft_raster::scene::{Camera, DepthBuffer, PhongShader, Scene, Transforms, UniformShader};

const RED: Color = Color::rgb(255, 0, 0);
const BLUE: Color = Color::rgb(0, 0, 255);

fn screen_vertex(x: f64, y: f64, z: f64) -> Vec4 {
    return Vec4::new(x, y, z, 1.0);
}

#[test]
fn flat_triangle_covers_exactly_its_pixels() {
    let (a, b, c) = ((10.0, 10.0), (90.0, 10.0), (50.0, 90.0));
    let mut scene = Scene::new(100, 100);
    let mut shader = UniformShader::new(
        vec![[screen_vertex(a.0, a.1, 0.0), screen_vertex(b.0, b.1, 0.0), screen_vertex(c.0, c.1, 0.0)]],
        RED,
    );
    let faces = shader.face_count();
    let stats = scene.draw_mesh(&mut shader, faces, &Mat4::identity());
    assert_eq!(stats.skipped, 0);

    let mut covered = 0;
    for y in 0..100 {
        for x in 0..100 {
            let bar = barycentric(a, b, c, (x as f64, y as f64)).unwrap();
            let inside = bar.x >= 0.0 && bar.y >= 0.0 && bar.z >= 0.0;
            let expected = if inside { RED } else { Color::rgb(0, 0, 0) };
            assert_eq!(scene.image.get(x, y), expected, "pixel ({}, {})", x, y);
            covered += inside as usize;
        }
    }
    assert_eq!(stats.pixels, covered);
    // Roughly half of the 80 x 80 bounding box.
    assert!(covered > 3000 && covered < 3400, "{}", covered);
}

#[test]
fn later_triangle_wins_only_when_strictly_closer() {
    let base = |z: f64| [screen_vertex(0.0, 0.0, z), screen_vertex(19.0, 0.0, z), screen_vertex(0.0, 19.0, z)];
    for (a_depth, b_depth, winner) in [(1.0, 2.0, BLUE), (2.0, 1.0, RED), (1.5, 1.5, RED)] {
        let mut scene = Scene::new(20, 20);
        let mut first = UniformShader::new(vec![base(a_depth)], RED);
        let mut second = UniformShader::new(vec![base(b_depth)], BLUE);
        scene.draw_mesh(&mut first, 1, &Mat4::identity());
        scene.draw_mesh(&mut second, 1, &Mat4::identity());
        assert_eq!(scene.image.get(3, 3), winner, "a = {}, b = {}", a_depth, b_depth);
    }
}

#[test]
fn intersecting_triangles_split_by_depth() {
    // A is flat at depth 5, B slopes from 0 on the left to 10 on the right.
    let a = [screen_vertex(0.0, 0.0, 5.0), screen_vertex(40.0, 0.0, 5.0), screen_vertex(0.0, 40.0, 5.0)];
    let b = [screen_vertex(0.0, 0.0, 0.0), screen_vertex(40.0, 0.0, 10.0), screen_vertex(0.0, 40.0, 0.0)];
    let mut scene = Scene::new(41, 41);
    scene.draw_mesh(&mut UniformShader::new(vec![a], RED), 1, &Mat4::identity());
    scene.draw_mesh(&mut UniformShader::new(vec![b], BLUE), 1, &Mat4::identity());
    // B's depth at x is x / 4.
    assert_eq!(scene.image.get(10, 2), RED);
    assert_eq!(scene.image.get(20, 2), RED);
    assert_eq!(scene.image.get(30, 2), BLUE);
}

#[test]
fn identity_pipeline_maps_origin_to_center() {
    let transforms = Transforms::identity(100, 100);
    let origin = transforms.projection * (transforms.model_view * Vec4::new(0.0, 0.0, 0.0, 1.0));
    let screen = to_screen(origin, &transforms.viewport).unwrap();
    assert_eq!((screen.x, screen.y), (50.0, 50.0));

    let mut scene = Scene::new(100, 100);
    let tiny = [Vec4::new(-0.02, -0.02, 0.0, 1.0), Vec4::new(0.02, -0.02, 0.0, 1.0), Vec4::new(0.0, 0.02, 0.0, 1.0)];
    let stats = scene.draw_mesh(&mut UniformShader::new(vec![tiny], RED), 1, &transforms.viewport);
    assert!(stats.pixels >= 1);
    assert_eq!(scene.image.get(50, 50), RED);
    assert_eq!(scene.image.get(10, 10), Color::rgb(0, 0, 0));
}

#[test]
fn depth_buffer_only_grows_over_a_frame() {
    let camera = Camera { eye: Vec3::new(1.0, 1.0, 3.0), center: Vec3::zeros(), up: Vec3::y() };
    let transforms = Transforms::for_camera(&camera, 64, 64).unwrap();
    let corner = |position| FaceVertex { position, tex_coord: None, normal: None };
    let model = Model::from_parts(
        vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, -1.0, 0.5),
            Vec3::new(1.0, -1.0, -0.5),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        Vec::new(),
        Vec::new(),
        vec![[corner(0), corner(1), corner(2)], [corner(3), corner(4), corner(5)]],
    )
    .unwrap();

    let mut scene = Scene::new(64, 64);
    let mut shader = PhongShader::new(&model, &transforms, Vec3::new(1.0, 1.0, 1.0)).unwrap();
    let mut previous = scene.depth.clone();
    for face in 0..model.face_count() {
        let clip = [
            soft_raster::scene::Shader::vertex(&mut shader, face, 0),
            soft_raster::scene::Shader::vertex(&mut shader, face, 1),
            soft_raster::scene::Shader::vertex(&mut shader, face, 2),
        ];
        scene.draw_triangle(clip, &transforms.viewport, &shader).unwrap();
        for (before, after) in previous.as_slice().iter().zip(scene.depth.as_slice()) {
            assert!(after >= before);
        }
        previous = scene.depth.clone();
    }
    assert!(scene.depth.as_slice().iter().any(|z| *z != DepthBuffer::EMPTY));
}

#[test]
fn rendered_frame_survives_a_file_round_trip() {
    let mut scene = Scene::new(50, 40);
    let mut shader = UniformShader::new(
        vec![[screen_vertex(3.0, 2.0, 0.0), screen_vertex(45.0, 10.0, 0.0), screen_vertex(20.0, 37.0, 0.0)]],
        Color::rgb(12, 200, 77),
    );
    scene.draw_mesh(&mut shader, 1, &Mat4::identity());

    let path = std::env::temp_dir().join(format!("soft_raster_frame_{}.tga", std::process::id()));
    scene.image.write_tga(&path, &Default::default()).unwrap();
    let read = Image::read_tga(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(read, scene.image);
    assert_eq!(read.format, Format::Rgb);
}
