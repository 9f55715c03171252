use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Vec2, Vec3};
use substation_viewport::camera::{CameraPose, PerspectiveCamera, ViewState};
use substation_viewport::core::{FrameBuffer, SurfaceSize};
use substation_viewport::frame::FrameInfo;
use substation_viewport::interaction::pick;
use substation_viewport::math::{Color, AABB};
use substation_viewport::render::{MixinContext, RaycastRenderer, RenderMixin, SceneRenderer, TextureScroll};
use substation_viewport::scene::{Material, NodeKind, SceneGraph, TextureSlot, Transform};
use substation_viewport::tour::camera_flight;
use substation_viewport::tween::{Easing, TweenEngine};

/// Square yard of `count` boxes around the origin, each with its own material
fn equipment_yard(count: usize) -> SceneGraph {
    let mut scene = SceneGraph::new();
    let side = (count as f32).sqrt().ceil() as usize;
    for i in 0..count {
        let material = scene
            .materials
            .add(Material::new(format!("m{i}"), Color::from_hex(0x888888)).with_map(TextureSlot::new(Vec2::ONE)));
        let x = (i % side) as f32 * 6.0 - side as f32 * 3.0;
        let z = (i / side) as f32 * 6.0 - side as f32 * 3.0;
        scene.add_node(
            scene.root(),
            format!("device{i}"),
            NodeKind::Mesh {
                bounds: AABB::from_center_size(Vec3::ZERO, Vec3::splat(4.0)),
                material,
            },
            Transform::from_translation(Vec3::new(x, 2.0, z)),
        );
    }
    scene
}

fn camera(aspect: f32) -> PerspectiveCamera {
    let mut camera = PerspectiveCamera::new(aspect);
    camera.position = Vec3::new(60.0, 45.0, 60.0);
    camera.look_at(Vec3::ZERO);
    camera
}

/// Benchmark: advancing many concurrent camera flights
fn bench_tween_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("tween_update");

    for count in [1usize, 16, 256].iter() {
        let mut engine = TweenEngine::new();
        for i in 0..*count {
            let to = CameraPose::new(Vec3::new(i as f32, 20.0, 30.0), Vec3::ZERO);
            let flight = camera_flight(CameraPose::HOME, to, 1.0e9, Easing::QuadraticInOut).unwrap();
            let id = engine.add(flight);
            engine.start(id, 0.0).unwrap();
        }
        let mut view = ViewState::new(16.0 / 9.0, CameraPose::HOME);
        let mut now = 0.0;

        group.bench_with_input(BenchmarkId::new("flights", count), count, |b, _| {
            b.iter(|| {
                now += 16.0;
                black_box(engine.update(black_box(now), &mut view))
            })
        });
    }

    group.finish();
}

/// Benchmark: pointer picking against a growing number of meshes
fn bench_pick(c: &mut Criterion) {
    let mut group = c.benchmark_group("pick");
    let surface = SurfaceSize::new(1280, 720);
    let camera = camera(surface.aspect());

    for count in [16usize, 256, 1024].iter() {
        let scene = equipment_yard(*count);
        group.bench_with_input(BenchmarkId::new("meshes", count), count, |b, _| {
            b.iter(|| black_box(pick(&scene, &camera, surface, black_box(640.0), black_box(360.0))))
        });
    }

    group.finish();
}

/// Benchmark: one preview frame of the default renderer
fn bench_preview_render(c: &mut Criterion) {
    let scene = equipment_yard(256);
    let camera = camera(16.0 / 9.0);
    let mut renderer = RaycastRenderer::new(Color::BLACK, 0.5, 4);
    let mut frame = FrameBuffer::new(640, 360);

    c.bench_function("preview_render_640x360", |b| {
        b.iter(|| {
            renderer.render(&scene, &camera, &mut frame).unwrap();
            black_box(frame.pixels()[0])
        })
    });
}

/// Benchmark: per-frame texture scrolling over shared materials
fn bench_texture_scroll(c: &mut Criterion) {
    let mut scene = equipment_yard(1024);
    let nodes = scene.traverse(scene.root());
    let mut scroll = TextureScroll::for_nodes(&scene, &nodes);
    let frame = FrameInfo::new(0, 0.0, 1.0 / 60.0);

    c.bench_function("texture_scroll_1024", |b| {
        b.iter(|| {
            let mut ctx = MixinContext {
                scene: &mut scene,
                frame,
            };
            scroll.update(&mut ctx).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_tween_update,
    bench_pick,
    bench_preview_render,
    bench_texture_scroll,
);

criterion_main!(benches);
