use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec3;

use tile_renderer::{
    backend::dummy::DummyBackend,
    scene::{count_visible, pack_instances, InstanceData},
    Camera, FrameParams, FrameRenderer, Map, RendererConfig, SceneView, Sprite, TileData, World,
};

/// Tiles use texture 0, objects texture 1.
const TEXTURES: u32 = 2;

fn map(size: u32) -> Map {
    let mut map = Map::new(size, size, 16);
    map.fill(0, &TileData::new("ground", 0, 0));
    map
}

fn world(count: u32, spread: f32) -> World {
    let mut world = World::new();
    for i in 0..count {
        let t = i as f32 * 0.618;
        world.add_game_object(
            Vec3::new(t.fract() * spread, (t * 0.37).fract() * spread, 0.0),
            Sprite::new(1),
        );
    }
    world
}

// ---------------------------------------------------------------------------
// Culling and packing
// ---------------------------------------------------------------------------

fn bench_cull_large_map(c: &mut Criterion) {
    let map = map(512);
    let camera = Camera::for_viewport(Vec3::new(256.0, 256.0, 0.0), (1920, 1080), 32.0);
    let scene = SceneView::new(&camera).with_map(&map);

    c.bench_function("cull_512x512_map_1080p", |b| {
        b.iter(|| black_box(count_visible(black_box(&scene), &camera)));
    });
}

fn bench_pack_visible_tiles(c: &mut Criterion) {
    let map = map(512);
    let objects = world(2000, 512.0);
    let camera = Camera::for_viewport(Vec3::new(256.0, 256.0, 0.0), (1920, 1080), 32.0);
    let scene = SceneView::new(&camera).with_map(&map).with_world(&objects);
    let mut out: Vec<InstanceData> = Vec::new();

    c.bench_function("pack_512x512_map_2000_objects", |b| {
        b.iter(|| {
            let count =
                pack_instances(&scene, &camera, 32.0, 1 << 20, TEXTURES, &mut out).unwrap();
            black_box(count);
        });
    });
}

fn bench_pack_zoomed_out(c: &mut Criterion) {
    let map = map(256);
    let camera = Camera::for_viewport(Vec3::new(128.0, 128.0, 0.0), (1920, 1080), 4.0);
    let scene = SceneView::new(&camera).with_map(&map);
    let mut out: Vec<InstanceData> = Vec::new();

    c.bench_function("pack_256x256_map_zoomed_out", |b| {
        b.iter(|| {
            let count =
                pack_instances(&scene, &camera, 4.0, 1 << 20, TEXTURES, &mut out).unwrap();
            black_box(count);
        });
    });
}

// ---------------------------------------------------------------------------
// Whole frames on the simulated device
// ---------------------------------------------------------------------------

fn bench_dummy_frame(c: &mut Criterion) {
    let map = map(128);
    let config = RendererConfig::default()
        .with_max_instances(128 * 128)
        .with_validation(false);
    let mut renderer = FrameRenderer::new(DummyBackend::new(), config, (800, 600)).unwrap();
    for _ in 0..TEXTURES {
        renderer.load_texture_rgba(1, 1, &[255, 255, 255, 255]).unwrap();
    }
    let camera = Camera::for_viewport(Vec3::new(64.0, 64.0, 0.0), (800, 600), 16.0);
    let scene = SceneView::new(&camera).with_map(&map);

    c.bench_function("dummy_frame_128x128_map", |b| {
        b.iter(|| {
            let outcome = renderer
                .draw_frame(&scene, FrameParams::new(16.0), None)
                .unwrap();
            black_box(outcome);
        });
    });
}

criterion_group!(
    benches,
    bench_cull_large_map,
    bench_pack_visible_tiles,
    bench_pack_zoomed_out,
    bench_dummy_frame,
);
criterion_main!(benches);
