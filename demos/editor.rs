//! Tile map editor demo
//!
//! Run with:
//!   cargo run --example editor
//!   cargo run --example editor -- --rows 256 --columns 256 --present-mode fifo
//!   cargo run --example editor -- --headless-frames 300
//!
//! Controls:
//!   WASD     - Move camera
//!   Scroll   - Zoom
//!   LMB      - Paint the selected tile type
//!   1-4      - Select tile type
//!   Space    - Toggle tile animation
//!   Escape   - Exit

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use clap::Parser;
use glam::{Vec2, Vec3};
use tile_renderer::{
    backend::dummy::DummyBackend,
    resources::TextureData,
    scene::count_visible,
    window::{self, LoopEvent},
    world::AtlasEntry,
    Camera, EguiOverlay, FrameOutcome, FrameParams, FrameRenderer, GraphicsError, GraphicsResult,
    Map, PresentMode, RenderBackend, RendererConfig, SceneView, Sprite, TextureAtlas, TileData,
    VulkanBackend, Window, World,
};
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

const CAMERA_SPEED: f32 = 12.0;
const ANIMATION_STEP: f32 = 0.25;
const MIN_PIXELS_PER_UNIT: f32 = 4.0;
const MAX_PIXELS_PER_UNIT: f32 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum CliPresentMode {
    Immediate,
    #[default]
    Mailbox,
    Fifo,
    FifoRelaxed,
}

impl From<CliPresentMode> for PresentMode {
    fn from(mode: CliPresentMode) -> Self {
        match mode {
            CliPresentMode::Immediate => PresentMode::Immediate,
            CliPresentMode::Mailbox => PresentMode::Mailbox,
            CliPresentMode::Fifo => PresentMode::Fifo,
            CliPresentMode::FifoRelaxed => PresentMode::FifoRelaxed,
        }
    }
}

/// Tile map editor on the tile renderer.
#[derive(Parser, Debug)]
#[command(name = "editor", about = "Tile map editor demo")]
struct Args {
    /// Map rows
    #[arg(long, default_value = "128")]
    rows: u32,

    /// Map columns
    #[arg(long, default_value = "128")]
    columns: u32,

    /// Number of wandering game objects
    #[arg(long, default_value = "64")]
    objects: u32,

    /// Initial zoom in screen pixels per tile
    #[arg(long, default_value = "32")]
    pixels_per_unit: f32,

    #[arg(long, default_value = "mailbox", value_enum)]
    present_mode: CliPresentMode,

    /// Frames the CPU may run ahead of the GPU
    #[arg(long, default_value = "2")]
    frames_in_flight: usize,

    /// Instance buffer capacity; defaults to every tile plus every object
    #[arg(long)]
    max_instances: Option<usize>,

    /// Enable Vulkan validation layers
    #[arg(long)]
    validation: bool,

    #[arg(long, default_value = "1280")]
    width: u32,

    #[arg(long, default_value = "720")]
    height: u32,

    /// Run this many frames on the simulated device instead of opening a window
    #[arg(long)]
    headless_frames: Option<u32>,
}

impl Args {
    fn config(&self) -> RendererConfig {
        let worst_case = self.rows as usize * self.columns as usize + self.objects as usize;
        RendererConfig::default()
            .with_frames_in_flight(self.frames_in_flight)
            .with_max_instances(self.max_instances.unwrap_or(worst_case).max(1))
            .with_present_mode(self.present_mode.into())
            .with_validation(self.validation)
            .with_clear_color([0.05, 0.05, 0.08, 1.0])
    }
}

/// Map, objects and tile palette being edited.
struct EditorScene {
    map: Map,
    world: World,
    atlas: TextureAtlas,
    palette: Vec<TileData>,
    camera: Camera,
    animation_clock: f32,
    time: f32,
}

/// Procedural 4-frame strip: a 16x16 cell per frame, each a little brighter.
fn animated_strip(base: [u8; 3]) -> TextureData {
    let (frame, frames) = (16u32, 4u32);
    let (width, height) = (frame * frames, frame);
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let shade = (x / frame) as u8 * 24 + if (x + y) % 5 == 0 { 30 } else { 0 };
            pixels.extend_from_slice(&[
                base[0].saturating_add(shade),
                base[1].saturating_add(shade),
                base[2].saturating_add(shade),
                255,
            ]);
        }
    }
    TextureData {
        width,
        height,
        pixels,
        name: "water".to_string(),
    }
}

impl EditorScene {
    fn load<B: RenderBackend>(renderer: &mut FrameRenderer<B>, args: &Args) -> GraphicsResult<Self> {
        let grass = renderer.register_texture(&TextureData::checkerboard(
            32,
            [60, 140, 60, 255],
            [50, 120, 50, 255],
        ))?;
        let water_data = animated_strip([30, 70, 160]);
        let water = renderer.register_texture(&water_data)?;
        let stone =
            renderer.register_texture(&TextureData::solid_color([128, 128, 128, 255], "stone"))?;
        let sand =
            renderer.register_texture(&TextureData::solid_color([200, 180, 120, 255], "sand"))?;
        let unit = renderer.register_texture(&TextureData::checkerboard(
            16,
            [220, 60, 60, 255],
            [250, 240, 240, 255],
        ))?;

        let mut atlas = TextureAtlas::new();
        atlas.insert(
            water,
            AtlasEntry::grid(1, water_data.width, water_data.height, 16, 16),
        );

        let palette = vec![
            TileData::new("grass", grass, 0),
            TileData::new("water", water, 0),
            TileData::new("stone", stone, 0),
            TileData::new("sand", sand, 0),
        ];

        let mut map = Map::new(args.rows, args.columns, 16);
        map.fill(0, &palette[0]);
        // A lake and a road so there is something to look at.
        let (cx, cy) = (args.columns as f32 / 2.0, args.rows as f32 / 2.0);
        let radius = (args.columns.min(args.rows) as f32 / 5.0).max(1.0);
        for row in 0..args.rows {
            for column in 0..args.columns {
                let d = Vec2::new(column as f32 - cx, row as f32 - cy).length();
                if d < radius {
                    map.paint(column, row, 1, &palette[1]);
                } else if d < radius + 1.5 {
                    map.paint(column, row, 3, &palette[3]);
                } else if row == args.rows / 4 {
                    map.paint(column, row, 2, &palette[2]);
                }
            }
        }

        let mut world = World::new();
        for i in 0..args.objects {
            let angle = i as f32 / args.objects.max(1) as f32 * std::f32::consts::TAU;
            let offset = Vec2::new(angle.cos(), angle.sin()) * radius * 1.5;
            world.add_game_object(Vec3::new(cx + offset.x, cy + offset.y, 0.0), Sprite::new(unit));
        }

        let camera = Camera::for_viewport(
            Vec3::new(cx, cy, 0.0),
            (args.width, args.height),
            args.pixels_per_unit,
        );

        log::info!(
            "Loaded {}x{} map with {} objects and {} textures",
            args.columns,
            args.rows,
            world.len(),
            renderer.texture_count()
        );

        Ok(Self {
            map,
            world,
            atlas,
            palette,
            camera,
            animation_clock: 0.0,
            time: 0.0,
        })
    }

    fn view(&self) -> SceneView<'_> {
        SceneView::new(&self.camera)
            .with_map(&self.map)
            .with_world(&self.world)
            .with_atlas(&self.atlas)
    }

    /// Advance animated tiles and move the objects around.
    fn update(&mut self, dt: f32, animate: bool) {
        self.time += dt;

        if animate {
            self.animation_clock += dt;
            while self.animation_clock >= ANIMATION_STEP {
                self.animation_clock -= ANIMATION_STEP;
                for tile in self.map.tiles_mut() {
                    let frames = self.atlas.frame_count(tile.sprite.texture_index);
                    if frames > 1 {
                        let next = (tile.sprite.current_frame as usize + 1) % frames;
                        tile.sprite.current_frame = next as u16;
                    }
                }
            }
        }

        let count = self.world.len();
        for index in 0..count {
            if let Some(object) = self.world.game_object_mut(index) {
                let phase = self.time + index as f32;
                object.position += Vec3::new(phase.cos(), phase.sin(), 0.0) * dt;
            }
        }
    }

    fn paint_at(&mut self, world: Vec2, tile_type: usize) {
        let (column, row) = (world.x.floor() as i64, world.y.floor() as i64);
        if !self.map.is_in_map(column, row) {
            return;
        }
        if let Some(data) = self.palette.get(tile_type) {
            self.map.paint(column as u32, row as u32, tile_type, data);
        }
    }
}

/// Draw one frame, treating instance buffer overflow as a dropped frame.
fn draw<B: RenderBackend>(
    renderer: &mut FrameRenderer<B>,
    scene: &EditorScene,
    params: FrameParams,
    overlay: Option<&mut dyn tile_renderer::OverlayRenderer>,
) -> GraphicsResult<Option<FrameOutcome>> {
    match renderer.draw_frame(&scene.view(), params, overlay) {
        Ok(outcome) => Ok(Some(outcome)),
        Err(GraphicsError::InstanceCapacityExceeded { requested, capacity }) => {
            log::warn!(
                "Dropping frame: {} visible instances, capacity {}",
                requested,
                capacity
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn run_headless(args: &Args, frames: u32) -> GraphicsResult<()> {
    let backend = DummyBackend::new();
    let mut renderer = FrameRenderer::new(backend, args.config(), (args.width, args.height))?;
    let mut scene = EditorScene::load(&mut renderer, args)?;
    let params = FrameParams::new(args.pixels_per_unit);

    let start = Instant::now();
    let mut presented = 0u32;
    for frame in 0..frames {
        // Simulate a resize half-way through.
        if frame == frames / 2 {
            renderer.backend().set_surface_extent(args.width / 2, args.height / 2);
            renderer.resize(args.width / 2, args.height / 2);
        }
        scene.update(1.0 / 60.0, true);
        scene.camera.move_by(Vec3::new(0.05, 0.0, 0.0));
        if draw(&mut renderer, &scene, params, None)? == Some(FrameOutcome::Presented) {
            presented += 1;
        }
    }
    renderer.destroy()?;

    let stats = renderer.backend().stats();
    log::info!(
        "{} of {} frames presented in {:.2?}: {} submissions, {} swapchains, {} violations",
        presented,
        frames,
        start.elapsed(),
        stats.submissions,
        stats.swapchains_created,
        stats.violations
    );
    Ok(())
}

/// Window-side state of the interactive editor.
struct Editor {
    overlay: EguiOverlay,
    renderer: FrameRenderer<VulkanBackend>,
    scene: EditorScene,
    pixels_per_unit: f32,
    selected_tile: usize,
    animate: bool,
    held_keys: HashSet<KeyCode>,
    cursor: Vec2,
    painting: bool,
    last_frame: Instant,
    frame_times: VecDeque<f32>,
    rebuilds: u32,
}

impl Editor {
    fn new(args: &Args, window: &Window) -> GraphicsResult<Self> {
        let config = args.config();
        let backend = VulkanBackend::new(&config, window.window())?;
        let mut renderer = FrameRenderer::new(backend, config, window.dimensions())?;
        let scene = EditorScene::load(&mut renderer, args)?;
        let overlay = EguiOverlay::new(
            renderer.backend(),
            window.window(),
            renderer.swapchain().format(),
            renderer.config().frames_in_flight,
        )?;

        Ok(Self {
            overlay,
            renderer,
            scene,
            pixels_per_unit: args.pixels_per_unit,
            selected_tile: 1,
            animate: true,
            held_keys: HashSet::new(),
            cursor: Vec2::ZERO,
            painting: false,
            last_frame: Instant::now(),
            frame_times: VecDeque::with_capacity(60),
            rebuilds: 0,
        })
    }

    fn fps(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let avg = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    fn on_window_event(&mut self, window: &mut Window, event: &WindowEvent) {
        if let WindowEvent::Resized(_) = event {
            let (width, height) = window.dimensions();
            self.renderer.resize(width, height);
            window.clear_resize_flag();
        }

        if self.overlay.on_window_event(window.window(), event) {
            return;
        }

        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                if event.state == ElementState::Pressed {
                    match code {
                        KeyCode::Escape => window.request_close(),
                        KeyCode::Space if !event.repeat => self.animate = !self.animate,
                        KeyCode::Digit1 => self.selected_tile = 0,
                        KeyCode::Digit2 => self.selected_tile = 1,
                        KeyCode::Digit3 => self.selected_tile = 2,
                        KeyCode::Digit4 => self.selected_tile = 3,
                        _ => {}
                    }
                    self.held_keys.insert(code);
                } else {
                    self.held_keys.remove(&code);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.painting = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                self.pixels_per_unit = (self.pixels_per_unit * 1.1f32.powf(steps))
                    .clamp(MIN_PIXELS_PER_UNIT, MAX_PIXELS_PER_UNIT);
            }
            _ => {}
        }
    }

    fn frame(&mut self, window: &Window) -> GraphicsResult<()> {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        if self.frame_times.len() >= 60 {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(dt);

        let mut direction = Vec3::ZERO;
        for (key, step) in [
            (KeyCode::KeyW, Vec3::NEG_Y),
            (KeyCode::KeyS, Vec3::Y),
            (KeyCode::KeyA, Vec3::NEG_X),
            (KeyCode::KeyD, Vec3::X),
        ] {
            if self.held_keys.contains(&key) {
                direction += step;
            }
        }
        if direction != Vec3::ZERO {
            let speed = CAMERA_SPEED * 32.0 / self.pixels_per_unit;
            self.scene.camera.move_by(direction.normalize() * speed * dt);
        }

        if self.painting {
            let fitted = self
                .scene
                .camera
                .fitted(window.dimensions(), self.pixels_per_unit);
            let world = fitted.screen_to_world(self.cursor, self.pixels_per_unit);
            self.scene.paint_at(world, self.selected_tile);
        }

        self.scene.update(dt, self.animate);
        self.build_ui(window)?;

        let params = FrameParams::new(self.pixels_per_unit);
        let outcome = draw(&mut self.renderer, &self.scene, params, Some(&mut self.overlay))?;
        if outcome == Some(FrameOutcome::SwapchainRebuilt) {
            self.rebuilds += 1;
        }
        Ok(())
    }

    fn build_ui(&mut self, window: &Window) -> GraphicsResult<()> {
        let fps = self.fps();
        let fitted = self
            .scene
            .camera
            .fitted(window.dimensions(), self.pixels_per_unit);
        let visible = count_visible(&self.scene.view(), &fitted);
        let extent = self.renderer.swapchain().extent();
        let present_mode = self.renderer.swapchain().present_mode();
        let textures = self.renderer.texture_count();
        let rebuilds = self.rebuilds;

        let palette: Vec<String> = self.scene.palette.iter().map(|t| t.name.clone()).collect();
        let pixels_per_unit = &mut self.pixels_per_unit;
        let selected_tile = &mut self.selected_tile;
        let animate = &mut self.animate;

        self.overlay.run(window.window(), |ctx| {
            egui::Window::new("Editor")
                .default_pos([10.0, 10.0])
                .show(ctx, |ui| {
                    ui.label(format!("FPS: {:.1}", fps));
                    ui.label(format!("Visible instances: {}", visible));
                    ui.label(format!("Textures: {}", textures));
                    ui.label(format!(
                        "Swapchain: {}x{} {:?}",
                        extent.width, extent.height, present_mode
                    ));
                    ui.label(format!("Swapchain rebuilds: {}", rebuilds));
                    ui.separator();
                    let zoom_range = MIN_PIXELS_PER_UNIT..=MAX_PIXELS_PER_UNIT;
                    ui.add(egui::Slider::new(pixels_per_unit, zoom_range).text("pixels per tile"));
                    ui.checkbox(animate, "Animate tiles");
                    ui.separator();
                    ui.label("Paint with:");
                    for (index, name) in palette.iter().enumerate() {
                        ui.radio_value(selected_tile, index, name.as_str());
                    }
                });
        })
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.overlay.destroy(self.renderer.backend());
    }
}

fn run_windowed(args: Args) -> GraphicsResult<()> {
    window::run(
        "Tile Editor",
        args.width,
        args.height,
        |window| Editor::new(&args, window),
        |editor, window, event| match event {
            LoopEvent::Window(event) => {
                editor.on_window_event(window, event);
                Ok(())
            }
            LoopEvent::Frame => editor.frame(window),
        },
    )
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let result = match args.headless_frames {
        Some(frames) => run_headless(&args, frames),
        None => run_windowed(args),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
