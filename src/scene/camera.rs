//! 2-D camera in world units

use glam::{Mat4, Vec2, Vec3};

/// Size of the world region the camera shows, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraArea {
    pub width: f32,
    pub height: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraArea {
    pub const DEFAULT_NEAR: f32 = 0.0;
    pub const DEFAULT_FAR: f32 = 10.0;

    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            near: Self::DEFAULT_NEAR,
            far: Self::DEFAULT_FAR,
        }
    }
}

impl Default for CameraArea {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// World-space rectangle centered on the camera position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub to_x: f32,
    pub to_y: f32,
}

impl Frustum {
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Orthographic camera over a pixel framebuffer.
///
/// The projection maps framebuffer pixels (0..extent) to clip space, so
/// sprites are placed in pixels by their model matrix. The frustum is kept
/// in world units and drives culling.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    area: CameraArea,
    extent_width: f32,
    extent_height: f32,
    view_projection: Mat4,
    frustum: Frustum,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, CameraArea::default(), 1.0, 1.0)
    }
}

impl Camera {
    pub fn new(position: Vec3, area: CameraArea, extent_width: f32, extent_height: f32) -> Self {
        let mut camera = Self {
            position,
            area,
            extent_width,
            extent_height,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        camera.update();
        camera
    }

    /// Camera whose visible area is the framebuffer extent divided by
    /// `pixels_per_unit`.
    pub fn for_viewport(position: Vec3, extent: (u32, u32), pixels_per_unit: f32) -> Self {
        let mut camera = Self::new(position, CameraArea::default(), 1.0, 1.0);
        camera.fit_viewport(extent, pixels_per_unit);
        camera
    }

    /// Copy of this camera fitted to `extent` at `pixels_per_unit`.
    pub fn fitted(&self, extent: (u32, u32), pixels_per_unit: f32) -> Self {
        let mut camera = self.clone();
        camera.fit_viewport(extent, pixels_per_unit);
        camera
    }

    fn fit_viewport(&mut self, extent: (u32, u32), pixels_per_unit: f32) {
        let (width, height) = (extent.0 as f32, extent.1 as f32);
        let area = CameraArea {
            width: width / pixels_per_unit,
            height: height / pixels_per_unit,
            ..self.area
        };
        self.resize(area, width, height);
    }

    pub fn resize(&mut self, area: CameraArea, extent_width: f32, extent_height: f32) {
        self.area = area;
        self.extent_width = extent_width;
        self.extent_height = extent_height;
        self.update();
    }

    pub fn move_to(&mut self, position: Vec3) {
        self.position = position;
        self.update();
    }

    pub fn move_by(&mut self, delta: Vec3) {
        self.position += delta;
        self.update();
    }

    pub fn set_visible_area(&mut self, area: CameraArea) {
        self.area = area;
        self.update();
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn visible_area(&self) -> CameraArea {
        self.area
    }

    pub fn extent(&self) -> (f32, f32) {
        (self.extent_width, self.extent_height)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// World position under a framebuffer pixel.
    pub fn screen_to_world(&self, screen: Vec2, pixels_per_unit: f32) -> Vec2 {
        screen / pixels_per_unit + self.frustum.origin()
    }

    /// Model matrix placing a unit quad at `world` in framebuffer pixels.
    pub fn model_matrix(&self, world: Vec2, pixels_per_unit: f32) -> Mat4 {
        let offset = (world - self.frustum.origin()) * pixels_per_unit;
        Mat4::from_translation(offset.extend(0.0))
            * Mat4::from_scale(Vec3::new(pixels_per_unit, pixels_per_unit, 1.0))
    }

    fn update(&mut self) {
        let view = Mat4::look_at_rh(Vec3::Z, Vec3::ZERO, Vec3::Y);
        let projection = Mat4::orthographic_rh(
            0.0,
            self.extent_width,
            0.0,
            self.extent_height,
            self.area.near,
            self.area.far,
        );
        self.view_projection = projection * view;

        let half_width = self.area.width / 2.0;
        let half_height = self.area.height / 2.0;
        self.frustum = Frustum {
            x: self.position.x - half_width,
            y: self.position.y - half_height,
            width: self.area.width,
            height: self.area.height,
            to_x: self.position.x + half_width,
            to_y: self.position.y + half_height,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{} != {}", a, b);
    }

    #[test]
    fn test_frustum_is_centered() {
        let camera = Camera::new(Vec3::new(5.0, 5.0, 0.0), CameraArea::new(10.0, 4.0), 320.0, 128.0);
        let frustum = camera.frustum();
        assert_eq!(frustum.x, 0.0);
        assert_eq!(frustum.y, 3.0);
        assert_eq!(frustum.to_x, 10.0);
        assert_eq!(frustum.to_y, 7.0);
        assert_eq!(frustum.width, 10.0);
        assert_eq!(frustum.height, 4.0);
    }

    #[test]
    fn test_for_viewport_area() {
        let camera = Camera::for_viewport(Vec3::ZERO, (800, 600), 32.0);
        assert_close(camera.visible_area().width, 25.0);
        assert_close(camera.visible_area().height, 18.75);
        assert_eq!(camera.extent(), (800.0, 600.0));
    }

    #[test]
    fn test_move_updates_frustum() {
        let mut camera = Camera::new(Vec3::ZERO, CameraArea::new(2.0, 2.0), 64.0, 64.0);
        camera.move_by(Vec3::new(3.0, -1.0, 0.0));
        assert_eq!(camera.frustum().x, 2.0);
        assert_eq!(camera.frustum().y, -2.0);
        camera.move_to(Vec3::new(10.0, 10.0, 0.0));
        assert_eq!(camera.frustum().to_x, 11.0);
    }

    #[test]
    fn test_view_projection_maps_extent_corners() {
        let camera = Camera::new(Vec3::ZERO, CameraArea::new(4.0, 3.0), 400.0, 300.0);
        let vp = camera.view_projection();

        let top_left = vp * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_close(top_left.x, -1.0);
        assert_close(top_left.y, -1.0);

        let bottom_right = vp * Vec4::new(400.0, 300.0, 0.0, 1.0);
        assert_close(bottom_right.x, 1.0);
        assert_close(bottom_right.y, 1.0);
        assert!((0.0..=1.0).contains(&bottom_right.z));
    }

    #[test]
    fn test_model_matrix_places_tile_in_pixels() {
        let camera = Camera::for_viewport(Vec3::new(10.0, 10.0, 0.0), (640, 480), 32.0);
        let model = camera.model_matrix(Vec2::new(10.0, 10.0), 32.0);

        // Frustum origin is (0, 2.5), so the tile lands at (320, 240).
        let corner = model * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_close(corner.x, 320.0);
        assert_close(corner.y, 240.0);
        let far_corner = model * Vec4::new(1.0, 1.0, 0.0, 1.0);
        assert_close(far_corner.x, 352.0);
        assert_close(far_corner.y, 272.0);
    }

    #[test]
    fn test_screen_to_world_inverts_model_placement() {
        let camera = Camera::for_viewport(Vec3::new(3.0, 4.0, 0.0), (256, 256), 16.0);
        let world = Vec2::new(5.0, 2.0);
        let pixel = camera.model_matrix(world, 16.0) * glam::Vec4::W;
        let back = camera.screen_to_world(Vec2::new(pixel.x, pixel.y), 16.0);
        assert_close(back.x, world.x);
        assert_close(back.y, world.y);
    }

    #[test]
    fn test_fitted_keeps_position() {
        let camera = Camera::for_viewport(Vec3::new(1.0, 2.0, 0.0), (100, 100), 10.0);
        let fitted = camera.fitted((200, 100), 20.0);
        assert_eq!(fitted.position(), camera.position());
        assert_close(fitted.visible_area().width, 10.0);
        assert_close(fitted.visible_area().height, 5.0);
    }
}
