//! Visibility culling and instance packing.

use glam::Vec2;

use crate::error::{GraphicsError, GraphicsResult};
use crate::world::Sprite;

use super::{Camera, Frustum, InstanceData, SceneView, FULL_UV_RECT};

/// Whether the unit footprint `[x, x + 1] x [y, y + 1]` touches the frustum.
///
/// Footprints straddling an edge count as visible.
pub fn is_visible(frustum: &Frustum, x: f32, y: f32) -> bool {
    x + 1.0 >= frustum.x && x <= frustum.to_x && y + 1.0 >= frustum.y && y <= frustum.to_y
}

/// Visible drawables in draw order: tiles first, then game objects.
fn visible_sprites<'a>(
    scene: &'a SceneView<'a>,
    frustum: &'a Frustum,
) -> impl Iterator<Item = (Vec2, &'a Sprite)> + 'a {
    let tiles = scene
        .map
        .into_iter()
        .flat_map(|map| map.tiles())
        .map(|tile| (Vec2::new(tile.column as f32, tile.row as f32), &tile.sprite));
    let objects = scene
        .world
        .into_iter()
        .flat_map(|world| world.game_objects())
        .map(|object| (object.position.truncate(), &object.sprite));

    tiles
        .chain(objects)
        .filter(move |(position, _)| is_visible(frustum, position.x, position.y))
}

/// Number of drawables that survive culling against `camera`.
pub fn count_visible(scene: &SceneView<'_>, camera: &Camera) -> usize {
    visible_sprites(scene, camera.frustum()).count()
}

/// Cull the scene against `camera` and pack the survivors into `out`.
///
/// `out` is cleared first. Fails without touching `out` when more than
/// `capacity` instances are visible, or when a visible sprite names a texture
/// index at or past `texture_count`. Returns the instance count.
pub fn pack_instances(
    scene: &SceneView<'_>,
    camera: &Camera,
    pixels_per_unit: f32,
    capacity: u32,
    texture_count: u32,
    out: &mut Vec<InstanceData>,
) -> GraphicsResult<u32> {
    let frustum = camera.frustum();

    let mut visible = 0usize;
    let mut out_of_range = None;
    for (_, sprite) in visible_sprites(scene, frustum) {
        visible += 1;
        if out_of_range.is_none() && sprite.texture_index >= texture_count {
            out_of_range = Some(sprite.texture_index);
        }
    }
    if visible > capacity as usize {
        return Err(GraphicsError::InstanceCapacityExceeded {
            requested: visible,
            capacity: capacity as usize,
        });
    }
    if let Some(index) = out_of_range {
        return Err(GraphicsError::InvalidParameter(format!(
            "sprite uses texture {} but only {} textures are loaded",
            index, texture_count
        )));
    }

    out.clear();
    out.reserve(visible);
    out.extend(visible_sprites(scene, frustum).map(|(position, sprite)| {
        let uv_rect = scene
            .atlas
            .map_or(FULL_UV_RECT, |atlas| atlas.uv_rect(sprite));
        InstanceData::new(
            camera.model_matrix(position, pixels_per_unit),
            uv_rect,
            sprite.texture_index,
        )
    }));

    log::trace!("Packed {} visible instances", out.len());
    Ok(out.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::CameraArea;
    use crate::world::{Map, World};
    use glam::Vec3;

    fn frustum_10x10() -> Frustum {
        Camera::new(Vec3::new(5.0, 5.0, 0.0), CameraArea::new(10.0, 10.0), 320.0, 320.0)
            .frustum()
            .to_owned()
    }

    #[test]
    fn test_visibility_of_inside_outside_and_straddling() {
        let frustum = frustum_10x10();
        assert!(is_visible(&frustum, 5.0, 5.0));
        assert!(!is_visible(&frustum, 20.0, 20.0));
        assert!(is_visible(&frustum, -0.5, 3.0));
        assert!(is_visible(&frustum, 9.5, 9.5));
        assert!(!is_visible(&frustum, -1.5, 3.0));
        assert!(!is_visible(&frustum, 3.0, 10.5));
    }

    #[test]
    fn test_touching_edge_is_visible() {
        let frustum = frustum_10x10();
        assert!(is_visible(&frustum, -1.0, 0.0));
        assert!(is_visible(&frustum, 10.0, 10.0));
    }

    #[test]
    fn test_tiles_pack_before_objects() {
        let map = Map::new(2, 2, 16);
        let mut world = World::new();
        world.add_game_object(Vec3::new(1.0, 1.0, 0.0), Sprite::new(9));

        let camera = Camera::new(Vec3::new(1.0, 1.0, 0.0), CameraArea::new(4.0, 4.0), 128.0, 128.0);
        let scene = SceneView::new(&camera).with_map(&map).with_world(&world);

        let mut out = Vec::new();
        let count = pack_instances(&scene, &camera, 32.0, 16, 10, &mut out).unwrap();
        assert_eq!(count, 5);
        assert!(out[..4].iter().all(|i| i.texture_index == 0));
        assert_eq!(out[4].texture_index, 9);
        assert_eq!(out[0].uv_rect, FULL_UV_RECT.to_array());
    }

    #[test]
    fn test_capacity_overflow_leaves_output_untouched() {
        let map = Map::new(4, 4, 16);
        let camera = Camera::new(Vec3::new(2.0, 2.0, 0.0), CameraArea::new(8.0, 8.0), 256.0, 256.0);
        let scene = SceneView::new(&camera).with_map(&map);

        let sentinel = InstanceData::new(glam::Mat4::IDENTITY, FULL_UV_RECT, 42);
        let mut out = vec![sentinel];
        let result = pack_instances(&scene, &camera, 32.0, 15, 1, &mut out);

        assert!(matches!(
            result,
            Err(GraphicsError::InstanceCapacityExceeded {
                requested: 16,
                capacity: 15
            })
        ));
        assert_eq!(out, vec![sentinel]);
    }

    #[test]
    fn test_unloaded_texture_index_is_rejected() {
        let map = Map::new(2, 2, 16);
        let mut world = World::new();
        world.add_game_object(Vec3::new(1.0, 1.0, 0.0), Sprite::new(500));

        let camera = Camera::new(Vec3::new(1.0, 1.0, 0.0), CameraArea::new(4.0, 4.0), 128.0, 128.0);
        let scene = SceneView::new(&camera).with_map(&map).with_world(&world);

        let sentinel = InstanceData::new(glam::Mat4::IDENTITY, FULL_UV_RECT, 7);
        let mut out = vec![sentinel];
        let result = pack_instances(&scene, &camera, 32.0, 16, 1, &mut out);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        assert_eq!(out, vec![sentinel]);

        // Tiles alone are fine with one texture, but not with none.
        let tiles_only = SceneView::new(&camera).with_map(&map);
        assert_eq!(pack_instances(&tiles_only, &camera, 32.0, 16, 1, &mut out).unwrap(), 4);
        assert!(pack_instances(&tiles_only, &camera, 32.0, 16, 0, &mut out).is_err());
    }

    #[test]
    fn test_packing_is_deterministic() {
        let map = Map::new(8, 8, 16);
        let camera = Camera::for_viewport(Vec3::new(3.0, 3.0, 0.0), (128, 96), 32.0);
        let scene = SceneView::new(&camera).with_map(&map);

        let mut first = Vec::new();
        let mut second = Vec::new();
        pack_instances(&scene, &camera, 32.0, 64, 1, &mut first).unwrap();
        pack_instances(&scene, &camera, 32.0, 64, 1, &mut second).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
