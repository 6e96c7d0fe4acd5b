//! Sprite pipeline and its descriptor sets
//!
//! One graphics pipeline draws every sprite. Descriptor sets are allocated per
//! frame in flight rather than per object: the global set carries the camera
//! and the texture array, the instance set carries the packed instances.

pub mod descriptors;

use ash::vk;

use crate::backend::{
    DescriptorWrite, GpuBuffer, GpuSampler, GpuTexture, GraphicsPipelineDescriptor, RenderBackend,
};
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::Vertex;

use descriptors::{
    global_bindings, instance_bindings, pool_sizes, CAMERA_BINDING, INSTANCES_BINDING,
    SAMPLER_BINDING, TEXTURES_BINDING,
};

pub const SPRITE_SHADER_WGSL: &str = include_str!("../../shaders/sprite.wgsl");

/// Per-frame buffers the descriptor sets point at.
pub struct FrameBindings<'a> {
    pub camera_buffer: &'a GpuBuffer,
    pub instance_buffer: &'a GpuBuffer,
}

/// Pipeline, layouts, pool and the per-frame descriptor sets.
///
/// Owns raw handles: call [`SpritePipeline::destroy`] once the device is idle.
#[derive(Debug)]
pub struct SpritePipeline {
    global_layout: vk::DescriptorSetLayout,
    instance_layout: vk::DescriptorSetLayout,
    pool: vk::DescriptorPool,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    global_sets: Vec<vk::DescriptorSet>,
    instance_sets: Vec<vk::DescriptorSet>,
    max_textures: u32,
    destroyed: bool,
}

impl SpritePipeline {
    /// Build the pipeline for `color_format` and allocate one global and one
    /// instance set for each entry of `frames`.
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &B,
        color_format: vk::Format,
        max_textures: u32,
        frames: &[FrameBindings<'_>],
        sampler: &GpuSampler,
        textures: &[GpuTexture],
    ) -> GraphicsResult<Self> {
        let frames_in_flight = frames.len() as u32;
        if frames_in_flight == 0 {
            return Err(GraphicsError::InvalidParameter(
                "sprite pipeline needs at least one frame in flight".to_string(),
            ));
        }

        let global_layout = backend.create_descriptor_set_layout(&global_bindings(max_textures))?;
        let instance_layout = backend.create_descriptor_set_layout(&instance_bindings())?;
        let pool = backend.create_descriptor_pool(&pool_sizes(frames_in_flight, max_textures))?;
        let pipeline_layout = backend.create_pipeline_layout(&[global_layout, instance_layout])?;

        let pipeline = backend.create_graphics_pipeline(&GraphicsPipelineDescriptor {
            label: "sprite",
            shader_source: SPRITE_SHADER_WGSL,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            layout: pipeline_layout,
            vertex_stride: Vertex::STRIDE,
            vertex_attributes: &Vertex::ATTRIBUTES,
            color_format,
        })?;

        let mut sprite_pipeline = Self {
            global_layout,
            instance_layout,
            pool,
            pipeline_layout,
            pipeline,
            global_sets: Vec::with_capacity(frames.len()),
            instance_sets: Vec::with_capacity(frames.len()),
            max_textures,
            destroyed: false,
        };

        let allocated = sprite_pipeline
            .allocate_instance_sets(backend, frames)
            .and_then(|()| sprite_pipeline.allocate_global_sets(backend, frames, sampler, textures));
        if let Err(e) = allocated {
            sprite_pipeline.destroy(backend);
            return Err(e);
        }

        log::info!(
            "Created sprite pipeline ({} frames in flight, up to {} textures)",
            frames_in_flight,
            max_textures
        );
        Ok(sprite_pipeline)
    }

    fn allocate_instance_sets<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &B,
        frames: &[FrameBindings<'_>],
    ) -> GraphicsResult<()> {
        for frame in frames {
            let set = backend.allocate_descriptor_set(self.pool, self.instance_layout, None)?;
            backend.write_descriptor(
                set,
                DescriptorWrite::StorageBuffer {
                    binding: INSTANCES_BINDING,
                    buffer: frame.instance_buffer,
                },
            )?;
            self.instance_sets.push(set);
        }
        Ok(())
    }

    fn allocate_global_sets<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &B,
        frames: &[FrameBindings<'_>],
        sampler: &GpuSampler,
        textures: &[GpuTexture],
    ) -> GraphicsResult<()> {
        let texture_count = textures.len() as u32;
        if texture_count > self.max_textures {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} textures exceed the texture array capacity of {}",
                texture_count, self.max_textures
            )));
        }

        for frame in frames {
            let set = backend.allocate_descriptor_set(
                self.pool,
                self.global_layout,
                Some(texture_count),
            )?;
            backend.write_descriptor(
                set,
                DescriptorWrite::UniformBuffer {
                    binding: CAMERA_BINDING,
                    buffer: frame.camera_buffer,
                },
            )?;
            backend.write_descriptor(
                set,
                DescriptorWrite::Sampler {
                    binding: SAMPLER_BINDING,
                    sampler,
                },
            )?;
            backend.write_descriptor(
                set,
                DescriptorWrite::SampledImages {
                    binding: TEXTURES_BINDING,
                    textures,
                },
            )?;
            self.global_sets.push(set);
        }
        Ok(())
    }

    /// Replace every global set with one sized for `textures`.
    ///
    /// The old sets may still be referenced by in-flight frames, so the caller
    /// must wait for the device to go idle first.
    pub fn rebind_textures<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &B,
        frames: &[FrameBindings<'_>],
        sampler: &GpuSampler,
        textures: &[GpuTexture],
    ) -> GraphicsResult<()> {
        if frames.len() != self.global_sets.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "expected bindings for {} frames, got {}",
                self.global_sets.len(),
                frames.len()
            )));
        }
        if textures.len() as u32 > self.max_textures {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} textures exceed the texture array capacity of {}",
                textures.len(),
                self.max_textures
            )));
        }

        let old_sets = std::mem::take(&mut self.global_sets);
        backend.free_descriptor_sets(self.pool, &old_sets)?;
        self.allocate_global_sets(backend, frames, sampler, textures)?;

        log::debug!("Rebound {} textures into global descriptor sets", textures.len());
        Ok(())
    }

    /// Global and instance sets for a frame-in-flight index.
    pub fn descriptor_sets(&self, frame_index: usize) -> GraphicsResult<[vk::DescriptorSet; 2]> {
        match (
            self.global_sets.get(frame_index),
            self.instance_sets.get(frame_index),
        ) {
            (Some(global), Some(instance)) => Ok([*global, *instance]),
            _ => Err(GraphicsError::InvalidParameter(format!(
                "no descriptor sets for frame {}",
                frame_index
            ))),
        }
    }

    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    pub fn max_textures(&self) -> u32 {
        self.max_textures
    }

    /// Destroy every handle. Sets die with their pool.
    pub fn destroy<B: RenderBackend + ?Sized>(&mut self, backend: &B) {
        if self.destroyed {
            return;
        }
        backend.destroy_pipeline(self.pipeline);
        backend.destroy_pipeline_layout(self.pipeline_layout);
        backend.destroy_descriptor_pool(self.pool);
        backend.destroy_descriptor_set_layout(self.instance_layout);
        backend.destroy_descriptor_set_layout(self.global_layout);
        self.global_sets.clear();
        self.instance_sets.clear();
        self.destroyed = true;
    }
}

impl Drop for SpritePipeline {
    fn drop(&mut self) {
        if !self.destroyed {
            log::warn!("SpritePipeline dropped without destroy(); its handles are leaked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::backend::{BufferDescriptor, BufferUsage, MemoryKind, TextureDescriptor};

    struct Fixture {
        backend: DummyBackend,
        cameras: Vec<GpuBuffer>,
        instances: Vec<GpuBuffer>,
        sampler: GpuSampler,
    }

    impl Fixture {
        fn new(frames: usize) -> Self {
            let backend = DummyBackend::new();
            let buffer = |usage, memory| {
                backend
                    .create_buffer(&BufferDescriptor::new(96, usage, memory))
                    .unwrap()
            };
            let cameras = (0..frames)
                .map(|_| buffer(BufferUsage::UNIFORM, MemoryKind::HostVisible))
                .collect();
            let instances = (0..frames)
                .map(|_| {
                    buffer(
                        BufferUsage::STORAGE | BufferUsage::TRANSFER_DST,
                        MemoryKind::DeviceLocal,
                    )
                })
                .collect();
            let sampler = backend.create_sampler("sprites").unwrap();
            Self {
                backend,
                cameras,
                instances,
                sampler,
            }
        }

        fn bindings(&self) -> Vec<FrameBindings<'_>> {
            self.cameras
                .iter()
                .zip(&self.instances)
                .map(|(camera_buffer, instance_buffer)| FrameBindings {
                    camera_buffer,
                    instance_buffer,
                })
                .collect()
        }
    }

    #[test]
    fn test_sets_per_frame() {
        let fx = Fixture::new(2);
        let mut pipeline = SpritePipeline::new(
            &fx.backend,
            vk::Format::B8G8R8A8_UNORM,
            8,
            &fx.bindings(),
            &fx.sampler,
            &[],
        )
        .unwrap();

        let live = fx.backend.live_objects();
        assert_eq!(live.descriptor_sets, 4);
        assert_eq!(live.descriptor_set_layouts, 2);
        assert_eq!(live.pipelines, 1);

        let frame0 = pipeline.descriptor_sets(0).unwrap();
        let frame1 = pipeline.descriptor_sets(1).unwrap();
        assert_ne!(frame0, frame1);
        assert!(pipeline.descriptor_sets(2).is_err());

        pipeline.destroy(&fx.backend);
        let live = fx.backend.live_objects();
        assert_eq!(live.descriptor_sets, 0);
        assert_eq!(live.descriptor_pools, 0);
        assert_eq!(live.pipelines, 0);
        assert_eq!(live.pipeline_layouts, 0);
    }

    #[test]
    fn test_rebind_replaces_global_sets_only() {
        let fx = Fixture::new(2);
        let mut pipeline = SpritePipeline::new(
            &fx.backend,
            vk::Format::B8G8R8A8_UNORM,
            4,
            &fx.bindings(),
            &fx.sampler,
            &[],
        )
        .unwrap();
        let before = pipeline.descriptor_sets(0).unwrap();

        let texture = fx
            .backend
            .create_texture(&TextureDescriptor::rgba8(1, 1), &[255; 4])
            .unwrap();
        pipeline
            .rebind_textures(&fx.backend, &fx.bindings(), &fx.sampler, &[texture])
            .unwrap();

        let after = pipeline.descriptor_sets(0).unwrap();
        assert_ne!(before[0], after[0]);
        assert_eq!(before[1], after[1]);
        assert_eq!(fx.backend.live_objects().descriptor_sets, 4);

        pipeline.destroy(&fx.backend);
    }

    #[test]
    fn test_too_many_textures() {
        let fx = Fixture::new(1);
        let textures: Vec<GpuTexture> = (0..3)
            .map(|_| {
                fx.backend
                    .create_texture(&TextureDescriptor::rgba8(1, 1), &[0; 4])
                    .unwrap()
            })
            .collect();
        let result = SpritePipeline::new(
            &fx.backend,
            vk::Format::B8G8R8A8_UNORM,
            2,
            &fx.bindings(),
            &fx.sampler,
            &textures,
        );
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        assert_eq!(fx.backend.live_objects().pipelines, 0);
        assert_eq!(fx.backend.live_objects().descriptor_sets, 0);
    }
}
