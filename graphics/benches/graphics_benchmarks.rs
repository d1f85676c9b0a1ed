use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use lumen_core::math::Mat4;
use lumen_graphics::{
    BindingCache, ComputePipeline, DummyBackend, Extent2d, GpuHandle, GraphicsDevice, PipelineKey,
    PipelineKind, PipelineRegistry, RenderPipeline, RenderState, RenderStateConfig,
    StagingAllocator, StagingConfig, StagingKind, Technique, TextureDescriptor, TextureFormat,
    TextureUsage, VertexBufferSlot,
};

fn create_device() -> Arc<GraphicsDevice> {
    GraphicsDevice::new(Arc::new(DummyBackend::new())).unwrap()
}

fn create_registry() -> PipelineRegistry {
    let mut builder = PipelineRegistry::builder();
    let mut next = 0u64;
    let mut handle = || {
        next += 1;
        GpuHandle::from_raw(next)
    };
    for key in PipelineKey::all() {
        match key.technique.kind() {
            PipelineKind::Render => {
                let pipeline = RenderPipeline::new(key.to_string(), handle(), handle());
                builder.insert_render(key, pipeline).unwrap();
            }
            PipelineKind::Compute => {
                let pipeline = ComputePipeline::new(key.to_string(), handle());
                builder.insert_compute(key.technique, pipeline).unwrap();
            }
        }
    }
    builder.build().unwrap()
}

// ---------------------------------------------------------------------------
// Binding cache
// ---------------------------------------------------------------------------

fn bench_binding_cache_repeats(c: &mut Criterion) {
    let device = create_device();
    let textures: Vec<_> = (0..4)
        .map(|_| {
            device
                .create_texture(&TextureDescriptor::new_2d(
                    16,
                    16,
                    TextureFormat::Rgba8Unorm,
                    TextureUsage::TEXTURE_BINDING,
                ))
                .unwrap()
        })
        .collect();

    c.bench_function("binding_cache_1000_binds_4_textures", |b| {
        b.iter(|| {
            let mut cache = BindingCache::new();
            for i in 0..1000 {
                // Runs of 8 identical binds
                let texture = &textures[(i / 8) % textures.len()];
                black_box(cache.bind_texture(0, texture).unwrap());
            }
            black_box(cache.stats());
        });
    });
}

fn bench_pipeline_lookup(c: &mut Criterion) {
    let registry = create_registry();
    c.bench_function("pipeline_registry_lookup_all_keys", |b| {
        b.iter(|| {
            for key in PipelineKey::all() {
                if key.technique.kind() == PipelineKind::Render {
                    black_box(registry.render(key.technique, key.variant).unwrap());
                }
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Staging allocation
// ---------------------------------------------------------------------------

fn bench_staging_allocate(c: &mut Criterion) {
    let device = create_device();
    let mut staging = StagingAllocator::new(&device, &StagingConfig::default(), 2).unwrap();
    let mut frame = 0u64;

    c.bench_function("staging_allocate_1024_x_64_bytes", |b| {
        b.iter(|| {
            staging.begin_frame((frame % 2) as usize, frame).unwrap();
            for _ in 0..1024 {
                let mut alloc = staging.allocate(StagingKind::Vertex, 64).unwrap();
                alloc.data_mut()[0] = 1;
                black_box(alloc.offset());
            }
            staging.finish_frame();
            frame += 1;
        });
    });
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

fn bench_frame_loop(c: &mut Criterion) {
    let mut state = RenderState::new(
        create_device(),
        create_registry(),
        RenderStateConfig::new(Extent2d::new(640, 480)),
    )
    .unwrap();
    let vertices = [0u8; 96];

    c.bench_function("render_state_frame_256_particle_batches", |b| {
        b.iter(|| {
            state.begin_frame().unwrap();
            state.set_view_projection(&Mat4::identity(), &Mat4::identity());
            state.begin_scene_encoder().unwrap();
            state.flush_uniforms_if_dirty().unwrap();
            for _ in 0..256 {
                let slice = {
                    let mut alloc = state.allocate(StagingKind::Vertex, 96).unwrap();
                    alloc.write(&vertices).unwrap();
                    alloc.into_slice()
                };
                state.bind_technique(Technique::Particle, 0).unwrap();
                state
                    .set_vertex_slice(VertexBufferSlot::VERTEX_START, &slice)
                    .unwrap();
                state.draw(0, 6).unwrap();
            }
            black_box(state.end_frame().unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_binding_cache_repeats,
    bench_pipeline_lookup,
    bench_staging_allocate,
    bench_frame_loop,
);
criterion_main!(benches);
