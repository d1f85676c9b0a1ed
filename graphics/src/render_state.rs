//! The per-frame render state.
//!
//! [`RenderState`] owns everything that decides which GPU commands are issued
//! for a drawn primitive: the pipeline catalog, the frame synchronizer, the
//! staging rings, the command buffer lifecycle, the binding cache and the
//! global uniforms. It is an explicitly owned context object; independent
//! instances can coexist.
//!
//! # Frame Flow
//!
//! ```text
//! begin_frame ─► begin_encoder ─► [flush uniforms, allocate, bind, draw]* ─► end_frame
//!     │               │                                                          │
//!  wait slot,     cache empty,                                         end encoder, close,
//!  reset rings,   viewport                                             upload staging,
//!  open buffer                                                         submit, advance slot
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut state = RenderState::new(device, registry, RenderStateConfig::default())?;
//!
//! loop {
//!     state.begin_frame()?;
//!     state.set_view_projection(&projection, &view);
//!     state.begin_scene_encoder()?;
//!     state.flush_uniforms_if_dirty()?;
//!
//!     let vertices = {
//!         let mut alloc = state.allocate(StagingKind::Vertex, bytes.len() as u64)?;
//!         alloc.write(&bytes)?;
//!         alloc.into_slice()
//!     };
//!     state.bind_technique(Technique::Particle, 0)?;
//!     state.set_vertex_slice(VertexBufferSlot::VERTEX_START, &vertices)?;
//!     state.draw(0, vertex_count)?;
//!
//!     let fence = state.end_frame()?;
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use lumen_core::math::Mat4;
use lumen_core::profiling::{frame_mark, profile_plot, profile_scope};

use crate::binding::{BindingCache, VertexBufferSlot};
use crate::command::{
    BufferCopyRegion, CommandEncoderLifecycle, EncoderDescriptor, EncoderKind, GpuCommand,
    RenderPassDescriptor, TriangleFillMode,
};
use crate::config::RenderStateConfig;
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::frame::{FRAMES_IN_FLIGHT, Fence, FrameInfo, FrameSynchronizer};
use crate::pipeline::{ComputePipeline, PipelineRegistry, RenderPipeline, Technique};
use crate::resources::{
    Buffer, BufferSlice, FAN_INDEX_BUFFER_VERTICES, MeshPrivateData, Sampler, SamplerSet,
    StagingAllocator, StagingKind, Texture, TexturePrivateData, TransientAllocation,
    create_fan_index_buffer, fan_index_count,
};
use crate::types::{Extent2d, IndexFormat, SamplerKind, TextureDescriptor, Viewport};
use crate::uniforms::GlobalUniforms;

/// Per-slot color targets and the shared depth target.
struct RenderTargets {
    color: Vec<Arc<Texture>>,
    depth: Arc<Texture>,
}

impl RenderTargets {
    fn new(device: &Arc<GraphicsDevice>, config: &RenderStateConfig) -> Result<Self, GraphicsError> {
        let color = (0..FRAMES_IN_FLIGHT)
            .map(|slot| {
                device.create_texture(
                    &TextureDescriptor::render_target(config.extent, config.color_format)
                        .with_label(format!("color_buffer_{slot}")),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let depth = device.create_texture(
            &TextureDescriptor::render_target(config.extent, config.depth_format)
                .with_label("depth_buffer"),
        )?;

        log::debug!(
            "Created render targets {}x{} ({:?} / {:?})",
            config.extent.width,
            config.extent.height,
            config.color_format,
            config.depth_format
        );

        Ok(Self { color, depth })
    }
}

/// Render state of one rendering context.
pub struct RenderState {
    device: Arc<GraphicsDevice>,
    config: RenderStateConfig,
    pipelines: PipelineRegistry,
    samplers: SamplerSet,
    staging: StagingAllocator,
    frames: FrameSynchronizer,
    commands: CommandEncoderLifecycle,
    bindings: BindingCache,
    uniforms: GlobalUniforms,
    targets: RenderTargets,
    fan_index_buffer: Arc<Buffer>,
    scene_viewport: Viewport,
    fill_mode: TriangleFillMode,
    current_frame: Option<FrameInfo>,
}

impl RenderState {
    /// Create the render state: samplers, staging rings, render targets and
    /// the fan index buffer.
    pub fn new(
        device: Arc<GraphicsDevice>,
        pipelines: PipelineRegistry,
        config: RenderStateConfig,
    ) -> Result<Self, GraphicsError> {
        if config.extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "render state extent cannot be zero".to_string(),
            ));
        }

        let samplers = SamplerSet::new(&device, config.anisotropy)?;
        let staging = StagingAllocator::new(&device, &config.staging, FRAMES_IN_FLIGHT)?;
        let targets = RenderTargets::new(&device, &config)?;
        let fan_index_buffer = create_fan_index_buffer(&device)?;

        log::info!(
            "RenderState created on {} ({}x{}, {} pipelines)",
            device.name(),
            config.extent.width,
            config.extent.height,
            pipelines.len()
        );

        Ok(Self {
            scene_viewport: Viewport::from_extent(config.extent),
            device,
            config,
            pipelines,
            samplers,
            staging,
            frames: FrameSynchronizer::new(FRAMES_IN_FLIGHT),
            commands: CommandEncoderLifecycle::new(),
            bindings: BindingCache::new(),
            uniforms: GlobalUniforms::new(),
            targets,
            fan_index_buffer,
            fill_mode: TriangleFillMode::Fill,
            current_frame: None,
        })
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Begin a frame.
    ///
    /// Blocks until the slot about to be reused has retired, then resets the
    /// slot's staging rings, opens the frame's command buffer and marks the
    /// uniforms dirty.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::DeviceLost`] once the device is lost.
    /// [`GraphicsError::CommandBufferCreation`] if the command buffer cannot
    /// be created; the frame is aborted.
    pub fn begin_frame(&mut self) -> Result<FrameInfo, GraphicsError> {
        profile_scope!("begin_frame");
        self.check_device()?;
        let info = self.frames.begin_frame()?;
        self.start_frame(info)
    }

    /// Like [`begin_frame`](Self::begin_frame), but gives up after `timeout`
    /// and returns `Ok(None)` without starting a frame.
    pub fn begin_frame_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<FrameInfo>, GraphicsError> {
        self.check_device()?;
        match self.frames.begin_frame_timeout(timeout)? {
            Some(info) => self.start_frame(info).map(Some),
            None => Ok(None),
        }
    }

    fn check_device(&self) -> Result<(), GraphicsError> {
        if self.device.is_lost() {
            self.frames.mark_lost();
            return Err(GraphicsError::DeviceLost);
        }
        Ok(())
    }

    fn start_frame(&mut self, info: FrameInfo) -> Result<FrameInfo, GraphicsError> {
        if let Err(e) = self.staging.begin_frame(info.slot, info.index) {
            self.abort_frame();
            return Err(e);
        }

        let label = format!("frame_{}", info.index);
        if let Err(e) = self
            .commands
            .open(self.device.backend().as_ref(), &label, info.index)
        {
            log::error!("Frame {} aborted: {}", info.index, e);
            self.abort_frame();
            return Err(e);
        }

        self.uniforms.invalidate();
        self.current_frame = Some(info);
        Ok(info)
    }

    /// End the frame: close the open encoder and the command buffer, upload
    /// staging data and submit.
    ///
    /// Returns the fence signaled when the GPU retires the frame. On failure
    /// the frame is aborted and the error returned.
    pub fn end_frame(&mut self) -> Result<Fence, GraphicsError> {
        profile_scope!("end_frame");
        let Some(info) = self.current_frame else {
            return Err(GraphicsError::InvalidState(
                "end_frame called without begin_frame".to_string(),
            ));
        };

        let fence = match self.submit_frame() {
            Ok(fence) => fence,
            Err(e) => {
                if e == GraphicsError::DeviceLost {
                    self.frames.mark_lost();
                }
                self.abort_frame();
                return Err(e);
            }
        };
        self.frames.end_frame(fence.clone())?;

        profile_plot!(
            "staging_vertex_bytes",
            self.staging.used(StagingKind::Vertex)
        );
        profile_plot!("staging_index_bytes", self.staging.used(StagingKind::Index));
        profile_plot!(
            "staging_uniform_bytes",
            self.staging.used(StagingKind::Uniform)
        );

        self.staging.finish_frame();
        self.current_frame = None;
        log::trace!("Frame {} submitted", info.index);
        frame_mark!();

        Ok(fence)
    }

    fn submit_frame(&mut self) -> Result<Fence, GraphicsError> {
        if self.commands.active_encoder().is_some() {
            self.end_encoder()?;
        }
        self.commands.close()?;
        self.staging.flush()?;

        let fence = Fence::new_unsignaled();
        let on_complete = self.frames.completion_callback(&fence);
        self.commands
            .submit(self.device.backend().as_ref(), on_complete)?;
        Ok(fence)
    }

    /// Drop the frame being recorded and give its slot back.
    fn abort_frame(&mut self) {
        self.commands.abandon();
        if !self.bindings.is_empty() {
            self.bindings.reset();
        }
        self.staging.finish_frame();
        self.frames.abort_frame();
        self.current_frame = None;
    }

    /// Block until every submitted frame has retired.
    pub fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.frames.wait_idle()
    }

    /// Recreate the render targets for a new surface size.
    ///
    /// Waits for the GPU first. Must be called between frames.
    pub fn resize(&mut self, extent: Extent2d) -> Result<(), GraphicsError> {
        if self.current_frame.is_some() {
            return Err(GraphicsError::InvalidState(
                "resize called during a frame".to_string(),
            ));
        }
        if extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "render state extent cannot be zero".to_string(),
            ));
        }
        if extent == self.config.extent {
            return Ok(());
        }

        self.wait_idle()?;
        self.config.extent = extent;
        self.targets = RenderTargets::new(&self.device, &self.config)?;
        self.scene_viewport = Viewport::from_extent(extent);
        log::debug!("Resized to {}x{}", extent.width, extent.height);
        Ok(())
    }

    // ========================================================================
    // Encoders
    // ========================================================================

    /// Open an encoder scope.
    ///
    /// A render encoder starts with the viewport set: the scene viewport when
    /// it targets the frame color buffer, the full target otherwise. A
    /// non-solid fill mode is applied as well.
    pub fn begin_encoder(&mut self, descriptor: &EncoderDescriptor) -> Result<(), GraphicsError> {
        self.commands.begin_encoder(descriptor)?;
        self.uniforms.encoder_changed();

        if let EncoderDescriptor::Render(pass) = descriptor {
            let viewport = if self.is_frame_color_buffer(&pass.color_target) {
                self.scene_viewport
            } else {
                Viewport::from_extent(pass.color_target.size())
            };
            self.encode(GpuCommand::SetViewport(viewport))?;
            if self.fill_mode != TriangleFillMode::Fill {
                self.encode(GpuCommand::SetTriangleFillMode(self.fill_mode))?;
            }
        }
        Ok(())
    }

    /// Open a render encoder on the frame color and depth buffers, clearing both.
    pub fn begin_scene_encoder(&mut self) -> Result<(), GraphicsError> {
        let color = Arc::clone(self.color_buffer()?);
        let descriptor = RenderPassDescriptor::new("scene", color)
            .with_depth_target(Arc::clone(&self.targets.depth))
            .with_clear_color(self.config.clear_color)
            .with_clear_depth(1.0);
        self.begin_encoder(&descriptor.into())
    }

    /// Make sure an encoder of the descriptor's kind is open.
    ///
    /// An open encoder of the same kind is kept as is, bindings included.
    /// Otherwise the open encoder, if any, is ended first.
    pub fn switch_encoder(&mut self, descriptor: &EncoderDescriptor) -> Result<(), GraphicsError> {
        match self.commands.active_encoder() {
            Some(kind) if kind == descriptor.kind() => Ok(()),
            Some(_) => {
                self.end_encoder()?;
                self.begin_encoder(descriptor)
            }
            None => self.begin_encoder(descriptor),
        }
    }

    /// Close the open encoder scope. The binding cache is cleared.
    pub fn end_encoder(&mut self) -> Result<EncoderKind, GraphicsError> {
        let kind = self.commands.end_encoder()?;
        self.bindings.reset();
        Ok(kind)
    }

    fn is_frame_color_buffer(&self, texture: &Arc<Texture>) -> bool {
        self.current_frame
            .and_then(|info| self.targets.color.get(info.slot))
            .is_some_and(|color| Arc::ptr_eq(color, texture))
    }

    fn encode(&mut self, command: GpuCommand) -> Result<(), GraphicsError> {
        if self.config.validation {
            log::trace!("encode {:?}", command);
        }
        self.commands.encode(command)
    }

    // ========================================================================
    // Transient Memory
    // ========================================================================

    /// Allocate `size` bytes of transient `kind` memory for this frame.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::OutOfStagingMemory`] when the frame's budget for
    /// `kind` is exhausted. The caller may drop the current batch.
    pub fn allocate(
        &mut self,
        kind: StagingKind,
        size: u64,
    ) -> Result<TransientAllocation<'_>, GraphicsError> {
        self.staging.allocate(kind, size)
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Bind a render pipeline. Encoded only if it differs from the bound one.
    pub fn bind_pipeline(&mut self, pipeline: &Arc<RenderPipeline>) -> Result<(), GraphicsError> {
        self.commands
            .require_encoder("bind_pipeline", &[EncoderKind::Render])?;
        if self.bindings.bind_render_pipeline(pipeline) {
            self.encode(GpuCommand::SetRenderPipeline {
                state: pipeline.state(),
                depth_state: pipeline.depth_state(),
            })?;
        }
        Ok(())
    }

    /// Bind the catalog pipeline for `technique` and `variant`.
    pub fn bind_technique(&mut self, technique: Technique, variant: u8) -> Result<(), GraphicsError> {
        let pipeline = Arc::clone(self.pipelines.render(technique, variant)?);
        self.bind_pipeline(&pipeline)
    }

    /// Bind the catalog compute pipeline for `technique`.
    pub fn bind_compute_pipeline(&mut self, technique: Technique) -> Result<(), GraphicsError> {
        let pipeline: Arc<ComputePipeline> = Arc::clone(self.pipelines.compute(technique)?);
        self.commands
            .require_encoder("bind_compute_pipeline", &[EncoderKind::Compute])?;
        if self.bindings.bind_compute_pipeline(&pipeline) {
            self.encode(GpuCommand::SetComputePipeline {
                state: pipeline.state(),
            })?;
        }
        Ok(())
    }

    /// Bind `texture` at `slot` (`0..MAX_BOUND_TEXTURES`).
    pub fn bind_texture(&mut self, slot: usize, texture: &Arc<Texture>) -> Result<(), GraphicsError> {
        self.commands.require_encoder(
            "bind_texture",
            &[EncoderKind::Render, EncoderKind::Compute],
        )?;
        if self.bindings.bind_texture(slot, texture)? {
            self.encode(GpuCommand::SetTexture {
                slot: slot as u32,
                texture: texture.handle(),
            })?;
        }
        Ok(())
    }

    /// Bind `sampler` at `slot` (`0..MAX_BOUND_TEXTURES`).
    pub fn bind_sampler(&mut self, slot: usize, sampler: &Arc<Sampler>) -> Result<(), GraphicsError> {
        self.commands.require_encoder(
            "bind_sampler",
            &[EncoderKind::Render, EncoderKind::Compute],
        )?;
        if self.bindings.bind_sampler(slot, sampler)? {
            self.encode(GpuCommand::SetSampler {
                slot: slot as u32,
                sampler: sampler.handle(),
            })?;
        }
        Ok(())
    }

    /// Bind one of the shared samplers at `slot`.
    pub fn bind_sampler_kind(&mut self, slot: usize, kind: SamplerKind) -> Result<(), GraphicsError> {
        let sampler = Arc::clone(self.samplers.get(kind));
        self.bind_sampler(slot, &sampler)
    }

    /// Bind a texture asset's texture and sampler at `slot`.
    pub fn bind_texture_data(
        &mut self,
        slot: usize,
        data: &TexturePrivateData,
    ) -> Result<(), GraphicsError> {
        self.bind_texture(slot, &data.texture)?;
        self.bind_sampler(slot, &data.sampler)
    }

    /// Bind a vertex buffer at `slot`. Not deduplicated.
    ///
    /// Binding over [`VertexBufferSlot::UBO`] or [`VertexBufferSlot::PUSH_BUFFER`]
    /// displaces the uniform block or push constants; the next flush binds
    /// them again.
    pub fn set_vertex_buffer(
        &mut self,
        slot: VertexBufferSlot,
        buffer: &Arc<Buffer>,
        offset: u64,
    ) -> Result<(), GraphicsError> {
        self.encode_vertex_buffer(slot, buffer, offset)?;
        self.uniforms.slot_overwritten(slot);
        Ok(())
    }

    /// Bind transient memory from this frame at `slot`.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::StaleAllocation`] for a slice from an earlier frame.
    pub fn set_vertex_slice(
        &mut self,
        slot: VertexBufferSlot,
        slice: &BufferSlice,
    ) -> Result<(), GraphicsError> {
        self.staging.validate(slice)?;
        let buffer = Arc::clone(slice.buffer());
        self.set_vertex_buffer(slot, &buffer, slice.offset())
    }

    fn bind_uniform_slice(
        &mut self,
        slot: VertexBufferSlot,
        slice: &BufferSlice,
    ) -> Result<(), GraphicsError> {
        self.staging.validate(slice)?;
        let buffer = Arc::clone(slice.buffer());
        self.encode_vertex_buffer(slot, &buffer, slice.offset())
    }

    fn encode_vertex_buffer(
        &mut self,
        slot: VertexBufferSlot,
        buffer: &Arc<Buffer>,
        offset: u64,
    ) -> Result<(), GraphicsError> {
        if offset >= buffer.size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "vertex buffer offset {} outside buffer of {} bytes",
                offset,
                buffer.size()
            )));
        }
        self.encode(GpuCommand::SetVertexBuffer {
            slot,
            buffer: buffer.handle(),
            offset,
        })
    }

    // ========================================================================
    // Uniforms
    // ========================================================================

    /// Set the camera matrices. The uniform block becomes dirty.
    pub fn set_view_projection(&mut self, projection: &Mat4, view: &Mat4) {
        self.uniforms.set_view_projection(projection, view);
    }

    /// Upload the uniform block if dirty and bind it at [`VertexBufferSlot::UBO`].
    ///
    /// Returns `true` if an upload happened. A clean block that a new encoder
    /// scope has not seen yet is re-bound without uploading.
    pub fn flush_uniforms_if_dirty(&mut self) -> Result<bool, GraphicsError> {
        self.commands
            .require_encoder("flush_uniforms_if_dirty", &[EncoderKind::Render])?;
        match self.uniforms.flush_block(&mut self.staging)? {
            Some(flush) => {
                self.bind_uniform_slice(VertexBufferSlot::UBO, &flush.slice)?;
                Ok(flush.uploaded)
            }
            None => Ok(false),
        }
    }

    /// Overwrite push-constant floats starting at `offset`.
    pub fn set_push_constants(&mut self, offset: usize, values: &[f32]) -> Result<(), GraphicsError> {
        self.uniforms.set_push_constants(offset, values)
    }

    /// Upload the push constants if dirty and bind them at
    /// [`VertexBufferSlot::PUSH_BUFFER`]. Returns `true` if an upload happened.
    pub fn update_push_constants(&mut self) -> Result<bool, GraphicsError> {
        self.commands
            .require_encoder("update_push_constants", &[EncoderKind::Render])?;
        match self.uniforms.flush_push_constants(&mut self.staging)? {
            Some(flush) => {
                self.bind_uniform_slice(VertexBufferSlot::PUSH_BUFFER, &flush.slice)?;
                Ok(flush.uploaded)
            }
            None => Ok(false),
        }
    }

    // ========================================================================
    // Render Settings
    // ========================================================================

    /// Set the viewport of the open render encoder.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), GraphicsError> {
        self.encode(GpuCommand::SetViewport(viewport))
    }

    /// Set the viewport applied to render encoders on the frame color buffer.
    pub fn set_scene_viewport(&mut self, viewport: Viewport) {
        self.scene_viewport = viewport;
    }

    pub fn scene_viewport(&self) -> Viewport {
        self.scene_viewport
    }

    /// Set the fill mode applied at the start of each render encoder.
    pub fn set_fill_mode(&mut self, mode: TriangleFillMode) {
        self.fill_mode = mode;
    }

    pub fn fill_mode(&self) -> TriangleFillMode {
        self.fill_mode
    }

    // ========================================================================
    // Draws
    // ========================================================================

    /// Draw `vertex_count` vertices starting at `vertex_start`.
    pub fn draw(&mut self, vertex_start: u32, vertex_count: u32) -> Result<(), GraphicsError> {
        self.encode(GpuCommand::Draw {
            vertex_start,
            vertex_count,
            instance_count: 1,
        })
    }

    /// Indexed draw from a static index buffer.
    pub fn draw_indexed(
        &mut self,
        index_buffer: &Arc<Buffer>,
        index_offset: u64,
        index_format: IndexFormat,
        index_count: u32,
        base_vertex: i32,
    ) -> Result<(), GraphicsError> {
        let len = u64::from(index_count) * index_format.size();
        if !index_buffer.contains_range(index_offset, len) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} indices at offset {} overrun index buffer of {} bytes",
                index_count,
                index_offset,
                index_buffer.size()
            )));
        }
        self.encode(GpuCommand::DrawIndexed {
            index_buffer: index_buffer.handle(),
            index_offset,
            index_format,
            index_count,
            base_vertex,
            instance_count: 1,
        })
    }

    /// Indexed draw from transient index memory of this frame.
    pub fn draw_indexed_slice(
        &mut self,
        indices: &BufferSlice,
        index_format: IndexFormat,
        base_vertex: i32,
    ) -> Result<(), GraphicsError> {
        self.staging.validate(indices)?;
        let count = u32::try_from(indices.size() / index_format.size()).map_err(|_| {
            GraphicsError::InvalidParameter(format!(
                "index slice of {} bytes holds too many indices",
                indices.size()
            ))
        })?;
        let buffer = Arc::clone(indices.buffer());
        self.draw_indexed(&buffer, indices.offset(), index_format, count, base_vertex)
    }

    /// Draw a triangle fan of `vertex_count` vertices starting at `vertex_start`
    /// through the shared fan index buffer.
    ///
    /// Fans with fewer than 3 vertices draw nothing.
    pub fn draw_fan(&mut self, vertex_start: u32, vertex_count: u32) -> Result<(), GraphicsError> {
        if vertex_count > FAN_INDEX_BUFFER_VERTICES {
            return Err(GraphicsError::InvalidParameter(format!(
                "fan of {} vertices exceeds {}",
                vertex_count, FAN_INDEX_BUFFER_VERTICES
            )));
        }
        if vertex_count < 3 {
            return Ok(());
        }
        let base_vertex = i32::try_from(vertex_start).map_err(|_| {
            GraphicsError::InvalidParameter(format!("fan start {vertex_start} out of range"))
        })?;
        let buffer = Arc::clone(&self.fan_index_buffer);
        self.draw_indexed(
            &buffer,
            0,
            IndexFormat::Uint16,
            fan_index_count(vertex_count),
            base_vertex,
        )
    }

    /// Bind a mesh's vertex buffer at `slot` and draw all of its indices.
    pub fn draw_mesh(
        &mut self,
        mesh: &MeshPrivateData,
        slot: VertexBufferSlot,
    ) -> Result<(), GraphicsError> {
        self.set_vertex_buffer(slot, &mesh.vertex_buffer, 0)?;
        self.draw_indexed(
            &mesh.index_buffer,
            0,
            mesh.index_format,
            mesh.index_count(),
            0,
        )
    }

    /// Dispatch a compute grid.
    pub fn dispatch(
        &mut self,
        groups: [u32; 3],
        threads_per_group: [u32; 3],
    ) -> Result<(), GraphicsError> {
        self.encode(GpuCommand::Dispatch {
            groups,
            threads_per_group,
        })
    }

    /// Copy bytes between buffers in the open blit encoder.
    pub fn copy_buffer(
        &mut self,
        src: &Arc<Buffer>,
        dst: &Arc<Buffer>,
        region: BufferCopyRegion,
    ) -> Result<(), GraphicsError> {
        if !src.contains_range(region.src_offset, region.size)
            || !dst.contains_range(region.dst_offset, region.size)
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "copy of {} bytes out of bounds",
                region.size
            )));
        }
        self.encode(GpuCommand::CopyBuffer {
            src: src.handle(),
            dst: dst.handle(),
            region,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    pub fn config(&self) -> &RenderStateConfig {
        &self.config
    }

    pub fn pipelines(&self) -> &PipelineRegistry {
        &self.pipelines
    }

    /// Shared sampler of `kind`.
    pub fn sampler(&self, kind: SamplerKind) -> &Arc<Sampler> {
        self.samplers.get(kind)
    }

    pub fn staging(&self) -> &StagingAllocator {
        &self.staging
    }

    pub fn frames(&self) -> &FrameSynchronizer {
        &self.frames
    }

    pub fn commands(&self) -> &CommandEncoderLifecycle {
        &self.commands
    }

    pub fn bindings(&self) -> &BindingCache {
        &self.bindings
    }

    pub fn uniforms(&self) -> &GlobalUniforms {
        &self.uniforms
    }

    /// Color target of the frame being recorded.
    pub fn color_buffer(&self) -> Result<&Arc<Texture>, GraphicsError> {
        let info = self.current_frame.ok_or_else(|| {
            GraphicsError::InvalidState("no frame is being recorded".to_string())
        })?;
        Ok(&self.targets.color[info.slot])
    }

    /// Color target of `slot`.
    pub fn slot_color_buffer(&self, slot: usize) -> Option<&Arc<Texture>> {
        self.targets.color.get(slot)
    }

    pub fn depth_buffer(&self) -> &Arc<Texture> {
        &self.targets.depth
    }

    pub fn fan_index_buffer(&self) -> &Arc<Buffer> {
        &self.fan_index_buffer
    }

    /// Frame being recorded, if any.
    pub fn current_frame(&self) -> Option<FrameInfo> {
        self.current_frame
    }
}

impl std::fmt::Debug for RenderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderState")
            .field("device", &self.device.name())
            .field("extent", &self.config.extent)
            .field("pipelines", &self.pipelines.len())
            .field("current_frame", &self.current_frame)
            .field("active_encoder", &self.commands.active_encoder())
            .finish()
    }
}

static_assertions::assert_impl_all!(RenderState: Send);
