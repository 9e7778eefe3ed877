use anyhow::Result;
use overlay::{
    CompileError, GeometryId, PixelRegion, ProgramCompiler, ProgramId, ProgramRequest,
    RenderSurface, SurfaceSize, UniformLocation,
};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;

use crate::compile::{assemble_fragment, UniformTable};
use crate::context::GpuContext;
use crate::pipeline::{build_region_pipeline, PipelineLayouts};
use crate::recorder::{DrawCommand, FrameRecorder};
use crate::uniforms::{RegionUniforms, UniformArena};

struct LinkedProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformTable,
}

/// Window-backed [`RenderSurface`] that replays each frame's recorded calls
/// as a single wgpu render pass.
pub struct GpuSurface {
    context: GpuContext,
    layouts: PipelineLayouts,
    arena: UniformArena,
    programs: Vec<LinkedProgram>,
    geometry: Vec<(wgpu::Buffer, u32)>,
    recorder: FrameRecorder,
    frames_dropped: u64,
}

impl GpuSurface {
    pub fn new<T>(target: T, size: SurfaceSize) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle + Send + Sync + 'static,
    {
        let context = GpuContext::new(target, size)?;
        let layouts = PipelineLayouts::new(&context.device)?;
        let arena = UniformArena::new(&context.device, &layouts.uniform_layout);
        let recorder = FrameRecorder::new(context.size());
        Ok(Self {
            context,
            layouts,
            arena,
            programs: Vec::new(),
            geometry: Vec::new(),
            recorder,
            frames_dropped: 0,
        })
    }

    /// Frames that could not be presented because no swapchain texture was
    /// available.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    fn present(&mut self, clear: Option<[f32; 4]>, draws: &[DrawCommand]) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let blocks: Vec<RegionUniforms> = draws.iter().map(|draw| draw.uniforms).collect();
        self.arena.upload(
            &self.context.device,
            &self.context.queue,
            &self.layouts.uniform_layout,
            &blocks,
        );

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("region encoder"),
                });
        let load = match clear {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: f64::from(a),
            }),
            None => wgpu::LoadOp::Load,
        };
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("region pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for (index, draw) in draws.iter().enumerate() {
                let Some(program) = self.programs.get(draw.program.0 as usize) else {
                    continue;
                };
                let Some((buffer, _)) = self.geometry.get(draw.geometry.0 as usize) else {
                    continue;
                };
                render_pass.set_pipeline(&program.pipeline);
                render_pass.set_bind_group(0, self.arena.bind_group(), &[self.arena.offset(index)]);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.set_scissor_rect(
                    draw.scissor.x,
                    draw.scissor.y,
                    draw.scissor.width,
                    draw.scissor.height,
                );
                render_pass.draw(0..draw.vertex_count, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl RenderSurface for GpuSurface {
    fn size(&self) -> SurfaceSize {
        self.recorder.target()
    }

    fn resize(&mut self, size: SurfaceSize) {
        if size == self.recorder.target() {
            return;
        }
        self.recorder.set_target(size);
        if self.context.resize(size) {
            tracing::debug!(width = size.width, height = size.height, "resized surface");
        }
    }

    fn set_scissor_test(&mut self, enabled: bool) {
        self.recorder.set_scissor_test(enabled);
    }

    fn scissor(&mut self, region: PixelRegion) {
        self.recorder.scissor(region);
    }

    fn viewport(&mut self, region: PixelRegion) {
        self.recorder.viewport(region);
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        self.recorder.clear(rgba);
    }

    fn use_program(&mut self, program: ProgramId) {
        self.recorder.use_program(program);
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs.get(program.0 as usize)?.uniforms.location(name)
    }

    fn uniform1f(&mut self, location: UniformLocation, value: f32) {
        self.recorder.uniform1f(location, value);
    }

    fn uniform2f(&mut self, location: UniformLocation, x: f32, y: f32) {
        self.recorder.uniform2f(location, x, y);
    }

    fn upload_geometry(&mut self, positions: &[f32]) -> GeometryId {
        let buffer = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("region geometry"),
                contents: bytemuck::cast_slice(positions),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let geometry = GeometryId(self.geometry.len() as u32);
        self.geometry.push((buffer, (positions.len() / 2) as u32));
        geometry
    }

    fn draw_triangles(&mut self, geometry: GeometryId, vertex_count: u32) {
        let available = self
            .geometry
            .get(geometry.0 as usize)
            .map(|(_, vertices)| *vertices)
            .unwrap_or(0);
        if vertex_count > available {
            tracing::warn!(?geometry, vertex_count, available, "draw exceeds geometry; skipped");
            return;
        }
        self.recorder.draw(geometry, vertex_count);
    }

    fn finish_frame(&mut self) {
        let (clear, draws) = self.recorder.take_frame();
        let target = self.context.size();
        if target != self.recorder.target() {
            // Zero-sized or not yet reconfigured; nothing can be presented.
            self.frames_dropped += 1;
            return;
        }
        match self.present(clear, &draws) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                self.context.reconfigure();
                self.frames_dropped += 1;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("timed out acquiring surface texture");
                self.frames_dropped += 1;
            }
            Err(error) => {
                tracing::error!(%error, "failed to present frame");
                self.frames_dropped += 1;
            }
        }
    }
}

impl ProgramCompiler for GpuSurface {
    fn compile(&mut self, request: &ProgramRequest) -> Result<ProgramId, CompileError> {
        let assembled = assemble_fragment(request)?;
        let pipeline = build_region_pipeline(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            &request.label,
            &assembled,
        )?;
        let program = self.recorder.add_program();
        self.programs.push(LinkedProgram {
            label: request.label.clone(),
            pipeline,
            uniforms: assembled.uniforms,
        });
        tracing::debug!(
            ?program,
            label = %request.label,
            appearance = ?request.appearance,
            programs = self.recorder.program_count(),
            "linked region pipeline"
        );
        Ok(program)
    }
}

impl std::fmt::Debug for GpuSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuSurface")
            .field("size", &self.recorder.target())
            .field(
                "programs",
                &self.programs.iter().map(|p| p.label.as_str()).collect::<Vec<_>>(),
            )
            .field("frames_dropped", &self.frames_dropped)
            .finish()
    }
}
