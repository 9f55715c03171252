use std::sync::Arc;

use anyhow::Result;
use log::{debug, warn};
use wgpu::{BindGroup, BindGroupLayout, Device, RenderPipeline, Surface, SurfaceConfiguration, Texture};
use winit::window::Window;

use super::frame_buffer::FrameBuffer;
use super::gpu_context::GpuContext;
use crate::error::RenderError;
use crate::render::LabelPlacement;
use crate::traits::FramePresenter;

/// Shows viewport frames in a window and draws label text with egui
///
/// The frame texture is uploaded as-is: frames arrive already encoded for
/// display, so the surface uses a non-sRGB format.
pub struct WindowPresenter {
    window: Arc<Window>,
    gpu: GpuContext,
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    texture: Texture,
    bind_group: BindGroup,
    texture_size: (u32, u32),
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl WindowPresenter {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let (gpu, surface) = pollster::block_on(GpuContext::for_window(window.clone()))?;
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let surface_caps = surface.get_capabilities(gpu.adapter());
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("surface reports no texture formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(gpu.device(), &surface_config);

        let bind_group_layout = Self::create_bind_group_layout(gpu.device());
        let pipeline = Self::create_pipeline(gpu.device(), &bind_group_layout, surface_format);
        let texture = Self::create_frame_texture(gpu.device(), width, height);
        let bind_group = Self::create_bind_group(gpu.device(), &bind_group_layout, &texture);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(gpu.device(), surface_format, egui_wgpu::RendererOptions::default());

        debug!("Presenter ready: {width}x{height} {surface_format:?}");

        Ok(Self {
            window,
            gpu,
            surface,
            surface_config,
            pipeline,
            bind_group_layout,
            texture,
            bind_group,
            texture_size: (width, height),
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    fn upload(&mut self, frame: &FrameBuffer) {
        let (width, height) = frame.dimensions();
        if (width, height) != self.texture_size {
            self.texture = Self::create_frame_texture(self.gpu.device(), width, height);
            self.bind_group = Self::create_bind_group(self.gpu.device(), &self.bind_group_layout, &self.texture);
            self.texture_size = (width, height);
        }

        self.gpu.queue().write_texture(
            self.texture.as_image_copy(),
            frame.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture, RenderError> {
        self.surface.get_current_texture().map_err(|err| match err {
            wgpu::SurfaceError::Lost => RenderError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
            wgpu::SurfaceError::Outdated => {
                self.surface.configure(self.gpu.device(), &self.surface_config);
                RenderError::Outdated
            }
            wgpu::SurfaceError::Timeout => RenderError::Timeout,
            other => RenderError::Other(other.to_string()),
        })
    }

    fn draw_labels(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, labels: &[LabelPlacement]) {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let pixels_per_point = self.window.scale_factor() as f32;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            for (index, label) in labels.iter().enumerate() {
                egui::Area::new(egui::Id::new(("viewport-label", index)))
                    .fixed_pos(egui::pos2(label.x / pixels_per_point, label.y / pixels_per_point))
                    .pivot(egui::Align2::CENTER_BOTTOM)
                    .interactable(false)
                    .show(ctx, |ui| {
                        egui::Frame::NONE
                            .fill(egui::Color32::from_black_alpha(160))
                            .corner_radius(4.0)
                            .inner_margin(egui::Margin::symmetric(6, 2))
                            .show(ui, |ui| {
                                ui.label(
                                    egui::RichText::new(&label.text)
                                        .size(13.0)
                                        .color(egui::Color32::from_rgb(74, 158, 255)),
                                );
                            });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(self.gpu.device(), self.gpu.queue(), *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.surface_config.width, self.surface_config.height],
            pixels_per_point,
        };
        self.egui_renderer.update_buffers(
            self.gpu.device(),
            self.gpu.queue(),
            encoder,
            &tris,
            &screen_descriptor,
        );

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Label Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let mut render_pass = render_pass.forget_lifetime();
            self.egui_renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    fn create_frame_texture(device: &Device, width: u32, height: u32) -> Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Viewport Frame Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Viewport Frame Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create_pipeline(
        device: &Device,
        bind_group_layout: &BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Viewport Present Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../present.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Viewport Present Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Viewport Present Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_bind_group(device: &Device, layout: &BindGroupLayout, texture: &Texture) -> BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // nearest keeps the preview blocks crisp
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Viewport Frame Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Viewport Frame Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        })
    }
}

impl FramePresenter for WindowPresenter {
    fn present(&mut self, frame: &FrameBuffer, labels: &[LabelPlacement]) -> Result<(), RenderError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(());
        }
        self.upload(frame);

        let surface_texture = self.acquire()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Viewport Present Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Viewport Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        if !labels.is_empty() {
            self.draw_labels(&mut encoder, &view, labels);
        }

        self.gpu.queue().submit(Some(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            warn!("Ignoring resize to {width}x{height}");
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(self.gpu.device(), &self.surface_config);
    }
}
