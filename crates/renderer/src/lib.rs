//! Renderer: wgpu init, toon + unlit pipelines, offscreen scene target
//! blitted onto the window surface.
//! wgpu = 26.x, winit = 0.30.x

mod texture;
mod uniforms;

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{Context, Result};
use asset::loader::SceneTextures;
use asset::model::ModelData;
use corelib::material::MaterialKind;
use corelib::scene::NodeId;
use corelib::session::Frame;
use wgpu::{
    util::DeviceExt,
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState,
    Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device, DeviceDescriptor,
    Features, FilterMode, FragmentState, Instance, InstanceDescriptor, Limits, LoadOp,
    Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    Sampler, SamplerBindingType, ShaderModule, ShaderModuleDescriptor, ShaderSource,
    ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError, TextureFormat,
    TextureSampleType, TextureUsages, TextureViewDimension, VertexState,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::texture::{DEPTH_FORMAT, GpuTexture, RenderTargets, create_sampler};
use crate::uniforms::{GlobalsUniform, ObjectUniform, ToonUniform, Vertex};

/// Transparent clear: the page behind the canvas shows through.
const CLEAR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 0.0,
};

struct GpuMesh {
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
}

struct ObjectSlot {
    buf: Buffer,
    bg: BindGroup,
}

/// Material bind groups; present once textures are uploaded.
struct Materials {
    toon_bg: BindGroup,
    eye_bg: BindGroup,
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_format: TextureFormat,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipelines
    toon_pipeline: RenderPipeline,
    eye_pipeline: RenderPipeline,
    blit_pipeline: RenderPipeline,
    sample_count: u32,

    // Layouts
    object_bgl: BindGroupLayout,
    toon_bgl: BindGroupLayout,
    eye_bgl: BindGroupLayout,
    blit_bgl: BindGroupLayout,

    // Uniforms
    globals_buf: Buffer,
    globals_bg: BindGroup,
    toon_buf: Buffer,

    // Scene content
    materials: Option<Materials>,
    meshes: Vec<GpuMesh>,
    objects: HashMap<NodeId, ObjectSlot>,

    // Offscreen target + its blit binding
    targets: RenderTargets,
    blit_sampler: Sampler,
    blit_bg: BindGroup,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>. The scene is drawn at
    /// `render_size` and scaled onto the window surface.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        render_size: (u32, u32),
        sample_count: u32,
    ) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Doorwatch Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no formats")?;
        let alpha_mode = caps
            .alpha_modes
            .iter()
            .copied()
            .find(|m| *m == wgpu::CompositeAlphaMode::PreMultiplied)
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let sample_count = match sample_count {
            1 | 4 => sample_count,
            other => {
                log::warn!("Unsupported MSAA sample count {other}, using 4");
                4
            }
        };

        // ==== Layouts ====
        let globals_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Globals BGL"),
            entries: &[uniform_entry(
                0,
                ShaderStages::VERTEX_FRAGMENT,
                std::mem::size_of::<GlobalsUniform>(),
            )],
        });
        let object_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Object BGL"),
            entries: &[uniform_entry(
                0,
                ShaderStages::VERTEX,
                std::mem::size_of::<ObjectUniform>(),
            )],
        });
        let toon_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Toon BGL"),
            entries: &[
                uniform_entry(0, ShaderStages::FRAGMENT, std::mem::size_of::<ToonUniform>()),
                texture_entry(1),
                sampler_entry(2),
                texture_entry(3),
                sampler_entry(4),
            ],
        });
        let eye_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Eye BGL"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let blit_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Blit BGL"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });

        // ==== Uniform buffers ====
        let globals_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals UBO"),
            contents: bytemuck::bytes_of(&GlobalsUniform::default()),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let globals_bg = device.create_bind_group(&BindGroupDescriptor {
            label: Some("Globals BG"),
            layout: &globals_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: globals_buf.as_entire_binding(),
            }],
        });
        let toon_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Toon UBO"),
            size: std::mem::size_of::<ToonUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // ==== Pipelines ====
        let toon_shader = shader(&device, "Toon WGSL", include_str!("shaders/toon.wgsl"));
        let eye_shader = shader(&device, "Eye WGSL", include_str!("shaders/eye.wgsl"));
        let blit_shader = shader(&device, "Blit WGSL", include_str!("shaders/blit.wgsl"));

        let toon_pipeline = scene_pipeline(
            &device,
            "Toon Pipeline",
            &toon_shader,
            &[&globals_bgl, &object_bgl, &toon_bgl],
            surface_format,
            sample_count,
        );
        let eye_pipeline = scene_pipeline(
            &device,
            "Eye Pipeline",
            &eye_shader,
            &[&globals_bgl, &object_bgl, &eye_bgl],
            surface_format,
            sample_count,
        );
        let blit_pipeline = blit_pipeline(&device, &blit_shader, &blit_bgl, surface_format);

        // ==== Offscreen target ====
        let targets = RenderTargets::new(
            &device,
            surface_format,
            render_size.0,
            render_size.1,
            sample_count,
        );
        let blit_sampler = create_sampler(&device, "Blit Sampler", FilterMode::Linear, AddressMode::ClampToEdge);
        let blit_bg = blit_bind_group(&device, &blit_bgl, &targets, &blit_sampler);

        log::info!(
            "Renderer ready: surface {}x{} {:?}, scene {}x{}, msaa x{}",
            surface_config.width,
            surface_config.height,
            surface_format,
            targets.width,
            targets.height,
            sample_count
        );

        Ok(Self {
            surface,
            surface_format,
            surface_config,
            device,
            queue,
            toon_pipeline,
            eye_pipeline,
            blit_pipeline,
            sample_count,
            object_bgl,
            toon_bgl,
            eye_bgl,
            blit_bgl,
            globals_buf,
            globals_bg,
            toon_buf,
            materials: None,
            meshes: Vec::new(),
            objects: HashMap::new(),
            targets,
            blit_sampler,
            blit_bg,
        })
    }

    /// Upload the material textures and build the material bind groups.
    pub fn upload_textures(&mut self, textures: &SceneTextures) {
        let ramp = GpuTexture::from_data(&self.device, &self.queue, &textures.gradient_ramp, "Gradient Ramp");
        let door_normals = GpuTexture::from_data(&self.device, &self.queue, &textures.door_normals, "Door Normals");
        let eye_color = GpuTexture::from_data(&self.device, &self.queue, &textures.eye_color, "Eye Color");

        let toon_bg = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("Toon BG"),
            layout: &self.toon_bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: self.toon_buf.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::TextureView(&ramp.view),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: BindingResource::Sampler(&ramp.sampler),
                },
                BindGroupEntry {
                    binding: 3,
                    resource: BindingResource::TextureView(&door_normals.view),
                },
                BindGroupEntry {
                    binding: 4,
                    resource: BindingResource::Sampler(&door_normals.sampler),
                },
            ],
        });
        let eye_bg = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("Eye BG"),
            layout: &self.eye_bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&eye_color.view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&eye_color.sampler),
                },
            ],
        });
        self.materials = Some(Materials { toon_bg, eye_bg });
    }

    /// Upload mesh buffers; draw items refer to them by mesh id.
    pub fn upload_model(&mut self, model: &ModelData) {
        self.meshes = model
            .meshes
            .iter()
            .enumerate()
            .map(|(i, mesh)| {
                let vertices: Vec<Vertex> = mesh.vertices.iter().map(Vertex::from).collect();
                let vertex_buf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Mesh {i} VB")),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: BufferUsages::VERTEX,
                });
                let index_buf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Mesh {i} IB")),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: BufferUsages::INDEX,
                });
                GpuMesh {
                    vertex_buf,
                    index_buf,
                    index_count: mesh.indices.len() as u32,
                }
            })
            .collect();
        log::info!("Uploaded {} meshes", self.meshes.len());
    }

    /// Resize: reconfigure the surface to the window and rebuild the
    /// offscreen target at the (pixel-ratio capped) render size.
    pub fn resize(&mut self, surface_size: (u32, u32), render_size: (u32, u32)) {
        self.surface_config.width = surface_size.0.max(1);
        self.surface_config.height = surface_size.1.max(1);
        self.surface.configure(&self.device, &self.surface_config);

        if (self.targets.width, self.targets.height) != (render_size.0.max(1), render_size.1.max(1)) {
            self.targets = RenderTargets::new(
                &self.device,
                self.surface_format,
                render_size.0,
                render_size.1,
                self.sample_count,
            );
            self.blit_bg = blit_bind_group(&self.device, &self.blit_bgl, &self.targets, &self.blit_sampler);
        }
    }

    /// Render one frame: scene pass into the offscreen target, then blit.
    pub fn render(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        self.queue.write_buffer(
            &self.globals_buf,
            0,
            bytemuck::bytes_of(&GlobalsUniform::from_frame(frame)),
        );
        self.queue
            .write_buffer(&self.toon_buf, 0, bytemuck::bytes_of(&ToonUniform::from(&frame.toon)));
        for draw in &frame.draws {
            let uniform = ObjectUniform::new(draw.world);
            let slot = self
                .objects
                .entry(draw.node)
                .or_insert_with(|| create_object_slot(&self.device, &self.object_bgl, draw.node));
            self.queue
                .write_buffer(&slot.buf, 0, bytemuck::bytes_of(&uniform));
        }

        // --- frame & passes
        let output = self.surface.get_current_texture()?;
        let surface_view = output.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let (view, resolve_target) = match &self.targets.msaa {
                Some(msaa) => (msaa, Some(&self.targets.color)),
                None => (&self.targets.color, None),
            };
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("ScenePass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(materials) = &self.materials {
                rpass.set_bind_group(0, &self.globals_bg, &[]);
                for draw in &frame.draws {
                    let (Some(mesh), Some(object)) =
                        (self.meshes.get(draw.mesh as usize), self.objects.get(&draw.node))
                    else {
                        continue;
                    };
                    match draw.material {
                        MaterialKind::Toon => {
                            rpass.set_pipeline(&self.toon_pipeline);
                            rpass.set_bind_group(2, &materials.toon_bg, &[]);
                        }
                        MaterialKind::Eye(_) => {
                            rpass.set_pipeline(&self.eye_pipeline);
                            rpass.set_bind_group(2, &materials.eye_bg, &[]);
                        }
                    }
                    rpass.set_bind_group(1, &object.bg, &[]);
                    rpass.set_vertex_buffer(0, mesh.vertex_buf.slice(..));
                    rpass.set_index_buffer(mesh.index_buf.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("BlitPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &surface_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            rpass.set_pipeline(&self.blit_pipeline);
            rpass.set_bind_group(0, &self.blit_bg, &[]);
            rpass.draw(0..3, 0..1);
        }

        self.queue.submit(Some(encoder.finish()));
        output.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }
}

fn uniform_entry(binding: u32, visibility: ShaderStages, size: usize) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: true },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Sampler(SamplerBindingType::Filtering),
        count: None,
    }
}

fn shader(device: &Device, label: &str, src: &str) -> ShaderModule {
    device.create_shader_module(ShaderModuleDescriptor {
        label: Some(label),
        source: ShaderSource::Wgsl(src.into()),
    })
}

fn scene_pipeline(
    device: &Device,
    label: &str,
    shader: &ShaderModule,
    layouts: &[&BindGroupLayout],
    format: TextureFormat,
    sample_count: u32,
) -> RenderPipeline {
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::LAYOUT],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode: Some(wgpu::Face::Back),
            ..Default::default()
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        },
        multiview: None,
        cache: None,
    })
}

fn blit_pipeline(
    device: &Device,
    shader: &ShaderModule,
    bgl: &BindGroupLayout,
    format: TextureFormat,
) -> RenderPipeline {
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("Blit PipelineLayout"),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Blit Pipeline"),
        layout: Some(&layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn blit_bind_group(
    device: &Device,
    bgl: &BindGroupLayout,
    targets: &RenderTargets,
    sampler: &Sampler,
) -> BindGroup {
    device.create_bind_group(&BindGroupDescriptor {
        label: Some("Blit BG"),
        layout: bgl,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(&targets.color),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_object_slot(device: &Device, layout: &BindGroupLayout, node: NodeId) -> ObjectSlot {
    let buf = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("Object {node} UBO")),
        size: std::mem::size_of::<ObjectUniform>() as u64,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bg = device.create_bind_group(&BindGroupDescriptor {
        label: Some(&format!("Object {node} BG")),
        layout,
        entries: &[BindGroupEntry {
            binding: 0,
            resource: buf.as_entire_binding(),
        }],
    });
    ObjectSlot { buf, bg }
}
