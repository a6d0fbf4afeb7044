use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Quat, Vec3};
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::model::World;
use crate::utils::{MeshBuffer, Vertex};

/// Byte stride between per-draw transform slots (min dynamic-offset alignment)
pub const TRANSFORM_STRIDE: u64 = 256;

/// Upper bound on per-frame draws: starfield + ship + enemies + bullets
pub const MAX_DRAWS: usize = 256;

/// Ship model adjustments carried over from the original scene setup
const SHIP_SCALE: f32 = 0.5;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub transform: [[f32; 4]; 4],
}

pub struct CameraResources {
    pub camera_buffer: wgpu::Buffer,
    pub lighting_buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub camera_bind_group: wgpu::BindGroup,
}

pub struct ModelResources {
    pub buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

pub struct ScenePipelines {
    pub scene_pipeline: wgpu::RenderPipeline,
    pub starfield_pipeline: wgpu::RenderPipeline,
    pub star_bind_group_layout: wgpu::BindGroupLayout,
}

pub fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

pub fn create_camera_resources(device: &wgpu::Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("camera_buffer"),
        size: 64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lighting_buffer"),
        size: 32,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: lighting_buffer.as_entire_binding(),
            },
        ],
    });

    CameraResources {
        camera_buffer,
        lighting_buffer,
        bind_group_layout,
        camera_bind_group,
    }
}

/// One dynamic-offset uniform buffer holds every per-draw model matrix for
/// the frame; each draw binds its own 256-byte slot.
pub fn create_model_resources(device: &wgpu::Device) -> ModelResources {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("model_transforms"),
        size: TRANSFORM_STRIDE * MAX_DRAWS as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("model_bind_group_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(64),
            },
            count: None,
        }],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("model_bind_group"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(64),
            }),
        }],
    });

    ModelResources {
        buffer,
        bind_group_layout,
        bind_group,
    }
}

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 40,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    }
}

pub fn create_scene_pipelines(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_bgl: &wgpu::BindGroupLayout,
    model_bgl: &wgpu::BindGroupLayout,
    depth_format: wgpu::TextureFormat,
) -> ScenePipelines {
    let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
    });

    let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("scene_pipeline_layout"),
        bind_group_layouts: &[camera_bgl, model_bgl],
        push_constant_ranges: &[],
    });

    let scene_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene_pipeline"),
        layout: Some(&scene_layout),
        vertex: wgpu::VertexState {
            module: &scene_shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &scene_shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    });

    let star_bind_group_layout =
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("starfield_bgl"),
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
        });

    let starfield_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("starfield_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/starfield.wgsl").into()),
    });

    let starfield_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("starfield_pipeline_layout"),
        bind_group_layouts: &[camera_bgl, model_bgl, &star_bind_group_layout],
        push_constant_ranges: &[],
    });

    // Depth writes off: the backdrop never occludes scene geometry
    let starfield_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("starfield_pipeline"),
        layout: Some(&starfield_layout),
        vertex: wgpu::VertexState {
            module: &starfield_shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &starfield_shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    });

    ScenePipelines {
        scene_pipeline,
        starfield_pipeline,
        star_bind_group_layout,
    }
}

/// Upload RGBA pixels as the starfield texture and build its bind group.
pub fn create_star_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> wgpu::BindGroup {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("star_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        pixels,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("star_sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("star_bind_group"),
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

/// Near-black 1x1 placeholder shown until (or instead of) the real texture.
pub fn create_fallback_star_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::BindGroup {
    create_star_texture(device, queue, layout, &[4, 4, 12, 255], 1, 1)
}

/// Model matrix for the loaded ship: scaled to half size and pitched 90
/// degrees, as the original scene sets it up.
pub fn ship_transform(position: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        Vec3::splat(SHIP_SCALE),
        Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
        position,
    )
}

/// Consolidated render state to avoid parameter explosion
pub struct RenderState {
    // wgpu resources
    pub format: TextureFormat,
    pub alpha_mode: CompositeAlphaMode,
    pub width: u32,
    pub height: u32,

    // Pipelines
    pub scene_pipeline: RenderPipeline,
    pub starfield_pipeline: RenderPipeline,
    pub model_buffer: Buffer,
    pub model_bind_group: BindGroup,

    // Meshes; the ship slot is shared with the async loader
    pub starfield_mesh: MeshBuffer,
    pub enemy_mesh: MeshBuffer,
    pub bullet_mesh: MeshBuffer,
    pub ship_mesh: Rc<RefCell<Option<MeshBuffer>>>,
    pub star_bind_group: Rc<RefCell<BindGroup>>,

    // UI
    pub egui_renderer: egui_wgpu::Renderer,
    pub egui_primitives: Option<Vec<egui::ClippedPrimitive>>,
    pub egui_full_output: Option<egui::FullOutput>,
    pub egui_dpr: f32,
}

impl RenderState {
    pub fn draw_frame(
        &mut self,
        device: &Device,
        queue: &Queue,
        surface: &Surface,
        world: &World,
        camera_eye: Vec3,
        depth_view: &TextureView,
        cam_bg: &BindGroup,
    ) {
        // Per-draw transforms: slot 0 is the starfield, then ship, enemies,
        // bullets. The starfield is pinned to the camera so it never parallaxes.
        let mut transforms: Vec<Mat4> = Vec::with_capacity(2 + world.enemies.len() + world.bullets.len());
        transforms.push(Mat4::from_translation(camera_eye));

        // Rc clones so the RefCell guards below do not borrow `self`
        let ship_mesh_rc = self.ship_mesh.clone();
        let star_bg_rc = self.star_bind_group.clone();
        let ship_mesh_guard = ship_mesh_rc.borrow();
        let star_bg = star_bg_rc.borrow();

        let ship_slot = match (&world.ship, ship_mesh_guard.as_ref()) {
            (Some(ship), Some(_)) => {
                transforms.push(ship_transform(ship.position));
                Some(transforms.len() - 1)
            }
            _ => None,
        };

        let enemy_base = transforms.len();
        for enemy in &world.enemies {
            transforms.push(Mat4::from_translation(enemy.position));
        }
        let bullet_base = transforms.len();
        for bullet in &world.bullets {
            transforms.push(Mat4::from_translation(bullet.position));
        }
        transforms.truncate(MAX_DRAWS);

        for (i, m) in transforms.iter().enumerate() {
            let uniform = ModelUniform {
                transform: m.to_cols_array_2d(),
            };
            queue.write_buffer(
                &self.model_buffer,
                i as u64 * TRANSFORM_STRIDE,
                bytemuck::bytes_of(&uniform),
            );
        }

        let offset = |slot: usize| [slot as u32 * TRANSFORM_STRIDE as u32];

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Lost) => {
                surface.configure(
                    device,
                    &SurfaceConfiguration {
                        usage: TextureUsages::RENDER_ATTACHMENT,
                        format: self.format,
                        width: self.width,
                        height: self.height,
                        present_mode: PresentMode::Fifo,
                        alpha_mode: self.alpha_mode,
                        view_formats: vec![],
                        desired_maximum_frame_latency: 2,
                    },
                );
                surface
                    .get_current_texture()
                    .expect("Failed to acquire frame after reconfigure")
            }
            Err(e) => panic!("Surface error: {e:?}"),
        };

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Backdrop first, depth writes disabled
            rp.set_pipeline(&self.starfield_pipeline);
            rp.set_bind_group(0, cam_bg, &[]);
            rp.set_bind_group(1, &self.model_bind_group, &offset(0));
            rp.set_bind_group(2, &*star_bg, &[]);
            rp.set_vertex_buffer(0, self.starfield_mesh.vertex_buffer.slice(..));
            rp.set_index_buffer(
                self.starfield_mesh.index_buffer.slice(..),
                IndexFormat::Uint32,
            );
            rp.draw_indexed(0..self.starfield_mesh.index_count, 0, 0..1);

            rp.set_pipeline(&self.scene_pipeline);
            rp.set_bind_group(0, cam_bg, &[]);

            if let (Some(slot), Some(mesh)) = (ship_slot, ship_mesh_guard.as_ref()) {
                rp.set_bind_group(1, &self.model_bind_group, &offset(slot));
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            for i in 0..world.enemies.len().min(MAX_DRAWS.saturating_sub(enemy_base)) {
                rp.set_bind_group(1, &self.model_bind_group, &offset(enemy_base + i));
                rp.set_vertex_buffer(0, self.enemy_mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(self.enemy_mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..self.enemy_mesh.index_count, 0, 0..1);
            }

            for i in 0..world.bullets.len().min(MAX_DRAWS.saturating_sub(bullet_base)) {
                rp.set_bind_group(1, &self.model_bind_group, &offset(bullet_base + i));
                rp.set_vertex_buffer(0, self.bullet_mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(self.bullet_mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..self.bullet_mesh.index_count, 0, 0..1);
            }
        }

        // egui overlay
        let (egui_primitives, egui_full_output) =
            match (self.egui_primitives.take(), self.egui_full_output.take()) {
                (Some(prim), Some(output)) => (prim, output),
                _ => {
                    queue.submit(std::iter::once(encoder.finish()));
                    frame.present();
                    return;
                }
            };

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.width, self.height],
            pixels_per_point: self.egui_dpr,
        };

        for (id, image_delta) in &egui_full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }
        self.egui_renderer.update_buffers(
            device,
            queue,
            &mut encoder,
            &egui_primitives,
            &screen_descriptor,
        );

        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer.render(
                &mut egui_pass.forget_lifetime(),
                &egui_primitives,
                &screen_descriptor,
            );
        }

        for id in &egui_full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}
