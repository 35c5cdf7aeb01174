//! GPU textures: uploaded images plus the render targets.

use asset::texture::{ColorSpace, TextureData, TextureFilter};
use wgpu::{
    AddressMode, Device, Extent3d, FilterMode, Queue, Sampler, SamplerDescriptor,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// View and sampler for shader access; the view keeps the texture alive.
pub struct GpuTexture {
    pub view: TextureView,
    pub sampler: Sampler,
}

impl GpuTexture {
    /// Upload RGBA8 pixels; color space picks the sRGB or linear format.
    pub fn from_data(device: &Device, queue: &Queue, data: &TextureData, label: &str) -> Self {
        let format = match data.color_space {
            ColorSpace::Srgb => TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => TextureFormat::Rgba8Unorm,
        };
        let size = Extent3d {
            width: data.width.max(1),
            height: data.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.bytes_per_pixel() * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );

        let filter = match data.filter {
            TextureFilter::Nearest => FilterMode::Nearest,
            TextureFilter::Linear => FilterMode::Linear,
        };
        let sampler = create_sampler(device, label, filter, AddressMode::Repeat);
        let view = texture.create_view(&TextureViewDescriptor::default());
        Self { view, sampler }
    }
}

pub fn create_sampler(device: &Device, label: &str, filter: FilterMode, address: AddressMode) -> Sampler {
    device.create_sampler(&SamplerDescriptor {
        label: Some(label),
        address_mode_u: address,
        address_mode_v: address,
        address_mode_w: address,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    })
}

/// Offscreen targets at render resolution. With MSAA the scene is drawn
/// into `msaa` and resolved into `color`.
pub struct RenderTargets {
    pub color: TextureView,
    pub msaa: Option<TextureView>,
    pub depth: TextureView,
    pub width: u32,
    pub height: u32,
}

impl RenderTargets {
    pub fn new(device: &Device, format: TextureFormat, width: u32, height: u32, sample_count: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let color = create_target(
            device,
            "SceneColor",
            format,
            width,
            height,
            1,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
        );
        let msaa = (sample_count > 1).then(|| {
            create_target(
                device,
                "SceneColorMsaa",
                format,
                width,
                height,
                sample_count,
                TextureUsages::RENDER_ATTACHMENT,
            )
        });
        let depth = create_target(
            device,
            "DepthTex",
            DEPTH_FORMAT,
            width,
            height,
            sample_count,
            TextureUsages::RENDER_ATTACHMENT,
        );
        Self {
            color,
            msaa,
            depth,
            width,
            height,
        }
    }
}

fn create_target(
    device: &Device,
    label: &str,
    format: TextureFormat,
    width: u32,
    height: u32,
    sample_count: u32,
    usage: TextureUsages,
) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size: Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
