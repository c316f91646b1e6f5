// renderer/framebuffer.rs
use crate::error::{RenderError, Result};

/// Attachment formats the renderer knows how to allocate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgba8,
    Rgba8Srgb,
    R16f,
    Rgba16f,
    R32f,
    Rgba32f,
    Depth32f,
}

impl PixelFormat {
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            PixelFormat::R8 => wgpu::TextureFormat::R8Unorm,
            PixelFormat::Rg8 => wgpu::TextureFormat::Rg8Unorm,
            PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
            PixelFormat::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            PixelFormat::R16f => wgpu::TextureFormat::R16Float,
            PixelFormat::Rgba16f => wgpu::TextureFormat::Rgba16Float,
            PixelFormat::R32f => wgpu::TextureFormat::R32Float,
            PixelFormat::Rgba32f => wgpu::TextureFormat::Rgba32Float,
            PixelFormat::Depth32f => wgpu::TextureFormat::Depth32Float,
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(self, PixelFormat::Depth32f)
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 | PixelFormat::R16f => 2,
            PixelFormat::Rgba8 | PixelFormat::Rgba8Srgb | PixelFormat::R32f => 4,
            PixelFormat::Depth32f => 4,
            PixelFormat::Rgba16f => 8,
            PixelFormat::Rgba32f => 16,
        }
    }

    /// Cost and alignment of the format as a colour target. These differ
    /// from the texel size: an `Rgba8Unorm` target costs 8 bytes.
    pub fn target_cost(self) -> Option<(u32, u32)> {
        let format = self.to_wgpu();
        Some((format.target_pixel_byte_cost()?, format.target_component_alignment()?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub name: &'static str,
    pub format: PixelFormat,
}

impl AttachmentDesc {
    pub const fn new(name: &'static str, format: PixelFormat) -> Self {
        Self { name, format }
    }
}

pub const MAX_COLOUR_ATTACHMENTS: usize = 8;
/// wgpu's default `max_color_attachment_bytes_per_sample`.
pub const MAX_COLOUR_BYTES_PER_SAMPLE: u32 = 32;

/// Named attachment set of a framebuffer, checked before anything is
/// allocated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramebufferLayout {
    pub name: &'static str,
    pub colours: Vec<AttachmentDesc>,
    pub depth: Option<AttachmentDesc>,
}

impl FramebufferLayout {
    pub fn gbuffer() -> Self {
        Self {
            name: "G-buffer",
            colours: vec![
                AttachmentDesc::new("position", PixelFormat::Rgba16f),
                AttachmentDesc::new("normal", PixelFormat::Rgba16f),
                AttachmentDesc::new("diffuse", PixelFormat::Rgba8),
                // rgb colour, a gloss over `MAX_GLOSS`.
                AttachmentDesc::new("specular", PixelFormat::Rgba8),
            ],
            depth: Some(AttachmentDesc::new("depth", PixelFormat::Depth32f)),
        }
    }

    pub fn lbuffer() -> Self {
        Self {
            name: "L-buffer",
            colours: vec![AttachmentDesc::new("composite", PixelFormat::Rgba16f)],
            depth: None,
        }
    }

    pub fn forward() -> Self {
        Self {
            name: "forward",
            colours: vec![
                AttachmentDesc::new("composite", PixelFormat::Rgba16f),
                AttachmentDesc::new("position", PixelFormat::Rgba16f),
                AttachmentDesc::new("normal", PixelFormat::Rgba16f),
            ],
            depth: Some(AttachmentDesc::new("depth", PixelFormat::Depth32f)),
        }
    }

    pub fn alpha() -> Self {
        Self {
            name: "alpha",
            colours: vec![
                AttachmentDesc::new("accumulation", PixelFormat::Rgba16f),
                AttachmentDesc::new("revealage", PixelFormat::R8),
            ],
            depth: None,
        }
    }

    pub fn post() -> Self {
        Self {
            name: "post-process",
            colours: vec![AttachmentDesc::new("composite", PixelFormat::Rgba16f)],
            depth: None,
        }
    }

    /// Every layout the renderer allocates.
    pub fn built_in() -> [Self; 5] {
        [
            Self::gbuffer(),
            Self::lbuffer(),
            Self::forward(),
            Self::alpha(),
            Self::post(),
        ]
    }

    pub fn validate(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::incomplete(
                self.name,
                format!("zero-sized attachments ({width}x{height})"),
            ));
        }
        self.validate_formats()
    }

    /// Size-independent checks, run before any pipeline targets the layout.
    pub fn validate_formats(&self) -> Result<()> {
        let fail = |reason: String| Err(RenderError::incomplete(self.name, reason));

        if self.colours.is_empty() && self.depth.is_none() {
            return fail("no attachments".to_string());
        }
        if self.colours.len() > MAX_COLOUR_ATTACHMENTS {
            return fail(format!(
                "{} colour attachments, at most {} are supported",
                self.colours.len(),
                MAX_COLOUR_ATTACHMENTS
            ));
        }
        if let Some(colour) = self.colours.iter().find(|a| a.format.is_depth()) {
            return fail(format!("colour attachment `{}` uses a depth format", colour.name));
        }
        if let Some(depth) = self.depth.filter(|d| !d.format.is_depth()) {
            return fail(format!("depth attachment `{}` uses a colour format", depth.name));
        }

        let mut names: Vec<&str> = self.attachments().map(|a| a.name).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return fail(format!("duplicate attachment name `{}`", pair[0]));
        }

        let bytes = self.colour_bytes_per_sample()?;
        if bytes > MAX_COLOUR_BYTES_PER_SAMPLE {
            return fail(format!(
                "{bytes} colour bytes per sample exceed the limit of {MAX_COLOUR_BYTES_PER_SAMPLE}"
            ));
        }

        Ok(())
    }

    /// Colour bytes per sample as wgpu counts them: each attachment's
    /// target cost, placed at its component alignment.
    pub fn colour_bytes_per_sample(&self) -> Result<u32> {
        self.colours.iter().try_fold(0, |total: u32, attachment| -> Result<u32> {
            let (cost, alignment) = attachment.format.target_cost().ok_or_else(|| {
                RenderError::incomplete(
                    self.name,
                    format!("`{}` cannot be rendered to", attachment.name),
                )
            })?;
            Ok(total.next_multiple_of(alignment) + cost)
        })
    }

    pub fn attachments(&self) -> impl Iterator<Item = &AttachmentDesc> {
        self.colours.iter().chain(self.depth.iter())
    }
}

pub struct Attachment {
    pub desc: AttachmentDesc,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Render targets allocated from a validated layout.
pub struct Framebuffer {
    layout: FramebufferLayout,
    colours: Vec<Attachment>,
    depth: Option<Attachment>,
    size: (u32, u32),
}

impl Framebuffer {
    pub fn new(device: &wgpu::Device, layout: FramebufferLayout, width: u32, height: u32) -> Result<Self> {
        layout.validate(width, height)?;

        let allocate = |desc: &AttachmentDesc| {
            let label = format!("{} {}", layout.name, desc.name);
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: desc.format.to_wgpu(),
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            Attachment {
                desc: *desc,
                texture,
                view,
            }
        };

        let colours = layout.colours.iter().map(allocate).collect();
        let depth = layout.depth.as_ref().map(allocate);

        log::debug!("Allocated {} framebuffer at {}x{}", layout.name, width, height);

        Ok(Self {
            layout,
            colours,
            depth,
            size: (width, height),
        })
    }

    pub fn name(&self) -> &'static str {
        self.layout.name
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn colours(&self) -> &[Attachment] {
        &self.colours
    }

    pub fn depth(&self) -> Option<&Attachment> {
        self.depth.as_ref()
    }

    /// Colour or depth attachment by name. Names come from the fixed
    /// layouts, so a miss is a programming error.
    pub fn attachment(&self, name: &str) -> &Attachment {
        match self
            .colours
            .iter()
            .chain(self.depth.iter())
            .find(|a| a.desc.name == name)
        {
            Some(attachment) => attachment,
            None => panic!("{} framebuffer has no `{}` attachment", self.layout.name, name),
        }
    }

    pub fn view(&self, name: &str) -> &wgpu::TextureView {
        &self.attachment(name).view
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.size.0,
            height: self.size.1,
            depth_or_array_layers: 1,
        }
    }

    /// Colour attachments that load their previous contents.
    pub fn load_attachments(&self) -> Vec<Option<wgpu::RenderPassColorAttachment<'_>>> {
        self.colour_attachments(|_| wgpu::LoadOp::Load)
    }

    /// Colour attachments cleared with a per-attachment colour.
    pub fn colour_attachments(
        &self,
        clear: impl Fn(&AttachmentDesc) -> wgpu::LoadOp<wgpu::Color>,
    ) -> Vec<Option<wgpu::RenderPassColorAttachment<'_>>> {
        self.colours
            .iter()
            .map(|attachment| {
                Some(wgpu::RenderPassColorAttachment {
                    view: &attachment.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: clear(&attachment.desc),
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect()
    }

    pub fn formats(&self) -> Vec<wgpu::TextureFormat> {
        self.layout.colours.iter().map(|a| a.format.to_wgpu()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_layouts_are_complete() {
        for layout in FramebufferLayout::built_in() {
            assert!(layout.validate(1280, 720).is_ok(), "{}", layout.name);
        }
    }

    #[test]
    fn gbuffer_fits_the_default_colour_budget() {
        let gbuffer = FramebufferLayout::gbuffer();
        assert_eq!(gbuffer.colours.len(), 4);
        assert_eq!(gbuffer.colour_bytes_per_sample().unwrap(), 32);
        assert_eq!(
            MAX_COLOUR_BYTES_PER_SAMPLE,
            wgpu::Limits::default().max_color_attachment_bytes_per_sample
        );
    }

    #[test]
    fn eight_bit_targets_cost_eight_bytes() {
        // Two half-float and two 8-bit targets plus an r16f: 8+8+8+8+2.
        let layout = FramebufferLayout {
            name: "wide G-buffer",
            colours: vec![
                AttachmentDesc::new("position", PixelFormat::Rgba16f),
                AttachmentDesc::new("normal", PixelFormat::Rgba16f),
                AttachmentDesc::new("diffuse", PixelFormat::Rgba8),
                AttachmentDesc::new("specular", PixelFormat::Rgba8),
                AttachmentDesc::new("gloss", PixelFormat::R16f),
            ],
            depth: None,
        };
        assert_eq!(layout.colour_bytes_per_sample().unwrap(), 34);
        let err = layout.validate(1280, 720).unwrap_err();
        assert!(err.to_string().contains("34 colour bytes"), "{err}");
    }

    #[test]
    fn attachments_start_at_their_alignment() {
        // r8 ends at byte 1; r32f is 4-byte aligned so it starts at 4.
        let layout = FramebufferLayout {
            name: "aligned",
            colours: vec![
                AttachmentDesc::new("mask", PixelFormat::R8),
                AttachmentDesc::new("depth", PixelFormat::R32f),
            ],
            depth: None,
        };
        assert_eq!(layout.colour_bytes_per_sample().unwrap(), 8);
    }

    #[test]
    fn zero_size_is_incomplete() {
        let err = FramebufferLayout::gbuffer().validate(0, 720).unwrap_err();
        assert!(matches!(
            err,
            RenderError::IncompleteFramebuffer { framebuffer: "G-buffer", .. }
        ));
    }

    #[test]
    fn misplaced_formats_are_incomplete() {
        let mut layout = FramebufferLayout::lbuffer();
        layout.colours.push(AttachmentDesc::new("depth", PixelFormat::Depth32f));
        assert!(layout.validate(4, 4).is_err());

        let mut layout = FramebufferLayout::lbuffer();
        layout.depth = Some(AttachmentDesc::new("depth", PixelFormat::Rgba8));
        assert!(layout.validate(4, 4).is_err());
    }

    #[test]
    fn duplicate_names_and_empty_layouts_are_incomplete() {
        let mut layout = FramebufferLayout::alpha();
        layout.colours[1].name = "accumulation";
        let err = layout.validate(4, 4).unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let empty = FramebufferLayout {
            name: "empty",
            colours: Vec::new(),
            depth: None,
        };
        assert!(empty.validate(4, 4).is_err());
    }

    #[test]
    fn too_many_or_too_wide_attachments_are_incomplete() {
        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
        let layout = FramebufferLayout {
            name: "wide",
            colours: names.iter().map(|&n| AttachmentDesc::new(n, PixelFormat::R8)).collect(),
            depth: None,
        };
        assert!(layout.validate(4, 4).is_err());

        let layout = FramebufferLayout {
            name: "fat",
            colours: vec![
                AttachmentDesc::new("a", PixelFormat::Rgba32f),
                AttachmentDesc::new("b", PixelFormat::Rgba32f),
                AttachmentDesc::new("c", PixelFormat::R8),
            ],
            depth: None,
        };
        assert!(layout.validate(4, 4).is_err());
    }

    #[test]
    fn pixel_formats_map_to_wgpu() {
        assert_eq!(PixelFormat::Depth32f.to_wgpu(), wgpu::TextureFormat::Depth32Float);
        assert_eq!(PixelFormat::R16f.to_wgpu(), wgpu::TextureFormat::R16Float);
        assert!(PixelFormat::Depth32f.is_depth());
        assert!(!PixelFormat::Rgba16f.is_depth());
        assert_eq!(PixelFormat::Rgba16f.bytes_per_pixel(), 8);
    }
}
