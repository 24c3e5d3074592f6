//! DirectDraw Surface reader for uncompressed surfaces.
//!
//! Handles legacy bitmask layouts, the D3D9 float FourCCs and the common
//! uncompressed DXGI formats behind a DX10 header. Every array slice and cube
//! face becomes its own image; mip levels below the top one are skipped.

use crate::codec::ImageCodec;
use crate::decoded::{Channel, DecodedImage};
use crate::error::CodecError;
use crate::formats::{apply_selector, read_payload};
use crate::options::{LoadOptions, TransferFunction};
use crate::stream::{ImageStream, peek};

const MAGIC: &[u8; 4] = b"DDS ";
const HEADER_END: usize = 128;
const DX10_HEADER_END: usize = 148;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_ALPHA: u32 = 0x2;
const DDPF_FOURCC: u32 = 0x4;
const DDPF_RGB: u32 = 0x40;
const DDPF_LUMINANCE: u32 = 0x2_0000;

const DDSCAPS2_CUBEMAP: u32 = 0x200;
const DDSCAPS2_VOLUME: u32 = 0x20_0000;
const DX10_MISC_TEXTURECUBE: u32 = 0x4;

const CUBE_FACE_NAMES: [&str; 6] = ["+X", "-X", "+Y", "-Y", "+Z", "-Z"];

fn u32_at(bytes: &[u8], offset: usize) -> Result<u32, CodecError> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| CodecError::malformed("DDS header is truncated"))
}

fn half_to_f32(bits: u16) -> f32 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = ((bits >> 10) & 0x1f) as i32;
    let mantissa = (bits & 0x3ff) as f32;
    match exponent {
        0 => sign * mantissa * 2f32.powi(-24),
        31 if mantissa == 0.0 => sign * f32::INFINITY,
        31 => f32::NAN,
        e => sign * (1.0 + mantissa / 1024.0) * 2f32.powi(e - 15),
    }
}

/// How one pixel is laid out in memory.
#[derive(Debug, Clone, PartialEq)]
enum PixelLayout {
    /// Integer pixel of `bytes` bytes with one bit mask per channel.
    Masked {
        bytes: usize,
        channels: Vec<(&'static str, u32)>,
    },
    Float32(&'static [&'static str]),
    Float16(&'static [&'static str]),
    /// Four 8-bit unorm components, stored RGBA or BGRA.
    Unorm8 { bgra: bool },
}

impl PixelLayout {
    fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelLayout::Masked { bytes, .. } => *bytes,
            PixelLayout::Float32(names) => names.len() * 4,
            PixelLayout::Float16(names) => names.len() * 2,
            PixelLayout::Unorm8 { .. } => 4,
        }
    }

    fn channel_names(&self) -> Vec<&'static str> {
        match self {
            PixelLayout::Masked { channels, .. } => channels.iter().map(|(n, _)| *n).collect(),
            PixelLayout::Float32(names) | PixelLayout::Float16(names) => names.to_vec(),
            PixelLayout::Unorm8 { .. } => vec!["R", "G", "B", "A"],
        }
    }

    fn decode_pixel(&self, px: &[u8], out: &mut [f32]) {
        match self {
            PixelLayout::Masked { channels, .. } => {
                let mut raw = [0u8; 4];
                raw[..px.len()].copy_from_slice(px);
                let value = u32::from_le_bytes(raw);
                for (slot, (_, mask)) in out.iter_mut().zip(channels) {
                    let shift = mask.trailing_zeros();
                    let max = (mask >> shift) as f32;
                    *slot = ((value & mask) >> shift) as f32 / max;
                }
            }
            PixelLayout::Float32(_) => {
                for (slot, b) in out.iter_mut().zip(px.chunks_exact(4)) {
                    *slot = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                }
            }
            PixelLayout::Float16(_) => {
                for (slot, b) in out.iter_mut().zip(px.chunks_exact(2)) {
                    *slot = half_to_f32(u16::from_le_bytes([b[0], b[1]]));
                }
            }
            PixelLayout::Unorm8 { bgra } => {
                let order = if *bgra { [2, 1, 0, 3] } else { [0, 1, 2, 3] };
                for (slot, &src) in out.iter_mut().zip(&order) {
                    *slot = px[src] as f32 / 255.0;
                }
            }
        }
    }
}

/// The parts of the DDS headers needed to locate and interpret surfaces.
#[derive(Debug)]
struct DdsHeader {
    width: usize,
    height: usize,
    mip_count: usize,
    layout: PixelLayout,
    srgb: bool,
    cube_faces: usize,
    array_size: usize,
    data_offset: usize,
}

impl DdsHeader {
    fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_END || &bytes[..4] != MAGIC {
            return Err(CodecError::malformed("missing DDS header"));
        }
        // Offsets below are relative to the file; the 124-byte header starts at 4.
        let height = u32_at(bytes, 12)? as usize;
        let width = u32_at(bytes, 16)? as usize;
        let mip_count = u32_at(bytes, 28)? as usize;
        let pf_flags = u32_at(bytes, 80)?;
        let four_cc = u32_at(bytes, 84)?;
        let bit_count = u32_at(bytes, 88)?;
        let masks = [
            u32_at(bytes, 92)?,
            u32_at(bytes, 96)?,
            u32_at(bytes, 100)?,
            u32_at(bytes, 104)?,
        ];
        let caps2 = u32_at(bytes, 112)?;

        if width == 0 || height == 0 {
            return Err(CodecError::malformed("DDS surface has zero size"));
        }
        // No chain can be longer than the halvings of the larger side.
        let max_levels = (usize::BITS - width.max(height).leading_zeros()) as usize;
        let mip_count = mip_count.clamp(1, max_levels);
        if caps2 & DDSCAPS2_VOLUME != 0 {
            return Err(CodecError::unsupported("volume textures"));
        }

        if pf_flags & DDPF_FOURCC != 0 && &four_cc.to_le_bytes() == b"DX10" {
            let dxgi_format = u32_at(bytes, 128)?;
            let misc_flag = u32_at(bytes, 136)?;
            let array_size = (u32_at(bytes, 140)? as usize).max(1);
            let (layout, srgb) = dxgi_layout(dxgi_format)?;
            let cube_faces = if misc_flag & DX10_MISC_TEXTURECUBE != 0 { 6 } else { 1 };
            return Ok(Self {
                width,
                height,
                mip_count,
                layout,
                srgb,
                cube_faces,
                array_size,
                data_offset: DX10_HEADER_END,
            });
        }

        let layout = if pf_flags & DDPF_FOURCC != 0 {
            match four_cc {
                113 => PixelLayout::Float16(&["R", "G", "B", "A"]),
                114 => PixelLayout::Float32(&["R"]),
                116 => PixelLayout::Float32(&["R", "G", "B", "A"]),
                other => {
                    let code = other.to_le_bytes();
                    return Err(CodecError::unsupported(format!(
                        "DDS FourCC '{}'",
                        String::from_utf8_lossy(&code)
                    )));
                }
            }
        } else {
            masked_layout(pf_flags, bit_count, masks)?
        };

        // Legacy cube maps flag each present face separately.
        let cube_faces = if caps2 & DDSCAPS2_CUBEMAP != 0 {
            ((caps2 >> 10) & 0x3f).count_ones().max(1) as usize
        } else {
            1
        };

        Ok(Self {
            width,
            height,
            mip_count,
            layout,
            srgb: false,
            cube_faces,
            array_size: 1,
            data_offset: HEADER_END,
        })
    }

    fn is_cube(&self) -> bool {
        self.cube_faces > 1
    }

    fn surface_count(&self) -> usize {
        self.cube_faces.saturating_mul(self.array_size)
    }

    /// Bytes of the top mip level of one surface.
    fn top_level_size(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.layout.bytes_per_pixel())
    }

    /// Bytes occupied by one surface including its mip chain.
    fn surface_stride(&self) -> Option<usize> {
        let bpp = self.layout.bytes_per_pixel();
        (0..self.mip_count).try_fold(0usize, |total, level| {
            let w = (self.width >> level).max(1);
            let h = (self.height >> level).max(1);
            total.checked_add(w.checked_mul(h)?.checked_mul(bpp)?)
        })
    }

    /// Stride and top-level size, checked against the payload length.
    ///
    /// Every surface's top level must lie inside the file; trailing mips of the
    /// last surface may be missing.
    fn validated_sizes(&self, payload_len: usize) -> Result<(usize, usize), CodecError> {
        let too_large = || {
            CodecError::malformed(format!(
                "DDS header declares {} surface(s) of {}x{}, more than the {} byte file holds",
                self.surface_count(),
                self.width,
                self.height,
                payload_len
            ))
        };
        let stride = self.surface_stride().ok_or_else(too_large)?;
        let top_level = self.top_level_size().ok_or_else(too_large)?;
        let end = (self.surface_count() - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_add(top_level))
            .and_then(|n| n.checked_add(self.data_offset))
            .ok_or_else(too_large)?;
        if end > payload_len {
            return Err(too_large());
        }
        Ok((stride, top_level))
    }

    fn surface_name(&self, index: usize) -> Option<String> {
        if self.surface_count() <= 1 {
            return None;
        }
        if self.is_cube() {
            let face = CUBE_FACE_NAMES[index % 6];
            if self.array_size > 1 {
                Some(format!("{}.{}", index / 6, face))
            } else {
                Some(face.to_string())
            }
        } else {
            Some(index.to_string())
        }
    }
}

fn masked_layout(flags: u32, bit_count: u32, masks: [u32; 4]) -> Result<PixelLayout, CodecError> {
    let bytes = match bit_count {
        8 | 16 | 24 | 32 => (bit_count / 8) as usize,
        other => return Err(CodecError::unsupported(format!("{}-bit DDS pixels", other))),
    };
    let [r, g, b, a] = masks;
    let mut channels = Vec::new();
    if flags & DDPF_RGB != 0 {
        channels.extend([("R", r), ("G", g), ("B", b)]);
    } else if flags & DDPF_LUMINANCE != 0 {
        channels.push(("Y", r));
    }
    if flags & (DDPF_ALPHAPIXELS | DDPF_ALPHA) != 0 {
        channels.push(("A", a));
    }
    channels.retain(|(_, mask)| *mask != 0);
    if channels.is_empty() {
        return Err(CodecError::unsupported("DDS pixel format without channel masks"));
    }
    Ok(PixelLayout::Masked { bytes, channels })
}

fn dxgi_layout(format: u32) -> Result<(PixelLayout, bool), CodecError> {
    let layout = match format {
        2 => (PixelLayout::Float32(&["R", "G", "B", "A"]), false),
        6 => (PixelLayout::Float32(&["R", "G", "B"]), false),
        10 => (PixelLayout::Float16(&["R", "G", "B", "A"]), false),
        16 => (PixelLayout::Float32(&["R", "G"]), false),
        28 => (PixelLayout::Unorm8 { bgra: false }, false),
        29 => (PixelLayout::Unorm8 { bgra: false }, true),
        41 => (PixelLayout::Float32(&["R"]), false),
        54 => (PixelLayout::Float16(&["R"]), false),
        87 => (PixelLayout::Unorm8 { bgra: true }, false),
        91 => (PixelLayout::Unorm8 { bgra: true }, true),
        other => {
            return Err(CodecError::unsupported(format!("DXGI format {}", other)));
        }
    };
    Ok(layout)
}

fn decode_surface(
    data: &[u8],
    header: &DdsHeader,
    names: &[&'static str],
) -> Vec<Channel> {
    let pixel_count = header.width * header.height;
    let bpp = header.layout.bytes_per_pixel();
    let mut planes: Vec<Vec<f32>> = vec![Vec::with_capacity(pixel_count); names.len()];
    let mut pixel = vec![0.0f32; names.len()];

    for px in data.chunks_exact(bpp).take(pixel_count) {
        header.layout.decode_pixel(px, &mut pixel);
        for (plane, value) in planes.iter_mut().zip(&pixel) {
            plane.push(*value);
        }
    }

    names
        .iter()
        .zip(planes)
        .filter_map(|(name, samples)| {
            Channel::from_samples(*name, header.width, header.height, samples)
        })
        .collect()
}

pub struct DdsCodec;

impl ImageCodec for DdsCodec {
    fn id(&self) -> &'static str {
        "dds"
    }

    fn display_name(&self) -> &'static str {
        "DirectDraw Surface"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["dds"]
    }

    fn detect(&self, stream: &mut dyn ImageStream) -> bool {
        let head = peek(stream, 8);
        // Magic followed by the fixed header size field (124).
        head.len() == 8 && &head[..4] == MAGIC && head[4..8] == 124u32.to_le_bytes()
    }

    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        filename: &str,
        options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        let bytes = read_payload(stream)?;
        let header = DdsHeader::parse(&bytes)?;
        log::debug!(
            "DDS {}: {}x{}, {} surface(s), {:?}",
            filename,
            header.width,
            header.height,
            header.surface_count(),
            header.layout
        );

        let (stride, top_level) = header.validated_sizes(bytes.len())?;
        let names = header.layout.channel_names();
        let tf = if header.srgb {
            TransferFunction::Srgb
        } else {
            TransferFunction::Linear
        };

        let mut images = Vec::with_capacity(header.surface_count());
        for index in 0..header.surface_count() {
            let start = header.data_offset + index * stride;
            let Some(data) = bytes.get(start..start + top_level) else {
                return Err(CodecError::malformed(format!(
                    "DDS surface {} extends past end of file",
                    index
                )));
            };

            let channels = decode_surface(data, &header, &names);
            let mut image = DecodedImage::new(header.width, header.height, channels, tf);
            if let Some(name) = header.surface_name(index) {
                image = image.with_partname(name);
            }
            images.push(image);
        }

        apply_selector(images, options)
    }
}
