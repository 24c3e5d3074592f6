//! Portable Float Map.
//!
//! Text header `PF` (RGB), `Pf` (grayscale) or `PF4` (RGBA), then width,
//! height and a scale whose sign selects the byte order (negative means
//! little-endian). Rows are stored bottom to top.

use crate::codec::ImageCodec;
use crate::decoded::{Channel, DecodedImage};
use crate::error::CodecError;
use crate::formats::{apply_selector, read_payload};
use crate::options::{LoadOptions, TransferFunction};
use crate::stream::{ImageStream, peek};

struct PfmHeader {
    names: &'static [&'static str],
    width: usize,
    height: usize,
    little_endian: bool,
    data_offset: usize,
}

fn magic_channels(magic: &[u8]) -> Option<&'static [&'static str]> {
    match magic {
        b"PF" => Some(&["R", "G", "B"]),
        b"Pf" => Some(&["Y"]),
        b"PF4" => Some(&["R", "G", "B", "A"]),
        _ => None,
    }
}

/// Split off the next whitespace-delimited token, returning it and the offset after it.
fn next_token(bytes: &[u8], from: usize) -> Option<(&[u8], usize)> {
    let start = from + bytes.get(from..)?.iter().position(|b| !b.is_ascii_whitespace())?;
    let len = bytes[start..]
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(bytes.len() - start);
    Some((&bytes[start..start + len], start + len))
}

fn parse_number<T: std::str::FromStr>(token: &[u8]) -> Result<T, CodecError> {
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            CodecError::malformed(format!("bad PFM header field '{}'", String::from_utf8_lossy(token)))
        })
}

impl PfmHeader {
    fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let truncated = || CodecError::malformed("PFM header is truncated");

        let (magic, pos) = next_token(bytes, 0).ok_or_else(truncated)?;
        let names = magic_channels(magic).ok_or_else(|| CodecError::malformed("not a PFM file"))?;
        let (w, pos) = next_token(bytes, pos).ok_or_else(truncated)?;
        let (h, pos) = next_token(bytes, pos).ok_or_else(truncated)?;
        let (scale, pos) = next_token(bytes, pos).ok_or_else(truncated)?;

        let width: usize = parse_number(w)?;
        let height: usize = parse_number(h)?;
        let scale: f32 = parse_number(scale)?;
        if width == 0 || height == 0 {
            return Err(CodecError::malformed("PFM image has zero size"));
        }

        Ok(Self {
            names,
            width,
            height,
            little_endian: scale < 0.0,
            // A single whitespace byte separates the header from the samples.
            data_offset: pos + 1,
        })
    }
}

pub struct PfmCodec;

impl ImageCodec for PfmCodec {
    fn id(&self) -> &'static str {
        "pfm"
    }

    fn display_name(&self) -> &'static str {
        "Portable Float Map"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["pfm"]
    }

    fn detect(&self, stream: &mut dyn ImageStream) -> bool {
        let head = peek(stream, 4);
        let magic_len = match head.get(..3) {
            Some(b"PF4") => 3,
            _ => 2,
        };
        head.len() > magic_len
            && magic_channels(&head[..magic_len]).is_some()
            && head[magic_len].is_ascii_whitespace()
    }

    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        filename: &str,
        options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        let bytes = read_payload(stream)?;
        let header = PfmHeader::parse(&bytes)?;
        let n = header.names.len();
        let truncated = || CodecError::malformed(format!("{}: PFM data is truncated", filename));
        let row_len = header.width.checked_mul(n).ok_or_else(truncated)?;
        let expected = row_len
            .checked_mul(header.height)
            .and_then(|len| len.checked_mul(4))
            .ok_or_else(truncated)?;
        let end = header.data_offset.checked_add(expected).ok_or_else(truncated)?;

        // Sizes are bounded by the payload from here on.
        let data = bytes.get(header.data_offset..end).ok_or_else(truncated)?;

        let mut planes = vec![Vec::with_capacity(header.width * header.height); n];
        // Bottom row first in the file; emit top row first.
        for row in data.chunks_exact(row_len * 4).rev() {
            for (i, sample) in row.chunks_exact(4).enumerate() {
                let raw = [sample[0], sample[1], sample[2], sample[3]];
                let value = if header.little_endian {
                    f32::from_le_bytes(raw)
                } else {
                    f32::from_be_bytes(raw)
                };
                planes[i % n].push(value);
            }
        }

        let channels: Vec<Channel> = header
            .names
            .iter()
            .zip(planes)
            .filter_map(|(name, samples)| {
                Channel::from_samples(*name, header.width, header.height, samples)
            })
            .collect();

        let image = DecodedImage::new(header.width, header.height, channels, TransferFunction::Linear);
        apply_selector(vec![image], options)
    }
}
