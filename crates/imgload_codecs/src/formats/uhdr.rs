//! Ultra HDR: JPEG carrying a gain map for HDR reconstruction.
//!
//! Detection looks for the gain map XMP namespace in the leading segments.
//! Only the SDR base rendition is decoded; the gain map itself is reported in
//! the image metadata.

use crate::codec::ImageCodec;
use crate::decoded::DecodedImage;
use crate::error::CodecError;
use crate::formats::jpeg::{decode_jpeg, is_jpeg};
use crate::formats::{apply_selector, read_payload};
use crate::options::LoadOptions;
use crate::stream::{ImageStream, peek};

const SCAN_LEN: usize = 64 * 1024;
const GAIN_MAP_MARKERS: [&[u8]; 2] = [b"hdrgm:", b"http://ns.adobe.com/hdr-gain-map/"];

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

pub struct UhdrCodec;

impl ImageCodec for UhdrCodec {
    fn id(&self) -> &'static str {
        "uhdr"
    }

    fn display_name(&self) -> &'static str {
        "Ultra HDR JPEG"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["jpg", "jpeg"]
    }

    fn detect(&self, stream: &mut dyn ImageStream) -> bool {
        let head = peek(stream, SCAN_LEN);
        is_jpeg(&head) && GAIN_MAP_MARKERS.iter().any(|m| contains(&head, m))
    }

    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        filename: &str,
        options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        let bytes = read_payload(stream)?;
        let image = decode_jpeg(&bytes)?.with_metadata("gain map", "present, not applied");
        log::warn!("{}: Ultra HDR gain map ignored, showing SDR base image", filename);
        apply_selector(vec![image], options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn with_xmp(xmp: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xff, 0xd8, 0xff, 0xe1];
        let len = (xmp.len() + 2) as u16;
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(xmp);
        bytes
    }

    #[test]
    fn test_detects_gain_map_namespace() {
        let mut stream = Cursor::new(with_xmp(b"<x:xmpmeta hdrgm:Version=\"1.0\"/>"));
        assert!(UhdrCodec.detect(&mut stream));
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_plain_jpeg_is_not_uhdr() {
        let mut stream = Cursor::new(with_xmp(b"<x:xmpmeta dc:title=\"plain\"/>"));
        assert!(!UhdrCodec.detect(&mut stream));
    }

    #[test]
    fn test_marker_without_soi() {
        let mut stream = Cursor::new(b"hdrgm:Version".to_vec());
        assert!(!UhdrCodec.detect(&mut stream));
    }
}
