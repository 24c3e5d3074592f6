//! JPEG XL detection. This build carries no JPEG XL decoder.

use crate::codec::ImageCodec;
use crate::decoded::DecodedImage;
use crate::error::CodecError;
use crate::options::LoadOptions;
use crate::stream::{ImageStream, peek};

const CODESTREAM: [u8; 2] = [0xff, 0x0a];
const CONTAINER: [u8; 12] = [0, 0, 0, 0x0c, b'J', b'X', b'L', b' ', 0x0d, 0x0a, 0x87, 0x0a];

pub struct JxlCodec;

impl ImageCodec for JxlCodec {
    fn id(&self) -> &'static str {
        "jxl"
    }

    fn display_name(&self) -> &'static str {
        "JPEG XL"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["jxl"]
    }

    fn detect(&self, stream: &mut dyn ImageStream) -> bool {
        let head = peek(stream, CONTAINER.len());
        head.starts_with(&CODESTREAM) || head.starts_with(&CONTAINER)
    }

    fn decode(
        &self,
        _stream: &mut dyn ImageStream,
        filename: &str,
        _options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        Err(CodecError::unsupported(format!(
            "{} is JPEG XL, which this build cannot decode",
            filename
        )))
    }
}
