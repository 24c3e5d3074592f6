//! Decoded image representation shared by every codec.

use std::time::SystemTime;

use ndarray::Array2;
use serde_json::{Map, Value};

use crate::options::TransferFunction;

/// One named plane of pixel values, stored row-major as `(height, width)`.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub data: Array2<f32>,
}

impl Channel {
    pub fn new(name: impl Into<String>, data: Array2<f32>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Build a channel from row-major samples. Returns `None` if the sample
    /// count does not match `width * height`.
    pub fn from_samples(
        name: impl Into<String>,
        width: usize,
        height: usize,
        samples: Vec<f32>,
    ) -> Option<Self> {
        Array2::from_shape_vec((height, width), samples)
            .ok()
            .map(|data| Self::new(name, data))
    }

    /// Alpha channels are named `A` or end in `.A`.
    pub fn is_alpha(&self) -> bool {
        self.name == "A" || self.name.ends_with(".A")
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// An image produced by a codec and finalized by the loading pipeline.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixel planes, all of the same size.
    pub channels: Vec<Channel>,
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
    /// Source name the image was loaded from (may be a compound archive name).
    pub filename: String,
    /// Name of the part/frame/face for multi-part sources.
    pub partname: Option<String>,
    /// Selector that reproduces this image when the source is reloaded.
    pub channel_selector: String,
    /// Transfer function the stored values were encoded with.
    pub transfer_function: TransferFunction,
    /// Exponent for [`TransferFunction::Gamma`].
    pub gamma: f32,
    /// Modification time of the backing file, or load time for buffers.
    pub last_modified: SystemTime,
    /// Free-form metadata reported by the codec.
    pub metadata: Map<String, Value>,
}

impl DecodedImage {
    /// Create an image with the given planes and the codec's default transfer function.
    pub fn new(width: usize, height: usize, channels: Vec<Channel>, tf: TransferFunction) -> Self {
        Self {
            channels,
            width,
            height,
            filename: String::new(),
            partname: None,
            channel_selector: String::new(),
            transfer_function: tf,
            gamma: 2.2,
            last_modified: SystemTime::now(),
            metadata: Map::new(),
        }
    }

    pub fn with_partname(mut self, partname: impl Into<String>) -> Self {
        self.partname = Some(partname.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// `filename`, or `filename:partname` for multi-part sources.
    pub fn file_and_partname(&self) -> String {
        match &self.partname {
            Some(part) if !part.is_empty() => format!("{}:{}", self.filename, part),
            _ => self.filename.clone(),
        }
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }
}
