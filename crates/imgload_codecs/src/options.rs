//! Caller-supplied options that steer decoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Transfer function used to encode the pixel values of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferFunction {
    /// Not specified: infer from the file format.
    #[default]
    Unspecified,
    /// Linear values.
    Linear,
    /// Pure power law; the exponent is carried alongside.
    Gamma,
    /// sRGB IEC 61966-2.1.
    Srgb,
    /// ITU-R BT.709 / BT.2020.
    Itu,
    /// BT.2100 perceptual quantizer.
    Bt2100Pq,
    /// BT.2100 hybrid log-gamma.
    Bt2100Hlg,
    /// SMPTE ST 240.
    St240,
    /// xvYCC IEC 61966-2-4.
    XvYcc,
    /// DCI-P3 (pure 2.6 gamma).
    DciP3,
}

impl TransferFunction {
    /// All concrete transfer functions, in menu order.
    pub fn all() -> &'static [TransferFunction] {
        &[
            TransferFunction::Linear,
            TransferFunction::Gamma,
            TransferFunction::Srgb,
            TransferFunction::Itu,
            TransferFunction::Bt2100Pq,
            TransferFunction::Bt2100Hlg,
            TransferFunction::St240,
            TransferFunction::XvYcc,
            TransferFunction::DciP3,
        ]
    }

    /// Short identifier, also accepted by [`FromStr`].
    pub fn id(&self) -> &'static str {
        match self {
            TransferFunction::Unspecified => "unspecified",
            TransferFunction::Linear => "linear",
            TransferFunction::Gamma => "gamma",
            TransferFunction::Srgb => "srgb",
            TransferFunction::Itu => "itu",
            TransferFunction::Bt2100Pq => "pq",
            TransferFunction::Bt2100Hlg => "hlg",
            TransferFunction::St240 => "st240",
            TransferFunction::XvYcc => "iec61966-2-4",
            TransferFunction::DciP3 => "dci-p3",
        }
    }

    /// Human-readable name; `gamma` is only used for [`TransferFunction::Gamma`].
    pub fn name(&self, gamma: f32) -> String {
        match self {
            TransferFunction::Unspecified => "Unspecified".to_string(),
            TransferFunction::Linear => "Linear".to_string(),
            TransferFunction::Gamma => format!("Gamma {:.3}", gamma),
            TransferFunction::Srgb => "sRGB IEC61966-2.1".to_string(),
            TransferFunction::Itu => "ITU BT.709/BT.2020".to_string(),
            TransferFunction::Bt2100Pq => "BT.2100 PQ".to_string(),
            TransferFunction::Bt2100Hlg => "BT.2100 HLG".to_string(),
            TransferFunction::St240 => "SMPTE ST 240".to_string(),
            TransferFunction::XvYcc => "xvYCC IEC61966-2-4".to_string(),
            TransferFunction::DciP3 => "DCI-P3".to_string(),
        }
    }
}

impl fmt::Display for TransferFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TransferFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        std::iter::once(TransferFunction::Unspecified)
            .chain(TransferFunction::all().iter().copied())
            .find(|tf| tf.id() == lower)
            .ok_or_else(|| format!("unknown transfer function '{}'", s))
    }
}

fn default_gamma() -> f32 {
    2.2
}

/// Options applied to a single load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Comma-separated `include,-exclude` pattern over part/channel names.
    #[serde(default)]
    pub channel_selector: String,

    /// Override for the file's transfer function.
    #[serde(default)]
    pub transfer_function: TransferFunction,

    /// Exponent used when `transfer_function` is [`TransferFunction::Gamma`].
    #[serde(default = "default_gamma")]
    pub gamma: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            channel_selector: String::new(),
            transfer_function: TransferFunction::Unspecified,
            gamma: default_gamma(),
        }
    }
}

impl LoadOptions {
    /// Options that only restrict which parts/channels are loaded.
    pub fn with_channel_selector(selector: impl Into<String>) -> Self {
        Self {
            channel_selector: selector.into(),
            ..Self::default()
        }
    }

    /// Force a transfer function instead of the one the file declares.
    pub fn transfer_function(mut self, tf: TransferFunction, gamma: f32) -> Self {
        self.transfer_function = tf;
        self.gamma = gamma;
        self
    }

    /// Build the filter for `channel_selector`.
    pub fn filter(&self) -> ChannelFilter {
        ChannelFilter::new(&self.channel_selector)
    }
}

/// Include/exclude filter built from a channel selector string.
///
/// Tokens are comma-separated and trimmed. Tokens prefixed with `-` exclude,
/// all others include. Matching is a case-insensitive substring test.
#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl ChannelFilter {
    pub fn new(selector: &str) -> Self {
        let mut filter = Self::default();
        for token in selector.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.strip_prefix('-') {
                Some(rest) if !rest.is_empty() => filter.exclude.push(rest.to_lowercase()),
                Some(_) => {}
                None => filter.include.push(token.to_lowercase()),
            }
        }
        filter
    }

    /// True when the selector had no usable tokens.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn passes(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        if self.exclude.iter().any(|e| lower.contains(e.as_str())) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|i| lower.contains(i.as_str()))
    }
}
