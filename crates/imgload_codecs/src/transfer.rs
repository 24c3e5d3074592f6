//! Conversion of encoded pixel values to linear light.

use crate::decoded::Channel;
use crate::options::TransferFunction;

fn signed(v: f32, f: impl Fn(f32) -> f32) -> f32 {
    if v < 0.0 { -f(-v) } else { f(v) }
}

fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn itu_to_linear(v: f32) -> f32 {
    if v < 0.081 {
        v / 4.5
    } else {
        ((v + 0.099) / 1.099).powf(1.0 / 0.45)
    }
}

fn st240_to_linear(v: f32) -> f32 {
    if v < 0.0913 {
        v / 4.0
    } else {
        ((v + 0.1115) / 1.1115).powf(1.0 / 0.45)
    }
}

/// ST 2084 EOTF scaled so that 1.0 corresponds to 100 cd/m².
fn pq_to_linear(v: f32) -> f32 {
    const M1: f32 = 0.159_301_757_812_5;
    const M2: f32 = 78.843_75;
    const C1: f32 = 0.835_937_5;
    const C2: f32 = 18.851_562_5;
    const C3: f32 = 18.6875;

    let e = v.max(0.0).powf(1.0 / M2);
    let y = ((e - C1).max(0.0) / (C2 - C3 * e)).powf(1.0 / M1);
    y * 100.0
}

/// Inverse of the BT.2100 HLG OETF, applied per channel.
fn hlg_to_linear(v: f32) -> f32 {
    const A: f32 = 0.178_832_77;
    const B: f32 = 0.284_668_92;
    const C: f32 = 0.559_910_7;

    if v <= 0.5 {
        v * v / 3.0
    } else {
        (((v - C) / A).exp() + B) / 12.0
    }
}

/// Convert one encoded value to linear light.
pub fn to_linear(v: f32, tf: TransferFunction, gamma: f32) -> f32 {
    match tf {
        TransferFunction::Unspecified | TransferFunction::Linear => v,
        TransferFunction::Gamma => signed(v, |x| x.powf(gamma)),
        TransferFunction::Srgb => signed(v, srgb_to_linear),
        TransferFunction::Itu => itu_to_linear(v.max(0.0)),
        TransferFunction::XvYcc => signed(v, itu_to_linear),
        TransferFunction::St240 => st240_to_linear(v.max(0.0)),
        TransferFunction::DciP3 => v.max(0.0).powf(2.6),
        TransferFunction::Bt2100Pq => pq_to_linear(v),
        TransferFunction::Bt2100Hlg => hlg_to_linear(v.max(0.0)),
    }
}

/// Linearize every colour channel in place. Alpha passes through untouched.
pub fn linearize(channels: &mut [Channel], tf: TransferFunction, gamma: f32) {
    if matches!(tf, TransferFunction::Unspecified | TransferFunction::Linear) {
        return;
    }

    for channel in channels.iter_mut().filter(|c| !c.is_alpha()) {
        channel.data.mapv_inplace(|v| to_linear(v, tf, gamma));
    }
}
