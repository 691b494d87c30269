//! Color gradients and robust scaling for the quicklook heat maps
//!
//! The PuBuGn and Spectral gradients are RGB stop tables sampled from the
//! matplotlib maps of the same names, interpolated linearly between stops.

use plotters::style::RGBColor;

/// PuBuGn sequential gradient (light to dark), used for backscatter
pub const PUBUGN_STOPS: &[(u8, u8, u8)] = &[
    (255, 247, 251),
    (236, 226, 240),
    (208, 209, 230),
    (166, 189, 219),
    (103, 169, 207),
    (54, 144, 192),
    (2, 129, 138),
    (1, 108, 89),
    (1, 70, 54),
];

/// Spectral diverging gradient (red to blue); reversed for depolarization
pub const SPECTRAL_STOPS: &[(u8, u8, u8)] = &[
    (158, 1, 66),
    (213, 62, 79),
    (244, 109, 67),
    (253, 174, 97),
    (254, 224, 139),
    (255, 255, 191),
    (230, 245, 152),
    (171, 221, 164),
    (102, 194, 165),
    (50, 136, 189),
    (94, 79, 162),
];

/// A piecewise-linear RGB gradient over [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct Colormap {
    stops: &'static [(u8, u8, u8)],
    reversed: bool,
}

impl Colormap {
    pub fn pubugn() -> Self {
        Self {
            stops: PUBUGN_STOPS,
            reversed: false,
        }
    }

    pub fn spectral_r() -> Self {
        Self {
            stops: SPECTRAL_STOPS,
            reversed: true,
        }
    }

    /// Color at fraction `t`, clamped to [0, 1].
    pub fn sample(&self, t: f64) -> RGBColor {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let t = if self.reversed { 1.0 - t } else { t };

        let span = (self.stops.len() - 1) as f64;
        let pos = t * span;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(self.stops.len() - 1);
        let frac = pos - lo as f64;

        let (r0, g0, b0) = self.stops[lo];
        let (r1, g1, b1) = self.stops[hi];
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
    }
}

/// Value at the given percentile of the finite entries, by linear
/// interpolation over the sorted values. Returns `None` when nothing is
/// finite.
pub fn percentile(values: impl Iterator<Item = f64>, pct: f64) -> Option<f64> {
    let mut finite: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));

    let pos = (pct / 100.0).clamp(0.0, 1.0) * (finite.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(finite.len() - 1);
    Some(finite[lo] + (finite[hi] - finite[lo]) * (pos - lo as f64))
}

/// Robust (percentile-clipped) color limits over the finite entries.
pub fn robust_limits(values: impl Iterator<Item = f64> + Clone, low: f64, high: f64) -> (f64, f64) {
    let vmin = percentile(values.clone(), low).unwrap_or(0.0);
    let vmax = percentile(values, high).unwrap_or(1.0);
    if vmax > vmin {
        (vmin, vmax)
    } else {
        (vmin, vmin + 1.0)
    }
}
