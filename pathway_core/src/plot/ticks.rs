//! Axis limits and tick placement
use crate::plot::figure::Scale;

/// Axis limits covering `values`, padded by 5% on linear axes and widened to whole decades on
/// logarithmic axes
pub fn auto_limits(values: &[f64], scale: Scale) -> (f64, f64) {
    match scale {
        Scale::Linear => {
            let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
            if finite.is_empty() {
                return (0.0, 1.0);
            }
            let lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if lo == hi {
                return (lo - 0.5, hi + 0.5);
            }
            let pad = 0.05 * (hi - lo);
            (lo - pad, hi + pad)
        }
        Scale::Log => {
            let positive: Vec<f64> = values
                .iter()
                .copied()
                .filter(|v| v.is_finite() && *v > 0.0)
                .collect();
            if positive.is_empty() {
                return (1.0, 10.0);
            }
            let lo = positive.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = positive.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lo = 10f64.powf((lo.log10() + 1e-9).floor());
            let mut hi = 10f64.powf((hi.log10() - 1e-9).ceil());
            if hi <= lo {
                hi = lo * 10.0;
            }
            (lo, hi)
        }
    }
}

/// Tick positions within `limits`
///
/// Linear axes get about six ticks at multiples of 1, 2 or 5 times a power of ten,
/// logarithmic axes get one tick per decade (thinned to at most ten).
pub fn auto_ticks(limits: (f64, f64), scale: Scale) -> Vec<f64> {
    let (lo, hi) = limits;
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
        return Vec::new();
    }
    match scale {
        Scale::Linear => {
            let step = nice_step((hi - lo) / 6.0);
            let mut ticks = Vec::new();
            let mut tick = (lo / step).ceil() * step;
            while tick <= hi + 1e-9 * step {
                // snap values like 0.30000000000000004
                let snapped = (tick / step).round() * step;
                ticks.push(if snapped.abs() < 1e-12 * step { 0.0 } else { snapped });
                tick += step;
            }
            ticks
        }
        Scale::Log => {
            if lo <= 0.0 {
                return Vec::new();
            }
            let first = (lo.log10() - 1e-9).ceil() as i32;
            let last = (hi.log10() + 1e-9).floor() as i32;
            if last < first {
                return Vec::new();
            }
            let stride = ((last - first) / 10 + 1) as usize;
            (first..=last)
                .step_by(stride)
                .map(|e| 10f64.powi(e))
                .collect()
        }
    }
}

fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let factor = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

/// Tick label text
pub fn format_tick(value: f64, scale: Scale) -> String {
    if scale == Scale::Log && value > 0.0 {
        let exponent = value.log10().round() as i32;
        if !(-2..=3).contains(&exponent) {
            return format!("1e{}", exponent);
        }
    }
    if (value - value.round()).abs() < 1e-9 {
        return format!("{}", value.round() as i64);
    }
    let text = format!("{:.3}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
