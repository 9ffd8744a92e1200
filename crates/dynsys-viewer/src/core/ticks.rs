//! Tick interval planning.
//!
//! Steps are always "nice" numbers of the form {1, 2, 5} x 10^k. The planner
//! picks the coarsest such step that still yields the requested number of
//! ticks, then backs off if that overshoots the configured band.

use crate::config::{LabelFormat, TickConfig};
use crate::core::bounds::Axis;
use crate::LOG_TARGET;
use serde::{Deserialize, Serialize};

/// Relative tolerance for ticks that land a hair outside `[lo, hi]`.
const EDGE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSet {
    pub axis: Axis,
    pub step: f64,
    pub ticks: Vec<Tick>,
}

impl TickSet {
    pub fn empty(axis: Axis) -> Self {
        Self {
            axis,
            step: 0.0,
            ticks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.value).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickPlanner {
    config: TickConfig,
}

impl TickPlanner {
    pub fn new(config: TickConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Tick count wanted for an axis that spans `length_px` on screen.
    pub fn target_for_length(&self, length_px: f32) -> usize {
        let (lo, hi) = self.band();
        if !length_px.is_finite() || length_px <= 0.0 {
            return lo;
        }
        let spacing = self.config.desired_spacing_px.max(1.0);
        ((length_px / spacing).round() as usize).clamp(lo, hi)
    }

    /// Plan ticks covering `[lo, hi]` with about `target` ticks.
    pub fn plan(&self, axis: Axis, lo: f64, hi: f64, target: usize) -> TickSet {
        if !lo.is_finite() || !hi.is_finite() {
            log::warn!(target: LOG_TARGET, "non-finite range [{lo}, {hi}] on {axis:?}; no ticks");
            return TickSet::empty(axis);
        }
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let (min_ticks, max_ticks) = self.band();
        let target = target.clamp(min_ticks, max_ticks);

        if hi == lo {
            let step = substitute_step(lo);
            log::debug!(target: LOG_TARGET, "degenerate range on {axis:?} at {lo}; step {step}");
            return self.single(axis, lo, step);
        }

        let plan = choose_step(lo, hi, target, max_ticks)
            .and_then(|step| index_span(lo, hi, step).map(|span| (step, span)));
        let Some((step, (first, last))) = plan else {
            // span below f64 resolution; pin one tick like a flat axis
            log::warn!(
                target: LOG_TARGET,
                "range [{lo}, {hi}] on {axis:?} is too narrow to subdivide"
            );
            return self.single(axis, lo, substitute_step(lo));
        };
        let ticks = (first..=last)
            .map(|k| self.tick(tick_value(k, step), step))
            .collect();

        log::trace!(
            target: LOG_TARGET,
            "ticks {axis:?} [{lo}, {hi}] target={target} step={step} count={}",
            last - first + 1
        );
        TickSet { axis, step, ticks }
    }

    pub fn format_label(&self, value: f64, step: f64) -> String {
        self.config.label_format.format(value, step)
    }

    fn tick(&self, value: f64, step: f64) -> Tick {
        Tick {
            value,
            label: self.format_label(value, step),
        }
    }

    fn single(&self, axis: Axis, value: f64, step: f64) -> TickSet {
        TickSet {
            axis,
            step,
            ticks: vec![self.tick(value, step)],
        }
    }

    fn band(&self) -> (usize, usize) {
        let lo = self.config.min_ticks.max(2);
        (lo, self.config.max_ticks.max(lo))
    }
}

impl LabelFormat {
    /// Format one tick value. Scientific notation outside the fixed-point
    /// window, otherwise as many decimals as the step needs.
    pub fn format(&self, value: f64, step: f64) -> String {
        if value == 0.0 {
            return "0".to_string();
        }
        let magnitude = value.abs();
        if magnitude >= self.scientific_upper || magnitude <= self.scientific_lower {
            return format!("{:.*e}", self.significant_digits.saturating_sub(1), value);
        }
        let decimals = if step.is_finite() && step > 0.0 {
            (-step.log10().floor()).max(0.0) as usize
        } else {
            0
        };
        format!("{:.*}", decimals.min(self.max_decimals), value)
    }
}

/// Largest power of ten not above `range`, corrected for `log10` rounding.
fn decade(range: f64) -> f64 {
    let mut base = 10f64.powf(range.log10().floor());
    if range / base >= 10.0 {
        base *= 10.0;
    } else if range / base < 1.0 {
        base /= 10.0;
    }
    base
}

/// Nice step for `[lo, hi]`, or `None` when no positive finite step exists.
fn choose_step(lo: f64, hi: f64, target: usize, max_ticks: usize) -> Option<f64> {
    if !(hi - lo).is_finite() {
        // span exceeds f64::MAX: plan a tenth of the range, scale the step back up
        return choose_step(lo / 10.0, hi / 10.0, target, max_ticks).map(|s| s * 10.0);
    }
    let base = decade(hi - lo);
    if !base.is_finite() || base <= 0.0 {
        return None;
    }
    let candidates = [base, base / 2.0, base / 5.0];
    let counts = candidates.map(|s| tick_count(lo, hi, s));
    let mut pick = counts
        .iter()
        .position(|&n| n >= target)
        .unwrap_or(candidates.len() - 1);
    while pick > 0 && counts[pick] > max_ticks {
        pick -= 1;
    }
    Some(candidates[pick]).filter(|s| s.is_finite() && *s > 0.0)
}

/// Tick indices `k` with `k * step` inside `[lo, hi]`. `None` when the
/// indices are not exactly representable.
fn index_span(lo: f64, hi: f64, step: f64) -> Option<(i64, i64)> {
    const EXACT: f64 = (1u64 << 53) as f64;
    let first = (lo / step - EDGE_EPSILON).ceil();
    let last = (hi / step + EDGE_EPSILON).floor();
    let exact = |v: f64| v.is_finite() && v.abs() <= EXACT;
    (exact(first) && exact(last)).then(|| (first as i64, last as i64))
}

fn tick_count(lo: f64, hi: f64, step: f64) -> usize {
    match index_span(lo, hi, step) {
        Some((first, last)) => last
            .checked_sub(first)
            .and_then(|d| d.checked_add(1))
            .map_or(usize::MAX, |n| n.max(0) as usize),
        None => usize::MAX,
    }
}

/// `k * step`, computed so that decimal steps print cleanly (0.3, not
/// 0.30000000000000004).
fn tick_value(k: i64, step: f64) -> f64 {
    let inverse = (1.0 / step).round();
    let value = if step < 1.0 && inverse.is_finite() {
        k as f64 / inverse
    } else {
        k as f64 * step
    };
    if value.abs() < step * EDGE_EPSILON {
        0.0
    } else {
        value
    }
}

/// Step reported for a zero-width range.
fn substitute_step(value: f64) -> f64 {
    let step = decade(value.abs());
    if value == 0.0 || !step.is_finite() || step <= 0.0 {
        1.0
    } else {
        step
    }
}
