//! Sensitivity table and the step selection used by auto-ranging.
//!
//! One sample taken at [`REFERENCE_STEP`] is scaled to universal units, and from there the count
//! every other step would have produced is predicted. The most sensitive step whose prediction
//! stays under the saturation threshold is chosen.

use crate::context::MeasurementContext;
use crate::normalize::to_universal_unit;

/// Default fraction of full scale above which a count is treated as saturated.
pub const AUTO_RANGE_THRESHOLD: f32 = 0.85;

/// Index of the step the probe sample is taken at.
///
/// This is the second least sensitive step, so a saturated probe still leaves a less sensitive
/// step to fall back to.
pub const REFERENCE_STEP: usize = 1;

/// One gain/integration-time combination of the sensitivity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensitivityStep {
    /// Sensitivity relative to the least sensitive step.
    pub sensitivity: u16,
    /// Settings producing this sensitivity.
    pub context: MeasurementContext,
}

const fn step(sensitivity: u16, context: u8) -> SensitivityStep {
    SensitivityStep {
        sensitivity,
        context: MeasurementContext::from_bits(context),
    }
}

/// All distinct sensitivities the sensor can reach, least sensitive first.
///
/// Where several settings share a sensitivity, the entry keeps the shortest integration time,
/// then high sensitivity, then the lowest differential gain and gain. Low sensitivity is only
/// combined with 1x differential gain.
pub const SENSITIVITY_STEPS: [SensitivityStep; 16] = [
    step(1, 0x04),   // 0.5x,  DG 1x,  50 ms, low
    step(2, 0x0C),   // 1x,    DG 1x,  50 ms, low
    step(3, 0x00),   // 0.5x,  DG 1x,  50 ms, high
    step(4, 0x14),   // 2x,    DG 1x,  50 ms, low
    step(6, 0x08),   // 1x,    DG 1x,  50 ms, high
    step(8, 0x1C),   // 4x,    DG 1x,  50 ms, low
    step(12, 0x10),  // 2x,    DG 1x,  50 ms, high
    step(16, 0x1D),  // 4x,    DG 1x, 100 ms, low
    step(24, 0x18),  // 4x,    DG 1x,  50 ms, high
    step(32, 0x1E),  // 4x,    DG 1x, 200 ms, low
    step(48, 0x38),  // 4x,    DG 2x,  50 ms, high
    step(64, 0x1F),  // 4x,    DG 1x, 400 ms, low
    step(96, 0x58),  // 4x,    DG 4x,  50 ms, high
    step(192, 0x59), // 4x,    DG 4x, 100 ms, high
    step(384, 0x5A), // 4x,    DG 4x, 200 ms, high
    step(768, 0x5B), // 4x,    DG 4x, 400 ms, high
];

/// Raw count above which a sample counts as saturated: `floor(0xFFFF * threshold)`.
#[must_use]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn threshold_count(threshold: f32) -> u32 {
    (f32::from(u16::MAX) * threshold) as u32
}

/// Index into [`SENSITIVITY_STEPS`] of the most sensitive step that keeps a signal, sampled as
/// `raw` at [`REFERENCE_STEP`], at or below `threshold` of full scale.
#[must_use]
pub fn fitting_step(raw: u16, threshold: f32) -> usize {
    let threshold = u64::from(threshold_count(threshold));
    if u64::from(raw) > threshold {
        // already near saturation one step above the minimum
        return 0;
    }

    let reference = SENSITIVITY_STEPS[REFERENCE_STEP].context.decode();
    let Ok(universal) = to_universal_unit(&reference, raw) else {
        return 0;
    };
    let universal = u64::from(universal);
    let max_sensitivity = u64::from(SENSITIVITY_STEPS[SENSITIVITY_STEPS.len() - 1].sensitivity);

    let mut index = 0;
    while index + 1 < SENSITIVITY_STEPS.len() {
        let next = u64::from(SENSITIVITY_STEPS[index + 1].sensitivity);
        let predicted = universal * next / max_sensitivity;
        if predicted > threshold {
            break;
        }
        index += 1;
    }
    index
}

/// Settings of [`fitting_step`].
///
/// ```rust
/// use veml3328::{fitting_context, AUTO_RANGE_THRESHOLD, SENSITIVITY_STEPS};
///
/// // a dark sample allows the most sensitive setting
/// assert_eq!(fitting_context(0, AUTO_RANGE_THRESHOLD), SENSITIVITY_STEPS[15].context);
/// // a near-saturated sample falls back to the least sensitive one
/// assert_eq!(fitting_context(60_000, AUTO_RANGE_THRESHOLD), SENSITIVITY_STEPS[0].context);
/// ```
#[must_use]
pub fn fitting_context(raw: u16, threshold: f32) -> MeasurementContext {
    SENSITIVITY_STEPS[fitting_step(raw, threshold)].context
}
