//! Conversion of raw counts to a setting-independent scale.
//!
//! A universal unit is the count the sensor would have reported at the most sensitive setting
//! (4x differential gain, 4x gain, high sensitivity, 400 ms). Each field contributes an integer
//! multiplier that scales a raw count up to that reference.

use crate::config::{Config, DifferentialGain, Gain, IntegrationTime, Sensitivity};
use crate::context::MissingField;

/// Combined multiplier of the least sensitive setting (0.5x, 1x DG, low sensitivity, 50 ms).
pub const MAX_MULTIPLIER: u32 = 768;

/// Approximate lux per universal unit.
///
/// The datasheet gives 0.384 lx/count for the green channel at 50 ms, 1x gain, 1x DG and high
/// sensitivity, which is 128 times less sensitive than the reference setting. The value is
/// uncalibrated and only an approximation.
pub const LUX_PER_UNIVERSAL_UNIT: f32 = 0.384 / 128.0;

const DG_MULTIPLIER: [u32; 3] = [4, 2, 1];
const GAIN_MULTIPLIER: [u32; 4] = [8, 4, 2, 1];
const SENSITIVITY_MULTIPLIER: [u32; 2] = [1, 3];
const IT_MULTIPLIER: [u32; 4] = [8, 4, 2, 1];

/// Product of the four per-field multipliers of `config`.
///
/// # Errors
///
/// The first signal field (in the order differential gain, gain, sensitivity, integration time)
/// that is unset or holds a reserved code.
pub fn multiplier(config: &Config) -> Result<u32, MissingField> {
    let dg: DifferentialGain = config
        .differential_gain()
        .map_err(|_| MissingField::DifferentialGain)?;
    let gain: Gain = config.gain().map_err(|_| MissingField::Gain)?;
    let sensitivity: Sensitivity = config
        .sensitivity()
        .map_err(|_| MissingField::Sensitivity)?;
    let it: IntegrationTime = config
        .integration_time()
        .map_err(|_| MissingField::IntegrationTime)?;

    Ok(DG_MULTIPLIER[usize::from(dg.bits())]
        * GAIN_MULTIPLIER[usize::from(gain.bits())]
        * SENSITIVITY_MULTIPLIER[usize::from(sensitivity.bits())]
        * IT_MULTIPLIER[usize::from(it.bits())])
}

/// Scales `raw` measured with `config` to universal units.
///
/// The largest result, `0xFFFF * 768`, fits comfortably in a `u32`.
///
/// # Errors
///
/// The missing signal field, see [`multiplier`]. Callers that need the numeric sentinel can use
/// [`MissingField::sentinel`].
///
/// ```rust
/// use veml3328::{to_universal_unit, Config, DifferentialGain, Gain, IntegrationTime, Sensitivity};
///
/// let mut config = Config::new();
/// config
///     .set_differential_gain(DifferentialGain::X4)
///     .set_gain(Gain::X4)
///     .set_sensitivity(Sensitivity::High)
///     .set_integration_time(IntegrationTime::Ms200);
///
/// assert_eq!(to_universal_unit(&config, 1000), Ok(2000));
/// ```
pub fn to_universal_unit(config: &Config, raw: u16) -> Result<u32, MissingField> {
    Ok(u32::from(raw) * multiplier(config)?)
}

/// Converts universal units to an approximate illuminance in lux.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn universal_to_lux(universal: u32) -> f32 {
    universal as f32 * LUX_PER_UNIVERSAL_UNIT
}
