//! One-byte record of the settings a raw count was measured with.
//!
//! ```text
//!  bit   7     6..5   4..3    2      1..0
//!       ERR    DG     GAIN   SENS    IT
//! ```
//!
//! With the error bit set, the low bits hold a [`MissingField`] code instead.

use crate::config::{layout, Config};
use crate::masked::MaskedRegister;

const ERROR_FLAG: u8 = 0x80;
const DG_SHIFT: u8 = 5;
const GAIN_SHIFT: u8 = 3;
const SENS_SHIFT: u8 = 2;
const IT_SHIFT: u8 = 0;

/// A signal-affecting field that was not set when it was needed.
///
/// The discriminants are stable and double as error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MissingField {
    /// Differential gain.
    DifferentialGain = 0,
    /// Analog gain.
    Gain = 1,
    /// Sensitivity.
    Sensitivity = 2,
    /// Integration time.
    IntegrationTime = 3,
}

impl MissingField {
    /// The stable error code of this field.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The wrapped-negative sentinel a failed unit conversion reports for this field:
    /// `-1` for differential gain through `-4` for integration time, as a `u32`.
    #[must_use]
    pub const fn sentinel(self) -> u32 {
        u32::MAX - self as u32
    }

    const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::DifferentialGain),
            1 => Some(Self::Gain),
            2 => Some(Self::Sensitivity),
            3 => Some(Self::IntegrationTime),
            _ => None,
        }
    }
}

/// Packed differential gain, gain, sensitivity and integration time of one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementContext(u8);

impl MeasurementContext {
    /// Wraps a raw context byte.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// The raw context byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// An error context naming the missing field.
    #[must_use]
    pub const fn missing(field: MissingField) -> Self {
        Self(ERROR_FLAG | field.code())
    }

    /// Returns `true` if the error bit is set.
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 & ERROR_FLAG != 0
    }

    /// The field that was missing when this context was encoded, if any.
    #[must_use]
    pub const fn missing_field(self) -> Option<MissingField> {
        if self.is_error() {
            MissingField::from_code(self.0 & !ERROR_FLAG)
        } else {
            None
        }
    }

    /// Packs the signal-affecting fields of `config`.
    ///
    /// Fields are checked in the order differential gain, gain, sensitivity, integration time;
    /// the first one that is unset produces an error context for that field.
    #[must_use]
    pub fn encode(config: &Config) -> Self {
        let fields = [
            (
                MissingField::DifferentialGain,
                layout::DIFFERENTIAL_GAIN_MASK,
                layout::DIFFERENTIAL_GAIN_SHIFT,
                DG_SHIFT,
            ),
            (
                MissingField::Gain,
                layout::GAIN_MASK,
                layout::GAIN_SHIFT,
                GAIN_SHIFT,
            ),
            (
                MissingField::Sensitivity,
                layout::SENSITIVITY_MASK,
                layout::SENSITIVITY_SHIFT,
                SENS_SHIFT,
            ),
            (
                MissingField::IntegrationTime,
                layout::INTEGRATION_TIME_MASK,
                layout::INTEGRATION_TIME_SHIFT,
                IT_SHIFT,
            ),
        ];

        let mut bits = 0;
        for (field, mask, shift, context_shift) in fields {
            match config.bits(mask, shift) {
                Some(code) => bits |= code << context_shift,
                None => return Self::missing(field),
            }
        }
        Self(bits)
    }

    /// Unpacks the context into a configuration holding only the four signal fields.
    ///
    /// An error context decodes to an empty configuration.
    #[must_use]
    pub fn decode(self) -> Config {
        if self.is_error() {
            return Config::new();
        }
        let register = (u16::from((self.0 >> DG_SHIFT) & 0b11) << layout::DIFFERENTIAL_GAIN_SHIFT)
            | (u16::from((self.0 >> GAIN_SHIFT) & 0b11) << layout::GAIN_SHIFT)
            | (u16::from((self.0 >> SENS_SHIFT) & 0b1) << layout::SENSITIVITY_SHIFT)
            | (u16::from((self.0 >> IT_SHIFT) & 0b11) << layout::INTEGRATION_TIME_SHIFT);
        Config::from_masked(MaskedRegister::from_parts(
            register,
            layout::SIGNAL_FIELDS_MASK,
        ))
    }
}

impl From<&Config> for MeasurementContext {
    fn from(config: &Config) -> Self {
        Self::encode(config)
    }
}

impl From<MeasurementContext> for Config {
    fn from(context: MeasurementContext) -> Self {
        context.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DifferentialGain, FieldError, Gain, IntegrationTime, Mode, Sensitivity};

    fn full(dg: DifferentialGain, gain: Gain, sens: Sensitivity, it: IntegrationTime) -> Config {
        let mut config = Config::new();
        config
            .set_differential_gain(dg)
            .set_gain(gain)
            .set_sensitivity(sens)
            .set_integration_time(it);
        config
    }

    #[test]
    fn encodes_fields_at_context_offsets() {
        let config = full(
            DifferentialGain::X4,
            Gain::X4,
            Sensitivity::High,
            IntegrationTime::Ms400,
        );
        assert_eq!(MeasurementContext::encode(&config).bits(), 0x5B);

        let config = full(
            DifferentialGain::X1,
            Gain::X1,
            Sensitivity::Low,
            IntegrationTime::Ms50,
        );
        assert_eq!(MeasurementContext::encode(&config).bits(), 0x0C);
    }

    #[test]
    fn full_set_survives_decode_and_reencode() {
        let config = full(
            DifferentialGain::X2,
            Gain::X1,
            Sensitivity::High,
            IntegrationTime::Ms100,
        );
        let context = MeasurementContext::encode(&config);
        assert_eq!(context.bits(), 0b0010_1001);
        assert_eq!(MeasurementContext::encode(&context.decode()), context);
    }

    #[test]
    fn missing_fields_short_circuit_in_order() {
        let empty = Config::new();
        assert_eq!(MeasurementContext::encode(&empty).bits(), 0x80);

        let mut config = Config::new();
        config.set_differential_gain(DifferentialGain::X1);
        assert_eq!(MeasurementContext::encode(&config).bits(), 0x81);

        config.set_gain(Gain::X2);
        assert_eq!(MeasurementContext::encode(&config).bits(), 0x82);

        config.set_sensitivity(Sensitivity::High);
        assert_eq!(MeasurementContext::encode(&config).bits(), 0x83);

        config.set_integration_time(IntegrationTime::Ms50);
        assert!(!MeasurementContext::encode(&config).is_error());
    }

    #[test]
    fn first_missing_field_wins() {
        // gain and integration time missing: gain is checked first
        let mut config = Config::new();
        config
            .set_differential_gain(DifferentialGain::X2)
            .set_sensitivity(Sensitivity::Low);
        let context = MeasurementContext::encode(&config);
        assert_eq!(context.missing_field(), Some(MissingField::Gain));
    }

    #[test]
    fn error_context_decodes_to_empty_config() {
        let context = MeasurementContext::missing(MissingField::Sensitivity);
        assert!(context.is_error());
        assert!(context.decode().is_empty());
        assert!(MeasurementContext::from_bits(0xFF).decode().is_empty());
    }

    #[test]
    fn decode_sets_only_signal_fields() {
        let config = MeasurementContext::from_bits(0x29).decode();
        assert_eq!(config.differential_gain(), Ok(DifferentialGain::X2));
        assert_eq!(config.gain(), Ok(Gain::X1));
        assert_eq!(config.sensitivity(), Ok(Sensitivity::High));
        assert_eq!(config.integration_time(), Ok(IntegrationTime::Ms100));
        assert_eq!(config.mode(), Err(FieldError::Undefined));
        assert_eq!(config.shutdown(), Err(FieldError::Undefined));
        assert_eq!(config.channel_select(), Err(FieldError::Undefined));
        assert_eq!(config.masked().mask(), layout::SIGNAL_FIELDS_MASK);
    }

    #[test]
    fn context_ignores_non_signal_fields() {
        let mut config = full(
            DifferentialGain::X1,
            Gain::X4,
            Sensitivity::Low,
            IntegrationTime::Ms200,
        );
        let before = MeasurementContext::encode(&config);
        config.set_mode(Mode::ActiveForce);
        assert_eq!(MeasurementContext::encode(&config), before);
    }

    #[test]
    fn sentinels_are_distinct() {
        assert_eq!(MissingField::DifferentialGain.sentinel(), u32::MAX);
        assert_eq!(MissingField::Gain.sentinel(), u32::MAX - 1);
        assert_eq!(MissingField::Sensitivity.sentinel(), u32::MAX - 2);
        assert_eq!(MissingField::IntegrationTime.sentinel(), u32::MAX - 3);
    }
}
