//! Control register fields and the partial [`Config`] built on top of [`MaskedRegister`].

use crate::masked::MaskedRegister;

/// Bit layout of the control register (address 0x00).
pub mod layout {
    /// Shutdown uses two non-contiguous bits, SD1 (bit 15) and SD0 (bit 0).
    pub const SHUTDOWN_MASK: u16 = 0b1000_0000_0000_0001;
    /// Pattern written to enter shutdown. Both bits must be set.
    pub const SHUTDOWN_PATTERN: u16 = 0b1000_0000_0000_0001;
    /// Only SD0 is read back when decoding the shutdown state.
    pub const SHUTDOWN_READ_MASK: u16 = 0b0000_0000_0000_0001;
    /// Channel select (SD_ALS), bit 14.
    pub const CHANNEL_SELECT_MASK: u16 = 0b0100_0000_0000_0000;
    /// Offset of [`CHANNEL_SELECT_MASK`].
    pub const CHANNEL_SELECT_SHIFT: u8 = 14;
    /// Differential gain, bits 13-12.
    pub const DIFFERENTIAL_GAIN_MASK: u16 = 0b0011_0000_0000_0000;
    /// Offset of [`DIFFERENTIAL_GAIN_MASK`].
    pub const DIFFERENTIAL_GAIN_SHIFT: u8 = 12;
    /// Gain, bits 11-10.
    pub const GAIN_MASK: u16 = 0b0000_1100_0000_0000;
    /// Offset of [`GAIN_MASK`].
    pub const GAIN_SHIFT: u8 = 10;
    /// Sensitivity, bit 6.
    pub const SENSITIVITY_MASK: u16 = 0b0000_0000_0100_0000;
    /// Offset of [`SENSITIVITY_MASK`].
    pub const SENSITIVITY_SHIFT: u8 = 6;
    /// Integration time, bits 5-4.
    pub const INTEGRATION_TIME_MASK: u16 = 0b0000_0000_0011_0000;
    /// Offset of [`INTEGRATION_TIME_MASK`].
    pub const INTEGRATION_TIME_SHIFT: u8 = 4;
    /// Active-force mode, bit 3.
    pub const MODE_MASK: u16 = 0b0000_0000_0000_1000;
    /// Offset of [`MODE_MASK`].
    pub const MODE_SHIFT: u8 = 3;
    /// Trigger, bit 2.
    pub const TRIGGER_MASK: u16 = 0b0000_0000_0000_0100;
    /// Offset of [`TRIGGER_MASK`].
    pub const TRIGGER_SHIFT: u8 = 2;

    /// Every non-reserved bit of the control register.
    pub const ALL_FIELDS_MASK: u16 = SHUTDOWN_MASK
        | CHANNEL_SELECT_MASK
        | DIFFERENTIAL_GAIN_MASK
        | GAIN_MASK
        | SENSITIVITY_MASK
        | INTEGRATION_TIME_MASK
        | MODE_MASK
        | TRIGGER_MASK;

    /// The fields that change the magnitude of a raw count.
    pub const SIGNAL_FIELDS_MASK: u16 =
        DIFFERENTIAL_GAIN_MASK | GAIN_MASK | SENSITIVITY_MASK | INTEGRATION_TIME_MASK;
}

/// Why a field could not be read from a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldError {
    /// The field was never set.
    Undefined,
    /// The field holds a code the hardware reserves.
    Reserved(u8),
}

macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $code),+
        }

        impl $name {
            /// Decodes a field code, returning `None` for reserved codes.
            #[must_use]
            pub const fn from_bits(bits: u8) -> Option<Self> {
                match bits {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// The field code as stored in the register.
            #[must_use]
            pub const fn bits(self) -> u8 {
                self as u8
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value as u8
            }
        }
    };
}

field_enum! {
    /// Power state of the sensor.
    ShutdownState {
        /// Measuring.
        Awake = 0,
        /// Powered down.
        Shutdown = 1,
    }
}

field_enum! {
    /// Which photodiodes are active (named "SD_ALS" in the datasheet).
    ChannelSelect {
        /// All channels active.
        AllChannels = 0,
        /// Red and blue off; clear, green and IR stay active.
        ExcludeRedBlue = 1,
    }
}

field_enum! {
    /// Digital gain applied after the ADC.
    DifferentialGain {
        /// 1x.
        X1 = 0,
        /// 2x.
        X2 = 1,
        /// 4x.
        X4 = 2,
    }
}

field_enum! {
    /// Analog gain.
    Gain {
        /// 0.5x.
        X0_5 = 0,
        /// 1x.
        X1 = 1,
        /// 2x.
        X2 = 2,
        /// 4x.
        X4 = 3,
    }
}

field_enum! {
    /// Photodiode sensitivity. Low sensitivity is one third of high.
    Sensitivity {
        /// Full photodiode area.
        High = 0,
        /// One third of the photodiode area.
        Low = 1,
    }
}

field_enum! {
    /// ADC integration time.
    IntegrationTime {
        /// 50 ms.
        Ms50 = 0,
        /// 100 ms.
        Ms100 = 1,
        /// 200 ms.
        Ms200 = 2,
        /// 400 ms.
        Ms400 = 3,
    }
}

field_enum! {
    /// Measurement mode.
    Mode {
        /// Continuous measurement.
        Auto = 0,
        /// Active force: one measurement per trigger.
        ActiveForce = 1,
    }
}

field_enum! {
    /// Trigger for a single measurement in active-force mode.
    ///
    /// The hardware clears the bit again once the measurement is complete.
    Trigger {
        /// No measurement requested.
        None = 0,
        /// Start a measurement.
        Fire = 1,
    }
}

/// A partial view of the control register.
///
/// Every field is either set to a known value or unknown. Writing a `Config` to the device only
/// touches its known bits, so independent callers can each own a subset of fields.
///
/// ```rust
/// use veml3328::{Config, Gain, IntegrationTime};
///
/// let mut config = Config::new();
/// config.set_gain(Gain::X2).set_integration_time(IntegrationTime::Ms200);
///
/// assert_eq!(config.gain(), Ok(Gain::X2));
/// assert!(config.sensitivity().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    register: MaskedRegister,
}

impl Config {
    /// A configuration with no fields set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            register: MaskedRegister::EMPTY,
        }
    }

    /// A fully known configuration, as read back from the device.
    #[must_use]
    pub const fn from_register(value: u16) -> Self {
        Self {
            register: MaskedRegister::from_parts(value, layout::ALL_FIELDS_MASK),
        }
    }

    /// Wraps an existing partial register value.
    #[must_use]
    pub const fn from_masked(register: MaskedRegister) -> Self {
        Self { register }
    }

    /// The underlying value/mask pair, ready for a masked write.
    #[must_use]
    pub const fn masked(&self) -> MaskedRegister {
        self.register
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.register.is_empty()
    }

    /// Overlays `later` on `self`; fields set in `later` win.
    #[must_use]
    pub const fn merge(self, later: Self) -> Self {
        Self {
            register: self.register.merge(later.register),
        }
    }

    fn set(&mut self, bits: u8, mask: u16, shift: u8) -> &mut Self {
        self.register.set_field(u16::from(bits), mask, shift);
        self
    }

    /// Raw code of the field at `mask`/`shift`, if it is known.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn bits(&self, mask: u16, shift: u8) -> Option<u8> {
        // every field fits in two bits
        self.register.field(mask, shift).map(|bits| bits as u8)
    }

    fn get<T>(&self, mask: u16, shift: u8, decode: fn(u8) -> Option<T>) -> Result<T, FieldError> {
        let bits = self.bits(mask, shift).ok_or(FieldError::Undefined)?;
        decode(bits).ok_or(FieldError::Reserved(bits))
    }

    /// Sets the shutdown state.
    ///
    /// The hardware needs both SD1 and SD0 set to shut down and both cleared to wake up, so this
    /// always writes the two-bit pattern rather than a shifted code.
    pub fn set_shutdown(&mut self, state: ShutdownState) -> &mut Self {
        let pattern = match state {
            ShutdownState::Awake => 0,
            ShutdownState::Shutdown => layout::SHUTDOWN_PATTERN,
        };
        self.register.set_field(pattern, layout::SHUTDOWN_MASK, 0);
        self
    }

    /// Shutdown state, decoded from SD0 only.
    ///
    /// # Errors
    ///
    /// [`FieldError::Undefined`] if SD0 is unknown.
    pub fn shutdown(&self) -> Result<ShutdownState, FieldError> {
        self.get(layout::SHUTDOWN_READ_MASK, 0, ShutdownState::from_bits)
    }

    /// Sets the active channels.
    pub fn set_channel_select(&mut self, value: ChannelSelect) -> &mut Self {
        self.set(
            value.bits(),
            layout::CHANNEL_SELECT_MASK,
            layout::CHANNEL_SELECT_SHIFT,
        )
    }

    /// Active channels.
    ///
    /// # Errors
    ///
    /// [`FieldError::Undefined`] if the field is unknown.
    pub fn channel_select(&self) -> Result<ChannelSelect, FieldError> {
        self.get(
            layout::CHANNEL_SELECT_MASK,
            layout::CHANNEL_SELECT_SHIFT,
            ChannelSelect::from_bits,
        )
    }

    /// Sets the differential gain.
    pub fn set_differential_gain(&mut self, value: DifferentialGain) -> &mut Self {
        self.set(
            value.bits(),
            layout::DIFFERENTIAL_GAIN_MASK,
            layout::DIFFERENTIAL_GAIN_SHIFT,
        )
    }

    /// Differential gain.
    ///
    /// # Errors
    ///
    /// [`FieldError::Undefined`] if the field is unknown, [`FieldError::Reserved`] for code 3.
    pub fn differential_gain(&self) -> Result<DifferentialGain, FieldError> {
        self.get(
            layout::DIFFERENTIAL_GAIN_MASK,
            layout::DIFFERENTIAL_GAIN_SHIFT,
            DifferentialGain::from_bits,
        )
    }

    /// Sets the analog gain.
    pub fn set_gain(&mut self, value: Gain) -> &mut Self {
        self.set(value.bits(), layout::GAIN_MASK, layout::GAIN_SHIFT)
    }

    /// Analog gain.
    ///
    /// # Errors
    ///
    /// [`FieldError::Undefined`] if the field is unknown.
    pub fn gain(&self) -> Result<Gain, FieldError> {
        self.get(layout::GAIN_MASK, layout::GAIN_SHIFT, Gain::from_bits)
    }

    /// Sets the photodiode sensitivity.
    pub fn set_sensitivity(&mut self, value: Sensitivity) -> &mut Self {
        self.set(
            value.bits(),
            layout::SENSITIVITY_MASK,
            layout::SENSITIVITY_SHIFT,
        )
    }

    /// Photodiode sensitivity.
    ///
    /// # Errors
    ///
    /// [`FieldError::Undefined`] if the field is unknown.
    pub fn sensitivity(&self) -> Result<Sensitivity, FieldError> {
        self.get(
            layout::SENSITIVITY_MASK,
            layout::SENSITIVITY_SHIFT,
            Sensitivity::from_bits,
        )
    }

    /// Sets the integration time.
    pub fn set_integration_time(&mut self, value: IntegrationTime) -> &mut Self {
        self.set(
            value.bits(),
            layout::INTEGRATION_TIME_MASK,
            layout::INTEGRATION_TIME_SHIFT,
        )
    }

    /// Integration time.
    ///
    /// # Errors
    ///
    /// [`FieldError::Undefined`] if the field is unknown.
    pub fn integration_time(&self) -> Result<IntegrationTime, FieldError> {
        self.get(
            layout::INTEGRATION_TIME_MASK,
            layout::INTEGRATION_TIME_SHIFT,
            IntegrationTime::from_bits,
        )
    }

    /// Sets the measurement mode.
    pub fn set_mode(&mut self, value: Mode) -> &mut Self {
        self.set(value.bits(), layout::MODE_MASK, layout::MODE_SHIFT)
    }

    /// Measurement mode.
    ///
    /// # Errors
    ///
    /// [`FieldError::Undefined`] if the field is unknown.
    pub fn mode(&self) -> Result<Mode, FieldError> {
        self.get(layout::MODE_MASK, layout::MODE_SHIFT, Mode::from_bits)
    }

    /// Sets the trigger bit.
    pub fn set_trigger(&mut self, value: Trigger) -> &mut Self {
        self.set(value.bits(), layout::TRIGGER_MASK, layout::TRIGGER_SHIFT)
    }

    /// Trigger bit.
    ///
    /// # Errors
    ///
    /// [`FieldError::Undefined`] if the field is unknown.
    pub fn trigger(&self) -> Result<Trigger, FieldError> {
        self.get(layout::TRIGGER_MASK, layout::TRIGGER_SHIFT, Trigger::from_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_only(config: &Config, expected_mask: u16) {
        assert_eq!(config.masked().mask(), expected_mask);
    }

    /// Checks that every field outside `known` reads back as undefined.
    fn assert_rest_undefined(config: &Config, known: u16) {
        if known != layout::SHUTDOWN_MASK {
            assert_eq!(config.shutdown(), Err(FieldError::Undefined));
        }
        if known != layout::CHANNEL_SELECT_MASK {
            assert_eq!(config.channel_select(), Err(FieldError::Undefined));
        }
        if known != layout::DIFFERENTIAL_GAIN_MASK {
            assert_eq!(config.differential_gain(), Err(FieldError::Undefined));
        }
        if known != layout::GAIN_MASK {
            assert_eq!(config.gain(), Err(FieldError::Undefined));
        }
        if known != layout::SENSITIVITY_MASK {
            assert_eq!(config.sensitivity(), Err(FieldError::Undefined));
        }
        if known != layout::INTEGRATION_TIME_MASK {
            assert_eq!(config.integration_time(), Err(FieldError::Undefined));
        }
        if known != layout::MODE_MASK {
            assert_eq!(config.mode(), Err(FieldError::Undefined));
        }
        if known != layout::TRIGGER_MASK {
            assert_eq!(config.trigger(), Err(FieldError::Undefined));
        }
    }

    #[test]
    fn all_fields_mask_leaves_reserved_bits_out() {
        assert_eq!(layout::ALL_FIELDS_MASK, 0xFC7D);
        assert_eq!(!layout::ALL_FIELDS_MASK, 0b0000_0011_1000_0010);
    }

    #[test]
    fn gain_round_trips_alone() {
        for gain in [Gain::X0_5, Gain::X1, Gain::X2, Gain::X4] {
            let mut config = Config::new();
            config.set_gain(gain);
            assert_eq!(config.gain(), Ok(gain));
            assert_eq!(config.differential_gain(), Err(FieldError::Undefined));
            assert_eq!(config.sensitivity(), Err(FieldError::Undefined));
            assert_eq!(config.integration_time(), Err(FieldError::Undefined));
            assert_eq!(config.mode(), Err(FieldError::Undefined));
            assert_only(&config, layout::GAIN_MASK);
        }
    }

    #[test]
    fn differential_gain_round_trips_alone() {
        for dg in [DifferentialGain::X1, DifferentialGain::X2, DifferentialGain::X4] {
            let mut config = Config::new();
            config.set_differential_gain(dg);
            assert_eq!(config.differential_gain(), Ok(dg));
            assert_eq!(config.gain(), Err(FieldError::Undefined));
            assert_only(&config, layout::DIFFERENTIAL_GAIN_MASK);
        }
    }

    #[test]
    fn integration_time_round_trips_alone() {
        for it in [
            IntegrationTime::Ms50,
            IntegrationTime::Ms100,
            IntegrationTime::Ms200,
            IntegrationTime::Ms400,
        ] {
            let mut config = Config::new();
            config.set_integration_time(it);
            assert_eq!(config.integration_time(), Ok(it));
            assert_eq!(config.trigger(), Err(FieldError::Undefined));
            assert_only(&config, layout::INTEGRATION_TIME_MASK);
        }
    }

    #[test]
    fn channel_select_round_trips_alone() {
        for select in [ChannelSelect::AllChannels, ChannelSelect::ExcludeRedBlue] {
            let mut config = Config::new();
            config.set_channel_select(select);
            assert_eq!(config.channel_select(), Ok(select));
            assert_rest_undefined(&config, layout::CHANNEL_SELECT_MASK);
            assert_only(&config, layout::CHANNEL_SELECT_MASK);
        }
    }

    #[test]
    fn sensitivity_round_trips_alone() {
        for sensitivity in [Sensitivity::High, Sensitivity::Low] {
            let mut config = Config::new();
            config.set_sensitivity(sensitivity);
            assert_eq!(config.sensitivity(), Ok(sensitivity));
            assert_rest_undefined(&config, layout::SENSITIVITY_MASK);
            assert_only(&config, layout::SENSITIVITY_MASK);
        }
    }

    #[test]
    fn mode_round_trips_alone() {
        for mode in [Mode::Auto, Mode::ActiveForce] {
            let mut config = Config::new();
            config.set_mode(mode);
            assert_eq!(config.mode(), Ok(mode));
            assert_rest_undefined(&config, layout::MODE_MASK);
            assert_only(&config, layout::MODE_MASK);
        }
    }

    #[test]
    fn trigger_round_trips_alone() {
        for trigger in [Trigger::None, Trigger::Fire] {
            let mut config = Config::new();
            config.set_trigger(trigger);
            assert_eq!(config.trigger(), Ok(trigger));
            assert_rest_undefined(&config, layout::TRIGGER_MASK);
            assert_only(&config, layout::TRIGGER_MASK);
        }
    }

    #[test]
    fn single_bit_fields_pack_together() {
        let mut config = Config::new();
        config
            .set_channel_select(ChannelSelect::ExcludeRedBlue)
            .set_sensitivity(Sensitivity::Low)
            .set_mode(Mode::ActiveForce)
            .set_trigger(Trigger::Fire);
        assert_eq!(config.channel_select(), Ok(ChannelSelect::ExcludeRedBlue));
        assert_eq!(config.sensitivity(), Ok(Sensitivity::Low));
        assert_eq!(config.mode(), Ok(Mode::ActiveForce));
        assert_eq!(config.trigger(), Ok(Trigger::Fire));
        assert_eq!(config.masked().value(), 0x404C);
    }

    #[test]
    fn packs_fields_at_hardware_offsets() {
        let mut config = Config::new();
        config
            .set_differential_gain(DifferentialGain::X4)
            .set_gain(Gain::X2)
            .set_integration_time(IntegrationTime::Ms400);
        assert_eq!(config.masked().value(), 0x2830);
        assert_eq!(config.masked().mask(), 0x3C30);
    }

    #[test]
    fn shutdown_writes_both_bits() {
        let mut config = Config::new();
        config.set_shutdown(ShutdownState::Shutdown);
        assert_eq!(config.masked().value(), 0x8001);
        assert_eq!(config.masked().mask(), 0x8001);

        config.set_shutdown(ShutdownState::Awake);
        assert_eq!(config.masked().value(), 0x0000);
        assert_eq!(config.masked().mask(), 0x8001);
    }

    // Hardware quirk: the shutdown state is written as SD1|SD0 but decoded from SD0 alone.
    #[test]
    fn shutdown_reads_only_sd0() {
        assert_eq!(
            Config::from_register(0x0001).shutdown(),
            Ok(ShutdownState::Shutdown)
        );
        assert_eq!(
            Config::from_register(0x8000).shutdown(),
            Ok(ShutdownState::Awake)
        );
        let sd0_only = Config::from_masked(MaskedRegister::from_parts(0x0001, 0x0001));
        assert_eq!(sd0_only.shutdown(), Ok(ShutdownState::Shutdown));
    }

    #[test]
    fn reserved_differential_gain_is_reported() {
        let config = Config::from_register(0x3000);
        assert_eq!(config.differential_gain(), Err(FieldError::Reserved(3)));
    }

    #[test]
    fn register_read_knows_every_field() {
        let config = Config::from_register(0x0000);
        assert_eq!(config.shutdown(), Ok(ShutdownState::Awake));
        assert_eq!(config.channel_select(), Ok(ChannelSelect::AllChannels));
        assert_eq!(config.differential_gain(), Ok(DifferentialGain::X1));
        assert_eq!(config.gain(), Ok(Gain::X0_5));
        assert_eq!(config.sensitivity(), Ok(Sensitivity::High));
        assert_eq!(config.integration_time(), Ok(IntegrationTime::Ms50));
        assert_eq!(config.mode(), Ok(Mode::Auto));
        assert_eq!(config.trigger(), Ok(Trigger::None));
    }

    #[test]
    fn register_read_drops_reserved_bits() {
        assert_eq!(Config::from_register(0xFFFF).masked().value(), 0xFC7D);
    }

    #[test]
    fn merge_keeps_independent_callers_apart() {
        let mut a = Config::new();
        a.set_gain(Gain::X4);
        let mut b = Config::new();
        b.set_integration_time(IntegrationTime::Ms100);
        let merged = a.merge(b);
        assert_eq!(merged, b.merge(a));
        assert_eq!(merged.gain(), Ok(Gain::X4));
        assert_eq!(merged.integration_time(), Ok(IntegrationTime::Ms100));
    }
}
