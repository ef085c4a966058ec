//! # VEML3328 RGB/IR Colour Sensor Driver
//!
//! This crate provides a `no_std` driver for Vishay's VEML3328 colour sensor, blocking by default
//! and async with the `async` feature.
//!
//! Apart from register access it offers:
//!
//! - [`Config`], a partial view of the control register that only writes the fields it knows,
//! - [`MeasurementContext`], a one-byte record of the settings a raw count was taken with,
//! - [`to_universal_unit`], which scales raw counts taken at any setting to a common scale,
//! - [`Veml3328::auto_config`], which picks the most sensitive setting that will not saturate
//!   from a single probe sample.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use veml3328::{to_universal_unit, universal_to_lux, Channel, Veml3328};
//!
//! let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let mut sensor = Veml3328::new(i2c);
//!
//! sensor.init().unwrap();
//! let context = sensor.auto_config(Channel::Green).unwrap();
//!
//! // wait for one integration period, then read the channel
//! let raw = sensor.channel_value(Channel::Green).unwrap();
//! let universal = to_universal_unit(&context.decode(), raw).unwrap();
//! println!("~{} lx", universal_to_lux(universal));
//! ```
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fmt; // <-- must be first module!

mod auto_range;
mod config;
mod context;
mod masked;
mod normalize;

pub use auto_range::{
    fitting_context, fitting_step, threshold_count, SensitivityStep, AUTO_RANGE_THRESHOLD,
    REFERENCE_STEP, SENSITIVITY_STEPS,
};
pub use config::{
    layout, ChannelSelect, Config, DifferentialGain, FieldError, Gain, IntegrationTime, Mode,
    Sensitivity, ShutdownState, Trigger,
};
pub use context::{MeasurementContext, MissingField};
pub use masked::MaskedRegister;
pub use normalize::{
    multiplier, to_universal_unit, universal_to_lux, LUX_PER_UNIVERSAL_UNIT, MAX_MULTIPLIER,
};

#[cfg(not(feature = "async"))]
use embedded_hal::i2c::I2c;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c;

/// Default 7-bit I2C address of the VEML3328.
pub const DEFAULT_ADDRESS: u8 = 0x10;

/// Offset added to the code of a transport error raised while sampling in
/// [`Veml3328::auto_config`].
pub const SAMPLING_ERROR_OFFSET: u8 = 16;

/// Register addresses (command codes) of the VEML3328.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Control register (0x00)
    Config = 0x00,
    /// Clear channel output (0x04)
    Clear = 0x04,
    /// Red channel output (0x05)
    Red = 0x05,
    /// Green channel output (0x06)
    Green = 0x06,
    /// Blue channel output (0x07)
    Blue = 0x07,
    /// Infrared channel output (0x08)
    InfraRed = 0x08,
    /// Device ID, 0x28 in the low byte (0x0C)
    DeviceId = 0x0C,
}

impl From<Register> for u8 {
    fn from(r: Register) -> Self {
        r as u8
    }
}

/// Photodiode channels of the VEML3328.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Clear (unfiltered) channel
    Clear = 0x04,
    /// Red channel
    Red = 0x05,
    /// Green channel
    Green = 0x06,
    /// Blue channel
    Blue = 0x07,
    /// Infrared channel
    InfraRed = 0x08,
}

impl From<Channel> for Register {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Clear => Register::Clear,
            Channel::Red => Register::Red,
            Channel::Green => Register::Green,
            Channel::Blue => Register::Blue,
            Channel::InfraRed => Register::InfraRed,
        }
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel as u8
    }
}

impl TryFrom<u8> for Channel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x04 => Ok(Channel::Clear),
            0x05 => Ok(Channel::Red),
            0x06 => Ok(Channel::Green),
            0x07 => Ok(Channel::Blue),
            0x08 => Ok(Channel::InfraRed),
            _ => Err(value),
        }
    }
}

/// VEML3328 colour sensor driver.
///
/// The driver holds no measurement state: every setting lives in the device's control register.
/// It provides no locking, so a single instance must not be driven from several execution
/// contexts at once.
pub struct Veml3328<I2C> {
    /// I2C interface for communication with the sensor
    i2c: I2C,
    /// I2C address of the sensor
    address: u8,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E> Veml3328<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    /// Creates a new driver instance at the default address (0x10).
    ///
    /// This does not communicate with the sensor; call [`init`](Self::init) to wake it up.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use veml3328::Veml3328;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let mut sensor = Veml3328::new(i2c);
    /// ```
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    /// Creates a new driver instance at a custom address.
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Consumes the driver and returns the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Initializes the sensor by waking it up.
    ///
    /// # Errors
    ///
    /// Same as [`wake_up`](Self::wake_up).
    pub async fn init(&mut self) -> Result<(), Error<E>> {
        self.wake_up().await
    }

    /// Leaves shutdown mode.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    /// * `Err(Error::ConfirmMismatch { .. })` - If the device did not take the new state
    pub async fn wake_up(&mut self) -> Result<(), Error<E>> {
        info!("Waking up sensor");
        let mut config = Config::new();
        config.set_shutdown(ShutdownState::Awake);
        self.write_config(&config).await
    }

    /// Enters shutdown mode.
    ///
    /// # Errors
    ///
    /// Same as [`wake_up`](Self::wake_up).
    pub async fn shutdown(&mut self) -> Result<(), Error<E>> {
        info!("Shutting down sensor");
        let mut config = Config::new();
        config.set_shutdown(ShutdownState::Shutdown);
        self.write_config(&config).await
    }

    /// Returns `true` if the sensor is shut down.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn is_shutdown(&mut self) -> Result<bool, Error<E>> {
        let config = self.read_config().await?;
        Ok(config.shutdown() == Ok(ShutdownState::Shutdown))
    }

    /// Reads the low byte of the device ID register (0x28 for the VEML3328).
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    #[allow(clippy::cast_possible_truncation)]
    pub async fn device_id(&mut self) -> Result<u8, Error<E>> {
        let id = self.read_word(Register::DeviceId).await?;
        Ok((id & 0xFF) as u8)
    }

    /// Reads the control register. Every field of the returned configuration is known.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_config(&mut self) -> Result<Config, Error<E>> {
        let value = self.read_word(Register::Config).await?;
        Ok(Config::from_register(value))
    }

    /// Writes the known fields of `config` and leaves every other bit of the control register
    /// untouched. The write is read back and verified.
    ///
    /// An empty configuration is a no-op.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    /// * `Err(Error::ConfirmMismatch { .. })` - If the read-back differs from what was written
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use veml3328::{Config, Gain, Mode, Veml3328};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let mut sensor = Veml3328::new(i2c);
    ///
    /// let mut config = Config::new();
    /// config.set_gain(Gain::X2).set_mode(Mode::ActiveForce);
    /// sensor.write_config(&config).unwrap();
    /// ```
    pub async fn write_config(&mut self, config: &Config) -> Result<(), Error<E>> {
        let masked = config.masked();
        if masked.is_empty() {
            return Ok(());
        }
        self.write_word_masked(Register::Config, masked.value(), masked.mask(), true)
            .await
    }

    /// Sets the active channels.
    ///
    /// # Errors
    ///
    /// Same as [`write_config`](Self::write_config).
    pub async fn set_channel_select(&mut self, value: ChannelSelect) -> Result<(), Error<E>> {
        let mut config = Config::new();
        config.set_channel_select(value);
        self.write_config(&config).await
    }

    /// Sets the differential gain.
    ///
    /// # Errors
    ///
    /// Same as [`write_config`](Self::write_config).
    pub async fn set_differential_gain(
        &mut self,
        value: DifferentialGain,
    ) -> Result<(), Error<E>> {
        let mut config = Config::new();
        config.set_differential_gain(value);
        self.write_config(&config).await
    }

    /// Sets the analog gain.
    ///
    /// # Errors
    ///
    /// Same as [`write_config`](Self::write_config).
    pub async fn set_gain(&mut self, value: Gain) -> Result<(), Error<E>> {
        let mut config = Config::new();
        config.set_gain(value);
        self.write_config(&config).await
    }

    /// Sets the photodiode sensitivity.
    ///
    /// # Errors
    ///
    /// Same as [`write_config`](Self::write_config).
    pub async fn set_sensitivity(&mut self, value: Sensitivity) -> Result<(), Error<E>> {
        let mut config = Config::new();
        config.set_sensitivity(value);
        self.write_config(&config).await
    }

    /// Sets the integration time.
    ///
    /// # Errors
    ///
    /// Same as [`write_config`](Self::write_config).
    pub async fn set_integration_time(&mut self, value: IntegrationTime) -> Result<(), Error<E>> {
        let mut config = Config::new();
        config.set_integration_time(value);
        self.write_config(&config).await
    }

    /// Sets the measurement mode.
    ///
    /// # Errors
    ///
    /// Same as [`write_config`](Self::write_config).
    pub async fn set_mode(&mut self, value: Mode) -> Result<(), Error<E>> {
        let mut config = Config::new();
        config.set_mode(value);
        self.write_config(&config).await
    }

    /// Starts a single measurement in active-force mode.
    ///
    /// # Errors
    ///
    /// Same as [`write_config`](Self::write_config).
    pub async fn trigger(&mut self) -> Result<(), Error<E>> {
        let mut config = Config::new();
        config.set_trigger(Trigger::Fire);
        self.write_config(&config).await
    }

    /// Applies the settings recorded in `context`.
    ///
    /// # Errors
    ///
    /// * `Err(Error::MissingField(_))` - If `context` is an error context; nothing is written
    /// * `Err(Error::InvalidContext(u8))` - If the error bit is set with an unknown code
    /// * Otherwise same as [`write_config`](Self::write_config)
    pub async fn apply_context(&mut self, context: MeasurementContext) -> Result<(), Error<E>> {
        if let Some(field) = context.missing_field() {
            return Err(Error::MissingField(field));
        }
        if context.is_error() {
            return Err(Error::InvalidContext(context.bits()));
        }
        self.write_config(&context.decode()).await
    }

    /// Reads the raw count of one channel.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn channel_value(&mut self, channel: Channel) -> Result<u16, Error<E>> {
        self.read_word(Register::from(channel)).await
    }

    /// Reads the raw count of the channel register `channel` (0x04 to 0x08).
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidChannel(u8))` - If `channel` is not a channel register; the bus is
    ///   not touched
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn raw_channel_value(&mut self, channel: u8) -> Result<u16, Error<E>> {
        let channel = Channel::try_from(channel).map_err(|value| {
            error!("Invalid channel: {}", value);
            Error::InvalidChannel(value)
        })?;
        self.channel_value(channel).await
    }

    /// Reads one channel and scales it to universal units using the current settings.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    /// * `Err(Error::MissingField(_))` - If the control register holds a reserved code
    pub async fn universal_value(&mut self, channel: Channel) -> Result<u32, Error<E>> {
        let config = self.read_config().await?;
        let raw = self.channel_value(channel).await?;
        to_universal_unit(&config, raw).map_err(Error::MissingField)
    }

    /// Picks the most sensitive setting under which `channel` will not saturate.
    ///
    /// The sensor is switched to [`REFERENCE_STEP`] and `channel` is sampled once. The settings
    /// are chosen with [`fitting_context`] at [`AUTO_RANGE_THRESHOLD`]. They are returned but not
    /// applied; pass them to [`apply_context`](Self::apply_context).
    ///
    /// The sample is read right after the reference settings are written. In continuous mode it
    /// reflects whatever integration was in progress; the caller is responsible for any settling
    /// delay between the two.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` / `Err(Error::ConfirmMismatch { .. })` - If applying the
    ///   reference settings failed
    /// * `Err(Error::Sampling(E))` - If reading the sample failed
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use veml3328::{Channel, Veml3328};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let mut sensor = Veml3328::new(i2c);
    ///
    /// let context = sensor.auto_config(Channel::Clear).unwrap();
    /// sensor.apply_context(context).unwrap();
    /// ```
    pub async fn auto_config(&mut self, channel: Channel) -> Result<MeasurementContext, Error<E>> {
        let reference = SENSITIVITY_STEPS[REFERENCE_STEP];
        debug!(
            "Auto-ranging: probing with context {:#x}",
            reference.context.bits()
        );
        self.write_config(&reference.context.decode()).await?;

        let raw = match self.channel_value(channel).await {
            Ok(raw) => raw,
            Err(Error::I2cError(e)) => return Err(Error::Sampling(e)),
            Err(e) => return Err(e),
        };

        let index = fitting_step(raw, AUTO_RANGE_THRESHOLD);
        let context = SENSITIVITY_STEPS[index].context;
        debug!(
            "Auto-ranging: probe count {} selects step {} (context {:#x})",
            raw,
            index,
            context.bits()
        );
        Ok(context)
    }

    /// Writes a 16-bit word to a sensor register, LSB first.
    ///
    /// **Note**: Most applications should use the higher-level configuration functions
    /// instead of calling this directly.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn write_word<R>(&mut self, register_address: R, value: u16) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        let reg: u8 = register_address.into();
        let [lsb, msb] = value.to_le_bytes();
        trace!("write {:#x} <- {:#x}", reg, value);
        self.i2c.write(self.address, &[reg, lsb, msb]).await?;
        Ok(())
    }

    /// Reads a 16-bit word from a sensor register, LSB first.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use veml3328::{Register, Veml3328};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let mut sensor = Veml3328::new(i2c);
    ///
    /// let config = sensor.read_word(Register::Config).unwrap();
    /// println!("Config: 0x{:04X}", config);
    /// ```
    pub async fn read_word<R>(&mut self, register_address: R) -> Result<u16, Error<E>>
    where
        R: Into<u8>,
    {
        let reg: u8 = register_address.into();
        let mut read_buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut read_buffer)
            .await?;
        let value = u16::from_le_bytes(read_buffer);
        trace!("read {:#x} -> {:#x}", reg, value);
        Ok(value)
    }

    /// Replaces the bits of `mask` in a register with those of `value`.
    ///
    /// The register is read, modified and written back. With `confirm` it is read once more and
    /// the masked bits are compared against `value`.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    /// * `Err(Error::ConfirmMismatch { .. })` - If `confirm` is set and the read-back differs
    pub async fn write_word_masked<R>(
        &mut self,
        register_address: R,
        value: u16,
        mask: u16,
        confirm: bool,
    ) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        let reg: u8 = register_address.into();
        let current = self.read_word(reg).await?;
        let updated = (current & !mask) | (value & mask);
        self.write_word(reg, updated).await?;

        if confirm {
            let actual = self.read_word(reg).await? & mask;
            let expected = value & mask;
            if actual != expected {
                warn!(
                    "Confirm failed on {:#x}: expected {:#x}, got {:#x}",
                    reg, expected, actual
                );
                return Err(Error::ConfirmMismatch { expected, actual });
            }
        }
        Ok(())
    }
}

/// Error type for VEML3328 sensor operations.
///
/// # Examples
///
/// ```rust,no_run
/// use veml3328::{Channel, Error};
///
/// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
/// let mut sensor = veml3328::Veml3328::new(i2c);
///
/// match sensor.auto_config(Channel::Green) {
///     Ok(context) => println!("Selected context 0x{:02X}", context.bits()),
///     Err(Error::Sampling(e)) => println!("Sampling failed: {:?}", e),
///     Err(e) => println!("Error {}: {:?}", e.code(), e),
/// }
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// I2C communication error from the underlying hardware
    I2cError(E),
    /// A confirmed write read back different bits (both values masked)
    ConfirmMismatch {
        /// Bits that were written
        expected: u16,
        /// Bits that were read back
        actual: u16,
    },
    /// I2C communication error while sampling in [`Veml3328::auto_config`]
    Sampling(E),
    /// Not a channel register
    InvalidChannel(u8),
    /// A signal-affecting setting was unset or reserved
    MissingField(MissingField),
    /// A measurement context with the error bit set but no known field code
    InvalidContext(u8),
}

impl<E: embedded_hal::i2c::Error> Error<E> {
    /// Numeric error code, compatible with the Arduino Wire status scheme.
    ///
    /// | Error | Code |
    /// |---|---|
    /// | overrun | 1 |
    /// | NACK on address | 2 |
    /// | NACK on data | 3 |
    /// | other bus error | 4 |
    /// | confirm mismatch | 6 |
    /// | invalid channel | 8 |
    /// | sampling error | bus code + 16 |
    /// | missing field | `0x80 \| field code` |
    /// | invalid context | the context byte |
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Error::I2cError(e) => bus_code(e.kind()),
            Error::ConfirmMismatch { .. } => 6,
            Error::Sampling(e) => bus_code(e.kind()) + SAMPLING_ERROR_OFFSET,
            Error::InvalidChannel(_) => 8,
            Error::MissingField(field) => MeasurementContext::missing(*field).bits(),
            Error::InvalidContext(bits) => *bits,
        }
    }
}

fn bus_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Overrun => 1,
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data) => 3,
        ErrorKind::NoAcknowledge(_) => 2,
        _ => 4,
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2cError(error)
    }
}
