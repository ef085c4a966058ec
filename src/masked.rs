//! Partial register values.
//!
//! A [`MaskedRegister`] pairs a 16-bit register value with a mask recording which bits of the
//! value are actually known. Bits outside the mask are always kept at zero.

/// A 16-bit register value of which only the bits in `mask` are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MaskedRegister {
    value: u16,
    mask: u16,
}

impl MaskedRegister {
    /// A value with no known bits.
    pub const EMPTY: Self = Self { value: 0, mask: 0 };

    /// Creates a value from its raw parts. Bits of `value` outside `mask` are discarded.
    #[must_use]
    pub const fn from_parts(value: u16, mask: u16) -> Self {
        Self {
            value: value & mask,
            mask,
        }
    }

    /// The known bits, with every unknown bit cleared.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.value
    }

    /// The set of known bits.
    #[must_use]
    pub const fn mask(&self) -> u16 {
        self.mask
    }

    /// Returns `true` if no bit is known.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Returns `true` if every bit in `field_mask` is known.
    #[must_use]
    pub const fn is_known(&self, field_mask: u16) -> bool {
        self.mask & field_mask == field_mask
    }

    /// Writes `bits << shift` into the bits selected by `field_mask` and marks them known.
    ///
    /// Bits of the shifted value falling outside `field_mask` are dropped, so a field can never
    /// spill into its neighbours. Setting the same field twice keeps the last value. A `shift` of
    /// 16 or more shifts every bit out, so the field is written as zero.
    pub fn set_field(&mut self, bits: u16, field_mask: u16, shift: u8) {
        let shifted = bits.checked_shl(u32::from(shift)).unwrap_or(0);
        self.value = (self.value & !field_mask) | (shifted & field_mask);
        self.mask |= field_mask;
    }

    /// Reads the field selected by `field_mask`, shifted down to bit 0.
    ///
    /// Returns `None` unless every bit of the field is known, or if `shift` is 16 or more.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn field(&self, field_mask: u16, shift: u8) -> Option<u16> {
        if self.is_known(field_mask) {
            (self.value & field_mask).checked_shr(shift as u32)
        } else {
            None
        }
    }

    /// Merges `later` on top of `self`.
    ///
    /// Bits known only to one side are taken from that side; on overlapping bits `later` wins.
    #[must_use]
    pub const fn merge(self, later: Self) -> Self {
        Self {
            value: (self.value & !later.mask) | (later.value & later.mask),
            mask: self.mask | later.mask,
        }
    }
}
