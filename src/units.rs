//! Unit-tagged quantities used by the motor API
//!
//! Internally the driver works in one canonical unit per quantity: whole
//! rotations per second, nanoseconds, and hertz. The types here carry a count
//! together with its unit and convert at the API boundary only. Conversions
//! towards a coarser unit truncate, like integer duration casts.

/// Rotational speed units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpeedUnit {
    /// Rotations per second
    Rps,
    /// Rotations per minute
    Rpm,
}

impl SpeedUnit {
    /// Number of units that make one rotation per second
    #[must_use]
    pub const fn per_rps(self) -> u64 {
        match self {
            Self::Rps => 1,
            Self::Rpm => 60,
        }
    }
}

/// A rotational speed in a given unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RotationalSpeed {
    count: u64,
    unit: SpeedUnit,
}

impl RotationalSpeed {
    /// Create a speed of `count` units
    #[must_use]
    pub const fn new(count: u64, unit: SpeedUnit) -> Self {
        Self { count, unit }
    }

    /// Speed in rotations per second
    #[must_use]
    pub const fn rps(count: u64) -> Self {
        Self::new(count, SpeedUnit::Rps)
    }

    /// Speed in rotations per minute
    #[must_use]
    pub const fn rpm(count: u64) -> Self {
        Self::new(count, SpeedUnit::Rpm)
    }

    /// Raw count in [`unit`](Self::unit)
    #[must_use]
    pub const fn count(self) -> u64 {
        self.count
    }

    /// Unit of [`count`](Self::count)
    #[must_use]
    pub const fn unit(self) -> SpeedUnit {
        self.unit
    }

    /// Whole rotations per second, truncating
    #[must_use]
    pub const fn as_rps(self) -> u64 {
        self.count / self.unit.per_rps()
    }

    /// Express a whole number of rotations per second in `unit`
    #[must_use]
    pub const fn from_rps(rps: u32, unit: SpeedUnit) -> Self {
        Self::new(rps as u64 * unit.per_rps(), unit)
    }
}

/// Time units for PWM periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeUnit {
    /// Nanoseconds
    Nanos,
    /// Microseconds
    Micros,
    /// Milliseconds
    Millis,
    /// Seconds
    Secs,
}

impl TimeUnit {
    /// Nanoseconds in one unit
    #[must_use]
    pub const fn nanos(self) -> u128 {
        match self {
            Self::Nanos => 1,
            Self::Micros => 1_000,
            Self::Millis => 1_000_000,
            Self::Secs => 1_000_000_000,
        }
    }
}

/// A time span in a given unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Period {
    count: u64,
    unit: TimeUnit,
}

impl Period {
    /// Create a period of `count` units
    #[must_use]
    pub const fn new(count: u64, unit: TimeUnit) -> Self {
        Self { count, unit }
    }

    /// Period in nanoseconds
    #[must_use]
    pub const fn nanos(count: u64) -> Self {
        Self::new(count, TimeUnit::Nanos)
    }

    /// Period in microseconds
    #[must_use]
    pub const fn micros(count: u64) -> Self {
        Self::new(count, TimeUnit::Micros)
    }

    /// Period in milliseconds
    #[must_use]
    pub const fn millis(count: u64) -> Self {
        Self::new(count, TimeUnit::Millis)
    }

    /// Period in seconds
    #[must_use]
    pub const fn secs(count: u64) -> Self {
        Self::new(count, TimeUnit::Secs)
    }

    /// Raw count in [`unit`](Self::unit)
    #[must_use]
    pub const fn count(self) -> u64 {
        self.count
    }

    /// Unit of [`count`](Self::count)
    #[must_use]
    pub const fn unit(self) -> TimeUnit {
        self.unit
    }

    /// Length in nanoseconds
    #[must_use]
    pub const fn as_nanos(self) -> u128 {
        self.count as u128 * self.unit.nanos()
    }

    /// Express `nanos` in `unit`, truncating
    ///
    /// Returns `None` if the count does not fit in a `u64`.
    #[must_use]
    pub fn from_nanos(nanos: u128, unit: TimeUnit) -> Option<Self> {
        u64::try_from(nanos / unit.nanos())
            .ok()
            .map(|count| Self::new(count, unit))
    }

    /// Same span in `unit`, truncating
    ///
    /// Returns `None` if the count does not fit in a `u64`.
    #[must_use]
    pub fn to_unit(self, unit: TimeUnit) -> Option<Self> {
        Self::from_nanos(self.as_nanos(), unit)
    }
}

impl From<core::time::Duration> for Period {
    /// Saturates at `u64::MAX` nanoseconds (about 584 years)
    fn from(duration: core::time::Duration) -> Self {
        Self::nanos(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
    }
}

impl From<Period> for core::time::Duration {
    /// Saturates at `Duration::MAX`
    fn from(period: Period) -> Self {
        let nanos = period.as_nanos();
        let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
        // Always below one second, so the cast is lossless.
        #[allow(clippy::cast_possible_truncation)]
        let sub = (nanos % 1_000_000_000) as u32;
        Self::new(secs, sub)
    }
}

/// Clock frequency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrequencyUnit {
    /// Hertz
    Hz,
    /// Kilohertz
    KHz,
    /// Megahertz
    MHz,
}

impl FrequencyUnit {
    /// Hertz in one unit
    #[must_use]
    pub const fn hz(self) -> u64 {
        match self {
            Self::Hz => 1,
            Self::KHz => 1_000,
            Self::MHz => 1_000_000,
        }
    }
}

/// A clock frequency in a given unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frequency {
    count: u64,
    unit: FrequencyUnit,
}

impl Frequency {
    /// Create a frequency of `count` units
    #[must_use]
    pub const fn new(count: u64, unit: FrequencyUnit) -> Self {
        Self { count, unit }
    }

    /// Frequency in hertz
    #[must_use]
    pub const fn hz(count: u64) -> Self {
        Self::new(count, FrequencyUnit::Hz)
    }

    /// Frequency in kilohertz
    #[must_use]
    pub const fn khz(count: u64) -> Self {
        Self::new(count, FrequencyUnit::KHz)
    }

    /// Frequency in megahertz
    #[must_use]
    pub const fn mhz(count: u64) -> Self {
        Self::new(count, FrequencyUnit::MHz)
    }

    /// Frequency in hertz, or `None` on overflow
    #[must_use]
    pub const fn as_hz(self) -> Option<u64> {
        self.count.checked_mul(self.unit.hz())
    }
}
