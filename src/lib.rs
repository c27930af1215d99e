#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod bitfield;
pub mod interface;
pub mod motor;
pub mod register;
pub mod registers;
pub mod units;

// Re-export main types
pub use bitfield::BitField;
pub use interface::{BusAccess, MmioBus, MmioError};
pub use motor::Motor;
pub use register::{CacheState, Register, RegisterKind, Writable};
pub use registers::{Ctrl, FreqTgt, PwmCmp, RegisterMap, Stat};
pub use units::{Frequency, FrequencyUnit, Period, RotationalSpeed, SpeedUnit, TimeUnit};

/// Largest PWM prescaler exponent accepted by the IP core
pub const MAX_PRESCALER: u32 = 32;

/// Largest commutation phase
pub const MAX_PHASE: u8 = 5;

/// Largest value of the `PWM_MAXCNT` field
pub const MAX_PWM_MAX_COUNT: u16 = 0xFFFF;

/// Input parameters validated by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parameter {
    /// PWM duty percentage (0-100)
    PwmDuty,
    /// Commutation phase (0-5)
    Phase,
    /// PWM prescaler exponent (0-32)
    Prescaler,
    /// PWM period for the selected prescaler
    PwmPeriod,
    /// Rotational speed (must fit a 32-bit rps count)
    RotationalSpeed,
    /// IP clock frequency (1 Hz to `u32::MAX` Hz)
    ClockFrequency,
}

/// Registers of the IP core, used to report cache conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterName {
    /// `FREQ_TGT`
    FreqTgt,
    /// `PWM_CMP`
    PwmCmp,
    /// `CTRL`
    Ctrl,
    /// `STAT`
    Stat,
}

/// Values derived from register contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Telemetry {
    /// Hardware IP version string
    HwIpVersion,
    /// Deadtime
    Deadtime,
    /// PWM duty percentage
    PwmDuty,
    /// PWM period
    PwmPeriod,
    /// Output enable bit
    OutputEnable,
}

/// Driver errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Bus accessor error, passed through unchanged
    Bus(E),
    /// Parameter outside its legal range
    OutOfRange(Parameter),
    /// Operation needs a register cache without pending cache-only writes
    InconsistentCacheState(RegisterName),
    /// Value could not be derived from the current register contents
    UnresolvedTelemetry(Telemetry),
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}

impl<E: core::fmt::Display> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(error) => write!(f, "bus access failed: {error}"),
            Self::OutOfRange(parameter) => write!(f, "{parameter:?} is out of range"),
            Self::InconsistentCacheState(register) => {
                write!(f, "{register:?} cache has unflushed modifications")
            }
            Self::UnresolvedTelemetry(value) => {
                write!(f, "{value:?} cannot be resolved from the registers")
            }
        }
    }
}

impl<E: core::fmt::Debug + core::fmt::Display> core::error::Error for Error<E> {}
