//! Register definitions for the BLDC motor IP core
//!
//! The core exposes four 32-bit registers at fixed offsets from a base address:
//!
//! | Offset | Register | Reset | Access |
//! |--------|----------|-------|--------|
//! | `0x00` | [`FreqTgt`] | `0x0000_0000` | read/write |
//! | `0x04` | [`PwmCmp`]  | `0x0000_0000` | read/write |
//! | `0x08` | [`Ctrl`]    | `0x0FFF_F000` | read/write |
//! | `0x0C` | [`Stat`]    | `0x0000_0000` | read-only  |
//!
//! Each register kind carries its bit fields as associated constants. The
//! typed accessors below are thin read-modify-write wrappers around
//! [`Register::field`] and [`Register::set_field`] and take the same
//! `from_cache` / `cache_only` flags.

use crate::bitfield::BitField;
use crate::interface::BusAccess;
use crate::register::{Register, RegisterKind, Writable};

// ==================== FREQ_TGT ====================

/// FREQ_TGT - rotational speed target (offset 0x00)
///
/// The whole word is the target speed in rotations per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreqTgt;

impl FreqTgt {
    /// Target rotational speed in rotations per second
    pub const FREQTGT: BitField = BitField::new(0, 32);
}

impl RegisterKind for FreqTgt {
    const OFFSET: u32 = 0x00;
    const RESET: u32 = 0x0000_0000;
}

impl Writable for FreqTgt {}

impl<B: BusAccess> Register<FreqTgt, B> {
    /// Set the target speed in rotations per second
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn set_freq_tgt(&mut self, rps: u32, cache_only: bool) -> Result<(), B::Error> {
        self.write(rps, cache_only)
    }

    /// Target speed in rotations per second
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn freq_tgt(&mut self, from_cache: bool) -> Result<u32, B::Error> {
        self.read(from_cache)
    }
}

// ==================== PWM_CMP ====================

/// PWM_CMP - PWM comparator threshold (offset 0x04)
///
/// The output is driven while the PWM counter is below the comparator, so a
/// comparator above `PWM_MAXCNT` keeps the output always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmCmp;

impl PwmCmp {
    /// Comparator threshold (17 bits, one more than `PWM_MAXCNT`)
    pub const PWM_CMP: BitField = BitField::new(0, 17);
}

impl RegisterKind for PwmCmp {
    const OFFSET: u32 = 0x04;
    const RESET: u32 = 0x0000_0000;
}

impl Writable for PwmCmp {}

impl<B: BusAccess> Register<PwmCmp, B> {
    /// Set the comparator threshold
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn set_pwm_cmp(&mut self, value: u32, cache_only: bool) -> Result<(), B::Error> {
        self.set_field(PwmCmp::PWM_CMP, value, cache_only)
    }

    /// Comparator threshold
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn pwm_cmp(&mut self, from_cache: bool) -> Result<u32, B::Error> {
        self.field(PwmCmp::PWM_CMP, from_cache)
    }
}

// ==================== CTRL ====================

/// CTRL - control register (offset 0x08)
///
/// ```text
///  31   28 27              12 11      6  5   4   2  1  0
/// +-------+------------------+---------+---+-----+--+--+
/// |   -   |    PWM_MAXCNT    | PWM_PRSC| W |PHASE|- |EN|
/// +-------+------------------+---------+---+-----+--+--+
/// ```
///
/// `W_PHASE` is a strobe: hardware latches `PHASE` when it is written high and
/// clears it on its own. The cache mirrors that by clearing the bit after every
/// flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ctrl;

impl Ctrl {
    /// Output enable
    pub const EN: BitField = BitField::new(0, 1);
    /// Commutation phase (0-5)
    pub const PHASE: BitField = BitField::new(2, 3);
    /// Phase write strobe
    pub const W_PHASE: BitField = BitField::new(5, 1);
    /// PWM prescaler, as a power-of-two exponent
    pub const PWM_PRSC: BitField = BitField::new(6, 6);
    /// PWM counter maximum
    pub const PWM_MAXCNT: BitField = BitField::new(12, 16);

    /// `EN` value: output disabled
    pub const EN_DISABLE: u32 = 0x00;
    /// `EN` value: output enabled
    pub const EN_ENABLE: u32 = 0x01;
    /// `W_PHASE` value: leave phase untouched
    pub const W_PHASE_NOT_WRITE: u32 = 0x00;
    /// `W_PHASE` value: latch `PHASE`
    pub const W_PHASE_WRITE: u32 = 0x01;
}

impl RegisterKind for Ctrl {
    const OFFSET: u32 = 0x08;
    const RESET: u32 = 0x0FFF_F000;

    fn after_flush(cache: u32) -> u32 {
        Self::W_PHASE.set(cache, Self::W_PHASE_NOT_WRITE)
    }
}

impl Writable for Ctrl {}

impl<B: BusAccess> Register<Ctrl, B> {
    /// Set the PWM counter maximum
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn set_pwm_max_count(&mut self, value: u16, cache_only: bool) -> Result<(), B::Error> {
        self.set_field(Ctrl::PWM_MAXCNT, u32::from(value), cache_only)
    }

    /// PWM counter maximum
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn pwm_max_count(&mut self, from_cache: bool) -> Result<u16, B::Error> {
        // 16-bit field, so the cast is lossless
        #[allow(clippy::cast_possible_truncation)]
        let value = self.field(Ctrl::PWM_MAXCNT, from_cache)? as u16;
        Ok(value)
    }

    /// Set the PWM prescaler exponent
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn set_pwm_prescaler(&mut self, value: u8, cache_only: bool) -> Result<(), B::Error> {
        self.set_field(Ctrl::PWM_PRSC, u32::from(value), cache_only)
    }

    /// PWM prescaler exponent
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn pwm_prescaler(&mut self, from_cache: bool) -> Result<u8, B::Error> {
        #[allow(clippy::cast_possible_truncation)]
        let value = self.field(Ctrl::PWM_PRSC, from_cache)? as u8;
        Ok(value)
    }

    /// Set the commutation phase
    ///
    /// `W_PHASE` is raised in the same word so hardware latches the new phase.
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn set_phase(&mut self, value: u8, cache_only: bool) -> Result<(), B::Error> {
        self.set_fields(
            &[
                (Ctrl::PHASE, u32::from(value)),
                (Ctrl::W_PHASE, Ctrl::W_PHASE_WRITE),
            ],
            cache_only,
        )
    }

    /// Commutation phase
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn phase(&mut self, from_cache: bool) -> Result<u8, B::Error> {
        #[allow(clippy::cast_possible_truncation)]
        let value = self.field(Ctrl::PHASE, from_cache)? as u8;
        Ok(value)
    }

    /// Set the raw output enable bit
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn set_enable(&mut self, value: u32, cache_only: bool) -> Result<(), B::Error> {
        self.set_field(Ctrl::EN, value, cache_only)
    }

    /// Raw output enable bit
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn enable(&mut self, from_cache: bool) -> Result<u32, B::Error> {
        self.field(Ctrl::EN, from_cache)
    }
}

// ==================== STAT ====================

/// STAT - status register (offset 0x0C, read-only)
///
/// Only the read half of the register API is available for this kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat;

impl Stat {
    /// Motor stopped flag
    pub const STOP: BitField = BitField::new(0, 1);
    /// Target frequency was reflected by the speed controller
    pub const REFLECTEDFREQ: BitField = BitField::new(1, 1);
    /// Configured deadtime
    pub const DEADTIME: BitField = BitField::new(20, 4);
    /// IP release counter
    pub const RELCNT: BitField = BitField::new(24, 8);

    /// `STOP` value: rotor is turning
    pub const STOP_ROTATING: u32 = 0x00;
    /// `STOP` value: rotor is stopping or stopped
    pub const STOP_STOPPING: u32 = 0x01;
    /// `REFLECTEDFREQ` value: target not yet reflected
    pub const REFLECTEDFREQ_NOT_REFLECTED: u32 = 0x00;
    /// `REFLECTEDFREQ` value: target reflected
    pub const REFLECTEDFREQ_REFLECTED: u32 = 0x01;

    /// Hardware IP version indexed by `RELCNT`
    pub const VERSION_TABLE: [&'static str; 2] = ["UNDR 2.10", "2.10"];

    /// Look up the hardware IP version for a release counter
    ///
    /// Returns `None` for counters newer than this driver knows about.
    #[must_use]
    pub fn version(rel_cnt: u8) -> Option<&'static str> {
        Self::VERSION_TABLE.get(usize::from(rel_cnt)).copied()
    }
}

impl RegisterKind for Stat {
    const OFFSET: u32 = 0x0C;
    const RESET: u32 = 0x0000_0000;
}

impl<B: BusAccess> Register<Stat, B> {
    /// IP release counter
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn rel_cnt(&mut self, from_cache: bool) -> Result<u8, B::Error> {
        #[allow(clippy::cast_possible_truncation)]
        let value = self.field(Stat::RELCNT, from_cache)? as u8;
        Ok(value)
    }

    /// Deadtime
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn deadtime(&mut self, from_cache: bool) -> Result<u8, B::Error> {
        #[allow(clippy::cast_possible_truncation)]
        let value = self.field(Stat::DEADTIME, from_cache)? as u8;
        Ok(value)
    }

    /// Raw reflected-frequency flag
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn reflected_freq(&mut self, from_cache: bool) -> Result<u32, B::Error> {
        self.field(Stat::REFLECTEDFREQ, from_cache)
    }

    /// Raw stop flag
    ///
    /// # Errors
    ///
    /// Returns the transport error if a bus access fails.
    pub fn stop(&mut self, from_cache: bool) -> Result<u32, B::Error> {
        self.field(Stat::STOP, from_cache)
    }
}

// ==================== REGISTER MAP ====================

/// The four registers of one motor IP instance
///
/// Every register is bound to `base + offset` and holds its own clone of the
/// bus handle. The map keeps one more clone, returned by
/// [`release`](Self::release).
#[derive(Debug)]
pub struct RegisterMap<B> {
    bus: B,
    base: u32,
    /// Rotational speed target
    pub freq_tgt: Register<FreqTgt, B>,
    /// PWM comparator
    pub pwm_cmp: Register<PwmCmp, B>,
    /// Control
    pub ctrl: Register<Ctrl, B>,
    /// Status
    pub stat: Register<Stat, B>,
}

impl<B> RegisterMap<B>
where
    B: BusAccess + Clone,
{
    /// Create the register map for the IP core at `base`
    ///
    /// No bus access is performed; every register starts
    /// [`Initialized`](crate::CacheState::Initialized).
    pub fn new(bus: B, base: u32) -> Self {
        Self {
            freq_tgt: Register::new(bus.clone(), base),
            pwm_cmp: Register::new(bus.clone(), base),
            ctrl: Register::new(bus.clone(), base),
            stat: Register::new(bus.clone(), base),
            bus,
            base,
        }
    }

    /// Base address of the IP core
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Shared bus handle
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    /// Consume the map and return the bus handle
    pub fn release(self) -> B {
        self.bus
    }
}
