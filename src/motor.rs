//! High-level motor API
//!
//! [`Motor`] wraps a [`RegisterMap`] and speaks in domain units: rotational
//! speed, duty percentage, PWM period and prescaler, commutation phase, output
//! enable, and the read-only status telemetry. All timing arithmetic is done in
//! integers (nanoseconds and hertz, widened to `u128`) so the values written to
//! the hardware counters never pick up floating-point error.
//!
//! # Example
//!
//! ```ignore
//! use bldcm::{Frequency, Motor, Period, RotationalSpeed, SpeedUnit};
//!
//! let mut motor = Motor::new(&bus, Frequency::mhz(50), 0x0000_0000)?;
//! println!("IP version {}", motor.hw_ip_version()?);
//!
//! motor.set_pwm_period(Period::micros(20), 0)?;
//! motor.set_pwm_duty(40)?;
//! motor.set_rotational_speed(RotationalSpeed::rpm(1200))?;
//! motor.set_output_enable(true)?;
//!
//! let rpm = motor.rotational_speed(SpeedUnit::Rpm)?;
//! ```

use crate::interface::BusAccess;
use crate::register::CacheState;
use crate::registers::{Ctrl, RegisterMap, Stat};
use crate::units::{Frequency, Period, RotationalSpeed, SpeedUnit, TimeUnit};
use crate::{
    Error, MAX_PHASE, MAX_PRESCALER, MAX_PWM_MAX_COUNT, Parameter, RegisterName, Telemetry,
};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Fail if a register cache holds unflushed cache-only writes
fn ensure_unmodified<E>(state: CacheState, register: RegisterName) -> Result<(), Error<E>> {
    if state == CacheState::Modified {
        Err(Error::InconsistentCacheState(register))
    } else {
        Ok(())
    }
}

/// Duty percentage implied by a comparator and counter maximum
///
/// A comparator above the maximum keeps the output always on. A zero maximum
/// with a zero comparator carries no duty information.
fn duty_from_registers(pwm_cmp: u32, max_count: u32) -> Option<u8> {
    if pwm_cmp > max_count {
        Some(100)
    } else if max_count > 0 {
        // Round half up; pwm_cmp <= max_count keeps the result within 0..=100.
        let duty = (u64::from(pwm_cmp) * 100 + u64::from(max_count / 2)) / u64::from(max_count);
        u8::try_from(duty).ok()
    } else {
        None
    }
}

/// Driver for one instance of the BLDC motor IP core
///
/// The motor owns its register map and therefore its register caches. The bus
/// handle `B` is shared: it is cloned into the map and never closed by the
/// motor.
#[derive(Debug)]
pub struct Motor<B> {
    registers: RegisterMap<B>,
    clock_hz: u32,
    hw_ip_version: Option<&'static str>,
    deadtime: Option<u8>,
    pwm_duty: Option<u8>,
}

impl<B> Motor<B>
where
    B: BusAccess + Clone,
{
    /// Create a motor driver for the IP core at `base`, clocked at `clock`
    ///
    /// Reads the status register once to resolve the hardware IP version and
    /// deadtime, then derives the current PWM duty from `PWM_CMP` and `CTRL`.
    /// An unknown release counter or an underivable duty does not fail
    /// construction; the value is simply left unresolved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the clock is zero or above `u32::MAX`
    /// hertz, or the bus error if the status register cannot be read.
    pub fn new(bus: B, clock: Frequency, base: u32) -> Result<Self, Error<B::Error>> {
        let clock_hz = clock
            .as_hz()
            .and_then(|hz| u32::try_from(hz).ok())
            .filter(|&hz| hz > 0)
            .ok_or(Error::OutOfRange(Parameter::ClockFrequency))?;

        let mut motor = Self {
            registers: RegisterMap::new(bus, base),
            clock_hz,
            hw_ip_version: None,
            deadtime: None,
            pwm_duty: None,
        };

        motor.registers.stat.update_cache()?;
        motor.fetch_hw_ip_version(true)?;
        motor.fetch_deadtime(true)?;

        // The duty stays unresolved until asked for again.
        let _ = motor.refresh_pwm_duty();

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "motor {=u32:#x}: version={} deadtime={} duty={}",
            base,
            motor.hw_ip_version,
            motor.deadtime,
            motor.pwm_duty
        );

        Ok(motor)
    }

    /// IP clock frequency in hertz
    pub const fn clock_frequency_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Underlying register map (for advanced usage)
    pub const fn registers(&self) -> &RegisterMap<B> {
        &self.registers
    }

    /// Mutable access to the underlying register map (for advanced usage)
    ///
    /// Cache-only writes made through this handle are seen by the motor's
    /// cache-state checks.
    pub const fn registers_mut(&mut self) -> &mut RegisterMap<B> {
        &mut self.registers
    }

    /// Consume the motor and return the bus handle
    pub fn release(self) -> B {
        self.registers.release()
    }

    // ==================== ROTATIONAL SPEED ====================

    /// Set the target rotational speed
    ///
    /// The speed is truncated to whole rotations per second and written to
    /// `FREQ_TGT` immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the speed exceeds `u32::MAX` rps, or
    /// the bus error if the write fails.
    pub fn set_rotational_speed(&mut self, speed: RotationalSpeed) -> Result<(), Error<B::Error>> {
        let rps = u32::try_from(speed.as_rps())
            .map_err(|_| Error::OutOfRange(Parameter::RotationalSpeed))?;
        self.registers.freq_tgt.set_freq_tgt(rps, false)?;
        Ok(())
    }

    /// Target rotational speed, read from hardware, expressed in `unit`
    ///
    /// # Errors
    ///
    /// Returns the bus error if the read fails.
    pub fn rotational_speed(
        &mut self,
        unit: SpeedUnit,
    ) -> Result<RotationalSpeed, Error<B::Error>> {
        let rps = self.registers.freq_tgt.freq_tgt(false)?;
        Ok(RotationalSpeed::from_rps(rps, unit))
    }

    // ==================== PWM DUTY ====================

    /// Set the PWM duty in percent (0-100)
    ///
    /// The comparator is computed against the current `PWM_MAXCNT`:
    /// `max * duty / 100`, or `max + 1` at 100% so the output never switches
    /// off. `PWM_MAXCNT` comes from hardware if `CTRL` was never accessed and
    /// from the cache otherwise.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] if `percent` is not in 0..=100
    /// - [`Error::InconsistentCacheState`] if `CTRL` has unflushed cache-only writes
    /// - the bus error if a register access fails
    pub fn set_pwm_duty(&mut self, percent: i32) -> Result<(), Error<B::Error>> {
        let percent = u8::try_from(percent)
            .ok()
            .filter(|&percent| percent <= 100)
            .ok_or(Error::OutOfRange(Parameter::PwmDuty))?;

        let max_count = match self.registers.ctrl.state() {
            CacheState::Initialized => self.registers.ctrl.pwm_max_count(false)?,
            CacheState::Synced => self.registers.ctrl.pwm_max_count(true)?,
            CacheState::Modified => return Err(Error::InconsistentCacheState(RegisterName::Ctrl)),
        };
        let max_count = u32::from(max_count);

        let pwm_cmp = if percent == 100 {
            max_count + 1
        } else {
            max_count * u32::from(percent) / 100
        };

        self.registers.pwm_cmp.set_pwm_cmp(pwm_cmp, false)?;
        self.pwm_duty = Some(percent);
        Ok(())
    }

    /// PWM duty in percent
    ///
    /// Returns the last duty set through this driver. If none is known, the
    /// duty is derived from `PWM_CMP` and `PWM_MAXCNT` read from hardware,
    /// rounded to the nearest percent.
    ///
    /// # Errors
    ///
    /// - [`Error::InconsistentCacheState`] if `PWM_CMP` or `CTRL` has unflushed
    ///   cache-only writes
    /// - [`Error::UnresolvedTelemetry`] if both registers are zero
    /// - the bus error if a register read fails
    pub fn pwm_duty(&mut self) -> Result<u8, Error<B::Error>> {
        if let Some(duty) = self.pwm_duty {
            return Ok(duty);
        }
        self.refresh_pwm_duty()?
            .ok_or(Error::UnresolvedTelemetry(Telemetry::PwmDuty))
    }

    fn refresh_pwm_duty(&mut self) -> Result<Option<u8>, Error<B::Error>> {
        ensure_unmodified(self.registers.ctrl.state(), RegisterName::Ctrl)?;
        ensure_unmodified(self.registers.pwm_cmp.state(), RegisterName::PwmCmp)?;

        let pwm_cmp = self.registers.pwm_cmp.pwm_cmp(false)?;
        let max_count = self.registers.ctrl.pwm_max_count(false)?;

        self.pwm_duty = duty_from_registers(pwm_cmp, u32::from(max_count));
        Ok(self.pwm_duty)
    }

    // ==================== OUTPUT ENABLE ====================

    /// Enable or disable the motor output
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentCacheState`] if `CTRL` has unflushed
    /// cache-only writes, or the bus error if the write fails.
    pub fn set_output_enable(&mut self, enable: bool) -> Result<(), Error<B::Error>> {
        ensure_unmodified(self.registers.ctrl.state(), RegisterName::Ctrl)?;

        let value = if enable {
            Ctrl::EN_ENABLE
        } else {
            Ctrl::EN_DISABLE
        };
        self.registers.ctrl.set_enable(value, false)?;
        Ok(())
    }

    /// Whether the motor output is enabled, read from hardware
    ///
    /// Unlike the other accessors this one does not fail when `CTRL` has
    /// unflushed cache-only writes: it reports `false` without touching the
    /// bus.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the read fails.
    pub fn output_enable(&mut self) -> Result<bool, Error<B::Error>> {
        if self.registers.ctrl.state() == CacheState::Modified {
            return Ok(false);
        }

        match self.registers.ctrl.enable(false)? {
            Ctrl::EN_ENABLE => Ok(true),
            Ctrl::EN_DISABLE => Ok(false),
            _ => Err(Error::UnresolvedTelemetry(Telemetry::OutputEnable)),
        }
    }

    // ==================== PWM PERIOD ====================

    fn check_prescaler(prescaler: i32) -> Result<u32, Error<B::Error>> {
        u32::try_from(prescaler)
            .ok()
            .filter(|&prescaler| prescaler <= MAX_PRESCALER)
            .ok_or(Error::OutOfRange(Parameter::Prescaler))
    }

    /// Nanoseconds covered by `max_count` ticks of the prescaled counter
    ///
    /// The counter counts up and down, so one period is
    /// `max_count * 2 * 2^prescaler / clock`.
    fn count_to_nanos(&self, max_count: u16, prescaler: u32) -> u128 {
        ((u128::from(max_count) * NANOS_PER_SEC) << (prescaler + 1)) / u128::from(self.clock_hz)
    }

    /// Longest PWM period, in nanoseconds, reachable with `prescaler` (0-32)
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the prescaler is not in 0..=32.
    pub fn max_pwm_period_nanos(&self, prescaler: i32) -> Result<u128, Error<B::Error>> {
        let prescaler = Self::check_prescaler(prescaler)?;
        Ok(self.count_to_nanos(MAX_PWM_MAX_COUNT, prescaler))
    }

    /// Set the PWM period and prescaler exponent (0-32)
    ///
    /// `PWM_MAXCNT = period * clock / (2^(prescaler + 1) * 10^9)`, computed
    /// by multiplying before dividing so no precision is lost. Both fields
    /// are staged in the `CTRL` cache and flushed as one write, after which
    /// the current duty is re-applied against the new counter maximum.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] if the prescaler is not in 0..=32 or the
    ///   period exceeds [`max_pwm_period_nanos`](Self::max_pwm_period_nanos)
    /// - [`Error::InconsistentCacheState`] if `CTRL` has unflushed cache-only writes
    /// - [`Error::UnresolvedTelemetry`] if no duty is known to re-apply
    /// - the bus error if a register access fails
    pub fn set_pwm_period(
        &mut self,
        period: Period,
        prescaler: i32,
    ) -> Result<(), Error<B::Error>> {
        let prescaler = Self::check_prescaler(prescaler)?;
        let period_ns = period.as_nanos();
        if period_ns > self.count_to_nanos(MAX_PWM_MAX_COUNT, prescaler) {
            return Err(Error::OutOfRange(Parameter::PwmPeriod));
        }

        let max_count =
            (period_ns * u128::from(self.clock_hz)) / (NANOS_PER_SEC << (prescaler + 1));
        let max_count =
            u16::try_from(max_count).map_err(|_| Error::OutOfRange(Parameter::PwmPeriod))?;

        match self.registers.ctrl.state() {
            CacheState::Modified => {
                return Err(Error::InconsistentCacheState(RegisterName::Ctrl));
            }
            // Stage on top of the live word, not the reset value.
            CacheState::Initialized => self.registers.ctrl.update_cache()?,
            CacheState::Synced => {}
        }

        let prescaler_bits =
            u8::try_from(prescaler).map_err(|_| Error::OutOfRange(Parameter::Prescaler))?;
        let ctrl = &mut self.registers.ctrl;
        let previous = ctrl.snapshot();
        ctrl.set_pwm_max_count(max_count, true)?;
        ctrl.set_pwm_prescaler(prescaler_bits, true)?;
        ctrl.flush().inspect_err(|_| ctrl.restore(previous))?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "pwm period {=u128} ns: maxcnt={=u16} prescaler={=u32}",
            period_ns,
            max_count,
            prescaler
        );

        let duty = self.pwm_duty()?;
        self.set_pwm_duty(i32::from(duty))
    }

    /// PWM period, read from hardware, expressed in `unit`, and the prescaler
    ///
    /// The period is truncated to whole `unit`s.
    ///
    /// # Errors
    ///
    /// - [`Error::InconsistentCacheState`] if `CTRL` has unflushed cache-only writes
    /// - [`Error::UnresolvedTelemetry`] if the period does not fit a `u64` count of `unit`
    /// - the bus error if the read fails
    pub fn pwm_period(&mut self, unit: TimeUnit) -> Result<(Period, u8), Error<B::Error>> {
        ensure_unmodified(self.registers.ctrl.state(), RegisterName::Ctrl)?;

        self.registers.ctrl.update_cache()?;
        let prescaler = self.registers.ctrl.pwm_prescaler(true)?;
        let max_count = self.registers.ctrl.pwm_max_count(true)?;

        let nanos = self.count_to_nanos(max_count, u32::from(prescaler));
        let period = Period::from_nanos(nanos, unit)
            .ok_or(Error::UnresolvedTelemetry(Telemetry::PwmPeriod))?;
        Ok((period, prescaler))
    }

    // ==================== PHASE ====================

    /// Set the commutation phase (0-5)
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `phase` is not in 0..=5, or the bus
    /// error if the write fails.
    pub fn set_phase(&mut self, phase: i32) -> Result<(), Error<B::Error>> {
        let phase = u8::try_from(phase)
            .ok()
            .filter(|&phase| phase <= MAX_PHASE)
            .ok_or(Error::OutOfRange(Parameter::Phase))?;
        self.registers.ctrl.set_phase(phase, false)?;
        Ok(())
    }

    /// Commutation phase, read from hardware
    ///
    /// # Errors
    ///
    /// Returns the bus error if the read fails.
    pub fn phase(&mut self) -> Result<u8, Error<B::Error>> {
        Ok(self.registers.ctrl.phase(false)?)
    }

    // ==================== STATUS ====================

    /// Hardware IP version, resolved once from `STAT.RELCNT`
    ///
    /// # Errors
    ///
    /// - [`Error::UnresolvedTelemetry`] if the release counter is not in the
    ///   version table
    /// - the bus error if the status register has to be read and fails
    pub fn hw_ip_version(&mut self) -> Result<&'static str, Error<B::Error>> {
        if self.hw_ip_version.is_none() {
            match self.registers.stat.state() {
                CacheState::Synced => self.fetch_hw_ip_version(true)?,
                CacheState::Initialized => self.fetch_hw_ip_version(false)?,
                CacheState::Modified => {
                    return Err(Error::InconsistentCacheState(RegisterName::Stat));
                }
            }
        }

        self.hw_ip_version
            .ok_or(Error::UnresolvedTelemetry(Telemetry::HwIpVersion))
    }

    /// Deadtime, resolved once from `STAT.DEADTIME`
    ///
    /// # Errors
    ///
    /// Returns the bus error if the status register has to be read and fails.
    pub fn deadtime(&mut self) -> Result<u8, Error<B::Error>> {
        if self.deadtime.is_none() {
            match self.registers.stat.state() {
                CacheState::Synced => self.fetch_deadtime(true)?,
                CacheState::Initialized => self.fetch_deadtime(false)?,
                CacheState::Modified => {
                    return Err(Error::InconsistentCacheState(RegisterName::Stat));
                }
            }
        }

        self.deadtime
            .ok_or(Error::UnresolvedTelemetry(Telemetry::Deadtime))
    }

    fn fetch_hw_ip_version(&mut self, from_cache: bool) -> Result<(), B::Error> {
        let rel_cnt = self.registers.stat.rel_cnt(from_cache)?;
        self.hw_ip_version = Stat::version(rel_cnt);

        #[cfg(feature = "defmt")]
        if self.hw_ip_version.is_none() {
            defmt::warn!("unknown IP release counter {=u8}", rel_cnt);
        }

        Ok(())
    }

    fn fetch_deadtime(&mut self, from_cache: bool) -> Result<(), B::Error> {
        self.deadtime = Some(self.registers.stat.deadtime(from_cache)?);
        Ok(())
    }

    /// Whether the speed controller has reflected the target frequency
    ///
    /// # Errors
    ///
    /// Returns the bus error if the read fails.
    pub fn is_reflected_freq(&mut self) -> Result<bool, Error<B::Error>> {
        ensure_unmodified(self.registers.stat.state(), RegisterName::Stat)?;
        Ok(self.registers.stat.reflected_freq(false)? == Stat::REFLECTEDFREQ_REFLECTED)
    }

    /// Whether the rotor is stopping or stopped
    ///
    /// # Errors
    ///
    /// Returns the bus error if the read fails.
    pub fn is_stopping(&mut self) -> Result<bool, Error<B::Error>> {
        ensure_unmodified(self.registers.stat.state(), RegisterName::Stat)?;
        Ok(self.registers.stat.stop(false)? == Stat::STOP_STOPPING)
    }
}
