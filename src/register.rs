//! Cached 32-bit register with a three-state cache machine
//!
//! Each register keeps a local copy of its hardware word. The copy moves
//! between three states:
//!
//! - [`CacheState::Initialized`]: holds the reset value, hardware never touched
//! - [`CacheState::Synced`]: equals the last value read from or written to hardware
//! - [`CacheState::Modified`]: changed locally, not yet flushed
//!
//! Reads can be served from the cache or forced to the bus; writes can stay in
//! the cache (to combine several field updates into one bus write) or be
//! flushed immediately. A failed flush rolls the cache back, so the cache never
//! claims a value that did not reach the hardware.

use core::marker::PhantomData;

use crate::bitfield::BitField;
use crate::interface::BusAccess;

/// Relationship between a register cache and the hardware word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CacheState {
    /// Cache holds the reset value; the register was never read or written
    Initialized,
    /// Cache equals the last known hardware value
    Synced,
    /// Cache was written locally and differs from hardware until flushed
    Modified,
}

/// Static description of a register type
///
/// Implemented by the zero-sized register kinds in [`registers`](crate::registers).
pub trait RegisterKind {
    /// Offset from the register map base address
    const OFFSET: u32;
    /// Reset value loaded into the cache at construction
    const RESET: u32;

    /// Fix up the cache after a successful flush
    ///
    /// Registers with self-clearing strobe bits override this to clear the
    /// strobe in the cached word. The default leaves the cache unchanged.
    #[must_use]
    fn after_flush(cache: u32) -> u32 {
        cache
    }
}

/// Marker for register kinds that accept writes
///
/// Read-only registers do not implement it, which removes
/// [`Register::write`] and [`Register::flush`] from their API.
pub trait Writable: RegisterKind {}

/// A cached hardware register of kind `K` accessed through bus handle `B`
pub struct Register<K, B> {
    address: u32,
    cache: u32,
    state: CacheState,
    bus: B,
    _kind: PhantomData<K>,
}

impl<K, B> core::fmt::Debug for Register<K, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Register")
            .field("address", &format_args!("{:#010x}", self.address))
            .field("cache", &format_args!("{:#010x}", self.cache))
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<K, B> Register<K, B>
where
    K: RegisterKind,
    B: BusAccess,
{
    /// Bind a register of kind `K` to `base + K::OFFSET`
    ///
    /// The cache starts at `K::RESET` in the [`CacheState::Initialized`] state.
    /// No bus access is performed.
    pub fn new(bus: B, base: u32) -> Self {
        Self {
            address: base.wrapping_add(K::OFFSET),
            cache: K::RESET,
            state: CacheState::Initialized,
            bus,
            _kind: PhantomData,
        }
    }

    /// Absolute bus address of the register
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Current cache state
    pub const fn state(&self) -> CacheState {
        self.state
    }

    /// Cached word, without touching the bus
    pub const fn cached(&self) -> u32 {
        self.cache
    }

    /// Read the register word
    ///
    /// With `from_cache == false` the cache is first refreshed from hardware
    /// (see [`update_cache`](Self::update_cache)). With `from_cache == true`
    /// the cache is returned as is.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the hardware read fails.
    pub fn read(&mut self, from_cache: bool) -> Result<u32, B::Error> {
        if !from_cache {
            self.update_cache()?;
        }
        Ok(self.cache)
    }

    /// Refresh the cache from hardware and mark it [`CacheState::Synced`]
    ///
    /// On failure the cache and state are left untouched.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the hardware read fails.
    pub fn update_cache(&mut self) -> Result<(), B::Error> {
        let value = self.bus.read32(self.address)?;
        self.cache = value;
        self.state = CacheState::Synced;

        #[cfg(feature = "defmt")]
        defmt::trace!("refresh {=u32:#x} -> {=u32:#x}", self.address, value);

        Ok(())
    }

    /// Read a single field
    ///
    /// # Errors
    ///
    /// Returns the transport error if a hardware read is needed and fails.
    pub fn field(&mut self, field: BitField, from_cache: bool) -> Result<u32, B::Error> {
        Ok(field.get(self.read(from_cache)?))
    }

    pub(crate) const fn snapshot(&self) -> (u32, CacheState) {
        (self.cache, self.state)
    }

    pub(crate) const fn restore(&mut self, (cache, state): (u32, CacheState)) {
        self.cache = cache;
        self.state = state;
    }
}

impl<K, B> Register<K, B>
where
    K: Writable,
    B: BusAccess,
{
    /// Store `value` in the cache, optionally flushing it to hardware
    ///
    /// With `cache_only == true` the state becomes [`CacheState::Modified`] and
    /// the bus is not touched. Otherwise the word is flushed immediately; if the
    /// flush fails the previous cache value and state are restored before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the immediate flush fails.
    pub fn write(&mut self, value: u32, cache_only: bool) -> Result<(), B::Error> {
        let previous = self.snapshot();
        self.cache = value;

        if cache_only {
            self.state = CacheState::Modified;
            return Ok(());
        }

        self.flush().inspect_err(|_| self.restore(previous))
    }

    /// Write the cached word to hardware
    ///
    /// Marks the cache [`CacheState::Synced`] and applies the register's
    /// post-flush fixup. On failure nothing is changed.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the hardware write fails.
    pub fn flush(&mut self) -> Result<(), B::Error> {
        self.bus.write32(self.address, self.cache)?;

        #[cfg(feature = "defmt")]
        defmt::trace!("flush {=u32:#x} <- {=u32:#x}", self.address, self.cache);

        self.cache = K::after_flush(self.cache);
        self.state = CacheState::Synced;
        Ok(())
    }

    /// Read-modify-write a single field
    ///
    /// The base word comes from the cache when `cache_only` is set and from
    /// hardware otherwise. The updated word is then written with the same
    /// `cache_only` flag.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the hardware read or write fails.
    pub fn set_field(
        &mut self,
        field: BitField,
        value: u32,
        cache_only: bool,
    ) -> Result<(), B::Error> {
        self.set_fields(&[(field, value)], cache_only)
    }

    /// Read-modify-write several fields as one word
    ///
    /// # Errors
    ///
    /// Returns the transport error if the hardware read or write fails.
    pub fn set_fields(
        &mut self,
        updates: &[(BitField, u32)],
        cache_only: bool,
    ) -> Result<(), B::Error> {
        let word = updates
            .iter()
            .fold(self.read(cache_only)?, |word, &(field, value)| {
                field.set(word, value)
            });
        self.write(word, cache_only)
    }
}
