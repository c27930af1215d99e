//! Bus accessor contract for the motor IP core
//!
//! The register cache never touches the hardware directly. Every 32-bit read
//! and write goes through a [`BusAccess`] implementation supplied by the
//! application. The accessor is shared: the register map keeps one clone of the
//! handle per register, so handles are expected to be cheap references such as
//! `&T`, `Rc<T>` or `Arc<T>` (the latter two with the `alloc` feature).
//!
//! Neither [`RegisterMap`](crate::RegisterMap) nor [`Motor`](crate::Motor) ever
//! closes or unmaps the accessor; it must outlive every motor referencing it.

/// 32-bit memory-mapped bus access
///
/// Methods take `&self` because a single physical fabric is usually addressed
/// by several register maps at different base offsets. Implementations that
/// need mutable state should use interior mutability.
pub trait BusAccess {
    /// Transport error reported on a bus fault
    type Error;

    /// Read the 32-bit word at `address`
    ///
    /// # Errors
    ///
    /// Returns the transport error if the bus access faults.
    fn read32(&self, address: u32) -> Result<u32, Self::Error>;

    /// Write `value` to the 32-bit word at `address`
    ///
    /// # Errors
    ///
    /// Returns the transport error if the bus access faults.
    fn write32(&self, address: u32, value: u32) -> Result<(), Self::Error>;
}

impl<T> BusAccess for &T
where
    T: BusAccess + ?Sized,
{
    type Error = T::Error;

    fn read32(&self, address: u32) -> Result<u32, Self::Error> {
        T::read32(self, address)
    }

    fn write32(&self, address: u32, value: u32) -> Result<(), Self::Error> {
        T::write32(self, address, value)
    }
}

#[cfg(feature = "alloc")]
impl<T> BusAccess for alloc::rc::Rc<T>
where
    T: BusAccess + ?Sized,
{
    type Error = T::Error;

    fn read32(&self, address: u32) -> Result<u32, Self::Error> {
        T::read32(self, address)
    }

    fn write32(&self, address: u32, value: u32) -> Result<(), Self::Error> {
        T::write32(self, address, value)
    }
}

#[cfg(feature = "alloc")]
impl<T> BusAccess for alloc::sync::Arc<T>
where
    T: BusAccess + ?Sized,
{
    type Error = T::Error;

    fn read32(&self, address: u32) -> Result<u32, Self::Error> {
        T::read32(self, address)
    }

    fn write32(&self, address: u32, value: u32) -> Result<(), Self::Error> {
        T::write32(self, address, value)
    }
}

/// Errors reported by [`MmioBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MmioError {
    /// Address is not aligned to a 32-bit word
    Misaligned(u32),
    /// Address falls outside the mapped window
    OutOfWindow(u32),
}

impl core::fmt::Display for MmioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Misaligned(address) => write!(f, "address {address:#010x} is not word aligned"),
            Self::OutOfWindow(address) => {
                write!(f, "address {address:#010x} is outside the mapped window")
            }
        }
    }
}

impl core::error::Error for MmioError {}

/// Volatile accessor over an already-mapped register window
///
/// Addresses passed to [`BusAccess`] are byte offsets from the start of the
/// window, so a motor placed at the start of the window uses base address 0.
/// On an SoC running Linux the window typically comes from an `mmap` of the
/// lightweight HPS-to-FPGA bridge.
///
/// # Example
///
/// ```ignore
/// use bldcm::{Frequency, MmioBus, Motor};
///
/// // SAFETY: `ptr` maps 0x1000 bytes of the bridge for the whole program.
/// let bus = unsafe { MmioBus::new(ptr, 0x1000) };
/// let mut motor = Motor::new(bus, Frequency::mhz(50), 0x0000)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MmioBus {
    base: *mut u32,
    len: usize,
}

impl MmioBus {
    /// Wrap a mapped window of `len` bytes starting at `base`
    ///
    /// # Safety
    ///
    /// `base` must be aligned to 4 bytes and valid for volatile reads and
    /// writes of `len` bytes for as long as this accessor or any copy of it is
    /// in use.
    #[must_use]
    pub const unsafe fn new(base: *mut u32, len: usize) -> Self {
        Self { base, len }
    }

    /// Size of the mapped window in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapped window is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn word(&self, address: u32) -> Result<*mut u32, MmioError> {
        if address % 4 != 0 {
            return Err(MmioError::Misaligned(address));
        }
        let offset = address as usize;
        if offset.checked_add(4).is_none_or(|end| end > self.len) {
            return Err(MmioError::OutOfWindow(address));
        }
        // SAFETY: offset + 4 <= len, and `new` guarantees the window is valid.
        Ok(unsafe { self.base.add(offset / 4) })
    }
}

impl BusAccess for MmioBus {
    type Error = MmioError;

    fn read32(&self, address: u32) -> Result<u32, Self::Error> {
        let ptr = self.word(address)?;
        // SAFETY: `word` checked alignment and bounds against the mapped window.
        Ok(unsafe { core::ptr::read_volatile(ptr) })
    }

    fn write32(&self, address: u32, value: u32) -> Result<(), Self::Error> {
        let ptr = self.word(address)?;
        // SAFETY: `word` checked alignment and bounds against the mapped window.
        unsafe { core::ptr::write_volatile(ptr, value) };
        Ok(())
    }
}
