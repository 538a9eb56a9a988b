//! Sharing the driver between the interrupt handler, the recovery timer
//! callback and the rest of the application.
//!
//! The interrupt handler and the recovery timer both read and update the
//! last touch and both talk to the controller, so they must never run at
//! the same time. [`SharedStmpe610`] keeps the driver inside an
//! [`embassy_sync`] blocking mutex and holds the lock for the whole of each
//! classification, including the bounded wait for a touch's first samples.
//!
//! Pick the raw mutex after the contexts involved. A
//! `CriticalSectionRawMutex` is needed when the entry points are called from
//! real interrupt handlers, and it masks interrupts for as long as a
//! classification takes (up to about 50 ms for a DOWN). When everything runs
//! in one executor, `NoopRawMutex` or `ThreadModeRawMutex` are enough.

use crate::{
    driver::{InterruptOutcome, RecoveryTimer, Stmpe610},
    event::{TouchEvent, TouchHandler},
    mapping::{Dimensions, Orientation},
};
use core::{cell::RefCell, fmt};
use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use embedded_hal::{delay::DelayNs, spi::SpiDevice};

/// A [`Stmpe610`] whose entry points are serialized by a mutex.
pub struct SharedStmpe610<M, Spi, H>
where
    M: RawMutex,
{
    driver: Mutex<M, RefCell<Stmpe610<Spi, H>>>,
}

impl<M, Spi, H> fmt::Debug for SharedStmpe610<M, Spi, H>
where
    M: RawMutex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStmpe610").finish_non_exhaustive()
    }
}

impl<M, Spi, H> SharedStmpe610<M, Spi, H>
where
    M: RawMutex,
    Spi: SpiDevice<u8>,
    H: TouchHandler,
{
    pub const fn new(driver: Stmpe610<Spi, H>) -> Self {
        Self {
            driver: Mutex::new(RefCell::new(driver)),
        }
    }

    /// Runs `f` with exclusive access to the driver.
    ///
    /// `f` must not call back into this `SharedStmpe610`.
    pub fn lock<R>(&self, f: impl FnOnce(&mut Stmpe610<Spi, H>) -> R) -> R {
        self.driver.lock(|driver| f(&mut driver.borrow_mut()))
    }

    /// See [`Stmpe610::on_interrupt()`].
    pub fn on_interrupt<D, T>(&self, delay: &mut D, timer: &mut T) -> InterruptOutcome
    where
        D: DelayNs,
        T: RecoveryTimer,
    {
        self.lock(|driver| driver.on_interrupt(delay, timer))
    }

    /// See [`Stmpe610::on_recovery_timer()`].
    pub fn on_recovery_timer(&self) -> Option<TouchEvent> {
        self.lock(|driver| driver.on_recovery_timer())
    }

    pub fn is_touching(&self) -> bool {
        self.lock(|driver| driver.is_touching())
    }

    pub fn last_touch(&self) -> TouchEvent {
        self.lock(|driver| driver.last_touch())
    }

    pub fn set_handler(&self, handler: H) {
        self.lock(|driver| driver.set_handler(handler))
    }

    pub fn set_orientation(&self, orientation: Orientation) {
        self.lock(|driver| driver.set_orientation(orientation))
    }

    pub fn set_dimensions(&self, dimensions: Dimensions) {
        self.lock(|driver| driver.set_dimensions(dimensions))
    }

    /// Takes the driver back out of the mutex.
    pub fn into_inner(self) -> Stmpe610<Spi, H> {
        self.driver.into_inner().into_inner()
    }
}
