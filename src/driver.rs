//! The STMPE610 touch panel driver.
//!
//! The driver is for the STMPE610 Resistive Touch Screen Controller connected
//! using SPI.
//!
//! Unlike controllers that must be polled, the STMPE610 measures on its own.
//! Once a touch is detected it fills an internal FIFO with X, Y and Z
//! (pressure) samples and pulls its interrupt line low. The driver is
//! therefore driven by two entry points that the host calls:
//!
//! - [`Stmpe610::on_interrupt()`] on every falling edge of the interrupt line,
//! - [`Stmpe610::on_recovery_timer()`] when a recovery timer requested through
//!   [`RecoveryTimer`] expires.
//!
//! Each interrupt is classified from the FIFO occupancy at the time it is
//! handled. An empty FIFO means a touch has just started and the samples are
//! still being converted, so the driver waits for them (up to
//! [`DOWN_POLL_ATTEMPTS`] polls, [`DOWN_POLL_INTERVAL_MS`] apart) and reports
//! a DOWN. A non-empty FIFO means the finger has lifted and the FIFO holds the
//! final samples of the touch, which are reported as an UP.
//!
//! The controller occasionally does not raise the interrupt for the end of a
//! touch. To keep [`Stmpe610::is_touching()`] from getting stuck, every DOWN
//! arms a one shot timer of [`RECOVERY_DELAY_MS`]. If, when it fires, no UP
//! has been reported and the FIFO is empty, the driver reports a synthesized
//! ("phantom") UP at the last known position.
//!
//! Both entry points take `&mut self`, so they can never overlap. When they
//! are called from different contexts, wrap the driver in
//! [`crate::shared::SharedStmpe610`].

use crate::{
    error::Error,
    event::{TouchDirection, TouchEvent, TouchHandler},
    mapping::{map_point, Dimensions, Orientation},
    registers::{self, Registers},
    sample::{drain_and_average, SampleBatch},
};
use core::fmt::{self, Debug};
#[cfg(feature = "defmt")]
use defmt::Format;
use embedded_hal::{delay::DelayNs, spi::SpiDevice};

/// Number of times the FIFO is polled for the first samples of a touch.
pub const DOWN_POLL_ATTEMPTS: u8 = 10;

/// Delay before each poll of the FIFO while waiting for a touch's samples.
pub const DOWN_POLL_INTERVAL_MS: u32 = 5;

/// Delay after a DOWN before checking whether its UP was missed.
pub const RECOVERY_DELAY_MS: u32 = 100;

/// Time the controller needs after a soft reset.
pub const RESET_SETTLE_MS: u32 = 10;

/// Register writes that bring the controller from reset into XYZ touch
/// sampling with an active-low, edge triggered touch detect interrupt.
const CONFIGURATION: [(u8, u8); 13] = [
    // Turn on all clocks.
    (registers::SYS_CTRL2, 0x00),
    (
        registers::TSC_CTRL,
        registers::TSC_CTRL_XYZ | registers::TSC_CTRL_EN,
    ),
    (registers::INT_EN, registers::INT_EN_TOUCHDET),
    (
        registers::ADC_CTRL1,
        registers::ADC_CTRL1_10BIT | registers::ADC_CTRL1_SAMPLE_TIME_96,
    ),
    (registers::ADC_CTRL2, registers::ADC_CTRL2_6_5MHZ),
    (
        registers::TSC_CFG,
        registers::TSC_CFG_4SAMPLE | registers::TSC_CFG_DELAY_1MS | registers::TSC_CFG_SETTLE_5MS,
    ),
    (registers::TSC_FRACTION_Z, 0x06),
    (registers::FIFO_TH, 1),
    (registers::FIFO_STA, registers::FIFO_STA_RESET),
    (registers::FIFO_STA, 0),
    (registers::TSC_I_DRIVE, registers::TSC_I_DRIVE_50MA),
    (registers::INT_STA, registers::INT_STA_ALL),
    (
        registers::INT_CTRL,
        registers::INT_CTRL_POL_LOW | registers::INT_CTRL_EDGE | registers::INT_CTRL_ENABLE,
    ),
];

/// One shot timer service used to schedule the missed-UP check.
///
/// When the timer expires, the host calls [`Stmpe610::on_recovery_timer()`].
/// Scheduling is never cancelled: an expired timer whose DOWN has already
/// been followed by an UP is a no-op.
pub trait RecoveryTimer {
    fn schedule_once(&mut self, delay_ms: u32);
}

impl<T> RecoveryTimer for &mut T
where
    T: RecoveryTimer + ?Sized,
{
    fn schedule_once(&mut self, delay_ms: u32) {
        (**self).schedule_once(delay_ms)
    }
}

/// Current state of the driver
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchScreenState {
    /// Not initialized, or initialization failed
    Disabled,
    /// No touch
    Released,
    /// Waiting for the first samples of a touch. Only held while
    /// [`Stmpe610::on_interrupt()`] polls the FIFO, never observable after
    /// it returns.
    Presampling,
    /// Confirmed touch
    Touched,
}

/// What handling one interrupt amounted to.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// A touch started; the event was dispatched and the recovery timer armed.
    Down(TouchEvent),
    /// A touch ended; the event was dispatched.
    Up(TouchEvent),
    /// No samples could be read, so nothing was reported.
    Glitch,
    /// The driver is not initialized and ignored the interrupt.
    Disabled,
}

impl InterruptOutcome {
    pub fn event(&self) -> Option<&TouchEvent> {
        match self {
            InterruptOutcome::Down(event) | InterruptOutcome::Up(event) => Some(event),
            InterruptOutcome::Glitch | InterruptOutcome::Disabled => None,
        }
    }
}

/// The Stmpe610 driver.
///
/// `H` is the [`TouchHandler`] events are delivered to. At most one handler
/// is registered at a time.
pub struct Stmpe610<Spi, H> {
    /// Register transport over the SPI device
    registers: Registers<Spi>,
    /// Current driver state
    screen_state: TouchScreenState,
    /// Most recently dispatched event
    last_touch: TouchEvent,
    orientation: Orientation,
    dimensions: Dimensions,
    handler: Option<H>,
}

impl<Spi, H> Debug for Stmpe610<Spi, H>
where
    Spi: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stmpe610")
            .field("registers", &self.registers)
            .field("screen_state", &self.screen_state)
            .field("last_touch", &self.last_touch)
            .field("orientation", &self.orientation)
            .field("dimensions", &self.dimensions)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl<Spi, H> Stmpe610<Spi, H>
where
    Spi: SpiDevice<u8>,
    H: TouchHandler,
{
    /// Creates a disabled driver. Call [`Self::init()`] before routing
    /// interrupts to it.
    pub fn new(spi: Spi) -> Self {
        Self {
            registers: Registers::new(spi),
            screen_state: TouchScreenState::Disabled,
            last_touch: TouchEvent::RELEASED,
            orientation: Orientation::empty(),
            dimensions: Dimensions::default(),
            handler: None,
        }
    }

    /// Creates a disabled driver with `handler` already registered.
    pub fn with_handler(spi: Spi, handler: H) -> Self {
        let mut driver = Self::new(spi);
        driver.handler = Some(handler);
        driver
    }

    /// Resets and identifies the controller, then configures it for
    /// interrupt driven XYZ sampling.
    ///
    /// On success the driver is armed and the last touch is reset to
    /// released. On failure the driver stays disabled and ignores
    /// interrupts and recovery timers. An identification mismatch is
    /// reported as [`Error::UnexpectedVersion`].
    ///
    /// The host is expected to configure the interrupt line as an input
    /// with pull-up and to route its falling edges to
    /// [`Self::on_interrupt()`] once this returns `Ok`.
    pub fn init<D>(&mut self, delay: &mut D) -> Result<(), Error<Spi::Error>>
    where
        D: DelayNs,
    {
        self.screen_state = TouchScreenState::Disabled;

        self.registers
            .try_write(registers::SYS_CTRL1, registers::SYS_CTRL1_RESET)
            .map_err(|e| Error::Spi(e))?;
        delay.delay_ms(RESET_SETTLE_MS);

        let version = self.read_version()?;
        info!("read version: {:#x}", version);
        if version != registers::STMPE610_CHIP_ID {
            error!("STMPE610 init failed ({:#x}), disabling", version);
            return Err(Error::UnexpectedVersion(version));
        }

        for register in 0..registers::REGISTER_FLUSH_COUNT {
            _ = self.registers.try_read(register).map_err(|e| Error::Spi(e))?;
        }
        for (register, value) in CONFIGURATION {
            self.registers
                .try_write(register, value)
                .map_err(|e| Error::Spi(e))?;
        }

        self.last_touch = TouchEvent::RELEASED;
        self.screen_state = TouchScreenState::Released;
        info!("STMPE610 init ok");

        Ok(())
    }

    /// Reads the 16-bit chip id, 0x0811 for a STMPE610.
    pub fn read_version(&mut self) -> Result<u16, Error<Spi::Error>> {
        self.registers.try_read_version().map_err(|e| Error::Spi(e))
    }

    /// Registers `handler`, replacing any previous one.
    pub fn set_handler(&mut self, handler: H) {
        self.handler = Some(handler);
    }

    /// Removes and returns the registered handler.
    pub fn clear_handler(&mut self) -> Option<H> {
        self.handler.take()
    }

    /// Sets the orientation applied to the following samples.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Sets the output coordinate range applied to the following samples.
    pub fn set_dimensions(&mut self, dimensions: Dimensions) {
        self.dimensions = dimensions;
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Check if the display is currently touched
    ///
    /// True iff the most recently dispatched event was a DOWN.
    pub fn is_touching(&self) -> bool {
        self.last_touch.is_down()
    }

    /// Returns a copy of the most recently dispatched event, or
    /// [`TouchEvent::RELEASED`] if there was none yet.
    pub fn last_touch(&self) -> TouchEvent {
        self.last_touch
    }

    pub fn state(&self) -> TouchScreenState {
        self.screen_state
    }

    /// Handles a falling edge of the interrupt line.
    ///
    /// The pending interrupt status on the controller is always cleared
    /// before returning, whether or not an event was produced.
    ///
    /// When the FIFO is empty this blocks on `delay` for up to
    /// `DOWN_POLL_ATTEMPTS * DOWN_POLL_INTERVAL_MS` milliseconds waiting for
    /// the first samples of the touch.
    pub fn on_interrupt<D, T>(&mut self, delay: &mut D, timer: &mut T) -> InterruptOutcome
    where
        D: DelayNs,
        T: RecoveryTimer,
    {
        if self.screen_state == TouchScreenState::Disabled {
            return InterruptOutcome::Disabled;
        }

        let outcome = if self.registers.fifo_len() == 0 {
            self.classify_down(delay, timer)
        } else {
            self.classify_up()
        };

        self.registers.acknowledge_interrupts();

        outcome
    }

    /// Handles expiry of a recovery timer armed by a DOWN.
    ///
    /// Returns the synthesized UP if one was dispatched.
    pub fn on_recovery_timer(&mut self) -> Option<TouchEvent> {
        if self.screen_state == TouchScreenState::Disabled || !self.last_touch.is_down() {
            return None;
        }
        // Samples in flight mean the controller still sees a touch; the
        // interrupt for it will report the UP.
        if self.registers.fifo_len() > 0 {
            return None;
        }

        let event = TouchEvent {
            direction: TouchDirection::Up,
            ..self.last_touch
        };
        self.commit(event);
        info!("touch DOWN not followed by UP, sending phantom UP");
        self.dispatch(&event);

        Some(event)
    }

    /// Gives back the SPI device.
    pub fn release(self) -> Spi {
        self.registers.release()
    }

    fn classify_down<D, T>(&mut self, delay: &mut D, timer: &mut T) -> InterruptOutcome
    where
        D: DelayNs,
        T: RecoveryTimer,
    {
        debug!("touch DOWN");
        self.screen_state = TouchScreenState::Presampling;

        for attempt in 0..DOWN_POLL_ATTEMPTS {
            delay.delay_ms(DOWN_POLL_INTERVAL_MS);
            if let Some(batch) = drain_and_average(&mut self.registers, self.orientation) {
                let event = self.event_from(TouchDirection::Down, &batch, 1);
                debug!(
                    "touch DOWN at ({},{}) pressure={}, iteration={}",
                    event.x, event.y, event.z, attempt
                );
                self.commit(event);
                timer.schedule_once(RECOVERY_DELAY_MS);
                self.dispatch(&event);
                return InterruptOutcome::Down(event);
            }
        }

        debug!("touch DOWN without samples, ignoring");
        self.screen_state = state_for(&self.last_touch);
        InterruptOutcome::Glitch
    }

    fn classify_up(&mut self) -> InterruptOutcome {
        let Some(batch) = drain_and_average(&mut self.registers, self.orientation) else {
            // The FIFO emptied between the two occupancy reads.
            return InterruptOutcome::Glitch;
        };
        let event = self.event_from(TouchDirection::Up, &batch, batch.count);
        debug!(
            "touch UP at ({},{}) pressure={}, length={}",
            event.x, event.y, event.z, event.duration_hint
        );
        self.commit(event);
        self.dispatch(&event);
        InterruptOutcome::Up(event)
    }

    fn event_from(
        &self,
        direction: TouchDirection,
        batch: &SampleBatch,
        duration_hint: u8,
    ) -> TouchEvent {
        let (x, y) = map_point(batch.x, batch.y, self.orientation, self.dimensions);
        TouchEvent {
            direction,
            x,
            y,
            z: batch.z,
            duration_hint,
        }
    }

    fn commit(&mut self, event: TouchEvent) {
        self.last_touch = event;
        self.screen_state = state_for(&event);
    }

    fn dispatch(&mut self, event: &TouchEvent) {
        if let Some(handler) = self.handler.as_mut() {
            handler.on_touch(event);
        }
    }
}

fn state_for(event: &TouchEvent) -> TouchScreenState {
    match event.direction {
        TouchDirection::Down => TouchScreenState::Touched,
        TouchDirection::Up => TouchScreenState::Released,
    }
}
