//! Running the driver from an embassy task.
//!
//! [`run()`] drives both entry points of the driver from a single task: it
//! waits for either a falling edge of the interrupt line or the recovery
//! deadline, whichever comes first, and handles it to completion before
//! waiting again. Classification and recovery checks therefore never
//! overlap, without masking interrupts.
//!
//! Events reach the application through the driver's [`TouchHandler`];
//! [`ChannelHandler`] forwards them into an [`embassy_sync`] channel.

use crate::{
    driver::RecoveryTimer,
    event::{TouchEvent, TouchHandler},
    shared::SharedStmpe610,
};
use core::{convert::Infallible, fmt};
use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Sender};
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::{delay::DelayNs, spi::SpiDevice};
use embedded_hal_async::digital::Wait;

/// [`RecoveryTimer`] backed by a single deadline.
///
/// Scheduling replaces any pending deadline; only the check for the most
/// recent DOWN matters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryDeadline(Option<Instant>);

impl RecoveryDeadline {
    pub fn get(&self) -> Option<Instant> {
        self.0
    }

    pub fn take(&mut self) -> Option<Instant> {
        self.0.take()
    }
}

impl RecoveryTimer for RecoveryDeadline {
    fn schedule_once(&mut self, delay_ms: u32) {
        self.0 = Some(Instant::now() + Duration::from_millis(u64::from(delay_ms)));
    }
}

/// Handles interrupts and recovery deadlines of `touch` forever.
///
/// `irq` is the input connected to the STMPE610 INT pin, configured with a
/// pull-up. `delay` is used for the bounded wait for a touch's first
/// samples, `embassy_time::Delay` is a good fit. Only returns if waiting on
/// `irq` fails.
pub async fn run<M, Spi, H, Irq, D>(
    touch: &SharedStmpe610<M, Spi, H>,
    irq: &mut Irq,
    delay: &mut D,
) -> Result<Infallible, Irq::Error>
where
    M: RawMutex,
    Spi: SpiDevice<u8>,
    H: TouchHandler,
    Irq: Wait,
    D: DelayNs,
{
    let mut deadline = RecoveryDeadline::default();
    loop {
        match deadline.get() {
            Some(at) => match select(irq.wait_for_falling_edge(), Timer::at(at)).await {
                Either::First(edge) => {
                    edge?;
                    touch.on_interrupt(delay, &mut deadline);
                }
                Either::Second(()) => {
                    _ = deadline.take();
                    touch.on_recovery_timer();
                }
            },
            None => {
                irq.wait_for_falling_edge().await?;
                touch.on_interrupt(delay, &mut deadline);
            }
        }
    }
}

/// [`TouchHandler`] forwarding events into a channel.
///
/// Sending never waits. When the channel is full the event is dropped and a
/// warning is logged.
pub struct ChannelHandler<'a, M, const N: usize>
where
    M: RawMutex,
{
    sender: Sender<'a, M, TouchEvent, N>,
}

impl<'a, M, const N: usize> fmt::Debug for ChannelHandler<'a, M, N>
where
    M: RawMutex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandler")
            .field("capacity", &N)
            .finish_non_exhaustive()
    }
}

impl<'a, M, const N: usize> ChannelHandler<'a, M, N>
where
    M: RawMutex,
{
    pub fn new(sender: Sender<'a, M, TouchEvent, N>) -> Self {
        Self { sender }
    }
}

impl<'a, M, const N: usize> TouchHandler for ChannelHandler<'a, M, N>
where
    M: RawMutex,
{
    fn on_touch(&mut self, event: &TouchEvent) {
        if self.sender.try_send(*event).is_err() {
            warn!("touch event channel full, dropping {:?}", event);
        }
    }
}
