#![doc(html_root_url = "https://docs.rs/stmpe610")]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unused_variables,
    unreachable_code,
    unused_comparisons,
    unused_must_use
)]
#![cfg_attr(not(test), no_std)]

//! A platform agnostic Rust driver for the STMPE610 resistive touch screen
//! controller, based on the
//! [`embedded-hal`](https://github.com/rust-embedded/embedded-hal) traits.
//!
//! The STMPE610 samples the touch panel by itself and signals touches on its
//! interrupt line. The driver turns those interrupts into a debounced stream
//! of DOWN/UP [`TouchEvent`]s with averaged, calibrated coordinates and
//! pressure, delivered to a single [`TouchHandler`]. See [`driver`] for how
//! interrupts are classified and how missed UPs are recovered.
//!
//! ```ignore
//! let mut touch = Stmpe610::new(spi_device);
//! touch.set_handler(|event: &TouchEvent| info!("{:?}", event));
//! touch.set_orientation(Orientation::FLIP_X);
//! touch.set_dimensions(Dimensions::new(239, 319));
//! touch.init(&mut delay)?;
//!
//! // on every falling edge of the INT pin
//! touch.on_interrupt(&mut delay, &mut timer);
//! // when `timer` expires
//! touch.on_recovery_timer();
//! ```
//!
//! With the `embassy` feature, [`embassy::run()`] does the interrupt and timer
//! plumbing from a single async task.
//!
//! Logging goes to `defmt` or `log` when the feature of the same name is
//! enabled.

#[macro_use]
mod fmt;

pub mod driver;
#[cfg(feature = "embassy")]
pub mod embassy;
pub mod error;
pub mod event;
pub mod mapping;
pub mod registers;
pub mod sample;
pub mod shared;

pub use crate::{
    driver::{InterruptOutcome, RecoveryTimer, Stmpe610, TouchScreenState},
    error::Error,
    event::{TouchDirection, TouchEvent, TouchHandler},
    mapping::{Dimensions, Orientation},
    registers::{SPI_MAX_FREQUENCY_HZ, SPI_MODE},
    shared::SharedStmpe610,
};
