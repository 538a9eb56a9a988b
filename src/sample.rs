//! Draining and averaging the STMPE610 sample FIFO.
//!
//! With the touch screen controller in XYZ mode, each FIFO entry is four
//! bytes read one at a time from [`TSC_DATA`]:
//!
//! ```text
//! byte 0   byte 1    byte 2   byte 3
//! XXXXXXXX XXXX YYYY YYYYYYYY ZZZZZZZZ
//! ```
//!
//! i.e. a 12-bit X, a 12-bit Y and an 8-bit Z (pressure). A single touch
//! interrupt usually finds several entries queued, which are collapsed into
//! one [`SampleBatch`] holding the truncated mean of each axis.

use crate::mapping::{flip, Orientation};
use crate::registers::{Registers, TSC_DATA};
use embedded_hal::spi::SpiDevice;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Number of bytes making up one FIFO entry.
pub const SAMPLE_LEN: usize = 4;

/// One decoded FIFO entry.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

impl RawSample {
    pub const fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Decodes the packed 4-byte FIFO entry.
    pub const fn from_bytes(data: [u8; SAMPLE_LEN]) -> Self {
        let x = ((data[0] as u16) << 4) | ((data[1] >> 4) as u16);
        let y = (((data[1] & 0x0F) as u16) << 8) | data[2] as u16;
        Self::new(x, y, data[3])
    }

    /// Applies the flip flags of `orientation`. Swapping is left to the
    /// mapping stage.
    pub fn oriented(self, orientation: Orientation) -> Self {
        let x = if orientation.contains(Orientation::FLIP_X) {
            flip(self.x)
        } else {
            self.x
        };
        let y = if orientation.contains(Orientation::FLIP_Y) {
            flip(self.y)
        } else {
            self.y
        };
        Self::new(x, y, self.z)
    }
}

/// Averaged result of one FIFO drain.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleBatch {
    pub x: u16,
    pub y: u16,
    pub z: u8,
    /// Number of FIFO entries the averages were taken over, never 0.
    pub count: u8,
}

/// Running per-axis sums.
#[derive(Debug, Default)]
pub struct SampleAccumulator {
    sum_x: u32,
    sum_y: u32,
    sum_z: u32,
    count: u8,
}

impl SampleAccumulator {
    pub fn push(&mut self, sample: RawSample) {
        self.sum_x += u32::from(sample.x);
        self.sum_y += u32::from(sample.y);
        self.sum_z += u32::from(sample.z);
        self.count = self.count.saturating_add(1);
    }

    /// Truncated mean of every axis, `None` when nothing was pushed.
    pub fn average(&self) -> Option<SampleBatch> {
        if self.count == 0 {
            return None;
        }
        let n = u32::from(self.count);
        // Each mean is bounded by the largest pushed value, so it fits back
        // into the sample's own width.
        Some(SampleBatch {
            x: (self.sum_x / n) as u16,
            y: (self.sum_y / n) as u16,
            z: (self.sum_z / n) as u8,
            count: self.count,
        })
    }
}

/// Drains every sample queued in the FIFO and averages them.
///
/// Returns `None` without touching the device further when the FIFO is
/// empty, which is the normal "nothing yet" answer rather than an error.
/// Otherwise the FIFO is reset exactly once, after the last entry has been
/// read.
pub fn drain_and_average<Spi>(
    registers: &mut Registers<Spi>,
    orientation: Orientation,
) -> Option<SampleBatch>
where
    Spi: SpiDevice<u8>,
{
    let queued = registers.fifo_len();
    debug!("touch sensed with {} samples", queued);
    if queued == 0 {
        return None;
    }

    let mut accumulator = SampleAccumulator::default();
    for _ in 0..queued {
        let mut data = [0; SAMPLE_LEN];
        for byte in data.iter_mut() {
            *byte = registers.read(TSC_DATA);
        }
        let sample = RawSample::from_bytes(data);
        debug!(
            "sample at ({},{}) pressure={}",
            sample.x, sample.y, sample.z
        );
        accumulator.push(sample.oriented(orientation));
    }

    registers.reset_fifo();

    accumulator.average()
}
