//! Register access for the STMPE610.
//!
//! The STMPE610 exposes its configuration, status and touch sample FIFO as a
//! file of 8-bit registers. Over SPI, every access is a single short
//! transaction with chip select held low for its whole duration:
//!
//! - a read sends one command byte, the register address with the MSB set,
//!   and clocks one response byte back in;
//! - a write sends two bytes, the register address (MSB clear) followed by
//!   the value, and expects nothing back.
//!
//! The controller samples MOSI on the rising edge with the clock idling low
//! (SPI mode 0) and is specified up to 1 MHz in this configuration, see
//! [`SPI_MODE`] and [`SPI_MAX_FREQUENCY_HZ`]. The [`SpiDevice`] handed to the
//! driver is expected to be configured accordingly.
//!
//! Two flavours of access are provided. [`Registers::try_read()`] and
//! [`Registers::try_write()`] return the SPI error to the caller and are used
//! where the caller can do something sensible with it, like initialization.
//! [`Registers::read()`] and [`Registers::write()`] are best effort: a failed
//! read is logged and yields 0, a failed write is logged and dropped. The
//! interrupt and recovery paths use these because there is no retry budget
//! in that context and "no data" is always a safe interpretation.

use embedded_hal::spi::{Mode, Operation, SpiDevice, MODE_0};

/// SPI mode required by the STMPE610.
pub const SPI_MODE: Mode = MODE_0;

/// Highest SPI clock the driver is meant to run the STMPE610 at.
pub const SPI_MAX_FREQUENCY_HZ: u32 = 1_000_000;

/// Set in the command byte to turn a register access into a read.
pub const READ_COMMAND: u8 = 0x80;

/// Value of the 16-bit chip id held in [`CHIP_ID`] and [`ID_VER`].
pub const STMPE610_CHIP_ID: u16 = 0x0811;

// Identification
pub const CHIP_ID: u8 = 0x00;
pub const ID_VER: u8 = 0x01;

// System control
pub const SYS_CTRL1: u8 = 0x03;
pub const SYS_CTRL1_RESET: u8 = 0x02;
pub const SYS_CTRL2: u8 = 0x04;

// Interrupt control
pub const INT_CTRL: u8 = 0x09;
pub const INT_CTRL_POL_LOW: u8 = 0x00;
pub const INT_CTRL_POL_HIGH: u8 = 0x04;
pub const INT_CTRL_EDGE: u8 = 0x02;
pub const INT_CTRL_ENABLE: u8 = 0x01;

pub const INT_EN: u8 = 0x0A;
pub const INT_EN_TOUCHDET: u8 = 0x01;
pub const INT_EN_FIFOTH: u8 = 0x02;

pub const INT_STA: u8 = 0x0B;
pub const INT_STA_ALL: u8 = 0xFF;

// ADC
pub const ADC_CTRL1: u8 = 0x20;
pub const ADC_CTRL1_10BIT: u8 = 0x00;
pub const ADC_CTRL1_12BIT: u8 = 0x08;
/// Sample time field of ADC_CTRL1, 6 selects 96 clocks per conversion.
pub const ADC_CTRL1_SAMPLE_TIME_96: u8 = 0x6 << 4;

pub const ADC_CTRL2: u8 = 0x21;
pub const ADC_CTRL2_1_625MHZ: u8 = 0x00;
pub const ADC_CTRL2_3_25MHZ: u8 = 0x01;
pub const ADC_CTRL2_6_5MHZ: u8 = 0x02;

// Touch screen controller
pub const TSC_CTRL: u8 = 0x40;
pub const TSC_CTRL_EN: u8 = 0x01;
pub const TSC_CTRL_XYZ: u8 = 0x00;
pub const TSC_CTRL_XY: u8 = 0x02;

pub const TSC_CFG: u8 = 0x41;
pub const TSC_CFG_4SAMPLE: u8 = 0x80;
pub const TSC_CFG_DELAY_1MS: u8 = 0x20;
pub const TSC_CFG_SETTLE_5MS: u8 = 0x04;

pub const TSC_FRACTION_Z: u8 = 0x56;
pub const TSC_I_DRIVE: u8 = 0x58;
pub const TSC_I_DRIVE_20MA: u8 = 0x00;
pub const TSC_I_DRIVE_50MA: u8 = 0x01;

/// Packed XYZ sample data, one byte per read, four bytes per FIFO entry.
pub const TSC_DATA: u8 = 0x57;

// FIFO
pub const FIFO_TH: u8 = 0x4A;
pub const FIFO_STA: u8 = 0x4B;
pub const FIFO_STA_RESET: u8 = 0x01;
/// Number of samples currently queued in the FIFO.
pub const FIFO_SIZE: u8 = 0x4C;

/// Number of registers read back once during initialization to flush any
/// stale state out of the controller.
pub const REGISTER_FLUSH_COUNT: u8 = 65;

/// Register transport for the STMPE610.
#[derive(Debug)]
pub struct Registers<Spi> {
    spi: Spi,
}

impl<Spi> Registers<Spi>
where
    Spi: SpiDevice<u8>,
{
    pub fn new(spi: Spi) -> Self {
        Self { spi }
    }

    /// Gives back the SPI device.
    pub fn release(self) -> Spi {
        self.spi
    }

    /// Reads one register, returning the SPI error on failure.
    pub fn try_read(&mut self, register: u8) -> Result<u8, Spi::Error> {
        let tx_buf = [READ_COMMAND | register];
        let mut rx_buf = [0; 1];
        self.spi
            .transaction(&mut [Operation::Write(&tx_buf), Operation::Read(&mut rx_buf)])?;
        Ok(rx_buf[0])
    }

    /// Writes one register, returning the SPI error on failure.
    pub fn try_write(&mut self, register: u8, value: u8) -> Result<(), Spi::Error> {
        self.spi.write(&[register, value])
    }

    /// Reads one register. A failed transaction is logged and reads as 0.
    pub fn read(&mut self, register: u8) -> u8 {
        match self.try_read(register) {
            Ok(value) => value,
            Err(_) => {
                error!("SPI read of register {:#x} failed", register);
                0
            }
        }
    }

    /// Writes one register. A failed transaction is logged and dropped.
    pub fn write(&mut self, register: u8, value: u8) {
        if self.try_write(register, value).is_err() {
            error!("SPI write of register {:#x} failed", register);
        }
    }

    /// Reads the 16-bit chip id.
    pub fn try_read_version(&mut self) -> Result<u16, Spi::Error> {
        let hi = self.try_read(CHIP_ID)?;
        let lo = self.try_read(ID_VER)?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    /// Number of samples waiting in the FIFO, 0 when the read fails.
    pub fn fifo_len(&mut self) -> u8 {
        self.read(FIFO_SIZE)
    }

    /// Empties the FIFO by pulsing its reset bit.
    pub fn reset_fifo(&mut self) {
        self.write(FIFO_STA, FIFO_STA_RESET);
        self.write(FIFO_STA, 0);
    }

    /// Clears every pending interrupt status bit.
    pub fn acknowledge_interrupts(&mut self) {
        self.write(INT_STA, INT_STA_ALL);
    }
}
