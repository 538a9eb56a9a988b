//! Error definition for the crate

#[cfg(feature = "defmt")]
use defmt::Format;

#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum Error<SpiError> {
    /// SPI error
    Spi(SpiError),
    /// The chip id register did not hold the STMPE610 signature. The value
    /// read is carried along.
    UnexpectedVersion(u16),
}

