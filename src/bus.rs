//! Register access over SPI.
//!
//! [`RegisterBus`] is the contract the controller talks to: read or write a run
//! of bytes at a register address. [`SpiRegisterBus`] implements it on top of an
//! `embedded-hal` [`SpiDevice`], framing each access as one chip-select
//! transaction whose first byte is the address, with the high bit set for writes.
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
//! use sx127x_pager::bus::{RegisterBus, SpiRegisterBus};
//! use sx127x_pager::registers::Register;
//!
//! # let spi = SpiMock::new(&[
//! #     SpiTransaction::transaction_start(),
//! #     SpiTransaction::write_vec(vec![0x42]),
//! #     SpiTransaction::read_vec(vec![0x12]),
//! #     SpiTransaction::transaction_end(),
//! # ]);
//! let mut bus = SpiRegisterBus::new(spi);
//! let version = bus.read_u8(Register::Version).unwrap();
//! assert_eq!(version, 0x12);
//! # bus.release().done();
//! ```

use embedded_hal::spi::{Operation, SpiDevice};

use crate::registers::Register;

/// Byte-level register access to the transceiver.
///
/// Implementations must perform each call as a single, blocking bus transaction.
pub trait RegisterBus {
    /// Error raised by the underlying bus.
    type Error: embedded_hal::spi::Error;

    /// Reads `buf.len()` bytes starting at `reg`.
    fn read(&mut self, reg: Register, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `data` starting at `reg`.
    fn write(&mut self, reg: Register, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads a single register.
    fn read_u8(&mut self, reg: Register) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.read(reg, &mut buf)?;
        Ok(buf[0])
    }

    /// Writes a single register.
    fn write_u8(&mut self, reg: Register, value: u8) -> Result<(), Self::Error> {
        self.write(reg, &[value])
    }
}

/// [`RegisterBus`] over an `embedded-hal` SPI device.
///
/// The device is expected to be configured for SPI mode 0 at
/// [`SPI_CLOCK_HZ`](crate::consts::SPI_CLOCK_HZ) or slower.
#[derive(Debug)]
pub struct SpiRegisterBus<SPI> {
    spi: SPI,
}

impl<SPI> SpiRegisterBus<SPI> {
    /// Wraps an SPI device.
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Returns the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> RegisterBus for SpiRegisterBus<SPI>
where
    SPI: SpiDevice,
{
    type Error = SPI::Error;

    fn read(&mut self, reg: Register, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.transaction(&mut [
            Operation::Write(&[reg.read_address()]),
            Operation::Read(buf),
        ])
    }

    fn write(&mut self, reg: Register, data: &[u8]) -> Result<(), Self::Error> {
        self.spi.transaction(&mut [
            Operation::Write(&[reg.write_address()]),
            Operation::Write(data),
        ])
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    #[test]
    fn test_read_sends_plain_address() {
        let spi = SpiMock::new(&[
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x3f]),
            SpiTransaction::read_vec(vec![0x40]),
            SpiTransaction::transaction_end(),
        ]);
        let mut bus = SpiRegisterBus::new(spi);

        assert_eq!(bus.read_u8(Register::IrqFlags2).unwrap(), 0x40);
        bus.release().done();
    }

    #[test]
    fn test_write_sets_write_marker() {
        let spi = SpiMock::new(&[
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x81]),
            SpiTransaction::write_vec(vec![0x08]),
            SpiTransaction::transaction_end(),
        ]);
        let mut bus = SpiRegisterBus::new(spi);

        bus.write_u8(Register::OpMode, 0x08).unwrap();
        bus.release().done();
    }

    #[test]
    fn test_burst_write_to_fifo() {
        let chunk = [0xaa, 0x55, 0x7c, 0xd2];
        let spi = SpiMock::new(&[
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x80]),
            SpiTransaction::write_vec(chunk.to_vec()),
            SpiTransaction::transaction_end(),
        ]);
        let mut bus = SpiRegisterBus::new(spi);

        bus.write(Register::Fifo, &chunk).unwrap();
        bus.release().done();
    }
}
