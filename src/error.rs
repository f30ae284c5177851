//! Error and outcome types.
//!
//! [`Error`] covers everything that aborts an operation. A send that runs to
//! completion, or is cut short by a FIFO overrun, reports a [`TransmitOutcome`].

use embedded_hal::{digital, spi};
use thiserror::Error;

use crate::registers::OperatingMode;

/// The chip is not the chip we expect, or did not accept its configuration.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ConfigurationFailure {
    /// `RegVersion` did not report an SX127x.
    #[error("unexpected chip version {found:#04x}")]
    VersionMismatch {
        /// Value read from `RegVersion`.
        found: u8,
    },
    /// `RegOpMode` read back a different value than was written.
    #[error("op mode {requested:?} not applied, chip reports {found:#04x}")]
    ModeMismatch {
        /// Mode that was written.
        requested: OperatingMode,
        /// Raw value read back.
        found: u8,
    },
}

/// Errors raised by the driver.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Error {
    /// The SPI transaction failed.
    #[error("SPI bus error: {0:?}")]
    Bus(spi::ErrorKind),
    /// Driving the reset line failed.
    #[error("GPIO error: {0:?}")]
    Pin(digital::ErrorKind),
    /// The chip failed identity or mode verification.
    #[error("configuration failure: {0}")]
    Configuration(#[from] ConfigurationFailure),
    /// The paging encoder rejected the message.
    #[error("paging encoder failed")]
    Encoder,
    /// The FIFO made no progress for too many consecutive status polls.
    #[error("FIFO stalled for {polls} status polls")]
    Timeout {
        /// Consecutive polls without progress.
        polls: u32,
    },
}

impl Error {
    pub(crate) fn bus<E: spi::Error>(err: E) -> Self {
        Error::Bus(err.kind())
    }

    pub(crate) fn pin<E: digital::Error>(err: E) -> Self {
        Error::Pin(err.kind())
    }
}

/// Terminal result of one transmission.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TransmitOutcome {
    /// Every payload byte went through the FIFO and the chip is back in standby.
    Success,
    /// The FIFO overran mid-transmission. The chip was forced to standby.
    Overrun,
    /// The session is not configured; nothing was sent.
    ConfigurationFailure,
}
