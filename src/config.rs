//! Board wiring and session settings.
//!
//! The defaults describe an RFM98W on a Raspberry Pi style carrier: SPI chip
//! select 1, DIO0 on GPIO 16 and reset on GPIO 12. A host binary typically fills
//! [`BoardConfig`] from its command line (`--spi-channel`, `--interrupt-pin`,
//! `--reset-pin`) and hands it to the [`TransmitSession`](crate::session::TransmitSession).

use crate::consts::{
    DEFAULT_INTERRUPT_PIN, DEFAULT_MAX_STALLED_POLLS, DEFAULT_RESET_PIN, DEFAULT_SPI_CHANNEL,
    SPI_CLOCK_HZ,
};
use crate::modem::ModemConfig;

/// Everything a session needs to know about the board and the radio link.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct BoardConfig {
    /// SPI chip-select channel the transceiver sits on.
    pub spi_channel: u8,
    /// GPIO line wired to DIO0.
    pub interrupt_pin: u8,
    /// GPIO line wired to the reset pin, if any.
    pub reset_pin: Option<u8>,
    /// SPI clock the bus is opened at.
    pub spi_clock_hz: u32,
    /// Consecutive status polls without FIFO progress before a send is abandoned.
    /// `None` polls forever.
    pub max_stalled_polls: Option<u32>,
    /// Modem parameters programmed at initialization.
    pub modem: ModemConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            spi_channel: DEFAULT_SPI_CHANNEL,
            interrupt_pin: DEFAULT_INTERRUPT_PIN,
            reset_pin: Some(DEFAULT_RESET_PIN),
            spi_clock_hz: SPI_CLOCK_HZ,
            max_stalled_polls: Some(DEFAULT_MAX_STALLED_POLLS),
            modem: ModemConfig::pocsag(),
        }
    }
}

impl BoardConfig {
    /// Sets the SPI channel.
    pub fn with_spi_channel(mut self, channel: u8) -> Self {
        self.spi_channel = channel;
        self
    }

    /// Sets the interrupt line.
    pub fn with_interrupt_pin(mut self, pin: u8) -> Self {
        self.interrupt_pin = pin;
        self
    }

    /// Sets or clears the reset line.
    pub fn with_reset_pin(mut self, pin: Option<u8>) -> Self {
        self.reset_pin = pin;
        self
    }

    /// Sets the FIFO stall guard.
    pub fn with_max_stalled_polls(mut self, polls: Option<u32>) -> Self {
        self.max_stalled_polls = polls;
        self
    }

    /// Replaces the modem parameters.
    pub fn with_modem(mut self, modem: ModemConfig) -> Self {
        self.modem = modem;
        self
    }
}
