//! One radio, one encoder, any number of pages.
//!
//! [`TransmitSession`] ties a [`TransceiverController`] to a [`PagingEncoder`]:
//!
//! 1. [`initialize`](TransmitSession::initialize) resets and identifies the chip,
//!    switches it to FSK (verified), parks it in standby and programs the modem.
//! 2. [`send`](TransmitSession::send) encodes a page and streams it through the
//!    FIFO with a fresh [`FifoStreamer`]. Each send flushes the FIFO first, so a
//!    failed send does not affect the next one.
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! # use embedded_hal_mock::eh1::digital::Mock as Pin;
//! # use embedded_hal_mock::eh1::spi::Mock as SpiMock;
//! use sx127x_pager::bus::SpiRegisterBus;
//! use sx127x_pager::config::BoardConfig;
//! use sx127x_pager::controller::TransceiverController;
//! use sx127x_pager::session::{PageEntry, PagingEncoder, TransmitSession};
//! use sx127x_pager::TransmitOutcome;
//!
//! struct Pocsag;
//!
//! impl PagingEncoder for Pocsag {
//!     type Payload = Vec<u8>;
//!     type Error = ();
//!
//!     fn encode(&mut self, _entries: &[PageEntry<'_>], _inverted: bool) -> Result<Vec<u8>, ()> {
//!         Ok(vec![0xaa; 72])
//!     }
//! }
//!
//! # let spi = SpiMock::new(&[]);
//! let radio: TransceiverController<_, Pin, _> =
//!     TransceiverController::new(SpiRegisterBus::new(spi), None, NoopDelay::new());
//! let mut session = TransmitSession::new(radio, Pocsag, BoardConfig::default());
//!
//! // Without a successful `initialize()` nothing is sent
//! assert_eq!(
//!     session.send(false, "1542350", "HACK THE PLANET"),
//!     Ok(TransmitOutcome::ConfigurationFailure)
//! );
//! # let (radio, _) = session.release();
//! # let (bus, _, _) = radio.release();
//! # bus.release().done();
//! ```

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::bus::RegisterBus;
use crate::config::BoardConfig;
use crate::controller::TransceiverController;
use crate::error::{Error, TransmitOutcome};
use crate::fifo::FifoStreamer;
use crate::registers::OperatingMode;

/// One page: a recipient and a message.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PageEntry<'a> {
    /// Send the message as numeric rather than alphanumeric.
    pub numeric: bool,
    /// Recipient identifier (RIC), optionally suffixed with a function code `A`..`D`.
    pub address: &'a str,
    /// Message text.
    pub message: &'a str,
}

/// Turns pages into the bit-serial byte stream the FIFO transmits.
///
/// The encoder is responsible for the POCSAG preamble, sync codewords, batching
/// and idle fill. `inverted` asks for the bit polarity the FSK modulator needs.
pub trait PagingEncoder {
    /// Encoded bytes.
    type Payload: AsRef<[u8]>;
    /// Encoder failure.
    type Error: Debug;

    /// Encodes `entries` into one transmission.
    fn encode(
        &mut self,
        entries: &[PageEntry<'_>],
        inverted: bool,
    ) -> Result<Self::Payload, Self::Error>;
}

/// Drives a transceiver through configuration and repeated page sends.
#[derive(Debug)]
pub struct TransmitSession<BUS, RST, D, ENC> {
    radio: TransceiverController<BUS, RST, D>,
    encoder: ENC,
    config: BoardConfig,
    ready: bool,
    sent: u16,
    overruns: u16,
}

impl<BUS, RST, D, ENC> TransmitSession<BUS, RST, D, ENC>
where
    BUS: RegisterBus,
    RST: OutputPin,
    D: DelayNs,
    ENC: PagingEncoder,
{
    /// Creates a session. Call [`initialize`](Self::initialize) before sending.
    pub fn new(
        radio: TransceiverController<BUS, RST, D>,
        encoder: ENC,
        config: BoardConfig,
    ) -> Self {
        Self {
            radio,
            encoder,
            config,
            ready: false,
            sent: 0,
            overruns: 0,
        }
    }

    /// Resets, identifies and configures the transceiver.
    ///
    /// # Errors
    /// Any [`ConfigurationFailure`](crate::error::ConfigurationFailure) is fatal:
    /// it is logged and returned, and the session refuses to send.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.ready = false;
        info!(
            "Configuring board: spi_channel {}, interrupt_pin {}, reset_pin {:?}, spi_clock_hz {}",
            self.config.spi_channel,
            self.config.interrupt_pin,
            self.config.reset_pin,
            self.config.spi_clock_hz
        );

        if let Err(err) = self.configure() {
            error!(
                "Board configuration failed: {:?} (spi_channel {}, reset_pin {:?})",
                err, self.config.spi_channel, self.config.reset_pin
            );
            return Err(err);
        }
        self.ready = true;
        Ok(())
    }

    fn configure(&mut self) -> Result<(), Error> {
        let _ = self.radio.initialize()?;
        self.radio.enter_mode(OperatingMode::Sleep)?;
        self.radio.enter_mode(OperatingMode::Standby)?;
        self.radio.program_modem(&self.config.modem)
    }

    /// Encodes and transmits one page.
    ///
    /// # Returns
    /// - [`TransmitOutcome::Success`] when the page went out
    /// - [`TransmitOutcome::Overrun`] when the FIFO overran; the next send starts afresh
    /// - [`TransmitOutcome::ConfigurationFailure`] when the session is not initialized
    ///
    /// # Errors
    /// Bus errors, encoder errors and FIFO stalls.
    pub fn send(
        &mut self,
        numeric: bool,
        address: &str,
        message: &str,
    ) -> Result<TransmitOutcome, Error> {
        if !self.ready {
            error!(
                "Refusing to send to {}: transceiver not configured (spi_channel {})",
                address, self.config.spi_channel
            );
            return Ok(TransmitOutcome::ConfigurationFailure);
        }

        info!("Encoding message for {}: {}", address, message);
        let entries = [PageEntry {
            numeric,
            address,
            message,
        }];
        let spi_channel = self.config.spi_channel;
        let payload = self.encoder.encode(&entries, true).map_err(|_| {
            error!(
                "Encoding failed for {}: {} (spi_channel {})",
                address, message, spi_channel
            );
            Error::Encoder
        })?;
        let payload = payload.as_ref();
        debug!("Encoded {} bytes for {}", payload.len(), address);

        let outcome = FifoStreamer::new(&mut self.radio, payload, self.config.max_stalled_polls)
            .run()
            .inspect_err(|err| {
                error!(
                    "Send to {} failed: {:?} (spi_channel {}, {} bytes)",
                    address,
                    err,
                    spi_channel,
                    payload.len()
                )
            })?;
        match outcome {
            TransmitOutcome::Success => self.sent = self.sent.wrapping_add(1),
            TransmitOutcome::Overrun => {
                self.overruns = self.overruns.wrapping_add(1);
                error!(
                    "FIFO overrun while paging {} (spi_channel {}, {} bytes)",
                    address,
                    spi_channel,
                    payload.len()
                );
            }
            TransmitOutcome::ConfigurationFailure => {}
        }
        Ok(outcome)
    }

    /// Whether [`initialize`](Self::initialize) has succeeded.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Pages sent successfully.
    pub fn sent(&self) -> u16 {
        self.sent
    }

    /// Sends aborted by a FIFO overrun.
    pub fn overruns(&self) -> u16 {
        self.overruns
    }

    /// The board configuration.
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Borrows the controller.
    pub fn radio(&self) -> &TransceiverController<BUS, RST, D> {
        &self.radio
    }

    /// Returns the controller and the encoder.
    pub fn release(self) -> (TransceiverController<BUS, RST, D>, ENC) {
        (self.radio, self.encoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::fake::{FakeChip, FakeDelay};
    use crate::error::ConfigurationFailure;
    use crate::registers::{IrqFlags, Register};
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[derive(Debug, Default)]
    struct RecordingEncoder {
        calls: Vec<(Vec<(bool, String, String)>, bool)>,
        fail: bool,
    }

    impl PagingEncoder for RecordingEncoder {
        type Payload = Vec<u8>;
        type Error = &'static str;

        fn encode(
            &mut self,
            entries: &[PageEntry<'_>],
            inverted: bool,
        ) -> Result<Vec<u8>, &'static str> {
            self.calls.push((
                entries
                    .iter()
                    .map(|e| (e.numeric, e.address.to_string(), e.message.to_string()))
                    .collect(),
                inverted,
            ));
            if self.fail {
                return Err("unsupported character");
            }
            Ok((0..72).collect())
        }
    }

    type Session = TransmitSession<FakeChip, PinMock, FakeDelay, RecordingEncoder>;

    fn session(chip: FakeChip, reset: Option<PinMock>) -> Session {
        let radio = TransceiverController::new(chip, reset, FakeDelay::default());
        TransmitSession::new(radio, RecordingEncoder::default(), BoardConfig::default())
    }

    #[test]
    fn test_page_is_encoded_and_sent() {
        let reset = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut session = session(FakeChip::new(), Some(reset));

        session.initialize().unwrap();
        assert!(session.is_ready());
        assert_eq!(
            session.send(false, "1542350", "HACK THE PLANET"),
            Ok(TransmitOutcome::Success)
        );
        assert_eq!(session.sent(), 1);

        let (radio, encoder) = session.release();
        assert_eq!(
            encoder.calls,
            vec![(
                vec![(false, "1542350".to_string(), "HACK THE PLANET".to_string())],
                true
            )]
        );
        let (chip, reset, _) = radio.release();
        assert_eq!(chip.fifo_bytes(), (0..72).collect::<Vec<u8>>());
        // FSK sleep, standby, flush rx, standby, tx, standby
        assert_eq!(chip.mode_writes(), vec![0x08, 0x01, 0x05, 0x01, 0x03, 0x01]);
        assert_eq!(chip.writes_to(Register::FrfMsb), vec![&[0x6du8][..]]);
        let _ = reset.map(|mut pin| pin.done());
    }

    #[test]
    fn test_wrong_chip_stops_before_configuration() {
        let mut chip = FakeChip::new();
        chip.version = 0x99;
        let mut session = session(chip, None);

        assert_eq!(
            session.initialize(),
            Err(Error::Configuration(ConfigurationFailure::VersionMismatch {
                found: 0x99
            }))
        );
        assert!(!session.is_ready());
        assert!(session.radio().bus().writes.is_empty());

        assert_eq!(
            session.send(false, "1542350", "HACK THE PLANET"),
            Ok(TransmitOutcome::ConfigurationFailure)
        );
        let (radio, encoder) = session.release();
        assert!(encoder.calls.is_empty());
        assert!(radio.bus().writes.is_empty());
    }

    #[test]
    fn test_lora_chip_that_refuses_fsk() {
        let mut chip = FakeChip::new();
        chip.op_mode_override = Some(0x80);
        let mut session = session(chip, None);

        assert_eq!(
            session.initialize(),
            Err(Error::Configuration(ConfigurationFailure::ModeMismatch {
                requested: OperatingMode::Sleep,
                found: 0x80,
            }))
        );
        assert_eq!(session.radio().bus().mode_writes(), vec![0x08]);
        assert!(session.radio().bus().writes_to(Register::BitrateMsb).is_empty());
    }

    #[test]
    fn test_overrun_then_next_send_starts_fresh() {
        let overrun = IrqFlags::FIFO_OVERRUN.bits();
        let mut session = session(FakeChip::new().with_irq(&[0, 0, overrun]), None);
        session.initialize().unwrap();

        assert_eq!(
            session.send(false, "1542350", "HACK THE PLANET"),
            Ok(TransmitOutcome::Overrun)
        );
        assert_eq!(
            session.radio().bus().last_mode_write(),
            Some(OperatingMode::Standby)
        );
        assert_eq!(session.overruns(), 1);

        assert_eq!(
            session.send(true, "1234567", "0123"),
            Ok(TransmitOutcome::Success)
        );
        assert_eq!(session.sent(), 1);
        // Second send flushed the FIFO again before loading
        assert_eq!(session.radio().bus().writes_to(Register::FifoAddrPtr).len(), 2);
    }

    #[test]
    fn test_encoder_failure_is_reported() {
        let radio = TransceiverController::new(FakeChip::new(), None, FakeDelay::default());
        let encoder = RecordingEncoder {
            fail: true,
            ..Default::default()
        };
        let mut session: Session = TransmitSession::new(radio, encoder, BoardConfig::default());
        session.initialize().unwrap();

        assert_eq!(session.send(false, "1542350", "~"), Err(Error::Encoder));
        assert!(session.radio().bus().writes_to(Register::Fifo).is_empty());
        assert_eq!(session.config().spi_channel, 1);
    }
}
