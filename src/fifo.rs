//! Streaming a payload through the 64-byte transmit FIFO.
//!
//! The FIFO is smaller than a POCSAG batch, so the payload is loaded in
//! [`FIFO_CHUNK_LEN`]-byte chunks while the chip is already transmitting. Flow
//! control is done by polling `RegIrqFlags2` before every chunk:
//!
//! | Flags seen        | Action |
//! |-------------------|--------|
//! | `FIFO_OVERRUN`    | abort, force standby, report [`TransmitOutcome::Overrun`] |
//! | `FIFO_FULL` / `FIFO_LEVEL` | re-poll, nothing consumed |
//! | otherwise         | write the next chunk |
//!
//! The transmitter is armed right after the first chunk lands in the FIFO, never
//! before, so the modulator never starts on an empty buffer. Once the last chunk
//! is queued the streamer waits for the FIFO to drain and returns the chip to
//! standby.
//!
//! [`FifoStreamer::poll`] performs one step and returns [`nb::Error::WouldBlock`]
//! while there is more to do, so cooperative hosts can interleave other work.
//! [`FifoStreamer::run`] spins on it without any added delay: bus latency
//! already paces the loop and sleeping risks an underrun.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use nb::block;

use crate::bus::RegisterBus;
use crate::consts::{FIFO_CHUNK_LEN, FIFO_FLUSH_DWELL_MS, FIFO_THRESHOLD, SYNC_CONFIG_OFF};
use crate::controller::TransceiverController;
use crate::error::{Error, TransmitOutcome};
use crate::registers::{IrqFlags, OperatingMode, Register};

/// Where the streamer is in its handshake with the FIFO.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum StreamState {
    /// FIFO not yet flushed and configured.
    #[default]
    Preparing,
    /// FIFO ready, first chunk not yet written.
    Loading,
    /// Transmitter armed, chunks being written.
    Transmitting,
    /// Waiting for the FIFO to drain, either to take the next chunk or to finish.
    Draining,
    /// Every byte was sent and the chip is in standby.
    Done,
    /// The send was aborted by an overrun or an error; the chip was returned to
    /// standby.
    Failed,
}

/// Pushes one payload through the FIFO of a borrowed [`TransceiverController`].
///
/// The controller, and with it the op-mode register, is held for the lifetime
/// of the streamer. Every exit path leaves the chip in standby.
#[derive(Debug)]
pub struct FifoStreamer<'a, BUS, RST, D> {
    radio: &'a mut TransceiverController<BUS, RST, D>,
    payload: &'a [u8],
    cursor: usize,
    state: StreamState,
    armed: bool,
    stalled_polls: u32,
    max_stalled_polls: Option<u32>,
    outcome: Option<Result<TransmitOutcome, Error>>,
}

impl<'a, BUS, RST, D> FifoStreamer<'a, BUS, RST, D>
where
    BUS: RegisterBus,
    RST: OutputPin,
    D: DelayNs,
{
    /// Creates a streamer for `payload`.
    ///
    /// # Arguments
    /// - `radio`: an initialized controller
    /// - `payload`: encoded bytes, sent left to right
    /// - `max_stalled_polls`: consecutive status polls without progress before
    ///   giving up with [`Error::Timeout`]; `None` never gives up
    pub fn new(
        radio: &'a mut TransceiverController<BUS, RST, D>,
        payload: &'a [u8],
        max_stalled_polls: Option<u32>,
    ) -> Self {
        Self {
            radio,
            payload,
            cursor: 0,
            state: StreamState::Preparing,
            armed: false,
            stalled_polls: 0,
            max_stalled_polls,
            outcome: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// How the transfer ended, or `None` while it is still running.
    pub fn outcome(&self) -> Option<Result<TransmitOutcome, Error>> {
        self.outcome
    }

    /// Number of payload bytes written to the FIFO so far.
    pub fn bytes_written(&self) -> usize {
        self.cursor
    }

    /// Configures the FIFO for transmission and flushes stale content.
    ///
    /// Sets the FIFO threshold, turns off sync word generation, rewinds the FIFO
    /// pointer, then dwells in receive mode to clear the buffer before returning
    /// to standby.
    pub fn prepare(&mut self) -> Result<(), Error> {
        if self.state != StreamState::Preparing {
            return Ok(());
        }
        if let Err(err) = self.flush() {
            return Err(self.abort(err));
        }
        if self.payload.is_empty() {
            self.state = StreamState::Done;
            self.outcome = Some(Ok(TransmitOutcome::Success));
        } else {
            self.state = StreamState::Loading;
        }
        debug!("FIFO prepared for {} bytes", self.payload.len());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.radio.write_register(Register::FifoThresh, FIFO_THRESHOLD)?;
        self.radio.write_register(Register::SyncConfig, SYNC_CONFIG_OFF)?;
        self.radio.write_register(Register::FifoAddrPtr, 0)?;
        self.radio.enter_mode(OperatingMode::FskReceive)?;
        self.radio.settle_ms(FIFO_FLUSH_DWELL_MS);
        self.radio.enter_mode(OperatingMode::Standby)
    }

    /// Advances the transfer by one status poll.
    ///
    /// # Returns
    /// - `Ok(TransmitOutcome::Success)` once every byte was sent
    /// - `Ok(TransmitOutcome::Overrun)` if the chip reported an overrun
    /// - `Err(nb::Error::WouldBlock)` while the transfer is in progress
    /// - `Err(nb::Error::Other(_))` on a bus error or a stall
    ///
    /// Once the transfer has ended, every further poll returns the same result
    /// without touching the bus.
    pub fn poll(&mut self) -> nb::Result<TransmitOutcome, Error> {
        if let Some(outcome) = self.outcome {
            return outcome.map_err(nb::Error::Other);
        }
        if self.state == StreamState::Preparing {
            self.prepare()?;
            return Err(nb::Error::WouldBlock);
        }

        let outcome = match self.step() {
            Ok(Some(outcome)) => Ok(outcome),
            Ok(None) => return Err(nb::Error::WouldBlock),
            Err(err) => Err(self.abort(err)),
        };
        self.outcome = Some(outcome);
        outcome.map_err(nb::Error::Other)
    }

    /// Runs the transfer to completion, busy-polling the chip.
    pub fn run(&mut self) -> Result<TransmitOutcome, Error> {
        block!(self.poll())
    }

    fn step(&mut self) -> Result<Option<TransmitOutcome>, Error> {
        // Never cached: the chip drains the FIFO between polls
        let flags = self.radio.read_status()?;

        if flags.overrun() {
            error!(
                "FIFO overrun after {} of {} bytes, irq flags {:#x}",
                self.cursor,
                self.payload.len(),
                flags.bits()
            );
            self.radio.enter_mode(OperatingMode::Standby)?;
            self.state = StreamState::Failed;
            return Ok(Some(TransmitOutcome::Overrun));
        }

        if self.cursor >= self.payload.len() {
            if flags.drained() {
                self.radio.enter_mode(OperatingMode::Standby)?;
                self.state = StreamState::Done;
                info!("Sent {} bytes", self.cursor);
                return Ok(Some(TransmitOutcome::Success));
            }
            self.state = StreamState::Draining;
            return self.stalled(flags).map(|_| None);
        }

        if flags.blocks_loading() {
            self.state = StreamState::Draining;
            return self.stalled(flags).map(|_| None);
        }

        let end = (self.cursor + FIFO_CHUNK_LEN).min(self.payload.len());
        self.radio.write_fifo(&self.payload[self.cursor..end])?;
        self.cursor = end;
        self.stalled_polls = 0;

        if !self.armed {
            info!("TX mode");
            self.radio.enter_mode(OperatingMode::FskTransmit)?;
            self.armed = true;
        }
        self.state = StreamState::Transmitting;
        Ok(None)
    }

    fn stalled(&mut self, flags: IrqFlags) -> Result<(), Error> {
        self.stalled_polls = self.stalled_polls.saturating_add(1);
        match self.max_stalled_polls {
            Some(limit) if self.stalled_polls > limit => {
                error!(
                    "FIFO stalled for {} polls with {} of {} bytes written, irq flags {:#x}",
                    self.stalled_polls,
                    self.cursor,
                    self.payload.len(),
                    flags.bits()
                );
                Err(Error::Timeout {
                    polls: self.stalled_polls,
                })
            }
            _ => Ok(()),
        }
    }

    /// Marks the transfer failed and makes a best effort to leave the chip in standby.
    ///
    /// `err` is recorded and returned even when the standby write fails too.
    fn abort(&mut self, err: Error) -> Error {
        self.state = StreamState::Failed;
        self.outcome = Some(Err(err));
        if let Err(cleanup) = self.radio.enter_mode(OperatingMode::Standby) {
            warn!(
                "Could not return to standby after {:?}: {:?} ({} of {} bytes written)",
                err,
                cleanup,
                self.cursor,
                self.payload.len()
            );
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::fake::{FakeChip, FakeDelay};
    use embedded_hal::spi::ErrorKind;
    use embedded_hal_mock::eh1::digital::Mock as PinMock;

    type Radio = TransceiverController<FakeChip, PinMock, FakeDelay>;

    const FULL: u8 = IrqFlags::FIFO_FULL.bits();
    const LEVEL: u8 = IrqFlags::FIFO_LEVEL.bits();
    const OVERRUN: u8 = IrqFlags::FIFO_OVERRUN.bits();
    const READY: u8 = 0;

    fn radio(chip: FakeChip) -> Radio {
        TransceiverController::new(chip, None, FakeDelay::default())
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    #[test]
    fn test_prepare_flushes_fifo() {
        let mut radio = radio(FakeChip::new());
        let data = payload(4);
        let mut streamer = FifoStreamer::new(&mut radio, &data, None);

        streamer.prepare().unwrap();
        assert_eq!(streamer.state(), StreamState::Loading);

        let writes: Vec<(Register, u8)> = radio
            .bus()
            .writes
            .iter()
            .map(|(reg, data)| (*reg, data[0]))
            .collect();
        assert_eq!(
            writes,
            vec![
                (Register::FifoThresh, 0x04),
                (Register::SyncConfig, 0x00),
                (Register::FifoAddrPtr, 0x00),
                (Register::OpMode, 0x05),
                (Register::OpMode, 0x01),
            ]
        );
        let (_, _, delay) = radio.release();
        assert_eq!(delay.waits_ms, vec![100]);
    }

    #[test]
    fn test_chunks_cover_payload_exactly() {
        let mut radio = radio(FakeChip::new().with_irq(&[READY; 8]));
        let data = payload(53);

        let outcome = FifoStreamer::new(&mut radio, &data, None).run();

        assert_eq!(outcome, Ok(TransmitOutcome::Success));
        let chunks: Vec<usize> = radio
            .bus()
            .writes_to(Register::Fifo)
            .iter()
            .map(|c| c.len())
            .collect();
        assert_eq!(chunks, vec![16, 16, 16, 5]);
        assert_eq!(radio.bus().fifo_bytes(), data);
    }

    #[test]
    fn test_transmit_armed_once_after_first_chunk() {
        let mut radio = radio(FakeChip::new().with_irq(&[READY, FULL, READY, LEVEL, READY]));
        let data = payload(40);

        let outcome = FifoStreamer::new(&mut radio, &data, None).run();
        assert_eq!(outcome, Ok(TransmitOutcome::Success));

        let writes = &radio.bus().writes;
        let first_fifo = writes
            .iter()
            .position(|(reg, _)| *reg == Register::Fifo)
            .unwrap();
        let tx_writes: Vec<usize> = writes
            .iter()
            .enumerate()
            .filter(|(_, (reg, data))| *reg == Register::OpMode && data[0] == 0x03)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(tx_writes, vec![first_fifo + 1]);
        assert_eq!(radio.bus().last_mode_write(), Some(OperatingMode::Standby));
    }

    #[test]
    fn test_state_transitions() {
        let mut radio = radio(FakeChip::new().with_irq(&[READY, FULL, READY, READY]));
        let data = payload(20);
        let mut streamer = FifoStreamer::new(&mut radio, &data, None);

        assert_eq!(streamer.state(), StreamState::Preparing);
        assert_eq!(streamer.poll(), Err(nb::Error::WouldBlock));
        assert_eq!(streamer.state(), StreamState::Loading);
        assert_eq!(streamer.poll(), Err(nb::Error::WouldBlock));
        assert_eq!(streamer.state(), StreamState::Transmitting);
        assert_eq!(streamer.bytes_written(), 16);
        assert_eq!(streamer.poll(), Err(nb::Error::WouldBlock));
        assert_eq!(streamer.state(), StreamState::Draining);
        assert_eq!(streamer.poll(), Err(nb::Error::WouldBlock));
        assert_eq!(streamer.state(), StreamState::Transmitting);
        assert_eq!(streamer.bytes_written(), 20);
        // Last chunk queued; chip reports nothing drained yet
        assert_eq!(streamer.poll(), Err(nb::Error::WouldBlock));
        assert_eq!(streamer.state(), StreamState::Draining);
        // Idle flags report the FIFO empty
        assert_eq!(streamer.poll(), Ok(TransmitOutcome::Success));
        assert_eq!(streamer.state(), StreamState::Done);
        assert_eq!(streamer.poll(), Ok(TransmitOutcome::Success));
    }

    #[test]
    fn test_overrun_on_third_poll() {
        let mut radio = radio(FakeChip::new().with_irq(&[READY, READY, OVERRUN]));
        let data = payload(64);

        let outcome = FifoStreamer::new(&mut radio, &data, None).run();

        assert_eq!(outcome, Ok(TransmitOutcome::Overrun));
        assert_eq!(radio.bus().status_polls, 3);
        assert_eq!(radio.bus().writes_to(Register::Fifo).len(), 2);
        // Nothing touches the FIFO once the overrun is seen
        let (reg, _) = radio.bus().writes.last().unwrap();
        assert_eq!(*reg, Register::OpMode);
        assert_eq!(radio.bus().last_mode_write(), Some(OperatingMode::Standby));
    }

    #[test]
    fn test_overrun_with_space_available_writes_nothing() {
        let mut radio = radio(FakeChip::new().with_irq(&[OVERRUN | IrqFlags::FIFO_EMPTY.bits()]));
        let data = payload(8);

        let outcome = FifoStreamer::new(&mut radio, &data, None).run();

        assert_eq!(outcome, Ok(TransmitOutcome::Overrun));
        assert!(radio.bus().writes_to(Register::Fifo).is_empty());
        assert_eq!(
            radio.bus().mode_writes(),
            vec![0x05, 0x01, 0x01],
            "flush, then forced standby, never transmit"
        );
    }

    #[test]
    fn test_stall_guard_times_out() {
        let mut chip = FakeChip::new();
        chip.idle_irq = FULL;
        let mut radio = radio(chip);
        let data = payload(32);

        let mut streamer = FifoStreamer::new(&mut radio, &data, Some(10));

        assert_eq!(streamer.run(), Err(Error::Timeout { polls: 11 }));
        assert_eq!(streamer.state(), StreamState::Failed);
        // A stall stays a stall, it is never reported as an overrun
        assert_eq!(
            streamer.poll(),
            Err(nb::Error::Other(Error::Timeout { polls: 11 }))
        );
        assert_eq!(streamer.outcome(), Some(Err(Error::Timeout { polls: 11 })));
        assert_eq!(radio.bus().status_polls, 11);
        assert_eq!(radio.bus().last_mode_write(), Some(OperatingMode::Standby));
    }

    #[test]
    fn test_empty_payload_never_arms_transmit() {
        let mut radio = radio(FakeChip::new());

        let outcome = FifoStreamer::new(&mut radio, &[], None).run();

        assert_eq!(outcome, Ok(TransmitOutcome::Success));
        assert!(!radio.bus().mode_writes().contains(&0x03));
        assert_eq!(radio.bus().status_polls, 0);
    }

    #[test]
    fn test_overrun_outcome_is_sticky() {
        let mut radio = radio(FakeChip::new().with_irq(&[OVERRUN]));
        let data = payload(8);
        let mut streamer = FifoStreamer::new(&mut radio, &data, None);

        assert_eq!(streamer.run(), Ok(TransmitOutcome::Overrun));
        assert_eq!(streamer.poll(), Ok(TransmitOutcome::Overrun));
        assert_eq!(radio.bus().status_polls, 1);
    }

    #[test]
    fn test_bus_error_while_preparing_returns_to_standby() {
        // Write 3 is the receive-mode flush
        let mut radio = radio(FakeChip::new().failing_writes(&[3]));
        let data = payload(8);
        let mut streamer = FifoStreamer::new(&mut radio, &data, None);

        assert_eq!(streamer.run(), Err(Error::Bus(ErrorKind::Other)));
        assert_eq!(streamer.state(), StreamState::Failed);
        assert_eq!(
            streamer.poll(),
            Err(nb::Error::Other(Error::Bus(ErrorKind::Other)))
        );

        assert!(radio.bus().writes_to(Register::Fifo).is_empty());
        assert_eq!(radio.bus().mode_writes(), vec![0x01]);
        assert_eq!(radio.bus().status_polls, 0);
    }

    #[test]
    fn test_bus_error_mid_load_returns_to_standby() {
        // Writes 0..=4 prepare, 5 is the first chunk, 6 arms transmit, 7 the second chunk
        let mut radio = radio(FakeChip::new().with_irq(&[READY; 4]).failing_writes(&[7]));
        let data = payload(40);

        let outcome = FifoStreamer::new(&mut radio, &data, None).run();

        assert_eq!(outcome, Err(Error::Bus(ErrorKind::Other)));
        assert_eq!(radio.bus().writes_to(Register::Fifo).len(), 1);
        assert_eq!(radio.bus().mode_writes(), vec![0x05, 0x01, 0x03, 0x01]);
        assert_eq!(radio.bus().last_mode_write(), Some(OperatingMode::Standby));
    }

    #[test]
    fn test_failed_standby_keeps_original_error() {
        // Second chunk and the standby write after it both fail
        let mut radio = radio(FakeChip::new().with_irq(&[READY; 4]).failing_writes(&[7, 8]));
        let data = payload(40);
        let mut streamer = FifoStreamer::new(&mut radio, &data, None);

        assert_eq!(streamer.run(), Err(Error::Bus(ErrorKind::Other)));
        assert_eq!(streamer.state(), StreamState::Failed);
        assert_eq!(streamer.bytes_written(), 16);

        assert_eq!(radio.bus().write_attempts, 9);
        assert_eq!(
            radio.bus().last_mode_write(),
            Some(OperatingMode::FskTransmit)
        );
    }
}
