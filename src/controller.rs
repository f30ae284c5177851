//! Transceiver lifecycle: reset, identity check, mode changes and modem programming.
//!
//! [`TransceiverController`] owns the register bus, the optional reset line and
//! a delay provider. Every access is a blocking bus transaction.
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! # use embedded_hal_mock::eh1::digital::Mock as Pin;
//! # use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
//! use sx127x_pager::bus::SpiRegisterBus;
//! use sx127x_pager::controller::TransceiverController;
//!
//! # let spi = SpiMock::new(&[
//! #     SpiTransaction::transaction_start(),
//! #     SpiTransaction::write_vec(vec![0x42]),
//! #     SpiTransaction::read_vec(vec![0x12]),
//! #     SpiTransaction::transaction_end(),
//! # ]);
//! let mut radio: TransceiverController<_, Pin, _> =
//!     TransceiverController::new(SpiRegisterBus::new(spi), None, NoopDelay::new());
//! assert_eq!(radio.initialize(), Ok(0x12));
//! # let (bus, _, _) = radio.release();
//! # bus.release().done();
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::bus::RegisterBus;
use crate::consts::{MODE_SETTLE_MS, RESET_SETTLE_MS, SX127X_VERSION};
use crate::error::{ConfigurationFailure, Error};
use crate::modem::ModemConfig;
use crate::registers::{IrqFlags, OperatingMode, Register};

/// Register-level control of one SX127x.
///
/// ## Type Parameters
///
/// - `BUS`: a [`RegisterBus`], usually [`SpiRegisterBus`](crate::bus::SpiRegisterBus)
/// - `RST`: the output pin wired to the module's reset line
/// - `D`: a delay provider for the reset and mode settle times
#[derive(Debug)]
pub struct TransceiverController<BUS, RST, D> {
    bus: BUS,
    reset: Option<RST>,
    delay: D,
    mode: Option<OperatingMode>,
    version: Option<u8>,
}

impl<BUS, RST, D> TransceiverController<BUS, RST, D>
where
    BUS: RegisterBus,
    RST: OutputPin,
    D: DelayNs,
{
    /// Creates a controller. No bus traffic happens until [`initialize`](Self::initialize).
    pub fn new(bus: BUS, reset: Option<RST>, delay: D) -> Self {
        Self {
            bus,
            reset,
            delay,
            mode: None,
            version: None,
        }
    }

    /// Pulses the reset line (if any) and checks the chip identity.
    ///
    /// # Returns
    /// The value of `RegVersion`.
    ///
    /// # Errors
    /// [`ConfigurationFailure::VersionMismatch`] if the chip is not an SX127x.
    /// Nothing is written to the chip in that case.
    pub fn initialize(&mut self) -> Result<u8, Error> {
        if let Some(reset) = self.reset.as_mut() {
            info!("Resetting transceiver");
            reset.set_low().map_err(Error::pin)?;
            self.delay.delay_ms(RESET_SETTLE_MS);
            reset.set_high().map_err(Error::pin)?;
            self.delay.delay_ms(RESET_SETTLE_MS);
            info!("Reset complete");
        }
        self.mode = None;

        let version = self.read_register(Register::Version)?;
        info!("Transceiver version {:#x}", version);
        if version != SX127X_VERSION {
            error!(
                "Invalid transceiver version {:#x}, expected {:#x}",
                version, SX127X_VERSION
            );
            self.version = None;
            return Err(ConfigurationFailure::VersionMismatch { found: version }.into());
        }
        self.version = Some(version);
        Ok(version)
    }

    /// Writes `RegOpMode` and, for modes that need it, confirms the chip took it.
    ///
    /// # Errors
    /// [`ConfigurationFailure::ModeMismatch`] if the read-back differs.
    pub fn enter_mode(&mut self, mode: OperatingMode) -> Result<(), Error> {
        self.write_register(Register::OpMode, mode.bits())?;
        self.mode = Some(mode);

        if mode.needs_verification() {
            self.delay.delay_ms(MODE_SETTLE_MS);
            let found = self.read_mode()?;
            if found != mode.bits() {
                error!("Failed to set op mode {:?}, read back {:#x}", mode, found);
                self.mode = OperatingMode::from_bits(found);
                return Err(ConfigurationFailure::ModeMismatch {
                    requested: mode,
                    found,
                }
                .into());
            }
        }
        debug!("Op mode {:?}", mode);
        Ok(())
    }

    /// Reads the raw value of `RegOpMode`.
    pub fn read_mode(&mut self) -> Result<u8, Error> {
        self.read_register(Register::OpMode)
    }

    /// Programs bit rate, deviation, preamble length and carrier, in that order.
    pub fn program_modem(&mut self, config: &ModemConfig) -> Result<(), Error> {
        for (reg, value) in config.register_values() {
            self.write_register(reg, value)?;
        }
        info!(
            "Modem configured: {} bps, {} Hz deviation, preamble {}, frf {:#x}",
            config.bitrate_bps,
            config.deviation_hz,
            config.preamble_len,
            config.frf()
        );
        Ok(())
    }

    /// Reads a fresh snapshot of `RegIrqFlags2`.
    pub fn read_status(&mut self) -> Result<IrqFlags, Error> {
        let raw = self.read_register(Register::IrqFlags2)?;
        Ok(IrqFlags::from_bits_retain(raw))
    }

    /// Burst-writes bytes into the FIFO.
    pub fn write_fifo(&mut self, chunk: &[u8]) -> Result<(), Error> {
        self.bus.write(Register::Fifo, chunk).map_err(Error::bus)
    }

    /// Writes one register.
    pub fn write_register(&mut self, reg: Register, value: u8) -> Result<(), Error> {
        trace!("write {:?} = {:#x}", reg, value);
        self.bus.write_u8(reg, value).map_err(Error::bus)
    }

    /// Reads one register.
    pub fn read_register(&mut self, reg: Register) -> Result<u8, Error> {
        self.bus.read_u8(reg).map_err(Error::bus)
    }

    /// Blocks for `ms` milliseconds.
    pub fn settle_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// The last mode written, or observed after a failed switch.
    pub fn mode(&self) -> Option<OperatingMode> {
        self.mode
    }

    /// The chip version, once [`initialize`](Self::initialize) succeeded.
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    /// Borrows the register bus.
    pub fn bus(&self) -> &BUS {
        &self.bus
    }

    /// Returns the bus, reset line and delay provider.
    pub fn release(self) -> (BUS, Option<RST>, D) {
        (self.bus, self.reset, self.delay)
    }
}
