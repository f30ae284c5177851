//! Constants shared by the controller, the FIFO streamer and the session.
//!
//! Values come from the SX1276/77/78 datasheet (FSK/OOK register page) and the
//! board wiring used for POCSAG transmission on an RFM98W module.
//!
//! ## Key Concepts
//!
//! - **Chip identity**: the `RegVersion` value every SX127x silicon revision reports.
//! - **Bus framing**: the high bit of the address byte selects a register write.
//! - **Timing**: fixed settle delays around reset and mode changes.
//! - **FIFO**: hardware capacity and the chunk size the streamer loads per write.

/// Value of `RegVersion` (0x42) for the SX1276/77/78 (HopeRF RFM95/96/98W).
pub const SX127X_VERSION: u8 = 0x12;

/// Address-byte marker that turns a register access into a write.
pub const WRITE_MASK: u8 = 0x80;

/// Mask for the 7-bit register address.
pub const ADDRESS_MASK: u8 = 0x7f;

/// Crystal oscillator frequency of the module in Hz.
pub const FXOSC_HZ: u32 = 32_000_000;

/// `2^19`, the divider between the crystal and the synthesizer step.
pub const FSTEP_DIVIDER: u32 = 1 << 19;

/// Synthesizer frequency step in Hz (`FXOSC / 2^19`, ~61.035 Hz).
pub const FSTEP_HZ: f64 = FXOSC_HZ as f64 / FSTEP_DIVIDER as f64;

/// SPI clock the board is expected to run the bus at.
pub const SPI_CLOCK_HZ: u32 = 5_000_000;

/// Reset line low/high phase duration.
pub const RESET_SETTLE_MS: u32 = 10;

/// Wait between an op-mode write and its read-back.
pub const MODE_SETTLE_MS: u32 = 100;

/// How long the chip sits in receive mode to flush stale FIFO content.
pub const FIFO_FLUSH_DWELL_MS: u32 = 100;

/// Size of the FSK FIFO in bytes.
pub const FIFO_CAPACITY: usize = 64;

/// Bytes written to the FIFO per load.
pub const FIFO_CHUNK_LEN: usize = 16;

/// `RegFifoThresh`: TxStartCondition = FifoLevel, FifoThreshold = 4.
pub const FIFO_THRESHOLD: u8 = 0x04;

/// `RegSyncConfig` with sync word generation off. The encoder emits its own sync codewords.
pub const SYNC_CONFIG_OFF: u8 = 0x00;

/// Consecutive status polls without progress before a send is abandoned.
pub const DEFAULT_MAX_STALLED_POLLS: u32 = 1_000_000;

/// Depth of the interrupt event queue.
pub const IRQ_QUEUE_LEN: usize = 16;

/// Default SPI chip-select channel (`/dev/spidev0.1`).
pub const DEFAULT_SPI_CHANNEL: u8 = 1;

/// Default GPIO line wired to DIO0.
pub const DEFAULT_INTERRUPT_PIN: u8 = 16;

/// Default GPIO line wired to the module's reset pin.
pub const DEFAULT_RESET_PIN: u8 = 12;
