//! # sx127x-pager
//!
//! A portable, no_std Rust driver that turns an SX1276/77/78 sub-GHz transceiver
//! (HopeRF RFM95/96/98W) into a POCSAG paging transmitter.
//!
//! The chip is put in FSK mode and a pre-encoded, bit-serial paging payload is
//! streamed through its 64-byte transmit FIFO under polled flow control:
//! - `embedded-hal` traits for SPI, GPIO and delays
//! - register-level mode transitions (sleep → standby → receive-clear → transmit)
//! - chunked FIFO loading gated by the chip's status flags, with overrun detection
//! - an interrupt-safe event queue for the DIO line, built on `critical-section`
//!
//! ## Crate features
//! | Feature     | Description |
//! |-------------|-------------|
//! | `std`       | Disables `#![no_std]` |
//! | `log`       | Uses `log` logging |
//! | `defmt-0-3` | Uses `defmt` logging and derives `defmt::Format` |
//!
//! ## Modules
//!
//! - [`controller`]: reset, chip identity, op-mode changes, modem programming
//! - [`fifo`]: the transmit-time FIFO handshake
//! - [`irq`]: observing the DIO interrupt line
//! - [`session`]: encoding and sending pages end to end
//! - [`bus`]: register access over `embedded-hal` SPI
//! - [`registers`], [`modem`], [`config`], [`consts`]: register map and settings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sx127x_pager::{BoardConfig, SpiRegisterBus, TransceiverController, TransmitSession};
//!
//! let radio = TransceiverController::new(SpiRegisterBus::new(spi), Some(reset), delay);
//! let mut session = TransmitSession::new(radio, encoder, BoardConfig::default());
//! session.initialize()?;
//! let outcome = session.send(false, "1542350", "HACK THE PLANET")?;
//! ```
//!
//! The encoder is any [`PagingEncoder`]; this crate does not implement POCSAG
//! framing itself.
//!
//! ## Integration Notes
//!
//! - Transmitting on the default 439.9875 MHz channel requires an amateur radio licence
//! - The FIFO loop busy-polls the status register; do not share the SPI bus with
//!   other devices for the duration of a send
//! - Interrupt callbacks must only use [`InterruptMonitor::on_rising_edge`], never the bus
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

pub use critical_section;

#[macro_use]
mod fmt;

pub mod bus;
pub mod config;
pub mod consts;
pub mod controller;
pub mod error;
pub mod fifo;
pub mod irq;
pub mod modem;
pub mod registers;
pub mod session;

pub use bus::{RegisterBus, SpiRegisterBus};
pub use config::BoardConfig;
pub use controller::TransceiverController;
pub use error::{ConfigurationFailure, Error, TransmitOutcome};
pub use fifo::{FifoStreamer, StreamState};
pub use irq::{InterruptMonitor, IrqEvent};
pub use modem::ModemConfig;
pub use registers::{IrqFlags, OperatingMode, Register};
pub use session::{PageEntry, PagingEncoder, TransmitSession};
