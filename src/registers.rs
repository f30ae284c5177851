//! SX127x FSK register map, operating modes and IRQ flags.
//!
//! Only the registers this driver touches are listed. Addresses are the 7-bit
//! identities from the datasheet; the write marker is added by the bus adapter.

use bitflags::bitflags;

/// A register on the FSK/OOK page of the SX127x.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// FIFO data input/output.
    Fifo = 0x00,
    /// Operating mode and modulation family.
    OpMode = 0x01,
    /// Bit rate divider, high byte.
    BitrateMsb = 0x02,
    /// Bit rate divider, low byte.
    BitrateLsb = 0x03,
    /// Frequency deviation, high byte.
    FdevMsb = 0x04,
    /// Frequency deviation, low byte.
    FdevLsb = 0x05,
    /// Carrier frequency, bits 23..16.
    FrfMsb = 0x06,
    /// Carrier frequency, bits 15..8.
    FrfMid = 0x07,
    /// Carrier frequency, bits 7..0.
    FrfLsb = 0x08,
    /// FIFO read/write pointer.
    FifoAddrPtr = 0x0d,
    /// Preamble length, high byte.
    PreambleMsb = 0x25,
    /// Preamble length, low byte.
    PreambleLsb = 0x26,
    /// Sync word and auto-restart configuration.
    SyncConfig = 0x27,
    /// FIFO threshold and transmit start condition.
    FifoThresh = 0x35,
    /// FIFO and packet status flags.
    IrqFlags2 = 0x3f,
    /// Silicon revision.
    Version = 0x42,
}

impl Register {
    /// The 7-bit register address.
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Address byte for a read transaction.
    pub const fn read_address(self) -> u8 {
        self.addr() & crate::consts::ADDRESS_MASK
    }

    /// Address byte for a write transaction.
    pub const fn write_address(self) -> u8 {
        self.addr() | crate::consts::WRITE_MASK
    }
}

/// Operating mode of the transceiver as written to `RegOpMode`.
///
/// All modes keep `LongRangeMode` cleared so the chip stays in FSK.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum OperatingMode {
    /// Sleep with the low-frequency front end selected. The modulation
    /// family can only change while the chip sleeps.
    Sleep,
    /// Crystal running, ready for configuration.
    Standby,
    /// FSK receiver on. Used here only to flush the FIFO.
    FskReceive,
    /// FSK transmitter on, draining the FIFO.
    FskTransmit,
}

impl OperatingMode {
    /// The `RegOpMode` value for this mode.
    pub const fn bits(self) -> u8 {
        match self {
            OperatingMode::Sleep => 0x08,
            OperatingMode::Standby => 0x01,
            OperatingMode::FskReceive => 0x05,
            OperatingMode::FskTransmit => 0x03,
        }
    }

    /// Decodes a value read back from `RegOpMode`.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x08 => Some(OperatingMode::Sleep),
            0x01 => Some(OperatingMode::Standby),
            0x05 => Some(OperatingMode::FskReceive),
            0x03 => Some(OperatingMode::FskTransmit),
            _ => None,
        }
    }

    /// Whether a write of this mode must be confirmed by reading it back.
    ///
    /// The chip powers up in LoRa mode (`0x80`) and silently keeps it if the
    /// switch to FSK sleep does not take.
    pub const fn needs_verification(self) -> bool {
        matches!(self, OperatingMode::Sleep)
    }
}

bitflags! {
    /// Snapshot of `RegIrqFlags2`.
    #[derive(PartialEq, Eq, Clone, Copy, Debug)]
    pub struct IrqFlags: u8 {
        /// FIFO holds 64 bytes.
        const FIFO_FULL = 1 << 7;
        /// FIFO holds no bytes.
        const FIFO_EMPTY = 1 << 6;
        /// FIFO level is above the programmed threshold.
        const FIFO_LEVEL = 1 << 5;
        /// FIFO overran; its contents are lost.
        const FIFO_OVERRUN = 1 << 4;
        /// The last bit of the packet has left the modulator.
        const PACKET_SENT = 1 << 3;
        /// Receive payload ready.
        const PAYLOAD_READY = 1 << 2;
        /// Receive CRC passed.
        const CRC_OK = 1 << 1;
        /// Supply below the low battery threshold.
        const LOW_BAT = 1;
    }
}

impl IrqFlags {
    /// The FIFO overran.
    pub fn overrun(self) -> bool {
        self.contains(IrqFlags::FIFO_OVERRUN)
    }

    /// The FIFO cannot take another chunk yet.
    pub fn blocks_loading(self) -> bool {
        self.intersects(IrqFlags::FIFO_FULL | IrqFlags::FIFO_LEVEL)
    }

    /// Everything queued has been sent.
    pub fn drained(self) -> bool {
        self.intersects(IrqFlags::FIFO_EMPTY | IrqFlags::PACKET_SENT)
    }
}

#[cfg(feature = "defmt-0-3")]
impl defmt::Format for IrqFlags {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "IrqFlags({=u8:#x})", self.bits())
    }
}
