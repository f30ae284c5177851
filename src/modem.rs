//! FSK modem parameters and their register encodings.
//!
//! All values are derived from the 32 MHz crystal:
//!
//! | Register pair | Formula |
//! |---------------|---------|
//! | bit rate      | `round(FXOSC / bps)` |
//! | deviation     | `round(fdev_hz / FSTEP)` |
//! | carrier       | `round(carrier_hz / FSTEP)`, 24 bits |
//!
//! where `FSTEP = FXOSC / 2^19`.

use libm::round;

use crate::consts::{FSTEP_HZ, FXOSC_HZ};
use crate::registers::Register;

/// POCSAG bit rate in bits per second.
pub const POCSAG_BITRATE_BPS: u32 = 1_200;

/// POCSAG frequency deviation in Hz.
pub const POCSAG_DEVIATION_HZ: u32 = 4_500;

/// UK amateur paging channel. Transmitting here requires an amateur licence.
pub const POCSAG_CARRIER_HZ: u32 = 439_987_500;

/// Largest value the 24-bit `RegFrf` can hold.
pub const FRF_MAX: u32 = 0x00ff_ffff;

/// Physical-layer settings for one transmission.
///
/// The preamble is normally zero: the paging encoder emits its own.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ModemConfig {
    /// Bit rate in bits per second.
    pub bitrate_bps: u32,
    /// Frequency deviation in Hz.
    pub deviation_hz: u32,
    /// Chip-generated preamble length in bytes.
    pub preamble_len: u16,
    /// Carrier frequency in Hz.
    pub carrier_hz: u32,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self::pocsag()
    }
}

impl ModemConfig {
    /// 1200 bps POCSAG on 439.9875 MHz with 4.5 kHz deviation and no chip preamble.
    pub const fn pocsag() -> Self {
        Self {
            bitrate_bps: POCSAG_BITRATE_BPS,
            deviation_hz: POCSAG_DEVIATION_HZ,
            preamble_len: 0,
            carrier_hz: POCSAG_CARRIER_HZ,
        }
    }

    /// Value for `RegBitrateMsb:Lsb`.
    pub fn bitrate_register(&self) -> u16 {
        round(FXOSC_HZ as f64 / self.bitrate_bps as f64) as u16
    }

    /// Value for `RegFdevMsb:Lsb`.
    pub fn deviation_register(&self) -> u16 {
        round(self.deviation_hz as f64 / FSTEP_HZ) as u16
    }

    /// Value for `RegFrfMsb:Mid:Lsb`.
    pub fn frf(&self) -> u32 {
        frf_for(self.carrier_hz)
    }

    /// The register writes for this configuration in programming order.
    ///
    /// Bit rate, deviation, preamble, then carrier, each most significant byte first.
    pub fn register_values(&self) -> [(Register, u8); 9] {
        let [bitrate_msb, bitrate_lsb] = self.bitrate_register().to_be_bytes();
        let [fdev_msb, fdev_lsb] = self.deviation_register().to_be_bytes();
        let [preamble_msb, preamble_lsb] = self.preamble_len.to_be_bytes();
        let [frf_msb, frf_mid, frf_lsb] = frf_bytes(self.frf());
        [
            (Register::BitrateMsb, bitrate_msb),
            (Register::BitrateLsb, bitrate_lsb),
            (Register::FdevMsb, fdev_msb),
            (Register::FdevLsb, fdev_lsb),
            (Register::PreambleMsb, preamble_msb),
            (Register::PreambleLsb, preamble_lsb),
            (Register::FrfMsb, frf_msb),
            (Register::FrfMid, frf_mid),
            (Register::FrfLsb, frf_lsb),
        ]
    }
}

/// Computes `RegFrf` for a carrier frequency, rounding to the nearest step.
///
/// Saturates at [`FRF_MAX`].
pub fn frf_for(carrier_hz: u32) -> u32 {
    let frf = round(carrier_hz as f64 / FSTEP_HZ) as u32;
    frf.min(FRF_MAX)
}

/// Splits a 24-bit `RegFrf` value into `[msb, mid, lsb]`.
pub const fn frf_bytes(frf: u32) -> [u8; 3] {
    [(frf >> 16) as u8, (frf >> 8) as u8, frf as u8]
}
