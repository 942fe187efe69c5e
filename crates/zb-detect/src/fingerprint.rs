//! Identification frames and reply recognizers
//!
//! Each supported adapter family has one fixed frame that any firmware of
//! that family answers with a fixed-shape reply. Nothing beyond recognizing
//! that reply is implemented here.
//!
//! # EZSP (ASH framing)
//! ```text
//! -> 1A C0 38 BC 7E           CANCEL, RST, CRC, FLAG
//! <- C1 02 [code] [crc] 7E    RSTACK version 2, reset code, CRC, FLAG
//! ```
//!
//! Inside a frame the reserved bytes 7E 7D 11 13 18 1A are sent as
//! `7D [byte ^ 0x20]`.
//!
//! # Z-Stack (MT framing)
//! ```text
//! -> EF                       skip serial bootloader
//! -> FE 00 21 01 20           SOF, len 0, SYS_PING, FCS
//! <- FE 02 61 01 [lo] [hi] [fcs]
//! ```

use crate::adapter::AdapterKind;

/// ASH cancel byte followed by an RST frame
pub const ASH_RESET: [u8; 5] = [0x1A, 0xC0, 0x38, 0xBC, 0x7E];
/// ASH frame delimiter
pub const ASH_FLAG: u8 = 0x7E;
/// ASH RSTACK control byte
pub const ASH_RSTACK: u8 = 0xC1;
/// ASH protocol version carried in RSTACK
pub const ASH_VERSION: u8 = 0x02;
/// ASH escape byte; the next byte is XORed with 0x20
pub const ASH_ESCAPE: u8 = 0x7D;
/// ASH cancel byte, discards the frame in progress
pub const ASH_CANCEL: u8 = 0x1A;
/// ASH substitute byte, marks the frame in progress as corrupt
pub const ASH_SUBSTITUTE: u8 = 0x18;
const ASH_XON: u8 = 0x11;
const ASH_XOFF: u8 = 0x13;

/// Byte that makes CC26xx/CC13xx serial bootloaders jump to the application
pub const ZNP_SKIP_BOOTLOADER: u8 = 0xEF;
/// MT start-of-frame byte
pub const MT_SOF: u8 = 0xFE;
/// MT SYS_PING request
pub const ZNP_PING: [u8; 5] = [MT_SOF, 0x00, 0x21, 0x01, 0x20];

const MT_SYS_SRSP: u8 = 0x61;
const MT_SYS_PING: u8 = 0x01;

/// A family-specific identification exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fingerprint {
    Ash,
    ZnpPing,
}

impl Fingerprint {
    /// All fingerprints, in the order they are tried
    pub const ALL: [Fingerprint; 2] = [Fingerprint::Ash, Fingerprint::ZnpPing];

    /// Adapter family this fingerprint identifies
    pub fn kind(self) -> AdapterKind {
        match self {
            Self::Ash => AdapterKind::Ezsp,
            Self::ZnpPing => AdapterKind::Znp,
        }
    }

    /// Bytes to write
    pub fn request(self) -> Vec<u8> {
        match self {
            Self::Ash => ASH_RESET.to_vec(),
            Self::ZnpPing => {
                let mut frame = vec![ZNP_SKIP_BOOTLOADER];
                frame.extend_from_slice(&ZNP_PING);
                frame
            }
        }
    }

    /// Whether `reply` contains the expected answer
    pub fn matches(self, reply: &[u8]) -> bool {
        match self {
            Self::Ash => contains_rstack(reply),
            Self::ZnpPing => contains_ping_response(reply),
        }
    }
}

/// CRC-CCITT (poly 0x1021, init 0xFFFF) as used by ASH
pub fn ash_crc(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// XOR frame check sequence as used by MT
pub fn mt_fcs(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Split raw ASH bytes into complete frames with byte stuffing removed
///
/// Only frames terminated by a flag are returned. Cancelled, substituted
/// or badly escaped frames are dropped.
pub fn ash_frames(data: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut frame = Vec::new();
    let mut escaped = false;
    let mut corrupt = false;

    for &byte in data {
        match byte {
            ASH_FLAG => {
                if !escaped && !corrupt && !frame.is_empty() {
                    frames.push(std::mem::take(&mut frame));
                }
                frame.clear();
                escaped = false;
                corrupt = false;
            }
            ASH_CANCEL => {
                frame.clear();
                escaped = false;
                corrupt = false;
            }
            ASH_SUBSTITUTE => corrupt = true,
            ASH_XON | ASH_XOFF => {}
            ASH_ESCAPE => escaped = true,
            _ if escaped => {
                frame.push(byte ^ 0x20);
                escaped = false;
            }
            _ => frame.push(byte),
        }
    }

    frames
}

/// Look for an RSTACK frame among the ASH frames in `data`
///
/// Firmware often emits stray bytes or a leading flag after reset, so every
/// complete frame is checked, not just the first.
pub fn contains_rstack(data: &[u8]) -> bool {
    ash_frames(data).iter().any(|f| {
        f.len() == 5
            && f[0] == ASH_RSTACK
            && f[1] == ASH_VERSION
            && u16::from_be_bytes([f[3], f[4]]) == ash_crc(&f[..3])
    })
}

/// Scan for a SYS_PING response anywhere in `data`
pub fn contains_ping_response(data: &[u8]) -> bool {
    data.windows(7).any(|w| {
        w[0] == MT_SOF
            && w[1] == 0x02
            && w[2] == MT_SYS_SRSP
            && w[3] == MT_SYS_PING
            && w[6] == mt_fcs(&w[1..6])
    })
}
