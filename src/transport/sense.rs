// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

/// Sense data must be ≥ 14 bytes to carry ASC/ASCQ in fixed format.
pub const FIXED_MIN_LEN: usize = 14;

/// SPC-4 Table 43 — the part of fixed-format sense data the bridge fills in.
#[derive(Default, PartialEq, Clone, Copy)]
pub struct SenseSummary {
    pub valid: bool,       // bit7 of byte0
    pub response_code: u8, // low-7 bits of byte0
    pub sense_key: u8,     // low-4 bits of byte2
    pub information: u32,  // bytes 3-6
    pub asc: u8,           // Additional Sense Code
    pub ascq: u8,          // Additional Sense Code Qualifier
}

impl SenseSummary {
    /// Parse *fixed-format* sense data (SPC-4 § 4.5.3).
    ///
    /// Returns `None` for descriptor-format data or when the device wrote
    /// less than [`FIXED_MIN_LEN`] bytes.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < FIXED_MIN_LEN {
            return None;
        }
        let response_code = buf[0] & 0x7F;
        if !matches!(response_code, 0x70 | 0x71) {
            return None;
        }

        Some(Self {
            valid: buf[0] & 0x80 != 0,
            response_code,
            sense_key: buf[2] & 0x0F,
            information: u32::from_be_bytes([buf[3], buf[4], buf[5], buf[6]]),
            asc: buf[12],
            ascq: buf[13],
        })
    }

    /// Suffix for error messages; empty when nothing useful was returned.
    pub fn describe(buf: &[u8]) -> String {
        match Self::parse(buf) {
            Some(s) => format!(
                " (sense key {:#x}, asc {:#04x}, ascq {:#04x}: {})",
                s.sense_key,
                s.asc,
                s.ascq,
                asc_ascq_to_str(s.asc, s.ascq)
            ),
            None if buf.is_empty() => String::new(),
            None => format!(" (raw sense {})", hex::encode(buf)),
        }
    }
}

impl fmt::Debug for SenseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenseSummary")
            .field("valid", &self.valid)
            .field(
                "response_code",
                &format_args!("{:#04x}", self.response_code),
            )
            .field("sense_key", &format_args!("{:#x}", self.sense_key))
            .field("information", &self.information)
            .field("asc", &format_args!("{:#04x}", self.asc))
            .field("ascq", &format_args!("{:#04x}", self.ascq))
            .field("description", &asc_ascq_to_str(self.asc, self.ascq))
            .finish()
    }
}

/// Return the SPC-4 description for a given ASC/ASCQ pair.
///
/// The bridge only ever reports a handful of codes for vendor commands, so
/// the table is short. Unknown pairs map to `"vendor specific"`.
#[inline]
pub fn asc_ascq_to_str(asc: u8, ascq: u8) -> &'static str {
    hot_table(asc, ascq).unwrap_or("vendor specific")
}

fn hot_table(asc: u8, ascq: u8) -> Option<&'static str> {
    Some(match (asc, ascq) {
        (0x00, 0x00) => "no additional sense information",
        (0x04, 0x01) => "logical unit is in process of becoming ready",
        (0x20, 0x00) => "invalid command operation code",
        (0x24, 0x00) => "invalid field in CDB",
        (0x25, 0x00) => "logical unit not supported",
        (0x28, 0x00) => "not ready to ready change, medium may have changed",
        (0x29, 0x00) => "power on, reset, or bus device reset occurred",
        (0x3A, 0x00) => "medium not present",
        (0x44, 0x00) => "internal target failure",
        _ => return None,
    })
}
