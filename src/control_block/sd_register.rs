// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

use super::{USB2642_SCSI_OPCODE, USB2642_SD_REGISTER_READ};

/// Card registers the bridge can fetch on behalf of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdRegister {
    Csd,
    Cid,
    Scr,
}

impl SdRegister {
    /// SD command that reads this register (CMD9, CMD10, ACMD51).
    pub const fn command_index(self) -> u8 {
        match self {
            SdRegister::Csd => 9,
            SdRegister::Cid => 10,
            SdRegister::Scr => 51,
        }
    }

    /// Register width in bytes.
    pub const fn len(self) -> usize {
        match self {
            SdRegister::Csd | SdRegister::Cid => 16,
            SdRegister::Scr => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SdRegister::Csd => "CSD",
            SdRegister::Cid => "CID",
            SdRegister::Scr => "SCR",
        }
    }

    pub fn from_command_index(idx: u8) -> Option<Self> {
        match idx {
            9 => Some(SdRegister::Csd),
            10 => Some(SdRegister::Cid),
            51 => Some(SdRegister::Scr),
            _ => None,
        }
    }
}

impl fmt::Display for SdRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build a 16-byte **USB2642 SD REGISTER READ** CDB.
///
/// Layout:
/// - byte 0     : OPERATION CODE = 0xCF
/// - byte 1     : vendor action = 0x31
/// - byte 2     : SD command index of the register
/// - byte 3     : reserved
/// - bytes 4..5 : register length in bytes (big-endian)
#[inline]
pub fn build_sd_register_read(cdb: &mut [u8; 16], reg: SdRegister) {
    cdb.fill(0);
    cdb[0] = USB2642_SCSI_OPCODE;
    cdb[1] = USB2642_SD_REGISTER_READ;
    cdb[2] = reg.command_index();
    cdb[4..6].copy_from_slice(&(reg.len() as u16).to_be_bytes());
}
