// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use super::{USB2642_CONFIG_EEPROM_WRITE, USB2642_SCSI_OPCODE};

/// Size of the USB2642 configuration block stored in the external EEPROM.
pub const CONFIG_EEPROM_LEN: usize = 384;

/// Selector in byte 2 addressing the configuration EEPROM.
const CONFIG_EEPROM_TARGET: u8 = 0x04;

/// Build a 16-byte **USB2642 CONFIG EEPROM WRITE** CDB.
///
/// The 384-byte image travels at offset 0 of the 512-byte data phase;
/// bytes 3..15 are zero.
#[inline]
pub fn build_config_eeprom_write(cdb: &mut [u8; 16]) {
    cdb.fill(0);
    cdb[0] = USB2642_SCSI_OPCODE;
    cdb[1] = USB2642_CONFIG_EEPROM_WRITE;
    cdb[2] = CONFIG_EEPROM_TARGET;
}
