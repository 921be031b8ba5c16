// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Vendor CDBs understood by the Microchip USB2642 bridge.
//!
//! All of them share operation code `0xCF`; byte 1 selects the vendor
//! action. Each module offers a `build_*` filler writing into a 16-byte
//! buffer plus a zerocopy view used to inspect an already built CDB.

pub mod eeprom_write;
pub mod i2c_write;
pub mod i2c_write_read;
pub mod sd_register;

/// Vendor-specific SCSI operation code of the USB2642.
pub const USB2642_SCSI_OPCODE: u8 = 0xCF;
/// Vendor action: I²C write stream.
pub const USB2642_I2C_WRITE_STREAM: u8 = 0x23;
/// Vendor action: I²C write-then-read stream.
pub const USB2642_I2C_WRITE_READ_STREAM: u8 = 0x22;
/// Vendor action: write the configuration EEPROM.
pub const USB2642_CONFIG_EEPROM_WRITE: u8 = 0x54;
/// Vendor action: fetch a card register through the SD host controller.
pub const USB2642_SD_REGISTER_READ: u8 = 0x31;

/// Inline payload bytes available in bytes 7..15 of a CDB.
pub const MAX_INLINE_PAYLOAD: usize = 9;
/// Largest data phase the bridge accepts.
pub const MAX_DATA_PHASE: usize = crate::transport::DATA_LEN;

/// 7-bit I²C address to the on-wire write address (R/W bit clear).
#[inline]
pub fn slave_write_addr(addr: u8) -> u8 {
    addr.wrapping_shl(1)
}

/// 7-bit I²C address to the on-wire read address (R/W bit set).
#[inline]
pub fn slave_read_addr(addr: u8) -> u8 {
    slave_write_addr(addr) | 1
}
