// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U16},
};

use super::{
    MAX_DATA_PHASE, MAX_INLINE_PAYLOAD, USB2642_I2C_WRITE_STREAM,
    USB2642_SCSI_OPCODE, slave_write_addr,
};
use crate::error::{MuxError, Result};

/// Build a 16-byte **USB2642 I²C WRITE** CDB.
///
/// Parameters:
/// - `cdb`      : output buffer (zeroed, all 16 bytes used)
/// - `addr`     : 7-bit slave address
/// - `data_len` : number of bytes sent in the data phase (max 512)
///
/// Layout:
/// - byte 0      : OPERATION CODE = 0xCF
/// - byte 1      : vendor action = 0x23
/// - byte 2      : slave address << 1 (write)
/// - byte 3      : unused
/// - bytes 4..5  : data phase length (big-endian)
/// - byte 6      : command phase length, always 0
/// - bytes 7..15 : command phase payload, unused
#[inline]
pub fn build_i2c_write(cdb: &mut [u8; 16], addr: u8, data_len: usize) -> Result<()> {
    if data_len > MAX_DATA_PHASE {
        return Err(MuxError::frame_length("I2C write payload", data_len, MAX_DATA_PHASE));
    }
    cdb.fill(0);
    cdb[0] = USB2642_SCSI_OPCODE;
    cdb[1] = USB2642_I2C_WRITE_STREAM;
    cdb[2] = slave_write_addr(addr);
    cdb[4..6].copy_from_slice(&(data_len as u16).to_be_bytes());
    // cdb[6] = command phase length (0), payload stays zero
    Ok(())
}

/// Typed view over an I²C WRITE CDB.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, PartialEq, Eq)]
pub struct I2cWriteCdb {
    pub opcode: u8,
    pub action: u8,
    pub slave_addr: u8,
    pub unused: u8,
    pub data_phase_len: U16<BigEndian>,
    pub command_phase_len: u8,
    pub command_payload: [u8; MAX_INLINE_PAYLOAD],
}

impl I2cWriteCdb {
    pub fn from_cdb(cdb: &[u8; 16]) -> &Self {
        // size is checked at compile time by the const below
        match Self::ref_from_bytes(cdb) {
            Ok(view) => view,
            Err(_) => unreachable!("I2cWriteCdb is 16 bytes with alignment 1"),
        }
    }
}

const _: () = assert!(std::mem::size_of::<I2cWriteCdb>() == 16);
