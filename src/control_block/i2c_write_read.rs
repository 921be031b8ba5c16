// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout,
    byteorder::{BigEndian, U16},
};

use super::{
    MAX_DATA_PHASE, MAX_INLINE_PAYLOAD, USB2642_I2C_WRITE_READ_STREAM,
    USB2642_SCSI_OPCODE, slave_read_addr, slave_write_addr,
};
use crate::error::{MuxError, Result};

/// Build a 16-byte **USB2642 I²C WRITE-READ** CDB.
///
/// The bridge first writes `payload` to the slave, then issues a repeated
/// start and reads `read_len` bytes into the data phase.
///
/// Layout:
/// - byte 0      : OPERATION CODE = 0xCF
/// - byte 1      : vendor action = 0x22
/// - byte 2      : slave address << 1 (write)
/// - byte 3      : slave address << 1 | 1 (read)
/// - bytes 4..5  : read phase length (big-endian, max 512)
/// - byte 6      : write phase length (max 9)
/// - bytes 7..15 : write payload, zero padded
#[inline]
pub fn build_i2c_write_read(
    cdb: &mut [u8; 16],
    addr: u8,
    payload: &[u8],
    read_len: usize,
) -> Result<()> {
    if payload.len() > MAX_INLINE_PAYLOAD {
        return Err(MuxError::frame_length(
            "I2C write-read command payload",
            payload.len(),
            MAX_INLINE_PAYLOAD,
        ));
    }
    if read_len > MAX_DATA_PHASE {
        return Err(MuxError::frame_length("I2C read length", read_len, MAX_DATA_PHASE));
    }
    cdb.fill(0);
    cdb[0] = USB2642_SCSI_OPCODE;
    cdb[1] = USB2642_I2C_WRITE_READ_STREAM;
    cdb[2] = slave_write_addr(addr);
    cdb[3] = slave_read_addr(addr);
    cdb[4..6].copy_from_slice(&(read_len as u16).to_be_bytes());
    cdb[6] = payload.len() as u8;
    cdb[7..7 + payload.len()].copy_from_slice(payload);
    Ok(())
}

/// Typed view over an I²C WRITE-READ CDB.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, PartialEq, Eq)]
pub struct I2cWriteReadCdb {
    pub opcode: u8,
    pub action: u8,
    pub write_slave_addr: u8,
    pub read_slave_addr: u8,
    pub read_phase_len: U16<BigEndian>,
    pub write_phase_len: u8,
    pub write_payload: [u8; MAX_INLINE_PAYLOAD],
}

impl I2cWriteReadCdb {
    pub fn from_cdb(cdb: &[u8; 16]) -> &Self {
        match Self::ref_from_bytes(cdb) {
            Ok(view) => view,
            Err(_) => unreachable!("I2cWriteReadCdb is 16 bytes with alignment 1"),
        }
    }

    /// The meaningful prefix of the inline payload.
    pub fn payload(&self) -> &[u8] {
        let n = usize::from(self.write_phase_len).min(MAX_INLINE_PAYLOAD);
        &self.write_payload[..n]
    }
}

const _: () = assert!(std::mem::size_of::<I2cWriteReadCdb>() == 16);
