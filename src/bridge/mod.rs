// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! I²C over SCSI: the auxiliary and configuration buses of the USB2642.

use tracing::debug;

use crate::{
    control_block::{
        MAX_DATA_PHASE,
        eeprom_write::{CONFIG_EEPROM_LEN, build_config_eeprom_write},
        i2c_write::build_i2c_write,
        i2c_write_read::build_i2c_write_read,
        sd_register::{SdRegister, build_sd_register_read},
    },
    error::{MuxError, Result},
    transport::{DATA_LEN, DxferDirection, ScsiTransport},
};

/// Talks to I²C slaves behind a USB2642 by wrapping each transaction into a
/// vendor CDB.
#[derive(Debug)]
pub struct Usb2642I2c<T> {
    transport: T,
}

impl<T: ScsiTransport> Usb2642I2c<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Write up to 512 bytes to the slave at 7-bit address `addr`.
    pub fn write(&mut self, addr: u8, payload: &[u8]) -> Result<()> {
        let mut cdb = [0u8; 16];
        build_i2c_write(&mut cdb, addr, payload.len())?;

        let mut data = [0u8; DATA_LEN];
        data[..payload.len()].copy_from_slice(payload);

        debug!(addr = format_args!("{addr:#04x}"), data = %hex::encode(payload), "i2c write");
        self.transport
            .submit(&cdb, DxferDirection::ToDevice, &mut data)?;
        Ok(())
    }

    /// Write up to 9 bytes, then read `read_len` bytes back.
    pub fn write_read(&mut self, addr: u8, payload: &[u8], read_len: usize) -> Result<Vec<u8>> {
        let mut cdb = [0u8; 16];
        build_i2c_write_read(&mut cdb, addr, payload, read_len)?;

        let mut data = [0u8; DATA_LEN];
        self.transport
            .submit(&cdb, DxferDirection::FromDevice, &mut data)?;

        let out = data[..read_len].to_vec();
        debug!(
            addr = format_args!("{addr:#04x}"),
            wrote = %hex::encode(payload),
            read = %hex::encode(&out),
            "i2c write-read"
        );
        Ok(out)
    }

    /// Program the 384-byte configuration block of the bridge.
    pub fn write_config_eeprom(&mut self, image: &[u8]) -> Result<()> {
        if image.len() != CONFIG_EEPROM_LEN {
            return Err(MuxError::frame_length(
                "configuration EEPROM image",
                image.len(),
                CONFIG_EEPROM_LEN,
            ));
        }
        let mut cdb = [0u8; 16];
        build_config_eeprom_write(&mut cdb);

        let mut data = [0u8; DATA_LEN];
        data[..CONFIG_EEPROM_LEN].copy_from_slice(image);

        debug!("writing configuration EEPROM");
        self.transport
            .submit(&cdb, DxferDirection::ToDevice, &mut data)?;
        Ok(())
    }

    /// Fetch a card register and return it as lowercase hex.
    pub fn read_sd_register(&mut self, reg: SdRegister) -> Result<String> {
        let mut cdb = [0u8; 16];
        build_sd_register_read(&mut cdb, reg);

        let mut data = [0u8; DATA_LEN];
        self.transport
            .submit(&cdb, DxferDirection::FromDevice, &mut data)?;

        let raw = hex::encode(&data[..reg.len().min(MAX_DATA_PHASE)]);
        debug!(%reg, %raw, "read card register");
        Ok(raw)
    }
}
