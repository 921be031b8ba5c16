// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Configuration EEPROM of the USB2642 (card reader and hub settings).

use std::{thread, time::Duration};

use tracing::{debug, info};
use zerocopy::{
    FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout,
    byteorder::{LittleEndian, U16},
};

use crate::{
    bridge::Usb2642I2c,
    control_block::eeprom_write::CONFIG_EEPROM_LEN,
    error::{MuxError, Result},
    transport::ScsiTransport,
};

/// USB descriptor type of a string descriptor.
const STRING_DESCRIPTOR: u8 = 0x03;

/// Identity strings and IDs programmed into a fresh board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbIdentity {
    pub serial: String,
    pub vid: u16,
    pub pid: u16,
    pub product: String,
    pub manufacturer: String,
    pub scsi_manufacturer: String,
    pub scsi_product: String,
}

impl Default for UsbIdentity {
    fn default() -> Self {
        Self {
            serial: String::new(),
            vid: 0x0424,
            pid: 0x4041,
            product: "usb-sd-mux_rev1".to_string(),
            manufacturer: "Pengutronix".to_string(),
            scsi_manufacturer: "PTX".to_string(),
            scsi_product: "sdmux".to_string(),
        }
    }
}

/// Raw 384-byte configuration block, field offsets as in the USB2642
/// datasheet. Multi-byte IDs are little-endian.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, PartialEq, Eq)]
pub struct EepromImage {
    // Flash media controller
    /// 0x00 USB serial number (string descriptor)
    pub usb_ser_num: [u8; 26],
    /// 0x1A
    pub usb_vid: U16<LittleEndian>,
    /// 0x1C
    pub usb_pid: U16<LittleEndian>,
    /// 0x1E language ID, byte order as found on shipped boards
    pub usb_lang_id: [u8; 4],
    /// 0x22 manufacturer (string descriptor)
    pub usb_mfr_str: [u8; 60],
    /// 0x5E product (string descriptor)
    pub usb_prd_str: [u8; 60],
    /// 0x9A bmAttributes
    pub usb_bm_att: u8,
    /// 0x9B bMaxPower, 2 mA units
    pub usb_max_pwr: u8,
    pub att_lb: u8,
    pub att_hlb: u8,
    pub att_lhb: u8,
    pub att_hb: u8,
    pub reserved0: [u8; 4],
    /// 0xA4
    pub lun_pwr_lb: u8,
    pub lun_pwr_hb: u8,
    pub reserved1: [u8; 25],
    /// 0xBF card reader identifier
    pub dev3_id_str: [u8; 7],
    /// 0xC6 SCSI INQUIRY vendor
    pub inq_ven_str: [u8; 8],
    /// 0xCE SCSI INQUIRY product
    pub inq_prd_str: [u8; 5],
    /// 0xD3
    pub dyn_num_lun: u8,
    pub lun_dev_map: [u8; 4],
    pub reserved2: [u8; 3],

    // Hub controller
    /// 0xDB
    pub sd_mmc_bus_timing: [u8; 3],
    /// 0xDE hub vendor ID
    pub vid: U16<LittleEndian>,
    pub pid: U16<LittleEndian>,
    pub did: U16<LittleEndian>,
    /// 0xE4
    pub cfg_dat_byte1: u8,
    pub cfg_dat_byte2: u8,
    pub cfg_dat_byte3: u8,
    pub nr_device: u8,
    pub port_dis_sp: u8,
    pub port_dis_bp: u8,
    pub max_pwr_sp: u8,
    pub max_pwr_bp: u8,
    pub hc_max_c_sp: u8,
    pub hc_max_c_bp: u8,
    pub pwr_on_time: u8,
    pub boost_up: u8,
    pub boost_32: u8,
    pub prt_swp: u8,
    pub prtm12: u8,
    pub prtm3: u8,

    // Other
    /// 0xF4
    pub sd_clk_lim: u8,
    pub reserved3: u8,
    pub media_settings: u8,
    pub reserved4: [u8; 5],
    /// 0xFC
    pub nvstore_sig: [u8; 4],

    // Non-volatile storage 2
    /// 0x100 LUN 0..4 identifier strings
    pub clun_id_str: [[u8; 7]; 5],
    pub reserved5: [u8; 35],
    /// 0x146
    pub dyn_num_ext_lun: u8,
    pub lun_dev_map2: [u8; 5],
    pub reserved6: [u8; 48],
    /// 0x17C
    pub nvstore_sig2: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<EepromImage>() == CONFIG_EEPROM_LEN);

/// USB string descriptor `[bLength, 0x03, UTF-16LE...]`, cropped to `N`
/// bytes and padded with 0xFF.
fn string_descriptor<const N: usize>(text: &str) -> [u8; N] {
    let mut out = [0xFFu8; N];
    let mut len = 2;
    for unit in text.encode_utf16() {
        if len + 2 > N {
            break;
        }
        out[len..len + 2].copy_from_slice(&unit.to_le_bytes());
        len += 2;
    }
    out[0] = len.min(u8::MAX as usize) as u8;
    out[1] = STRING_DESCRIPTOR;
    out
}

/// 8-bit string, cropped to `N` bytes and padded with `pad`.
fn ascii_field<const N: usize>(text: &str, pad: u8) -> [u8; N] {
    let mut out = [pad; N];
    let n = text.len().min(N);
    out[..n].copy_from_slice(&text.as_bytes()[..n]);
    out
}

fn padded<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = bytes.len().min(N);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

impl EepromImage {
    /// Factory configuration for an USB-SD-Mux with the given identity.
    pub fn new(id: &UsbIdentity) -> Self {
        let mut img = Self::new_zeroed();

        img.usb_ser_num = string_descriptor(&id.serial);
        img.usb_vid = U16::new(id.vid);
        img.usb_pid = U16::new(id.pid);
        img.usb_lang_id = [0x04, 0x03, 0x09, 0x04];
        img.usb_mfr_str = string_descriptor(&id.manufacturer);
        img.usb_prd_str = string_descriptor(&id.product);
        img.usb_bm_att = 0x80; // bus powered, no remote wakeup
        img.usb_max_pwr = 0x30; // 96 mA
        img.att_lb = 0x50; // use INQUIRY strings, write protect follows SW_nWP
        img.att_hlb = 0x80;
        img.lun_pwr_hb = 0x0A;
        img.dev3_id_str = ascii_field("SD/MMC", 0x00);
        img.inq_ven_str = ascii_field(&id.scsi_manufacturer, 0x00);
        img.inq_prd_str = ascii_field(&id.scsi_product, 0x00);
        img.dyn_num_lun = 0x01;
        img.lun_dev_map = padded(&[0xFF]);

        img.sd_mmc_bus_timing = [0x59, 0x56, 0x97];
        img.vid = U16::new(0x0424);
        img.pid = U16::new(0x2640);
        img.did = U16::new(0x08A2);
        img.cfg_dat_byte1 = 0x8B;
        img.cfg_dat_byte2 = 0x28;
        img.nr_device = 0x02;
        // unused downstream ports of the hub
        img.port_dis_sp = 0x0C;
        img.port_dis_bp = 0x0C;
        img.max_pwr_sp = 0x01;
        img.max_pwr_bp = 0x32;
        img.hc_max_c_sp = 0x01;
        img.hc_max_c_bp = 0x32;
        img.pwr_on_time = 0x32;

        // lower case, contrary to the datasheet's "ATA2"
        img.nvstore_sig = *b"ata2";
        img.clun_id_str = [ascii_field("COMBO", 0x00); 5];
        img.lun_dev_map2 = padded(&[0xFF, 0xFF, 0xFF, 0xFF]);
        img.nvstore_sig2 = *b"ecf1";
        img
    }

    /// Send the image through the bridge's EEPROM write command.
    pub fn write_image<T: ScsiTransport>(&self, bus: &mut Usb2642I2c<T>) -> Result<()> {
        info!(
            vid = self.usb_vid.get(),
            pid = self.usb_pid.get(),
            "writing configuration EEPROM"
        );
        bus.write_config_eeprom(self.as_bytes())
    }
}

/// Page size of the 24xx02 style EEPROM on the aux bus.
pub const EEPROM_PAGE: usize = 16;
/// Write cycle time allowance after each page.
pub const PAGE_SETTLE: Duration = Duration::from_millis(100);
/// Default 7-bit address of the EEPROM.
pub const EEPROM_ADDR: u8 = 0x50;

/// Byte addressed I²C EEPROM reached through the bridge.
#[derive(Debug)]
pub struct I2cEeprom<T> {
    bus: Usb2642I2c<T>,
    addr: u8,
    settle: Duration,
}

impl<T: ScsiTransport> I2cEeprom<T> {
    pub fn new(bus: Usb2642I2c<T>) -> Self {
        Self {
            bus,
            addr: EEPROM_ADDR,
            settle: PAGE_SETTLE,
        }
    }

    pub fn with_address(mut self, addr: u8) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn into_bus(self) -> Usb2642I2c<T> {
        self.bus
    }

    pub fn read(&mut self, offset: u8, len: usize) -> Result<Vec<u8>> {
        self.bus.write_read(self.addr, &[offset], len)
    }

    /// Write `data` at `offset`, one transaction per page touched.
    pub fn write(&mut self, offset: u8, data: &[u8]) -> Result<()> {
        let end = usize::from(offset) + data.len();
        if end > 256 {
            return Err(MuxError::frame_length("EEPROM write", end, 256));
        }
        let mut pos = usize::from(offset);
        let mut rest = data;
        while !rest.is_empty() {
            let room = EEPROM_PAGE - pos % EEPROM_PAGE;
            let (chunk, tail) = rest.split_at(room.min(rest.len()));

            let mut frame = Vec::with_capacity(chunk.len() + 1);
            frame.push(pos as u8);
            frame.extend_from_slice(chunk);
            debug!(offset = pos, len = chunk.len(), "EEPROM page write");
            self.bus.write(self.addr, &frame)?;
            thread::sleep(self.settle);

            pos += chunk.len();
            rest = tail;
        }
        Ok(())
    }
}
