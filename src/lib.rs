//! Control library for the USB-SD-Mux: SCSI generic transport, USB2642
//! I²C bridge, GPIO expanders and SD card register decoding.
// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// I²C transactions tunnelled through USB2642 vendor SCSI commands.
pub mod bridge;
/// Handles configuration, command-line parsing, and logging.
pub mod cfg;
/// Builders for the USB2642 vendor CDBs.
pub mod control_block;
/// Configuration EEPROM image and the aux bus EEPROM.
pub mod eeprom;
/// Error type shared across the crate.
pub mod error;
/// PCA9536 / TCA6408 GPIO expander driver.
pub mod gpio;
/// Mux revisions, mode switching and revision autodetection.
pub mod mux;
/// Decoders for the SD card CID, CSD and SCR registers.
pub mod sd_regs;
/// Lookups in the Linux sysfs tree around an sg device.
pub mod sysfs;
/// `SG_IO` transport and sense data helpers.
pub mod transport;
