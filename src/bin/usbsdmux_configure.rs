// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Factory tool: program the USB2642 configuration EEPROM of a fresh board.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use usbsdmux::{
    bridge::Usb2642I2c,
    cfg::{
        cli::{ConfigureArgs, resolve_config_path},
        config::Config,
        logger::{init_default_logger, verbosity_level},
    },
    eeprom::{EepromImage, UsbIdentity},
    transport::sg::SgTransport,
};

fn main() -> Result<()> {
    let args = ConfigureArgs::parse();
    init_default_logger(verbosity_level(args.verbose))?;

    let config = match args.config.as_deref() {
        Some(path) => resolve_config_path(path)
            .and_then(Config::load_from_file)
            .context("failed to resolve or load config")?,
        None => Config::default(),
    };

    let identity = UsbIdentity {
        serial: args.serial,
        vid: args.vid,
        pid: args.pid,
        product: args.product_string,
        manufacturer: args.manufacturer_string,
        scsi_manufacturer: args.scsi_manufacturer,
        scsi_product: args.scsi_product,
    };
    info!(?identity, sg = %args.sg.display(), "configuring USB-SD-Mux");

    let transport = SgTransport::new(&args.sg).with_timeout(config.runtime.command_timeout);
    let mut bus = Usb2642I2c::new(transport);
    EepromImage::new(&identity)
        .write_image(&mut bus)
        .with_context(|| format!("failed to write EEPROM of {}", args.sg.display()))?;

    println!("Write completed");
    Ok(())
}
