// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::cfg::enums::GpioAction;

pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;

    Ok(canon)
}

/// Arguments of the `usbsdmux` binary.
#[derive(Debug, Parser)]
#[command(name = "usbsdmux", version)]
#[command(about = "Switch the SD card of an USB-SD-Mux between host and DUT", long_about = None)]
pub struct Args {
    /// Generic SCSI device of the mux, e.g. /dev/sg0.
    #[arg(value_name = "SG")]
    pub sg: PathBuf,

    #[command(subcommand)]
    pub command: Command,

    /// Print machine readable JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// YAML file with `runtime:` and `logger:` sections.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the current mode.
    Get,
    /// Switch the card to the device under test.
    #[command(alias = "client")]
    Dut,
    /// Switch the card to the host.
    Host,
    /// Disconnect the card from both sides.
    Off,
    /// Read or drive a user GPIO (USB-SD-Mux FAST only).
    Gpio {
        /// GPIO number, 0 or 1.
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        gpio: u8,
        /// low|0, high|1 or get.
        action: GpioAction,
    },
    /// Print the decoded SCR, CID and CSD of the card.
    Info,
}

/// Arguments of the `usbsdmux-configure` factory tool.
#[derive(Debug, Parser)]
#[command(name = "usbsdmux-configure", version)]
#[command(about = "Write the USB2642 configuration EEPROM of an USB-SD-Mux", long_about = None)]
pub struct ConfigureArgs {
    /// Generic SCSI device of the mux, e.g. /dev/sg0.
    #[arg(value_name = "SG")]
    pub sg: PathBuf,

    /// USB serial number to program.
    #[arg(value_name = "SERIAL")]
    pub serial: String,

    #[arg(long, default_value = "usb-sd-mux_rev1")]
    pub product_string: String,

    #[arg(long, default_value = "Pengutronix")]
    pub manufacturer_string: String,

    /// USB vendor ID (hex).
    #[arg(long, value_name = "HEX", default_value = "0x0424", value_parser = parse_hex_u16)]
    pub vid: u16,

    /// USB product ID (hex).
    #[arg(long, value_name = "HEX", default_value = "0x4041", value_parser = parse_hex_u16)]
    pub pid: u16,

    /// Vendor string of the SCSI INQUIRY data.
    #[arg(long, default_value = "PTX")]
    pub scsi_manufacturer: String,

    /// Product string of the SCSI INQUIRY data.
    #[arg(long, default_value = "sdmux")]
    pub scsi_product: String,

    /// YAML file with `runtime:` and `logger:` sections.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn parse_hex_u16(input: &str) -> Result<u16, String> {
    let trimmed = input.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(trimmed, 16).map_err(|err| err.to_string())
}
