// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use usbsdmux::cfg::{
    cli::{Args, Command, ConfigureArgs, parse_hex_u16, resolve_config_path},
    config::Config,
    enums::{GpioAction, LogOutput},
    logger::LoggerConfig,
};

use crate::unit_tests::common::TempTree;

#[test]
fn test_load_config_file() -> Result<()> {
    let cfg = resolve_config_path("tests/config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    assert_eq!(cfg.runtime.command_timeout, Duration::from_secs(5));
    assert_eq!(cfg.runtime.sysfs_root, PathBuf::from("/sys"));
    assert!(!cfg.runtime.disconnect_wait);
    Ok(())
}

#[test]
fn test_logger_section_of_the_same_file() -> Result<()> {
    let path = resolve_config_path("tests/config.yaml")?;
    let cfg = LoggerConfig::from_file(&path.to_string_lossy())?;
    assert_eq!(cfg.logger.level, "debug");
    assert_eq!(cfg.logger.output, LogOutput::Stderr);
    assert!(cfg.logger.is_show_line);
    assert!(cfg.logger.file.is_none());
    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() -> Result<()> {
    let tree = TempTree::new("config")?;

    let relative = tree.file("relative.yaml", "runtime:\n  sysfs_root: sys\n")?;
    assert!(Config::load_from_file(&relative).is_err());

    let zero = tree.file("zero.yaml", "runtime:\n  command_timeout: 0\n")?;
    assert!(Config::load_from_file(&zero).is_err());

    let empty = tree.file("empty.yaml", "{}\n")?;
    assert_eq!(Config::load_from_file(&empty)?, Config::default());
    Ok(())
}

#[test]
fn test_missing_config_file() {
    assert!(resolve_config_path("tests/does-not-exist.yaml").is_err());
}

#[test]
fn test_cli_parsing() -> Result<()> {
    let args = Args::try_parse_from(["usbsdmux", "/dev/sg1", "client"])?;
    assert_eq!(args.command, Command::Dut);
    assert!(!args.json);

    let args = Args::try_parse_from(["usbsdmux", "--json", "-vv", "/dev/sg1", "gpio", "1", "0"])?;
    assert_eq!(
        args.command,
        Command::Gpio {
            gpio: 1,
            action: GpioAction::Low
        }
    );
    assert!(args.json);
    assert_eq!(args.verbose, 2);

    assert!(Args::try_parse_from(["usbsdmux", "/dev/sg1", "gpio", "2", "get"]).is_err());
    assert!(Args::try_parse_from(["usbsdmux", "/dev/sg1", "gpio", "0", "toggle"]).is_err());
    assert!(Args::try_parse_from(["usbsdmux", "/dev/sg1", "sideways"]).is_err());
    Ok(())
}

#[test]
fn test_configure_cli_defaults() -> Result<()> {
    let args = ConfigureArgs::try_parse_from(["usbsdmux-configure", "/dev/sg2", "000000000042"])?;
    assert_eq!(args.vid, 0x0424);
    assert_eq!(args.pid, 0x4041);
    assert_eq!(args.product_string, "usb-sd-mux_rev1");
    assert_eq!(args.scsi_product, "sdmux");

    let args = ConfigureArgs::try_parse_from([
        "usbsdmux-configure",
        "/dev/sg2",
        "000000000042",
        "--pid",
        "4042",
    ])?;
    assert_eq!(args.pid, 0x4042);
    Ok(())
}

#[test]
fn test_hex_ids() {
    assert_eq!(parse_hex_u16("0x0424"), Ok(0x0424));
    assert_eq!(parse_hex_u16("4041"), Ok(0x4041));
    assert!(parse_hex_u16("0x10000").is_err());
    assert!(parse_hex_u16("vid").is_err());
}
