// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fs;

use anyhow::{Context, Result};
use serde_json::Value;
use serial_test::serial;
use tracing::{info, level_filters::LevelFilter};
use usbsdmux::cfg::{
    enums::{LogOutput, RotationFrequency},
    logger::{LoggerConfig, init_logger, verbosity_level},
};

use crate::unit_tests::common::TempTree;

#[test]
fn test_verbosity_levels() {
    assert_eq!(verbosity_level(0), LevelFilter::WARN);
    assert_eq!(verbosity_level(1), LevelFilter::INFO);
    assert_eq!(verbosity_level(2), LevelFilter::DEBUG);
    assert_eq!(verbosity_level(9), LevelFilter::TRACE);
}

#[test]
#[serial]
fn test_file_logger_writes_json_lines() -> Result<()> {
    let tree = TempTree::new("logger")?;
    let log_path = tree.root.join("usbsdmux.log");
    let config = tree.file(
        "logger.yaml",
        &format!(
            "logger:\n  level: info\n  output: file\n  is_show_target: true\n  file:\n    path: {}\n",
            log_path.display()
        ),
    )?;
    let config = config.to_string_lossy();

    let parsed = LoggerConfig::from_file(&config)?;
    assert_eq!(parsed.logger.output, LogOutput::File);
    let file = parsed.logger.file.context("file section")?;
    assert_eq!(file.rotation_frequency, RotationFrequency::Never);

    let guard = init_logger(&config)?;
    info!(mode = "host", gpio = 1u64, "switched");
    drop(guard);

    let content = fs::read_to_string(&log_path)?;
    let entry: Value = content
        .lines()
        .filter_map(|l| serde_json::from_str::<Value>(l).ok())
        .find(|v| v["fields"]["message"] == "switched")
        .context("no log entry for the event")?;
    assert_eq!(entry["level"], "INFO");
    assert_eq!(entry["fields"]["mode"], "host");
    assert_eq!(entry["fields"]["gpio"], 1);
    assert!(entry["target"].is_string());
    assert!(entry.get("line").is_none());
    Ok(())
}

#[test]
fn test_file_output_needs_file_section() -> Result<()> {
    let tree = TempTree::new("logger-nofile")?;
    let config = tree.file("logger.yaml", "logger:\n  level: info\n  output: file\n")?;
    assert!(init_logger(&config.to_string_lossy()).is_err());
    Ok(())
}

#[test]
fn test_logger_section_detection() -> Result<()> {
    let tree = TempTree::new("logger-section")?;
    let absent = tree.file("runtime.yaml", "runtime:\n  command_timeout: 5\n")?;
    assert!(!LoggerConfig::is_configured(&absent.to_string_lossy())?);

    assert!(LoggerConfig::is_configured("tests/config.yaml")?);

    // a typo in the section is still a section, and it must not parse
    let broken = tree.file("broken.yaml", "logger:\n  levle: info\n  output: stderr\n")?;
    let broken = broken.to_string_lossy();
    assert!(LoggerConfig::is_configured(&broken)?);
    assert!(LoggerConfig::from_file(&broken).is_err());
    assert!(init_logger(&broken).is_err());
    Ok(())
}
