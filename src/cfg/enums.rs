// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where log records go.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    #[serde(rename = "stdout", alias = "Stdout", alias = "STDOUT")]
    Stdout,
    #[serde(rename = "stderr", alias = "Stderr", alias = "STDERR")]
    Stderr,
    #[serde(rename = "file", alias = "File", alias = "FILE")]
    File,
}
impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogOutput::Stdout => "stdout",
            LogOutput::Stderr => "stderr",
            LogOutput::File => "file",
        })
    }
}

/// Rotation period of a file log.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationFrequency {
    Minutely,
    Hourly,
    Daily,
    #[default]
    Never,
}

/// Action of the `gpio` sub-command.
///
/// Accepts the level names as well as `0`/`1`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioAction {
    #[serde(rename = "low", alias = "0", alias = "LOW")]
    Low,
    #[serde(rename = "high", alias = "1", alias = "HIGH")]
    High,
    #[serde(rename = "get", alias = "GET")]
    Get,
}
impl fmt::Display for GpioAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GpioAction::Low => "low",
            GpioAction::High => "high",
            GpioAction::Get => "get",
        })
    }
}
impl FromStr for GpioAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "0" => Ok(GpioAction::Low),
            "high" | "1" => Ok(GpioAction::High),
            "get" => Ok(GpioAction::Get),
            other => Err(format!("invalid gpio action '{other}', expected low|0|high|1|get")),
        }
    }
}
