// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::transport::DEFAULT_TIMEOUT;

/// Settings read from the YAML file given with `--config`. The same file
/// may carry a `logger:` section, see [`crate::cfg::logger`].
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Implementation/runtime parameters.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Timeout of every SG_IO request.
    #[serde(with = "serde_secs")]
    pub command_timeout: Duration,
    /// Mount point of sysfs, used to identify the mux revision.
    pub sysfs_root: PathBuf,
    /// Wait for the card supply to bleed off after disconnecting.
    pub disconnect_wait: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_TIMEOUT,
            sysfs_root: PathBuf::from("/sys"),
            disconnect_wait: true,
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            self.runtime.command_timeout >= Duration::from_secs(1),
            "command_timeout must be >= 1 second"
        );
        ensure!(
            self.runtime.sysfs_root.is_absolute(),
            "sysfs_root must be an absolute path, got {:?}",
            self.runtime.sysfs_root
        );
        // `/sys/` and `/sys` name the same directory
        self.runtime.sysfs_root = self.runtime.sysfs_root.components().collect();
        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
