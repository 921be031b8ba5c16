// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Map a `/dev/sg*` path to the matching mux revision via its SCSI model.

use std::{fmt, io, path::Path};

use tracing::debug;

use super::{AnyMux, ClassicMux, FastMux};
use crate::{
    cfg::config::Config,
    error::{MuxError, Result},
    sysfs,
    transport::{ScsiTransport, sg::SgTransport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MuxVariant {
    /// PCA9536 based board.
    Classic,
    /// TCA6408 based board with user GPIOs.
    Fast,
}

impl MuxVariant {
    /// SCSI model string the bridge reports for this board.
    pub const fn scsi_model(self) -> &'static str {
        match self {
            MuxVariant::Classic => "sdmux HS-SD/MMC",
            MuxVariant::Fast => "sdFST HS-SD/MMC",
        }
    }

    pub fn from_scsi_model(model: &str) -> Option<Self> {
        [MuxVariant::Classic, MuxVariant::Fast]
            .into_iter()
            .find(|v| v.scsi_model() == model)
    }
}

impl fmt::Display for MuxVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MuxVariant::Classic => "UsbSdMuxClassic",
            MuxVariant::Fast => "UsbSdMuxFast",
        })
    }
}

/// Read the SCSI model of `sg` below `sysfs_root` and pick the revision.
pub fn detect_variant(sysfs_root: &Path, sg: &Path) -> Result<MuxVariant> {
    let name = sysfs::sg_name(sg).ok_or_else(|| {
        MuxError::UnknownUsbSdMuxRevision(format!("'{}' does not name a device.", sg.display()))
    })?;
    let model_path = sysfs::model_path(sysfs_root, &name);
    let model = match sysfs::read_model(sysfs_root, &name) {
        Ok(model) => model,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MuxError::UnknownUsbSdMuxRevision(format!(
                "Does {} exist?",
                model_path.display()
            )));
        },
        Err(e) => {
            return Err(MuxError::UnknownUsbSdMuxRevision(format!(
                "Reading {} failed: {e}",
                model_path.display()
            )));
        },
    };
    debug!(sg = %name, %model, "read SCSI model");
    MuxVariant::from_scsi_model(&model).ok_or_else(|| {
        MuxError::UnknownUsbSdMuxRevision(format!("Found unknown SCSI model '{model}'."))
    })
}

/// Build the controller for `variant` on top of `transport`.
pub fn open<T: ScsiTransport>(variant: MuxVariant, transport: T) -> Result<AnyMux<T>> {
    Ok(match variant {
        MuxVariant::Classic => ClassicMux::new(transport).into(),
        MuxVariant::Fast => FastMux::new(transport)?.into(),
    })
}

/// Detect the revision of `sg` and open it with the configured timeout.
pub fn autoselect(sg: &Path, config: &Config) -> Result<AnyMux<SgTransport>> {
    let variant = detect_variant(&config.runtime.sysfs_root, sg)?;
    let transport = SgTransport::new(sg).with_timeout(config.runtime.command_timeout);
    open(variant, transport)
}
