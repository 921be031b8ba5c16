// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Read-only lookups in sysfs around a `/dev/sg*` node.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;

/// How far up the device tree to look for the USB `serial` attribute.
const USB_SERIAL_MAX_DEPTH: usize = 10;

/// Base name of the sg node after resolving symlinks (`/dev/sg3` -> `sg3`).
///
/// A path that cannot be resolved is used as given.
pub fn sg_name(sg: &Path) -> Option<String> {
    let resolved = fs::canonicalize(sg).unwrap_or_else(|_| sg.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

pub fn scsi_generic_dir(root: &Path, sg_name: &str) -> PathBuf {
    root.join("class").join("scsi_generic").join(sg_name)
}

/// `<root>/class/scsi_generic/<name>/device/model`
pub fn model_path(root: &Path, sg_name: &str) -> PathBuf {
    scsi_generic_dir(root, sg_name).join("device").join("model")
}

/// SCSI model string of the device, whitespace trimmed.
pub fn read_model(root: &Path, sg_name: &str) -> io::Result<String> {
    Ok(fs::read_to_string(model_path(root, sg_name))?.trim().to_string())
}

/// Name of the block device that belongs to the sg node (`sdb`), if a
/// medium driver is bound.
pub fn block_device(root: &Path, sg_name: &str) -> io::Result<Option<String>> {
    let dir = scsi_generic_dir(root, sg_name).join("device").join("block");
    let mut names: Vec<String> = match fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    names.sort();
    Ok(names.into_iter().next())
}

/// The 17 counters of `/sys/class/block/<dev>/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlockStats {
    pub reads_completed_successfully: u64,
    pub reads_merged: u64,
    pub sectors_read: u64,
    pub time_spent_reading: u64,
    pub writes_completed: u64,
    pub writes_merged: u64,
    pub sectors_written: u64,
    pub time_spent_writing: u64,
    #[serde(rename = "IOs_currently_in_progress")]
    pub ios_currently_in_progress: u64,
    #[serde(rename = "time_spent_doing_IOs")]
    pub time_spent_doing_ios: u64,
    #[serde(rename = "weighted_time_spent_doing_IOs")]
    pub weighted_time_spent_doing_ios: u64,
    pub discards_completed: u64,
    pub discards_merged: u64,
    pub sectors_discarded: u64,
    pub time_spent_discarding: u64,
    pub flush_requests_completed: u64,
    pub time_spent_flushing: u64,
}

impl BlockStats {
    /// Parse the whitespace separated counters. Older kernels emit 11 or 15
    /// columns; missing ones stay zero.
    pub fn parse(text: &str) -> io::Result<Self> {
        let mut values = [0u64; 17];
        for (slot, part) in values.iter_mut().zip(text.split_whitespace()) {
            *slot = part
                .parse()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
        let [
            reads_completed_successfully,
            reads_merged,
            sectors_read,
            time_spent_reading,
            writes_completed,
            writes_merged,
            sectors_written,
            time_spent_writing,
            ios_currently_in_progress,
            time_spent_doing_ios,
            weighted_time_spent_doing_ios,
            discards_completed,
            discards_merged,
            sectors_discarded,
            time_spent_discarding,
            flush_requests_completed,
            time_spent_flushing,
        ] = values;
        Ok(Self {
            reads_completed_successfully,
            reads_merged,
            sectors_read,
            time_spent_reading,
            writes_completed,
            writes_merged,
            sectors_written,
            time_spent_writing,
            ios_currently_in_progress,
            time_spent_doing_ios,
            weighted_time_spent_doing_ios,
            discards_completed,
            discards_merged,
            sectors_discarded,
            time_spent_discarding,
            flush_requests_completed,
            time_spent_flushing,
        })
    }
}

/// Statistics of one block device; absent attributes are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub diskseq: Option<u64>,
    pub size: Option<u64>,
    pub stat: Option<BlockStats>,
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_optional_int(path: &Path, radix: u32) -> io::Result<Option<u64>> {
    read_optional(path)?
        .map(|s| {
            let s = s.trim();
            let s = if radix == 16 { s.trim_start_matches("0x") } else { s };
            u64::from_str_radix(s, radix).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        })
        .transpose()
}

/// `stat`, `diskseq` and `size` of `<root>/class/block/<block>`.
pub fn block_info(root: &Path, block: &str) -> io::Result<BlockInfo> {
    let dir = root.join("class").join("block").join(block);
    Ok(BlockInfo {
        diskseq: read_optional_int(&dir.join("diskseq"), 10)?,
        size: read_optional_int(&dir.join("size"), 10)?,
        stat: read_optional(&dir.join("stat"))?
            .map(|s| BlockStats::parse(&s))
            .transpose()?,
    })
}

/// SCSI I/O error counter (`device/ioerr_cnt`, hexadecimal in sysfs).
pub fn ioerr_count(root: &Path, sg_name: &str) -> io::Result<Option<u64>> {
    read_optional_int(
        &scsi_generic_dir(root, sg_name).join("device").join("ioerr_cnt"),
        16,
    )
}

/// Serial number of the USB device the sg node hangs off, found by walking
/// up from the resolved sysfs directory.
pub fn usb_serial(root: &Path, sg_name: &str) -> io::Result<Option<String>> {
    let mut dir = fs::canonicalize(scsi_generic_dir(root, sg_name))?;
    for _ in 0..=USB_SERIAL_MAX_DEPTH {
        if let Some(serial) = read_optional(&dir.join("serial"))? {
            return Ok(Some(serial.trim().to_string()));
        }
        if !dir.pop() {
            break;
        }
    }
    Ok(None)
}
