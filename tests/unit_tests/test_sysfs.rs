// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::Path;

use anyhow::{Context, Result};
use usbsdmux::sysfs::{
    BlockStats, block_device, block_info, ioerr_count, read_model, sg_name, usb_serial,
};

use crate::unit_tests::common::TempTree;

const STAT: &str =
    "    1520      361   110346      712        4        0        8        2        0      764      716        0        0        0        0        2        1\n";

#[test]
fn test_sg_name_falls_back_to_given_path() {
    assert_eq!(sg_name(Path::new("/nonexistent/sg4")).as_deref(), Some("sg4"));
    assert_eq!(sg_name(Path::new("/")), None);
}

#[test]
fn test_model_and_block_device() -> Result<()> {
    let tree = TempTree::new("sysfs-block")?;
    tree.file("class/scsi_generic/sg2/device/model", "sdFST HS-SD/MMC \n")?;
    tree.dir("class/scsi_generic/sg2/device/block/sdc")?;
    tree.dir("class/scsi_generic/sg2/device/block/sdb")?;

    assert_eq!(read_model(&tree.root, "sg2")?, "sdFST HS-SD/MMC");
    assert_eq!(block_device(&tree.root, "sg2")?.as_deref(), Some("sdb"));
    assert_eq!(block_device(&tree.root, "sg9")?, None);
    Ok(())
}

#[test]
fn test_block_info() -> Result<()> {
    let tree = TempTree::new("sysfs-stat")?;
    tree.file("class/block/sdb/stat", STAT)?;
    tree.file("class/block/sdb/size", "7798784\n")?;

    let info = block_info(&tree.root, "sdb")?;
    assert_eq!(info.size, Some(7_798_784));
    assert_eq!(info.diskseq, None);
    let stat = info.stat.context("stat")?;
    assert_eq!(stat.reads_completed_successfully, 1520);
    assert_eq!(stat.sectors_read, 110_346);
    assert_eq!(stat.time_spent_doing_ios, 764);
    assert_eq!(stat.time_spent_flushing, 1);

    let json = serde_json::to_value(stat)?;
    assert_eq!(json["IOs_currently_in_progress"], 0);
    assert_eq!(json["weighted_time_spent_doing_IOs"], 716);
    Ok(())
}

#[test]
fn test_short_stat_lines() -> Result<()> {
    let stat = BlockStats::parse("1 2 3 4 5 6 7 8 9 10 11")?;
    assert_eq!(stat.weighted_time_spent_doing_ios, 11);
    assert_eq!(stat.discards_completed, 0);
    assert!(BlockStats::parse("1 two 3").is_err());
    Ok(())
}

#[test]
fn test_missing_block_device_is_empty() -> Result<()> {
    let tree = TempTree::new("sysfs-empty")?;
    let info = block_info(&tree.root, "sdz")?;
    assert_eq!(info, Default::default());
    Ok(())
}

#[test]
fn test_ioerr_count_is_hex() -> Result<()> {
    let tree = TempTree::new("sysfs-ioerr")?;
    tree.file("class/scsi_generic/sg2/device/ioerr_cnt", "0x1a\n")?;
    assert_eq!(ioerr_count(&tree.root, "sg2")?, Some(26));
    assert_eq!(ioerr_count(&tree.root, "sg3")?, None);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_usb_serial_walks_up_the_tree() -> Result<()> {
    let tree = TempTree::new("sysfs-serial")?;
    tree.file("devices/usb1/1-1/serial", "000000000042\n")?;
    let node = tree.dir("devices/usb1/1-1/1-1:1.0/host3/target3:0:0/3:0:0:0/scsi_generic/sg2")?;
    tree.dir("class/scsi_generic")?;
    std::os::unix::fs::symlink(&node, tree.root.join("class/scsi_generic/sg2"))?;

    assert_eq!(usb_serial(&tree.root, "sg2")?.as_deref(), Some("000000000042"));
    Ok(())
}
