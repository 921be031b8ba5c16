// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::Path;

use anyhow::Result;
use usbsdmux::{
    cfg::config::Config,
    error::MuxError,
    mux::{AnyMux, MuxVariant, UsbSdMux, autoselect, detect_variant, open},
};

use crate::unit_tests::common::{SimTransport, TempTree};

const SG: &str = "/nonexistent/dev/sg7";

fn with_model(tag: &str, model: &str) -> Result<TempTree> {
    let tree = TempTree::new(tag)?;
    tree.file("class/scsi_generic/sg7/device/model", model)?;
    Ok(tree)
}

#[test]
fn test_models_map_to_variants() -> Result<()> {
    let classic = with_model("classic", "sdmux HS-SD/MMC \n")?;
    assert_eq!(detect_variant(&classic.root, Path::new(SG))?, MuxVariant::Classic);

    let fast = with_model("fast", "sdFST HS-SD/MMC\n")?;
    assert_eq!(detect_variant(&fast.root, Path::new(SG))?, MuxVariant::Fast);
    Ok(())
}

#[test]
fn test_unknown_model_is_reported() -> Result<()> {
    let tree = with_model("unknown", "Card Reader\n")?;
    let err = detect_variant(&tree.root, Path::new(SG)).unwrap_err();
    assert!(matches!(err, MuxError::UnknownUsbSdMuxRevision(_)));
    assert_eq!(
        err.to_string(),
        "Could not determine type of USB-SD-Mux. Found unknown SCSI model 'Card Reader'."
    );
    Ok(())
}

#[test]
fn test_missing_model_names_the_path() -> Result<()> {
    let tree = TempTree::new("missing")?;
    let err = detect_variant(&tree.root, Path::new(SG)).unwrap_err();
    let expected = tree.root.join("class/scsi_generic/sg7/device/model");
    assert_eq!(
        err.to_string(),
        format!(
            "Could not determine type of USB-SD-Mux. Does {} exist?",
            expected.display()
        )
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_symlinked_device_resolves_to_target_name() -> Result<()> {
    let tree = with_model("symlink", "sdFST HS-SD/MMC\n")?;
    let target = tree.file("dev/sg7", "")?;
    let link = tree.root.join("dev/usb-sd-mux");
    std::os::unix::fs::symlink(&target, &link)?;

    assert_eq!(detect_variant(&tree.root, &link)?, MuxVariant::Fast);
    Ok(())
}

#[test]
fn test_open_builds_requested_variant() -> Result<()> {
    let classic = open(MuxVariant::Classic, SimTransport::classic())?;
    assert!(matches!(classic, AnyMux::Classic(_)));

    let sim = SimTransport::fast();
    let fast = open(MuxVariant::Fast, sim.clone())?;
    assert!(matches!(fast, AnyMux::Fast(_)));
    assert_eq!(fast.variant(), MuxVariant::Fast);
    // power-on take-over already happened
    assert_eq!(sim.state().config, 0xC0);
    Ok(())
}

#[test]
fn test_autoselect_uses_configured_sysfs_root() -> Result<()> {
    let tree = with_model("autoselect", "sdmux HS-SD/MMC\n")?;
    let mut config = Config::default();
    config.runtime.sysfs_root = tree.root.clone();

    let mut mux = autoselect(Path::new(SG), &config)?;
    assert_eq!(mux.variant(), MuxVariant::Classic);
    // the device node itself does not exist
    assert!(matches!(mux.get_mode(), Err(MuxError::TransportIoctl(_))));
    Ok(())
}

#[test]
fn test_autoselect_fast_fails_without_device() -> Result<()> {
    let tree = with_model("autoselect-fast", "sdFST HS-SD/MMC\n")?;
    let mut config = Config::default();
    config.runtime.sysfs_root = tree.root.clone();

    assert!(matches!(
        autoselect(Path::new(SG), &config),
        Err(MuxError::TransportIoctl(_))
    ));
    Ok(())
}

#[test]
fn test_variant_names() {
    assert_eq!(MuxVariant::Classic.to_string(), "UsbSdMuxClassic");
    assert_eq!(MuxVariant::Fast.scsi_model(), "sdFST HS-SD/MMC");
    assert_eq!(MuxVariant::from_scsi_model("sdmux HS-SD/MMC"), Some(MuxVariant::Classic));
    assert_eq!(MuxVariant::from_scsi_model("sdmux"), None);
}
