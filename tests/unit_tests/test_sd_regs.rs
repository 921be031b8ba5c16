// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fs;

use anyhow::{Context, Result};
use serde_json::Value;
use usbsdmux::{
    mux::CardInfo,
    sd_regs::{
        Cid, Csd, DecodeError, EnumValue, FieldValue, RegisterDecoder, Scr, decode_csd,
    },
};

use crate::unit_tests::common::load_text;

const FIXTURES: &str = "tests/unit_tests/fixtures/sd_regs";

const CARDS: [&str; 4] = [
    "02544d53413034471027b7748500bc00",
    "1b534d474638533530d8466363a16700",
    "744a605553442020104182bbc7010600",
    "9f5449303030303000a1114bb5011400",
];

fn raw_of(reference: &Value, reg: &str) -> Result<String> {
    reference[reg]["raw"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("fixture has no {reg}.raw"))
}

fn decode_card(reference: &Value) -> Result<CardInfo> {
    Ok(CardInfo {
        scr: Scr::new(&raw_of(reference, "scr")?)?.decode(),
        cid: Cid::new(&raw_of(reference, "cid")?)?.decode(),
        csd: decode_csd(&raw_of(reference, "csd")?)?.decode(),
    })
}

fn value_text(decoder: &impl RegisterDecoder, key: &str) -> Option<String> {
    match decoder.decode_field(key)?.value? {
        FieldValue::Text(s) => Some(s),
        FieldValue::Scaled(_) => None,
    }
}

#[test]
fn test_reports_match_reference_json() -> Result<()> {
    for cid in CARDS {
        let path = format!("{FIXTURES}/{cid}.json");
        let reference: Value = serde_json::from_str(&load_text(&path)?)?;
        let decoded = serde_json::to_value(decode_card(&reference)?)?;

        assert_eq!(
            serde_json::to_string(&decoded)?,
            serde_json::to_string(&reference)?,
            "JSON report of {cid} differs"
        );
    }
    Ok(())
}

#[test]
fn test_reports_match_reference_text() -> Result<()> {
    for cid in CARDS {
        let reference: Value =
            serde_json::from_str(&load_text(&format!("{FIXTURES}/{cid}.json"))?)?;
        let expected = load_text(&format!("{FIXTURES}/{cid}.text"))?;
        let lines = decode_card(&reference)?.text_lines();

        let expected: Vec<&str> = expected.lines().collect();
        assert_eq!(lines.len(), expected.len(), "line count of {cid}");
        for (n, (got, want)) in lines.iter().zip(expected).enumerate() {
            assert_eq!(got, want, "{cid} line {}", n + 1);
        }
    }
    Ok(())
}

#[test]
fn test_fixture_files_are_all_covered() -> Result<()> {
    let mut names: Vec<String> = fs::read_dir(FIXTURES)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".json"))
        .collect();
    names.sort();
    let mut expected: Vec<String> = CARDS.iter().map(|c| format!("{c}.json")).collect();
    expected.sort();
    assert_eq!(names, expected);
    Ok(())
}

#[test]
fn test_sandisk_cid() -> Result<()> {
    let cid = Cid::new("02544d53413034471027b7748500bc00")?;
    let mid = cid.decode_field("MID").context("MID")?;
    assert_eq!(mid.enum_value, Some(Some(EnumValue::Text("SanDisk"))));
    assert_eq!(value_text(&cid, "OID").as_deref(), Some("TM"));
    assert_eq!(value_text(&cid, "PNM").as_deref(), Some("SA04G"));
    assert_eq!(cid.number("MDT_Y"), Some(2008));
    assert_eq!(cid.number("MDT_M"), Some(12));
    Ok(())
}

#[test]
fn test_samsung_cid() -> Result<()> {
    let cid = Cid::new("1b534d474638533530d8466363a16700")?;
    let mid = cid.decode_field("MID").context("MID")?;
    assert_eq!(mid.enum_value, Some(Some(EnumValue::Text("Samsung"))));
    assert_eq!(value_text(&cid, "OID").as_deref(), Some("SM"));
    assert_eq!(value_text(&cid, "PNM").as_deref(), Some("GF8S5"));
    Ok(())
}

#[test]
fn test_unknown_manufacturer_has_empty_enum() -> Result<()> {
    let cid = Cid::new("ff544d53413034471027b7748500bc00")?;
    let mid = cid.decode_field("MID").context("MID")?;
    assert_eq!(mid.enum_value, Some(None));
    assert!(cid.text_report().contains(&"    enum: None".to_string()));
    Ok(())
}

#[test]
fn test_csd_v2_dispatch_and_size() -> Result<()> {
    let csd = decode_csd("400e00325b5900001dbf7f800a404000")?;
    assert!(matches!(csd, Csd::V2(_)));
    assert_eq!(csd.reg_name(), "CSD_20");

    let (c_size, width) = csd.raw_field("C_SIZE").context("C_SIZE")?;
    assert_eq!(width, 22);
    let size = csd.computed().device_size_bytes.context("device size")?;
    assert_eq!(size.value, (c_size + 1) * 524_288);
    assert_eq!(size.value, 3_992_977_408);
    Ok(())
}

#[test]
fn test_csd_v1_device_size() -> Result<()> {
    let csd = decode_csd("002600325f5a83aef6db7fbf1640004f")?;
    assert!(matches!(csd, Csd::V1(_)));
    let computed = csd.computed();
    let c_size = csd.number("C_SIZE").context("C_SIZE")?;
    let mult = csd.number("C_SIZE_MULT").context("C_SIZE_MULT")?;
    let block = csd.number("READ_BL_LEN").context("READ_BL_LEN")?;
    assert_eq!(
        computed.device_size_bytes.map(|v| v.value),
        Some(c_size * mult * block)
    );
    assert_eq!(computed.sector_size_bytes.map(|v| v.value), Some(65_536));
    Ok(())
}

#[test]
fn test_csd_reserved_structure_is_rejected() {
    assert_eq!(
        decode_csd("c00e00325b5900001dbf7f800a404000").unwrap_err(),
        DecodeError::UnknownCsdVersion(3)
    );
}

#[test]
fn test_malformed_hex_is_rejected() {
    assert!(matches!(Cid::new("xyz"), Err(DecodeError::InvalidHex(_))));
    assert!(matches!(
        Scr::new("0235800000000000ff"),
        Err(DecodeError::TooWide { .. })
    ));
}

#[test]
fn test_prefixed_hex_decodes_like_bare_hex() -> Result<()> {
    let cid = Cid::new("0x02544d53413034471027b7748500bc00")?;
    assert_eq!(value_text(&cid, "PNM").as_deref(), Some("SA04G"));
    assert_eq!(cid.raw_hex(), "0x02544d53413034471027b7748500bc00");

    let csd = decode_csd("0X400e00325b5900001dbf7f800a404000")?;
    assert!(matches!(csd, Csd::V2(_)));
    // only the header line echoes the input text
    let prefixed = csd.text_report();
    let bare = decode_csd("400e00325b5900001dbf7f800a404000")?.text_report();
    assert_eq!(prefixed[1..], bare[1..]);
    assert!(matches!(Scr::new("0x"), Err(DecodeError::InvalidHex(_))));
    Ok(())
}

#[test]
fn test_taac_with_reserved_mantissa_has_no_value() -> Result<()> {
    // TAAC = 0x06: mantissa index 0 is reserved
    let csd = decode_csd("400600325b5900001dbf7f800a404000")?;
    let taac = csd.decode_field("TAAC").context("TAAC")?;
    assert_eq!(taac.decoded, Some((EnumValue::Text("reserved"), "1ms")));
    assert_eq!(taac.value, Some(FieldValue::Scaled(None)));
    let text = csd.text_report();
    assert!(text.contains(&"    decoded: ('reserved', '1ms')".to_string()));
    assert!(text.contains(&"    value: None ns".to_string()));
    Ok(())
}

#[test]
fn test_scr_bus_widths() -> Result<()> {
    let scr = Scr::new("0235800000000000")?;
    let widths = scr.decode_field("SD_BUS_WIDTHS").context("SD_BUS_WIDTHS")?;
    assert_eq!(widths.bits, Some(vec![Some("1 bit"), Some("4 bit")]));
    Ok(())
}
