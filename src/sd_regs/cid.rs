// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Card Identification register (128 bit).

use once_cell::sync::Lazy;

use super::{
    Convert, DecodeError, FieldSpec, Lookup, RegisterDecoder, RegisterValue, sorted_fields,
};

const MANUFACTURERS: &[(u64, &str)] = &[
    (0x02, "SanDisk"),
    (0x03, "SanDisk SD"),
    (0x1B, "Samsung"),
    (0x74, "Transcend"),
    (0x9F, "Kingston SD"),
];

const FIELDS: &[FieldSpec] = &[
    FieldSpec::new("MID", 127, 120)
        .named("Manufacturer ID")
        .lookup(Lookup::Sparse(MANUFACTURERS)),
    FieldSpec::new("OID", 119, 104)
        .named("OEM/Application ID")
        .convert(Convert::Printable(2)),
    FieldSpec::new("PNM", 103, 64)
        .named("Product name")
        .convert(Convert::Printable(5)),
    FieldSpec::new("PRV", 63, 56)
        .named("Product revision")
        .convert(Convert::Revision),
    FieldSpec::new("PSN", 55, 24)
        .named("Product serial number")
        .convert(Convert::Int),
    FieldSpec::new("RESERVED", 23, 20),
    // MDT (19, 8) split in year and month
    FieldSpec::new("MDT_Y", 19, 12)
        .named("Manufacturing date (year)")
        .convert(Convert::Add(2000)),
    FieldSpec::new("MDT_M", 11, 8)
        .named("Manufacturing date (month)")
        .convert(Convert::Add(1)),
    FieldSpec::new("CRC", 7, 1).named("CRC7 checksum"),
    FieldSpec::new("NU1", 0, 0).named("not used, always 1"),
];

static SORTED: Lazy<Vec<FieldSpec>> = Lazy::new(|| sorted_fields(&[FIELDS]));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cid {
    reg: RegisterValue,
}

impl Cid {
    pub fn new(raw_hex: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            reg: RegisterValue::parse(raw_hex, 128)?,
        })
    }
}

impl RegisterDecoder for Cid {
    fn reg_name(&self) -> &'static str {
        "CID"
    }

    fn register(&self) -> &RegisterValue {
        &self.reg
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &SORTED
    }
}
