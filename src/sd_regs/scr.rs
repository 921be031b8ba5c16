// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SD Configuration Register (64 bit).

use once_cell::sync::Lazy;

use super::{
    Convert, DecodeError, EnumValue, FieldSpec, Lookup, RegisterDecoder, RegisterValue,
    sorted_fields,
};

const SCR_STRUCTURES: &[EnumValue] = &[EnumValue::Text("1.0")];

const SD_SPECS: &[EnumValue] = &[
    EnumValue::Text("1.0 or 1.01"),
    EnumValue::Text("1.10"),
    EnumValue::Text("2.00 or 3.0X"),
];

const SECURITY: &[EnumValue] = &[
    EnumValue::Text("No Security"),
    EnumValue::Text("Not Used"),
    EnumValue::Text("SDSC Card (Security Version 1.01)"),
    EnumValue::Text("SDHC Card (Security Version 2.00)"),
    EnumValue::Text("SDXC Card (Security Version 3.xx)"),
];

const BUS_WIDTHS: &[Option<&str>] = &[Some("1 bit"), None, Some("4 bit"), None];

const COMMAND_SUPPORT: &[Option<&str>] = &[
    Some("Speed Class Control (CMD20)"),
    Some("Set Block Count (CMD23)"),
];

const FIELDS: &[FieldSpec] = &[
    FieldSpec::new("SCR_STRUCTURE", 63, 60)
        .named("SCR Structure")
        .lookup(Lookup::Indexed(SCR_STRUCTURES)),
    FieldSpec::new("SD_SPEC", 59, 56)
        .named("SD Memory Card - Spec. Version")
        .lookup(Lookup::Indexed(SD_SPECS)),
    FieldSpec::new("DATA_STAT_AFTER_ERASE", 55, 55)
        .named("data status after erase")
        .convert(Convert::Bool),
    FieldSpec::new("SD_SECURITY", 54, 52)
        .named("CPRM Security Support")
        .lookup(Lookup::Indexed(SECURITY)),
    FieldSpec::new("SD_BUS_WIDTHS", 51, 48)
        .named("DAT Bus widths supported")
        .bits(BUS_WIDTHS),
    FieldSpec::new("SD_SPEC3", 47, 47).named("Spec. Version 3.00 or higher"),
    FieldSpec::new("EX_SECURITY", 46, 43).named("Extended Security Support"),
    FieldSpec::new("RESERVED", 42, 34),
    FieldSpec::new("CMD_SUPPORT", 33, 32)
        .named("Command Support bits")
        .bits(COMMAND_SUPPORT),
    FieldSpec::new("RESERVED_MFG", 31, 0),
];

static SORTED: Lazy<Vec<FieldSpec>> = Lazy::new(|| sorted_fields(&[FIELDS]));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scr {
    reg: RegisterValue,
}

impl Scr {
    pub fn new(raw_hex: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            reg: RegisterValue::parse(raw_hex, 64)?,
        })
    }
}

impl RegisterDecoder for Scr {
    fn reg_name(&self) -> &'static str {
        "SCR"
    }

    fn register(&self) -> &RegisterValue {
        &self.reg
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &SORTED
    }
}
