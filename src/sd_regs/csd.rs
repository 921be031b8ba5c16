// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Card Specific Data register (128 bit), structure versions 1.0 and 2.0.

use once_cell::sync::Lazy;

use super::{
    Computed, ComputedValue, Convert, DecodeError, Decoder, EnumValue, FieldSpec, Lookup,
    RegisterDecoder, RegisterReport, RegisterValue, bitslice, sorted_fields,
};

const VDD_MIN_CURR_MA: &[EnumValue] = &[
    EnumValue::Float(0.5),
    EnumValue::Int(1),
    EnumValue::Int(5),
    EnumValue::Int(10),
    EnumValue::Int(25),
    EnumValue::Int(35),
    EnumValue::Int(60),
    EnumValue::Int(100),
];

const VDD_MAX_CURR_MA: &[EnumValue] = &[
    EnumValue::Int(1),
    EnumValue::Int(5),
    EnumValue::Int(10),
    EnumValue::Int(25),
    EnumValue::Int(35),
    EnumValue::Int(45),
    EnumValue::Int(80),
    EnumValue::Int(200),
];

const CCC_BITS: &[Option<&str>] = &[
    Some("0"),
    Some("1"),
    Some("2"),
    Some("3"),
    Some("4"),
    Some("5"),
    Some("6"),
    Some("7"),
    Some("8"),
    Some("9"),
    Some("10"),
    Some("11"),
];

const CSD_STRUCTURES: &[EnumValue] = &[EnumValue::Text("1.0"), EnumValue::Text("2.0")];

const FILE_FORMATS: &[EnumValue] = &[
    EnumValue::Text("Hard disk-like file system with partition table"),
    EnumValue::Text("DOS FAT (floppy-like) with boot sector only (no partition table)"),
    EnumValue::Text("Universal File Format"),
    EnumValue::Text("Others/Unknown"),
];

const COMMON: &[FieldSpec] = &[
    FieldSpec::new("CSD_STRUCTURE", 127, 126)
        .named("CSD structure")
        .lookup(Lookup::Indexed(CSD_STRUCTURES)),
    FieldSpec::new("TAAC", 119, 112)
        .named("data read access-time-1")
        .decoder(Decoder::AccessTime),
    FieldSpec::new("NSAC", 111, 104)
        .named("data read access-time-2")
        .convert(Convert::Mul(100))
        .unit("CLK cycles"),
    FieldSpec::new("TRAN_SPEED", 103, 96)
        .named("max. data transfer rate")
        .decoder(Decoder::TransferRate),
    FieldSpec::new("CCC", 95, 84)
        .named("card command classes")
        .bits(CCC_BITS),
    FieldSpec::new("READ_BL_LEN", 83, 80)
        .named("max. read data block length")
        .convert(Convert::Pow2)
        .unit("bytes"),
    FieldSpec::new("READ_BL_PARTIAL", 79, 79)
        .named("partial blocks for read allowed")
        .convert(Convert::Bool),
    FieldSpec::new("WRITE_BLK_MISALIGN", 78, 78)
        .named("write block misalignment allowed")
        .convert(Convert::Bool),
    FieldSpec::new("READ_BLK_MISALIGN", 77, 77)
        .named("read block misalignment allowed")
        .convert(Convert::Bool),
    FieldSpec::new("DSR_IMP", 76, 76)
        .named("driver stage register implemented")
        .convert(Convert::Bool),
    FieldSpec::new("ERASE_BLK_EN", 46, 46)
        .named("erase single block enable")
        .convert(Convert::Bool),
    FieldSpec::new("SECTOR_SIZE", 45, 39)
        .named("erase sector size")
        .convert(Convert::Add(1))
        .unit("write blocks"),
    FieldSpec::new("WP_GRP_SIZE", 38, 32)
        .named("write protect group size")
        .convert(Convert::Add(1))
        .unit("erase sectors"),
    FieldSpec::new("WP_GRP_ENABLE", 31, 31)
        .named("write protect group enable")
        .convert(Convert::Bool),
    FieldSpec::new("R2W_FACTOR", 28, 26)
        .named("write speed factor")
        .convert(Convert::Pow2)
        .unit("multiples of read access time"),
    FieldSpec::new("WRITE_BL_LEN", 25, 22)
        .named("max. write data block length")
        .convert(Convert::Pow2)
        .unit("bytes"),
    FieldSpec::new("WRITE_BL_PARTIAL", 21, 21)
        .named("partial blocks for write allowed")
        .convert(Convert::Bool),
    FieldSpec::new("FILE_FORMAT_GRP", 15, 15).named("file format group"),
    FieldSpec::new("COPY", 14, 14)
        .named("copy flag")
        .convert(Convert::Bool),
    FieldSpec::new("PERM_WRITE_PROTECT", 13, 13)
        .named("permanent write protection")
        .convert(Convert::Bool),
    FieldSpec::new("TMP_WRITE_PROTECT", 12, 12)
        .named("temporary write protection")
        .convert(Convert::Bool),
    FieldSpec::new("FILE_FORMAT", 11, 9)
        .named("file format")
        .lookup(Lookup::Indexed(FILE_FORMATS)),
    FieldSpec::new("CRC", 7, 1),
];

const V1_ONLY: &[FieldSpec] = &[
    FieldSpec::new("C_SIZE", 73, 62)
        .named("device size")
        .convert(Convert::Add(1)),
    FieldSpec::new("VDD_R_CURR_MIN", 61, 59)
        .named("max. read current @VDD min")
        .lookup(Lookup::Indexed(VDD_MIN_CURR_MA))
        .unit("mA"),
    FieldSpec::new("VDD_R_CURR_MAX", 58, 56)
        .named("max. read current @VDD max")
        .lookup(Lookup::Indexed(VDD_MAX_CURR_MA))
        .unit("mA"),
    FieldSpec::new("VDD_W_CURR_MIN", 55, 53)
        .named("max. write current @VDD min")
        .lookup(Lookup::Indexed(VDD_MIN_CURR_MA))
        .unit("mA"),
    FieldSpec::new("VDD_W_CURR_MAX", 52, 50)
        .named("max. write current @VDD max")
        .lookup(Lookup::Indexed(VDD_MAX_CURR_MA))
        .unit("mA"),
    FieldSpec::new("C_SIZE_MULT", 49, 47)
        .named("device size multiplier")
        .convert(Convert::Pow2Plus2),
];

const V2_ONLY: &[FieldSpec] = &[FieldSpec::new("C_SIZE", 69, 48)
    .named("device size")
    .convert(Convert::HalfMebibytes)
    .unit("bytes")];

static V1_FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| sorted_fields(&[COMMON, V1_ONLY]));
static V2_FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| sorted_fields(&[COMMON, V2_ONLY]));

/// Sector and write-protect group sizes, identical for both versions.
fn common_computed<D: RegisterDecoder + ?Sized>(csd: &D) -> Computed {
    let sector = csd
        .number("SECTOR_SIZE")
        .zip(csd.number("WRITE_BL_LEN"))
        .map(|(s, w)| s * w);
    let wp_grp = sector.zip(csd.number("WP_GRP_SIZE")).map(|(s, g)| s * g);
    Computed {
        sector_size_bytes: sector.map(|v| ComputedValue::bytes(v, "sector size")),
        wp_grp_size_bytes: wp_grp.map(|v| ComputedValue::bytes(v, "write protect group size")),
        device_size_bytes: None,
    }
}

/// CSD structure version 1.0 (standard capacity cards).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csd10 {
    reg: RegisterValue,
}

impl Csd10 {
    pub fn new(raw_hex: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            reg: RegisterValue::parse(raw_hex, 128)?,
        })
    }
}

impl RegisterDecoder for Csd10 {
    fn reg_name(&self) -> &'static str {
        "CSD_10"
    }

    fn register(&self) -> &RegisterValue {
        &self.reg
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &V1_FIELDS
    }

    fn computed(&self) -> Computed {
        let mut computed = common_computed(self);
        computed.device_size_bytes = self
            .number("C_SIZE")
            .zip(self.number("C_SIZE_MULT"))
            .zip(self.number("READ_BL_LEN"))
            .map(|((c, m), b)| ComputedValue::bytes(c * m * b, "device size"));
        computed
    }
}

/// CSD structure version 2.0 (SDHC/SDXC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csd20 {
    reg: RegisterValue,
}

impl Csd20 {
    pub fn new(raw_hex: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            reg: RegisterValue::parse(raw_hex, 128)?,
        })
    }
}

impl RegisterDecoder for Csd20 {
    fn reg_name(&self) -> &'static str {
        "CSD_20"
    }

    fn register(&self) -> &RegisterValue {
        &self.reg
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &V2_FIELDS
    }

    fn computed(&self) -> Computed {
        let mut computed = common_computed(self);
        // C_SIZE already converts to bytes
        computed.device_size_bytes = self
            .number("C_SIZE")
            .map(|v| ComputedValue::bytes(v, "device size"));
        computed
    }
}

/// A CSD of either structure version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Csd {
    V1(Csd10),
    V2(Csd20),
}

/// Pick the decoder matching the CSD_STRUCTURE bits (127..126).
pub fn decode_csd(raw_hex: &str) -> Result<Csd, DecodeError> {
    let reg = RegisterValue::parse(raw_hex, 128)?;
    match bitslice(reg.raw(), 127, 126) {
        0 => Ok(Csd::V1(Csd10 { reg })),
        1 => Ok(Csd::V2(Csd20 { reg })),
        other => Err(DecodeError::UnknownCsdVersion(other as u8)),
    }
}

impl Csd {
    fn inner(&self) -> &dyn RegisterDecoder {
        match self {
            Csd::V1(v) => v,
            Csd::V2(v) => v,
        }
    }
}

impl RegisterDecoder for Csd {
    fn reg_name(&self) -> &'static str {
        self.inner().reg_name()
    }

    fn register(&self) -> &RegisterValue {
        self.inner().register()
    }

    fn fields(&self) -> &'static [FieldSpec] {
        self.inner().fields()
    }

    fn computed(&self) -> Computed {
        self.inner().computed()
    }

    fn decode(&self) -> RegisterReport {
        self.inner().decode()
    }
}
