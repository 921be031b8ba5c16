// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Decoders for the SD card identification and capability registers.
//!
//! Every register is described by a table of [`FieldSpec`]s. Decoding a raw
//! register yields a [`RegisterReport`] that serialises to the JSON shape
//! used by `usbsdmux info --json` and renders to the line based text report.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub mod cid;
pub mod csd;
pub mod scr;

pub use cid::Cid;
pub use csd::{Csd, Csd10, Csd20, decode_csd};
pub use scr::Scr;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("register value {0:?} is not a hexadecimal string")]
    InvalidHex(String),
    #[error("register value {raw:?} is wider than {bits} bits")]
    TooWide { raw: String, bits: u32 },
    #[error("unknown CSD version {0}")]
    UnknownCsdVersion(u8),
}

/// Extract bits `upper..=lower` of `val`.
#[inline]
pub fn bitslice(val: u128, upper: u32, lower: u32) -> u128 {
    let size = upper - lower + 1;
    let mask = if size >= 128 { u128::MAX } else { (1u128 << size) - 1 };
    (val >> lower) & mask
}

/// A raw register as read from the card, hex text plus its integer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterValue {
    raw_hex: String,
    raw: u128,
}

impl RegisterValue {
    /// Parse `raw_hex`, with or without a `0x` prefix; it may not encode
    /// more than `bits` bits. The text is kept as given for reports.
    pub fn parse(raw_hex: &str, bits: u32) -> Result<Self, DecodeError> {
        let text = raw_hex.trim();
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DecodeError::InvalidHex(raw_hex.to_string()));
        }
        let significant = digits.trim_start_matches('0');
        if significant.len() > 32 {
            return Err(DecodeError::TooWide {
                raw: raw_hex.to_string(),
                bits,
            });
        }
        let raw = if significant.is_empty() {
            0
        } else {
            u128::from_str_radix(significant, 16)
                .map_err(|_| DecodeError::InvalidHex(raw_hex.to_string()))?
        };
        if bits < 128 && raw >> bits != 0 {
            return Err(DecodeError::TooWide {
                raw: raw_hex.to_string(),
                bits,
            });
        }
        Ok(Self {
            raw_hex: text.to_string(),
            raw,
        })
    }

    pub fn raw_hex(&self) -> &str {
        &self.raw_hex
    }

    pub fn raw(&self) -> u128 {
        self.raw
    }

    pub fn slice(&self, (upper, lower): (u32, u32)) -> (u64, u32) {
        (bitslice(self.raw, upper, lower) as u64, upper - lower + 1)
    }
}

/// Entry of an enum table. Serialises as the bare string or number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnumValue {
    Text(&'static str),
    Int(i64),
    Float(f64),
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::Text(s) => f.write_str(s),
            EnumValue::Int(v) => write!(f, "{v}"),
            EnumValue::Float(v) => f.write_str(&py_float(*v)),
        }
    }
}

/// How a raw field value maps to an enum entry.
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    /// Indexed by raw value; out of range gives no entry.
    Indexed(&'static [EnumValue]),
    /// Known values only.
    Sparse(&'static [(u64, &'static str)]),
}

impl Lookup {
    pub fn get(&self, raw: u64) -> Option<EnumValue> {
        match self {
            Lookup::Indexed(table) => usize::try_from(raw).ok().and_then(|i| table.get(i)).copied(),
            Lookup::Sparse(table) => table
                .iter()
                .find(|(k, _)| *k == raw)
                .map(|(_, v)| EnumValue::Text(v)),
        }
    }
}

/// Numeric transform applied to a raw field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convert {
    Bool,
    Int,
    Add(u64),
    Mul(u64),
    Pow2,
    /// `2^(raw + 2)`
    Pow2Plus2,
    /// `(raw + 1) * 512 KiB`
    HalfMebibytes,
    /// `n` 8-bit characters, non printable ones shown as `.`
    Printable(usize),
    /// BCD style `major.minor` nibbles
    Revision,
}

impl Convert {
    /// Numeric result, for transforms that have one.
    pub fn number(self, raw: u64) -> Option<u64> {
        Some(match self {
            Convert::Bool => u64::from(raw != 0),
            Convert::Int => raw,
            Convert::Add(k) => raw + k,
            Convert::Mul(k) => raw * k,
            Convert::Pow2 => 1u64 << raw,
            Convert::Pow2Plus2 => 1u64 << (raw + 2),
            Convert::HalfMebibytes => (raw + 1) * 512 * 1024,
            Convert::Printable(_) | Convert::Revision => return None,
        })
    }

    /// Rendering used in reports (`True`/`False` for flags).
    pub fn render(self, raw: u64) -> String {
        match self {
            Convert::Bool => String::from(if raw != 0 { "True" } else { "False" }),
            Convert::Printable(n) => printable(raw, n),
            Convert::Revision => format!("{}.{}", (raw >> 4) & 15, raw & 15),
            other => other.number(raw).map(|v| v.to_string()).unwrap_or_default(),
        }
    }
}

fn printable(value: u64, size: usize) -> String {
    (0..size)
        .rev()
        .map(|i| {
            let c = ((value >> (8 * i)) & 0x7F) as u8;
            if (0x20..0x7F).contains(&c) { c as char } else { '.' }
        })
        .collect()
}

const TIME_VALUE: [EnumValue; 16] = [
    EnumValue::Text("reserved"),
    EnumValue::Float(1.0),
    EnumValue::Float(1.2),
    EnumValue::Float(1.3),
    EnumValue::Float(1.5),
    EnumValue::Float(2.0),
    EnumValue::Float(2.5),
    EnumValue::Float(3.0),
    EnumValue::Float(3.5),
    EnumValue::Float(4.0),
    EnumValue::Float(4.5),
    EnumValue::Float(5.0),
    EnumValue::Float(5.5),
    EnumValue::Float(6.0),
    EnumValue::Float(7.0),
    EnumValue::Float(8.0),
];

const TIME_UNIT: [(&str, u64); 8] = [
    ("1ns", 1),
    ("10ns", 10),
    ("100ns", 100),
    ("1us", 1_000),
    ("10us", 10_000),
    ("100us", 100_000),
    ("1ms", 1_000_000),
    ("10ms", 10_000_000),
];

const RATE_UNIT: [(&str, Option<u64>); 8] = [
    ("100 Kbit/s", Some(100_000)),
    ("1Mbit/s", Some(1_000_000)),
    ("10Mbit/s", Some(10_000_000)),
    ("100Mbit/s", Some(100_000_000)),
    ("reserved", None),
    ("reserved", None),
    ("reserved", None),
    ("reserved", None),
];

/// Mantissa/exponent encoded fields of the CSD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// TAAC, scaled to nanoseconds.
    AccessTime,
    /// TRAN_SPEED, scaled to bit/s.
    TransferRate,
}

impl Decoder {
    fn apply(self, raw: u64, report: &mut FieldReport) {
        let mantissa = TIME_VALUE[((raw >> 3) & 0xF) as usize];
        let exp = (raw & 0x7) as usize;
        let (unit, scale, value_unit) = match self {
            Decoder::AccessTime => {
                let (unit, scale) = TIME_UNIT[exp];
                (unit, Some(scale), "ns")
            },
            Decoder::TransferRate => {
                let (unit, scale) = RATE_UNIT[exp];
                (unit, scale, "bit/s")
            },
        };
        let scaled = match (mantissa, scale) {
            (EnumValue::Float(m), Some(s)) => Some(m * s as f64),
            _ => None,
        };
        report.decoded = Some((mantissa, unit));
        report.value = Some(FieldValue::Scaled(scaled));
        report.unit = Some(value_unit);
    }
}

/// Declarative description of one register field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    /// Inclusive `(upper, lower)` bit positions.
    pub slice: (u32, u32),
    pub name: Option<&'static str>,
    pub lookup: Option<Lookup>,
    pub bits: Option<&'static [Option<&'static str>]>,
    pub convert: Option<Convert>,
    pub unit: Option<&'static str>,
    pub decoder: Option<Decoder>,
}

impl FieldSpec {
    pub const fn new(key: &'static str, upper: u32, lower: u32) -> Self {
        Self {
            key,
            slice: (upper, lower),
            name: None,
            lookup: None,
            bits: None,
            convert: None,
            unit: None,
            decoder: None,
        }
    }

    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub const fn lookup(mut self, lookup: Lookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub const fn bits(mut self, bits: &'static [Option<&'static str>]) -> Self {
        self.bits = Some(bits);
        self
    }

    pub const fn convert(mut self, convert: Convert) -> Self {
        self.convert = Some(convert);
        self
    }

    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    fn decode(&self, reg: &RegisterValue) -> FieldReport {
        let (value, width) = reg.slice(self.slice);
        let mut report = FieldReport {
            field: self.key,
            name: self.name,
            raw: (value, width),
            enum_value: self.lookup.map(|l| l.get(value)),
            bits: self.bits.map(|labels| {
                (0..width as usize)
                    .filter(|x| value & (1 << x) != 0)
                    .map(|x| labels.get(x).copied().flatten())
                    .collect()
            }),
            decoded: None,
            value: self.convert.map(|c| FieldValue::Text(c.render(value))),
            unit: self.unit,
        };
        if let Some(decoder) = self.decoder {
            decoder.apply(value, &mut report);
        }
        report
    }
}

/// Sort a field table by slice, most significant first.
pub(crate) fn sorted_fields(parts: &[&[FieldSpec]]) -> Vec<FieldSpec> {
    let mut fields: Vec<FieldSpec> = parts.iter().flat_map(|p| p.iter().copied()).collect();
    fields.sort_by(|a, b| b.slice.cmp(&a.slice));
    fields
}

/// `value` entry of a field report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Output of a [`Convert`], always rendered as text.
    Text(String),
    /// Output of a [`Decoder`]; `None` for reserved encodings.
    Scaled(Option<f64>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Scaled(Some(v)) => f.write_str(&py_float(*v)),
            FieldValue::Scaled(None) => f.write_str("None"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReport {
    pub field: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    pub raw: (u64, u32),
    /// Present for fields with a lookup table; `Some(None)` when the raw
    /// value has no entry.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_value: Option<Option<EnumValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits: Option<Vec<Option<&'static str>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded: Option<(EnumValue, &'static str)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComputedValue {
    pub value: u64,
    pub unit: &'static str,
    pub name: &'static str,
}

impl ComputedValue {
    pub(crate) fn bytes(value: u64, name: &'static str) -> Self {
        Self {
            value,
            unit: "bytes",
            name,
        }
    }
}

/// Values derived from several fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Computed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_size_bytes: Option<ComputedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wp_grp_size_bytes: Option<ComputedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_size_bytes: Option<ComputedValue>,
}

/// Fully decoded register.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterReport {
    pub reg: &'static str,
    pub raw: String,
    pub fields: Vec<FieldReport>,
    pub computed: Computed,
}

impl RegisterReport {
    pub fn field(&self, key: &str) -> Option<&FieldReport> {
        self.fields.iter().find(|f| f.field == key)
    }

    /// Human readable report, one entry per line.
    pub fn text_lines(&self) -> Vec<String> {
        let mut text = vec![format!("{} Register Value: {}", self.reg, self.raw)];
        for f in &self.fields {
            match f.name {
                Some(name) => text.push(format!("  {}: {}", f.field, name)),
                None => text.push(format!("  {}", f.field)),
            }
            let (v, w) = f.raw;
            text.push(format!("    raw: 0b{v:0w$b} == 0x{v:x} == {v}", w = w as usize));
            let unit = f.unit.unwrap_or("");
            if let Some(e) = &f.enum_value {
                let e = e.map_or_else(|| "None".to_string(), |e| e.to_string());
                text.push(format!("    enum: {e} {unit}").trim_end().to_string());
            }
            if let Some(bits) = &f.bits {
                let labels: Vec<&str> = bits.iter().map(|b| b.unwrap_or("None")).collect();
                text.push(format!("    bits: {}", labels.join(", ")));
            }
            if let Some((mantissa, u)) = &f.decoded {
                let mantissa = match mantissa {
                    EnumValue::Text(s) => format!("'{s}'"),
                    other => other.to_string(),
                };
                text.push(format!("    decoded: ({mantissa}, '{u}')"));
            }
            if let Some(value) = &f.value {
                text.push(format!("    value: {value} {unit}").trim_end().to_string());
            }
        }
        text
    }
}

/// Behaviour shared by all register decoders.
pub trait RegisterDecoder {
    /// Register label used in reports.
    fn reg_name(&self) -> &'static str;
    fn register(&self) -> &RegisterValue;
    /// Field table, sorted by slice, most significant first.
    fn fields(&self) -> &'static [FieldSpec];

    fn computed(&self) -> Computed {
        Computed::default()
    }

    fn raw_hex(&self) -> &str {
        self.register().raw_hex()
    }

    fn field_spec(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.key == key)
    }

    /// Raw value and width of `key`.
    fn raw_field(&self, key: &str) -> Option<(u64, u32)> {
        self.field_spec(key).map(|s| self.register().slice(s.slice))
    }

    /// Converted numeric value of `key`, or the raw value when the field has
    /// no numeric transform.
    fn number(&self, key: &str) -> Option<u64> {
        let field = self.field_spec(key)?;
        let (raw, _) = self.register().slice(field.slice);
        match field.convert {
            Some(c) => c.number(raw),
            None => Some(raw),
        }
    }

    fn decode_field(&self, key: &str) -> Option<FieldReport> {
        self.field_spec(key).map(|s| s.decode(self.register()))
    }

    fn decode(&self) -> RegisterReport {
        RegisterReport {
            reg: self.reg_name(),
            raw: self.raw_hex().to_string(),
            fields: self
                .fields()
                .iter()
                .map(|s| s.decode(self.register()))
                .collect(),
            computed: self.computed(),
        }
    }

    fn text_report(&self) -> Vec<String> {
        self.decode().text_lines()
    }
}

/// Shortest round-trip float text with a trailing `.0` for whole numbers.
fn py_float(v: f64) -> String {
    format!("{v:?}")
}
