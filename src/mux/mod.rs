// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Switching policy on top of the GPIO expander.
//!
//! Every mode change starts with a disconnect phase (data and power off,
//! selector on HOST, card reported as removed) and only then moves to the
//! requested side. The order of the expander writes is part of the
//! electrical contract of the board and must not be changed.

use std::{fmt, str::FromStr, time::Duration};

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::{
    bridge::Usb2642I2c,
    control_block::sd_register::SdRegister,
    error::{MuxError, Result},
    gpio::Pins,
    sd_regs::{Cid, RegisterDecoder, RegisterReport, Scr, decode_csd},
    transport::ScsiTransport,
};

pub mod autoselect;
pub mod classic;
pub mod fast;

pub use autoselect::{MuxVariant, autoselect, detect_variant, open};
pub use classic::ClassicMux;
pub use fast::FastMux;

/// Time the card supply needs to bleed to about 0 V after power-off.
pub const DISCONNECT_SETTLE: Duration = Duration::from_secs(1);

/// Which side currently sees the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Off,
    Dut,
    Host,
}

impl Mode {
    /// Project the input register onto a mode. Data and power always switch
    /// together, so the power bit alone tells whether the card is off.
    pub fn from_input(input: u8, pwr_disable: Pins, select_dut: Pins) -> Self {
        let input = Pins::from_bits_retain(input);
        if input.intersects(pwr_disable) {
            Mode::Off
        } else if input.intersects(select_dut) {
            Mode::Dut
        } else {
            Mode::Host
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Off => "off",
            Mode::Dut => "dut",
            Mode::Host => "host",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Mode::Off),
            "dut" | "client" => Ok(Mode::Dut),
            "host" => Ok(Mode::Host),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// Level label of a user GPIO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioLevel {
    High,
    Low,
}

impl fmt::Display for GpioLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GpioLevel::High => "high",
            GpioLevel::Low => "low",
        })
    }
}

/// Decoded card registers, in the order the bridge reads them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardInfo {
    pub scr: RegisterReport,
    pub cid: RegisterReport,
    pub csd: RegisterReport,
}

impl CardInfo {
    /// Text report: CSD, then SCR, then CID.
    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = self.csd.text_lines();
        lines.extend(self.scr.text_lines());
        lines.extend(self.cid.text_lines());
        lines
    }
}

/// Read SCR, CID and CSD through the bridge and decode them.
pub(crate) fn read_card_info<T: ScsiTransport>(bus: &mut Usb2642I2c<T>) -> Result<CardInfo> {
    let scr = Scr::new(&bus.read_sd_register(SdRegister::Scr)?)?;
    let cid = Cid::new(&bus.read_sd_register(SdRegister::Cid)?)?;
    let csd = decode_csd(&bus.read_sd_register(SdRegister::Csd)?)?;
    Ok(CardInfo {
        scr: scr.decode(),
        cid: cid.decode(),
        csd: csd.decode(),
    })
}

/// Operations common to all USB-SD-Mux revisions.
#[enum_dispatch]
pub trait UsbSdMux {
    fn variant(&self) -> MuxVariant;

    fn get_mode(&mut self) -> Result<Mode>;

    /// Disconnect the card from both sides. With `wait` the call blocks
    /// until the card supply has bled off.
    fn mode_disconnect(&mut self, wait: bool) -> Result<()>;

    /// Disconnect, then hand the card to the device under test.
    fn mode_dut(&mut self, wait: bool) -> Result<()>;

    /// Disconnect, then hand the card to the host.
    fn mode_host(&mut self, wait: bool) -> Result<()>;

    /// Only available while the card is switched to the host.
    fn get_card_info(&mut self) -> Result<CardInfo>;

    fn gpio_get(&mut self, _gpio: u8) -> Result<GpioLevel> {
        Err(MuxError::UnsupportedOperation("gpio_get"))
    }

    fn gpio_set_high(&mut self, _gpio: u8) -> Result<()> {
        Err(MuxError::UnsupportedOperation("gpio_set_high"))
    }

    fn gpio_set_low(&mut self, _gpio: u8) -> Result<()> {
        Err(MuxError::UnsupportedOperation("gpio_set_low"))
    }

    fn set_mode(&mut self, mode: Mode, wait: bool) -> Result<()> {
        match mode {
            Mode::Off => self.mode_disconnect(wait),
            Mode::Dut => self.mode_dut(wait),
            Mode::Host => self.mode_host(wait),
        }
    }
}

/// A mux of either revision, as returned by [`autoselect`].
#[enum_dispatch(UsbSdMux)]
#[derive(Debug)]
pub enum AnyMux<T: ScsiTransport> {
    Classic(ClassicMux<T>),
    Fast(FastMux<T>),
}
