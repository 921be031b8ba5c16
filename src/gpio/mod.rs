// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! PCA9536 / TCA6408 style I²C GPIO expanders.
//!
//! Both parts share the same four-register file and differ only in bus
//! address and pin count, so one driver is parameterised by an
//! [`ExpanderModel`] marker type.

use std::marker::PhantomData;

use bitflags::bitflags;
use tracing::trace;

use crate::{
    bridge::Usb2642I2c,
    error::Result,
    transport::ScsiTransport,
};

bitflags! {
    /// Expander pin set. Bit `n` is `gpio_n`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Pins: u8 {
        const GPIO_0 = 0x01;
        const GPIO_1 = 0x02;
        const GPIO_2 = 0x04;
        const GPIO_3 = 0x08;
        const GPIO_4 = 0x10;
        const GPIO_5 = 0x20;
        const GPIO_6 = 0x40;
        const GPIO_7 = 0x80;
    }
}

/// Register file shared by the whole family.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Read-only pin levels.
    Input = 0x00,
    Output = 0x01,
    Polarity = 0x02,
    /// Direction, 1 = input. Reads 0xFF after power-on reset.
    Config = 0x03,
}

/// Compile-time description of one expander part.
pub trait ExpanderModel {
    const NAME: &'static str;
    /// 7-bit I²C address.
    const ADDRESS: u8;
    const PIN_COUNT: u32;

    /// Mask covering every pin of the part.
    fn all_pins() -> Pins {
        Pins::from_bits_truncate(((1u16 << Self::PIN_COUNT) - 1) as u8)
    }
}

/// 4-bit expander used on the classic USB-SD-Mux.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pca9536;

impl ExpanderModel for Pca9536 {
    const NAME: &'static str = "PCA9536";
    const ADDRESS: u8 = 0x41;
    const PIN_COUNT: u32 = 4;
}

/// 8-bit expander used on the USB-SD-Mux FAST.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tca6408;

impl ExpanderModel for Tca6408 {
    const NAME: &'static str = "TCA6408";
    const ADDRESS: u8 = 0x20;
    const PIN_COUNT: u32 = 8;
}

/// Register-level driver for an expander sitting on the USB2642 aux bus.
#[derive(Debug)]
pub struct GpioExpander<M, T> {
    bus: Usb2642I2c<T>,
    _model: PhantomData<M>,
}

impl<M: ExpanderModel, T: ScsiTransport> GpioExpander<M, T> {
    pub fn new(bus: Usb2642I2c<T>) -> Self {
        Self {
            bus,
            _model: PhantomData,
        }
    }

    pub fn bus(&mut self) -> &mut Usb2642I2c<T> {
        &mut self.bus
    }

    pub fn into_bus(self) -> Usb2642I2c<T> {
        self.bus
    }

    pub fn read_register(&mut self, reg: Register) -> Result<u8> {
        let data = self.bus.write_read(M::ADDRESS, &[reg as u8], 1)?;
        let value = data.first().copied().unwrap_or_default();
        trace!(chip = M::NAME, ?reg, value = format_args!("{value:#04x}"), "read register");
        Ok(value)
    }

    pub fn write_register(&mut self, reg: Register, value: u8) -> Result<()> {
        trace!(chip = M::NAME, ?reg, value = format_args!("{value:#04x}"), "write register");
        self.bus.write(M::ADDRESS, &[reg as u8, value])
    }

    /// Clear the direction bits of `pins`; other pins keep their direction.
    pub fn set_pin_to_output(&mut self, pins: Pins) -> Result<()> {
        let config = self.read_register(Register::Config)?;
        self.write_register(Register::Config, config & !pins.bits())
    }

    /// Set the direction bits of `pins`; other pins keep their direction.
    pub fn set_pin_to_input(&mut self, pins: Pins) -> Result<()> {
        let config = self.read_register(Register::Config)?;
        self.write_register(Register::Config, config | pins.bits())
    }

    pub fn get_gpio_config(&mut self) -> Result<u8> {
        self.read_register(Register::Config)
    }

    pub fn get_input_values(&mut self) -> Result<u8> {
        self.read_register(Register::Input)
    }

    /// Drive `values` on the pins selected by `bitmask`.
    ///
    /// A mask covering the whole part is a plain register write. A partial
    /// mask reads the output register first so pins outside the mask keep
    /// whatever they were driving (or the pull-resistor default they were
    /// latched to at power-on).
    pub fn output_values(&mut self, values: Pins, bitmask: Pins) -> Result<()> {
        if bitmask.contains(M::all_pins()) {
            return self.write_register(Register::Output, values.bits());
        }
        let old = self.read_register(Register::Output)?;
        let new = (old & !bitmask.bits()) | (values.bits() & bitmask.bits());
        self.write_register(Register::Output, new)
    }

    /// [`Self::output_values`] over all pins.
    pub fn output_all(&mut self, values: Pins) -> Result<()> {
        self.output_values(values, M::all_pins())
    }
}
