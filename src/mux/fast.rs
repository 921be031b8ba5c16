// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! USB-SD-Mux FAST, TCA6408 expander with two user GPIOs.
//!
//! All mode writes are masked to the four control pins so that the user
//! GPIOs on bits 4 and 5 survive mode changes.

use std::thread;

use tracing::{debug, info};

use super::{
    CardInfo, DISCONNECT_SETTLE, GpioLevel, Mode, MuxVariant, UsbSdMux, read_card_info,
};
use crate::{
    bridge::Usb2642I2c,
    error::{MuxError, Result},
    gpio::{GpioExpander, Pins, Tca6408},
    transport::ScsiTransport,
};

const SELECT_DUT: Pins = Pins::GPIO_0;
const PWR_DISABLE: Pins = Pins::GPIO_1;
const DAT_DISABLE: Pins = Pins::GPIO_2;
const CARD_REMOVED: Pins = Pins::GPIO_3;

const CONTROL_PINS: Pins = SELECT_DUT
    .union(PWR_DISABLE)
    .union(DAT_DISABLE)
    .union(CARD_REMOVED);

const USER_GPIO: [Pins; 2] = [Pins::GPIO_4, Pins::GPIO_5];

/// Direction register value right after power-on reset.
const POR_CONFIG: u8 = 0xFF;

#[derive(Debug)]
pub struct FastMux<T> {
    tca: GpioExpander<Tca6408, T>,
}

impl<T: ScsiTransport> FastMux<T> {
    /// Bind to the expander and take ownership of its pins if it is still
    /// in its power-on state.
    pub fn new(transport: T) -> Result<Self> {
        let mut mux = Self {
            tca: GpioExpander::new(Usb2642I2c::new(transport)),
        };
        mux.assure_default_state()?;
        Ok(mux)
    }

    pub fn expander(&mut self) -> &mut GpioExpander<Tca6408, T> {
        &mut self.tca
    }

    /// After power-on all pins are inputs and the pull resistors hold the
    /// card on the DUT. Latch that state into the output register before
    /// turning the control pins and user GPIOs into outputs.
    fn assure_default_state(&mut self) -> Result<()> {
        if self.tca.get_gpio_config()? != POR_CONFIG {
            return Ok(());
        }
        debug!("TCA6408 at power-on defaults, taking over pins");
        self.tca.output_all(SELECT_DUT | CARD_REMOVED)?;
        self.tca
            .set_pin_to_output(CONTROL_PINS | USER_GPIO[0] | USER_GPIO[1])
    }

    fn user_pin(gpio: u8) -> Result<Pins> {
        USER_GPIO
            .get(usize::from(gpio))
            .copied()
            .ok_or(MuxError::UnknownGpio(gpio))
    }

    fn write_control(&mut self, values: Pins) -> Result<()> {
        self.tca.output_values(values, CONTROL_PINS)
    }
}

impl<T: ScsiTransport> UsbSdMux for FastMux<T> {
    fn variant(&self) -> MuxVariant {
        MuxVariant::Fast
    }

    fn get_mode(&mut self) -> Result<Mode> {
        let input = self.tca.get_input_values()?;
        Ok(Mode::from_input(input, PWR_DISABLE, SELECT_DUT))
    }

    fn mode_disconnect(&mut self, wait: bool) -> Result<()> {
        info!(variant = %MuxVariant::Fast, "disconnecting card");
        self.write_control(DAT_DISABLE | PWR_DISABLE | CARD_REMOVED)?;
        if wait {
            thread::sleep(DISCONNECT_SETTLE);
        }
        Ok(())
    }

    fn mode_dut(&mut self, wait: bool) -> Result<()> {
        self.mode_disconnect(wait)?;
        info!(variant = %MuxVariant::Fast, "switching card to DUT");
        self.write_control(DAT_DISABLE | PWR_DISABLE | SELECT_DUT | CARD_REMOVED)?;
        self.write_control(SELECT_DUT | CARD_REMOVED)
    }

    fn mode_host(&mut self, wait: bool) -> Result<()> {
        self.mode_disconnect(wait)?;
        info!(variant = %MuxVariant::Fast, "switching card to host");
        self.write_control(Pins::empty())
    }

    fn get_card_info(&mut self) -> Result<CardInfo> {
        if self.get_mode()? != Mode::Host {
            return Err(MuxError::NotInHostMode);
        }
        read_card_info(self.tca.bus())
    }

    /// The user GPIOs are open drain: a set bit pulls the line low.
    fn gpio_get(&mut self, gpio: u8) -> Result<GpioLevel> {
        let pin = Self::user_pin(gpio)?;
        let input = Pins::from_bits_retain(self.tca.get_input_values()?);
        Ok(if input.intersects(pin) {
            GpioLevel::Low
        } else {
            GpioLevel::High
        })
    }

    fn gpio_set_high(&mut self, gpio: u8) -> Result<()> {
        let pin = Self::user_pin(gpio)?;
        info!(gpio, "releasing user GPIO");
        self.tca.output_values(Pins::empty(), pin)
    }

    fn gpio_set_low(&mut self, gpio: u8) -> Result<()> {
        let pin = Self::user_pin(gpio)?;
        info!(gpio, "pulling user GPIO low");
        self.tca.output_values(pin, pin)
    }
}
