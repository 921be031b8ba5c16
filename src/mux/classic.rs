// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! First USB-SD-Mux revision, PCA9536 expander.

use std::thread;

use tracing::info;

use super::{CardInfo, DISCONNECT_SETTLE, Mode, MuxVariant, UsbSdMux, read_card_info};
use crate::{
    bridge::Usb2642I2c,
    error::{MuxError, Result},
    gpio::{GpioExpander, Pca9536, Pins},
    transport::ScsiTransport,
};

// Active-high "disabled"/"removed" lines; 0 enables or inserts.
const DAT_DISABLE: Pins = Pins::GPIO_0;
const PWR_DISABLE: Pins = Pins::GPIO_1;
const SELECT_DUT: Pins = Pins::GPIO_2;
const CARD_REMOVED: Pins = Pins::GPIO_3;

const CONTROL_PINS: Pins = DAT_DISABLE
    .union(PWR_DISABLE)
    .union(SELECT_DUT)
    .union(CARD_REMOVED);

#[derive(Debug)]
pub struct ClassicMux<T> {
    pca: GpioExpander<Pca9536, T>,
}

impl<T: ScsiTransport> ClassicMux<T> {
    pub fn new(transport: T) -> Self {
        Self {
            pca: GpioExpander::new(Usb2642I2c::new(transport)),
        }
    }

    pub fn expander(&mut self) -> &mut GpioExpander<Pca9536, T> {
        &mut self.pca
    }
}

impl<T: ScsiTransport> UsbSdMux for ClassicMux<T> {
    fn variant(&self) -> MuxVariant {
        MuxVariant::Classic
    }

    fn get_mode(&mut self) -> Result<Mode> {
        let input = self.pca.get_input_values()?;
        Ok(Mode::from_input(input, PWR_DISABLE, SELECT_DUT))
    }

    fn mode_disconnect(&mut self, wait: bool) -> Result<()> {
        info!(variant = %MuxVariant::Classic, "disconnecting card");
        // selector rests on HOST
        self.pca
            .output_all(DAT_DISABLE | PWR_DISABLE | CARD_REMOVED)?;
        self.pca.set_pin_to_output(CONTROL_PINS)?;
        if wait {
            thread::sleep(DISCONNECT_SETTLE);
        }
        Ok(())
    }

    fn mode_dut(&mut self, wait: bool) -> Result<()> {
        self.mode_disconnect(wait)?;
        info!(variant = %MuxVariant::Classic, "switching card to DUT");
        self.pca
            .output_all(DAT_DISABLE | PWR_DISABLE | SELECT_DUT | CARD_REMOVED)?;
        self.pca.output_all(SELECT_DUT | CARD_REMOVED)
    }

    fn mode_host(&mut self, wait: bool) -> Result<()> {
        self.mode_disconnect(wait)?;
        info!(variant = %MuxVariant::Classic, "switching card to host");
        self.pca.output_all(Pins::empty())
    }

    fn get_card_info(&mut self) -> Result<CardInfo> {
        if self.get_mode()? != Mode::Host {
            return Err(MuxError::NotInHostMode);
        }
        read_card_info(self.pca.bus())
    }
}
