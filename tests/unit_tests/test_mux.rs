// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use usbsdmux::{
    control_block::{USB2642_I2C_WRITE_READ_STREAM, USB2642_SD_REGISTER_READ},
    error::MuxError,
    gpio::Register,
    mux::{AnyMux, ClassicMux, FastMux, GpioLevel, Mode, MuxVariant, UsbSdMux, open},
    sd_regs::EnumValue,
};

use crate::unit_tests::common::SimTransport;

const OUTPUT: u8 = Register::Output as u8;
const CONFIG: u8 = Register::Config as u8;

const SCR: &str = "0235800000000000";
const CID: &str = "02544d53413034471027b7748500bc00";
const CSD: &str = "400e00325b5900001dbf7f800a404000";

fn fast_mux(sim: &SimTransport) -> Result<FastMux<SimTransport>> {
    Ok(FastMux::new(sim.clone())?)
}

#[test]
fn test_fast_dut_after_power_on() -> Result<()> {
    let sim = SimTransport::fast();
    let mut mux = fast_mux(&sim)?;
    mux.mode_dut(false)?;

    assert_eq!(
        sim.state().expander_writes(),
        vec![
            // take-over: latch the pull-resistor state, then drive bits 0..5
            (OUTPUT, 0x09),
            (CONFIG, 0xC0),
            // disconnect
            (OUTPUT, 0x0E),
            // select DUT while still disabled, then enable
            (OUTPUT, 0x0F),
            (OUTPUT, 0x09),
        ]
    );
    assert_eq!(mux.get_mode()?, Mode::Dut);
    Ok(())
}

#[test]
fn test_fast_leaves_configured_expander_alone() -> Result<()> {
    let sim = SimTransport::fast();
    {
        let mut st = sim.state_mut();
        st.config = 0xC0;
        st.output = 0x0B;
    }
    let _mux = fast_mux(&sim)?;

    let st = sim.state();
    assert_eq!(st.log.len(), 1);
    assert_eq!(st.log[0].cdb[1], USB2642_I2C_WRITE_READ_STREAM);
    assert_eq!((st.config, st.output), (0xC0, 0x0B));
    Ok(())
}

#[test]
fn test_fast_user_gpio_low_then_high() -> Result<()> {
    let sim = SimTransport::fast();
    let mut mux = fast_mux(&sim)?;
    let control_before = sim.state().output & 0x0F;
    sim.clear_log();

    mux.gpio_set_low(0)?;
    {
        let st = sim.state();
        // read-modify-write of the output register
        assert_eq!(st.log.len(), 2);
        assert_eq!(st.log[0].cdb[7], OUTPUT);
        assert_eq!(st.expander_writes(), vec![(OUTPUT, control_before | 0x10)]);
        assert_eq!(st.output & 0x0F, control_before);
    }
    assert_eq!(mux.gpio_get(0)?, GpioLevel::Low);
    assert_eq!(mux.gpio_get(1)?, GpioLevel::High);

    mux.gpio_set_high(0)?;
    assert_eq!(sim.state().output & 0x10, 0);
    assert_eq!(mux.gpio_get(0)?, GpioLevel::High);
    Ok(())
}

#[test]
fn test_fast_mode_changes_keep_user_gpios() -> Result<()> {
    let sim = SimTransport::fast();
    let mut mux = fast_mux(&sim)?;
    mux.gpio_set_low(1)?;

    mux.mode_host(false)?;
    assert_eq!(sim.state().output, 0x20);
    mux.mode_dut(false)?;
    assert_eq!(sim.state().output, 0x29);
    mux.mode_disconnect(false)?;
    assert_eq!(sim.state().output, 0x2E);
    assert_eq!(mux.gpio_get(1)?, GpioLevel::Low);
    Ok(())
}

#[test]
fn test_fast_unknown_gpio() -> Result<()> {
    let sim = SimTransport::fast();
    let mut mux = fast_mux(&sim)?;
    sim.clear_log();

    assert!(matches!(mux.gpio_get(2), Err(MuxError::UnknownGpio(2))));
    assert!(matches!(mux.gpio_set_low(7), Err(MuxError::UnknownGpio(7))));
    assert!(sim.state().log.is_empty());
    Ok(())
}

#[test]
fn test_classic_sequences() -> Result<()> {
    let sim = SimTransport::classic();
    let mut mux = ClassicMux::new(sim.clone());
    assert!(sim.state().log.is_empty());

    mux.mode_dut(false)?;
    assert_eq!(
        sim.state().expander_writes(),
        vec![(OUTPUT, 0x0B), (CONFIG, 0xF0), (OUTPUT, 0x0F), (OUTPUT, 0x0C)]
    );
    assert_eq!(mux.get_mode()?, Mode::Dut);

    sim.clear_log();
    mux.mode_host(false)?;
    assert_eq!(
        sim.state().expander_writes(),
        vec![(OUTPUT, 0x0B), (CONFIG, 0xF0), (OUTPUT, 0x00)]
    );
    assert_eq!(mux.get_mode()?, Mode::Host);
    Ok(())
}

#[test]
fn test_classic_has_no_user_gpios() {
    let sim = SimTransport::classic();
    let mut mux = ClassicMux::new(sim.clone());
    assert!(matches!(
        mux.gpio_get(0),
        Err(MuxError::UnsupportedOperation("gpio_get"))
    ));
    assert!(matches!(
        mux.gpio_set_high(0),
        Err(MuxError::UnsupportedOperation(_))
    ));
    assert!(sim.state().log.is_empty());
}

#[test]
fn test_disconnect_is_idempotent() -> Result<()> {
    let muxes: [(SimTransport, MuxVariant); 2] = [
        (SimTransport::classic(), MuxVariant::Classic),
        (SimTransport::fast(), MuxVariant::Fast),
    ];
    for (sim, variant) in muxes {
        let mut mux = open(variant, sim.clone())?;
        mux.mode_disconnect(false)?;
        let once = {
            let st = sim.state();
            (st.output, st.config, st.polarity)
        };
        mux.mode_disconnect(false)?;
        let st = sim.state();
        assert_eq!((st.output, st.config, st.polarity), once, "{variant}");
    }
    Ok(())
}

#[test]
fn test_mode_projection_after_each_transition() -> Result<()> {
    for variant in [MuxVariant::Classic, MuxVariant::Fast] {
        let sim = match variant {
            MuxVariant::Classic => SimTransport::classic(),
            MuxVariant::Fast => SimTransport::fast(),
        };
        let mut mux: AnyMux<SimTransport> = open(variant, sim)?;
        assert_eq!(mux.variant(), variant);

        for mode in [Mode::Host, Mode::Dut, Mode::Off, Mode::Dut, Mode::Host, Mode::Off] {
            mux.set_mode(mode, false)?;
            assert_eq!(mux.get_mode()?, mode, "{variant} after {mode}");
        }
    }
    Ok(())
}

#[test]
fn test_card_info_requires_host_mode() -> Result<()> {
    let sim = SimTransport::fast().with_card(SCR, CID, CSD)?;
    let mut mux = fast_mux(&sim)?;
    mux.mode_dut(false)?;
    sim.clear_log();

    assert!(matches!(mux.get_card_info(), Err(MuxError::NotInHostMode)));
    assert_eq!(sim.state().count_action(USB2642_SD_REGISTER_READ), 0);
    Ok(())
}

#[test]
fn test_card_info_in_host_mode() -> Result<()> {
    let sim = SimTransport::classic().with_card(SCR, CID, CSD)?;
    let mut mux = ClassicMux::new(sim.clone());
    mux.mode_host(false)?;
    sim.clear_log();

    let info = mux.get_card_info()?;
    let order: Vec<u8> = sim
        .state()
        .log
        .iter()
        .filter(|s| s.cdb[1] == USB2642_SD_REGISTER_READ)
        .map(|s| s.cdb[2])
        .collect();
    assert_eq!(order, vec![51, 10, 9]);

    assert_eq!(info.scr.raw, SCR);
    assert_eq!(info.csd.reg, "CSD_20");
    assert_eq!(
        info.cid.field("MID").and_then(|f| f.enum_value.clone()),
        Some(Some(EnumValue::Text("SanDisk")))
    );
    let lines = info.text_lines();
    assert_eq!(lines[0], format!("CSD_20 Register Value: {CSD}"));
    Ok(())
}

#[test]
fn test_transport_errors_propagate() -> Result<()> {
    let sim = SimTransport::classic();
    let mut mux = ClassicMux::new(sim.clone());
    sim.state_mut().fail_status = Some(0x02);

    assert!(matches!(
        mux.mode_host(false),
        Err(MuxError::I2cTransactionFailed { status: 0x02, .. })
    ));
    // no retries
    assert_eq!(sim.state().log.len(), 1);
    Ok(())
}

#[test]
fn test_timed_out_bridge_is_not_read_as_host_mode() -> Result<()> {
    let sim = SimTransport::fast().with_card(SCR, CID, CSD)?;
    let mut mux = fast_mux(&sim)?;
    mux.mode_host(false)?;
    sim.state_mut().timed_out = true;
    sim.clear_log();

    assert!(matches!(
        mux.get_mode(),
        Err(MuxError::TransportAborted { host_status: 0x03, .. })
    ));
    assert!(matches!(
        mux.get_card_info(),
        Err(MuxError::TransportAborted { .. })
    ));
    assert_eq!(sim.state().count_action(USB2642_SD_REGISTER_READ), 0);
    Ok(())
}
