// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use usbsdmux::{
    cfg::{
        cli::{Args, Command, resolve_config_path},
        config::Config,
        enums::GpioAction,
        logger::{LoggerConfig, init_default_logger, init_logger, verbosity_level},
    },
    mux::{AnyMux, CardInfo, GpioLevel, Mode, UsbSdMux, autoselect},
    transport::sg::SgTransport,
};

/// What a command has to show.
enum Outcome {
    Switched,
    Mode(Mode),
    Gpio { gpio: u8, value: GpioLevel },
    GpioSet,
    Info(Box<CardInfo>),
}

/// JSON logger when the config file has a `logger:` section, plain stderr
/// logging otherwise.
fn setup_logging(config: Option<&str>, verbose: u8) -> Result<Option<WorkerGuard>> {
    if let Some(path) = config {
        let path = resolve_config_path(path)?;
        let path = path.to_string_lossy();
        if LoggerConfig::is_configured(&path)? {
            return init_logger(&path).map(Some);
        }
    }
    init_default_logger(verbosity_level(verbose))?;
    Ok(None)
}

fn load_config(config: Option<&str>) -> Result<Config> {
    match config {
        Some(path) => resolve_config_path(path)
            .and_then(Config::load_from_file)
            .context("failed to resolve or load config"),
        None => Ok(Config::default()),
    }
}

fn execute(mux: &mut AnyMux<SgTransport>, command: &Command, wait: bool) -> Result<Outcome> {
    Ok(match command {
        Command::Get => Outcome::Mode(mux.get_mode()?),
        Command::Dut => {
            mux.mode_dut(wait)?;
            Outcome::Switched
        },
        Command::Host => {
            mux.mode_host(wait)?;
            Outcome::Switched
        },
        Command::Off => {
            mux.mode_disconnect(wait)?;
            Outcome::Switched
        },
        Command::Gpio { gpio, action } => match action {
            GpioAction::Get => Outcome::Gpio {
                gpio: *gpio,
                value: mux.gpio_get(*gpio)?,
            },
            GpioAction::High => {
                mux.gpio_set_high(*gpio)?;
                Outcome::GpioSet
            },
            GpioAction::Low => {
                mux.gpio_set_low(*gpio)?;
                Outcome::GpioSet
            },
        },
        Command::Info => Outcome::Info(Box::new(mux.get_card_info()?)),
    })
}

fn run(args: &Args) -> Result<Outcome> {
    let config = load_config(args.config.as_deref())?;
    let mut mux = autoselect(&args.sg, &config)?;
    info!(sg = %args.sg.display(), variant = %mux.variant(), command = ?args.command, "opened mux");
    execute(&mut mux, &args.command, config.runtime.disconnect_wait)
}

fn print(outcome: &Outcome, as_json: bool) -> Result<()> {
    match (outcome, as_json) {
        (Outcome::Switched | Outcome::GpioSet, _) => {},
        (Outcome::Mode(mode), false) => println!("{mode}"),
        (Outcome::Mode(mode), true) => println!("{}", json!({ "mode": mode })),
        (Outcome::Gpio { value, .. }, false) => println!("{value}"),
        (Outcome::Gpio { gpio, value }, true) => {
            println!("{}", json!({ "gpio": gpio, "value": value }))
        },
        (Outcome::Info(card), false) => {
            for line in card.text_lines() {
                println!("{line}");
            }
        },
        (Outcome::Info(card), true) => println!(
            "{}",
            serde_json::to_string(card).context("failed to serialize card info")?
        ),
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = setup_logging(args.config.as_deref(), args.verbose).and_then(|guard| {
        let outcome = run(&args)?;
        print(&outcome, args.json)?;
        drop(guard);
        Ok(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if args.json {
                println!("{}", json!({ "error-message": format!("{e:#}") }));
            } else {
                eprintln!("{e:#}");
            }
            ExitCode::FAILURE
        },
    }
}
