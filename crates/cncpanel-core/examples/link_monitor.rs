//! Controller Link Monitor
//!
//! A terminal stand-in for the panel: opens the link, sends the startup
//! sequence, then polls at the panel frame rate and prints decoded events.
//!
//! Usage:
//!   cargo run --example link_monitor -- [OPTIONS] [PORT]
//!
//! Options:
//!   --port PORT       Serial port (default: platform default)
//!   --baud RATE       Baud rate (default: 115200)
//!   --config FILE     Load link settings from a JSON file
//!   --demo            Talk to the simulated controller instead of hardware
//!   --cycles N        Stop after N polls (default: run forever)
//!   --rate HZ         Polls per second (default: 60)
//!   --send BYTES      Command bytes to send after startup, e.g. "r++"
//!   --list            List serial ports and exit
//!
//! Set RUST_LOG=cncpanel_core=trace to see every byte.

use anyhow::{bail, Context, Result};
use cncpanel_core::prelude::*;
use cncpanel_core::protocol::list_ports;
use std::time::Duration;

struct Options {
    config: LinkConfig,
    demo: bool,
    cycles: Option<u64>,
    rate_hz: u64,
    send: Vec<MotionCommand>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Some(opts) = parse_args()? else {
        return Ok(());
    };

    println!("Configuration:");
    println!(
        "  Port:       {}",
        opts.config.port_name.as_deref().unwrap_or("<platform default>")
    );
    println!("  Baud rate:  {}", opts.config.baud_rate);
    println!("  Demo mode:  {}", opts.demo);
    println!("  Poll rate:  {} Hz", opts.rate_hz);
    println!();

    let demo = opts.demo.then(DemoController::new);
    let mut link = match &demo {
        Some(board) => {
            ControllerLink::with_port(PortHandle::from_channel(Box::new(board.clone())), &opts.config)
        }
        None => ControllerLink::open(&opts.config),
    };

    if !link.is_open() {
        eprintln!("Controller not connected on {}; continuing without it", link.port_name());
    }

    let mut readout = PanelReadout::new();
    link.initialize();
    for &cmd in &opts.send {
        link.send(cmd);
        readout.record_command(cmd);
        println!("-> {}", cmd);
    }

    let period = Duration::from_millis(1000 / opts.rate_hz.max(1));
    let mut polls = 0u64;
    loop {
        if let Some(board) = &demo {
            board.tick();
        }

        let events = link.poll_and_decode();
        if readout.apply(&events) {
            println!(
                "cycles {:>5}  position {:>8}",
                readout.cycles,
                readout
                    .position
                    .map_or_else(|| "-".to_string(), |p| p.to_string())
            );
        }

        polls += 1;
        if opts.cycles.is_some_and(|limit| polls >= limit) {
            break;
        }
        std::thread::sleep(period);
    }

    let stats = link.stats();
    println!();
    println!(
        "tx {} bytes ({} dropped), rx {} bytes in {} frames, {} events",
        stats.tx_bytes, stats.write_failures, stats.rx_bytes, stats.frames, stats.events
    );
    link.close();
    Ok(())
}

fn parse_args() -> Result<Option<Options>> {
    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<String> = None;
    let mut port_name: Option<String> = None;
    let mut baud_rate: Option<u32> = None;
    let mut opts = Options {
        config: LinkConfig::default(),
        demo: false,
        cycles: None,
        rate_hz: 60,
        send: Vec::new(),
    };

    let mut i = 1;
    while i < args.len() {
        let value = |i: usize| -> Result<&String> {
            args.get(i + 1)
                .with_context(|| format!("{} needs a value", args[i]))
        };
        match args[i].as_str() {
            "--port" | "-p" => {
                port_name = Some(value(i)?.clone());
                i += 1;
            }
            "--baud" | "-b" => {
                baud_rate = Some(value(i)?.parse().context("invalid baud rate")?);
                i += 1;
            }
            "--config" | "-c" => {
                config_path = Some(value(i)?.clone());
                i += 1;
            }
            "--cycles" | "-n" => {
                opts.cycles = Some(value(i)?.parse().context("invalid cycle count")?);
                i += 1;
            }
            "--rate" => {
                opts.rate_hz = value(i)?.parse().context("invalid poll rate")?;
                i += 1;
            }
            "--send" | "-s" => {
                for byte in value(i)?.bytes() {
                    match MotionCommand::from_wire_byte(byte) {
                        Some(cmd) => opts.send.push(cmd),
                        None => bail!("'{}' is not a command byte", byte as char),
                    }
                }
                i += 1;
            }
            "--demo" => opts.demo = true,
            "--list" => {
                for port in list_ports() {
                    println!("{}  {}", port.name, port.product.as_deref().unwrap_or(""));
                }
                return Ok(None);
            }
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            arg if !arg.starts_with('-') => port_name = Some(arg.to_string()),
            other => eprintln!("Unknown option: {}", other),
        }
        i += 1;
    }

    if let Some(path) = config_path {
        opts.config = LinkConfig::load(&path)
            .with_context(|| format!("loading config from {}", path))?;
    }
    if port_name.is_some() {
        opts.config.port_name = port_name;
    }
    if let Some(baud) = baud_rate {
        opts.config.baud_rate = baud;
    }
    opts.config.validate()?;

    Ok(Some(opts))
}

fn print_help() {
    println!("Controller Link Monitor");
    println!();
    println!("Usage: link_monitor [OPTIONS] [PORT]");
    println!();
    println!("Options:");
    println!("  --port, -p PORT     Serial port");
    println!("  --baud, -b RATE     Baud rate (default: 115200)");
    println!("  --config, -c FILE   JSON link settings");
    println!("  --demo              Use the simulated controller");
    println!("  --cycles, -n N      Stop after N polls");
    println!("  --rate HZ           Polls per second (default: 60)");
    println!("  --send, -s BYTES    Command bytes to send, e.g. \"r++\"");
    println!("  --list              List serial ports");
    println!("  --help, -h          Show this help");
}
