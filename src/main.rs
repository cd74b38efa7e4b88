// Copyright © 2026 Rudis Laboratories LLC

use anyhow::{Context, Error, Result};
use clap::{Parser, Subcommand};
use log::{debug, error, info, warn, LevelFilter};
use serde::Serialize;
use serde_json::json;
use simplelog::{ColorChoice, Config, SimpleLogger, TermLogger, TerminalMode};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;

use clab_gateway::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// hardware model (auto-detected if not given)
    #[arg(short, long)]
    model: Option<String>,

    /// root of the sysfs/procfs tree
    #[arg(long, default_value = "/")]
    sysfs_root: PathBuf,

    /// verbose mode
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by all commands
struct GatewaySpecs {
    model: Option<String>,
    sysfs_root: PathBuf,
}

impl From<&Cli> for GatewaySpecs {
    fn from(cli: &Cli) -> GatewaySpecs {
        GatewaySpecs {
            model: cli.model.clone(),
            sysfs_root: cli.sysfs_root.clone(),
        }
    }
}

impl GatewaySpecs {
    fn platform(&self) -> SysfsPlatform {
        SysfsPlatform::new(&self.sysfs_root)
    }

    fn profile(&self) -> &'static HardwareProfile {
        match &self.model {
            Some(model) => resolve_str(model).profile(),
            None => resolve(detect(&self.platform()).model()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    // ============== Hardware ==============
    /// identify the gateway model
    Detect,

    /// show the pin and port layout of the model
    Profile,

    /// summarize inputs, outputs and features of the model
    Capabilities,

    // ============== GPIO ==============
    /// read a digital input
    Input {
        /// input name, e.g. IN0
        name: String,
    },

    /// set a digital output
    Output {
        /// output name, e.g. OUT0
        name: String,

        /// level (0 or 1)
        value: u8,
    },

    /// set the user LED colour (off, green, yellow, orange)
    Led { color: String },

    // ============== Serial ==============
    /// list the model's serial ports and whether they exist
    Ports,

    /// open a serial port to check that it is usable
    Open {
        /// port name from the profile or a device path
        port: String,

        /// baudrate
        #[arg(short, long, default_value_t = 115_200)]
        baudrate: u32,

        /// timeout in msec
        #[arg(short, long, default_value_t = 1000)]
        timeout_ms: u32,
    },

    /// switch the back-panel port between RS232 and RS485
    UartMode { mode: String },

    // ============== System ==============
    /// read the SoC temperature from the thermal zone
    SocTemp,

    // ============== CAN ==============
    /// parse candump output from stdin, e.g. `candump can0 | clab-gateway candump`
    Candump,

    // ============== Analog ==============
    /// list IIO analog channels
    Analog,

    /// read and convert a live analog channel
    Measure {
        /// current, voltage, pt100 or pt1000
        #[arg(short, long, default_value = "current")]
        kind: String,

        /// IIO device index
        #[arg(short, long, default_value_t = 0)]
        device: usize,

        /// channel index on the device
        #[arg(short, long, default_value_t = 0)]
        channel: usize,

        /// full-scale voltage of a voltage input
        #[arg(long, default_value_t = 10.0)]
        max_voltage: f64,

        /// scaled value at 0 % (4 mA / 0 V)
        #[arg(long)]
        min: Option<f64>,

        /// scaled value at 100 % (20 mA / max voltage)
        #[arg(long)]
        max: Option<f64>,

        /// unit of the scaled value
        #[arg(long, default_value = "")]
        unit: String,

        /// decimals of the scaled value
        #[arg(long, default_value_t = 2)]
        decimals: u32,
    },

    /// convert a raw current-loop code to mA
    Current {
        #[arg(allow_negative_numbers = true)]
        raw: i64,
        #[arg(long)]
        scale: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<f64>,
    },

    /// convert a raw voltage code to V
    Voltage {
        #[arg(allow_negative_numbers = true)]
        raw: i64,
        #[arg(long)]
        scale: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<f64>,
        #[arg(long, default_value_t = 10.0)]
        max_voltage: f64,
    },

    /// convert a raw RTD code to a temperature
    Temperature {
        #[arg(allow_negative_numbers = true)]
        raw: i64,
        #[arg(long)]
        scale: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<f64>,
        /// PT100 or PT1000
        #[arg(long, default_value = "PT100")]
        sensor: String,
    },

    /// map a percentage onto a range
    Rescale {
        percent: f64,
        #[arg(allow_negative_numbers = true)]
        min: f64,
        #[arg(allow_negative_numbers = true)]
        max: f64,
        #[arg(long, default_value_t = 2)]
        decimals: u32,
    },

    // ============== Network ==============
    /// prefix length to netmask
    Netmask { cidr: u8 },

    /// netmask to prefix length
    Cidr { netmask: String },

    /// RSSI in dBm to percent
    Signal {
        #[arg(allow_negative_numbers = true)]
        dbm: i32,
    },

    /// LTE RSRP in dBm to quality and tier
    Rsrp {
        #[arg(allow_negative_numbers = true)]
        rsrp: f64,
    },

    // ============== GPS ==============
    /// great-circle distance in meters
    Distance {
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lon1: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        #[arg(allow_negative_numbers = true)]
        lon2: f64,
    },

    /// format a coordinate
    Coords {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// decimal or dms
        #[arg(short, long, default_value = "decimal")]
        format: String,
    },
}

fn main() {
    // parse command line arguments
    let cli = Cli::parse();

    // initialize the logger with the desired level filter based on the verbose flag
    let level_filter = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level_filter,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .unwrap_or_else(|_| SimpleLogger::init(LevelFilter::Info, Default::default()).unwrap());

    let specs = GatewaySpecs::from(&cli);

    // show error, if failed
    if let Err(e) = execute_command(&cli.command, &specs) {
        error!("Error: {:#}", e);
        process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn warn_shared(profile: &HardwareProfile, label: &str) {
    for other in profile.shares_with(label) {
        warn!("{} shares its line with {} on {}", label, other, profile.model);
    }
}

fn execute_command(command: &Commands, specs: &GatewaySpecs) -> Result<(), Error> {
    match command {
        // ============== Hardware ==============
        Commands::Detect => {
            let detection = detect(&specs.platform());
            print_json(&json!({
                "model": detection.model(),
                "detection": detection,
            }))
        }

        Commands::Profile => print_json(specs.profile()),

        Commands::Capabilities => print_json(&specs.profile().capabilities()),

        // ============== GPIO ==============
        Commands::Input { name } => {
            let profile = specs.profile();
            let pin = profile.input(name)?;
            let platform = specs.platform();
            let value = platform.read_gpio(&pin)?;
            print_json(&json!({
                "input": name,
                "pin": pin,
                "backend": platform.gpio_backend(&pin),
                "value": value,
            }))
        }

        Commands::Output { name, value } => {
            let profile = specs.profile();
            let pin = profile.output(name)?;
            warn_shared(profile, name);
            let platform = specs.platform();
            platform.write_gpio(&pin, *value)?;
            print_json(&json!({
                "output": name,
                "pin": pin,
                "backend": platform.gpio_backend(&pin),
                "value": value,
            }))
        }

        Commands::Led { color } => {
            let profile = specs.profile();
            let color: LedColor = color.parse()?;
            let leds = profile.leds.ok_or_else(|| {
                anyhow::anyhow!("LED not supported on {}", profile.model)
            })?;
            warn_shared(profile, "led_green");
            warn_shared(profile, "led_yellow");
            let platform = specs.platform();
            for (pin, on) in leds.levels(color) {
                platform.write_gpio(&pin, on as u8)?;
            }
            print_json(&json!({ "color": color, "model": profile.model }))
        }

        // ============== Serial ==============
        Commands::Ports => {
            let profile = specs.profile();
            print_json(&port_status(profile, &available_devices()))
        }

        Commands::Open {
            port,
            baudrate,
            timeout_ms,
        } => {
            let device = resolve_port(specs.profile(), port)?;
            let serial = SerialSpecs {
                device: device.clone(),
                baudrate: *baudrate,
                timeout_ms: *timeout_ms,
            };
            let handle = open_port(&serial)
                .with_context(|| format!("failed to open serial port {device}"))?;
            print_json(&json!({
                "device": device,
                "baudrate": handle.baud_rate()?,
                "bytes_to_read": handle.bytes_to_read()?,
            }))
        }

        Commands::UartMode { mode } => {
            let profile = specs.profile();
            let mode: UartMode = mode.parse()?;
            let (pin, level) = mode_switch_level(profile, mode)?;
            let platform = specs.platform();
            platform.write_gpio(&pin, level)?;
            info!("{} back panel set to {:?}", profile.model, mode);
            print_json(&json!({
                "mode": mode,
                "model": profile.model,
                "pin": pin,
                "backend": platform.gpio_backend(&pin),
            }))
        }

        // ============== System ==============
        Commands::SocTemp => print_json(&specs.platform().soc_temperature()?),

        // ============== CAN ==============
        Commands::Candump => {
            let profile = specs.profile();
            if !profile.has_can {
                warn!("{} has no CAN interface in its profile", profile.model);
            }
            for line in io::stdin().lock().lines() {
                let line = line.context("failed to read candump output")?;
                match parse_candump_line(&line) {
                    Some(frame) => println!("{}", serde_json::to_string(&frame)?),
                    None => debug!("skipping {:?}", line),
                }
            }
            Ok(())
        }

        // ============== Analog ==============
        Commands::Analog => print_json(&specs.platform().scan_iio()?),

        Commands::Measure {
            kind,
            device,
            channel,
            max_voltage,
            min,
            max,
            unit,
            decimals,
        } => {
            let profile = specs.profile();
            if !profile.has_analog {
                warn!("{} has no analog inputs in its profile", profile.model);
            }
            let devices = specs.platform().scan_iio()?;
            let dev = devices.get(*device).ok_or_else(|| {
                anyhow::anyhow!("device {} not found, available: {}", device, devices.len())
            })?;
            let chan = dev.channels.get(*channel).ok_or_else(|| {
                anyhow::anyhow!("channel {} not found on device {}", channel, device)
            })?;
            let raw = read_raw(chan)?;
            let calibration = chan.calibration()?;

            if let Ok(sensor) = kind.parse::<SensorType>() {
                return print_json(&raw_to_celsius(raw, &calibration, sensor)?);
            }
            let reading = match kind.parse::<InputKind>()? {
                InputKind::Current => raw_to_current_ma(raw, &calibration)?,
                InputKind::Voltage => raw_to_voltage(raw, &calibration, *max_voltage)?,
            };
            match (min, max) {
                (Some(min), Some(max)) => print_json(&reading.rescale(&ScaleRange {
                    min: *min,
                    max: *max,
                    unit: unit.clone(),
                    decimals: *decimals,
                })?),
                _ => print_json(&reading),
            }
        }

        Commands::Current { raw, scale, offset } => {
            let calibration = Calibration::from_parts(*scale, *offset)?;
            print_json(&raw_to_current_ma(*raw, &calibration)?)
        }

        Commands::Voltage {
            raw,
            scale,
            offset,
            max_voltage,
        } => {
            let calibration = Calibration::from_parts(*scale, *offset)?;
            print_json(&raw_to_voltage(*raw, &calibration, *max_voltage)?)
        }

        Commands::Temperature {
            raw,
            scale,
            offset,
            sensor,
        } => {
            let calibration = Calibration::from_parts(*scale, *offset)?;
            let reading = raw_to_celsius(*raw, &calibration, sensor.parse()?)?;
            if reading.approximate {
                warn!("uncalibrated RTD input, linear approximation used");
            }
            print_json(&reading)
        }

        Commands::Rescale {
            percent,
            min,
            max,
            decimals,
        } => print_json(&json!({ "scaled": rescale(*percent, *min, *max, *decimals)? })),

        // ============== Network ==============
        Commands::Netmask { cidr } => {
            print_json(&json!({ "cidr": cidr, "netmask": cidr_to_netmask(*cidr)? }))
        }

        Commands::Cidr { netmask } => {
            print_json(&json!({ "netmask": netmask, "cidr": netmask_to_cidr(netmask)? }))
        }

        Commands::Signal { dbm } => {
            print_json(&json!({ "dbm": dbm, "percent": dbm_to_percent(*dbm) }))
        }

        Commands::Rsrp { rsrp } => print_json(&json!({
            "rsrp": rsrp,
            "quality": rsrp_quality(*rsrp),
            "rating": SignalTier::from_rsrp(*rsrp).as_str(),
        })),

        // ============== GPS ==============
        Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            let meters = haversine_distance(
                &Coordinate::new(*lat1, *lon1),
                &Coordinate::new(*lat2, *lon2),
            );
            print_json(&json!({ "meters": meters, "kilometers": meters / 1000.0 }))
        }

        Commands::Coords { lat, lon, format } => {
            let text = format_coordinates(&Coordinate::new(*lat, *lon), format.parse()?);
            print_json(&json!({ "coordinates": text }))
        }
    }
}
