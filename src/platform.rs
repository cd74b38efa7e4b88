// Copyright © 2026 Rudis Laboratories LLC

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analog::AnalogChannelDescriptor;
use crate::detect::{IdentitySource, PlatformReader};
use crate::error::{Error, Result};
use crate::gpio::{self, GpioBackend, SysfsGpio};
use crate::profile::PinRef;

lazy_static! {
    static ref RAW_CHANNEL_RE: Regex = Regex::new(r"^(in_voltage\d+|in_current\d*)_raw$").unwrap();
}

/// Linux sysfs/procfs access rooted at `root` (normally `/`)
#[derive(Debug, Clone)]
pub struct SysfsPlatform {
    pub root: PathBuf,
}

impl Default for SysfsPlatform {
    fn default() -> Self {
        SysfsPlatform {
            root: PathBuf::from("/"),
        }
    }
}

impl PlatformReader for SysfsPlatform {
    fn read_identity(&self, source: IdentitySource) -> Option<String> {
        let path = self.root.join(source.path());
        match fs::read(&path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                debug!("cannot read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// SoC temperature from the first readable thermal zone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocTemperature {
    pub zone: PathBuf,
    pub celsius: f64,
    pub fahrenheit: f64,
}

const THERMAL_ZONES: [&str; 2] = [
    "sys/class/thermal/thermal_zone0/temp",
    "sys/devices/virtual/thermal/thermal_zone0/temp",
];

/// One IIO device with its input channels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalogDevice {
    pub id: String,
    pub name: Option<String>,
    pub path: PathBuf,
    pub channels: Vec<AnalogChannelDescriptor>,
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn read_f64(path: &Path) -> Option<f64> {
    let text = read_trimmed(path)?;
    match text.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring unparsable {}: {:?}", path.display(), text);
            None
        }
    }
}

impl SysfsPlatform {
    pub fn new(root: impl Into<PathBuf>) -> SysfsPlatform {
        SysfsPlatform { root: root.into() }
    }

    pub fn iio_dir(&self) -> PathBuf {
        self.root.join("sys/bus/iio/devices")
    }

    pub fn gpio_dir(&self) -> PathBuf {
        self.root.join("sys/class/gpio")
    }

    /// List IIO devices and their raw input channels. Devices without input channels
    /// or with unreadable directories are left out.
    pub fn scan_iio(&self) -> Result<Vec<AnalogDevice>> {
        let dir = self.iio_dir();
        if !dir.is_dir() {
            debug!("no IIO bus at {}", dir.display());
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("iio:device"))
            .collect();
        ids.sort();

        let mut devices = Vec::new();
        for id in ids {
            let path = dir.join(&id);
            match scan_device(&id, &path) {
                Ok(device) if !device.channels.is_empty() => devices.push(device),
                Ok(_) => debug!("{} has no input channels", id),
                Err(e) => warn!("skipping {}: {}", path.display(), e),
            }
        }
        info!("found {} IIO device(s)", devices.len());
        Ok(devices)
    }

    /// Read the SoC temperature; the kernel reports millidegrees Celsius
    pub fn soc_temperature(&self) -> Result<SocTemperature> {
        let zone = THERMAL_ZONES
            .iter()
            .map(|rel| self.root.join(rel))
            .find(|path| path.exists())
            .ok_or_else(|| Error::NotSupported("no thermal zone found".to_string()))?;
        let text = fs::read_to_string(&zone)?;
        let millidegrees: i64 = text
            .trim()
            .parse()
            .map_err(|e| Error::Parse(format!("{}: {:?}: {}", zone.display(), text.trim(), e)))?;
        let celsius = millidegrees as f64 / 1000.0;
        Ok(SocTemperature {
            zone,
            celsius,
            fahrenheit: celsius * 9.0 / 5.0 + 32.0,
        })
    }

    /// Character device of a GPIO chip, when the system has one
    pub fn gpiochip_path(&self, chip: u32) -> PathBuf {
        self.root.join(format!("dev/gpiochip{chip}"))
    }

    /// The chardev interface is used when `/dev/gpiochipN` exists, sysfs otherwise
    pub fn gpio_backend(&self, pin: &PinRef) -> GpioBackend {
        let chip = self.gpiochip_path(pin.chip);
        if chip.exists() {
            GpioBackend::Chardev {
                chip,
                line: pin.line,
            }
        } else {
            debug!("{} not present, using sysfs for {}", chip.display(), pin);
            GpioBackend::Sysfs {
                number: pin.sysfs_number(),
            }
        }
    }

    /// Drive a GPIO line, exporting and configuring it as output on sysfs if needed
    pub fn write_gpio(&self, pin: &PinRef, level: u8) -> Result<()> {
        let sysfs = SysfsGpio::new(self.gpio_dir());
        gpio::write_line(&self.gpio_backend(pin), &sysfs, pin, level)
    }

    /// Read a GPIO line, exporting it as input on sysfs if it is not exported yet
    pub fn read_gpio(&self, pin: &PinRef) -> Result<u8> {
        let sysfs = SysfsGpio::new(self.gpio_dir());
        gpio::read_line(&self.gpio_backend(pin), &sysfs)
    }
}

fn scan_device(id: &str, path: &Path) -> Result<AnalogDevice> {
    let mut files: Vec<String> = fs::read_dir(path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();

    let channels = files
        .iter()
        .filter_map(|file| RAW_CHANNEL_RE.captures(file))
        .map(|caps| {
            let channel = caps[1].to_string();
            let scale_file = format!("{channel}_scale");
            let offset_file = format!("{channel}_offset");
            AnalogChannelDescriptor {
                device: id.to_string(),
                raw_value_path: path.join(&caps[0]),
                scale: files
                    .contains(&scale_file)
                    .then(|| read_f64(&path.join(&scale_file)))
                    .flatten(),
                offset: files
                    .contains(&offset_file)
                    .then(|| read_f64(&path.join(&offset_file)))
                    .flatten(),
                channel_name: channel,
            }
        })
        .collect();

    Ok(AnalogDevice {
        id: id.to_string(),
        name: read_trimmed(&path.join("name")),
        path: path.to_path_buf(),
        channels,
    })
}

/// Read the raw ADC code of a channel
pub fn read_raw(channel: &AnalogChannelDescriptor) -> Result<i64> {
    let text = fs::read_to_string(&channel.raw_value_path)?;
    text.trim().parse().map_err(|e| {
        Error::Parse(format!(
            "{}: {:?}: {}",
            channel.raw_value_path.display(),
            text.trim(),
            e
        ))
    })
}
