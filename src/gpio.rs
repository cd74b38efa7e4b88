// Copyright © 2026 Rudis Laboratories LLC

use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tokio_gpiod::{Chip, Options};

use crate::error::{Error, Result};
use crate::profile::PinRef;

const CONSUMER: &str = "clab-gateway";

/// How a GPIO line is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum GpioBackend {
    /// `/dev/gpiochipN` character device, addressed by chip and line offset
    Chardev { chip: PathBuf, line: u32 },
    /// legacy `/sys/class/gpio`, addressed by global GPIO number
    Sysfs { number: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

fn check_level(level: u8) -> Result<()> {
    if level > 1 {
        return Err(Error::InvalidParameter(format!("GPIO level {level}")));
    }
    Ok(())
}

// the chardev API is async; a single request does not need more than a current-thread runtime
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

/// Read one line through the character device
pub(crate) fn chardev_read(chip: &Path, line: u32) -> Result<u8> {
    let values = block_on(async {
        let chip = Chip::new(chip).await?;
        let lines = chip
            .request_lines(Options::input([line]).consumer(CONSUMER))
            .await?;
        lines.get_values([false]).await
    })?
    .map_err(|e| Error::Gpio {
        line: format!("{}:{}", chip.display(), line),
        action: "read",
        source: e,
    })?;
    Ok(values[0] as u8)
}

/// Drive one line through the character device. The kernel keeps the level after release
/// unless another consumer claims the line.
pub(crate) fn chardev_write(chip: &Path, line: u32, level: u8) -> Result<()> {
    check_level(level)?;
    let value = level == 1;
    block_on(async {
        let chip = Chip::new(chip).await?;
        let lines = chip
            .request_lines(Options::output([line]).consumer(CONSUMER).values([value]))
            .await?;
        lines.set_values([value]).await
    })?
    .map_err(|e| Error::Gpio {
        line: format!("{}:{}", chip.display(), line),
        action: "write",
        source: e,
    })?;
    Ok(())
}

/// Legacy sysfs GPIO under `base` (normally `/sys/class/gpio`)
#[derive(Debug, Clone)]
pub(crate) struct SysfsGpio {
    base: PathBuf,
}

impl SysfsGpio {
    pub(crate) fn new(base: PathBuf) -> SysfsGpio {
        SysfsGpio { base }
    }

    fn line_dir(&self, number: u32) -> PathBuf {
        self.base.join(format!("gpio{number}"))
    }

    fn fail(number: u32, action: &'static str) -> impl FnOnce(std::io::Error) -> Error {
        move |source| Error::Gpio {
            line: format!("gpio{number}"),
            action,
            source,
        }
    }

    /// Export the line if the kernel has not created its directory yet
    fn ensure_exported(&self, number: u32) -> Result<()> {
        let line_dir = self.line_dir(number);
        if line_dir.exists() {
            return Ok(());
        }
        debug!("exporting GPIO {}", number);
        fs::write(self.base.join("export"), number.to_string())
            .map_err(Self::fail(number, "export"))?;
        if !line_dir.exists() {
            // udev may still be creating the directory
            thread::sleep(Duration::from_millis(100));
        }
        Ok(())
    }

    fn direction(&self, number: u32) -> Option<String> {
        fs::read_to_string(self.line_dir(number).join("direction"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn set_direction(&self, number: u32, direction: Direction) -> Result<()> {
        fs::write(self.line_dir(number).join("direction"), direction.as_str())
            .map_err(Self::fail(number, "set direction"))
    }

    pub(crate) fn read(&self, number: u32) -> Result<u8> {
        let value = self.line_dir(number).join("value");
        if !value.exists() {
            self.ensure_exported(number)?;
            self.set_direction(number, Direction::In)?;
        }
        let text = fs::read_to_string(&value).map_err(Self::fail(number, "read"))?;
        text.trim()
            .parse()
            .map_err(|e| Error::Parse(format!("{}: {}", value.display(), e)))
    }

    pub(crate) fn write(&self, number: u32, level: u8) -> Result<()> {
        check_level(level)?;
        self.ensure_exported(number)?;
        if self.direction(number).as_deref() != Some(Direction::Out.as_str()) {
            self.set_direction(number, Direction::Out)?;
        }
        fs::write(self.line_dir(number).join("value"), level.to_string())
            .map_err(Self::fail(number, "write"))
    }
}

/// Read a line on whichever backend was selected for it
pub(crate) fn read_line(backend: &GpioBackend, sysfs: &SysfsGpio) -> Result<u8> {
    match backend {
        GpioBackend::Chardev { chip, line } => chardev_read(chip, *line),
        GpioBackend::Sysfs { number } => sysfs.read(*number),
    }
}

pub(crate) fn write_line(
    backend: &GpioBackend,
    sysfs: &SysfsGpio,
    pin: &PinRef,
    level: u8,
) -> Result<()> {
    match backend {
        GpioBackend::Chardev { chip, line } => chardev_write(chip, *line, level)?,
        GpioBackend::Sysfs { number } => sysfs.write(*number, level)?,
    }
    info!("GPIO {} set to {} via {:?}", pin, level, backend);
    Ok(())
}
