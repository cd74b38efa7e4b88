// Copyright © 2026 Rudis Laboratories LLC

use log::{debug, info};
use serde::Serialize;
use serialport::SerialPort;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::profile::{HardwareProfile, PinRef};

#[derive(Debug, Clone)]
pub struct SerialSpecs {
    pub device: String,
    pub baudrate: u32,
    pub timeout_ms: u32,
}

impl Default for SerialSpecs {
    fn default() -> Self {
        SerialSpecs {
            device: String::new(),
            baudrate: 115_200,
            timeout_ms: 1000,
        }
    }
}

/// Device path of a logical port name (`backpanel`, `rs485_a`, ...) or a path given as is
pub fn resolve_port(profile: &HardwareProfile, name: &str) -> Result<String> {
    if name.starts_with("/dev/") {
        return Ok(name.to_string());
    }
    let device = profile.serial_port(name)?;
    debug!("{} port '{}' is {}", profile.model, name, device);
    Ok(device.to_string())
}

pub fn open_port(specs: &SerialSpecs) -> Result<Box<dyn SerialPort>> {
    info!("opening {} at {} baud", specs.device, specs.baudrate);
    let port = serialport::new(&specs.device, specs.baudrate)
        .timeout(Duration::from_millis(specs.timeout_ms as u64))
        .open()?;
    Ok(port)
}

/// A profile port and whether the OS currently lists it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortStatus {
    pub name: &'static str,
    pub device: &'static str,
    pub present: bool,
}

/// Profile ports checked against a list of device paths known to the OS
pub fn port_status(profile: &HardwareProfile, available: &[String]) -> Vec<PortStatus> {
    profile
        .serial_ports
        .iter()
        .map(|(&name, &device)| PortStatus {
            name,
            device,
            present: available.iter().any(|a| a == device),
        })
        .collect()
}

/// Device paths the OS reports; enumeration failure yields an empty list
pub fn available_devices() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            debug!("error listing serial ports: {}", e);
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UartMode {
    Rs232,
    Rs485,
}

impl UartMode {
    /// Level of the mode-switch line selecting this mode
    pub fn level(&self) -> u8 {
        match self {
            UartMode::Rs232 => 0,
            UartMode::Rs485 => 1,
        }
    }
}

impl FromStr for UartMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rs232" => Ok(UartMode::Rs232),
            "rs485" => Ok(UartMode::Rs485),
            other => Err(Error::InvalidParameter(format!(
                "invalid mode: {other}, must be 'rs232' or 'rs485'"
            ))),
        }
    }
}

/// Line and level to drive for a UART mode
pub fn mode_switch_level(profile: &HardwareProfile, mode: UartMode) -> Result<(PinRef, u8)> {
    let pin = profile.mode_switch.ok_or_else(|| {
        Error::NotSupported(format!("{} has no RS232/RS485 mode switch", profile.model))
    })?;
    Ok((pin, mode.level()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{resolve, ModelId};

    #[test]
    fn test_resolve_port() {
        let profile = resolve(ModelId::IotLink);
        assert_eq!(resolve_port(profile, "rs485_a").unwrap(), "/dev/ttyLP6");
        assert_eq!(resolve_port(profile, "/dev/ttyS3").unwrap(), "/dev/ttyS3");
        assert!(matches!(
            resolve_port(profile, "backpanel"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_port_status() {
        let profile = resolve(ModelId::IotDinImx8Plus);
        let status = port_status(profile, &["/dev/ttymxc2".to_string()]);
        assert_eq!(
            status,
            vec![
                PortStatus {
                    name: "console",
                    device: "/dev/ttyUSB0",
                    present: false
                },
                PortStatus {
                    name: "rs485",
                    device: "/dev/ttymxc2",
                    present: true
                },
            ]
        );
    }

    #[test]
    fn test_mode_switch() {
        let (pin, level) = mode_switch_level(resolve(ModelId::IotGateImx8), UartMode::Rs485).unwrap();
        assert_eq!(pin.sysfs_number(), 507);
        assert_eq!(level, 1);
        assert_eq!("RS232".parse::<UartMode>().unwrap().level(), 0);
        assert!("rs422".parse::<UartMode>().is_err());
        assert!(matches!(
            mode_switch_level(resolve(ModelId::IotGateRpi), UartMode::Rs232),
            Err(Error::NotSupported(_))
        ));
    }
}
