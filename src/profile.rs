// Copyright © 2026 Rudis Laboratories LLC

use lazy_static::lazy_static;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Supported CompuLab gateway models
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum ModelId {
    #[serde(rename = "IOT-GATE-iMX8")]
    IotGateImx8,
    #[serde(rename = "SBC-IOT-iMX8")]
    SbcIotImx8,
    #[serde(rename = "IOT-GATE-IMX8PLUS")]
    IotGateImx8Plus,
    #[serde(rename = "SBC-IOT-IMX8PLUS")]
    SbcIotImx8Plus,
    #[serde(rename = "IOT-DIN-IMX8PLUS")]
    IotDinImx8Plus,
    #[serde(rename = "IOT-LINK")]
    IotLink,
    #[serde(rename = "IOT-GATE-RPi")]
    IotGateRpi,
}

impl ModelId {
    pub const ALL: [ModelId; 7] = [
        ModelId::IotGateImx8,
        ModelId::SbcIotImx8,
        ModelId::IotGateImx8Plus,
        ModelId::SbcIotImx8Plus,
        ModelId::IotDinImx8Plus,
        ModelId::IotLink,
        ModelId::IotGateRpi,
    ];

    /// Model assumed when nothing better is known
    pub const DEFAULT: ModelId = ModelId::IotGateImx8;

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::IotGateImx8 => "IOT-GATE-iMX8",
            ModelId::SbcIotImx8 => "SBC-IOT-iMX8",
            ModelId::IotGateImx8Plus => "IOT-GATE-IMX8PLUS",
            ModelId::SbcIotImx8Plus => "SBC-IOT-IMX8PLUS",
            ModelId::IotDinImx8Plus => "IOT-DIN-IMX8PLUS",
            ModelId::IotLink => "IOT-LINK",
            ModelId::IotGateRpi => "IOT-GATE-RPi",
        }
    }
}

impl Default for ModelId {
    fn default() -> Self {
        ModelId::DEFAULT
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        ModelId::ALL
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::InvalidParameter(format!("unknown model identifier: {s}")))
    }
}

/// One GPIO line, addressed as chip/line for the character device interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct PinRef {
    pub chip: u32,
    pub line: u32,
    /// silkscreen pin on the connector, informational only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_pin: Option<u8>,
}

impl PinRef {
    pub const fn new(chip: u32, line: u32) -> PinRef {
        PinRef {
            chip,
            line,
            physical_pin: None,
        }
    }

    pub const fn with_pin(chip: u32, line: u32, pin: u8) -> PinRef {
        PinRef {
            chip,
            line,
            physical_pin: Some(pin),
        }
    }

    /// Legacy /sys/class/gpio number (32 lines per bank)
    pub fn sysfs_number(&self) -> u32 {
        self.chip * 32 + self.line
    }

    /// Same physical line, ignoring the informational pin label
    pub fn same_line(&self, other: &PinRef) -> bool {
        self.chip == other.chip && self.line == other.line
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpiochip{}:{}", self.chip, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    Off,
    Green,
    Yellow,
    Orange,
}

impl LedColor {
    pub const ALL: [LedColor; 4] = [
        LedColor::Off,
        LedColor::Green,
        LedColor::Yellow,
        LedColor::Orange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LedColor::Off => "off",
            LedColor::Green => "green",
            LedColor::Yellow => "yellow",
            LedColor::Orange => "orange",
        }
    }
}

impl FromStr for LedColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LedColor::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| Error::InvalidParameter(format!("unknown LED color: {s}")))
    }
}

/// Lines that light a colour. Mixed colours drive several lines at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LedWiring {
    Single(PinRef),
    Combined(Vec<PinRef>),
}

impl LedWiring {
    pub fn lines(&self) -> Vec<PinRef> {
        match self {
            LedWiring::Single(pin) => vec![*pin],
            LedWiring::Combined(pins) => pins.clone(),
        }
    }
}

/// Bi-colour user LED (DS4): a green and a yellow line, orange is both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedTable {
    pub green: PinRef,
    pub yellow: PinRef,
}

impl LedTable {
    pub fn wiring(&self, color: LedColor) -> Option<LedWiring> {
        match color {
            LedColor::Off => None,
            LedColor::Green => Some(LedWiring::Single(self.green)),
            LedColor::Yellow => Some(LedWiring::Single(self.yellow)),
            LedColor::Orange => Some(LedWiring::Combined(vec![self.green, self.yellow])),
        }
    }

    /// Level for every LED line so that exactly `color` is shown
    pub fn levels(&self, color: LedColor) -> Vec<(PinRef, bool)> {
        let (green, yellow) = match color {
            LedColor::Off => (false, false),
            LedColor::Green => (true, false),
            LedColor::Yellow => (false, true),
            LedColor::Orange => (true, true),
        };
        vec![(self.green, green), (self.yellow, yellow)]
    }
}

/// Pin, LED, serial and feature layout of one gateway model
#[derive(Debug, Clone, Serialize)]
pub struct HardwareProfile {
    pub model: ModelId,
    pub inputs: BTreeMap<&'static str, PinRef>,
    pub outputs: BTreeMap<&'static str, PinRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leds: Option<LedTable>,
    pub has_analog: bool,
    pub has_can: bool,
    /// CAN and RS485 share the same connector option
    pub can_exclusive_with_rs485: bool,
    pub serial_ports: BTreeMap<&'static str, &'static str>,
    /// RS232/RS485 selector of the back-panel port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode_switch: Option<PinRef>,
    /// Pairs of differently named users wired to the same line, by `line_users` label
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shared_lines: Vec<(&'static str, &'static str)>,
}

/// Summary of what a profile offers, by name
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub model: ModelId,
    pub inputs: Vec<&'static str>,
    pub outputs: Vec<&'static str>,
    pub led_colors: Vec<LedColor>,
    pub has_analog: bool,
    pub has_can: bool,
    pub can_exclusive_with_rs485: bool,
    pub has_mode_switch: bool,
    pub serial_ports: Vec<&'static str>,
}

impl HardwareProfile {
    fn not_found(&self, kind: &'static str, name: &str) -> Error {
        Error::NotFound {
            kind,
            name: name.to_string(),
            model: self.model.to_string(),
        }
    }

    pub fn input(&self, name: &str) -> Result<PinRef> {
        self.inputs
            .get(name)
            .copied()
            .ok_or_else(|| self.not_found("input", name))
    }

    pub fn output(&self, name: &str) -> Result<PinRef> {
        self.outputs
            .get(name)
            .copied()
            .ok_or_else(|| self.not_found("output", name))
    }

    pub fn led(&self, color: LedColor) -> Result<Option<LedWiring>> {
        match &self.leds {
            Some(table) => Ok(table.wiring(color)),
            None => Err(self.not_found("led", color.as_str())),
        }
    }

    pub fn serial_port(&self, name: &str) -> Result<&'static str> {
        self.serial_ports
            .get(name)
            .copied()
            .ok_or_else(|| self.not_found("serial port", name))
    }

    /// Every line of the profile labelled by its user: input/output names, `led_green`,
    /// `led_yellow` and `mode_switch`. A bidirectional line appears once per table.
    pub fn line_users(&self) -> Vec<(&'static str, PinRef)> {
        let mut users: Vec<(&'static str, PinRef)> = self
            .inputs
            .iter()
            .chain(self.outputs.iter())
            .map(|(&name, &pin)| (name, pin))
            .collect();
        if let Some(leds) = self.leds {
            users.push(("led_green", leds.green));
            users.push(("led_yellow", leds.yellow));
        }
        if let Some(pin) = self.mode_switch {
            users.push(("mode_switch", pin));
        }
        users
    }

    /// Other users of the line behind `label`
    pub fn shares_with(&self, label: &str) -> Vec<&'static str> {
        self.shared_lines
            .iter()
            .filter_map(|&(a, b)| match label {
                l if l == a => Some(b),
                l if l == b => Some(a),
                _ => None,
            })
            .collect()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            model: self.model,
            inputs: self.inputs.keys().copied().collect(),
            outputs: self.outputs.keys().copied().collect(),
            led_colors: if self.leds.is_some() {
                LedColor::ALL.to_vec()
            } else {
                Vec::new()
            },
            has_analog: self.has_analog,
            has_can: self.has_can,
            can_exclusive_with_rs485: self.can_exclusive_with_rs485,
            has_mode_switch: self.mode_switch.is_some(),
            serial_ports: self.serial_ports.keys().copied().collect(),
        }
    }
}

/// sysfs GPIO 507 selects RS485 (1) or RS232 (0) on the i.MX8 back panel
const RS485_MODE_SWITCH: PinRef = PinRef::new(15, 27);

/// i.MX8 / i.MX8M-Plus gateways with the I/O add-on board
fn imx8_family(model: ModelId) -> HardwareProfile {
    HardwareProfile {
        model,
        inputs: BTreeMap::from([
            ("IN0", PinRef::with_pin(2, 0, 15)),
            ("IN1", PinRef::with_pin(2, 1, 17)),
            ("IN2", PinRef::with_pin(2, 6, 16)),
            ("IN3", PinRef::with_pin(2, 7, 18)),
        ]),
        outputs: BTreeMap::from([
            ("OUT0", PinRef::with_pin(2, 8, 11)),
            ("OUT1", PinRef::with_pin(2, 9, 13)),
            ("OUT2", PinRef::with_pin(5, 9, 12)),
            ("OUT3", PinRef::with_pin(5, 10, 14)),
        ]),
        leds: Some(LedTable {
            green: PinRef::new(2, 25),
            yellow: PinRef::new(2, 19),
        }),
        has_analog: true,
        has_can: true,
        can_exclusive_with_rs485: false,
        serial_ports: BTreeMap::from([
            ("console", "/dev/ttyUSB0"),
            ("backpanel", "/dev/ttymxc2"),
            ("addon_rs232", "/dev/ttymxc1"),
            ("addon_rs485", "/dev/ttymxc3"),
        ]),
        mode_switch: Some(RS485_MODE_SWITCH),
        shared_lines: Vec::new(),
    }
}

/// DIN-rail unit: built-in CLT03-2Q3 inputs and TPS272C outputs, RS485 only
fn iot_din_imx8plus() -> HardwareProfile {
    HardwareProfile {
        model: ModelId::IotDinImx8Plus,
        inputs: BTreeMap::from([
            ("DI0", PinRef::with_pin(1, 0, 2)),
            ("DI1", PinRef::with_pin(1, 4, 4)),
        ]),
        outputs: BTreeMap::from([
            ("DO0", PinRef::with_pin(1, 8, 3)),
            ("DO1", PinRef::with_pin(1, 9, 5)),
        ]),
        leds: None,
        has_analog: false,
        has_can: false,
        can_exclusive_with_rs485: false,
        serial_ports: BTreeMap::from([("console", "/dev/ttyUSB0"), ("rs485", "/dev/ttymxc2")]),
        mode_switch: None,
        shared_lines: Vec::new(),
    }
}

/// i.MX93 based; DIO0..2 are bidirectional and listed as both input and output
fn iot_link() -> HardwareProfile {
    let dio = [
        ("DIO0", PinRef::with_pin(0, 0, 1)),
        ("DIO1", PinRef::with_pin(0, 1, 2)),
        ("DIO2", PinRef::with_pin(0, 2, 3)),
    ];
    HardwareProfile {
        model: ModelId::IotLink,
        inputs: BTreeMap::from(dio),
        outputs: BTreeMap::from(dio),
        leds: None,
        has_analog: false,
        has_can: true,
        can_exclusive_with_rs485: true,
        serial_ports: BTreeMap::from([
            ("console", "/dev/ttyUSB0"),
            ("rs485_a", "/dev/ttyLP6"),
            ("rs485_b", "/dev/ttyLP4"),
        ]),
        mode_switch: None,
        shared_lines: Vec::new(),
    }
}

/// Raspberry Pi CM based; chip 0 lines are BCM numbers
fn iot_gate_rpi() -> HardwareProfile {
    HardwareProfile {
        model: ModelId::IotGateRpi,
        inputs: BTreeMap::from([
            ("IN0", PinRef::with_pin(0, 17, 11)),
            ("IN1", PinRef::with_pin(0, 27, 13)),
            ("IN2", PinRef::with_pin(0, 22, 15)),
            ("IN3", PinRef::with_pin(0, 23, 16)),
            ("IN4", PinRef::with_pin(0, 5, 29)),
            ("IN5", PinRef::with_pin(0, 6, 31)),
            ("IN6", PinRef::with_pin(0, 13, 33)),
            ("IN7", PinRef::with_pin(0, 19, 35)),
        ]),
        outputs: BTreeMap::from([
            ("OUT0", PinRef::with_pin(0, 24, 18)),
            ("OUT1", PinRef::with_pin(0, 25, 22)),
            ("OUT2", PinRef::with_pin(0, 8, 24)),
            ("OUT3", PinRef::with_pin(0, 7, 26)),
            ("OUT4", PinRef::with_pin(0, 12, 32)),
            ("OUT5", PinRef::with_pin(0, 16, 36)),
            ("OUT6", PinRef::with_pin(0, 20, 38)),
            ("OUT7", PinRef::with_pin(0, 21, 40)),
        ]),
        leds: Some(LedTable {
            green: PinRef::new(0, 18),
            yellow: PinRef::new(0, 12),
        }),
        has_analog: false,
        has_can: true,
        can_exclusive_with_rs485: false,
        serial_ports: BTreeMap::from([
            ("console", "/dev/ttyAMA0"),
            ("usb0", "/dev/ttyUSB0"),
            ("usb1", "/dev/ttyUSB1"),
            ("rs485_0", "/dev/ttyAMA1"),
            ("rs485_1", "/dev/ttyAMA2"),
            ("rs485_2", "/dev/ttyAMA3"),
            ("rs485_3", "/dev/ttyAMA4"),
        ]),
        mode_switch: None,
        shared_lines: vec![("OUT4", "led_yellow")],
    }
}

lazy_static! {
    static ref IOT_GATE_IMX8: HardwareProfile = imx8_family(ModelId::IotGateImx8);
    static ref SBC_IOT_IMX8: HardwareProfile = imx8_family(ModelId::SbcIotImx8);
    static ref IOT_GATE_IMX8PLUS: HardwareProfile = imx8_family(ModelId::IotGateImx8Plus);
    static ref SBC_IOT_IMX8PLUS: HardwareProfile = imx8_family(ModelId::SbcIotImx8Plus);
    static ref IOT_DIN_IMX8PLUS: HardwareProfile = iot_din_imx8plus();
    static ref IOT_LINK: HardwareProfile = iot_link();
    static ref IOT_GATE_RPI: HardwareProfile = iot_gate_rpi();
}

/// Capability table of a known model
pub fn resolve(model: ModelId) -> &'static HardwareProfile {
    match model {
        ModelId::IotGateImx8 => &IOT_GATE_IMX8,
        ModelId::SbcIotImx8 => &SBC_IOT_IMX8,
        ModelId::IotGateImx8Plus => &IOT_GATE_IMX8PLUS,
        ModelId::SbcIotImx8Plus => &SBC_IOT_IMX8PLUS,
        ModelId::IotDinImx8Plus => &IOT_DIN_IMX8PLUS,
        ModelId::IotLink => &IOT_LINK,
        ModelId::IotGateRpi => &IOT_GATE_RPI,
    }
}

/// Result of resolving a free-form model string
#[derive(Debug, Clone)]
pub enum Resolved {
    Known(&'static HardwareProfile),
    /// identifier not recognised, the default profile stands in
    Fallback {
        requested: String,
        profile: &'static HardwareProfile,
    },
}

impl Resolved {
    pub fn profile(&self) -> &'static HardwareProfile {
        match self {
            Resolved::Known(profile) => profile,
            Resolved::Fallback { profile, .. } => profile,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolved::Fallback { .. })
    }
}

/// Resolve an identifier string; unknown identifiers fall back to the default profile
pub fn resolve_str(id: &str) -> Resolved {
    match id.parse::<ModelId>() {
        Ok(model) => {
            debug!("resolved hardware profile {}", model);
            Resolved::Known(resolve(model))
        }
        Err(_) => {
            warn!(
                "unknown hardware '{}', using {} profile",
                id,
                ModelId::DEFAULT
            );
            Resolved::Fallback {
                requested: id.to_string(),
                profile: resolve(ModelId::DEFAULT),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_model_has_inputs_and_outputs() {
        for model in ModelId::ALL {
            let profile = resolve(model);
            assert_eq!(profile.model, model);
            assert!(!profile.inputs.is_empty(), "{model} has no inputs");
            assert!(!profile.outputs.is_empty(), "{model} has no outputs");
            assert!(profile.serial_ports.contains_key("console"));
        }
    }

    #[test]
    fn test_model_id_round_trips_through_str() {
        for model in ModelId::ALL {
            assert_eq!(model.as_str().parse::<ModelId>().unwrap(), model);
        }
        assert_eq!("iot-link".parse::<ModelId>().unwrap(), ModelId::IotLink);
        assert!("IOT-GATE-XYZ".parse::<ModelId>().is_err());
    }

    #[test]
    fn test_no_aliased_lines() {
        for model in ModelId::ALL {
            let profile = resolve(model);
            let users = profile.line_users();
            for (i, (a_name, a)) in users.iter().enumerate() {
                for (b_name, b) in &users[i + 1..] {
                    if !a.same_line(b) {
                        continue;
                    }
                    // a bidirectional line carries the same name in both tables
                    assert!(
                        a_name == b_name || profile.shares_with(a_name).contains(b_name),
                        "{model}: {a_name} and {b_name} both use {a}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_shared_lines_are_real() {
        for model in ModelId::ALL {
            let profile = resolve(model);
            let users = profile.line_users();
            let line_of = |label: &str| {
                users
                    .iter()
                    .find(|(name, _)| *name == label)
                    .map(|(_, pin)| *pin)
                    .unwrap_or_else(|| panic!("{model}: unknown line user {label}"))
            };
            for (a, b) in &profile.shared_lines {
                assert!(line_of(*a).same_line(&line_of(*b)), "{model}: {a}/{b} not shared");
            }
        }
    }

    #[test]
    fn test_rpi_led_shares_out4() {
        let profile = resolve(ModelId::IotGateRpi);
        assert_eq!(profile.shares_with("OUT4"), vec!["led_yellow"]);
        assert_eq!(profile.shares_with("led_yellow"), vec!["OUT4"]);
        assert!(profile.shares_with("OUT0").is_empty());
        assert!(resolve(ModelId::IotGateImx8).shares_with("mode_switch").is_empty());
    }

    #[test]
    fn test_lookup_miss_is_not_found() {
        let profile = resolve(ModelId::IotDinImx8Plus);
        assert_eq!(profile.input("DI1").unwrap(), PinRef::with_pin(1, 4, 4));
        match profile.input("IN0") {
            Err(Error::NotFound { kind, name, model }) => {
                assert_eq!(kind, "input");
                assert_eq!(name, "IN0");
                assert_eq!(model, "IOT-DIN-IMX8PLUS");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            profile.led(LedColor::Green),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            profile.serial_port("backpanel"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_unknown_identifier_falls_back() {
        let resolved = resolve_str("NOT-A-GATEWAY");
        assert!(resolved.is_fallback());
        assert_eq!(resolved.profile().model, ModelId::DEFAULT);
        if let Resolved::Fallback { requested, .. } = &resolved {
            assert_eq!(requested, "NOT-A-GATEWAY");
        }

        let resolved = resolve_str("IOT-GATE-RPi");
        assert!(!resolved.is_fallback());
        assert_eq!(resolved.profile().model, ModelId::IotGateRpi);
    }

    #[test]
    fn test_led_orange_drives_both_lines() {
        let profile = resolve(ModelId::IotGateImx8);
        let leds = profile.leds.unwrap();
        assert_eq!(
            profile.led(LedColor::Orange).unwrap(),
            Some(LedWiring::Combined(vec![leds.green, leds.yellow]))
        );
        assert_eq!(profile.led(LedColor::Off).unwrap(), None);
        assert_eq!(
            leds.levels(LedColor::Yellow),
            vec![(leds.green, false), (leds.yellow, true)]
        );
        assert_eq!("ORANGE".parse::<LedColor>().unwrap(), LedColor::Orange);
    }

    #[test]
    fn test_mode_switch_is_sysfs_507() {
        let profile = resolve(ModelId::SbcIotImx8Plus);
        assert_eq!(profile.mode_switch.unwrap().sysfs_number(), 507);
        assert!(resolve(ModelId::IotLink).mode_switch.is_none());
    }

    #[test]
    fn test_capabilities_summary() {
        let caps = resolve(ModelId::IotLink).capabilities();
        assert_eq!(caps.inputs, vec!["DIO0", "DIO1", "DIO2"]);
        assert!(caps.can_exclusive_with_rs485);
        assert!(caps.led_colors.is_empty());
        assert!(!caps.has_mode_switch);
    }

    #[test]
    fn test_profile_serializes_model_string() {
        let json = serde_json::to_value(resolve(ModelId::IotGateImx8Plus)).unwrap();
        assert_eq!(json["model"], "IOT-GATE-IMX8PLUS");
        assert_eq!(json["inputs"]["IN2"]["line"], 6);
        assert_eq!(json["serial_ports"]["backpanel"], "/dev/ttymxc2");
    }
}
