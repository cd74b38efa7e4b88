// Copyright © 2026 Rudis Laboratories LLC

use log::debug;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// MAX11108 current-loop input: mA per LSB
pub const MAX11108_MA_PER_LSB: f64 = 0.00684;

/// 12-bit full scale
pub const ADC_FULL_SCALE: f64 = 4095.0;

/// Temperature coefficient of platinum RTDs, per °C
pub const RTD_ALPHA: f64 = 0.00385;

const LOOP_MIN_MA: f64 = 4.0;
const LOOP_MAX_MA: f64 = 20.0;
const LOOP_VALID_MIN_MA: f64 = 3.8;
const LOOP_VALID_MAX_MA: f64 = 20.5;
const RTD_MIN_C: f64 = -200.0;
const RTD_MAX_C: f64 = 850.0;

/// Where a conversion factor comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Calibration {
    /// IIO `_scale`/`_offset` attributes: value = (raw + offset) * scale
    Calibrated { scale: f64, offset: f64 },
    /// no driver calibration, fixed per-part factors apply
    Uncalibrated,
}

impl Calibration {
    /// Build from optional IIO attributes. A missing or zero scale means uncalibrated.
    pub fn from_parts(scale: Option<f64>, offset: Option<f64>) -> Result<Calibration> {
        match scale {
            Some(scale) if scale != 0.0 => {
                let offset = offset.unwrap_or(0.0);
                if !scale.is_finite() || !offset.is_finite() {
                    return Err(Error::InvalidParameter(format!(
                        "calibration must be finite (scale {scale}, offset {offset})"
                    )));
                }
                Ok(Calibration::Calibrated { scale, offset })
            }
            _ => Ok(Calibration::Uncalibrated),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, Calibration::Calibrated { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// 4-20 mA current loop
    Current,
    /// 0-10 V or 0-5 V voltage input
    Voltage,
}

impl FromStr for InputKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "current" | "ma" | "4-20ma" => Ok(InputKind::Current),
            "voltage" | "v" | "0-10v" => Ok(InputKind::Voltage),
            other => Err(Error::InvalidParameter(format!("unknown input type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SensorType {
    #[serde(rename = "PT100")]
    Pt100,
    #[serde(rename = "PT1000")]
    Pt1000,
}

impl SensorType {
    /// Resistance at 0 °C in ohms
    pub fn nominal_ohms(&self) -> f64 {
        match self {
            SensorType::Pt100 => 100.0,
            SensorType::Pt1000 => 1000.0,
        }
    }
}

impl FromStr for SensorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PT100" => Ok(SensorType::Pt100),
            "PT1000" => Ok(SensorType::Pt1000),
            other => Err(Error::InvalidParameter(format!("unknown sensor type: {other}"))),
        }
    }
}

/// A converted current or voltage sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledReading {
    pub raw: i64,
    pub physical_value: f64,
    pub unit: &'static str,
    pub percent_of_range: f64,
    /// plausible for the nominal input range, not a hardware fault flag
    pub valid: bool,
    pub calibrated: bool,
}

/// Target range for `ScaledReading::rescale`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
    pub unit: String,
    pub decimals: u32,
}

impl Default for ScaleRange {
    fn default() -> Self {
        ScaleRange {
            min: 0.0,
            max: 100.0,
            unit: String::new(),
            decimals: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RescaledReading {
    #[serde(flatten)]
    pub reading: ScaledReading,
    pub scaled: f64,
    pub scaled_unit: String,
    pub min_value: f64,
    pub max_value: f64,
}

impl ScaledReading {
    /// Map the percent of range onto an engineering range (e.g. 4-20 mA -> 0-10 bar)
    pub fn rescale(&self, range: &ScaleRange) -> Result<RescaledReading> {
        Ok(RescaledReading {
            reading: self.clone(),
            scaled: rescale(self.percent_of_range, range.min, range.max, range.decimals)?,
            scaled_unit: range.unit.clone(),
            min_value: range.min,
            max_value: range.max,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub raw: i64,
    pub celsius: f64,
    pub fahrenheit: f64,
    pub kelvin: f64,
    pub sensor: SensorType,
    /// inside the platinum RTD range
    pub valid: bool,
    /// linear RTD approximation was used instead of driver linearisation
    pub approximate: bool,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn apply(raw: i64, scale: f64, offset: f64) -> f64 {
    (raw as f64 + offset) * scale
}

/// 4-20 mA loop position in percent, clamped
pub fn current_to_percent(current_ma: f64) -> f64 {
    if current_ma < LOOP_MIN_MA {
        return 0.0;
    }
    if current_ma > LOOP_MAX_MA {
        return 100.0;
    }
    round_to((current_ma - LOOP_MIN_MA) / (LOOP_MAX_MA - LOOP_MIN_MA) * 100.0, 1)
}

/// Convert a current-loop ADC sample to milliamps
pub fn raw_to_current_ma(raw: i64, calibration: &Calibration) -> Result<ScaledReading> {
    let current_ma = match *calibration {
        Calibration::Calibrated { scale, offset } => apply(raw, scale, offset),
        Calibration::Uncalibrated => raw as f64 * MAX11108_MA_PER_LSB,
    };
    if !current_ma.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "current conversion of {raw} is not finite"
        )));
    }
    debug!("raw {} -> {:.3} mA ({:?})", raw, current_ma, calibration);

    Ok(ScaledReading {
        raw,
        physical_value: round_to(current_ma, 3),
        unit: "mA",
        percent_of_range: current_to_percent(current_ma),
        valid: (LOOP_VALID_MIN_MA..=LOOP_VALID_MAX_MA).contains(&current_ma),
        calibrated: calibration.is_calibrated(),
    })
}

/// Convert a voltage-input ADC sample to volts. Calibrated scale is in mV per LSB.
pub fn raw_to_voltage(raw: i64, calibration: &Calibration, max_voltage: f64) -> Result<ScaledReading> {
    if !max_voltage.is_finite() || max_voltage <= 0.0 {
        return Err(Error::InvalidReference(format!(
            "maximum voltage must be positive, got {max_voltage}"
        )));
    }
    let voltage = match *calibration {
        Calibration::Calibrated { scale, offset } => apply(raw, scale, offset) / 1000.0,
        Calibration::Uncalibrated => raw as f64 / ADC_FULL_SCALE * max_voltage,
    };
    if !voltage.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "voltage conversion of {raw} is not finite"
        )));
    }
    debug!("raw {} -> {:.3} V ({:?})", raw, voltage, calibration);

    let percent = (voltage / max_voltage * 100.0).clamp(0.0, 100.0);
    Ok(ScaledReading {
        raw,
        physical_value: round_to(voltage, 3),
        unit: "V",
        percent_of_range: round_to(percent, 1),
        valid: (-0.1..=max_voltage + 0.5).contains(&voltage),
        calibrated: calibration.is_calibrated(),
    })
}

/// Convert an RTD channel sample to a temperature.
///
/// With calibration the driver already reports milli-degrees Celsius. Without it the
/// raw value is taken as milliohms and the single-coefficient linear approximation
/// `T = (R/R0 - 1) / alpha` is applied, which drifts from Callendar-Van Dusen away
/// from 0 °C; `approximate` is set on such readings.
pub fn raw_to_celsius(
    raw: i64,
    calibration: &Calibration,
    sensor: SensorType,
) -> Result<TemperatureReading> {
    let celsius = match *calibration {
        Calibration::Calibrated { scale, offset } => apply(raw, scale, offset) / 1000.0,
        Calibration::Uncalibrated => {
            let ohms = raw as f64 / 1000.0;
            (ohms / sensor.nominal_ohms() - 1.0) / RTD_ALPHA
        }
    };
    if !celsius.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "temperature conversion of {raw} is not finite"
        )));
    }

    Ok(TemperatureReading {
        raw,
        celsius: round_to(celsius, 1),
        fahrenheit: round_to(celsius * 9.0 / 5.0 + 32.0, 1),
        kelvin: round_to(celsius + 273.15, 1),
        sensor,
        valid: (RTD_MIN_C..=RTD_MAX_C).contains(&celsius),
        approximate: !calibration.is_calibrated(),
    })
}

/// Most decimals an f64 result can carry meaningfully
pub const MAX_DECIMALS: u32 = 15;

/// Linear map of a 0-100 percent value into `min..max`, rounded to `decimals`
pub fn rescale(percent: f64, min: f64, max: f64, decimals: u32) -> Result<f64> {
    if decimals > MAX_DECIMALS {
        return Err(Error::InvalidParameter(format!(
            "{decimals} decimals, at most {MAX_DECIMALS} supported"
        )));
    }
    if !(percent.is_finite() && min.is_finite() && max.is_finite()) {
        return Err(Error::InvalidParameter(format!(
            "non-finite rescale input: {percent} % of {min}..{max}"
        )));
    }
    Ok(round_to(min + (percent / 100.0) * (max - min), decimals))
}

/// One IIO input channel found by a device scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalogChannelDescriptor {
    /// IIO device id, e.g. `iio:device0`
    pub device: String,
    pub channel_name: String,
    pub raw_value_path: PathBuf,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
}

impl AnalogChannelDescriptor {
    pub fn calibration(&self) -> Result<Calibration> {
        Calibration::from_parts(self.scale, self.offset)
    }

    /// Current or voltage, from the IIO channel type
    pub fn kind(&self) -> InputKind {
        if self.channel_name.starts_with("in_current") {
            InputKind::Current
        } else {
            InputKind::Voltage
        }
    }
}
