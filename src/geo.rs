// Copyright © 2026 Rudis Laboratories LLC

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Mean Earth radius in meters (spherical model)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance in meters
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push h just past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn hemisphere(&self, value: f64) -> char {
        match (self, value >= 0.0) {
            (Axis::Latitude, true) => 'N',
            (Axis::Latitude, false) => 'S',
            (Axis::Longitude, true) => 'E',
            (Axis::Longitude, false) => 'W',
        }
    }
}

/// Degrees, minutes and seconds with hemisphere letter, e.g. `52°31'12.03"N`
pub fn to_dms(value: f64, axis: Axis) -> String {
    // work in hundredths of a second so that rounding carries into minutes and degrees
    let hundredths = (value.abs() * 360_000.0).round() as u64;
    let degrees = hundredths / 360_000;
    let minutes = hundredths % 360_000 / 6_000;
    let seconds = (hundredths % 6_000) as f64 / 100.0;
    format!(
        "{}°{}'{:.2}\"{}",
        degrees,
        minutes,
        seconds,
        axis.hemisphere(value)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateFormat {
    #[default]
    Decimal,
    Dms,
}

impl FromStr for CoordinateFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "decimal" | "dd" => Ok(CoordinateFormat::Decimal),
            "dms" => Ok(CoordinateFormat::Dms),
            other => Err(Error::InvalidParameter(format!(
                "unknown coordinate format: {other}"
            ))),
        }
    }
}

pub fn format_coordinates(coordinate: &Coordinate, format: CoordinateFormat) -> String {
    match format {
        CoordinateFormat::Decimal => {
            format!("{:.6}, {:.6}", coordinate.latitude, coordinate.longitude)
        }
        CoordinateFormat::Dms => format!(
            "{}, {}",
            to_dms(coordinate.latitude, Axis::Latitude),
            to_dms(coordinate.longitude, Axis::Longitude)
        ),
    }
}

/// gpsd TPV (time-position-velocity) report
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GpsFix {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(rename = "lat", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "lon", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "alt", default)]
    pub altitude: Option<f64>,
    /// m/s
    #[serde(default)]
    pub speed: Option<f64>,
    /// degrees from true north
    #[serde(rename = "track", default)]
    pub heading: Option<f64>,
    /// m/s
    #[serde(default)]
    pub climb: Option<f64>,
    /// 0/1 no fix, 2 = 2D, 3 = 3D
    #[serde(default)]
    pub mode: u8,
}

impl GpsFix {
    pub fn has_fix(&self) -> bool {
        self.mode >= 2
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.latitude?, self.longitude?))
    }
}

#[derive(Deserialize)]
struct ReportClass {
    class: String,
}

/// Parse one line of `gpspipe -w` output holding a TPV report
pub fn parse_tpv(line: &str) -> Result<GpsFix> {
    let class: ReportClass =
        serde_json::from_str(line).map_err(|e| Error::Parse(format!("gpsd report: {e}")))?;
    if class.class != "TPV" {
        return Err(Error::Parse(format!(
            "expected TPV report, got {}",
            class.class
        )));
    }
    serde_json::from_str(line).map_err(|e| Error::Parse(format!("gpsd TPV report: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BERLIN: Coordinate = Coordinate {
        latitude: 52.520008,
        longitude: 13.404954,
    };
    const MUNICH: Coordinate = Coordinate {
        latitude: 48.137154,
        longitude: 11.576124,
    };

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(haversine_distance(&BERLIN, &BERLIN), 0.0);
    }

    #[test]
    fn test_berlin_munich() {
        let d = haversine_distance(&BERLIN, &MUNICH);
        assert!((d - 504_000.0).abs() < 50_400.0, "distance {d}");
        assert!((d - haversine_distance(&MUNICH, &BERLIN)).abs() < 1e-6);
    }

    #[test]
    fn test_antipodal_points() {
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_M;
        for (lat, lon) in [(12.0, 0.0), (82.0, 0.0), (5.5, 0.0), (0.0, 0.0), (-45.0, 30.0)] {
            let a = Coordinate::new(-lat, lon);
            let b = Coordinate::new(lat, lon + 180.0);
            let d = haversine_distance(&a, &b);
            assert!(d.is_finite(), "({lat}, {lon}) gave {d}");
            assert!((d - half_circumference).abs() < 1.0, "({lat}, {lon}) gave {d}");
        }
    }

    #[test]
    fn test_dms_rounding_carries() {
        assert_eq!(to_dms(0.9999999, Axis::Latitude), "1°0'0.00\"N");
        assert_eq!(to_dms(-10.5, Axis::Longitude), "10°30'0.00\"W");
        assert_eq!(to_dms(52.520008, Axis::Latitude), "52°31'12.03\"N");
    }

    #[test]
    fn test_dms_hemispheres() {
        let north = to_dms(52.520008, Axis::Latitude);
        assert!(north.contains('N') && north.contains('°'), "{north}");
        assert!(north.starts_with("52°31'"));
        assert!(to_dms(-52.520008, Axis::Latitude).ends_with('S'));
        assert!(to_dms(13.4, Axis::Longitude).ends_with('E'));
        assert!(to_dms(-0.1, Axis::Longitude).ends_with('W'));
    }

    #[test]
    fn test_format_coordinates() {
        assert_eq!(
            format_coordinates(&BERLIN, CoordinateFormat::Decimal),
            "52.520008, 13.404954"
        );
        let dms = format_coordinates(&BERLIN, "DMS".parse().unwrap());
        assert!(dms.contains("N, 13°"), "{dms}");
        assert!(dms.ends_with('E'));
    }

    #[test]
    fn test_parse_tpv() {
        let line = r#"{"class":"TPV","device":"/dev/ttyUSB1","mode":3,"time":"2026-10-17T08:00:00.000Z","lat":52.520008,"lon":13.404954,"alt":34.1,"track":120.5,"speed":0.12,"climb":0.0}"#;
        let fix = parse_tpv(line).unwrap();
        assert!(fix.has_fix());
        assert_eq!(fix.coordinate(), Some(BERLIN));
        assert_eq!(fix.heading, Some(120.5));
    }

    #[test]
    fn test_parse_tpv_without_fix_and_wrong_class() {
        let fix = parse_tpv(r#"{"class":"TPV","mode":1}"#).unwrap();
        assert!(!fix.has_fix());
        assert_eq!(fix.coordinate(), None);
        assert!(parse_tpv(r#"{"class":"SKY","satellites":[]}"#).is_err());
        assert!(parse_tpv("not json").is_err());
    }
}
