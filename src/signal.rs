// Copyright © 2026 Rudis Laboratories LLC

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    static ref RSRP_RE: Regex = Regex::new(r"(?i)rsrp:\s*([-\d.]+)").unwrap();
    static ref RSRQ_RE: Regex = Regex::new(r"(?i)rsrq:\s*([-\d.]+)").unwrap();
    static ref RSSI_RE: Regex = Regex::new(r"(?i)rssi:\s*([-\d.]+)").unwrap();
    static ref SNR_RE: Regex = Regex::new(r"(?i)snr:\s*([-\d.]+)").unwrap();
    static ref IW_LEVEL_RE: Regex = Regex::new(r"Signal level[=:](-?\d+)").unwrap();
}

/// Linear dBm to percent: -100 dBm and below is 0 %, -50 dBm and above is 100 %
pub fn dbm_to_percent(dbm: i32) -> u8 {
    (2 * (dbm as i64 + 100)).clamp(0, 100) as u8
}

/// LTE RSRP quality buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalTier {
    #[serde(rename = "very poor")]
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl SignalTier {
    /// Cutoffs are inclusive on the better tier
    pub fn from_rsrp(rsrp: f64) -> SignalTier {
        if rsrp >= -80.0 {
            SignalTier::Excellent
        } else if rsrp >= -90.0 {
            SignalTier::Good
        } else if rsrp >= -100.0 {
            SignalTier::Fair
        } else if rsrp >= -110.0 {
            SignalTier::Poor
        } else {
            SignalTier::VeryPoor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalTier::Excellent => "excellent",
            SignalTier::Good => "good",
            SignalTier::Fair => "fair",
            SignalTier::Poor => "poor",
            SignalTier::VeryPoor => "very poor",
        }
    }
}

impl fmt::Display for SignalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RSRP over its reporting range (-140..-44 dBm) in percent
pub fn rsrp_quality(rsrp: f64) -> u8 {
    ((rsrp + 140.0) / 96.0 * 100.0).round().clamp(0.0, 100.0) as u8
}

/// `mmcli -m <n> --signal-get` values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CellularSignal {
    pub rsrp: Option<f64>,
    pub rsrq: Option<f64>,
    pub rssi: Option<f64>,
    pub sinr: Option<f64>,
    pub quality: Option<u8>,
    pub tier: Option<SignalTier>,
}

fn capture_f64(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}

pub fn parse_mmcli_signal(output: &str) -> CellularSignal {
    let rsrp = capture_f64(&RSRP_RE, output);
    CellularSignal {
        rsrp,
        rsrq: capture_f64(&RSRQ_RE, output),
        rssi: capture_f64(&RSSI_RE, output),
        sinr: capture_f64(&SNR_RE, output),
        quality: rsrp.map(rsrp_quality),
        tier: rsrp.map(SignalTier::from_rsrp),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WifiSignal {
    pub dbm: i32,
    pub percent: u8,
}

/// Signal level line of `iwconfig <if>`
pub fn parse_iwconfig_signal(output: &str) -> Option<WifiSignal> {
    let dbm: i32 = IW_LEVEL_RE.captures(output)?[1].parse().ok()?;
    Some(WifiSignal {
        dbm,
        percent: dbm_to_percent(dbm),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbm_to_percent() {
        assert_eq!(dbm_to_percent(-50), 100);
        assert_eq!(dbm_to_percent(-30), 100);
        assert_eq!(dbm_to_percent(-75), 50);
        assert_eq!(dbm_to_percent(-100), 0);
        assert_eq!(dbm_to_percent(i32::MIN), 0);
    }

    #[test]
    fn test_dbm_to_percent_monotonic() {
        let mut last = dbm_to_percent(0);
        for dbm in (-130..0).rev() {
            let p = dbm_to_percent(dbm);
            assert!(p <= last, "{dbm} dBm gave {p} after {last}");
            last = p;
        }
    }

    #[test]
    fn test_rsrp_tier_boundaries() {
        assert_eq!(SignalTier::from_rsrp(-80.0), SignalTier::Excellent);
        assert_eq!(SignalTier::from_rsrp(-81.0), SignalTier::Good);
        assert_eq!(SignalTier::from_rsrp(-90.0), SignalTier::Good);
        assert_eq!(SignalTier::from_rsrp(-100.0), SignalTier::Fair);
        assert_eq!(SignalTier::from_rsrp(-110.0), SignalTier::Poor);
        assert_eq!(SignalTier::from_rsrp(-110.5), SignalTier::VeryPoor);
        assert_eq!(SignalTier::VeryPoor.to_string(), "very poor");
    }

    #[test]
    fn test_rsrp_quality() {
        assert_eq!(rsrp_quality(-140.0), 0);
        assert_eq!(rsrp_quality(-44.0), 100);
        assert_eq!(rsrp_quality(-92.0), 50);
        assert_eq!(rsrp_quality(-20.0), 100);
    }

    #[test]
    fn test_parse_mmcli_signal() {
        let output = "  ----------------------------
  Refresh |      rate: 5 seconds
  ----------------------------
  LTE     |      rssi: -65.00 dBm
          |      rsrq: -11.00 dB
          |      rsrp: -95.00 dBm
          |       snr: 7.20 dB";
        let signal = parse_mmcli_signal(output);
        assert_eq!(signal.rsrp, Some(-95.0));
        assert_eq!(signal.rsrq, Some(-11.0));
        assert_eq!(signal.rssi, Some(-65.0));
        assert_eq!(signal.sinr, Some(7.2));
        assert_eq!(signal.tier, Some(SignalTier::Fair));
        assert_eq!(signal.quality, Some(47));
    }

    #[test]
    fn test_tier_json_matches_label() {
        let signal = parse_mmcli_signal("rsrp: -120.00 dBm");
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["tier"], "very poor");
        for rsrp in [-120.0, -105.0, -95.0, -85.0, -70.0] {
            let tier = SignalTier::from_rsrp(rsrp);
            assert_eq!(serde_json::to_value(tier).unwrap(), tier.as_str());
        }
    }

    #[test]
    fn test_parse_mmcli_without_lte() {
        assert_eq!(parse_mmcli_signal("no signal info"), CellularSignal::default());
    }

    #[test]
    fn test_parse_iwconfig() {
        let out = "wlan0  Link Quality=52/70  Signal level=-58 dBm";
        assert_eq!(
            parse_iwconfig_signal(out),
            Some(WifiSignal {
                dbm: -58,
                percent: 84
            })
        );
        assert_eq!(parse_iwconfig_signal("wlan0  unassociated"), None);
    }
}
