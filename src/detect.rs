// Copyright © 2026 Rudis Laboratories LLC

use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::profile::ModelId;

/// Platform identification sources, most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// CompuLab baseboard option string (EEPROM contents exported by the device tree)
    BoardOptions,
    /// device tree `compatible` list
    BoardFamily,
    /// device tree model string
    Model,
    /// /proc/cpuinfo
    CpuInfo,
}

impl IdentitySource {
    pub const PRIORITY: [IdentitySource; 4] = [
        IdentitySource::BoardOptions,
        IdentitySource::BoardFamily,
        IdentitySource::Model,
        IdentitySource::CpuInfo,
    ];

    /// Location below the filesystem root
    pub fn path(&self) -> &'static str {
        match self {
            IdentitySource::BoardOptions => "proc/device-tree/baseboard-options",
            IdentitySource::BoardFamily => "proc/device-tree/compatible",
            IdentitySource::Model => "proc/device-tree/model",
            IdentitySource::CpuInfo => "proc/cpuinfo",
        }
    }

    // markers are checked in order, so SKU strings that contain another
    // marker as a prefix must come first
    fn markers(&self) -> &'static [(&'static str, ModelId)] {
        match self {
            IdentitySource::BoardOptions => &[
                ("IOT-DIN-IMX8PLUS", ModelId::IotDinImx8Plus),
                ("IOTD-IMX8P", ModelId::IotDinImx8Plus),
                ("IOT-GATE-IMX8PLUS", ModelId::IotGateImx8Plus),
                ("SBC-IOT-IMX8PLUS", ModelId::SbcIotImx8Plus),
                ("IOT-GATE-iMX8", ModelId::IotGateImx8),
                ("SBC-IOT-iMX8", ModelId::SbcIotImx8),
            ],
            IdentitySource::BoardFamily => &[
                ("iot-din-imx8plus", ModelId::IotDinImx8Plus),
                ("iot-gate-imx8plus", ModelId::IotGateImx8Plus),
                ("sbc-iot-imx8plus", ModelId::SbcIotImx8Plus),
                ("iot-gate-imx8", ModelId::IotGateImx8),
                ("sbc-iot-imx8", ModelId::SbcIotImx8),
                ("iot-link", ModelId::IotLink),
                ("imx93", ModelId::IotLink),
                ("raspberrypi", ModelId::IotGateRpi),
            ],
            IdentitySource::Model => &[
                ("IOT-LINK", ModelId::IotLink),
                ("imx93", ModelId::IotLink),
                ("i.MX93", ModelId::IotLink),
                ("Raspberry Pi", ModelId::IotGateRpi),
            ],
            IdentitySource::CpuInfo => &[("i.MX93", ModelId::IotLink)],
        }
    }

    // compatible strings are lowercase vendor,board pairs
    fn case_insensitive(&self) -> bool {
        matches!(self, IdentitySource::BoardFamily)
    }
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Read-only access to platform identification data
pub trait PlatformReader {
    /// Contents of one identification source, `None` when absent or unreadable
    fn read_identity(&self, source: IdentitySource) -> Option<String>;
}

/// Fixed identification data, for tests and for callers that already read it
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub HashMap<IdentitySource, String>);

impl StaticIdentity {
    pub fn with(mut self, source: IdentitySource, value: &str) -> Self {
        self.0.insert(source, value.to_string());
        self
    }
}

impl PlatformReader for StaticIdentity {
    fn read_identity(&self, source: IdentitySource) -> Option<String> {
        self.0.get(&source).cloned()
    }
}

/// Outcome of hardware detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Detection {
    Matched {
        model: ModelId,
        source: IdentitySource,
        marker: &'static str,
    },
    /// nothing identified the hardware
    Default,
}

impl Detection {
    pub fn model(&self) -> ModelId {
        match self {
            Detection::Matched { model, .. } => *model,
            Detection::Default => ModelId::DEFAULT,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Detection::Default)
    }
}

/// Device-tree strings are NUL separated and NUL terminated
pub fn clean_identity(raw: &str) -> String {
    raw.split('\0')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn match_source(source: IdentitySource, text: &str) -> Option<(ModelId, &'static str)> {
    let lowered;
    let haystack = if source.case_insensitive() {
        lowered = text.to_lowercase();
        lowered.as_str()
    } else {
        text
    };
    source
        .markers()
        .iter()
        .find(|(marker, _)| haystack.contains(marker))
        .map(|(marker, model)| (*model, *marker))
}

/// Identify the gateway model. First matching source wins, in `IdentitySource::PRIORITY` order.
pub fn detect(reader: &dyn PlatformReader) -> Detection {
    for source in IdentitySource::PRIORITY {
        let text = match reader.read_identity(source) {
            Some(text) => clean_identity(&text),
            None => {
                debug!("identity source {} not available", source);
                continue;
            }
        };
        if text.is_empty() {
            continue;
        }
        if let Some((model, marker)) = match_source(source, &text) {
            info!("detected {} from {} (marker '{}')", model, source, marker);
            return Detection::Matched {
                model,
                source,
                marker,
            };
        }
        debug!("no marker in {}: {:?}", source, text);
    }
    info!("hardware not identified, assuming {}", ModelId::DEFAULT);
    Detection::Default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_platform_uses_default() {
        let detection = detect(&StaticIdentity::default());
        assert_eq!(detection, Detection::Default);
        assert_eq!(detection.model(), ModelId::IotGateImx8);
    }

    #[test]
    fn test_unrecognised_strings_use_default() {
        let reader = StaticIdentity::default()
            .with(IdentitySource::BoardOptions, "")
            .with(IdentitySource::Model, "Generic ARM board\0")
            .with(IdentitySource::CpuInfo, "processor : 0\nmodel name : Cortex-A53");
        assert!(detect(&reader).is_default());
    }

    #[test]
    fn test_board_options_beat_model() {
        let reader = StaticIdentity::default()
            .with(IdentitySource::BoardOptions, "IOT-GATE-IMX8PLUS-D2-N16\0")
            .with(IdentitySource::Model, "Raspberry Pi Compute Module 4\0");
        assert_eq!(
            detect(&reader),
            Detection::Matched {
                model: ModelId::IotGateImx8Plus,
                source: IdentitySource::BoardOptions,
                marker: "IOT-GATE-IMX8PLUS",
            }
        );
    }

    #[test]
    fn test_din_rail_short_marker() {
        let reader = StaticIdentity::default().with(IdentitySource::BoardOptions, "IOTD-IMX8P-C1000");
        assert_eq!(detect(&reader).model(), ModelId::IotDinImx8Plus);
    }

    #[test]
    fn test_legacy_imx8_marker_is_case_sensitive() {
        let reader = StaticIdentity::default().with(IdentitySource::BoardOptions, "SBC-IOT-iMX8-C1500");
        assert_eq!(detect(&reader).model(), ModelId::SbcIotImx8);
    }

    #[test]
    fn test_compatible_list_is_matched_lowercase() {
        let reader = StaticIdentity::default().with(
            IdentitySource::BoardFamily,
            "compulab,IOT-GATE-IMX8PLUS\0fsl,imx8mp\0",
        );
        assert_eq!(detect(&reader).model(), ModelId::IotGateImx8Plus);
    }

    #[test]
    fn test_model_and_cpuinfo() {
        let reader = StaticIdentity::default().with(IdentitySource::Model, "Raspberry Pi 4 Model B\0");
        assert_eq!(detect(&reader).model(), ModelId::IotGateRpi);

        let reader = StaticIdentity::default().with(IdentitySource::CpuInfo, "Hardware : NXP i.MX93\n");
        let detection = detect(&reader);
        assert_eq!(detection.model(), ModelId::IotLink);
        assert!(matches!(
            detection,
            Detection::Matched {
                source: IdentitySource::CpuInfo,
                ..
            }
        ));
    }

    #[test]
    fn test_clean_identity_strips_nul() {
        assert_eq!(clean_identity("a,b\0c,d\0"), "a,b c,d");
        assert_eq!(clean_identity("\0"), "");
    }
}
