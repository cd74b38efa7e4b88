// Copyright © 2026 Rudis Laboratories LLC

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    // can0  123   [8]  01 02 03 04 05 06 07 08
    static ref CANDUMP_RE: Regex =
        Regex::new(r"^\s*(\w+)\s+([0-9A-Fa-f]{1,8})\s+\[(\d+)\]\s*(.*)$").unwrap();
}

/// Largest standard (11-bit) identifier
pub const CAN_SFF_MAX: u32 = 0x7ff;
/// Largest extended (29-bit) identifier
pub const CAN_EFF_MAX: u32 = 0x1fff_ffff;

/// One classic CAN frame as printed by `candump <if>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanFrame {
    pub interface: String,
    pub id: u32,
    /// 29-bit identifier (candump prints those with 8 hex digits)
    pub extended: bool,
    pub dlc: u8,
    pub data: Vec<u8>,
}

impl CanFrame {
    /// `cansend` frame argument, e.g. `123#0102`
    pub fn cansend_arg(&self) -> String {
        let id = if self.extended {
            format!("{:08X}", self.id)
        } else {
            format!("{:03X}", self.id)
        };
        format!("{}#{}", id, hex_data(&self.data))
    }
}

/// Payload as contiguous lowercase hex, the way `cansend` takes it
pub fn hex_data(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse a candump line. Remote requests, CAN FD and malformed lines yield `None`.
pub fn parse_candump_line(line: &str) -> Option<CanFrame> {
    let caps = CANDUMP_RE.captures(line)?;
    let id_text = &caps[2];
    let id = u32::from_str_radix(id_text, 16).ok()?;
    let dlc: u8 = caps[3].parse().ok()?;
    if dlc > 8 || id > CAN_EFF_MAX {
        debug!("not a classic CAN frame: {:?}", line);
        return None;
    }

    let data = caps[4]
        .split_whitespace()
        .map(|byte| u8::from_str_radix(byte, 16))
        .collect::<Result<Vec<u8>, _>>()
        .ok()?;
    if data.len() != dlc as usize {
        debug!("dlc {} but {} data bytes: {:?}", dlc, data.len(), line);
        return None;
    }

    Some(CanFrame {
        interface: caps[1].to_string(),
        id,
        extended: id_text.len() > 3 || id > CAN_SFF_MAX,
        dlc,
        data,
    })
}

/// All frames of a candump capture, skipping lines that are not frames
pub fn parse_candump(output: &str) -> Vec<CanFrame> {
    output.lines().filter_map(parse_candump_line).collect()
}
