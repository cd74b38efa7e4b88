mod analog;
mod can;
mod detect;
mod error;
mod geo;
mod gpio;
mod net;
mod platform;
mod profile;
mod serial;
mod signal;

pub use crate::analog::{
    current_to_percent, raw_to_celsius, raw_to_current_ma, raw_to_voltage, rescale, MAX_DECIMALS,
    AnalogChannelDescriptor, Calibration, InputKind, RescaledReading, ScaleRange, ScaledReading,
    SensorType, TemperatureReading,
};
pub use crate::can::{hex_data, parse_candump, parse_candump_line, CanFrame, CAN_EFF_MAX, CAN_SFF_MAX};
pub use crate::detect::{clean_identity, detect, Detection, IdentitySource, PlatformReader, StaticIdentity};
pub use crate::error::{Error, Result};
pub use crate::geo::{
    format_coordinates, haversine_distance, parse_tpv, to_dms, Axis, Coordinate, CoordinateFormat,
    GpsFix,
};
pub use crate::gpio::GpioBackend;
pub use crate::net::{cidr_to_netmask, netmask_to_cidr, parse_default_gateway, parse_ip_addr, InterfaceAddress};
pub use crate::platform::{read_raw, AnalogDevice, SocTemperature, SysfsPlatform};
pub use crate::profile::{
    resolve, resolve_str, Capabilities, HardwareProfile, LedColor, LedTable, LedWiring, ModelId,
    PinRef, Resolved,
};
pub use crate::serial::{
    available_devices, mode_switch_level, open_port, port_status, resolve_port, PortStatus,
    SerialSpecs, UartMode,
};
pub use crate::signal::{
    dbm_to_percent, parse_iwconfig_signal, parse_mmcli_signal, rsrp_quality, CellularSignal,
    SignalTier, WifiSignal,
};
