pub mod battery;
pub mod device_type;
pub mod status;

pub use battery::{battery_info, BatteryInfo};
pub use device_type::DeviceType;
pub use status::{BlindType, CurrentState, LimitsState, Operation, VoltageMode, WirelessMode};
