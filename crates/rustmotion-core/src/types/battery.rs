/// Battery pack reading derived from a raw `batteryLevel`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryInfo {
    pub voltage: f64,
    /// Charge estimate in `0.0..=1.0`.
    pub percent: f64,
}

/// Converts a raw battery level (centivolts) into voltage and charge.
///
/// The pack size is inferred from the voltage: 2-cell (8.4V nominal) up to
/// 9.4V, 3-cell (12.6V) up to 13.6V, 4-cell (16.8V) above that.
pub fn battery_info(battery_level: u32) -> BatteryInfo {
    let voltage = f64::from(battery_level) / 100.0;
    let percent = if voltage > 0.0 && voltage <= 9.4 {
        (voltage - 6.2) / (8.4 - 6.2)
    } else if voltage > 9.4 && voltage <= 13.6 {
        (voltage - 10.4) / (12.6 - 10.4)
    } else if voltage > 13.6 {
        (voltage - 14.6) / (16.8 - 14.6)
    } else {
        0.0
    };
    BatteryInfo {
        voltage,
        percent: percent.clamp(0.0, 1.0),
    }
}
