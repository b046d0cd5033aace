use core::fmt;
use serde::{Deserialize, Serialize};

/// Gateway device type, carried on the wire as an eight-digit string.
///
/// Types without a known mapping are kept verbatim in
/// [`Other`](Self::Other) so that new hardware never fails a decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    Gateway,
    Blind,
    TopDownBottomUp,
    DoubleRoller,
    Other(String),
}

impl DeviceType {
    pub const GATEWAY: &'static str = "02000002";
    pub const BLIND: &'static str = "10000000";
    pub const TOP_DOWN_BOTTOM_UP: &'static str = "10000001";
    pub const DOUBLE_ROLLER: &'static str = "10000002";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Gateway => Self::GATEWAY,
            Self::Blind => Self::BLIND,
            Self::TopDownBottomUp => Self::TOP_DOWN_BOTTOM_UP,
            Self::DoubleRoller => Self::DOUBLE_ROLLER,
            Self::Other(code) => code,
        }
    }

    pub fn from_wire(code: &str) -> Self {
        match code {
            Self::GATEWAY => Self::Gateway,
            Self::BLIND => Self::Blind,
            Self::TOP_DOWN_BOTTOM_UP => Self::TopDownBottomUp,
            Self::DOUBLE_ROLLER => Self::DoubleRoller,
            other => Self::Other(other.to_string()),
        }
    }

    /// Human-readable name used by the tools.
    pub fn name(&self) -> &str {
        match self {
            Self::Gateway => "Gateway",
            Self::Blind => "Standard Blind",
            Self::TopDownBottomUp => "Top Down Bottom Up",
            Self::DoubleRoller => "Double Roller",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        Self::from_wire(&value)
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        match value {
            DeviceType::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::DeviceType;

    #[test]
    fn known_codes_map_both_ways() {
        for ty in [
            DeviceType::Gateway,
            DeviceType::Blind,
            DeviceType::TopDownBottomUp,
            DeviceType::DoubleRoller,
        ] {
            assert_eq!(DeviceType::from_wire(ty.as_str()), ty);
        }
    }

    #[test]
    fn unknown_code_is_preserved() {
        let ty: DeviceType = serde_json::from_str("\"22000005\"").unwrap();
        assert_eq!(ty, DeviceType::Other("22000005".into()));
        assert_eq!(serde_json::to_string(&ty).unwrap(), "\"22000005\"");
    }
}
