//! Enumerations reported in device status payloads.
//!
//! Inbound payloads keep the raw integers; these tables give them names.
//! Only [`Operation`] is ever sent to the gateway.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlindType {
    RollerBlind,
    VenetianBlind,
    RomanBlind,
    HoneycombBlind,
    ShangriLaBlind,
    RollerShutter,
    RollerGate,
    Awning,
    TopDownBottomUp,
    DayNightBlind,
    DimmingBlind,
    Curtain,
    CurtainLeft,
    CurtainRight,
    DoubleRoller,
    Switch,
}

impl BlindType {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::RollerBlind => 1,
            Self::VenetianBlind => 2,
            Self::RomanBlind => 3,
            Self::HoneycombBlind => 4,
            Self::ShangriLaBlind => 5,
            Self::RollerShutter => 6,
            Self::RollerGate => 7,
            Self::Awning => 8,
            Self::TopDownBottomUp => 9,
            Self::DayNightBlind => 10,
            Self::DimmingBlind => 11,
            Self::Curtain => 12,
            Self::CurtainLeft => 13,
            Self::CurtainRight => 14,
            Self::DoubleRoller => 17,
            Self::Switch => 43,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Self::RollerBlind,
            2 => Self::VenetianBlind,
            3 => Self::RomanBlind,
            4 => Self::HoneycombBlind,
            5 => Self::ShangriLaBlind,
            6 => Self::RollerShutter,
            7 => Self::RollerGate,
            8 => Self::Awning,
            9 => Self::TopDownBottomUp,
            10 => Self::DayNightBlind,
            11 => Self::DimmingBlind,
            12 => Self::Curtain,
            13 => Self::CurtainLeft,
            14 => Self::CurtainRight,
            17 => Self::DoubleRoller,
            43 => Self::Switch,
            _ => return None,
        })
    }
}

/// Motor command, and the last command a motor reports having run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CloseDown,
    OpenUp,
    Stop,
    StatusQuery,
}

impl Operation {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::CloseDown => 0,
            Self::OpenUp => 1,
            Self::Stop => 2,
            Self::StatusQuery => 5,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::CloseDown),
            1 => Some(Self::OpenUp),
            2 => Some(Self::Stop),
            5 => Some(Self::StatusQuery),
            _ => None,
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_u8())
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Self::from_u8(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown operation {raw}")))
    }
}

/// Gateway state carried in heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurrentState {
    Working,
    Pairing,
    Updating,
}

impl CurrentState {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Working => 1,
            Self::Pairing => 2,
            Self::Updating => 3,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Working),
            2 => Some(Self::Pairing),
            3 => Some(Self::Updating),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoltageMode {
    Ac,
    Dc,
}

impl VoltageMode {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Ac => 0,
            Self::Dc => 1,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ac),
            1 => Some(Self::Dc),
            _ => None,
        }
    }
}

/// Travel-limit calibration state of a motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitsState {
    NoLimits,
    TopLimitDetected,
    BottomLimitDetected,
    LimitsDetected,
    ThirdLimitDetected,
}

impl LimitsState {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::NoLimits => 0,
            Self::TopLimitDetected => 1,
            Self::BottomLimitDetected => 2,
            Self::LimitsDetected => 3,
            Self::ThirdLimitDetected => 4,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NoLimits),
            1 => Some(Self::TopLimitDetected),
            2 => Some(Self::BottomLimitDetected),
            3 => Some(Self::LimitsDetected),
            4 => Some(Self::ThirdLimitDetected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WirelessMode {
    UniDirectional,
    BiDirectional,
    BiDirectionalMechanicalLimits,
    Other,
}

impl WirelessMode {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::UniDirectional => 0,
            Self::BiDirectional => 1,
            Self::BiDirectionalMechanicalLimits => 2,
            Self::Other => 3,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::UniDirectional),
            1 => Some(Self::BiDirectional),
            2 => Some(Self::BiDirectionalMechanicalLimits),
            3 => Some(Self::Other),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BlindType, Operation};

    #[test]
    fn blind_type_codes_roundtrip() {
        for raw in 0u8..=u8::MAX {
            if let Some(ty) = BlindType::from_u8(raw) {
                assert_eq!(ty.to_u8(), raw);
            }
        }
        assert_eq!(BlindType::from_u8(17), Some(BlindType::DoubleRoller));
        assert_eq!(BlindType::from_u8(15), None);
    }

    #[test]
    fn operation_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Operation::StatusQuery).unwrap(), "5");
        let op: Operation = serde_json::from_str("2").unwrap();
        assert_eq!(op, Operation::Stop);
        assert!(serde_json::from_str::<Operation>("3").is_err());
    }
}
