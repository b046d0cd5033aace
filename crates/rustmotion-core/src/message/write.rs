use crate::types::Operation;
use crate::ValidationError;
use serde::{Deserialize, Serialize};

/// Payload of a `WriteDevice` request.
///
/// Single-motor blinds use `operation`, `targetPosition` and `targetAngle`;
/// top-down/bottom-up blinds address each rail with the `_T`/`_B` fields.
/// Targets are signed so out-of-range input can be represented and rejected
/// by [`validate`](Self::validate) instead of silently wrapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteDeviceData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(rename = "targetPosition", skip_serializing_if = "Option::is_none")]
    pub target_position: Option<i32>,
    #[serde(rename = "targetAngle", skip_serializing_if = "Option::is_none")]
    pub target_angle: Option<i32>,
    #[serde(rename = "operation_T", skip_serializing_if = "Option::is_none")]
    pub operation_top: Option<Operation>,
    #[serde(rename = "operation_B", skip_serializing_if = "Option::is_none")]
    pub operation_bottom: Option<Operation>,
    #[serde(rename = "targetPosition_T", skip_serializing_if = "Option::is_none")]
    pub target_position_top: Option<i32>,
    #[serde(rename = "targetPosition_B", skip_serializing_if = "Option::is_none")]
    pub target_position_bottom: Option<i32>,
}

const POSITION_RANGE: (i32, i32) = (0, 100);
const ANGLE_RANGE: (i32, i32) = (0, 180);

impl WriteDeviceData {
    pub fn operation(operation: Operation) -> Self {
        Self {
            operation: Some(operation),
            ..Default::default()
        }
    }

    pub fn position(target_position: i32) -> Self {
        Self {
            target_position: Some(target_position),
            ..Default::default()
        }
    }

    pub fn angle(target_angle: i32) -> Self {
        Self {
            target_angle: Some(target_angle),
            ..Default::default()
        }
    }

    /// Checks every target against its allowed range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check("targetPosition", self.target_position, POSITION_RANGE)?;
        check("targetAngle", self.target_angle, ANGLE_RANGE)?;
        check("targetPosition_T", self.target_position_top, POSITION_RANGE)?;
        check("targetPosition_B", self.target_position_bottom, POSITION_RANGE)?;
        Ok(())
    }
}

fn check(
    field: &'static str,
    value: Option<i32>,
    (min, max): (i32, i32),
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v < min || v > max => Err(ValidationError {
            field,
            value: v,
            min,
            max,
        }),
        _ => Ok(()),
    }
}
