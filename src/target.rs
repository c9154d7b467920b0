use serde::Serialize;

use crate::round2;
use crate::scale::GradeScale;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TargetError {
    #[error("Please enter a valid target CGPA")]
    InvalidTarget,
    #[error("Target CGPA must be between 0.00 and {max:.2}")]
    TargetOutOfRange { max: f64 },
    #[error("Next semester credits must be a number greater than zero")]
    InvalidCredits,
}

/// Classified answer to "what GPA do I need next term".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetOutcome {
    Required { required: f64 },
    Unreachable { required: f64, max: f64 },
    AlreadyAchieved { required: f64 },
}

impl TargetOutcome {
    pub fn required(&self) -> f64 {
        match self {
            TargetOutcome::Required { required }
            | TargetOutcome::Unreachable { required, .. }
            | TargetOutcome::AlreadyAchieved { required } => *required,
        }
    }
}

pub fn required_gpa(
    current_cgpa: f64,
    current_credits: f64,
    target_cgpa: f64,
    next_credits: f64,
    scale: &GradeScale,
) -> Result<TargetOutcome, TargetError> {
    let max = scale.max_point();

    if target_cgpa.is_nan() {
        return Err(TargetError::InvalidTarget);
    }
    if target_cgpa > max || target_cgpa < 0.0 {
        return Err(TargetError::TargetOutOfRange { max });
    }
    if next_credits.is_nan() || next_credits <= 0.0 {
        return Err(TargetError::InvalidCredits);
    }

    let required = round2(
        (target_cgpa * (current_credits + next_credits) - current_cgpa * current_credits)
            / next_credits,
    );

    Ok(if required > max {
        TargetOutcome::Unreachable { required, max }
    } else if required < 0.0 {
        TargetOutcome::AlreadyAchieved { required }
    } else {
        TargetOutcome::Required { required }
    })
}
