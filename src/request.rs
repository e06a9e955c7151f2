use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub const MIN_DURATION_S: u8 = 3;
pub const MAX_DURATION_S: u8 = 6;

const MAX_USER_ID_LEN: usize = 128;

/// Camera/model action for animation requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Turn,
    Wave,
    Walk,
}

impl Action {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        match raw.trim() {
            "turn" => Ok(Action::Turn),
            "wave" => Ok(Action::Wave),
            "walk" => Ok(Action::Walk),
            other => Err(ServiceError::Validation(format!(
                "unsupported action: {other} (expected turn, wave or walk)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Turn => "turn",
            Action::Wave => "wave",
            Action::Walk => "walk",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Action::Turn => "Turn",
            Action::Wave => "Wave",
            Action::Walk => "Walk",
        }
    }
}

/// Closed set of accepted output aspect ratios.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aspect {
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    FourThree,
    #[serde(rename = "3:4")]
    ThreeFour,
}

impl Aspect {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        match raw.trim() {
            "9:16" => Ok(Aspect::Portrait),
            "16:9" => Ok(Aspect::Landscape),
            "1:1" => Ok(Aspect::Square),
            "4:3" => Ok(Aspect::FourThree),
            "3:4" => Ok(Aspect::ThreeFour),
            other => Err(ServiceError::Validation(format!(
                "unsupported aspect: {other} (expected 9:16, 16:9, 1:1, 4:3 or 3:4)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Portrait => "9:16",
            Aspect::Landscape => "16:9",
            Aspect::Square => "1:1",
            Aspect::FourThree => "4:3",
            Aspect::ThreeFour => "3:4",
        }
    }
}

/// Transformation parameters, one tagged variant per operation family.
/// The serialized form feeds the cache fingerprint, so variants carry an
/// explicit tag and no optional fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformParams {
    Composite { garment_ref: String },
    Animate { action: Action, duration_s: u8, aspect: Aspect },
    ComposeActions { actions: Vec<Action>, aspect: Aspect },
}

impl TransformParams {
    /// Cache key namespace for this operation family.
    pub fn namespace(&self) -> &'static str {
        match self {
            TransformParams::Composite { .. } => "tryon",
            TransformParams::Animate { .. } | TransformParams::ComposeActions { .. } => "video",
        }
    }
}

/// A fully validated generation request. Constructing one is the only way
/// parameters reach the resolver, so all shape checks live here.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub user_id: String,
    pub input_ref: String,
    pub params: TransformParams,
}

impl GenerationRequest {
    pub fn new(
        user_id: String,
        input_ref: String,
        params: TransformParams,
    ) -> Result<Self, ServiceError> {
        validate_user_id(&user_id)?;
        if input_ref.trim().is_empty() {
            return Err(ServiceError::Validation(
                "input reference must not be empty".to_string(),
            ));
        }
        match &params {
            TransformParams::Composite { garment_ref } => {
                if garment_ref.trim().is_empty() {
                    return Err(ServiceError::Validation(
                        "garment reference must not be empty".to_string(),
                    ));
                }
            }
            TransformParams::Animate { duration_s, .. } => {
                validate_duration(*duration_s)?;
            }
            TransformParams::ComposeActions { actions, .. } => {
                if actions.is_empty() {
                    return Err(ServiceError::Validation(
                        "actions must not be empty".to_string(),
                    ));
                }
            }
        }
        Ok(Self {
            user_id,
            input_ref,
            params,
        })
    }
}

/// User ids become store key components and file names, so the accepted
/// alphabet excludes path separators and the key delimiter.
pub fn validate_user_id(raw: &str) -> Result<(), ServiceError> {
    if raw.trim().is_empty() {
        return Err(ServiceError::Validation(
            "user_id must not be empty".to_string(),
        ));
    }
    if raw.len() > MAX_USER_ID_LEN {
        return Err(ServiceError::Validation(format!(
            "user_id longer than {MAX_USER_ID_LEN} characters"
        )));
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
    {
        return Err(ServiceError::Validation(
            "user_id may only contain letters, digits, '.', '_', '-' and '@'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_duration(duration_s: u8) -> Result<(), ServiceError> {
    if !(MIN_DURATION_S..=MAX_DURATION_S).contains(&duration_s) {
        return Err(ServiceError::Validation(format!(
            "duration_s must be between {MIN_DURATION_S} and {MAX_DURATION_S} seconds (got {duration_s})"
        )));
    }
    Ok(())
}
