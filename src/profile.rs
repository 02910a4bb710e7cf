use crate::errors::{AppError, AppResult};
use crate::models::RemoteProfile;
use crate::transport::ApiTransport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PROFILE_PATH: &str = "profile";

/// Raw onboarding form input, exactly as typed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    pub weight: String,
    pub height: String,
    pub age: String,
    pub sleep_quality: String,
    pub sleep_hours: String,
}

/// Coerced profile body. Fields that do not parse stay NaN and are sent
/// as JSON `null`; there are no range checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub weight: f64,
    pub height: f64,
    pub age: f64,
    pub sleep_quality: f64,
    pub sleep_hours: f64,
}

impl ProfilePayload {
    pub fn from_form(form: &ProfileForm) -> Self {
        Self {
            weight: coerce_number(&form.weight),
            height: coerce_number(&form.height),
            age: coerce_number(&form.age),
            sleep_quality: coerce_number(&form.sleep_quality),
            sleep_hours: coerce_number(&form.sleep_hours),
        }
    }

    pub fn non_numeric_fields(&self) -> Vec<&'static str> {
        [
            ("weight", self.weight),
            ("height", self.height),
            ("age", self.age),
            ("sleepQuality", self.sleep_quality),
            ("sleepHours", self.sleep_hours),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_nan())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Loose numeric coercion for form text: surrounding whitespace is ignored,
/// blank input is zero, radix prefixes and signed `Infinity` are accepted,
/// anything else is NaN.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return radix_value(digits, radix);
        }
    }

    // Rust's float grammar also takes "inf"/"nan" spellings; form input does not.
    let is_decimal = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !is_decimal {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Digits only: a sign or an empty tail after the prefix is NaN. Values past
/// `u64::MAX` keep growing as floats.
fn radix_value(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0_f64, |acc, c| c.to_digit(radix).map(|digit| acc * f64::from(radix) + f64::from(digit)))
        .unwrap_or(f64::NAN)
}

#[derive(Clone)]
pub struct ProfileGateway {
    transport: Arc<dyn ApiTransport>,
}

impl ProfileGateway {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    pub async fn fetch(&self) -> AppResult<RemoteProfile> {
        let body = self.transport.get(PROFILE_PATH).await?;
        if body.is_null() {
            return Err(AppError::NotFound("profile body was empty".to_string()));
        }
        Ok(serde_json::from_value(body)?)
    }

    pub async fn update(&self, payload: &ProfilePayload) -> AppResult<RemoteProfile> {
        let body = self
            .transport
            .put(PROFILE_PATH, serde_json::to_value(payload)?)
            .await?;
        if body.is_null() {
            return Err(AppError::Submit("profile update returned no record".to_string()));
        }
        Ok(serde_json::from_value(body)?)
    }
}
