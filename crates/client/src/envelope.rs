//! The `{success, message, data}` response envelope and its classification.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::transport::TransportResponse;

/// Backend response envelope.
///
/// Fields other than `success`, `message` and `data` (some endpoints return
/// e.g. `user_info` or `total`) are kept in `extra` so the caller receives the
/// body unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Deserialize `data` into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        T::deserialize(&self.data).map_err(|e| ApiError::new(format!("unexpected response data: {e}")))
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        match key {
            "data" => Some(&self.data),
            _ => self.extra.get(key),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fallback messages used when the backend gives none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureMessages {
    /// Non-2xx response whose body is not JSON.
    pub transport: &'static str,
    /// `success: false` without a message.
    pub business: &'static str,
}

impl FailureMessages {
    pub const REQUEST: FailureMessages = FailureMessages {
        transport: "request failed",
        business: "operation failed",
    };

    pub const UPLOAD: FailureMessages = FailureMessages {
        transport: "upload failed",
        business: "upload failed",
    };
}

/// Classify a transport response.
///
/// 1. non-2xx: message from the JSON body, else `HTTP <status>`, else the
///    transport fallback when the body is not JSON at all
/// 2. body is not JSON: the transport fallback; JSON but not an envelope: the
///    business fallback
/// 3. `success: false`: the envelope message, else the business fallback
/// 4. otherwise the whole envelope
pub fn interpret(response: &TransportResponse, messages: FailureMessages) -> Result<Envelope, ApiError> {
    if !response.is_success() {
        let message = match serde_json::from_slice::<Value>(&response.body) {
            Ok(body) => match body.get("message") {
                Some(Value::String(m)) if !m.is_empty() => m.clone(),
                _ => format!("HTTP {}", response.status),
            },
            Err(_) => messages.transport.to_string(),
        };
        return Err(ApiError::new(message));
    }

    let body: Value = serde_json::from_slice(&response.body).map_err(|e| {
        tracing::warn!(status = response.status, error = %e, "response body is not JSON");
        ApiError::new(messages.transport)
    })?;

    // Parseable but not an envelope: no success flag, so a business failure.
    let envelope = Envelope::deserialize(body).map_err(|e| {
        tracing::warn!(status = response.status, error = %e, "response body is not an envelope");
        ApiError::new(messages.business)
    })?;

    if !envelope.success {
        let message = if envelope.message.is_empty() {
            messages.business.to_string()
        } else {
            envelope.message
        };
        return Err(ApiError::new(message));
    }

    Ok(envelope)
}
