//! Success/failure envelope returned by every backend operation.
//!
//! On the wire an envelope is either `{"success": true, "data": ...}` or
//! `{"success": false, "error": "...", "code": "..."}`. [`Envelope::into_result`]
//! is the one place that turns a failure envelope into an error.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{ServiceError, SuperateError, SuperateResult};

/// Uniform result shape of backend calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success { data: T },
    Failure { error: String, code: Option<String> },
}

#[derive(Serialize, Deserialize)]
struct RawEnvelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl<T> Envelope<T> {
    /// Wrap a successful payload.
    pub fn ok(data: T) -> Self {
        Self::Success { data }
    }

    /// Build a failure envelope without an error code.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            code: None,
        }
    }

    /// Build a failure envelope carrying a backend error code.
    pub fn failure_with_code(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            code: Some(code.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Unwrap the payload, or turn the failure into a [`ServiceError`].
    ///
    /// `operation` names the call for error messages and logs.
    pub fn into_result(self, operation: &str) -> SuperateResult<T> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure { error, code } => Err(SuperateError::Service(ServiceError::rejected(
                operation, code, error,
            ))),
        }
    }

    /// Transform the payload, leaving failures untouched.
    pub fn map<U, F>(self, f: F) -> Envelope<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success { data } => Envelope::Success { data: f(data) },
            Self::Failure { error, code } => Envelope::Failure { error, code },
        }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            Self::Success { data } => RawEnvelope {
                success: true,
                data: Some(data),
                error: None,
                code: None,
            },
            Self::Failure { error, code } => RawEnvelope {
                success: false,
                data: None,
                error: Some(error.clone()),
                code: code.clone(),
            },
        };
        raw.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEnvelope::<Value>::deserialize(deserializer)?;
        if raw.success {
            // `{"success": true}` without data is how unit operations answer.
            let data = serde_json::from_value(raw.data.unwrap_or(Value::Null))
                .map_err(D::Error::custom)?;
            Ok(Self::Success { data })
        } else {
            Ok(Self::Failure {
                error: raw
                    .error
                    .unwrap_or_else(|| "unspecified backend error".to_string()),
                code: raw.code,
            })
        }
    }
}

impl<T> From<Envelope<T>> for Result<T, String> {
    fn from(envelope: Envelope<T>) -> Self {
        match envelope {
            Envelope::Success { data } => Ok(data),
            Envelope::Failure { error, .. } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Subject {
        id: String,
        name: String,
    }

    #[test]
    fn test_success_envelope_unwraps_data() {
        let envelope: Envelope<Vec<Subject>> = serde_json::from_value(json!({
            "success": true,
            "data": [{"id": "mat", "name": "Matemáticas"}]
        }))
        .unwrap();

        let subjects = envelope.into_result("list subjects").unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].name, "Matemáticas");
    }

    #[test]
    fn test_failure_envelope_becomes_service_error() {
        let envelope: Envelope<Subject> = serde_json::from_value(json!({
            "success": false,
            "error": "permission denied"
        }))
        .unwrap();

        let err = envelope.into_result("get subject").unwrap_err();
        match err {
            SuperateError::Service(ServiceError::Rejected {
                operation, message, ..
            }) => {
                assert_eq!(operation, "get subject");
                assert_eq!(message, "permission denied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failure_with_quota_code_is_classified() {
        let envelope: Envelope<()> = serde_json::from_value(json!({
            "success": false,
            "error": "Too many writes",
            "code": "resource-exhausted"
        }))
        .unwrap();

        let err = envelope.into_result("record last seen").unwrap_err();
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn test_success_without_data_for_unit() {
        let envelope: Envelope<()> = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(envelope.is_success());
        assert!(envelope.into_result("delete").is_ok());
    }

    #[test]
    fn test_success_without_data_for_struct_is_rejected() {
        let result: Result<Envelope<Subject>, _> =
            serde_json::from_value(json!({"success": true}));
        assert!(result.is_err());
    }

    #[test]
    fn test_failure_without_message_gets_placeholder() {
        let envelope: Envelope<()> = serde_json::from_value(json!({"success": false})).unwrap();
        match envelope {
            Envelope::Failure { error, code } => {
                assert_eq!(error, "unspecified backend error");
                assert!(code.is_none());
            }
            Envelope::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn test_serialize_matches_wire_shape() {
        let value = serde_json::to_value(Envelope::ok(3)).unwrap();
        assert_eq!(value, json!({"success": true, "data": 3}));

        let value = serde_json::to_value(Envelope::<i32>::failure_with_code("nope", "x")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "nope", "code": "x"}));
    }

    #[test]
    fn test_map_transforms_success_only() {
        let names = Envelope::ok(vec!["Matemáticas", "Lenguaje"]).map(|v| v.len());
        assert_eq!(names, Envelope::ok(2));

        let failed = Envelope::<Vec<&str>>::failure_with_code("denied", "permission-denied")
            .map(|v| v.len());
        assert_eq!(
            failed,
            Envelope::failure_with_code("denied", "permission-denied")
        );
    }
}
