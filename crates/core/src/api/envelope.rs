//! Normalised response envelope.
//!
//! Endpoints wrap their payload inconsistently (`{crop}`, `{data}`,
//! `{data: {crop}}`, bare arrays). Each endpoint declares the [`Shape`] it
//! accepts and anything else is rejected with [`ApiError::UnexpectedShape`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::error::ApiError;

/// Payload locations accepted for one endpoint.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Shape {
    /// Object keys that may hold the payload, checked at the top level and under `data`.
    pub keys: &'static [&'static str],
    /// Whether a bare JSON array body is the payload itself.
    pub bare_list: bool,
    /// Whether `data` itself may be the payload.
    pub data_is_payload: bool,
}

impl Shape {
    pub const fn keyed(keys: &'static [&'static str]) -> Self {
        Self {
            keys,
            bare_list: false,
            data_is_payload: true,
        }
    }

    pub const fn list(keys: &'static [&'static str]) -> Self {
        Self {
            keys,
            bare_list: true,
            data_is_payload: true,
        }
    }
}

/// Parsed top-level response body.
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    endpoint: String,
    body: Value,
}

impl Envelope {
    pub fn new(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            body,
        }
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    fn object(&self) -> Option<&Map<String, Value>> {
        self.body.as_object()
    }

    /// Backend-provided `message` (or `error`) text.
    pub fn message(&self) -> Option<String> {
        let object = self.object()?;
        ["message", "error", "msg"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    }

    /// Reject bodies that report `success: false`, even on HTTP 2xx.
    pub fn ensure_success(self, status: u16) -> Result<Self, ApiError> {
        let failed = self
            .object()
            .and_then(|object| object.get("success"))
            .and_then(Value::as_bool)
            == Some(false);
        if failed {
            return Err(ApiError::backend(status, self.message()));
        }
        Ok(self)
    }

    /// Bearer token, at the top level or under `data`.
    pub fn token(&self) -> Option<String> {
        let object = self.object()?;
        let direct = object.get("token").and_then(Value::as_str);
        let nested = object
            .get("data")
            .and_then(Value::as_object)
            .and_then(|data| data.get("token"))
            .and_then(Value::as_str);
        direct
            .or(nested)
            .map(str::to_string)
            .filter(|token| !token.is_empty())
    }

    fn locate(&self, shape: Shape) -> Option<&Value> {
        if shape.bare_list && self.body.is_array() {
            return Some(&self.body);
        }
        let object = self.object()?;
        if let Some(found) = shape.keys.iter().find_map(|key| object.get(*key)) {
            return Some(found);
        }
        let data = object.get("data")?;
        if let Some(nested) = data.as_object() {
            if let Some(found) = shape.keys.iter().find_map(|key| nested.get(*key)) {
                return Some(found);
            }
        }
        if shape.data_is_payload && !data.is_null() {
            return Some(data);
        }
        None
    }

    /// Locate and decode the payload for this endpoint.
    pub fn payload<T: DeserializeOwned>(&self, shape: Shape) -> Result<T, ApiError> {
        let value = self.locate(shape).ok_or_else(|| {
            debug!(endpoint = %self.endpoint, body = %self.body, "unexpected response shape");
            ApiError::UnexpectedShape {
                endpoint: self.endpoint.clone(),
            }
        })?;
        serde_json::from_value(value.clone()).map_err(|err| ApiError::Decode {
            endpoint: self.endpoint.clone(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Crop;
    use serde_json::json;

    const CROP: Shape = Shape::keyed(&["crop"]);
    const CROPS: Shape = Shape::list(&["crops"]);

    #[test]
    fn accepts_each_declared_location() {
        let crop = json!({"_id": "c1", "cropName": "Maize"});
        for body in [
            json!({"crop": crop.clone()}),
            json!({"data": crop.clone()}),
            json!({"success": true, "data": {"crop": crop.clone()}}),
        ] {
            let decoded: Crop = Envelope::new("/crop/c1", body).payload(CROP).unwrap();
            assert_eq!(decoded.crop_name, "Maize");
        }

        let list: Vec<Crop> = Envelope::new("/crop/recent", json!([crop.clone()]))
            .payload(CROPS)
            .unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn rejects_unknown_shape_instead_of_guessing() {
        let err = Envelope::new("/crop/c1", json!({"_id": "c1", "cropName": "Maize"}))
            .payload::<Crop>(CROP)
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::UnexpectedShape {
                endpoint: "/crop/c1".to_string()
            }
        );

        let err = Envelope::new("/crop/c1", json!({"crop": {"cropName": 5}}))
            .payload::<Crop>(CROP)
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn success_false_carries_backend_message() {
        let err = Envelope::new("/auth/login", json!({"success": false, "message": "Invalid OTP"}))
            .ensure_success(200)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid OTP");

        let err = Envelope::new("/auth/login", json!({"success": false}))
            .ensure_success(200)
            .unwrap_err();
        assert_eq!(err.to_string(), crate::api::FALLBACK_MESSAGE);
    }

    #[test]
    fn token_found_at_top_level_or_under_data() {
        let top = Envelope::new("/auth/login", json!({"token": "a"}));
        let nested = Envelope::new("/auth/login", json!({"data": {"token": "b"}}));
        assert_eq!(top.token().as_deref(), Some("a"));
        assert_eq!(nested.token().as_deref(), Some("b"));
        assert_eq!(Envelope::new("/x", json!({"token": ""})).token(), None);
    }
}
