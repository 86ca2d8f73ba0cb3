use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, Url,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{
    envelope::{Envelope, Shape},
    error::ApiError,
    inflight::InFlight,
    FarmerApi, OtpDispatch,
};
use crate::{
    config::AppConfig,
    models::{Crop, CropPayload, Farmer, RegistrationPayload},
    session::{SessionContext, SessionRecord},
};

/// Endpoint paths relative to the configured base URL.
pub mod endpoints {
    /// Sends an OTP to a registered number.
    pub const LOGIN_BY_CONTACT: &str = "/auth/mobile-user/loginByContact";
    /// Exchanges contact and OTP for a session.
    pub const VERIFY_OTP: &str = "/auth/login";
    /// Creates a farmer.
    pub const REGISTER: &str = "/farmer/register";
    /// Reserves a number ahead of full registration.
    pub const REGISTER_CONTACT: &str = "/farmer/register/contact";
    /// Crop collection; `POST` creates.
    pub const CROPS: &str = "/crop";
    /// Latest crops across farmers.
    pub const RECENT_CROPS: &str = "/crop/recent";

    /// Single farmer profile.
    pub fn farmer(id: &str) -> String {
        format!("/farmer/{id}")
    }

    /// Single crop; `PUT` updates.
    pub fn crop(id: &str) -> String {
        format!("/crop/{id}")
    }

    /// Crops owned by one farmer.
    pub fn crops_by_farmer(id: &str) -> String {
        format!("/crop/by-farmer/{id}")
    }
}

const SESSION_SHAPE: Shape = Shape::keyed(&["user", "farmer"]);
const FARMER_SHAPE: Shape = Shape::keyed(&["farmer", "user"]);
const CROP_SHAPE: Shape = Shape::keyed(&["crop"]);
const CROP_LIST_SHAPE: Shape = Shape::list(&["crops"]);

/// HTTP client for the farmer backend.
///
/// One attempt per call; no retries. The bearer token is read from the
/// shared [`SessionContext`] at send time.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: SessionContext,
    inflight: Arc<InFlight>,
}

impl ApiClient {
    /// Client rooted at `base_url`.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: SessionContext,
    ) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|err| ApiError::InvalidUrl(format!("{base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            session,
            inflight: Arc::new(InFlight::new()),
        })
    }

    /// Client configured from [`AppConfig`].
    pub fn from_config(config: &AppConfig, session: SessionContext) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout(), session)
    }

    /// Session whose token is attached to requests.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn url(&self, endpoint: &str) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty();
            for segment in endpoint.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    /// Perform one request and return the decoded, successful body.
    ///
    /// Non-2xx statuses and `success: false` bodies become
    /// [`ApiError::Backend`] carrying the backend's message. Identical
    /// concurrent GETs share a single round trip.
    pub async fn request<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        if method == Method::GET {
            let key = format!("GET {endpoint}");
            return self
                .inflight
                .run(&key, || self.send(method, endpoint, body))
                .await;
        }
        self.send(method, endpoint, body).await
    }

    async fn send<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(endpoint)?;
        info!(%method, endpoint, "api request");

        let mut builder = self.http.request(method, url);
        if let Some(token) = self.session.token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(endpoint, status = status.as_u16(), bytes = text.len(), "api response");

        let parsed: Option<Value> = if text.trim().is_empty() {
            Some(Value::Null)
        } else {
            serde_json::from_str(&text).ok()
        };

        if !status.is_success() {
            let message = parsed
                .map(|body| Envelope::new(endpoint, body))
                .and_then(|envelope| envelope.message());
            return Err(ApiError::backend(status.as_u16(), message));
        }

        let body = parsed.ok_or_else(|| ApiError::Decode {
            endpoint: endpoint.to_string(),
            reason: "response is not JSON".to_string(),
        })?;
        let envelope = Envelope::new(endpoint, body).ensure_success(status.as_u16())?;
        Ok(envelope.into_body())
    }

    async fn envelope<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Envelope, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let value = self.request(method, endpoint, body).await?;
        Ok(Envelope::new(endpoint, value))
    }

    async fn get(&self, endpoint: &str) -> Result<Envelope, ApiError> {
        self.envelope::<Value>(Method::GET, endpoint, None).await
    }
}

#[async_trait]
impl FarmerApi for ApiClient {
    async fn mobile_login_by_contact(&self, contact: &str) -> Result<OtpDispatch, ApiError> {
        let body = json!({ "contact": contact });
        let envelope = self
            .envelope(Method::POST, endpoints::LOGIN_BY_CONTACT, Some(&body))
            .await?;
        Ok(OtpDispatch {
            message: envelope.message(),
        })
    }

    async fn verify_otp(&self, contact: &str, otp: &str) -> Result<SessionRecord, ApiError> {
        let body = json!({ "contact": contact, "otp": otp });
        let envelope = self
            .envelope(Method::POST, endpoints::VERIFY_OTP, Some(&body))
            .await?;
        let mut record: SessionRecord = envelope.payload(SESSION_SHAPE)?;
        if record.token.is_none() {
            record.token = envelope.token();
        }
        if record.contact.is_none() {
            record.contact = Some(contact.to_string());
        }
        Ok(record)
    }

    async fn register_farmer(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<SessionRecord, ApiError> {
        let envelope = self
            .envelope(Method::POST, endpoints::REGISTER, Some(payload))
            .await?;
        let farmer: Farmer = envelope.payload(FARMER_SHAPE)?;
        let mut record = SessionRecord::from_farmer(&farmer, envelope.token());
        if record.contact.is_none() {
            record.contact = Some(payload.contact.clone());
        }
        Ok(record)
    }

    async fn register_contact(&self, contact: &str) -> Result<(), ApiError> {
        let body = json!({ "contact": contact });
        self.request(Method::POST, endpoints::REGISTER_CONTACT, Some(&body))
            .await
            .map(|_| ())
    }

    async fn get_farmer(&self, farmer_id: &str) -> Result<Farmer, ApiError> {
        self.get(&endpoints::farmer(farmer_id))
            .await?
            .payload(FARMER_SHAPE)
    }

    async fn get_crop(&self, crop_id: &str) -> Result<Crop, ApiError> {
        self.get(&endpoints::crop(crop_id)).await?.payload(CROP_SHAPE)
    }

    async fn crops_by_farmer(&self, farmer_id: &str) -> Result<Vec<Crop>, ApiError> {
        self.get(&endpoints::crops_by_farmer(farmer_id))
            .await?
            .payload(CROP_LIST_SHAPE)
    }

    async fn recent_crops(&self) -> Result<Vec<Crop>, ApiError> {
        self.get(endpoints::RECENT_CROPS)
            .await?
            .payload(CROP_LIST_SHAPE)
    }

    async fn create_crop(&self, payload: &CropPayload) -> Result<Crop, ApiError> {
        self.envelope(Method::POST, endpoints::CROPS, Some(payload))
            .await?
            .payload(CROP_SHAPE)
    }

    async fn update_crop(&self, crop_id: &str, payload: &CropPayload) -> Result<Crop, ApiError> {
        self.envelope(Method::PUT, &endpoints::crop(crop_id), Some(payload))
            .await?
            .payload(CROP_SHAPE)
    }
}
