//! Backend API: HTTP client, response envelope and the operations screens call.

mod client;
mod envelope;
mod error;
mod inflight;

use async_trait::async_trait;
use tracing::{info, warn};

pub use client::{endpoints, ApiClient};
pub use error::{ApiError, FALLBACK_MESSAGE};
pub use inflight::InFlight;

use crate::{
    models::{Crop, CropPayload, Farmer, RegistrationPayload},
    session::SessionRecord,
};

/// Acknowledgement of an OTP being sent to a number.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OtpDispatch {
    /// Informational message from the backend, if any.
    pub message: Option<String>,
}

/// Operations the authentication flow and screens perform against the backend.
#[async_trait]
pub trait FarmerApi: Send + Sync {
    /// `POST /auth/mobile-user/loginByContact`: request an OTP for a registered number.
    async fn mobile_login_by_contact(&self, contact: &str) -> Result<OtpDispatch, ApiError>;

    /// `POST /auth/login`: exchange contact and OTP for a session.
    async fn verify_otp(&self, contact: &str, otp: &str) -> Result<SessionRecord, ApiError>;

    /// `POST /farmer/register`: create a farmer and sign them in.
    async fn register_farmer(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<SessionRecord, ApiError>;

    /// `POST /farmer/register/contact`: reserve a number before the full profile is filled.
    async fn register_contact(&self, contact: &str) -> Result<(), ApiError>;

    /// `GET /farmer/:id`.
    async fn get_farmer(&self, farmer_id: &str) -> Result<Farmer, ApiError>;

    /// `GET /crop/:id`.
    async fn get_crop(&self, crop_id: &str) -> Result<Crop, ApiError>;

    /// `GET /crop/by-farmer/:id`.
    async fn crops_by_farmer(&self, farmer_id: &str) -> Result<Vec<Crop>, ApiError>;

    /// `GET /crop/recent`.
    async fn recent_crops(&self) -> Result<Vec<Crop>, ApiError>;

    /// `POST /crop`.
    async fn create_crop(&self, payload: &CropPayload) -> Result<Crop, ApiError>;

    /// `PUT /crop/:id`.
    async fn update_crop(&self, crop_id: &str, payload: &CropPayload) -> Result<Crop, ApiError>;

    /// Whether `contact` belongs to a registered farmer.
    ///
    /// Asks the login endpoint to send an OTP. A backend refusal (4xx or a
    /// `success:false` body) means the number is not registered. Server
    /// errors, network and decode failures are returned as errors rather than
    /// read as "not registered".
    async fn check_farmer_exists(&self, contact: &str) -> Result<bool, ApiError> {
        match self.mobile_login_by_contact(contact).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_refusal() => {
                info!(%err, "contact not recognised by backend");
                Ok(false)
            }
            Err(err) => {
                warn!(%err, "existence check failed");
                Err(err)
            }
        }
    }
}
