//! Phone/OTP sign-in state machine.
//!
//! ```text
//! MobileEntry --exists--> OtpEntry --verified--> Authenticated
//!      |                     |
//!      | not found           +--go_back--> MobileEntry
//!      v
//! RegistrationOffer --accept--> Registration --registered--> Authenticated
//!      +--decline--> MobileEntry
//! ```
//!
//! Every network step is split into a synchronous `begin_*` (validation and
//! state checks, no I/O) and an `apply_*` that consumes the API result, so a
//! UI can run the request on a spawned task. The `submit_*` helpers chain
//! both for callers that can await in place.

use thiserror::Error;
use tracing::info;

use crate::{
    api::{ApiError, FarmerApi},
    forms::{validate_mobile, validate_otp, ValidationError},
    models::RegistrationPayload,
    session::{SessionContext, SessionRecord},
};

/// Position in the sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Waiting for a mobile number.
    MobileEntry,
    /// OTP sent to `contact`; waiting for the code.
    OtpEntry {
        /// Number the OTP was sent to.
        contact: String,
    },
    /// `contact` is not registered; the user decides whether to register.
    RegistrationOffer {
        /// Unrecognised number.
        contact: String,
    },
    /// Filling the registration wizard for `contact`.
    Registration {
        /// Number being registered.
        contact: String,
    },
    /// Signed in.
    Authenticated,
}

/// Why an auth action did not advance the flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Rejected client-side; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The action does not apply to the current step.
    #[error("cannot {action} from {step:?}")]
    InvalidState {
        /// Attempted action.
        action: &'static str,
        /// Step the flow was in.
        step: AuthStep,
    },
}

/// Sign-in flow driven by the login, OTP and registration screens.
#[derive(Debug, Clone)]
pub struct AuthFlow {
    step: AuthStep,
}

impl Default for AuthFlow {
    fn default() -> Self {
        Self {
            step: AuthStep::MobileEntry,
        }
    }
}

impl AuthFlow {
    /// Start at the step matching the persisted session.
    pub fn resume(session: &SessionContext) -> Self {
        let step = if session.is_authenticated() {
            AuthStep::Authenticated
        } else {
            AuthStep::MobileEntry
        };
        Self { step }
    }

    /// Current step.
    pub fn step(&self) -> &AuthStep {
        &self.step
    }

    /// Number currently being verified or registered.
    pub fn contact(&self) -> Option<&str> {
        match &self.step {
            AuthStep::OtpEntry { contact }
            | AuthStep::RegistrationOffer { contact }
            | AuthStep::Registration { contact } => Some(contact),
            AuthStep::MobileEntry | AuthStep::Authenticated => None,
        }
    }

    fn invalid(&self, action: &'static str) -> AuthError {
        AuthError::InvalidState {
            action,
            step: self.step.clone(),
        }
    }

    /// Validate a mobile number; returns the normalised contact to check.
    pub fn begin_mobile(&self, input: &str) -> Result<String, AuthError> {
        if self.step != AuthStep::MobileEntry {
            return Err(self.invalid("submit mobile number"));
        }
        Ok(validate_mobile(input)?)
    }

    /// Consume the existence check for `contact`.
    pub fn apply_existence(
        &mut self,
        contact: String,
        exists: Result<bool, ApiError>,
    ) -> Result<(), AuthError> {
        if self.step != AuthStep::MobileEntry {
            return Err(self.invalid("apply existence check"));
        }
        if exists? {
            info!(contact = %contact, "otp requested");
            self.step = AuthStep::OtpEntry { contact };
        } else {
            info!(contact = %contact, "unregistered contact, offering registration");
            self.step = AuthStep::RegistrationOffer { contact };
        }
        Ok(())
    }

    /// Validate an OTP; returns `(contact, otp)` to verify.
    pub fn begin_otp(&self, input: &str) -> Result<(String, String), AuthError> {
        let AuthStep::OtpEntry { contact } = &self.step else {
            return Err(self.invalid("submit otp"));
        };
        let otp = validate_otp(input)?;
        Ok((contact.clone(), otp))
    }

    /// Consume the verification result; on success the session is persisted.
    pub fn apply_verification(
        &mut self,
        result: Result<SessionRecord, ApiError>,
        session: &SessionContext,
    ) -> Result<(), AuthError> {
        if !matches!(self.step, AuthStep::OtpEntry { .. }) {
            return Err(self.invalid("apply otp verification"));
        }
        let record = result?;
        session.sign_in(record);
        self.step = AuthStep::Authenticated;
        Ok(())
    }

    /// Leave OTP entry and return to the number prompt.
    pub fn go_back(&mut self) -> Result<(), AuthError> {
        match self.step {
            AuthStep::OtpEntry { .. } | AuthStep::Registration { .. } => {
                self.step = AuthStep::MobileEntry;
                Ok(())
            }
            _ => Err(self.invalid("go back")),
        }
    }

    /// Accept the registration offer.
    pub fn accept_registration(&mut self) -> Result<(), AuthError> {
        let AuthStep::RegistrationOffer { contact } = &self.step else {
            return Err(self.invalid("accept registration"));
        };
        self.step = AuthStep::Registration {
            contact: contact.clone(),
        };
        Ok(())
    }

    /// Decline the registration offer and stay on the number prompt.
    pub fn decline_registration(&mut self) -> Result<(), AuthError> {
        if !matches!(self.step, AuthStep::RegistrationOffer { .. }) {
            return Err(self.invalid("decline registration"));
        }
        self.step = AuthStep::MobileEntry;
        Ok(())
    }

    /// Check that a registration may be submitted.
    pub fn begin_registration(&self) -> Result<(), AuthError> {
        if !matches!(self.step, AuthStep::Registration { .. }) {
            return Err(self.invalid("register"));
        }
        Ok(())
    }

    /// Consume the registration result; on success the new farmer is signed in.
    pub fn apply_registration(
        &mut self,
        result: Result<SessionRecord, ApiError>,
        session: &SessionContext,
    ) -> Result<(), AuthError> {
        self.begin_registration()?;
        let record = result?;
        session.sign_in(record);
        self.step = AuthStep::Authenticated;
        Ok(())
    }

    /// Clear the session and restart at the number prompt.
    pub fn logout(&mut self, session: &SessionContext) {
        session.sign_out();
        self.step = AuthStep::MobileEntry;
    }

    /// Validate and run the existence check.
    pub async fn submit_mobile<A>(&mut self, api: &A, input: &str) -> Result<(), AuthError>
    where
        A: FarmerApi + ?Sized,
    {
        let contact = self.begin_mobile(input)?;
        let exists = api.check_farmer_exists(&contact).await;
        self.apply_existence(contact, exists)
    }

    /// Validate and verify an OTP.
    pub async fn submit_otp<A>(
        &mut self,
        api: &A,
        session: &SessionContext,
        input: &str,
    ) -> Result<(), AuthError>
    where
        A: FarmerApi + ?Sized,
    {
        let (contact, otp) = self.begin_otp(input)?;
        let result = api.verify_otp(&contact, &otp).await;
        self.apply_verification(result, session)
    }

    /// Register and sign in.
    pub async fn complete_registration<A>(
        &mut self,
        api: &A,
        session: &SessionContext,
        payload: &RegistrationPayload,
    ) -> Result<(), AuthError>
    where
        A: FarmerApi + ?Sized,
    {
        self.begin_registration()?;
        let result = api.register_farmer(payload).await;
        self.apply_registration(result, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::OtpDispatch,
        models::{Crop, CropPayload, Farmer},
        session::SessionStore,
        storage::MemoryStore,
    };
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    /// Backend double: `registered` numbers exist, `good_otp` verifies.
    struct FakeApi {
        registered: Vec<&'static str>,
        good_otp: &'static str,
        offline: bool,
        calls: AtomicUsize,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                registered: vec!["9876543210"],
                good_otp: "123456",
                offline: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn record(contact: &str) -> SessionRecord {
            serde_json::from_value(serde_json::json!({
                "userId": "f1",
                "name": "Ramesh",
                "contact": contact,
                "token": "tok"
            }))
            .unwrap()
        }
    }

    #[async_trait]
    impl FarmerApi for FakeApi {
        async fn mobile_login_by_contact(&self, contact: &str) -> Result<OtpDispatch, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline {
                return Err(ApiError::Transport("connection refused".to_string()));
            }
            if self.registered.contains(&contact) {
                Ok(OtpDispatch::default())
            } else {
                Err(ApiError::backend(404, Some("User not found".to_string())))
            }
        }

        async fn verify_otp(&self, contact: &str, otp: &str) -> Result<SessionRecord, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if otp == self.good_otp {
                Ok(Self::record(contact))
            } else {
                Err(ApiError::backend(200, Some("Invalid OTP".to_string())))
            }
        }

        async fn register_farmer(
            &self,
            payload: &RegistrationPayload,
        ) -> Result<SessionRecord, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Self::record(&payload.contact))
        }

        async fn register_contact(&self, _contact: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn get_farmer(&self, _id: &str) -> Result<Farmer, ApiError> {
            unimplemented!()
        }

        async fn get_crop(&self, _id: &str) -> Result<Crop, ApiError> {
            unimplemented!()
        }

        async fn crops_by_farmer(&self, _id: &str) -> Result<Vec<Crop>, ApiError> {
            Ok(Vec::new())
        }

        async fn recent_crops(&self) -> Result<Vec<Crop>, ApiError> {
            Ok(Vec::new())
        }

        async fn create_crop(&self, _payload: &CropPayload) -> Result<Crop, ApiError> {
            unimplemented!()
        }

        async fn update_crop(&self, _id: &str, _payload: &CropPayload) -> Result<Crop, ApiError> {
            unimplemented!()
        }
    }

    fn session() -> (SessionContext, SessionStore) {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        (SessionContext::load(store.clone()), store)
    }

    #[tokio::test]
    async fn registered_number_moves_to_otp_entry() {
        let api = FakeApi::new();
        let mut flow = AuthFlow::default();
        flow.submit_mobile(&api, "9876543210").await.unwrap();
        assert_eq!(
            flow.step(),
            &AuthStep::OtpEntry {
                contact: "9876543210".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unknown_number_offers_registration() {
        let api = FakeApi::new();
        let mut flow = AuthFlow::default();
        flow.submit_mobile(&api, "9999999999").await.unwrap();
        assert_eq!(
            flow.step(),
            &AuthStep::RegistrationOffer {
                contact: "9999999999".to_string()
            }
        );

        flow.decline_registration().unwrap();
        assert_eq!(flow.step(), &AuthStep::MobileEntry);

        flow.submit_mobile(&api, "9999999999").await.unwrap();
        flow.accept_registration().unwrap();
        assert_eq!(flow.contact(), Some("9999999999"));
    }

    #[tokio::test]
    async fn network_failure_is_not_reported_as_unregistered() {
        let api = FakeApi {
            offline: true,
            ..FakeApi::new()
        };
        let mut flow = AuthFlow::default();
        let err = flow.submit_mobile(&api, "9876543210").await.unwrap_err();
        assert!(matches!(err, AuthError::Api(ApiError::Transport(_))));
        assert_eq!(flow.step(), &AuthStep::MobileEntry);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_network() {
        let api = FakeApi::new();
        let (session, _) = session();
        let mut flow = AuthFlow::default();

        for bad in ["", "12345", "98765432100", "abcdefghij", "९८७६५४३२१०"] {
            let err = flow.submit_mobile(&api, bad).await.unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)));
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        flow.submit_mobile(&api, "9876543210").await.unwrap();
        let before = api.calls.load(Ordering::SeqCst);

        for bad in ["", "1", "12345", "1234567", "12345a", "१२३४५६"] {
            let err = flow.submit_otp(&api, &session, bad).await.unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)));
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn wrong_otp_keeps_backend_message_and_step() {
        let api = FakeApi::new();
        let (session, store) = session();
        let mut flow = AuthFlow::default();
        flow.submit_mobile(&api, "9876543210").await.unwrap();

        let err = flow.submit_otp(&api, &session, "000000").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid OTP");
        assert!(matches!(flow.step(), AuthStep::OtpEntry { .. }));
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn correct_otp_persists_session_and_logout_resets() {
        let api = FakeApi::new();
        let (session, store) = session();
        let mut flow = AuthFlow::default();
        flow.submit_mobile(&api, "9876543210").await.unwrap();
        flow.submit_otp(&api, &session, "123456").await.unwrap();

        assert_eq!(flow.step(), &AuthStep::Authenticated);
        assert!(store.is_logged_in());
        assert_eq!(session.token().as_deref(), Some("tok"));
        assert_eq!(AuthFlow::resume(&session).step(), &AuthStep::Authenticated);

        flow.logout(&session);
        assert_eq!(flow.step(), &AuthStep::MobileEntry);
        assert!(!store.is_logged_in());
        assert_eq!(AuthFlow::resume(&session).step(), &AuthStep::MobileEntry);
    }

    #[tokio::test]
    async fn go_back_returns_to_mobile_entry() {
        let api = FakeApi::new();
        let mut flow = AuthFlow::default();
        assert!(flow.go_back().is_err());
        flow.submit_mobile(&api, "9876543210").await.unwrap();
        flow.go_back().unwrap();
        assert_eq!(flow.step(), &AuthStep::MobileEntry);
        assert_eq!(flow.contact(), None);
    }

    #[tokio::test]
    async fn registration_signs_in() {
        let api = FakeApi::new();
        let (session, _) = session();
        let mut flow = AuthFlow::default();
        flow.submit_mobile(&api, "9999999999").await.unwrap();

        let payload = crate::forms::RegistrationForm {
            name: "Kavya".to_string(),
            contact: "9999999999".to_string(),
            village: "Hosur".to_string(),
            taluka: "Hosur".to_string(),
            district: "Krishnagiri".to_string(),
            state: "Tamil Nadu".to_string(),
            pincode: "635109".to_string(),
            ..Default::default()
        }
        .payload()
        .unwrap();

        let err = flow
            .complete_registration(&api, &session, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidState { .. }));

        flow.accept_registration().unwrap();
        flow.complete_registration(&api, &session, &payload)
            .await
            .unwrap();
        assert_eq!(flow.step(), &AuthStep::Authenticated);
        assert_eq!(
            session.current().and_then(|r| r.contact),
            Some("9999999999".to_string())
        );
    }
}
