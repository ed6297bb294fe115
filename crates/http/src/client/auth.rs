//! Authentication and account API client methods

use super::{ClientError, DevTrackClient};
use crate::types::{
    ChangePasswordRequest, EmailRequest, LoginRequest, LoginResponse, MessageResponse,
    ProfileUpdate, RegisterRequest, ResetPasswordRequest, VerifyCodeRequest,
};
use devtrack_core::{SessionTimeout, User};
use reqwest::Method;
use tracing::info;

impl DevTrackClient {
    /// Sign in and persist the returned session
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let request = self
            .request(Method::POST, "/api/auth/login/")
            .json(&LoginRequest {
                email: email.trim().to_lowercase(),
                password: password.to_string(),
            });
        let response: LoginResponse = self.execute_public(request).await?;
        let (user, credentials) = response.into_parts();
        self.vault().login(user.clone(), credentials)?;
        info!(user_id = user.id, role = %user.role, "Signed in");
        Ok(user)
    }

    /// Forget the stored session. Purely local, the backend keeps no session.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.vault().clear()?;
        info!("Signed out");
        Ok(())
    }

    /// Register a student account
    pub async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ClientError> {
        let req = self.request(Method::POST, "/api/auth/register/").json(request);
        self.execute_public(req).await
    }

    /// Register a teacher account
    pub async fn register_teacher(
        &self,
        request: &RegisterRequest,
    ) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/register-teacher/")
            .json(request);
        self.execute_public(req).await
    }

    /// Confirm an email address with the emailed 6-digit code
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/verify-code/")
            .json(&VerifyCodeRequest {
                email: email.to_string(),
                code: code.to_string(),
            });
        self.execute_public(req).await
    }

    pub async fn resend_code(&self, email: &str) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/resend-code/")
            .json(&EmailRequest {
                email: email.to_string(),
            });
        self.execute_public(req).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/forgot-password/")
            .json(&EmailRequest {
                email: email.to_string(),
            });
        self.execute_public(req).await
    }

    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::POST, "/api/auth/reset-password/")
            .json(request);
        self.execute_public(req).await
    }

    /// Current user as the backend sees it; refreshes the stored profile
    pub async fn me(&self) -> Result<User, ClientError> {
        let request = self.request(Method::GET, "/api/auth/me/");
        let user: User = self.execute(request).await?;
        self.vault().update_user(user.clone())?;
        Ok(user)
    }

    /// Editable profile; also refreshes the stored profile
    pub async fn profile(&self) -> Result<User, ClientError> {
        let request = self.request(Method::GET, "/api/auth/profile/");
        let user: User = self.execute(request).await?;
        self.vault().update_user(user.clone())?;
        Ok(user)
    }

    /// Update name and idle timeout.
    ///
    /// The timeout is checked against [`SessionTimeout::validate`] before
    /// anything is sent.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        if let Some(minutes) = update.session_timeout {
            SessionTimeout::validate(minutes).map_err(ClientError::Validation)?;
        }
        let request = self
            .request(Method::PATCH, "/api/auth/profile/")
            .json(update);
        let user: User = self.execute(request).await?;
        self.vault().update_user(user.clone())?;
        Ok(user)
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::POST, "/api/auth/change-password/")
            .json(&ChangePasswordRequest {
                current_password: current_password.to_string(),
                new_password: new_password.to_string(),
            });
        self.execute(request).await
    }
}
