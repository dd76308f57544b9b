use std::sync::Arc;

use chrono::{TimeZone, Utc};

use skillify_auth::{AuthenticatedUser, Claims, JwtService, PasswordService};
use skillify_common::{AppError, UserRole};
use skillify_database::User;

use super::AppState;
use crate::config::AppConfig;
use crate::models::{is_valid_email, AuthResponse, LoginRequest, MeResponse, SignupRequest, UserInfo};
use crate::store::{MarketplaceStore, NewUser};

pub struct AuthService {
    store: Arc<dyn MarketplaceStore>,
    jwt_service: JwtService,
    config: AppConfig,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            jwt_service: state.jwt_service.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, AppError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (Some(name), Some(email), Some(password), Some(role)) = (
            non_empty(request.name),
            non_empty(request.email),
            non_empty(request.password),
            non_empty(request.role),
        ) else {
            return Err(AppError::Validation("All fields are required".to_string()));
        };

        if !is_valid_email(&email) {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }
        let role: UserRole = role.parse()?;
        PasswordService::validate_password_strength(&password)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash = PasswordService::hash_with_cost(&password, self.config.bcrypt_cost)?;
        let user = self
            .store
            .create_user_with_profile(NewUser {
                name: name.trim().to_string(),
                email,
                password_hash,
                role,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user signed up");
        self.issue_token(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let (Some(email), Some(password)) = (
            request.email.filter(|s| !s.is_empty()),
            request.password.filter(|s| !s.is_empty()),
        ) else {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        };

        let invalid = || AppError::Authentication("Invalid credentials".to_string());
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(invalid)?;

        if !PasswordService::verify_password(&password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(invalid());
        }

        self.issue_token(&user)
    }

    pub async fn me(&self, caller: &AuthenticatedUser) -> Result<MeResponse, AppError> {
        let user = self
            .store
            .find_user_by_id(caller.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let (mentor_profile, learner_profile) = match user.role {
            UserRole::Mentor => (
                self.store
                    .find_mentor_by_user(user.id)
                    .await?
                    .map(|m| m.profile),
                None,
            ),
            UserRole::Learner => (
                None,
                self.store
                    .find_learner_by_user(user.id)
                    .await?
                    .map(|l| l.profile),
            ),
        };

        Ok(MeResponse {
            user: UserInfo::from(&user),
            mentor_profile,
            learner_profile,
        })
    }

    fn issue_token(&self, user: &User) -> Result<AuthResponse, AppError> {
        let claims = Claims::new(user.id, user.email.clone(), user.role, &self.config.jwt);
        let token = self.jwt_service.generate_token(&claims)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;

        Ok(AuthResponse {
            token,
            user: UserInfo::from(user),
            expires_at,
        })
    }
}
