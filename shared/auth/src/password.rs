use bcrypt::{hash, verify};
use skillify_common::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 6;
const BCRYPT_COST: u32 = 10;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String, AppError> {
        Self::hash_with_cost(password, BCRYPT_COST)
    }

    /// Lower costs are only meant for tests and seeding.
    pub fn hash_with_cost(password: &str, cost: u32) -> Result<String, AppError> {
        hash(password, cost)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
    }

    pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }

        Ok(())
    }
}
