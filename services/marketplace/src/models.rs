use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use skillify_common::{AppError, UserRole};
use skillify_database::{LearnerProfile, MentorProfile, MentorWithUser, User, UserSummary};

// Request/Response DTOs
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserInfo,
    pub mentor_profile: Option<MentorProfile>,
    pub learner_profile: Option<LearnerProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
}

/// Skills may arrive as plain strings or as `{name}` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillInput {
    Name(String),
    Object(Skill),
}

impl SkillInput {
    pub fn into_name(self) -> String {
        match self {
            SkillInput::Name(name) => name,
            SkillInput::Object(skill) => skill.name,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMentorProfileRequest {
    pub bio: Option<String>,
    pub price_per_hour: Option<f64>,
    #[validate(range(min = 0, message = "Experience must be a non-negative number"))]
    pub experience: Option<i32>,
    pub skills: Option<Vec<SkillInput>>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLearnerProfileRequest {
    pub bio: Option<String>,
    #[validate(range(min = 1, message = "Age must be a positive number"))]
    pub age: Option<i32>,
    pub skills_wanted: Option<Vec<SkillInput>>,
}

/// Public mentor card: the profile with skills as `{name}` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorListing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
    pub price_per_hour: Decimal,
    pub experience: i32,
    pub rating: Decimal,
    pub skills: Vec<Skill>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
}

impl From<MentorWithUser> for MentorListing {
    fn from(mentor: MentorWithUser) -> Self {
        let profile = mentor.profile;
        Self {
            id: profile.id,
            user_id: profile.user_id,
            bio: profile.bio,
            price_per_hour: profile.price_per_hour,
            experience: profile.experience,
            rating: profile.rating,
            skills: profile
                .skills
                .into_iter()
                .map(|name| Skill { name })
                .collect(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
            user: mentor.user,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub rating: Option<String>,
    pub experience: Option<i32>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSessionRequest {
    pub mentor_id: Option<Uuid>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    pub status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub session_id: Option<Uuid>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub session_id: Option<Uuid>,
    pub mentor_id: Option<Uuid>,
    pub learner_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DbHealthResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteNotFound {
    pub message: String,
    pub path: String,
    pub method: String,
}

/// A path id that is not a UUID names no resource, so it reads as `not_found`.
pub fn parse_resource_id(raw: &str, not_found: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(not_found.to_string()))
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>, AppError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::Validation(format!("Invalid {}", field)))
}

pub fn parse_decimal(value: Option<&str>, default: Decimal, field: &str) -> Result<Decimal, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => {
            Decimal::from_str(raw).map_err(|_| AppError::Validation(format!("Invalid {}", field)))
        }
        None => Ok(default),
    }
}

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return false;
    };
    validator::validate_email(email)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// First message out of a validator failure.
pub fn validation_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Validation failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_rfc3339_and_plain_dates() {
        let ts = parse_datetime("2025-03-01T10:30:00Z", "date").unwrap();
        assert_eq!(ts.hour(), 10);

        let day = parse_datetime("2025-03-01", "date").unwrap();
        assert_eq!(day.day(), 1);
        assert_eq!(day.hour(), 0);

        let err = parse_datetime("next tuesday", "startDate").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid startDate");
    }

    #[test]
    fn decimals_fall_back_to_default() {
        assert_eq!(parse_decimal(None, Decimal::from(7), "minPrice").unwrap(), Decimal::from(7));
        assert_eq!(parse_decimal(Some(""), Decimal::ZERO, "minPrice").unwrap(), Decimal::ZERO);
        assert_eq!(
            parse_decimal(Some("12.5"), Decimal::ZERO, "minPrice").unwrap(),
            Decimal::new(125, 1)
        );
        assert!(parse_decimal(Some("cheap"), Decimal::ZERO, "minPrice").is_err());
    }

    #[test]
    fn malformed_path_id_is_not_found() {
        let id = Uuid::new_v4();
        assert_eq!(parse_resource_id(&id.to_string(), "Session not found").unwrap(), id);

        let err = parse_resource_id("abc", "Session not found").unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Session not found"));
    }

    #[test]
    fn email_needs_a_dotted_domain() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn skills_accept_strings_and_objects() {
        let skills: Vec<SkillInput> =
            serde_json::from_str(r#"["Rust", {"name": "SQL"}]"#).unwrap();
        let names: Vec<String> = skills.into_iter().map(SkillInput::into_name).collect();
        assert_eq!(names, vec!["Rust", "SQL"]);
    }

    #[test]
    fn profile_validation_reports_first_message() {
        let request = UpdateLearnerProfileRequest {
            age: Some(0),
            ..Default::default()
        };
        let errors = request.validate().unwrap_err();
        assert_eq!(validation_message(&errors), "Age must be a positive number");
    }
}
