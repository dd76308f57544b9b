use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use skillify_common::{SessionStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Public identity embedded in profile payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MentorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
    pub price_per_hour: Decimal,
    pub experience: i32,
    pub rating: Decimal,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub age: Option<i32>,
    pub skills_wanted: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub learner_id: Uuid,
    pub date: DateTime<Utc>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub session_id: Uuid,
    pub learner_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorWithUser {
    #[serde(flatten)]
    pub profile: MentorProfile,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerWithUser {
    #[serde(flatten)]
    pub profile: LearnerProfile,
    pub user: UserSummary,
}

/// A session with both parties and its review, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetails {
    #[serde(flatten)]
    pub session: Session,
    pub mentor: MentorWithUser,
    pub learner: LearnerWithUser,
    pub review: Option<Review>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewedSession {
    #[serde(flatten)]
    pub session: Session,
    pub mentor: MentorWithUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDetails {
    #[serde(flatten)]
    pub review: Review,
    pub learner: LearnerWithUser,
    pub session: ReviewedSession,
}

/// Flat row for `mentor_profiles JOIN users`.
#[derive(Debug, Clone, FromRow)]
pub struct MentorWithUserRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
    pub price_per_hour: Decimal,
    pub experience: i32,
    pub rating: Decimal,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: String,
    pub user_email: String,
}

impl From<MentorWithUserRow> for MentorWithUser {
    fn from(row: MentorWithUserRow) -> Self {
        Self {
            profile: MentorProfile {
                id: row.id,
                user_id: row.user_id,
                bio: row.bio,
                price_per_hour: row.price_per_hour,
                experience: row.experience,
                rating: row.rating,
                skills: row.skills,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            user: UserSummary {
                name: row.user_name,
                email: row.user_email,
            },
        }
    }
}

/// Flat row for `learner_profiles JOIN users`.
#[derive(Debug, Clone, FromRow)]
pub struct LearnerWithUserRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub age: Option<i32>,
    pub skills_wanted: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: String,
    pub user_email: String,
}

impl From<LearnerWithUserRow> for LearnerWithUser {
    fn from(row: LearnerWithUserRow) -> Self {
        Self {
            profile: LearnerProfile {
                id: row.id,
                user_id: row.user_id,
                bio: row.bio,
                age: row.age,
                skills_wanted: row.skills_wanted,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            user: UserSummary {
                name: row.user_name,
                email: row.user_email,
            },
        }
    }
}
