//! Persistence boundary for the marketplace.
//!
//! Handlers and services only talk to [`MarketplaceStore`]. The PostgreSQL
//! implementation backs the running service; the in-memory one backs tests
//! and local experiments. Both keep review mutations and the mentor rating
//! aggregate in one atomic unit.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use skillify_common::{AppError, PageRequest, SessionStatus, UserRole};
use skillify_database::{
    LearnerWithUser, MentorWithUser, Review, ReviewDetails, Session, SessionDetails, User,
};

pub(crate) const SESSION_NOT_COMPLETED: &str = "Can only review completed sessions";
pub(crate) const REVIEWED_SESSION_LOCKED: &str = "Cannot delete completed sessions with reviews";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default)]
pub struct MentorProfileChanges {
    pub bio: Option<String>,
    pub price_per_hour: Option<Decimal>,
    pub experience: Option<i32>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct LearnerProfileChanges {
    pub bio: Option<String>,
    pub age: Option<i32>,
    pub skills_wanted: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MentorSort {
    #[default]
    RatingDesc,
    PriceAsc,
    PriceDesc,
    ExperienceDesc,
}

impl MentorSort {
    /// Unknown values fall back to the default ordering.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("price_asc") => MentorSort::PriceAsc,
            Some("price_desc") => MentorSort::PriceDesc,
            Some("experience_desc") => MentorSort::ExperienceDesc,
            _ => MentorSort::RatingDesc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MentorFilter {
    pub search: Option<String>,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub min_rating: Decimal,
    pub min_experience: i32,
    pub sort: MentorSort,
    pub page: PageRequest,
}

/// The caller's role-specific profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileRef {
    Mentor(Uuid),
    Learner(Uuid),
}

impl ProfileRef {
    /// True when this profile is the mentor or the learner of `session`.
    pub fn is_party_to(&self, session: &Session) -> bool {
        match self {
            ProfileRef::Mentor(id) => session.mentor_id == *id,
            ProfileRef::Learner(id) => session.learner_id == *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionFilter {
    pub owner: ProfileRef,
    pub status: Option<SessionStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewFilter {
    All,
    Session(Uuid),
    Mentor(Uuid),
    Learner(Uuid),
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub mentor_id: Uuid,
    pub learner_id: Uuid,
    pub date: DateTime<Utc>,
    pub status: SessionStatus,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub session_id: Uuid,
    pub learner_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    /// Creates the user and its empty role profile together.
    /// Fails with `Conflict` when the email is taken.
    async fn create_user_with_profile(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_mentor(&self, id: Uuid) -> Result<Option<MentorWithUser>, AppError>;
    async fn find_mentor_by_user(&self, user_id: Uuid) -> Result<Option<MentorWithUser>, AppError>;
    async fn find_learner_by_user(&self, user_id: Uuid)
        -> Result<Option<LearnerWithUser>, AppError>;
    async fn update_mentor_profile(
        &self,
        user_id: Uuid,
        changes: MentorProfileChanges,
    ) -> Result<Option<MentorWithUser>, AppError>;
    async fn update_learner_profile(
        &self,
        user_id: Uuid,
        changes: LearnerProfileChanges,
    ) -> Result<Option<LearnerWithUser>, AppError>;
    async fn search_mentors(
        &self,
        filter: &MentorFilter,
    ) -> Result<(Vec<MentorWithUser>, i64), AppError>;

    async fn insert_session(&self, session: NewSession) -> Result<Session, AppError>;
    async fn find_session(&self, id: Uuid) -> Result<Option<SessionDetails>, AppError>;
    /// One page of sessions ordered by date ascending, plus the unpaged total.
    async fn list_sessions(
        &self,
        filter: &SessionFilter,
    ) -> Result<(Vec<SessionDetails>, i64), AppError>;
    async fn update_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> Result<Option<SessionDetails>, AppError>;
    /// Deletes the session and its review, refreshing the mentor rating in
    /// the same transaction. Returns false when nothing was deleted.
    /// Fails with `Validation` when the session is COMPLETED and reviewed.
    async fn delete_session(&self, id: Uuid) -> Result<bool, AppError>;

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, AppError>;
    async fn find_review_details(&self, id: Uuid) -> Result<Option<ReviewDetails>, AppError>;
    /// Newest first.
    async fn list_reviews(&self, filter: ReviewFilter) -> Result<Vec<ReviewDetails>, AppError>;
    /// Inserts the review and refreshes the mentor rating atomically.
    /// Fails with `Validation` unless the session is COMPLETED, and with
    /// `Conflict` when it already has a review.
    async fn insert_review(&self, review: NewReview) -> Result<Review, AppError>;
    /// Deletes the review and refreshes the mentor rating atomically.
    async fn delete_review(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Escapes `LIKE` metacharacters so user input matches literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
