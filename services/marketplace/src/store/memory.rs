use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use skillify_common::{AppError, SessionStatus, UserRole};
use skillify_database::{
    LearnerProfile, LearnerWithUser, MentorProfile, MentorWithUser, Review, ReviewDetails,
    ReviewedSession, Session, SessionDetails, User, UserSummary,
};

use super::{
    LearnerProfileChanges, MarketplaceStore, MentorFilter, MentorProfileChanges, MentorSort,
    NewReview, NewSession, NewUser, ProfileRef, ReviewFilter, SessionFilter,
    REVIEWED_SESSION_LOCKED, SESSION_NOT_COMPLETED,
};
use crate::rating::mean_rating;

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    mentors: HashMap<Uuid, MentorProfile>,
    learners: HashMap<Uuid, LearnerProfile>,
    sessions: HashMap<Uuid, Session>,
    reviews: HashMap<Uuid, Review>,
}

impl MemoryState {
    fn summary(&self, user_id: Uuid) -> Result<UserSummary, AppError> {
        self.users
            .get(&user_id)
            .map(|u| UserSummary {
                name: u.name.clone(),
                email: u.email.clone(),
            })
            .ok_or_else(|| AppError::Internal(format!("user {} missing for profile", user_id)))
    }

    fn mentor_view(&self, profile: &MentorProfile) -> Result<MentorWithUser, AppError> {
        Ok(MentorWithUser {
            profile: profile.clone(),
            user: self.summary(profile.user_id)?,
        })
    }

    fn learner_view(&self, profile: &LearnerProfile) -> Result<LearnerWithUser, AppError> {
        Ok(LearnerWithUser {
            profile: profile.clone(),
            user: self.summary(profile.user_id)?,
        })
    }

    fn mentor_by_id(&self, id: Uuid) -> Result<MentorWithUser, AppError> {
        let profile = self
            .mentors
            .get(&id)
            .ok_or_else(|| AppError::Internal(format!("mentor {} missing", id)))?;
        self.mentor_view(profile)
    }

    fn learner_by_id(&self, id: Uuid) -> Result<LearnerWithUser, AppError> {
        let profile = self
            .learners
            .get(&id)
            .ok_or_else(|| AppError::Internal(format!("learner {} missing", id)))?;
        self.learner_view(profile)
    }

    fn session_details(&self, session: &Session) -> Result<SessionDetails, AppError> {
        Ok(SessionDetails {
            session: session.clone(),
            mentor: self.mentor_by_id(session.mentor_id)?,
            learner: self.learner_by_id(session.learner_id)?,
            review: self
                .reviews
                .values()
                .find(|r| r.session_id == session.id)
                .cloned(),
        })
    }

    fn review_details(&self, review: &Review) -> Result<ReviewDetails, AppError> {
        let session = self.sessions.get(&review.session_id).ok_or_else(|| {
            AppError::Internal(format!("session {} missing for review", review.session_id))
        })?;
        Ok(ReviewDetails {
            review: review.clone(),
            learner: self.learner_by_id(review.learner_id)?,
            session: ReviewedSession {
                session: session.clone(),
                mentor: self.mentor_by_id(session.mentor_id)?,
            },
        })
    }

    fn refresh_rating(&mut self, mentor_id: Uuid) {
        let ratings: Vec<i32> = self
            .reviews
            .values()
            .filter(|r| {
                self.sessions
                    .get(&r.session_id)
                    .is_some_and(|s| s.mentor_id == mentor_id)
            })
            .map(|r| r.rating)
            .collect();

        let rating = mean_rating(&ratings);
        if let Some(profile) = self.mentors.get_mut(&mentor_id) {
            profile.rating = rating;
            profile.updated_at = Utc::now();
        }
    }

    fn matches_search(&self, profile: &MentorProfile, needle: &str) -> bool {
        let name_hit = self
            .users
            .get(&profile.user_id)
            .is_some_and(|u| u.name.to_lowercase().contains(needle));
        name_hit || profile.bio.to_lowercase().contains(needle)
    }
}

fn compare_mentors(sort: MentorSort, a: &MentorProfile, b: &MentorProfile) -> Ordering {
    let primary = match sort {
        MentorSort::RatingDesc => b.rating.cmp(&a.rating),
        MentorSort::PriceAsc => a.price_per_hour.cmp(&b.price_per_hour),
        MentorSort::PriceDesc => b.price_per_hour.cmp(&a.price_per_hour),
        MentorSort::ExperienceDesc => b.experience.cmp(&a.experience),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

fn page_of<T>(items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(0))
        .take(usize::try_from(limit).unwrap_or(0))
        .collect()
}

/// Process-local store. One mutex guards every collection, so each call
/// is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_next_profile: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next signup fail after the user row is staged but before its
    /// profile is written. Used to exercise the all-or-nothing signup path.
    pub fn fail_next_profile_insert(&self) {
        self.fail_next_profile.store(true, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_user_with_profile(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: now,
        };

        // Nothing is written until both rows are ready.
        if self.fail_next_profile.swap(false, AtomicOrdering::SeqCst) {
            return Err(AppError::Internal("profile insert failed".to_string()));
        }

        match user.role {
            UserRole::Mentor => {
                let profile = MentorProfile {
                    id: Uuid::new_v4(),
                    user_id: user.id,
                    bio: String::new(),
                    price_per_hour: Decimal::ZERO,
                    experience: 0,
                    rating: Decimal::ZERO,
                    skills: Vec::new(),
                    created_at: now,
                    updated_at: now,
                };
                state.mentors.insert(profile.id, profile);
            }
            UserRole::Learner => {
                let profile = LearnerProfile {
                    id: Uuid::new_v4(),
                    user_id: user.id,
                    bio: None,
                    age: None,
                    skills_wanted: Vec::new(),
                    created_at: now,
                    updated_at: now,
                };
                state.learners.insert(profile.id, profile);
            }
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn find_mentor(&self, id: Uuid) -> Result<Option<MentorWithUser>, AppError> {
        let state = self.state.lock().await;
        state
            .mentors
            .get(&id)
            .map(|p| state.mentor_view(p))
            .transpose()
    }

    async fn find_mentor_by_user(&self, user_id: Uuid) -> Result<Option<MentorWithUser>, AppError> {
        let state = self.state.lock().await;
        state
            .mentors
            .values()
            .find(|p| p.user_id == user_id)
            .map(|p| state.mentor_view(p))
            .transpose()
    }

    async fn find_learner_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<LearnerWithUser>, AppError> {
        let state = self.state.lock().await;
        state
            .learners
            .values()
            .find(|p| p.user_id == user_id)
            .map(|p| state.learner_view(p))
            .transpose()
    }

    async fn update_mentor_profile(
        &self,
        user_id: Uuid,
        changes: MentorProfileChanges,
    ) -> Result<Option<MentorWithUser>, AppError> {
        let mut state = self.state.lock().await;
        let Some(profile) = state.mentors.values_mut().find(|p| p.user_id == user_id) else {
            return Ok(None);
        };

        if let Some(bio) = changes.bio {
            profile.bio = bio;
        }
        if let Some(price) = changes.price_per_hour {
            profile.price_per_hour = price;
        }
        if let Some(experience) = changes.experience {
            profile.experience = experience;
        }
        if let Some(skills) = changes.skills {
            profile.skills = skills;
        }
        profile.updated_at = Utc::now();

        let profile = profile.clone();
        state.mentor_view(&profile).map(Some)
    }

    async fn update_learner_profile(
        &self,
        user_id: Uuid,
        changes: LearnerProfileChanges,
    ) -> Result<Option<LearnerWithUser>, AppError> {
        let mut state = self.state.lock().await;
        let Some(profile) = state.learners.values_mut().find(|p| p.user_id == user_id) else {
            return Ok(None);
        };

        if let Some(bio) = changes.bio {
            profile.bio = Some(bio);
        }
        if let Some(age) = changes.age {
            profile.age = Some(age);
        }
        if let Some(skills) = changes.skills_wanted {
            profile.skills_wanted = skills;
        }
        profile.updated_at = Utc::now();

        let profile = profile.clone();
        state.learner_view(&profile).map(Some)
    }

    async fn search_mentors(
        &self,
        filter: &MentorFilter,
    ) -> Result<(Vec<MentorWithUser>, i64), AppError> {
        let state = self.state.lock().await;
        let needle = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<&MentorProfile> = state
            .mentors
            .values()
            .filter(|p| p.price_per_hour >= filter.min_price && p.price_per_hour <= filter.max_price)
            .filter(|p| p.rating >= filter.min_rating)
            .filter(|p| p.experience >= filter.min_experience)
            .filter(|p| match &needle {
                Some(needle) => state.matches_search(p, needle),
                None => true,
            })
            .collect();
        matched.sort_by(|a, b| compare_mentors(filter.sort, a, b));

        let total = matched.len() as i64;
        let page = page_of(matched, filter.page.offset(), filter.page.limit)
            .into_iter()
            .map(|p| state.mentor_view(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((page, total))
    }

    async fn insert_session(&self, new_session: NewSession) -> Result<Session, AppError> {
        let mut state = self.state.lock().await;
        if !state.mentors.contains_key(&new_session.mentor_id) {
            return Err(AppError::NotFound("Mentor not found".to_string()));
        }
        if !state.learners.contains_key(&new_session.learner_id) {
            return Err(AppError::NotFound("Learner profile not found".to_string()));
        }

        let session = Session {
            id: Uuid::new_v4(),
            mentor_id: new_session.mentor_id,
            learner_id: new_session.learner_id,
            date: new_session.date,
            status: new_session.status,
            created_at: Utc::now(),
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionDetails>, AppError> {
        let state = self.state.lock().await;
        state
            .sessions
            .get(&id)
            .map(|s| state.session_details(s))
            .transpose()
    }

    async fn list_sessions(
        &self,
        filter: &SessionFilter,
    ) -> Result<(Vec<SessionDetails>, i64), AppError> {
        let state = self.state.lock().await;
        let mut matched: Vec<&Session> = state
            .sessions
            .values()
            .filter(|s| filter.owner.is_party_to(s))
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .filter(|s| filter.start_date.map_or(true, |start| s.date >= start))
            .filter(|s| filter.end_date.map_or(true, |end| s.date <= end))
            .collect();
        matched.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        let total = matched.len() as i64;
        let page = page_of(matched, filter.page.offset(), filter.page.limit)
            .into_iter()
            .map(|s| state.session_details(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((page, total))
    }

    async fn update_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> Result<Option<SessionDetails>, AppError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&id) else {
            return Ok(None);
        };
        session.status = status;

        let session = session.clone();
        state.session_details(&session).map(Some)
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let Some((mentor_id, status)) = state.sessions.get(&id).map(|s| (s.mentor_id, s.status))
        else {
            return Ok(false);
        };
        if status == SessionStatus::Completed
            && state.reviews.values().any(|r| r.session_id == id)
        {
            return Err(AppError::Validation(REVIEWED_SESSION_LOCKED.to_string()));
        }

        state.sessions.remove(&id);
        state.reviews.retain(|_, r| r.session_id != id);
        state.refresh_rating(mentor_id);
        Ok(true)
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, AppError> {
        let state = self.state.lock().await;
        Ok(state.reviews.get(&id).cloned())
    }

    async fn find_review_details(&self, id: Uuid) -> Result<Option<ReviewDetails>, AppError> {
        let state = self.state.lock().await;
        state
            .reviews
            .get(&id)
            .map(|r| state.review_details(r))
            .transpose()
    }

    async fn list_reviews(&self, filter: ReviewFilter) -> Result<Vec<ReviewDetails>, AppError> {
        let state = self.state.lock().await;
        let mut matched: Vec<&Review> = state
            .reviews
            .values()
            .filter(|r| match filter {
                ReviewFilter::All => true,
                ReviewFilter::Session(id) => r.session_id == id,
                ReviewFilter::Learner(id) => r.learner_id == id,
                ReviewFilter::Mentor(id) => state
                    .sessions
                    .get(&r.session_id)
                    .is_some_and(|s| s.mentor_id == id),
            })
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        matched.into_iter().map(|r| state.review_details(r)).collect()
    }

    async fn insert_review(&self, new_review: NewReview) -> Result<Review, AppError> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get(&new_review.session_id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if session.status != SessionStatus::Completed {
            return Err(AppError::Validation(SESSION_NOT_COMPLETED.to_string()));
        }
        let mentor_id = session.mentor_id;
        if state
            .reviews
            .values()
            .any(|r| r.session_id == new_review.session_id)
        {
            return Err(AppError::Conflict(
                "Review already exists for this session".to_string(),
            ));
        }

        let review = Review {
            id: Uuid::new_v4(),
            session_id: new_review.session_id,
            learner_id: new_review.learner_id,
            rating: new_review.rating,
            comment: new_review.comment,
            created_at: Utc::now(),
        };
        state.reviews.insert(review.id, review.clone());
        state.refresh_rating(mentor_id);
        Ok(review)
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let Some(review) = state.reviews.remove(&id) else {
            return Ok(false);
        };
        if let Some(mentor_id) = state.sessions.get(&review.session_id).map(|s| s.mentor_id) {
            state.refresh_rating(mentor_id);
        }
        Ok(true)
    }
}
