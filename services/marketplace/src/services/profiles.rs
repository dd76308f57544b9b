use std::sync::Arc;

use rust_decimal::prelude::*;
use uuid::Uuid;
use validator::Validate;

use skillify_auth::AuthenticatedUser;
use skillify_common::{AppError, PageMeta, PageRequest, UserRole};
use skillify_database::LearnerWithUser;

use super::AppState;
use crate::models::{
    parse_decimal, validation_message, MentorListing, MentorQuery, SkillInput,
    UpdateLearnerProfileRequest, UpdateMentorProfileRequest,
};
use crate::store::{
    LearnerProfileChanges, MarketplaceStore, MentorFilter, MentorProfileChanges, MentorSort,
    ProfileRef,
};

/// Resolves the caller's role-specific profile, if it exists.
pub async fn resolve_profile(
    store: &dyn MarketplaceStore,
    caller: &AuthenticatedUser,
) -> Result<Option<ProfileRef>, AppError> {
    let profile = match caller.role {
        UserRole::Mentor => store
            .find_mentor_by_user(caller.user_id)
            .await?
            .map(|m| ProfileRef::Mentor(m.profile.id)),
        UserRole::Learner => store
            .find_learner_by_user(caller.user_id)
            .await?
            .map(|l| ProfileRef::Learner(l.profile.id)),
    };
    Ok(profile)
}

/// Empty lists mean "leave unchanged".
fn skill_names(skills: Option<Vec<SkillInput>>) -> Option<Vec<String>> {
    skills
        .map(|list| {
            list.into_iter()
                .map(SkillInput::into_name)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|names| !names.is_empty())
}

const DEFAULT_MAX_PRICE: i64 = 10_000;

pub struct ProfileService {
    store: Arc<dyn MarketplaceStore>,
}

impl ProfileService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn list_mentors(
        &self,
        query: MentorQuery,
    ) -> Result<(Vec<MentorListing>, PageMeta), AppError> {
        let filter = MentorFilter {
            search: query.search.map(|s| s.trim().to_string()),
            min_price: parse_decimal(query.min_price.as_deref(), Decimal::ZERO, "minPrice")?,
            max_price: parse_decimal(
                query.max_price.as_deref(),
                Decimal::from(DEFAULT_MAX_PRICE),
                "maxPrice",
            )?,
            min_rating: parse_decimal(query.rating.as_deref(), Decimal::ZERO, "rating")?,
            min_experience: query.experience.unwrap_or(0),
            sort: MentorSort::from_param(query.sort.as_deref()),
            page: PageRequest::new(query.page, query.limit),
        };

        let (mentors, total) = self.store.search_mentors(&filter).await?;
        let listings = mentors.into_iter().map(MentorListing::from).collect();
        Ok((listings, PageMeta::new(total, filter.page)))
    }

    pub async fn get_mentor(&self, id: Uuid) -> Result<MentorListing, AppError> {
        self.store
            .find_mentor(id)
            .await?
            .map(MentorListing::from)
            .ok_or_else(|| AppError::NotFound("Mentor not found".to_string()))
    }

    pub async fn own_mentor_profile(
        &self,
        caller: &AuthenticatedUser,
    ) -> Result<MentorListing, AppError> {
        caller.require_role(UserRole::Mentor, "Only mentors can access mentor profiles")?;
        self.store
            .find_mentor_by_user(caller.user_id)
            .await?
            .map(MentorListing::from)
            .ok_or_else(|| AppError::NotFound("Mentor profile not found".to_string()))
    }

    pub async fn update_mentor_profile(
        &self,
        caller: &AuthenticatedUser,
        request: UpdateMentorProfileRequest,
    ) -> Result<MentorListing, AppError> {
        caller.require_role(UserRole::Mentor, "Only mentors can update mentor profiles")?;
        request
            .validate()
            .map_err(|e| AppError::Validation(validation_message(&e)))?;

        let price_per_hour = match request.price_per_hour {
            Some(price) if !price.is_finite() || price < 0.0 => {
                return Err(AppError::Validation(
                    "Price per hour must be a non-negative number".to_string(),
                ))
            }
            Some(price) => Some(
                Decimal::from_f64(price)
                    .ok_or_else(|| {
                        AppError::Validation("Price per hour is out of range".to_string())
                    })?
                    .round_dp(2),
            ),
            None => None,
        };

        let changes = MentorProfileChanges {
            bio: request.bio,
            price_per_hour,
            experience: request.experience,
            skills: skill_names(request.skills),
        };

        let updated = self
            .store
            .update_mentor_profile(caller.user_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Mentor profile not found".to_string()))?;
        tracing::info!(mentor_id = %updated.profile.id, "mentor profile updated");
        Ok(MentorListing::from(updated))
    }

    pub async fn own_learner_profile(
        &self,
        caller: &AuthenticatedUser,
    ) -> Result<LearnerWithUser, AppError> {
        caller.require_role(UserRole::Learner, "Only learners can access learner profiles")?;
        self.store
            .find_learner_by_user(caller.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Learner profile not found".to_string()))
    }

    pub async fn update_learner_profile(
        &self,
        caller: &AuthenticatedUser,
        request: UpdateLearnerProfileRequest,
    ) -> Result<LearnerWithUser, AppError> {
        caller.require_role(UserRole::Learner, "Only learners can update learner profiles")?;
        request
            .validate()
            .map_err(|e| AppError::Validation(validation_message(&e)))?;

        let changes = LearnerProfileChanges {
            bio: request.bio,
            age: request.age,
            skills_wanted: skill_names(request.skills_wanted),
        };

        let updated = self
            .store
            .update_learner_profile(caller.user_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Learner profile not found".to_string()))?;
        tracing::info!(learner_id = %updated.profile.id, "learner profile updated");
        Ok(updated)
    }
}
