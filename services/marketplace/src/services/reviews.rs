use std::sync::Arc;

use uuid::Uuid;

use skillify_auth::AuthenticatedUser;
use skillify_common::{AppError, SessionStatus, UserRole};
use skillify_database::ReviewDetails;

use super::AppState;
use crate::models::{CreateReviewRequest, ReviewQuery};
use crate::rating::is_valid_review_rating;
use crate::store::{MarketplaceStore, NewReview, ReviewFilter, SESSION_NOT_COMPLETED};

pub struct ReviewService {
    store: Arc<dyn MarketplaceStore>,
}

impl ReviewService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Stores the review and refreshes the mentor's rating in one unit.
    pub async fn create(
        &self,
        caller: &AuthenticatedUser,
        request: CreateReviewRequest,
    ) -> Result<ReviewDetails, AppError> {
        caller.require_role(UserRole::Learner, "Only learners can create reviews")?;

        let (Some(session_id), Some(rating)) = (request.session_id, request.rating) else {
            return Err(AppError::Validation(
                "Session ID and rating are required".to_string(),
            ));
        };
        if !is_valid_review_rating(rating) {
            return Err(AppError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        let learner = self.store.find_learner_by_user(caller.user_id).await?;
        let Some(learner) = learner.filter(|l| l.profile.id == session.session.learner_id) else {
            return Err(AppError::Authorization(
                "You can only review your own sessions".to_string(),
            ));
        };

        if session.session.status != SessionStatus::Completed {
            return Err(AppError::Validation(SESSION_NOT_COMPLETED.to_string()));
        }
        if session.review.is_some() {
            return Err(AppError::Conflict(
                "Review already exists for this session".to_string(),
            ));
        }

        let review = self
            .store
            .insert_review(NewReview {
                session_id,
                learner_id: learner.profile.id,
                rating,
                comment: request.comment.filter(|c| !c.trim().is_empty()),
            })
            .await?;

        tracing::info!(
            review_id = %review.id,
            session_id = %session_id,
            mentor_id = %session.session.mentor_id,
            rating,
            "review created"
        );

        self.store
            .find_review_details(review.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("review {} vanished after insert", review.id)))
    }

    /// `sessionId` wins over `mentorId`, which wins over `learnerId`.
    pub async fn list(&self, query: ReviewQuery) -> Result<Vec<ReviewDetails>, AppError> {
        let filter = match (query.session_id, query.mentor_id, query.learner_id) {
            (Some(id), _, _) => ReviewFilter::Session(id),
            (None, Some(id), _) => ReviewFilter::Mentor(id),
            (None, None, Some(id)) => ReviewFilter::Learner(id),
            (None, None, None) => ReviewFilter::All,
        };
        self.store.list_reviews(filter).await
    }

    pub async fn delete(&self, caller: &AuthenticatedUser, id: Uuid) -> Result<(), AppError> {
        caller.require_role(UserRole::Learner, "Only learners can delete reviews")?;

        let review = self
            .store
            .find_review(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

        let learner = self.store.find_learner_by_user(caller.user_id).await?;
        if !learner.is_some_and(|l| l.profile.id == review.learner_id) {
            return Err(AppError::Authorization(
                "You can only delete your own reviews".to_string(),
            ));
        }

        if !self.store.delete_review(id).await? {
            return Err(AppError::NotFound("Review not found".to_string()));
        }
        tracing::info!(review_id = %id, session_id = %review.session_id, "review deleted");
        Ok(())
    }
}
