use std::sync::Arc;

use uuid::Uuid;

use skillify_auth::AuthenticatedUser;
use skillify_common::{AppError, PageMeta, PageRequest, SessionStatus, UserRole};
use skillify_database::{Session, SessionDetails};

use super::{resolve_profile, AppState};
use crate::models::{parse_datetime, BookSessionRequest, SessionQuery, UpdateSessionRequest};
use crate::store::{MarketplaceStore, NewSession, SessionFilter, REVIEWED_SESSION_LOCKED};

pub struct SessionService {
    store: Arc<dyn MarketplaceStore>,
}

impl SessionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn book(
        &self,
        caller: &AuthenticatedUser,
        request: BookSessionRequest,
    ) -> Result<Session, AppError> {
        caller.require_role(UserRole::Learner, "Only learners can book sessions")?;

        let (Some(mentor_id), Some(date)) =
            (request.mentor_id, request.date.filter(|d| !d.trim().is_empty()))
        else {
            return Err(AppError::Validation(
                "Mentor ID and date are required".to_string(),
            ));
        };
        let date = parse_datetime(&date, "date")?;

        let mentor = self
            .store
            .find_mentor(mentor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Mentor not found".to_string()))?;
        let learner = self
            .store
            .find_learner_by_user(caller.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Learner profile not found".to_string()))?;

        let session = self
            .store
            .insert_session(NewSession {
                mentor_id: mentor.profile.id,
                learner_id: learner.profile.id,
                date,
                status: SessionStatus::Confirmed,
            })
            .await?;

        tracing::info!(
            session_id = %session.id,
            mentor_id = %session.mentor_id,
            learner_id = %session.learner_id,
            "session booked"
        );
        Ok(session)
    }

    pub async fn list(
        &self,
        caller: &AuthenticatedUser,
        query: SessionQuery,
    ) -> Result<(Vec<SessionDetails>, PageMeta), AppError> {
        let status = query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<SessionStatus>)
            .transpose()?;
        let start_date = query
            .start_date
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_datetime(s, "startDate"))
            .transpose()?;
        let end_date = query
            .end_date
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_datetime(s, "endDate"))
            .transpose()?;

        let Some(owner) = resolve_profile(self.store.as_ref(), caller).await? else {
            return Ok((Vec::new(), PageMeta::empty()));
        };

        let filter = SessionFilter {
            owner,
            status,
            start_date,
            end_date,
            page: PageRequest::new(query.page, query.limit),
        };
        let (sessions, total) = self.store.list_sessions(&filter).await?;
        Ok((sessions, PageMeta::new(total, filter.page)))
    }

    pub async fn get(&self, id: Uuid) -> Result<SessionDetails, AppError> {
        self.store
            .find_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    pub async fn update_status(
        &self,
        caller: &AuthenticatedUser,
        id: Uuid,
        request: UpdateSessionRequest,
    ) -> Result<SessionDetails, AppError> {
        let status: SessionStatus = request
            .status
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("Status is required".to_string()))?
            .parse()?;

        let existing = self.get(id).await?;
        self.ensure_party(caller, &existing.session, "You can only update your own sessions")
            .await?;

        let updated = self
            .store
            .update_session_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        tracing::info!(
            session_id = %id,
            from = %existing.session.status,
            to = %status,
            "session status changed"
        );
        Ok(updated)
    }

    pub async fn delete(&self, caller: &AuthenticatedUser, id: Uuid) -> Result<(), AppError> {
        let existing = self.get(id).await?;
        self.ensure_party(caller, &existing.session, "You can only delete your own sessions")
            .await?;

        if existing.session.status == SessionStatus::Completed && existing.review.is_some() {
            return Err(AppError::Validation(REVIEWED_SESSION_LOCKED.to_string()));
        }

        // The store re-checks the review guard under its own lock.
        if !self.store.delete_session(id).await? {
            return Err(AppError::NotFound("Session not found".to_string()));
        }
        tracing::info!(session_id = %id, "session deleted");
        Ok(())
    }

    async fn ensure_party(
        &self,
        caller: &AuthenticatedUser,
        session: &Session,
        message: &str,
    ) -> Result<(), AppError> {
        match resolve_profile(self.store.as_ref(), caller).await? {
            Some(profile) if profile.is_party_to(session) => Ok(()),
            _ => Err(AppError::Authorization(message.to_string())),
        }
    }
}
