use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use skillify_common::{AppError, SessionStatus, UserRole};
use skillify_database::{
    LearnerWithUser, LearnerWithUserRow, MentorWithUser, MentorWithUserRow, Review,
    ReviewDetails, ReviewedSession, Session, SessionDetails, User,
};

use super::{
    escape_like, LearnerProfileChanges, MarketplaceStore, MentorFilter, MentorProfileChanges,
    MentorSort, NewReview, NewSession, NewUser, ProfileRef, ReviewFilter, SessionFilter,
    REVIEWED_SESSION_LOCKED, SESSION_NOT_COMPLETED,
};
use crate::rating::mean_rating;

const MENTOR_SELECT: &str = r#"
    SELECT mp.id, mp.user_id, mp.bio, mp.price_per_hour, mp.experience, mp.rating,
           mp.skills, mp.created_at, mp.updated_at,
           u.name AS user_name, u.email AS user_email
    FROM mentor_profiles mp
    JOIN users u ON u.id = mp.user_id
"#;

const LEARNER_SELECT: &str = r#"
    SELECT lp.id, lp.user_id, lp.bio, lp.age, lp.skills_wanted, lp.created_at, lp.updated_at,
           u.name AS user_name, u.email AS user_email
    FROM learner_profiles lp
    JOIN users u ON u.id = lp.user_id
"#;

const SESSION_COLUMNS: &str = "id, mentor_id, learner_id, date, status, created_at";
const REVIEW_COLUMNS: &str = "id, session_id, learner_id, rating, comment, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique_violation(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

/// Row-locks the mentor profile so rating refreshes for one mentor serialize.
async fn lock_mentor(conn: &mut PgConnection, mentor_id: Uuid) -> Result<(), AppError> {
    sqlx::query("SELECT id FROM mentor_profiles WHERE id = $1 FOR UPDATE")
        .bind(mentor_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Mentor not found".to_string()))?;
    Ok(())
}

/// Row-locks the session so status changes and review writes on it serialize.
async fn lock_session(
    conn: &mut PgConnection,
    session_id: Uuid,
) -> Result<Option<(Uuid, SessionStatus)>, AppError> {
    let row = sqlx::query_as::<_, (Uuid, SessionStatus)>(
        "SELECT mentor_id, status FROM sessions WHERE id = $1 FOR UPDATE",
    )
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Recomputes the stored rating from the mentor's current review set.
async fn refresh_rating(conn: &mut PgConnection, mentor_id: Uuid) -> Result<Decimal, AppError> {
    let ratings: Vec<i32> = sqlx::query_scalar(
        r#"
        SELECT r.rating FROM reviews r
        JOIN sessions s ON s.id = r.session_id
        WHERE s.mentor_id = $1
        "#,
    )
    .bind(mentor_id)
    .fetch_all(&mut *conn)
    .await?;

    let rating = mean_rating(&ratings);
    sqlx::query("UPDATE mentor_profiles SET rating = $2, updated_at = NOW() WHERE id = $1")
        .bind(mentor_id)
        .bind(rating)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(%mentor_id, %rating, reviews = ratings.len(), "mentor rating refreshed");
    Ok(rating)
}

async fn fetch_mentors(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, MentorWithUser>, AppError> {
    let rows = sqlx::query_as::<_, MentorWithUserRow>(&format!(
        "{} WHERE mp.id = ANY($1)",
        MENTOR_SELECT
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.id, MentorWithUser::from(row)))
        .collect())
}

async fn fetch_learners(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, LearnerWithUser>, AppError> {
    let rows = sqlx::query_as::<_, LearnerWithUserRow>(&format!(
        "{} WHERE lp.id = ANY($1)",
        LEARNER_SELECT
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.id, LearnerWithUser::from(row)))
        .collect())
}

/// Attaches both parties and the review to each session, preserving order.
async fn load_session_details(
    conn: &mut PgConnection,
    sessions: Vec<Session>,
) -> Result<Vec<SessionDetails>, AppError> {
    if sessions.is_empty() {
        return Ok(Vec::new());
    }

    let mentor_ids: Vec<Uuid> = sessions.iter().map(|s| s.mentor_id).collect();
    let learner_ids: Vec<Uuid> = sessions.iter().map(|s| s.learner_id).collect();
    let session_ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();

    let mentors = fetch_mentors(conn, &mentor_ids).await?;
    let learners = fetch_learners(conn, &learner_ids).await?;
    let mut reviews: HashMap<Uuid, Review> = sqlx::query_as::<_, Review>(&format!(
        "SELECT {} FROM reviews WHERE session_id = ANY($1)",
        REVIEW_COLUMNS
    ))
    .bind(&session_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|review| (review.session_id, review))
    .collect();

    sessions
        .into_iter()
        .map(|session| {
            let mentor = mentors.get(&session.mentor_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("mentor {} missing for session", session.mentor_id))
            })?;
            let learner = learners.get(&session.learner_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("learner {} missing for session", session.learner_id))
            })?;
            let review = reviews.remove(&session.id);
            Ok(SessionDetails {
                session,
                mentor,
                learner,
                review,
            })
        })
        .collect()
}

async fn load_review_details(
    conn: &mut PgConnection,
    reviews: Vec<Review>,
) -> Result<Vec<ReviewDetails>, AppError> {
    if reviews.is_empty() {
        return Ok(Vec::new());
    }

    let session_ids: Vec<Uuid> = reviews.iter().map(|r| r.session_id).collect();
    let sessions: HashMap<Uuid, Session> = sqlx::query_as::<_, Session>(&format!(
        "SELECT {} FROM sessions WHERE id = ANY($1)",
        SESSION_COLUMNS
    ))
    .bind(&session_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|session| (session.id, session))
    .collect();

    let mentor_ids: Vec<Uuid> = sessions.values().map(|s| s.mentor_id).collect();
    let learner_ids: Vec<Uuid> = reviews.iter().map(|r| r.learner_id).collect();
    let mentors = fetch_mentors(conn, &mentor_ids).await?;
    let learners = fetch_learners(conn, &learner_ids).await?;

    reviews
        .into_iter()
        .map(|review| {
            let session = sessions.get(&review.session_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("session {} missing for review", review.session_id))
            })?;
            let mentor = mentors.get(&session.mentor_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("mentor {} missing for review", session.mentor_id))
            })?;
            let learner = learners.get(&review.learner_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("learner {} missing for review", review.learner_id))
            })?;
            Ok(ReviewDetails {
                review,
                learner,
                session: ReviewedSession { session, mentor },
            })
        })
        .collect()
}

fn push_mentor_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &MentorFilter) {
    qb.push(" WHERE mp.price_per_hour >= ")
        .push_bind(filter.min_price)
        .push(" AND mp.price_per_hour <= ")
        .push_bind(filter.max_price)
        .push(" AND mp.rating >= ")
        .push_bind(filter.min_rating)
        .push(" AND mp.experience >= ")
        .push_bind(filter.min_experience);

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (u.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR mp.bio ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn mentor_order_by(sort: MentorSort) -> &'static str {
    match sort {
        MentorSort::RatingDesc => " ORDER BY mp.rating DESC, mp.id ASC",
        MentorSort::PriceAsc => " ORDER BY mp.price_per_hour ASC, mp.id ASC",
        MentorSort::PriceDesc => " ORDER BY mp.price_per_hour DESC, mp.id ASC",
        MentorSort::ExperienceDesc => " ORDER BY mp.experience DESC, mp.id ASC",
    }
}

fn push_session_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &SessionFilter) {
    match filter.owner {
        ProfileRef::Mentor(id) => qb.push(" WHERE mentor_id = ").push_bind(id),
        ProfileRef::Learner(id) => qb.push(" WHERE learner_id = ").push_bind(id),
    };
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND date <= ").push_bind(end);
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_user_with_profile(&self, user: NewUser) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "User already exists"))?;

        match created.role {
            UserRole::Mentor => {
                sqlx::query("INSERT INTO mentor_profiles (id, user_id, bio) VALUES ($1, $2, '')")
                    .bind(Uuid::new_v4())
                    .bind(created.id)
                    .execute(&mut *tx)
                    .await?;
            }
            UserRole::Learner => {
                sqlx::query("INSERT INTO learner_profiles (id, user_id) VALUES ($1, $2)")
                    .bind(Uuid::new_v4())
                    .bind(created.id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_mentor(&self, id: Uuid) -> Result<Option<MentorWithUser>, AppError> {
        let row = sqlx::query_as::<_, MentorWithUserRow>(&format!(
            "{} WHERE mp.id = $1",
            MENTOR_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(MentorWithUser::from))
    }

    async fn find_mentor_by_user(&self, user_id: Uuid) -> Result<Option<MentorWithUser>, AppError> {
        let row = sqlx::query_as::<_, MentorWithUserRow>(&format!(
            "{} WHERE mp.user_id = $1",
            MENTOR_SELECT
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(MentorWithUser::from))
    }

    async fn find_learner_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<LearnerWithUser>, AppError> {
        let row = sqlx::query_as::<_, LearnerWithUserRow>(&format!(
            "{} WHERE lp.user_id = $1",
            LEARNER_SELECT
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(LearnerWithUser::from))
    }

    async fn update_mentor_profile(
        &self,
        user_id: Uuid,
        changes: MentorProfileChanges,
    ) -> Result<Option<MentorWithUser>, AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE mentor_profiles SET
                bio = COALESCE($2, bio),
                price_per_hour = COALESCE($3, price_per_hour),
                experience = COALESCE($4, experience),
                skills = COALESCE($5, skills),
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(changes.bio)
        .bind(changes.price_per_hour)
        .bind(changes.experience)
        .bind(changes.skills)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_mentor_by_user(user_id).await
    }

    async fn update_learner_profile(
        &self,
        user_id: Uuid,
        changes: LearnerProfileChanges,
    ) -> Result<Option<LearnerWithUser>, AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE learner_profiles SET
                bio = COALESCE($2, bio),
                age = COALESCE($3, age),
                skills_wanted = COALESCE($4, skills_wanted),
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(changes.bio)
        .bind(changes.age)
        .bind(changes.skills_wanted)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_learner_by_user(user_id).await
    }

    async fn search_mentors(
        &self,
        filter: &MentorFilter,
    ) -> Result<(Vec<MentorWithUser>, i64), AppError> {
        let mut query = QueryBuilder::<Postgres>::new(MENTOR_SELECT);
        push_mentor_filters(&mut query, filter);
        query
            .push(mentor_order_by(filter.sort))
            .push(" LIMIT ")
            .push_bind(filter.page.limit)
            .push(" OFFSET ")
            .push_bind(filter.page.offset());

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM mentor_profiles mp JOIN users u ON u.id = mp.user_id",
        );
        push_mentor_filters(&mut count, filter);

        let rows = query
            .build_query_as::<MentorWithUserRow>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        Ok((rows.into_iter().map(MentorWithUser::from).collect(), total))
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, AppError> {
        let created = sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions (id, mentor_id, learner_id, date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(session.mentor_id)
        .bind(session.learner_id)
        .bind(session.date)
        .bind(session.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionDetails>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match session {
            Some(session) => Ok(load_session_details(&mut conn, vec![session]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_sessions(
        &self,
        filter: &SessionFilter,
    ) -> Result<(Vec<SessionDetails>, i64), AppError> {
        let mut tx = self.pool.begin().await?;
        // Page and count from one snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM sessions", SESSION_COLUMNS));
        push_session_filters(&mut query, filter);
        query
            .push(" ORDER BY date ASC, id ASC LIMIT ")
            .push_bind(filter.page.limit)
            .push(" OFFSET ")
            .push_bind(filter.page.offset());
        let sessions = query
            .build_query_as::<Session>()
            .fetch_all(&mut *tx)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM sessions");
        push_session_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *tx).await?;

        let details = load_session_details(&mut tx, sessions).await?;
        tx.commit().await?;
        Ok((details, total))
    }

    async fn update_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> Result<Option<SessionDetails>, AppError> {
        let updated = sqlx::query("UPDATE sessions SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_session(id).await
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some((mentor_id, status)) = lock_session(&mut tx, id).await? else {
            return Ok(false);
        };
        if status == SessionStatus::Completed {
            let reviewed: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reviews WHERE session_id = $1)")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            if reviewed {
                return Err(AppError::Validation(REVIEWED_SESSION_LOCKED.to_string()));
            }
        }

        lock_mentor(&mut tx, mentor_id).await?;
        let deleted = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        refresh_rating(&mut tx, mentor_id).await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>, AppError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    async fn find_review_details(&self, id: Uuid) -> Result<Option<ReviewDetails>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match review {
            Some(review) => Ok(load_review_details(&mut conn, vec![review]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_reviews(&self, filter: ReviewFilter) -> Result<Vec<ReviewDetails>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT r.id, r.session_id, r.learner_id, r.rating, r.comment, r.created_at \
             FROM reviews r JOIN sessions s ON s.id = r.session_id",
        );
        match filter {
            ReviewFilter::All => {}
            ReviewFilter::Session(id) => {
                query.push(" WHERE r.session_id = ").push_bind(id);
            }
            ReviewFilter::Mentor(id) => {
                query.push(" WHERE s.mentor_id = ").push_bind(id);
            }
            ReviewFilter::Learner(id) => {
                query.push(" WHERE r.learner_id = ").push_bind(id);
            }
        }
        query.push(" ORDER BY r.created_at DESC, r.id ASC");

        let reviews = query
            .build_query_as::<Review>()
            .fetch_all(&mut *conn)
            .await?;
        load_review_details(&mut conn, reviews).await
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, AppError> {
        let mut tx = self.pool.begin().await?;

        let (mentor_id, status) = lock_session(&mut tx, review.session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if status != SessionStatus::Completed {
            return Err(AppError::Validation(SESSION_NOT_COMPLETED.to_string()));
        }

        lock_mentor(&mut tx, mentor_id).await?;
        let created = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (id, session_id, learner_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(review.session_id)
        .bind(review.learner_id)
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Review already exists for this session"))?;
        refresh_rating(&mut tx, mentor_id).await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let mentor_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT s.mentor_id FROM reviews r
            JOIN sessions s ON s.id = r.session_id
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(mentor_id) = mentor_id else {
            return Ok(false);
        };

        lock_mentor(&mut tx, mentor_id).await?;
        let deleted = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        refresh_rating(&mut tx, mentor_id).await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }
}
