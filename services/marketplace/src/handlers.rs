use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Json},
};
use chrono::Utc;

use skillify_auth::{clear_session_cookie, session_cookie, AuthenticatedUser};
use skillify_common::{ApiResponse, AppError, MessageResponse};
use skillify_database::{LearnerWithUser, ReviewDetails, Session, SessionDetails};

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::*;
use crate::services::{AppState, AuthService, ProfileService, ReviewService, SessionService};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

// Health check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Skillify marketplace is running".to_string(),
        timestamp: Utc::now(),
    })
}

pub async fn db_health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(DbHealthResponse { ok: true })),
        Err(err) => {
            tracing::error!(error = %err, "database health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DbHealthResponse { ok: false }),
            )
        }
    }
}

// Authentication
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let auth = AuthService::new(&state).signup(request).await?;
    let cookie = session_cookie(
        &auth.token,
        state.config.cookie_max_age_secs(),
        state.config.is_production(),
    );

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::with_message("User created successfully", auth)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let auth = AuthService::new(&state).login(request).await?;
    let cookie = session_cookie(
        &auth.token,
        state.config.cookie_max_age_secs(),
        state.config.is_production(),
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::with_message("Login successful", auth)),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(
            header::SET_COOKIE,
            clear_session_cookie(state.config.is_production()),
        )],
        Json(MessageResponse::new("Logged out successfully")),
    )
}

pub async fn me(State(state): State<AppState>, caller: AuthenticatedUser) -> ApiResult<MeResponse> {
    let me = AuthService::new(&state).me(&caller).await?;
    Ok(Json(ApiResponse::success(me)))
}

// Mentors
pub async fn list_mentors(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MentorQuery>,
) -> ApiResult<Vec<MentorListing>> {
    let (mentors, meta) = ProfileService::new(&state).list_mentors(query).await?;
    Ok(Json(ApiResponse::paged(mentors, meta)))
}

pub async fn get_mentor(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<MentorListing> {
    let id = parse_resource_id(&id, "Mentor not found")?;
    let mentor = ProfileService::new(&state).get_mentor(id).await?;
    Ok(Json(ApiResponse::success(mentor)))
}

pub async fn get_mentor_profile(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> ApiResult<MentorListing> {
    let profile = ProfileService::new(&state).own_mentor_profile(&caller).await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn update_mentor_profile(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    ApiJson(request): ApiJson<UpdateMentorProfileRequest>,
) -> ApiResult<MentorListing> {
    let profile = ProfileService::new(&state)
        .update_mentor_profile(&caller, request)
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        profile,
    )))
}

// Learners
pub async fn get_learner_profile(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> ApiResult<LearnerWithUser> {
    let profile = ProfileService::new(&state).own_learner_profile(&caller).await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn update_learner_profile(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    ApiJson(request): ApiJson<UpdateLearnerProfileRequest>,
) -> ApiResult<LearnerWithUser> {
    let profile = ProfileService::new(&state)
        .update_learner_profile(&caller, request)
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        profile,
    )))
}

// Sessions
pub async fn book_session(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    ApiJson(request): ApiJson<BookSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Session>>), AppError> {
    let session = SessionService::new(&state).book(&caller, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Session booked successfully", session)),
    ))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    ApiQuery(query): ApiQuery<SessionQuery>,
) -> ApiResult<Vec<SessionDetails>> {
    let (sessions, meta) = SessionService::new(&state).list(&caller, query).await?;
    Ok(Json(ApiResponse::paged(sessions, meta)))
}

pub async fn get_session(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<SessionDetails> {
    let id = parse_resource_id(&id, "Session not found")?;
    let session = SessionService::new(&state).get(id).await?;
    Ok(Json(ApiResponse::success(session)))
}

pub async fn update_session(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateSessionRequest>,
) -> ApiResult<SessionDetails> {
    let id = parse_resource_id(&id, "Session not found")?;
    let session = SessionService::new(&state)
        .update_status(&caller, id, request)
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Session updated successfully",
        session,
    )))
}

pub async fn delete_session(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_resource_id(&id, "Session not found")?;
    SessionService::new(&state).delete(&caller, id).await?;
    Ok(Json(MessageResponse::new("Session deleted successfully")))
}

// Reviews
pub async fn create_review(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    ApiJson(request): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewDetails>>), AppError> {
    let review = ReviewService::new(&state).create(&caller, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Review created successfully", review)),
    ))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReviewQuery>,
) -> ApiResult<Vec<ReviewDetails>> {
    let reviews = ReviewService::new(&state).list(query).await?;
    Ok(Json(ApiResponse::success(reviews)))
}

pub async fn delete_review(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_resource_id(&id, "Review not found")?;
    ReviewService::new(&state).delete(&caller, id).await?;
    Ok(Json(MessageResponse::new("Review deleted successfully")))
}

pub async fn handler_404(method: Method, uri: Uri) -> (StatusCode, Json<RouteNotFound>) {
    (
        StatusCode::NOT_FOUND,
        Json(RouteNotFound {
            message: "Route not found".to_string(),
            path: uri.path().to_string(),
            method: method.to_string(),
        }),
    )
}
