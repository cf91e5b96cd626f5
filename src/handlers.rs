use crate::auth::{authenticate, bearer_token, hash_password, issue_token, token_claims, verify_password};
use crate::errors::AppError;
use crate::models::{
    ApiResponse, AuthPayload, CreateReadingRequest, LoginRequest, NewReading, ProfileUpdateRequest,
    ReadingIdQuery, ReadingQuery, ReadingRecord, ReadingStats, RegisterRequest, StatsQuery, StoredUser, TokenClaims, TrendPoint, User,
};
use crate::state::AppState;
use crate::stats::{build_stats, build_trends, DEFAULT_WINDOW_DAYS};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;
const DEFAULT_READING_LIMIT: usize = 100;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

pub async fn health() -> Json<Value> {
    Json(json!({
        "message": "BP Buddy backend is running",
        "timestamp": Utc::now(),
    }))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AuthPayload>>), AppError> {
    let Json(payload) = payload?;
    let email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();
    if email.is_empty() || payload.password.is_empty() || name.is_empty() {
        return Err(AppError::bad_request("Email, password, and name are required"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request("Password must be at least 6 characters long"));
    }

    let password_hash = hash_password(&payload.password)?;
    let mut data = state.data.lock().await;
    if data.user_by_email(&email).is_some() {
        return Err(AppError::conflict("User with this email already exists"));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().simple().to_string(),
        user_id: new_user_id(now.timestamp_millis()),
        email,
        name: name.to_string(),
        profile: payload.profile.unwrap_or_default(),
        created_at: now,
        last_login: Some(now),
    };
    let token = issue_token(&mut data, &user.user_id, &user.email, state.config.token_ttl, now);
    data.users.insert(
        user.user_id.clone(),
        StoredUser {
            user: user.clone(),
            password_hash,
            updated_at: now,
        },
    );
    state.persist(&data).await?;

    info!(user_id = %user.user_id, "registered user");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(AuthPayload { user, token }))))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<AuthPayload> {
    let Json(payload) = payload?;
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let mut data = state.data.lock().await;
    let user_id = match data.user_by_email(&email) {
        Some(stored) if verify_password(&payload.password, &stored.password_hash) => stored.user.user_id.clone(),
        _ => return Err(AppError::unauthorized("Invalid email or password")),
    };

    let now = Utc::now();
    let token = issue_token(&mut data, &user_id, &email, state.config.token_ttl, now);
    let user = {
        let stored = data
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;
        stored.user.last_login = Some(now);
        stored.updated_at = now;
        stored.user.clone()
    };
    state.persist(&data).await?;

    info!(user_id = %user.user_id, "user logged in");
    Ok(Json(ApiResponse::ok(AuthPayload { user, token })))
}

pub async fn logout() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Logged out successfully"))
}

pub async fn verify(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<TokenClaims> {
    let token = bearer_token(&headers)?;
    let data = state.data.lock().await;
    let claims = authenticate(&data, token, Utc::now())?;
    Ok(Json(ApiResponse::ok(claims)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> ApiResult<User> {
    let token = bearer_token(&headers)?;
    let mut data = state.data.lock().await;
    let claims = token_claims(&data, token, Utc::now())?;

    let Json(payload) = payload?;
    let profile = payload
        .profile
        .ok_or_else(|| AppError::bad_request("Profile data is required"))?;

    let user = {
        let stored = data
            .users
            .get_mut(&claims.user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        stored.user.profile = profile;
        stored.updated_at = Utc::now();
        stored.user.clone()
    };
    state.persist(&data).await?;

    Ok(Json(ApiResponse::ok(user)))
}

pub async fn get_user(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResult<User> {
    let data = state.data.lock().await;
    let stored = data
        .users
        .get(&user_id)
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(ApiResponse::ok(stored.user.clone())))
}

pub async fn list_readings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<ReadingQuery>, QueryRejection>,
) -> ApiResult<Vec<ReadingRecord>> {
    let Query(query) = query?;
    let data = state.data.lock().await;
    let mut readings: Vec<ReadingRecord> = data
        .readings
        .get(&user_id)
        .map(|readings| {
            readings
                .iter()
                .filter(|r| query.start_date.is_none_or(|start| r.timestamp >= start))
                .filter(|r| query.end_date.is_none_or(|end| r.timestamp <= end))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    readings.truncate(query.limit.unwrap_or(DEFAULT_READING_LIMIT));
    Ok(Json(ApiResponse::ok(readings)))
}

pub async fn create_reading(
    State(state): State<AppState>,
    payload: Result<Json<CreateReadingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ReadingRecord>>), AppError> {
    let Json(payload) = payload?;
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::bad_request("userId is required"));
    }
    let reading = payload.reading;
    let (Some(systolic), Some(diastolic)) = (reading.systolic, reading.diastolic) else {
        return Err(AppError::bad_request("Systolic and diastolic values are required"));
    };

    let now = Utc::now();
    let record = ReadingRecord {
        id: Uuid::new_v4().simple().to_string(),
        user_id: user_id.to_string(),
        systolic,
        diastolic,
        pulse: reading.pulse,
        notes: reading.notes.unwrap_or_default(),
        tags: reading.tags.unwrap_or_default(),
        timestamp: reading.timestamp.unwrap_or(now),
        created_at: now,
        updated_at: now,
    };

    let mut data = state.data.lock().await;
    data.readings
        .entry(record.user_id.clone())
        .or_default()
        .push(record.clone());
    state.persist(&data).await?;

    info!(user_id = %record.user_id, reading_id = %record.id, "stored reading");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(record))))
}

/// Applies the fields present in the body; `userId` is taken from the stored record.
pub async fn update_reading(
    State(state): State<AppState>,
    query: Result<Query<ReadingIdQuery>, QueryRejection>,
    payload: Result<Json<NewReading>, JsonRejection>,
) -> ApiResult<ReadingRecord> {
    let Query(query) = query?;
    let reading_id = required_reading_id(query, "readingId is required for updates")?;
    let Json(updates) = payload?;

    let mut data = state.data.lock().await;
    let record = {
        let record = data
            .readings
            .values_mut()
            .flat_map(|readings| readings.iter_mut())
            .find(|record| record.id == reading_id)
            .ok_or_else(|| AppError::not_found("Reading not found"))?;
        if let Some(systolic) = updates.systolic {
            record.systolic = systolic;
        }
        if let Some(diastolic) = updates.diastolic {
            record.diastolic = diastolic;
        }
        if updates.pulse.is_some() {
            record.pulse = updates.pulse;
        }
        if let Some(notes) = updates.notes {
            record.notes = notes;
        }
        if let Some(tags) = updates.tags {
            record.tags = tags;
        }
        if let Some(timestamp) = updates.timestamp {
            record.timestamp = timestamp;
        }
        record.updated_at = Utc::now();
        record.clone()
    };
    state.persist(&data).await?;

    info!(user_id = %record.user_id, reading_id = %record.id, "updated reading");
    Ok(Json(ApiResponse::ok(record)))
}

pub async fn delete_reading(
    State(state): State<AppState>,
    query: Result<Query<ReadingIdQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Query(query) = query?;
    let reading_id = required_reading_id(query, "readingId is required for deletion")?;

    let mut data = state.data.lock().await;
    let removed = data.readings.values_mut().find_map(|readings| {
        let index = readings.iter().position(|record| record.id == reading_id)?;
        Some(readings.remove(index))
    });
    let removed = removed.ok_or_else(|| AppError::not_found("Reading not found"))?;
    state.persist(&data).await?;

    info!(user_id = %removed.user_id, reading_id = %removed.id, "deleted reading");
    Ok(Json(ApiResponse::message("Reading deleted successfully")))
}

fn required_reading_id(query: ReadingIdQuery, message: &str) -> Result<String, AppError> {
    query
        .reading_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request(message))
}

pub async fn reading_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Option<ReadingStats>>>, AppError> {
    let Query(query) = query?;
    let data = state.data.lock().await;
    let readings = data.readings.get(&user_id).map(Vec::as_slice).unwrap_or_default();
    let stats = build_stats(readings, query.days.unwrap_or(DEFAULT_WINDOW_DAYS));
    Ok(Json(ApiResponse::ok(stats)))
}

pub async fn reading_trends(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<Vec<TrendPoint>> {
    let Query(query) = query?;
    let data = state.data.lock().await;
    let readings = data.readings.get(&user_id).map(Vec::as_slice).unwrap_or_default();
    let trends = build_trends(
        readings,
        query.days.unwrap_or(DEFAULT_WINDOW_DAYS),
        query.group_by.unwrap_or_default(),
    );
    Ok(Json(ApiResponse::ok(trends)))
}

fn new_user_id(millis: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("user_{millis}_{}", &suffix[..9])
}
