use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use entity::user;

use crate::{
    auth::{hash_password, issue_token, verify_password, Role},
    error::{ApiError, ApiResult},
    extract::CurrentUser,
    handlers::OneOrMany,
    http::AppState,
};

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UserCreated {
    pub id: i32,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Create one or many users. Admin-gated, except when registration is
/// configured open or the user table is still empty (first-admin
/// bootstrap).
pub async fn register(
    State(state): State<AppState>,
    current: Option<CurrentUser>,
    WithRejection(Json(payload), _): WithRejection<Json<OneOrMany<NewUser>>, ApiError>,
) -> ApiResult<(StatusCode, Json<Vec<UserCreated>>)> {
    let candidates = payload.into_vec();
    if candidates.is_empty() {
        return Err(ApiError::Validation("user batch is empty".into()));
    }

    let _guard = state.mutation_lock.lock().await;

    let user_count = user::Entity::find().count(&state.db).await?;
    let bootstrap = user_count == 0;
    if !bootstrap && !state.config.open_registration {
        let current =
            current.ok_or_else(|| ApiError::Authentication("missing bearer token".into()))?;
        current.require(Role::Admin)?;
    }

    let mut parsed = Vec::with_capacity(candidates.len());
    let mut problems = Vec::new();
    for (idx, candidate) in candidates.into_iter().enumerate() {
        if candidate.username.trim().is_empty() {
            problems.push(format!("candidate {idx}: username must not be empty"));
        }
        if candidate.password.is_empty() {
            problems.push(format!("candidate {idx}: password must not be empty"));
        }
        match Role::parse(&candidate.role) {
            Some(role) => parsed.push((candidate.username, candidate.password, role)),
            None => problems.push(format!(
                "candidate {idx}: invalid role {:?}; expected admin, manager or employee",
                candidate.role
            )),
        }
    }
    if !problems.is_empty() {
        return Err(ApiError::Validation(problems.join("; ")));
    }

    let txn = state.db.begin().await?;
    let mut taken = std::collections::HashSet::new();
    let mut conflicts = Vec::new();
    for (username, _, _) in &parsed {
        let exists = user::Entity::find()
            .filter(user::Column::Username.eq(username.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if exists || !taken.insert(username.clone()) {
            conflicts.push(username.clone());
        }
    }
    if !conflicts.is_empty() {
        return Err(ApiError::Conflict(format!(
            "username already registered: {}",
            conflicts.join(", ")
        )));
    }

    let mut created = Vec::with_capacity(parsed.len());
    for (username, password, role) in parsed {
        let password_hash = hash_password(&password)
            .map_err(|err| ApiError::Internal(anyhow::anyhow!("password hash: {err}")))?;
        let model = user::ActiveModel {
            username: Set(username),
            password_hash: Set(password_hash),
            role: Set(role.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        created.push(UserCreated {
            id: model.id,
            username: model.username,
            role: Role::from(model.role).as_str().to_string(),
        });
    }
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Exchange credentials for a bearer token. Unknown usernames and wrong
/// passwords produce the same error so callers cannot enumerate users.
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<Json<LoginResponse>> {
    let invalid = || ApiError::Authentication("invalid username or password".into());

    let found = user::Entity::find()
        .filter(user::Column::Username.eq(payload.username.as_str()))
        .one(&state.db)
        .await?;
    let Some(found) = found else {
        return Err(invalid());
    };
    if !verify_password(&payload.password, &found.password_hash) {
        return Err(invalid());
    }

    let role = Role::from(found.role);
    let access_token = issue_token(&found.username, role, &state.auth)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("token issue: {err}")))?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.auth.token_ttl_minutes * 60,
    }))
}
