// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::context::run;
use crate::{
    auth::{BearerToken, Method, Role},
    context::CallContext,
    error::{ApiError, ErrorBody},
    ledger::model::{
        CreateUserRequest, DeleteUserRequest, ListUsersRequest, LoginRequest, Session,
        UpdateUserRequest, User, UserId, ValidateTokenRequest,
    },
    state::AppState,
};

/// A user as shown to callers. The password digest never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// Bearer token for subsequent calls
    pub token: String,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            user: session.user.into(),
            token: session.token,
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    tag = "Users",
    responses(
        (status = 201, body = AuthResponse),
        (status = 400, body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ctx: CallContext,
    token: BearerToken,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let session = run(&state, ctx, &token, Method::CreateUser, request, |ledger, ctx, _, req| {
        ledger.create_user(ctx, req)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

#[utoipa::path(
    post,
    path = "/v1/users/login",
    request_body = LoginRequest,
    tag = "Users",
    responses(
        (status = 200, body = AuthResponse),
        (status = 401, description = "Email or password is incorrect", body = ErrorBody),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ctx: CallContext,
    token: BearerToken,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = run(&state, ctx, &token, Method::Login, request, |ledger, ctx, _, req| {
        ledger.login(ctx, req)
    })
    .await?;
    Ok(Json(session.into()))
}

#[utoipa::path(
    post,
    path = "/v1/users/validate",
    request_body = ValidateTokenRequest,
    tag = "Users",
    responses(
        (status = 200, body = UserResponse),
        (status = 401, body = ErrorBody)
    )
)]
pub async fn validate_token(
    State(state): State<AppState>,
    ctx: CallContext,
    token: BearerToken,
    Json(request): Json<ValidateTokenRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = run(&state, ctx, &token, Method::ValidateToken, request, |ledger, ctx, _, req| {
        ledger.validate_token(ctx, req)
    })
    .await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/v1/users",
    params(ListUsersRequest),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = [UserResponse]),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    ctx: CallContext,
    token: BearerToken,
    Query(request): Query<ListUsersRequest>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = run(&state, ctx, &token, Method::ListUsers, request, |ledger, ctx, _, req| {
        ledger.list_users(ctx, req)
    })
    .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    patch,
    path = "/v1/users/{id}",
    params(("id" = u64, Path, description = "User to update")),
    request_body = UpdateUserRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 400, body = ErrorBody),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    ctx: CallContext,
    token: BearerToken,
    Json(mut request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    request.id = id;
    let user = run(&state, ctx, &token, Method::UpdateUser, request, |ledger, ctx, caller, req| {
        ledger.update_user(ctx, caller.as_ref(), req)
    })
    .await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    params(("id" = u64, Path, description = "User to delete with all accounts and transactions")),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    ctx: CallContext,
    token: BearerToken,
) -> Result<Json<UserResponse>, ApiError> {
    let request = DeleteUserRequest { id };
    let user = run(&state, ctx, &token, Method::DeleteUser, request, |ledger, ctx, _, req| {
        ledger.delete_user(ctx, req)
    })
    .await?;
    Ok(Json(user.into()))
}
