// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::context::run;
use crate::{
    auth::{BearerToken, Method},
    context::CallContext,
    error::{ApiError, ErrorBody},
    ledger::model::{
        Account, CreateAccountRequest, ListAccountsRequest, OpenedAccount, UserId,
    },
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/accounts",
    params(("user_id" = u64, Path, description = "Owner of the new account")),
    request_body = CreateAccountRequest,
    tag = "Accounts",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Account opened", body = OpenedAccount),
        (status = 400, body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    ctx: CallContext,
    token: BearerToken,
    Json(mut request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<OpenedAccount>), ApiError> {
    request.user_id = user_id;
    let opened = run(&state, ctx, &token, Method::CreateAccount, request, |ledger, ctx, _, req| {
        ledger.create_account(ctx, req)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(opened)))
}

#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/accounts",
    params(
        ("user_id" = u64, Path, description = "Account owner"),
        ListAccountsRequest
    ),
    tag = "Accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, body = [Account]),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    ctx: CallContext,
    token: BearerToken,
    Query(mut request): Query<ListAccountsRequest>,
) -> Result<Json<Vec<Account>>, ApiError> {
    request.user_id = user_id;
    let accounts = run(&state, ctx, &token, Method::ListAccounts, request, |ledger, ctx, _, req| {
        ledger.list_accounts(ctx, req)
    })
    .await?;
    Ok(Json(accounts))
}
