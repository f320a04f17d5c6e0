// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::context::run;
use crate::{
    auth::{BearerToken, Method},
    context::CallContext,
    error::{ApiError, ErrorBody},
    ledger::model::{
        AccountId, CreateTransactionRequest, DeleteTransactionRequest, ListTransactionsRequest,
        Posting, TransactionId, TransactionView, UpdateTransactionRequest, UserId,
    },
    state::AppState,
};

/// Ids removed by a delete call.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeletedTransactions {
    pub ids: Vec<TransactionId>,
}

#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/accounts/{account_id}/transactions",
    params(
        ("user_id" = u64, Path, description = "Account owner"),
        ("account_id" = u64, Path, description = "Account to post to")
    ),
    request_body = CreateTransactionRequest,
    tag = "Transactions",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Transaction posted", body = Posting),
        (status = 400, description = "Invalid amount or insufficient balance", body = ErrorBody),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    Path((user_id, account_id)): Path<(UserId, AccountId)>,
    ctx: CallContext,
    token: BearerToken,
    Json(mut request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Posting>), ApiError> {
    request.user_id = user_id;
    request.account_id = account_id;
    let posting = run(
        &state,
        ctx,
        &token,
        Method::CreateTransaction,
        request,
        |ledger, ctx, _, req| ledger.create_transaction(ctx, req),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(posting)))
}

#[utoipa::path(
    patch,
    path = "/v1/users/{user_id}/accounts/{account_id}/transactions/{id}",
    params(
        ("user_id" = u64, Path, description = "Account owner"),
        ("account_id" = u64, Path, description = "Account holding the transaction"),
        ("id" = u64, Path, description = "Transaction to amend")
    ),
    request_body = UpdateTransactionRequest,
    tag = "Transactions",
    security(("bearer" = [])),
    responses(
        (status = 200, body = Posting),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn update_transaction(
    State(state): State<AppState>,
    Path((user_id, account_id, id)): Path<(UserId, AccountId, TransactionId)>,
    ctx: CallContext,
    token: BearerToken,
    Json(mut request): Json<UpdateTransactionRequest>,
) -> Result<Json<Posting>, ApiError> {
    request.user_id = user_id;
    request.account_id = account_id;
    request.id = id;
    let posting = run(
        &state,
        ctx,
        &token,
        Method::UpdateTransaction,
        request,
        |ledger, ctx, _, req| ledger.update_transaction(ctx, req),
    )
    .await?;
    Ok(Json(posting))
}

#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/transactions",
    params(
        ("user_id" = u64, Path, description = "Account owner"),
        ListTransactionsRequest
    ),
    tag = "Transactions",
    security(("bearer" = [])),
    responses(
        (status = 200, body = [TransactionView]),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    ctx: CallContext,
    token: BearerToken,
    Query(mut request): Query<ListTransactionsRequest>,
) -> Result<Json<Vec<TransactionView>>, ApiError> {
    request.user_id = user_id;
    let transactions = run(
        &state,
        ctx,
        &token,
        Method::ListTransactions,
        request,
        |ledger, ctx, _, req| ledger.list_transactions(ctx, req),
    )
    .await?;
    Ok(Json(transactions))
}

/// Delete one transaction, every transaction of one account, or every
/// transaction of the user. Balances are recomputed in the same commit.
#[utoipa::path(
    delete,
    path = "/v1/users/{user_id}/transactions",
    params(
        ("user_id" = u64, Path, description = "Account owner"),
        DeleteTransactionRequest
    ),
    tag = "Transactions",
    security(("bearer" = [])),
    responses(
        (status = 200, body = DeletedTransactions),
        (status = 400, description = "Delete would leave a negative balance", body = ErrorBody),
        (status = 404, body = ErrorBody)
    )
)]
pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    ctx: CallContext,
    token: BearerToken,
    Query(mut request): Query<DeleteTransactionRequest>,
) -> Result<Json<DeletedTransactions>, ApiError> {
    request.user_id = user_id;
    let ids = run(
        &state,
        ctx,
        &token,
        Method::DeleteTransaction,
        request,
        |ledger, ctx, _, req| ledger.delete_transaction(ctx, req),
    )
    .await?;
    Ok(Json(DeletedTransactions { ids }))
}
