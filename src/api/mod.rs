// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::Role,
    error::{ErrorBody, ErrorKind},
    ledger::model::{
        Account, Bank, CreateAccountRequest, CreateTransactionRequest, CreateUserRequest,
        LoginRequest, OpenedAccount, Posting, Transaction, TransactionType, TransactionView,
        UpdateTransactionRequest, UpdateUserRequest, ValidateTokenRequest,
    },
    state::AppState,
};

pub mod accounts;
pub mod context;
pub mod health;
pub mod transactions;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/login", post(users::login))
        .route("/users/validate", post(users::validate_token))
        .route(
            "/users/{id}",
            patch(users::update_user).delete(users::delete_user),
        )
        .route(
            "/users/{user_id}/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/users/{user_id}/accounts/{account_id}/transactions",
            post(transactions::create_transaction),
        )
        .route(
            "/users/{user_id}/accounts/{account_id}/transactions/{id}",
            patch(transactions::update_transaction),
        )
        .route(
            "/users/{user_id}/transactions",
            get(transactions::list_transactions).delete(transactions::delete_transaction),
        );

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness));

    // Layers run outermost-last: the request id is set before tracing and
    // before the call context reads it.
    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::create_user,
        users::login,
        users::validate_token,
        users::list_users,
        users::update_user,
        users::delete_user,
        accounts::create_account,
        accounts::list_accounts,
        transactions::create_transaction,
        transactions::update_transaction,
        transactions::list_transactions,
        transactions::delete_transaction,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            Role,
            Bank,
            TransactionType,
            Account,
            Transaction,
            TransactionView,
            OpenedAccount,
            Posting,
            CreateUserRequest,
            LoginRequest,
            ValidateTokenRequest,
            UpdateUserRequest,
            CreateAccountRequest,
            CreateTransactionRequest,
            UpdateTransactionRequest,
            users::UserResponse,
            users::AuthResponse,
            transactions::DeletedTransactions,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            ErrorBody,
            ErrorKind
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Signup, login and user administration"),
        (name = "Accounts", description = "Bank accounts owned by a user"),
        (name = "Transactions", description = "Deposits and withdrawals against an account"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
