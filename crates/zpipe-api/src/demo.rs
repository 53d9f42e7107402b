//! # Demo Users API
//!
//! A small in-memory users service wired with every binding: path
//! parameters, query parameters with defaults, a validated JSON body,
//! and validated handler returns. Served by the `zpipe-demo` binary and
//! used by the integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use zpipe_schema::{Schema, SchemaError};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::handler::{handler, sync_handler, RequestInput};
use crate::operation::{body, params, query, returns, returns_with_status, HandlerOperation};
use crate::router::ApiRouter;

/// Ids above this do not exist.
pub const MAX_USER_ID: u64 = 1000;

const ROLES: [&str; 2] = ["admin", "member"];

/// A user, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreateUser {
    name: String,
    email: String,
    role: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: u64,
    role: Option<String>,
    tag: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct UserPath {
    id: f64,
}

/// Output schema of a single user.
pub fn user_schema() -> Schema {
    Schema::object([
        ("id", Schema::integer().min(1.0)),
        ("name", Schema::string().min_length(1)),
        (
            "email",
            Schema::string()
                .format("email")
                .refine("must contain '@'", |v| {
                    v.as_str().is_some_and(|s| s.contains('@'))
                }),
        ),
        ("role", Schema::enumeration(ROLES)),
        ("tags", Schema::array(Schema::string()).optional()),
    ])
    .describe("A registered user")
}

/// Request body schema of `POST /users`.
pub fn create_user_schema() -> Schema {
    Schema::object([
        ("name", Schema::string().min_length(1).max_length(64)),
        (
            "email",
            Schema::string()
                .format("email")
                .refine("must contain '@'", |v| {
                    v.as_str().is_some_and(|s| s.contains('@'))
                }),
        ),
        ("role", Schema::enumeration(ROLES).default("member")),
        (
            "tags",
            Schema::array(Schema::string()).max_items(8).optional(),
        ),
    ])
    .strict()
}

/// Query schema of `GET /users`.
pub fn list_query_schema() -> Schema {
    Schema::object([
        (
            "limit",
            Schema::integer()
                .min(1.0)
                .max(100.0)
                .default(20)
                .describe("Page size"),
        ),
        ("role", Schema::enumeration(ROLES).optional()),
        ("tag", Schema::array(Schema::string()).optional()),
    ])
}

fn sample_user(id: u64) -> User {
    User {
        id,
        name: format!("user-{id}"),
        email: format!("user-{id}@example.com"),
        role: if id % 10 == 1 { "admin" } else { "member" }.to_string(),
        tags: Vec::new(),
    }
}

/// Build the demo API.
pub fn demo_api(config: ApiConfig) -> Result<ApiRouter, SchemaError> {
    let next_id = Arc::new(AtomicU64::new(MAX_USER_ID + 1));

    let get_user = HandlerOperation::new(
        Method::GET,
        "/users/{id}",
        sync_handler(|input: RequestInput| {
            let UserPath { id } = input.params_as()?;
            if id.fract() != 0.0 || id < 1.0 || id > MAX_USER_ID as f64 {
                return Err(ApiError::NotFound(format!("user {id}")));
            }
            Ok(sample_user(id as u64))
        }),
    )
    .summary("Fetch a user")
    .tag("users")
    .with(params(Schema::object([("id", Schema::number())]))?)
    .with(returns(user_schema())?);

    let list_users = HandlerOperation::new(
        Method::GET,
        "/users",
        handler(|input: RequestInput| async move {
            let q: ListQuery = input.query_as()?;
            let users: Vec<User> = (1..=MAX_USER_ID)
                .map(sample_user)
                .filter(|u| q.role.as_deref().map_or(true, |r| u.role == r))
                .take(q.limit as usize)
                .map(|mut u| {
                    u.tags = q.tag.clone().unwrap_or_default();
                    u
                })
                .collect();
            Ok::<_, ApiError>(users)
        }),
    )
    .summary("List users")
    .tag("users")
    .with(query(list_query_schema())?)
    .with(returns(Schema::array(user_schema()))?);

    let create_user = HandlerOperation::new(
        Method::POST,
        "/users",
        handler(move |input: RequestInput| {
            let next_id = Arc::clone(&next_id);
            async move {
                let req: CreateUser = input.body_as()?;
                let user = User {
                    id: next_id.fetch_add(1, Ordering::Relaxed),
                    name: req.name,
                    email: req.email,
                    role: req.role,
                    tags: req.tags,
                };
                tracing::info!(id = user.id, "user created");
                Ok::<_, ApiError>(user)
            }
        }),
    )
    .summary("Create a user")
    .tag("users")
    .with(body(create_user_schema())?)
    .with(returns_with_status(user_schema(), StatusCode::CREATED)?);

    Ok(ApiRouter::new(config)
        .operation(get_user)
        .operation(list_users)
        .operation(create_user))
}
