//! Bearer-token authentication.
//!
//! Every protected route runs through [`auth_middleware`], which resolves
//! `Authorization: Bearer <token>` to a user row and stores an explicit
//! [`UserContext`] in the request extensions. Handlers receive the context
//! as a parameter; nothing downstream reads ambient auth state.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use lullaby_types::UserContext;
use std::sync::Arc;

use crate::AppState;

/// Wrapper for [`UserContext`] stored in request extensions.
#[derive(Clone, Debug)]
pub struct AuthContext(pub UserContext);

/// Middleware authenticating requests via `Authorization: Bearer`.
///
/// The token is issued at registration and acts as the caller's bearer
/// credential. Unknown and missing tokens both get a plain 401; the
/// response never distinguishes "no such token" from "no header".
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let token = match req.headers().get("Authorization") {
        Some(val) => {
            let val_str = val.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
            match val_str.strip_prefix("Bearer ") {
                Some(token) => token.to_string(),
                None => return Err(StatusCode::UNAUTHORIZED),
            }
        }
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
        .clone();

    let user = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        lullaby_store::get_user_by_token(&conn, &token)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??
    .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut()
        .insert(AuthContext(UserContext::new(user.id)));

    Ok(next.run(req).await)
}
