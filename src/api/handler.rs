use super::cookie::*;
use super::error::*;
use crate::application_port::{AuthSessionService, LoginInput};
use crate::domain_model::Identity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reject;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub username: String,
    pub video_path: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn login(
    body: LoginRequest,
    sessions: Arc<dyn AuthSessionService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let input = LoginInput {
        username: body.username,
        password: body.password,
    };
    let session = sessions
        .login(input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = AccessTokenResponse {
        access_token: session.access_token.0.clone(),
    };
    Ok(with_cookies(
        warp::reply::json(&response),
        cookie_policy.set_auth_cookies(&session),
    ))
}

pub async fn refresh(
    body: RefreshRequest,
    cookies: CookieCredentials,
    sessions: Arc<dyn AuthSessionService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let refresh_token = resolve_refresh_token(body.refresh_token, cookies)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let session = sessions
        .rotate_refresh_session(&refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = AccessTokenResponse {
        access_token: session.access_token.0.clone(),
    };
    Ok(with_cookies(
        warp::reply::json(&response),
        cookie_policy.set_auth_cookies(&session),
    ))
}

pub async fn logout(
    body: RefreshRequest,
    cookies: CookieCredentials,
    sessions: Arc<dyn AuthSessionService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let refresh_token = resolve_refresh_token(body.refresh_token, cookies)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    if let Err(e) = sessions.revoke_refresh_session(&refresh_token).await {
        tracing::warn!("logout continued after revoke failure: {}", e);
    }

    Ok(with_cookies(
        warp::reply::json(&MessageBody::new("Logged out")),
        cookie_policy.clear_auth_cookies(),
    ))
}

pub async fn me(
    identity: Identity,
    video_path: Arc<str>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&MeResponse {
        username: identity.username,
        video_path: video_path.to_string(),
    }))
}

pub async fn health() -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&HealthResponse { status: "ok" }))
}
