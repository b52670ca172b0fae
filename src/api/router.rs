use super::cookie::*;
use super::error::ApiErrorCode;
use super::gate::with_verification;
use super::handler;
use super::media::{self, MediaRequest, MediaSegment};
use crate::domain_model::MediaKind;
use crate::server::Server;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .and_then(handler::health);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(json_body::<handler::LoginRequest>())
        .and(with(server.auth_sessions.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::login);

    let refresh = warp::path!("auth" / "refresh")
        .and(warp::post())
        .and(json_body::<handler::RefreshRequest>())
        .and(with_cookie_credentials())
        .and(with(server.auth_sessions.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::refresh);

    let logout = warp::path!("auth" / "logout")
        .and(warp::post())
        .and(json_body::<handler::RefreshRequest>())
        .and(with_cookie_credentials())
        .and(with(server.auth_sessions.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::logout);

    let me = warp::path!("auth" / "me")
        .and(warp::get())
        .and(with_verification(server.access_verifier.clone()))
        .and(with(server.video_path.clone()))
        .and_then(handler::me);

    let movie = warp::path!("videos" / MediaSegment / MediaSegment).map(
        |folder: MediaSegment, file: MediaSegment| MediaRequest {
            kind: MediaKind::Movie,
            segments: vec![folder, file],
        },
    );
    let episode = warp::path!("series" / MediaSegment / MediaSegment / MediaSegment).map(
        |show: MediaSegment, season: MediaSegment, file: MediaSegment| MediaRequest {
            kind: MediaKind::Series,
            segments: vec![show, season, file],
        },
    );

    // Paths are matched before methods and before the gate so that an
    // unknown route stays 404 instead of turning into 405 or 401.
    let media = movie
        .or(episode)
        .unify()
        .and(warp::get())
        .and(warp::header::optional::<String>("range"))
        .and(with_verification(server.access_verifier.clone()))
        .and(with(server.media_catalog.clone()))
        .and(with(server.range_policy.clone()))
        .and(with(server.stream_pump.clone()))
        .and_then(media::stream_media);

    health
        .or(login)
        .or(refresh)
        .or(logout)
        .or(me)
        .or(media)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_cookie_credentials()
-> impl Filter<Extract = (CookieCredentials,), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(REFRESH_COOKIE)
        .and(warp::cookie::optional::<String>(CSRF_COOKIE))
        .and(warp::header::optional::<String>(CSRF_HEADER))
        .map(
            |refresh_token, csrf_cookie, csrf_header| CookieCredentials {
                refresh_token,
                csrf_cookie,
                csrf_header,
            },
        )
}

/// JSON body that may also be empty, in which case the type's default is
/// used. Cookie-only refresh and logout calls usually send no body at all.
/// A body must announce its length up front and stay under `MAX_BODY_BYTES`.
fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: DeserializeOwned + Default + Send + 'static,
{
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .or(no_body())
        .unify()
        .and_then(|body: Bytes| async move {
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(T::default());
            }
            serde_json::from_slice::<T>(&body)
                .map_err(|_| reject::custom(ApiErrorCode::BadRequest))
        })
}

/// Matches only requests that carry neither `Content-Length` nor
/// `Transfer-Encoding`, which have no body to read.
fn no_body() -> impl Filter<Extract = (Bytes,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("content-length")
        .and(warp::header::optional::<String>("transfer-encoding"))
        .and_then(|length: Option<String>, encoding: Option<String>| async move {
            match (length, encoding) {
                (None, None) => Ok(Bytes::new()),
                _ => Err(reject()),
            }
        })
}

/// CORS for a browser client on another origin. An empty origin list admits
/// any origin.
pub fn cors(origins: &[String]) -> warp::cors::Builder {
    let builder = warp::cors()
        .allow_credentials(true)
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["authorization", "content-type", "range", CSRF_HEADER])
        .expose_headers(vec!["content-range", "accept-ranges", "content-length"]);
    if origins.is_empty() {
        builder.allow_any_origin()
    } else {
        builder.allow_origins(origins.iter().map(String::as_str))
    }
}
