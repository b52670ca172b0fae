#![allow(dead_code)]

use bytes::Bytes;
use homevideo::api;
use homevideo::application_impl::TtlSetting;
use homevideo::server::Server;
use homevideo::settings::*;
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use warp::Filter;
use warp::http::header::SET_COOKIE;
use warp::http::{HeaderMap, Response};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "hunter2";

pub fn settings(base_dir: &Path) -> Settings {
    Settings {
        auth: Auth {
            access_secret: "integration-access-secret".to_string(),
            refresh_secret: "integration-refresh-secret".to_string(),
            access_ttl: TtlSetting::Text("15m".to_string()),
            refresh_ttl: TtlSetting::Text("7d".to_string()),
            user_id: "user-1".to_string(),
            username: USERNAME.to_string(),
            password_hash: None,
            password: Some(PASSWORD.to_string()),
            verifier: Verifier::default(),
        },
        cookie: Cookie::default(),
        http: Http {
            address: "127.0.0.1:0".to_string(),
            cert_path: None,
            key_path: None,
            cors_origins: vec![],
        },
        log: Log {
            filter: "info".to_string(),
        },
        media: Media {
            base_dir: base_dir.to_string_lossy().into_owned(),
            movies_dir: "Movies".to_string(),
            series_dir: "Series".to_string(),
            video_path: "/videos".to_string(),
        },
        stream: Stream::default(),
    }
}

pub async fn app(
    base_dir: &Path,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone + 'static {
    let server = Arc::new(Server::try_new(&settings(base_dir)).await.unwrap());
    api::routes(server).recover(api::recover_error)
}

/// Value of the named cookie among the response's `Set-Cookie` headers.
pub fn set_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get_all(SET_COOKIE).iter().find_map(|value| {
        let cookie = cookie::Cookie::parse(value.to_str().ok()?).ok()?;
        (cookie.name() == name).then(|| cookie.value().to_string())
    })
}

pub fn json(response: &Response<Bytes>) -> serde_json::Value {
    serde_json::from_slice(response.body()).unwrap()
}

pub struct LoggedIn {
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
}

pub async fn login<F>(api: &F) -> LoggedIn
where
    F: Filter + 'static,
    F::Extract: warp::Reply + Send,
{
    let response = warp::test::request()
        .method("POST")
        .path("/auth/login")
        .json(&serde_json::json!({ "username": USERNAME, "password": PASSWORD }))
        .reply(api)
        .await;
    assert_eq!(response.status(), 200);

    let body = json(&response);
    let access_token = body["accessToken"].as_str().unwrap().to_string();
    assert_eq!(
        set_cookie(response.headers(), "access_token").as_deref(),
        Some(access_token.as_str())
    );
    LoggedIn {
        access_token,
        refresh_token: set_cookie(response.headers(), "refresh_token").unwrap(),
        csrf_token: set_cookie(response.headers(), "csrf_token").unwrap(),
    }
}
