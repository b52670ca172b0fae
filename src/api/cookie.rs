use crate::application_port::AuthError;
use crate::domain_model::LoginSession;
use crate::domain_port::Clock;
use crate::settings;
use ::cookie::{Cookie, SameSite};
use anyhow::bail;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};
use warp::http::header::{HeaderValue, SET_COOKIE};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Transport side of a session: which cookies carry it and how they are
/// scoped. The access and CSRF cookies live at `/`, the refresh cookie only
/// under the auth path.
pub struct CookiePolicy {
    domain: Option<String>,
    secure: bool,
    same_site: SameSite,
    auth_path: String,
    clock: Arc<dyn Clock>,
}

impl CookiePolicy {
    pub fn try_new(cookie: &settings::Cookie, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let same_site = match cookie.same_site.as_str() {
            "Strict" => SameSite::Strict,
            "Lax" => SameSite::Lax,
            "None" => SameSite::None,
            other => bail!("unknown cookie.same_site mode: {}", other),
        };
        let domain = cookie.domain.clone().filter(|d| !d.is_empty());
        if let Some(domain) = &domain {
            ensure_attribute("cookie.domain", domain)?;
        }
        ensure_attribute("cookie.auth_path", &cookie.auth_path)?;
        if !cookie.auth_path.starts_with('/') {
            bail!("cookie.auth_path must start with '/': {}", cookie.auth_path);
        }
        Ok(CookiePolicy {
            domain,
            secure: cookie.secure,
            same_site,
            auth_path: cookie.auth_path.clone(),
            clock,
        })
    }

    /// Cookies for a freshly issued session.
    pub fn set_auth_cookies(&self, session: &LoginSession) -> Vec<Cookie<'static>> {
        let remaining_ms = session.refresh_expires_at_ms - self.clock.now_ms();
        let max_age = Duration::seconds((remaining_ms / 1000).max(0));

        let access = self.cookie(ACCESS_COOKIE, session.access_token.0.clone(), "/", true);
        let mut refresh = self.cookie(
            REFRESH_COOKIE,
            session.refresh_token.0.clone(),
            &self.auth_path,
            true,
        );
        refresh.set_max_age(max_age);
        let mut csrf = self.cookie(CSRF_COOKIE, session.csrf_token.clone(), "/", false);
        csrf.set_max_age(max_age);

        vec![access, refresh, csrf]
    }

    /// Cookies that remove every auth cookie. Names and paths match
    /// [`CookiePolicy::set_auth_cookies`], otherwise browsers keep the
    /// originals.
    pub fn clear_auth_cookies(&self) -> Vec<Cookie<'static>> {
        [
            self.cookie(ACCESS_COOKIE, String::new(), "/", true),
            self.cookie(REFRESH_COOKIE, String::new(), &self.auth_path, true),
            self.cookie(CSRF_COOKIE, String::new(), "/", false),
        ]
        .into_iter()
        .map(|mut cookie| {
            cookie.set_max_age(Duration::ZERO);
            cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
            cookie
        })
        .collect()
    }

    fn cookie(
        &self,
        name: &'static str,
        value: String,
        path: &str,
        http_only: bool,
    ) -> Cookie<'static> {
        let mut builder = Cookie::build((name, value))
            .path(path.to_string())
            .http_only(http_only)
            .secure(self.secure)
            .same_site(self.same_site);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}

/// Rejects attribute values that would break out of their `Set-Cookie`
/// attribute.
fn ensure_attribute(name: &str, value: &str) -> anyhow::Result<()> {
    if value
        .chars()
        .any(|c| c == ';' || c == ',' || c.is_whitespace() || c.is_control())
    {
        bail!(
            "{} contains characters not allowed in a cookie attribute: {:?}",
            name,
            value
        );
    }
    Ok(())
}

/// Appends one `Set-Cookie` header per cookie.
pub fn with_cookies(
    reply: impl warp::Reply,
    cookies: Vec<Cookie<'static>>,
) -> warp::reply::Response {
    let mut response = reply.into_response();
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!("dropping unencodable cookie {}: {}", cookie.name(), e),
        }
    }
    response
}

/// Cookie and header state relevant to refresh and logout.
#[derive(Debug, Default, Clone)]
pub struct CookieCredentials {
    pub refresh_token: Option<String>,
    pub csrf_cookie: Option<String>,
    pub csrf_header: Option<String>,
}

/// Double-submit check: both values present, non-empty and equal.
pub fn ensure_csrf(cookie: Option<&str>, header: Option<&str>) -> Result<(), AuthError> {
    match (cookie, header) {
        (Some(cookie), Some(header))
            if !cookie.is_empty() && bool::from(cookie.as_bytes().ct_eq(header.as_bytes())) =>
        {
            Ok(())
        }
        _ => Err(AuthError::CsrfMismatch),
    }
}

/// Picks the refresh token for a refresh or logout call. A token in the body
/// is its own proof of possession; a token taken from the cookie must be
/// accompanied by the CSRF header.
pub fn resolve_refresh_token(
    body_token: Option<String>,
    cookies: CookieCredentials,
) -> Result<String, AuthError> {
    if let Some(token) = body_token.filter(|t| !t.is_empty()) {
        return Ok(token);
    }
    let token = cookies
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    ensure_csrf(cookies.csrf_cookie.as_deref(), cookies.csrf_header.as_deref()).inspect_err(
        |_| tracing::warn!("cookie-based refresh call without a matching CSRF header"),
    )?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::{AccessToken, RefreshToken, TokenId};

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_ms(&self) -> i64 {
            self.0
        }
    }

    fn policy(secure: bool, same_site: &str) -> CookiePolicy {
        let cookie = settings::Cookie {
            domain: Some("media.local".to_string()),
            secure,
            same_site: same_site.to_string(),
            auth_path: "/auth".to_string(),
        };
        CookiePolicy::try_new(&cookie, Arc::new(FixedClock(1_000_000))).unwrap()
    }

    fn session() -> LoginSession {
        LoginSession {
            access_token: AccessToken("acc".to_string()),
            refresh_token: RefreshToken("ref".to_string()),
            token_id: TokenId("jti".to_string()),
            csrf_token: "csrf".to_string(),
            refresh_expires_at_ms: 1_000_000 + 3_600_000,
        }
    }

    #[test]
    fn auth_cookies_are_scoped() {
        let cookies = policy(true, "Strict").set_auth_cookies(&session());

        let access = &cookies[0];
        assert_eq!((access.name(), access.value()), ("access_token", "acc"));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(access.domain(), Some("media.local"));
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Strict));
        assert_eq!(access.max_age(), None);

        let refresh = &cookies[1];
        assert_eq!((refresh.name(), refresh.value()), ("refresh_token", "ref"));
        assert_eq!(refresh.path(), Some("/auth"));
        assert_eq!(refresh.http_only(), Some(true));
        assert_eq!(refresh.max_age(), Some(Duration::seconds(3600)));

        let csrf = &cookies[2];
        assert_eq!((csrf.name(), csrf.value()), ("csrf_token", "csrf"));
        assert_eq!(csrf.path(), Some("/"));
        assert_eq!(csrf.http_only(), Some(false));
        assert_eq!(csrf.max_age(), Some(Duration::seconds(3600)));
    }

    #[test]
    fn header_values_parse_back() {
        let response = with_cookies(
            warp::reply(),
            policy(true, "Lax").set_auth_cookies(&session()),
        );
        let headers: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(headers.len(), 3);

        let refresh = Cookie::parse(headers[1].to_str().unwrap()).unwrap();
        assert_eq!(refresh.name(), "refresh_token");
        assert_eq!(refresh.path(), Some("/auth"));
        assert_eq!(refresh.same_site(), Some(SameSite::Lax));
        assert_eq!(refresh.secure(), Some(true));
    }

    #[test]
    fn cleared_cookies_match_names_and_paths() {
        let cookies = policy(false, "Lax").clear_auth_cookies();
        let scopes: Vec<_> = cookies.iter().map(|c| (c.name(), c.path())).collect();
        assert_eq!(
            scopes,
            [
                ("access_token", Some("/")),
                ("refresh_token", Some("/auth")),
                ("csrf_token", Some("/")),
            ]
        );
        for cookie in &cookies {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
            assert_eq!(cookie.secure(), Some(false));
            assert!(!cookie.to_string().contains("; Secure"));
        }
    }

    #[test]
    fn unknown_same_site_is_rejected() {
        let cookie = settings::Cookie {
            same_site: "Sometimes".to_string(),
            ..settings::Cookie::default()
        };
        assert!(CookiePolicy::try_new(&cookie, Arc::new(FixedClock(0))).is_err());
    }

    #[test]
    fn attribute_injection_is_rejected() {
        let cookie = settings::Cookie {
            domain: Some("media.local; SameSite=None".to_string()),
            ..settings::Cookie::default()
        };
        assert!(CookiePolicy::try_new(&cookie, Arc::new(FixedClock(0))).is_err());

        let cookie = settings::Cookie {
            auth_path: "/auth;Domain=evil.example".to_string(),
            ..settings::Cookie::default()
        };
        assert!(CookiePolicy::try_new(&cookie, Arc::new(FixedClock(0))).is_err());

        let cookie = settings::Cookie {
            auth_path: "auth".to_string(),
            ..settings::Cookie::default()
        };
        assert!(CookiePolicy::try_new(&cookie, Arc::new(FixedClock(0))).is_err());
    }

    #[test]
    fn csrf_requires_matching_pair() {
        assert!(ensure_csrf(Some("abc"), Some("abc")).is_ok());
        assert!(ensure_csrf(Some("abc"), Some("abd")).is_err());
        assert!(ensure_csrf(Some("abc"), None).is_err());
        assert!(ensure_csrf(None, Some("abc")).is_err());
        assert!(ensure_csrf(Some(""), Some("")).is_err());
    }

    #[test]
    fn body_token_bypasses_csrf() {
        let token = resolve_refresh_token(Some("body".to_string()), CookieCredentials::default());
        assert_eq!(token.unwrap(), "body");
    }

    #[test]
    fn cookie_token_requires_csrf() {
        let cookies = CookieCredentials {
            refresh_token: Some("cookie".to_string()),
            csrf_cookie: Some("x".to_string()),
            csrf_header: None,
        };
        assert!(matches!(
            resolve_refresh_token(None, cookies.clone()),
            Err(AuthError::CsrfMismatch)
        ));

        let cookies = CookieCredentials {
            csrf_header: Some("x".to_string()),
            ..cookies
        };
        assert_eq!(resolve_refresh_token(None, cookies).unwrap(), "cookie");
    }

    #[test]
    fn no_token_anywhere_is_missing() {
        assert!(matches!(
            resolve_refresh_token(Some(String::new()), CookieCredentials::default()),
            Err(AuthError::MissingToken)
        ));
    }
}
