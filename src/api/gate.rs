use super::cookie::ACCESS_COOKIE;
use super::error::ApiErrorCode;
use crate::application_port::{AccessVerifier, AuthError};
use crate::domain_model::Identity;
use std::sync::Arc;
use warp::{Filter, reject};

const BEARER_PREFIX: &str = "Bearer ";

fn bearer_token(authorization: Option<&str>) -> Option<String> {
    let value = authorization?;
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Admits requests carrying a valid access token, either as
/// `Authorization: Bearer` or in the access cookie, and extracts the caller.
/// Everything else is rejected with a generic 401.
pub fn with_verification(
    verifier: Arc<dyn AccessVerifier>,
) -> impl Filter<Extract = (Identity,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(ACCESS_COOKIE))
        .and_then(move |authorization: Option<String>, cookie: Option<String>| {
            let verifier = verifier.clone();
            async move {
                let token = bearer_token(authorization.as_deref())
                    .or_else(|| cookie.filter(|c| !c.is_empty()))
                    .ok_or_else(|| reject::custom(ApiErrorCode::from_gate(AuthError::MissingToken)))?;
                verifier
                    .verify(&token)
                    .await
                    .map_err(ApiErrorCode::from_gate)
                    .map_err(reject::custom)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc".to_string()));
        assert_eq!(bearer_token(Some("bearer abc")), Some("abc".to_string()));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bear")), None);
        assert_eq!(bearer_token(None), None);
    }
}
