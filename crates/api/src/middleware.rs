use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use cleanops_auth::{authorize, explain_authorization, AuthenticationGuard, AuthorizationPolicy, OperationId};

use crate::app::errors;
use crate::context::IdentityContext;

/// Name of the HTTP-only cookie that may carry the token.
pub const AUTH_COOKIE_NAME: &str = "token";

/// Guard configuration for one route: who authenticates, and which policy applies.
///
/// The policy is resolved from the policy table when the route is registered.
#[derive(Clone)]
pub struct RouteGuard {
    pub authn: AuthenticationGuard,
    pub operation: OperationId,
    pub policy: AuthorizationPolicy,
}

/// Authenticate, then authorize, then hand the identity to the handler.
pub async fn guard_middleware(State(route): State<RouteGuard>, mut req: Request, next: Next) -> Response {
    let outcome = route.authn.authenticate(extract_token(req.headers()), Utc::now());

    let identity = match outcome.into_result() {
        Ok(identity) => identity,
        Err(rejection) => {
            tracing::debug!(
                operation = %route.operation,
                reason = %rejection.reason(),
                "request rejected: unauthenticated"
            );
            return errors::unauthenticated(rejection.client_message());
        }
    };

    if authorize(Some(&identity), &route.policy).is_err() {
        let explanation = explain_authorization(Some(&identity), &route.policy);
        tracing::info!(
            operation = %route.operation,
            user_id = %identity.user_id(),
            reason = %explanation.reason,
            "request denied"
        );
        return errors::forbidden("insufficient role");
    }

    req.extensions_mut().insert(IdentityContext::new(identity));
    next.run(req).await
}

/// Token from `Authorization: Bearer ...`, falling back to the auth cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    extract_bearer(headers).or_else(|| extract_cookie(headers))
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn extract_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == AUTH_COOKIE_NAME).then(|| value.trim())
        })
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_is_used() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer abc.def.ghi")]);
        assert_eq!(extract_token(&h), Some("abc.def.ghi"));
    }

    #[test]
    fn surrounding_whitespace_is_stripped_at_extraction() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer   abc.def.ghi  ")]);
        assert_eq!(extract_token(&h), Some("abc.def.ghi"));

        let c = headers(&[(header::COOKIE, "token= abc.def.ghi ; lang=en")]);
        assert_eq!(extract_token(&c), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "token=from-cookie"),
        ]);
        assert_eq!(extract_token(&h), Some("from-header"));
    }

    #[test]
    fn cookie_is_a_fallback() {
        let h = headers(&[(header::COOKIE, "theme=dark; token=from-cookie; lang=en")]);
        assert_eq!(extract_token(&h), Some("from-cookie"));

        let split = headers(&[(header::COOKIE, "theme=dark"), (header::COOKIE, "token=second")]);
        assert_eq!(extract_token(&split), Some("second"));
    }

    #[test]
    fn missing_or_empty_credentials_yield_none() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers(&[(header::AUTHORIZATION, "Bearer   ")])), None);
        assert_eq!(extract_token(&headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwdw==")])), None);
        assert_eq!(extract_token(&headers(&[(header::COOKIE, "token=")])), None);
        assert_eq!(extract_token(&headers(&[(header::COOKIE, "mytoken=x")])), None);
    }
}
