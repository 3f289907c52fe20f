//! Bearer tokens of incoming requests.

use actix_web::{HttpRequest, http::header};

/// Cookie the identity proxy stores the access token in.
pub const AUTH_COOKIE: &str = "auth";

/// The caller's access token from `Authorization: Bearer` or the `auth`
/// cookie. The token is passed upstream unchanged.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        req.cookie(AUTH_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use actix_web::{cookie::Cookie, test::TestRequest};

    use super::*;

    #[test]
    fn reads_header_before_cookie() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .cookie(Cookie::new(AUTH_COOKIE, "cookie-token"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn falls_back_to_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(AUTH_COOKIE, "cookie-token"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("cookie-token"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic xyz"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }
}
