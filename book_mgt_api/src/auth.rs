use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use paperclip::actix::Apiv2Security;

use crate::api::DetailResponse;

/// The single credential pair allowed to use the api
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    username: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        // evaluate both so the response time does not reveal which one was wrong
        let username_ok = constant_time_eq(self.username.as_bytes(), username.as_bytes());
        let password_ok = constant_time_eq(self.password.as_bytes(), password.as_bytes());
        username_ok & password_ok
    }
}

fn constant_time_eq(expected: &[u8], given: &[u8]) -> bool {
    if expected.len() != given.len() {
        return false;
    }
    expected
        .iter()
        .zip(given)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    MissingCredentials,

    #[error("Invalid authentication credentials")]
    MalformedCredentials,

    #[error("Incorrect username or password")]
    IncorrectCredentials,

    #[error("Authentication is not configured")]
    NotConfigured,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if self.status_code() == StatusCode::UNAUTHORIZED {
            response.insert_header((WWW_AUTHENTICATE, "Basic"));
        }
        response.json(DetailResponse::new(self.to_string()))
    }
}

/// Extractor which succeeds only for requests carrying the admin credentials
/// in an `Authorization: Basic` header
#[derive(Debug, Apiv2Security)]
#[openapi(
    basic,
    alias = "basicAuth",
    description = "Admin credentials in an Authorization: Basic header"
)]
pub struct Authenticated {
    pub username: String,
}

impl FromRequest for Authenticated {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Authenticated, AuthError> {
    let expected = req
        .app_data::<Data<AdminCredentials>>()
        .ok_or(AuthError::NotConfigured)?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredentials)?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::MissingCredentials)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::MissingCredentials);
    }

    let decoded = STANDARD
        .decode(token.trim())
        .map_err(|_| AuthError::MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::MalformedCredentials)?;

    if expected.matches(username, password) {
        Ok(Authenticated {
            username: username.to_string(),
        })
    } else {
        tracing::warn!(username, "Rejected credentials");
        Err(AuthError::IncorrectCredentials)
    }
}

#[cfg(test)]
mod auth_tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn basic(credentials: &str) -> String {
        format!("Basic {}", STANDARD.encode(credentials))
    }

    fn request_with(header: Option<&str>) -> HttpRequest {
        let mut request =
            TestRequest::default().app_data(Data::new(AdminCredentials::new("admin", "password")));
        if let Some(header) = header {
            request = request.insert_header((AUTHORIZATION, header));
        }
        request.to_http_request()
    }

    #[test]
    fn accepts_admin_credentials() {
        let auth = authenticate(&request_with(Some(&basic("admin:password")))).unwrap();
        assert_eq!(auth.username, "admin");

        let lowercase_scheme = format!("basic {}", STANDARD.encode("admin:password"));
        assert!(authenticate(&request_with(Some(&lowercase_scheme))).is_ok());
    }

    #[test]
    fn rejects_wrong_credentials() {
        assert!(matches!(
            authenticate(&request_with(Some(&basic("wrong:wrong")))),
            Err(AuthError::IncorrectCredentials)
        ));
        assert!(matches!(
            authenticate(&request_with(Some(&basic("admin:passwordx")))),
            Err(AuthError::IncorrectCredentials)
        ));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(matches!(
            authenticate(&request_with(None)),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            authenticate(&request_with(Some("Bearer abc"))),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            authenticate(&request_with(Some("Basic !!!"))),
            Err(AuthError::MalformedCredentials)
        ));
        assert!(matches!(
            authenticate(&request_with(Some(&basic("no-colon")))),
            Err(AuthError::MalformedCredentials)
        ));
    }

    #[test]
    fn missing_configuration_is_an_internal_error() {
        let request = TestRequest::default()
            .insert_header((AUTHORIZATION, basic("admin:password")))
            .to_http_request();
        let err = authenticate(&request).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unauthorized_response_asks_for_basic_auth() {
        let response = AuthError::IncorrectCredentials.error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            "Basic"
        );
    }
}
