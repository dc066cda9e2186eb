//! Encoding of device flow requests and decoding of server responses.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::AUTHORIZATION;
use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::flow::{DEVICE_CODE_GRANT_TYPE, DeviceAuthorizationResponse, PollOutcome};
use crate::request::{ClientAuthMethod, DeviceAuthorizationRequest};
use crate::token::{ErrorResponse, Token, TokenResponse};
use crate::transport::{FormPost, HttpResponse};

/// Builds the initial call to the device authorization endpoint.
///
/// # Errors
///
/// Returns an error if the request has no device authorization endpoint.
pub fn encode_device_authorization(request: &DeviceAuthorizationRequest) -> Result<FormPost> {
    let url = request.device_authorization_endpoint()?.clone();
    let mut post = with_client_auth(FormPost::new(url), request);

    let scope = request.scope();
    if !scope.is_empty() {
        post = post.field("scope", scope);
    }
    for (name, value) in &request.additional_parameters {
        post = post.field(name.as_str(), value.as_str());
    }
    Ok(post)
}

/// Builds one poll of the token endpoint.
#[must_use]
pub fn encode_token_poll(request: &DeviceAuthorizationRequest, device_code: &str) -> FormPost {
    let post = FormPost::new(request.configuration.token_endpoint.clone())
        .field("grant_type", DEVICE_CODE_GRANT_TYPE)
        .field("device_code", device_code);
    with_client_auth(post, request)
}

fn with_client_auth(post: FormPost, request: &DeviceAuthorizationRequest) -> FormPost {
    let post = post.field("client_id", request.client_id.as_str());
    match (&request.client_secret, request.auth_method) {
        (Some(secret), ClientAuthMethod::Post) => post.field("client_secret", secret.as_str()),
        (Some(secret), ClientAuthMethod::Basic) => {
            let credentials = STANDARD.encode(format!(
                "{}:{}",
                form_encode(&request.client_id),
                form_encode(secret)
            ));
            post.header(AUTHORIZATION.as_str(), format!("Basic {credentials}"))
        }
        (None, _) => post,
    }
}

// RFC 6749 §2.3.1: each credential is form-urlencoded before Basic encoding.
fn form_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Decodes the response to the initial call.
///
/// # Errors
///
/// Returns `Error::OAuth` for a structured error body, `Error::InvalidResponse`
/// for any other non-2xx status or an invalid document, and `Error::Json` for
/// a malformed success body.
pub fn decode_device_authorization(response: &HttpResponse) -> Result<DeviceAuthorizationResponse> {
    if !response.is_success() {
        return Err(decode_error(response));
    }

    let authorization: DeviceAuthorizationResponse = serde_json::from_slice(&response.body)?;
    authorization.validate()?;
    Ok(authorization)
}

/// Decodes the token endpoint's answer to one poll.
///
/// An `error` member decides the outcome whatever the status, since some
/// servers answer pending polls with 200.
#[must_use]
pub fn decode_poll_outcome(response: &HttpResponse) -> PollOutcome {
    if let Ok(error) = serde_json::from_slice::<ErrorResponse>(&response.body) {
        return poll_outcome_for(error);
    }

    if !response.is_success() {
        return PollOutcome::TransportFailure(Error::InvalidResponse(format!(
            "HTTP {} from token endpoint",
            response.status
        )));
    }

    match serde_json::from_slice::<TokenResponse>(&response.body)
        .map_err(Error::from)
        .and_then(Token::from_response)
    {
        Ok(token) => PollOutcome::AccessGranted(token),
        Err(e) => PollOutcome::TransportFailure(e),
    }
}

fn poll_outcome_for(error: ErrorResponse) -> PollOutcome {
    match error.error.as_str() {
        "authorization_pending" => PollOutcome::Pending,
        "slow_down" => PollOutcome::SlowDown,
        "access_denied" => PollOutcome::AccessDenied,
        "expired_token" => PollOutcome::Expired,
        _ => PollOutcome::TransportFailure(Error::UnexpectedServer {
            error: error.error,
            description: error.error_description,
        }),
    }
}

fn decode_error(response: &HttpResponse) -> Error {
    serde_json::from_slice::<ErrorResponse>(&response.body).map_or_else(
        |_| Error::InvalidResponse(format!("HTTP {}", response.status)),
        ErrorResponse::into_error,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::service::ServiceConfiguration;

    fn request() -> DeviceAuthorizationRequest {
        DeviceAuthorizationRequest::new(ServiceConfiguration::google().unwrap(), "tv-client")
            .with_scopes(["openid", "profile"])
    }

    fn error_body(status: u16, code: &str) -> HttpResponse {
        HttpResponse::new(status, format!(r#"{{"error": "{code}"}}"#))
    }

    #[test]
    fn test_encode_device_authorization() {
        let post = encode_device_authorization(&request().with_parameter("hl", "en")).unwrap();

        assert_eq!(post.url.as_str(), "https://oauth2.googleapis.com/device/code");
        assert_eq!(post.form_value("client_id"), Some("tv-client"));
        assert_eq!(post.form_value("scope"), Some("openid profile"));
        assert_eq!(post.form_value("hl"), Some("en"));
        assert_eq!(post.form_value("client_secret"), None);
    }

    #[test]
    fn test_encode_omits_empty_scope() {
        let req = DeviceAuthorizationRequest::new(ServiceConfiguration::google().unwrap(), "c");
        let post = encode_device_authorization(&req).unwrap();
        assert_eq!(post.form_value("scope"), None);
    }

    #[test]
    fn test_encode_token_poll_with_post_secret() {
        let post = encode_token_poll(&request().with_client_secret("s3cret"), "dev-123");

        assert_eq!(post.url.as_str(), "https://oauth2.googleapis.com/token");
        assert_eq!(post.form_value("grant_type"), Some(DEVICE_CODE_GRANT_TYPE));
        assert_eq!(post.form_value("device_code"), Some("dev-123"));
        assert_eq!(post.form_value("client_secret"), Some("s3cret"));
        assert!(post.headers.is_empty());
    }

    #[test]
    fn test_encode_basic_auth_header() {
        let req = request()
            .with_client_secret("secret")
            .with_auth_method(ClientAuthMethod::Basic);
        let post = encode_token_poll(&req, "dev-123");

        assert_eq!(post.form_value("client_secret"), None);
        // base64("tv-client:secret")
        assert_eq!(
            post.headers,
            vec![(
                "authorization".to_string(),
                "Basic dHYtY2xpZW50OnNlY3JldA==".to_string()
            )]
        );
    }

    #[test]
    fn test_basic_auth_form_encodes_credentials() {
        let configuration = ServiceConfiguration::google().unwrap();
        let req = DeviceAuthorizationRequest::new(configuration, "tv:client")
            .with_client_secret("s3cr et/é")
            .with_auth_method(ClientAuthMethod::Basic);
        let post = encode_token_poll(&req, "dev-123");

        // base64("tv%3Aclient:s3cr+et%2F%C3%A9")
        assert_eq!(
            post.headers[0].1,
            "Basic dHYlM0FjbGllbnQ6czNjcitldCUyRiVDMyVBOQ=="
        );
    }

    #[test]
    fn test_decode_device_authorization() {
        let response = HttpResponse::new(
            200,
            r#"{"device_code":"d","user_code":"U","verification_uri":"https://x/device","expires_in":600,"interval":5}"#,
        );
        let auth = decode_device_authorization(&response).unwrap();
        assert_eq!(auth.user_code, "U");
    }

    #[test]
    fn test_decode_device_authorization_oauth_error() {
        let err = decode_device_authorization(&error_body(401, "invalid_client")).unwrap_err();
        assert!(matches!(err, Error::OAuth { ref error, .. } if error == "invalid_client"));
    }

    #[test]
    fn test_decode_device_authorization_non_json_error() {
        let err = decode_device_authorization(&HttpResponse::new(502, "<html>")).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(ref msg) if msg == "HTTP 502"));
    }

    #[test]
    fn test_decode_device_authorization_malformed_body() {
        let err = decode_device_authorization(&HttpResponse::new(200, "{")).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_decode_poll_error_codes() {
        assert!(matches!(
            decode_poll_outcome(&error_body(400, "authorization_pending")),
            PollOutcome::Pending
        ));
        assert!(matches!(
            decode_poll_outcome(&error_body(400, "slow_down")),
            PollOutcome::SlowDown
        ));
        assert!(matches!(
            decode_poll_outcome(&error_body(400, "access_denied")),
            PollOutcome::AccessDenied
        ));
        assert!(matches!(
            decode_poll_outcome(&error_body(400, "expired_token")),
            PollOutcome::Expired
        ));
    }

    #[test]
    fn test_decode_poll_unknown_code() {
        let outcome = decode_poll_outcome(&error_body(400, "invalid_grant"));
        assert!(matches!(
            outcome,
            PollOutcome::TransportFailure(Error::UnexpectedServer { ref error, .. })
                if error == "invalid_grant"
        ));
    }

    #[test]
    fn test_decode_poll_granted() {
        let response = HttpResponse::new(
            200,
            r#"{"access_token":"at","token_type":"Bearer","expires_in":3600,"refresh_token":"rt"}"#,
        );
        let PollOutcome::AccessGranted(token) = decode_poll_outcome(&response) else {
            panic!("expected granted");
        };
        assert_eq!(token.access_token, "at");
        assert_eq!(token.refresh_token.as_deref(), Some("rt"));
    }

    #[test]
    fn test_decode_poll_error_codes_with_success_status() {
        assert!(matches!(
            decode_poll_outcome(&error_body(200, "authorization_pending")),
            PollOutcome::Pending
        ));
        assert!(matches!(
            decode_poll_outcome(&error_body(200, "slow_down")),
            PollOutcome::SlowDown
        ));
        assert!(matches!(
            decode_poll_outcome(&error_body(200, "access_denied")),
            PollOutcome::AccessDenied
        ));
        assert!(matches!(
            decode_poll_outcome(&error_body(200, "expired_token")),
            PollOutcome::Expired
        ));
    }

    #[test]
    fn test_decode_poll_gateway_error() {
        let outcome = decode_poll_outcome(&HttpResponse::new(503, "Service Unavailable"));
        assert!(matches!(
            outcome,
            PollOutcome::TransportFailure(Error::InvalidResponse(_))
        ));
    }
}
