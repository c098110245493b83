//! Gateway error to HTTP error conversion.
//!
//! Upstream bodies and transport details stay in the logs; the caller only
//! sees one of three fixed messages.

use repetitor_gateway::Error as GatewayError;

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for gateway error conversions.
const TRACING_TARGET: &str = "repetitor_server::handler::gateway";

impl From<GatewayError> for HttpError<'static> {
    fn from(error: GatewayError) -> Self {
        match &error {
            GatewayError::MissingCredentials => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Completion gateway is not configured"
                );
            }
            GatewayError::RateLimited | GatewayError::PaymentRequired => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Completion gateway refused the request"
                );
            }
            _ => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Completion gateway request failed"
                );
            }
        }

        match error {
            GatewayError::MissingCredentials => ErrorKind::InternalServerError
                .with_message("Сервис не настроен.")
                .with_context("gateway credentials are not configured"),

            GatewayError::RateLimited => ErrorKind::UpstreamRateLimited
                .with_message("Слишком много запросов. Подождите немного и попробуйте снова.")
                .with_context("gateway answered 429"),

            GatewayError::PaymentRequired => ErrorKind::ServiceUnavailable
                .with_message("Сервис временно недоступен.")
                .with_context("gateway answered 402"),

            other => ErrorKind::BadGateway
                .with_message("Ошибка AI сервиса.")
                .with_context(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn maps_gateway_failures() {
        let cases = [
            (GatewayError::MissingCredentials, StatusCode::INTERNAL_SERVER_ERROR),
            (GatewayError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (GatewayError::PaymentRequired, StatusCode::SERVICE_UNAVAILABLE),
            (
                GatewayError::Status(StatusCode::INTERNAL_SERVER_ERROR),
                StatusCode::BAD_GATEWAY,
            ),
            (GatewayError::Stream("boom".into()), StatusCode::BAD_GATEWAY),
        ];

        for (error, status) in cases {
            let error = HttpError::from(error);
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn upstream_rate_limit_is_not_local_rate_limit() {
        let error = HttpError::from(GatewayError::RateLimited);
        assert_eq!(error.kind(), ErrorKind::UpstreamRateLimited);
    }
}
