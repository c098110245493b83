//! Liveness handler.

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use repetitor_gateway::GatewayClient;

use crate::extract::Json;
use crate::handler::HealthResponse;
use crate::service::{ContextAugmenter, ServiceState};

/// Tracing target for health checks.
const TRACING_TARGET: &str = "repetitor_server::handler::health";

/// Reports liveness and which integrations have credentials.
#[tracing::instrument(skip_all)]
async fn health(
    State(gateway): State<GatewayClient>,
    State(augmenter): State<ContextAugmenter>,
) -> Json<HealthResponse> {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        gateway_configured: gateway.is_configured(),
        search_configured: augmenter.is_configured(),
    };

    tracing::trace!(
        target: TRACING_TARGET,
        gateway_configured = response.gateway_configured,
        search_configured = response.search_configured,
        "Health check"
    );

    Json(response)
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use wiremock::MockServer;

    use crate::handler::test::{create_test_config, create_test_server};

    #[tokio::test]
    async fn reports_configuration() -> anyhow::Result<()> {
        let gateway = MockServer::start().await;
        let config = create_test_config(Some(&gateway), None)?;
        let server = create_test_server(&config).await?;

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["gatewayConfigured"], true);
        assert_eq!(body["searchConfigured"], false);
        Ok(())
    }
}
