use serde::Serialize;

/// Liveness report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the process answers.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Whether the completion gateway has credentials.
    pub gateway_configured: bool,
    /// Whether web search has credentials.
    pub search_configured: bool,
}
