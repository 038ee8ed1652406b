use crate::api::handlers::{health, runs};
use crate::types::{HealthResponse, Run, RunCreatedResponse, RunRequest, SuccessResponse};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Delve", description = "Streaming web research server"),
    paths(
        health::health_check,
        runs::create_run,
        runs::stream_run,
        runs::get_run,
        runs::delete_run,
        runs::cancel_run,
        runs::run_events,
    ),
    components(schemas(RunRequest, RunCreatedResponse, SuccessResponse, HealthResponse, Run)),
    tags(
        (name = "runs", description = "Research runs"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_run_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/health",
            "/api/runs",
            "/api/runs/stream",
            "/api/runs/{id}",
            "/api/runs/{id}/cancel",
            "/api/runs/{id}/events",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
