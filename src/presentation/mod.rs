// Presentation layer - HTTP routes, request identity and error mapping
pub mod app_state;
pub mod auth;
pub mod error;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    download_model, health_check, import_status, import_year, imported_years,
    work_contributions_available,
};
use axum::{Router, routing::get};
use std::sync::Arc;

// Mesh downloads are compressed by the response builder, so no CompressionLayer here.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route(
            "/contributions/import/:year",
            get(import_status).post(import_year),
        )
        .route("/contributions/model", get(download_model))
        .route("/contributions/years", get(imported_years))
        .route(
            "/contributions/work-contributions-available/:year",
            get(work_contributions_available),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::contribution_fetcher::Credential;
    use crate::application::import_service::ImportService;
    use crate::application::model_assembler::ModelAssembler;
    use crate::application::model_service::ModelService;
    use crate::application::testing::{MemoryRepository, StaticFetcher, series_from};
    use crate::domain::contribution::Identity;
    use crate::infrastructure::mesh_kernel::MeshKernel;
    use crate::presentation::auth::{FORWARDED_ACCESS_TOKEN, FORWARDED_USER};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    struct Harness {
        repository: Arc<MemoryRepository>,
        fetcher: Arc<StaticFetcher>,
        app: Router,
    }

    fn harness() -> Harness {
        let repository = Arc::new(MemoryRepository::default());
        let fetcher = Arc::new(StaticFetcher::default());
        let import_service =
            ImportService::new(repository.clone(), fetcher.clone(), Credential::new("bot"));
        let model_service = ModelService::new(
            repository.clone(),
            Arc::new(ModelAssembler::new(MeshKernel::new(None))),
        );
        let app = router(Arc::new(AppState {
            import_service,
            model_service,
        }));
        Harness {
            repository,
            fetcher,
            app,
        }
    }

    fn as_user(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(FORWARDED_USER, "octocat")
            .header(FORWARDED_ACCESS_TOKEN, "personal")
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = harness()
            .app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_requests_without_forwarded_user_are_unauthorized() {
        let response = harness()
            .app
            .oneshot(
                Request::get("/contributions/years")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_import_stores_both_identities() {
        let h = harness();
        h.fetcher.respond("personal", Ok(series_from(2021, &[1, 2])));
        h.fetcher.respond("bot", Ok(series_from(2021, &[3, 4])));

        let response = h
            .app
            .oneshot(as_user("POST", "/contributions/import/2021"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "imported");
        assert_eq!(json["imported"].as_array().unwrap().len(), 2);
        assert!(h.repository.stored("octocat", 2021, Identity::All).is_some());
    }

    #[tokio::test]
    async fn test_import_status_after_partial_import() {
        let h = harness();
        h.fetcher.respond("personal", Ok(series_from(2021, &[1, 2])));

        let response = h
            .app
            .clone()
            .oneshot(as_user("POST", "/contributions/import/2021"))
            .await
            .unwrap();
        assert!(response.status().is_server_error());

        let status = h
            .app
            .oneshot(as_user("GET", "/contributions/import/2021"))
            .await
            .unwrap();
        assert_eq!(json_body(status).await, serde_json::json!("importing"));
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_year() {
        let response = harness()
            .app
            .oneshot(as_user("POST", "/contributions/import/1999"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_import_rate_limit_maps_to_429() {
        let h = harness();
        h.fetcher.respond(
            "personal",
            Err(crate::domain::error::FetchError::RateLimited),
        );
        h.fetcher.respond("bot", Ok(series_from(2021, &[3])));

        let response = h
            .app
            .oneshot(as_user("POST", "/contributions/import/2021"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_model_download() {
        let h = harness();
        h.repository
            .insert("octocat", 2021, Identity::All, series_from(2021, &[2, 0, 4]));

        let response = h
            .app
            .oneshot(as_user("GET", "/contributions/model?start_year=2021"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "model/stl");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("octocat-2021-2021.stl"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let mesh = stl_io::read_stl(&mut std::io::Cursor::new(body.to_vec())).unwrap();
        assert!(!mesh.faces.is_empty());
    }

    #[tokio::test]
    async fn test_model_for_missing_year_is_not_found() {
        let response = harness()
            .app
            .oneshot(as_user(
                "GET",
                "/contributions/model?start_year=2021&contributions=work",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "NOT_IMPORTED");
    }

    #[tokio::test]
    async fn test_years_and_work_availability() {
        let h = harness();
        h.repository
            .insert("octocat", 2020, Identity::All, series_from(2020, &[5]));
        h.repository
            .insert("octocat", 2021, Identity::All, series_from(2021, &[5]));
        h.repository
            .insert("octocat", 2021, Identity::Personal, series_from(2021, &[2]));

        let years = h
            .app
            .clone()
            .oneshot(as_user("GET", "/contributions/years"))
            .await
            .unwrap();
        assert_eq!(json_body(years).await, serde_json::json!([2020, 2021]));

        let available = h
            .app
            .oneshot(as_user(
                "GET",
                "/contributions/work-contributions-available/2021",
            ))
            .await
            .unwrap();
        assert_eq!(json_body(available).await, serde_json::json!(true));
    }
}
