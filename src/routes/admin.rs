use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::Maintenance;
use crate::models::{
    ErrorResponse, HealthResponse, MaintenanceResponse, TestParticipantQuery, TestParticipantWithLikeQuery,
};
use crate::services::StoreError;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub maintenance: Arc<Maintenance>,
}

/// Configure health and maintenance routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/admin/delete-all", web::post().to(delete_all))
        .route("/admin/test-participant", web::post().to(add_test_participant))
        .route(
            "/admin/test-participant-with-like",
            web::post().to(add_test_participant_with_like),
        );
}

fn store_failure(action: &str, e: StoreError) -> HttpResponse {
    tracing::error!("{} failed: {}", action, e);
    let status_code = match e {
        StoreError::AlreadyExists(_) => 409,
        _ => 500,
    };
    let body = ErrorResponse {
        error: format!("{} failed", action),
        message: e.to_string(),
        status_code,
    };

    if status_code == 409 {
        HttpResponse::Conflict().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = state.maintenance.health_check().await;
    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Delete every participant and evaluation
///
/// POST /api/v1/admin/delete-all
async fn delete_all(state: web::Data<AppState>) -> impl Responder {
    match state.maintenance.delete_all().await {
        Ok(affected) => {
            tracing::info!("Deleting completed ({} rows)", affected);
            HttpResponse::Ok().json(MaintenanceResponse { success: true, affected })
        }
        Err(e) => store_failure("Delete all", e),
    }
}

/// POST /api/v1/admin/test-participant?sex=true
async fn add_test_participant(
    state: web::Data<AppState>,
    query: web::Query<TestParticipantQuery>,
) -> impl Responder {
    match state.maintenance.add_test_participant(query.sex).await {
        Ok(()) => {
            tracing::info!("Test participant added");
            HttpResponse::Ok().json(MaintenanceResponse { success: true, affected: 1 })
        }
        Err(e) => store_failure("Add test participant", e),
    }
}

/// POST /api/v1/admin/test-participant-with-like?sex=false&toId=masha
async fn add_test_participant_with_like(
    state: web::Data<AppState>,
    query: web::Query<TestParticipantWithLikeQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    match state
        .maintenance
        .add_test_participant_with_like(query.sex, &query.to_id)
        .await
    {
        Ok(()) => {
            tracing::info!("Test participant with like added for {}", query.to_id);
            HttpResponse::Ok().json(MaintenanceResponse { success: true, affected: 2 })
        }
        Err(e) => store_failure("Add test participant with like", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::configure_routes;
    use crate::services::{MemoryStore, ProfileStore};
    use actix_web::{test, App};

    fn app_state(store: &Arc<MemoryStore>) -> AppState {
        AppState {
            maintenance: Arc::new(Maintenance::new(store.clone(), store.clone())),
        }
    }

    #[actix_web::test]
    async fn test_health_check_response() {
        let store = Arc::new(MemoryStore::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(&store)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let response: HealthResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response.status, "healthy");
    }

    #[actix_web::test]
    async fn test_seed_then_reset() {
        let store = Arc::new(MemoryStore::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(&store)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/admin/test-participant-with-like?sex=false&toId=masha")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert!(store.get_by_id("TestId").await.is_ok());
        assert_eq!(store.evaluation_count().await, 1);

        // Same fixed id again conflicts
        let req = test::TestRequest::post()
            .uri("/api/v1/admin/test-participant?sex=false")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 409);

        let req = test::TestRequest::post().uri("/api/v1/admin/delete-all").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(store.participant_count().await, 0);
        assert_eq!(store.evaluation_count().await, 0);
    }

    #[actix_web::test]
    async fn test_empty_target_rejected() {
        let store = Arc::new(MemoryStore::new());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(&store)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/admin/test-participant-with-like?sex=true&toId=")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
        assert_eq!(store.participant_count().await, 0);
    }
}
