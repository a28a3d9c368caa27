//! HTTP surface for the engine.
//!
//! `GET /api/recommendations/{student_id}` returns the aggregated
//! recommendations wrapped in `{ "success": true, "recommendations": ... }`.

use actix_web::{web, App, HttpResponse, HttpServer};
use serde::Serialize;
use tracing::{error, info};

use crate::engine::{parse_student_id, RecommendationEngine};
use crate::error::RecommendationError;
use crate::models::RecommendationSet;

#[derive(Serialize)]
struct RecommendationResponse {
    success: bool,
    recommendations: RecommendationSet,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    error: String,
}

async fn get_recommendations(
    path: web::Path<String>,
    engine: web::Data<RecommendationEngine>,
) -> HttpResponse {
    let result = match parse_student_id(&path) {
        Ok(student_id) => engine.comprehensive_recommendations(student_id).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(recommendations) => HttpResponse::Ok().json(RecommendationResponse {
            success: true,
            recommendations,
        }),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &RecommendationError) -> HttpResponse {
    let body = |message: &str| ErrorResponse {
        success: false,
        message: message.to_string(),
        error: err.to_string(),
    };

    match err {
        RecommendationError::InvalidInput(_) => {
            HttpResponse::BadRequest().json(body("Student ID is required"))
        }
        _ if err.is_unknown_student() => HttpResponse::NotFound().json(body("Student not found")),
        RecommendationError::GenerationFailed { .. } => {
            error!(error = %err, "recommendation request failed");
            HttpResponse::InternalServerError().json(body("Error generating recommendations"))
        }
    }
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Recommendation engine is running")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).route(
        "/api/recommendations/{student_id}",
        web::get().to(get_recommendations),
    );
}

pub async fn serve(engine: RecommendationEngine, bind: &str) -> std::io::Result<()> {
    let engine = web::Data::new(engine);
    info!(%bind, "starting recommendation server");

    HttpServer::new(move || App::new().app_data(engine.clone()).configure(configure))
        .bind(bind)?
        .run()
        .await
}
