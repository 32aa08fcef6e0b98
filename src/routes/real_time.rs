use actix_web::{post, web, HttpResponse};
use serde_json::json;

use crate::models::detector::Detector;

#[post("/api/real-time")]
pub async fn trigger_detector(detector: web::Data<dyn Detector>) -> HttpResponse {
    match detector.run().await {
        Ok(outcome) if outcome.success => {
            tracing::info!(exit_code = ?outcome.exit_code, "detector run finished");
            HttpResponse::Ok().json(json!({
                "message": "Script ran successfully",
                "output": outcome.stdout,
                "success": true,
                "exit_code": outcome.exit_code,
            }))
        }
        Ok(outcome) => {
            tracing::error!(
                exit_code = ?outcome.exit_code,
                stderr = %outcome.stderr,
                "detector run failed"
            );
            HttpResponse::BadGateway().json(json!({
                "message": "Script failed",
                "output": outcome.stdout,
                "success": false,
                "exit_code": outcome.exit_code,
            }))
        }
        Err(error) => {
            tracing::error!(%error, "detector could not be started");
            HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to start script" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{AppError, AppResult},
        models::detector::DetectorOutcome,
    };
    use actix_web::{http::StatusCode, test, App};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubDetector(Option<DetectorOutcome>);

    #[async_trait]
    impl Detector for StubDetector {
        async fn run(&self) -> AppResult<DetectorOutcome> {
            self.0
                .clone()
                .ok_or_else(|| AppError::Detector("python: not found".to_string()))
        }
    }

    async fn call(stub: StubDetector) -> (StatusCode, serde_json::Value) {
        let detector: Arc<dyn Detector> = Arc::new(stub);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(detector))
                .service(trigger_detector),
        )
        .await;
        let req = test::TestRequest::post().uri("/api/real-time").to_request();
        let res = test::call_service(&app, req).await;
        let status = res.status();
        (status, test::read_body_json(res).await)
    }

    fn outcome(success: bool, exit_code: i32) -> DetectorOutcome {
        DetectorOutcome {
            success,
            exit_code: Some(exit_code),
            stdout: "saved 2 images\n".to_string(),
            stderr: String::new(),
        }
    }

    #[actix_web::test]
    async fn clean_run_returns_stdout() {
        let (status, body) = call(StubDetector(Some(outcome(true, 0)))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], "saved 2 images\n");
        assert_eq!(body["success"], true);
        assert_eq!(body["exit_code"], 0);
    }

    #[actix_web::test]
    async fn failed_run_is_not_reported_as_success() {
        let (status, body) = call(StubDetector(Some(outcome(false, 1)))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);
        assert_eq!(body["exit_code"], 1);
    }

    #[actix_web::test]
    async fn unstartable_detector_is_a_server_error() {
        let (status, body) = call(StubDetector(None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to start script");
    }
}
