use std::collections::BTreeMap;

use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use log::{error, info};
use shared::{
    ApiInfoResponse, BatchItemResult, BatchResponse, HealthResponse, Label, ModelInfoResponse,
    PredictMetadata, PredictResponse, PredictionResult, round_to,
};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::model::MODEL_INPUT_SIZE;
use crate::model::classifier::Classifier;
use crate::model::preprocess;
use crate::upload::{self, ALLOWED_EXTENSIONS, MAX_BATCH_FILES, UploadedImage, ValidationError};

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    cfg.service(web::resource("/").route(web::get().to(api_info)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/model/info").route(web::get().to(model_info)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/predict/batch").route(web::post().to(predict_batch)))
        .service(Files::new("/static", frontend_dir).index_file("index.html"));
}

async fn api_info() -> HttpResponse {
    let mut endpoints = BTreeMap::new();
    endpoints.insert("predict".to_string(), "/predict (POST)".to_string());
    endpoints.insert(
        "predict_batch".to_string(),
        "/predict/batch (POST)".to_string(),
    );
    endpoints.insert("health".to_string(), "/health (GET)".to_string());
    endpoints.insert("model_info".to_string(), "/model/info (GET)".to_string());

    HttpResponse::Ok().json(ApiInfoResponse {
        message: "Cat vs Dog Classifier API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "active".to_string(),
        endpoints,
    })
}

/// The classifier is loaded before the server binds, so a serving process
/// always reports the model as loaded; `model_exists` still probes the disk
/// in case the artifact was removed underneath a running instance.
async fn health(config: web::Data<AppConfig>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: true,
        model_path: config.model_path.display().to_string(),
        model_exists: config.model_path.exists(),
    })
}

async fn model_info(config: web::Data<AppConfig>) -> Result<HttpResponse, ApiError> {
    let size_bytes = std::fs::metadata(&config.model_path)?.len();

    Ok(HttpResponse::Ok().json(ModelInfoResponse {
        model_name: "Dogs vs Cats CNN Classifier".to_string(),
        model_type: "Convolutional Neural Network".to_string(),
        input_shape: (MODEL_INPUT_SIZE.0, MODEL_INPUT_SIZE.1, 3),
        output_classes: vec![Label::Cat, Label::Dog],
        model_size_mb: round_to(size_bytes as f64 / (1024.0 * 1024.0), 2),
        framework: "TorchScript".to_string(),
        training_accuracy: "~92%".to_string(),
        supported_formats: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
    }))
}

async fn predict(
    classifier: web::Data<Classifier>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = upload::single_upload(payload, "file").await?;
    info!(
        "Received upload {} ({})",
        upload.filename,
        upload.content_type.as_deref().unwrap_or("unknown type")
    );
    upload.validate()?;

    let response = run_prediction(&classifier, &upload)?;
    info!(
        "Prediction: {} ({}%)",
        response.prediction, response.confidence_percentage
    );

    Ok(HttpResponse::Ok().json(response))
}

/// Unlike `predict`, a bad file here only fails its own entry; the batch cap
/// is the one whole-request rejection, checked before any inference runs.
async fn predict_batch(
    classifier: web::Data<Classifier>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let uploads = upload::collect_uploads(payload, "files").await?;

    if uploads.len() > MAX_BATCH_FILES {
        return Err(ValidationError::TooManyFiles {
            count: uploads.len(),
        }
        .into());
    }

    let mut results = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        let item = match process_batch_item(&classifier, upload) {
            Ok(item) => item,
            Err(e) => {
                error!("Batch item {} failed: {}", upload.filename, e);
                BatchItemResult::failed(upload.filename.clone(), e.to_string())
            }
        };
        results.push(item);
    }

    Ok(HttpResponse::Ok().json(BatchResponse {
        success: true,
        total_images: uploads.len(),
        results,
    }))
}

fn run_prediction(
    classifier: &Classifier,
    upload: &UploadedImage,
) -> Result<PredictResponse, ApiError> {
    let decoded = preprocess::decode(&upload.bytes)?;
    let tensor = preprocess::preprocess(&decoded, classifier.input_size());
    let score = classifier.predict(&tensor)?;
    let result = PredictionResult::from_score(score as f64);

    Ok(PredictResponse {
        success: true,
        filename: upload.filename.clone(),
        prediction: result.label,
        confidence_percentage: result.confidence_percentage,
        raw_score: result.raw_score,
        probabilities: result.probabilities,
        metadata: PredictMetadata {
            image_size: (decoded.width, decoded.height),
            image_mode: decoded.mode.to_string(),
            model_input_size: classifier.input_size(),
        },
    })
}

fn process_batch_item(
    classifier: &Classifier,
    upload: &UploadedImage,
) -> Result<BatchItemResult, ApiError> {
    upload.validate()?;
    let decoded = preprocess::decode(&upload.bytes)?;
    let tensor = preprocess::preprocess(&decoded, classifier.input_size());
    let score = classifier.predict(&tensor)?;
    let result = PredictionResult::from_score(score as f64);

    Ok(BatchItemResult::succeeded(upload.filename.clone(), &result))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};

    use super::*;

    #[actix_web::test]
    async fn api_info_lists_endpoints() {
        let app = test::init_service(
            App::new().service(web::resource("/").route(web::get().to(api_info))),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "active");
        assert_eq!(body["endpoints"]["predict"], "/predict (POST)");
        assert_eq!(body["endpoints"]["health"], "/health (GET)");
    }

    #[actix_web::test]
    async fn health_reports_missing_artifact() {
        let config = AppConfig {
            model_path: "/nonexistent/model.pt".into(),
            model_remote_url: String::new(),
            port: "8000".to_string(),
            frontend_dir: String::new(),
        };
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .service(web::resource("/health").route(web::get().to(health))),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["model_exists"], false);
        assert_eq!(body["model_path"], "/nonexistent/model.pt");
    }

    #[::core::prelude::v1::test]
    fn failed_batch_item_keeps_filename_and_reason() {
        let reason = ValidationError::UnsupportedExtension {
            filename: "anim.gif".to_string(),
        };
        let item = BatchItemResult::failed("anim.gif".to_string(), reason.to_string());

        assert!(!item.success);
        assert_eq!(item.filename, "anim.gif");
        assert!(item.prediction.is_none());
        assert!(item.error.unwrap().contains("Invalid file type"));
    }
}
