use actix_files::Files;
use actix_multipart::{Field, Multipart};
use actix_web::{web, Error, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use rand::seq::IndexedRandom;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use shared::{
    DiseaseClass, ExpertHelpRequest, ExpertHelpResponse, FunFactResponse, HealthResponse,
    PredictionResponse, TopPrediction,
};

use crate::advice::AdviceTable;
use crate::config::Config;
use crate::inference::model::{Classifier, InferenceError};
use crate::inference::selector::{self, SelectionError};

const ALLOWED_MIME_TYPES: [&str; 2] = ["image/jpeg", "image/png"];
const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

const FUN_FACTS: [&str; 5] = [
    "Tomatoes are botanically berries, and a US court still ruled them a vegetable in 1893.",
    "There are over 10,000 cultivated tomato varieties worldwide.",
    "Tomato leaves can show disease symptoms days before the fruit does.",
    "The heaviest tomato on record weighed over 4.8 kilograms.",
    "Tomatoes were once feared poisonous in Europe because their acidic juice leached lead from pewter plates.",
];

const EXPERT_HELP_ACK: &str =
    "Thank you for reaching out. One of our plant health experts will get back to you shortly.";

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("no image file found in the upload")]
    MissingImage,
    #[error("unsupported file format '{0}'; upload a .jpg, .jpeg or .png image")]
    UnsupportedFormat(String),
    #[error("uploaded file exceeds the {0} byte limit")]
    TooLarge(usize),
    #[error("failed to read upload: {0}")]
    Read(String),
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: String) {
    cfg.service(web::resource("/api/inference").route(web::post().to(handle_inference)))
        .service(web::resource("/api/health").route(web::get().to(health)))
        .service(web::resource("/api/classes").route(web::get().to(list_classes)))
        .service(web::resource("/api/advice/{class_name}").route(web::get().to(get_advice)))
        .service(web::resource("/api/fun-fact").route(web::get().to(fun_fact)))
        .service(web::resource("/api/expert-help").route(web::post().to(expert_help)))
        .service(Files::new("/static", static_dir));
}

async fn handle_inference(
    model: web::Data<Classifier>,
    advice: web::Data<AdviceTable>,
    config: web::Data<Config>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();

    let image_data = match read_image_field(&mut payload, config.max_upload_bytes).await {
        Ok(data) => data,
        Err(e) => {
            warn!("[{}] rejected upload: {}", request_id, e);
            return Ok(upload_error_response(&e));
        }
    };

    info!(
        "[{}] received image upload ({} bytes)",
        request_id,
        image_data.len()
    );

    // The libtorch call is CPU-bound; run it on the blocking pool and cap it
    // with the configured timeout.
    let classifier = model.get_ref().clone();
    let timeout = config.inference_timeout;
    let infer = web::block(move || classifier.infer(&image_data));
    let scores = match tokio::time::timeout(timeout, infer).await {
        Err(_) => {
            let e = InferenceError::Timeout(timeout.as_secs());
            return Ok(inference_error_response(request_id, &e));
        }
        Ok(Err(e)) => {
            error!("[{}] inference task failed: {}", request_id, e);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "inference task failed".to_string(),
            }));
        }
        Ok(Ok(Err(e))) => return Ok(inference_error_response(request_id, &e)),
        Ok(Ok(Ok(scores))) => scores,
    };

    match build_prediction(request_id, scores, &advice) {
        Ok(response) => {
            info!(
                "[{}] predicted {} at {:.2}%",
                request_id, response.predicted_class, response.confidence
            );
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            error!("[{}] result selection failed: {}", request_id, e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            }))
        }
    }
}

/// Turns a score vector into the wire response: top-1 class, top-3 shares
/// for the pie chart, and the advice text for the predicted class.
fn build_prediction(
    request_id: Uuid,
    scores: Vec<f32>,
    advice: &AdviceTable,
) -> Result<PredictionResponse, SelectionError> {
    let class_names = DiseaseClass::names();
    let selection = selector::select(&scores, &class_names)?;
    let advice_entry = advice.lookup(&selection.top_class).clone();

    Ok(PredictionResponse {
        request_id: request_id.to_string(),
        predicted_class: selection.top_class,
        confidence: selection.top_confidence,
        top_predictions: selection
            .top3
            .into_iter()
            .map(|(class_name, confidence)| TopPrediction {
                class_name,
                confidence,
            })
            .collect(),
        scores,
        advice: advice_entry,
    })
}

async fn read_image_field(
    payload: &mut Multipart,
    max_bytes: usize,
) -> Result<Vec<u8>, UploadError> {
    while let Ok(Some(mut field)) = payload.try_next().await {
        validate_image_field(&field)?;

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| UploadError::Read(e.to_string()))?;
            if image_data.len() + data.len() > max_bytes {
                return Err(UploadError::TooLarge(max_bytes));
            }
            image_data.extend_from_slice(&data);
        }
        if !image_data.is_empty() {
            return Ok(image_data);
        }
    }
    Err(UploadError::MissingImage)
}

fn validate_image_field(field: &Field) -> Result<(), UploadError> {
    if let Some(mime) = field.content_type() {
        if ALLOWED_MIME_TYPES.contains(&mime.essence_str()) {
            return Ok(());
        }
    }

    let filename = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .unwrap_or_default();
    if has_allowed_extension(filename) {
        return Ok(());
    }
    Err(UploadError::UnsupportedFormat(filename.to_string()))
}

fn has_allowed_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn upload_error_response(err: &UploadError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    match err {
        UploadError::TooLarge(_) => HttpResponse::PayloadTooLarge().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

fn inference_error_response(request_id: Uuid, err: &InferenceError) -> HttpResponse {
    error!("[{}] inference failed: {}", request_id, err);
    let body = ErrorResponse {
        error: err.to_string(),
    };
    match err {
        InferenceError::ModelUnavailable(_) => HttpResponse::ServiceUnavailable().json(body),
        InferenceError::Preprocess(_) => HttpResponse::BadRequest().json(body),
        InferenceError::Timeout(_) => HttpResponse::GatewayTimeout().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

async fn health(model: web::Data<Classifier>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: model.is_ready(),
        model_error: model.load_error().map(String::from),
    })
}

async fn list_classes() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "classes": DiseaseClass::names() }))
}

async fn get_advice(advice: web::Data<AdviceTable>, path: web::Path<String>) -> HttpResponse {
    let class_name = path.into_inner();
    HttpResponse::Ok().json(json!({
        "class_name": class_name,
        "advice": advice.lookup(&class_name),
    }))
}

async fn fun_fact() -> HttpResponse {
    let fact = FUN_FACTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(FUN_FACTS[0]);
    HttpResponse::Ok().json(FunFactResponse {
        fact: fact.to_string(),
    })
}

// The contact form is informational only; nothing is stored or forwarded.
async fn expert_help(request: web::Json<ExpertHelpRequest>) -> HttpResponse {
    info!(
        "expert help request from {} <{}>",
        request.name, request.email
    );
    HttpResponse::Ok().json(ExpertHelpResponse {
        message: EXPERT_HELP_ACK.to_string(),
    })
}
