use gloo_file::File as GlooFile;
use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use shared::{BatchResponse, ErrorBody, HealthResponse, ModelInfoResponse, PredictResponse};

/// Pull the server's `detail` message out of a failed response, falling back
/// to the status code when the body is not the usual error shape.
async fn error_detail(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) => format!("Server error: {status}"),
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    if !response.ok() {
        return Err(error_detail(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| format!("Failed to parse response: {e}"))
}

fn multipart_form(field: &str, files: &[GlooFile]) -> Result<web_sys::FormData, String> {
    let form = web_sys::FormData::new().map_err(|_| "Failed to build form data".to_string())?;
    for file in files {
        form.append_with_blob_and_filename(field, file.as_ref(), &file.name())
            .map_err(|_| "Failed to attach file".to_string())?;
    }
    Ok(form)
}

pub async fn predict(file: &GlooFile) -> Result<PredictResponse, String> {
    let form = multipart_form("file", std::slice::from_ref(file))?;
    let response = Request::post("/predict")
        .body(form)
        .map_err(|e| format!("Failed to build request: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    parse(response).await
}

pub async fn predict_batch(files: &[GlooFile]) -> Result<BatchResponse, String> {
    let form = multipart_form("files", files)?;
    let response = Request::post("/predict/batch")
        .body(form)
        .map_err(|e| format!("Failed to build request: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    parse(response).await
}

pub async fn health() -> Result<HealthResponse, String> {
    let response = Request::get("/health")
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    parse(response).await
}

pub async fn model_info() -> Result<ModelInfoResponse, String> {
    let response = Request::get("/model/info")
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    parse(response).await
}
