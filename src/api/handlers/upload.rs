use crate::AppState;
use crate::api::error::AppError;
use crate::models::{CompressionQuality, ReportLine, UploadForm, UploadedFile};
use crate::services::answer::AnswerRequest;
use crate::services::normalizer::PdfNormalizer;
use crate::services::receiver::FileReceiver;
use crate::services::reporter::render_report;
use axum::extract::{Multipart, State, multipart::MultipartError};
use futures::TryStreamExt;
use std::path::PathBuf;
use tokio_util::io::StreamReader;
use tracing::{error, info};
use utoipa::ToSchema;

pub const NO_FILES_UPLOADED: &str = "No files uploaded";

const LENGTH_LIMIT_EXCEEDED: &str = "length limit exceeded";

/// Multipart form accepted by `/uploadgpt`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadGptForm {
    /// Any part carrying a filename is stored; repeat for several files.
    #[schema(format = Binary)]
    pub file: String,
    /// Clamped to 0.1..=1.0, defaults to 0.5
    pub quality: Option<f32>,
    /// Replaces the default prompt when not blank
    pub question: Option<String>,
}

fn payload_too_large() -> AppError {
    AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
}

/// The body limit error sits a few levels down the source chain.
fn hit_length_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.to_string().contains(LENGTH_LIMIT_EXCEEDED) {
            return true;
        }
        current = e.source();
    }
    false
}

fn multipart_error(e: MultipartError) -> AppError {
    if hit_length_limit(&e) {
        payload_too_large()
    } else {
        AppError::BadRequest(e.to_string())
    }
}

/// Reads every part before anything is processed, so `quality` and `question`
/// apply no matter where they appear in the form.
async fn collect_form(
    receiver: &FileReceiver,
    multipart: &mut Multipart,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let reader = StreamReader::new(field.map_err(std::io::Error::other));
            match receiver.store(Some(&file_name), reader).await {
                Ok(file) => form.files.push(file),
                Err(e) => {
                    if e.chain().any(hit_length_limit) {
                        return Err(payload_too_large());
                    }
                    let reason = format!("{:#}", e);
                    error!("Failed to save {}: {}", file_name, reason);
                    form.rejected
                        .push(ReportLine::failed(file_name, format!("Save failed - {}", reason)));
                }
            }
            continue;
        }

        match name.as_str() {
            "quality" => {
                let text = field.text().await.map_err(multipart_error)?;
                form.quality = CompressionQuality::parse(&text);
            }
            "question" => {
                let text = field.text().await.map_err(multipart_error)?;
                info!("❓ Received question: {}", text);
                form.question = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Normalizes every PDF upload. A failure only marks that file's line.
///
/// Also returns the normalized path of the first upload when it is a PDF.
async fn normalize_pdfs(
    receiver: &FileReceiver,
    files: &[UploadedFile],
    quality: CompressionQuality,
) -> (Vec<ReportLine>, Option<PathBuf>) {
    let mut lines = Vec::new();
    let mut selected = None;

    for (index, file) in files.iter().enumerate() {
        if !file.is_pdf() {
            continue;
        }

        let output = receiver.compressed_path_for(file);
        match PdfNormalizer::normalize(file.stored_path.clone(), output, quality).await {
            Ok(outcome) => {
                if index == 0 {
                    selected = outcome.usable_path().cloned();
                }
                lines.push(ReportLine::outcome(&file.original_name, outcome));
            }
            Err(e) => {
                error!("Compression failed for {}: {:#}", file.original_name, e);
                lines.push(ReportLine::failed(
                    &file.original_name,
                    format!("Compression failed - {:#}", e),
                ));
            }
        }
    }

    (lines, selected)
}

#[utoipa::path(
    post,
    path = "/uploadgpt",
    request_body(content = UploadGptForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "AI answer followed by compression results", body = String, content_type = "text/plain"),
        (status = 400, description = "No files uploaded"),
        (status = 413, description = "Request body too large"),
        (status = 502, description = "AI service failed")
    ),
    tag = "uploadgpt"
)]
pub async fn upload_gpt(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, AppError> {
    state.receiver.ensure_dirs().await?;

    let UploadForm {
        files,
        quality,
        question,
        rejected,
    } = collect_form(&state.receiver, &mut multipart).await?;
    info!(
        "📦 Received {} file(s), quality {}",
        files.len(),
        quality.value()
    );

    let Some(first) = files.first() else {
        return Err(AppError::BadRequest(NO_FILES_UPLOADED.to_string()));
    };

    let mut lines = rejected;
    let (normalized, selected) = normalize_pdfs(&state.receiver, &files, quality).await;
    lines.extend(normalized);

    let selected = selected.unwrap_or_else(|| first.stored_path.clone());
    let path = state.images.prepare(selected).await;

    let prompt = question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.default_prompt.clone());

    let answer = state
        .requester
        .ask(&AnswerRequest { path, prompt })
        .await?;

    Ok(render_report(&answer, &lines))
}
