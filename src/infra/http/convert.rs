use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use reqwest::Body;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::application::ports::{
    ConversionRequest, ConversionTransport, ProgressSink, TransportError, TransportResponse,
};
use crate::domain::files::{FileSlot, SelectedFile};

use super::{ApiClient, CONVERT_PATH};

/// Upload granularity for progress reporting.
pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

const FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// Posts `multipart/form-data` to `/api/convert`.
#[derive(Clone, Debug)]
pub struct HttpConversionTransport {
    api: ApiClient,
}

impl HttpConversionTransport {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ConversionTransport for HttpConversionTransport {
    async fn convert(
        &self,
        request: ConversionRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, TransportError> {
        let url = self
            .api
            .url(CONVERT_PATH)
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let form = build_form(&request, &progress)?;
        debug!(%url, payload_bytes = request.payload_len(), "posting conversion request");

        let resp = self
            .api
            .client()
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                if err.is_builder() {
                    TransportError::Request(err.to_string())
                } else {
                    TransportError::Network(err.to_string())
                }
            })?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await.map_err(|err| TransportError::Body {
            status,
            message: err.to_string(),
        })?;
        debug!(status, body_bytes = body.len(), "conversion response received");

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

fn build_form(
    request: &ConversionRequest,
    progress: &ProgressSink,
) -> Result<Form, TransportError> {
    let total = request.payload_len();
    let sent = Arc::new(AtomicU64::new(0));
    progress.report(0, total);

    let mut form = Form::new();
    for slot in FileSlot::ALL {
        let part = file_part(request.file(slot), progress, &sent, total)?;
        form = form.part(slot.form_field(), part);
    }
    for (name, value) in request.text_fields() {
        form = form.text(name, value);
    }
    Ok(form)
}

fn file_part(
    file: &SelectedFile,
    progress: &ProgressSink,
    sent: &Arc<AtomicU64>,
    total: u64,
) -> Result<Part, TransportError> {
    let body = Body::wrap_stream(counted_chunks(
        file.data().clone(),
        progress.clone(),
        Arc::clone(sent),
        total,
    ));
    Part::stream_with_length(body, file.len())
        .file_name(file.name().to_string())
        .mime_str(FILE_CONTENT_TYPE)
        .map_err(|err| TransportError::Request(err.to_string()))
}

/// Split `data` into chunks, reporting cumulative bytes as each one is handed
/// to the connection.
fn counted_chunks(
    data: Bytes,
    progress: ProgressSink,
    sent: Arc<AtomicU64>,
    total: u64,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let len = data.len();
    let offsets = (0..len).step_by(UPLOAD_CHUNK_BYTES);
    stream::iter(offsets.map(move |start| {
        let end = (start + UPLOAD_CHUNK_BYTES).min(len);
        let chunk = data.slice(start..end);
        let so_far = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
        progress.report(so_far, total);
        Ok(chunk)
    }))
}
