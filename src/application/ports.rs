//! Traits describing the adapters the orchestrator depends on.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::files::{FileSlot, SelectedFile};
use crate::domain::flip::{FlipSettings, flag_literal};
use crate::domain::profiles::{ProfileCatalog, ProfileId};

/// Keys of the durable user preferences.
///
/// The string forms are the storage keys and stay stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    SelectedProfile,
    FlipHorizontal,
    FlipVertical,
}

impl PreferenceKey {
    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceKey::SelectedProfile => "selectedPrinter",
            PreferenceKey::FlipHorizontal => "flipX",
            PreferenceKey::FlipVertical => "flipY",
        }
    }
}

/// Durable key-value store for user choices.
///
/// Writes are best-effort: implementations log persistence failures and move on.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: PreferenceKey) -> Option<String>;
    fn set(&self, key: PreferenceKey, value: &str);
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("profile catalog request failed: {0}")]
    Network(String),
    #[error("profile catalog returned status {0}")]
    Status(u16),
    #[error("profile catalog body could not be decoded: {0}")]
    Decode(String),
}

/// Source of the available device profiles.
#[async_trait]
pub trait ProfileCatalogClient: Send + Sync {
    async fn fetch_all(&self) -> Result<ProfileCatalog, CatalogError>;
}

/// Everything one conversion upload carries.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub gerber: SelectedFile,
    pub drill: SelectedFile,
    pub profile_id: ProfileId,
    pub flips: FlipSettings,
}

impl ConversionRequest {
    pub fn file(&self, slot: FileSlot) -> &SelectedFile {
        match slot {
            FileSlot::Gerber => &self.gerber,
            FileSlot::Drill => &self.drill,
        }
    }

    /// Text fields of the multipart form, in wire order.
    pub fn text_fields(&self) -> [(&'static str, String); 3] {
        [
            ("printer_id", self.profile_id.as_str().to_string()),
            (
                "flip_horizontal",
                flag_literal(self.flips.horizontal).to_string(),
            ),
            ("flip_vertical", flag_literal(self.flips.vertical).to_string()),
        ]
    }

    /// Size of the file payload, used as the progress denominator.
    pub fn payload_len(&self) -> u64 {
        self.gerber.len() + self.drill.len()
    }
}

/// One transport progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Percentage rounded half-up and clamped to `0..=100`.
    ///
    /// Returns `None` when the total is unknown, in which case the
    /// notification carries no usable progress.
    pub fn percent(self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let sent = u128::from(self.sent);
        let total = u128::from(self.total);
        let rounded = (sent * 200 + total) / (total * 2);
        Some(u8::try_from(rounded.min(100)).unwrap_or(100))
    }
}

/// Sending half of the ordered progress stream of one attempt.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<UploadProgress>,
}

impl ProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UploadProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn report(&self, sent: u64, total: u64) {
        // The attempt may already be settled; late notifications are dropped.
        let _ = self.tx.send(UploadProgress { sent, total });
    }
}

/// A response that made it back from the conversion endpoint.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("no response received: {0}")]
    Network(String),
    /// The request could not be assembled, nothing was sent.
    #[error("request could not be built: {0}")]
    Request(String),
    /// A status line arrived but the body could not be read.
    #[error("response body unreadable (status {status}): {message}")]
    Body { status: u16, message: String },
}

/// Performs the multipart conversion upload.
#[async_trait]
pub trait ConversionTransport: Send + Sync {
    async fn convert(
        &self,
        request: ConversionRequest,
        progress: ProgressSink,
    ) -> Result<TransportResponse, TransportError>;
}
