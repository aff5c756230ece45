use serde::Serialize;
use thiserror::Error;

/// Client-side refusal raised before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("Please upload a PDF, PNG, or JPG file.")]
    UnsupportedType { name: String },
    #[error("File size exceeds 5MB limit.")]
    FileTooLarge { name: String, size: u64 },
    #[error("No files selected.")]
    EmptyBatch,
    #[error("Maximum 20 files allowed per batch.")]
    TooManyFiles { count: usize },
    #[error("Total batch size exceeds 50MB limit.")]
    BatchTooLarge { total: u64 },
    #[error("File {name} has an unsupported type. Only PDF, PNG, JPG, and ZIP files are allowed.")]
    UnsupportedBatchType { name: String },
    #[error("Could not read {name}: {reason}")]
    Unreadable { name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    NetworkError,
    HttpError,
    DecodeError,
    EncodeError,
}

/// Uniform failure of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("{0}")]
    Network(String),
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("Invalid response: {0}")]
    Decode(String),
    /// The request could not be built, so nothing was sent.
    #[error("Invalid request: {0}")]
    Encode(String),
}

impl TransferError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransferError::Network(_) => FailureKind::NetworkError,
            TransferError::Http { .. } => FailureKind::HttpError,
            TransferError::Decode(_) => FailureKind::DecodeError,
            TransferError::Encode(_) => FailureKind::EncodeError,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeskError {
    #[error(transparent)]
    Rejected(#[from] UploadRejection),

    #[error("{context}: {source}")]
    Transfer {
        context: &'static str,
        #[source]
        source: TransferError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No document loaded.")]
    NoDocument,

    #[error("No batch loaded.")]
    NoBatch,

    #[error("A newer request replaced this one.")]
    Superseded,
}

impl DeskError {
    pub fn transfer(context: &'static str) -> impl FnOnce(TransferError) -> DeskError {
        move |source| DeskError::Transfer { context, source }
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
