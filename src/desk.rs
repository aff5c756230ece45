//! What the UI calls: each method is one user action, gated and fenced.

use crate::client::{ExtractorClient, FilePart, HttpTransport, Transport};
use crate::config::AppConfig;
use crate::error::{DeskError, Result, UploadRejection};
use crate::excel;
use crate::export;
use crate::gate::{self, FileCandidate};
use crate::listing::{self, BatchView, HistoryRow};
use crate::render::ViewModel;
use crate::session::{CurrentDocument, Operation, Session};
use crate::types::{DocumentType, ExportFormat};
use crate::validation::{self, AcknowledgeReport, ValidationPanel};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Snapshot of the loaded document handed to a UI binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: i64,
    pub document_type: DocumentType,
    pub view: ViewModel,
    pub category: Option<String>,
    pub validation: ValidationPanel,
}

impl From<&CurrentDocument> for DocumentView {
    fn from(doc: &CurrentDocument) -> Self {
        Self {
            id: doc.id,
            document_type: doc.document_type,
            view: doc.view.clone(),
            category: doc.category.clone(),
            validation: doc.validation.clone(),
        }
    }
}

/// Result of an action whose response may have been overtaken by a newer one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "lowercase")]
pub enum Fenced<T> {
    Applied(T),
    Stale,
}

impl<T> Fenced<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Fenced::Applied(v) => Some(v),
            Fenced::Stale => None,
        }
    }

    /// For callers that need the value: a stale outcome becomes [`DeskError::Superseded`].
    pub fn into_result(self) -> Result<T> {
        self.applied().ok_or(DeskError::Superseded)
    }
}

pub struct Desk<T: Transport = HttpTransport> {
    client: ExtractorClient<T>,
    session: Mutex<Session>,
    download_dir: Option<PathBuf>,
}

impl Desk<HttpTransport> {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.api_url, config.request_timeout)
            .map_err(DeskError::transfer("Could not start HTTP client"))?;
        let download_dir = config.resolve_download_dir().ok();
        Ok(Self::new(transport, download_dir))
    }
}

fn read_part(file: &FileCandidate) -> Result<FilePart> {
    let bytes = fs::read(&file.path).map_err(|e| UploadRejection::Unreadable {
        name: file.name.clone(),
        reason: e.to_string(),
    })?;
    Ok(FilePart {
        field: "file",
        filename: file.name.clone(),
        mime: file.mime.clone(),
        bytes,
    })
}

impl<T: Transport> Desk<T> {
    pub fn new(transport: T, download_dir: Option<PathBuf>) -> Self {
        Self {
            client: ExtractorClient::new(transport),
            session: Mutex::new(Session::new()),
            download_dir,
        }
    }

    pub fn client(&self) -> &ExtractorClient<T> {
        &self.client
    }

    /// A poisoned lock only means another action panicked mid-update; the state is still usable.
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current_document(&self) -> Option<DocumentView> {
        self.session().document().map(DocumentView::from)
    }

    pub fn current_batch_id(&self) -> Option<String> {
        self.session().batch_id().map(String::from)
    }

    /// Gate, upload, render, then load the validation panel for the new document.
    pub fn upload_file(&self, path: &Path) -> Result<Fenced<DocumentView>> {
        self.upload_file_with(path, || {})
    }

    /// [`Desk::upload_file`], calling `on_uploaded` once the backend has accepted the file
    /// and before the result is applied.
    pub fn upload_file_with(
        &self,
        path: &Path,
        on_uploaded: impl FnOnce(),
    ) -> Result<Fenced<DocumentView>> {
        let candidate = FileCandidate::from_path(path)?;
        gate::check_single(&candidate)?;
        let part = read_part(&candidate)?;

        let ticket = self.session().begin(Operation::Document);
        let response = self
            .client
            .upload(part)
            .map_err(DeskError::transfer("Upload failed"))?;
        tracing::info!(id = response.id, file = %candidate.name, "document uploaded");
        on_uploaded();

        {
            let mut session = self.session();
            if session
                .apply_document(&ticket, response.id, response.document_type, response.results)
                .is_none()
            {
                tracing::warn!(id = response.id, "upload response superseded, ignoring");
                return Ok(Fenced::Stale);
            }
        }
        self.refresh_validation(response.id);
        Ok(self.snapshot(response.id))
    }

    /// Reload a document listed in history.
    pub fn open_document(&self, document_id: i64) -> Result<Fenced<DocumentView>> {
        let ticket = self.session().begin(Operation::Document);
        let results = self
            .client
            .results(document_id)
            .map_err(DeskError::transfer("Failed to load document"))?;
        {
            let mut session = self.session();
            if session
                .apply_document(&ticket, document_id, None, results)
                .is_none()
            {
                tracing::warn!(id = document_id, "document response superseded, ignoring");
                return Ok(Fenced::Stale);
            }
        }
        self.refresh_validation(document_id);
        Ok(self.snapshot(document_id))
    }

    fn snapshot(&self, document_id: i64) -> Fenced<DocumentView> {
        match self.session().document().filter(|d| d.id == document_id) {
            Some(doc) => Fenced::Applied(DocumentView::from(doc)),
            None => Fenced::Stale,
        }
    }

    /// Fetch the summary and update the panel. Failures hide the panel instead of erroring.
    pub fn refresh_validation(&self, document_id: i64) -> ValidationPanel {
        let ticket = self.session().begin(Operation::Validation);
        let panel = match self.client.validation_summary(document_id) {
            Ok(summary) => ValidationPanel::from_summary(&summary),
            Err(e) => {
                tracing::warn!(id = document_id, error = %e, "validation summary unavailable");
                ValidationPanel::hidden()
            }
        };
        if self
            .session()
            .apply_validation(&ticket, document_id, panel.clone())
            .is_none()
        {
            tracing::debug!(id = document_id, "validation response not applied");
        }
        panel
    }

    /// Acknowledge every pending warning of the current document, one request at a time.
    pub fn acknowledge_all_warnings(&self) -> Result<AcknowledgeReport> {
        let document_id = self.session().document_id().ok_or(DeskError::NoDocument)?;
        let issues = self
            .client
            .validation_issues(document_id)
            .map_err(DeskError::transfer("Failed to load validation issues"))?;

        let mut report = AcknowledgeReport::default();
        for issue in validation::pending_warnings(&issues) {
            let outcome = self.client.acknowledge_issue(issue.id).map(|_| ());
            if let Err(e) = &outcome {
                tracing::warn!(issue = issue.id, error = %e, "acknowledge failed");
            }
            report.record(issue.id, outcome);
        }
        self.refresh_validation(document_id);
        Ok(report)
    }

    pub fn upload_batch(&self, paths: &[PathBuf]) -> Result<Fenced<BatchView>> {
        let candidates = paths
            .iter()
            .map(|p| FileCandidate::from_path(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        gate::check_batch(&candidates)?;
        let parts = candidates
            .iter()
            .map(read_part)
            .collect::<Result<Vec<_>>>()?;

        let ticket = self.session().begin(Operation::Batch);
        let response = self
            .client
            .upload_batch(parts)
            .map_err(DeskError::transfer("Batch upload failed"))?;
        tracing::info!(batch = %response.batch_id, files = candidates.len(), "batch uploaded");

        if !self.session().apply_batch(&ticket, &response.batch_id) {
            tracing::warn!(batch = %response.batch_id, "batch response superseded, ignoring");
            return Ok(Fenced::Stale);
        }
        self.load_batch(&response.batch_id)
    }

    pub fn load_batch(&self, batch_id: &str) -> Result<Fenced<BatchView>> {
        let ticket = self.session().begin(Operation::Batch);
        let results = self
            .client
            .batch_results(batch_id)
            .map_err(DeskError::transfer("Failed to fetch batch results"))?;
        if !self.session().apply_batch(&ticket, batch_id) {
            return Ok(Fenced::Stale);
        }
        Ok(Fenced::Applied(listing::batch_view(batch_id, &results)))
    }

    pub fn history(&self) -> Result<Fenced<Vec<HistoryRow>>> {
        let ticket = self.session().begin(Operation::History);
        let entries = self
            .client
            .history()
            .map_err(DeskError::transfer("Failed to load history"))?;
        if !self.session().is_current(&ticket) {
            return Ok(Fenced::Stale);
        }
        Ok(Fenced::Applied(listing::history_rows(&entries)))
    }

    fn target_dir(&self, dir: Option<&Path>) -> Result<PathBuf> {
        match dir.map(Path::to_path_buf).or_else(|| self.download_dir.clone()) {
            Some(d) => Ok(d),
            None => AppConfig::default().resolve_download_dir(),
        }
    }

    pub fn export_document(&self, format: ExportFormat, dir: Option<&Path>) -> Result<PathBuf> {
        let document_id = self.session().document_id().ok_or(DeskError::NoDocument)?;
        let payload = self
            .client
            .export(document_id, format)
            .map_err(DeskError::transfer("Export failed"))?;
        export::save_export(
            &self.target_dir(dir)?,
            &export::document_stem(document_id),
            format,
            &payload,
        )
    }

    pub fn export_batch(&self, format: ExportFormat, dir: Option<&Path>) -> Result<PathBuf> {
        let batch_id = self.current_batch_id().ok_or(DeskError::NoBatch)?;
        let payload = self
            .client
            .export_batch(&batch_id, format)
            .map_err(DeskError::transfer("Batch export failed"))?;
        export::save_export(
            &self.target_dir(dir)?,
            &export::batch_stem(&batch_id),
            format,
            &payload,
        )
    }

    /// Save the rendered document as a local workbook (no request).
    pub fn export_workbook(&self, path: Option<&Path>) -> Result<PathBuf> {
        let (id, view) = {
            let session = self.session();
            let doc = session.document().ok_or(DeskError::NoDocument)?;
            (doc.id, doc.view.clone())
        };
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => excel::default_workbook_path(&self.target_dir(None)?, id),
        };
        excel::export_view_to_excel(&view, &path)
    }

    pub fn edit_field(&self, field: &str, value: Value) -> Result<()> {
        if self.session().edit_field(field, value) {
            Ok(())
        } else {
            Err(DeskError::NoDocument)
        }
    }

    pub fn set_category(&self, category: Option<String>) -> Result<()> {
        if self.session().set_category(category) {
            Ok(())
        } else {
            Err(DeskError::NoDocument)
        }
    }

    pub fn save_corrections(&self) -> Result<Value> {
        let (document_id, body) = {
            let session = self.session();
            let doc = session.document().ok_or(DeskError::NoDocument)?;
            (doc.id, doc.corrections())
        };
        let ack = self
            .client
            .save_corrections(document_id, body)
            .map_err(DeskError::transfer("Failed to save corrections"))?;
        tracing::info!(id = document_id, "corrections saved");
        Ok(ack)
    }
}
