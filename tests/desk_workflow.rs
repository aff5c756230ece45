use invoice_extractor_lib::client::{ApiRequest, ApiResponse, Body, Method, Transport};
use invoice_extractor_lib::desk::{Desk, Fenced};
use invoice_extractor_lib::error::{DeskError, TransferError, UploadRejection};
use invoice_extractor_lib::render::DisplayRow;
use invoice_extractor_lib::types::ExportFormat;
use invoice_extractor_lib::validation::PanelState;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

/// Answers from a route table and remembers every request it saw.
#[derive(Default)]
struct Scripted {
    routes: HashMap<String, (u16, &'static str, Vec<u8>)>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl Scripted {
    fn json(mut self, path: &str, body: Value) -> Self {
        self.routes
            .insert(path.to_string(), (200, "OK", body.to_string().into_bytes()));
        self
    }

    fn raw(mut self, path: &str, status: u16, status_text: &'static str, body: &[u8]) -> Self {
        self.routes
            .insert(path.to_string(), (status, status_text, body.to_vec()));
        self
    }

    fn paths(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|r| r.path.clone()).collect()
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Transport for Scripted {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransferError> {
        let answer = self.routes.get(&request.path).cloned();
        self.seen.lock().unwrap().push(request);
        let (status, status_text, body) = answer.unwrap_or((404, "Not Found", b"{}".to_vec()));
        Ok(ApiResponse {
            status,
            status_text: status_text.to_string(),
            content_type: Some("application/json".into()),
            body,
        })
    }
}

fn receipt_results() -> Value {
    json!({
        "document_type": {"value": "receipt", "confidence": 0.97},
        "merchant_name": {"value": "Corner Shop", "confidence": 0.91},
        "total": {"value": 7, "confidence": 0.6},
        "line_items": {"value": [
            {"item_name": "Coffee", "quantity": 2, "unit_price": 3.5, "total_price": 7}
        ]}
    })
}

fn write_file(dir: &Path, name: &str, size: u64) -> PathBuf {
    let path = dir.join(name);
    let f = File::create(&path).unwrap();
    f.set_len(size).unwrap();
    path
}

fn field_value(view: &invoice_extractor_lib::render::ViewModel, key: &str) -> String {
    match view.field_row(key) {
        Some(DisplayRow::Field { value, .. }) => value.clone(),
        other => panic!("no field row for {}: {:?}", key, other),
    }
}

#[test]
fn oversized_single_file_is_refused_without_a_request() {
    let dir = tempfile::tempdir().unwrap();
    let big = write_file(dir.path(), "scan.pdf", 6 * 1024 * 1024);
    let desk = Desk::new(Scripted::default(), Some(dir.path().to_path_buf()));

    let err = desk.upload_file(&big).unwrap_err();
    assert!(matches!(
        err,
        DeskError::Rejected(UploadRejection::FileTooLarge { .. })
    ));
    assert_eq!(err.to_string(), "File size exceeds 5MB limit.");
    assert_eq!(desk.client().transport().calls(), 0);
}

#[test]
fn wrong_type_is_refused_before_size() {
    let dir = tempfile::tempdir().unwrap();
    let notes = write_file(dir.path(), "notes.txt", 6 * 1024 * 1024);
    let desk = Desk::new(Scripted::default(), None);

    let err = desk.upload_file(&notes).unwrap_err();
    assert_eq!(err.to_string(), "Please upload a PDF, PNG, or JPG file.");
    assert_eq!(desk.client().transport().calls(), 0);
}

#[test]
fn twenty_one_files_are_refused_without_a_request() {
    let dir = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..21)
        .map(|i| write_file(dir.path(), &format!("page{}.pdf", i), 10))
        .collect();
    let desk = Desk::new(Scripted::default(), None);

    let err = desk.upload_batch(&files).unwrap_err();
    assert_eq!(err.to_string(), "Maximum 20 files allowed per batch.");
    assert_eq!(desk.client().transport().calls(), 0);
}

#[test]
fn upload_renders_fields_and_shows_error_panel() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_file(dir.path(), "receipt.pdf", 1024);
    let transport = Scripted::default()
        .json("/api/upload", json!({"id": 5, "document_type": "receipt", "results": receipt_results()}))
        .json(
            "/api/validation-summary/5",
            json!({"total_issues": 3, "errors": 1, "warnings": 2, "info": 0, "unacknowledged": 3,
                   "issues_by_type": {"total_mismatch": 1, "missing_field": 2}}),
        );
    let desk = Desk::new(transport, None);

    let doc = desk.upload_file(&pdf).unwrap().applied().unwrap();
    assert_eq!(doc.id, 5);
    assert_eq!(doc.view.badge.label, "Receipt");
    assert_eq!(field_value(&doc.view, "merchant_name"), "Corner Shop");
    assert_eq!(field_value(&doc.view, "total"), "$7.00");
    assert_eq!(doc.validation.state, PanelState::VisibleError);
    assert_eq!(doc.validation.summary_text, "3 issues found (1 error) (2 warnings)");

    let seen = desk.client().transport().seen.lock().unwrap();
    assert_eq!(seen[0].method, Method::Post);
    match &seen[0].body {
        Body::Multipart(parts) => {
            assert_eq!(parts.len(), 1);
            assert_eq!(parts[0].field, "file");
            assert_eq!(parts[0].filename, "receipt.pdf");
            assert_eq!(parts[0].mime, "application/pdf");
            assert_eq!(parts[0].bytes.len(), 1024);
        }
        other => panic!("unexpected body {:?}", other),
    }
}

#[test]
fn upload_hook_runs_between_upload_and_validation() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_file(dir.path(), "receipt.pdf", 16);
    let transport = Scripted::default()
        .json("/api/upload", json!({"id": 5, "document_type": "receipt", "results": receipt_results()}))
        .json("/api/validation-summary/5", two_errors());
    let desk = Desk::new(transport, None);

    let mut seen_at_hook = None;
    desk.upload_file_with(&pdf, || seen_at_hook = Some(desk.client().transport().paths()))
        .unwrap();
    assert_eq!(seen_at_hook, Some(vec!["/api/upload".to_string()]));
}

#[test]
fn upload_hook_skipped_when_upload_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_file(dir.path(), "receipt.pdf", 16);
    let transport = Scripted::default().raw("/api/upload", 500, "Internal Server Error", b"");
    let desk = Desk::new(transport, None);

    let mut called = false;
    assert!(desk.upload_file_with(&pdf, || called = true).is_err());
    assert!(!called);
}

#[test]
fn failed_validation_summary_hides_the_panel() {
    let transport = Scripted::default()
        .json("/api/results/9", receipt_results())
        .raw("/api/validation-summary/9", 500, "Internal Server Error", b"oops");
    let desk = Desk::new(transport, None);

    let doc = desk.open_document(9).unwrap().applied().unwrap();
    assert_eq!(doc.validation.state, PanelState::Hidden);
    assert_eq!(field_value(&doc.view, "merchant_name"), "Corner Shop");
}

#[test]
fn upload_failure_reports_status_text() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_file(dir.path(), "scan.png", 64);
    let transport = Scripted::default().raw("/api/upload", 413, "Payload Too Large", b"");
    let desk = Desk::new(transport, None);

    let err = desk.upload_file(&png).unwrap_err();
    assert_eq!(err.to_string(), "Upload failed: Payload Too Large");
    assert!(desk.current_document().is_none());
}

#[test]
fn acknowledging_warnings_reports_partial_failure() {
    let transport = Scripted::default()
        .json("/api/results/4", receipt_results())
        .json(
            "/api/validation-summary/4",
            json!({"total_issues": 3, "errors": 0, "warnings": 3, "info": 0, "unacknowledged": 3}),
        )
        .json(
            "/api/validation-issues/4",
            json!([
                {"id": 1, "issue_type": "missing_field", "severity": "WARNING", "description": "no date", "acknowledged": 0},
                {"id": 2, "issue_type": "total_mismatch", "severity": "WARNING", "description": "sum", "acknowledged": false},
                {"id": 3, "issue_type": "bad_total", "severity": "ERROR", "description": "neg", "acknowledged": 0},
                {"id": 4, "issue_type": "missing_field", "severity": "WARNING", "description": "old", "acknowledged": 1}
            ]),
        )
        .json("/api/ignore-warning/1", json!({"message": "ok"}))
        .raw("/api/ignore-warning/2", 500, "Internal Server Error", b"");
    let desk = Desk::new(transport, None);
    desk.open_document(4).unwrap();

    let report = desk.acknowledge_all_warnings().unwrap();
    assert_eq!(report.acknowledged, vec![1]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].issue_id, 2);
    assert!(!report.is_complete());
    assert!(report.message().starts_with("Acknowledged 1 of 2 warnings."));

    let paths = desk.client().transport().paths();
    assert!(!paths.contains(&"/api/ignore-warning/3".to_string()));
    assert!(!paths.contains(&"/api/ignore-warning/4".to_string()));
    assert_eq!(paths.last().unwrap(), "/api/validation-summary/4");
}

#[test]
fn acknowledging_without_document_fails() {
    let desk = Desk::new(Scripted::default(), None);
    assert!(matches!(
        desk.acknowledge_all_warnings(),
        Err(DeskError::NoDocument)
    ));
}

#[test]
fn exports_are_saved_with_suffixes() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Scripted::default()
        .json("/api/results/5", receipt_results())
        .json("/api/export/5/json", json!({"merchant_name": "Corner Shop"}))
        .raw("/api/export/5/csv", 200, "OK", b"Field Name,Field Value\nmerchant_name,Corner Shop\n");
    let desk = Desk::new(transport, Some(dir.path().to_path_buf()));
    desk.open_document(5).unwrap();

    let first = desk.export_document(ExportFormat::Json, None).unwrap();
    let second = desk.export_document(ExportFormat::Json, None).unwrap();
    let csv = desk.export_document(ExportFormat::Csv, None).unwrap();
    assert_eq!(first.file_name().unwrap(), "document_5.json");
    assert_eq!(second.file_name().unwrap(), "document_5_2.json");
    assert_eq!(csv.file_name().unwrap(), "document_5.csv");

    let saved: Value = serde_json::from_slice(&fs::read(&first).unwrap()).unwrap();
    assert_eq!(saved, json!({"merchant_name": "Corner Shop"}));
    assert!(fs::read_to_string(&csv).unwrap().starts_with("Field Name,Field Value"));
}

#[test]
fn batch_upload_then_export() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_file(dir.path(), "a.pdf", 10),
        write_file(dir.path(), "b.jpg", 10),
    ];
    let transport = Scripted::default()
        .json("/api/upload-batch", json!({"batch_id": 17}))
        .json(
            "/api/batch-results/17",
            json!({"results": [
                {"filename": "a.pdf", "status": "completed", "results": receipt_results()},
                {"filename": "b.jpg", "status": "failed"}
            ]}),
        )
        .raw("/api/download-batch/17", 200, "OK", b"filename,total\n");
    let desk = Desk::new(transport, Some(dir.path().to_path_buf()));

    let batch = desk.upload_batch(&files).unwrap().applied().unwrap();
    assert_eq!(batch.batch_id, "17");
    assert_eq!(batch.total_files, 2);
    assert_eq!(batch.processed_files, 1);
    assert_eq!(batch.failed_files, 1);

    let saved = desk.export_batch(ExportFormat::Csv, None).unwrap();
    assert_eq!(saved.file_name().unwrap(), "batch_17_results.csv");

    let seen = desk.client().transport().seen.lock().unwrap();
    let download = seen.iter().find(|r| r.path == "/api/download-batch/17").unwrap();
    assert_eq!(download.body, Body::Json(json!({"format": "csv"})));
}

#[test]
fn corrections_carry_edits_and_category() {
    let transport = Scripted::default()
        .json("/api/results/5", receipt_results())
        .json("/api/correct/5", json!({"message": "Corrections saved"}));
    let desk = Desk::new(transport, None);
    desk.open_document(5).unwrap();
    desk.edit_field("total", json!("8.00")).unwrap();
    desk.set_category(Some("Meals".into())).unwrap();

    desk.save_corrections().unwrap();

    let seen = desk.client().transport().seen.lock().unwrap();
    let correct = seen.iter().find(|r| r.path == "/api/correct/5").unwrap();
    assert_eq!(
        correct.body,
        Body::Json(json!({
            "merchant_name": "Corner Shop",
            "total": "8.00",
            "category": "Meals"
        }))
    );
}

#[test]
fn history_keeps_server_order() {
    let transport = Scripted::default().json(
        "/api/history",
        json!([
            {"id": 2, "filename": "b.pdf", "upload_date": "2024-03-02 10:00:00", "status": "completed"},
            {"id": 1, "filename": "a.pdf", "upload_date": "2024-03-01 09:00:00", "status": "failed"}
        ]),
    );
    let desk = Desk::new(transport, None);

    match desk.history().unwrap() {
        Fenced::Applied(rows) => {
            assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1]);
            assert_eq!(rows[1].filename, "a.pdf");
        }
        Fenced::Stale => panic!("history should apply"),
    }
}

/// Holds one path until the test releases it, answering everything else straight away.
struct Held {
    inner: Scripted,
    path: &'static str,
    entered: Mutex<Option<Sender<()>>>,
    release: Mutex<Option<Receiver<()>>>,
}

impl Held {
    fn new(inner: Scripted, path: &'static str) -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let held = Self {
            inner,
            path,
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        };
        (held, entered_rx, release_tx)
    }
}

impl Transport for Held {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransferError> {
        if request.path == self.path {
            if let Some(tx) = self.entered.lock().unwrap().take() {
                tx.send(()).unwrap();
            }
            let release = self.release.lock().unwrap().take();
            if let Some(rx) = release {
                rx.recv().unwrap();
            }
        }
        self.inner.send(request)
    }
}

fn two_errors() -> Value {
    json!({"total_issues": 2, "errors": 2, "warnings": 0, "info": 0, "unacknowledged": 2})
}

#[test]
fn failed_open_keeps_panel_of_shown_document() {
    let scripted = Scripted::default()
        .json("/api/results/5", receipt_results())
        .json("/api/validation-summary/5", two_errors())
        .raw("/api/results/6", 500, "Internal Server Error", b"");
    let (transport, entered, release) = Held::new(scripted, "/api/validation-summary/5");
    let desk = Arc::new(Desk::new(transport, None));

    let first = {
        let desk = Arc::clone(&desk);
        thread::spawn(move || desk.open_document(5))
    };
    entered.recv().unwrap();

    let err = desk.open_document(6).unwrap_err();
    assert_eq!(err.to_string(), "Failed to load document: Internal Server Error");
    release.send(()).unwrap();

    let doc = first.join().unwrap().unwrap().applied().unwrap();
    assert_eq!(doc.id, 5);
    assert_eq!(doc.validation.state, PanelState::VisibleError);
    let shown = desk.current_document().unwrap();
    assert_eq!(shown.id, 5);
    assert_eq!(shown.validation.state, PanelState::VisibleError);
}

#[test]
fn replaced_document_drops_late_validation() {
    let scripted = Scripted::default()
        .json("/api/results/5", receipt_results())
        .json("/api/validation-summary/5", two_errors())
        .json("/api/results/6", receipt_results())
        .json(
            "/api/validation-summary/6",
            json!({"total_issues": 0, "errors": 0, "warnings": 0, "info": 0, "unacknowledged": 0}),
        );
    let (transport, entered, release) = Held::new(scripted, "/api/validation-summary/5");
    let desk = Arc::new(Desk::new(transport, None));

    let first = {
        let desk = Arc::clone(&desk);
        thread::spawn(move || desk.open_document(5))
    };
    entered.recv().unwrap();

    let second = desk.open_document(6).unwrap().applied().unwrap();
    assert_eq!(second.id, 6);
    release.send(()).unwrap();

    assert_eq!(first.join().unwrap().unwrap(), Fenced::Stale);
    let shown = desk.current_document().unwrap();
    assert_eq!(shown.id, 6);
    assert_eq!(shown.validation.state, PanelState::Hidden);
}
