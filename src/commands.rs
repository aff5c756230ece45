use crate::config::AppConfig;
use crate::desk::{Desk, DocumentView, Fenced};
use crate::gate::{self, FileCandidate};
use crate::listing::{BatchView, HistoryRow};
use crate::progress::{ProgressBar, TICK};
use crate::types::ExportFormat;
use crate::validation::{AcknowledgeReport, ValidationPanel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{AppHandle, Emitter, Manager, State};

const PROGRESS_EVENT: &str = "upload-progress";
const BATCH_PROGRESS_EVENT: &str = "batch-progress";

pub struct AppState {
    pub desk: Arc<Desk>,
    pub config: AppConfig,
    pub progress: ProgressBar,
    pub batch_progress: ProgressBar,
}

#[derive(Serialize)]
pub struct GateResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct EditFieldPayload {
    pub field: String,
    pub value: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInfo {
    pub api_url: String,
    pub download_dir: Option<String>,
}

fn parse_format(format: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(format).ok_or_else(|| format!("Unsupported format: {}", format))
}

fn tick(app: &AppHandle, bar: &ProgressBar, event: &'static str, from: u8, to: u8, text: &str) {
    let ticker = bar.start(from, to, text);
    let app = app.clone();
    std::thread::spawn(move || {
        ticker.run(TICK, |update| {
            let _ = app.emit(event, update);
        })
    });
}

#[tauri::command]
pub fn get_app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}

#[tauri::command]
pub fn get_config(state: State<AppState>) -> ConfigInfo {
    ConfigInfo {
        api_url: state.config.api_url.clone(),
        download_dir: state
            .config
            .resolve_download_dir()
            .ok()
            .and_then(|p| p.to_str().map(String::from)),
    }
}

#[tauri::command]
pub fn open_download_folder(state: State<AppState>) -> Result<(), String> {
    let dir = state.config.resolve_download_dir().map_err(|e| e.to_string())?;
    opener::open(&dir).map_err(|e| e.to_string())
}

/// Check a picked file before upload so the drop area can refuse it immediately.
#[tauri::command]
pub fn check_upload_file(path: String) -> GateResult {
    match FileCandidate::from_path(std::path::Path::new(&path)).and_then(|f| gate::check_single(&f)) {
        Ok(()) => GateResult { valid: true, error: None },
        Err(e) => GateResult { valid: false, error: Some(e.to_string()) },
    }
}

#[tauri::command]
pub async fn upload_document(
    app: AppHandle,
    state: State<'_, AppState>,
    path: String,
) -> Result<Fenced<DocumentView>, String> {
    let desk = Arc::clone(&state.desk);
    let bar = state.progress.clone();
    tick(&app, &bar, PROGRESS_EVENT, 10, 30, "Uploading...");
    let (processing_app, processing_bar) = (app.clone(), bar.clone());
    let result = tauri::async_runtime::spawn_blocking(move || {
        desk.upload_file_with(&PathBuf::from(path), || {
            tick(&processing_app, &processing_bar, PROGRESS_EVENT, 30, 90, "Processing document...")
        })
    })
    .await
    .map_err(|e| e.to_string())?;
    match &result {
        Ok(_) => {
            let _ = app.emit(PROGRESS_EVENT, bar.finish(100, "Complete!"));
        }
        Err(e) => {
            let _ = app.emit(PROGRESS_EVENT, bar.finish(0, &format!("Error: {}", e)));
        }
    }
    result.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn open_document(state: State<'_, AppState>, id: i64) -> Result<Fenced<DocumentView>, String> {
    let desk = Arc::clone(&state.desk);
    tauri::async_runtime::spawn_blocking(move || desk.open_document(id))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn current_document(state: State<AppState>) -> Option<DocumentView> {
    state.desk.current_document()
}

#[tauri::command]
pub async fn upload_batch(
    app: AppHandle,
    state: State<'_, AppState>,
    paths: Vec<String>,
) -> Result<Fenced<BatchView>, String> {
    let desk = Arc::clone(&state.desk);
    let bar = state.batch_progress.clone();
    tick(&app, &bar, BATCH_PROGRESS_EVENT, 0, 90, "Uploading batch...");
    let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
    let result = tauri::async_runtime::spawn_blocking(move || desk.upload_batch(&paths))
        .await
        .map_err(|e| e.to_string())?;
    let done = match &result {
        Ok(_) => bar.finish(100, "Complete!"),
        Err(e) => bar.finish(0, &format!("Error: {}", e)),
    };
    let _ = app.emit(BATCH_PROGRESS_EVENT, done);
    result.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_batch_results(state: State<'_, AppState>, batch_id: String) -> Result<Fenced<BatchView>, String> {
    let desk = Arc::clone(&state.desk);
    tauri::async_runtime::spawn_blocking(move || desk.load_batch(&batch_id))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_history(state: State<'_, AppState>) -> Result<Fenced<Vec<HistoryRow>>, String> {
    let desk = Arc::clone(&state.desk);
    tauri::async_runtime::spawn_blocking(move || desk.history())
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn refresh_validation(state: State<'_, AppState>) -> Result<ValidationPanel, String> {
    let desk = Arc::clone(&state.desk);
    let id = desk
        .current_document()
        .map(|d| d.id)
        .ok_or("No document loaded.")?;
    tauri::async_runtime::spawn_blocking(move || desk.refresh_validation(id))
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn acknowledge_all_warnings(state: State<'_, AppState>) -> Result<AcknowledgeReport, String> {
    let desk = Arc::clone(&state.desk);
    tauri::async_runtime::spawn_blocking(move || desk.acknowledge_all_warnings())
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn export_document(state: State<'_, AppState>, format: String) -> Result<String, String> {
    let format = parse_format(&format)?;
    let desk = Arc::clone(&state.desk);
    let path = tauri::async_runtime::spawn_blocking(move || desk.export_document(format, None))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    Ok(path.to_string_lossy().into_owned())
}

#[tauri::command]
pub async fn export_batch(state: State<'_, AppState>, format: String) -> Result<String, String> {
    let format = parse_format(&format)?;
    let desk = Arc::clone(&state.desk);
    let path = tauri::async_runtime::spawn_blocking(move || desk.export_batch(format, None))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    Ok(path.to_string_lossy().into_owned())
}

#[tauri::command]
pub async fn export_to_excel(state: State<'_, AppState>, path: Option<String>) -> Result<String, String> {
    let desk = Arc::clone(&state.desk);
    let saved = tauri::async_runtime::spawn_blocking(move || {
        desk.export_workbook(path.as_deref().map(std::path::Path::new))
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| e.to_string())?;
    Ok(saved.to_string_lossy().into_owned())
}

#[tauri::command]
pub fn edit_field(state: State<AppState>, payload: EditFieldPayload) -> Result<(), String> {
    state
        .desk
        .edit_field(&payload.field, payload.value)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn set_category(state: State<AppState>, category: Option<String>) -> Result<(), String> {
    state.desk.set_category(category).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn save_corrections(state: State<'_, AppState>) -> Result<Value, String> {
    let desk = Arc::clone(&state.desk);
    tauri::async_runtime::spawn_blocking(move || desk.save_corrections())
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

/// Desktop entry point: config from the app data dir `.env`, then the process environment.
pub fn build_state(app: &tauri::App) -> Result<AppState, String> {
    if let Ok(dir) = app.path().app_data_dir() {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }
    }
    let config = AppConfig::from_env().map_err(|e| e.to_string())?;
    let desk = Desk::from_config(&config).map_err(|e| e.to_string())?;
    tracing::info!(api = %config.api_url, "desktop session ready");
    Ok(AppState {
        desk: Arc::new(desk),
        config,
        progress: ProgressBar::new(),
        batch_progress: ProgressBar::new(),
    })
}
