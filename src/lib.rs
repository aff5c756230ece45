pub mod client;
pub mod config;
pub mod desk;
pub mod error;
pub mod excel;
pub mod export;
pub mod gate;
pub mod listing;
pub mod progress;
pub mod render;
pub mod session;
pub mod types;
pub mod validation;

#[cfg(feature = "desktop")]
mod commands;

/// Install the `tracing` subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::Manager;

    init_logging();
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let state = commands::build_state(app)?;
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_app_version,
            commands::get_config,
            commands::open_download_folder,
            commands::check_upload_file,
            commands::upload_document,
            commands::open_document,
            commands::current_document,
            commands::upload_batch,
            commands::get_batch_results,
            commands::get_history,
            commands::refresh_validation,
            commands::acknowledge_all_warnings,
            commands::export_document,
            commands::export_batch,
            commands::export_to_excel,
            commands::edit_field,
            commands::set_category,
            commands::save_corrections,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
