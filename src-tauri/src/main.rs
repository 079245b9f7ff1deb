use std::path::PathBuf;
use std::sync::Arc;
use tauri::Manager;
use vibecoder_core::api::v1::{self, ApiState};
use vibecoder_core::db::init_db;
use vibecoder_core::dispatch::Dispatcher;
use vibecoder_core::providers::{PollinationsClient, PuterClient};
use directories::ProjectDirs;

fn data_dir() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("com", "VibeCoder", "VibeCoder") {
        proj.data_dir().to_path_buf()
    } else {
        std::env::temp_dir().join("VibeCoder")
    }
}

fn main() {
    tauri::Builder::default()
        .setup(|app| {
            let db = init_db(data_dir()).expect("failed to init db");
            let primary =
                Arc::new(PollinationsClient::new().expect("failed to construct HTTP client"));
            let http = primary.http_client().clone();
            // The desktop shell has no host-injected Puter capability, so the
            // secondary provider reports itself unavailable and the
            // dispatcher falls through to the primary endpoint.
            let secondary = Arc::new(PuterClient::detached());
            let dispatcher = Arc::new(Dispatcher::new(primary, secondary));
            app.manage(ApiState {
                db,
                dispatcher,
                session: v1::shared_session(),
                http,
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            v1::ping,
            v1::session_snapshot,
            v1::set_buffer,
            v1::preview_document,
            v1::export_bundle,
            v1::generate,
            v1::new_session,
            v1::settings_get,
            v1::settings_update,
            v1::ai_list_models,
            v1::list_ai_events
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
