mod app;
mod theme;

use app::TutorApp;
use eframe::egui;
use solidtutor::chat::{ChatService, CommandChatService, ScriptedChatService};
use solidtutor::AppConfig;
use std::sync::Arc;
use theme::Theme;
use tracing::{info, warn};

fn select_service(config: &AppConfig, runtime: &tokio::runtime::Runtime) -> Arc<dyn ChatService> {
    if !config.uses_bridge() {
        info!("no chat command configured, using the offline tutor");
        return Arc::new(ScriptedChatService::new());
    }

    let api_key = config.api_key(|name| std::env::var(name).ok());
    if api_key.is_none() {
        warn!(var = %config.api_key_env, "no chat credential set");
    }
    match CommandChatService::new(&config.chat_command, api_key, runtime.handle().clone()) {
        Ok(service) => Arc::new(service),
        Err(err) => {
            warn!("chat bridge rejected ({err}), using the offline tutor");
            Arc::new(ScriptedChatService::new())
        }
    }
}

fn main() -> anyhow::Result<()> {
    solidtutor::init_logging()?;
    info!(version = solidtutor::VERSION, "starting solidtutor");

    let (config, warnings) = AppConfig::load();
    for warning in &warnings {
        warn!("{warning}");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("solidtutor-runtime")
        .build()?;

    let service = select_service(&config, &runtime);
    let theme = Theme::default();
    let app = TutorApp::new(theme.clone(), config, service, warnings);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 780.0])
            .with_min_inner_size([960.0, 640.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Solid Tutor",
        native_options,
        Box::new(move |creation_context| {
            theme.apply_visuals(&creation_context.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("ui terminated: {err}"))?;

    // The runtime must outlive the window: bridge tasks run on it.
    drop(runtime);
    Ok(())
}
