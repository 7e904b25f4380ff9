//! # ApisSense Dashboard
//!
//! Painel de monitoramento de colmeia em tempo real com GUI
//! acelerada por GPU via eframe/egui.
//!
//! Recebe telemetria do broker MQTT (ou do simulador local) e
//! renderiza cards de balança, fluxo de abelhas, atmosfera e armazenamento.
//!
//! ## Atalhos
//! - `F` / `F11`: Fullscreen
//! - `T`: Alternar tema
//! - `Q` / `Esc`: Sair

mod dashboard;
mod panels;
mod theme_egui;

use dashboard::HiveDashboard;
use hive_core::config::AppConfig;
use tracing::warn;

fn main() -> eframe::Result<()> {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Config ──
    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path);

    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }
    for problem in config.validate() {
        warn!("Config: {problem}");
    }

    // ── Janela eframe ──
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("ApisSense")
            .with_inner_size([1280.0, 760.0])
            .with_min_inner_size([960.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "ApisSense",
        options,
        Box::new(move |cc| Ok(Box::new(HiveDashboard::new(cc, config)))),
    )
}
