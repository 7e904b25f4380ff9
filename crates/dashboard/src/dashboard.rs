//! Dashboard principal – App eframe/egui.

use crate::panels::{self, CardAction};
use crate::theme_egui::{self, EguiTheme};
use egui::RichText;
use hive_core::alerts::{self, AlertLevel};
use hive_core::config::{AppConfig, DataSource};
use hive_core::session::Session;
use std::time::{Duration, Instant};
use tracing::{error, info};

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

/// Estado do dashboard.
pub struct HiveDashboard {
    config: AppConfig,
    theme: EguiTheme,
    theme_index: usize,
    all_themes: Vec<EguiTheme>,

    session: Option<Session>,
    start_error: Option<String>,

    // UI state
    calibration_started: Option<Instant>,
    is_fullscreen: bool,
}

impl HiveDashboard {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let (session, start_error) = match Session::start(&config) {
            Ok(session) => (Some(session), None),
            Err(e) => {
                error!("Falha ao iniciar a fonte de dados: {e}");
                (None, Some(e.to_string()))
            }
        };

        // Carrega tema
        let all_themes = theme_egui::all_themes();
        let theme_index = all_themes
            .iter()
            .position(|t| t.name == config.dashboard.theme)
            .unwrap_or(0);
        let theme = all_themes[theme_index].clone();

        Self {
            config,
            theme,
            theme_index,
            all_themes,
            session,
            start_error,
            calibration_started: None,
            is_fullscreen: false,
        }
    }

    /// Encerra a calibração depois da espera configurada.
    fn tick_calibration(&mut self) {
        let wait = Duration::from_millis(self.config.dashboard.calibration_wait_ms);
        let Some(started) = self.calibration_started else {
            return;
        };
        if started.elapsed() >= wait {
            self.calibration_started = None;
            if let Some(session) = self.session.as_mut() {
                session.set_calibrating(false);
            }
            info!("Calibração concluída");
        }
    }

    fn apply_action(&mut self, action: CardAction) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match action {
            CardAction::Tare => session.tare(),
            CardAction::ResetFlow => session.reset_flow(),
            CardAction::Calibrate => {
                if self.calibration_started.is_none() {
                    session.set_calibrating(true);
                    self.calibration_started = Some(Instant::now());
                }
            }
        }
    }

    fn render_header(&self, ui: &mut egui::Ui, session: &Session) {
        let system = session.state().system();
        let battery = system.battery_percent();
        let battery_color = self
            .theme
            .level_color(alerts::battery_level(battery, &self.config.alerts));

        ui.horizontal(|ui: &mut egui::Ui| {
            ui.label(
                RichText::new("🐝 ApisSense")
                    .color(self.theme.title)
                    .size(22.0)
                    .strong(),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui: &mut egui::Ui| {
                let charging = if system.is_charging { " ⚡" } else { "" };
                ui.label(
                    RichText::new(format!("🔋 {battery:.0}%{charging}"))
                        .color(battery_color)
                        .strong()
                        .monospace(),
                );
            });
        });

        let (text, color) = match (session.data_source(), session.is_connected()) {
            (DataSource::Simulator, _) => ("● Modo Simulação".to_string(), self.theme.warning),
            (DataSource::Mqtt, true) => (
                format!(
                    "● Conectado a {}:{} | {} mensagens",
                    self.config.broker.host,
                    self.config.broker.port,
                    session.stats().messages
                ),
                self.theme.ok,
            ),
            (DataSource::Mqtt, false) => {
                let reason = session.last_error().unwrap_or("aguardando broker");
                (
                    format!(
                        "○ Desconectado de {}:{} ({reason})",
                        self.config.broker.host, self.config.broker.port
                    ),
                    self.theme.critical,
                )
            }
        };
        ui.label(RichText::new(text).color(color).monospace().size(11.0));
    }

    fn render_alerts(&self, ui: &mut egui::Ui, session: &Session) {
        let active = alerts::evaluate_alerts(session.state(), &self.config.alerts);
        if active.is_empty() {
            return;
        }
        ui.horizontal_wrapped(|ui: &mut egui::Ui| {
            for alert in &active {
                let icon = if alert.level == AlertLevel::Critical { "⛔" } else { "⚠" };
                ui.label(
                    RichText::new(format!("{icon} {} {:.0}{}", alert.label, alert.value, alert.unit))
                        .color(self.theme.level_color(alert.level))
                        .size(11.0),
                );
            }
        });
    }
}

impl eframe::App for HiveDashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ── Poll da sessão ──
        if let Some(session) = self.session.as_mut() {
            session.poll();
        }
        self.tick_calibration();

        ctx.request_repaint_after(REPAINT_INTERVAL);

        // ── Configurar estilo visual baseado no tema ──
        let mut visuals = if self.theme.is_light() {
            egui::Visuals::light()
        } else {
            egui::Visuals::dark()
        };
        visuals.panel_fill = self.theme.bg;
        visuals.window_fill = self.theme.panel;
        visuals.override_text_color = Some(self.theme.text);
        ctx.set_visuals(visuals);

        // ── Atalhos de teclado ──
        ctx.input(|i: &egui::InputState| {
            if i.key_pressed(egui::Key::T) {
                self.theme_index = (self.theme_index + 1) % self.all_themes.len();
                self.theme = self.all_themes[self.theme_index].clone();
                info!("Tema: {}", self.theme.name);
            }
            if i.key_pressed(egui::Key::Q) || i.key_pressed(egui::Key::Escape) {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            if i.key_pressed(egui::Key::F) || i.key_pressed(egui::Key::F11) {
                self.is_fullscreen = !self.is_fullscreen;
                ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.is_fullscreen));
            }
        });

        let mut action = None;

        // ── Painel central ──
        egui::CentralPanel::default().show(ctx, |ui: &mut egui::Ui| {
            let Some(session) = self.session.as_ref() else {
                ui.vertical_centered(|ui: &mut egui::Ui| {
                    ui.label(
                        RichText::new(format!(
                            "Fonte de dados indisponível: {}",
                            self.start_error.as_deref().unwrap_or("desconhecido")
                        ))
                        .color(self.theme.critical)
                        .monospace(),
                    );
                });
                return;
            };

            self.render_header(ui, session);
            self.render_alerts(ui, session);
            ui.add_space(8.0);

            let state = session.state();
            let th = &self.config.alerts;

            // ── Linha 1: Balança | Fluxo | Atmosfera ──
            ui.columns(3, |cols| {
                if let Some(a) = panels::render_scale(&mut cols[0], state.scale(), &self.theme) {
                    action = Some(a);
                }
                if let Some(a) = panels::render_flow(&mut cols[1], state.flow(), &self.theme) {
                    action = Some(a);
                }
                panels::render_atmosphere(&mut cols[2], state.atmosphere(), &self.theme, th);
            });

            ui.add_space(6.0);

            // ── Linha 2: VOC | Clima externo | Armazenamento ──
            ui.columns(3, |cols| {
                panels::render_voc(&mut cols[0], state.voc(), &self.theme);
                panels::render_external(&mut cols[1], state.external(), &self.theme);
                panels::render_storage(&mut cols[2], &state.system().storage, &self.theme, th);
            });

            // ── Help bar (fundo) ──
            ui.with_layout(egui::Layout::bottom_up(egui::Align::Center), |ui: &mut egui::Ui| {
                ui.label(
                    RichText::new("[F] Fullscreen | [T] Tema | [Q/Esc] Sair")
                        .color(self.theme.dim)
                        .monospace()
                        .size(10.0),
                );
            });
        });

        if let Some(action) = action {
            self.apply_action(action);
        }
    }
}
