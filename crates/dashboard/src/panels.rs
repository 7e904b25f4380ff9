//! Cards do dashboard renderizados com egui.
//!
//! Os cards só leem o estado; botões retornam um [`CardAction`] que o
//! dashboard aplica na sessão depois do frame.

use crate::theme_egui::EguiTheme;
use egui::{Color32, RichText, Ui};
use hive_core::alerts::{self, AlertLevel};
use hive_core::config::AlertThresholds;
use hive_core::types::*;

/// Escala máxima da barra de CO2 (ppm).
const CO2_BAR_MAX: f64 = 2000.0;

/// Ação pedida por um botão de card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Tare,
    Calibrate,
    ResetFlow,
}

// ──────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────

fn panel_frame(ui: &mut Ui, title: &str, accent: Color32, theme: &EguiTheme, add_body: impl FnOnce(&mut Ui)) {
    egui::Frame::new()
        .fill(theme.panel)
        .stroke(egui::Stroke::new(2.0, accent))
        .corner_radius(8.0)
        .inner_margin(12.0)
        .show(ui, |ui: &mut Ui| {
            ui.set_min_height(170.0);
            ui.label(
                RichText::new(title.to_uppercase())
                    .color(theme.dim)
                    .strong()
                    .size(12.0),
            );
            ui.add_space(6.0);
            add_body(ui);
        });
}

fn value_display(ui: &mut Ui, value: &str, unit: &str, label: &str, color: Color32, size: f32, dim: Color32) {
    ui.vertical(|ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            ui.label(RichText::new(value).color(color).strong().monospace().size(size));
            if !unit.is_empty() {
                ui.label(RichText::new(unit).color(dim).size(13.0));
            }
        });
        if !label.is_empty() {
            ui.label(RichText::new(label.to_uppercase()).color(dim).size(10.0));
        }
    });
}

fn progress(ui: &mut Ui, label: &str, fraction: f64, color: Color32, dim: Color32) {
    let fraction = fraction.clamp(0.0, 1.0);
    ui.horizontal(|ui: &mut Ui| {
        ui.label(RichText::new(label).color(dim).size(11.0));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui: &mut Ui| {
            ui.label(RichText::new(format_percent(fraction)).color(dim).size(11.0));
        });
    });
    ui.add(
        egui::ProgressBar::new(fraction as f32)
            .fill(color)
            .desired_height(6.0),
    );
}

/// Percentual inteiro de uma fração (0.0–1.0).
pub fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

/// Saldo com sinal explícito quando positivo.
pub fn format_net_flow(net: i64) -> String {
    if net > 0 { format!("+{net}") } else { net.to_string() }
}

fn risk_label(risk: RiskTier) -> &'static str {
    match risk {
        RiskTier::Low => "Risco Baixo",
        RiskTier::Medium => "Risco Médio",
        RiskTier::High => "Risco Alto",
    }
}

// ──────────────────────────────────────────
// Célula de carga
// ──────────────────────────────────────────

pub fn render_scale(ui: &mut Ui, scale: &ScaleReading, theme: &EguiTheme) -> Option<CardAction> {
    let mut action = None;
    panel_frame(ui, "Célula de Carga", theme.scale, theme, |ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            value_display(
                ui,
                &format!("{:.3}", scale.net_weight_kg()),
                "kg",
                "Peso Líquido",
                theme.scale,
                30.0,
                theme.dim,
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Max), |ui: &mut Ui| {
                value_display(ui, &format!("{:.3}", scale.raw_kg), "kg", "Peso Bruto", theme.dim, 13.0, theme.dim);
            });
        });
        ui.separator();
        ui.horizontal(|ui: &mut Ui| {
            if ui.button("Tarar").clicked() {
                action = Some(CardAction::Tare);
            }
            let label = if scale.is_calibrating { "Calibrando..." } else { "Calibrar" };
            if ui.add_enabled(!scale.is_calibrating, egui::Button::new(label)).clicked() {
                action = Some(CardAction::Calibrate);
            }
        });
    });
    action
}

// ──────────────────────────────────────────
// Contagem de abelhas
// ──────────────────────────────────────────

pub fn render_flow(ui: &mut Ui, flow: &FlowCounters, theme: &EguiTheme) -> Option<CardAction> {
    let mut action = None;
    panel_frame(ui, "Contagem de Abelhas", theme.flow, theme, |ui: &mut Ui| {
        ui.columns(2, |cols| {
            value_display(&mut cols[0], &flow.count_in.to_string(), "", "↓ Entradas", theme.ok, 20.0, theme.dim);
            value_display(&mut cols[1], &flow.count_out.to_string(), "", "↑ Saídas", theme.warning, 20.0, theme.dim);
        });
        ui.separator();
        ui.horizontal(|ui: &mut Ui| {
            let net = flow.net();
            let color = if net >= 0 { theme.ok } else { theme.critical };
            ui.label(
                RichText::new(format!("Saldo: {}", format_net_flow(net)))
                    .color(color)
                    .strong(),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui: &mut Ui| {
                if ui.button("Zerar Fluxo").clicked() {
                    action = Some(CardAction::ResetFlow);
                }
            });
        });
    });
    action
}

// ──────────────────────────────────────────
// Atmosfera interna (SCD41)
// ──────────────────────────────────────────

pub fn render_atmosphere(ui: &mut Ui, atm: &AtmosphereReading, theme: &EguiTheme, th: &AlertThresholds) {
    panel_frame(ui, "SCD41 - Atmosfera Interna", theme.atmosphere, theme, |ui: &mut Ui| {
        let level = alerts::level_for_value(atm.co2_ppm(), th.co2_warning, th.co2_critical);
        let co2_color = match level {
            AlertLevel::Normal => theme.atmosphere,
            other => theme.level_color(other),
        };
        value_display(
            ui,
            &format!("{:.0}", atm.co2_ppm()),
            "ppm",
            "Nível de CO2",
            co2_color,
            26.0,
            theme.dim,
        );
        progress(ui, "", atm.co2_ppm() / CO2_BAR_MAX, co2_color, theme.dim);
        ui.add_space(4.0);
        ui.columns(2, |cols| {
            value_display(&mut cols[0], &format!("{:.1}", atm.temperature_c), "°C", "Temp. Interna", theme.text, 18.0, theme.dim);
            value_display(&mut cols[1], &format!("{:.0}", atm.humidity_pct()), "%", "Umid. Interna", theme.text, 18.0, theme.dim);
        });
    });
}

// ──────────────────────────────────────────
// VOC
// ──────────────────────────────────────────

pub fn render_voc(ui: &mut Ui, voc: &VocReading, theme: &EguiTheme) {
    panel_frame(ui, "Gases Voláteis (VOCs)", theme.voc, theme, |ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            value_display(ui, &format!("{:.0}", voc.index()), "idx", "Índice VOC", theme.voc, 26.0, theme.dim);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui: &mut Ui| {
                let color = theme.level_color(alerts::voc_level(voc.risk()));
                egui::Frame::new()
                    .stroke(egui::Stroke::new(1.0, color))
                    .corner_radius(10.0)
                    .inner_margin(egui::Margin::symmetric(10, 4))
                    .show(ui, |ui: &mut Ui| {
                        ui.label(RichText::new(risk_label(voc.risk())).color(color).strong().size(11.0));
                    });
            });
        });
    });
}

// ──────────────────────────────────────────
// Clima externo
// ──────────────────────────────────────────

pub fn render_external(ui: &mut Ui, ext: &ExternalClimate, theme: &EguiTheme) {
    panel_frame(ui, "DHT22 - Clima Externo", theme.climate, theme, |ui: &mut Ui| {
        ui.columns(2, |cols| {
            value_display(&mut cols[0], &format!("{:.1}", ext.temperature_c), "°C", "Temperatura", theme.text, 22.0, theme.dim);
            value_display(&mut cols[1], &format!("{:.0}", ext.humidity_pct()), "%", "Umidade", theme.text, 22.0, theme.dim);
        });
    });
}

// ──────────────────────────────────────────
// Armazenamento
// ──────────────────────────────────────────

pub fn render_storage(ui: &mut Ui, storage: &[StorageVolume], theme: &EguiTheme, th: &AlertThresholds) {
    panel_frame(ui, "Armazenamento Local", theme.storage, theme, |ui: &mut Ui| {
        if storage.is_empty() {
            ui.label(RichText::new("Sem volumes configurados").color(theme.dim));
        }
        for vol in storage {
            let level = alerts::level_for_value(
                vol.usage_fraction() * 100.0,
                th.storage_usage_warning,
                th.storage_usage_critical,
            );
            let color = match level {
                AlertLevel::Normal => theme.storage,
                other => theme.level_color(other),
            };
            progress(ui, &vol.label, vol.usage_fraction(), color, theme.dim);
            ui.add_space(4.0);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_flow_sign() {
        assert_eq!(format_net_flow(38), "+38");
        assert_eq!(format_net_flow(0), "0");
        assert_eq!(format_net_flow(-7), "-7");
    }

    #[test]
    fn percent_rounding() {
        assert_eq!(format_percent(4.2 / 32.0), "13%");
        assert_eq!(format_percent(1.0), "100%");
    }
}
