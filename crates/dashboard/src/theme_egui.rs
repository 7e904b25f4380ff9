//! Paletas do dashboard em `egui::Color32`.

use egui::Color32;
use hive_core::alerts::AlertLevel;

/// Tema com uma cor de destaque por card.
#[derive(Clone)]
pub struct EguiTheme {
    pub name: &'static str,
    pub bg: Color32,
    pub panel: Color32,
    pub text: Color32,
    pub dim: Color32,
    pub title: Color32,
    pub scale: Color32,
    pub flow: Color32,
    pub atmosphere: Color32,
    pub voc: Color32,
    pub climate: Color32,
    pub storage: Color32,
    pub ok: Color32,
    pub warning: Color32,
    pub critical: Color32,
}

impl EguiTheme {
    /// Cor associada a um nível de alerta.
    pub fn level_color(&self, level: AlertLevel) -> Color32 {
        match level {
            AlertLevel::Normal => self.ok,
            AlertLevel::Warning => self.warning,
            AlertLevel::Critical => self.critical,
        }
    }

    pub fn is_light(&self) -> bool {
        self.name == "light"
    }
}

/// Tema Escuro (padrão): zinco com âmbar.
pub fn dark_theme() -> EguiTheme {
    EguiTheme {
        name: "dark",
        bg: Color32::from_rgb(0x09, 0x09, 0x0b),
        panel: Color32::from_rgb(0x18, 0x18, 0x1b),
        text: Color32::from_rgb(0xe4, 0xe4, 0xe7),
        dim: Color32::from_rgb(0x71, 0x71, 0x7a),
        title: Color32::from_rgb(0xf5, 0x9e, 0x0b),
        scale: Color32::from_rgb(0xf5, 0x9e, 0x0b),
        flow: Color32::from_rgb(0x3b, 0x82, 0xf6),
        atmosphere: Color32::from_rgb(0x22, 0xc5, 0x5e),
        voc: Color32::from_rgb(0xa8, 0x55, 0xf7),
        climate: Color32::from_rgb(0xf9, 0x73, 0x16),
        storage: Color32::from_rgb(0x63, 0x66, 0xf1),
        ok: Color32::from_rgb(0x22, 0xc5, 0x5e),
        warning: Color32::from_rgb(0xf5, 0x9e, 0x0b),
        critical: Color32::from_rgb(0xef, 0x44, 0x44),
    }
}

/// Tema Claro.
pub fn light_theme() -> EguiTheme {
    EguiTheme {
        name: "light",
        bg: Color32::from_rgb(0xf4, 0xf4, 0xf5),
        panel: Color32::WHITE,
        text: Color32::from_rgb(0x27, 0x27, 0x2a),
        dim: Color32::from_rgb(0x71, 0x71, 0x7a),
        title: Color32::from_rgb(0xb4, 0x53, 0x09),
        scale: Color32::from_rgb(0xb4, 0x53, 0x09),
        flow: Color32::from_rgb(0x1d, 0x4e, 0xd8),
        atmosphere: Color32::from_rgb(0x15, 0x80, 0x3d),
        voc: Color32::from_rgb(0x7e, 0x22, 0xce),
        climate: Color32::from_rgb(0xc2, 0x41, 0x0c),
        storage: Color32::from_rgb(0x43, 0x38, 0xca),
        ok: Color32::from_rgb(0x15, 0x80, 0x3d),
        warning: Color32::from_rgb(0xb4, 0x53, 0x09),
        critical: Color32::from_rgb(0xb9, 0x1c, 0x1c),
    }
}

/// Carrega todos os temas disponíveis.
pub fn all_themes() -> Vec<EguiTheme> {
    vec![dark_theme(), light_theme()]
}
