//! Sistema de alertas – níveis e avaliação de thresholds.

use crate::config::AlertThresholds;
use crate::state::HiveState;
use crate::types::RiskTier;
use serde::{Deserialize, Serialize};

/// Nível de alerta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    Normal,
    Warning,
    Critical,
}

/// Um alerta disparado.
#[derive(Debug, Clone)]
pub struct Alert {
    pub metric: String,
    pub label: String,
    pub value: f64,
    pub unit: String,
    pub level: AlertLevel,
}

/// Avalia o estado atual contra os thresholds e retorna alertas.
pub fn evaluate_alerts(state: &HiveState, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    let battery = state.system().battery_percent();
    push(
        &mut alerts,
        "battery",
        "Bateria",
        battery,
        "%",
        battery_level(battery, thresholds),
    );

    let co2 = state.atmosphere().co2_ppm();
    push(
        &mut alerts,
        "co2",
        "CO2",
        co2,
        " ppm",
        level_for_value(co2, thresholds.co2_warning, thresholds.co2_critical),
    );

    let voc = state.voc();
    push(&mut alerts, "voc", "VOC", voc.index(), " idx", voc_level(voc.risk()));

    for vol in &state.system().storage {
        let percent = vol.usage_fraction() * 100.0;
        push(
            &mut alerts,
            &format!("storage_{}", vol.key),
            &vol.label,
            percent,
            "%",
            level_for_value(
                percent,
                thresholds.storage_usage_warning,
                thresholds.storage_usage_critical,
            ),
        );
    }

    alerts
}

fn push(alerts: &mut Vec<Alert>, metric: &str, label: &str, value: f64, unit: &str, level: AlertLevel) {
    if level == AlertLevel::Normal {
        return;
    }
    alerts.push(Alert {
        metric: metric.into(),
        label: label.into(),
        value,
        unit: unit.into(),
        level,
    });
}

/// Retorna o [`AlertLevel`] para um valor onde "mais alto é pior".
pub fn level_for_value(value: f64, warn: f64, crit: f64) -> AlertLevel {
    if value >= crit {
        AlertLevel::Critical
    } else if value >= warn {
        AlertLevel::Warning
    } else {
        AlertLevel::Normal
    }
}

/// Bateria: acima do aviso é normal, acima do crítico é aviso, resto crítico.
pub fn battery_level(percent: f64, thresholds: &AlertThresholds) -> AlertLevel {
    if percent > thresholds.battery_warning {
        AlertLevel::Normal
    } else if percent > thresholds.battery_critical {
        AlertLevel::Warning
    } else {
        AlertLevel::Critical
    }
}

pub fn voc_level(risk: RiskTier) -> AlertLevel {
    match risk {
        RiskTier::Low => AlertLevel::Normal,
        RiskTier::Medium => AlertLevel::Warning,
        RiskTier::High => AlertLevel::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Drift, StateDelta, SystemPatch, VolumePatch};

    fn quiet_state() -> HiveState {
        let mut state = HiveState::default();
        // VOC padrão (150) é Medium; baixa para não poluir os testes
        state.apply(&StateDelta {
            voc_index: Some(50.0),
            ..Default::default()
        });
        state
    }

    #[test]
    fn no_alerts_for_defaults() {
        let alerts = evaluate_alerts(&quiet_state(), &AlertThresholds::default());
        assert!(alerts.is_empty(), "{alerts:?}");
    }

    #[test]
    fn battery_tiers_match_dashboard_colors() {
        let th = AlertThresholds::default();
        assert_eq!(battery_level(51.0, &th), AlertLevel::Normal);
        assert_eq!(battery_level(50.0, &th), AlertLevel::Warning);
        assert_eq!(battery_level(21.0, &th), AlertLevel::Warning);
        assert_eq!(battery_level(20.0, &th), AlertLevel::Critical);
    }

    #[test]
    fn low_battery_is_critical() {
        let mut state = quiet_state();
        state.apply(&StateDelta {
            system: Some(SystemPatch {
                battery_percent: Some(15.0),
                ..Default::default()
            }),
            ..Default::default()
        });
        let alerts = evaluate_alerts(&state, &AlertThresholds::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, "battery");
        assert_eq!(alerts[0].level, AlertLevel::Critical);
    }

    #[test]
    fn co2_voc_and_storage_alerts() {
        let mut state = quiet_state();
        state.apply_drift(&Drift {
            co2_ppm: 1000.0,
            voc_index: 300.0,
            ..Default::default()
        });
        state.apply(&StateDelta {
            system: Some(SystemPatch {
                volumes: vec![VolumePatch {
                    key: "sd2".into(),
                    used_gb: 31.0,
                    total_gb: 32.0,
                }],
                ..Default::default()
            }),
            ..Default::default()
        });

        let alerts = evaluate_alerts(&state, &AlertThresholds::default());
        let find = |m: &str| alerts.iter().find(|a| a.metric == m).map(|a| a.level);
        assert_eq!(find("co2"), Some(AlertLevel::Warning));
        assert_eq!(find("voc"), Some(AlertLevel::Critical));
        assert_eq!(find("storage_sd2"), Some(AlertLevel::Critical));
        assert_eq!(find("storage_sd1"), None);
    }

    #[test]
    fn warning_level() {
        assert_eq!(level_for_value(1600.0, 1500.0, 2000.0), AlertLevel::Warning);
        assert_eq!(level_for_value(2100.0, 1500.0, 2000.0), AlertLevel::Critical);
        assert_eq!(level_for_value(700.0, 1500.0, 2000.0), AlertLevel::Normal);
    }
}
