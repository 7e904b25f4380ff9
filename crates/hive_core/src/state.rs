//! Dono do estado da colmeia.
//!
//! [`HiveState`] é o único lugar onde as leituras mudam. O roteador produz um
//! [`StateDelta`] por mensagem e o estado o aplica numa única chamada; o
//! simulador produz um [`Drift`] que é aplicado da mesma forma.

use crate::config::AppConfig;
use crate::types::*;
use std::time::Instant;
use tracing::{debug, info};

// ──────────────────────────────────────────────
// Deltas
// ──────────────────────────────────────────────

/// Nova leitura de um volume de armazenamento.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumePatch {
    pub key: String,
    pub used_gb: f64,
    pub total_gb: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemPatch {
    pub battery_percent: Option<f64>,
    pub is_charging: Option<bool>,
    pub volumes: Vec<VolumePatch>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalePatch {
    pub raw_kg: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowPatch {
    pub count_in: Option<u64>,
    pub count_out: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtmospherePatch {
    pub co2_ppm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClimatePatch {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
}

/// Atualização parcial do estado derivada de uma mensagem.
///
/// `None` significa "não tocar"; campos ausentes do payload nunca aparecem aqui.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    pub system: Option<SystemPatch>,
    pub scale: Option<ScalePatch>,
    pub flow: Option<FlowPatch>,
    pub atmosphere: Option<AtmospherePatch>,
    pub external: Option<ClimatePatch>,
    pub voc_index: Option<f64>,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.system.is_none()
            && self.scale.is_none()
            && self.flow.is_none()
            && self.atmosphere.is_none()
            && self.external.is_none()
            && self.voc_index.is_none()
    }
}

/// Passo do passeio aleatório do simulador (offsets, não valores absolutos).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drift {
    pub co2_ppm: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub voc_index: f64,
    pub scale_kg: f64,
    /// Queda da bateria neste passo (≥ 0)
    pub battery_drain: f64,
}

// ──────────────────────────────────────────────
// Estado
// ──────────────────────────────────────────────

/// Estado completo da colmeia durante uma sessão.
#[derive(Debug, Clone)]
pub struct HiveState {
    system: SystemStatus,
    scale: ScaleReading,
    flow: FlowCounters,
    atmosphere: AtmosphereReading,
    external: ExternalClimate,
    voc: VocReading,
    updates: u64,
    last_update: Option<Instant>,
}

impl HiveState {
    /// Estado inicial com os valores padrão da placa.
    pub fn new(storage: Vec<StorageVolume>) -> Self {
        Self {
            system: SystemStatus::new(100.0, storage),
            scale: ScaleReading {
                raw_kg: 1.5,
                tare_kg: 0.0,
                is_calibrating: false,
            },
            flow: FlowCounters {
                count_in: 450,
                count_out: 412,
            },
            atmosphere: AtmosphereReading::new(650.0, 34.2, 60.0),
            external: ExternalClimate::new(28.5, 45.0),
            voc: VocReading::new(150.0),
            updates: 0,
            last_update: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.storage.clone())
    }

    pub fn system(&self) -> &SystemStatus {
        &self.system
    }

    pub fn scale(&self) -> &ScaleReading {
        &self.scale
    }

    pub fn flow(&self) -> &FlowCounters {
        &self.flow
    }

    pub fn atmosphere(&self) -> &AtmosphereReading {
        &self.atmosphere
    }

    pub fn external(&self) -> &ExternalClimate {
        &self.external
    }

    pub fn voc(&self) -> &VocReading {
        &self.voc
    }

    /// Quantidade de atualizações aplicadas desde o início da sessão.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Aplica um delta inteiro de uma vez.
    pub fn apply(&mut self, delta: &StateDelta) {
        if delta.is_empty() {
            return;
        }
        if let Some(patch) = &delta.system {
            self.apply_system(patch);
        }
        if let Some(patch) = &delta.scale {
            if let Some(raw) = patch.raw_kg {
                self.scale.raw_kg = raw;
            }
        }
        if let Some(patch) = &delta.flow {
            self.apply_flow(patch);
        }
        if let Some(patch) = &delta.atmosphere {
            if let Some(co2) = patch.co2_ppm {
                self.atmosphere.set_co2(co2);
            }
            if let Some(temp) = patch.temperature_c {
                self.atmosphere.temperature_c = temp;
            }
            if let Some(hum) = patch.humidity_pct {
                self.atmosphere.set_humidity(hum);
            }
        }
        if let Some(patch) = &delta.external {
            if let Some(temp) = patch.temperature_c {
                self.external.temperature_c = temp;
            }
            if let Some(hum) = patch.humidity_pct {
                self.external.set_humidity(hum);
            }
        }
        if let Some(index) = delta.voc_index {
            self.voc.set_index(index);
        }
        self.touch();
    }

    /// Aplica um passo do simulador, respeitando os mesmos clamps.
    pub fn apply_drift(&mut self, drift: &Drift) {
        let atm = &mut self.atmosphere;
        atm.set_co2(atm.co2_ppm() + drift.co2_ppm);
        atm.temperature_c += drift.temperature_c;
        atm.set_humidity(atm.humidity_pct() + drift.humidity_pct);

        self.voc.set_index(self.voc.index() + drift.voc_index);
        self.scale.raw_kg += drift.scale_kg;

        if drift.battery_drain > 0.0 {
            let battery = self.system.battery_percent();
            self.system.set_battery(battery - drift.battery_drain);
        }
        self.touch();
    }

    /// Captura a tara a partir do peso bruto atual.
    pub fn capture_tare(&mut self) {
        self.scale.capture_tare();
        info!("Tara capturada: {:.3} kg", self.scale.tare_kg);
    }

    /// Zera os contadores de fluxo.
    pub fn reset_flow(&mut self) {
        self.flow.reset();
        info!("Contadores de fluxo zerados");
    }

    pub fn set_calibrating(&mut self, calibrating: bool) {
        self.scale.is_calibrating = calibrating;
    }

    fn apply_system(&mut self, patch: &SystemPatch) {
        if let Some(battery) = patch.battery_percent {
            self.system.set_battery(battery);
        }
        if let Some(charging) = patch.is_charging {
            self.system.is_charging = charging;
        }
        for vol_patch in &patch.volumes {
            match self.system.storage.iter_mut().find(|v| v.key == vol_patch.key) {
                Some(vol) => {
                    if !vol.set_usage(vol_patch.used_gb, vol_patch.total_gb) {
                        debug!(
                            "Leitura inválida para {}: {}/{} GB, mantendo anterior",
                            vol_patch.key, vol_patch.used_gb, vol_patch.total_gb
                        );
                    }
                }
                None => debug!("Volume desconhecido ignorado: {}", vol_patch.key),
            }
        }
    }

    fn apply_flow(&mut self, patch: &FlowPatch) {
        if let Some(count_in) = patch.count_in {
            if count_in < self.flow.count_in {
                info!("Contador de entradas regrediu ({} → {count_in}), reset no dispositivo", self.flow.count_in);
            }
            self.flow.count_in = count_in;
        }
        if let Some(count_out) = patch.count_out {
            if count_out < self.flow.count_out {
                info!("Contador de saídas regrediu ({} → {count_out}), reset no dispositivo", self.flow.count_out);
            }
            self.flow.count_out = count_out;
        }
    }

    fn touch(&mut self) {
        self.updates += 1;
        self.last_update = Some(Instant::now());
    }
}

impl Default for HiveState {
    fn default() -> Self {
        Self::new(crate::config::default_storage())
    }
}
