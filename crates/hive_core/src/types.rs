//! Entidades de telemetria da colmeia.
//!
//! Cada struct representa uma leitura canônica mantida em memória durante a
//! sessão. Os invariantes (clamps, tara, tier de risco) ficam nos métodos de
//! mutação, nunca nos chamadores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Limite superior do índice VOC reportado pelo sensor.
pub const VOC_INDEX_MAX: f64 = 500.0;

// ──────────────────────────────────────────────
// Sistema (bateria + armazenamento)
// ──────────────────────────────────────────────

/// Volume de armazenamento local (cartões SD).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageVolume {
    /// Prefixo usado no payload (`<key>_used` / `<key>_total`)
    pub key: String,
    /// Rótulo exibido no dashboard
    pub label: String,
    /// Espaço usado (GB)
    pub used_gb: f64,
    /// Capacidade total (GB), sempre > 0
    pub total_gb: f64,
}

impl StorageVolume {
    pub fn new(key: &str, label: &str, used_gb: f64, total_gb: f64) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            used_gb,
            total_gb,
        }
    }

    /// Fração usada (0.0–1.0).
    pub fn usage_fraction(&self) -> f64 {
        if self.total_gb <= 0.0 {
            return 0.0;
        }
        (self.used_gb / self.total_gb).clamp(0.0, 1.0)
    }

    /// Aplica uma nova leitura se ela respeitar `0 ≤ used ≤ total` e `total > 0`.
    ///
    /// Retorna `false` (e mantém o valor anterior) quando a leitura é inválida.
    pub fn set_usage(&mut self, used_gb: f64, total_gb: f64) -> bool {
        if !total_gb.is_finite() || !used_gb.is_finite() {
            return false;
        }
        if total_gb <= 0.0 || used_gb < 0.0 || used_gb > total_gb {
            return false;
        }
        self.used_gb = used_gb;
        self.total_gb = total_gb;
        true
    }
}

/// Estado do sistema embarcado.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatus {
    battery_percent: f64,
    pub is_charging: bool,
    pub storage: Vec<StorageVolume>,
}

impl SystemStatus {
    pub fn new(battery_percent: f64, storage: Vec<StorageVolume>) -> Self {
        let mut status = Self {
            battery_percent: 0.0,
            is_charging: false,
            storage,
        };
        status.set_battery(battery_percent);
        status
    }

    /// Carga da bateria (0–100%).
    pub fn battery_percent(&self) -> f64 {
        self.battery_percent
    }

    pub fn set_battery(&mut self, percent: f64) {
        self.battery_percent = percent.clamp(0.0, 100.0);
    }

    pub fn volume(&self, key: &str) -> Option<&StorageVolume> {
        self.storage.iter().find(|v| v.key == key)
    }
}

// ──────────────────────────────────────────────
// Balança (célula de carga)
// ──────────────────────────────────────────────

/// Leitura da célula de carga, em kg.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleReading {
    /// Peso bruto (kg)
    pub raw_kg: f64,
    /// Tara capturada por comando (kg)
    pub tare_kg: f64,
    pub is_calibrating: bool,
}

impl ScaleReading {
    /// Peso líquido, nunca negativo.
    pub fn net_weight_kg(&self) -> f64 {
        (self.raw_kg - self.tare_kg).max(0.0)
    }

    /// Usa o peso bruto atual como tara.
    pub fn capture_tare(&mut self) {
        self.tare_kg = self.raw_kg;
    }
}

// ──────────────────────────────────────────────
// Fluxo de abelhas
// ──────────────────────────────────────────────

/// Contadores de entrada/saída do alvado.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowCounters {
    pub count_in: u64,
    pub count_out: u64,
}

impl FlowCounters {
    /// Saldo (entradas − saídas), pode ser negativo. Satura nos limites de `i64`.
    pub fn net(&self) -> i64 {
        let net = i128::from(self.count_in) - i128::from(self.count_out);
        net.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    pub fn reset(&mut self) {
        self.count_in = 0;
        self.count_out = 0;
    }
}

// ──────────────────────────────────────────────
// Atmosfera interna (SCD41) e clima externo
// ──────────────────────────────────────────────

/// CO2, temperatura e umidade dentro da colmeia.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtmosphereReading {
    co2_ppm: f64,
    pub temperature_c: f64,
    humidity_pct: f64,
}

impl AtmosphereReading {
    pub fn new(co2_ppm: f64, temperature_c: f64, humidity_pct: f64) -> Self {
        let mut reading = Self {
            temperature_c,
            ..Default::default()
        };
        reading.set_co2(co2_ppm);
        reading.set_humidity(humidity_pct);
        reading
    }

    pub fn co2_ppm(&self) -> f64 {
        self.co2_ppm
    }

    pub fn humidity_pct(&self) -> f64 {
        self.humidity_pct
    }

    pub fn set_co2(&mut self, ppm: f64) {
        self.co2_ppm = ppm.max(0.0);
    }

    pub fn set_humidity(&mut self, pct: f64) {
        self.humidity_pct = pct.clamp(0.0, 100.0);
    }
}

/// Temperatura e umidade fora da colmeia.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalClimate {
    pub temperature_c: f64,
    humidity_pct: f64,
}

impl ExternalClimate {
    pub fn new(temperature_c: f64, humidity_pct: f64) -> Self {
        let mut climate = Self {
            temperature_c,
            humidity_pct: 0.0,
        };
        climate.set_humidity(humidity_pct);
        climate
    }

    pub fn humidity_pct(&self) -> f64 {
        self.humidity_pct
    }

    pub fn set_humidity(&mut self, pct: f64) {
        self.humidity_pct = pct.clamp(0.0, 100.0);
    }
}

// ──────────────────────────────────────────────
// VOC
// ──────────────────────────────────────────────

/// Classificação de risco derivada do índice VOC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// High se > 300, Medium se > 100, senão Low.
    pub fn from_index(index: f64) -> Self {
        if index > 300.0 {
            RiskTier::High
        } else if index > 100.0 {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Índice VOC e seu tier de risco.
///
/// O índice só muda via [`VocReading::set_index`], que recalcula o tier,
/// então `risk()` é sempre consistente com `index()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VocReading {
    index: f64,
    risk: RiskTier,
}

impl VocReading {
    pub fn new(index: f64) -> Self {
        let mut voc = Self::default();
        voc.set_index(index);
        voc
    }

    pub fn index(&self) -> f64 {
        self.index
    }

    pub fn risk(&self) -> RiskTier {
        self.risk
    }

    pub fn set_index(&mut self, index: f64) {
        self.index = index.clamp(0.0, VOC_INDEX_MAX);
        self.risk = RiskTier::from_index(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_tier_boundaries() {
        assert_eq!(RiskTier::from_index(0.0), RiskTier::Low);
        assert_eq!(RiskTier::from_index(100.0), RiskTier::Low);
        assert_eq!(RiskTier::from_index(100.5), RiskTier::Medium);
        assert_eq!(RiskTier::from_index(300.0), RiskTier::Medium);
        assert_eq!(RiskTier::from_index(300.1), RiskTier::High);
    }

    #[test]
    fn voc_index_clamped_and_tier_consistent() {
        let mut voc = VocReading::new(150.0);
        assert_eq!(voc.risk(), RiskTier::Medium);

        for raw in [-20.0, 0.0, 99.9, 101.0, 250.0, 301.0, 499.0, 800.0] {
            voc.set_index(raw);
            assert!((0.0..=VOC_INDEX_MAX).contains(&voc.index()));
            assert_eq!(voc.risk(), RiskTier::from_index(voc.index()));
        }
        assert_eq!(voc.index(), VOC_INDEX_MAX);
    }

    #[test]
    fn net_weight_never_negative() {
        let cases = [(0.0, 0.0), (1.5, 0.0), (1.5, 2.0), (15.25, 15.25), (-3.0, 1.0)];
        for (raw, tare) in cases {
            let scale = ScaleReading {
                raw_kg: raw,
                tare_kg: tare,
                is_calibrating: false,
            };
            assert!(scale.net_weight_kg() >= 0.0, "raw={raw} tare={tare}");
        }
    }

    #[test]
    fn capture_tare_zeroes_net_weight() {
        let mut scale = ScaleReading {
            raw_kg: 15.25,
            ..Default::default()
        };
        scale.capture_tare();
        assert_eq!(scale.tare_kg, 15.25);
        assert_eq!(format!("{:.3}", scale.net_weight_kg()), "0.000");
    }

    #[test]
    fn flow_net_may_be_negative() {
        let flow = FlowCounters {
            count_in: 3,
            count_out: 10,
        };
        assert_eq!(flow.net(), -7);
    }

    #[test]
    fn flow_net_saturates() {
        let flow = FlowCounters {
            count_in: u64::MAX,
            count_out: 0,
        };
        assert_eq!(flow.net(), i64::MAX);
        let flow = FlowCounters {
            count_in: 0,
            count_out: u64::MAX,
        };
        assert_eq!(flow.net(), i64::MIN);
    }

    #[test]
    fn battery_is_clamped() {
        let mut status = SystemStatus::new(140.0, Vec::new());
        assert_eq!(status.battery_percent(), 100.0);
        status.set_battery(-5.0);
        assert_eq!(status.battery_percent(), 0.0);
    }

    #[test]
    fn storage_rejects_used_above_total() {
        let mut vol = StorageVolume::new("sd1", "SD", 4.2, 32.0);
        assert!(!vol.set_usage(40.0, 32.0));
        assert!(!vol.set_usage(1.0, 0.0));
        assert_eq!(vol.used_gb, 4.2);
        assert!(vol.set_usage(8.0, 64.0));
        assert_eq!(vol.usage_fraction(), 0.125);
    }

    #[test]
    fn humidity_clamped() {
        let atm = AtmosphereReading::new(-10.0, 34.0, 140.0);
        assert_eq!(atm.co2_ppm(), 0.0);
        assert_eq!(atm.humidity_pct(), 100.0);
        let ext = ExternalClimate::new(20.0, -1.0);
        assert_eq!(ext.humidity_pct(), 0.0);
    }
}
