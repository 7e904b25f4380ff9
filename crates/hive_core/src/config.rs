//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável, compartilhado pelo dashboard
//! e pelo publisher. Seções ausentes usam os valores padrão.

use crate::types::StorageVolume;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Erros ao persistir a configuração.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro de serialização TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),
}

/// Fonte de dados do dashboard, escolhida uma vez na inicialização.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Assinatura real no broker MQTT.
    #[default]
    Mqtt,
    /// Passeio aleatório local, sem rede.
    Simulator,
}

/// Política de reconexão ao broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

/// Conexão com o broker MQTT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Client id do dashboard
    pub client_id: String,
    /// Prefixo de todos os tópicos (assinatura `<namespace>/#`)
    pub namespace: String,
    pub keep_alive_secs: u64,
    pub reconnect: ReconnectConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: "apissense_dashboard".into(),
            namespace: "apissense".into(),
            keep_alive_secs: 30,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl BrokerConfig {
    /// Assinatura curinga que cobre todo o namespace.
    pub fn wildcard(&self) -> String {
        format!("{}/#", self.namespace)
    }
}

/// Configuração do dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// "mqtt" ou "simulator"
    pub data_source: DataSource,
    /// Tema: "dark" ou "light"
    pub theme: String,
    /// Duração da pseudo-espera de calibração (ms)
    pub calibration_wait_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::Mqtt,
            theme: "dark".into(),
            calibration_wait_ms: 1000,
        }
    }
}

/// Parâmetros do simulador local.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Intervalo entre passos (ms)
    pub interval_ms: u64,
    /// Semente opcional para execuções reproduzíveis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Probabilidade de descarga da bateria a cada passo
    pub battery_drain_chance: f64,
    /// Quanto a bateria cai quando descarrega (%)
    pub battery_drain_step: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1500,
            seed: None,
            battery_drain_chance: 0.05,
            battery_drain_step: 0.1,
        }
    }
}

/// Compatibilidade com formatos antigos de payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    /// Aceita nomes antigos (`temp`, `hum`, `raw`) com aviso no log
    pub accept_legacy_aliases: bool,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            accept_legacy_aliases: true,
        }
    }
}

/// Thresholds de alerta do dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Bateria abaixo disto é aviso (%)
    pub battery_warning: f64,
    /// Bateria abaixo disto é crítico (%)
    pub battery_critical: f64,
    pub co2_warning: f64,
    pub co2_critical: f64,
    pub storage_usage_warning: f64,
    pub storage_usage_critical: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            battery_warning: 50.0,
            battery_critical: 20.0,
            co2_warning: 1500.0,
            co2_critical: 2000.0,
            storage_usage_warning: 80.0,
            storage_usage_critical: 95.0,
        }
    }
}

/// Configuração do publisher de teste.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub client_id: String,
    /// Tempo máximo esperando o envio das mensagens (ms)
    pub flush_timeout_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            client_id: "apissense_publisher".into(),
            flush_timeout_ms: 5000,
        }
    }
}

/// Volumes padrão da placa (dois cartões SD).
pub fn default_storage() -> Vec<StorageVolume> {
    vec![
        StorageVolume::new("sd1", "SD Card 01 (Logs)", 4.2, 32.0),
        StorageVolume::new("sd2", "SD Card 02 (Audios)", 12.8, 32.0),
    ]
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub broker: BrokerConfig,
    pub dashboard: DashboardConfig,
    pub simulator: SimulatorConfig,
    pub payload: PayloadConfig,
    pub alerts: AlertThresholds,
    pub publisher: PublisherConfig,
    /// Volumes de armazenamento monitorados, em ordem de exibição
    pub storage: Vec<StorageVolume>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            dashboard: DashboardConfig::default(),
            simulator: SimulatorConfig::default(),
            payload: PayloadConfig::default(),
            alerts: AlertThresholds::default(),
            publisher: PublisherConfig::default(),
            storage: default_storage(),
        }
    }
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML, caindo nos padrões em caso de erro.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.broker.port == 0 {
            errors.push("Porta do broker não pode ser 0".into());
        }
        if self.broker.host.trim().is_empty() {
            errors.push("Host do broker vazio".into());
        }
        let ns = &self.broker.namespace;
        if ns.is_empty() || ns.contains(['#', '+']) || ns.ends_with('/') {
            errors.push(format!("Namespace inválido: {ns:?}"));
        }
        if self.broker.reconnect.initial_backoff_ms == 0
            || self.broker.reconnect.initial_backoff_ms > self.broker.reconnect.max_backoff_ms
        {
            errors.push(format!(
                "Backoff de reconexão inválido: {}–{} ms",
                self.broker.reconnect.initial_backoff_ms, self.broker.reconnect.max_backoff_ms
            ));
        }
        if self.simulator.interval_ms < 100 || self.simulator.interval_ms > 60_000 {
            errors.push(format!(
                "Intervalo do simulador inválido: {} ms (100–60000)",
                self.simulator.interval_ms
            ));
        }
        if !(0.0..=1.0).contains(&self.simulator.battery_drain_chance) {
            errors.push(format!(
                "Probabilidade de descarga inválida: {}",
                self.simulator.battery_drain_chance
            ));
        }
        if self.alerts.battery_critical > self.alerts.battery_warning {
            errors.push("Bateria: crítico deve ser ≤ aviso".into());
        }
        if self.alerts.co2_warning > self.alerts.co2_critical {
            errors.push("CO2: aviso deve ser ≤ crítico".into());
        }

        let mut keys = HashSet::new();
        for vol in &self.storage {
            if !keys.insert(vol.key.as_str()) {
                errors.push(format!("Volume duplicado: {}", vol.key));
            }
            if vol.total_gb <= 0.0 || vol.used_gb < 0.0 || vol.used_gb > vol.total_gb {
                errors.push(format!(
                    "Volume {} inválido: {}/{} GB",
                    vol.key, vol.used_gb, vol.total_gb
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.broker.port, parsed.broker.port);
        assert_eq!(config.dashboard.data_source, parsed.dashboard.data_source);
        assert_eq!(config.storage, parsed.storage);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[broker]
host = "10.0.0.7"

[dashboard]
data_source = "simulator"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.broker.host, "10.0.0.7");
        assert_eq!(config.dashboard.data_source, DataSource::Simulator);
        // Outros campos devem ter valor padrão
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.namespace, "apissense");
        assert_eq!(config.simulator.interval_ms, 1500);
        assert_eq!(config.storage.len(), 2);
    }

    #[test]
    fn custom_storage_volumes() {
        let toml_str = r#"
[[storage]]
key = "emmc"
label = "eMMC"
used_gb = 1.0
total_gb = 8.0
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.len(), 1);
        assert_eq!(config.storage[0].key, "emmc");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn rejects_wildcard_namespace_and_duplicate_volumes() {
        let mut config = AppConfig::default();
        config.broker.namespace = "apissense/#".into();
        config.storage.push(StorageVolume::new("sd1", "dup", 1.0, 2.0));
        let errors = config.validate();
        assert_eq!(errors.len(), 2, "{errors:?}");
    }

    #[test]
    fn wildcard_covers_namespace() {
        assert_eq!(BrokerConfig::default().wildcard(), "apissense/#");
    }
}
