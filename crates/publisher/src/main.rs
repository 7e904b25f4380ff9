//! # ApisSense Publisher
//!
//! Publica duas mensagens de teste no broker (bateria baixa e uma leitura
//! da balança) e sai. Útil para ver o dashboard reagir sem o hardware.
//!
//! ## Uso
//! ```bash
//! apissense_publisher                              # broker da config
//! apissense_publisher --host 192.168.0.10 --port 1883
//! ```

use hive_core::config::{AppConfig, BrokerConfig};
use hive_core::router::{TOPIC_LOADCELL, TOPIC_SYSTEM};
use rumqttc::{Client, Event, MqttOptions, Outgoing, QoS};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Bateria enviada no teste (%).
const TEST_BATTERY: u8 = 25;
/// Peso enviado no teste (g).
const TEST_WEIGHT_G: u32 = 15_250;

/// Mensagens enviadas, na ordem: `(tópico, payload JSON)`.
fn canned_messages(namespace: &str) -> Vec<(String, String)> {
    vec![
        (
            format!("{namespace}/{TOPIC_SYSTEM}"),
            serde_json::json!({ "battery": TEST_BATTERY }).to_string(),
        ),
        (
            format!("{namespace}/{TOPIC_LOADCELL}"),
            serde_json::json!({ "weight": TEST_WEIGHT_G }).to_string(),
        ),
    ]
}

/// Aplica `--host` e `--port` sobre a config do broker.
fn apply_args(broker: &mut BrokerConfig, args: &[String]) -> Result<(), String> {
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--host" => {
                broker.host = it.next().ok_or("--host sem valor")?.clone();
            }
            "--port" => {
                let raw = it.next().ok_or("--port sem valor")?;
                broker.port = raw.parse().map_err(|_| format!("porta inválida: {raw}"))?;
            }
            other => return Err(format!("argumento desconhecido: {other}")),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let mut config = AppConfig::load(&AppConfig::default_path());
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = apply_args(&mut config.broker, &args) {
        error!("{e}");
        return ExitCode::from(2);
    }

    let broker = &config.broker;
    let mut options = MqttOptions::new(&config.publisher.client_id, &broker.host, broker.port);
    options.set_keep_alive(Duration::from_secs(broker.keep_alive_secs.max(5)));
    options.set_clean_session(true);

    let (client, mut connection) = Client::new(options, 10);
    let messages = canned_messages(&broker.namespace);

    for (topic, payload) in &messages {
        if let Err(e) = client.publish(topic.as_str(), QoS::AtMostOnce, false, payload.as_bytes()) {
            error!("Falha ao enfileirar {topic}: {e}");
            return ExitCode::FAILURE;
        }
    }

    // ── Drena a conexão até as publicações saírem ──
    let deadline = Instant::now() + Duration::from_millis(config.publisher.flush_timeout_ms);
    let mut sent = 0;
    while sent < messages.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            error!("Tempo esgotado: {sent}/{} mensagens enviadas", messages.len());
            return ExitCode::FAILURE;
        }
        match connection.recv_timeout(remaining) {
            Ok(Ok(Event::Outgoing(Outgoing::Publish(_)))) => {
                let (topic, payload) = &messages[sent];
                info!("→ {topic} {payload}");
                sent += 1;
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                error!("Falha ao conectar em {}:{}: {e}", broker.host, broker.port);
                return ExitCode::FAILURE;
            }
            Err(_) => {}
        }
    }

    if let Err(e) = client.disconnect() {
        warn!("Falha ao desconectar: {e}");
    }
    // Entrega o DISCONNECT antes de sair
    for event in connection.iter() {
        match event {
            Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    info!("{} mensagens publicadas em {}:{}", sent, broker.host, broker.port);
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn canned_messages_use_namespace_and_grams() {
        let msgs = canned_messages("apissense");
        assert_eq!(
            msgs,
            vec![
                ("apissense/system".to_string(), r#"{"battery":25}"#.to_string()),
                ("apissense/loadcell1".to_string(), r#"{"weight":15250}"#.to_string()),
            ]
        );
    }

    #[test]
    fn host_and_port_override_config() {
        let mut broker = BrokerConfig::default();
        apply_args(&mut broker, &args(&["--host", "10.0.0.5", "--port", "1884"])).unwrap();
        assert_eq!(broker.host, "10.0.0.5");
        assert_eq!(broker.port, 1884);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        let mut broker = BrokerConfig::default();
        assert!(apply_args(&mut broker, &args(&["--port", "abc"])).is_err());
        assert!(apply_args(&mut broker, &args(&["--host"])).is_err());
        assert!(apply_args(&mut broker, &args(&["--verbose"])).is_err());
        assert_eq!(broker.port, 1883);
    }
}
