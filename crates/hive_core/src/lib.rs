//! # Hive Core
//!
//! Núcleo do monitor de colmeia ApisSense: modelo de estado, decodificação
//! tolerante de payloads, roteamento tópico → estado, transportes (MQTT ou
//! simulação) e canal de comandos.
//!
//! ## Módulos
//! - [`types`] – Entidades de telemetria (balança, fluxo, atmosfera, VOC…)
//! - [`state`] – Dono do estado e deltas aplicados por mensagem
//! - [`decode`] – Decoder com estratégias em sequência
//! - [`router`] – Tabela de tópicos e redutoras
//! - [`transport`] – Cliente MQTT e simulador atrás de um mesmo trait
//! - [`command`] – Comandos fire-and-forget (tara, reset)
//! - [`session`] – Consumidor único que amarra tudo
//! - [`config`] – Configuração unificada via TOML
//! - [`alerts`] – Thresholds e níveis de alerta

pub mod alerts;
pub mod command;
pub mod config;
pub mod decode;
pub mod router;
pub mod session;
pub mod state;
pub mod transport;
pub mod types;

// Re-exports convenientes
pub use config::{AppConfig, DataSource};
pub use router::{RouteOutcome, Router};
pub use session::Session;
pub use state::HiveState;
