//! Fontes de dados intercambiáveis.
//!
//! Um [`Transport`] roda numa thread própria e empurra [`FeedEvent`]s num
//! channel consumido pela [`Session`](crate::session::Session). Exatamente um
//! transporte fica ativo por sessão, escolhido pela configuração.

pub mod mqtt;
pub mod simulator;

use crate::config::{AppConfig, DataSource};
use crate::state::Drift;
use crossbeam_channel::{Sender, TrySendError};
use tracing::debug;

pub use mqtt::MqttTransport;
pub use simulator::SimulatorTransport;

/// Capacidade do channel transporte → sessão.
pub const EVENT_BUFFER: usize = 64;

/// Evento produzido por um transporte.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    /// Mensagem crua recebida do broker.
    Message { topic: String, payload: Vec<u8> },
    /// Passo do simulador, aplicado direto no estado.
    Drift(Drift),
    Error(String),
    Disconnected,
}

/// Erros de transporte. Nenhum deles encerra a sessão.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transporte não conectado")]
    NotConnected,

    #[error("Modo simulação: não há broker para publicar")]
    Offline,

    #[error("Transporte já iniciado")]
    AlreadyStarted,

    #[error("Erro do cliente MQTT: {0}")]
    Client(String),

    #[error("Falha ao criar thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Contrato comum ao cliente MQTT e ao simulador.
pub trait Transport: Send {
    fn kind(&self) -> DataSource;

    /// Inicia o produtor em background enviando eventos para `events`.
    fn start(&mut self, events: Sender<FeedEvent>) -> Result<(), TransportError>;

    /// Para o produtor. Idempotente.
    fn stop(&mut self);

    /// Publica sem bloquear o chamador.
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}

/// Cria o transporte configurado.
pub fn from_config(config: &AppConfig) -> Box<dyn Transport> {
    match config.dashboard.data_source {
        DataSource::Mqtt => Box::new(MqttTransport::new(config.broker.clone())),
        DataSource::Simulator => Box::new(SimulatorTransport::new(config.simulator.clone())),
    }
}

/// Envio não bloqueante: se a UI está lenta, descarta o evento.
///
/// Retorna `false` quando o consumidor não existe mais.
pub(crate) fn forward(tx: &Sender<FeedEvent>, event: FeedEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!("Channel cheio, descartando evento");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}
