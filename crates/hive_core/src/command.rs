//! Canal de comandos para os dispositivos (fire-and-forget).

use crate::router::{TOPIC_BEECOUNT, TOPIC_LOADCELL};
use crate::transport::Transport;
use tracing::{info, warn};

/// Comandos suportados pelos dispositivos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Tara da célula de carga.
    Tare,
    /// Zera os contadores de abelhas.
    ResetFlow,
}

impl Command {
    /// Palavra enviada como payload (texto puro).
    pub fn token(&self) -> &'static str {
        match self {
            Command::Tare => "TARE",
            Command::ResetFlow => "RESET",
        }
    }

    fn device(&self) -> &'static str {
        match self {
            Command::Tare => TOPIC_LOADCELL,
            Command::ResetFlow => TOPIC_BEECOUNT,
        }
    }
}

/// Publica comandos pelo transporte ativo. Sem ack, sem retry.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    namespace: String,
}

impl CommandChannel {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }

    /// Tópico de comando do dispositivo, ex: `apissense/loadcell1/cmd`.
    pub fn topic_for(&self, command: Command) -> String {
        format!("{}/{}/cmd", self.namespace, command.device())
    }

    pub fn send(&self, transport: &dyn Transport, command: Command) -> bool {
        self.publish_command(transport, &self.topic_for(command), command.token())
    }

    /// Publica `message` em `topic`. Retorna `true` se foi entregue ao cliente.
    ///
    /// Sem conexão é um no-op com aviso no log.
    pub fn publish_command(&self, transport: &dyn Transport, topic: &str, message: &str) -> bool {
        if !transport.is_connected() {
            warn!("Comando '{message}' para {topic} descartado: transporte desconectado");
            return false;
        }
        match transport.publish(topic, message) {
            Ok(()) => {
                info!("→ {topic}: {message}");
                true
            }
            Err(e) => {
                warn!("Falha ao enviar '{message}' para {topic}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::FakeTransport;

    #[test]
    fn command_topics() {
        let channel = CommandChannel::new("apissense");
        assert_eq!(channel.topic_for(Command::Tare), "apissense/loadcell1/cmd");
        assert_eq!(channel.topic_for(Command::ResetFlow), "apissense/beecount/cmd");
    }

    #[test]
    fn sends_plain_tokens_when_connected() {
        let channel = CommandChannel::new("apissense");
        let transport = FakeTransport::connected();
        assert!(channel.send(&transport, Command::Tare));
        assert!(channel.send(&transport, Command::ResetFlow));
        assert_eq!(
            transport.published(),
            vec![
                ("apissense/loadcell1/cmd".to_string(), "TARE".to_string()),
                ("apissense/beecount/cmd".to_string(), "RESET".to_string()),
            ]
        );
    }

    #[test]
    fn noop_when_disconnected() {
        let channel = CommandChannel::new("apissense");
        let transport = FakeTransport::default();
        assert!(!channel.publish_command(&transport, "apissense/x/cmd", "PING"));
        assert!(transport.published().is_empty());
    }
}
