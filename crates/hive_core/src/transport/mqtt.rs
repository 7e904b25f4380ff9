//! Cliente MQTT real: uma conexão, uma assinatura curinga, tudo repassado.

use super::{FeedEvent, Transport, TransportError, forward};
use crate::config::{BrokerConfig, DataSource, ReconnectConfig};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Capacidade da fila de requisições do rumqttc.
const REQUEST_CAPACITY: usize = 16;

/// Backoff exponencial entre tentativas de reconexão.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(config: &ReconnectConfig) -> Self {
        let initial = Duration::from_millis(config.initial_backoff_ms.max(1));
        let max = Duration::from_millis(config.max_backoff_ms).max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Próxima espera; dobra até o teto.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

struct Worker {
    client: Client,
    alive: Arc<AtomicBool>,
    stop_tx: Sender<()>,
}

/// Transporte MQTT sobre `rumqttc` (cliente síncrono numa thread dedicada).
pub struct MqttTransport {
    broker: BrokerConfig,
    connected: Arc<AtomicBool>,
    worker: Option<Worker>,
}

impl MqttTransport {
    pub fn new(broker: BrokerConfig) -> Self {
        Self {
            broker,
            connected: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn options(&self) -> MqttOptions {
        let b = &self.broker;
        let mut options = MqttOptions::new(&b.client_id, &b.host, b.port);
        options.set_keep_alive(Duration::from_secs(b.keep_alive_secs.max(5)));
        options.set_clean_session(true);
        options
    }
}

impl Transport for MqttTransport {
    fn kind(&self) -> DataSource {
        DataSource::Mqtt
    }

    fn start(&mut self, events: Sender<FeedEvent>) -> Result<(), TransportError> {
        if self.worker.is_some() {
            return Err(TransportError::AlreadyStarted);
        }

        let (client, connection) = Client::new(self.options(), REQUEST_CAPACITY);
        let alive = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let link = Link {
            client: client.clone(),
            wildcard: self.broker.wildcard(),
            events,
            stop_rx,
            alive: Arc::clone(&alive),
            connected: Arc::clone(&self.connected),
            reconnect: self.broker.reconnect.clone(),
        };

        info!(
            "Iniciando conexão MQTT com {}:{} (client id {})",
            self.broker.host, self.broker.port, self.broker.client_id
        );

        // A thread não é aguardada no stop: pode estar presa numa tentativa
        // de conexão. Eventos tardios são descartados pela sessão.
        std::thread::Builder::new()
            .name("mqtt-receiver".into())
            .spawn(move || link.run(connection))?;

        self.worker = Some(Worker {
            client,
            alive,
            stop_tx,
        });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.alive.store(false, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        let _ = worker.stop_tx.try_send(());
        if let Err(e) = worker.client.try_disconnect() {
            debug!("Disconnect MQTT não enviado: {e}");
        }
        info!("Conexão MQTT encerrada");
    }

    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let worker = self.worker.as_ref().ok_or(TransportError::NotConnected)?;
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        worker
            .client
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .map_err(|e| TransportError::Client(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Estado da thread de rede.
struct Link {
    client: Client,
    wildcard: String,
    events: Sender<FeedEvent>,
    stop_rx: Receiver<()>,
    alive: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    reconnect: ReconnectConfig,
}

impl Link {
    fn run(self, mut connection: Connection) {
        let mut backoff = Backoff::new(&self.reconnect);

        for notification in connection.iter() {
            if !self.alive.load(Ordering::Acquire) {
                break;
            }

            match notification {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    self.connected.store(true, Ordering::Release);
                    backoff.reset();
                    info!("Conectado! Assinando {}", self.wildcard);
                    if let Err(e) = self.client.try_subscribe(self.wildcard.as_str(), QoS::AtMostOnce) {
                        warn!("Falha ao assinar {}: {e}", self.wildcard);
                        forward(&self.events, FeedEvent::Error(e.to_string()));
                    }
                    if !forward(&self.events, FeedEvent::Connected) {
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    trace!("← {} ({} bytes)", publish.topic, publish.payload.len());
                    let event = FeedEvent::Message {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                    };
                    if !forward(&self.events, event) {
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    self.connected.store(false, Ordering::Release);
                    forward(&self.events, FeedEvent::Disconnected);
                }
                Ok(_) => {}
                Err(e) => {
                    let was_connected = self.connected.swap(false, Ordering::AcqRel);
                    if !self.alive.load(Ordering::Acquire) {
                        break;
                    }
                    warn!("Erro de conexão MQTT: {e}");
                    forward(&self.events, FeedEvent::Error(e.to_string()));

                    if !self.reconnect.enabled {
                        forward(&self.events, FeedEvent::Disconnected);
                        info!("Reconexão desativada, encerrando transporte MQTT");
                        break;
                    }
                    if was_connected {
                        forward(&self.events, FeedEvent::Disconnected);
                    }

                    let delay = backoff.next_delay();
                    info!("Nova tentativa em {} ms", delay.as_millis());
                    match self.stop_rx.recv_timeout(delay) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => break,
                    }
                }
            }
        }

        self.connected.store(false, Ordering::Release);
        debug!("Thread MQTT finalizada");
    }
}
