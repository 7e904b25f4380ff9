//! Sessão: o único consumidor dos eventos de transporte.
//!
//! A [`Session`] é dona do [`HiveState`], do [`Router`] e do transporte ativo.
//! A UI chama [`Session::poll`] a cada frame; cada evento é aplicado inteiro
//! antes do próximo. Depois de [`Session::stop`] nada mais é aplicado.

use crate::command::{Command, CommandChannel};
use crate::config::{AppConfig, DataSource};
use crate::router::{RouteOutcome, Router};
use crate::state::HiveState;
use crate::transport::{self, EVENT_BUFFER, FeedEvent, Transport, TransportError};
use crossbeam_channel::{Receiver, bounded};
use tracing::{debug, info, warn};

/// Contadores de diagnóstico da sessão.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub messages: u64,
    pub applied: u64,
    pub decode_failures: u64,
    pub unroutable: u64,
    pub drifts: u64,
}

pub struct Session {
    state: HiveState,
    router: Router,
    commands: CommandChannel,
    transport: Box<dyn Transport>,
    rx: Receiver<FeedEvent>,
    live: bool,
    last_error: Option<String>,
    stats: SessionStats,
}

impl Session {
    /// Inicia a sessão com o transporte escolhido na configuração.
    pub fn start(config: &AppConfig) -> Result<Self, TransportError> {
        Self::with_transport(config, transport::from_config(config))
    }

    /// Inicia a sessão com um transporte explícito.
    pub fn with_transport(config: &AppConfig, mut transport: Box<dyn Transport>) -> Result<Self, TransportError> {
        let (tx, rx) = bounded(EVENT_BUFFER);
        transport.start(tx)?;

        let router = Router::from_config(config);
        debug!("Tópicos roteados: {:?}", router.topics().collect::<Vec<_>>());

        Ok(Self {
            state: HiveState::from_config(config),
            router,
            commands: CommandChannel::new(&config.broker.namespace),
            transport,
            rx,
            live: true,
            last_error: None,
            stats: SessionStats::default(),
        })
    }

    pub fn state(&self) -> &HiveState {
        &self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn data_source(&self) -> DataSource {
        self.transport.kind()
    }

    pub fn is_connected(&self) -> bool {
        self.live && self.transport.is_connected()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Último erro de transporte desde a última conexão.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drena e aplica todos os eventos pendentes. Retorna quantos aplicou.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while self.live {
            let Ok(event) = self.rx.try_recv() else {
                break;
            };
            self.handle(event);
            handled += 1;
        }
        handled
    }

    fn handle(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connected => {
                info!("Fonte de dados conectada ({:?})", self.transport.kind());
                self.last_error = None;
            }
            FeedEvent::Message { topic, payload } => {
                self.stats.messages += 1;
                match self.router.dispatch(&mut self.state, &topic, &payload) {
                    RouteOutcome::Applied(_) => self.stats.applied += 1,
                    RouteOutcome::DecodeFailed(_) => self.stats.decode_failures += 1,
                    RouteOutcome::Unroutable => self.stats.unroutable += 1,
                    RouteOutcome::Empty => {}
                }
            }
            FeedEvent::Drift(drift) => {
                self.stats.drifts += 1;
                self.state.apply_drift(&drift);
            }
            FeedEvent::Error(e) => {
                self.last_error = Some(e);
            }
            FeedEvent::Disconnected => {
                warn!("Fonte de dados desconectada");
            }
        }
    }

    /// Captura a tara localmente e avisa a balança.
    pub fn tare(&mut self) {
        self.state.capture_tare();
        self.send_command(Command::Tare);
    }

    /// Zera o fluxo localmente e avisa o contador.
    pub fn reset_flow(&mut self) {
        self.state.reset_flow();
        self.send_command(Command::ResetFlow);
    }

    pub fn set_calibrating(&mut self, calibrating: bool) {
        self.state.set_calibrating(calibrating);
    }

    /// Publica um comando arbitrário. Fire-and-forget.
    pub fn publish_command(&self, topic: &str, message: &str) -> bool {
        self.live && self.commands.publish_command(self.transport.as_ref(), topic, message)
    }

    fn send_command(&self, command: Command) {
        if self.transport.kind() == DataSource::Simulator {
            debug!("Modo simulação: comando {command:?} aplicado só localmente");
            return;
        }
        if self.live {
            self.commands.send(self.transport.as_ref(), command);
        }
    }

    /// Para o transporte e descarta qualquer evento ainda na fila.
    pub fn stop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        self.transport.stop();
        let discarded = self.rx.try_iter().count();
        if discarded > 0 {
            debug!("{discarded} eventos descartados no encerramento");
        }
        info!("Sessão encerrada");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulatorConfig;
    use crate::state::Drift;
    use crate::transport::testing::FakeTransport;
    use crate::types::RiskTier;
    use std::time::Duration;

    fn message(topic: &str, payload: &str) -> FeedEvent {
        FeedEvent::Message {
            topic: topic.into(),
            payload: payload.as_bytes().to_vec(),
        }
    }

    fn fake_session() -> (Session, FakeTransport) {
        let fake = FakeTransport::connected();
        let session = Session::with_transport(&AppConfig::default(), Box::new(fake.clone())).unwrap();
        (session, fake)
    }

    #[test]
    fn poll_applies_messages_in_order() {
        let (mut session, fake) = fake_session();
        fake.inject(FeedEvent::Connected);
        fake.inject(message("apissense/voc", "150"));
        fake.inject(message("apissense/voc", "350"));
        fake.inject(message("apissense/unknown", "{}"));
        fake.inject(message("apissense/beecount", "{oops"));

        assert_eq!(session.poll(), 5);
        assert_eq!(session.state().voc().index(), 350.0);
        assert_eq!(session.state().voc().risk(), RiskTier::High);
        assert_eq!(
            session.stats(),
            &SessionStats {
                messages: 4,
                applied: 2,
                decode_failures: 1,
                unroutable: 1,
                drifts: 0,
            }
        );
    }

    #[test]
    fn drift_goes_straight_to_state() {
        let (mut session, fake) = fake_session();
        fake.inject(FeedEvent::Drift(Drift {
            co2_ppm: 10.0,
            ..Default::default()
        }));
        session.poll();
        assert_eq!(session.state().atmosphere().co2_ppm(), 660.0);
        assert_eq!(session.stats().drifts, 1);
    }

    #[test]
    fn stale_events_after_stop_are_discarded() {
        let (mut session, fake) = fake_session();
        fake.inject(message("apissense/system", r#"{"battery":10}"#));
        session.stop();
        assert!(*fake.stopped.lock().unwrap());

        fake.inject(message("apissense/system", r#"{"battery":5}"#));
        assert_eq!(session.poll(), 0);
        assert_eq!(session.state().system().battery_percent(), 100.0);
        assert!(!session.is_connected());
    }

    #[test]
    fn tare_captures_locally_and_publishes() {
        let (mut session, fake) = fake_session();
        fake.inject(message("apissense/loadcell1", r#"{"weight":15250}"#));
        session.poll();

        session.tare();
        assert_eq!(session.state().scale().tare_kg, 15.25);
        assert_eq!(format!("{:.3}", session.state().scale().net_weight_kg()), "0.000");
        assert_eq!(
            fake.published(),
            vec![("apissense/loadcell1/cmd".to_string(), "TARE".to_string())]
        );
    }

    #[test]
    fn commands_are_noop_when_disconnected() {
        let (mut session, fake) = fake_session();
        *fake.connected.lock().unwrap() = false;

        session.reset_flow();
        assert_eq!(session.state().flow().net(), 0);
        assert!(fake.published().is_empty());
        assert!(!session.publish_command("apissense/beecount/cmd", "RESET"));
    }

    #[test]
    fn transport_errors_are_recorded_not_fatal() {
        let (mut session, fake) = fake_session();
        fake.inject(FeedEvent::Error("connection refused".into()));
        fake.inject(FeedEvent::Disconnected);
        session.poll();
        assert_eq!(session.last_error(), Some("connection refused"));
        assert!(session.is_live());

        fake.inject(FeedEvent::Connected);
        session.poll();
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn simulator_session_drifts_then_stops() {
        let config = AppConfig {
            dashboard: crate::config::DashboardConfig {
                data_source: DataSource::Simulator,
                ..Default::default()
            },
            simulator: SimulatorConfig {
                interval_ms: 10,
                seed: Some(1),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut session = Session::start(&config).unwrap();
        assert_eq!(session.data_source(), DataSource::Simulator);

        let mut applied = 0;
        for _ in 0..200 {
            applied += session.poll();
            if session.stats().drifts > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(applied > 0);
        assert!(session.state().updates() > 0);

        // Tara no simulador é só local
        session.tare();
        assert_eq!(session.state().scale().tare_kg, session.state().scale().raw_kg);

        session.stop();
        let updates = session.state().updates();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(session.poll(), 0);
        assert_eq!(session.state().updates(), updates);
    }
}
