//! Simulador local: passeio aleatório limitado sobre o estado atual.

use super::{FeedEvent, Transport, TransportError, forward};
use crate::config::{DataSource, SimulatorConfig};
use crate::state::Drift;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Gera um passo do simulador.
///
/// Amplitudes por passo: CO2 ±5 ppm, temperatura ±0.05 °C, umidade ±0.25 %,
/// VOC ±2.5, ruído da balança ±1 g.
pub fn next_drift(rng: &mut impl Rng, config: &SimulatorConfig) -> Drift {
    let battery_drain = if rng.random::<f64>() < config.battery_drain_chance {
        config.battery_drain_step
    } else {
        0.0
    };
    Drift {
        co2_ppm: rng.random_range(-5.0..5.0),
        temperature_c: rng.random_range(-0.05..0.05),
        humidity_pct: rng.random_range(-0.25..0.25),
        voc_index: rng.random_range(-2.5..2.5),
        scale_kg: rng.random_range(-0.001..0.001),
        battery_drain,
    }
}

struct Worker {
    alive: Arc<AtomicBool>,
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Transporte que sintetiza [`Drift`]s num intervalo fixo.
pub struct SimulatorTransport {
    config: SimulatorConfig,
    worker: Option<Worker>,
}

impl SimulatorTransport {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }
}

impl Transport for SimulatorTransport {
    fn kind(&self) -> DataSource {
        DataSource::Simulator
    }

    fn start(&mut self, events: Sender<FeedEvent>) -> Result<(), TransportError> {
        if self.worker.is_some() {
            return Err(TransportError::AlreadyStarted);
        }

        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let alive = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let config = self.config.clone();
        let thread_alive = Arc::clone(&alive);
        let handle = std::thread::Builder::new()
            .name("simulator".into())
            .spawn(move || simulator_loop(&events, &stop_rx, &thread_alive, &config, rng))?;

        info!("Modo simulação ativado (intervalo {} ms)", self.config.interval_ms);
        self.worker = Some(Worker {
            alive,
            stop_tx,
            handle,
        });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.alive.store(false, Ordering::Release);
        let _ = worker.stop_tx.try_send(());
        if worker.handle.join().is_err() {
            warn!("Thread do simulador terminou com pânico");
        }
        info!("Simulação encerrada");
    }

    fn publish(&self, topic: &str, _payload: &str) -> Result<(), TransportError> {
        debug!("Publicação em {topic} ignorada no modo simulação");
        Err(TransportError::Offline)
    }

    fn is_connected(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for SimulatorTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

fn simulator_loop(
    tx: &Sender<FeedEvent>,
    stop_rx: &Receiver<()>,
    alive: &AtomicBool,
    config: &SimulatorConfig,
    mut rng: StdRng,
) {
    let interval = Duration::from_millis(config.interval_ms);
    if !forward(tx, FeedEvent::Connected) {
        return;
    }

    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            // Sinal de parada ou transporte descartado
            _ => break,
        }
        if !alive.load(Ordering::Acquire) {
            break;
        }
        let drift = next_drift(&mut rng, config);
        if !forward(tx, FeedEvent::Drift(drift)) {
            break;
        }
    }
    debug!("Thread do simulador finalizada");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn fast_config() -> SimulatorConfig {
        SimulatorConfig {
            interval_ms: 10,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn drift_is_bounded() {
        let config = SimulatorConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let d = next_drift(&mut rng, &config);
            assert!(d.co2_ppm.abs() <= 5.0);
            assert!(d.temperature_c.abs() <= 0.05);
            assert!(d.humidity_pct.abs() <= 0.25);
            assert!(d.voc_index.abs() <= 2.5);
            assert!(d.scale_kg.abs() <= 0.001);
            assert!(d.battery_drain == 0.0 || d.battery_drain == config.battery_drain_step);
        }
    }

    #[test]
    fn seeded_drift_is_reproducible() {
        let config = SimulatorConfig::default();
        let mut a = StdRng::seed_from_u64(3);
        let mut b = StdRng::seed_from_u64(3);
        assert_eq!(next_drift(&mut a, &config), next_drift(&mut b, &config));
    }

    #[test]
    fn emits_connected_then_drifts() {
        let (tx, rx) = bounded(64);
        let mut sim = SimulatorTransport::new(fast_config());
        sim.start(tx).unwrap();
        assert!(sim.is_connected());

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(FeedEvent::Connected));
        let next = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(next, FeedEvent::Drift(_)));
        sim.stop();
    }

    #[test]
    fn stop_is_prompt_and_final() {
        let (tx, rx) = bounded(64);
        let mut sim = SimulatorTransport::new(SimulatorConfig {
            interval_ms: 60_000,
            ..fast_config()
        });
        sim.start(tx).unwrap();

        let started = Instant::now();
        sim.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!sim.is_connected());

        // Thread já terminou: o channel fica desconectado depois dos pendentes
        let pending: Vec<_> = rx.try_iter().collect();
        assert!(pending.iter().all(|e| matches!(e, FeedEvent::Connected)));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn double_start_rejected() {
        let (tx, _rx) = bounded(64);
        let mut sim = SimulatorTransport::new(fast_config());
        sim.start(tx.clone()).unwrap();
        assert!(matches!(sim.start(tx), Err(TransportError::AlreadyStarted)));
    }

    #[test]
    fn publish_is_offline() {
        let sim = SimulatorTransport::new(fast_config());
        assert!(matches!(
            sim.publish("apissense/loadcell1/cmd", "TARE"),
            Err(TransportError::Offline)
        ));
    }
}
