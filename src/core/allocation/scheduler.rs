//! Monitoring scheduler.
//!
//! A running session owns two tasks: the monitor task, which evaluates on a
//! fixed cadence and on inbound events, and (for providers that support it)
//! a signal watcher that turns polled thermal/pressure readings into events.
//! Every evaluation funnels through the monitor task, so scheduled and
//! event-driven passes never interleave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Duration, Instant, Interval, MissedTickBehavior};

use super::manager::{EngineCore, EvaluationTrigger};
use super::metrics::MemoryPressure;
use super::provider::{MetricsEvent, SignalTracker};
use crate::core::config::Configuration;
use crate::error::{GuardError, Result};

/// Polling period of the signal watcher
pub const SIGNAL_POLL_INTERVAL: Duration = Duration::from_secs(1);

struct MonitorSession {
    shutdown_tx: broadcast::Sender<()>,
    events_tx: mpsc::UnboundedSender<MetricsEvent>,
    active: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

/// Lifecycle of the monitoring tasks: stopped or running
pub(crate) struct MonitoringScheduler {
    session: Option<MonitorSession>,
}

impl MonitoringScheduler {
    pub(crate) fn new() -> Self {
        Self { session: None }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Spawn the monitoring tasks on the current Tokio runtime
    pub(crate) fn start(&mut self, core: Arc<EngineCore>) -> Result<()> {
        if self.session.is_some() {
            log::debug!("Monitoring already running");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            GuardError::runtime(format!("Monitoring requires a Tokio runtime: {}", e))
        })?;

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let (events_tx, events_rx) = mpsc::unbounded_channel::<MetricsEvent>();
        let active = Arc::new(AtomicBool::new(true));

        let mut tasks = Vec::with_capacity(2);

        if core.provider().poll_signals().is_some() {
            tasks.push(runtime.spawn(signal_watch_task(
                core.clone(),
                events_tx.clone(),
                active.clone(),
                shutdown_tx.subscribe(),
            )));
        }

        tasks.push(runtime.spawn(monitor_task(
            core.clone(),
            events_rx,
            active.clone(),
            shutdown_tx.subscribe(),
        )));

        log::info!(
            "Monitoring started (interval {:.1}s)",
            core.configuration().update_interval_seconds
        );

        self.session = Some(MonitorSession {
            shutdown_tx,
            events_tx,
            active,
            tasks,
        });

        Ok(())
    }

    /// Cancel the tasks and release the event subscription
    pub(crate) fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.active.store(false, Ordering::SeqCst);
        // send() only fails when every task has already exited
        let _ = session.shutdown_tx.send(());
        drop(session.events_tx);

        // Tasks hold no locks across await points, so aborting there is safe
        for task in session.tasks {
            task.abort();
        }

        log::info!("Monitoring stopped");
    }

    /// Route an external signal into the running session.
    ///
    /// Dropped when monitoring is stopped.
    pub(crate) fn dispatch(&self, core: &EngineCore, event: MetricsEvent) {
        match &self.session {
            Some(session) => route_event(core, &session.events_tx, event),
            None => log::debug!("Monitoring stopped, ignoring {:?}", event),
        }
    }
}

impl Drop for MonitoringScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Critical pressure is answered immediately, then every event is queued for
/// a regular evaluation against the (possibly reduced) allocation
fn route_event(core: &EngineCore, events_tx: &mpsc::UnboundedSender<MetricsEvent>, event: MetricsEvent) {
    if event == MetricsEvent::MemoryPressureChanged(MemoryPressure::Critical) {
        core.apply_emergency();
    }

    if events_tx.send(event).is_err() {
        log::debug!("Monitor task gone, dropping {:?}", event);
    }
}

fn update_period(config: &Configuration) -> Duration {
    Duration::from_secs_f64(config.update_interval_seconds)
}

fn new_ticker(period: Duration) -> Interval {
    // First tick one full period after start
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Periodic and event-driven evaluation loop
async fn monitor_task(
    core: Arc<EngineCore>,
    mut events_rx: mpsc::UnboundedReceiver<MetricsEvent>,
    active: Arc<AtomicBool>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut period = update_period(&core.configuration());
    let mut ticker = new_ticker(period);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                break;
            }
            Some(event) = events_rx.recv() => {
                log::debug!("Evaluating on event {:?}", event);
                core.evaluate(EvaluationTrigger::from(event), Some(&active));
            }
            _ = core.configuration_changed() => {}
            _ = ticker.tick() => {
                core.evaluate(EvaluationTrigger::Scheduled, Some(&active));
            }
        }

        if !active.load(Ordering::SeqCst) {
            break;
        }

        // Interval changes restart the ticker from now
        let configured = update_period(&core.configuration());
        if configured != period {
            log::debug!("Update interval changed to {:?}", configured);
            period = configured;
            ticker = new_ticker(period);
        }
    }
}

/// Poll the provider's cheap signals and emit events on transitions
async fn signal_watch_task(
    core: Arc<EngineCore>,
    events_tx: mpsc::UnboundedSender<MetricsEvent>,
    active: Arc<AtomicBool>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut tracker = SignalTracker::new();
    let mut ticker = interval(SIGNAL_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                break;
            }
            _ = ticker.tick() => {
                let Some(signals) = core.provider().poll_signals() else {
                    log::warn!("Signal polling no longer available, watcher exiting");
                    break;
                };

                if !active.load(Ordering::SeqCst) {
                    break;
                }

                for event in tracker.observe(signals) {
                    route_event(&core, &events_tx, event);
                }
            }
        }
    }
}
