//! Timer-owning proctoring session.
//!
//! Runs a [`ProctorGuard`] on its own tokio task. The task owns the 1s
//! countdown interval and the backup timer; both are dropped together
//! whenever a violation is cured, the attempt is submitted, or the
//! session shuts down.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Interval, Sleep};

use crate::error::ProctorError;
use crate::guard::{EnvironmentSignal, GuardConfig, GuardOutcome, ProctorGuard, ProctoringState};

/// How long after the expected expiry the backup timer fires.
const BACKUP_SLACK: Duration = Duration::from_millis(500);

/// Period of the primary countdown.
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Receives the auto-submit decision. Invoked at most once per session.
#[async_trait]
pub trait SubmitHandler: Send + Sync {
    async fn auto_submit(&self, is_violation: bool);
}

enum Command {
    Signal(EnvironmentSignal, oneshot::Sender<GuardOutcome>),
    TimeUp(oneshot::Sender<GuardOutcome>),
}

enum TimerEvent {
    Tick,
    Backup(u64),
}

/// The primary interval and backup sleep for one violation.
struct Countdown {
    epoch: u64,
    interval: Interval,
    backup: Pin<Box<Sleep>>,
}

impl Countdown {
    fn start(epoch: u64, grace_secs: u32, period: Duration) -> Self {
        Self {
            epoch,
            interval: interval_at(Instant::now() + period, period),
            backup: Box::pin(sleep(Duration::from_secs(grace_secs as u64) + BACKUP_SLACK)),
        }
    }

    async fn next(&mut self) -> TimerEvent {
        let epoch = self.epoch;
        tokio::select! {
            biased;
            _ = self.interval.tick() => TimerEvent::Tick,
            _ = &mut self.backup => TimerEvent::Backup(epoch),
        }
    }
}

async fn next_timer(countdown: &mut Option<Countdown>) -> TimerEvent {
    match countdown {
        Some(c) => c.next().await,
        None => pending().await,
    }
}

/// Spawns proctoring sessions.
pub struct ProctorSession;

impl ProctorSession {
    /// Start guarding an attempt. Must be called inside a tokio runtime.
    pub fn spawn(config: GuardConfig, handler: Arc<dyn SubmitHandler>) -> ProctorHandle {
        Self::spawn_with_period(config, handler, TICK_PERIOD)
    }

    pub(crate) fn spawn_with_period(
        config: GuardConfig,
        handler: Arc<dyn SubmitHandler>,
        tick_period: Duration,
    ) -> ProctorHandle {
        let guard = ProctorGuard::new(config);
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(guard.snapshot());
        let task = tokio::spawn(run(guard, rx, state_tx, handler, tick_period));

        ProctorHandle {
            commands,
            state,
            task,
        }
    }
}

async fn run(
    mut guard: ProctorGuard,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ProctoringState>,
    handler: Arc<dyn SubmitHandler>,
    tick_period: Duration,
) {
    let grace_secs = guard.config().grace_secs;
    let mut countdown: Option<Countdown> = None;

    loop {
        let outcome = tokio::select! {
            command = commands.recv() => match command {
                None => break,
                Some(Command::Signal(signal, reply)) => {
                    let outcome = guard.apply(signal);
                    let _ = reply.send(outcome);
                    outcome
                }
                Some(Command::TimeUp(reply)) => {
                    let outcome = guard.time_up();
                    let _ = reply.send(outcome);
                    outcome
                }
            },
            event = next_timer(&mut countdown) => match event {
                TimerEvent::Tick => guard.tick(),
                TimerEvent::Backup(epoch) => guard.backup_expired(epoch),
            },
        };

        match outcome {
            GuardOutcome::CountdownStarted { epoch, .. } => {
                countdown = Some(Countdown::start(epoch, grace_secs, tick_period));
            }
            GuardOutcome::Cured { .. } | GuardOutcome::AutoSubmit { .. } => {
                countdown = None;
            }
            GuardOutcome::CountdownTick { .. } | GuardOutcome::Ignored => {}
        }
        state.send_replace(guard.snapshot());

        if let GuardOutcome::AutoSubmit { is_violation } = outcome {
            tracing::info!(is_violation, "auto-submitting attempt");
            handler.auto_submit(is_violation).await;
            break;
        }
    }
}

/// Handle to a running session.
///
/// Dropping the handle closes the command channel, which ends the session
/// task and cancels any running timers.
pub struct ProctorHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ProctoringState>,
    task: JoinHandle<()>,
}

impl ProctorHandle {
    /// Feed an environment change to the guard and wait for its outcome.
    pub async fn signal(&self, signal: EnvironmentSignal) -> Result<GuardOutcome, ProctorError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Signal(signal, reply))
            .map_err(|_| ProctorError::SessionClosed)?;
        outcome.await.map_err(|_| ProctorError::SessionClosed)
    }

    /// The exam clock ran out; submit without a violation.
    pub async fn time_up(&self) -> Result<GuardOutcome, ProctorError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::TimeUp(reply))
            .map_err(|_| ProctorError::SessionClosed)?;
        outcome.await.map_err(|_| ProctorError::SessionClosed)
    }

    /// Latest published guard state.
    pub fn snapshot(&self) -> ProctoringState {
        *self.state.borrow()
    }

    /// Returns `true` once the session task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end on its own (after auto-submit) and
    /// return the final guard state.
    pub async fn finished(self) -> ProctoringState {
        let ProctorHandle {
            commands,
            state,
            task,
        } = self;
        // Keep the channel open so waiting does not itself end the session.
        let _commands = commands;
        let _ = task.await;
        let last = *state.borrow();
        last
    }

    /// End the session now, cancelling all timers.
    pub async fn shutdown(self) -> ProctoringState {
        let ProctorHandle { commands, state, task } = self;
        drop(commands);
        let _ = task.await;
        let last = *state.borrow();
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::ViolationReason;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<bool>>,
    }

    impl RecordingHandler {
        fn calls(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SubmitHandler for RecordingHandler {
        async fn auto_submit(&self, is_violation: bool) {
            self.calls.lock().unwrap().push(is_violation);
        }
    }

    fn spawn(config: GuardConfig) -> (ProctorHandle, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::default());
        let handle = ProctorSession::spawn(config, handler.clone());
        (handle, handler)
    }

    const HIDDEN: EnvironmentSignal = EnvironmentSignal::Detected(ViolationReason::TabHidden);

    #[tokio::test(start_paused = true)]
    async fn grace_period_expiry_submits_exactly_once() {
        let (handle, handler) = spawn(GuardConfig::default());

        let outcome = handle.signal(HIDDEN).await.unwrap();
        assert!(matches!(
            outcome,
            GuardOutcome::CountdownStarted {
                remaining_secs: 10,
                ..
            }
        ));

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(handle.snapshot().violation.unwrap().remaining_secs, 5);
        assert!(handler.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(handler.calls(), vec![true]);
        assert!(handle.snapshot().submitted);

        // Past the backup deadline as well.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handler.calls(), vec![true]);
        assert_eq!(
            handle.signal(HIDDEN).await,
            Err(ProctorError::SessionClosed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn curing_in_time_cancels_both_timers() {
        let (handle, handler) = spawn(GuardConfig::default());

        handle.signal(HIDDEN).await.unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;
        let outcome = handle.signal(EnvironmentSignal::Cleared).await.unwrap();
        assert_eq!(
            outcome,
            GuardOutcome::Cured {
                strike_count: 1,
                final_warning_armed: false
            }
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(handler.calls().is_empty());
        let state = handle.snapshot();
        assert!(state.violation.is_none());
        assert!(!state.submitted);
        assert!(!handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn strike_escalation_submits_without_grace() {
        let (handle, handler) = spawn(GuardConfig::default());

        for _ in 0..3 {
            handle.signal(HIDDEN).await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            handle.signal(EnvironmentSignal::Cleared).await.unwrap();
        }
        assert!(handle.snapshot().final_warning_armed);
        assert_eq!(handle.snapshot().strike_count, 3);

        let outcome = handle
            .signal(EnvironmentSignal::Detected(ViolationReason::FullscreenExited))
            .await
            .unwrap();
        assert_eq!(outcome, GuardOutcome::AutoSubmit { is_violation: true });

        let last = handle.finished().await;
        assert_eq!(handler.calls(), vec![true]);
        assert!(last.submitted);
        assert_eq!(last.strike_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reentrant_signals_do_not_reset_countdown() {
        let (handle, handler) = spawn(GuardConfig {
            grace_secs: 3,
            max_strikes: 3,
        });

        handle.signal(HIDDEN).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        let outcome = handle
            .signal(EnvironmentSignal::Detected(ViolationReason::WindowBlurred))
            .await
            .unwrap();
        assert_eq!(outcome, GuardOutcome::Ignored);

        handle.finished().await;
        assert_eq!(handler.calls(), vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn time_up_submits_without_violation() {
        let (handle, handler) = spawn(GuardConfig::default());
        handle.signal(HIDDEN).await.unwrap();
        assert_eq!(
            handle.time_up().await.unwrap(),
            GuardOutcome::AutoSubmit {
                is_violation: false
            }
        );
        handle.finished().await;
        assert_eq!(handler.calls(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn backup_timer_submits_once_when_ticks_stall() {
        let handler = Arc::new(RecordingHandler::default());
        // Primary ticks never arrive within the grace period.
        let handle = ProctorSession::spawn_with_period(
            GuardConfig::default(),
            handler.clone(),
            Duration::from_secs(3_600),
        );

        handle.signal(HIDDEN).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10_250)).await;
        assert!(handler.calls().is_empty());
        assert_eq!(handle.snapshot().violation.unwrap().remaining_secs, 10);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(handler.calls(), vec![true]);
        assert!(handle.is_finished());

        let last = handle.finished().await;
        assert!(last.submitted);
        assert_eq!(last.strike_count, 1);
        assert!(last.violation.is_none());
        assert_eq!(handler.calls(), vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_running_countdown() {
        let (handle, handler) = spawn(GuardConfig::default());
        handle.signal(HIDDEN).await.unwrap();
        let last = handle.shutdown().await;
        assert!(!last.submitted);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(handler.calls().is_empty());
    }
}
