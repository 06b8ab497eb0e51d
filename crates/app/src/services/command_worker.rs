//! Command worker: drains the queue one batch at a time.
//!
//! For each batch the worker takes the executor guard once, runs every
//! command in enqueue order, then issues the batch's single confirmation
//! read before letting go. Nothing else reaches the remote API in between.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use hvacq_domain::attribute::Source;
use hvacq_domain::command::{Batch, Command, CommandAction, CommandKey, ConfirmationRequest};
use hvacq_domain::event::EventKind;
use hvacq_domain::remote::ApiError;
use hvacq_domain::target::{AttributeKind, Target};
use hvacq_domain::time::Timestamp;

use super::command_queue::CommandQueue;
use super::context::BridgeContext;
use super::debounce_gate::DebounceGate;
use super::executor::ExecutorGuard;
use crate::ports::{EventPublisher, RemoteApi, SessionRefresher};
use crate::settings::RetryPolicy;

/// Outcome of one drained batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub executed: Vec<Target>,
    pub failed: Vec<Target>,
    /// Whether the confirmation read ran and succeeded.
    pub confirmed: bool,
}

struct CommandFailure {
    error: ApiError,
    attempts: u32,
}

pub struct CommandWorker<A, S, P> {
    context: Arc<BridgeContext<A, S, P>>,
    queue: Arc<CommandQueue>,
    gate: DebounceGate,
    retry: RetryPolicy,
    settle_max: Duration,
}

impl<A, S, P> CommandWorker<A, S, P>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    pub fn new(
        context: Arc<BridgeContext<A, S, P>>,
        queue: Arc<CommandQueue>,
        gate: DebounceGate,
        retry: RetryPolicy,
        settle_max: Duration,
    ) -> Self {
        Self {
            context,
            queue,
            gate,
            retry,
            settle_max,
        }
    }

    /// Run the drain loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        loop {
            let batch = self.next_batch().await;
            self.process(batch).await;
        }
    }

    /// Wait for work, let in-flight debounce windows settle, then drain.
    pub async fn next_batch(&self) -> Batch {
        loop {
            self.queue.ready().await;
            if tokio::time::timeout(self.settle_max, self.gate.wait_idle())
                .await
                .is_err()
            {
                tracing::debug!(
                    pending = self.gate.pending(),
                    "settle window elapsed, draining anyway"
                );
            }
            if let Some(batch) = self.queue.drain() {
                return batch;
            }
        }
    }

    /// Execute `batch` and confirm the commands that succeeded.
    pub async fn process(&self, batch: Batch) -> BatchReport {
        tracing::info!(commands = batch.len(), "executing batch");
        let guard = self.context.executor.acquire().await;
        let mut report = BatchReport::default();
        // newest submission applied per key
        let mut applied: HashMap<CommandKey, Timestamp> = HashMap::new();

        for command in batch {
            let target = command.target();
            match self.execute(&guard, &command).await {
                Ok(attempts) => {
                    tracing::debug!(attribute = %target, attempts, "command applied");
                    report.executed.push(target);
                    applied
                        .entry(command.key().clone())
                        .and_modify(|at| *at = (*at).max(command.submitted_at()))
                        .or_insert(command.submitted_at());
                }
                Err(CommandFailure { error, attempts }) => {
                    tracing::warn!(attribute = %target, attempts, error = %error, "command dropped");
                    self.context
                        .publish(EventKind::CommandFailed {
                            target,
                            value: command.value().clone(),
                            reason: error.to_string(),
                            attempts,
                        })
                        .await;
                    report.failed.push(target);
                }
            }
        }

        if let Some(confirmation) = ConfirmationRequest::new(report.executed.iter().copied()) {
            report.confirmed = self.confirm(&guard, &confirmation, &applied).await;
        }
        report
    }

    async fn execute(
        &self,
        guard: &ExecutorGuard<'_, A, S, P>,
        command: &Command,
    ) -> Result<u32, CommandFailure> {
        let request = command.request(self.context.home, self.current_setpoint(command));
        let mut attempts = 1;
        loop {
            match guard.call(&request).await {
                Ok(_) => return Ok(attempts),
                Err(error) if error.is_transient() && attempts <= self.retry.max_retries => {
                    let delay = self.retry.backoff(attempts);
                    tracing::debug!(
                        %request,
                        attempts,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempts += 1;
                }
                Err(error) => return Err(CommandFailure { error, attempts }),
            }
        }
    }

    fn current_setpoint(&self, command: &Command) -> Option<f64> {
        let CommandAction::HoldSetpoint { zone } = command.action() else {
            return None;
        };
        self.context
            .cache
            .get(&Target::zone(zone, AttributeKind::TargetTemperature))
            .and_then(|attribute| attribute.value.as_f64())
    }

    /// Re-read the batch's targets. On success, clears optimistic values
    /// submitted no later than the command that was applied for their key;
    /// anything the user asked for since stays visible.
    async fn confirm(
        &self,
        guard: &ExecutorGuard<'_, A, S, P>,
        confirmation: &ConfirmationRequest,
        applied: &HashMap<CommandKey, Timestamp>,
    ) -> bool {
        let mut complete = true;
        for read in confirmation.reads(self.context.home) {
            match guard.call(&read).await {
                Ok(response) => {
                    self.context.apply(&response.body, Source::Confirmation).await;
                }
                Err(error) => {
                    tracing::warn!(%read, error = %error, "confirmation read failed");
                    complete = false;
                }
            }
        }
        if !complete {
            return false;
        }

        self.context.cache.clear_optimistic(|target, submitted_at| {
            confirmation.covers(target)
                && applied
                    .get(&CommandKey::for_target(target))
                    .is_some_and(|cutoff| submitted_at <= *cutoff)
        });
        let targets: Vec<_> = confirmation.targets().iter().copied().collect();
        tracing::info!(targets = targets.len(), "batch confirmed");
        self.context
            .publish(EventKind::BatchConfirmed { targets })
            .await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        HOME, RecordingRefresher, ScriptedApi, SpyPublisher, TestContext, context, overlay,
        rejected, transient,
    };
    use crate::services::poller::DualTrackPoller;
    use crate::settings::PollSchedule;
    use hvacq_domain::command::Intent;
    use hvacq_domain::id::ZoneId;
    use hvacq_domain::remote::{ApiRequest, Endpoint, Method};
    use hvacq_domain::target::Track;
    use hvacq_domain::time::now;
    use hvacq_domain::value::{AttributeValue, Presence};

    type TestWorker = CommandWorker<Arc<ScriptedApi>, Arc<RecordingRefresher>, SpyPublisher>;

    fn worker(context: &Arc<TestContext>) -> (TestWorker, DebounceGate) {
        let queue = Arc::new(CommandQueue::new());
        let gate = DebounceGate::new(Duration::from_secs(5), Arc::clone(&queue));
        let worker = CommandWorker::new(
            Arc::clone(context),
            queue,
            gate.clone(),
            RetryPolicy::default(),
            Duration::from_secs(5),
        );
        (worker, gate)
    }

    fn auto_mode(zone: u64, on: bool) -> Intent {
        Intent::new(
            Target::zone(ZoneId::new(zone), AttributeKind::AutoMode),
            AttributeValue::Bool(on),
            now(),
        )
        .unwrap()
    }

    fn batch(intents: Vec<Intent>) -> Batch {
        Batch::new(intents.into_iter().map(Command::from_intent).collect())
    }

    fn zone_states() -> ApiRequest {
        ApiRequest::get(Endpoint::ZoneStates { home: HOME })
    }

    #[tokio::test]
    async fn should_issue_one_confirmation_for_whole_batch() {
        let api = Arc::new(ScriptedApi::new(5));
        let (context, publisher) = context(&api);
        let (worker, _) = worker(&context);

        let report = worker
            .process(batch((1..=5).map(|z| auto_mode(z, false)).collect()))
            .await;

        assert_eq!(report.executed.len(), 5);
        assert!(report.confirmed);
        let calls = api.calls();
        assert_eq!(calls.len(), 6);
        assert!(calls[..5].iter().all(|c| c.method == Method::Put));
        assert_eq!(calls[5], zone_states());

        let confirmed: Vec<_> = publisher
            .kinds()
            .into_iter()
            .filter_map(|k| match k {
                EventKind::BatchConfirmed { targets } => Some(targets),
                _ => None,
            })
            .collect();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].len(), 5);
    }

    #[tokio::test]
    async fn should_confirm_presence_and_zones_with_one_read_each() {
        let api = Arc::new(ScriptedApi::new(2));
        let (context, _) = context(&api);
        let (worker, _) = worker(&context);
        let presence = Intent::new(
            Target::home(HOME, AttributeKind::Presence),
            AttributeValue::Presence(Presence::Away),
            now(),
        )
        .unwrap();

        worker
            .process(batch(vec![presence, auto_mode(1, false), auto_mode(2, false)]))
            .await;

        let reads: Vec<_> = api.calls().into_iter().filter(ApiRequest::is_read).collect();
        assert_eq!(
            reads,
            vec![
                ApiRequest::get(Endpoint::HomeState { home: HOME }),
                zone_states()
            ]
        );
        assert_eq!(
            context
                .cache
                .get(&Target::home(HOME, AttributeKind::Presence))
                .unwrap()
                .value,
            AttributeValue::Presence(Presence::Away)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_transient_failure_up_to_bound_then_drop() {
        let api = Arc::new(ScriptedApi::new(1));
        for _ in 0..4 {
            api.fail(overlay(1), transient("connection reset"));
        }
        let (context, publisher) = context(&api);
        let (worker, _) = worker(&context);

        let report = worker.process(batch(vec![auto_mode(1, true)])).await;

        assert_eq!(report.failed.len(), 1);
        assert!(!report.confirmed);
        assert_eq!(api.calls().len(), 4);
        assert!(publisher.kinds().iter().any(|k| matches!(
            k,
            EventKind::CommandFailed { attempts: 4, .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn should_succeed_after_transient_failure() {
        let api = Arc::new(ScriptedApi::new(1));
        api.fail(overlay(1), transient("timeout"));
        let (context, _) = context(&api);
        let (worker, _) = worker(&context);

        let started = tokio::time::Instant::now();
        let report = worker.process(batch(vec![auto_mode(1, true)])).await;

        assert_eq!(report.executed.len(), 1);
        assert!(report.confirmed);
        assert_eq!(api.calls().len(), 3);
        assert!(started.elapsed() >= RetryPolicy::default().initial_backoff);
    }

    #[tokio::test]
    async fn should_drop_rejected_command_without_retry_and_continue_batch() {
        let api = Arc::new(ScriptedApi::new(2));
        api.fail(overlay(1), rejected(422));
        let (context, publisher) = context(&api);
        let (worker, _) = worker(&context);

        let report = worker
            .process(batch(vec![auto_mode(1, false), auto_mode(2, false)]))
            .await;

        assert_eq!(report.failed, vec![Target::zone(ZoneId::new(1), AttributeKind::AutoMode)]);
        assert_eq!(report.executed, vec![Target::zone(ZoneId::new(2), AttributeKind::AutoMode)]);
        let overlay_calls = api
            .calls()
            .iter()
            .filter(|c| c.endpoint == overlay(1))
            .count();
        assert_eq!(overlay_calls, 1);
        assert!(publisher.kinds().iter().any(|k| matches!(
            k,
            EventKind::BatchConfirmed { targets } if targets.len() == 1
        )));
    }

    #[tokio::test]
    async fn should_leave_optimistic_value_of_failed_command_in_place() {
        let api = Arc::new(ScriptedApi::new(1));
        api.fail(overlay(1), rejected(422));
        let (context, _) = context(&api);
        let (worker, _) = worker(&context);
        let target = Target::zone(ZoneId::new(1), AttributeKind::AutoMode);
        let intent = auto_mode(1, false);
        context
            .cache
            .set_optimistic(target, AttributeValue::Bool(false), intent.submitted_at());

        worker.process(batch(vec![intent])).await;

        assert!(context.cache.resolve(&target).unwrap().optimistic);
    }

    #[tokio::test]
    async fn should_write_confirmed_values_and_clear_optimistic() {
        let api = Arc::new(ScriptedApi::new(1));
        let (context, _) = context(&api);
        let (worker, _) = worker(&context);
        let target = Target::zone(ZoneId::new(1), AttributeKind::AutoMode);
        let intent = auto_mode(1, false);
        context
            .cache
            .set_optimistic(target, AttributeValue::Bool(false), intent.submitted_at());

        worker.process(batch(vec![intent])).await;

        let resolved = context.cache.resolve(&target).unwrap();
        assert!(!resolved.optimistic);
        assert_eq!(resolved.value, AttributeValue::Bool(false));
        assert_eq!(context.cache.get(&target).unwrap().source, Source::Confirmation);
    }

    #[tokio::test]
    async fn should_keep_optimistic_value_submitted_after_batch_was_drained() {
        let api = Arc::new(ScriptedApi::new(1));
        let (context, _) = context(&api);
        let (worker, _) = worker(&context);
        let target = Target::zone(ZoneId::new(1), AttributeKind::AutoMode);
        let drained = auto_mode(1, false);
        let newer = drained.submitted_at() + chrono::Duration::seconds(2);
        context
            .cache
            .set_optimistic(target, AttributeValue::Bool(true), newer);

        worker.process(batch(vec![drained])).await;

        let resolved = context.cache.resolve(&target).unwrap();
        assert!(resolved.optimistic);
        assert_eq!(resolved.value, AttributeValue::Bool(true));
        assert_eq!(
            context.cache.get(&target).unwrap().value,
            AttributeValue::Bool(false)
        );
    }

    #[tokio::test]
    async fn should_hold_cached_setpoint_when_powering_zone_on() {
        let api = Arc::new(ScriptedApi::new(1));
        let (context, _) = context(&api);
        let (worker, _) = worker(&context);
        context.cache.record(
            Target::zone(ZoneId::new(1), AttributeKind::TargetTemperature),
            AttributeValue::Float(17.0),
            Source::FastTrack,
            now(),
        );
        let power_on = Intent::new(
            Target::zone(ZoneId::new(1), AttributeKind::Power),
            AttributeValue::Bool(true),
            now(),
        )
        .unwrap();

        worker.process(batch(vec![power_on])).await;

        let payload = api.calls()[0].payload.clone().unwrap();
        assert_eq!(payload["setting"]["power"], "ON");
        assert_eq!(payload["setting"]["temperature"]["celsius"], 17.0);
    }

    #[tokio::test]
    async fn should_keep_cached_setpoint_when_leaving_schedule() {
        let api = Arc::new(ScriptedApi::new(1));
        let (context, _) = context(&api);
        let (worker, _) = worker(&context);
        context.cache.record(
            Target::zone(ZoneId::new(1), AttributeKind::TargetTemperature),
            AttributeValue::Float(18.5),
            Source::FastTrack,
            now(),
        );

        worker.process(batch(vec![auto_mode(1, false)])).await;

        let payload = api.calls()[0].payload.clone().unwrap();
        assert_eq!(payload["setting"]["temperature"]["celsius"], 18.5);
    }

    #[tokio::test(start_paused = true)]
    async fn should_gather_intents_from_overlapping_windows_into_one_batch() {
        let api = Arc::new(ScriptedApi::new(2));
        let (context, _) = context(&api);
        let (worker, gate) = worker(&context);

        gate.submit(auto_mode(1, false));
        tokio::time::sleep(Duration::from_secs(2)).await;
        gate.submit(auto_mode(2, false));

        let batch = worker.next_batch().await;

        assert_eq!(batch.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_queue_scheduled_poll_behind_executing_batch() {
        let api = Arc::new(ScriptedApi::new(3).with_latency(Duration::from_secs(1)));
        let (context, _) = context(&api);
        let (worker, _) = worker(&context);
        let poller = DualTrackPoller::new(
            Arc::clone(&context),
            PollSchedule::new(Duration::from_secs(60), Duration::from_secs(3600)).unwrap(),
            0,
        );

        let batch_task = tokio::spawn(async move {
            worker
                .process(batch((1..=3).map(|z| auto_mode(z, true)).collect()))
                .await
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        let poll_task = tokio::spawn(async move { poller.poll(Track::Fast).await });
        let report = batch_task.await.unwrap();
        poll_task.await.unwrap().unwrap();

        assert!(report.confirmed);
        let calls = api.calls();
        assert_eq!(calls.len(), 6);
        assert!(calls[..3].iter().all(|c| c.method == Method::Delete));
        assert_eq!(calls[3], zone_states());
        assert_eq!(
            calls[4..],
            [
                ApiRequest::get(Endpoint::HomeState { home: HOME }),
                zone_states()
            ]
        );
        assert_eq!(api.max_in_flight(), 1);
    }
}
