//! Dual-track poller: two independent cadences refreshing the cache.
//!
//! The fast track reads presence and zone operating state; the slow track
//! reads zone metadata and batteries. Both tick immediately on start, then
//! follow their own [`interval`](tokio::time::interval). A manual poll runs
//! both tracks out of cadence and leaves the timers alone.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use hvacq_domain::event::EventKind;
use hvacq_domain::remote::{ApiError, ApiRequest, Endpoint};
use hvacq_domain::target::Track;

use super::context::BridgeContext;
use crate::ports::{EventPublisher, RemoteApi, SessionRefresher};
use crate::settings::PollSchedule;

pub struct DualTrackPoller<A, S, P> {
    context: Arc<BridgeContext<A, S, P>>,
    schedule: PollSchedule,
    throttle_threshold: u32,
}

impl<A, S, P> DualTrackPoller<A, S, P>
where
    A: RemoteApi + 'static,
    S: SessionRefresher + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    pub fn new(
        context: Arc<BridgeContext<A, S, P>>,
        schedule: PollSchedule,
        throttle_threshold: u32,
    ) -> Self {
        Self {
            context,
            schedule,
            throttle_threshold,
        }
    }

    /// Spawn one task per track.
    pub fn spawn(self: &Arc<Self>) -> [JoinHandle<()>; 2] {
        [Track::Slow, Track::Fast].map(|track| tokio::spawn(Arc::clone(self).run_track(track)))
    }

    async fn run_track(self: Arc<Self>, track: Track) {
        let period = match track {
            Track::Fast => self.schedule.fast(),
            Track::Slow => self.schedule.slow(),
        };
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.is_throttled() {
                tracing::info!(
                    %track,
                    remaining = self.context.quota.current().map(|q| q.remaining),
                    threshold = self.throttle_threshold,
                    "quota low, skipping scheduled poll"
                );
                continue;
            }
            // failures are logged and published by poll()
            let _ = self.poll(track).await;
        }
    }

    /// Whether scheduled ticks should be skipped to save quota.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.throttle_threshold > 0
            && self
                .context
                .quota
                .current()
                .is_some_and(|quota| quota.remaining < self.throttle_threshold)
    }

    fn reads(&self, track: Track) -> Vec<ApiRequest> {
        let home = self.context.home;
        match track {
            Track::Fast => vec![
                ApiRequest::get(Endpoint::HomeState { home }),
                ApiRequest::get(Endpoint::ZoneStates { home }),
            ],
            Track::Slow => vec![ApiRequest::get(Endpoint::Zones { home })],
        }
    }

    /// Run one track now.
    ///
    /// Returns the number of attributes whose value changed.
    ///
    /// # Errors
    ///
    /// Returns the first failed read. Reads are not retried; the next tick
    /// tries again.
    pub async fn poll(&self, track: Track) -> Result<usize, ApiError> {
        let guard = self.context.executor.acquire().await;
        let mut changed = 0;
        for read in self.reads(track) {
            match guard.call(&read).await {
                Ok(response) => {
                    changed += self.context.apply(&response.body, track.into()).await;
                }
                Err(error) => {
                    tracing::warn!(%track, %read, error = %error, "poll failed");
                    self.context
                        .publish(EventKind::PollFailed {
                            track,
                            reason: error.to_string(),
                        })
                        .await;
                    return Err(error);
                }
            }
        }
        tracing::info!(%track, changed, "poll complete");
        Ok(changed)
    }

    /// Run the slow then the fast track immediately. Timers are untouched.
    ///
    /// # Errors
    ///
    /// Both tracks always run; the first failure is returned.
    pub async fn poll_all(&self) -> Result<(), ApiError> {
        let slow = self.poll(Track::Slow).await;
        let fast = self.poll(Track::Fast).await;
        slow.and(fast).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{
        HOME, RecordingRefresher, ScriptedApi, SpyPublisher, context, transient,
    };
    use hvacq_domain::attribute::Source;
    use hvacq_domain::id::ZoneId;
    use hvacq_domain::target::{AttributeKind, Target};
    use hvacq_domain::value::{AttributeValue, BatteryState};

    type TestPoller = DualTrackPoller<Arc<ScriptedApi>, Arc<RecordingRefresher>, SpyPublisher>;

    const FAST: Duration = Duration::from_secs(60);
    const SLOW: Duration = Duration::from_secs(600);

    fn poller(api: &Arc<ScriptedApi>, threshold: u32) -> (Arc<TestPoller>, Arc<SpyPublisher>) {
        let (context, publisher) = context(api);
        let schedule = PollSchedule::new(FAST, SLOW).unwrap();
        (
            Arc::new(DualTrackPoller::new(context, schedule, threshold)),
            publisher,
        )
    }

    fn count(api: &ScriptedApi, endpoint: Endpoint) -> usize {
        api.calls().iter().filter(|c| c.endpoint == endpoint).count()
    }

    #[tokio::test]
    async fn should_populate_fast_track_attributes() {
        let api = Arc::new(ScriptedApi::new(2));
        let (poller, _) = poller(&api, 0);

        let changed = poller.poll(Track::Fast).await.unwrap();

        // presence + 5 readings per zone
        assert_eq!(changed, 11);
        let presence = poller
            .context
            .cache
            .get(&Target::home(HOME, AttributeKind::Presence))
            .unwrap();
        assert_eq!(presence.source, Source::FastTrack);
        assert!(
            poller
                .context
                .cache
                .get(&Target::zone(ZoneId::new(1), AttributeKind::Battery))
                .is_none()
        );
    }

    #[tokio::test]
    async fn should_populate_slow_track_attributes() {
        let api = Arc::new(ScriptedApi::new(1));
        let (poller, _) = poller(&api, 0);

        poller.poll(Track::Slow).await.unwrap();

        let battery = poller
            .context
            .cache
            .get(&Target::zone(ZoneId::new(1), AttributeKind::Battery))
            .unwrap();
        assert_eq!(battery.value, AttributeValue::Battery(BatteryState::Normal));
        assert_eq!(battery.source, Source::SlowTrack);
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn should_report_no_changes_for_unchanged_second_poll() {
        let api = Arc::new(ScriptedApi::new(1));
        let (poller, _) = poller(&api, 0);
        poller.poll(Track::Fast).await.unwrap();

        assert_eq!(poller.poll(Track::Fast).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_publish_poll_failure_without_retrying() {
        let api = Arc::new(ScriptedApi::new(1));
        api.fail(Endpoint::HomeState { home: HOME }, transient("dns"));
        let (poller, publisher) = poller(&api, 0);

        assert!(poller.poll(Track::Fast).await.is_err());

        assert_eq!(api.calls().len(), 1);
        assert!(publisher.kinds().iter().any(|k| matches!(
            k,
            EventKind::PollFailed {
                track: Track::Fast,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn should_run_both_tracks_on_poll_all_even_if_one_fails() {
        let api = Arc::new(ScriptedApi::new(1));
        api.fail(Endpoint::Zones { home: HOME }, transient("reset"));
        let (poller, _) = poller(&api, 0);

        assert!(poller.poll_all().await.is_err());

        assert_eq!(count(&api, Endpoint::ZoneStates { home: HOME }), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_tick_both_tracks_immediately_then_on_cadence() {
        let api = Arc::new(ScriptedApi::new(1));
        let (poller, _) = poller(&api, 0);

        let handles = poller.spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count(&api, Endpoint::Zones { home: HOME }), 1);
        assert_eq!(count(&api, Endpoint::HomeState { home: HOME }), 1);

        tokio::time::sleep(FAST * 3).await;
        assert_eq!(count(&api, Endpoint::Zones { home: HOME }), 1);
        assert_eq!(count(&api, Endpoint::HomeState { home: HOME }), 4);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_reset_cadence_on_manual_poll() {
        let api = Arc::new(ScriptedApi::new(1));
        let (poller, _) = poller(&api, 0);
        let handles = poller.spawn();

        tokio::time::sleep(FAST / 2).await;
        poller.poll_all().await.unwrap();
        assert_eq!(count(&api, Endpoint::HomeState { home: HOME }), 2);

        // the scheduled tick still lands at FAST, not FAST / 2 + FAST
        tokio::time::sleep(FAST / 2 + Duration::from_secs(1)).await;
        assert_eq!(count(&api, Endpoint::HomeState { home: HOME }), 3);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_skip_scheduled_ticks_while_quota_is_low() {
        let api = Arc::new(ScriptedApi::new(1));
        let (poller, _) = poller(&api, 10);
        let handles = poller.spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count(&api, Endpoint::HomeState { home: HOME }), 1);

        api.set_remaining(5);
        poller.poll_all().await.unwrap();
        assert!(poller.is_throttled());

        tokio::time::sleep(FAST * 3).await;
        assert_eq!(count(&api, Endpoint::HomeState { home: HOME }), 2);

        // manual polls ignore the guard
        poller.poll_all().await.unwrap();
        assert_eq!(count(&api, Endpoint::HomeState { home: HOME }), 3);

        for handle in handles {
            handle.abort();
        }
    }
}
