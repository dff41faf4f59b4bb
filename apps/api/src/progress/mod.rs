//! ProgressHub (C4): in-process pub-sub multiplexing per-job progress events
//! to many long-lived subscribers with bounded memory (spec §4.4).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

const SUBSCRIBER_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Progress,
    Complete,
    Failed,
    Cancelled,
    Lagged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub job_id: Uuid,
    pub percent: u8,
    pub stage: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

struct Subscriber {
    tx: mpsc::Sender<ProgressEvent>,
    /// Set when a prior publish found this subscriber's buffer full; the
    /// flag rides on the next event actually delivered to *this*
    /// subscriber only (spec §4.4), never on other subscribers' events.
    lagged: bool,
}

struct JobChannel {
    subscribers: Vec<Subscriber>,
    /// Last event delivered per stage, replayed to a subscriber attaching
    /// after that stage already fired (spec §4.4).
    last_per_stage: BTreeMap<String, ProgressEvent>,
}

impl JobChannel {
    fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            last_per_stage: BTreeMap::new(),
        }
    }
}

/// Owned singleton per process (spec §9: global mutable state becomes an
/// owned, explicitly synchronized structure).
#[derive(Default)]
pub struct ProgressHub {
    jobs: DashMap<Uuid, Arc<Mutex<JobChannel>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel_for(&self, job_id: Uuid) -> Arc<Mutex<JobChannel>> {
        self.jobs
            .entry(job_id)
            .or_insert_with(|| Arc::new(Mutex::new(JobChannel::new())))
            .clone()
    }

    /// Subscribe returns a receiver that replays the most recent event per
    /// stage before live events, so a late subscriber observes current state.
    pub fn subscribe(&self, job_id: Uuid) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let channel = self.channel_for(job_id);
        let mut guard = channel.lock();
        for event in guard.last_per_stage.values() {
            let _ = tx.try_send(event.clone());
        }
        guard.subscribers.push(Subscriber { tx, lagged: false });
        rx
    }

    /// Unsubscribe is implicit: a subscriber's receiver being dropped makes
    /// `tx.try_send` fail, and the next publish prunes it (spec §4.4:
    /// disconnect detected "promptly", not necessarily the same tick).
    pub fn publish(&self, job_id: Uuid, event: ProgressEvent) {
        let channel = self.channel_for(job_id);
        let mut guard = channel.lock();
        guard.last_per_stage.insert(event.stage.clone(), event.clone());

        guard.subscribers.retain_mut(|sub| {
            // Oldest-drop: this subscriber's buffer is full, so the event
            // that would have filled it is dropped and we flag its next
            // delivered event as lagged — the event clone sent to every
            // other subscriber this publish stays untouched.
            let mut to_send = event.clone();
            if sub.lagged {
                to_send.kind = EventKind::Lagged;
            }
            match sub.tx.try_send(to_send) {
                Ok(()) => {
                    sub.lagged = false;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    sub.lagged = true;
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    pub fn unsubscribe_all(&self, job_id: Uuid) {
        self.jobs.remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(job_id: Uuid, percent: u8, stage: &str) -> ProgressEvent {
        ProgressEvent {
            kind: EventKind::Progress,
            job_id,
            percent,
            stage: stage.to_string(),
            message: String::new(),
            timestamp: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let hub = ProgressHub::new();
        let job_id = Uuid::new_v4();
        let mut rx = hub.subscribe(job_id);
        hub.publish(job_id, event(job_id, 10, "parse"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.percent, 10);
        assert_eq!(received.stage, "parse");
    }

    #[tokio::test]
    async fn test_late_subscriber_replays_last_event_per_stage() {
        let hub = ProgressHub::new();
        let job_id = Uuid::new_v4();
        hub.publish(job_id, event(job_id, 10, "parse"));
        hub.publish(job_id, event(job_id, 45, "parse"));
        hub.publish(job_id, event(job_id, 60, "embed"));

        let mut rx = hub.subscribe(job_id);
        let mut seen = Vec::new();
        while let Ok(e) = rx.try_recv() {
            seen.push((e.stage, e.percent));
        }
        seen.sort();
        assert_eq!(seen, vec![("embed".to_string(), 60), ("parse".to_string(), 45)]);
    }

    #[tokio::test]
    async fn test_overflow_sets_lagged_flag_without_blocking_publisher() {
        let hub = ProgressHub::new();
        let job_id = Uuid::new_v4();
        let _rx = hub.subscribe(job_id);
        for i in 0..(SUBSCRIBER_BUFFER as u8 + 5) {
            hub.publish(job_id, event(job_id, i, "embed"));
        }
        // Publisher must not block or panic even though the subscriber never drained.
    }

    #[tokio::test]
    async fn test_lagged_flag_is_per_subscriber_not_shared() {
        let hub = ProgressHub::new();
        let job_id = Uuid::new_v4();
        let mut rx1 = hub.subscribe(job_id);
        let mut rx2 = hub.subscribe(job_id);

        // Fill both subscribers' buffers to capacity.
        for i in 0..SUBSCRIBER_BUFFER {
            hub.publish(job_id, event(job_id, i as u8, "embed"));
        }
        // Drain rx2 completely so it has room again; rx1 stays full.
        while rx2.try_recv().is_ok() {}

        // rx1 is still full: this publish is dropped for rx1 (lagged set
        // internally) but delivered normally to rx2.
        hub.publish(job_id, event(job_id, 99, "embed"));
        let to_rx2 = rx2.try_recv().expect("rx2 had room");
        assert_eq!(to_rx2.kind, EventKind::Progress);
        assert_eq!(to_rx2.percent, 99);

        // Free exactly one slot in rx1, then publish again: the event that
        // lands in that slot must carry the lagged marker for rx1 only.
        let _ = rx1.try_recv();
        hub.publish(job_id, event(job_id, 100, "embed"));

        let mut rx1_saw_lagged = false;
        while let Ok(e) = rx1.try_recv() {
            if e.percent == 100 {
                assert_eq!(e.kind, EventKind::Lagged);
                rx1_saw_lagged = true;
            }
        }
        assert!(rx1_saw_lagged, "rx1 should observe its lagged marker on the next delivered event");

        // rx2 never lagged and must never see a Lagged-tagged event.
        hub.publish(job_id, event(job_id, 101, "embed"));
        let to_rx2 = rx2.try_recv().expect("rx2 had room");
        assert_eq!(to_rx2.kind, EventKind::Progress);
    }

    #[tokio::test]
    async fn test_unsubscribe_all_drops_retained_state() {
        let hub = ProgressHub::new();
        let job_id = Uuid::new_v4();
        hub.publish(job_id, event(job_id, 10, "parse"));
        hub.unsubscribe_all(job_id);
        let mut rx = hub.subscribe(job_id);
        assert!(rx.try_recv().is_err());
    }
}
