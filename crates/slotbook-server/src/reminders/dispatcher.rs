use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use slotbook_core::time::to_millis;

use super::ReminderConfig;
use crate::notifications::{NotificationError, Notifier};
use crate::storage::{BookingDatabase, DatabaseError, DueReminder};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Reminders found due (after per-user deduplication).
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// The sweep did not run because a previous one was still in flight.
    pub skipped: bool,
}

/// Message sent to a participant shortly before their event.
pub fn reminder_text(reminder: &DueReminder) -> String {
    let greeting = if reminder.user_name.is_empty() {
        "Hi!".to_string()
    } else {
        format!("Hi, {}!", reminder.user_name)
    };
    format!(
        "{greeting} Reminder: your event starts at {} UTC. You are booked in slot #{}.",
        reminder.start_time().format("%Y-%m-%d %H:%M"),
        reminder.slot_index + 1
    )
}

/// Shortest period the sweep loop will tick at.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// End of the lookahead window starting at `now`, saturating at the latest
/// representable time.
fn window_end(now: DateTime<Utc>, lookahead: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(lookahead)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or_else(|| {
            warn!(
                lookahead_secs = lookahead.as_secs(),
                "Reminder lookahead out of range, treating window as unbounded"
            );
            DateTime::<Utc>::MAX_UTC
        })
}

/// Finds bookings whose event starts soon and notifies their occupants.
pub struct ReminderDispatcher<N> {
    db: BookingDatabase,
    notifier: N,
    config: ReminderConfig,
    running: AtomicBool,
}

/// Clears the running flag when a sweep ends, including on early return.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<N: Notifier + 'static> ReminderDispatcher<N> {
    pub const fn new(db: BookingDatabase, notifier: N, config: ReminderConfig) -> Self {
        Self {
            db,
            notifier,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Run one sweep against the current clock.
    pub async fn run_cycle(&self) -> Result<CycleReport, DatabaseError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one sweep treating `now` as the current time.
    ///
    /// A failed send is logged and left unmarked so the next sweep retries it;
    /// it never aborts the rest of the sweep. Only the initial query can fail
    /// the whole cycle.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport, DatabaseError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Previous reminder sweep still running, skipping");
            return Ok(CycleReport {
                skipped: true,
                ..CycleReport::default()
            });
        }
        let _guard = RunningGuard(&self.running);

        let until = window_end(now, self.config.lookahead);
        let due = self
            .db
            .due_reminders(to_millis(now), to_millis(until))
            .await?;

        // Marking is per (event, user), so one reminder covers every slot the
        // user holds on that event.
        let mut seen = HashSet::new();
        let due: Vec<DueReminder> = due
            .into_iter()
            .filter(|r| seen.insert((r.event_id, r.user_id)))
            .collect();

        let mut report = CycleReport {
            due: due.len(),
            ..CycleReport::default()
        };

        for reminder in &due {
            match self.send_one(reminder).await {
                Ok(()) => {
                    report.sent += 1;
                    if let Err(e) = self
                        .db
                        .mark_notification_sent(reminder.event_id, reminder.user_id)
                        .await
                    {
                        // The user will get a duplicate on the next sweep.
                        warn!(
                            error = %e,
                            event_id = reminder.event_id,
                            user_id = reminder.user_id,
                            "Reminder sent but could not be marked"
                        );
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        error = %e,
                        booking_id = reminder.booking_id,
                        event_id = reminder.event_id,
                        user_id = reminder.user_id,
                        "Reminder send failed, will retry next sweep"
                    );
                }
            }
        }

        if report.due > 0 {
            info!(
                due = report.due,
                sent = report.sent,
                failed = report.failed,
                "Reminder sweep completed"
            );
        } else {
            debug!("Reminder sweep found nothing due");
        }

        Ok(report)
    }

    async fn send_one(&self, reminder: &DueReminder) -> Result<(), NotificationError> {
        let text = reminder_text(reminder);
        tokio::time::timeout(
            self.config.send_timeout,
            self.notifier.send_message(reminder.user_id, &text),
        )
        .await
        .map_err(|_| NotificationError::Timeout(self.config.send_timeout))?
    }

    /// Spawn the sweep loop; it stops when `shutdown` flips or its sender drops.
    ///
    /// The first sweep runs immediately. Sweeps run back to back in one task,
    /// and ticks missed while a slow sweep was in flight are skipped.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = if self.config.interval.is_zero() {
                warn!(
                    fallback_ms = MIN_INTERVAL.as_millis(),
                    "Reminder interval is zero, using fallback"
                );
                MIN_INTERVAL
            } else {
                self.config.interval
            };
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                interval_secs = self.config.interval.as_secs(),
                lookahead_secs = self.config.lookahead.as_secs(),
                "Reminder dispatcher started"
            );

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        if let Err(e) = self.run_cycle().await {
                            warn!(error = %e, "Reminder sweep failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Reminder dispatcher shutting down");
                            return;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Records every message; fails for users listed in `failing`.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(i64, String)>>,
        attempts: AtomicUsize,
        failing: Mutex<HashSet<i64>>,
        delay: Option<Duration>,
    }

    impl RecordingNotifier {
        fn failing_for(user_id: i64) -> Self {
            let notifier = Self::default();
            notifier.failing.lock().unwrap().insert(user_id);
            notifier
        }

        fn recover(&self, user_id: i64) {
            self.failing.lock().unwrap().remove(&user_id);
        }

        fn sent_to(&self) -> Vec<i64> {
            self.sent.lock().unwrap().iter().map(|(u, _)| *u).collect()
        }
    }

    impl Notifier for RecordingNotifier {
        async fn send_message(&self, user_id: i64, text: &str) -> Result<(), NotificationError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.lock().unwrap().contains(&user_id) {
                return Err(NotificationError::Request("connection refused".to_string()));
            }
            self.sent.lock().unwrap().push((user_id, text.to_string()));
            Ok(())
        }
    }

    fn test_config() -> ReminderConfig {
        ReminderConfig {
            interval: Duration::from_millis(20),
            lookahead: Duration::from_secs(15 * 60),
            send_timeout: Duration::from_millis(200),
        }
    }

    async fn seeded_db(start_in: chrono::Duration, bookings: &[(i64, i64)]) -> (BookingDatabase, i64) {
        let db = BookingDatabase::open_in_memory().await.unwrap();
        let event = db.create_event(1, 5, Utc::now() + start_in).await.unwrap();
        for &(slot, user) in bookings {
            db.insert_booking(event.id, slot, user, "name", "")
                .await
                .unwrap();
        }
        (db, event.id)
    }

    #[tokio::test]
    async fn due_booking_is_reminded_once() {
        let (db, event_id) = seeded_db(chrono::Duration::minutes(10), &[(0, 42)]).await;
        let dispatcher =
            ReminderDispatcher::new(db.clone(), RecordingNotifier::default(), test_config());

        let first = dispatcher.run_cycle().await.unwrap();
        assert_eq!(first.due, 1);
        assert_eq!(first.sent, 1);
        assert_eq!(dispatcher.notifier().sent_to(), vec![42]);

        let booking = db.get_slot_booking(event_id, 0).await.unwrap().unwrap();
        assert!(booking.notification_sent);

        let second = dispatcher.run_cycle().await.unwrap();
        assert_eq!(second, CycleReport::default());
        assert_eq!(dispatcher.notifier().sent_to(), vec![42]);
    }

    #[tokio::test]
    async fn failed_send_is_retried_next_cycle() {
        let (db, event_id) = seeded_db(chrono::Duration::minutes(10), &[(0, 42), (1, 43)]).await;
        let dispatcher =
            ReminderDispatcher::new(db.clone(), RecordingNotifier::failing_for(42), test_config());

        let first = dispatcher.run_cycle().await.unwrap();
        assert_eq!((first.due, first.sent, first.failed), (2, 1, 1));
        assert_eq!(dispatcher.notifier().sent_to(), vec![43]);

        let failed = db.get_slot_booking(event_id, 0).await.unwrap().unwrap();
        assert!(!failed.notification_sent);

        dispatcher.notifier().recover(42);
        let second = dispatcher.run_cycle().await.unwrap();
        assert_eq!((second.due, second.sent, second.failed), (1, 1, 0));
        assert_eq!(dispatcher.notifier().sent_to(), vec![43, 42]);
    }

    #[tokio::test]
    async fn events_outside_window_are_ignored() {
        let (db, _) = seeded_db(chrono::Duration::hours(1), &[(0, 42)]).await;
        let past = db
            .create_event(1, 1, Utc::now() - chrono::Duration::minutes(1))
            .await
            .unwrap();
        db.insert_booking(past.id, 0, 43, "late", "").await.unwrap();

        let dispatcher = ReminderDispatcher::new(db, RecordingNotifier::default(), test_config());
        let report = dispatcher.run_cycle().await.unwrap();
        assert_eq!(report.due, 0);
        assert!(dispatcher.notifier().sent_to().is_empty());
    }

    #[tokio::test]
    async fn window_closing_stops_retries() {
        let (db, _) = seeded_db(chrono::Duration::minutes(10), &[(0, 42)]).await;
        let dispatcher =
            ReminderDispatcher::new(db, RecordingNotifier::failing_for(42), test_config());

        dispatcher.run_cycle().await.unwrap();
        let after_start = Utc::now() + chrono::Duration::minutes(11);
        let report = dispatcher.run_cycle_at(after_start).await.unwrap();
        assert_eq!(report.due, 0);
        assert_eq!(dispatcher.notifier().attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_reminder_per_user_per_event() {
        let (db, event_id) = seeded_db(chrono::Duration::minutes(5), &[(0, 42), (3, 42)]).await;
        let dispatcher =
            ReminderDispatcher::new(db.clone(), RecordingNotifier::default(), test_config());

        let report = dispatcher.run_cycle().await.unwrap();
        assert_eq!((report.due, report.sent), (1, 1));
        assert!(
            db.list_event_bookings(event_id)
                .await
                .unwrap()
                .iter()
                .all(|b| b.notification_sent)
        );
    }

    #[tokio::test]
    async fn hung_send_times_out_and_is_not_marked() {
        let (db, event_id) = seeded_db(chrono::Duration::minutes(5), &[(0, 42)]).await;
        let notifier = RecordingNotifier {
            delay: Some(Duration::from_secs(5)),
            ..RecordingNotifier::default()
        };
        let dispatcher = ReminderDispatcher::new(db.clone(), notifier, test_config());

        let report = dispatcher.run_cycle().await.unwrap();
        assert_eq!((report.sent, report.failed), (0, 1));
        let booking = db.get_slot_booking(event_id, 0).await.unwrap().unwrap();
        assert!(!booking.notification_sent);
    }

    #[tokio::test]
    async fn overlapping_cycle_is_skipped() {
        let (db, _) = seeded_db(chrono::Duration::minutes(5), &[(0, 42)]).await;
        let notifier = RecordingNotifier {
            delay: Some(Duration::from_millis(100)),
            ..RecordingNotifier::default()
        };
        let dispatcher = Arc::new(ReminderDispatcher::new(db, notifier, test_config()));

        let slow = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.run_cycle().await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        let overlapping = dispatcher.run_cycle().await.unwrap();
        assert!(overlapping.skipped);

        let finished = slow.await.unwrap().unwrap();
        assert_eq!(finished.sent, 1);
        assert!(!dispatcher.running.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn spawned_loop_sends_and_stops_on_shutdown() {
        let (db, event_id) = seeded_db(chrono::Duration::minutes(5), &[(0, 42)]).await;
        let dispatcher = Arc::new(ReminderDispatcher::new(
            db.clone(),
            RecordingNotifier::default(),
            test_config(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Arc::clone(&dispatcher).spawn(shutdown_rx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("dispatcher did not stop")
            .unwrap();

        assert_eq!(dispatcher.notifier().sent_to(), vec![42]);
        let booking = db.get_slot_booking(event_id, 0).await.unwrap().unwrap();
        assert!(booking.notification_sent);
    }

    #[tokio::test]
    async fn huge_lookahead_saturates_instead_of_failing() {
        let (db, _) = seeded_db(chrono::Duration::days(365), &[(0, 42)]).await;
        let config = ReminderConfig {
            lookahead: Duration::from_secs(1_000_000_000_000_000),
            ..test_config()
        };
        let dispatcher = ReminderDispatcher::new(db, RecordingNotifier::default(), config);

        let report = dispatcher.run_cycle().await.unwrap();
        assert_eq!((report.due, report.sent), (1, 1));
    }

    #[test]
    fn window_end_saturates_at_max() {
        let now = Utc::now();
        assert_eq!(
            window_end(now, Duration::from_secs(u64::MAX)),
            DateTime::<Utc>::MAX_UTC
        );
        assert_eq!(
            window_end(now, Duration::from_secs(60)),
            now + chrono::Duration::seconds(60)
        );
    }

    #[tokio::test]
    async fn zero_interval_loop_runs_and_stops_cleanly() {
        let (db, _) = seeded_db(chrono::Duration::minutes(5), &[(0, 42)]).await;
        let config = ReminderConfig {
            interval: Duration::ZERO,
            ..test_config()
        };
        let dispatcher = Arc::new(ReminderDispatcher::new(
            db,
            RecordingNotifier::default(),
            config,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Arc::clone(&dispatcher).spawn(shutdown_rx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        let joined = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("dispatcher did not stop");
        assert!(joined.is_ok(), "dispatcher task panicked: {joined:?}");
        assert_eq!(dispatcher.notifier().sent_to(), vec![42]);
    }

    #[test]
    fn reminder_text_mentions_time_and_slot() {
        let reminder = DueReminder {
            booking_id: 1,
            event_id: 1,
            slot_index: 0,
            user_id: 42,
            user_name: "Alice".to_string(),
            start_time_ms: 1_735_725_600_000,
        };
        let text = reminder_text(&reminder);
        assert!(text.contains("2025-01-01 10:00"), "text: {text}");
        assert!(text.contains("slot #1"), "text: {text}");
        assert!(text.starts_with("Hi, Alice!"), "text: {text}");
    }
}
