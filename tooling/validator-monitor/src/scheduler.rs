//! Repeating background jobs.
//!
//! Every run of a job is spawned as its own task, so a panic inside one run
//! is logged and the next firing still happens.

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use std::{future::Future, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error};

/// Runs `job` every `period`, starting one period from now.
pub fn spawn_interval_task<F, Fut>(name: &'static str, period: Duration, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_isolated(name, job()).await;
        }
    })
}

/// Runs `job` once a day at `hour:00` local time.
pub fn spawn_daily_task<F, Fut>(name: &'static str, hour: u32, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let wait = until_next_daily(Local::now(), hour);
            debug!(task = name, wait_seconds = wait.as_secs(), "waiting for daily run");
            time::sleep(wait).await;
            run_isolated(name, job()).await;
        }
    })
}

async fn run_isolated<Fut>(name: &'static str, run: Fut)
where
    Fut: Future<Output = ()> + Send + 'static,
{
    debug!(task = name, "running scheduled task");
    if let Err(join_error) = tokio::spawn(run).await {
        error!(task = name, error = %join_error, "scheduled task aborted");
    }
}

/// Time from `now` until the next `hour:00` strictly after it.
///
/// Days where that wall-clock time does not exist (DST gaps) are skipped.
pub fn until_next_daily<Tz: TimeZone>(now: DateTime<Tz>, hour: u32) -> Duration {
    let Some(at) = NaiveTime::from_hms_opt(hour, 0, 0) else {
        return Duration::from_secs(24 * 60 * 60);
    };

    let today = now.date_naive();
    for offset in 0..=2 {
        let Some(day) = today.checked_add_days(Days::new(offset)) else {
            continue;
        };
        let Some(target) = now.timezone().from_local_datetime(&day.and_time(at)).earliest() else {
            continue;
        };
        if target > now {
            return (target - now.clone()).to_std().unwrap_or(Duration::ZERO);
        }
    }

    Duration::from_secs(24 * 60 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn utc(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, hour, minute, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn waits_until_later_today() {
        assert_eq!(until_next_daily(utc(7, 30), 9), Duration::from_secs(90 * 60));
    }

    #[test]
    fn rolls_over_to_tomorrow() {
        assert_eq!(until_next_daily(utc(9, 0), 9), Duration::from_secs(24 * 60 * 60));
        assert_eq!(
            until_next_daily(utc(10, 0), 9),
            Duration::from_secs(23 * 60 * 60)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn interval_task_survives_a_panicking_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let handle = spawn_interval_task("flaky", Duration::from_secs(60), move || {
            let counter = counter.clone();
            async move {
                let run = counter.fetch_add(1, Ordering::SeqCst);
                assert!(run != 0, "first run fails");
            }
        });

        time::sleep(Duration::from_secs(3 * 60 + 1)).await;

        assert!(runs.load(Ordering::SeqCst) >= 2);
        handle.abort();
    }
}
