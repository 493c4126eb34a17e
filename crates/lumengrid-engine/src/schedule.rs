//! Day/night auto-scheduling support.
//!
//! The engine consumes sunrise/sunset boundaries from a [`SunClock`] oracle
//! and arms a cancellable timer for the next one. The show runs between
//! sunset and sunrise.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::Serialize;

/// Kind of day/night boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SunEventKind {
    Sunrise,
    Sunset,
}

/// A day/night boundary in local time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunEvent {
    pub at: DateTime<Local>,
    pub kind: SunEventKind,
}

/// Oracle for the next day/night boundary.
///
/// Implementations may consult astronomical data; the engine only needs the
/// next boundary strictly after `now`.
pub trait SunClock: Send + Sync {
    fn next_event(&self, now: DateTime<Local>) -> Option<SunEvent>;
}

/// A [`SunClock`] with fixed local switch times.
///
/// The defaults stop the show at 06:00 and start it at 19:50, a conservative
/// envelope around actual sunrise and sunset.
#[derive(Debug, Clone, Copy)]
pub struct FixedHoursClock {
    sunrise: (u32, u32),
    sunset: (u32, u32),
}

impl FixedHoursClock {
    pub fn new(sunrise: (u32, u32), sunset: (u32, u32)) -> Self {
        Self { sunrise, sunset }
    }
}

impl Default for FixedHoursClock {
    fn default() -> Self {
        Self::new((6, 0), (19, 50))
    }
}

impl SunClock for FixedHoursClock {
    fn next_event(&self, now: DateTime<Local>) -> Option<SunEvent> {
        let today = now.date_naive();
        let tomorrow = today.succ_opt()?;
        let candidates = [
            (today, self.sunrise, SunEventKind::Sunrise),
            (today, self.sunset, SunEventKind::Sunset),
            (tomorrow, self.sunrise, SunEventKind::Sunrise),
        ];
        for (date, (hour, minute), kind) in candidates {
            let Some(at) = local_datetime(date, hour, minute) else {
                continue;
            };
            if at > now {
                return Some(SunEvent { at, kind });
            }
        }
        None
    }
}

fn local_datetime(date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Local>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    date.and_time(time).and_local_timezone(Local).earliest()
}

/// A one-shot timer thread that fires a task at a wallclock instant.
///
/// Cancellation is cooperative; a cancelled timer never runs its task.
/// Dropping the timer cancels it.
pub(crate) struct SunTimer {
    cancel: Arc<(Mutex<bool>, Condvar)>,
}

impl SunTimer {
    pub(crate) fn spawn(at: DateTime<Local>, task: impl FnOnce() + Send + 'static) -> Self {
        let cancel = Arc::new((Mutex::new(false), Condvar::new()));
        let shared = Arc::clone(&cancel);
        thread::spawn(move || {
            let (flag, condvar) = &*shared;
            let mut cancelled = flag.lock().unwrap();
            loop {
                if *cancelled {
                    return;
                }
                // Re-derive the remaining wait each pass; wallclock may jump.
                let remaining = (at - Local::now()).to_std().unwrap_or(Duration::ZERO);
                if remaining.is_zero() {
                    break;
                }
                let wait = remaining.min(Duration::from_secs(60));
                let (guard, _timeout) = condvar.wait_timeout(cancelled, wait).unwrap();
                cancelled = guard;
            }
            drop(cancelled);
            task();
        });
        Self { cancel }
    }

    pub(crate) fn cancel(&self) {
        let (flag, condvar) = &*self.cancel;
        *flag.lock().unwrap() = true;
        condvar.notify_all();
    }
}

impl Drop for SunTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .earliest()
            .expect("valid test datetime")
    }

    #[test]
    fn before_sunrise_the_next_event_is_sunrise() {
        let clock = FixedHoursClock::default();
        let event = clock.next_event(local(2024, 6, 1, 3, 0)).unwrap();
        assert_eq!(event.kind, SunEventKind::Sunrise);
        assert_eq!(event.at, local(2024, 6, 1, 6, 0));
    }

    #[test]
    fn during_the_day_the_next_event_is_sunset() {
        let clock = FixedHoursClock::default();
        let event = clock.next_event(local(2024, 6, 1, 12, 0)).unwrap();
        assert_eq!(event.kind, SunEventKind::Sunset);
        assert_eq!(event.at, local(2024, 6, 1, 19, 50));
    }

    #[test]
    fn after_sunset_the_next_event_is_tomorrow_sunrise() {
        let clock = FixedHoursClock::default();
        let event = clock.next_event(local(2024, 6, 1, 23, 0)).unwrap();
        assert_eq!(event.kind, SunEventKind::Sunrise);
        assert_eq!(event.at, local(2024, 6, 2, 6, 0));
    }

    #[test]
    fn boundary_is_strictly_after_now() {
        let clock = FixedHoursClock::default();
        let event = clock.next_event(local(2024, 6, 1, 6, 0)).unwrap();
        assert_eq!(event.kind, SunEventKind::Sunset);
    }

    #[test]
    fn timer_fires_for_past_instants_and_cancel_suppresses() {
        static FIRED: AtomicBool = AtomicBool::new(false);
        let timer = SunTimer::spawn(Local::now() - chrono::Duration::seconds(1), || {
            FIRED.store(true, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(100));
        assert!(FIRED.load(Ordering::SeqCst));
        drop(timer);

        static CANCELLED_FIRED: AtomicBool = AtomicBool::new(false);
        let timer = SunTimer::spawn(Local::now() + chrono::Duration::seconds(30), || {
            CANCELLED_FIRED.store(true, Ordering::SeqCst);
        });
        timer.cancel();
        thread::sleep(Duration::from_millis(100));
        assert!(!CANCELLED_FIRED.load(Ordering::SeqCst));
    }
}
