//! Search abort control: the shared abort token and the wall-clock alarm.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Cooperative abort token.
///
/// Two independent sources converge on this flag: the engine's own
/// wall-clock [`Alarm`], and an external stop request from the hosting
/// front-end. The search polls it at scout node entry and unwinds to
/// the root driver once it is set.
#[derive(Clone, Debug, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    /// Create a fresh, unset flag.
    pub fn new() -> AbortFlag {
        AbortFlag(Arc::new(AtomicBool::new(false)))
    }

    /// Request an abort.
    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Return `true` once an abort has been requested.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Reset the flag. Owned by the root driver, which clears it on
    /// entry and on both return paths.
    #[inline]
    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A one-shot timer that sets an [`AbortFlag`] when the deadline passes.
///
/// The timer thread is disarmed and joined on drop, so the alarm cannot
/// outlive the search that armed it regardless of how that search
/// returned.
pub struct Alarm {
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Alarm {
    /// Arm a timer that fires `flag` after `budget` has elapsed.
    pub fn arm(flag: AbortFlag, budget: Duration) -> Alarm {
        let cancelled = Arc::new(AtomicBool::new(false));
        let watcher = Arc::clone(&cancelled);
        let deadline = Instant::now() + budget;

        let thread = thread::spawn(move || {
            while !watcher.load(Ordering::Relaxed) {
                let now = Instant::now();
                if now >= deadline {
                    flag.set();
                    break;
                }
                // Short naps keep disarm latency low without busy-waiting.
                thread::sleep((deadline - now).min(Duration::from_millis(2)));
            }
        });

        Alarm {
            cancelled,
            thread: Some(thread),
        }
    }
}

impl Drop for Alarm {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AbortFlag, Alarm};
    use std::time::{Duration, Instant};

    #[test]
    fn flag_set_and_clear() {
        let flag = AbortFlag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
    }

    #[test]
    fn clones_share_state() {
        let flag = AbortFlag::new();
        let other = flag.clone();
        other.set();
        assert!(flag.is_set());
    }

    #[test]
    fn alarm_fires_after_budget() {
        let flag = AbortFlag::new();
        let _alarm = Alarm::arm(flag.clone(), Duration::from_millis(20));
        let deadline = Instant::now() + Duration::from_millis(500);
        while !flag.is_set() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(flag.is_set());
    }

    #[test]
    fn dropped_alarm_does_not_fire() {
        let flag = AbortFlag::new();
        let alarm = Alarm::arm(flag.clone(), Duration::from_millis(50));
        drop(alarm);
        std::thread::sleep(Duration::from_millis(80));
        assert!(!flag.is_set());
    }
}
