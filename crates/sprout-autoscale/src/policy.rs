//! The scaling decision function.
//!
//! Pure over the stats window and the current roster size: no clock,
//! no I/O. Repeated calls on the same window return the same integer.

use tracing::debug;

use crate::stats::StatsWindow;

/// Converts the latency trend in a full window into a signed instance
/// adjustment. Positive means add, negative means remove, zero holds.
#[derive(Debug, Clone, Copy)]
pub struct ScalingPolicy {
    sensitivity_up: f64,
    sensitivity_down: f64,
}

impl ScalingPolicy {
    pub fn new(sensitivity_up: f64, sensitivity_down: f64) -> Self {
        Self {
            sensitivity_up,
            sensitivity_down,
        }
    }

    /// Decide an adjustment for the given window and roster size.
    ///
    /// The decision pipeline, in order:
    ///
    /// 1. warm-up: a partial window yields no decision;
    /// 2. zero-traffic collapse: an all-idle window shrinks the roster
    ///    to exactly one instance, overriding every later clause;
    /// 3. delta percent: `(cur − prev) / prev` over the window span,
    ///    where `prev` is the EMA a full window ago;
    /// 4. cooldown: any roster change still inside the window blocks a
    ///    new decision until the window flushes;
    /// 5. gain: sensitivity shaped by fleet size, asymmetric by
    ///    direction.
    pub fn adjustment(&self, window: &StatsWindow, instance_count: usize) -> i32 {
        if !window.is_full() {
            debug!(
                len = window.len(),
                capacity = window.capacity(),
                "window not full, holding"
            );
            return 0;
        }

        if window.all_idle() {
            let collapse = 1 - instance_count as i32;
            debug!(instance_count, collapse, "no traffic across window, collapsing to one");
            return collapse;
        }

        let Some(oldest) = window.front() else {
            return 0;
        };

        let prev = oldest.rtime_ema;
        if prev == 0.0 {
            // The window starts on an idle tick; the span has no
            // defined baseline.
            return 0;
        }
        let cur = window.last_ema();
        let delta = (cur - prev) / prev;

        if instance_count != oldest.instance_count {
            debug!(
                instance_count,
                was = oldest.instance_count,
                "roster changed inside window, cooling down"
            );
            return 0;
        }

        let gain = if delta > 0.0 {
            self.sensitivity_up * (6.0 / (instance_count as f64 + 1.0)).exp()
        } else {
            self.sensitivity_down * (4.83 / (instance_count as f64 + 1.0)).exp()
        };

        let adjustment = (delta * gain).round() as i32;
        debug!(
            cur,
            prev,
            delta,
            gain,
            adjustment,
            "computed scaling adjustment"
        );
        adjustment
    }
}
