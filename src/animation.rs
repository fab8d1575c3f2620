//! Linear wall-clock transitions of a single scalar.
//!
//! Timestamps are milliseconds on any monotonic clock the host likes
//! (`performance.now()`, `Instant` deltas, ...). Only differences matter.

use serde::{Deserialize, Serialize};

/// State of one animated scalar.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Tween {
    Idle {
        value: f64,
    },
    Animating {
        from: f64,
        to: f64,
        start_ms: f64,
        end_ms: f64,
        value: f64,
    },
}

impl Default for Tween {
    fn default() -> Self {
        Tween::Idle { value: 0.0 }
    }
}

impl Tween {
    pub fn value(&self) -> f64 {
        match *self {
            Tween::Idle { value } | Tween::Animating { value, .. } => value,
        }
    }

    /// Begin a transition from the current value towards `to`.
    ///
    /// Starting while another transition is in flight continues from wherever
    /// that transition was last polled.
    pub fn start(self, to: f64, duration_ms: u32, now_ms: f64) -> Tween {
        let value = self.value();
        Tween::Animating {
            from: value,
            to,
            start_ms: now_ms,
            end_ms: now_ms + f64::from(duration_ms),
            value,
        }
    }

    /// Advance to `now_ms`. Returns the next state, the current value and
    /// whether the value differs from the one before the call.
    pub fn poll(self, now_ms: f64) -> (Tween, f64, bool) {
        match self {
            Tween::Idle { value } => (self, value, false),
            Tween::Animating {
                from,
                to,
                start_ms,
                end_ms,
                value: prev,
            } => {
                let t = if end_ms <= start_ms {
                    1.0
                } else {
                    ((now_ms - start_ms) / (end_ms - start_ms)).clamp(0.0, 1.0)
                };

                if t >= 1.0 {
                    let next = Tween::Idle { value: to };
                    return (next, to, prev != to);
                }

                let value = lerp(from, to, t);
                let next = Tween::Animating {
                    from,
                    to,
                    start_ms,
                    end_ms,
                    value,
                };
                (next, value, prev != value)
            }
        }
    }

    pub fn is_animating(&self) -> bool {
        matches!(self, Tween::Animating { .. })
    }
}

#[inline]
fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Owned, mutable handle around a [`Tween`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimatedScalar {
    state: Tween,
}

impl AnimatedScalar {
    pub fn new(value: f64) -> Self {
        Self {
            state: Tween::Idle { value },
        }
    }

    pub fn value(&self) -> f64 {
        self.state.value()
    }

    pub fn state(&self) -> Tween {
        self.state
    }

    pub fn start(&mut self, to: f64, duration_ms: u32, now_ms: f64) {
        self.state = self.state.start(to, duration_ms, now_ms);
    }

    /// Returns `true` when the value changed.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        let (next, _, changed) = self.state.poll(now_ms);
        self.state = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_target_exactly_at_end() {
        let mut a = AnimatedScalar::new(0.1);
        a.start(0.7, 300, 1000.0);
        a.poll(1300.0);
        assert_eq!(a.value(), 0.7);
    }

    #[test]
    fn halfway() {
        let mut a = AnimatedScalar::new(0.0);
        a.start(10.0, 100, 0.0);
        assert!(a.poll(50.0));
        assert_eq!(a.value(), 5.0);
    }

    #[test]
    fn poll_at_start_keeps_from() {
        let mut a = AnimatedScalar::new(3.0);
        a.start(9.0, 300, 500.0);
        assert!(!a.poll(500.0));
        assert_eq!(a.value(), 3.0);
    }

    #[test]
    fn zero_duration_jumps_to_target() {
        let mut a = AnimatedScalar::new(1.0);
        a.start(4.0, 0, 200.0);
        assert!(a.poll(200.0));
        assert_eq!(a.value(), 4.0);
    }

    #[test]
    fn settles_to_idle() {
        let mut a = AnimatedScalar::new(0.0);
        a.start(2.0, 10, 0.0);
        assert!(a.poll(20.0));
        assert!(!a.state().is_animating());
        assert!(!a.poll(30.0));
        assert!(!a.poll(40.0));
        assert_eq!(a.value(), 2.0);
    }

    #[test]
    fn restart_continues_from_current_value() {
        let mut a = AnimatedScalar::new(0.0);
        a.start(100.0, 100, 0.0);
        a.poll(25.0);
        a.start(0.0, 100, 25.0);
        match a.state() {
            Tween::Animating { from, to, .. } => {
                assert_eq!(from, 25.0);
                assert_eq!(to, 0.0);
            }
            Tween::Idle { .. } => panic!("expected an animation"),
        }
    }

    #[test]
    fn poll_before_start_clamps() {
        let (_, value, changed) = Tween::Idle { value: 1.0 }.start(2.0, 10, 100.0).poll(50.0);
        assert_eq!(value, 1.0);
        assert!(!changed);
    }
}
