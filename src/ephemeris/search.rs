//! Zero-crossing search for angular event functions.
//!
//! Coarse forward scan, then bisection on the bracketing step. Event
//! functions are angle differences wrapped to `(-180, 180]`, so a sign change
//! between two samples is only a real crossing when both values are small;
//! a jump from about +180 to about -180 is the wrap, not an event.

/// Bracket width at which bisection stops (one minute, in days).
pub const CONVERGENCE_DAYS: f64 = 1.0 / 1_440.0;

const MAX_BISECTIONS: u32 = 60;

/// True when `f_a -> f_b` is a zero crossing rather than a wrap-around.
pub fn is_genuine_crossing(f_a: f64, f_b: f64) -> bool {
    f_a * f_b < 0.0 && (f_a - f_b).abs() < 270.0
}

/// Julian day of the first zero crossing of `f` after `start_jd`, scanning
/// forward in `step_days` for at most `max_days`.
pub fn next_crossing<F>(f: F, start_jd: f64, step_days: f64, max_days: f64) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    let max_steps = (max_days / step_days).ceil() as usize;

    let mut t_prev = start_jd;
    let mut f_prev = f(t_prev);

    for _ in 0..max_steps {
        let t_curr = t_prev + step_days;
        let f_curr = f(t_curr);

        if f_curr == 0.0 {
            return Some(t_curr);
        }
        if is_genuine_crossing(f_prev, f_curr) {
            return Some(bisect(&f, t_prev, f_prev, t_curr));
        }

        t_prev = t_curr;
        f_prev = f_curr;
    }

    None
}

fn bisect<F>(f: &F, mut t_a: f64, mut f_a: f64, mut t_b: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    for _ in 0..MAX_BISECTIONS {
        let t_mid = 0.5 * (t_a + t_b);
        let f_mid = f(t_mid);

        if f_a * f_mid <= 0.0 {
            t_b = t_mid;
        } else {
            t_a = t_mid;
            f_a = f_mid;
        }

        if t_b - t_a < CONVERGENCE_DAYS {
            break;
        }
    }
    0.5 * (t_a + t_b)
}
