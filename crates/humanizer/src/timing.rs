//! Randomized submission delays and thinking pauses.

use std::time::Duration;

use rand::Rng;

/// Floor for any generated delay; prevents unrealistically instant
/// submission.
pub const MIN_DELAY_MS: f64 = 100.0;

/// Pause probability during the critical middlegame phase (plies 10-25).
const CRITICAL_PAUSE_P: f64 = 0.15;
/// Pause probability outside the critical phase.
const BASE_PAUSE_P: f64 = 0.08;

/// Draws a submission delay centered at `base_ms`.
///
/// Uses the Box-Muller transform over two independent uniform draws to
/// approximate a normal distribution with standard deviation
/// `base_ms * variance`. The result is clamped to
/// `[MIN_DELAY_MS, base_ms * 3]`; the ceiling bounds worst-case latency.
pub fn move_delay<R: Rng>(rng: &mut R, base_ms: f64, variance: f64) -> Duration {
    // Map [0, 1) to (0, 1] so ln never sees zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let normal = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();

    let ceiling = (base_ms * 3.0).max(MIN_DELAY_MS);
    let ms = (base_ms + normal * base_ms * variance).clamp(MIN_DELAY_MS, ceiling);
    Duration::from_millis(ms.round() as u64)
}

/// Decides whether to take a thinking pause before this ply.
///
/// Independent Bernoulli draw each call; pauses are not spaced out, so
/// back-to-back pauses are possible and accepted.
pub fn should_pause<R: Rng>(rng: &mut R, ply: u32) -> bool {
    let p = if (10..=25).contains(&ply) {
        CRITICAL_PAUSE_P
    } else {
        BASE_PAUSE_P
    };
    rng.gen::<f64>() < p
}

/// Draws a thinking-pause duration, uniform in 2-8 seconds.
pub fn pause_duration<R: Rng>(rng: &mut R) -> Duration {
    Duration::from_millis(rng.gen_range(2000..=8000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn delay_stays_within_clamp_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10_000 {
            let d = move_delay(&mut rng, 500.0, 0.4).as_millis();
            assert!((100..=1500).contains(&d), "delay {d} out of range");
        }
    }

    #[test]
    fn delay_mean_tracks_base() {
        let mut rng = StdRng::seed_from_u64(22);
        let samples = 20_000u64;
        let total: u128 = (0..samples)
            .map(|_| move_delay(&mut rng, 500.0, 0.4).as_millis())
            .sum();
        let mean = total as f64 / samples as f64;
        assert!((mean - 500.0).abs() < 50.0, "mean was {mean}");
    }

    #[test]
    fn tiny_base_still_respects_floor() {
        let mut rng = StdRng::seed_from_u64(33);
        for _ in 0..1000 {
            let d = move_delay(&mut rng, 10.0, 0.4).as_millis();
            assert_eq!(d, 100);
        }
    }

    #[test]
    fn pause_rate_is_higher_in_critical_phase() {
        let mut rng = StdRng::seed_from_u64(44);
        let draws = 10_000;

        let critical = (0..draws).filter(|_| should_pause(&mut rng, 15)).count();
        let quiet = (0..draws).filter(|_| should_pause(&mut rng, 30)).count();

        let critical_rate = critical as f64 / f64::from(draws);
        let quiet_rate = quiet as f64 / f64::from(draws);
        assert!((critical_rate - 0.15).abs() < 0.02, "rate {critical_rate}");
        assert!((quiet_rate - 0.08).abs() < 0.02, "rate {quiet_rate}");
    }

    #[test]
    fn pause_phase_boundaries() {
        // Plies 10 and 25 are inside the critical phase, 9 and 26 outside.
        // Verified statistically since the draw itself is random.
        let mut rng = StdRng::seed_from_u64(55);
        let draws = 10_000;
        for (ply, expected) in [(10u32, 0.15), (25, 0.15), (9, 0.08), (26, 0.08)] {
            let hits = (0..draws).filter(|_| should_pause(&mut rng, ply)).count();
            let rate = hits as f64 / f64::from(draws);
            assert!((rate - expected).abs() < 0.02, "ply {ply} rate {rate}");
        }
    }

    #[test]
    fn pause_duration_bounds() {
        let mut rng = StdRng::seed_from_u64(66);
        for _ in 0..1000 {
            let d = pause_duration(&mut rng).as_millis();
            assert!((2000..=8000).contains(&d));
        }
    }
}
