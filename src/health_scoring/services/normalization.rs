/// Maps `value` onto `0..=max_score` on a log10 scale between `min` and `max`.
///
/// Values at or below `min` give 0, values at or above `max` give `max_score`.
pub fn log_scale(value: f64, min: f64, max: f64, max_score: f64) -> f64 {
    if value <= min {
        return 0.0;
    }
    if value >= max {
        return max_score;
    }

    let log_value = value.max(1.0).log10();
    let log_min = min.max(1.0).log10();
    let log_max = max.max(1.0).log10();
    if log_max <= log_min {
        return 0.0;
    }

    ((log_value - log_min) / (log_max - log_min) * max_score).clamp(0.0, max_score)
}

/// Linear interpolation of `value` from `min..=max` onto `0..=max_score`.
pub fn linear_scale(value: f64, min: f64, max: f64, max_score: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min) * max_score).clamp(0.0, max_score)
}

/// Clamps a raw component score into `0..=100`.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}
