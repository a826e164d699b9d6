use chrono::{Duration, NaiveDateTime};

pub const VIEW_WEIGHT: f64 = 1.0;
pub const LIKE_WEIGHT: f64 = 2.0;
pub const RATE_WEIGHT: f64 = 3.0;

fn micros(span: Duration) -> f64 {
    span.num_microseconds()
        .map(|us| us as f64)
        .unwrap_or_else(|| span.num_milliseconds() as f64 * 1_000.0)
}

/// Linear min-max weight per timestamp: the oldest row gets 0, the newest 1.
/// A collapsed range gives every row exactly 1.0.
pub fn decay_weights(timestamps: &[NaiveDateTime]) -> Vec<f64> {
    let (min, max) = match (timestamps.iter().min(), timestamps.iter().max()) {
        (Some(&min), Some(&max)) => (min, max),
        _ => return Vec::new(),
    };
    let span = micros(max - min);
    if span <= 0.0 {
        return vec![1.0; timestamps.len()];
    }
    timestamps
        .iter()
        .map(|&t| micros(t - min) / span)
        .collect()
}

/// `views + 2·likes + 3·rates`, rounded half-to-even to 3 decimals.
pub fn trending_score(views: f64, likes: f64, rates: f64) -> f64 {
    let raw = views * VIEW_WEIGHT + likes * LIKE_WEIGHT + rates * RATE_WEIGHT;
    (raw * 1_000.0).round_ties_even() / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use poppy_core::types::parse_timestamp;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_identical_timestamps_weigh_one() {
        let t = ts("2025-03-01 12:00:00");
        assert_eq!(decay_weights(&[t, t, t]), vec![1.0, 1.0, 1.0]);
        assert_eq!(decay_weights(&[t]), vec![1.0]);
        assert!(decay_weights(&[]).is_empty());
    }

    #[test]
    fn test_linear_decay() {
        let weights = decay_weights(&[
            ts("2025-03-03 00:00:00"),
            ts("2025-03-01 00:00:00"),
            ts("2025-03-02 00:00:00"),
        ]);
        assert_eq!(weights, vec![1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_score_weights() {
        assert_eq!(trending_score(2.0, 1.0, 0.0), 4.0);
        assert_eq!(trending_score(0.0, 0.0, 1.0), 3.0);
    }

    #[test]
    fn test_score_rounds_to_three_decimals() {
        assert_eq!(trending_score(1.0 / 3.0, 0.0, 0.0), 0.333);
        assert_eq!(trending_score(0.12345, 0.0, 0.0), 0.123);
        assert_eq!(trending_score(0.0, 0.0, 0.5), 1.5);
    }
}
