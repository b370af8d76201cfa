//! Rolling statistics over a daily price series.
//!
//! Every function returns one entry per input value. Windowed indicators report
//! `None` until they have enough history; NaN inputs propagate into the outputs
//! they touch instead of raising an error.

/// Mean of the `window` values ending at each index.
pub fn simple_moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let sum: f64 = values[i + 1 - window..=i].iter().sum();
            Some(sum / window as f64)
        })
        .collect()
}

/// Recursive EMA with `alpha = 2 / (span + 1)`, seeded with the first value (no warm-up gap).
pub fn exponential_moving_average(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let alpha = alpha.min(1.0);

    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &value in values {
        let ema = match prev {
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
            None => value,
        };
        out.push(ema);
        prev = Some(ema);
    }
    out
}

/// `values[i] - values[i - lag]`.
pub fn momentum(values: &[f64], lag: usize) -> Vec<Option<f64>> {
    if lag == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| (i >= lag).then(|| values[i] - values[i - lag]))
        .collect()
}

/// Intraday change `(close - open) / open`; undefined where the open is zero.
pub fn price_change_ratio(opens: &[f64], closes: &[f64]) -> Vec<Option<f64>> {
    opens
        .iter()
        .zip(closes)
        .map(|(&open, &close)| (open != 0.0).then(|| (close - open) / open))
        .collect()
}

/// Wilder RSI.
///
/// The first average gain/loss is the simple mean of the first `window` changes, so the
/// first defined value sits at index `window`. Later averages use Wilder smoothing:
/// `avg = (prev * (window - 1) + current) / window`. A window without losses is 100.
pub fn rsi(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() <= window {
        return out;
    }

    let changes: Vec<f64> = values.windows(2).map(|pair| pair[1] - pair[0]).collect();
    // a NaN change poisons both averages from that point on
    let gain = |change: f64| if change.is_nan() || change > 0.0 { change } else { 0.0 };
    let loss = |change: f64| if change.is_nan() || change < 0.0 { -change } else { 0.0 };

    let period = window as f64;
    let seed = &changes[..window];
    let mut avg_gain = seed.iter().copied().map(gain).sum::<f64>() / period;
    let mut avg_loss = seed.iter().copied().map(loss).sum::<f64>() / period;
    out[window] = Some(relative_strength_index(avg_gain, avg_loss));

    for (i, &change) in changes.iter().enumerate().skip(window) {
        avg_gain = (avg_gain * (period - 1.0) + gain(change)) / period;
        avg_loss = (avg_loss * (period - 1.0) + loss(change)) / period;
        // changes[i] is the move into values[i + 1]
        out[i + 1] = Some(relative_strength_index(avg_gain, avg_loss));
    }

    out
}

fn relative_strength_index(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
