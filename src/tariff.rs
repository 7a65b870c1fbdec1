//! Time-of-day tariff: hourly grid buy prices and peak-hour membership.

/// Hours in one simulated day; the tariff resolution and tick granularity.
pub const HOURS_PER_DAY: usize = 24;

/// Immutable hourly buy-price curve with a flagged set of peak hours.
///
/// Constructed once per run and injected into the engine, so independent
/// simulations (e.g. tests with different curves) never share tariff state.
/// The median price drives the "cheap" dispatch band and is precomputed.
///
/// # Examples
///
/// ```
/// use v2g_sim::tariff::PriceSchedule;
///
/// let schedule = PriceSchedule::new(&[10.0; 24], &[17, 18, 19]);
/// assert_eq!(schedule.price_at(3), 10.0);
/// assert!(schedule.is_peak(18));
/// assert!(!schedule.is_peak(3));
/// ```
#[derive(Debug, Clone)]
pub struct PriceSchedule {
    prices: [f32; HOURS_PER_DAY],
    peak: [bool; HOURS_PER_DAY],
    median_price: f32,
    mean_price: f32,
}

impl PriceSchedule {
    /// Creates a price schedule from 24 hourly prices and a peak-hour set.
    ///
    /// # Arguments
    ///
    /// * `prices` - Exactly 24 non-negative buy prices, one per hour-of-day
    /// * `peak_hours` - Hour indices (0-23) flagged as peak
    ///
    /// # Panics
    ///
    /// Panics if `prices` is not exactly 24 entries, any price is negative
    /// or non-finite, or a peak hour index is out of range.
    pub fn new(prices: &[f32], peak_hours: &[usize]) -> Self {
        assert_eq!(
            prices.len(),
            HOURS_PER_DAY,
            "price schedule requires exactly {HOURS_PER_DAY} hourly entries"
        );
        assert!(
            prices.iter().all(|p| p.is_finite() && *p >= 0.0),
            "prices must be finite and non-negative"
        );

        let mut fixed = [0.0_f32; HOURS_PER_DAY];
        fixed.copy_from_slice(prices);

        let mut peak = [false; HOURS_PER_DAY];
        for &h in peak_hours {
            assert!(h < HOURS_PER_DAY, "peak hour {h} out of range");
            peak[h] = true;
        }

        let mut sorted = fixed;
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median_price = (sorted[HOURS_PER_DAY / 2 - 1] + sorted[HOURS_PER_DAY / 2]) / 2.0;
        let mean_price = fixed.iter().sum::<f32>() / HOURS_PER_DAY as f32;

        Self {
            prices: fixed,
            peak,
            median_price,
            mean_price,
        }
    }

    /// Returns the buy price for an hour-of-day (wraps modulo 24).
    pub fn price_at(&self, hour: usize) -> f32 {
        self.prices[hour % HOURS_PER_DAY]
    }

    /// Returns `true` when the hour-of-day is in the peak set.
    pub fn is_peak(&self, hour: usize) -> bool {
        self.peak[hour % HOURS_PER_DAY]
    }

    /// Median of the 24 hourly prices; the upper bound of the cheap band.
    pub fn median_price(&self) -> f32 {
        self.median_price
    }

    /// Mean of the 24 hourly prices.
    pub fn mean_price(&self) -> f32 {
        self.mean_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_prices() -> Vec<f32> {
        (0..24).map(|h| h as f32).collect()
    }

    #[test]
    fn price_lookup_wraps_hour_of_day() {
        let schedule = PriceSchedule::new(&ramp_prices(), &[]);
        assert_eq!(schedule.price_at(5), 5.0);
        assert_eq!(schedule.price_at(29), 5.0);
    }

    #[test]
    fn peak_membership() {
        let schedule = PriceSchedule::new(&ramp_prices(), &[7, 18]);
        assert!(schedule.is_peak(7));
        assert!(schedule.is_peak(18));
        assert!(!schedule.is_peak(12));
    }

    #[test]
    fn median_of_ramp_curve() {
        // sorted 0..24: middles are 11 and 12
        let schedule = PriceSchedule::new(&ramp_prices(), &[]);
        assert!((schedule.median_price() - 11.5).abs() < 1e-6);
    }

    #[test]
    fn mean_of_flat_curve() {
        let schedule = PriceSchedule::new(&[8.0; 24], &[]);
        assert!((schedule.mean_price() - 8.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic]
    fn rejects_wrong_entry_count() {
        PriceSchedule::new(&[1.0; 23], &[]);
    }

    #[test]
    #[should_panic]
    fn rejects_negative_price() {
        let mut prices = vec![1.0_f32; 24];
        prices[3] = -0.5;
        PriceSchedule::new(&prices, &[]);
    }

    #[test]
    #[should_panic]
    fn rejects_out_of_range_peak_hour() {
        PriceSchedule::new(&[1.0; 24], &[24]);
    }
}
