/// Read-only statistics and report export
mod export;
mod stats;

pub use export::{ExportFormat, ReportDocument, ReportSection};
pub use stats::StatsAggregator;

/// Percentage of `part` in `total`, rounded half-up to two decimals.
/// An empty total yields 0, never a division error.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = (part as f64 / total as f64) * 100.0;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_total_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn rounds_half_up_to_two_decimals() {
        assert_eq!(percentage(3, 4), 75.0);
        assert_eq!(percentage(121, 150), 80.67);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
    }
}
