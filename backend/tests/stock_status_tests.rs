//! Stock status evaluation and drift detection tests
//!
//! Tests for:
//! - Status boundaries (nothing on hand, at threshold, above threshold)
//! - Sweep candidates: only drifted rows are corrected, and a corrected set is stable

use proptest::prelude::*;
use shared::models::{drifted_statuses, StockSnapshot, StockStatus};

// ============================================================================
// Property Test Strategies
// ============================================================================

fn threshold_strategy() -> impl Strategy<Value = i32> {
    0i32..=1_000
}

fn status_strategy() -> impl Strategy<Value = StockStatus> {
    prop_oneof![
        Just(StockStatus::InStock),
        Just(StockStatus::LowStock),
        Just(StockStatus::OutOfStock),
    ]
}

fn snapshot_strategy() -> impl Strategy<Value = StockSnapshot<u32>> {
    (any::<u32>(), -50i32..=500, threshold_strategy(), status_strategy()).prop_map(
        |(id, quantity, threshold, status)| StockSnapshot {
            id,
            quantity,
            threshold,
            status,
        },
    )
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Nothing on hand is always out of stock, whatever the threshold
    #[test]
    fn prop_non_positive_quantity_is_out_of_stock(
        quantity in i32::MIN..=0,
        threshold in any::<i32>(),
    ) {
        prop_assert_eq!(StockStatus::evaluate(quantity, threshold), StockStatus::OutOfStock);
    }

    /// Positive quantities up to and including the threshold are low stock
    #[test]
    fn prop_quantity_up_to_threshold_is_low_stock(
        threshold in 1i32..=10_000,
        fraction in 0.0f64..=1.0,
    ) {
        let quantity = ((threshold as f64 * fraction).ceil() as i32).clamp(1, threshold);
        prop_assert_eq!(StockStatus::evaluate(quantity, threshold), StockStatus::LowStock);
    }

    /// Anything above the threshold is in stock
    #[test]
    fn prop_quantity_above_threshold_is_in_stock(
        threshold in threshold_strategy(),
        extra in 1i32..=10_000,
    ) {
        prop_assert_eq!(StockStatus::evaluate(threshold + extra, threshold), StockStatus::InStock);
    }

    /// Every correction disagrees with the stored value and matches the evaluator
    #[test]
    fn prop_drift_only_reports_stale_rows(
        snapshots in prop::collection::vec(snapshot_strategy(), 0..40),
    ) {
        let drifted = drifted_statuses(&snapshots);
        let stale = snapshots
            .iter()
            .filter(|s| StockStatus::evaluate(s.quantity, s.threshold) != s.status)
            .count();
        prop_assert_eq!(drifted.len(), stale);

        for (id, status) in &drifted {
            let snapshot = snapshots.iter().find(|s| &s.id == id && s.status != *status);
            prop_assert!(snapshot.is_some());
        }
    }

    /// Applying the corrections leaves nothing to correct
    #[test]
    fn prop_sweep_is_idempotent(
        snapshots in prop::collection::vec(snapshot_strategy(), 0..40),
    ) {
        let corrected: Vec<StockSnapshot<u32>> = snapshots
            .into_iter()
            .map(|mut s| {
                s.status = StockStatus::evaluate(s.quantity, s.threshold);
                s
            })
            .collect();
        prop_assert!(drifted_statuses(&corrected).is_empty());
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(StockStatus::evaluate(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::evaluate(-3, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::evaluate(1, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::evaluate(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::evaluate(6, 5), StockStatus::InStock);
    }

    #[test]
    fn test_zero_threshold() {
        assert_eq!(StockStatus::evaluate(1, 0), StockStatus::InStock);
        assert_eq!(StockStatus::evaluate(0, 0), StockStatus::OutOfStock);
    }

    #[test]
    fn test_sale_scenario_lands_in_low_stock() {
        // 10 on hand, threshold 5, sell 6
        assert_eq!(StockStatus::evaluate(10, 5), StockStatus::InStock);
        assert_eq!(StockStatus::evaluate(10 - 6, 5), StockStatus::LowStock);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&StockStatus::OutOfStock).unwrap(),
            "\"OutOfStock\""
        );
        assert_eq!(StockStatus::LowStock.as_str(), "low_stock");
    }
}
