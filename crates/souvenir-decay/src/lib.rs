//! Importance decay arithmetic.
//!
//! Kept apart from `souvenir-storage` the way the host engine keeps its own
//! decay engine apart from the storage layer: the formula is pure and
//! storage-agnostic, so it's testable without a database and reusable from
//! both `MemoryRepository::apply_importance_decay` and the consolidation
//! pipeline's per-component decay pass.

/// The outcome of evaluating one candidate row against the decay rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecayOutcome {
    /// `importance * decay_rate` fell at or below the floor: the row should
    /// be tombstoned rather than decayed in place.
    Floored,
    /// The row stays active with this new importance.
    Decayed { new_importance: f64 },
}

/// Evaluate the decay rule for a single memory's current importance.
///
/// The floor check happens strictly before the multiply is applied, per the
/// invariant that a row is never both marked floored and decayed-in-place:
/// if `floor_threshold` is set and `importance * decay_rate < floor_threshold`,
/// the row floors; otherwise it decays to `importance * decay_rate`.
pub fn evaluate(importance: f64, decay_rate: f64, floor_threshold: Option<f64>) -> DecayOutcome {
    let decayed = importance * decay_rate;
    if let Some(floor) = floor_threshold {
        if decayed < floor {
            return DecayOutcome::Floored;
        }
    }
    DecayOutcome::Decayed { new_importance: decayed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn floors_below_threshold() {
        let outcome = evaluate(0.15, 0.5, Some(0.1));
        assert_eq!(outcome, DecayOutcome::Floored);
    }

    #[test]
    fn decays_in_place_above_threshold() {
        let outcome = evaluate(0.5, 0.9, Some(0.1));
        assert_eq!(outcome, DecayOutcome::Decayed { new_importance: 0.45 });
    }

    #[test]
    fn no_floor_never_floors() {
        let outcome = evaluate(0.01, 0.1, None);
        assert_eq!(outcome, DecayOutcome::Decayed { new_importance: 0.001 });
    }

    proptest! {
        #[test]
        fn never_both_floored_and_over_threshold(
            importance in 0.0f64..=1.0,
            decay_rate in 0.0f64..=1.0,
            floor in 0.0f64..=1.0,
        ) {
            match evaluate(importance, decay_rate, Some(floor)) {
                DecayOutcome::Floored => prop_assert!(importance * decay_rate < floor),
                DecayOutcome::Decayed { new_importance } => {
                    prop_assert!(new_importance >= floor);
                    prop_assert!((new_importance - importance * decay_rate).abs() < 1e-9);
                }
            }
        }
    }
}
