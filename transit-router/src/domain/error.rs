//! Domain error types.
//!
//! These errors represent inconsistencies found when assembling domain
//! values such as itineraries. They are distinct from build-time network or
//! configuration errors.

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Itinerary has no legs
    #[error("itinerary must have at least one leg")]
    EmptyItinerary,

    /// Consecutive legs don't meet at the same place
    #[error("leg ending at {0} is followed by a leg starting at {1}")]
    LegsNotConnected(String, String),

    /// A leg starts before the previous one ends
    #[error("leg starting at {start} begins before the previous leg ends at {previous_end}")]
    LegsOverlap { previous_end: f64, start: f64 },

    /// A leg has a negative duration
    #[error("leg has negative duration: {0}")]
    NegativeDuration(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::EmptyItinerary;
        assert_eq!(err.to_string(), "itinerary must have at least one leg");

        let err = DomainError::LegsNotConnected("stop 2".into(), "stop 3".into());
        assert_eq!(
            err.to_string(),
            "leg ending at stop 2 is followed by a leg starting at stop 3"
        );

        let err = DomainError::LegsOverlap {
            previous_end: 100.0,
            start: 90.0,
        };
        assert_eq!(
            err.to_string(),
            "leg starting at 90 begins before the previous leg ends at 100"
        );

        let err = DomainError::NegativeDuration(-5.0);
        assert_eq!(err.to_string(), "leg has negative duration: -5");
    }
}
