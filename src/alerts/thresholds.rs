use chrono::{DateTime, Duration, Utc};

/// `true` when `most_recent` is strictly older than `max_age` at `now`.
/// An age exactly equal to `max_age` is still fresh.
pub fn is_stale(most_recent: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now - most_recent > max_age
}

/// Outcome of evaluating one source against its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fresh,
    Stale,
    /// Stale beyond the suppression bound; the operator already knows
    StaleSuppressed,
}

impl Verdict {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Verdict::Fresh)
    }

    pub fn should_alert(&self) -> bool {
        matches!(self, Verdict::Stale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub max_age: Duration,
    /// Stop alerting once the source is older than this
    pub suppress_after: Option<Duration>,
}

impl StalenessPolicy {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            suppress_after: None,
        }
    }

    pub fn with_suppress_after(mut self, suppress_after: Option<Duration>) -> Self {
        self.suppress_after = suppress_after;
        self
    }

    /// A source with no observed activity at all is always `Stale` and never
    /// suppressed.
    pub fn evaluate(&self, most_recent: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Verdict {
        let Some(most_recent) = most_recent else {
            return Verdict::Stale;
        };

        if !is_stale(most_recent, now, self.max_age) {
            return Verdict::Fresh;
        }

        match self.suppress_after {
            Some(bound) if is_stale(most_recent, now, bound) => Verdict::StaleSuppressed,
            _ => Verdict::Stale,
        }
    }
}
