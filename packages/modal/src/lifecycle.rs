/// Change in open state observed by a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
    Unchanged,
}

/// Remembers the last committed open flag.
///
/// The first observation is never a transition, so a modal mounted open does
/// not report `Opened`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenTracker {
    last: Option<bool>,
}

impl OpenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, is_open: bool) -> Transition {
        let previous = self.last.replace(is_open);
        match (previous, is_open) {
            (Some(false), true) => Transition::Opened,
            (Some(true), false) => Transition::Closed,
            _ => Transition::Unchanged,
        }
    }

    pub fn last(&self) -> Option<bool> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_not_a_transition() {
        let mut tracker = OpenTracker::new();
        assert_eq!(tracker.observe(true), Transition::Unchanged);
        assert_eq!(tracker.last(), Some(true));

        let mut tracker = OpenTracker::new();
        assert_eq!(tracker.observe(false), Transition::Unchanged);
    }

    #[test]
    fn test_toggles() {
        let mut tracker = OpenTracker::new();
        tracker.observe(false);
        assert_eq!(tracker.observe(true), Transition::Opened);
        assert_eq!(tracker.observe(true), Transition::Unchanged);
        assert_eq!(tracker.observe(false), Transition::Closed);
        assert_eq!(tracker.observe(false), Transition::Unchanged);
        assert_eq!(tracker.observe(true), Transition::Opened);
    }
}
