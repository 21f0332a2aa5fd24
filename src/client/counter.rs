//! Local counting session shown on the tally screen.

use super::ClientError;
use crate::models::{SaveTallyRequest, TallyMode, User, ZikrLabel, MAX_TALLY_COUNT};

/// Counts taps for one session before it is saved.
#[derive(Debug, Clone)]
pub struct TallyCounter {
    mode: TallyMode,
    target: i64,
    count: i64,
    label: ZikrLabel,
}

impl TallyCounter {
    pub fn unlimited() -> Self {
        Self {
            mode: TallyMode::Unlimited,
            target: 0,
            count: 0,
            label: ZikrLabel::default(),
        }
    }

    /// Count up to `target`, then stop accepting taps.
    pub fn fixed(target: i64) -> Result<Self, ClientError> {
        if !(1..=MAX_TALLY_COUNT).contains(&target) {
            return Err(ClientError::Tally(format!(
                "Fixed mode needs a target between 1 and {}",
                MAX_TALLY_COUNT
            )));
        }
        Ok(Self {
            mode: TallyMode::Fixed,
            target,
            ..Self::unlimited()
        })
    }

    pub fn with_label(mut self, label: ZikrLabel) -> Self {
        self.label = label;
        self
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn mode(&self) -> TallyMode {
        self.mode
    }

    pub fn is_complete(&self) -> bool {
        self.mode == TallyMode::Fixed && self.count >= self.target
    }

    /// Register one tap. Returns false once a fixed target or the session
    /// cap has been reached.
    pub fn increment(&mut self) -> bool {
        if self.is_complete() || self.count >= MAX_TALLY_COUNT {
            return false;
        }
        self.count += 1;
        true
    }

    /// Progress towards the target in percent, capped at 100.
    pub fn progress(&self) -> Option<u8> {
        match self.mode {
            TallyMode::Fixed => Some(((self.count * 100 / self.target).min(100)) as u8),
            TallyMode::Unlimited => None,
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Turn the finished session into a save request.
    pub fn finish(&self, group_id: &str, user: &User) -> Result<SaveTallyRequest, ClientError> {
        if self.count == 0 {
            return Err(ClientError::Tally("Nothing to save yet".to_string()));
        }
        Ok(SaveTallyRequest {
            group_id: group_id.to_string(),
            user_id: user.id.clone(),
            user_name: user.display_name(),
            count: self.count,
            mode: self.mode,
            target: self.target,
            zikr_label: self.label,
            duration: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u1".into(),
            first_name: "Awa".into(),
            last_name: "Ndiaye".into(),
            phone: "770000001".into(),
            cumulative_score: 0,
        }
    }

    #[test]
    fn test_fixed_stops_at_target() {
        let mut counter = TallyCounter::fixed(3).unwrap();
        assert!(counter.increment());
        assert!(counter.increment());
        assert_eq!(counter.progress(), Some(66));
        assert!(counter.increment());
        assert!(counter.is_complete());
        assert!(!counter.increment());
        assert_eq!(counter.count(), 3);
        assert_eq!(counter.progress(), Some(100));
    }

    #[test]
    fn test_fixed_requires_target() {
        assert!(TallyCounter::fixed(0).is_err());
        assert!(TallyCounter::fixed(MAX_TALLY_COUNT + 1).is_err());
    }

    #[test]
    fn test_unlimited_stops_at_session_cap() {
        let mut counter = TallyCounter::unlimited();
        counter.count = MAX_TALLY_COUNT - 1;
        assert!(counter.increment());
        assert!(!counter.increment());
        assert_eq!(counter.count(), MAX_TALLY_COUNT);
    }

    #[test]
    fn test_unlimited_never_completes() {
        let mut counter = TallyCounter::unlimited();
        for _ in 0..1000 {
            assert!(counter.increment());
        }
        assert!(!counter.is_complete());
        assert_eq!(counter.progress(), None);
    }

    #[test]
    fn test_finish_requires_a_count() {
        let mut counter = TallyCounter::unlimited().with_label(ZikrLabel::Alhamdoulillah);
        assert!(counter.finish("g1", &user()).is_err());

        counter.increment();
        counter.increment();
        let request = counter.finish("g1", &user()).unwrap();
        assert_eq!(request.count, 2);
        assert_eq!(request.mode, TallyMode::Unlimited);
        assert_eq!(request.user_name, "Awa Ndiaye");
        assert_eq!(request.zikr_label, ZikrLabel::Alhamdoulillah);

        counter.reset();
        assert_eq!(counter.count(), 0);
    }
}
