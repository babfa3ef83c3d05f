// src/sets.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of empty sets a new workout exercise starts with when there is no usable history.
pub const DEFAULT_SET_COUNT: usize = 3;

/// Highest set number an edit may create.
pub const MAX_SETS: u32 = 100;

/// One recorded attempt at an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Set {
    pub set_number: u32,
    pub weight: Option<f64>,
    pub reps: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetStatus {
    /// Weight and reps both entered.
    Complete,
    /// Placeholder row, nothing entered yet.
    Empty,
    /// Exactly one of weight/reps entered.
    Partial,
}

impl Set {
    pub const fn empty(set_number: u32) -> Self {
        Self {
            set_number,
            weight: None,
            reps: None,
        }
    }

    pub fn new(set_number: u32, weight: f64, reps: u32) -> Self {
        Self {
            set_number,
            weight: Some(weight),
            reps: Some(reps),
        }
    }

    pub fn status(&self) -> SetStatus {
        match (self.weight, self.reps) {
            (Some(_), Some(_)) => SetStatus::Complete,
            (None, None) => SetStatus::Empty,
            _ => SetStatus::Partial,
        }
    }

    /// True when both fields are present or both are absent.
    /// An empty placeholder counts as complete: it is stripped at commit, not rejected.
    pub fn is_complete(&self) -> bool {
        !matches!(self.status(), SetStatus::Partial)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.status(), SetStatus::Empty)
    }

    /// Weight or reps present. Looser than `is_complete`; used when counting
    /// how many sets were done last time.
    pub fn has_data(&self) -> bool {
        self.weight.is_some() || self.reps.is_some()
    }

    /// Reps strictly greater than zero.
    pub fn has_reps(&self) -> bool {
        self.reps.is_some_and(|r| r > 0)
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weight = self.weight.map_or("-".to_string(), |w| format!("{w}"));
        let reps = self.reps.map_or("-".to_string(), |r| r.to_string());
        write!(f, "#{} {weight} x {reps}", self.set_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteSet {
    pub set_number: u32,
    pub missing: &'static str,
}

impl fmt::Display for IncompleteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entered = if self.missing == "reps" { "weight" } else { "reps" };
        write!(
            f,
            "set {}: {entered} entered without {}",
            self.set_number, self.missing
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetValidationError {
    #[error("Cannot save incomplete sets ({})", list_incomplete(.0))]
    IncompleteSets(Vec<IncompleteSet>),
}

fn list_incomplete(sets: &[IncompleteSet]) -> String {
    sets.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Strips sets where neither weight nor reps was entered, keeping relative order.
/// A set with `reps = 0` recorded is kept.
pub fn remove_empty_sets(sets: &[Set]) -> Vec<Set> {
    sets.iter().filter(|s| !s.is_empty()).copied().collect()
}

/// Only the sets that can be persisted mid-edit.
pub fn complete_sets(sets: &[Set]) -> Vec<Set> {
    sets.iter().filter(|s| s.is_complete()).copied().collect()
}

/// Reassigns `set_number` as 1..=N by position.
pub fn renumber(sets: &mut [Set]) {
    for (i, set) in sets.iter_mut().enumerate() {
        set.set_number = u32::try_from(i + 1).unwrap_or(u32::MAX);
    }
}

/// Rejects any partial set, naming each one and the missing field.
/// # Errors
/// Returns `SetValidationError::IncompleteSets` if at least one set is partial.
pub fn validate_for_commit(sets: &[Set]) -> Result<(), SetValidationError> {
    let incomplete: Vec<IncompleteSet> = sets
        .iter()
        .filter_map(|s| match (s.weight, s.reps) {
            (Some(_), None) => Some(IncompleteSet {
                set_number: s.set_number,
                missing: "reps",
            }),
            (None, Some(_)) => Some(IncompleteSet {
                set_number: s.set_number,
                missing: "weight",
            }),
            _ => None,
        })
        .collect();

    if incomplete.is_empty() {
        Ok(())
    } else {
        Err(SetValidationError::IncompleteSets(incomplete))
    }
}

pub fn empty_sets(count: usize) -> Vec<Set> {
    (1..=count)
        .map(|n| Set::empty(u32::try_from(n).unwrap_or(u32::MAX)))
        .collect()
}

pub fn completed_set_count(sets: &[Set]) -> usize {
    sets.iter().filter(|s| s.has_data()).count()
}

/// Starting set list for a newly attached exercise: as many empty sets as were
/// completed last time, or `DEFAULT_SET_COUNT` if there is no usable prior record.
pub fn seed_default_sets(prior: Option<&[Set]>) -> Vec<Set> {
    let count = match prior.map(completed_set_count) {
        Some(n) if n > 0 => n,
        _ => DEFAULT_SET_COUNT,
    };
    empty_sets(count)
}

pub fn sets_summary(sets: &[Set]) -> String {
    let done = sets.iter().filter(|s| s.status() == SetStatus::Complete).count();
    match sets.len() {
        0 => "no sets".to_string(),
        1 => format!("{done} of 1 set completed"),
        n => format!("{done} of {n} sets completed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sets_are_never_complete() {
        let weight_only = Set {
            set_number: 1,
            weight: Some(60.0),
            reps: None,
        };
        let reps_only = Set {
            set_number: 2,
            weight: None,
            reps: Some(8),
        };
        assert!(!weight_only.is_complete());
        assert!(!reps_only.is_complete());
        assert!(Set::empty(3).is_complete());
        assert!(Set::new(4, 0.0, 0).is_complete());
    }

    #[test]
    fn zero_reps_is_not_empty() {
        let sets = vec![Set::new(1, 20.0, 0), Set::empty(2), Set::new(3, 40.0, 5)];
        let cleaned = remove_empty_sets(&sets);
        assert_eq!(cleaned, vec![Set::new(1, 20.0, 0), Set::new(3, 40.0, 5)]);
        assert!(cleaned.iter().all(Set::has_data));
    }

    #[test]
    fn validation_names_each_partial_set() {
        let sets = vec![
            Set::new(1, 80.0, 10),
            Set {
                set_number: 2,
                weight: Some(80.0),
                reps: None,
            },
            Set {
                set_number: 3,
                weight: None,
                reps: Some(6),
            },
        ];
        let err = validate_for_commit(&sets).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("set 2: weight entered without reps"));
        assert!(msg.contains("set 3: reps entered without weight"));
    }

    #[test]
    fn seeding_uses_prior_count_or_default() {
        let prior = vec![
            Set::new(1, 50.0, 10),
            Set {
                set_number: 2,
                weight: None,
                reps: Some(10),
            },
            Set::new(3, 50.0, 8),
            Set::new(4, 50.0, 8),
            Set::empty(5),
        ];
        let seeded = seed_default_sets(Some(prior.as_slice()));
        assert_eq!(seeded.len(), 4);
        assert_eq!(seeded.iter().map(|s| s.set_number).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(seeded.iter().all(Set::is_empty));

        assert_eq!(seed_default_sets(None).len(), DEFAULT_SET_COUNT);
        assert_eq!(seed_default_sets(Some(empty_sets(5).as_slice())).len(), DEFAULT_SET_COUNT);
    }

    #[test]
    fn summary_counts_complete_sets() {
        let sets = vec![Set::new(1, 80.0, 10), Set::empty(2), Set::empty(3)];
        assert_eq!(sets_summary(&sets), "1 of 3 sets completed");
        assert_eq!(sets_summary(&[]), "no sets");
    }
}
