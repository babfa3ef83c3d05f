// src/history.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::sets::Set;

/// Minimum reps a set needs to be considered for the best set.
pub const BEST_SET_MIN_REPS: u32 = 6;
pub const DEFAULT_HISTORY_SESSIONS: usize = 3;

/// One workout-exercise record for an exercise, joined with its workout's date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSession {
    pub workout_exercise_id: i64,
    pub workout_id: i64,
    pub workout_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub sets: Vec<Set>,
}

impl ExerciseSession {
    /// At least one set with reps > 0.
    pub fn has_data(&self) -> bool {
        self.sets.iter().any(Set::has_reps)
    }
}

/// The workout currently being viewed or edited. History is always resolved
/// relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryReference {
    pub workout_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSession {
    pub date: NaiveDate,
    pub sets: Vec<Set>,
}

/// Heaviest set with at least `BEST_SET_MIN_REPS` reps; equal weights go to the higher reps.
pub fn best_set<'a, I>(sets: I) -> Option<Set>
where
    I: IntoIterator<Item = &'a Set>,
{
    sets.into_iter()
        .filter(|s| s.weight.is_some() && s.reps.is_some_and(|r| r >= BEST_SET_MIN_REPS))
        .fold(None, |best: Option<Set>, candidate| match best {
            None => Some(*candidate),
            Some(current) => {
                if compare_sets(candidate, &current) == Ordering::Greater {
                    Some(*candidate)
                } else {
                    Some(current)
                }
            }
        })
}

pub fn best_set_in_sessions(sessions: &[ExerciseSession]) -> Option<Set> {
    best_set(sessions.iter().flat_map(|s| s.sets.iter()))
}

fn compare_sets(a: &Set, b: &Set) -> Ordering {
    let wa = a.weight.unwrap_or(0.0);
    let wb = b.weight.unwrap_or(0.0);
    wa.partial_cmp(&wb)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.reps.unwrap_or(0).cmp(&b.reps.unwrap_or(0)))
}

/// Latest session on or before the reference date, other than the reference workout,
/// that has at least one set with reps recorded.
pub fn most_recent_with_data(
    sessions: &[ExerciseSession],
    reference: HistoryReference,
) -> Option<&ExerciseSession> {
    sessions
        .iter()
        .filter(|s| s.workout_id != reference.workout_id)
        .filter(|s| s.workout_date <= reference.date)
        .filter(|s| s.has_data())
        .max_by(|a, b| {
            a.workout_date
                .cmp(&b.workout_date)
                .then_with(|| a.created_at.cmp(&b.created_at))
        })
}

/// Up to `limit` sessions strictly before the reference date, newest first.
pub fn recent_sessions(
    sessions: &[ExerciseSession],
    reference: HistoryReference,
    limit: usize,
) -> Vec<HistoricalSession> {
    let mut eligible: Vec<&ExerciseSession> = sessions
        .iter()
        .filter(|s| s.workout_date < reference.date)
        .filter(|s| s.has_data())
        .collect();
    eligible.sort_by(|a, b| b.workout_date.cmp(&a.workout_date));

    eligible
        .into_iter()
        .take(limit)
        .map(|s| HistoricalSession {
            date: s.workout_date,
            sets: s.sets.clone(),
        })
        .collect()
}

/// What was lifted for this set number last time, if anything.
pub fn placeholder_for(previous: Option<&ExerciseSession>, set_number: u32) -> Option<&Set> {
    previous?
        .sets
        .iter()
        .find(|s| s.set_number == set_number && s.has_data())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn session(id: i64, day: u32, sets: Vec<Set>) -> ExerciseSession {
        ExerciseSession {
            workout_exercise_id: id * 10,
            workout_id: id,
            workout_date: date(day),
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            sets,
        }
    }

    #[test]
    fn best_set_skips_low_rep_sets_and_breaks_ties_on_reps() {
        let sets = [
            Set::new(1, 80.0, 5),
            Set::new(2, 60.0, 8),
            Set::new(3, 60.0, 6),
        ];
        assert_eq!(best_set(&sets), Some(Set::new(2, 60.0, 8)));
    }

    #[test]
    fn best_set_none_when_nothing_qualifies() {
        let sets = [Set::new(1, 100.0, 3), Set::empty(2)];
        assert_eq!(best_set(&sets), None);
        assert_eq!(best_set(std::iter::empty::<&Set>()), None);
    }

    #[test]
    fn most_recent_ignores_zero_rep_sessions_and_reference() {
        let sessions = vec![
            session(1, 1, vec![Set::new(1, 50.0, 10)]),
            session(2, 3, vec![Set::new(1, 50.0, 0), Set::empty(2)]),
            session(3, 5, vec![Set::new(1, 55.0, 8)]),
        ];
        let reference = HistoryReference {
            workout_id: 3,
            date: date(5),
        };
        let found = most_recent_with_data(&sessions, reference).unwrap();
        assert_eq!(found.workout_id, 1);
    }

    #[test]
    fn most_recent_includes_same_day_sessions() {
        let sessions = vec![
            session(1, 1, vec![Set::new(1, 50.0, 10)]),
            session(2, 5, vec![Set::new(1, 52.5, 10)]),
        ];
        let reference = HistoryReference {
            workout_id: 3,
            date: date(5),
        };
        assert_eq!(
            most_recent_with_data(&sessions, reference).map(|s| s.workout_id),
            Some(2)
        );
    }

    #[test]
    fn recent_sessions_are_strictly_earlier_and_limited() {
        let sessions = vec![
            session(1, 1, vec![Set::new(1, 40.0, 10)]),
            session(2, 2, vec![Set::new(1, 45.0, 10)]),
            session(3, 3, vec![Set::empty(1)]),
            session(4, 4, vec![Set::new(1, 50.0, 10)]),
            session(5, 6, vec![Set::new(1, 55.0, 10)]),
            session(6, 7, vec![Set::new(1, 60.0, 10)]),
        ];
        let reference = HistoryReference {
            workout_id: 5,
            date: date(6),
        };
        let history = recent_sessions(&sessions, reference, DEFAULT_HISTORY_SESSIONS);
        let dates: Vec<NaiveDate> = history.iter().map(|h| h.date).collect();
        assert_eq!(dates, vec![date(4), date(2), date(1)]);
    }

    #[test]
    fn placeholder_matches_set_number() {
        let previous = session(1, 1, vec![Set::new(1, 40.0, 10), Set::new(2, 42.5, 8)]);
        assert_eq!(
            placeholder_for(Some(&previous), 2),
            Some(&Set::new(2, 42.5, 8))
        );
        assert_eq!(placeholder_for(Some(&previous), 3), None);
        assert_eq!(placeholder_for(None, 1), None);
    }
}
