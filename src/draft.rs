// src/draft.rs
//! Editing lifecycle for a workout exercise's sets.
//!
//! A session starts in `Viewing`. `begin` snapshots the committed sets into the
//! draft field and moves to `Editing`; local edits schedule a debounced auto-save
//! that persists only complete sets. `commit` validates, strips empty rows and
//! clears the snapshot. `cancel` writes the snapshot back over the live sets.
//! Opening a session always clears a leftover snapshot, so a reload abandons
//! whatever edit was in flight.
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{Error as DbError, SetStore};
use crate::sets::{
    complete_sets, remove_empty_sets, renumber, validate_for_commit, Set, SetValidationError,
    MAX_SETS,
};

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Viewing,
    Editing,
}

#[derive(Error, Debug)]
pub enum DraftError {
    #[error("Workout exercise {0} is not being edited")]
    NotEditing(i64),
    #[error("Workout exercise {0} is already being edited")]
    AlreadyEditing(i64),
    #[error("Set {0} does not exist")]
    SetNotFound(u32),
    #[error("Set number {0} is outside 1..={max}", max = MAX_SETS)]
    SetNumberOutOfRange(u32),
    #[error("No draft to restore for workout exercise {0}")]
    NoDraftToRestore(i64),
    #[error(transparent)]
    Validation(#[from] SetValidationError),
    #[error("Failed to persist sets: {0}")]
    Store(#[from] DbError),
}

/// Trailing-edge debouncer. Every `schedule` pushes the deadline out by `delay`;
/// the caller supplies the clock.
#[derive(Debug, Clone)]
pub struct AutoSave {
    delay: Duration,
    deadline: Option<Instant>,
}

impl AutoSave {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Clears and reports the pending save if its quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for AutoSave {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_DELAY)
    }
}

#[derive(Debug, Clone)]
pub struct EditSession {
    workout_exercise_id: i64,
    state: EditState,
    sets: Vec<Set>,
    autosave: AutoSave,
}

impl EditSession {
    /// Loads the committed sets and clears any snapshot left by an abandoned edit.
    /// # Errors
    /// `DraftError::Store` if the record cannot be read or the snapshot cannot be cleared.
    pub fn open<S: SetStore + ?Sized>(
        store: &S,
        workout_exercise_id: i64,
        autosave_delay: Duration,
    ) -> Result<Self, DraftError> {
        let mut sets = store.load_sets(workout_exercise_id)?;
        renumber(&mut sets);
        if store.load_draft_snapshot(workout_exercise_id)?.is_some() {
            warn!(
                workout_exercise_id,
                "discarding draft snapshot from an unfinished edit"
            );
        }
        store.save_draft_snapshot(workout_exercise_id, None)?;

        Ok(Self {
            workout_exercise_id,
            state: EditState::Viewing,
            sets,
            autosave: AutoSave::new(autosave_delay),
        })
    }

    pub const fn workout_exercise_id(&self) -> i64 {
        self.workout_exercise_id
    }

    pub const fn state(&self) -> EditState {
        self.state
    }

    pub fn is_editing(&self) -> bool {
        self.state == EditState::Editing
    }

    /// Local sets, including unsaved edits.
    pub fn sets(&self) -> &[Set] {
        &self.sets
    }

    pub const fn has_pending_autosave(&self) -> bool {
        self.autosave.is_pending()
    }

    fn ensure_editing(&self) -> Result<(), DraftError> {
        if self.is_editing() {
            Ok(())
        } else {
            Err(DraftError::NotEditing(self.workout_exercise_id))
        }
    }

    /// Viewing -> Editing. The snapshot must be written before edit mode is entered.
    /// # Errors
    /// `AlreadyEditing`, or `Store` if the snapshot write fails (state stays `Viewing`).
    pub fn begin<S: SetStore + ?Sized>(&mut self, store: &S) -> Result<(), DraftError> {
        if self.is_editing() {
            return Err(DraftError::AlreadyEditing(self.workout_exercise_id));
        }
        store.save_draft_snapshot(self.workout_exercise_id, Some(&self.sets))?;
        self.state = EditState::Editing;
        info!(workout_exercise_id = self.workout_exercise_id, "editing sets");
        Ok(())
    }

    /// # Errors
    /// `NotEditing` or `SetNotFound`.
    pub fn update_set(
        &mut self,
        set_number: u32,
        weight: Option<f64>,
        reps: Option<u32>,
        now: Instant,
    ) -> Result<(), DraftError> {
        self.ensure_editing()?;
        let set = self
            .sets
            .iter_mut()
            .find(|s| s.set_number == set_number)
            .ok_or(DraftError::SetNotFound(set_number))?;
        set.weight = weight;
        set.reps = reps;
        self.autosave.schedule(now);
        Ok(())
    }

    /// Appends an empty set and returns its number.
    /// # Errors
    /// `NotEditing`.
    pub fn add_set(&mut self, now: Instant) -> Result<u32, DraftError> {
        self.ensure_editing()?;
        let next = self.sets.iter().map(|s| s.set_number).max().unwrap_or(0) + 1;
        self.sets.push(Set::empty(next));
        self.autosave.schedule(now);
        Ok(next)
    }

    /// Appends empty sets until `set_number` exists.
    /// # Errors
    /// `NotEditing`, or `SetNumberOutOfRange` for zero or anything past `MAX_SETS`.
    pub fn ensure_set(&mut self, set_number: u32, now: Instant) -> Result<(), DraftError> {
        self.ensure_editing()?;
        if set_number == 0 || set_number > MAX_SETS {
            return Err(DraftError::SetNumberOutOfRange(set_number));
        }
        while self.sets.iter().map(|s| s.set_number).max().unwrap_or(0) < set_number {
            self.add_set(now)?;
        }
        Ok(())
    }

    /// Removes a set and renumbers the rest.
    /// # Errors
    /// `NotEditing` or `SetNotFound`.
    pub fn remove_set(&mut self, set_number: u32, now: Instant) -> Result<(), DraftError> {
        self.ensure_editing()?;
        let position = self
            .sets
            .iter()
            .position(|s| s.set_number == set_number)
            .ok_or(DraftError::SetNotFound(set_number))?;
        self.sets.remove(position);
        renumber(&mut self.sets);
        self.autosave.schedule(now);
        Ok(())
    }

    /// Persists the complete sets if the debounce window has elapsed.
    /// Returns whether a write happened. Outside of edit mode any pending save is dropped.
    /// # Errors
    /// `Store` if the write fails; local edits are kept.
    pub fn flush_autosave<S: SetStore + ?Sized>(
        &mut self,
        store: &S,
        now: Instant,
    ) -> Result<bool, DraftError> {
        if !self.is_editing() {
            self.autosave.cancel();
            return Ok(false);
        }
        if !self.autosave.take_due(now) {
            return Ok(false);
        }
        let mut to_save = complete_sets(&self.sets);
        renumber(&mut to_save);
        store.save_sets(self.workout_exercise_id, &to_save)?;
        debug!(
            workout_exercise_id = self.workout_exercise_id,
            saved = to_save.len(),
            "auto-saved sets"
        );
        Ok(true)
    }

    fn prepare_commit(&self) -> Result<Vec<Set>, DraftError> {
        self.ensure_editing()?;
        validate_for_commit(&self.sets)?;
        let mut cleaned = remove_empty_sets(&self.sets);
        renumber(&mut cleaned);
        Ok(cleaned)
    }

    fn finish(&mut self, sets: Vec<Set>) {
        self.sets = sets;
        self.autosave.cancel();
        self.state = EditState::Viewing;
    }

    /// Editing -> Viewing, keeping the edits.
    /// # Errors
    /// `NotEditing`, `Validation` (nothing written, still editing) or `Store`
    /// (still editing).
    pub fn commit<S: SetStore + ?Sized>(&mut self, store: &S) -> Result<&[Set], DraftError> {
        let cleaned = self.prepare_commit()?;
        store.finalize_sets(&[(self.workout_exercise_id, cleaned.as_slice())])?;
        self.finish(cleaned);
        info!(
            workout_exercise_id = self.workout_exercise_id,
            sets = self.sets.len(),
            "committed sets"
        );
        Ok(&self.sets)
    }

    /// Editing -> Viewing, restoring the snapshot taken at `begin`.
    /// # Errors
    /// `NotEditing`, `NoDraftToRestore` (live sets untouched) or `Store`.
    pub fn cancel<S: SetStore + ?Sized>(&mut self, store: &S) -> Result<(), DraftError> {
        self.ensure_editing()?;
        let snapshot = store
            .load_draft_snapshot(self.workout_exercise_id)?
            .ok_or(DraftError::NoDraftToRestore(self.workout_exercise_id))?;
        store.finalize_sets(&[(self.workout_exercise_id, snapshot.as_slice())])?;
        self.finish(snapshot);
        info!(
            workout_exercise_id = self.workout_exercise_id,
            "restored sets from draft"
        );
        Ok(())
    }
}

/// Two workout exercises edited and committed together.
#[derive(Debug, Clone)]
pub struct SupersetSession {
    first: EditSession,
    second: EditSession,
}

impl SupersetSession {
    pub const fn new(first: EditSession, second: EditSession) -> Self {
        Self { first, second }
    }

    pub const fn first(&self) -> &EditSession {
        &self.first
    }

    pub const fn second(&self) -> &EditSession {
        &self.second
    }

    pub fn first_mut(&mut self) -> &mut EditSession {
        &mut self.first
    }

    pub fn second_mut(&mut self) -> &mut EditSession {
        &mut self.second
    }

    pub fn is_editing(&self) -> bool {
        self.first.is_editing() && self.second.is_editing()
    }

    /// Enters edit mode on both or neither.
    /// # Errors
    /// The first failing `begin`; the first exercise's snapshot is withdrawn if the second fails.
    pub fn begin<S: SetStore + ?Sized>(&mut self, store: &S) -> Result<(), DraftError> {
        self.first.begin(store)?;
        if let Err(e) = self.second.begin(store) {
            if let Err(undo) = store.save_draft_snapshot(self.first.workout_exercise_id, None) {
                warn!(
                    workout_exercise_id = self.first.workout_exercise_id,
                    error = %undo,
                    "could not withdraw superset draft snapshot"
                );
            }
            self.first.state = EditState::Viewing;
            return Err(e);
        }
        Ok(())
    }

    /// # Errors
    /// `Store` if either auto-save write fails.
    pub fn flush_autosave<S: SetStore + ?Sized>(
        &mut self,
        store: &S,
        now: Instant,
    ) -> Result<bool, DraftError> {
        let first = self.first.flush_autosave(store, now)?;
        let second = self.second.flush_autosave(store, now)?;
        Ok(first || second)
    }

    /// Both exercises must pass validation before anything is written, and both
    /// are written or neither is.
    /// # Errors
    /// `Validation` or `NotEditing` from either side, or `Store`. Both stay editing.
    pub fn commit<S: SetStore + ?Sized>(&mut self, store: &S) -> Result<(), DraftError> {
        let first_clean = self.first.prepare_commit()?;
        let second_clean = self.second.prepare_commit()?;

        store.finalize_sets(&[
            (self.first.workout_exercise_id, first_clean.as_slice()),
            (self.second.workout_exercise_id, second_clean.as_slice()),
        ])?;

        self.first.finish(first_clean);
        self.second.finish(second_clean);
        info!(
            first = self.first.workout_exercise_id,
            second = self.second.workout_exercise_id,
            "committed superset"
        );
        Ok(())
    }

    /// Both snapshots must exist before either is restored.
    /// # Errors
    /// `NotEditing`, `NoDraftToRestore` (nothing written) or `Store`.
    pub fn cancel<S: SetStore + ?Sized>(&mut self, store: &S) -> Result<(), DraftError> {
        self.first.ensure_editing()?;
        self.second.ensure_editing()?;
        let first_id = self.first.workout_exercise_id;
        let second_id = self.second.workout_exercise_id;
        let first_snapshot = store
            .load_draft_snapshot(first_id)?
            .ok_or(DraftError::NoDraftToRestore(first_id))?;
        let second_snapshot = store
            .load_draft_snapshot(second_id)?
            .ok_or(DraftError::NoDraftToRestore(second_id))?;

        store.finalize_sets(&[
            (first_id, first_snapshot.as_slice()),
            (second_id, second_snapshot.as_slice()),
        ])?;

        self.first.finish(first_snapshot);
        self.second.finish(second_snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default, Clone)]
    struct Record {
        sets: Vec<Set>,
        draft: Option<Vec<Set>>,
    }

    /// In-memory store that can be told to reject snapshot writes for one record.
    #[derive(Default)]
    struct MemoryStore {
        records: RefCell<HashMap<i64, Record>>,
        reject_snapshot_for: Option<i64>,
        set_writes: RefCell<usize>,
    }

    impl MemoryStore {
        fn with(records: &[(i64, Vec<Set>)]) -> Self {
            let store = Self::default();
            for (id, sets) in records {
                store.records.borrow_mut().insert(
                    *id,
                    Record {
                        sets: sets.clone(),
                        draft: None,
                    },
                );
            }
            store
        }

        fn record(&self, id: i64) -> Record {
            self.records.borrow()[&id].clone()
        }
    }

    impl SetStore for MemoryStore {
        fn load_sets(&self, id: i64) -> Result<Vec<Set>, DbError> {
            self.records
                .borrow()
                .get(&id)
                .map(|r| r.sets.clone())
                .ok_or(DbError::WorkoutExerciseNotFound(id))
        }

        fn load_draft_snapshot(&self, id: i64) -> Result<Option<Vec<Set>>, DbError> {
            self.records
                .borrow()
                .get(&id)
                .map(|r| r.draft.clone())
                .ok_or(DbError::WorkoutExerciseNotFound(id))
        }

        fn save_sets(&self, id: i64, sets: &[Set]) -> Result<(), DbError> {
            *self.set_writes.borrow_mut() += 1;
            let mut records = self.records.borrow_mut();
            let record = records
                .get_mut(&id)
                .ok_or(DbError::WorkoutExerciseNotFound(id))?;
            record.sets = sets.to_vec();
            Ok(())
        }

        fn save_draft_snapshot(&self, id: i64, snapshot: Option<&[Set]>) -> Result<(), DbError> {
            if snapshot.is_some() && self.reject_snapshot_for == Some(id) {
                return Err(DbError::WorkoutExerciseNotFound(id));
            }
            let mut records = self.records.borrow_mut();
            let record = records
                .get_mut(&id)
                .ok_or(DbError::WorkoutExerciseNotFound(id))?;
            record.draft = snapshot.map(<[Set]>::to_vec);
            Ok(())
        }

        fn finalize_sets(&self, entries: &[(i64, &[Set])]) -> Result<(), DbError> {
            let mut records = self.records.borrow_mut();
            if let Some((missing, _)) = entries.iter().find(|(id, _)| !records.contains_key(id)) {
                return Err(DbError::WorkoutExerciseNotFound(*missing));
            }
            for (id, sets) in entries {
                *self.set_writes.borrow_mut() += 1;
                if let Some(record) = records.get_mut(id) {
                    record.sets = sets.to_vec();
                    record.draft = None;
                }
            }
            Ok(())
        }
    }

    #[test]
    fn failed_snapshot_write_keeps_viewing() {
        let mut store = MemoryStore::with(&[(1, vec![Set::new(1, 50.0, 5)])]);
        store.reject_snapshot_for = Some(1);
        let mut session = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        assert!(session.begin(&store).is_err());
        assert_eq!(session.state(), EditState::Viewing);
    }

    #[test]
    fn autosave_is_debounced_and_skips_partial_sets() {
        let store = MemoryStore::with(&[(1, vec![Set::empty(1), Set::empty(2)])]);
        let mut session = EditSession::open(&store, 1, Duration::from_millis(500)).unwrap();
        session.begin(&store).unwrap();

        let t0 = Instant::now();
        session.update_set(1, Some(60.0), Some(8), t0).unwrap();
        session
            .update_set(2, Some(60.0), None, t0 + Duration::from_millis(300))
            .unwrap();

        // Second edit pushed the deadline to t0 + 800ms.
        assert!(!session
            .flush_autosave(&store, t0 + Duration::from_millis(600))
            .unwrap());
        assert_eq!(*store.set_writes.borrow(), 0);

        assert!(session
            .flush_autosave(&store, t0 + Duration::from_millis(800))
            .unwrap());
        assert_eq!(store.record(1).sets, vec![Set::new(1, 60.0, 8)]);
        assert!(!session.has_pending_autosave());
    }

    #[test]
    fn pending_autosave_dropped_after_commit() {
        let store = MemoryStore::with(&[(1, vec![Set::empty(1)])]);
        let mut session = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        session.begin(&store).unwrap();
        let t0 = Instant::now();
        session.update_set(1, Some(40.0), Some(12), t0).unwrap();
        session.commit(&store).unwrap();
        let writes = *store.set_writes.borrow();
        assert!(!session
            .flush_autosave(&store, t0 + Duration::from_secs(5))
            .unwrap());
        assert_eq!(*store.set_writes.borrow(), writes);
    }

    #[test]
    fn commit_rejects_partial_sets_without_writing() {
        let store = MemoryStore::with(&[(1, vec![Set::empty(1)])]);
        let mut session = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        session.begin(&store).unwrap();
        session
            .update_set(1, None, Some(10), Instant::now())
            .unwrap();
        let err = session.commit(&store).unwrap_err();
        assert!(matches!(err, DraftError::Validation(_)));
        assert!(session.is_editing());
        assert_eq!(*store.set_writes.borrow(), 0);
        assert!(store.record(1).draft.is_some());
    }

    #[test]
    fn remove_set_renumbers() {
        let store = MemoryStore::with(&[(1, vec![Set::new(1, 1.0, 1), Set::new(2, 2.0, 2), Set::new(3, 3.0, 3)])]);
        let mut session = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        session.begin(&store).unwrap();
        session.remove_set(2, Instant::now()).unwrap();
        assert_eq!(session.sets(), &[Set::new(1, 1.0, 1), Set::new(2, 3.0, 3)]);
        assert_eq!(session.add_set(Instant::now()).unwrap(), 3);
    }

    #[test]
    fn superset_begin_withdraws_first_snapshot_when_second_fails() {
        let mut store = MemoryStore::with(&[(1, vec![Set::empty(1)]), (2, vec![Set::empty(1)])]);
        store.reject_snapshot_for = Some(2);
        let first = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        let second = EditSession::open(&store, 2, DEFAULT_AUTOSAVE_DELAY).unwrap();
        let mut superset = SupersetSession::new(first, second);

        assert!(superset.begin(&store).is_err());
        assert_eq!(superset.first().state(), EditState::Viewing);
        assert_eq!(superset.second().state(), EditState::Viewing);
        assert!(store.record(1).draft.is_none());
    }

    #[test]
    fn superset_commit_blocked_by_either_side() {
        let store = MemoryStore::with(&[(1, vec![Set::empty(1)]), (2, vec![Set::empty(1)])]);
        let first = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        let second = EditSession::open(&store, 2, DEFAULT_AUTOSAVE_DELAY).unwrap();
        let mut superset = SupersetSession::new(first, second);
        superset.begin(&store).unwrap();

        let now = Instant::now();
        superset
            .first_mut()
            .update_set(1, Some(100.0), Some(5), now)
            .unwrap();
        superset
            .second_mut()
            .update_set(1, Some(20.0), None, now)
            .unwrap();

        assert!(matches!(
            superset.commit(&store),
            Err(DraftError::Validation(_))
        ));
        assert!(superset.first().is_editing());
        assert!(superset.second().is_editing());
        assert_eq!(store.record(1).sets, vec![Set::empty(1)]);

        superset
            .second_mut()
            .update_set(1, Some(20.0), Some(15), now)
            .unwrap();
        superset.commit(&store).unwrap();
        assert_eq!(store.record(1).sets, vec![Set::new(1, 100.0, 5)]);
        assert_eq!(store.record(2).sets, vec![Set::new(1, 20.0, 15)]);
        assert!(store.record(1).draft.is_none());
        assert!(store.record(2).draft.is_none());
    }

    #[test]
    fn autosave_keeps_saved_numbers_dense() {
        let store = MemoryStore::with(&[(1, vec![Set::empty(1), Set::empty(2), Set::empty(3)])]);
        let mut session = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        session.begin(&store).unwrap();
        let t0 = Instant::now();
        session.update_set(1, Some(100.0), Some(5), t0).unwrap();
        session.update_set(2, Some(100.0), None, t0).unwrap();
        assert!(session.flush_autosave(&store, t0 + Duration::from_secs(1)).unwrap());
        assert_eq!(store.record(1).sets, vec![Set::new(1, 100.0, 5), Set::empty(2)]);
    }

    #[test]
    fn open_renumbers_gapped_sets() {
        let store = MemoryStore::with(&[(1, vec![Set::new(1, 100.0, 5), Set::empty(3)])]);
        let mut session = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        assert_eq!(session.sets(), &[Set::new(1, 100.0, 5), Set::empty(2)]);
        session.begin(&store).unwrap();
        session.update_set(2, Some(90.0), Some(6), Instant::now()).unwrap();
    }

    #[test]
    fn ensure_set_grows_to_the_requested_number() {
        let store = MemoryStore::with(&[(1, vec![Set::empty(1)])]);
        let mut session = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        let now = Instant::now();
        assert!(matches!(
            session.ensure_set(2, now),
            Err(DraftError::NotEditing(1))
        ));
        session.begin(&store).unwrap();

        session.ensure_set(4, now).unwrap();
        assert_eq!(
            session.sets().iter().map(|s| s.set_number).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        session.ensure_set(2, now).unwrap();
        assert_eq!(session.sets().len(), 4);

        assert!(matches!(
            session.ensure_set(0, now),
            Err(DraftError::SetNumberOutOfRange(0))
        ));
        assert!(matches!(
            session.ensure_set(4_000_000_000, now),
            Err(DraftError::SetNumberOutOfRange(4_000_000_000))
        ));
        assert_eq!(session.sets().len(), 4);
    }

    #[test]
    fn superset_commit_writes_nothing_when_a_record_is_gone() {
        let store = MemoryStore::with(&[(1, vec![Set::empty(1)]), (2, vec![Set::empty(1)])]);
        let first = EditSession::open(&store, 1, DEFAULT_AUTOSAVE_DELAY).unwrap();
        let second = EditSession::open(&store, 2, DEFAULT_AUTOSAVE_DELAY).unwrap();
        let mut superset = SupersetSession::new(first, second);
        superset.begin(&store).unwrap();

        let now = Instant::now();
        superset.first_mut().update_set(1, Some(100.0), Some(5), now).unwrap();
        superset.second_mut().update_set(1, Some(20.0), Some(15), now).unwrap();
        store.records.borrow_mut().remove(&2);

        assert!(matches!(
            superset.commit(&store),
            Err(DraftError::Store(DbError::WorkoutExerciseNotFound(2)))
        ));
        assert!(superset.is_editing());
        assert_eq!(store.record(1).sets, vec![Set::empty(1)]);
        assert!(store.record(1).draft.is_some());
    }
}
