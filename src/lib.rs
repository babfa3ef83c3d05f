use anyhow::{bail, Context, Result};
// Use anyhow::Result as standard Result for service layer
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// --- Declare modules ---
mod config;
pub mod db;
pub mod draft;
pub mod history;
pub mod ordering;
pub mod sets;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util, load_config as load_config_util, parse_color,
    save_config as save_config_util, Config, ConfigError, StandardColor, ThemeConfig, Units,
    CONFIG_ENV_VAR,
};

pub use db::{
    get_db_path as get_db_path_util, Error as DbError, ExerciseDefinition, ExerciseField,
    ExerciseFilters, ExerciseUpdate, HistoryFilter, NewExercise, OrderTable, SetStore,
    TemplateExercise, Workout, WorkoutExercise, WorkoutTemplate,
};
pub use draft::{AutoSave, DraftError, EditSession, EditState, SupersetSession};
pub use history::{ExerciseSession, HistoricalSession, HistoryReference};
pub use ordering::{OrderError, Optimistic, Ordered};
pub use sets::{Set, SetStatus, SetValidationError};

const UNSPECIFIED_BODY_PART: &str = "Unspecified";

/// A workout together with its exercises in order.
#[derive(Debug, Clone)]
pub struct WorkoutDetail {
    pub workout: Workout,
    pub exercises: Vec<WorkoutExercise>,
}

pub struct AppService {
    pub config: Config,
    pub conn: Connection,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let conn = db::open_db(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        db::init(&conn).context("Failed to initialize database schema")?;
        info!(db = %db_path.display(), config = %config_path.display(), "service ready");

        Ok(Self {
            config,
            conn,
            db_path,
            config_path,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save_config(&self.config_path, &self.config)
    }

    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_units(&mut self, units: Units) -> Result<(), ConfigError> {
        self.config.units = units;
        self.save_config()
    }

    /// # Errors
    /// `ConfigError::InvalidHistorySessions` for zero, or a save failure.
    pub fn set_history_sessions(&mut self, count: usize) -> Result<(), ConfigError> {
        self.config.set_history_sessions(count)?;
        self.save_config()
    }

    /// # Errors
    /// `ConfigError::InvalidAutosaveDelay`, or a save failure.
    pub fn set_autosave_delay_ms(&mut self, delay_ms: u64) -> Result<(), ConfigError> {
        self.config.set_autosave_delay_ms(delay_ms)?;
        self.save_config()
    }

    /// # Errors
    /// `ConfigError::InvalidColor`, or a save failure.
    pub fn set_header_color(&mut self, color_name: &str) -> Result<StandardColor, ConfigError> {
        let color = self.config.set_header_color(color_name)?;
        self.save_config()?;
        Ok(color)
    }

    // ---- Exercise catalog ----

    /// Resolves an ID or a (case-insensitive) name.
    /// # Errors
    /// Returns `anyhow::Error` if identifier is empty or the lookup fails.
    pub fn resolve_exercise_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<ExerciseDefinition>> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            bail!("Exercise identifier cannot be empty.");
        }
        db::get_exercise_by_identifier(&self.conn, trimmed)
            .with_context(|| format!("Failed to resolve exercise identifier '{trimmed}'"))
    }

    fn require_exercise(&self, identifier: &str) -> Result<ExerciseDefinition> {
        match self.resolve_exercise_identifier(identifier)? {
            Some(exercise) => Ok(exercise),
            None => bail!(DbError::ExerciseNotFound(identifier.trim().to_string())),
        }
    }

    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or already taken.
    pub fn create_exercise(&self, exercise: &NewExercise) -> Result<i64> {
        let trimmed_name = exercise.name.trim();
        if trimmed_name.is_empty() {
            bail!("Exercise name cannot be empty.");
        }
        let cleaned = NewExercise {
            name: trimmed_name,
            ..exercise.clone()
        };
        let id = db::create_exercise(&self.conn, &cleaned)
            .with_context(|| format!("Failed to create exercise '{trimmed_name}'"))?;
        info!(exercise_id = id, name = trimmed_name, "created exercise");
        Ok(id)
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn list_exercises(&self, filters: &ExerciseFilters) -> Result<Vec<ExerciseDefinition>> {
        db::list_exercises(&self.conn, filters).context("Failed to list exercises")
    }

    /// Exercises keyed by primary body part, sorted by body part then name.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn exercises_by_body_part(
        &self,
        filters: &ExerciseFilters,
    ) -> Result<BTreeMap<String, Vec<ExerciseDefinition>>> {
        let mut groups: BTreeMap<String, Vec<ExerciseDefinition>> = BTreeMap::new();
        for exercise in self.list_exercises(filters)? {
            let key = exercise
                .primary_body_part
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(UNSPECIFIED_BODY_PART)
                .to_string();
            groups.entry(key).or_default().push(exercise);
        }
        Ok(groups)
    }

    fn update_exercise(&self, identifier: &str, update: &ExerciseUpdate) -> Result<()> {
        let exercise = self.require_exercise(identifier)?;
        db::update_exercise(&self.conn, exercise.id, update)
            .with_context(|| format!("Failed to update exercise '{}'", exercise.name))?;
        Ok(())
    }

    /// `None` or a blank string clears the notes.
    /// # Errors
    /// Returns `anyhow::Error` if the exercise does not exist or the update fails.
    pub fn set_exercise_notes(&self, identifier: &str, notes: Option<&str>) -> Result<()> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        self.update_exercise(
            identifier,
            &ExerciseUpdate {
                notes: Some(notes.map(str::to_string)),
                ..ExerciseUpdate::default()
            },
        )
    }

    /// # Errors
    /// Returns `anyhow::Error` if the exercise does not exist or the update fails.
    pub fn set_exercise_mastered(&self, identifier: &str, mastered: bool) -> Result<()> {
        self.update_exercise(
            identifier,
            &ExerciseUpdate {
                mastered: Some(mastered),
                ..ExerciseUpdate::default()
            },
        )
    }

    /// # Errors
    /// Returns `anyhow::Error` if the exercise does not exist or the update fails.
    pub fn set_exercise_video(&self, identifier: &str, video_url: Option<&str>) -> Result<()> {
        let video_url = video_url.map(str::trim).filter(|v| !v.is_empty());
        self.update_exercise(
            identifier,
            &ExerciseUpdate {
                video_url: Some(video_url.map(str::to_string)),
                ..ExerciseUpdate::default()
            },
        )
    }

    /// Deletes an exercise no workout or template refers to.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError::ExerciseInUse` while it is referenced.
    pub fn delete_exercise(&self, identifier: &str) -> Result<u64> {
        let exercise = self.require_exercise(identifier)?;
        let deleted = db::delete_exercise(&self.conn, exercise.id)
            .with_context(|| format!("Failed to delete exercise '{}'", exercise.name))?;
        info!(exercise_id = exercise.id, "deleted exercise");
        Ok(deleted)
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn list_distinct_values(&self, field: ExerciseField) -> Result<Vec<String>> {
        db::list_distinct_values(&self.conn, field)
            .with_context(|| format!("Failed to list {field} values"))
    }

    // ---- Workouts ----

    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or insertion fails.
    pub fn create_workout(&self, name: &str, date: NaiveDate) -> Result<i64> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Workout name cannot be empty.");
        }
        let id = db::create_workout(&self.conn, trimmed, date)
            .with_context(|| format!("Failed to create workout '{trimmed}'"))?;
        info!(workout_id = id, %date, "created workout");
        Ok(id)
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError::WorkoutNotFound`.
    pub fn get_workout(&self, id: i64) -> Result<Workout> {
        db::get_workout(&self.conn, id)
            .context("Failed to load workout")?
            .ok_or(DbError::WorkoutNotFound(id))
            .map_err(Into::into)
    }

    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or the workout does not exist.
    pub fn rename_workout(&self, id: i64, name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Workout name cannot be empty.");
        }
        db::rename_workout(&self.conn, id, trimmed).context("Failed to rename workout")
    }

    /// # Errors
    /// Returns `anyhow::Error` if the workout does not exist.
    pub fn move_workout(&self, id: i64, date: NaiveDate) -> Result<()> {
        db::set_workout_date(&self.conn, id, date).context("Failed to move workout")
    }

    /// # Errors
    /// Returns `anyhow::Error` if `from` is after `to` or the query fails.
    pub fn list_workouts(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Workout>> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                bail!("Start date {from} is after end date {to}.");
            }
        }
        db::list_workouts(&self.conn, from, to).context("Failed to list workouts")
    }

    /// Deletes a workout and every exercise logged in it.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError::WorkoutNotFound`.
    pub fn delete_workout(&mut self, id: i64) -> Result<u64> {
        let deleted =
            db::delete_workout(&mut self.conn, id).context("Failed to delete workout")?;
        info!(workout_id = id, "deleted workout");
        Ok(deleted)
    }

    /// # Errors
    /// Returns `anyhow::Error` if the workout does not exist.
    pub fn workout_detail(&self, id: i64) -> Result<WorkoutDetail> {
        let workout = self.get_workout(id)?;
        let exercises = db::list_workout_exercises(&self.conn, id)
            .context("Failed to list workout exercises")?;
        Ok(WorkoutDetail { workout, exercises })
    }

    /// Appends an exercise to a workout. Without explicit sets the list is seeded
    /// from the most recently created record for the same exercise.
    /// # Errors
    /// Returns `anyhow::Error` if the workout or exercise does not exist.
    pub fn add_exercise_to_workout(
        &self,
        workout_id: i64,
        exercise_identifier: &str,
        sets: Option<Vec<Set>>,
    ) -> Result<i64> {
        let workout = self.get_workout(workout_id)?;
        let exercise = self.require_exercise(exercise_identifier)?;
        attach_exercise(&self.conn, &workout, &exercise, sets)
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError::WorkoutExerciseNotFound`.
    pub fn remove_workout_exercise(&mut self, workout_exercise_id: i64) -> Result<()> {
        db::delete_workout_exercise(&mut self.conn, workout_exercise_id)
            .context("Failed to remove exercise from workout")
    }

    /// The workout's exercises wrapped for an optimistic reorder.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn workout_order(&self, workout_id: i64) -> Result<Optimistic<Vec<WorkoutExercise>>> {
        let exercises = db::list_workout_exercises(&self.conn, workout_id)
            .context("Failed to list workout exercises")?;
        Ok(Optimistic::new(exercises))
    }

    /// Moves the exercise at `from` to `to`. On a failed write `order` is restored.
    /// # Errors
    /// `OrderError` for bad positions, or the failed write.
    pub fn move_workout_exercise(
        &mut self,
        order: &mut Optimistic<Vec<WorkoutExercise>>,
        from: usize,
        to: usize,
    ) -> Result<()> {
        write_order(&mut self.conn, OrderTable::WorkoutExercises, order, |items| {
            ordering::reorder(items, from, to)
        })
    }

    /// Swaps the exercise at `index` with the next one. On a failed write `order` is restored.
    /// # Errors
    /// `OrderError` for bad positions, or the failed write.
    pub fn swap_workout_exercise(
        &mut self,
        order: &mut Optimistic<Vec<WorkoutExercise>>,
        index: usize,
    ) -> Result<()> {
        write_order(&mut self.conn, OrderTable::WorkoutExercises, order, |items| {
            ordering::swap_adjacent(items, index)
        })
    }

    // ---- Templates ----

    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or taken.
    pub fn create_template(&self, name: &str) -> Result<i64> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Template name cannot be empty.");
        }
        db::create_template(&self.conn, trimmed)
            .with_context(|| format!("Failed to create template '{trimmed}'"))
    }

    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or taken, or the template does not exist.
    pub fn rename_template(&self, id: i64, name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Template name cannot be empty.");
        }
        db::rename_template(&self.conn, id, trimmed).context("Failed to rename template")
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn list_templates(&self) -> Result<Vec<WorkoutTemplate>> {
        db::list_templates(&self.conn).context("Failed to list templates")
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError::TemplateNotFound`.
    pub fn get_template(&self, id: i64) -> Result<WorkoutTemplate> {
        db::get_template(&self.conn, id)
            .context("Failed to load template")?
            .ok_or(DbError::TemplateNotFound(id))
            .map_err(Into::into)
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError::TemplateNotFound`.
    pub fn delete_template(&mut self, id: i64) -> Result<u64> {
        db::delete_template(&mut self.conn, id).context("Failed to delete template")
    }

    /// # Errors
    /// Returns `anyhow::Error` if the template or exercise does not exist.
    pub fn add_exercise_to_template(&self, template_id: i64, exercise_identifier: &str) -> Result<i64> {
        let template = self.get_template(template_id)?;
        let exercise = self.require_exercise(exercise_identifier)?;
        db::add_template_exercise(&self.conn, template.id, exercise.id)
            .with_context(|| format!("Failed to add '{}' to template", exercise.name))
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn template_exercises(&self, template_id: i64) -> Result<Vec<TemplateExercise>> {
        db::list_template_exercises(&self.conn, template_id)
            .context("Failed to list template exercises")
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError::TemplateExerciseNotFound`.
    pub fn remove_template_exercise(&mut self, template_exercise_id: i64) -> Result<()> {
        db::delete_template_exercise(&mut self.conn, template_exercise_id)
            .context("Failed to remove exercise from template")
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn template_order(&self, template_id: i64) -> Result<Optimistic<Vec<TemplateExercise>>> {
        Ok(Optimistic::new(self.template_exercises(template_id)?))
    }

    /// # Errors
    /// `OrderError` for bad positions, or the failed write.
    pub fn move_template_exercise(
        &mut self,
        order: &mut Optimistic<Vec<TemplateExercise>>,
        from: usize,
        to: usize,
    ) -> Result<()> {
        write_order(&mut self.conn, OrderTable::TemplateExercises, order, |items| {
            ordering::reorder(items, from, to)
        })
    }

    /// # Errors
    /// `OrderError` for bad positions, or the failed write.
    pub fn swap_template_exercise(
        &mut self,
        order: &mut Optimistic<Vec<TemplateExercise>>,
        index: usize,
    ) -> Result<()> {
        write_order(&mut self.conn, OrderTable::TemplateExercises, order, |items| {
            ordering::swap_adjacent(items, index)
        })
    }

    /// Creates a workout holding the template's exercises in template order, each
    /// with a freshly seeded set list. All or nothing.
    /// # Errors
    /// Returns `anyhow::Error` if the template does not exist or any insert fails.
    pub fn create_workout_from_template(
        &mut self,
        template_id: i64,
        name: Option<&str>,
        date: NaiveDate,
    ) -> Result<i64> {
        let template = self.get_template(template_id)?;
        let entries = self.template_exercises(template_id)?;
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(template.name.as_str())
            .to_string();

        let tx = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;
        let workout_id = db::create_workout(&tx, &name, date).context("Failed to create workout")?;
        let workout = db::get_workout(&tx, workout_id)?.ok_or(DbError::WorkoutNotFound(workout_id))?;
        for entry in &entries {
            let exercise = db::get_exercise_by_id(&tx, entry.exercise_id)?
                .ok_or_else(|| DbError::ExerciseNotFound(entry.exercise_id.to_string()))?;
            attach_exercise(&tx, &workout, &exercise, None)?;
        }
        tx.commit().context("Failed to commit workout from template")?;

        info!(
            workout_id,
            template_id,
            exercises = entries.len(),
            "created workout from template"
        );
        Ok(workout_id)
    }

    // ---- History ----

    /// The reference point for history queries made while viewing `workout_id`.
    /// # Errors
    /// Returns `anyhow::Error` if the workout does not exist.
    pub fn history_reference(&self, workout_id: i64) -> Result<HistoryReference> {
        let workout = self.get_workout(workout_id)?;
        Ok(HistoryReference {
            workout_id: workout.id,
            date: workout.date,
        })
    }

    fn sessions(&self, exercise_id: i64, filter: &HistoryFilter) -> Result<Vec<ExerciseSession>> {
        db::get_workout_exercises_for_exercise(&self.conn, exercise_id, filter)
            .context("Failed to load exercise history")
    }

    /// Heaviest set of 6+ reps. With a reference, only workouts on or before its
    /// date count, and the reference workout itself is left out.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn best_set(
        &self,
        exercise_id: i64,
        reference: Option<HistoryReference>,
    ) -> Result<Option<Set>> {
        let filter = reference.map_or_else(HistoryFilter::default, |r| HistoryFilter {
            on_or_before: Some(r.date),
            excluding_workout: Some(r.workout_id),
            ..HistoryFilter::default()
        });
        let sessions = self.sessions(exercise_id, &filter)?;
        Ok(history::best_set_in_sessions(&sessions))
    }

    /// What was done last time, for per-set placeholders.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn previous_performance(
        &self,
        exercise_id: i64,
        reference: HistoryReference,
    ) -> Result<Option<ExerciseSession>> {
        let filter = HistoryFilter {
            on_or_before: Some(reference.date),
            excluding_workout: Some(reference.workout_id),
            ..HistoryFilter::default()
        };
        let sessions = self.sessions(exercise_id, &filter)?;
        Ok(history::most_recent_with_data(&sessions, reference).cloned())
    }

    /// Up to `config.history_sessions` earlier sessions with data, newest first.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn exercise_history(
        &self,
        exercise_id: i64,
        reference: HistoryReference,
    ) -> Result<Vec<HistoricalSession>> {
        let filter = HistoryFilter {
            before: Some(reference.date),
            ..HistoryFilter::default()
        };
        let sessions = self.sessions(exercise_id, &filter)?;
        Ok(history::recent_sessions(
            &sessions,
            reference,
            self.config.history_sessions,
        ))
    }

    // ---- Editing ----

    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError::WorkoutExerciseNotFound`.
    pub fn get_workout_exercise(&self, workout_exercise_id: i64) -> Result<WorkoutExercise> {
        db::get_workout_exercise(&self.conn, workout_exercise_id)
            .context("Failed to load workout exercise")?
            .ok_or(DbError::WorkoutExerciseNotFound(workout_exercise_id))
            .map_err(Into::into)
    }

    /// The exercise directly after this one in its workout.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `DbError` variants.
    pub fn superset_partner(&self, workout_exercise_id: i64) -> Result<Option<WorkoutExercise>> {
        let current = self.get_workout_exercise(workout_exercise_id)?;
        db::get_next_by_order_index(&self.conn, current.workout_id, current.order_index)
            .context("Failed to look up superset partner")
    }

    /// Opening clears any leftover draft snapshot.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `DraftError::Store`.
    pub fn open_edit_session(&self, workout_exercise_id: i64) -> Result<EditSession> {
        EditSession::open(
            &self.conn,
            workout_exercise_id,
            self.config.autosave_delay(),
        )
        .with_context(|| format!("Failed to open workout exercise {workout_exercise_id}"))
    }

    /// Pairs the exercise with the next one in its workout.
    /// # Errors
    /// Returns `anyhow::Error` if there is no following exercise.
    pub fn open_superset_session(&self, workout_exercise_id: i64) -> Result<SupersetSession> {
        let Some(partner) = self.superset_partner(workout_exercise_id)? else {
            bail!("Workout exercise {workout_exercise_id} is the last in its workout; nothing to superset with.");
        };
        let first = self.open_edit_session(workout_exercise_id)?;
        let second = self.open_edit_session(partner.id)?;
        Ok(SupersetSession::new(first, second))
    }
}

/// Inserts the workout exercise and moves the exercise's last-used date forward.
fn attach_exercise(
    conn: &Connection,
    workout: &Workout,
    exercise: &ExerciseDefinition,
    sets: Option<Vec<Set>>,
) -> Result<i64> {
    let sets = match sets {
        Some(mut explicit) => {
            sets::renumber(&mut explicit);
            explicit
        }
        None => {
            let prior = db::get_latest_workout_exercise_sets(conn, exercise.id)
                .context("Failed to look up previous sets")?;
            sets::seed_default_sets(prior.as_deref())
        }
    };
    let id = db::insert_workout_exercise(conn, workout.id, exercise.id, &sets)
        .with_context(|| format!("Failed to add '{}' to workout", exercise.name))?;
    db::mark_exercise_used(conn, exercise.id, workout.date)
        .context("Failed to update last-used date")?;
    info!(
        workout_id = workout.id,
        workout_exercise_id = id,
        exercise = %exercise.name,
        sets = sets.len(),
        "added exercise to workout"
    );
    Ok(id)
}

/// Applies `change` locally, writes the new order, and restores the previous
/// order if the write fails.
fn write_order<T: Ordered + Clone>(
    conn: &mut Connection,
    table: OrderTable,
    order: &mut Optimistic<Vec<T>>,
    change: impl FnOnce(&Vec<T>) -> Result<Vec<T>, OrderError>,
) -> Result<()> {
    order.apply(change)?;
    let updates = ordering::order_updates(order.current());
    if let Err(e) = db::bulk_update_order_index(conn, table, &updates) {
        order.rollback();
        warn!(error = %e, ?table, "reorder failed, restored previous order");
        return Err(anyhow::Error::new(e).context("Failed to save new order"));
    }
    order.commit();
    Ok(())
}
