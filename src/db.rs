//src/db.rs
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql, Transaction};
use std::path::{Path, PathBuf};
use strum_macros::Display;
use thiserror::Error;
use tracing::debug;

use crate::history::ExerciseSession;
use crate::ordering::{OrderUpdate, Ordered};
use crate::sets::Set;

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseDefinition {
    pub id: i64,
    pub name: String,
    pub movement_type: Option<String>,
    pub movement_pattern: Option<String>,
    pub primary_body_part: Option<String>,
    pub secondary_body_part: Option<String>,
    pub equipment: Option<String>,
    pub mastered: bool,
    pub notes: Option<String>,
    pub video_url: Option<String>,
    pub last_used: Option<NaiveDate>,
}

#[derive(Debug, Default, Clone)]
pub struct NewExercise<'a> {
    pub name: &'a str,
    pub movement_type: Option<&'a str>,
    pub movement_pattern: Option<&'a str>,
    pub primary_body_part: Option<&'a str>,
    pub secondary_body_part: Option<&'a str>,
    pub equipment: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub video_url: Option<&'a str>,
}

/// Fields of an exercise the user edits after creation.
/// The outer `Option` means "leave as is"; `Some(None)` clears the value.
#[derive(Debug, Default, Clone)]
pub struct ExerciseUpdate {
    pub notes: Option<Option<String>>,
    pub mastered: Option<bool>,
    pub video_url: Option<Option<String>>,
}

#[derive(Default, Debug)]
pub struct ExerciseFilters<'a> {
    pub name_contains: Option<&'a str>,
    /// Matches primary or secondary body part.
    pub body_part: Option<&'a str>,
    pub equipment: Option<&'a str>,
    pub movement_type: Option<&'a str>,
    pub mastered: Option<bool>,
}

/// Free-text classification columns. Their value sets come from the catalog itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ExerciseField {
    MovementType,
    MovementPattern,
    BodyPart,
    Equipment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutExercise {
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub exercise_name: String, // Populated by JOIN
    pub order_index: i64,
    pub sets: Vec<Set>,
    pub draft_sets: Option<Vec<Set>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutTemplate {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateExercise {
    pub id: i64,
    pub template_id: i64,
    pub exercise_id: i64,
    pub exercise_name: String, // Populated by JOIN
    pub order_index: i64,
}

impl Ordered for WorkoutExercise {
    fn id(&self) -> i64 {
        self.id
    }
    fn order_index(&self) -> i64 {
        self.order_index
    }
    fn set_order_index(&mut self, index: i64) {
        self.order_index = index;
    }
}

impl Ordered for TemplateExercise {
    fn id(&self) -> i64 {
        self.id
    }
    fn order_index(&self) -> i64 {
        self.order_index
    }
    fn set_order_index(&mut self, index: i64) {
        self.order_index = index;
    }
}

/// Date predicates for an exercise's history.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistoryFilter {
    pub on_or_before: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
    pub excluding_workout: Option<i64>,
}

/// Tables whose rows carry a dense `order_index` under a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTable {
    WorkoutExercises,
    TemplateExercises,
}

impl OrderTable {
    const fn table_name(self) -> &'static str {
        match self {
            Self::WorkoutExercises => "workout_exercises",
            Self::TemplateExercises => "template_exercises",
        }
    }

    const fn parent_column(self) -> &'static str {
        match self {
            Self::WorkoutExercises => "workout_id",
            Self::TemplateExercises => "template_id",
        }
    }

    fn not_found(self, id: i64) -> Error {
        match self {
            Self::WorkoutExercises => Error::WorkoutExerciseNotFound(id),
            Self::TemplateExercises => Error::TemplateExerciseNotFound(id),
        }
    }
}

// Custom Error type for DB operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Exercise not found: {0}")]
    ExerciseNotFound(String),
    #[error("Exercise name must be unique (case-insensitive): '{0}' already exists.")]
    ExerciseNameNotUnique(String),
    #[error("Exercise '{name}' is used by {usage} workout or template entries and cannot be deleted.")]
    ExerciseInUse { name: String, usage: i64 },
    #[error("Workout not found: ID {0}")]
    WorkoutNotFound(i64),
    #[error("Workout exercise not found: ID {0}")]
    WorkoutExerciseNotFound(i64),
    #[error("Template not found: ID {0}")]
    TemplateNotFound(i64),
    #[error("Template name must be unique (case-insensitive): '{0}' already exists.")]
    TemplateNameNotUnique(String),
    #[error("Template exercise not found: ID {0}")]
    TemplateExerciseNotFound(i64),
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database update failed: {0}")]
    UpdateFailed(rusqlite::Error),
    #[error("Database insert failed: {0}")]
    InsertFailed(rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
    #[error("Failed to encode set list: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Read/write access to a workout exercise's live sets and its draft snapshot.
pub trait SetStore {
    /// # Errors
    /// `Error::WorkoutExerciseNotFound` if the record does not exist.
    fn load_sets(&self, workout_exercise_id: i64) -> Result<Vec<Set>, Error>;
    /// # Errors
    /// `Error::WorkoutExerciseNotFound` if the record does not exist.
    fn load_draft_snapshot(&self, workout_exercise_id: i64) -> Result<Option<Vec<Set>>, Error>;
    /// # Errors
    /// `Error::WorkoutExerciseNotFound` if the record does not exist.
    fn save_sets(&self, workout_exercise_id: i64, sets: &[Set]) -> Result<(), Error>;
    /// `None` clears the snapshot.
    /// # Errors
    /// `Error::WorkoutExerciseNotFound` if the record does not exist.
    fn save_draft_snapshot(
        &self,
        workout_exercise_id: i64,
        snapshot: Option<&[Set]>,
    ) -> Result<(), Error>;
    /// Replaces the live sets of every listed record and clears their snapshots,
    /// all or nothing.
    /// # Errors
    /// `Error::WorkoutExerciseNotFound` if any record does not exist; nothing is written.
    fn finalize_sets(&self, entries: &[(i64, &[Set])]) -> Result<(), Error>;
}

impl SetStore for Connection {
    fn load_sets(&self, workout_exercise_id: i64) -> Result<Vec<Set>, Error> {
        get_sets(self, workout_exercise_id)
    }

    fn load_draft_snapshot(&self, workout_exercise_id: i64) -> Result<Option<Vec<Set>>, Error> {
        get_draft_snapshot(self, workout_exercise_id)
    }

    fn save_sets(&self, workout_exercise_id: i64, sets: &[Set]) -> Result<(), Error> {
        update_sets(self, workout_exercise_id, sets)
    }

    fn save_draft_snapshot(
        &self,
        workout_exercise_id: i64,
        snapshot: Option<&[Set]>,
    ) -> Result<(), Error> {
        update_draft_snapshot(self, workout_exercise_id, snapshot)
    }

    fn finalize_sets(&self, entries: &[(i64, &[Set])]) -> Result<(), Error> {
        finalize_sets(self, entries)
    }
}

const DB_FILE_NAME: &str = "iron-log.sqlite";

/// Gets the path to the SQLite database file within the app's data directory.
/// Exposed at crate root as `get_db_path_util`
pub fn get_db_path() -> Result<PathBuf, Error> {
    let data_dir = dirs::data_dir().ok_or(Error::DataDir)?;
    let app_dir = data_dir.join("iron-log"); // Same dir name as config
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, Error> {
    Connection::open(path).map_err(Error::Connection)
}

/// Initializes the database tables if they don't exist.
pub fn init(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            movement_type TEXT,
            movement_pattern TEXT,
            primary_body_part TEXT,
            secondary_body_part TEXT,
            equipment TEXT,
            mastered INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            video_url TEXT,
            last_used TEXT -- YYYY-MM-DD
        );

        CREATE TABLE IF NOT EXISTS workouts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            date TEXT NOT NULL, -- YYYY-MM-DD, day granularity
            created_at TEXT NOT NULL -- RFC3339
        );

        CREATE TABLE IF NOT EXISTS workout_exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_id INTEGER NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
            exercise_id INTEGER NOT NULL REFERENCES exercises(id),
            order_index INTEGER NOT NULL,
            sets TEXT NOT NULL DEFAULT '[]', -- JSON array of sets
            draft_sets TEXT, -- JSON snapshot while editing, NULL otherwise
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workout_templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS template_exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            template_id INTEGER NOT NULL REFERENCES workout_templates(id) ON DELETE CASCADE,
            exercise_id INTEGER NOT NULL REFERENCES exercises(id),
            order_index INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_workouts_date ON workouts(date);
        CREATE INDEX IF NOT EXISTS idx_workout_exercises_workout ON workout_exercises(workout_id);
        CREATE INDEX IF NOT EXISTS idx_workout_exercises_exercise ON workout_exercises(exercise_id);
        CREATE INDEX IF NOT EXISTS idx_template_exercises_template ON template_exercises(template_id);",
    )
    .map_err(Error::Connection)
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(idx: usize, value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_sets(idx: usize, value: &str) -> Result<Vec<Set>, rusqlite::Error> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ---- Exercise catalog ----

const EXERCISE_COLUMNS: &str = "id, name, movement_type, movement_pattern, primary_body_part, \
     secondary_body_part, equipment, mastered, notes, video_url, last_used";

fn map_row_to_exercise_definition(row: &Row) -> Result<ExerciseDefinition, rusqlite::Error> {
    Ok(ExerciseDefinition {
        id: row.get(0)?,
        name: row.get(1)?,
        movement_type: row.get(2)?,
        movement_pattern: row.get(3)?,
        primary_body_part: row.get(4)?,
        secondary_body_part: row.get(5)?,
        equipment: row.get(6)?,
        mastered: row.get(7)?,
        notes: row.get(8)?,
        video_url: row.get(9)?,
        last_used: row.get(10)?,
    })
}

/// Creates a new exercise definition. Returns the ID.
pub fn create_exercise(conn: &Connection, exercise: &NewExercise) -> Result<i64, Error> {
    let result = conn.execute(
        "INSERT INTO exercises (name, movement_type, movement_pattern, primary_body_part,
                                secondary_body_part, equipment, notes, video_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            exercise.name,
            exercise.movement_type,
            exercise.movement_pattern,
            exercise.primary_body_part,
            exercise.secondary_body_part,
            exercise.equipment,
            exercise.notes,
            exercise.video_url,
        ],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(Error::ExerciseNameNotUnique(exercise.name.to_string()))
        }
        Err(e) => Err(Error::InsertFailed(e)),
    }
}

/// Retrieves an exercise definition by its name (case-insensitive).
pub fn get_exercise_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<ExerciseDefinition>, Error> {
    let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE name = ?1 COLLATE NOCASE");
    conn.query_row(&sql, params![name], map_row_to_exercise_definition)
        .optional()
        .map_err(Error::QueryFailed)
}

/// Retrieves an exercise definition by its ID.
pub fn get_exercise_by_id(conn: &Connection, id: i64) -> Result<Option<ExerciseDefinition>, Error> {
    let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?1");
    conn.query_row(&sql, params![id], map_row_to_exercise_definition)
        .optional()
        .map_err(Error::QueryFailed)
}

/// Retrieves an exercise definition by trying ID first, then name.
pub fn get_exercise_by_identifier(
    conn: &Connection,
    identifier: &str,
) -> Result<Option<ExerciseDefinition>, Error> {
    if let Ok(id) = identifier.parse::<i64>() {
        if let Some(exercise) = get_exercise_by_id(conn, id)? {
            return Ok(Some(exercise));
        }
    }
    get_exercise_by_name(conn, identifier)
}

/// Lists exercises, optionally filtered, ordered by name.
pub fn list_exercises(
    conn: &Connection,
    filters: &ExerciseFilters,
) -> Result<Vec<ExerciseDefinition>, Error> {
    let mut sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE 1=1");
    let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(name) = filters.name_contains {
        sql.push_str(&format!(" AND name LIKE ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(format!("%{name}%")));
    }
    if let Some(part) = filters.body_part {
        let n = params_vec.len() + 1;
        sql.push_str(&format!(
            " AND (primary_body_part = ?{n} COLLATE NOCASE OR secondary_body_part = ?{n} COLLATE NOCASE)"
        ));
        params_vec.push(Box::new(part.to_string()));
    }
    if let Some(equipment) = filters.equipment {
        sql.push_str(&format!(
            " AND equipment = ?{} COLLATE NOCASE",
            params_vec.len() + 1
        ));
        params_vec.push(Box::new(equipment.to_string()));
    }
    if let Some(movement) = filters.movement_type {
        sql.push_str(&format!(
            " AND movement_type = ?{} COLLATE NOCASE",
            params_vec.len() + 1
        ));
        params_vec.push(Box::new(movement.to_string()));
    }
    if let Some(mastered) = filters.mastered {
        sql.push_str(&format!(" AND mastered = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(mastered));
    }
    sql.push_str(" ORDER BY name COLLATE NOCASE ASC");

    let params_slice: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql).map_err(Error::QueryFailed)?;
    let exercise_iter = stmt
        .query_map(params_slice.as_slice(), map_row_to_exercise_definition)
        .map_err(Error::QueryFailed)?;

    exercise_iter
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::QueryFailed)
}

/// Applies notes/mastery/video edits to an exercise.
pub fn update_exercise(conn: &Connection, id: i64, update: &ExerciseUpdate) -> Result<u64, Error> {
    let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
    let mut updates = Vec::new();

    if let Some(notes) = &update.notes {
        updates.push("notes = ?");
        params_vec.push(Box::new(notes.clone()));
    }
    if let Some(mastered) = update.mastered {
        updates.push("mastered = ?");
        params_vec.push(Box::new(mastered));
    }
    if let Some(video) = &update.video_url {
        updates.push("video_url = ?");
        params_vec.push(Box::new(video.clone()));
    }
    if updates.is_empty() {
        return Ok(0);
    }

    let sql = format!("UPDATE exercises SET {} WHERE id = ?", updates.join(", "));
    params_vec.push(Box::new(id));
    let params_slice: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    let rows_affected = conn
        .execute(&sql, params_slice.as_slice())
        .map_err(Error::UpdateFailed)?;
    if rows_affected == 0 {
        Err(Error::ExerciseNotFound(id.to_string()))
    } else {
        Ok(rows_affected as u64)
    }
}

/// Moves `last_used` forward to `date`; an older date never overwrites a newer one.
pub fn mark_exercise_used(conn: &Connection, id: i64, date: NaiveDate) -> Result<(), Error> {
    conn.execute(
        "UPDATE exercises SET last_used = ?1 WHERE id = ?2 AND (last_used IS NULL OR last_used < ?1)",
        params![date, id],
    )
    .map_err(Error::UpdateFailed)?;
    Ok(())
}

/// How many workout exercises and template exercises reference this exercise.
pub fn exercise_usage_count(conn: &Connection, id: i64) -> Result<i64, Error> {
    conn.query_row(
        "SELECT (SELECT COUNT(*) FROM workout_exercises WHERE exercise_id = ?1)
              + (SELECT COUNT(*) FROM template_exercises WHERE exercise_id = ?1)",
        params![id],
        |row| row.get(0),
    )
    .map_err(Error::QueryFailed)
}

/// Deletes an exercise that nothing references.
pub fn delete_exercise(conn: &Connection, id: i64) -> Result<u64, Error> {
    let exercise =
        get_exercise_by_id(conn, id)?.ok_or_else(|| Error::ExerciseNotFound(id.to_string()))?;
    let usage = exercise_usage_count(conn, id)?;
    if usage > 0 {
        return Err(Error::ExerciseInUse {
            name: exercise.name,
            usage,
        });
    }

    let rows_affected = conn
        .execute("DELETE FROM exercises WHERE id = ?1", params![id])
        .map_err(Error::DeleteFailed)?;
    Ok(rows_affected as u64)
}

/// Distinct non-blank values currently used for a classification field.
pub fn list_distinct_values(conn: &Connection, field: ExerciseField) -> Result<Vec<String>, Error> {
    let sql = match field {
        ExerciseField::MovementType => {
            "SELECT DISTINCT movement_type FROM exercises WHERE movement_type IS NOT NULL"
        }
        ExerciseField::MovementPattern => {
            "SELECT DISTINCT movement_pattern FROM exercises WHERE movement_pattern IS NOT NULL"
        }
        ExerciseField::Equipment => {
            "SELECT DISTINCT equipment FROM exercises WHERE equipment IS NOT NULL"
        }
        ExerciseField::BodyPart => {
            "SELECT primary_body_part FROM exercises WHERE primary_body_part IS NOT NULL
             UNION
             SELECT secondary_body_part FROM exercises WHERE secondary_body_part IS NOT NULL"
        }
    };

    let mut stmt = conn.prepare(sql).map_err(Error::QueryFailed)?;
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(Error::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::QueryFailed)?;

    let mut cleaned: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    cleaned.sort_by_key(|v| v.to_lowercase());
    cleaned.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    Ok(cleaned)
}

// ---- Workouts ----

fn map_row_to_workout(row: &Row) -> Result<Workout, rusqlite::Error> {
    let created_at: String = row.get(3)?;
    Ok(Workout {
        id: row.get(0)?,
        name: row.get(1)?,
        date: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

pub fn create_workout(conn: &Connection, name: &str, date: NaiveDate) -> Result<i64, Error> {
    conn.execute(
        "INSERT INTO workouts (name, date, created_at) VALUES (?1, ?2, ?3)",
        params![name, date, now_timestamp()],
    )
    .map_err(Error::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_workout(conn: &Connection, id: i64) -> Result<Option<Workout>, Error> {
    conn.query_row(
        "SELECT id, name, date, created_at FROM workouts WHERE id = ?1",
        params![id],
        map_row_to_workout,
    )
    .optional()
    .map_err(Error::QueryFailed)
}

pub fn rename_workout(conn: &Connection, id: i64, name: &str) -> Result<(), Error> {
    let rows = conn
        .execute(
            "UPDATE workouts SET name = ?1 WHERE id = ?2",
            params![name, id],
        )
        .map_err(Error::UpdateFailed)?;
    if rows == 0 {
        return Err(Error::WorkoutNotFound(id));
    }
    Ok(())
}

/// Moves a workout to another calendar day.
pub fn set_workout_date(conn: &Connection, id: i64, date: NaiveDate) -> Result<(), Error> {
    let rows = conn
        .execute(
            "UPDATE workouts SET date = ?1 WHERE id = ?2",
            params![date, id],
        )
        .map_err(Error::UpdateFailed)?;
    if rows == 0 {
        return Err(Error::WorkoutNotFound(id));
    }
    Ok(())
}

/// Lists workouts with dates in the inclusive range, oldest first.
pub fn list_workouts(
    conn: &Connection,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<Workout>, Error> {
    let mut sql = "SELECT id, name, date, created_at FROM workouts WHERE 1=1".to_string();
    let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(from) = from {
        sql.push_str(&format!(" AND date >= ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(from));
    }
    if let Some(to) = to {
        sql.push_str(&format!(" AND date <= ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(to));
    }
    sql.push_str(" ORDER BY date ASC, created_at ASC");

    let params_slice: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql).map_err(Error::QueryFailed)?;
    let workouts = stmt
        .query_map(params_slice.as_slice(), map_row_to_workout)
        .map_err(Error::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::QueryFailed)?;
    Ok(workouts)
}

/// Deletes a workout together with its workout exercises.
pub fn delete_workout(conn: &mut Connection, id: i64) -> Result<u64, Error> {
    let tx = conn.transaction()?;
    let children = tx
        .execute(
            "DELETE FROM workout_exercises WHERE workout_id = ?1",
            params![id],
        )
        .map_err(Error::DeleteFailed)?;
    let rows = tx
        .execute("DELETE FROM workouts WHERE id = ?1", params![id])
        .map_err(Error::DeleteFailed)?;
    if rows == 0 {
        return Err(Error::WorkoutNotFound(id));
    }
    tx.commit()?;
    debug!(workout_id = id, children, "deleted workout");
    Ok(rows as u64)
}

// ---- Workout exercises ----

const WORKOUT_EXERCISE_SELECT: &str = "SELECT we.id, we.workout_id, we.exercise_id, e.name, \
     we.order_index, we.sets, we.draft_sets, we.created_at, we.updated_at \
     FROM workout_exercises we JOIN exercises e ON e.id = we.exercise_id";

fn map_row_to_workout_exercise(row: &Row) -> Result<WorkoutExercise, rusqlite::Error> {
    let sets: String = row.get(5)?;
    let draft: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(WorkoutExercise {
        id: row.get(0)?,
        workout_id: row.get(1)?,
        exercise_id: row.get(2)?,
        exercise_name: row.get(3)?,
        order_index: row.get(4)?,
        sets: parse_sets(5, &sets)?,
        draft_sets: draft.as_deref().map(|d| parse_sets(6, d)).transpose()?,
        created_at: parse_timestamp(7, &created_at)?,
        updated_at: parse_timestamp(8, &updated_at)?,
    })
}

/// Appends an exercise to the end of a workout's order.
pub fn insert_workout_exercise(
    conn: &Connection,
    workout_id: i64,
    exercise_id: i64,
    sets: &[Set],
) -> Result<i64, Error> {
    let next_index: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM workout_exercises WHERE workout_id = ?1",
            params![workout_id],
            |row| row.get(0),
        )
        .map_err(Error::QueryFailed)?;
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO workout_exercises (workout_id, exercise_id, order_index, sets, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![workout_id, exercise_id, next_index, serde_json::to_string(sets)?, now],
    )
    .map_err(Error::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_workout_exercise(conn: &Connection, id: i64) -> Result<Option<WorkoutExercise>, Error> {
    let sql = format!("{WORKOUT_EXERCISE_SELECT} WHERE we.id = ?1");
    conn.query_row(&sql, params![id], map_row_to_workout_exercise)
        .optional()
        .map_err(Error::QueryFailed)
}

/// A workout's exercises in order.
pub fn list_workout_exercises(
    conn: &Connection,
    workout_id: i64,
) -> Result<Vec<WorkoutExercise>, Error> {
    let sql = format!("{WORKOUT_EXERCISE_SELECT} WHERE we.workout_id = ?1 ORDER BY we.order_index ASC");
    let mut stmt = conn.prepare(&sql).map_err(Error::QueryFailed)?;
    let rows = stmt
        .query_map(params![workout_id], map_row_to_workout_exercise)
        .map_err(Error::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::QueryFailed)?;
    Ok(rows)
}

/// Removes a workout exercise and closes the gap in its siblings' order.
pub fn delete_workout_exercise(conn: &mut Connection, id: i64) -> Result<(), Error> {
    let workout_id: i64 = conn
        .query_row(
            "SELECT workout_id FROM workout_exercises WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::QueryFailed)?
        .ok_or(Error::WorkoutExerciseNotFound(id))?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM workout_exercises WHERE id = ?1", params![id])
        .map_err(Error::DeleteFailed)?;
    reindex_siblings(&tx, OrderTable::WorkoutExercises, workout_id)?;
    tx.commit()?;
    Ok(())
}

/// Most recently created record for the exercise, in any workout.
/// Ordered by record creation time, not workout date.
pub fn get_latest_workout_exercise_sets(
    conn: &Connection,
    exercise_id: i64,
) -> Result<Option<Vec<Set>>, Error> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT sets FROM workout_exercises WHERE exercise_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT 1",
            params![exercise_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::QueryFailed)?;
    raw.map(|s| serde_json::from_str(&s).map_err(Error::Codec))
        .transpose()
}

/// Every record for an exercise that passes the filter, newest workout first.
pub fn get_workout_exercises_for_exercise(
    conn: &Connection,
    exercise_id: i64,
    filter: &HistoryFilter,
) -> Result<Vec<ExerciseSession>, Error> {
    let mut sql = "SELECT we.id, we.workout_id, w.date, we.created_at, we.sets
         FROM workout_exercises we JOIN workouts w ON w.id = we.workout_id
         WHERE we.exercise_id = ?1"
        .to_string();
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(exercise_id)];

    if let Some(date) = filter.on_or_before {
        sql.push_str(&format!(" AND w.date <= ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(date));
    }
    if let Some(date) = filter.before {
        sql.push_str(&format!(" AND w.date < ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(date));
    }
    if let Some(workout_id) = filter.excluding_workout {
        sql.push_str(&format!(" AND we.workout_id != ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(workout_id));
    }
    sql.push_str(" ORDER BY w.date DESC, we.created_at DESC");

    let params_slice: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql).map_err(Error::QueryFailed)?;
    let sessions = stmt
        .query_map(params_slice.as_slice(), |row| {
            let created_at: String = row.get(3)?;
            let sets: String = row.get(4)?;
            Ok(ExerciseSession {
                workout_exercise_id: row.get(0)?,
                workout_id: row.get(1)?,
                workout_date: row.get(2)?,
                created_at: parse_timestamp(3, &created_at)?,
                sets: parse_sets(4, &sets)?,
            })
        })
        .map_err(Error::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::QueryFailed)?;
    Ok(sessions)
}

pub fn get_sets(conn: &Connection, workout_exercise_id: i64) -> Result<Vec<Set>, Error> {
    let raw: String = conn
        .query_row(
            "SELECT sets FROM workout_exercises WHERE id = ?1",
            params![workout_exercise_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::QueryFailed)?
        .ok_or(Error::WorkoutExerciseNotFound(workout_exercise_id))?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn get_draft_snapshot(
    conn: &Connection,
    workout_exercise_id: i64,
) -> Result<Option<Vec<Set>>, Error> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT draft_sets FROM workout_exercises WHERE id = ?1",
            params![workout_exercise_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::QueryFailed)?
        .ok_or(Error::WorkoutExerciseNotFound(workout_exercise_id))?;
    raw.map(|s| serde_json::from_str(&s).map_err(Error::Codec))
        .transpose()
}

pub fn update_sets(conn: &Connection, workout_exercise_id: i64, sets: &[Set]) -> Result<(), Error> {
    let rows = conn
        .execute(
            "UPDATE workout_exercises SET sets = ?1, updated_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(sets)?, now_timestamp(), workout_exercise_id],
        )
        .map_err(Error::UpdateFailed)?;
    if rows == 0 {
        return Err(Error::WorkoutExerciseNotFound(workout_exercise_id));
    }
    debug!(workout_exercise_id, count = sets.len(), "saved sets");
    Ok(())
}

pub fn update_draft_snapshot(
    conn: &Connection,
    workout_exercise_id: i64,
    snapshot: Option<&[Set]>,
) -> Result<(), Error> {
    let encoded = snapshot.map(serde_json::to_string).transpose()?;
    let rows = conn
        .execute(
            "UPDATE workout_exercises SET draft_sets = ?1, updated_at = ?2 WHERE id = ?3",
            params![encoded, now_timestamp(), workout_exercise_id],
        )
        .map_err(Error::UpdateFailed)?;
    if rows == 0 {
        return Err(Error::WorkoutExerciseNotFound(workout_exercise_id));
    }
    debug!(
        workout_exercise_id,
        cleared = snapshot.is_none(),
        "saved draft snapshot"
    );
    Ok(())
}

/// Writes the final sets for each record and clears its draft snapshot in one transaction.
pub fn finalize_sets(conn: &Connection, entries: &[(i64, &[Set])]) -> Result<(), Error> {
    let tx = conn.unchecked_transaction()?;
    for (workout_exercise_id, sets) in entries {
        update_sets(&tx, *workout_exercise_id, sets)?;
        update_draft_snapshot(&tx, *workout_exercise_id, None)?;
    }
    tx.commit()?;
    Ok(())
}

/// The sibling directly after `after_index` in the workout's order.
pub fn get_next_by_order_index(
    conn: &Connection,
    workout_id: i64,
    after_index: i64,
) -> Result<Option<WorkoutExercise>, Error> {
    let sql = format!(
        "{WORKOUT_EXERCISE_SELECT} WHERE we.workout_id = ?1 AND we.order_index > ?2
         ORDER BY we.order_index ASC LIMIT 1"
    );
    conn.query_row(&sql, params![workout_id, after_index], map_row_to_workout_exercise)
        .optional()
        .map_err(Error::QueryFailed)
}

// ---- Ordering ----

/// Writes every `{id, order_index}` pair in one transaction.
/// If any id is missing the whole batch is rolled back.
pub fn bulk_update_order_index(
    conn: &mut Connection,
    table: OrderTable,
    updates: &[OrderUpdate],
) -> Result<(), Error> {
    let tx = conn.transaction()?;
    {
        let sql = format!(
            "UPDATE {} SET order_index = ?1 WHERE id = ?2",
            table.table_name()
        );
        let mut stmt = tx.prepare(&sql).map_err(Error::QueryFailed)?;
        for update in updates {
            let rows = stmt
                .execute(params![update.order_index, update.id])
                .map_err(Error::UpdateFailed)?;
            if rows == 0 {
                return Err(table.not_found(update.id));
            }
        }
    }
    tx.commit()?;
    Ok(())
}

fn reindex_siblings(tx: &Transaction, table: OrderTable, parent_id: i64) -> Result<(), Error> {
    let select = format!(
        "SELECT id FROM {} WHERE {} = ?1 ORDER BY order_index ASC, id ASC",
        table.table_name(),
        table.parent_column()
    );
    let ids: Vec<i64> = {
        let mut stmt = tx.prepare(&select).map_err(Error::QueryFailed)?;
        let rows = stmt
            .query_map(params![parent_id], |row| row.get(0))
            .map_err(Error::QueryFailed)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(Error::QueryFailed)?
    };

    let update = format!(
        "UPDATE {} SET order_index = ?1 WHERE id = ?2",
        table.table_name()
    );
    for (index, id) in ids.iter().enumerate() {
        tx.execute(&update, params![index as i64, id])
            .map_err(Error::UpdateFailed)?;
    }
    Ok(())
}

// ---- Templates ----

fn map_row_to_template(row: &Row) -> Result<WorkoutTemplate, rusqlite::Error> {
    let created_at: String = row.get(2)?;
    Ok(WorkoutTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_timestamp(2, &created_at)?,
    })
}

pub fn create_template(conn: &Connection, name: &str) -> Result<i64, Error> {
    match conn.execute(
        "INSERT INTO workout_templates (name, created_at) VALUES (?1, ?2)",
        params![name, now_timestamp()],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(Error::TemplateNameNotUnique(name.to_string()))
        }
        Err(e) => Err(Error::InsertFailed(e)),
    }
}

pub fn get_template(conn: &Connection, id: i64) -> Result<Option<WorkoutTemplate>, Error> {
    conn.query_row(
        "SELECT id, name, created_at FROM workout_templates WHERE id = ?1",
        params![id],
        map_row_to_template,
    )
    .optional()
    .map_err(Error::QueryFailed)
}

pub fn rename_template(conn: &Connection, id: i64, name: &str) -> Result<(), Error> {
    match conn.execute(
        "UPDATE workout_templates SET name = ?1 WHERE id = ?2",
        params![name, id],
    ) {
        Ok(0) => Err(Error::TemplateNotFound(id)),
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(Error::TemplateNameNotUnique(name.to_string()))
        }
        Err(e) => Err(Error::UpdateFailed(e)),
    }
}

pub fn list_templates(conn: &Connection) -> Result<Vec<WorkoutTemplate>, Error> {
    let mut stmt = conn
        .prepare("SELECT id, name, created_at FROM workout_templates ORDER BY name COLLATE NOCASE ASC")
        .map_err(Error::QueryFailed)?;
    let templates = stmt
        .query_map([], map_row_to_template)
        .map_err(Error::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::QueryFailed)?;
    Ok(templates)
}

pub fn delete_template(conn: &mut Connection, id: i64) -> Result<u64, Error> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM template_exercises WHERE template_id = ?1",
        params![id],
    )
    .map_err(Error::DeleteFailed)?;
    let rows = tx
        .execute("DELETE FROM workout_templates WHERE id = ?1", params![id])
        .map_err(Error::DeleteFailed)?;
    if rows == 0 {
        return Err(Error::TemplateNotFound(id));
    }
    tx.commit()?;
    Ok(rows as u64)
}

/// Appends an exercise to the end of a template's order.
pub fn add_template_exercise(
    conn: &Connection,
    template_id: i64,
    exercise_id: i64,
) -> Result<i64, Error> {
    let next_index: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM template_exercises WHERE template_id = ?1",
            params![template_id],
            |row| row.get(0),
        )
        .map_err(Error::QueryFailed)?;
    conn.execute(
        "INSERT INTO template_exercises (template_id, exercise_id, order_index) VALUES (?1, ?2, ?3)",
        params![template_id, exercise_id, next_index],
    )
    .map_err(Error::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

pub fn list_template_exercises(
    conn: &Connection,
    template_id: i64,
) -> Result<Vec<TemplateExercise>, Error> {
    let mut stmt = conn
        .prepare(
            "SELECT te.id, te.template_id, te.exercise_id, e.name, te.order_index
             FROM template_exercises te JOIN exercises e ON e.id = te.exercise_id
             WHERE te.template_id = ?1 ORDER BY te.order_index ASC",
        )
        .map_err(Error::QueryFailed)?;
    let rows = stmt
        .query_map(params![template_id], |row| {
            Ok(TemplateExercise {
                id: row.get(0)?,
                template_id: row.get(1)?,
                exercise_id: row.get(2)?,
                exercise_name: row.get(3)?,
                order_index: row.get(4)?,
            })
        })
        .map_err(Error::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::QueryFailed)?;
    Ok(rows)
}

/// Removes a template exercise and closes the gap in its siblings' order.
pub fn delete_template_exercise(conn: &mut Connection, id: i64) -> Result<(), Error> {
    let template_id: i64 = conn
        .query_row(
            "SELECT template_id FROM template_exercises WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::QueryFailed)?
        .ok_or(Error::TemplateExerciseNotFound(id))?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM template_exercises WHERE id = ?1", params![id])
        .map_err(Error::DeleteFailed)?;
    reindex_siblings(&tx, OrderTable::TemplateExercises, template_id)?;
    tx.commit()?;
    Ok(())
}
