// src/cli.rs
use chrono::{Duration, NaiveDate, Utc};
use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use iron_log_lib::sets::MAX_SETS;

#[derive(Parser, Debug)]
#[command(author, version, about = "Log workouts set by set", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Print listings as CSV instead of tables
    #[arg(long, global = true)]
    pub export_csv: bool,
}

// Custom parser for date strings and shorthands
pub fn parse_date_shorthand(s: &str) -> Result<NaiveDate, String> {
    match s.to_lowercase().as_str() {
        "today" => Ok(Utc::now().date_naive()),
        "yesterday" => Ok((Utc::now() - Duration::days(1)).date_naive()),
        _ => ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .ok_or_else(|| {
                format!(
                    "Invalid date format: '{s}'. Use 'today', 'yesterday', YYYY-MM-DD, DD.MM.YYYY, or YYYY/MM/DD."
                )
            }),
    }
}

/// Weight and reps as typed on the command line. Either side may be left blank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetValues {
    pub weight: Option<f64>,
    pub reps: Option<u32>,
}

/// Parses `WEIGHTxREPS`, e.g. `80x10`, `80x` (weight only), `x10` (reps only).
pub fn parse_set_values(s: &str) -> Result<SetValues, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(SetValues {
            weight: None,
            reps: None,
        });
    }
    let (weight, reps) = trimmed
        .split_once(|c: char| c.eq_ignore_ascii_case(&'x'))
        .ok_or_else(|| format!("Invalid set '{s}'. Use WEIGHTxREPS, e.g. 80x10."))?;
    let weight = match weight.trim() {
        "" => None,
        w => Some(
            w.parse::<f64>()
                .ok()
                .filter(|w| w.is_finite() && *w >= 0.0)
                .ok_or_else(|| format!("Invalid weight '{w}' in '{s}'."))?,
        ),
    };
    let reps = match reps.trim() {
        "" => None,
        r => Some(
            r.parse::<u32>()
                .map_err(|_| format!("Invalid reps '{r}' in '{s}'."))?,
        ),
    };
    Ok(SetValues { weight, reps })
}

/// One edit to a numbered set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetEntry {
    pub set_number: u32,
    pub values: SetValues,
}

/// Parses `N=WEIGHTxREPS`. `N=` clears the set. `N` runs from 1 to `MAX_SETS`.
pub fn parse_set_entry(s: &str) -> Result<SetEntry, String> {
    let (number, values) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid set entry '{s}'. Use N=WEIGHTxREPS, e.g. 1=80x10."))?;
    let set_number = number
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| (1..=MAX_SETS).contains(n))
        .ok_or_else(|| {
            format!("Invalid set number '{number}' in '{s}'. Use 1 to {MAX_SETS}.")
        })?;
    Ok(SetEntry {
        set_number,
        values: parse_set_values(values)?,
    })
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add an exercise to the catalog
    CreateExercise {
        /// Name of the exercise - Must be unique (case-insensitive)
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        movement_type: Option<String>,
        #[arg(long)]
        movement_pattern: Option<String>,
        /// Primary body part
        #[arg(short, long)]
        body_part: Option<String>,
        #[arg(long)]
        secondary_body_part: Option<String>,
        #[arg(short, long)]
        equipment: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        video: Option<String>,
    },
    /// List the exercise catalog
    ListExercises {
        /// Name contains
        #[arg(short, long)]
        name: Option<String>,
        /// Primary or secondary body part
        #[arg(short, long)]
        body_part: Option<String>,
        #[arg(short, long)]
        equipment: Option<String>,
        #[arg(short = 't', long)]
        movement_type: Option<String>,
        #[arg(long)]
        mastered: Option<bool>,
        /// Group the listing by primary body part
        #[arg(short, long)]
        group: bool,
    },
    /// Set or clear an exercise's notes
    ExerciseNotes {
        /// ID or name of the exercise
        identifier: String,
        /// Omit to clear
        notes: Option<String>,
    },
    /// Mark an exercise as mastered (or not)
    SetMastered {
        /// ID or name of the exercise
        identifier: String,
        #[arg(action = ArgAction::Set)]
        mastered: bool,
    },
    /// Set or clear an exercise's video link
    ExerciseVideo {
        /// ID or name of the exercise
        identifier: String,
        /// Omit to clear
        url: Option<String>,
    },
    /// Delete exercises that no workout or template uses
    DeleteExercise {
        /// ID or name of the exercise to delete
        identifiers: Vec<String>,
    },
    /// Values currently used for a classification field
    DistinctValues {
        #[arg(value_enum)]
        field: FieldCli,
    },
    /// Create a workout on a date
    CreateWorkout {
        name: Option<String>,
        /// Date of the workout ('today', 'yesterday', YYYY-MM-DD, DD.MM.YYYY, YYYY/MM/DD)
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
        /// Copy the exercises of this template
        #[arg(short, long)]
        template: Option<i64>,
    },
    RenameWorkout {
        id: i64,
        name: String,
    },
    /// Move a workout to another date
    MoveWorkout {
        id: i64,
        #[arg(value_parser = parse_date_shorthand)]
        date: NaiveDate,
    },
    /// List workouts in a date range
    ListWorkouts {
        #[arg(long, value_parser = parse_date_shorthand)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_shorthand)]
        to: Option<NaiveDate>,
    },
    /// Delete workouts together with their logged exercises
    DeleteWorkout {
        ids: Vec<i64>,
    },
    /// Show a workout's exercises and sets
    ShowWorkout {
        id: i64,
    },
    /// Add an exercise to a workout
    AddExercise {
        workout_id: i64,
        /// ID or name of the exercise
        exercise: String,
        /// Starting sets as WEIGHTxREPS; repeat for more. Seeded from last time if omitted.
        #[arg(short, long = "set", value_parser = parse_set_values)]
        sets: Vec<SetValues>,
    },
    /// Remove an exercise from its workout
    RemoveExercise {
        workout_exercise_id: i64,
    },
    /// Move an exercise within a workout (zero-based positions)
    MoveExercise {
        workout_id: i64,
        from: usize,
        to: usize,
    },
    /// Swap the exercise at a position with the next one
    SwapExercise {
        workout_id: i64,
        index: usize,
    },
    /// Edit sets and commit them
    LogSets {
        workout_exercise_id: i64,
        /// N=WEIGHTxREPS; N= clears the set. Sets past the end are added.
        #[arg(short, long = "set", value_parser = parse_set_entry)]
        sets: Vec<SetEntry>,
        /// Remove set N (applied after edits)
        #[arg(long = "remove")]
        remove: Vec<u32>,
        /// Edits for the next exercise in the workout, committed together
        #[arg(short, long = "partner-set", value_parser = parse_set_entry)]
        partner_sets: Vec<SetEntry>,
    },
    /// Best set, last performance and recent sessions for an exercise
    History {
        /// ID or name of the exercise
        exercise: String,
        /// Resolve relative to this workout
        #[arg(short, long)]
        workout: Option<i64>,
    },
    CreateTemplate {
        name: String,
    },
    RenameTemplate {
        id: i64,
        name: String,
    },
    ListTemplates,
    ShowTemplate {
        id: i64,
    },
    DeleteTemplate {
        ids: Vec<i64>,
    },
    /// Append an exercise to a template
    TemplateAdd {
        template_id: i64,
        /// ID or name of the exercise
        exercise: String,
    },
    TemplateRemove {
        template_exercise_id: i64,
    },
    /// Move an exercise within a template (zero-based positions)
    TemplateMove {
        template_id: i64,
        from: usize,
        to: usize,
    },
    TemplateSwap {
        template_id: i64,
        index: usize,
    },
    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    SetUnits {
        #[arg(value_enum)]
        units: UnitsCli,
    },
    /// How many earlier sessions `history` lists
    SetHistorySessions {
        count: usize,
    },
    /// Quiet period before an edit is auto-saved, in milliseconds
    SetAutosaveDelay {
        ms: u64,
    },
    /// Table header color (e.g. Green, DarkCyan)
    SetHeaderColor {
        color: String,
    },
    /// Generate shell completion scripts
    GenerateCompletion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitsCli {
    Metric,
    Imperial,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldCli {
    MovementType,
    MovementPattern,
    BodyPart,
    Equipment,
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
