//src/main.rs
mod cli; // Keep cli module for parsing args

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::collections::BTreeMap;
use std::io::{self, stdout};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use iron_log_lib::{
    history, sets, AppService, EditSession, ExerciseDefinition, ExerciseField, ExerciseFilters,
    ExerciseSession, HistoricalSession, NewExercise, Set, SupersetSession, TemplateExercise, Units,
    Workout, WorkoutDetail, WorkoutTemplate,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    // --- Check for completion generation request FIRST ---
    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    init_tracing();

    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    let header_color = service.config.theme.header();
    let units = service.config.units;

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        // --- Exercise catalog ---
        cli::Commands::CreateExercise {
            name,
            movement_type,
            movement_pattern,
            body_part,
            secondary_body_part,
            equipment,
            notes,
            video,
        } => {
            let new_exercise = NewExercise {
                name: &name,
                movement_type: movement_type.as_deref(),
                movement_pattern: movement_pattern.as_deref(),
                primary_body_part: body_part.as_deref(),
                secondary_body_part: secondary_body_part.as_deref(),
                equipment: equipment.as_deref(),
                notes: notes.as_deref(),
                video_url: video.as_deref(),
            };
            let id = service.create_exercise(&new_exercise)?;
            println!("Created exercise '{}' (ID: {id})", name.trim());
        }
        cli::Commands::ListExercises {
            name,
            body_part,
            equipment,
            movement_type,
            mastered,
            group,
        } => {
            let filters = ExerciseFilters {
                name_contains: name.as_deref(),
                body_part: body_part.as_deref(),
                equipment: equipment.as_deref(),
                movement_type: movement_type.as_deref(),
                mastered,
            };
            if group && !export_csv {
                let groups = service.exercises_by_body_part(&filters)?;
                print_exercise_groups(groups, header_color);
            } else {
                let exercises = service.list_exercises(&filters)?;
                if exercises.is_empty() {
                    println!("No exercises found.");
                } else if export_csv {
                    print_exercise_csv(exercises)?;
                } else {
                    print_exercise_table(exercises, header_color);
                }
            }
        }
        cli::Commands::ExerciseNotes { identifier, notes } => {
            service.set_exercise_notes(&identifier, notes.as_deref())?;
            println!("Updated notes for '{identifier}'.");
        }
        cli::Commands::SetMastered {
            identifier,
            mastered,
        } => {
            service.set_exercise_mastered(&identifier, mastered)?;
            println!(
                "'{identifier}' marked as {}.",
                if mastered { "mastered" } else { "not mastered" }
            );
        }
        cli::Commands::ExerciseVideo { identifier, url } => {
            service.set_exercise_video(&identifier, url.as_deref())?;
            println!("Updated video for '{identifier}'.");
        }
        cli::Commands::DeleteExercise { identifiers } => {
            let mut failed = 0;
            for identifier in &identifiers {
                match service.delete_exercise(identifier) {
                    Ok(_) => println!("Deleted exercise '{identifier}'."),
                    Err(e) => {
                        failed += 1;
                        eprintln!("Error deleting exercise '{identifier}': {e:#}");
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} exercise(s) could not be deleted.", identifiers.len());
            }
        }
        cli::Commands::DistinctValues { field } => {
            let values = service.list_distinct_values(cli_field_to_field(field))?;
            if values.is_empty() {
                println!("No values recorded.");
            }
            for value in values {
                println!("{value}");
            }
        }
        // --- Workouts ---
        cli::Commands::CreateWorkout {
            name,
            date,
            template,
        } => {
            let id = match template {
                Some(template_id) => {
                    service.create_workout_from_template(template_id, name.as_deref(), date)?
                }
                None => {
                    let Some(name) = name else {
                        bail!("A workout name is required unless --template is given.");
                    };
                    service.create_workout(&name, date)?
                }
            };
            println!("Created workout {id} on {date}.");
        }
        cli::Commands::RenameWorkout { id, name } => {
            service.rename_workout(id, &name)?;
            println!("Renamed workout {id}.");
        }
        cli::Commands::MoveWorkout { id, date } => {
            service.move_workout(id, date)?;
            println!("Moved workout {id} to {date}.");
        }
        cli::Commands::ListWorkouts { from, to } => {
            let workouts = service.list_workouts(from, to)?;
            if workouts.is_empty() {
                println!("No workouts found.");
            } else if export_csv {
                print_workout_csv(workouts)?;
            } else {
                print_workout_table(workouts, header_color);
            }
        }
        cli::Commands::DeleteWorkout { ids } => {
            for id in ids {
                service.delete_workout(id)?;
                println!("Deleted workout {id}.");
            }
        }
        cli::Commands::ShowWorkout { id } => {
            let detail = service.workout_detail(id)?;
            if export_csv {
                print_workout_detail_csv(&detail, units)?;
            } else {
                print_workout_detail(&service, &detail, units, header_color)?;
            }
        }
        cli::Commands::AddExercise {
            workout_id,
            exercise,
            sets,
        } => {
            let explicit = (!sets.is_empty()).then(|| {
                sets.iter()
                    .enumerate()
                    .map(|(i, v)| Set {
                        set_number: u32::try_from(i + 1).unwrap_or(u32::MAX),
                        weight: v.weight,
                        reps: v.reps,
                    })
                    .collect::<Vec<_>>()
            });
            let id = service.add_exercise_to_workout(workout_id, &exercise, explicit)?;
            let added = service.get_workout_exercise(id)?;
            println!(
                "Added '{}' to workout {workout_id} (entry {id}, {} set(s)).",
                added.exercise_name,
                added.sets.len()
            );
        }
        cli::Commands::RemoveExercise {
            workout_exercise_id,
        } => {
            service.remove_workout_exercise(workout_exercise_id)?;
            println!("Removed entry {workout_exercise_id}.");
        }
        cli::Commands::MoveExercise {
            workout_id,
            from,
            to,
        } => {
            let mut order = service.workout_order(workout_id)?;
            service.move_workout_exercise(&mut order, from, to)?;
            print_order(order.current().iter().map(|e| e.exercise_name.as_str()));
        }
        cli::Commands::SwapExercise { workout_id, index } => {
            let mut order = service.workout_order(workout_id)?;
            service.swap_workout_exercise(&mut order, index)?;
            print_order(order.current().iter().map(|e| e.exercise_name.as_str()));
        }
        cli::Commands::LogSets {
            workout_exercise_id,
            sets,
            remove,
            partner_sets,
        } => {
            if partner_sets.is_empty() {
                log_single(&service, workout_exercise_id, &sets, &remove, units)?;
            } else {
                log_superset(&service, workout_exercise_id, &sets, &remove, &partner_sets, units)?;
            }
        }
        cli::Commands::History { exercise, workout } => {
            let Some(definition) = service.resolve_exercise_identifier(&exercise)? else {
                bail!("Exercise '{exercise}' not found.");
            };
            let reference = workout.map(|id| service.history_reference(id)).transpose()?;
            let best = service.best_set(definition.id, reference)?;
            let (previous, sessions) = match reference {
                Some(reference) => (
                    service.previous_performance(definition.id, reference)?,
                    service.exercise_history(definition.id, reference)?,
                ),
                None => (None, Vec::new()),
            };
            if export_csv {
                print_history_csv(&sessions, units)?;
            } else {
                print_history(&definition, best, previous.as_ref(), &sessions, units, header_color);
            }
        }
        // --- Templates ---
        cli::Commands::CreateTemplate { name } => {
            let id = service.create_template(&name)?;
            println!("Created template '{}' (ID: {id}).", name.trim());
        }
        cli::Commands::RenameTemplate { id, name } => {
            service.rename_template(id, &name)?;
            println!("Renamed template {id}.");
        }
        cli::Commands::ListTemplates => {
            let templates = service.list_templates()?;
            if templates.is_empty() {
                println!("No templates found.");
            } else {
                print_template_table(templates, header_color);
            }
        }
        cli::Commands::ShowTemplate { id } => {
            let template = service.get_template(id)?;
            let entries = service.template_exercises(id)?;
            println!("{} (ID: {})", template.name, template.id);
            print_template_exercises(entries, header_color);
        }
        cli::Commands::DeleteTemplate { ids } => {
            for id in ids {
                service.delete_template(id)?;
                println!("Deleted template {id}.");
            }
        }
        cli::Commands::TemplateAdd {
            template_id,
            exercise,
        } => {
            let id = service.add_exercise_to_template(template_id, &exercise)?;
            println!("Added '{exercise}' to template {template_id} (entry {id}).");
        }
        cli::Commands::TemplateRemove {
            template_exercise_id,
        } => {
            service.remove_template_exercise(template_exercise_id)?;
            println!("Removed template entry {template_exercise_id}.");
        }
        cli::Commands::TemplateMove {
            template_id,
            from,
            to,
        } => {
            let mut order = service.template_order(template_id)?;
            service.move_template_exercise(&mut order, from, to)?;
            print_order(order.current().iter().map(|e| e.exercise_name.as_str()));
        }
        cli::Commands::TemplateSwap { template_id, index } => {
            let mut order = service.template_order(template_id)?;
            service.swap_template_exercise(&mut order, index)?;
            print_order(order.current().iter().map(|e| e.exercise_name.as_str()));
        }
        // --- Config & paths ---
        cli::Commands::DbPath => {
            println!("Database file is located at: {:?}", service.get_db_path());
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
        cli::Commands::SetUnits { units } => {
            let units = match units {
                cli::UnitsCli::Metric => Units::Metric,
                cli::UnitsCli::Imperial => Units::Imperial,
            };
            service.set_units(units)?;
            println!("Units set to {units:?}.");
        }
        cli::Commands::SetHistorySessions { count } => {
            service.set_history_sessions(count)?;
            println!("History will list up to {count} session(s).");
        }
        cli::Commands::SetAutosaveDelay { ms } => {
            service.set_autosave_delay_ms(ms)?;
            println!("Auto-save delay set to {ms} ms.");
        }
        cli::Commands::SetHeaderColor { color } => {
            let parsed = service.set_header_color(&color)?;
            println!("Header color set to {parsed:?}.");
        }
    }

    Ok(())
}

const fn cli_field_to_field(field: cli::FieldCli) -> ExerciseField {
    match field {
        cli::FieldCli::MovementType => ExerciseField::MovementType,
        cli::FieldCli::MovementPattern => ExerciseField::MovementPattern,
        cli::FieldCli::BodyPart => ExerciseField::BodyPart,
        cli::FieldCli::Equipment => ExerciseField::Equipment,
    }
}

/// Applies set edits to an open session: grows the list to fit, then removals
/// from the highest number down.
fn apply_entries(
    session: &mut EditSession,
    entries: &[cli::SetEntry],
    remove: &[u32],
    now: Instant,
) -> Result<()> {
    for entry in entries {
        session.ensure_set(entry.set_number, now)?;
        session.update_set(entry.set_number, entry.values.weight, entry.values.reps, now)?;
    }
    let mut remove = remove.to_vec();
    remove.sort_unstable_by(|a, b| b.cmp(a));
    remove.dedup();
    for set_number in remove {
        session.remove_set(set_number, now)?;
    }
    Ok(())
}

fn log_single(
    service: &AppService,
    workout_exercise_id: i64,
    entries: &[cli::SetEntry],
    remove: &[u32],
    units: Units,
) -> Result<()> {
    let mut session = service.open_edit_session(workout_exercise_id)?;
    session.begin(&service.conn)?;
    let now = Instant::now();

    let outcome = apply_entries(&mut session, entries, remove, now)
        .and_then(|()| session.commit(&service.conn).map(<[Set]>::to_vec).map_err(Into::into));
    match outcome {
        Ok(committed) => {
            println!("Saved {}:", sets::sets_summary(&committed));
            print_sets(&committed, units);
            Ok(())
        }
        Err(e) => {
            session
                .cancel(&service.conn)
                .context("Failed to restore sets after an unsuccessful edit")?;
            Err(e.context("Sets were not saved"))
        }
    }
}

fn log_superset(
    service: &AppService,
    workout_exercise_id: i64,
    entries: &[cli::SetEntry],
    remove: &[u32],
    partner_entries: &[cli::SetEntry],
    units: Units,
) -> Result<()> {
    let mut superset: SupersetSession = service.open_superset_session(workout_exercise_id)?;
    superset.begin(&service.conn)?;
    let now = Instant::now();

    let outcome = apply_entries(superset.first_mut(), entries, remove, now)
        .and_then(|()| apply_entries(superset.second_mut(), partner_entries, &[], now))
        .and_then(|()| superset.commit(&service.conn).map_err(Into::into));
    if let Err(e) = outcome {
        superset
            .cancel(&service.conn)
            .context("Failed to restore sets after an unsuccessful edit")?;
        return Err(e.context("Superset was not saved"));
    }

    for session in [superset.first(), superset.second()] {
        let entry = service.get_workout_exercise(session.workout_exercise_id())?;
        println!("{}: {}", entry.exercise_name, sets::sets_summary(session.sets()));
        print_sets(session.sets(), units);
    }
    Ok(())
}

fn format_weight(weight: Option<f64>, units: Units) -> String {
    weight.map_or_else(|| "-".to_string(), |w| format!("{w} {}", units.weight_label()))
}

fn format_set(set: &Set, units: Units) -> String {
    let reps = set.reps.map_or_else(|| "-".to_string(), |r| r.to_string());
    format!("{}: {} x {reps}", set.set_number, format_weight(set.weight, units))
}

fn format_sets(sets: &[Set], units: Units) -> String {
    if sets.is_empty() {
        return "-".to_string();
    }
    sets.iter()
        .map(|s| format_set(s, units))
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_sets(sets: &[Set], units: Units) {
    for set in sets {
        println!("  {}", format_set(set, units));
    }
}

fn print_order<'a>(names: impl Iterator<Item = &'a str>) {
    println!("New order:");
    for (i, name) in names.enumerate() {
        println!("  {i}. {name}");
    }
}

fn print_exercise_table(exercises: Vec<ExerciseDefinition>, header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Body Part").fg(header_color),
            Cell::new("Equipment").fg(header_color),
            Cell::new("Movement").fg(header_color),
            Cell::new("Mastered").fg(header_color),
            Cell::new("Last Used").fg(header_color),
        ]);

    for exercise in exercises {
        let body_part = match (&exercise.primary_body_part, &exercise.secondary_body_part) {
            (Some(primary), Some(secondary)) => format!("{primary} / {secondary}"),
            (Some(primary), None) => primary.clone(),
            (None, Some(secondary)) => secondary.clone(),
            (None, None) => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(exercise.id.to_string()),
            Cell::new(exercise.name),
            Cell::new(body_part),
            Cell::new(exercise.equipment.as_deref().unwrap_or("-")),
            Cell::new(exercise.movement_type.as_deref().unwrap_or("-")),
            Cell::new(if exercise.mastered { "yes" } else { "" }),
            Cell::new(exercise.last_used.map_or_else(String::new, |d| d.to_string())),
        ]);
    }
    println!("{table}");
}

fn print_exercise_groups(groups: BTreeMap<String, Vec<ExerciseDefinition>>, header_color: Color) {
    if groups.is_empty() {
        println!("No exercises found.");
        return;
    }
    for (body_part, exercises) in groups {
        println!("{body_part} ({})", exercises.len());
        print_exercise_table(exercises, header_color);
    }
}

fn print_workout_table(workouts: Vec<Workout>, header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Date").fg(header_color),
            Cell::new("Name").fg(header_color),
        ]);
    for workout in workouts {
        table.add_row(vec![
            Cell::new(workout.id.to_string()),
            Cell::new(workout.date.format("%Y-%m-%d").to_string()),
            Cell::new(workout.name),
        ]);
    }
    println!("{table}");
}

fn print_workout_detail(
    service: &AppService,
    detail: &WorkoutDetail,
    units: Units,
    header_color: Color,
) -> Result<()> {
    println!(
        "{} - {} (ID: {})",
        detail.workout.date, detail.workout.name, detail.workout.id
    );
    if detail.exercises.is_empty() {
        println!("No exercises yet.");
        return Ok(());
    }

    let reference = service.history_reference(detail.workout.id)?;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(header_color),
            Cell::new("Entry").fg(header_color),
            Cell::new("Exercise").fg(header_color),
            Cell::new("Sets").fg(header_color),
            Cell::new("Last Time").fg(header_color),
            Cell::new("Status").fg(header_color),
        ]);

    for entry in &detail.exercises {
        let previous = service.previous_performance(entry.exercise_id, reference)?;
        let last_time = entry
            .sets
            .iter()
            .map(|s| {
                history::placeholder_for(previous.as_ref(), s.set_number)
                    .map_or_else(|| "-".to_string(), |p| format_set(p, units))
            })
            .collect::<Vec<_>>()
            .join("\n");
        let status = if entry.draft_sets.is_some() {
            Cell::new("draft pending").add_attribute(Attribute::Italic)
        } else {
            Cell::new(sets::sets_summary(&entry.sets))
        };
        table.add_row(vec![
            Cell::new(entry.order_index.to_string()),
            Cell::new(entry.id.to_string()),
            Cell::new(&entry.exercise_name),
            Cell::new(format_sets(&entry.sets, units)),
            Cell::new(last_time),
            status,
        ]);
    }
    println!("{table}");
    Ok(())
}

fn print_history(
    exercise: &ExerciseDefinition,
    best: Option<Set>,
    previous: Option<&ExerciseSession>,
    sessions: &[HistoricalSession],
    units: Units,
    header_color: Color,
) {
    println!("{}", exercise.name);
    match best {
        Some(set) => println!(
            "Best set: {} x {}",
            format_weight(set.weight, units),
            set.reps.unwrap_or(0)
        ),
        None => println!("Best set: none with {}+ reps", history::BEST_SET_MIN_REPS),
    }
    if let Some(previous) = previous {
        println!("Last time ({}):", previous.workout_date);
        print_sets(&previous.sets, units);
    }
    if sessions.is_empty() {
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date").fg(header_color),
            Cell::new("Sets").fg(header_color),
        ]);
    for session in sessions {
        table.add_row(vec![
            Cell::new(session.date.to_string()),
            Cell::new(format_sets(&session.sets, units)),
        ]);
    }
    println!("{table}");
}

fn print_template_table(templates: Vec<WorkoutTemplate>, header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Name").fg(header_color),
        ]);
    for template in templates {
        table.add_row(vec![
            Cell::new(template.id.to_string()),
            Cell::new(template.name),
        ]);
    }
    println!("{table}");
}

fn print_template_exercises(entries: Vec<TemplateExercise>, header_color: Color) {
    if entries.is_empty() {
        println!("No exercises yet.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(header_color),
            Cell::new("Entry").fg(header_color),
            Cell::new("Exercise").fg(header_color),
        ]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.order_index.to_string()),
            Cell::new(entry.id.to_string()),
            Cell::new(entry.exercise_name),
        ]);
    }
    println!("{table}");
}

fn print_exercise_csv(exercises: Vec<ExerciseDefinition>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "ID",
        "Name",
        "Movement_Type",
        "Movement_Pattern",
        "Primary_Body_Part",
        "Secondary_Body_Part",
        "Equipment",
        "Mastered",
        "Last_Used",
    ])?;
    for exercise in exercises {
        writer.write_record([
            exercise.id.to_string(),
            exercise.name,
            exercise.movement_type.unwrap_or_default(),
            exercise.movement_pattern.unwrap_or_default(),
            exercise.primary_body_part.unwrap_or_default(),
            exercise.secondary_body_part.unwrap_or_default(),
            exercise.equipment.unwrap_or_default(),
            exercise.mastered.to_string(),
            exercise.last_used.map_or_else(String::new, |d| d.to_string()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_workout_csv(workouts: Vec<Workout>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["ID", "Date", "Name", "Created_UTC"])?;
    for workout in workouts {
        writer.write_record([
            workout.id.to_string(),
            workout.date.to_string(),
            workout.name,
            workout.created_at.to_rfc3339(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// One row per set.
fn print_workout_detail_csv(detail: &WorkoutDetail, units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    let weight_header = format!("Weight_{}", units.weight_label());
    writer.write_record([
        "Workout_ID",
        "Date",
        "Position",
        "Exercise",
        "Set",
        weight_header.as_str(),
        "Reps",
    ])?;
    for entry in &detail.exercises {
        for set in &entry.sets {
            writer.write_record([
                detail.workout.id.to_string(),
                detail.workout.date.to_string(),
                entry.order_index.to_string(),
                entry.exercise_name.clone(),
                set.set_number.to_string(),
                set.weight.map_or_else(String::new, |w| format!("{w:.2}")),
                set.reps.map_or_else(String::new, |r| r.to_string()),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn print_history_csv(sessions: &[HistoricalSession], units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    let weight_header = format!("Weight_{}", units.weight_label());
    writer.write_record(["Date", "Set", weight_header.as_str(), "Reps"])?;
    for session in sessions {
        for set in &session.sets {
            writer.write_record([
                session.date.to_string(),
                set.set_number.to_string(),
                set.weight.map_or_else(String::new, |w| format!("{w:.2}")),
                set.reps.map_or_else(String::new, |r| r.to_string()),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}
