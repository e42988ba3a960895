use anyhow::anyhow;
use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cli::{Command, TodoCommand};
use crate::dates::{date_key, parse_date_key};
use crate::model::{CalendarObject, Language, ViewMode};
use crate::render::Renderer;
use crate::store::CalendarStore;

#[instrument(skip(store, renderer, command))]
pub fn dispatch(
    store: &mut CalendarStore,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let today = Local::now().date_naive();
    debug!(?command, "dispatching command");

    match command {
        Command::Show => cmd_show(store, renderer, today),
        Command::Month { month } => cmd_month(store, renderer, month, today),
        Command::Year { year } => cmd_year(store, year),
        Command::Paint { date, color } => cmd_paint(store, &date, Some(color)),
        Command::Unpaint { date } => cmd_paint(store, &date, None),
        Command::Clear { date } => cmd_clear(store, &date),
        Command::PlaceText {
            date,
            text,
            x,
            y,
            font_size,
            color,
        } => cmd_place(
            store,
            &date,
            CalendarObject::new_text(text, x, y, font_size, color),
        ),
        Command::PlaceImage {
            date,
            src,
            x,
            y,
            width,
            height,
        } => cmd_place(store, &date, CalendarObject::new_png(src, x, y, width, height)),
        Command::MoveObject { date, id, x, y } => cmd_move_object(store, &date, id, x, y),
        Command::RemoveObject { date, id } => cmd_remove_object(store, &date, id),
        Command::Todo(todo) => cmd_todo(store, todo, now),
        Command::Notes { date, notes } => cmd_notes(store, &date, &notes, now),
        Command::Detail { date } => cmd_detail(store, renderer, &date),
        Command::Zoom { zoom } => cmd_zoom(store, zoom),
        Command::Lang { language } => cmd_lang(store, language),
        Command::Mode { mode } => cmd_mode(store, mode),
        Command::Prefs => cmd_prefs(store),
    }
}

/// Every date from the command line passes through here before it reaches
/// the store; malformed input fails fast instead of silently no-opping.
fn validated_key(raw: &str) -> anyhow::Result<String> {
    Ok(date_key(parse_date_key(raw)?))
}

fn in_loaded_year(store: &CalendarStore, key: &str) -> bool {
    store.state().year_data.find_day(key).is_some()
}

#[instrument(skip(store, renderer))]
fn cmd_show(
    store: &mut CalendarStore,
    renderer: &mut Renderer,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command show");
    renderer.print_year_overview(store.state(), today)
}

#[instrument(skip(store, renderer))]
fn cmd_month(
    store: &mut CalendarStore,
    renderer: &mut Renderer,
    month: u32,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command month");
    if !(1..=12).contains(&month) {
        return Err(anyhow!("month must be 1-12, got {month}"));
    }
    renderer.print_month_grid(store.state(), month - 1, today)
}

#[instrument(skip(store))]
fn cmd_year(store: &mut CalendarStore, year: i32) -> anyhow::Result<()> {
    info!("command year");
    store.set_year(year);
    println!("Switched to {year}.");
    Ok(())
}

#[instrument(skip(store, color))]
fn cmd_paint(store: &mut CalendarStore, date: &str, color: Option<String>) -> anyhow::Result<()> {
    info!("command paint");
    let key = validated_key(date)?;
    if !in_loaded_year(store, &key) {
        println!("{key} is outside the loaded year; nothing changed.");
        return Ok(());
    }
    let message = match &color {
        Some(color) => format!("Painted {key} {color}."),
        None => format!("Cleared background of {key}."),
    };
    store.set_day_background_color(&key, color);
    println!("{message}");
    Ok(())
}

#[instrument(skip(store))]
fn cmd_clear(store: &mut CalendarStore, date: &str) -> anyhow::Result<()> {
    info!("command clear");
    let key = validated_key(date)?;
    if !in_loaded_year(store, &key) {
        println!("{key} is outside the loaded year; nothing changed.");
        return Ok(());
    }
    store.clear_day(&key);
    println!("Cleared {key}.");
    Ok(())
}

#[instrument(skip(store, object))]
fn cmd_place(
    store: &mut CalendarStore,
    date: &str,
    object: CalendarObject,
) -> anyhow::Result<()> {
    info!("command place");
    let key = validated_key(date)?;
    if !in_loaded_year(store, &key) {
        println!("{key} is outside the loaded year; nothing changed.");
        return Ok(());
    }
    let id = store.add_object_to_day(&key, object);
    println!("Placed object {id} on {key}.");
    Ok(())
}

#[instrument(skip(store))]
fn cmd_move_object(
    store: &mut CalendarStore,
    date: &str,
    id: Uuid,
    x: f64,
    y: f64,
) -> anyhow::Result<()> {
    info!("command move-object");
    let key = validated_key(date)?;
    let known = store
        .state()
        .year_data
        .find_day(&key)
        .is_some_and(|day| day.objects.iter().any(|object| object.id() == id));
    if !known {
        println!("No object {id} on {key}; nothing changed.");
        return Ok(());
    }
    store.update_object(&key, id, |object| object.set_position(x, y));
    println!("Moved object {id} to ({x}, {y}).");
    Ok(())
}

#[instrument(skip(store))]
fn cmd_remove_object(store: &mut CalendarStore, date: &str, id: Uuid) -> anyhow::Result<()> {
    info!("command remove-object");
    let key = validated_key(date)?;
    let known = store
        .state()
        .year_data
        .find_day(&key)
        .is_some_and(|day| day.objects.iter().any(|object| object.id() == id));
    if !known {
        println!("No object {id} on {key}; nothing changed.");
        return Ok(());
    }
    store.remove_object(&key, id);
    println!("Removed object {id} from {key}.");
    Ok(())
}

#[instrument(skip(store, todo, now))]
fn cmd_todo(
    store: &mut CalendarStore,
    todo: TodoCommand,
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    match todo {
        TodoCommand::Add { date, text } => {
            info!("command todo add");
            let key = validated_key(&date)?;
            let id = store.add_checklist_item(&key, &text, now);
            debug!(%id, "checklist item added");
            println!("Added item to {key}.");
        }
        TodoCommand::Toggle { date, index } => {
            info!("command todo toggle");
            let key = validated_key(&date)?;
            let Some(id) = resolve_item_id(store, &key, index) else {
                println!("No item {index} on {key}.");
                return Ok(());
            };
            store.toggle_checklist_item(&key, id, now);
            println!("Toggled item {index} on {key}.");
        }
        TodoCommand::Remove { date, index } => {
            info!("command todo remove");
            let key = validated_key(&date)?;
            let Some(id) = resolve_item_id(store, &key, index) else {
                println!("No item {index} on {key}.");
                return Ok(());
            };
            store.delete_checklist_item(&key, id, now);
            println!("Removed item {index} from {key}.");
        }
        TodoCommand::Rename { date, index, text } => {
            info!("command todo rename");
            let key = validated_key(&date)?;
            let Some(id) = resolve_item_id(store, &key, index) else {
                println!("No item {index} on {key}.");
                return Ok(());
            };
            store.rename_checklist_item(&key, id, &text, now);
            println!("Renamed item {index} on {key}.");
        }
    }
    Ok(())
}

/// Maps a 1-based position in manual order to the item's stable id.
fn resolve_item_id(store: &CalendarStore, date: &str, index: usize) -> Option<Uuid> {
    let detail = store.state().day_details.get(date)?;
    let sorted = detail.checklist_sorted();
    sorted.get(index.checked_sub(1)?).map(|item| item.id)
}

#[instrument(skip(store, notes, now))]
fn cmd_notes(
    store: &mut CalendarStore,
    date: &str,
    notes: &str,
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command notes");
    let key = validated_key(date)?;
    store.set_day_notes(&key, notes, now);
    println!("Updated notes for {key}.");
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_detail(
    store: &mut CalendarStore,
    renderer: &mut Renderer,
    date: &str,
) -> anyhow::Result<()> {
    info!("command detail");
    let key = validated_key(date)?;
    renderer.print_day_detail(&key, store.state().day_details.get(&key))
}

#[instrument(skip(store))]
fn cmd_zoom(store: &mut CalendarStore, zoom: f64) -> anyhow::Result<()> {
    info!("command zoom");
    store.set_zoom(zoom);
    println!("Zoom set to {:.2}.", store.state().zoom);
    Ok(())
}

#[instrument(skip(store))]
fn cmd_lang(store: &mut CalendarStore, language: Language) -> anyhow::Result<()> {
    info!("command lang");
    store.set_language(language);
    println!(
        "Language set to {language} ({}).",
        store.state().direction
    );
    Ok(())
}

#[instrument(skip(store))]
fn cmd_mode(store: &mut CalendarStore, mode: ViewMode) -> anyhow::Result<()> {
    info!("command mode");
    store.set_view_mode(mode);
    println!("View mode set to {mode}.");
    Ok(())
}

#[instrument(skip(store))]
fn cmd_prefs(store: &mut CalendarStore) -> anyhow::Result<()> {
    info!("command prefs");
    let state = store.state();
    println!("year       {}", state.current_year);
    println!("view mode  {}", state.view_mode);
    println!("zoom       {:.2}", state.zoom);
    println!("language   {}", state.language);
    println!("direction  {}", state.direction);
    Ok(())
}
