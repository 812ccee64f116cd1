use std::path::Path;

use chrono::Utc;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use offerte_autosave::SaveState;
use offerte_cli::session::SessionReport;
use offerte_interaction::relative_time;
use offerte_store::ScopedStore;

pub fn print_summary(report: &SessionReport, document: &Path) {
    println!("Document: {}", document.display());

    let mut table = Table::new();
    table.set_header(vec![header_cell("Session"), header_cell("")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);

    table.add_row(vec![Cell::new("Edits"), Cell::new(report.edits)]);
    table.add_row(vec![Cell::new("Manual saves"), Cell::new(report.manual_saves)]);
    table.add_row(vec![
        Cell::new("Rejected lines"),
        count_cell(report.rejected_lines, Color::Yellow),
    ]);

    let state = report.status.state();
    table.add_row(vec![Cell::new("State"), state_cell(&state)]);
    table.add_row(vec![
        Cell::new("Last saved"),
        match report.status.last_saved {
            Some(at) => Cell::new(relative_time(at, Utc::now())),
            None => dim_cell("-"),
        },
    ]);
    println!("{table}");

    if let Some(message) = &report.final_save {
        eprintln!("Final save failed: {message}");
    }
}

pub fn print_flags(store: &ScopedStore) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Flag"), header_cell("Value")]);
    apply_table_style(&mut table);

    let mut empty = true;
    for (key, value) in store.entries() {
        empty = false;
        let value_cell = match value.as_bool() {
            Some(true) => Cell::new("true").fg(Color::Green),
            Some(false) => Cell::new("false").fg(Color::DarkGrey),
            None => Cell::new(value),
        };
        table.add_row(vec![Cell::new(key), value_cell]);
    }
    if empty {
        println!("No flags set.");
    } else {
        println!("{table}");
    }
}

fn state_cell(state: &SaveState) -> Cell {
    let cell = Cell::new(state.name());
    match state {
        SaveState::Saved { .. } | SaveState::Idle => cell.fg(Color::Green),
        SaveState::Saving | SaveState::Dirty => cell.fg(Color::Yellow),
        SaveState::Failed(_) => cell.fg(Color::Red).add_attribute(Attribute::Bold),
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count).fg(color)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
