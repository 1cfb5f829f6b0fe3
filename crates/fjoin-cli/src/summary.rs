use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use fjoin_model::LevelSummary;

use crate::types::{JoinOutcome, PreviewOutcome, PreviewRow};

pub fn print_join_summary(outcome: &JoinOutcome) {
    println!(
        "Rows: {} left, {} right, {} joined",
        outcome.left_rows,
        outcome.right_rows,
        outcome.result.row_count()
    );
    if let Some(path) = &outcome.output {
        println!("Output: {}", path.display());
    }
    if outcome.result.levels.is_empty() {
        println!("No fuzzy keys; exact join only.");
        return;
    }
    println!("{}", levels_table(&outcome.result.levels));
    if outcome.result.has_duplicates() {
        println!("Some left values have tied top-1 matches; their rows are duplicated.");
    }
}

pub fn print_preview(outcome: &PreviewOutcome) {
    println!(
        "Level {}: {} -> {}",
        outcome.level, outcome.left_column, outcome.right_column
    );
    let rows = outcome.rows();
    if rows.is_empty() {
        println!("No matches.");
        return;
    }
    println!("{}", preview_table(&rows));
}

pub fn print_differences(registered: &[(&str, &str)]) {
    println!("{}", differences_table(registered));
}

/// Per-level match counts.
pub fn levels_table(levels: &[LevelSummary]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Level"),
        header_cell("Left"),
        header_cell("Right"),
        header_cell("Matched"),
        header_cell("Exact"),
        header_cell("Approx"),
        header_cell("Rows"),
        header_cell("Tied"),
    ]);
    apply_table_style(&mut table);
    for index in [0, 3, 4, 5, 6, 7] {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for level in levels {
        table.add_row(vec![
            Cell::new(level.level),
            Cell::new(&level.left_column)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&level.right_column),
            Cell::new(level.groups),
            count_cell(level.exact, Color::Green),
            count_cell(level.approx, Color::Yellow),
            Cell::new(level.rows),
            count_cell(level.duplicate_groups, Color::Red),
        ]);
    }
    table
}

pub fn preview_table(rows: &[PreviewRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Block"),
        header_cell("Left"),
        header_cell("Right"),
        header_cell("Diff"),
        header_cell("Match"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for row in rows {
        let block = if row.block.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(&row.block)
        };
        let right = if row.tied {
            Cell::new(&row.right).fg(Color::Red)
        } else {
            Cell::new(&row.right)
        };
        let match_cell = match row.match_type.as_str() {
            "exact" => Cell::new(&row.match_type).fg(Color::Green),
            _ => Cell::new(&row.match_type).fg(Color::Yellow),
        };
        table.add_row(vec![
            block,
            Cell::new(&row.left),
            right,
            Cell::new(&row.diff),
            match_cell,
        ]);
    }
    table
}

pub fn differences_table(registered: &[(&str, &str)]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Name"), header_cell("Description")]);
    apply_table_style(&mut table);
    for (name, description) in registered {
        table.add_row(vec![
            Cell::new(name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(description),
        ]);
    }
    table
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
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

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
