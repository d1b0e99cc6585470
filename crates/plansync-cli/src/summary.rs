//! Tabular terminal output.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use plansync_model::{
    ExecutionLogSummary, ExecutionStatus, IssueKind, MappingResult, RecordIssue, RuleId,
};
use plansync_transform::{ConfigIssue, FunctionRegistry};

use crate::logging::{redact_message, redact_value};

/// Issues shown per batch before the rest is only counted.
const MAX_ISSUE_ROWS: usize = 50;

pub fn print_apply_summary(config_id: &str, result: &MappingResult) {
    println!("Configuration: {config_id}");
    println!("{}", apply_summary_table(result));
    let issues = issue_table(result);
    if issues.row_count() > 0 {
        println!();
        println!("Issues:");
        println!("{issues}");
        let total = result.error_count() + result.warning_count();
        if total > MAX_ISSUE_ROWS {
            println!("... {} more not shown", total - MAX_ISSUE_ROWS);
        }
    }
}

pub fn apply_summary_table(result: &MappingResult) -> Table {
    let metrics = &result.metrics;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Records"),
        header_cell("Produced"),
        header_cell("Failed"),
        header_cell("Errors"),
        header_cell("Warnings"),
        header_cell("Time (ms)"),
        header_cell("Result"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 0..6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 6, CellAlignment::Center);
    table.add_row(vec![
        Cell::new(metrics.total_records),
        Cell::new(metrics.successful_records),
        count_cell(metrics.failed_records, Color::Red),
        count_cell(result.error_count(), Color::Red),
        count_cell(result.warning_count(), Color::Yellow),
        Cell::new(metrics.processing_time_ms),
        outcome_cell(result.success),
    ]);
    table
}

pub fn issue_table(result: &MappingResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Record"),
        header_cell("Kind"),
        header_cell("Code"),
        header_cell("Field"),
        header_cell("Value"),
        header_cell("Rule"),
        header_cell("Message"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 1, CellAlignment::Center);

    let mut issues: Vec<&RecordIssue> = result.errors.iter().chain(&result.warnings).collect();
    issues.sort_by_key(|issue| (issue.record_index, kind_rank(issue.kind)));
    for issue in issues.into_iter().take(MAX_ISSUE_ROWS) {
        let value = issue.value.as_ref().map(ToString::to_string);
        table.add_row(vec![
            Cell::new(issue.record_index),
            kind_cell(issue.kind),
            Cell::new(&issue.code),
            optional_cell(issue.field.as_deref()),
            match &value {
                Some(value) => Cell::new(redact_value(value)),
                None => dim_cell("-"),
            },
            optional_cell(issue.rule_id.as_ref().map(RuleId::as_str)),
            Cell::new(redact_message(&issue.message, value.as_deref())),
        ]);
    }
    table
}

pub fn log_table(summaries: &[ExecutionLogSummary]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Started"),
        header_cell("Version"),
        header_cell("Status"),
        header_cell("Records"),
        header_cell("Produced"),
        header_cell("Errors"),
        header_cell("Warnings"),
        header_cell("Time (ms)"),
        header_cell("Top error codes"),
    ]);
    apply_table_style(&mut table);
    for index in [1, 3, 4, 5, 6, 7] {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for summary in summaries {
        let mut codes: Vec<(&String, &usize)> = summary.error_counts.iter().collect();
        codes.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let codes = codes
            .iter()
            .take(3)
            .map(|(code, count)| format!("{code} x{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(summary.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(summary.config_version),
            status_cell(summary.status),
            Cell::new(summary.total_records),
            Cell::new(summary.successful_records),
            count_cell(summary.error_count, Color::Red),
            count_cell(summary.warning_count, Color::Yellow),
            Cell::new(summary.processing_time_ms),
            if codes.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(codes)
            },
        ]);
    }
    table
}

pub fn function_table(registry: &FunctionRegistry) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Function"), header_cell("Description")]);
    apply_table_style(&mut table);
    for spec in registry.specs() {
        table.add_row(vec![
            Cell::new(spec.name).fg(Color::Blue),
            Cell::new(spec.description),
        ]);
    }
    table
}

pub fn config_issue_table(issues: &[ConfigIssue]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Location"), header_cell("Problem")]);
    apply_table_style(&mut table);
    for issue in issues {
        table.add_row(vec![
            Cell::new(&issue.location).fg(Color::Red),
            Cell::new(&issue.message),
        ]);
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn kind_rank(kind: IssueKind) -> u8 {
    match kind {
        IssueKind::MappingFailed => 0,
        IssueKind::ValidationError => 1,
        IssueKind::ValidationWarning => 2,
    }
}

fn kind_cell(kind: IssueKind) -> Cell {
    match kind {
        IssueKind::MappingFailed => Cell::new("MAPPING")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        IssueKind::ValidationError => Cell::new("ERROR").fg(Color::Red),
        IssueKind::ValidationWarning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn status_cell(status: ExecutionStatus) -> Cell {
    let color = match status {
        ExecutionStatus::Success => Color::Green,
        ExecutionStatus::PartialSuccess => Color::Yellow,
        ExecutionStatus::Failed => Color::Red,
    };
    Cell::new(status.label()).fg(color)
}

fn outcome_cell(success: bool) -> Cell {
    if success {
        Cell::new("OK")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("FAILED")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn optional_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
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
