//! Terminal rendering of answers.
//!
//! Results are drawn as ASCII tables in the style of the MySQL CLI.

use crate::models::{AgentResponse, QueryResult, Row};
use serde_json::Value as JsonValue;
use std::fmt::Write as _;
use unicode_width::UnicodeWidthStr;

/// Rows printed before the table is cut off.
pub const MAX_DISPLAY_ROWS: usize = 50;

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Pad `text` to `width` display columns.
fn pad(text: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    if right_align {
        format!("{}{}", fill, text)
    } else {
        format!("{}{}", text, fill)
    }
}

/// Render rows as an ASCII table followed by a row count line.
pub fn format_as_table(
    columns: &[String],
    rows: &[Row],
    row_count: usize,
    execution_time_ms: u64,
) -> String {
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in rows {
        for (i, col) in columns.iter().enumerate() {
            if let Some(value) = row.get(col) {
                widths[i] = widths[i].max(format_value(value).width());
            }
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("| {} ", pad(col, *w, false)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in rows {
        let row_str: String = columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| {
                let value = row.get(col).unwrap_or(&JsonValue::Null);
                let formatted = format_value(value);
                format!(
                    "| {} ",
                    pad(&formatted, *w, matches!(value, JsonValue::Number(_)))
                )
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_text = if row_count == 1 { "row" } else { "rows" };
    let _ = writeln!(
        output,
        "{} {} in set ({:.2} sec)",
        row_count,
        row_text,
        execution_time_ms as f64 / 1000.0
    );

    output
}

/// Render the result section of a response.
pub fn render_result(result: &QueryResult) -> String {
    if !result.success {
        return format!(
            "The query failed with the following error:\n{}",
            result.error_message.as_deref().unwrap_or_default()
        );
    }
    if result.is_empty() {
        return "The query ran successfully but returned no data.".to_string();
    }

    let shown = &result.data[..result.row_count().min(MAX_DISPLAY_ROWS)];
    let mut output = format_as_table(
        &result.column_names,
        shown,
        result.row_count(),
        result.execution_time_ms,
    );
    if shown.len() < result.row_count() {
        let _ = writeln!(output, "(showing first {} rows)", shown.len());
    }
    if result.truncated {
        output.push_str("(result truncated at the row limit)\n");
    }
    output
}

/// Render a full response for the terminal session.
pub fn render_response(response: &AgentResponse) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Answer: {}", response.natural_language_answer);

    if !response.query_result.sql_query.is_empty() {
        let _ = writeln!(
            output,
            "\nExecuted SQL Query:\n  {}",
            response.query_result.sql_query
        );
    }

    let _ = writeln!(output, "\nQuery Results:\n{}", render_result(&response.query_result));

    if let Some(review) = &response.review {
        output.push_str("\nSQL Query Review (the initial query failed and was reviewed):\n");
        let _ = writeln!(output, "{}", review.review_text);
        if let Some(corrected) = &review.corrected_query {
            let _ = writeln!(output, "\nCorrected Query:\n  {}", corrected);
        }
    }

    output
}
