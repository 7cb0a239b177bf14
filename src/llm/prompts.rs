//! Prompt templates for the three completion calls.

use crate::models::DataSummary;

/// Ask for one read-only statement answering `question`.
pub fn generate_sql(schema: &str, question: &str, dialect: &str) -> String {
    format!(
        r#"
You are an expert SQL query generator. Given a natural language question and database schema,
generate a precise SQL query that answers the question.

Database Schema:
{schema}

Natural Language Question: {question}

Instructions:
1. Generate only the SQL query, no explanations
2. Use proper {dialect} syntax
3. Include appropriate WHERE clauses, JOINs, and ORDER BY if needed
4. Ensure the query is safe and doesn't modify data (SELECT only)
5. If the question is ambiguous, make reasonable assumptions
6. Return only the SQL query without any formatting or markdown

SQL Query:
"#
    )
}

/// Ask for a critique of a failed statement as a JSON object.
pub fn review_sql(sql: &str, error: Option<&str>, schema: &str, dialect: &str) -> String {
    let error_block = match error {
        Some(e) => format!("\nThe database rejected it with:\n{e}\n"),
        None => String::new(),
    };
    format!(
        r#"
You are a meticulous reviewer of SQL code. Critically evaluate the following {dialect} query for correctness, performance, and clarity.

SQL Query to Review:
```sql
{sql}
```
{error_block}
Database Schema:
{schema}

Instructions:
1.  Identify inefficiencies, bad practices, and logical errors.
2.  Provide suggestions to improve the query's performance and readability.
3.  If the query can be improved, provide a corrected version of the SQL query.
4.  Format your response as a JSON object with two keys: "review" (a string containing your analysis) and "corrected_query" (a string containing the improved SQL query, or null if no changes are needed).

Your JSON Response:
"#
    )
}

/// Ask for a conversational answer built from a result summary.
pub fn synthesize_answer(
    question: &str,
    sql: &str,
    summary: &DataSummary,
    review_text: Option<&str>,
) -> String {
    let review_info = review_text
        .map(|text| format!("SQL Query Review:\n{text}\n\n"))
        .unwrap_or_default();
    let data_summary = summary.to_json_pretty();
    let truncation_note = if summary.truncated_at_row_limit {
        format!(
            "6. The results were cut off at {} rows, so the real total is larger: say \"at least {}\" and never present it as the exact count\n",
            summary.total_rows, summary.total_rows
        )
    } else {
        String::new()
    };
    format!(
        r#"
You are a helpful assistant that explains database query results in natural language.

Original Question: {question}
SQL Query Used: {sql}
{review_info}Query Results Summary: {data_summary}

Instructions:
1. Provide a clear, conversational answer to the original question
2. Include specific numbers and details from the results
3. If there are many results, summarize the key findings
4. Make the response easy to understand for non-technical users
5. Don't mention SQL or technical database terms unless necessary, but you can mention the review if it's relevant to the answer.
{truncation_note}
Natural Language Response:
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueryResult, Row};
    use serde_json::json;

    #[test]
    fn test_generate_sql_uses_dialect() {
        let prompt = generate_sql("Table: customers", "How many customers?", "PostgreSQL");
        assert!(prompt.contains("Use proper PostgreSQL syntax"));
        assert!(prompt.contains("Table: customers"));
        assert!(prompt.contains("Natural Language Question: How many customers?"));
    }

    #[test]
    fn test_review_sql_includes_error_when_known() {
        let prompt = review_sql(
            "SELECT * FROM custmers",
            Some("SQL execution error: no such table: custmers"),
            "Table: customers",
            "SQLite",
        );
        assert!(prompt.contains("```sql\nSELECT * FROM custmers\n```"));
        assert!(prompt.contains("no such table"));
        assert!(prompt.contains("\"corrected_query\""));

        let without = review_sql("SELECT 1", None, "", "MySQL");
        assert!(!without.contains("rejected it"));
    }

    #[test]
    fn test_synthesize_answer_review_block() {
        let mut row = Row::new();
        row.insert("count".to_string(), json!(42));
        let summary = DataSummary::from_result(&QueryResult::success("SELECT 1", vec![row]));

        let with_review = synthesize_answer("q", "SELECT 1", &summary, Some("Fixed typo."));
        assert!(with_review.contains("SQL Query Review:\nFixed typo.\n\nQuery Results Summary:"));

        let plain = synthesize_answer("q", "SELECT 1", &summary, None);
        assert!(plain.contains("SQL Query Used: SELECT 1\nQuery Results Summary:"));
        assert!(plain.contains("\"count\": 42"));
        assert!(!plain.contains("cut off"));
    }

    #[test]
    fn test_synthesize_answer_flags_truncated_totals() {
        let rows: Vec<Row> = (0..2)
            .map(|i| {
                let mut row = Row::new();
                row.insert("id".to_string(), json!(i));
                row
            })
            .collect();
        let result = QueryResult::success("SELECT id FROM orders", rows).with_truncated(true);
        let summary = DataSummary::from_result(&result);

        let prompt = synthesize_answer("How many orders?", "SELECT id FROM orders", &summary, None);
        assert!(prompt.contains("\"truncated_at_row_limit\": true"));
        assert!(prompt.contains("cut off at 2 rows"));
        assert!(prompt.contains("at least 2"));
    }
}
