//! Command dispatch for the `arena` binary.
//!
//! Kept separate from `main.rs` so commands can run against any store.

use anyhow::{Context, Result, anyhow, bail};
use arena_data::DataClient;
use arena_types::{Fields, QueryResult, Record};
use clap::Subcommand;
use serde_json::{Value, json};
use tracing::debug;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch one record by id
    Get { table: String, id: String },

    /// List a table
    List {
        table: String,
        /// Column to order by
        #[arg(long)]
        order_by: Option<String>,
        /// Order descending instead of ascending
        #[arg(long, requires = "order_by")]
        desc: bool,
        /// Maximum number of rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Case-insensitive search; every field must contain the term
    Search {
        table: String,
        term: String,
        /// Comma-separated columns to match
        #[arg(long, value_delimiter = ',', required = true)]
        fields: Vec<String>,
        /// Select statement
        #[arg(long, default_value = "*")]
        select: String,
    },

    /// Insert a record from a JSON object
    Insert { table: String, json: String },

    /// Update a record from a JSON object
    Update { table: String, id: String, json: String },

    /// Delete a record
    Delete { table: String, id: String },

    /// Call a server-side function with a JSON payload
    Call { function: String, json: String },
}

/// Runs one command and returns its output as pretty-printed JSON.
pub async fn run(command: Command, client: &DataClient) -> Result<String> {
    debug!("running {:?}", command);
    let output = match command {
        Command::Get { table, id } => {
            let state = client.item(&table, id.as_str()).fetch().await;
            if let Some(code) = state.error_code {
                bail!("failed to fetch {table}/{id} (code {code})");
            }
            let record = state
                .data
                .ok_or_else(|| anyhow!("{table}/{id} not found"))?;
            record.to_value()
        }
        Command::List {
            table,
            order_by,
            desc,
            limit,
        } => {
            let mut list = client.collection(&table).with_count();
            if let Some(field) = order_by {
                list = if desc {
                    list.order_by_desc(field)
                } else {
                    list.order_by(field)
                };
            }
            if let Some(limit) = limit {
                list = list.limit(limit);
            }
            let state = list.fetch().await;
            if let Some(code) = state.error_code {
                bail!("failed to list {table} (code {code})");
            }
            result_value(state.data.unwrap_or_default())
        }
        Command::Search {
            table,
            term,
            fields,
            select,
        } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            let state = client
                .search(&table, &fields)
                .with_select(select)
                .search_now(&term)
                .await;
            if let Some(code) = state.error_code {
                bail!("search on {table} failed (code {code})");
            }
            records_value(state.data.unwrap_or_default())
        }
        Command::Insert { table, json } => {
            let created = client
                .mutation(&table)
                .save(Some(parse_fields(&json)?), None)
                .await
                .with_context(|| format!("failed to insert into {table}"))?;
            records_value(created)
        }
        Command::Update { table, id, json } => {
            client
                .mutation(&table)
                .save(Some(parse_fields(&json)?), Some(id.as_str()))
                .await
                .with_context(|| format!("failed to update {table}/{id}"))?;
            json!({"updated": id})
        }
        Command::Delete { table, id } => {
            client
                .deleter(&table, &id)
                .save(None, None)
                .await
                .with_context(|| format!("failed to delete {table}/{id}"))?;
            json!({"deleted": id})
        }
        Command::Call { function, json } => {
            let payload: Value = serde_json::from_str(&json).context("payload is not valid JSON")?;
            client
                .call_function(&function, payload)
                .await
                .with_context(|| format!("function {function} failed"))?
        }
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Parses a JSON object argument into a field map.
pub fn parse_fields(raw: &str) -> Result<Fields> {
    match serde_json::from_str(raw).context("fields are not valid JSON")? {
        Value::Object(fields) => Ok(fields),
        other => bail!("expected a JSON object, got {other}"),
    }
}

fn records_value(records: Vec<Record>) -> Value {
    Value::Array(records.iter().map(Record::to_value).collect())
}

fn result_value(result: QueryResult) -> Value {
    let count = result.count;
    json!({
        "count": count,
        "records": records_value(result.records),
    })
}
