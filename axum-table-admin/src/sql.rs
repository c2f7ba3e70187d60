//! Parameterized statements and generic CRUD statement builders
//!
//! Every builder takes identifiers that have already been validated by
//! [`crate::sanitize`] and quotes them through the active [`Dialect`]. Values
//! always travel as bound parameters.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

use crate::database::Dialect;
use crate::schema::Record;

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Convert a JSON value; arrays and objects are stored as JSON text
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(flag) => SqlValue::Bool(*flag),
            Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    SqlValue::Integer(integer)
                } else {
                    SqlValue::Float(number.as_f64().unwrap_or_default())
                }
            }
            Value::String(text) => SqlValue::Text(text.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
        }
    }

    /// Interpret a path segment as a record id
    pub fn from_id(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(integer) => SqlValue::Integer(integer),
            Err(_) => SqlValue::Text(id.to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    /// Literal form used for diagnostic SQL only
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(formatter, "NULL"),
            SqlValue::Bool(flag) => write!(formatter, "'{}'", flag),
            SqlValue::Integer(integer) => write!(formatter, "'{}'", integer),
            SqlValue::Float(float) => write!(formatter, "'{}'", float),
            SqlValue::Text(text) => write!(formatter, "'{}'", text.replace('\'', "''")),
            SqlValue::Timestamp(timestamp) => write!(formatter, "'{}'", timestamp.to_rfc3339()),
        }
    }
}

/// SQL text plus its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: SqlValue) -> Self {
        self.params.push(value);
        self
    }

    /// SQL with bound values substituted back in
    ///
    /// Not re-executable; meant for showing users what ran.
    pub fn display_sql(&self) -> String {
        let mut output = String::with_capacity(self.sql.len());
        let mut params = self.params.iter();
        for character in self.sql.chars() {
            if character == '?' {
                match params.next() {
                    Some(value) => output.push_str(&value.to_string()),
                    None => output.push('?'),
                }
            } else {
                output.push(character);
            }
        }
        output
    }
}

/// `SELECT * FROM table`
pub fn select_all(dialect: Dialect, table: &str) -> Statement {
    Statement::new(format!("SELECT * FROM {}", dialect.quote_identifier(table)))
}

/// `SELECT * FROM table WHERE id = ?`
pub fn select_by_id(dialect: Dialect, table: &str, id: SqlValue) -> Statement {
    Statement::new(format!(
        "SELECT * FROM {} WHERE {} = ?",
        dialect.quote_identifier(table),
        dialect.quote_identifier("id")
    ))
    .bind(id)
}

/// `SELECT COUNT(*) AS count FROM table`
pub fn count_rows(dialect: Dialect, table: &str) -> Statement {
    Statement::new(format!(
        "SELECT COUNT(*) AS count FROM {}",
        dialect.quote_identifier(table)
    ))
}

/// `SELECT COUNT(*) AS count FROM table WHERE column IS NULL`
pub fn count_nulls(dialect: Dialect, table: &str, column: &str) -> Statement {
    Statement::new(format!(
        "SELECT COUNT(*) AS count FROM {} WHERE {} IS NULL",
        dialect.quote_identifier(table),
        dialect.quote_identifier(column)
    ))
}

/// INSERT of the given fields, falling back to all defaults when empty
pub fn insert(dialect: Dialect, table: &str, fields: &Record) -> Statement {
    let quoted_table = dialect.quote_identifier(table);
    if fields.is_empty() {
        return Statement::new(dialect.insert_default_values(&quoted_table));
    }

    let columns: Vec<String> = fields
        .keys()
        .map(|column| dialect.quote_identifier(column))
        .collect();
    let placeholders = vec!["?"; fields.len()].join(", ");

    let mut statement = Statement::new(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted_table,
        columns.join(", "),
        placeholders
    ));
    for value in fields.values() {
        statement = statement.bind(SqlValue::from_json(value));
    }
    statement
}

/// `UPDATE table SET a = ?, b = ? WHERE id = ?`
pub fn update_by_id(dialect: Dialect, table: &str, fields: &Record, id: SqlValue) -> Statement {
    let assignments: Vec<String> = fields
        .keys()
        .map(|column| format!("{} = ?", dialect.quote_identifier(column)))
        .collect();

    let mut statement = Statement::new(format!(
        "UPDATE {} SET {} WHERE {} = ?",
        dialect.quote_identifier(table),
        assignments.join(", "),
        dialect.quote_identifier("id")
    ));
    for value in fields.values() {
        statement = statement.bind(SqlValue::from_json(value));
    }
    statement.bind(id)
}

/// `DELETE FROM table WHERE id = ?`
pub fn delete_by_id(dialect: Dialect, table: &str, id: SqlValue) -> Statement {
    Statement::new(format!(
        "DELETE FROM {} WHERE {} = ?",
        dialect.quote_identifier(table),
        dialect.quote_identifier("id")
    ))
    .bind(id)
}

/// `DELETE FROM table WHERE id IN (?, ?, ...)`
pub fn delete_by_ids(dialect: Dialect, table: &str, ids: Vec<SqlValue>) -> Statement {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let mut statement = Statement::new(format!(
        "DELETE FROM {} WHERE {} IN ({})",
        dialect.quote_identifier(table),
        dialect.quote_identifier("id"),
        placeholders
    ));
    statement.params = ids;
    statement
}
