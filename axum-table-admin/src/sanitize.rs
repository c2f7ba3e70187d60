//! Identifier and value sanitization
//!
//! Identifiers cannot be bound as parameters, so every table or column name
//! that ends up in SQL text passes an allow-list check here first and is then
//! quoted by the active [`DatabaseProvider`](crate::DatabaseProvider). Values
//! are never interpolated; the only exception is DDL `DEFAULT` clauses, which
//! are rendered as escaped literals by [`render_default_literal`].

use serde_json::Value;

use crate::database::Dialect;
use crate::{Error, Result};

/// Maximum identifier length accepted (matches MySQL's limit)
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Name of the table backing the schema registry
pub const REGISTRY_TABLE: &str = "table_metadata";

/// Keywords allowed verbatim as a column default
const DEFAULT_KEYWORDS: &[&str] = &["CURRENT_TIMESTAMP", "CURRENT_DATE", "CURRENT_TIME", "NULL"];

/// Validate a name for a table or column that is about to be created
///
/// New identifiers are strictly ASCII alphanumeric and 1-64 characters long.
pub fn validate_new_identifier(kind: &str, identifier: &str) -> Result<()> {
    check_length(kind, identifier)?;

    if !identifier.chars().all(|character| character.is_ascii_alphanumeric()) {
        return Err(Error::Validation(format!(
            "{} name '{}' must only contain alpha-numeric characters",
            kind, identifier
        )));
    }

    reject_reserved(kind, identifier)
}

/// Validate a reference to an existing table or column
///
/// Existing schemas may contain underscores (e.g. `stock_quantity`), so
/// references accept `[A-Za-z0-9_]`.
pub fn validate_identifier(kind: &str, identifier: &str) -> Result<()> {
    check_length(kind, identifier)?;

    if !identifier
        .chars()
        .all(|character| character.is_ascii_alphanumeric() || character == '_')
    {
        return Err(Error::Validation(format!(
            "{} name '{}' contains disallowed characters",
            kind, identifier
        )));
    }

    Ok(())
}

/// Validate a table reference and reject the registry table
pub fn validate_table_name(table: &str) -> Result<()> {
    validate_identifier("Table", table)?;
    reject_reserved("Table", table)
}

fn check_length(kind: &str, identifier: &str) -> Result<()> {
    if identifier.is_empty() || identifier.len() > MAX_IDENTIFIER_LENGTH {
        return Err(Error::Validation(format!(
            "{} name must be between 1 and {} characters",
            kind, MAX_IDENTIFIER_LENGTH
        )));
    }
    Ok(())
}

fn reject_reserved(kind: &str, identifier: &str) -> Result<()> {
    if identifier.eq_ignore_ascii_case(REGISTRY_TABLE) {
        return Err(Error::Validation(format!(
            "{} name '{}' is reserved",
            kind, identifier
        )));
    }
    Ok(())
}

/// Quote an identifier with the given quote character, doubling any embedded
/// quote characters
///
/// Identifiers reaching this point have already been validated; the escaping
/// keeps the quoting context closed even if a call site forgets to.
pub fn quote_with(identifier: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(identifier.len() + 2);
    escaped.push(quote);
    for character in identifier.chars() {
        if character == quote {
            escaped.push(quote);
        }
        escaped.push(character);
    }
    escaped.push(quote);
    escaped
}

/// Render a column default as a SQL literal for the given dialect
pub fn render_default_literal(dialect: Dialect, value: &Value) -> Result<String> {
    match value {
        Value::Bool(true) => Ok("TRUE".to_string()),
        Value::Bool(false) => Ok("FALSE".to_string()),
        Value::Number(number) => Ok(number.to_string()),
        Value::String(text) => {
            let upper = text.trim().to_ascii_uppercase();
            if DEFAULT_KEYWORDS.contains(&upper.as_str()) {
                Ok(upper)
            } else {
                Ok(dialect.string_literal(text))
            }
        }
        Value::Null => Ok("NULL".to_string()),
        Value::Array(_) | Value::Object(_) => Err(Error::Validation(
            "Column default must be a string, number or boolean".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_new_identifier() {
        assert!(validate_new_identifier("Table", "widgets").is_ok());
        assert!(validate_new_identifier("Table", "Widgets2").is_ok());
        assert!(validate_new_identifier("Table", "").is_err());
        assert!(validate_new_identifier("Table", "stock_quantity").is_err());
        assert!(validate_new_identifier("Table", "users; DROP TABLE x").is_err());
        assert!(validate_new_identifier("Table", &"a".repeat(65)).is_err());
        assert!(validate_new_identifier("Table", &"a".repeat(64)).is_ok());
        assert!(validate_new_identifier("Table", "منتجات").is_err());
    }

    #[test]
    fn test_validate_identifier_allows_underscore() {
        assert!(validate_identifier("Column", "stock_quantity").is_ok());
        assert!(validate_identifier("Column", "name`").is_err());
        assert!(validate_identifier("Column", "a\"b").is_err());
    }

    #[test]
    fn test_registry_table_is_reserved() {
        assert!(validate_table_name("table_metadata").is_err());
        assert!(validate_table_name("TABLE_METADATA").is_err());
        assert!(validate_table_name("products").is_ok());
    }

    #[test]
    fn test_quote_with() {
        assert_eq!(quote_with("users", '"'), "\"users\"");
        assert_eq!(quote_with("table\"name", '"'), "\"table\"\"name\"");
        assert_eq!(quote_with("a`b", '`'), "`a``b`");
    }

    #[test]
    fn test_render_default_literal() {
        let sqlite = Dialect::Sqlite;
        assert_eq!(render_default_literal(sqlite, &json!(0)).unwrap(), "0");
        assert_eq!(render_default_literal(sqlite, &json!(1.5)).unwrap(), "1.5");
        assert_eq!(render_default_literal(sqlite, &json!(true)).unwrap(), "TRUE");
        assert_eq!(render_default_literal(sqlite, &json!("pending")).unwrap(), "'pending'");
        assert_eq!(render_default_literal(sqlite, &json!("it's")).unwrap(), "'it''s'");
        assert_eq!(
            render_default_literal(sqlite, &json!("current_timestamp")).unwrap(),
            "CURRENT_TIMESTAMP"
        );
        assert!(render_default_literal(sqlite, &json!([1])).is_err());
    }

    #[test]
    fn test_render_default_literal_backslashes() {
        assert_eq!(
            render_default_literal(Dialect::Sqlite, &json!("C:\\")).unwrap(),
            "'C:\\'"
        );
        assert_eq!(
            render_default_literal(Dialect::MySql, &json!("C:\\")).unwrap(),
            "'C:\\\\'"
        );
        assert_eq!(
            render_default_literal(Dialect::MySql, &json!("x\\', evil INT")).unwrap(),
            "'x\\\\'', evil INT'"
        );
    }
}
