//! SQL dialect differences between the supported backends

use crate::sanitize::{quote_with, REGISTRY_TABLE};
use crate::schema::{ColumnSpec, ColumnType};

/// Length used for VARCHAR columns declared without one
const DEFAULT_VARCHAR_LENGTH: u32 = 255;

/// The SQL flavour spoken by a [`DatabaseProvider`](super::DatabaseProvider)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
}

impl Dialect {
    /// Quote a table or column identifier
    pub fn quote_identifier(self, identifier: &str) -> String {
        match self {
            Dialect::Sqlite => quote_with(identifier, '"'),
            Dialect::MySql => quote_with(identifier, '`'),
        }
    }

    /// Quote a string as a SQL literal
    ///
    /// MySQL treats `\` as an escape character inside literals unless
    /// `NO_BACKSLASH_ESCAPES` is set, so it is doubled there as well.
    pub fn string_literal(self, text: &str) -> String {
        let mut literal = String::with_capacity(text.len() + 2);
        literal.push('\'');
        for character in text.chars() {
            match (self, character) {
                (_, '\'') => literal.push_str("''"),
                (Dialect::MySql, '\\') => literal.push_str("\\\\"),
                _ => literal.push(character),
            }
        }
        literal.push('\'');
        literal
    }

    /// Type part of a column definition, e.g. `VARCHAR(50)`
    pub fn column_type(self, column: &ColumnSpec) -> String {
        // SQLite only generates keys for an INTEGER PRIMARY KEY rowid alias
        if self == Dialect::Sqlite && column.primary_key && column.auto_increment {
            return "INTEGER".to_string();
        }

        let keyword = column.data_type.sql_keyword();
        match (column.length, column.data_type) {
            (Some(length), _) => format!("{}({})", keyword, length),
            (None, ColumnType::Varchar) => format!("{}({})", keyword, DEFAULT_VARCHAR_LENGTH),
            (None, _) => keyword.to_string(),
        }
    }

    /// Keyword enabling generated keys
    pub fn auto_increment_keyword(self) -> &'static str {
        match self {
            Dialect::Sqlite => "AUTOINCREMENT",
            Dialect::MySql => "AUTO_INCREMENT",
        }
    }

    /// INSERT statement that only uses column defaults
    pub fn insert_default_values(self, quoted_table: &str) -> String {
        match self {
            Dialect::Sqlite => format!("INSERT INTO {} DEFAULT VALUES", quoted_table),
            Dialect::MySql => format!("INSERT INTO {} () VALUES ()", quoted_table),
        }
    }

    /// Statement redefining an existing column, if the backend can do that
    pub fn modify_column(self, quoted_table: &str, definition: &str) -> Option<String> {
        match self {
            Dialect::Sqlite => None,
            Dialect::MySql => Some(format!(
                "ALTER TABLE {} MODIFY COLUMN {}",
                quoted_table, definition
            )),
        }
    }

    /// DDL creating the schema registry table
    pub fn registry_table_ddl(self) -> String {
        let table = self.quote_identifier(REGISTRY_TABLE);
        match self {
            Dialect::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 table_name VARCHAR(64) NOT NULL UNIQUE, \
                 display_name VARCHAR(255), \
                 created_at TEXT NOT NULL, \
                 updated_at TEXT NOT NULL)",
                table
            ),
            Dialect::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 id INT AUTO_INCREMENT PRIMARY KEY, \
                 table_name VARCHAR(64) NOT NULL UNIQUE, \
                 display_name VARCHAR(255), \
                 created_at TIMESTAMP(6) NOT NULL, \
                 updated_at TIMESTAMP(6) NOT NULL)",
                table
            ),
        }
    }
}
