//! Table service
//!
//! Creates, alters and drops tables. Every structural change runs in the
//! same transaction as the matching registry update.

use std::collections::HashSet;

use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::database::Dialect;
use crate::sanitize::{
    render_default_literal, validate_identifier, validate_new_identifier, validate_table_name,
};
use crate::schema::{AlterTableRequest, ColumnDescriptor, ColumnSpec, CreateTableRequest};
use crate::service::{existing_columns, find_column, require_column, SchemaRegistry};
use crate::sql::Statement;
use crate::{Error, Result};

const MAX_COLUMN_LENGTH: u32 = 65535;
const MAX_DISPLAY_NAME_LENGTH: usize = 255;

pub struct TableService<'a, DB: DatabaseProvider> {
    database: &'a DB,
}

impl<'a, DB: DatabaseProvider> TableService<'a, DB> {
    pub fn new(database: &'a DB) -> Self {
        Self { database }
    }

    fn registry(&self) -> SchemaRegistry<'a, DB> {
        SchemaRegistry::new(self.database)
    }

    /// Create a physical table and register it, atomically
    pub async fn create_table(&self, request: CreateTableRequest) -> Result<()> {
        validate_new_identifier("Table", &request.name)?;

        let display_name = match request.display_name.as_deref() {
            Some(display_name) => {
                let length = display_name.chars().count();
                if length == 0 || length > MAX_DISPLAY_NAME_LENGTH {
                    return Err(Error::Validation(format!(
                        "Display name must be between 1 and {} characters",
                        MAX_DISPLAY_NAME_LENGTH
                    )));
                }
                display_name
            }
            None => request.name.as_str(),
        };

        if request.columns.is_empty() {
            return Err(Error::InvalidSchema(
                "At least one column is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for column in &request.columns {
            validate_column_spec(column)?;
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(Error::InvalidSchema(format!(
                    "Duplicate column '{}'",
                    column.name
                )));
            }
        }

        let physical = self.database.list_physical_tables().await?;
        if physical
            .iter()
            .any(|table| table.eq_ignore_ascii_case(&request.name))
        {
            return Err(Error::DuplicateTable(request.name));
        }

        let dialect = self.database.dialect();
        let definitions = request
            .columns
            .iter()
            .map(|column| column_definition(dialect, column, true))
            .collect::<Result<Vec<_>>>()?;

        let create = Statement::new(format!(
            "CREATE TABLE {} ({})",
            dialect.quote_identifier(&request.name),
            definitions.join(", ")
        ));
        let register = self.registry().register_statement(&request.name, display_name);

        match self.database.execute_atomic(&[create, register]).await {
            Ok(_) => {
                tracing::info!(table = %request.name, "Table created");
                Ok(())
            }
            // Registry row already present
            Err(DatabaseError::ConstraintViolation(_)) => Err(Error::DuplicateTable(request.name)),
            Err(DatabaseError::Query(message)) if message.contains("already exists") => {
                Err(Error::DuplicateTable(request.name))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Add, drop or redefine a column and touch the registry entry
    pub async fn alter_table(&self, table: &str, request: AlterTableRequest) -> Result<()> {
        let columns = existing_columns(self.database, table).await?;
        let dialect = self.database.dialect();
        let quoted_table = dialect.quote_identifier(table);

        let statement = match &request {
            AlterTableRequest::AddColumn(column) => {
                validate_column_spec(column)?;
                reject_key_flags(column)?;
                if find_column(&columns, &column.name).is_some() {
                    return Err(Error::Validation(format!(
                        "Column '{}' already exists",
                        column.name
                    )));
                }
                format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quoted_table,
                    column_definition(dialect, column, false)?
                )
            }
            AlterTableRequest::DeleteColumn(column) => {
                validate_identifier("Column", column)?;
                let existing = require_column(&columns, column)?;
                if columns.len() == 1 {
                    return Err(Error::Validation(
                        "Cannot delete the only column of a table".to_string(),
                    ));
                }
                format!(
                    "ALTER TABLE {} DROP COLUMN {}",
                    quoted_table,
                    dialect.quote_identifier(&existing.name)
                )
            }
            AlterTableRequest::ModifyColumn(column) => {
                validate_identifier("Column", &column.name)?;
                validate_length(column)?;
                reject_key_flags(column)?;
                let existing = require_column(&columns, &column.name)?;
                let column = ColumnSpec {
                    name: existing.name.clone(),
                    ..column.clone()
                };
                let definition = column_definition(dialect, &column, false)?;
                dialect
                    .modify_column(&quoted_table, &definition)
                    .ok_or_else(|| {
                        Error::Validation(
                            "modify_column is not supported by this database".to_string(),
                        )
                    })?
            }
        };

        let touch = self.registry().touch_statement(table);
        self.database
            .execute_atomic(&[Statement::new(statement), touch])
            .await?;

        tracing::info!(table = %table, "Table altered");
        Ok(())
    }

    /// Drop a table and its registry entry; absent tables are not an error
    pub async fn drop_table(&self, table: &str) -> Result<()> {
        validate_table_name(table)?;

        let drop = Statement::new(format!(
            "DROP TABLE IF EXISTS {}",
            self.database.dialect().quote_identifier(table)
        ));
        let unregister = self.registry().unregister_statement(table);
        self.database.execute_atomic(&[drop, unregister]).await?;

        tracing::info!(table = %table, "Table dropped");
        Ok(())
    }

    /// Column metadata from the physical catalog
    pub async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        existing_columns(self.database, table).await
    }
}

fn validate_column_spec(column: &ColumnSpec) -> Result<()> {
    validate_new_identifier("Column", &column.name)?;
    validate_length(column)
}

fn validate_length(column: &ColumnSpec) -> Result<()> {
    match column.length {
        Some(length) if length == 0 || length > MAX_COLUMN_LENGTH => Err(Error::Validation(
            format!("Column length must be between 1 and {}", MAX_COLUMN_LENGTH),
        )),
        _ => Ok(()),
    }
}

fn reject_key_flags(column: &ColumnSpec) -> Result<()> {
    if column.primary_key || column.auto_increment {
        return Err(Error::Validation(
            "primaryKey and autoIncrement are only allowed when creating a table".to_string(),
        ));
    }
    Ok(())
}

/// Render one column definition
///
/// Key flags are only honoured when `with_keys` is set (table creation).
pub(crate) fn column_definition(
    dialect: Dialect,
    column: &ColumnSpec,
    with_keys: bool,
) -> Result<String> {
    let primary_key = with_keys && column.primary_key;
    let mut definition = format!(
        "{} {}",
        dialect.quote_identifier(&column.name),
        dialect.column_type(column)
    );

    if primary_key {
        definition.push_str(" PRIMARY KEY");
    }
    if with_keys && column.auto_increment {
        definition.push(' ');
        definition.push_str(dialect.auto_increment_keyword());
    }
    if !column.nullable && !primary_key {
        definition.push_str(" NOT NULL");
    }
    match &column.default {
        Some(serde_json::Value::Null) | None => {}
        Some(default) => {
            definition.push_str(" DEFAULT ");
            definition.push_str(&render_default_literal(dialect, default)?);
        }
    }

    Ok(definition)
}
