//! Export serialisers
//!
//! Turns a table's rows into a downloadable CSV, JSON or XLSX file.

use std::fmt;
use std::str::FromStr;

use rust_xlsxwriter::Workbook;
use serde_json::Value;

use crate::schema::Record;
use crate::{Error, Result};

/// Worksheet names are limited to 31 characters
const MAX_SHEET_NAME_LENGTH: usize = 31;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(format: &str) -> Result<Self> {
        match format.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" => Ok(ExportFormat::Xlsx),
            _ => Err(Error::Validation(
                "Unsupported format. Use csv, json, or xlsx".to_string(),
            )),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.extension())
    }
}

/// A serialised export ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    /// Serialise `rows` with the given column order
    pub fn build(
        table: &str,
        format: ExportFormat,
        headers: &[String],
        rows: &[Record],
    ) -> Result<Self> {
        let bytes = match format {
            ExportFormat::Csv => to_csv(headers, rows)?,
            ExportFormat::Json => to_json(rows)?,
            ExportFormat::Xlsx => to_xlsx(table, headers, rows)?,
        };

        Ok(Self {
            filename: format!("{}.{}", table, format.extension()),
            content_type: format.content_type(),
            bytes,
        })
    }

    /// Value of the `Content-Disposition` header
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Text form of a cell; NULL becomes an empty field
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn to_csv(headers: &[String], rows: &[Record]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(headers)
        .map_err(|error| Error::Export(error.to_string()))?;
    for row in rows {
        let fields = headers.iter().map(|header| cell_text(row.get(header)));
        writer
            .write_record(fields)
            .map_err(|error| Error::Export(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::Export(error.to_string()))
}

pub fn to_json(rows: &[Record]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(rows)?)
}

pub fn to_xlsx(table: &str, headers: &[String], rows: &[Record]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet_name: String = table.chars().take(MAX_SHEET_NAME_LENGTH).collect();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet_name).map_err(xlsx_error)?;

    for (column, header) in headers.iter().enumerate() {
        let column = column_index(column)?;
        worksheet
            .write_string(0, column, header.as_str())
            .map_err(xlsx_error)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let line = u32::try_from(index + 1)
            .map_err(|_| Error::Export("Too many rows for a worksheet".to_string()))?;
        for (column, header) in headers.iter().enumerate() {
            let column = column_index(column)?;
            match row.get(header) {
                None | Some(Value::Null) => {}
                Some(Value::Bool(flag)) => {
                    worksheet
                        .write_boolean(line, column, *flag)
                        .map_err(xlsx_error)?;
                }
                Some(Value::Number(number)) => match number.as_f64() {
                    Some(number) => {
                        worksheet
                            .write_number(line, column, number)
                            .map_err(xlsx_error)?;
                    }
                    None => {
                        worksheet
                            .write_string(line, column, number.to_string())
                            .map_err(xlsx_error)?;
                    }
                },
                Some(value) => {
                    worksheet
                        .write_string(line, column, cell_text(Some(value)))
                        .map_err(xlsx_error)?;
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

fn column_index(column: usize) -> Result<u16> {
    u16::try_from(column).map_err(|_| Error::Export("Too many columns for a worksheet".to_string()))
}

fn xlsx_error(error: rust_xlsxwriter::XlsxError) -> Error {
    Error::Export(error.to_string())
}
