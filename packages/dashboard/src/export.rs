//! Table export in CSV, JSON and XLSX.
//!
//! Exports cover the rows currently loaded in the table and every
//! visible column, with column titles as headers.

use highway_plan_project_models::{FieldValue, ProjectRecord, TableColumn};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

const SHEET_NAME: &str = "Projects";

/// Errors from serializing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),
}

/// Supported export formats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    /// MIME type of the serialized output.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// File extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Serializes `rows` in `format`.
///
/// # Errors
///
/// Returns an [`ExportError`] if the chosen serializer fails.
pub fn export(
    format: ExportFormat,
    columns: &[TableColumn],
    rows: &[ProjectRecord],
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(columns, rows),
        ExportFormat::Json => to_json(columns, rows),
        ExportFormat::Xlsx => to_xlsx(columns, rows),
    }
}

/// CSV with a header row of column titles. Flags render as Yes/No.
///
/// # Errors
///
/// Returns an [`ExportError`] if writing fails.
pub fn to_csv(columns: &[TableColumn], rows: &[ProjectRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter().map(|c| c.title.as_str()))?;

    for row in rows {
        writer.write_record(
            columns
                .iter()
                .map(|c| row.field_value(c.field).to_string()),
        )?;
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// A JSON array of objects keyed by column title.
///
/// # Errors
///
/// Returns an [`ExportError`] if serialization fails.
pub fn to_json(columns: &[TableColumn], rows: &[ProjectRecord]) -> Result<Vec<u8>, ExportError> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| {
                    serde_json::to_value(row.field_value(c.field))
                        .map(|value| (c.title.clone(), value))
                })
                .collect::<Result<_, _>>()
        })
        .collect::<Result<_, _>>()?;

    Ok(serde_json::to_vec_pretty(&objects)?)
}

/// A single-sheet workbook. Numeric fields are written as numbers.
///
/// # Errors
///
/// Returns an [`ExportError`] if the workbook cannot be built.
#[allow(clippy::cast_precision_loss)]
pub fn to_xlsx(columns: &[TableColumn], rows: &[ProjectRecord]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, column) in (0_u16..).zip(columns) {
        sheet.write_string_with_format(0, col, column.title.as_str(), &header)?;
    }

    for (row_num, row) in (1_u32..).zip(rows) {
        for (col, column) in (0_u16..).zip(columns) {
            match row.field_value(column.field) {
                FieldValue::Null => {}
                FieldValue::Bool(b) => {
                    sheet.write_boolean(row_num, col, b)?;
                }
                FieldValue::Integer(n) => {
                    sheet.write_number(row_num, col, n as f64)?;
                }
                FieldValue::Number(n) => {
                    sheet.write_number(row_num, col, n)?;
                }
                FieldValue::Text(s) => {
                    sheet.write_string(row_num, col, s.as_str())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use highway_plan_project_models::ProjectField;

    use super::*;

    fn record(item_no: &str, awarded: bool, est_cost: Option<f64>) -> ProjectRecord {
        ProjectRecord {
            item_no: item_no.to_string(),
            district: 7,
            county: "Fayette".to_string(),
            route: "US-25".to_string(),
            plan_year: 2025,
            type_of_work: "RESURFACING".to_string(),
            awarded,
            description: "Resurface, \"mainline\"".to_string(),
            begin_mp: Some(1.5),
            end_mp: Some(3.0),
            est_cost,
        }
    }

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn {
                field: ProjectField::ItemNo,
                title: "Item No".to_string(),
            },
            TableColumn {
                field: ProjectField::Awarded,
                title: "Awarded".to_string(),
            },
            TableColumn {
                field: ProjectField::Description,
                title: "Description".to_string(),
            },
            TableColumn {
                field: ProjectField::EstCost,
                title: "Estimated Cost".to_string(),
            },
        ]
    }

    #[test]
    fn csv_uses_visible_columns() {
        let rows = [record("7-100", true, Some(250_000.0)), record("7-101", false, None)];
        let csv = String::from_utf8(to_csv(&columns(), &rows).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Item No,Awarded,Description,Estimated Cost");
        assert_eq!(lines[1], "7-100,Yes,\"Resurface, \"\"mainline\"\"\",250000");
        assert_eq!(lines[2], "7-101,No,\"Resurface, \"\"mainline\"\"\",");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn json_keys_by_title() {
        let rows = [record("7-100", true, None)];
        let json: serde_json::Value =
            serde_json::from_slice(&to_json(&columns(), &rows).unwrap()).unwrap();
        assert_eq!(json[0]["Item No"], "7-100");
        assert_eq!(json[0]["Awarded"], true);
        assert!(json[0]["Estimated Cost"].is_null());
    }

    #[test]
    fn empty_json_is_an_empty_array() {
        let bytes = to_json(&columns(), &[]).unwrap();
        assert_eq!(bytes, b"[]");
    }

    #[test]
    fn xlsx_is_a_zip_archive() {
        let rows = [record("7-100", true, Some(10.0))];
        let bytes = export(ExportFormat::Xlsx, &columns(), &rows).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn format_parsing() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::Xlsx.extension(), "xlsx");
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
