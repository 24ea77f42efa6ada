//! Turns a `RowSet` into the response body for `/extract`.

use axum::{
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::str::FromStr;
use thiserror::Error;

use crate::catalog::Identifier;
use crate::remote::RowSet;

pub const CSV_CONTENT_TYPE: &str = "text/csv";
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "xlsx")]
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Xlsx,
}

impl FromStr for ExportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "xls" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A downloadable file.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

impl IntoResponse for Attachment {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        (
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

#[derive(Debug, Clone)]
pub enum Export {
    Json(Value),
    File(Attachment),
}

impl IntoResponse for Export {
    fn into_response(self) -> Response {
        match self {
            Export::Json(body) => Json(body).into_response(),
            Export::File(attachment) => attachment.into_response(),
        }
    }
}

pub fn render(format: ExportFormat, rows: &RowSet, library: &Identifier, table: &Identifier) -> Result<Export, RenderError> {
    let stem = format!("{}_{}", library, table);
    match format {
        ExportFormat::Json => Ok(Export::Json(to_json(rows))),
        ExportFormat::Csv => Ok(Export::File(csv_attachment(rows, &stem)?)),
        ExportFormat::Xlsx => xlsx_or_csv(rows, &stem, table.as_str()).map(Export::File),
    }
}

/// `{ rows: [ {column: value} ], count }`
pub fn to_json(rows: &RowSet) -> Value {
    json!({
        "rows": rows.records(),
        "count": rows.len(),
    })
}

pub fn to_csv(rows: &RowSet) -> Result<Vec<u8>, RenderError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if !rows.columns.is_empty() {
        writer.write_record(&rows.columns)?;
    }
    for row in &rows.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer.into_inner().map_err(|e| RenderError::Io(e.into_error()))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn csv_attachment(rows: &RowSet, stem: &str) -> Result<Attachment, RenderError> {
    Ok(Attachment {
        bytes: to_csv(rows)?,
        filename: format!("{}.csv", stem),
        content_type: CSV_CONTENT_TYPE,
    })
}

#[cfg(feature = "xlsx")]
fn xlsx_or_csv(rows: &RowSet, stem: &str, sheet: &str) -> Result<Attachment, RenderError> {
    Ok(Attachment {
        bytes: to_xlsx(rows, sheet)?,
        filename: format!("{}.xlsx", stem),
        content_type: XLSX_CONTENT_TYPE,
    })
}

#[cfg(not(feature = "xlsx"))]
fn xlsx_or_csv(rows: &RowSet, stem: &str, _sheet: &str) -> Result<Attachment, RenderError> {
    tracing::debug!("Built without spreadsheet support, sending CSV instead");
    csv_attachment(rows, stem)
}

#[cfg(feature = "xlsx")]
const MIN_COLUMN_WIDTH: usize = 10;
#[cfg(feature = "xlsx")]
const MAX_COLUMN_WIDTH: usize = 60;

/// One sheet: frozen header row, autofilter over the data, widths fitted to content.
#[cfg(feature = "xlsx")]
pub fn to_xlsx(rows: &RowSet, sheet: &str) -> Result<Vec<u8>, RenderError> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let sheet_name: String = if sheet.is_empty() { "Sheet1" } else { sheet }.chars().take(31).collect();
    worksheet.set_name(sheet_name)?;

    for (col, name) in rows.columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }

    for (index, row) in rows.rows.iter().enumerate() {
        let excel_row = index as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            let col = col as u16;
            match value {
                Value::Null => {}
                Value::Number(n) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(excel_row, col, f)?;
                    }
                    None => {
                        worksheet.write_string(excel_row, col, n.to_string())?;
                    }
                },
                Value::String(s) => {
                    worksheet.write_string(excel_row, col, s)?;
                }
                other => {
                    worksheet.write_string(excel_row, col, other.to_string())?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    if !rows.columns.is_empty() {
        worksheet.autofilter(0, 0, rows.len() as u32, (rows.columns.len() - 1) as u16)?;
    }

    for (col, name) in rows.columns.iter().enumerate() {
        let longest = rows
            .rows
            .iter()
            .filter_map(|row| row.get(col))
            .map(|v| cell_text(v).chars().count())
            .chain(std::iter::once(name.chars().count()))
            .max()
            .unwrap_or(MIN_COLUMN_WIDTH)
            .min(MAX_COLUMN_WIDTH);
        worksheet.set_column_width(col as u16, (longest + 2).max(MIN_COLUMN_WIDTH) as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}
