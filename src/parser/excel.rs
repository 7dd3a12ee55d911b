use calamine::{Reader, open_workbook_auto};
use std::path::Path;

use super::{Sheet, check_headers};
use crate::error::ImportError;

/// Read every sheet of an `.xls`/`.xlsx` workbook; first row is the header
pub fn read_workbook(path: &Path) -> Result<Vec<Sheet>, ImportError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ImportError::Parse(format!("cannot open '{}': {}", path.display(), e)))?;

    let names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(names.len());

    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ImportError::Parse(format!("error reading sheet '{}': {}", name, e)))?;

        let mut headers = Vec::new();
        let mut rows = Vec::new();

        for (row_idx, row) in range.rows().enumerate() {
            let row_values: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();

            if row_idx == 0 {
                headers = row_values;
            } else {
                rows.push(row_values);
            }
        }

        check_headers(&name, &headers)?;
        sheets.push(Sheet { name, headers, rows });
    }

    Ok(sheets)
}
