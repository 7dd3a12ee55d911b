use std::path::Path;

use super::{Sheet, check_headers};
use crate::error::ImportError;

/// A CSV file is a workbook with one sheet named after the file stem
pub fn read_csv(path: &Path) -> Result<Sheet, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ImportError::Parse(format!("cannot open '{}': {}", path.display(), e)))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::Parse(format!("invalid CSV header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| ImportError::Parse(format!("invalid CSV at row {}: {}", idx + 2, e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1")
        .to_string();
    check_headers(&name, &headers)?;

    Ok(Sheet { name, headers, rows })
}
