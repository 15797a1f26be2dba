use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use zip::ZipArchive;

use sorteio_db::store::{self, DrawTable, ID_COLUMN};

use crate::source::SourceError;

/// Texto de uma célula de planilha. Inteiros gravados como float perdem o ".0".
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default(),
    }
}

/// Planilhas publicadas costumam ter linhas de título antes do cabeçalho:
/// o cabeçalho é a primeira linha com uma coluna "Concurso".
pub fn table_from_rows(rows: Vec<Vec<String>>) -> Result<DrawTable, SourceError> {
    let header_idx = rows
        .iter()
        .position(|row| {
            row.iter()
                .any(|cell| store::normalize_header(cell).starts_with(ID_COLUMN))
        })
        .unwrap_or(0);

    let mut rows = rows.into_iter().skip(header_idx);
    let headers = rows.next().ok_or(SourceError::EmptyPayload)?;
    Ok(DrawTable::new(headers, rows.collect()))
}

pub fn read_spreadsheet<RS: Read + Seek + Clone>(reader: RS) -> Result<DrawTable, SourceError> {
    let mut workbook = open_workbook_auto_from_rs(reader)
        .map_err(|e| SourceError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SourceError::Spreadsheet("planilha sem abas".to_string()))?
        .map_err(|e| SourceError::Spreadsheet(e.to_string()))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    table_from_rows(rows)
}

/// Extrai o primeiro arquivo .csv de um zip e lê como tabela separada por ';'.
pub fn read_zipped_csv(bytes: &[u8]) -> Result<DrawTable, SourceError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.name().to_lowercase().ends_with(".csv") {
            return Ok(DrawTable::from_delimited(entry, store::DELIMITER)?);
        }
    }
    Err(SourceError::MissingEntry)
}

/// Arquivo local de resultados: planilha (.xlsx, .xls, .ods) ou texto separado por ';'.
pub fn read_local_file(path: &Path) -> Result<DrawTable, SourceError> {
    let is_delimited = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let bytes = fs::read(path)?;
    if is_delimited {
        Ok(DrawTable::from_delimited(bytes.as_slice(), store::DELIMITER)?)
    } else {
        read_spreadsheet(Cursor::new(bytes))
    }
}
