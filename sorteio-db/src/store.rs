use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use crate::error::{LotteryError, Result};
use crate::models::{Draw, Variant, validate_draw};

pub const ID_COLUMN: &str = "concurso";
pub const DATE_COLUMN: &str = "data";
pub const BALL_PREFIX: &str = "bola";
pub const DELIMITER: u8 = b';';

const DATE_FORMAT: &str = "%d/%m/%Y";

pub fn cache_path(data_dir: &Path, variant: Variant) -> PathBuf {
    data_dir.join(variant.cache_file_name())
}

/// Tabela bruta de resultados, antes da conversão em sorteios.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub struct ParseOutcome {
    pub draws: Vec<Draw>,
    pub total_records: usize,
    pub skipped: usize,
}

struct Layout {
    id: usize,
    date: usize,
    balls: Vec<usize>,
}

/// Minúsculas e sem espaços ou sublinhados: "Bola 1" e "bola_1" viram "bola1".
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect()
}

impl DrawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Lê um arquivo delimitado. Bytes fora de UTF-8 são substituídos.
    pub fn from_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|cell| String::from_utf8_lossy(cell).trim().to_string())
                    .collect(),
            );
        }

        Ok(Self { headers, rows })
    }

    fn layout(&self, variant: Variant) -> Result<Layout> {
        let normalized: Vec<String> = self.headers.iter().map(|h| normalize_header(h)).collect();
        let balls: Vec<usize> = normalized
            .iter()
            .enumerate()
            .filter(|(_, h)| h.starts_with(BALL_PREFIX))
            .map(|(idx, _)| idx)
            .collect();
        let expected = variant.balls_per_draw();

        if balls.len() == expected {
            let id = normalized.iter().position(|h| h.starts_with(ID_COLUMN)).unwrap_or(0);
            let date = normalized.iter().position(|h| h.starts_with(DATE_COLUMN)).unwrap_or(1);
            return Ok(Layout { id, date, balls });
        }

        // Planilhas sem cabeçalho reconhecível: concurso, data e bolas em ordem
        if balls.is_empty() && self.headers.len() == expected + 2 {
            return Ok(Layout {
                id: 0,
                date: 1,
                balls: (2..expected + 2).collect(),
            });
        }

        Err(LotteryError::MalformedRecord {
            line: 1,
            reason: format!(
                "{} colunas de bolas encontradas, {} esperadas para a {}",
                balls.len(),
                expected,
                variant
            ),
        })
    }

    /// Converte as linhas em sorteios. Linhas malformadas são descartadas e registradas em log.
    pub fn into_draws(self, variant: Variant) -> Result<ParseOutcome> {
        let layout = self.layout(variant)?;
        let total_records = self.rows.len();
        let mut draws: Vec<Draw> = Vec::with_capacity(total_records);
        let mut skipped = 0;

        for (idx, row) in self.rows.iter().enumerate() {
            // Linha 1 é o cabeçalho
            let line = idx + 2;
            if row.iter().all(|cell| cell.is_empty()) {
                skipped += 1;
                continue;
            }
            match parse_row(row, &layout, variant) {
                Ok(draw) => draws.push(draw),
                Err(reason) => {
                    let err = LotteryError::MalformedRecord { line, reason };
                    warn!(variant = variant.slug(), error = %err, "registro ignorado");
                    skipped += 1;
                }
            }
        }

        draws.sort_by_key(|d| d.draw_id);
        let before = draws.len();
        draws.dedup_by_key(|d| d.draw_id);
        skipped += before - draws.len();

        Ok(ParseOutcome {
            draws,
            total_records,
            skipped,
        })
    }
}

fn cell(row: &[String], idx: usize) -> std::result::Result<&str, String> {
    match row.get(idx).map(|s| s.trim()) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(format!("célula vazia na coluna {}", idx + 1)),
    }
}

fn parse_row(row: &[String], layout: &Layout, variant: Variant) -> std::result::Result<Draw, String> {
    let raw_id = cell(row, layout.id)?;
    let draw_id = parse_integer(raw_id)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| format!("concurso inválido: '{}'", raw_id))?;

    let raw_date = cell(row, layout.date)?;
    let date = parse_date(raw_date).ok_or_else(|| format!("data inválida: '{}'", raw_date))?;

    let mut numbers = Vec::with_capacity(layout.balls.len());
    for &col in &layout.balls {
        let raw = cell(row, col)?;
        let number = parse_integer(raw)
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| format!("bola não numérica: '{}'", raw))?;
        numbers.push(number);
    }
    validate_draw(variant, &numbers).map_err(|e| e.to_string())?;

    Ok(Draw {
        draw_id,
        date,
        numbers,
    })
}

/// Aceita "2796" e "2796.0" (células numéricas vindas de planilha).
pub fn parse_integer(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

pub fn read_cache(path: &Path, variant: Variant) -> Result<ParseOutcome> {
    let file = fs::File::open(path)?;
    DrawTable::from_delimited(file, DELIMITER)?.into_draws(variant)
}

/// Grava a tabela canônica (concurso;data;bola1..bolaK) substituindo o arquivo anterior.
pub fn write_cache(path: &Path, variant: Variant, draws: &[Draw]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_path(&tmp)?;

        let mut header = vec![ID_COLUMN.to_string(), DATE_COLUMN.to_string()];
        header.extend((1..=variant.balls_per_draw()).map(|i| format!("{BALL_PREFIX}{i}")));
        writer.write_record(&header)?;

        for draw in draws {
            let mut record = vec![draw.draw_id.to_string(), draw.date.format(DATE_FORMAT).to_string()];
            record.extend(draw.numbers.iter().map(|n| n.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Instante da última gravação do cache, ou `None` se o arquivo não existe.
pub fn cache_modified(path: &Path) -> Result<Option<DateTime<Utc>>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(DateTime::<Utc>::from(meta.modified()?))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
