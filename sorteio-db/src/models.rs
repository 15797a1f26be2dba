use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{LotteryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    MegaSena,
    Lotofacil,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::MegaSena, Variant::Lotofacil];

    pub fn max_number(&self) -> u8 {
        match self {
            Variant::MegaSena => 60,
            Variant::Lotofacil => 25,
        }
    }

    /// Quantidade de bolas sorteadas em cada concurso.
    pub fn balls_per_draw(&self) -> usize {
        match self {
            Variant::MegaSena => 6,
            Variant::Lotofacil => 15,
        }
    }

    /// Quantidade de números que uma aposta pode marcar.
    pub fn pick_range(&self) -> RangeInclusive<usize> {
        match self {
            Variant::MegaSena => 6..=15,
            Variant::Lotofacil => 15..=15,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Variant::MegaSena => "mega-sena",
            Variant::Lotofacil => "lotofacil",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Variant::MegaSena => "Mega-Sena",
            Variant::Lotofacil => "Lotofácil",
        }
    }

    pub fn cache_file_name(&self) -> &'static str {
        match self {
            Variant::MegaSena => "mega_sena_results.csv",
            Variant::Lotofacil => "lotofacil_results.csv",
        }
    }

    /// Trecho do nome do arquivo compactado publicado pela Caixa.
    pub fn archive_keyword(&self) -> &'static str {
        match self {
            Variant::MegaSena => "Mega",
            Variant::Lotofacil => "Lotofacil",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Variant {
    type Err = LotteryError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match normalized.as_str() {
            "megasena" | "mega" => Ok(Variant::MegaSena),
            "lotofacil" | "lotofácil" => Ok(Variant::Lotofacil),
            _ => Err(LotteryError::InvalidParameter(format!(
                "loteria desconhecida: '{}' (use mega-sena ou lotofacil)",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Draw {
    pub draw_id: u32,
    pub date: NaiveDate,
    pub numbers: Vec<u8>,
}

/// De onde veio o histórico carregado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Cache,
    Refreshed,
    Bundled,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct HistoricalDataset {
    pub variant: Variant,
    pub origin: DataOrigin,
    pub draws: Vec<Draw>,
}

impl HistoricalDataset {
    pub fn new(variant: Variant, origin: DataOrigin, draws: Vec<Draw>) -> Self {
        Self {
            variant,
            origin,
            draws,
        }
    }

    pub fn unavailable(variant: Variant) -> Self {
        Self::new(variant, DataOrigin::Unavailable, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }
}

/// Contagem de ocorrências por número, com uma entrada para cada número de 1 a `max_number`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: Vec<u32>,
}

impl FrequencyTable {
    pub fn new(max_number: u8) -> Self {
        Self {
            counts: vec![0; max_number as usize],
        }
    }

    pub fn max_number(&self) -> u8 {
        self.counts.len() as u8
    }

    /// Registra uma ocorrência. Números fora da faixa são ignorados.
    pub fn record(&mut self, number: u8) -> bool {
        match (number as usize).checked_sub(1).and_then(|idx| self.counts.get_mut(idx)) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    pub fn count_for(&self, number: u8) -> u32 {
        (number as usize)
            .checked_sub(1)
            .and_then(|idx| self.counts.get(idx))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(idx, &count)| ((idx + 1) as u8, count))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedSet {
    pub numbers: Vec<u8>,
}

impl GeneratedSet {
    pub fn from_unsorted(mut numbers: Vec<u8>) -> Self {
        numbers.sort_unstable();
        Self { numbers }
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

impl fmt::Display for GeneratedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .numbers
            .iter()
            .map(|n| format!("{:02}", n))
            .collect::<Vec<_>>()
            .join(" - ");
        write!(f, "{joined}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedNumber {
    pub rank: usize,
    pub number: u8,
    pub count: u32,
}

pub fn validate_draw(variant: Variant, numbers: &[u8]) -> Result<()> {
    let expected = variant.balls_per_draw();
    if numbers.len() != expected {
        return Err(LotteryError::InvalidDraw(format!(
            "{} bolas encontradas, {} esperadas",
            numbers.len(),
            expected
        )));
    }
    let max = variant.max_number();
    for &n in numbers {
        if n < 1 || n > max {
            return Err(LotteryError::InvalidDraw(format!(
                "bola {} fora dos limites (1-{})",
                n, max
            )));
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                return Err(LotteryError::InvalidDraw(format!(
                    "bola repetida: {}",
                    numbers[i]
                )));
            }
        }
    }
    Ok(())
}
