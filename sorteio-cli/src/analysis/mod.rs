pub mod sampler;

use chrono::Datelike;

use sorteio_db::models::{Draw, FrequencyTable, RankedNumber};

/// Conta as ocorrências de cada número nos sorteios que passam pelo filtro.
/// Números fora de 1..=max_number não entram na contagem.
pub fn compute_frequency(
    draws: &[Draw],
    max_number: u8,
    filter: Option<&dyn Fn(&Draw) -> bool>,
) -> FrequencyTable {
    let mut table = FrequencyTable::new(max_number);

    for draw in draws {
        if let Some(keep) = filter {
            if !keep(draw) {
                continue;
            }
        }
        for &n in &draw.numbers {
            table.record(n);
        }
    }

    table
}

/// Sorteios realizados no mês informado, em qualquer ano.
pub fn in_month(month: u32) -> impl Fn(&Draw) -> bool {
    move |draw: &Draw| draw.date.month() == month
}

/// Números em ordem decrescente de frequência; empate favorece o menor número.
fn ranked(table: &FrequencyTable) -> Vec<(u8, u32)> {
    let mut entries: Vec<(u8, u32)> = table.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    entries
}

pub fn top_n(table: &FrequencyTable, n: usize) -> Vec<u8> {
    ranked(table).into_iter().take(n).map(|(number, _)| number).collect()
}

pub fn most_frequent(table: &FrequencyTable, n: usize) -> Vec<RankedNumber> {
    ranked(table)
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, (number, count))| RankedNumber {
            rank: i + 1,
            number,
            count,
        })
        .collect()
}

/// Os `n` sorteios de maior concurso, do mais recente para o mais antigo.
pub fn most_recent(draws: &[Draw], n: usize) -> Vec<Draw> {
    let mut sorted = draws.to_vec();
    sorted.sort_by(|a, b| b.draw_id.cmp(&a.draw_id));
    sorted.truncate(n);
    sorted
}
