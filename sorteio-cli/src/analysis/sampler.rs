use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sorteio_db::models::{FrequencyTable, GeneratedSet};
use sorteio_db::{LotteryError, Result};

use crate::analysis::top_n;

pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Probabilidade de cada número de 1 a `max_number`, proporcional à frequência.
/// Números nunca sorteados recebem peso 1; soma nula cai na distribuição uniforme.
pub fn selection_weights(max_number: u8, frequency: &FrequencyTable) -> Vec<f64> {
    let weights: Vec<f64> = (1..=max_number)
        .map(|n| frequency.count_for(n).max(1) as f64)
        .collect();
    let total: f64 = weights.iter().sum();

    if total <= 0.0 {
        return vec![1.0 / max_number as f64; max_number as usize];
    }
    weights.into_iter().map(|w| w / total).collect()
}

fn check_count(max_number: u8, count: usize) -> Result<()> {
    if count == 0 || count > max_number as usize {
        return Err(LotteryError::InvalidParameter(format!(
            "não é possível escolher {} números distintos entre 1 e {}",
            count, max_number
        )));
    }
    Ok(())
}

/// Sorteio ponderado sem reposição: números mais frequentes têm mais chance, sem garantia.
pub fn sample<R: Rng + ?Sized>(
    max_number: u8,
    count: usize,
    frequency: &FrequencyTable,
    rng: &mut R,
) -> Result<GeneratedSet> {
    check_count(max_number, count)?;

    let probs = selection_weights(max_number, frequency);
    let mut available: Vec<(u8, f64)> = (1..=max_number).zip(probs).collect();
    let mut selected = Vec::with_capacity(count);

    for _ in 0..count {
        let dist = WeightedIndex::new(available.iter().map(|(_, w)| *w))
            .map_err(|e| LotteryError::GenerationFailed(e.to_string()))?;
        let idx = dist.sample(rng);

        let (number, _) = available.remove(idx);
        selected.push(number);
    }

    Ok(GeneratedSet::from_unsorted(selected))
}

/// Seleção determinística: os `count` números mais frequentes, em ordem crescente.
pub fn suggest_top(max_number: u8, count: usize, frequency: &FrequencyTable) -> Result<GeneratedSet> {
    check_count(max_number, count)?;
    if frequency.max_number() != max_number {
        return Err(LotteryError::InvalidParameter(format!(
            "tabela de frequência cobre 1..={}, esperado 1..={}",
            frequency.max_number(),
            max_number
        )));
    }
    Ok(GeneratedSet::from_unsorted(top_n(frequency, count)))
}
