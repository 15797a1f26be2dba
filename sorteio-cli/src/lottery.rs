use std::path::Path;
use std::sync::Arc;

use chrono::{Datelike, Local};
use rand::rngs::StdRng;

use sorteio_db::models::{Draw, FrequencyTable, GeneratedSet, HistoricalDataset, RankedNumber, Variant};
use sorteio_db::{LotteryError, Result};

use crate::analysis::sampler::{rng_from_seed, sample, suggest_top};
use crate::analysis::{compute_frequency, in_month, most_frequent, most_recent};
use crate::config::AppConfig;
use crate::source::freshness::{Clock, FreshnessPolicy};
use crate::source::{HistoryLoader, default_sources, http_client};

/// Operações oferecidas às interfaces (linha de comando e web) para uma loteria.
pub struct Lottery {
    variant: Variant,
    loader: HistoryLoader,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl Lottery {
    pub fn new(variant: Variant, loader: HistoryLoader, clock: Arc<dyn Clock>, seed: Option<u64>) -> Self {
        Self {
            variant,
            loader,
            clock,
            rng: rng_from_seed(seed),
        }
    }

    /// Monta a loteria com as fontes reais da configuração.
    pub fn from_config(
        config: &AppConfig,
        variant: Variant,
        clock: Arc<dyn Clock>,
        seed: Option<u64>,
    ) -> anyhow::Result<Self> {
        let client = http_client(config)?;
        let loader = HistoryLoader::new(
            variant,
            config.cache_path(variant),
            config.bundled_path(variant),
            default_sources(config, &client),
            FreshnessPolicy::new(config.max_cache_age_days, Arc::clone(&clock))?,
        );
        Ok(Self::new(variant, loader, clock, seed.or(config.seed)))
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn cache_path(&self) -> &Path {
        self.loader.cache_path()
    }

    fn history(&self) -> Result<HistoricalDataset> {
        let dataset = self.loader.load_history();
        if dataset.is_empty() {
            return Err(LotteryError::SourceUnavailable(format!(
                "não foi possível carregar os dados históricos da {}",
                self.variant
            )));
        }
        Ok(dataset)
    }

    fn frequency(&self, dataset: &HistoricalDataset) -> FrequencyTable {
        compute_frequency(&dataset.draws, self.variant.max_number(), None)
    }

    fn check_pick_count(&self, count: usize) -> Result<()> {
        let range = self.variant.pick_range();
        if !range.contains(&count) {
            return Err(LotteryError::InvalidParameter(format!(
                "a {} aceita de {} a {} números por aposta, pedido: {}",
                self.variant,
                range.start(),
                range.end(),
                count
            )));
        }
        Ok(())
    }

    /// Sorteio ponderado pela frequência histórica.
    pub fn generate(&mut self, count: usize) -> Result<GeneratedSet> {
        self.check_pick_count(count)?;
        let dataset = self
            .history()
            .map_err(|e| LotteryError::GenerationFailed(e.to_string()))?;
        let table = self.frequency(&dataset);
        sample(self.variant.max_number(), count, &table, &mut self.rng)
    }

    /// Os números mais sorteados, sem aleatoriedade.
    pub fn suggest(&self) -> Result<GeneratedSet> {
        let dataset = self
            .history()
            .map_err(|e| LotteryError::GenerationFailed(e.to_string()))?;
        let table = self.frequency(&dataset);
        suggest_top(self.variant.max_number(), *self.variant.pick_range().start(), &table)
    }

    pub fn most_frequent(&self, n: usize) -> Result<Vec<RankedNumber>> {
        let dataset = self.history()?;
        Ok(most_frequent(&self.frequency(&dataset), n))
    }

    /// Ranking restrito aos sorteios do mês corrente, de todos os anos.
    pub fn most_frequent_this_month(&self, n: usize) -> Result<Vec<RankedNumber>> {
        let dataset = self.history()?;
        let month = self.clock.now().with_timezone(&Local).month();
        let filter = in_month(month);
        let table = compute_frequency(&dataset.draws, self.variant.max_number(), Some(&filter));
        Ok(most_frequent(&table, n))
    }

    pub fn most_recent(&self, n: usize) -> Result<Vec<Draw>> {
        let dataset = self.history()?;
        Ok(most_recent(&dataset.draws, n))
    }

    /// Atualização forçada a partir das fontes remotas.
    pub fn refresh(&self) -> Result<usize> {
        self.loader.refresh()
    }
}
