//! Carregamento do histórico de sorteios.
//!
//! Ordem de tentativas: cache local válido; se vencido ou ausente, fonte
//! primária e depois secundária; sem cache e sem rede, a planilha padrão
//! empacotada com o programa. Falhas de rede nunca chegam ao chamador: são
//! registradas em log e o histórico possível (ou vazio) é devolvido.

pub mod asloterias;
pub mod caixa;
pub mod freshness;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use sorteio_db::models::{DataOrigin, Draw, HistoricalDataset, Variant};
use sorteio_db::store::{self, DrawTable};
use sorteio_db::{LotteryError, Result};

use crate::config::AppConfig;
use crate::import;

use self::asloterias::AsLoteriasSource;
use self::caixa::CaixaSource;
use self::freshness::FreshnessPolicy;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("falha na requisição HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("link de download não encontrado em {0}")]
    LinkNotFound(String),

    #[error("arquivo compactado inválido: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("nenhum arquivo .csv dentro do arquivo compactado")]
    MissingEntry,

    #[error("planilha inválida: {0}")]
    Spreadsheet(String),

    #[error("conteúdo vazio")]
    EmptyPayload,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Table(#[from] LotteryError),
}

/// Fonte remota de resultados. Devolve a tabela bruta; a normalização é do carregador.
pub trait RemoteSource: Send {
    fn name(&self) -> &str;
    fn fetch(&self, variant: Variant) -> std::result::Result<DrawTable, SourceError>;
}

pub fn http_client(config: &AppConfig) -> anyhow::Result<reqwest::blocking::Client> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(concat!("sorteio/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Caixa como primária, AsLoterias como secundária.
pub fn default_sources(
    config: &AppConfig,
    client: &reqwest::blocking::Client,
) -> Vec<Box<dyn RemoteSource>> {
    vec![
        Box::new(CaixaSource::new(
            client.clone(),
            &config.sources.caixa_page,
            &config.sources.caixa_base,
        )),
        Box::new(AsLoteriasSource::new(
            client.clone(),
            &config.sources.asloterias_base,
            &config.sources.asloterias_mega_sena,
            &config.sources.asloterias_lotofacil,
        )),
    ]
}

pub struct HistoryLoader {
    variant: Variant,
    cache_path: PathBuf,
    bundled_path: PathBuf,
    sources: Vec<Box<dyn RemoteSource>>,
    freshness: FreshnessPolicy,
}

impl HistoryLoader {
    pub fn new(
        variant: Variant,
        cache_path: PathBuf,
        bundled_path: PathBuf,
        sources: Vec<Box<dyn RemoteSource>>,
        freshness: FreshnessPolicy,
    ) -> Self {
        Self {
            variant,
            cache_path,
            bundled_path,
            sources,
            freshness,
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn load_history(&self) -> HistoricalDataset {
        let variant = self.variant;
        let mut remotes_tried = false;

        let origin = match store::cache_modified(&self.cache_path) {
            Ok(Some(modified)) if self.freshness.is_stale(modified) => {
                info!(
                    variant = variant.slug(),
                    modified = %modified,
                    "cache desatualizado, tentando baixar versão mais recente"
                );
                remotes_tried = true;
                match self.refresh() {
                    Ok(_) => DataOrigin::Refreshed,
                    Err(e) => {
                        warn!(
                            variant = variant.slug(),
                            error = %e,
                            "não foi possível atualizar, usando o cache existente"
                        );
                        DataOrigin::Cache
                    }
                }
            }
            Ok(Some(_)) => {
                debug!(variant = variant.slug(), "cache atualizado encontrado");
                DataOrigin::Cache
            }
            Ok(None) => {
                info!(variant = variant.slug(), "cache não encontrado, tentando baixar");
                match self.rebuild_cache(true) {
                    Some(origin) => origin,
                    None => return HistoricalDataset::unavailable(variant),
                }
            }
            Err(e) => {
                warn!(variant = variant.slug(), error = %e, "não foi possível consultar o cache");
                DataOrigin::Cache
            }
        };

        if let Some(draws) = self.read_draws() {
            return HistoricalDataset::new(variant, origin, draws);
        }
        if origin != DataOrigin::Cache {
            return HistoricalDataset::unavailable(variant);
        }

        // cache presente mas inutilizável: mesmo caminho de um cache ausente
        warn!(variant = variant.slug(), "cache ilegível, buscando os dados novamente");
        match self.rebuild_cache(!remotes_tried) {
            Some(origin) => match self.read_draws() {
                Some(draws) => HistoricalDataset::new(variant, origin, draws),
                None => HistoricalDataset::unavailable(variant),
            },
            None => HistoricalDataset::unavailable(variant),
        }
    }

    /// Regrava o cache a partir das fontes remotas e, se todas falharem, do arquivo padrão.
    fn rebuild_cache(&self, try_remotes: bool) -> Option<DataOrigin> {
        let variant = self.variant;
        if try_remotes {
            match self.refresh() {
                Ok(_) => return Some(DataOrigin::Refreshed),
                Err(e) => warn!(variant = variant.slug(), error = %e, "download falhou"),
            }
        }

        match self.import_bundled() {
            Ok(count) => {
                info!(
                    variant = variant.slug(),
                    path = %self.bundled_path.display(),
                    count,
                    "usando arquivo padrão"
                );
                Some(DataOrigin::Bundled)
            }
            Err(e) => {
                warn!(variant = variant.slug(), error = %e, "arquivo padrão indisponível");
                None
            }
        }
    }

    /// Sorteios válidos do cache; `None` quando o arquivo não rende nenhum.
    fn read_draws(&self) -> Option<Vec<Draw>> {
        let variant = self.variant;
        match store::read_cache(&self.cache_path, variant) {
            Ok(outcome) => {
                if outcome.skipped > 0 {
                    warn!(
                        variant = variant.slug(),
                        skipped = outcome.skipped,
                        total = outcome.total_records,
                        "registros malformados ignorados"
                    );
                }
                if outcome.draws.is_empty() {
                    None
                } else {
                    Some(outcome.draws)
                }
            }
            Err(e) => {
                warn!(variant = variant.slug(), error = %e, "erro ao carregar dados históricos");
                None
            }
        }
    }

    /// Tenta cada fonte remota em ordem e grava o primeiro resultado útil no cache.
    pub fn refresh(&self) -> Result<usize> {
        for source in &self.sources {
            match source.fetch(self.variant) {
                Ok(table) => match self.persist(table) {
                    Ok(count) => {
                        info!(
                            variant = self.variant.slug(),
                            source = source.name(),
                            count,
                            "resultados baixados e salvos"
                        );
                        return Ok(count);
                    }
                    Err(e) => warn!(
                        variant = self.variant.slug(),
                        source = source.name(),
                        error = %e,
                        "conteúdo da fonte inutilizável"
                    ),
                },
                Err(e) => warn!(
                    variant = self.variant.slug(),
                    source = source.name(),
                    error = %e,
                    "não foi possível baixar, tentando próxima fonte"
                ),
            }
        }

        Err(LotteryError::SourceUnavailable(format!(
            "nenhuma das {} fontes remotas respondeu para a {}",
            self.sources.len(),
            self.variant
        )))
    }

    fn import_bundled(&self) -> Result<usize> {
        if !self.bundled_path.exists() {
            return Err(LotteryError::SourceUnavailable(format!(
                "arquivo padrão {} não encontrado",
                self.bundled_path.display()
            )));
        }
        let table = import::read_local_file(&self.bundled_path)
            .map_err(|e| LotteryError::SourceUnavailable(e.to_string()))?;
        self.persist(table)
    }

    fn persist(&self, table: DrawTable) -> Result<usize> {
        let outcome = table.into_draws(self.variant)?;
        if outcome.draws.is_empty() {
            return Err(LotteryError::SourceUnavailable(
                "nenhum sorteio válido no conteúdo recebido".to_string(),
            ));
        }
        store::write_cache(&self.cache_path, self.variant, &outcome.draws)?;
        Ok(outcome.draws.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration as ChronoDuration, Utc};

    use super::freshness::{DEFAULT_MAX_AGE_DAYS, FixedClock};

    struct FakeSource {
        name: &'static str,
        table: Option<DrawTable>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn boxed(name: &'static str, table: Option<DrawTable>, calls: &Arc<AtomicUsize>) -> Box<dyn RemoteSource> {
            Box::new(Self {
                name,
                table,
                calls: Arc::clone(calls),
            })
        }
    }

    impl RemoteSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&self, _variant: Variant) -> std::result::Result<DrawTable, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table
                .clone()
                .ok_or_else(|| SourceError::LinkNotFound(self.name.to_string()))
        }
    }

    fn mega_table(rows: &[&[&str]]) -> DrawTable {
        let headers = ["concurso", "data", "bola1", "bola2", "bola3", "bola4", "bola5", "bola6"];
        DrawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn remote_table() -> DrawTable {
        mega_table(&[
            &["1", "11/03/1996", "4", "5", "30", "33", "41", "52"],
            &["2", "18/03/1996", "9", "37", "39", "41", "43", "49"],
            &["3", "25/03/1996", "10", "11", "29", "30", "36", "47"],
        ])
    }

    fn seed_cache(path: &Path) {
        let table = mega_table(&[&["1", "11/03/1996", "4", "5", "30", "33", "41", "52"]]);
        let draws = table.into_draws(Variant::MegaSena).unwrap().draws;
        store::write_cache(path, Variant::MegaSena, &draws).unwrap();
    }

    fn loader(dir: &Path, sources: Vec<Box<dyn RemoteSource>>, days_ahead: i64) -> HistoryLoader {
        let clock = FixedClock(Utc::now() + ChronoDuration::days(days_ahead));
        HistoryLoader::new(
            Variant::MegaSena,
            store::cache_path(dir, Variant::MegaSena),
            dir.join("padrao.csv"),
            sources,
            FreshnessPolicy::new(DEFAULT_MAX_AGE_DAYS, Arc::new(clock)).unwrap(),
        )
    }

    #[test]
    fn test_fresh_cache_skips_remote() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = loader(dir.path(), vec![FakeSource::boxed("a", Some(remote_table()), &calls)], 0);
        seed_cache(loader.cache_path());

        let dataset = loader.load_history();
        assert_eq!(dataset.origin, DataOrigin::Cache);
        assert_eq!(dataset.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_cache_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = loader(dir.path(), vec![FakeSource::boxed("a", Some(remote_table()), &calls)], 30);
        seed_cache(loader.cache_path());

        let dataset = loader.load_history();
        assert_eq!(dataset.origin, DataOrigin::Refreshed);
        assert_eq!(dataset.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_cache_kept_when_remotes_fail() {
        let dir = tempfile::tempdir().unwrap();
        let primary = Arc::new(AtomicUsize::new(0));
        let secondary = Arc::new(AtomicUsize::new(0));
        let loader = loader(
            dir.path(),
            vec![
                FakeSource::boxed("primaria", None, &primary),
                FakeSource::boxed("secundaria", None, &secondary),
            ],
            30,
        );
        seed_cache(loader.cache_path());

        let dataset = loader.load_history();
        assert_eq!(dataset.origin, DataOrigin::Cache);
        assert_eq!(dataset.len(), 1);
        assert_eq!(primary.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_secondary_used_when_primary_fails() {
        let dir = tempfile::tempdir().unwrap();
        let primary = Arc::new(AtomicUsize::new(0));
        let secondary = Arc::new(AtomicUsize::new(0));
        let loader = loader(
            dir.path(),
            vec![
                FakeSource::boxed("primaria", None, &primary),
                FakeSource::boxed("secundaria", Some(remote_table()), &secondary),
            ],
            0,
        );

        let dataset = loader.load_history();
        assert_eq!(dataset.origin, DataOrigin::Refreshed);
        assert_eq!(dataset.len(), 3);
        assert!(loader.cache_path().exists());
        assert_eq!(primary.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unusable_payload_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let broken = mega_table(&[&["1", "11/03/1996", "4", "4", "4", "4", "4", "4"]]);
        let loader = loader(
            dir.path(),
            vec![
                FakeSource::boxed("quebrada", Some(broken), &calls),
                FakeSource::boxed("boa", Some(remote_table()), &calls),
            ],
            0,
        );

        assert_eq!(loader.refresh().unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_bundled_used_without_cache_or_network() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = loader(dir.path(), vec![FakeSource::boxed("a", None, &calls)], 0);
        fs::write(
            dir.path().join("padrao.csv"),
            "Concurso;Data;bola1;bola2;bola3;bola4;bola5;bola6\n\
             1;11/03/1996;4;5;30;33;41;52\n\
             2;18/03/1996;9;37;39;41;43;49\n",
        )
        .unwrap();

        let dataset = loader.load_history();
        assert_eq!(dataset.origin, DataOrigin::Bundled);
        assert_eq!(dataset.len(), 2);
        assert!(loader.cache_path().exists());
    }

    #[test]
    fn test_nothing_available_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = loader(dir.path(), vec![FakeSource::boxed("a", None, &calls)], 0);

        let dataset = loader.load_history();
        assert!(dataset.is_empty());
        assert_eq!(dataset.origin, DataOrigin::Unavailable);
    }

    #[test]
    fn test_refresh_without_sources() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader(dir.path(), Vec::new(), 0);
        assert!(matches!(loader.refresh(), Err(LotteryError::SourceUnavailable(_))));
    }

    #[test]
    fn test_corrupt_fresh_cache_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = loader(dir.path(), vec![FakeSource::boxed("a", Some(remote_table()), &calls)], 0);
        fs::write(loader.cache_path(), "garbage header\n").unwrap();

        let dataset = loader.load_history();
        assert_eq!(dataset.origin, DataOrigin::Refreshed);
        assert_eq!(dataset.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store::read_cache(loader.cache_path(), Variant::MegaSena).unwrap().draws.len(), 3);
    }

    #[test]
    fn test_empty_cache_falls_back_to_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = loader(dir.path(), vec![FakeSource::boxed("a", None, &calls)], 0);
        fs::write(loader.cache_path(), "concurso;data;bola1;bola2;bola3;bola4;bola5;bola6\n").unwrap();
        fs::write(
            dir.path().join("padrao.csv"),
            "Concurso;Data;bola1;bola2;bola3;bola4;bola5;bola6\n\
             1;11/03/1996;4;5;30;33;41;52\n",
        )
        .unwrap();

        let dataset = loader.load_history();
        assert_eq!(dataset.origin, DataOrigin::Bundled);
        assert_eq!(dataset.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_corrupt_stale_cache_does_not_retry_remotes() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = loader(dir.path(), vec![FakeSource::boxed("a", None, &calls)], 30);
        fs::write(loader.cache_path(), "garbage header\n").unwrap();

        let dataset = loader.load_history();
        assert!(dataset.is_empty());
        assert_eq!(dataset.origin, DataOrigin::Unavailable);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
