use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use sorteio_db::models::Variant;
use sorteio_db::store;

use crate::source::freshness::DEFAULT_MAX_AGE_DAYS;

/// Procurado no diretório atual quando `--config` não é informado.
pub const DEFAULT_CONFIG_FILE: &str = "sorteio.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceUrls {
    pub caixa_page: String,
    pub caixa_base: String,
    pub asloterias_base: String,
    pub asloterias_mega_sena: String,
    pub asloterias_lotofacil: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            caixa_page: "https://loterias.caixa.gov.br/Paginas/Download-Resultados.aspx".to_string(),
            caixa_base: "https://loterias.caixa.gov.br".to_string(),
            asloterias_base: "https://asloterias.com.br".to_string(),
            asloterias_mega_sena: "https://asloterias.com.br/download-todos-resultados-mega-sena"
                .to_string(),
            asloterias_lotofacil: "https://asloterias.com.br/download-todos-resultados-lotofacil"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Onde ficam os arquivos de cache (um por loteria).
    pub data_dir: PathBuf,
    /// Onde ficam as planilhas padrão empacotadas.
    pub bundled_dir: PathBuf,
    pub max_cache_age_days: i64,
    pub http_timeout_secs: u64,
    /// Semente fixa para o gerador aleatório. Sem ela, entropia do sistema.
    pub seed: Option<u64>,
    pub bind_addr: String,
    pub sources: SourceUrls,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            bundled_dir: PathBuf::from("assets"),
            max_cache_age_days: DEFAULT_MAX_AGE_DAYS,
            http_timeout_secs: 10,
            seed: None,
            bind_addr: "127.0.0.1:8501".to_string(),
            sources: SourceUrls::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Não foi possível ler a configuração {:?}", path))?;
        Self::from_toml(&raw).with_context(|| format!("Configuração inválida em {:?}", path))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn cache_path(&self, variant: Variant) -> PathBuf {
        store::cache_path(&self.data_dir, variant)
    }

    pub fn bundled_path(&self, variant: Variant) -> PathBuf {
        let file = match variant {
            Variant::MegaSena => "mega_sena_asloterias_ate_concurso_2796_sorteio.xlsx",
            Variant::Lotofacil => "loto_facil_asloterias_ate_concurso_3277_sorteio.xlsx",
        };
        self.bundled_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_cache_age_days, 7);
        assert_eq!(config.http_timeout_secs, 10);
        assert!(config.seed.is_none());
        assert_eq!(
            config.cache_path(Variant::MegaSena),
            PathBuf::from("data").join("mega_sena_results.csv")
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            data_dir = "/var/lib/sorteio"
            seed = 42

            [sources]
            caixa_base = "http://localhost:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/sorteio"));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_cache_age_days, 7);
        assert_eq!(config.sources.caixa_base, "http://localhost:9000");
        assert!(config.sources.caixa_page.starts_with("https://loterias.caixa.gov.br"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AppConfig::from_toml("max_cache_age_days = \"sete\"").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sorteio.toml");
        fs::write(&path, "http_timeout_secs = 3\n").unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.http_timeout_secs, 3);
        assert!(AppConfig::load(Some(&dir.path().join("nada.toml"))).is_err());
    }
}
