mod analysis;
mod config;
mod display;
mod import;
mod logging;
mod lottery;
mod source;
mod web;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use sorteio_db::models::Variant;

use crate::config::AppConfig;
use crate::display::{
    display_draws, display_error, display_generated, display_ranking, display_refresh,
};
use crate::lottery::Lottery;
use crate::source::freshness::{Clock, SystemClock};

#[derive(Parser)]
#[command(name = "sorteio", about = "Gerador de números da Mega-Sena e da Lotofácil")]
struct Cli {
    /// Arquivo de configuração TOML (padrão: ./sorteio.toml, se existir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Nível de log (RUST_LOG tem precedência)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Diretório dos arquivos de cache
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Gerar números ponderados pela frequência histórica
    Generate {
        #[arg(short, long, default_value = "mega-sena")]
        variant: Variant,

        /// Quantidade de números da aposta
        #[arg(short, long, default_value = "6")]
        count: usize,

        /// Semente para reprodutibilidade
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Listar os números mais sorteados
    Frequent {
        #[arg(short, long, default_value = "mega-sena")]
        variant: Variant,

        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Listar os últimos resultados
    Recent {
        #[arg(short, long, default_value = "mega-sena")]
        variant: Variant,

        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Sugerir os números mais sorteados (Lotofácil: os 15 primeiros)
    Suggest {
        #[arg(short, long, default_value = "lotofacil")]
        variant: Variant,
    },

    /// Números mais sorteados no mês corrente
    Month {
        #[arg(short, long, default_value = "mega-sena")]
        variant: Variant,

        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Baixar novamente os resultados das fontes remotas
    Refresh {
        #[arg(short, long, default_value = "mega-sena")]
        variant: Variant,
    },

    /// Mostrar o caminho do arquivo de cache
    CachePath {
        #[arg(short, long, default_value = "mega-sena")]
        variant: Variant,
    },

    /// Iniciar a interface web
    Serve {
        /// Endereço de escuta (padrão: bind_addr da configuração)
        #[arg(long)]
        addr: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    debug!(data_dir = %config.data_dir.display(), "configuração carregada");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match cli.command {
        Command::Generate {
            variant,
            count,
            seed,
        } => {
            let mut lottery = Lottery::from_config(&config, variant, clock, seed)?;
            match lottery.generate(count) {
                Ok(set) => display_generated(variant, &set, "números gerados"),
                Err(e) => display_error(variant, &e),
            }
        }
        Command::Frequent { variant, top } => {
            let lottery = Lottery::from_config(&config, variant, clock, None)?;
            match lottery.most_frequent(top) {
                Ok(ranking) => display_ranking(variant, &ranking, "números mais sorteados"),
                Err(e) => display_error(variant, &e),
            }
        }
        Command::Recent { variant, last } => {
            let lottery = Lottery::from_config(&config, variant, clock, None)?;
            match lottery.most_recent(last) {
                Ok(draws) => display_draws(variant, &draws),
                Err(e) => display_error(variant, &e),
            }
        }
        Command::Suggest { variant } => {
            let lottery = Lottery::from_config(&config, variant, clock, None)?;
            match lottery.suggest() {
                Ok(set) => display_generated(variant, &set, "sugestão dos mais sorteados"),
                Err(e) => display_error(variant, &e),
            }
        }
        Command::Month { variant, top } => {
            let lottery = Lottery::from_config(&config, variant, clock, None)?;
            match lottery.most_frequent_this_month(top) {
                Ok(ranking) => display_ranking(variant, &ranking, "mais sorteados neste mês"),
                Err(e) => display_error(variant, &e),
            }
        }
        Command::Refresh { variant } => {
            let lottery = Lottery::from_config(&config, variant, clock, None)?;
            match lottery.refresh() {
                Ok(count) => display_refresh(variant, count),
                Err(e) => display_error(variant, &e),
            }
        }
        Command::CachePath { variant } => {
            let lottery = Lottery::from_config(&config, variant, clock, None)?;
            println!("{}", lottery.cache_path().display());
        }
        Command::Serve { addr } => cmd_serve(&config, clock, addr)?,
    }

    Ok(())
}

fn cmd_serve(config: &AppConfig, clock: Arc<dyn Clock>, addr: Option<String>) -> Result<()> {
    let raw_addr = addr.unwrap_or_else(|| config.bind_addr.clone());
    let addr: SocketAddr = raw_addr
        .parse()
        .with_context(|| format!("Endereço inválido: {}", raw_addr))?;

    let lotteries = Variant::ALL
        .iter()
        .map(|&variant| Lottery::from_config(config, variant, Arc::clone(&clock), None))
        .collect::<Result<Vec<_>>>()?;
    let state = web::AppState::new(lotteries);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Não foi possível iniciar o runtime tokio")?;
    let result = runtime.block_on(web::serve(addr, state.clone()));

    // os clientes HTTP bloqueantes só podem ser liberados fora do runtime
    drop(runtime);
    drop(state);
    result
}
