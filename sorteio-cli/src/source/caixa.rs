use regex::Regex;
use reqwest::blocking::Client;
use tracing::debug;

use sorteio_db::models::Variant;
use sorteio_db::store::DrawTable;

use super::{RemoteSource, SourceError};
use crate::import;

/// Página de downloads da Caixa: o resultado vem num .zip com um .csv dentro.
pub struct CaixaSource {
    client: Client,
    page_url: String,
    base_url: String,
}

impl CaixaSource {
    pub fn new(client: Client, page_url: &str, base_url: &str) -> Self {
        Self {
            client,
            page_url: page_url.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Primeiro `href` terminado em .zip que contém a palavra-chave da loteria.
pub fn find_archive_link(html: &str, keyword: &str) -> Option<String> {
    let pattern = format!(r#"href="([^"]*{}[^"]*\.zip)""#, regex::escape(keyword));
    let re = Regex::new(&pattern).ok()?;
    re.captures(html).map(|caps| caps[1].to_string())
}

pub fn resolve_link(base_url: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else if link.starts_with('/') {
        format!("{}{}", base_url, link)
    } else {
        format!("{}/{}", base_url, link)
    }
}

impl RemoteSource for CaixaSource {
    fn name(&self) -> &str {
        "caixa"
    }

    fn fetch(&self, variant: Variant) -> Result<DrawTable, SourceError> {
        let page = self
            .client
            .get(&self.page_url)
            .send()?
            .error_for_status()?
            .text()?;

        let link = find_archive_link(&page, variant.archive_keyword())
            .ok_or_else(|| SourceError::LinkNotFound(self.page_url.clone()))?;
        let url = resolve_link(&self.base_url, &link);
        debug!(variant = variant.slug(), url = %url, "baixando arquivo da Caixa");

        let bytes = self.client.get(&url).send()?.error_for_status()?.bytes()?;
        import::read_zipped_csv(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <ul>
          <li><a href="/Resultados/Quina.zip">Quina</a></li>
          <li><a href="/Resultados/Mega-Sena.zip">Mega-Sena</a></li>
          <li><a href="/Resultados/Lotofacil.zip">Lotofácil</a></li>
        </ul>
    "#;

    #[test]
    fn test_find_archive_link() {
        assert_eq!(
            find_archive_link(PAGE, Variant::MegaSena.archive_keyword()).as_deref(),
            Some("/Resultados/Mega-Sena.zip")
        );
        assert_eq!(
            find_archive_link(PAGE, Variant::Lotofacil.archive_keyword()).as_deref(),
            Some("/Resultados/Lotofacil.zip")
        );
        assert_eq!(find_archive_link(PAGE, "Timemania"), None);
    }

    #[test]
    fn test_resolve_link() {
        let base = "https://loterias.caixa.gov.br";
        assert_eq!(
            resolve_link(base, "/Resultados/Mega-Sena.zip"),
            "https://loterias.caixa.gov.br/Resultados/Mega-Sena.zip"
        );
        assert_eq!(
            resolve_link(base, "Resultados/Mega-Sena.zip"),
            "https://loterias.caixa.gov.br/Resultados/Mega-Sena.zip"
        );
        assert_eq!(resolve_link(base, "https://cdn.example/x.zip"), "https://cdn.example/x.zip");
    }
}
