use std::io::Cursor;

use reqwest::blocking::Client;
use scraper::{Html, Selector};
use tracing::debug;

use sorteio_db::models::Variant;
use sorteio_db::store::DrawTable;

use super::caixa::resolve_link;
use super::{RemoteSource, SourceError};
use crate::import;

/// asloterias.com.br: página com um link para a planilha completa em Excel.
pub struct AsLoteriasSource {
    client: Client,
    base_url: String,
    mega_sena_page: String,
    lotofacil_page: String,
}

impl AsLoteriasSource {
    pub fn new(client: Client, base_url: &str, mega_sena_page: &str, lotofacil_page: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            mega_sena_page: mega_sena_page.to_string(),
            lotofacil_page: lotofacil_page.to_string(),
        }
    }

    fn page_for(&self, variant: Variant) -> &str {
        match variant {
            Variant::MegaSena => &self.mega_sena_page,
            Variant::Lotofacil => &self.lotofacil_page,
        }
    }
}

/// Âncora cujo texto fala em "todos resultados" e "Excel".
pub fn find_excel_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;

    document
        .select(&selector)
        .find(|anchor| {
            let text = anchor.text().collect::<String>().to_lowercase();
            text.contains("excel") && text.contains("todos")
        })
        .and_then(|anchor| anchor.value().attr("href"))
        .map(|href| href.trim().to_string())
}

impl RemoteSource for AsLoteriasSource {
    fn name(&self) -> &str {
        "asloterias"
    }

    fn fetch(&self, variant: Variant) -> Result<DrawTable, SourceError> {
        let page_url = self.page_for(variant);
        let page = self.client.get(page_url).send()?.error_for_status()?.text()?;

        let link = find_excel_link(&page).ok_or_else(|| SourceError::LinkNotFound(page_url.to_string()))?;
        let url = resolve_link(&self.base_url, &link);
        debug!(variant = variant.slug(), url = %url, "baixando planilha");

        let bytes = self.client.get(&url).send()?.error_for_status()?.bytes()?;
        import::read_spreadsheet(Cursor::new(bytes.to_vec()))
    }
}
