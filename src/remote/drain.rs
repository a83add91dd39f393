// src/remote/drain.rs

use std::time::Instant;

use crate::{
    common::error::FetchError,
    models::report::FilterParams,
    remote::page_fetcher::PageFetcher,
};

/// Coleção completa, com os totais lidos da primeira página.
#[derive(Debug, Clone, PartialEq)]
pub struct Drained<T> {
    pub items: Vec<T>,
    pub total_pages: u64,
    pub total_count: u64,
}

impl<T> Drained<T> {
    fn empty(total_pages: u64, total_count: u64) -> Self {
        Self { items: Vec::new(), total_pages, total_count }
    }
}

/// Busca todas as páginas de uma coleção, em ordem, uma requisição por vez.
///
/// `total_pages` vem da página 1 e não é relido. Qualquer falha interrompe o
/// dreno e sobe o erro: ou vem a coleção inteira, ou vem erro.
pub async fn drain_all<F>(
    fetcher: &F,
    filter: &FilterParams,
    max_pages: u32,
) -> Result<Drained<F::Item>, FetchError>
where
    F: PageFetcher + ?Sized,
{
    let started = Instant::now();
    let endpoint = fetcher.endpoint();

    let first = fetcher.fetch_page(1, filter).await?;
    let total_pages = first.total_pages;
    let total_count = first.total_count;

    if total_pages == 0 || first.items.is_empty() {
        tracing::info!("{}: nada para drenar (totalPages={}, totalCount={})", endpoint, total_pages, total_count);
        return Ok(Drained::empty(total_pages, total_count));
    }

    if total_pages > u64::from(max_pages) {
        return Err(FetchError::PageLimitExceeded {
            endpoint: endpoint.to_string(),
            total_pages,
            max_pages,
        });
    }

    let mut items = first.items;
    // total_pages <= max_pages, então cabe em u32
    let last_page = total_pages as u32;
    for page in 2..=last_page {
        let next = fetcher.fetch_page(page, filter).await?;
        tracing::debug!("{}: página {}/{} com {} itens", endpoint, page, last_page, next.items.len());
        items.extend(next.items);
    }

    if items.len() as u64 != total_count {
        // O backend mudou durante o dreno (inserção/remoção entre páginas)
        tracing::warn!(
            "{}: drenados {} itens, mas a primeira página informou {}",
            endpoint,
            items.len(),
            total_count
        );
    }

    tracing::info!(
        "{}: {} itens em {} páginas ({} ms)",
        endpoint,
        items.len(),
        total_pages,
        started.elapsed().as_millis()
    );

    Ok(Drained { items, total_pages, total_count })
}
