//! Maps configured [`BackendId`]s to live backends.

use std::sync::Arc;

use crate::backend::BackendDescriptor;
use crate::backends::{
    BingScrapeBackend, DuckDuckGoHtmlBackend, DuckDuckGoLiteBackend, ExaBackend,
    GoogleScrapeBackend, GooglePseBackend, TavilyBackend, YouBackend,
};
use crate::config::SearchConfig;
use crate::types::BackendId;

/// Instantiate one backend.
pub fn build_backend(id: BackendId, config: &Arc<SearchConfig>) -> BackendDescriptor {
    let config = Arc::clone(config);
    match id {
        BackendId::DuckDuckGoLite => BackendDescriptor::new(DuckDuckGoLiteBackend::new(config)),
        BackendId::DuckDuckGoHtml => BackendDescriptor::new(DuckDuckGoHtmlBackend::new(config)),
        BackendId::GoogleScrape => BackendDescriptor::new(GoogleScrapeBackend::new(config)),
        BackendId::BingScrape => BackendDescriptor::new(BingScrapeBackend::new(config)),
        BackendId::GooglePse => BackendDescriptor::new(GooglePseBackend::new(config)),
        BackendId::Exa => BackendDescriptor::new(ExaBackend::new(config)),
        BackendId::You => BackendDescriptor::new(YouBackend::new(config)),
        BackendId::Tavily => BackendDescriptor::new(TavilyBackend::new(config)),
    }
}

/// Build the free and paid priority lists, in configured order.
pub fn build_descriptors(
    config: &SearchConfig,
) -> (Vec<BackendDescriptor>, Vec<BackendDescriptor>) {
    let shared = Arc::new(config.clone());
    let free = config
        .free_backends
        .iter()
        .map(|id| build_backend(*id, &shared))
        .collect();
    let paid = config
        .paid_backends
        .iter()
        .map(|id| build_backend(*id, &shared))
        .collect();
    (free, paid)
}
