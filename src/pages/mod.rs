//! Chat pages.
//!
//! Each page is one way of answering a user message. The server looks pages
//! up by [`ChatPage::name`] and runs them through
//! [`enable_chat_history`](crate::history::enable_chat_history).

pub mod basic;
pub mod internet;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use omnichat_search::SearchChain;
use serde::Serialize;

use crate::error::Result;
use crate::llm::LlmClient;
use crate::session::ChatContext;

pub use basic::BasicPage;
pub use internet::InternetPage;
pub use memory::MemoryPage;

/// One chatbot.
#[async_trait]
pub trait ChatPage: Send + Sync {
    /// Route segment, e.g. `"basic"`.
    fn name(&self) -> &str;

    fn title(&self) -> &str;

    fn icon(&self) -> &str;

    fn description(&self) -> &str;

    /// Answer `input`. The context already holds `input` as its last message.
    ///
    /// # Errors
    ///
    /// Returns an error when no answer can be produced at all.
    async fn handle(
        &self,
        ctx: &mut ChatContext,
        llm: &dyn LlmClient,
        input: &str,
    ) -> Result<String>;
}

/// Serializable summary of a page for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub name: String,
    pub title: String,
    pub icon: String,
    pub description: String,
}

impl PageInfo {
    fn of(page: &dyn ChatPage) -> Self {
        Self {
            name: page.name().to_owned(),
            title: page.title().to_owned(),
            icon: page.icon().to_owned(),
            description: page.description().to_owned(),
        }
    }
}

/// The pages a server offers, in menu order.
#[derive(Default, Clone)]
pub struct PageRegistry {
    pages: Vec<Arc<dyn ChatPage>>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Basic, memory and internet pages, with `chain` backing the last.
    pub fn standard(chain: SearchChain) -> Self {
        Self::new()
            .with(BasicPage)
            .with(MemoryPage)
            .with(InternetPage::new(chain))
    }

    /// Add a page. A later page replaces an earlier one with the same name.
    pub fn with(mut self, page: impl ChatPage + 'static) -> Self {
        self.pages.retain(|p| p.name() != page.name());
        self.pages.push(Arc::new(page));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ChatPage>> {
        self.pages.iter().find(|p| p.name() == name).cloned()
    }

    pub fn list(&self) -> Vec<PageInfo> {
        self.pages.iter().map(|p| PageInfo::of(p.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl std::fmt::Debug for PageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.pages.iter().map(|p| p.name())).finish()
    }
}


#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn standard_registry_lists_three_pages() {
        let registry = PageRegistry::standard(SearchChain::new(Vec::new(), Vec::new()));
        let names: Vec<String> = registry.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["basic", "memory", "internet"]);
        assert!(registry.get("internet").is_some());
        assert!(registry.get("sql").is_none());
    }

    #[test]
    fn later_page_replaces_same_name() {
        let registry = PageRegistry::new().with(BasicPage).with(BasicPage);
        assert_eq!(registry.len(), 1);
    }
}
