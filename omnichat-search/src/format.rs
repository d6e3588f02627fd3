//! Markdown rendering of search results for the chat transcript and prompts.

use std::fmt::Write as _;

use crate::types::SearchResult;

/// Text used when there is nothing to render.
pub const NO_RESULTS: &str = "No se encontraron resultados.";

/// Render results as a numbered markdown list with source links.
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_owned();
    }

    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        let title = if result.title.trim().is_empty() {
            result.url.as_str()
        } else {
            result.title.as_str()
        };
        // Writing to a String cannot fail.
        let _ = write!(out, "### {}. {}\n{}\n", i + 1, title, result.snippet);
        let _ = write!(out, "**Fuente:** [{0}]({0})\n\n", result.url);
    }
    out
}
