//! The HTTP client every backend request goes through.
//!
//! Scraping targets answer in the configured interface language only when
//! the request looks like it came from a browser, so the client carries
//! browser headers by default: a User-Agent drawn from a short rotation,
//! `Accept`, and an `Accept-Language` derived from
//! [`SearchConfig::language`]. API backends send the same headers; the
//! vendors ignore them.

use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::config::SearchConfig;
use crate::error::SearchError;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
];

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8";

/// Build the client for one backend request.
///
/// A fresh client per request means a fresh User-Agent and cookie jar, so
/// a consent cookie or a throttling mark from one search does not follow
/// the next.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `language` cannot go in a header and
/// [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(user_agent(config, &mut rand::thread_rng()).to_owned())
        .default_headers(browser_headers(&config.language)?)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// The configured User-Agent, or one drawn from the rotation.
fn user_agent<'a>(config: &'a SearchConfig, rng: &mut impl Rng) -> &'a str {
    match config.user_agent.as_deref() {
        Some(custom) if !custom.trim().is_empty() => custom,
        _ => USER_AGENTS.choose(rng).copied().unwrap_or(USER_AGENTS[0]),
    }
}

fn browser_headers(language: &str) -> Result<HeaderMap, SearchError> {
    let accept_language = HeaderValue::from_str(&accept_language(language)).map_err(|_| {
        SearchError::Config(format!("language {language:?} is not a valid header value"))
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, accept_language);
    Ok(headers)
}

/// `es` becomes `es,en;q=0.8`; English needs no fallback.
fn accept_language(language: &str) -> String {
    match language.trim() {
        "" | "en" => "en-US,en;q=0.9".to_owned(),
        lang => format!("{lang},en;q=0.8"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn header_is(name: &'static str, value: &'static str) -> impl Fn(&Request) -> bool {
        move |req| req.headers.get(name).and_then(|v| v.to_str().ok()) == Some(value)
    }

    #[test]
    fn rotation_covers_more_than_one_agent() {
        let config = SearchConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let seen: std::collections::HashSet<_> = (0..64)
            .map(|_| user_agent(&config, &mut rng))
            .collect();
        assert!(seen.len() > 1);
        assert!(seen.iter().all(|ua| USER_AGENTS.contains(ua)));
    }

    #[test]
    fn custom_agent_wins_unless_blank() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = SearchConfig {
            user_agent: Some("OmniChatBot/1.0".into()),
            ..Default::default()
        };
        assert_eq!(user_agent(&config, &mut rng), "OmniChatBot/1.0");

        let blank = SearchConfig {
            user_agent: Some("  ".into()),
            ..Default::default()
        };
        assert!(USER_AGENTS.contains(&user_agent(&blank, &mut rng)));
    }

    #[test]
    fn accept_language_values() {
        assert_eq!(accept_language("es"), "es,en;q=0.8");
        assert_eq!(accept_language("pt-BR"), "pt-BR,en;q=0.8");
        assert_eq!(accept_language("en"), "en-US,en;q=0.9");
    }

    #[test]
    fn unusable_language_is_config_error() {
        let config = SearchConfig {
            language: "es\r\nX-Injected: 1".into(),
            ..Default::default()
        };
        assert!(matches!(build_client(&config), Err(SearchError::Config(_))));
    }

    #[tokio::test]
    async fn requests_carry_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_is("accept-language", "es,en;q=0.8"))
            .and(header_is("accept", BROWSER_ACCEPT))
            .and(header("user-agent", "OmniChatBot/1.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = SearchConfig {
            user_agent: Some("OmniChatBot/1.0".into()),
            ..Default::default()
        };
        let response = build_client(&config)
            .expect("client")
            .get(server.uri())
            .send()
            .await
            .expect("send");
        assert!(response.status().is_success());
    }
}
