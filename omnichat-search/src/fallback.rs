//! Last-resort answers for when every backend failed.
//!
//! A [`FallbackPolicy`] turns a query into a non-empty, user-presentable
//! answer without touching the network. [`KeywordFallback`] is the default
//! policy: an ordered table of keyword rules whose bodies may reference the
//! current date. The table is data, so deployments can replace the canned
//! answers without code changes.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

const WEEKDAYS: [&str; 7] = [
    "lunes",
    "martes",
    "miércoles",
    "jueves",
    "viernes",
    "sábado",
    "domingo",
];

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Used when a configured body renders to nothing.
const LAST_RESORT: &str = "Lo siento, no he podido completar la búsqueda en este momento.";

/// Produces an answer when the chain came back empty-handed.
pub trait FallbackPolicy: Send + Sync {
    /// Answer `query` as of `today`. Must return a non-empty string.
    fn synthesize_on(&self, query: &str, today: NaiveDate) -> String;

    /// Answer `query` as of the local date.
    fn synthesize(&self, query: &str) -> String {
        self.synthesize_on(query, Local::now().date_naive())
    }
}

/// `sábado 17 de octubre de 2026`
pub fn spanish_date(date: NaiveDate) -> String {
    format!(
        "{} {} de {} de {}",
        WEEKDAYS[date.weekday().num_days_from_monday() as usize],
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

/// `octubre de 2026`
pub fn spanish_month(date: NaiveDate) -> String {
    format!("{} de {}", MONTHS[date.month0() as usize], date.year())
}

/// One keyword rule. Matches when the lowercased query contains every term in
/// `all_of` and, if `any_of` is non-empty, at least one term in `any_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    #[serde(default)]
    pub all_of: Vec<String>,
    #[serde(default)]
    pub any_of: Vec<String>,
    /// Answer template. `{date}` and `{month}` are substituted.
    pub body: String,
}

impl FallbackRule {
    fn matches(&self, query_lower: &str) -> bool {
        if self.all_of.is_empty() && self.any_of.is_empty() {
            return false;
        }
        let all = self
            .all_of
            .iter()
            .all(|term| query_lower.contains(&term.to_lowercase()));
        let any = self.any_of.is_empty()
            || self
                .any_of
                .iter()
                .any(|term| query_lower.contains(&term.to_lowercase()));
        all && any
    }
}

/// Keyword rule table with a generic default answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordFallback {
    /// Checked in order; first match wins.
    pub rules: Vec<FallbackRule>,
    /// Answer when no rule matches.
    pub default_body: String,
}

impl KeywordFallback {
    pub fn new(rules: Vec<FallbackRule>, default_body: impl Into<String>) -> Self {
        Self {
            rules,
            default_body: default_body.into(),
        }
    }

    fn render(template: &str, today: NaiveDate) -> String {
        template
            .replace("{date}", &spanish_date(today))
            .replace("{month}", &spanish_month(today))
    }
}

impl Default for KeywordFallback {
    fn default() -> Self {
        Self {
            rules: vec![
                FallbackRule {
                    all_of: vec!["presidente".into(), "colombia".into()],
                    any_of: vec![],
                    body: "### Información sobre el Presidente de Colombia\n\n\
                           Gustavo Francisco Petro Urrego es el presidente de Colombia. \
                           Asumió el cargo el 7 de agosto de 2022 para un período de cuatro años hasta 2026.\n\n\
                           Antes de ser presidente, Petro fue alcalde de Bogotá (2012-2015) y senador.\n\n\
                           ### Fecha actual\nHoy es {date}."
                        .into(),
                },
                FallbackRule {
                    all_of: vec![],
                    any_of: vec!["fecha".into(), "día".into(), "hoy".into(), "actual".into()],
                    body: "### Información sobre la fecha actual\n\n\
                           Hoy es {date}.\n\n\
                           El mes actual es {month}."
                        .into(),
                },
            ],
            default_body: "Lo siento, no he podido encontrar información específica sobre tu consulta \
                           debido a limitaciones temporales en el acceso a datos en tiempo real.\n\n\
                           Puedo confirmar que la fecha actual es {date}.\n\n\
                           Por favor, intenta reformular tu pregunta o consulta sobre un tema diferente."
                .into(),
        }
    }
}

impl FallbackPolicy for KeywordFallback {
    fn synthesize_on(&self, query: &str, today: NaiveDate) -> String {
        let query_lower = query.to_lowercase();
        let template = self
            .rules
            .iter()
            .find(|rule| rule.matches(&query_lower))
            .map_or(self.default_body.as_str(), |rule| rule.body.as_str());

        let answer = Self::render(template, today);
        if answer.trim().is_empty() {
            tracing::warn!("fallback template rendered empty, using built-in answer");
            return LAST_RESORT.to_owned();
        }
        answer
    }
}
