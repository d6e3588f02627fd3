//! Search-augmented chatbot.
//!
//! The question goes through the search chain first. The model then writes
//! the answer from the results; if it cannot, the formatted results are the
//! answer. Every step is recorded as the question's thought chain.

use async_trait::async_trait;
use omnichat_search::{SearchChain, SearchOutcome, format_results};
use tokio::sync::Mutex;

use super::ChatPage;
use crate::error::Result;
use crate::llm::LlmClient;
use crate::session::{ChatContext, ChatMessage};

/// Results longer than this are shortened in the progress summary.
const PREVIEW_CHARS: usize = 500;

/// Answers questions about current events using web search.
pub struct InternetPage {
    chain: Mutex<SearchChain>,
}

impl InternetPage {
    pub fn new(chain: SearchChain) -> Self {
        Self {
            chain: Mutex::new(chain),
        }
    }

    /// Run the chain and render what it found. Returns the text and a
    /// description of where it came from.
    async fn search(&self, query: &str) -> (String, String) {
        // One chain invocation at a time across all sessions.
        let mut chain = self.chain.lock().await;
        match chain.search(query).await {
            SearchOutcome::Success { results, backend_name } => (
                format_results(&results),
                format!("Fuente: {backend_name} ({} resultados)", results.len()),
            ),
            SearchOutcome::Failure { errors } => (
                chain.fallback_answer(query),
                format!(
                    "Ninguna fuente respondió ({} errores); usando respuesta de respaldo",
                    errors.len()
                ),
            ),
        }
    }
}

impl std::fmt::Debug for InternetPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternetPage").finish_non_exhaustive()
    }
}

/// The instruction sent to the model along with the search results.
pub fn synthesis_prompt(question: &str, results: &str) -> String {
    format!(
        "Basándote en la siguiente información de búsqueda, responde a la pregunta: '{question}'\n\n\
         RESULTADOS DE BÚSQUEDA:\n{results}\n\n\
         Proporciona una respuesta clara, concisa y bien estructurada. Si la información no es suficiente, indícalo.\n\
         No menciones que estás basando tu respuesta en resultados de búsqueda. \
         Responde como si tuvieras el conocimiento directamente."
    )
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_owned()
    }
}

#[async_trait]
impl ChatPage for InternetPage {
    fn name(&self) -> &str {
        "internet"
    }

    fn title(&self) -> &str {
        "Chatbot con Acceso a Internet"
    }

    fn icon(&self) -> &str {
        "🌐"
    }

    fn description(&self) -> &str {
        "Equipado con acceso a internet, permite a los usuarios hacer preguntas sobre eventos recientes"
    }

    async fn handle(
        &self,
        ctx: &mut ChatContext,
        llm: &dyn LlmClient,
        input: &str,
    ) -> Result<String> {
        let question_id = ctx.question_id();
        let mut thoughts = vec![
            "### Usando búsqueda directa".to_owned(),
            "Buscando información...".to_owned(),
        ];

        let (results, source) = self.search(input).await;
        thoughts.push(source);
        thoughts.push("Resultados de búsqueda:".to_owned());
        thoughts.push(preview(&results));

        thoughts.push("Procesando resultados con LLM...".to_owned());
        let prompt = synthesis_prompt(input, &results);
        thoughts.push("Prompt para el LLM:".to_owned());
        thoughts.push(prompt.clone());

        let reply = match llm.complete(&[ChatMessage::user(prompt)]).await {
            Ok(answer) if !answer.trim().is_empty() => {
                thoughts.push("Respuesta generada por el LLM".to_owned());
                answer
            }
            Ok(_) => {
                thoughts.push("El LLM devolvió una respuesta vacía".to_owned());
                thoughts.push("Usando resultados crudos como respuesta".to_owned());
                results
            }
            Err(error) => {
                tracing::warn!(
                    session = %ctx.id,
                    %error,
                    "LLM synthesis failed; answering with raw results"
                );
                thoughts.push("Error al procesar con LLM".to_owned());
                thoughts.push("Usando resultados crudos como respuesta".to_owned());
                results
            }
        };

        thoughts.push("Búsqueda completada".to_owned());
        ctx.thoughts.retain(|(id, _)| *id != question_id);
        ctx.thoughts.push((question_id, thoughts));
        Ok(reply)
    }
}
