//! OpenRouter's free model catalogue.
//!
//! The model list is fetched from `/models` and narrowed to free models. Any
//! failure (no key, network, bad JSON, nothing free) falls back to a built-in
//! list so the model picker is never empty.

use serde::{Deserialize, Serialize};

/// Base URL of the OpenRouter API.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Sent as `HTTP-Referer` so OpenRouter can attribute traffic.
pub const OPENROUTER_REFERER: &str = "https://github.com/bladealex9848/OmniChat";

/// Sent as `X-Title`.
pub const OPENROUTER_TITLE: &str = "OmniChat";

/// One selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub context_length: u64,
    pub free: bool,
    /// Accepts image input.
    pub multimodal: bool,
}

impl ModelInfo {
    fn builtin(
        id: &str,
        name: &str,
        description: &str,
        context_length: u64,
        multimodal: bool,
    ) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            description: description.to_owned(),
            context_length,
            free: true,
            multimodal,
        }
    }
}

/// Models known to be free when the catalogue cannot be read.
pub fn default_free_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::builtin(
            "meta-llama/llama-4-maverick:free",
            "Llama 4 Maverick (Free)",
            "Modelo multimodal de Meta con capacidades avanzadas de visión y razonamiento",
            128_000,
            true,
        ),
        ModelInfo::builtin(
            "meta-llama/llama-4-scout:free",
            "Llama 4 Scout (Free)",
            "Modelo multimodal de Meta optimizado para tareas de visión",
            128_000,
            true,
        ),
        ModelInfo::builtin(
            "qwen/qwen2.5-vl-32b-instruct:free",
            "Qwen 2.5 VL 32B (Free)",
            "Modelo multimodal de Alibaba con capacidades de visión y lenguaje",
            32_000,
            true,
        ),
        ModelInfo::builtin(
            "qwen/qwen2.5-vl-72b-instruct:free",
            "Qwen 2.5 VL 72B (Free)",
            "Versión más grande del modelo multimodal de Alibaba",
            32_000,
            true,
        ),
        ModelInfo::builtin(
            "google/gemini-2.0-flash-thinking-exp:free",
            "Gemini 2.0 Flash (Free)",
            "Modelo experimental de Google con capacidades de razonamiento",
            32_000,
            false,
        ),
        ModelInfo::builtin(
            "deepseek/deepseek-r1-distill-qwen-14b:free",
            "DeepSeek R1 Distill 14B (Free)",
            "Modelo destilado de DeepSeek optimizado para razonamiento",
            32_000,
            false,
        ),
        ModelInfo::builtin(
            "mistralai/mistral-small-3.1-24b-instruct:free",
            "Mistral Small 3.1 24B (Free)",
            "Modelo compacto de Mistral con buen rendimiento general",
            32_000,
            false,
        ),
    ]
}

#[derive(Deserialize)]
struct Catalogue {
    #[serde(default)]
    data: Vec<RawModel>,
}

#[derive(Deserialize)]
struct RawModel {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    context_length: Option<u64>,
    #[serde(default)]
    pricing: Option<Pricing>,
    #[serde(default)]
    architecture: Option<Architecture>,
    #[serde(default)]
    multimodal: Option<bool>,
}

#[derive(Deserialize)]
struct Pricing {
    #[serde(default)]
    prompt: Option<serde_json::Value>,
    #[serde(default)]
    completion: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Architecture {
    #[serde(default)]
    modality: Option<String>,
    #[serde(default)]
    input_modalities: Vec<String>,
}

/// Prices arrive as strings (`"0"`, `"0.000002"`) or numbers.
fn is_zero_price(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().is_ok_and(|p| p == 0.0),
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|p| p == 0.0),
        _ => false,
    }
}

impl RawModel {
    fn is_free(&self) -> bool {
        let priced_free = self.pricing.as_ref().is_some_and(|p| {
            is_zero_price(p.prompt.as_ref()) && is_zero_price(p.completion.as_ref())
        });

        let description = self.description.as_deref().unwrap_or_default().to_lowercase();
        let named_free = self.name.to_lowercase().contains("free")
            || description.contains("free")
            || self.id.to_lowercase().contains("free");
        let marked_paid = description.contains("not free") || description.contains("paid");

        (priced_free || named_free) && !marked_paid
    }

    fn is_multimodal(&self) -> bool {
        if let Some(flag) = self.multimodal {
            return flag;
        }
        self.architecture.as_ref().is_some_and(|a| {
            a.modality.as_deref().is_some_and(|m| m.contains("image"))
                || a.input_modalities.iter().any(|m| m == "image")
        })
    }

    fn into_info(self) -> ModelInfo {
        let multimodal = self.is_multimodal();
        ModelInfo {
            name: if self.name.is_empty() {
                self.id.clone()
            } else {
                self.name
            },
            id: self.id,
            description: self.description.unwrap_or_default(),
            context_length: self.context_length.unwrap_or_default(),
            free: true,
            multimodal,
        }
    }
}

/// List OpenRouter's free models.
///
/// Without a key the built-in list is returned without a request.
pub async fn fetch_free_models(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
) -> Vec<ModelInfo> {
    let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
        tracing::debug!("no OpenRouter key; using built-in model list");
        return default_free_models();
    };

    match request_catalogue(client, url, api_key).await {
        Ok(models) if !models.is_empty() => {
            tracing::info!(count = models.len(), "loaded free OpenRouter models");
            models
        }
        Ok(_) => {
            tracing::warn!("OpenRouter catalogue has no free models; using built-in list");
            default_free_models()
        }
        Err(error) => {
            tracing::warn!(%error, "failed to load OpenRouter catalogue; using built-in list");
            default_free_models()
        }
    }
}

async fn request_catalogue(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
) -> Result<Vec<ModelInfo>, String> {
    let response = client
        .get(url)
        .bearer_auth(api_key)
        .header("HTTP-Referer", OPENROUTER_REFERER)
        .header("X-Title", OPENROUTER_TITLE)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status.as_u16()));
    }

    let catalogue: Catalogue = response.json().await.map_err(|e| e.to_string())?;
    Ok(catalogue
        .data
        .into_iter()
        .filter(RawModel::is_free)
        .map(RawModel::into_info)
        .collect())
}

/// Keep only models that accept images, or all of them if none do.
pub fn multimodal_only(models: Vec<ModelInfo>) -> Vec<ModelInfo> {
    if models.iter().any(|m| m.multimodal) {
        models.into_iter().filter(|m| m.multimodal).collect()
    } else {
        models
    }
}
