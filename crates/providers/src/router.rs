//! Provider router — builds the configured completion provider.

use crate::openai_compat::OpenAiCompatProvider;
use roundtable_config::AppConfig;
use roundtable_core::error::ProviderError;
use roundtable_core::provider::Provider;
use std::sync::Arc;
use tracing::debug;

/// Build the default provider described by `config`.
///
/// Per-provider settings in `[providers.<name>]` win over the top-level
/// `api_key` / `default_model`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone());

    let api_url = provider_config.and_then(|p| p.api_url.clone());

    debug!(provider = name, has_key = api_key.is_some(), "Building provider");

    let provider: Arc<dyn Provider> = match name {
        "azure" => {
            let endpoint = api_url.ok_or_else(|| {
                ProviderError::NotConfigured(
                    "azure provider needs an endpoint (providers.azure.api_url or AZURE_OPENAI_ENDPOINT)"
                        .into(),
                )
            })?;
            let api_key = api_key.ok_or_else(|| {
                ProviderError::NotConfigured("azure provider needs an API key".into())
            })?;
            let deployment = resolve_model(config);
            Arc::new(OpenAiCompatProvider::azure(
                endpoint,
                deployment,
                api_key,
                provider_config.and_then(|p| p.api_version.as_deref()),
            ))
        }
        "ollama" => Arc::new(OpenAiCompatProvider::ollama(api_url.as_deref())),
        _ => {
            let api_key = api_key.ok_or_else(|| {
                ProviderError::NotConfigured(format!("provider '{name}' needs an API key"))
            })?;
            let base_url = api_url.or_else(|| default_base_url(name)).ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "provider '{name}' has no known endpoint; set providers.{name}.api_url"
                ))
            })?;
            Arc::new(OpenAiCompatProvider::new(name, base_url, api_key))
        }
    };

    Ok(provider)
}

/// The model (or Azure deployment) to request.
pub fn resolve_model(config: &AppConfig) -> String {
    config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone())
}

/// The base URL of a well-known provider.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "vllm" => "http://localhost:8000/v1",
        _ => return None,
    };
    Some(url.to_string())
}
