//! Building library components from a [`BotConfig`].

use std::sync::Arc;

use ragline::llms::{OpenAI, OpenAIConfig};
use ragline::messaging::line::{LineClient, LineConfig};
use ragline::relay::{Relay, RelaySettings};
use ragline::retrieval::{IndexParams, Retriever, VectorIndex};
use ragline::server::ServerConfig;
use tracing::info;

use crate::config::BotConfig;
use crate::error::{BotError, Result};

/// Create the OpenAI client.
pub fn openai_client(config: &BotConfig) -> Result<OpenAI> {
    let section = &config.openai;
    let api_key = section
        .api_key
        .clone()
        .ok_or_else(|| BotError::config("OpenAI API key is not set (OPENAI_API_KEY)"))?;

    let mut openai = OpenAIConfig::new(api_key)
        .with_model(section.model.clone())
        .with_embedding_model(section.embedding_model.clone())
        .with_timeout(section.timeout_secs);
    if let Some(base) = &section.api_base {
        openai = openai.with_base_url(base.clone());
    }
    if let Some(org) = &section.organization {
        openai = openai.with_organization(org.clone());
    }

    Ok(OpenAI::new(openai)?)
}

/// Create the LINE reply client.
pub fn line_client(config: &BotConfig) -> Result<LineClient> {
    let section = &config.line;
    let token = section.channel_access_token.clone().ok_or_else(|| {
        BotError::config("LINE channel access token is not set (LINE_CHANNEL_ACCESS_TOKEN)")
    })?;

    let mut line = LineConfig::new(token).with_timeout(section.timeout_secs);
    if let Some(secret) = &section.channel_secret {
        line = line.with_channel_secret(secret.clone());
    }
    if let Some(base) = &section.api_base {
        line = line.with_api_base(base.clone());
    }

    Ok(LineClient::new(line)?)
}

/// HNSW parameters from the retrieval section.
#[must_use]
pub fn index_params(config: &BotConfig) -> IndexParams {
    IndexParams {
        ef_search: config.retrieval.ef_search,
        ..IndexParams::default()
    }
}

/// Load the index and wrap it in a retriever.
pub async fn retriever(config: &BotConfig, openai: Arc<OpenAI>) -> Result<Retriever> {
    let section = &config.retrieval;
    let path = section.resolved_index_path();

    let index = VectorIndex::load(&path, index_params(config)).await?;
    info!(
        path = %path.display(),
        entries = index.len(),
        model = %index.model(),
        "loaded retrieval index"
    );

    let mut retriever = Retriever::new(openai, Arc::new(index)).with_top_k(section.top_k);
    if let Some(min_score) = section.min_score {
        retriever = retriever.with_min_score(min_score);
    }
    Ok(retriever)
}

/// Reply handling options.
#[must_use]
pub fn relay_settings(config: &BotConfig) -> RelaySettings {
    RelaySettings {
        fallback_reply: config
            .relay
            .fallback_reply
            .clone()
            .filter(|s| !s.trim().is_empty()),
        skip_redeliveries: config.relay.skip_redeliveries,
        max_completion_tokens: config.openai.max_completion_tokens,
        temperature: config.openai.temperature,
        ..RelaySettings::default()
    }
}

/// Assemble the relay. Retrieval is wired in when enabled in the config.
pub async fn relay(config: &BotConfig) -> Result<Relay> {
    let openai = Arc::new(openai_client(config)?);
    let line = Arc::new(line_client(config)?);

    let mut relay = Relay::new(openai.clone(), line)
        .with_model(config.openai.model.clone())
        .with_prompt(config.persona.template())
        .with_settings(relay_settings(config));

    if config.retrieval.enabled {
        relay = relay.with_retriever(retriever(config, openai).await?);
    } else {
        info!("retrieval disabled");
    }

    Ok(relay)
}

/// Routing options for the webhook server.
#[must_use]
pub fn server_config(config: &BotConfig) -> ServerConfig {
    ServerConfig {
        webhook_path: config.server.webhook_path.clone(),
        channel_secret: config.line.channel_secret.clone(),
    }
}
