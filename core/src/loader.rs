//! Level loading: the boundary with the external level provider.
//!
//! RULE: `LevelLoader::load` always returns a playable level. A provider
//! error, a malformed payload, or a payload that breaks a level invariant
//! is logged and replaced by the fallback level.

use crate::{
    config::EngineConfig,
    level::{Level, LevelPayload, Provenance, OFFLINE_MESSAGE},
    types::LevelNumber,
};
use std::future::Future;

/// An external source of levels. Implementations return the raw payload
/// text; parsing and validation happen in the loader.
pub trait LevelProvider: Send + Sync {
    fn request_level(
        &self,
        level: LevelNumber,
    ) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// A level ready to be swapped into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedLevel {
    pub level:      Level,
    pub message:    Option<String>,
    pub provenance: Provenance,
}

impl LoadedLevel {
    pub fn fallback(level: Level, message: &str) -> Self {
        Self {
            level,
            message: Some(message.to_string()),
            provenance: Provenance::Fallback,
        }
    }
}

pub struct LevelLoader<P> {
    provider:         Option<P>,
    max_grid_size:    u32,
    fallback:         Level,
    fallback_message: String,
}

impl<P: LevelProvider> LevelLoader<P> {
    pub fn new(provider: P, config: &EngineConfig) -> Self {
        Self::with_provider(Some(provider), config)
    }

    /// A loader with no provider: every request gets the fallback level.
    pub fn offline(config: &EngineConfig) -> Self {
        Self::with_provider(None, config)
    }

    fn with_provider(provider: Option<P>, config: &EngineConfig) -> Self {
        Self {
            provider,
            max_grid_size:    config.max_grid_size,
            fallback:         config.fallback_level.clone(),
            fallback_message: config.fallback_message.clone(),
        }
    }

    pub fn fallback(&self) -> LoadedLevel {
        LoadedLevel::fallback(self.fallback.clone(), &self.fallback_message)
    }

    pub async fn load(&self, level: LevelNumber) -> LoadedLevel {
        let Some(provider) = &self.provider else {
            log::warn!("no level provider configured; level {level} uses the offline level");
            return LoadedLevel::fallback(self.fallback.clone(), OFFLINE_MESSAGE);
        };

        let text = match provider.request_level(level).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("level provider failed for level {level}: {e:#}");
                return self.fallback();
            }
        };

        match LevelPayload::parse(&text).and_then(|p| p.into_level(self.max_grid_size)) {
            Ok((parsed, message)) => LoadedLevel {
                level: parsed,
                message,
                provenance: Provenance::Generated,
            },
            Err(e) => {
                log::warn!("rejected payload for level {level}: {e}");
                self.fallback()
            }
        }
    }
}
