//! Level loader tests: every provider failure ends in a playable level.

use robopath_core::{
    config::EngineConfig,
    generator::ProceduralLevelProvider,
    grid::Position,
    level::{Level, Provenance, OFFLINE_MESSAGE},
    loader::{LevelLoader, LevelProvider},
    types::LevelNumber,
};
use std::future::Future;

struct UnreachableProvider;

impl LevelProvider for UnreachableProvider {
    fn request_level(
        &self,
        _level: LevelNumber,
    ) -> impl Future<Output = anyhow::Result<String>> + Send {
        async { Err(anyhow::anyhow!("connection refused")) }
    }
}

struct CannedProvider(&'static str);

impl LevelProvider for CannedProvider {
    fn request_level(
        &self,
        _level: LevelNumber,
    ) -> impl Future<Output = anyhow::Result<String>> + Send {
        let text = self.0.to_string();
        async move { Ok(text) }
    }
}

fn assert_valid(level: &Level) {
    let rebuilt = Level::new(
        level.grid_size(),
        level.start(),
        level.goal(),
        level.obstacles().iter().copied(),
    );
    assert_eq!(rebuilt.as_ref(), Ok(level));
}

/// Scenario E: the provider throws and the fallback level is used.
#[tokio::test]
async fn unreachable_provider_falls_back() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = EngineConfig::default_test();
    let loader = LevelLoader::new(UnreachableProvider, &config);

    let loaded = loader.load(1).await;
    assert_eq!(loaded.provenance, Provenance::Fallback);
    assert_eq!(loaded.level, config.fallback_level);
    assert_eq!(loaded.message.as_deref(), Some(config.fallback_message.as_str()));
    assert_valid(&loaded.level);
}

#[tokio::test]
async fn malformed_json_falls_back() {
    let config = EngineConfig::default_test();
    let loader = LevelLoader::new(CannedProvider("the robot is sleeping"), &config);
    assert_eq!(loader.load(2).await.provenance, Provenance::Fallback);
}

#[tokio::test]
async fn payload_breaking_invariants_falls_back() {
    let config = EngineConfig::default_test();
    let cases = [
        r#"{"gridSize":4,"robotPos":{"x":1,"y":1},"goalPos":{"x":1,"y":1}}"#,
        r#"{"gridSize":4,"robotPos":{"x":0,"y":0},"goalPos":{"x":3,"y":3},
            "obstacles":[{"x":3,"y":3}]}"#,
        r#"{"gridSize":0,"robotPos":{"x":0,"y":0},"goalPos":{"x":0,"y":1}}"#,
        r#"{"gridSize":4,"robotPos":{"x":0,"y":0},"goalPos":{"x":9,"y":0}}"#,
        r#"{"gridSize":99,"robotPos":{"x":0,"y":0},"goalPos":{"x":1,"y":0}}"#,
    ];
    for payload in cases {
        let loader = LevelLoader::new(CannedProvider(payload), &config);
        let loaded = loader.load(1).await;
        assert_eq!(loaded.provenance, Provenance::Fallback, "accepted {payload}");
        assert_valid(&loaded.level);
    }
}

#[tokio::test]
async fn valid_payload_is_generated_level() {
    let config = EngineConfig::default_test();
    let loader = LevelLoader::new(
        CannedProvider(
            "```json\n{\"gridSize\":5,\"robotPos\":{\"x\":0,\"y\":4},\
             \"goalPos\":{\"x\":4,\"y\":0},\"obstacles\":[{\"x\":2,\"y\":2},{\"x\":2,\"y\":2}],\
             \"message\":\"To the moon!\"}\n```",
        ),
        &config,
    );

    let loaded = loader.load(3).await;
    assert_eq!(loaded.provenance, Provenance::Generated);
    assert_eq!(loaded.level.start(), Position::new(0, 4));
    assert_eq!(loaded.level.obstacles().len(), 1);
    assert_eq!(loaded.message.as_deref(), Some("To the moon!"));
}

#[tokio::test]
async fn offline_loader_uses_offline_message() {
    let config = EngineConfig::default_test();
    let loader: LevelLoader<ProceduralLevelProvider> = LevelLoader::offline(&config);
    let loaded = loader.load(4).await;
    assert_eq!(loaded.provenance, Provenance::Fallback);
    assert_eq!(loaded.message.as_deref(), Some(OFFLINE_MESSAGE));
}

#[tokio::test]
async fn procedural_provider_loads_as_generated() {
    let config = EngineConfig::default_test();
    let provider = ProceduralLevelProvider::new(config.generator_seed, config.max_grid_size);
    let loader = LevelLoader::new(provider, &config);
    for level in 1..=12 {
        let loaded = loader.load(level).await;
        assert_eq!(loaded.provenance, Provenance::Generated, "level {level}");
        assert_valid(&loaded.level);
    }
}
