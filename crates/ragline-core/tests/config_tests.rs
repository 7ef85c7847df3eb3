use figment::Jail;
use ragline_core::config::{DistanceMetric, Provider, RagConfig};

#[test]
fn defaults_match_reference_deployment() {
    let config = RagConfig::default();
    assert_eq!(config.retrieval.top_n, 3);
    assert!((config.retrieval.distance_threshold - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.chunking.chunk_size, 500);
    assert_eq!(config.chunking.chunk_overlap, 100);
    assert_eq!(config.store.dimension, 384);
    assert_eq!(config.store.metric, DistanceMetric::Cosine);
    assert_eq!(config.backends.primary.provider, Provider::DashScope);
    assert_eq!(config.backends.fallback.provider, Provider::Ollama);
    config.validate().expect("defaults are valid");
}

#[test]
fn toml_env_file_and_env_vars_layer_in_order() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [retrieval]
            top_n = 5
            distance_threshold = 0.4

            [store]
            uri = "/tmp/ragline-test"
            metric = "l2"

            [backends.primary]
            provider = "openai"
            model = "gpt-4o-mini"
            "#,
        )?;
        jail.create_file("config.test.toml", "[chunking]\nchunk_size = 300\nchunk_overlap = 60\n")?;
        jail.set_env("APP_RETRIEVAL__TOP_N", "7");
        let config = RagConfig::from_figment(RagConfig::figment_for_env("test")).expect("config");
        assert_eq!(config.retrieval.top_n, 7);
        assert!((config.retrieval.distance_threshold - 0.4).abs() < 1e-6);
        assert_eq!(config.chunking.chunk_size, 300);
        assert_eq!(config.chunking.chunk_overlap, 60);
        assert_eq!(config.store.uri, "/tmp/ragline-test");
        assert_eq!(config.store.metric, DistanceMetric::L2);
        assert_eq!(config.backends.primary.provider, Provider::OpenAi);
        assert_eq!(config.backends.primary.resolved_base_url(), "https://api.openai.com/v1");
        // untouched sections keep their defaults
        assert_eq!(config.backends.fallback.provider, Provider::Ollama);
        Ok(())
    });
}

#[test]
fn overlap_not_smaller_than_size_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n")?;
        let err = RagConfig::from_figment(RagConfig::figment_for_env("dev")).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
        Ok(())
    });
}

#[test]
fn zero_top_n_and_bad_threshold_are_rejected() {
    let mut config = RagConfig::default();
    config.retrieval.top_n = 0;
    assert!(config.validate().is_err());
    let mut config = RagConfig::default();
    config.retrieval.distance_threshold = 0.0;
    assert!(config.validate().is_err());
    config.retrieval.distance_threshold = f32::NAN;
    assert!(config.validate().is_err());
}

#[test]
fn api_key_prefers_explicit_value_then_env() {
    Jail::expect_with(|jail| {
        jail.set_env("RAGLINE_TEST_KEY", "from-env");
        let mut backend = RagConfig::default().backends.primary;
        backend.api_key_env = Some("RAGLINE_TEST_KEY".to_string());
        assert_eq!(backend.resolved_api_key().as_deref(), Some("from-env"));
        backend.api_key = Some("explicit".to_string());
        assert_eq!(backend.resolved_api_key().as_deref(), Some("explicit"));
        Ok(())
    });
}

#[test]
fn paths_expand_env_vars() {
    Jail::expect_with(|jail| {
        jail.set_env("RAGLINE_DATA", "/srv/rag");
        jail.create_file("config.toml", "[store]\nuri = \"${RAGLINE_DATA}/lancedb\"\n")?;
        let config = RagConfig::from_figment(RagConfig::figment_for_env("dev")).expect("config");
        assert_eq!(config.store.uri, "/srv/rag/lancedb");
        Ok(())
    });
}
