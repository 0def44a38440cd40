//! Shared test helpers for configuration tests.

use ortho_config::MergeComposer;
use serde_json::Value;

use crate::StalewatchConfig;

/// Applies a configuration layer to the composer based on the layer type.
pub fn apply_layer(composer: &mut MergeComposer, layer_type: &str, value: Value) {
    match layer_type {
        "defaults" => composer.push_defaults(value),
        "file" => composer.push_file(value, None),
        "environment" => composer.push_environment(value),
        "cli" => composer.push_cli(value),
        _ => panic!("unknown layer type: {layer_type}"),
    }
}

/// Composes a [`StalewatchConfig`] from a sequence of `(layer_type, value)` pairs.
pub fn build_config_from_layers(layers: &[(&str, Value)]) -> StalewatchConfig {
    let mut composer = MergeComposer::new();

    for (layer_type, value) in layers {
        apply_layer(&mut composer, layer_type, value.clone());
    }

    StalewatchConfig::merge_from_layers(composer.layers()).expect("merge should succeed")
}

/// A configuration that passes validation.
pub fn complete_config() -> StalewatchConfig {
    StalewatchConfig {
        bitbucket_domain: Some("bitbucket.example.com".to_owned()),
        project: Some("PLAT".to_owned()),
        user: Some("svc".to_owned()),
        app_password: Some("secret".to_owned()),
        repositories: vec!["api".to_owned()],
        ..Default::default()
    }
}
