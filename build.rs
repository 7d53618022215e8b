use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Default)]
struct ConfigSection {
    base_class_size: Option<usize>,
    class_slack: Option<usize>,
    max_size_classes: Option<usize>,
}

#[derive(Deserialize, Default)]
struct Config {
    #[serde(default)]
    config: ConfigSection,
}

struct ResolvedConfig {
    base_class_size: usize,
    class_slack: usize,
    max_size_classes: usize,
}

fn resolve_config(cfg: &ConfigSection) -> ResolvedConfig {
    let base_class_size = cfg.base_class_size.unwrap_or(1024);
    let class_slack = cfg.class_slack.unwrap_or(100);
    let max_size_classes = cfg.max_size_classes.unwrap_or(64);

    assert!(
        base_class_size.is_power_of_two(),
        "base_class_size ({}) must be a power of 2",
        base_class_size
    );
    assert!(
        base_class_size >= 64,
        "base_class_size ({}) must be >= 64",
        base_class_size
    );
    assert!(
        class_slack < base_class_size,
        "class_slack ({}) must be < base_class_size ({})",
        class_slack,
        base_class_size
    );
    // The smallest class must still hold a pool back-reference plus some
    // usable payload.
    assert!(
        base_class_size - class_slack >= 32,
        "smallest class ({}) too small to carry a header",
        base_class_size - class_slack
    );
    assert!(
        max_size_classes >= 1 && max_size_classes <= 64,
        "max_size_classes ({}) must be in 1..=64",
        max_size_classes
    );

    ResolvedConfig {
        base_class_size,
        class_slack,
        max_size_classes,
    }
}

fn default_config_path() -> String {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    format!("{}/rtpool.toml", manifest_dir)
}

fn generate_config(cfg: &ResolvedConfig, out_path: &Path) {
    let code = format!(
        "// Auto-generated by build.rs. Do not edit.\n\n\
         /// Payload size of the smallest size class, before slack.\n\
         pub const BASE_CLASS_SIZE: usize = {};\n\
         /// Bytes shaved off each power-of-two class.\n\
         pub const CLASS_SLACK: usize = {};\n\
         /// Hard cap on the number of size classes a dispatcher may own.\n\
         pub const MAX_SIZE_CLASSES: usize = {};\n",
        cfg.base_class_size, cfg.class_slack, cfg.max_size_classes,
    );
    fs::write(out_path, code).expect("failed to write config_gen.rs");
}

fn main() {
    println!("cargo:rerun-if-env-changed=RTPOOL_CONFIG");

    let out_dir = env::var("OUT_DIR").unwrap();

    let config_path = env::var("RTPOOL_CONFIG").unwrap_or_else(|_| default_config_path());
    println!("cargo:rerun-if-changed={}", config_path);
    let content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", config_path, e));

    let config: Config = toml::from_str(&content).expect("failed to parse TOML config");
    let resolved = resolve_config(&config.config);

    generate_config(&resolved, &Path::new(&out_dir).join("config_gen.rs"));
}
