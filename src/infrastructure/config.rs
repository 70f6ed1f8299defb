use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub data_file: PathBuf,
    pub backup_dir: PathBuf,
    pub max_backups: usize,
    pub cache_ttl_seconds: u64,
}

/// Loads `config/server.toml` over built-in defaults; the file is
/// optional so the service runs out of the box.
pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    let settings = config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3001)?
        .set_default("store.data_file", "data/sensorData.json")?
        .set_default("store.backup_dir", "data/backups")?
        .set_default("store.max_backups", 5)?
        .set_default("store.cache_ttl_seconds", 5)?
        .add_source(config::File::with_name("config/server").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
