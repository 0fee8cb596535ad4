use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct SkylineConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub github: GithubSettings,
    pub labels: LabelSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_host: String,
    pub bind_port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let host: IpAddr = self.bind_host.parse()?;
        Ok(SocketAddr::new(host, self.bind_port))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubSettings {
    pub graphql_url: String,
    /// Token of the machine user that imports the All series. Empty when not configured.
    #[serde(default)]
    pub machine_user_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelSettings {
    pub font_family: String,
    /// Explicit font file, takes precedence over the family lookup
    pub font_path: Option<PathBuf>,
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind_host", "0.0.0.0")?
        .set_default("server.bind_port", 8000)?
        .set_default("database.path", "skyline.sqlite")?
        .set_default("github.graphql_url", "https://api.github.com/graphql")?
        .set_default("github.machine_user_token", "")?
        .set_default("labels.font_family", "Sans")?)
}

/// Defaults, then `config/skyline.*` if present, then `SKYLINE_*` environment variables.
pub fn load_skyline_config() -> anyhow::Result<SkylineConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/skyline").required(false))
        .add_source(
            config::Environment::with_prefix("SKYLINE")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
