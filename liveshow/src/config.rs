use serde::{Deserialize, Serialize};
use std::{env, fs, net::SocketAddr, str::FromStr, time::Duration};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub simulate: Simulate,
    #[serde(default)]
    pub media: Media,
    #[serde(default)]
    pub store: Store,
    #[serde(default)]
    pub announce: Announce,
    #[serde(default)]
    pub webhook: Webhook,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Auth {
    /// Admin bearer tokens, empty disables auth
    #[serde(default)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub tick_period: TickPeriod,
    #[serde(default)]
    pub upcoming_refresh_ticks: UpcomingRefreshTicks,
}

/// Milliseconds between two scheduling ticks
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TickPeriod(pub u64);

impl Default for TickPeriod {
    fn default() -> Self {
        TickPeriod(1000)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpcomingRefreshTicks(pub u32);

impl Default for UpcomingRefreshTicks {
    fn default() -> Self {
        UpcomingRefreshTicks(30)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulate {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub period: SimulatePeriod,
    #[serde(default = "default_chat_probability")]
    pub chat_probability: f64,
    #[serde(default = "default_seed_min")]
    pub seed_min: u32,
    #[serde(default = "default_seed_max")]
    pub seed_max: u32,
}

/// Milliseconds between two activity simulation steps
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulatePeriod(pub u64);

impl Default for SimulatePeriod {
    fn default() -> Self {
        SimulatePeriod(3000)
    }
}

impl Default for Simulate {
    fn default() -> Self {
        Self {
            enabled: true,
            period: SimulatePeriod::default(),
            chat_probability: default_chat_probability(),
            seed_min: default_seed_min(),
            seed_max: default_seed_max(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Synthetic tracks, always granted
    #[default]
    Virtual,
    /// Every acquisition is refused by the user
    Deny,
    /// No capture hardware present
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub device: Device,
    #[serde(default = "default_true")]
    pub audio: bool,
    #[serde(default = "default_true")]
    pub video: bool,
}

impl Default for Media {
    fn default() -> Self {
        Self {
            device: Device::default(),
            audio: true,
            video: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Store {
    #[default]
    Memory,
    Rest(RestStore),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestStore {
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_rest_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announce {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

impl Default for Announce {
    fn default() -> Self {
        Self {
            enabled: true,
            tags: default_tags(),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Webhook {
    #[serde(default)]
    pub webhooks: Vec<String>,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("7777"))
    ))
    .expect("invalid listen address")
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_true() -> bool {
    true
}

fn default_chat_probability() -> f64 {
    0.1
}

fn default_seed_min() -> u32 {
    10
}

fn default_seed_max() -> u32 {
    59
}

fn default_table() -> String {
    "live_sessions".to_string()
}

fn default_rest_timeout() -> u64 {
    5000
}

fn default_tags() -> Vec<String> {
    vec!["Live".to_string()]
}

impl Schedule {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period.0)
    }
}

impl Simulate {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period.0)
    }
}

impl Config {
    pub fn parse(path: Option<String>) -> anyhow::Result<Self> {
        let result = fs::read_to_string(path.unwrap_or(String::from("onair.toml")))
            .or(fs::read_to_string("/etc/onair/onair.toml"))
            .unwrap_or("".to_string());
        let cfg: Self = toml::from_str(result.as_str())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.schedule.tick_period.0 == 0 {
            return Err(anyhow::anyhow!("schedule tick_period must be positive"));
        }
        if self.simulate.period.0 == 0 {
            return Err(anyhow::anyhow!("simulate period must be positive"));
        }
        if !(0.0..=1.0).contains(&self.simulate.chat_probability) {
            return Err(anyhow::anyhow!(
                "simulate chat_probability must be within [0, 1]"
            ));
        }
        if self.simulate.seed_min > self.simulate.seed_max {
            return Err(anyhow::anyhow!("simulate seed_min exceeds seed_max"));
        }
        if let Store::Rest(rest) = &self.store {
            if rest.url.is_empty() {
                return Err(anyhow::anyhow!("rest store requires a url"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_file() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.schedule.tick_period(), Duration::from_secs(1));
        assert_eq!(cfg.schedule.upcoming_refresh_ticks.0, 30);
        assert_eq!(cfg.simulate.period(), Duration::from_secs(3));
        assert_eq!((cfg.simulate.seed_min, cfg.simulate.seed_max), (10, 59));
        assert_eq!(cfg.media.device, Device::Virtual);
        assert!(cfg.media.audio && cfg.media.video);
        assert!(matches!(cfg.store, Store::Memory));
        assert!(cfg.auth.tokens.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rest_store_section() {
        let cfg: Config = toml::from_str(
            r#"
            [store]
            kind = "rest"
            url = "https://db.example.org"
            api_key = "anon"

            [schedule]
            tick_period = 500
            "#,
        )
        .unwrap();
        match &cfg.store {
            Store::Rest(rest) => {
                assert_eq!(rest.url, "https://db.example.org");
                assert_eq!(rest.table, "live_sessions");
            }
            Store::Memory => panic!("expected rest store"),
        }
        assert_eq!(cfg.schedule.tick_period(), Duration::from_millis(500));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg: Config = toml::from_str("[simulate]\nchat_probability = 1.5").unwrap();
        assert!(cfg.validate().is_err());

        let cfg: Config = toml::from_str("[schedule]\ntick_period = 0").unwrap();
        assert!(cfg.validate().is_err());

        let cfg: Config = toml::from_str("[store]\nkind = \"rest\"\nurl = \"\"").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[media]\ndevice = \"deny\"\n[auth]\ntokens = [\"secret\"]").unwrap();
        let cfg = Config::parse(Some(file.path().to_string_lossy().to_string())).unwrap();
        assert_eq!(cfg.media.device, Device::Deny);
        assert_eq!(cfg.auth.tokens, vec!["secret".to_string()]);
    }
}
