use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use super::mirrors;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub native: NativeConfig,
    #[serde(default)]
    pub mirrors: MirrorConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Upper bound for form-encoded POST bodies on the resolve endpoint
    #[serde(default = "default_max_form_bytes")]
    pub max_form_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_form_bytes: default_max_form_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_form_bytes() -> usize {
    16 * 1024
}

/// Outbound HTTP client settings shared by every adapter
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36"
        .to_string()
}

/// Per call-type timeouts in milliseconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    /// Canonical-host probes issued by the client-side probe
    #[serde(default = "default_discovery_ms")]
    pub discovery_ms: u64,
    /// One mirror endpoint request
    #[serde(default = "default_mirror_ms")]
    pub mirror_ms: u64,
    /// One native extractor profile request
    #[serde(default = "default_native_ms")]
    pub native_ms: u64,
    /// Watch-page fetch of the library extractor
    #[serde(default = "default_library_ms")]
    pub library_ms: u64,
    /// Time to upstream response headers when tunneling
    #[serde(default = "default_tunnel_ms")]
    pub tunnel_ms: u64,
}

impl TimeoutConfig {
    pub fn discovery(&self) -> Duration {
        Duration::from_millis(self.discovery_ms)
    }

    pub fn mirror(&self) -> Duration {
        Duration::from_millis(self.mirror_ms)
    }

    pub fn native(&self) -> Duration {
        Duration::from_millis(self.native_ms)
    }

    pub fn library(&self) -> Duration {
        Duration::from_millis(self.library_ms)
    }

    pub fn tunnel(&self) -> Duration {
        Duration::from_millis(self.tunnel_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            discovery_ms: default_discovery_ms(),
            mirror_ms: default_mirror_ms(),
            native_ms: default_native_ms(),
            library_ms: default_library_ms(),
            tunnel_ms: default_tunnel_ms(),
        }
    }
}

fn default_discovery_ms() -> u64 {
    3_000
}

fn default_mirror_ms() -> u64 {
    9_000
}

fn default_native_ms() -> u64 {
    10_000
}

fn default_library_ms() -> u64 {
    12_000
}

fn default_tunnel_ms() -> u64 {
    30_000
}

/// Fleet race and stream selection policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FleetConfig {
    /// Number of shuffled endpoints consulted concurrently per race
    #[serde(default = "default_race_width")]
    pub race_width: usize,
    /// Codec tag preferred for audio streams returned by mirrors
    #[serde(default = "default_preferred_audio_codec")]
    pub preferred_audio_codec: String,
    /// Preferred video height
    #[serde(default = "default_target_height")]
    pub target_height: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            race_width: default_race_width(),
            preferred_audio_codec: default_preferred_audio_codec(),
            target_height: default_target_height(),
        }
    }
}

fn default_race_width() -> usize {
    6
}

fn default_preferred_audio_codec() -> String {
    "opus".to_string()
}

fn default_target_height() -> u32 {
    720
}

/// Native extractor profile order
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NativeConfig {
    #[serde(default = "default_native_profiles")]
    pub profiles: Vec<String>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            profiles: default_native_profiles(),
        }
    }
}

fn default_native_profiles() -> Vec<String> {
    vec!["ios".into(), "tv_embedded".into(), "tv".into()]
}

/// Mirror endpoint lists. Server lists default to the built-in tables;
/// the client lists are appended to them for the client-side probe.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    #[serde(default = "mirrors::default_piped")]
    pub piped: Vec<String>,
    #[serde(default = "mirrors::default_invidious")]
    pub invidious: Vec<String>,
    #[serde(default = "mirrors::default_client_piped")]
    pub client_piped: Vec<String>,
    #[serde(default = "mirrors::default_client_invidious")]
    pub client_invidious: Vec<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            piped: mirrors::default_piped(),
            invidious: mirrors::default_invidious(),
            client_piped: mirrors::default_client_piped(),
            client_invidious: mirrors::default_client_invidious(),
        }
    }
}

/// Client-side probe settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Targets raced per wave
    #[serde(default = "default_wave_size")]
    pub wave_size: usize,
    /// Device profiles used against the canonical host
    #[serde(default = "default_probe_profiles")]
    pub profiles: Vec<String>,
    /// Helper endpoint that turns a `signatureCipher` into a playable URL
    pub decipher_helper: Option<String>,
    /// Same-origin relay used to wrap mirror requests (`?action=proxy&url=`)
    pub relay_endpoint: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            wave_size: default_wave_size(),
            profiles: default_probe_profiles(),
            decipher_helper: None,
            relay_endpoint: None,
        }
    }
}

fn default_wave_size() -> usize {
    4
}

fn default_probe_profiles() -> Vec<String> {
    vec!["android_vr".into(), "ios".into()]
}

/// External fallback link offered when acquisition fails
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackConfig {
    /// Link template; `{id}` is replaced by the content id
    #[serde(default = "default_url_template")]
    pub url_template: String,
}

impl FallbackConfig {
    pub fn link_for(&self, content_id: &str) -> String {
        self.url_template.replace("{id}", content_id)
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
        }
    }
}

fn default_url_template() -> String {
    "https://cobalt.tools/?u=https://www.youtube.com/watch?v={id}".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.fleet.race_width, 6);
        assert_eq!(config.fleet.target_height, 720);
        assert_eq!(config.probe.wave_size, 4);
        assert_eq!(config.timeouts.tunnel(), Duration::from_secs(30));
        assert!(!config.mirrors.piped.is_empty());
        assert!(!config.mirrors.invidious.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[fleet]
race_width = 3

[mirrors]
piped = ["https://pipedapi.example"]

[probe]
decipher_helper = "https://helper.example/decipher"
"#,
        )
        .expect("Failed to parse test config");

        assert_eq!(config.fleet.race_width, 3);
        assert_eq!(config.fleet.preferred_audio_codec, "opus");
        assert_eq!(config.mirrors.piped, vec!["https://pipedapi.example"]);
        assert!(!config.mirrors.invidious.is_empty());
        assert_eq!(
            config.probe.decipher_helper.as_deref(),
            Some("https://helper.example/decipher")
        );
        assert_eq!(config.probe.profiles, vec!["android_vr", "ios"]);
    }

    #[test]
    fn test_fallback_link_substitutes_id() {
        let fallback = FallbackConfig {
            url_template: "https://example.com/dl/{id}".to_string(),
        };
        assert_eq!(fallback.link_for("abc123"), "https://example.com/dl/abc123");
    }
}
