use super::models::Config;
use crate::resolver::adapters::DeviceProfile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("fleet.race_width must be at least 1")]
    ZeroRaceWidth,

    #[error("probe.wave_size must be at least 1")]
    ZeroWaveSize,

    #[error("Mirror '{url}' in '{list}' must be an http/https URL")]
    InvalidMirrorUrl { list: String, url: String },

    #[error("Unknown device profile '{name}' in '{section}'")]
    UnknownProfile { section: String, name: String },

    #[error("No device profiles configured in '{section}'")]
    NoProfiles { section: String },

    #[error("Timeout must be positive: {field}")]
    ZeroTimeout { field: String },

    #[error("timeouts.tunnel_ms ({tunnel}) must not be shorter than timeouts.discovery_ms ({discovery})")]
    TunnelShorterThanDiscovery { tunnel: u64, discovery: u64 },

    #[error("fallback.url_template must contain the '{{id}}' placeholder")]
    FallbackWithoutPlaceholder,

    #[error("{field} must be an http/https URL, got '{url}'")]
    InvalidUrl { field: String, url: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_fleet(config)?;
    validate_mirrors(config)?;
    validate_profiles(config)?;
    validate_timeouts(config)?;
    validate_fallback(config)?;
    validate_probe(config)?;
    Ok(())
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_fleet(config: &Config) -> Result<(), ValidationError> {
    if config.fleet.race_width == 0 {
        return Err(ValidationError::ZeroRaceWidth);
    }
    Ok(())
}

fn validate_mirrors(config: &Config) -> Result<(), ValidationError> {
    let lists = [
        ("mirrors.piped", &config.mirrors.piped),
        ("mirrors.invidious", &config.mirrors.invidious),
        ("mirrors.client_piped", &config.mirrors.client_piped),
        ("mirrors.client_invidious", &config.mirrors.client_invidious),
    ];

    for (list, urls) in lists {
        if let Some(url) = urls.iter().find(|url| !is_http(url)) {
            return Err(ValidationError::InvalidMirrorUrl {
                list: list.to_string(),
                url: url.clone(),
            });
        }
    }

    Ok(())
}

fn validate_profiles(config: &Config) -> Result<(), ValidationError> {
    let sections = [
        ("native.profiles", &config.native.profiles),
        ("probe.profiles", &config.probe.profiles),
    ];

    for (section, names) in sections {
        if names.is_empty() {
            return Err(ValidationError::NoProfiles {
                section: section.to_string(),
            });
        }
        for name in names {
            if DeviceProfile::from_name(name).is_none() {
                return Err(ValidationError::UnknownProfile {
                    section: section.to_string(),
                    name: name.clone(),
                });
            }
        }
    }

    Ok(())
}

fn validate_timeouts(config: &Config) -> Result<(), ValidationError> {
    let t = &config.timeouts;
    let fields = [
        ("timeouts.discovery_ms", t.discovery_ms),
        ("timeouts.mirror_ms", t.mirror_ms),
        ("timeouts.native_ms", t.native_ms),
        ("timeouts.library_ms", t.library_ms),
        ("timeouts.tunnel_ms", t.tunnel_ms),
        ("http.connect_timeout_ms", config.http.connect_timeout_ms),
    ];

    if let Some((field, _)) = fields.iter().find(|(_, value)| *value == 0) {
        return Err(ValidationError::ZeroTimeout {
            field: field.to_string(),
        });
    }

    if t.tunnel_ms < t.discovery_ms {
        return Err(ValidationError::TunnelShorterThanDiscovery {
            tunnel: t.tunnel_ms,
            discovery: t.discovery_ms,
        });
    }

    Ok(())
}

fn validate_fallback(config: &Config) -> Result<(), ValidationError> {
    if !config.fallback.url_template.contains("{id}") {
        return Err(ValidationError::FallbackWithoutPlaceholder);
    }
    Ok(())
}

fn validate_probe(config: &Config) -> Result<(), ValidationError> {
    if config.probe.wave_size == 0 {
        return Err(ValidationError::ZeroWaveSize);
    }

    let urls = [
        ("probe.decipher_helper", &config.probe.decipher_helper),
        ("probe.relay_endpoint", &config.probe.relay_endpoint),
    ];
    for (field, url) in urls {
        if let Some(url) = url {
            if !is_http(url) {
                return Err(ValidationError::InvalidUrl {
                    field: field.to_string(),
                    url: url.clone(),
                });
            }
        }
    }

    Ok(())
}
