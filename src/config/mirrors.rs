//! Built-in mirror tables. These are the defaults for `[mirrors]`; the
//! resolved lists are frozen into a [`MirrorTable`] once at startup.

use std::sync::Arc;

use super::models::MirrorConfig;
use crate::resolver::{MirrorClass, MirrorEndpoint};

const PIPED: &[&str] = &[
    "https://pipedapi.kavin.rocks",
    "https://pipedapi.adminforge.de",
    "https://api.piped.private.coffee",
    "https://pipedapi.reallyaweso.me",
    "https://pipedapi.leptons.xyz",
    "https://piped-api.lunar.icu",
    "https://pipedapi.drgns.space",
    "https://pipedapi.ducks.party",
];

const INVIDIOUS: &[&str] = &[
    "https://inv.nadeko.net",
    "https://invidious.nerdvpn.de",
    "https://yewtu.be",
    "https://invidious.f5.si",
    "https://inv.tux.pizza",
    "https://invidious.privacyredirect.com",
    "https://iv.melmac.space",
    "https://invidious.materialio.us",
];

const CLIENT_PIPED: &[&str] = &[
    "https://pipedapi.darkness.services",
    "https://pipedapi.orangenet.cc",
    "https://pipedapi.r4fo.com",
    "https://pipedapi.owo.si",
];

const CLIENT_INVIDIOUS: &[&str] = &[
    "https://invidious.jing.rocks",
    "https://yt.artemislena.eu",
    "https://invidious.einfachzocken.eu",
    "https://inv.in.projectsegfau.lt",
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub(super) fn default_piped() -> Vec<String> {
    owned(PIPED)
}

pub(super) fn default_invidious() -> Vec<String> {
    owned(INVIDIOUS)
}

pub(super) fn default_client_piped() -> Vec<String> {
    owned(CLIENT_PIPED)
}

pub(super) fn default_client_invidious() -> Vec<String> {
    owned(CLIENT_INVIDIOUS)
}

/// Immutable, process-wide endpoint lists
#[derive(Debug, Clone)]
pub struct MirrorTable {
    pub piped: Arc<[MirrorEndpoint]>,
    pub invidious: Arc<[MirrorEndpoint]>,
    /// Server Piped list followed by the client extras
    pub client_piped: Arc<[MirrorEndpoint]>,
    /// Server Invidious list followed by the client extras
    pub client_invidious: Arc<[MirrorEndpoint]>,
}

impl MirrorTable {
    pub fn from_config(config: &MirrorConfig) -> Self {
        let build = |class: MirrorClass, lists: &[&Vec<String>]| -> Arc<[MirrorEndpoint]> {
            let mut seen = std::collections::HashSet::new();
            lists
                .iter()
                .flat_map(|list| list.iter())
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| seen.insert(url.clone()))
                .map(|base_url| MirrorEndpoint { base_url, class })
                .collect()
        };

        Self {
            piped: build(MirrorClass::Piped, &[&config.piped]),
            invidious: build(MirrorClass::Invidious, &[&config.invidious]),
            client_piped: build(MirrorClass::Piped, &[&config.piped, &config.client_piped]),
            client_invidious: build(
                MirrorClass::Invidious,
                &[&config.invidious, &config.client_invidious],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_lists_extend_server_lists() {
        let table = MirrorTable::from_config(&MirrorConfig::default());

        assert_eq!(table.piped.len(), PIPED.len());
        assert_eq!(table.client_piped.len(), PIPED.len() + CLIENT_PIPED.len());
        assert_eq!(
            table.client_invidious.len(),
            INVIDIOUS.len() + CLIENT_INVIDIOUS.len()
        );
        assert!(table.piped.iter().all(|e| e.class == MirrorClass::Piped));
    }

    #[test]
    fn test_duplicates_and_trailing_slashes_collapse() {
        let config = MirrorConfig {
            piped: vec!["https://a.example/".into(), "https://a.example".into()],
            invidious: vec![],
            client_piped: vec!["https://a.example".into(), "https://b.example".into()],
            client_invidious: vec![],
        };

        let table = MirrorTable::from_config(&config);
        assert_eq!(table.piped.len(), 1);
        assert_eq!(table.piped[0].base_url, "https://a.example");
        assert_eq!(table.client_piped.len(), 2);
    }
}
