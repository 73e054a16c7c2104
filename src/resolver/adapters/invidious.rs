//! Invidious API (`GET /api/v1/videos/{id}`) response model

use serde::Deserialize;

use crate::resolver::formats::{MirrorListing, MirrorStream, codec_from_mime, lenient_u64};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvidiousVideo {
    pub title: Option<String>,
    /// Split streams
    #[serde(default)]
    pub adaptive_formats: Vec<InvidiousFormat>,
    /// Muxed streams
    #[serde(default)]
    pub format_streams: Vec<InvidiousFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvidiousFormat {
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    pub encoding: Option<String>,
    pub quality_label: Option<String>,
    pub resolution: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bitrate: u64,
}

impl InvidiousFormat {
    fn normalize(self, muxed: bool) -> MirrorStream {
        let is_audio = self.mime_type.starts_with("audio/");
        let codec = self
            .encoding
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .or_else(|| codec_from_mime(&self.mime_type));

        MirrorStream {
            url: self.url,
            codec,
            quality: self.quality_label.or(self.resolution),
            video_only: !muxed && !is_audio,
            is_audio,
            bitrate: self.bitrate,
        }
    }
}

impl From<InvidiousVideo> for MirrorListing {
    fn from(response: InvidiousVideo) -> Self {
        let muxed = response.format_streams.into_iter().map(|f| f.normalize(true));
        let adaptive = response.adaptive_formats.into_iter().map(|f| f.normalize(false));
        MirrorListing {
            title: response.title,
            streams: muxed.chain(adaptive).collect(),
        }
    }
}
