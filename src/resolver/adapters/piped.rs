//! Piped API (`GET /streams/{id}`) response model

use serde::Deserialize;

use crate::resolver::formats::{MirrorListing, MirrorStream, codec_from_mime, lenient_u64};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipedStreams {
    pub title: Option<String>,
    #[serde(default)]
    pub audio_streams: Vec<PipedStream>,
    #[serde(default)]
    pub video_streams: Vec<PipedStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipedStream {
    #[serde(default)]
    pub url: String,
    pub quality: Option<String>,
    pub mime_type: Option<String>,
    pub codec: Option<String>,
    #[serde(default)]
    pub video_only: bool,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bitrate: u64,
}

impl PipedStream {
    fn normalize(self, is_audio: bool) -> MirrorStream {
        let codec = self
            .codec
            .map(|c| c.split('.').next().unwrap_or_default().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .or_else(|| self.mime_type.as_deref().and_then(codec_from_mime));

        MirrorStream {
            url: self.url,
            codec,
            quality: self.quality,
            video_only: !is_audio && self.video_only,
            is_audio,
            bitrate: self.bitrate,
        }
    }
}

impl From<PipedStreams> for MirrorListing {
    fn from(response: PipedStreams) -> Self {
        let audio = response.audio_streams.into_iter().map(|s| s.normalize(true));
        let video = response.video_streams.into_iter().map(|s| s.normalize(false));
        MirrorListing {
            title: response.title,
            streams: audio.chain(video).collect(),
        }
    }
}
