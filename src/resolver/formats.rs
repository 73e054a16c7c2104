//! Stream-format model shared by the adapters, and the selection policies
//! that pick one stream out of a listing.

use serde::{Deserialize, Deserializer};

use super::types::MediaKind;

/// Subset of an InnerTube `/player` response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub playability_status: Option<PlayabilityStatus>,
    pub streaming_data: Option<StreamingData>,
    pub video_details: Option<VideoDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayabilityStatus {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    /// Muxed audio+video
    #[serde(default)]
    pub formats: Vec<RawFormat>,
    /// Split audio-only / video-only
    #[serde(default)]
    pub adaptive_formats: Vec<RawFormat>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFormat {
    pub url: Option<String>,
    pub signature_cipher: Option<String>,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bitrate: u64,
    pub height: Option<u32>,
}

impl PlayerResponse {
    /// Anything other than `OK` is a failure carrying the upstream reason
    pub fn check_playable(&self) -> Result<(), String> {
        match &self.playability_status {
            Some(status) if status.status == "OK" => Ok(()),
            Some(status) => Err(format!(
                "{} ({})",
                status.status,
                status.reason.as_deref().unwrap_or("no reason given")
            )),
            None => Err("missing playabilityStatus".to_string()),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.video_details
            .as_ref()
            .and_then(|d| d.title.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// Flatten muxed and adaptive lists. Entries with neither a URL nor a
    /// cipher are dropped.
    pub fn stream_formats(&self) -> Vec<StreamFormat> {
        let Some(data) = &self.streaming_data else {
            return Vec::new();
        };

        let muxed = data.formats.iter().filter_map(|f| StreamFormat::from_raw(f, true));
        let adaptive = data
            .adaptive_formats
            .iter()
            .filter_map(|f| StreamFormat::from_raw(f, false));
        muxed.chain(adaptive).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatUrl {
    Direct(String),
    /// Obfuscated `signatureCipher`, needs a decipher helper
    Ciphered(String),
}

impl FormatUrl {
    pub fn direct(&self) -> Option<&str> {
        match self {
            FormatUrl::Direct(url) => Some(url),
            FormatUrl::Ciphered(_) => None,
        }
    }
}

/// One normalized InnerTube stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFormat {
    pub url: FormatUrl,
    pub mime_type: String,
    pub bitrate: u64,
    pub height: Option<u32>,
    pub has_audio: bool,
    pub has_video: bool,
}

impl StreamFormat {
    fn from_raw(raw: &RawFormat, muxed: bool) -> Option<Self> {
        let url = match (&raw.url, &raw.signature_cipher) {
            (Some(url), _) if !url.is_empty() => FormatUrl::Direct(url.clone()),
            (_, Some(cipher)) if !cipher.is_empty() => FormatUrl::Ciphered(cipher.clone()),
            _ => return None,
        };

        let is_audio_mime = raw.mime_type.starts_with("audio/");
        let is_video_mime = raw.mime_type.starts_with("video/");

        Some(Self {
            url,
            mime_type: raw.mime_type.clone(),
            bitrate: raw.bitrate,
            height: raw.height,
            has_audio: is_audio_mime || (muxed && is_video_mime),
            has_video: is_video_mime,
        })
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    pub fn is_video_only(&self) -> bool {
        self.has_video && !self.has_audio
    }

    pub fn is_muxed(&self) -> bool {
        self.has_audio && self.has_video
    }
}

/// Native extractor policy.
///
/// Audio: `audio/mp4` first, then any audio-only stream, highest bitrate
/// within each tier. Video: muxed at `target_height`, then the tallest muxed
/// stream below it, then the tallest video-only stream.
pub fn select_native(
    formats: &[StreamFormat],
    kind: MediaKind,
    target_height: u32,
) -> Option<&StreamFormat> {
    match kind.for_relay() {
        MediaKind::Video => {
            let muxed = || formats.iter().filter(|f| f.is_muxed());
            muxed()
                .filter(|f| f.height == Some(target_height))
                .max_by_key(|f| f.bitrate)
                .or_else(|| {
                    muxed()
                        .filter(|f| f.height.is_some_and(|h| h < target_height))
                        .max_by_key(|f| (f.height, f.bitrate))
                })
                .or_else(|| {
                    formats
                        .iter()
                        .filter(|f| f.is_video_only())
                        .max_by_key(|f| (f.height, f.bitrate))
                })
        }
        _ => {
            let audio = || formats.iter().filter(|f| f.is_audio_only());
            audio()
                .filter(|f| f.mime_type.starts_with("audio/mp4"))
                .max_by_key(|f| f.bitrate)
                .or_else(|| audio().max_by_key(|f| f.bitrate))
        }
    }
}

/// Library extractor policy.
///
/// Audio: highest-bitrate audio-only stream. Video: tallest muxed stream,
/// else tallest video-only stream.
pub fn select_library(formats: &[StreamFormat], kind: MediaKind) -> Option<&StreamFormat> {
    match kind.for_relay() {
        MediaKind::Video => formats
            .iter()
            .filter(|f| f.is_muxed())
            .max_by_key(|f| (f.height, f.bitrate))
            .or_else(|| {
                formats
                    .iter()
                    .filter(|f| f.is_video_only())
                    .max_by_key(|f| (f.height, f.bitrate))
            }),
        _ => formats
            .iter()
            .filter(|f| f.is_audio_only())
            .max_by_key(|f| f.bitrate),
    }
}

/// One stream in a mirror listing, normalized across API classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorStream {
    pub url: String,
    pub codec: Option<String>,
    /// Quality label such as `720p` or `720p60`
    pub quality: Option<String>,
    pub video_only: bool,
    pub is_audio: bool,
    pub bitrate: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MirrorListing {
    pub title: Option<String>,
    pub streams: Vec<MirrorStream>,
}

/// Mirror fleet policy.
///
/// Audio: a stream whose codec matches `preferred_codec`, else any audio
/// stream. Video: a muxed stream labeled `720p*` (`720p60`, `720p HD`), then
/// any `720p*` stream, then any stream that is not video-only.
pub fn select_mirror_stream<'a>(
    streams: &'a [MirrorStream],
    kind: MediaKind,
    preferred_codec: &str,
) -> Option<&'a MirrorStream> {
    let usable = || streams.iter().filter(|s| !s.url.trim().is_empty());

    match kind.for_relay() {
        MediaKind::Video => {
            let video = || usable().filter(|s| !s.is_audio);
            let is_720 = |s: &&MirrorStream| {
                s.quality
                    .as_deref()
                    .is_some_and(|q| q.trim_start().starts_with("720p"))
            };
            video()
                .filter(is_720)
                .find(|s| !s.video_only)
                .or_else(|| video().find(is_720))
                .or_else(|| video().find(|s| !s.video_only))
        }
        _ => {
            let audio = || usable().filter(|s| s.is_audio);
            audio()
                .filter(|s| {
                    s.codec
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(preferred_codec))
                })
                .max_by_key(|s| s.bitrate)
                .or_else(|| audio().max_by_key(|s| s.bitrate))
        }
    }
}

/// `audio/webm; codecs="opus"` -> `opus`
pub fn codec_from_mime(mime: &str) -> Option<String> {
    let (_, params) = mime.split_once("codecs=")?;
    let codec = params
        .trim_matches(|c| c == '"' || c == '\'' || c == ' ')
        .split(',')
        .next()?
        .trim_matches('"')
        .split('.')
        .next()?
        .trim();
    (!codec.is_empty()).then(|| codec.to_ascii_lowercase())
}

/// Numbers arrive as JSON numbers or as decimal strings depending on the API
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Number>::deserialize(deserializer)? {
        Some(Number::Int(n)) => n,
        Some(Number::Float(f)) if f.is_finite() && f >= 0.0 => f as u64,
        Some(Number::Text(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
