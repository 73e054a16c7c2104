//! InnerTube `/player` client and the device profiles it impersonates

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::net::{FetchError, HttpClient};
use crate::resolver::formats::PlayerResponse;

pub const DEFAULT_PLAYER_ENDPOINT: &str =
    "https://www.youtube.com/youtubei/v1/player?prettyPrint=false";

/// Client identity presented to the player catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProfile {
    Ios,
    AndroidVr,
    Android,
    TvEmbedded,
    Tv,
}

struct ClientIdentity {
    client_name: &'static str,
    client_version: &'static str,
    client_name_id: u32,
    user_agent: &'static str,
    device_make: Option<&'static str>,
    device_model: Option<&'static str>,
    os_name: Option<&'static str>,
    os_version: Option<&'static str>,
    android_sdk_version: Option<u32>,
}

const IOS: ClientIdentity = ClientIdentity {
    client_name: "IOS",
    client_version: "19.45.4",
    client_name_id: 5,
    user_agent: "com.google.ios.youtube/19.45.4 (iPhone16,2; U; CPU iOS 18_1_0 like Mac OS X;)",
    device_make: Some("Apple"),
    device_model: Some("iPhone16,2"),
    os_name: Some("iPhone"),
    os_version: Some("18.1.0.22B83"),
    android_sdk_version: None,
};

const ANDROID_VR: ClientIdentity = ClientIdentity {
    client_name: "ANDROID_VR",
    client_version: "1.60.19",
    client_name_id: 28,
    user_agent: "com.google.android.apps.youtube.vr.oculus/1.60.19 (Linux; U; Android 12L; eureka-user Build/SQ3A.220605.009.A1) gzip",
    device_make: Some("Oculus"),
    device_model: Some("Quest 3"),
    os_name: Some("Android"),
    os_version: Some("12L"),
    android_sdk_version: Some(32),
};

const ANDROID: ClientIdentity = ClientIdentity {
    client_name: "ANDROID",
    client_version: "19.44.38",
    client_name_id: 3,
    user_agent: "com.google.android.youtube/19.44.38 (Linux; U; Android 14; en_US; Pixel 8) gzip",
    device_make: Some("Google"),
    device_model: Some("Pixel 8"),
    os_name: Some("Android"),
    os_version: Some("14"),
    android_sdk_version: Some(34),
};

const TV_EMBEDDED: ClientIdentity = ClientIdentity {
    client_name: "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
    client_version: "2.0",
    client_name_id: 85,
    user_agent: "Mozilla/5.0 (PlayStation; PlayStation 4/12.00) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.4 Safari/605.1.15",
    device_make: None,
    device_model: None,
    os_name: None,
    os_version: None,
    android_sdk_version: None,
};

const TV: ClientIdentity = ClientIdentity {
    client_name: "TVHTML5",
    client_version: "7.20250120.19.00",
    client_name_id: 7,
    user_agent: "Mozilla/5.0 (ChromiumStylePlatform) Cobalt/Version",
    device_make: None,
    device_model: None,
    os_name: None,
    os_version: None,
    android_sdk_version: None,
};

impl DeviceProfile {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ios" => Some(DeviceProfile::Ios),
            "android_vr" => Some(DeviceProfile::AndroidVr),
            "android" => Some(DeviceProfile::Android),
            "tv_embedded" => Some(DeviceProfile::TvEmbedded),
            "tv" => Some(DeviceProfile::Tv),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceProfile::Ios => "ios",
            DeviceProfile::AndroidVr => "android_vr",
            DeviceProfile::Android => "android",
            DeviceProfile::TvEmbedded => "tv_embedded",
            DeviceProfile::Tv => "tv",
        }
    }

    fn identity(self) -> &'static ClientIdentity {
        match self {
            DeviceProfile::Ios => &IOS,
            DeviceProfile::AndroidVr => &ANDROID_VR,
            DeviceProfile::Android => &ANDROID,
            DeviceProfile::TvEmbedded => &TV_EMBEDDED,
            DeviceProfile::Tv => &TV,
        }
    }

    pub fn client_name(self) -> &'static str {
        self.identity().client_name
    }

    pub fn client_version(self) -> &'static str {
        self.identity().client_version
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRequest<'a> {
    video_id: &'a str,
    context: RequestContext,
    content_check_ok: bool,
    racy_check_ok: bool,
}

#[derive(Debug, Serialize)]
struct RequestContext {
    client: ClientContext,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientContext {
    client_name: &'static str,
    client_version: &'static str,
    hl: &'static str,
    gl: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_make: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_model: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    os_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    os_version: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android_sdk_version: Option<u32>,
}

/// Issues `/player` calls as a given device
#[derive(Debug, Clone)]
pub struct PlayerClient {
    http: HttpClient,
    endpoint: String,
}

impl PlayerClient {
    pub fn new(http: HttpClient) -> Self {
        Self::with_endpoint(http, DEFAULT_PLAYER_ENDPOINT)
    }

    pub fn with_endpoint(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub async fn player(
        &self,
        content_id: &str,
        profile: DeviceProfile,
        timeout: Duration,
    ) -> Result<PlayerResponse, FetchError> {
        let identity = profile.identity();
        let body = PlayerRequest {
            video_id: content_id,
            context: RequestContext {
                client: ClientContext {
                    client_name: identity.client_name,
                    client_version: identity.client_version,
                    hl: "en",
                    gl: "US",
                    device_make: identity.device_make,
                    device_model: identity.device_model,
                    os_name: identity.os_name,
                    os_version: identity.os_version,
                    android_sdk_version: identity.android_sdk_version,
                },
            },
            content_check_ok: true,
            racy_check_ok: true,
        };

        self.http
            .post_json(&self.endpoint, profile_headers(identity), &body, timeout)
            .await
    }
}

fn profile_headers(identity: &ClientIdentity) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        HeaderValue::from_static(identity.user_agent),
    );
    headers.insert(
        HeaderName::from_static("x-youtube-client-name"),
        HeaderValue::from(identity.client_name_id),
    );
    headers.insert(
        HeaderName::from_static("x-youtube-client-version"),
        HeaderValue::from_static(identity.client_version),
    );
    headers
}
