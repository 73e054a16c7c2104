//! The four extraction strategies and the clients they share

mod innertube;
mod invidious;
mod library;
mod mirror;
mod native;
mod piped;

pub use innertube::{DEFAULT_PLAYER_ENDPOINT, DeviceProfile, PlayerClient};
pub use invidious::{InvidiousFormat, InvidiousVideo};
pub use library::{DEFAULT_WATCH_BASE, LibraryExtractor, extract_player_response};
pub use mirror::{MirrorFleet, MirrorProbe};
pub use native::NativeExtractor;
pub use piped::{PipedStream, PipedStreams};
