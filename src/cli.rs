use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use tunebox::resolver::MediaKind;

#[derive(Parser, Debug)]
#[command(name = "tunebox")]
#[command(about = "Resolve and relay media streams", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
    /// Resolve one content id server-side and print the result as JSON
    Resolve(ResolveArgs),
    /// Probe, tunnel and save media to disk
    Acquire(AcquireArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to; defaults to `server.bind_addr`
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Content identifier
    pub id: String,
    /// audio, video or both
    #[arg(long = "type", default_value = "both")]
    pub kind: MediaKind,
}

#[derive(clap::Args, Debug)]
pub struct AcquireArgs {
    /// Content identifier
    pub id: String,
    /// audio, video or both
    #[arg(long = "type", default_value = "audio")]
    pub kind: MediaKind,
    /// Directory the files are written to
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}
