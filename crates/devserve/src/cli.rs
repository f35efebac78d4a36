use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use devserve_manifest::data::{BundlerMode, ProtocolVariant};
use devserve_manifest::ServerConfig;

#[derive(Clone, Debug, Parser)]
#[command(name = "devserve", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct App {
    /// Project directory containing app.json
    #[arg(default_value = ".")]
    pub project_root: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8081)]
    pub port: u16,

    /// Port the bundler serves on, when it differs from --port
    #[arg(long)]
    pub bundler_port: Option<u16>,

    #[arg(long, value_enum, default_value_t = Mode::Development)]
    pub mode: Mode,

    #[arg(long, value_enum, default_value_t = Protocol::Modern)]
    pub protocol: Protocol,

    /// Skip all network calls and serve anonymous manifests
    #[arg(long)]
    pub offline: bool,

    /// Developer code signing private key
    #[arg(long)]
    pub private_key_path: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Development,
    Production,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    Modern,
    Legacy,
}

impl From<Mode> for BundlerMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Development => BundlerMode::Development,
            Mode::Production => BundlerMode::Production,
        }
    }
}

impl From<Protocol> for ProtocolVariant {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Modern => ProtocolVariant::Modern,
            Protocol::Legacy => ProtocolVariant::Legacy,
        }
    }
}

impl App {
    /// Overlay the command line on `base`, which already holds the
    /// environment. `--offline` can only turn the offline path on.
    pub fn server_config(&self, base: ServerConfig) -> ServerConfig {
        ServerConfig {
            project_root: self.project_root.clone(),
            bundler_port: self.bundler_port.unwrap_or(self.port),
            mode: self.mode.into(),
            protocol: self.protocol.into(),
            offline: base.offline || self.offline,
            private_key_path: self.private_key_path.clone().or(base.private_key_path),
            ..base
        }
    }
}
