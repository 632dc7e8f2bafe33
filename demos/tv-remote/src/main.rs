//! Command-line remote for Samsung and LG televisions.
//!
//! Run a simulated set in one terminal:
//!
//! ```bash
//! cargo run -p tv-remote -- fake-tv webos --port 3001 --info-port 3000
//! ```
//!
//! Then drive it from another:
//!
//! ```bash
//! cargo run -p tv-remote -- send 127.0.0.1 webos volumeUp --port 3001 --insecure
//! cargo run -p tv-remote -- send 127.0.0.1 webos launch --payload '{"id":"netflix"}' --port 3001 --insecure
//! cargo run -p tv-remote -- scan 127.0.0. --from 1 --to 1 --kind webos
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tvlink::prelude::*;
use tvlink_sim::{FakeSamsungTv, FakeWebOsTv, SimConfig};

#[derive(Parser)]
#[command(name = "tv-remote")]
#[command(about = "Send commands to Samsung and LG televisions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated television until Ctrl-C
    FakeTv {
        /// samsung or webos
        kind: VendorKind,
        /// Control socket port (0 picks a free one)
        #[arg(long, default_value_t = 0)]
        port: u16,
        /// Identification endpoint port (0 picks a free one)
        #[arg(long, default_value_t = 0)]
        info_port: u16,
        /// Name reported to discovery
        #[arg(long, default_value = "Fake TV")]
        name: String,
        /// Seconds before the pairing prompt is accepted
        #[arg(long, default_value_t = 2)]
        pairing_delay: u64,
        /// Answer a fraction of frames with errors (0.0 to 1.0)
        #[arg(long, default_value_t = 0.0)]
        error_rate: f64,
    },
    /// Probe a range of hosts for televisions
    Scan {
        /// Subnet prefix with trailing dot, e.g. 192.168.1.
        prefix: String,
        #[arg(long, default_value_t = 1)]
        from: u8,
        #[arg(long, default_value_t = 254)]
        to: u8,
        #[arg(long, default_value = "webos")]
        kind: VendorKind,
        /// Identification port override
        #[arg(long)]
        port: Option<u16>,
    },
    /// Send one command and print the acknowledgement
    Send {
        host: String,
        /// samsung or webos
        kind: VendorKind,
        /// Logical name (volumeUp, launch, ...), Samsung key or ssap:// URI
        command: String,
        /// JSON payload for the command
        #[arg(long)]
        payload: Option<String>,
        /// Control socket port override
        #[arg(long)]
        port: Option<u16>,
        /// Use ws:// instead of wss://
        #[arg(long)]
        insecure: bool,
        /// Validate the set's TLS certificate instead of accepting any
        #[arg(long)]
        verify_tls: bool,
        /// Seconds to wait for pairing, including the on-screen prompt
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::FakeTv {
            kind,
            port,
            info_port,
            name,
            pairing_delay,
            error_rate,
        } => {
            let config = SimConfig {
                error_rate: error_rate.clamp(0.0, 1.0),
                ..SimConfig::default()
                    .with_name(name)
                    .with_pairing_delay(Duration::from_secs(pairing_delay))
            };
            run_fake_tv(kind, port, info_port, config).await?;
        }
        Commands::Scan {
            prefix,
            from,
            to,
            kind,
            port,
        } => {
            let mut config = DiscoveryConfig::default();
            if let Some(port) = port {
                config.samsung_port = port;
                config.webos_port = port;
            }
            let discovery = Discovery::new(config)?;
            let found = discovery.scan(&prefix, from..=to, kind).await;
            if found.is_empty() {
                println!("no televisions found");
            }
            for device in found {
                println!(
                    "{}  {}",
                    device.address,
                    device.name.as_deref().unwrap_or("(unnamed)")
                );
            }
        }
        Commands::Send {
            host,
            kind,
            command,
            payload,
            port,
            insecure,
            verify_tls,
            timeout,
        } => {
            let mut adapters = AdapterConfig::default();
            if let Some(port) = port {
                adapters.samsung.port = port;
                adapters.webos.port = port;
            }
            if insecure {
                adapters.samsung.secure = false;
                adapters.webos.secure = false;
            }

            let mut command = Command::new(command);
            if let Some(raw) = payload {
                command = command.with_payload(serde_json::from_str(&raw)?);
            }

            let connector = if verify_tls {
                WebSocketConnector::strict()
            } else {
                WebSocketConnector::new()
            };
            let dispatcher = Dispatcher::builder()
                .adapter_config(adapters)
                .session_config(SessionConfig {
                    pairing_timeout: Duration::from_secs(timeout),
                    ..SessionConfig::default()
                })
                .ready_timeout(Duration::from_secs(timeout))
                .build_with_connector(connector);

            let address = DeviceAddress::new(host, kind);
            let result = dispatcher.send(&address, command).await;
            dispatcher.shutdown().await;

            let ack = result?;
            println!("{}", serde_json::to_string_pretty(&ack)?);
            if !ack.ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_fake_tv(
    kind: VendorKind,
    port: u16,
    info_port: u16,
    config: SimConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let control = format!("0.0.0.0:{port}");
    let info = format!("0.0.0.0:{info_port}");

    // Both variants stay alive until the signal; dropping stops the listeners.
    match kind {
        VendorKind::SamsungRemote => {
            let tv = FakeSamsungTv::bind(&control, &info, config).await?;
            info!(control = %tv.addr(), info = %tv.info_addr(), "fake samsung set running");
            tokio::signal::ctrl_c().await?;
            info!(connections = tv.connections(), state = ?tv.state(), "stopping");
        }
        VendorKind::WebOs => {
            let tv = FakeWebOsTv::bind(&control, &info, config).await?;
            info!(control = %tv.addr(), info = %tv.info_addr(), "fake webos set running");
            tokio::signal::ctrl_c().await?;
            info!(connections = tv.connections(), state = ?tv.state(), "stopping");
        }
    }
    Ok(())
}
