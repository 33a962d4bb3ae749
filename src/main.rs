use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

use bt_daemon::bluetooth::{discovery::HcControl, service::ServiceCommand};
use bt_daemon::configuration::Conf;
use bt_daemon::ipc::{dispatcher::Dispatcher, server::IpcServer};
use bt_daemon::log;

/// Privileged Bluetooth management daemon.
#[derive(Debug, Parser)]
#[command(name = "bt-daemon", version, about)]
struct Args {
    /// Netgraph HCI node name, e.g. ubt0hci
    #[arg(long)]
    device: Option<String>,

    /// Path of the IPC socket
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Path of the hcsecd pairing store
    #[arg(long)]
    hcsecd_conf: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    /// Command-line values take precedence over the configuration file.
    fn apply(self, mut conf: Conf) -> Conf {
        if let Some(device) = self.device {
            conf.hci_device = device;
        }
        if let Some(socket) = self.socket {
            conf.socket_path = socket;
        }
        if let Some(path) = self.hcsecd_conf {
            conf.hcsecd_conf_path = path;
        }
        conf
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    log::init_tracing();
    debug!("Tracing initialized");

    let conf = Conf::load(args.config.as_deref());
    let conf = args.apply(conf);
    conf.check_hci_device();
    debug!("Configuration: {:?}", conf);
    info!("Starting bt-daemon using HCI device: {}", conf.hci_device);

    if !nix::unistd::geteuid().is_root() {
        bail!("The daemon must be run as root.");
    }

    let reloader =
        ServiceCommand::from_conf(&conf.reload).context("reload.command must not be empty")?;
    let dispatcher = Dispatcher::new(
        HcControl::from_conf(&conf.inquiry, &conf.hci_device),
        reloader,
        conf.hcsecd_conf_path.clone(),
    );

    let server = IpcServer::bind(&conf.socket_path, conf.socket_mode)?;
    server.serve(&dispatcher, shutdown_signal()).await;

    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }
}
