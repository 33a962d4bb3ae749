use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use bt_daemon::configuration::Conf;
use bt_daemon::ipc::client::send_request;
use bt_daemon::ipc::protocol::{Request, Status};

/// Talk to a running bt-daemon.
#[derive(Debug, Parser)]
#[command(name = "bt-ctl", version, about)]
struct Cli {
    /// Path of the daemon socket [default: /var/run/bt-tui.sock]
    #[arg(long)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Discover nearby devices
    Scan,
    /// Add a device to the pairing store
    Pair {
        /// Hardware address, XX:XX:XX:XX:XX:XX
        mac: String,
        /// PIN to pair with; the daemon uses 0000 when omitted
        #[arg(long)]
        pin: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let cli = Cli::parse();
    let socket = cli.socket.unwrap_or_else(|| Conf::default().socket_path);

    let request = match cli.command {
        Command::Scan => Request::scan(),
        Command::Pair { mac, pin } => Request::pair(mac, pin),
    };

    let response = send_request(&socket, &request).await?;

    for device in response.data.iter().flatten() {
        println!("{device}");
    }
    if let Some(message) = &response.message {
        match response.status {
            Status::Success => println!("{message}"),
            Status::Warning => eprintln!("warning: {message}"),
            Status::Error => eprintln!("error: {message}"),
        }
    }

    Ok(match response.status {
        Status::Error => ExitCode::FAILURE,
        Status::Success | Status::Warning => ExitCode::SUCCESS,
    })
}
