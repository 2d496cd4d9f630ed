use clap::Parser;
use colored::Colorize;
use std::net::{IpAddr, ToSocketAddrs};

use artping::art::ArtSet;
use artping::cli::Args;
use artping::config::Config;
use artping::error::RunError;
use artping::ping::Pinger;
use artping::render::{self, ColorRules};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("[{}] {}", "ERROR".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<(), RunError> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                // Help output is not an error
                let _ = e.print();
                return Ok(());
            }
            // clap's message already carries the usage text
            return Err(RunError::Argument(e.to_string()));
        }
    };

    if args.no_color {
        colored::control::set_override(false);
    }

    if args.version {
        println!("artping {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    args.validate().map_err(RunError::argument)?;

    let art = match &args.art {
        Some(path) => ArtSet::from_file(path).map_err(RunError::Art)?,
        None => ArtSet::builtin(),
    };

    // Presence is guaranteed by clap unless --version was given, and that
    // path returned above
    let host = args
        .host
        .clone()
        .ok_or_else(|| RunError::argument("Host is required"))?;

    let target = resolve_target(&host).map_err(RunError::Init)?;
    let config = Config::from(&args);
    let payload_size = config.payload_size;

    let mut pinger = Pinger::new(config, target).map_err(RunError::Init)?;

    // Ctrl+C stops the send loop; the summary still prints
    let token = pinger.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let rules = ColorRules::default();
    pinger.set_on_reply(Box::new(move |event| {
        println!(
            "{}",
            render::reply_line(art.frame(event.seq), &rules, event)
        );
    }));
    pinger.set_on_finish(Box::new(move |snapshot| {
        println!("{}", render::summary(snapshot));
    }));

    println!(
        "PING {} ({}): {} data bytes (press Ctrl+C to stop early)",
        host, target, payload_size
    );

    pinger.run().await.map_err(RunError::Runtime)
}

/// Resolve a host argument to an IP address, preferring IPv4 when the
/// resolver returns both families
fn resolve_target(host: &str) -> anyhow::Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<IpAddr> = format!("{}:0", host)
        .to_socket_addrs()
        .map_err(|e| anyhow::anyhow!("failed to resolve host {}: {}", host, e))?
        .map(|a| a.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| anyhow::anyhow!("no addresses found for host {}", host))
}
