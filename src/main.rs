use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{info, warn};
use sepp_rust::calls::{Call, CallDetails, CallOptions};
use sepp_rust::message::Sdp;
use sepp_rust::socket::consts::DEFAULT_ENDPOINT;
use std::path::PathBuf;
use std::time::Duration;

// Places a call with a dummy offer, holds it, then terminates it.
//
// Usage:
//   cargo run -- --auth-token <JWT> --client-id <ID> --conf-id <ID>
//   cargo run -- ... --hold 30 --ca-file ./ca.pem

#[derive(Parser, Debug)]
#[command(name = "sepp-call", about = "Place a test call over SEPP signaling")]
struct Args {
    /// JWT token
    #[arg(long, default_value = "")]
    auth_token: String,

    /// Client-ID to use
    #[arg(long)]
    client_id: String,

    /// Confserver-ID to connect to
    #[arg(long)]
    conf_id: String,

    /// Signaling endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Display name sent with the offer
    #[arg(long, default_value = "[Guest] sepp-call")]
    display_name: String,

    /// Trust only this CA file
    #[arg(long)]
    ca_file: Option<PathBuf>,

    /// Seconds to hold the call before terminating
    #[arg(long, default_value_t = 10)]
    hold: u64,

    /// Seconds to wait for the server on start and terminate
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    let details = CallDetails {
        sig_endpoint: args.endpoint,
        auth_token: args.auth_token,
        client_id: args.client_id,
        conf_id: args.conf_id,
    };
    let mut options = CallOptions::default()
        .with_platform_version(concat!("sepp-rust/", env!("CARGO_PKG_VERSION")));
    if let Some(ca_file) = args.ca_file {
        options = options.with_custom_ca_file(ca_file);
    }

    let call = Call::new(&details, options).context("failed to set up call")?;
    call.on_sdp_update(|sdp| info!("Sdp update with type {} sdp: {}", sdp.sdp_type, sdp.sdp));
    call.on_memberlist(|list| info!("Memberlist: {} participants", list.count));
    call.on_terminated(|code| info!("Call terminated with code {code}"));

    let timeout = Duration::from_secs(args.timeout);
    let result = run(&call, &args.display_name, timeout, Duration::from_secs(args.hold)).await;
    call.close().await;
    result
}

async fn run(call: &Call, display_name: &str, timeout: Duration, hold: Duration) -> Result<()> {
    let (call_id, answer) = call
        .start(Sdp::offer("dummy-sdp"), display_name, timeout)
        .await
        .context("call failed")?;
    info!("Call with id {call_id} and sdp {}", answer.sdp);

    tokio::select! {
        _ = tokio::time::sleep(hold) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    info!("Terminating call");
    if let Err(e) = call.terminate(timeout).await {
        warn!("Termination failed: {e}");
    }
    Ok(())
}
