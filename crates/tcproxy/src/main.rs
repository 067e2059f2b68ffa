//! A TCP proxy that forwards every connection it accepts to one fixed
//! upstream server.
//!
//! Traffic can optionally be obfuscated with a shared key.  Two proxies
//! run back-to-back with the same key cancel each other out:
//!
//! ```text
//! client -> tcproxy 127.0.0.1 1080 relay.example 9000 KEY
//!        -> tcproxy 0.0.0.0 9000 server.example 80 KEY -> server
//! ```

#![warn(missing_docs)]

mod exit;

use std::net::{IpAddr, SocketAddr};

use tcproxy::config::{self, ProxyConfig};
use tcproxy::{run_proxy, CipherConfig, CipherKind, Error, Upstream};

use anyhow::{Context, Result};
use argh::FromArgs;
use futures::future::FutureExt;
use tracing::{info, Level};

#[derive(FromArgs, Debug, Clone)]
/// Accept TCP connections on a local address and relay each one to a
/// fixed upstream server, optionally obfuscating the traffic.
struct Args {
    /// load configuration from this file (may be repeated)
    #[argh(option, short = 'f')]
    rc: Vec<String>,
    /// which cipher to use when a key is given (rc4 or xor)
    #[argh(option)]
    cipher: Option<CipherKind>,
    /// log at trace level
    #[argh(switch)]
    trace: bool,
    /// local IP address to listen on
    #[argh(positional)]
    local_host: String,
    /// local port to listen on
    #[argh(positional)]
    local_port: u16,
    /// host name or address of the upstream server
    #[argh(positional)]
    forward_host: String,
    /// port of the upstream server
    #[argh(positional)]
    forward_port: u16,
    /// obfuscation key; no obfuscation if omitted or empty
    #[argh(positional)]
    key: Option<String>,
}

impl Args {
    /// Return the configuration options set by our flags, as
    /// `(key, value)` pairs.
    fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(cipher) = self.cipher {
            overrides.push(("cipher", cipher.to_string()));
        }
        if self.trace {
            overrides.push(("trace", "true".to_string()));
        }
        overrides
    }
}

/// Install a subscriber that logs to stderr.
fn setup_logging(config: &ProxyConfig) {
    let level = if config.trace() {
        Level::TRACE
    } else {
        Level::DEBUG
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let config = config::load(&args.rc, &args.overrides()).context("Unable to load configuration")?;
    setup_logging(&config);

    let ip: IpAddr = args
        .local_host
        .parse()
        .map_err(|_| Error::BadAddress(args.local_host.clone()))?;
    let listen = SocketAddr::new(ip, args.local_port);
    let upstream = Upstream::new(args.forward_host.as_str(), args.forward_port);
    let ciphers = CipherConfig::from_key_str(config.cipher(), args.key.as_deref().unwrap_or(""));
    let on_error = config.accept_error_policy();

    let runtime = tcproxy_rtcompat::create_runtime().context("Unable to start runtime")?;
    let handle = runtime.handle();
    runtime.block_on(async {
        let proxy = run_proxy(handle, listen, upstream, ciphers, on_error).fuse();
        let ctrl_c = exit::wait_for_ctrl_c().fuse();
        futures::pin_mut!(proxy, ctrl_c);
        futures::select!(
            r = proxy => r.context("Proxy failure")?,
            r = ctrl_c => {
                r.context("Unable to wait for termination signal")?;
                info!("Received a ctrl-c; exiting.");
            }
        );
        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}
