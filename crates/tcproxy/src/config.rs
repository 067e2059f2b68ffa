//! Configuration for the proxy, from files and the command line.
//!
//! Options are layered using the `config` crate: first the built-in
//! defaults in `tcproxy_defaults.toml`, then every file given on the
//! command line in order, then the individual options set by flags.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{AcceptErrorPolicy, CipherKind};

/// Default options to use for our configuration.
pub const PROXY_DEFAULTS: &str = include_str!("./tcproxy_defaults.toml");

/// Which [`AcceptErrorPolicy`] to use, as named in a configuration file.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AcceptErrors {
    /// See [`AcceptErrorPolicy::Stop`].
    Stop,
    /// See [`AcceptErrorPolicy::Retry`].
    Retry,
}

/// Structure to hold our configuration options, whether from a
/// configuration file or the command line.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Whether to log at trace level.
    trace: bool,
    /// Which keyed cipher to use.  Ignored when there's no key.
    cipher: CipherKind,
    /// What to do when accepting a connection fails.
    accept_errors: AcceptErrors,
    /// How long to wait before accepting again, under the retry policy.
    #[serde(with = "humantime_serde")]
    accept_retry_delay: Duration,
}

impl ProxyConfig {
    /// Return true if we should log at trace level.
    pub fn trace(&self) -> bool {
        self.trace
    }

    /// Return the kind of cipher to use when a key is given.
    pub fn cipher(&self) -> CipherKind {
        self.cipher
    }

    /// Return the policy an acceptor should follow when `accept()` fails.
    pub fn accept_error_policy(&self) -> AcceptErrorPolicy {
        match self.accept_errors {
            AcceptErrors::Stop => AcceptErrorPolicy::Stop,
            AcceptErrors::Retry => AcceptErrorPolicy::Retry {
                delay: self.accept_retry_delay,
            },
        }
    }
}

/// Return a `config::Config` holding only our defaults.
fn defaults() -> Result<config::Config, config::ConfigError> {
    let mut cfg = config::Config::new();
    cfg.merge(config::File::from_str(
        PROXY_DEFAULTS,
        config::FileFormat::Toml,
    ))?;
    Ok(cfg)
}

/// Load our configuration from the defaults, then every toml file in
/// `files`, then each `(key, value)` pair in `overrides`.
///
/// Every file in `files` must exist.
pub fn load<P: AsRef<Path>>(
    files: &[P],
    overrides: &[(&str, String)],
) -> Result<ProxyConfig, config::ConfigError> {
    let mut cfg = defaults()?;
    for p in files {
        let f: config::File<_> = p.as_ref().into();
        cfg.merge(f.format(config::FileFormat::Toml).required(true))?;
    }
    for (key, value) in overrides {
        cfg.set(key, value.as_str())?;
    }
    cfg.try_into()
}

#[cfg(test)]
mod test {
    use super::*;

    /// Parse `extra` on top of the defaults.
    fn with_toml(extra: &str) -> Result<ProxyConfig, config::ConfigError> {
        let mut cfg = defaults()?;
        cfg.merge(config::File::from_str(extra, config::FileFormat::Toml))?;
        cfg.try_into()
    }

    #[test]
    fn load_default_config() {
        let no_files: &[&str] = &[];
        let cfg = load(no_files, &[]).unwrap();
        assert!(!cfg.trace());
        assert_eq!(cfg.cipher(), CipherKind::Rc4);
        assert_eq!(cfg.accept_error_policy(), AcceptErrorPolicy::Stop);
    }

    #[test]
    fn overrides() {
        let no_files: &[&str] = &[];
        let cfg = load(
            no_files,
            &[("cipher", "xor".to_string()), ("trace", "true".to_string())],
        )
        .unwrap();
        assert!(cfg.trace());
        assert_eq!(cfg.cipher(), CipherKind::Xor);
        assert_eq!(cfg.accept_error_policy(), AcceptErrorPolicy::Stop);
    }

    #[test]
    fn retry_policy() {
        let cfg = with_toml(
            r#"
            accept_errors = "retry"
            accept_retry_delay = "250 ms"
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.accept_error_policy(),
            AcceptErrorPolicy::Retry {
                delay: Duration::from_millis(250)
            }
        );
    }

    #[test]
    fn bad_values() {
        assert!(with_toml("cipher = \"aes\"").is_err());
        assert!(with_toml("accept_errors = \"sometimes\"").is_err());
        assert!(with_toml("socks_port = 9150").is_err());
    }

    #[test]
    fn missing_file() {
        let no_overrides: &[(&str, String)] = &[];
        assert!(load(&["/nonexistent/tcproxy.toml"], no_overrides).is_err());
    }
}
