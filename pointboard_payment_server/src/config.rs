use std::{env, net::IpAddr};

use chrono::Duration;
use log::*;
use pbg_common::parse_boolean_flag;
use pointboard_payment_engine::helpers::DEFAULT_MEMO_PREFIX;

const DEFAULT_PBG_HOST: &str = "127.0.0.1";
const DEFAULT_PBG_PORT: u16 = 4780;
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::hours(3);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// The literal prefix customers put in front of the order reference in their transfer memo.
    pub memo_prefix: String,
    /// The time before an unpaid QR-transfer order is marked as failed.
    pub unpaid_order_timeout: Duration,
    /// SePay webhook source authentication
    pub sepay: SePayConfig,
    /// The merchant bank account encoded into payment QR codes
    pub bank: BankConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PBG_HOST.to_string(),
            port: DEFAULT_PBG_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            memo_prefix: DEFAULT_MEMO_PREFIX.to_string(),
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            sepay: SePayConfig::default(),
            bank: BankConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PBG_HOST").ok().unwrap_or_else(|| DEFAULT_PBG_HOST.into());
        let port = env::var("PBG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PBG_PORT. {e} Using the default, {DEFAULT_PBG_PORT}, instead."
                    );
                    DEFAULT_PBG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PBG_PORT);
        let database_url = env::var("PBG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ PBG_DATABASE_URL is not set. Please set it to the URL for the PBG database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("PBG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("PBG_USE_FORWARDED").ok(), false);
        let memo_prefix = env::var("PBG_MEMO_PREFIX").ok().unwrap_or_else(|| {
            info!("🪛️ PBG_MEMO_PREFIX is not set. Using the default, {DEFAULT_MEMO_PREFIX}.");
            DEFAULT_MEMO_PREFIX.to_string()
        });
        let unpaid_order_timeout = configure_order_timeout();
        let sepay = SePayConfig::from_env_or_defaults();
        let bank = BankConfig::from_env_or_defaults();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            memo_prefix,
            unpaid_order_timeout,
            sepay,
            bank,
        }
    }
}

fn configure_order_timeout() -> Duration {
    env::var("PBG_UNPAID_ORDER_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ PBG_UNPAID_ORDER_TIMEOUT is not set. Using the default value of {} hrs.",
                DEFAULT_UNPAID_ORDER_TIMEOUT.num_hours()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::hours)
                .map_err(|e| warn!("🪛️ Invalid configuration value for PBG_UNPAID_ORDER_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_UNPAID_ORDER_TIMEOUT)
}

//-------------------------------------------------  SePayConfig  ------------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct SePayConfig {
    /// If supplied, webhook calls are only accepted from these addresses. To explicitly disable the whitelist, set
    /// PBG_SEPAY_IP_WHITELIST to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
    /// Development override: accept webhook calls from any source. **DANGER**
    pub skip_ip_check: bool,
}

impl SePayConfig {
    pub fn from_env_or_defaults() -> Self {
        let whitelist = env::var("PBG_SEPAY_IP_WHITELIST").ok().and_then(|s| {
            if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
                info!(
                    "🪛️ SePay IP whitelist is disabled. If this is not what you want, set PBG_SEPAY_IP_WHITELIST to \
                     a comma-separated list of IP addresses to enable it."
                );
                return None;
            }
            let ip_addrs = s
                .split(',')
                .filter_map(|s| {
                    s.trim()
                        .parse()
                        .map_err(|e| {
                            warn!("🪛️ Ignoring invalid IP address ({s}) in PBG_SEPAY_IP_WHITELIST: {e}");
                            None::<IpAddr>
                        })
                        .ok()
                })
                .collect::<Vec<IpAddr>>();
            Some(ip_addrs)
        });
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The SePay IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming webhook calls."
                );
            },
            None => {
                info!("🪛️ No SePay IP whitelist is set. All webhook sources will be accepted.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ SePay IP whitelist: {addrs}");
            },
        }
        let skip_ip_check = parse_boolean_flag(env::var("PBG_SEPAY_SKIP_IP_CHECK").ok(), false);
        if skip_ip_check {
            warn!("🚨️ PBG_SEPAY_SKIP_IP_CHECK is set. Webhook source authentication is DISABLED. Do not run \
                   production like this.");
        }
        Self { whitelist, skip_ip_check }
    }

    /// The source authentication decision for a webhook call from `ip`.
    pub fn authorizes(&self, ip: Option<IpAddr>) -> bool {
        if self.skip_ip_check {
            return true;
        }
        match (&self.whitelist, ip) {
            (None, _) => true,
            (Some(whitelist), Some(ip)) => whitelist.contains(&ip),
            (Some(_), None) => false,
        }
    }
}

//-------------------------------------------------  BankConfig  -------------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct BankConfig {
    /// The merchant account number customers transfer into
    pub account: String,
    /// The bank's short code, e.g. "MBBank"
    pub code: String,
}

impl BankConfig {
    pub fn from_env_or_defaults() -> Self {
        let account = env::var("PBG_BANK_ACCOUNT").ok().unwrap_or_else(|| {
            error!("🪛️ PBG_BANK_ACCOUNT is not set. Payment QR codes will not point at a real account.");
            String::default()
        });
        let code = env::var("PBG_BANK_CODE").ok().unwrap_or_else(|| {
            error!("🪛️ PBG_BANK_CODE is not set. Payment QR codes will not point at a real bank.");
            String::default()
        });
        Self { account, code }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep
/// this as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
