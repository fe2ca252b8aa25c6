use std::{
    env,
    path::PathBuf,
    process,
    sync::{Arc, OnceLock},
};

use switchbee::{
    config::{features::Feature, Config},
    core::{
        collectors::registry::CollectorRegistry,
        dialect::DialectRegistry,
        executor::{Device, ScrapeExecutor},
        transport::{ReplayTransport, Transport},
    },
    logger::LoggerManager,
    print_error, print_info,
};
use tracing::{debug, error, info, warn};

/// Directory with one capture sub-directory per host.
const REPLAY_ENV: &str = "SWITCHBEE_REPLAY_DIR";
/// Comma separated host list replacing the configured devices.
const HOSTS_ENV: &str = "SWITCHBEE_HOSTS";

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let mut cfg = Config::new().unwrap_or_else(|e| {
            print_error!("{}", e);
            process::exit(1);
        });
        if let Ok(hosts) = env::var(HOSTS_ENV) {
            print_info!("Using hosts from {}: {}", HOSTS_ENV, hosts);
            cfg.set_hosts(&hosts);
        }
        cfg
    })
}

fn log_features_table(cfg: &Config) {
    let host_width = cfg
        .hosts()
        .map(str::len)
        .max()
        .unwrap_or(10)
        .max("Device".len());

    let header = Feature::ALL
        .iter()
        .map(|f| format!("{:<11}", f.as_str()))
        .collect::<Vec<_>>()
        .join(" | ");
    info!("{:<width$} | {}", "Device", header, width = host_width);
    info!("{}-+-{}", "-".repeat(host_width), "-".repeat(header.len()));

    for host in cfg.hosts() {
        let features = cfg.effective_features(host);
        let row = Feature::ALL
            .iter()
            .map(|f| {
                let status = if features.is_enabled(*f) { "ENABLED" } else { "DISABLED" };
                format!("{:<11}", status)
            })
            .collect::<Vec<_>>()
            .join(" | ");
        info!("{:<width$} | {}", host, row, width = host_width);
    }
}

async fn replay_devices(cfg: &Config, root: PathBuf) -> Vec<Device> {
    let mut devices = Vec::new();
    for host in cfg.hosts() {
        let settings = cfg.connection_settings(host);
        debug!(
            "{}: user '{}', timeout {:?}, legacy ciphers {}",
            settings.host, settings.username, settings.timeout, settings.legacy_ciphers
        );

        let dir = root.join(host);
        match ReplayTransport::open(&dir).await {
            Ok(transport) => {
                info!("{}: replaying {} captures from {}", host, transport.os_type(), dir.display());
                devices.push(Device::new(host, Arc::new(transport)));
            }
            Err(e) => warn!("{}: skipped, cannot open {}: {}", host, dir.display(), e),
        }
    }
    devices
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config();
    let logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting switchbee version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);
    debug!("{:#?}", cfg.features);

    log_features_table(cfg);

    let dialects = Arc::new(DialectRegistry::with_builtin_parsers());
    debug!("{:?}", dialects);
    let registry = Arc::new(CollectorRegistry::with_builtin_collectors(&cfg.namespace, dialects));
    info!("Collectors: {}", registry.list().join(", "));

    let Some(root) = env::var_os(REPLAY_ENV).map(PathBuf::from) else {
        error!("No device sessions available: set {} to a capture directory", REPLAY_ENV);
        process::exit(1);
    };

    let devices = replay_devices(cfg, root).await;
    if devices.is_empty() {
        warn!("No devices to scrape");
        return Ok(());
    }

    let executor = ScrapeExecutor::new(Arc::new(cfg.clone()), registry);

    tokio::select! {
        events = executor.scrape(devices) => {
            for event in &events {
                println!("{}", serde_json::to_string(event)?);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, scrape abandoned");
        }
    }
    Ok(())
}
