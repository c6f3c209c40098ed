use clap::Parser;
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;
use std::env;
use time::{format_description::well_known::Iso8601, OffsetDateTime};
use weatherapp_core::{
    find_config_file, get_xdg_data_dir, load_config, ConfigSource, DEFAULT_SERVER_PORT,
};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Weather archive - browse stored daily observations and generate synthetic history"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $WEATHERAPP_CONFIG, ./weatherapp.toml,
    /// $XDG_CONFIG_HOME/weatherapp/weatherapp.toml, /etc/weatherapp/weatherapp.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "WEATHERAPP_LEVEL")]
    pub level: Option<String>,

    /// Host to listen on (use 0.0.0.0 for all interfaces)
    #[arg(long, env = "WEATHERAPP_HOST")]
    #[serde(alias = "domain")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "WEATHERAPP_PORT")]
    pub port: Option<u16>,

    /// Directory holding the SQLite database
    #[arg(short, long, env = "WEATHERAPP_DATA_DIR")]
    pub data_dir: Option<String>,

    /// TOML file replacing the built-in monthly generation bounds
    #[arg(short, long, env = "WEATHERAPP_SEASONAL_RANGES")]
    pub seasonal_ranges: Option<String>,

    /// Fixed seed for the weather generator, makes a run reproducible
    #[arg(long, env = "WEATHERAPP_RNG_SEED")]
    pub rng_seed: Option<u64>,
}

impl Cli {
    pub fn host(&self) -> String {
        self.host.clone().unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn data_dir(&self) -> String {
        self.data_dir
            .clone()
            .unwrap_or_else(|| get_xdg_data_dir().display().to_string())
    }

    /// Merge of two sources where values in `self` win
    fn or(self, other: Cli) -> Cli {
        Cli {
            config: self.config.or(other.config),
            level: self.level.or(other.level),
            host: self.host.or(other.host),
            port: self.port.or(other.port),
            data_dir: self.data_dir.or(other.data_dir),
            seasonal_ranges: self.seasonal_ranges.or(other.seasonal_ranges),
            rng_seed: self.rng_seed.or(other.rng_seed),
        }
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> anyhow::Result<Cli> {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("WEATHERAPP_CONFIG", "weatherapp.toml")
    };

    let file_config: Cli = load_config(&source)?;

    // CLI args override file config (env vars are handled by clap)
    Ok(cli_args.or(file_config))
}

pub fn get_log_level(cli: &Cli) -> LevelFilter {
    let level_str = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logger() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = OffsetDateTime::now_utc()
                .format(&Iso8601::DEFAULT)
                .unwrap_or_default();
            out.finish(format_args!(
                "[{} {}] {}: {}",
                now,
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout())
}
