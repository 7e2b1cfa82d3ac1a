use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use kafka_output_api::OutputPlugin;
use kafka_output_engine::{EngineError, OutputConfig, OutputFormat, config};

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("broker not ready")]
    Init,

    #[error("{failed} of {total} batches failed")]
    Flush { failed: usize, total: usize },
}

#[derive(Parser)]
#[command(name = "kafka-output-replay", about = "Replay recorded Fluent Bit batches into Kafka")]
struct Cli {
    /// JSON configuration file. When set, the flags below are ignored.
    #[arg(long, env = "KAFKA_CONFIG")]
    config: Option<PathBuf>,

    /// Bootstrap brokers, host:port.
    #[arg(long, env = "KAFKA_BROKERS", value_delimiter = ',', default_value = config::DEFAULT_BROKER)]
    brokers: Vec<String>,

    #[arg(long, env = "KAFKA_TOPIC", default_value = config::DEFAULT_TOPIC)]
    topic: String,

    /// structured, compact-binary.
    #[arg(long, env = "KAFKA_FORMAT", default_value = "structured")]
    format: OutputFormat,

    /// Startup connection window in seconds, 0 for the default.
    #[arg(long, env = "KAFKA_CONNECT_TIMEOUT_SECS", default_value_t = 0)]
    connect_timeout_secs: u64,

    #[arg(long, env = "KAFKA_RETRY_INTERVAL_SECS", default_value_t = config::DEFAULT_RETRY_INTERVAL_SECS)]
    retry_interval_secs: u64,

    #[arg(long, env = "KAFKA_PUBLISH_TIMEOUT_MS", default_value_t = config::DEFAULT_PUBLISH_TIMEOUT_MS)]
    publish_timeout_ms: u64,

    /// Do not reconnect after a failed publish.
    #[arg(long)]
    no_reconnect: bool,

    /// Files holding one raw MessagePack batch each.
    #[arg(required = true)]
    batches: Vec<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<OutputConfig, ReplayError> {
        match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|source| ReplayError::Read { path: path.clone(), source })?;
                Ok(OutputConfig::from_json(&json).map_err(|e| e.with_context(path.display()))?)
            }
            None => Ok(self.output_config()),
        }
    }

    fn output_config(&self) -> OutputConfig {
        OutputConfig {
            brokers: self.brokers.clone(),
            topic: self.topic.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
            retry_interval_secs: self.retry_interval_secs,
            format: self.format,
            reconnect_on_failure: !self.no_reconnect,
            publish_timeout_ms: self.publish_timeout_ms,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "replay failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ReplayError> {
    let output = out_kafka::build(cli.load_config()?)?;
    if !output.init().is_ok() {
        return Err(ReplayError::Init);
    }

    let mut failed = 0;
    for path in &cli.batches {
        let data = std::fs::read(path).map_err(|source| ReplayError::Read { path: path.clone(), source })?;
        let tag = tag_for(path);
        tracing::info!(tag = %tag, bytes = data.len(), "replaying batch");
        if !output.flush(&data, &tag).is_ok() {
            failed += 1;
        }
    }
    output.exit();

    if failed > 0 {
        return Err(ReplayError::Flush { failed, total: cli.batches.len() });
    }
    Ok(())
}

fn tag_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_output_config() {
        let cli = Cli::try_parse_from([
            "kafka-output-replay",
            "--brokers",
            "a:9092,b:9092",
            "--format",
            "compact-binary",
            "--no-reconnect",
            "batch.msgpack",
        ])
        .unwrap();
        let config = cli.output_config();
        assert_eq!(config.brokers, vec!["a:9092", "b:9092"]);
        assert_eq!(config.format, OutputFormat::CompactBinary);
        assert!(!config.reconnect_on_failure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_file_replaces_flags() {
        let path = std::env::temp_dir().join(format!("kafka-output-replay-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"brokers": ["cfg:9092"], "topic": "from_file"}"#).unwrap();

        let cli = Cli::try_parse_from([
            "kafka-output-replay",
            "--config",
            path.to_str().unwrap(),
            "--topic",
            "from_flag",
            "batch.msgpack",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.brokers, vec!["cfg:9092"]);
        assert_eq!(config.topic, "from_file");
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        let cli = Cli::try_parse_from([
            "kafka-output-replay",
            "--config",
            "/nonexistent/kafka-output.json",
            "batch.msgpack",
        ])
        .unwrap();
        assert!(matches!(cli.load_config(), Err(ReplayError::Read { .. })));
    }

    #[test]
    fn tag_is_file_name() {
        assert_eq!(tag_for(Path::new("/var/spool/app.logs")), "app.logs");
    }
}
