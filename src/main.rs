use base64::Engine;
use clap::Parser;
use kafka_avro_serde::avro::{self, framing};
use kafka_avro_serde::config::keys;
use kafka_avro_serde::registry;
use kafka_avro_serde::{Error, Result, SerdeConfig};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "kafka-avro-inspect")]
#[command(about = "Decode a schema registry framed Avro message", long_about = None)]
struct Args {
    /// Message file, or `-` for stdin
    #[arg(value_name = "MESSAGE", default_value = "-")]
    input: PathBuf,

    #[arg(short, long, value_name = "FILE", help = "Serde configuration file")]
    config: Option<PathBuf>,

    #[arg(short, long, value_name = "URL", help = "Schema registry URL, overrides the config file")]
    registry_url: Option<String>,

    #[arg(short, long, help = "Input is base64 encoded")]
    base64: bool,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    let config = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    info!(registry = %config.schema_registry_url, "Using schema registry");

    let message = read_message(&args).await?;
    let frame = framing::decode_frame(&message)?;
    debug!(
        schema_id = frame.schema_id,
        payload_len = frame.payload.len(),
        "Read framed message"
    );

    let client = registry::client_for_config(&config)?;
    let schema = client.get_by_id(frame.schema_id).await?;
    let value = avro::record::decode_datum(&schema, frame.payload)?;
    let json = serde_json::Value::try_from(value).map_err(|e| Error::Decoding(e.to_string()))?;

    let output = serde_json::json!({
        "schema_id": frame.schema_id,
        "schema": serde_json::to_value(&schema)?,
        "value": json,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn load_config(args: &Args) -> Result<SerdeConfig> {
    match (&args.config, &args.registry_url) {
        (Some(path), url) => {
            info!("Loading configuration from {:?}", path);
            let mut config = SerdeConfig::from_file(path)?;
            if let Some(url) = url {
                config.schema_registry_url = url.clone();
                config.validate()?;
            }
            Ok(config)
        }
        (None, Some(url)) => SerdeConfig::from_properties([(keys::SCHEMA_REGISTRY_URL, url)]),
        (None, None) => Err(Error::Config(
            "either --config or --registry-url is required".to_string(),
        )),
    }
}

async fn read_message(args: &Args) -> Result<Vec<u8>> {
    let raw = if args.input.as_os_str() == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        buf
    } else {
        tokio::fs::read(&args.input).await?
    };

    if !args.base64 {
        return Ok(raw);
    }

    let text = String::from_utf8_lossy(&raw);
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| Error::Framing(format!("invalid base64 input: {}", e)))
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("kafka_avro_serde=debug,kafka_avro_inspect=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kafka_avro_serde=info,kafka_avro_inspect=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
