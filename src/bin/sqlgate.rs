use sqlgate::config::{default_config_path, load_config};
use sqlgate::{Database, QueryKind, SqlGateError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: sqlgate [--config <path>] <select|insert|update|delete> <sql>";

/// Parsed command line
#[derive(Debug, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    kind: QueryKind,
    sql: String,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut config = None;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().ok_or("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            _ => positional.push(arg.clone()),
        }
    }

    match positional.as_slice() {
        [kind, sql] => {
            let kind = QueryKind::from_name(kind).ok_or_else(|| format!("unknown query kind '{}'", kind))?;
            Ok(Args {
                config,
                kind,
                sql: sql.clone(),
            })
        }
        _ => Err(USAGE.to_string()),
    }
}

fn run(args: Args) -> sqlgate::Result<String> {
    let path = args
        .config
        .or_else(default_config_path)
        .ok_or_else(|| SqlGateError::Configuration("no config path given and no config directory".to_string()))?;
    info!("Loading config from: {}", path.display());
    let config = load_config(&path)?;

    let mut db = Database::open(&config.database)?;
    let json = match args.kind {
        QueryKind::Select => serde_json::to_string_pretty(&db.select(&args.sql)?),
        QueryKind::Insert => serde_json::to_string_pretty(&db.insert(&args.sql)?),
        QueryKind::Update => serde_json::to_string_pretty(&db.update(&args.sql)?),
        QueryKind::Delete => serde_json::to_string_pretty(&db.delete(&args.sql)?),
    };
    json.map_err(|e| SqlGateError::Configuration(format!("cannot render result: {}", e)))
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("sqlgate: {}", e);
            ExitCode::FAILURE
        }
    }
}
