use clap::Parser;
use reqfilter::filter::Explain;
use reqfilter::{records, EntityConfig, FilterSpec, FilterTree};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "reqfilter",
    about = "Compile request filter parameters and apply them to YAML/JSON records"
)]
struct Cli {
    #[arg(
        long,
        env = "REQFILTER_CONFIG",
        help = "Entity config listing filterable fields and relations"
    )]
    config: Option<PathBuf>,

    #[arg(long, env = "REQFILTER_RECORDS", help = "Record file or directory to filter")]
    records: Option<PathBuf>,

    #[arg(long, help = "Request document (YAML or JSON), stdin when omitted or '-'")]
    request: Option<PathBuf>,

    #[arg(long = "field", help = "Allow filtering on this field")]
    fields: Vec<String>,

    #[arg(long = "relation", help = "Allow filtering through this relation")]
    relations: Vec<String>,

    #[arg(long, help = "Request key holding the AND filters")]
    filter_key: Option<String>,

    #[arg(long, help = "Request key holding the OR filters")]
    filter_any_key: Option<String>,

    #[arg(long, conflicts_with = "explain", help = "Print the compiled predicate tree as YAML")]
    tree: bool,

    #[arg(long, help = "Print the query builder calls for the compiled filter")]
    explain: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let mut config = match cli.config.as_deref().map(EntityConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    for field in cli.fields {
        config.allow.allow_field(field);
    }
    for relation in cli.relations {
        config.allow.allow_relation(relation);
    }
    if let Some(key) = cli.filter_key {
        config.keys.all = key;
    }
    if let Some(key) = cli.filter_any_key {
        config.keys.any = key;
    }

    let request = match records::read_document(cli.request.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let spec = FilterSpec::from_request(&request, &config.keys);
    let tree = config.compiler().compile(&spec);
    debug!(%tree, "compiled filter");

    if cli.tree {
        return run_tree_mode(&tree);
    }
    if cli.explain {
        return run_explain_mode(&tree);
    }

    let Some(records_path) = cli.records else {
        eprintln!("Error: No records specified. Use --records or set REQFILTER_RECORDS");
        return ExitCode::from(2);
    };

    run_filter_mode(&tree, &records_path)
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("REQFILTER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_tree_mode(tree: &FilterTree) -> ExitCode {
    match serde_yaml::to_string(tree) {
        Ok(yaml) => {
            print!("{}", yaml);
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run_explain_mode(tree: &FilterTree) -> ExitCode {
    let mut plan = Explain::new();
    tree.apply(&mut plan).unwrap_or_else(|never| match never {});
    for line in plan.lines() {
        println!("{}", line);
    }
    ExitCode::from(0)
}

fn run_filter_mode(tree: &FilterTree, records_path: &Path) -> ExitCode {
    let records = records::load_records(records_path);
    let matches: Vec<&serde_yaml::Value> = records
        .iter()
        .filter(|record| tree.matches(&record.value))
        .map(|record| &record.value)
        .collect();

    if matches.is_empty() {
        return ExitCode::from(1);
    }

    match serde_yaml::to_string(&matches) {
        Ok(yaml) => {
            print!("{}", yaml);
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}
