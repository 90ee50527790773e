/// CollView Inspector
///
/// Loads a JSON document and prints it as a collection table: title,
/// headers and one line per row. Filtering, searching and sorting go
/// through the same adapter and proxy an embedding viewer would use.

use clap::Parser;
use collview::{AdapterOptions, CollectionAdapter, FilterProxy, Loopback, Namespace, RemoteProvider, SortDirection, Value};
use std::cell::RefCell;
use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser, Debug)]
#[command(name = "collview-inspect", about = "Print a JSON document as a collection table")]
struct Cli {
    /// JSON file to inspect; reads stdin when omitted
    path: Option<PathBuf>,

    /// Adapter options as JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override one option, e.g. `--set page_size=20`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,

    /// Browse a top-level object through the remote protocol
    #[arg(long)]
    remote: bool,

    /// Only show rows whose name or type contains TEXT
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,

    /// Rank rows by how well their name matches TEXT
    #[arg(long, value_name = "TEXT", conflicts_with = "filter")]
    find: Option<String>,

    /// Column to sort by
    #[arg(long)]
    sort: Option<usize>,

    /// Sort direction
    #[arg(long, default_value = "ascending")]
    direction: String,

    /// Load every page before printing
    #[arg(long)]
    all: bool,
}

fn read_document(path: Option<&PathBuf>) -> collview::Result<Value> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    let json: serde_json::Value = serde_json::from_str(&text)?;
    Ok(Value::from(json))
}

fn build_adapter(value: Value, options: AdapterOptions) -> collview::Result<CollectionAdapter> {
    if options.remote {
        let Value::Dict(values) = value else {
            return Err(collview::Error::Config {
                message: "--remote needs a JSON object at the top level".to_string(),
            });
        };
        let channel = Loopback::new(Namespace::new(values).with_minmax(options.show_minmax));
        return CollectionAdapter::new(Box::new(RemoteProvider::new(channel)), options);
    }
    CollectionAdapter::from_value(value, options)
}

fn run(cli: Cli) -> collview::Result<()> {
    let mut options = match &cli.config {
        Some(path) => AdapterOptions::from_file(path)?,
        None => AdapterOptions::default(),
    };
    for pair in &cli.overrides {
        options.set_pair(pair)?;
    }
    if cli.remote {
        options.remote = true;
    }
    let direction = SortDirection::from_str(&cli.direction).ok_or_else(|| collview::Error::Config {
        message: format!("Unknown direction: '{}'. Use 'ascending' or 'descending'", cli.direction),
    })?;

    let value = read_document(cli.path.as_ref())?;
    let mut adapter = build_adapter(value, options)?;
    if cli.all {
        adapter.load_all()?;
    }
    log::info!("{}: {} of {} rows loaded", adapter.title(), adapter.row_count(), adapter.total_row_count());

    let adapter = Rc::new(RefCell::new(adapter));
    let mut proxy = FilterProxy::new(Rc::clone(&adapter));
    if let Some(text) = &cli.filter {
        proxy.set_filter(text)?;
    }
    if let Some(text) = &cli.find {
        proxy.find(text)?;
    }
    if let Some(column) = cli.sort {
        proxy.sort(column, direction)?;
    }

    let source = adapter.borrow();
    println!("{}", source.title());
    println!("{}", source.headers().join("\t"));
    for row in 0..proxy.row_count() {
        let Some(source_row) = proxy.map_to_source(row) else {
            continue;
        };
        let cells: Vec<String> = (0..source.column_count())
            .map(|column| {
                source
                    .display(source_row, column)
                    .map(|text| text.replace('\n', " "))
                    .unwrap_or_default()
            })
            .collect();
        let category = source.category(source_row).map(|c| format!("{:?}", c)).unwrap_or_default();
        println!("{}\t[{}]", cells.join("\t"), category);
    }
    if source.can_fetch_more() {
        println!("... {} more rows (use --all)", source.total_row_count() - source.row_count());
    }
    Ok(())
}

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
