use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use url::Url;

use oax_core::config::{self, CONFIG_FILE_NAME};
use oax_core::{BodyObject, ClientConfig, Document, Exchange, RequestConfig, parse};

#[derive(Parser)]
#[command(name = "oax", about = "Run OpenAPI v2/v3 operations from their description", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the operations of a document
    Operations {
        #[command(flatten)]
        document: DocumentArgs,

        /// Only list operations with this tag
        #[arg(long)]
        tag: Option<String>,

        /// Output format
        #[arg(long, default_value = "table")]
        format: ListFormat,
    },

    /// Run an operation and print the response body
    Call {
        #[command(flatten)]
        document: DocumentArgs,

        #[command(flatten)]
        request: RequestArgs,

        /// Print the status line and response headers before the body
        #[arg(short = 'I', long)]
        include: bool,
    },

    /// Run an operation and follow `Link: rel="next"` headers, printing every page
    Pages {
        #[command(flatten)]
        document: DocumentArgs,

        #[command(flatten)]
        request: RequestArgs,

        /// Keep following links after an error status
        #[arg(long)]
        keep_going: bool,
    },

    /// Check that a document loads and that its references resolve
    Validate {
        #[command(flatten)]
        document: DocumentArgs,
    },

    /// Initialize a new oax configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Args)]
struct DocumentArgs {
    /// Path to the description document (YAML or JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Other documents the input references with `$ref`
    #[arg(short = 'r', long = "ref-doc")]
    ref_docs: Vec<PathBuf>,

    /// Client configuration file
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,
}

#[derive(Args)]
struct RequestArgs {
    /// operationId of the operation to run
    operation_id: String,

    /// Parameter routed to its declared location, as name=value
    #[arg(short, long = "param", value_parser = parse_pair)]
    params: Vec<(String, String)>,

    /// Header, as name=value
    #[arg(short = 'H', long = "header", value_parser = parse_pair)]
    headers: Vec<(String, String)>,

    /// JSON request body
    #[arg(long, conflicts_with = "data")]
    json: Option<String>,

    /// Request body sent verbatim
    #[arg(long)]
    data: Option<String>,

    /// Request media type
    #[arg(long)]
    media_type: Option<String>,

    /// Base URL overriding the document's servers
    #[arg(long)]
    base_url: Option<String>,

    /// Index of the v3 server to use
    #[arg(long)]
    server: Option<usize>,

    /// Server variable, as name=value
    #[arg(long = "server-variable", value_parser = parse_pair)]
    server_variables: Vec<(String, String)>,
}

#[derive(Clone, ValueEnum)]
enum ListFormat {
    Table,
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Operations {
            document,
            tag,
            format,
        } => cmd_operations(&document, tag.as_deref(), format),

        Commands::Call {
            document,
            request,
            include,
        } => cmd_call(&document, &request, include),

        Commands::Pages {
            document,
            request,
            keep_going,
        } => cmd_pages(&document, &request, keep_going),

        Commands::Validate { document } => cmd_validate(&document),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "oax", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn parse_pair(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got {value:?}"))
}

fn try_load_config(path: &Path) -> Result<ClientConfig> {
    let config = config::load_config(path)?;
    if config.is_none() {
        log::debug!("no config at {}, using defaults", path.display());
    }
    Ok(config.unwrap_or_default())
}

fn file_uri(path: &Path) -> Result<String> {
    let absolute = fs::canonicalize(path)
        .with_context(|| format!("failed to resolve {}", path.display()))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| anyhow::anyhow!("cannot make a URI of {}", absolute.display()))
}

fn read_value(path: &Path) -> Result<serde_json::Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");

    let value = match ext {
        "json" => parse::from_json(&content)?,
        _ => parse::from_yaml(&content)?,
    };
    Ok(value)
}

/// Load the input document and register its referenced documents. The
/// referenced documents are returned so they stay resolvable.
fn load_documents(args: &DocumentArgs) -> Result<(Document, Vec<Document>)> {
    let config = try_load_config(&args.config)?;

    let mut referenced = Vec::new();
    for path in &args.ref_docs {
        let document = Document::builder(read_value(path)?)
            .uri(file_uri(path)?)
            .build()
            .with_context(|| format!("failed to load {}", path.display()))?;
        referenced.push(document);
    }

    let connection = oax_http::connection(&config)?;
    let document = Document::builder(read_value(&args.input)?)
        .uri(file_uri(&args.input)?)
        .config(config)
        .connection(connection)
        .build()
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    Ok((document, referenced))
}

fn request_config(args: &RequestArgs) -> Result<RequestConfig> {
    let mut config = RequestConfig::new();
    for (name, value) in &args.params {
        config = config.param(name, value);
    }
    for (name, value) in &args.headers {
        config = config.header(name, value);
    }
    for (name, value) in &args.server_variables {
        config = config.server_variable(name, value);
    }
    if let Some(json) = &args.json {
        let body = serde_json::from_str(json).context("--json is not valid JSON")?;
        config = config.body_object(body);
    }
    if let Some(data) = &args.data {
        config = config.raw_body(data);
    }
    if let Some(media_type) = &args.media_type {
        config = config.media_type(media_type);
    }
    if let Some(base_url) = &args.base_url {
        config = config.base_url(base_url);
    }
    if let Some(server) = args.server {
        config = config.server(server);
    }
    Ok(config)
}

fn print_body(body: &BodyObject) -> Result<()> {
    match body {
        BodyObject::Text(text) => println!("{text}"),
        BodyObject::Null => {}
        other => println!("{}", serde_json::to_string_pretty(&other.to_json())?),
    }
    Ok(())
}

fn print_head(exchange: &Exchange) {
    let response = exchange.response();
    println!("HTTP {}", response.status);
    for (name, value) in &response.headers {
        println!("{name}: {value}");
    }
    println!();
}

fn cmd_operations(args: &DocumentArgs, tag: Option<&str>, format: ListFormat) -> Result<()> {
    let (document, _referenced) = load_documents(args)?;
    let operations = match tag {
        Some(tag) => document.operations_tagged(tag)?,
        None => document.operations()?,
    };

    match format {
        ListFormat::Table => {
            for op in &operations {
                println!(
                    "{:<7} {:<40} {}",
                    op.http_method().as_str(),
                    op.path_template(),
                    op.human_id()
                );
            }
        }
        ListFormat::Yaml | ListFormat::Json => {
            let summary: Vec<serde_json::Value> = operations
                .iter()
                .map(|op| {
                    serde_json::json!({
                        "operation_id": op.operation_id(),
                        "method": op.http_method().as_str(),
                        "path": op.path_template(),
                        "summary": op.summary(),
                        "tags": op.tags(),
                    })
                })
                .collect();
            match format {
                ListFormat::Yaml => print!("{}", serde_yaml_ng::to_string(&summary)?),
                _ => println!("{}", serde_json::to_string_pretty(&summary)?),
            }
        }
    }
    Ok(())
}

fn cmd_call(args: &DocumentArgs, request: &RequestArgs, include: bool) -> Result<()> {
    let (document, _referenced) = load_documents(args)?;
    let config = request_config(request)?;
    let exchange = document.call_exchange(&request.operation_id, config)?;
    if include {
        print_head(&exchange);
    }
    let exchange = exchange.raise_on_http_error()?;
    print_body(&exchange.body_object(false)?)
}

fn cmd_pages(args: &DocumentArgs, request: &RequestArgs, keep_going: bool) -> Result<()> {
    let (document, _referenced) = load_documents(args)?;
    let config = request_config(request)?;
    let pages = document
        .operation(&request.operation_id)?
        .each_link_page(config)
        .raise_on_http_error(!keep_going);

    let mut count = 0;
    for page in pages {
        let exchange = page?;
        count += 1;
        eprintln!("page {count}: {} {}", exchange.request().url, exchange.response().status);
        print_body(&exchange.body_object(false)?)?;
    }
    eprintln!("{count} page(s)");
    Ok(())
}

fn cmd_validate(args: &DocumentArgs) -> Result<()> {
    let (document, referenced) = load_documents(args)?;
    let version = if document.is_v2() { "Swagger 2.0" } else { "OpenAPI 3.x" };
    eprintln!(
        "Valid {version} document: {}",
        document.title().unwrap_or("(untitled)")
    );
    eprintln!("  Referenced documents: {}", referenced.len());

    let operations = document.operations()?;
    eprintln!("  Operations: {}", operations.len());

    let mut schemas = 0;
    for op in &operations {
        let context = || format!("operation {}", op.human_id());
        op.parameters().with_context(context)?;
        schemas += op.request_schemas().with_context(context)?.len();
        schemas += op.response_schemas().with_context(context)?.len();
    }
    eprintln!("  Schemas in use: {schemas}");

    if document.base_url(&document.server_selection())?.is_none() {
        eprintln!("  note: no single base URL; pass --base-url or --server when calling");
    }

    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
