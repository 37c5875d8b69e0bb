use std::net::SocketAddr;
use std::process;

use clap::{Parser, Subcommand};
use comfy_table::{modifiers, presets, ContentArrangement, Table};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use terminal_size::{terminal_size, Width};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use clusterwiz::api::{self, ApiClient};
use clusterwiz::config::{self, Config, DEFAULT_HOST, DEFAULT_PORT};
use clusterwiz::flows::FlowCatalog;
use clusterwiz::models::AppState;
use clusterwiz::routes::build_router;
use clusterwiz::utils::value_to_short_string;
use clusterwiz::wizard::{FormValues, RemoteLookups, WizardDefinition};

fn load_catalog() -> FlowCatalog {
    match FlowCatalog::builtin() {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(%e, "Built-in wizard definitions are invalid");
            eprintln!("{}: {}", yansi::Paint::new("Invalid wizard definition").red(), e);
            process::exit(1);
        }
    }
}

fn build_client(config: &Config) -> ApiClient {
    match ApiClient::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(%e, "Failed to build HTTP client");
            eprintln!("{}: {}", yansi::Paint::new("Failed to build HTTP client").red(), e);
            process::exit(1);
        }
    }
}

fn build_state_from_env(env_file: Option<&str>) -> AppState {
    config::load_env_file(env_file);
    let config = Config::from_env();
    let api = build_client(&config);
    AppState::new(load_catalog(), api, config.public_base_url)
}

async fn start_server(state: AppState, host: &str, port: u16) {
    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(%e, "Invalid host/port format");
            eprintln!("{}: {}", yansi::Paint::red("Invalid host/port format"), e);
            process::exit(1);
        }
    };
    let app = build_router(state);
    tracing::info!(%addr, "Starting clusterwiz server");
    println!(
        "{} {}",
        yansi::Paint::new("Web server running on").green(),
        yansi::Paint::new(format!("http://{}", addr)).cyan()
    );
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(%e, "Server encountered an error while running");
                eprintln!("{}: {}", yansi::Paint::new("Server error").red(), e);
                process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!(%e, "Failed to bind to address; is the port already in use?");
            eprintln!(
                "{}: {}\n{}",
                yansi::Paint::new(format!("Failed to bind to {}", addr)).red(),
                e,
                yansi::Paint::new("Please stop any process using this port, or start the server with a different --port value.").yellow()
            );
            process::exit(1);
        }
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if let Some((Width(w), _)) = terminal_size() {
        table.set_width(w.saturating_sub(4));
    }
    table
}

fn find_flow(catalog: &FlowCatalog, name: &str) -> std::sync::Arc<WizardDefinition> {
    match catalog.get(name) {
        Some(def) => def,
        None => {
            eprintln!(
                "{} '{}'. {}: {}",
                yansi::Paint::new("Unknown flow").red(),
                name,
                yansi::Paint::new("Available").yellow(),
                catalog.names().join(", ")
            );
            process::exit(1);
        }
    }
}

fn list_flows(catalog: &FlowCatalog) {
    let mut table = new_table();
    table.set_header(vec!["Name", "Title", "Steps", "Method", "Description"]);
    for def in catalog.iter() {
        table.add_row(vec![
            def.name().to_string(),
            def.title().to_string(),
            def.steps().len().to_string(),
            def.method().to_string(),
            def.description().to_string(),
        ]);
    }
    println!("\n{table}\n");
}

fn describe_flow(def: &WizardDefinition) {
    println!("{} {}", yansi::Paint::new(def.title()).bold(), yansi::Paint::new(format!("({})", def.name())).dim());
    if !def.description().is_empty() {
        println!("{}", def.description());
    }

    let mut steps = new_table();
    steps.set_header(vec!["#", "Step", "Title", "Fields", "Applies when"]);
    for (i, step) in def.steps().iter().enumerate() {
        steps.add_row(vec![
            (i + 1).to_string(),
            step.id().to_string(),
            step.title().to_string(),
            step.fields().join(", "),
            step.condition().map(|c| format!("{:?}", c)).unwrap_or_else(|| "always".into()),
        ]);
    }
    println!("\n{steps}");

    let graph = def.registry().dependency_graph();
    let mut fields = new_table();
    fields.set_header(vec!["Field", "Label", "Kind", "Default", "Required", "Reads", "Shown when"]);
    for field in def.registry().all() {
        let reads = graph
            .get(field.key())
            .map(|keys| keys.iter().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        fields.add_row(vec![
            field.key().to_string(),
            field.label().to_string(),
            field.kind().tag().to_string(),
            value_to_short_string(field.default_value()),
            if field.is_required() { "yes".into() } else { String::new() },
            reads,
            field.condition().map(|c| format!("{:?}", c)).unwrap_or_default(),
        ]);
    }
    println!("\n{fields}\n");
}

/// Input of `flows validate`: values over the flow defaults, plus lookups.
#[derive(Debug, Deserialize)]
struct ValidateInput {
    values: IndexMap<String, Value>,
    #[serde(default)]
    lookups: RemoteLookups,
}

fn validate_flow(def: &WizardDefinition, path: &str) {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{} {}: {}", yansi::Paint::new("Failed to read").red(), path, e);
            process::exit(1);
        }
    };
    let input: ValidateInput = match serde_json::from_str(&text) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("{} {}: {}", yansi::Paint::new("Invalid JSON in").red(), path, e);
            process::exit(1);
        }
    };
    let unknown: Vec<&String> = input.values.keys().filter(|k| def.field(k).is_none()).collect();
    if !unknown.is_empty() {
        eprintln!(
            "{}: {}",
            yansi::Paint::new("Unknown fields").red(),
            unknown.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
        );
        process::exit(1);
    }

    let defaults = def.default_values();
    let values: FormValues = defaults
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .chain(input.values)
        .collect();
    let (applicability, validation) = def.validate(&values, &input.lookups);

    for diagnostic in &applicability.diagnostics {
        eprintln!("{}: {}", yansi::Paint::new("warning").yellow(), diagnostic);
    }

    let mut steps = new_table();
    steps.set_header(vec!["Step", "Title", "Status"]);
    for step in def.steps().iter().filter(|s| applicability.is_step_applicable(s.id())) {
        let blocking = clusterwiz::wizard::blocking_fields(step, &validation, &applicability.fields);
        let status = if blocking.is_empty() {
            yansi::Paint::new("ok").green().to_string()
        } else {
            yansi::Paint::new(format!("blocked by {}", blocking.join(", "))).red().to_string()
        };
        steps.add_row(vec![step.id().to_string(), step.title().to_string(), status]);
    }
    println!("\n{steps}");

    if validation.is_valid() {
        let payload = def.payload(&values, &applicability.fields);
        println!(
            "{} {} {}",
            yansi::Paint::new("Valid.").green().bold(),
            def.method(),
            def.endpoint(&values)
        );
        println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
        return;
    }

    let mut errors = new_table();
    errors.set_header(vec!["Field", "Error"]);
    for (key, message) in validation.errors() {
        errors.add_row(vec![key.to_string(), message.to_string()]);
    }
    println!("\n{errors}\n");
    process::exit(1);
}

async fn check_config(env_file: Option<&str>) {
    config::load_env_file(env_file);
    let config = Config::from_env();
    println!("API_BASE_URL        {}", config.api_base_url);
    println!("PUBLIC_BASE_URL     {}", if config.public_base_url.is_empty() { "(relative links)" } else { &config.public_base_url });
    println!("SUBMIT_TIMEOUT_SECS {}", config.submit_timeout.as_secs());
    if config.api_token.is_empty() {
        eprintln!("{}", yansi::Paint::new("API_TOKEN is not configured").red());
        process::exit(1);
    }

    let catalog = load_catalog();
    let client = build_client(&config);
    let mut ok = true;
    for def in catalog.iter() {
        for source in def.lookup_sources() {
            match api::load_lookup_list(&client, source).await {
                Ok(items) => println!(
                    "{} {} ({} entries)",
                    yansi::Paint::new("ok").green(),
                    source.endpoint,
                    items.len()
                ),
                Err(e) => {
                    ok = false;
                    eprintln!("{} {}: {}", yansi::Paint::new("failed").red(), source.endpoint, e);
                }
            }
        }
    }
    if ok {
        println!("{}", yansi::Paint::new("Configuration looks valid").green());
    } else {
        eprintln!("{}", yansi::Paint::new("Configuration appears invalid").red());
        process::exit(1);
    }
}

#[derive(Parser)]
#[command(
    name = "clusterwiz",
    author,
    version,
    about = "Guided wizards for managed cluster changes",
    long_about = r#"clusterwiz walks you through multi-step cluster changes (machine pools, cluster-wide proxy, upgrade policies) and submits them to the cluster management API once every step validates.

Use the `--env-file` option or environment variables (API_BASE_URL, API_TOKEN, PUBLIC_BASE_URL, SUBMIT_TIMEOUT_SECS) to configure the API.

Examples:
  1) Run the web UI:
      clusterwiz serve --host 127.0.0.1 --port 8080
  2) Inspect a wizard:
      clusterwiz flows describe machine-pool
  3) Validate values offline:
      clusterwiz flows validate machine-pool pool.json
"#,
    after_help = "Use `clusterwiz <subcommand> --help` to get subcommand specific options and usage examples."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Disable colorized output
    #[arg(long, global = true)]
    no_color: bool,
    /// Disable request/response logging
    #[arg(long, global = true)]
    silent: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Host to bind to
        #[arg(long, default_value_t = String::from(DEFAULT_HOST))]
        host: String,
        /// Port to bind to
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Path to .env file
        #[arg(long)]
        env_file: Option<String>,
    },
    #[command(
        about = "Validate configuration and ensure API connectivity.",
        long_about = "Print the effective configuration, then load every lookup list the wizards use to confirm the API token works."
    )]
    CheckConfig {
        /// Path to .env file
        #[arg(long)]
        env_file: Option<String>,
    },
    /// Inspect and dry-run the built-in wizards
    Flows {
        #[command(subcommand)]
        sub: FlowCommands,
    },
}

#[derive(Subcommand)]
enum FlowCommands {
    #[command(about = "List wizards", long_about = "List every built-in wizard with its step count and submission method.")]
    List,
    #[command(about = "Show a wizard's steps and fields", long_about = "Print the steps, fields, defaults and visibility conditions of a wizard, including which fields each field's rules read.")]
    Describe { flow: String },
    #[command(
        about = "Validate values against a wizard",
        long_about = "Read a JSON file of the form {\"values\": {...}, \"lookups\": {...}}, overlay the values on the wizard defaults and print each applicable step's status. Valid input prints the payload that would be submitted; invalid input prints the errors and exits with status 1."
    )]
    Validate { flow: String, values: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        yansi::whenever(yansi::Condition::NEVER);
    }

    if cli.silent {
        api::set_silent(true);
    }

    let Some(command) = cli.command else {
        let state = build_state_from_env(None);
        start_server(state, DEFAULT_HOST, DEFAULT_PORT).await;
        return;
    };
    match command {
        Commands::Serve { host, port, env_file } => {
            let state = build_state_from_env(env_file.as_deref());
            start_server(state, &host, port).await;
        }
        Commands::CheckConfig { env_file } => check_config(env_file.as_deref()).await,
        Commands::Flows { sub } => {
            let catalog = load_catalog();
            match sub {
                FlowCommands::List => list_flows(&catalog),
                FlowCommands::Describe { flow } => describe_flow(&find_flow(&catalog, &flow)),
                FlowCommands::Validate { flow, values } => validate_flow(&find_flow(&catalog, &flow), &values),
            }
        }
    }
}
