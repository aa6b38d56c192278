mod cli;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bookshop-search", version, about = "Bookshop Search: book recommendations from free-text requests")]
struct App {
    /// Mirror logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, telemetry schema and default config
    Init,
    /// Rebuild the catalog from a JSON Lines file
    Import {
        /// One book per line: title, authors, description, category, publisher, price, publish_year
        file: String,
    },
    /// Show catalog size and a few random books
    Catalog,
    /// Run one filter model against the catalog and print the raw result
    Query {
        #[command(flatten)]
        filters: cli::query::FilterArgs,
        /// Send the query to a running `serve` instance
        #[arg(long)]
        remote: bool,
    },
    /// Full pipeline: text in, up to five recommendations out
    Recommend {
        /// Free-text request
        text: String,
        /// Filter model JSON; skips the extractor endpoint
        #[arg(long)]
        filters: Option<String>,
        /// Conversation id for remembered dislikes (bare flag starts a new one)
        #[arg(long, num_args = 0..=1)]
        session: Option<Option<String>>,
        /// Send queries to a running `serve` instance
        #[arg(long)]
        remote: bool,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect logged outcomes
    Outcomes {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Serve catalog queries on a local socket
    Serve {
        /// Socket path (defaults to server.socket_path)
        #[arg(long)]
        socket: Option<String>,
    },
    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Inspect or clear conversation memory
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Display the full configuration
    Show,
    /// Get a config value (dot notation: retrieval.max_attempts)
    Get {
        /// Config key (dot notation)
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key (dot notation)
        key: String,
        /// Value (JSON: true, false, 42, "string")
        value: String,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show remembered dislikes
    Show { id: String },
    /// Forget a session
    Clear { id: String },
}

fn main() {
    let app = App::parse();
    bookshop_search::tracing_init::init_tracing(app.verbose);

    let result = match app.command {
        Commands::Init => cli::init::run(),
        Commands::Import { file } => cli::import::run(&file),
        Commands::Catalog => cli::catalog::run(),
        Commands::Query { filters, remote } => cli::query::run(filters, remote),
        Commands::Recommend {
            text,
            filters,
            session,
            remote,
            json,
        } => cli::recommend::run(&text, filters.as_deref(), session, remote, json),
        Commands::Outcomes { limit } => cli::outcomes::run(limit),
        Commands::Serve { socket } => cli::serve::run(socket.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::config::run_show(),
            ConfigAction::Get { key } => cli::config::run_get(&key),
            ConfigAction::Set { key, value } => cli::config::run_set(&key, &value),
        },
        Commands::Session { action } => match action {
            SessionAction::Show { id } => cli::session::run_show(&id),
            SessionAction::Clear { id } => cli::session::run_clear(&id),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
