use clap::{Args, Parser, Subcommand};
use litecrud::config::{default_config_path, load_config, Config};
use litecrud::{ColumnValues, Database, LiteError, Result, RowScope};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// CRUD against a single-file SQLite database without writing SQL.
#[derive(Debug, Parser)]
#[command(name = "litecrud", version, about)]
struct Cli {
    /// Database file; overrides the configured path
    #[arg(long, short = 'd')]
    db: Option<PathBuf>,

    /// TOML configuration file (defaults to the per-user config, if present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List user tables
    Tables,
    /// Show the declared columns of a table
    Columns { table: String },
    /// Print matching rows as a JSON array
    Select {
        table: String,
        /// Column to return; repeat for more (default: all declared columns)
        #[arg(long = "field", short = 'f')]
        fields: Vec<String>,
        /// Equality filter as column=value; repeat to AND them
        #[arg(long = "where", short = 'w', value_parser = parse_pair)]
        filters: Vec<(String, String)>,
        #[arg(long)]
        order_by: Option<String>,
        #[arg(long)]
        group_by: Option<String>,
    },
    /// Insert one row and print its row id
    Insert {
        table: String,
        /// Values as column=value
        #[arg(required = true, value_parser = parse_pair)]
        values: Vec<(String, String)>,
    },
    /// Update rows and print how many changed
    Update {
        table: String,
        /// Assignment as column=value; repeat for more
        #[arg(long = "set", short = 's', required = true, value_parser = parse_pair)]
        values: Vec<(String, String)>,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Delete rows and print how many went
    Delete {
        table: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Run raw SQL verbatim
    Exec {
        sql: String,
        /// Commit a transaction the SQL leaves open
        #[arg(long)]
        commit: bool,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct ScopeArgs {
    /// Equality filter as column=value; repeat to AND them
    #[arg(long = "where", short = 'w', value_parser = parse_pair)]
    filters: Vec<(String, String)>,
    /// Affect every row in the table
    #[arg(long)]
    all_rows: bool,
}

impl ScopeArgs {
    fn into_scope(self) -> RowScope {
        if self.all_rows {
            RowScope::AllRows
        } else {
            RowScope::matching(self.filters)
        }
    }
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((column, value)) if !column.is_empty() => Ok((column.to_string(), value.to_string())),
        _ => Err(format!("expected column=value, got '{}'", raw)),
    }
}

fn load_settings(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                debug!("Using config {:?}", path);
                load_config(path)?
            }
            None => Config::default(),
        },
    };

    match &cli.db {
        Some(db) => config.database.path = db.clone(),
        None if !config.path_configured() => {
            return Err(LiteError::Config(
                "no database given; pass --db or set [database] path".to_string(),
            ));
        }
        None => {}
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_settings(&cli)?;
    info!("Using database {:?}", config.database.path);

    Database::scoped(config.database, |db| match cli.command {
        Command::Tables => {
            for table in db.tables()? {
                println!("{}", table);
            }
            Ok(())
        }
        Command::Columns { table } => {
            for column in db.columns(&table)? {
                let mut flags = Vec::new();
                if column.pk {
                    flags.push("PRIMARY KEY");
                }
                if column.notnull {
                    flags.push("NOT NULL");
                }
                println!("{}\t{}\t{}", column.name, column.type_name, flags.join(" "));
            }
            Ok(())
        }
        Command::Select {
            table,
            fields,
            filters,
            order_by,
            group_by,
        } => {
            let mut query = db.select(table).filters(filters);
            if !fields.is_empty() {
                query = query.fields(fields);
            }
            if let Some(order_by) = order_by {
                query = query.order_by(order_by);
            }
            if let Some(group_by) = group_by {
                query = query.group_by(group_by);
            }
            let records = query.fetch()?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
        Command::Insert { table, values } => {
            let id = db.insert(&table, values)?;
            println!("{}", id);
            Ok(())
        }
        Command::Update { table, values, scope } => {
            let changed = db.update(&table, ColumnValues::from(values), scope.into_scope())?;
            println!("{}", changed);
            Ok(())
        }
        Command::Delete { table, scope } => {
            let removed = db.delete(&table, scope.into_scope())?;
            println!("{}", removed);
            Ok(())
        }
        Command::Exec { sql, commit } => db.custom_query(&sql, commit),
    })
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
