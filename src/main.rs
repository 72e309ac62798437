use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use policy_ledger::cli::{
    handle_account_command, handle_deposit, handle_export_command, handle_ledger, handle_pay,
    handle_policy_command, handle_request_command, handle_user_command, handle_withdraw,
    AccountCommands, ExportCommands, PolicyCommands, RequestCommands, UserCommands,
};
use policy_ledger::config::paths::DATA_DIR_ENV;
use policy_ledger::config::{LedgerPaths, Settings};
use policy_ledger::storage::init::{initialize_storage, needs_initialization};
use policy_ledger::storage::Storage;

#[derive(Parser)]
#[command(
    name = "ledger",
    version,
    about = "Policy-governed multi-account ledger",
    long_about = "Accounts with per-account deposit, withdrawal and overdraft policies. \
                  Every attempted transaction is recorded in an append-only ledger, \
                  whether it succeeds or is declined."
)]
struct Cli {
    /// Directory holding settings and data
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory
    Init,

    /// Show current configuration and paths
    Config,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit into an account
    Deposit {
        /// Account id, short id or username
        account: String,
        amount: String,
    },

    /// Withdraw from an account
    Withdraw {
        /// Account id, short id or username
        account: String,
        amount: String,
    },

    /// Pay from one account to another
    Pay {
        /// Paying account
        from: String,
        /// Receiving account
        to: String,
        amount: String,
    },

    /// Show the ledger of one account, or of all accounts
    Ledger {
        /// Account id, short id or username
        account: Option<String>,
        /// Only the most recent N entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Account policy commands
    #[command(subcommand)]
    Policy(PolicyCommands),

    /// Policy change requests
    #[command(subcommand)]
    Request(RequestCommands),

    /// Username commands
    #[command(subcommand)]
    User(UserCommands),

    /// Export data
    #[command(subcommand)]
    Export(ExportCommands),

    /// Show recent audit log entries
    Audit {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => LedgerPaths::with_base_dir(dir),
        None => LedgerPaths::new()?,
    };
    let settings = Settings::load_or_create(&paths)?;
    init_tracing(&settings);

    let Some(command) = cli.command else {
        println!("ledger - policy-governed multi-account ledger");
        println!();
        println!("Run 'ledger --help' for usage information.");
        return Ok(());
    };

    match command {
        Commands::Init => {
            println!("Initializing policy-ledger at: {}", paths.base_dir().display());
            let settings = initialize_storage(&paths)?;
            println!("Initialization complete!");
            println!("  Default policy: {}", settings.default_policy);
            println!();
            println!("Run 'ledger account create <NAME>' to open an account.");
            return Ok(());
        }
        Commands::Config => {
            println!("policy-ledger Configuration");
            println!("===========================");
            println!("Base directory:  {}", paths.base_dir().display());
            println!("Data directory:  {}", paths.data_dir().display());
            println!("Settings file:   {}", paths.settings_file().display());
            println!("Audit log:       {}", paths.audit_log().display());
            println!("Initialized:     {}", paths.is_initialized());
            println!();
            println!("Settings:");
            println!("  Default policy:   {}", settings.default_policy);
            println!("  Conflict retries: {}", settings.conflict_retries);
            println!("  Log filter:       {}", settings.log_filter);
            return Ok(());
        }
        _ => {}
    }

    if needs_initialization(&paths) {
        bail!(
            "No ledger found at {}. Run 'ledger init' first.",
            paths.base_dir().display()
        );
    }
    let storage = Storage::open(paths)?;

    match command {
        Commands::Account(cmd) => handle_account_command(&storage, &settings, cmd)?,
        Commands::Deposit { account, amount } => {
            handle_deposit(&storage, &settings, &account, &amount)?
        }
        Commands::Withdraw { account, amount } => {
            handle_withdraw(&storage, &settings, &account, &amount)?
        }
        Commands::Pay { from, to, amount } => handle_pay(&storage, &settings, &from, &to, &amount)?,
        Commands::Ledger { account, limit } => handle_ledger(&storage, account.as_deref(), limit)?,
        Commands::Policy(cmd) => handle_policy_command(&storage, cmd)?,
        Commands::Request(cmd) => handle_request_command(&storage, cmd)?,
        Commands::User(cmd) => handle_user_command(&storage, cmd)?,
        Commands::Export(cmd) => handle_export_command(&storage, cmd)?,
        Commands::Audit { limit } => {
            let entries = storage.audit().read_recent(limit)?;
            if entries.is_empty() {
                println!("Audit log is empty.");
            }
            for entry in entries {
                println!("{}", entry.format_human_readable());
            }
        }
        Commands::Init | Commands::Config => {}
    }

    Ok(())
}
