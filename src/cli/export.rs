//! CLI commands for data export

use clap::Subcommand;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::error::LedgerResult;
use crate::export::{export_full_json, export_full_yaml, export_ledger_csv};
use crate::services::AccountService;
use crate::storage::Storage;

#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Ledger transactions as CSV
    Csv {
        /// Only this account's entries
        #[arg(short, long)]
        account: Option<String>,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Everything as JSON
    Json {
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print
        #[arg(long)]
        pretty: bool,
    },
    /// Everything as YAML
    Yaml {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn open_output(output: Option<&PathBuf>) -> LedgerResult<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    })
}

pub fn handle_export_command(storage: &Storage, cmd: ExportCommands) -> LedgerResult<()> {
    match cmd {
        ExportCommands::Csv { account, output } => {
            let account_id = match account {
                Some(query) => Some(AccountService::new(storage).resolve(&query)?.id),
                None => None,
            };
            let mut writer = open_output(output.as_ref())?;
            let rows = export_ledger_csv(storage, account_id, &mut writer)?;
            writer.flush()?;
            if let Some(path) = output {
                println!("Exported {} transactions to {}", rows, path.display());
            }
        }

        ExportCommands::Json { output, pretty } => {
            let mut writer = open_output(output.as_ref())?;
            export_full_json(storage, &mut writer, pretty)?;
            writeln!(writer)?;
            writer.flush()?;
            if let Some(path) = output {
                println!("Exported ledger to {}", path.display());
            }
        }

        ExportCommands::Yaml { output } => {
            let mut writer = open_output(output.as_ref())?;
            export_full_yaml(storage, &mut writer)?;
            writer.flush()?;
            if let Some(path) = output {
                println!("Exported ledger to {}", path.display());
            }
        }
    }

    Ok(())
}
