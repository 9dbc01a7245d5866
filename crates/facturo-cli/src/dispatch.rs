use std::path::Path;

use facturo_client::commands;
use facturo_client::{ClientResult, SuccessEnvelope};

use crate::cli::{Cli, Commands, ImportCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Import { command } => match command {
            ImportCommand::Create {
                company,
                json: _,
                path,
            } => commands::import::create(path.as_deref().map(Path::new), company.as_deref()),
            ImportCommand::List { .. } => commands::import::list(),
            ImportCommand::Show { batch_id, .. } => commands::import::show(batch_id),
            ImportCommand::Reset { batch_id, .. } => commands::import::reset(batch_id),
        },
    }
}
