use crate::cli::{Commands, ImportCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    match command {
        Commands::Import { command } => match command {
            ImportCommand::Create { json, .. }
            | ImportCommand::List { json }
            | ImportCommand::Show { json, .. }
            | ImportCommand::Reset { json, .. } => {
                if *json {
                    OutputMode::Json
                } else {
                    OutputMode::Text
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{OutputMode, mode_for_command};
    use crate::cli::parse_from;

    #[test]
    fn json_flag_selects_json_mode() {
        let cases: [&[&str]; 4] = [
            &["facturo", "import", "create", "lines.csv", "--json"],
            &["facturo", "import", "list", "--json"],
            &["facturo", "import", "show", "imp_1", "--json"],
            &["facturo", "import", "reset", "imp_1", "--json"],
        ];

        for args in cases {
            let parsed = parse_from(args.iter().copied());
            assert!(parsed.is_ok());
            if let Ok(cli) = parsed {
                assert_eq!(mode_for_command(&cli.command), OutputMode::Json);
            }
        }
    }

    #[test]
    fn default_mode_is_text() {
        let parsed = parse_from(["facturo", "import", "list"]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            assert_eq!(mode_for_command(&cli.command), OutputMode::Text);
        }
    }
}
