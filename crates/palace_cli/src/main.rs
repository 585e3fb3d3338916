//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `palace_core` linkage with deterministic output.
//! - Optionally list one owner's active palaces from a database file.

use clap::Parser;
use log::info;
use palace_core::{
    default_log_level, init_logging, open_db, PalaceService, SqlitePalaceRepository,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "palace_cli", about = "Memory palace core probe", version)]
struct Cli {
    /// Palace database file to read.
    #[arg(long, requires = "owner")]
    db: Option<PathBuf>,

    /// Owner whose active palaces are listed.
    #[arg(long, requires = "db")]
    owner: Option<String>,

    /// Absolute directory for rotated log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn list_palaces(db: &Path, owner: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db)?;
    let service = PalaceService::new(SqlitePalaceRepository::try_new(&conn)?);
    let palaces = service.list_palaces(owner)?;
    info!(
        "event=cli_list module=cli status=ok palaces={}",
        palaces.len()
    );
    for palace in palaces {
        println!(
            "{}\t{}\tupdated_at={}",
            palace.palace_uuid, palace.name, palace.updated_at
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = init_logging(default_log_level(), log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("palace_core ping={}", palace_core::ping());
    println!("palace_core version={}", palace_core::core_version());

    let (Some(db), Some(owner)) = (cli.db.as_deref(), cli.owner.as_deref()) else {
        return ExitCode::SUCCESS;
    };
    match list_palaces(db, owner) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("listing palaces failed: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::error::ErrorKind;
    use clap::{CommandFactory, Parser};
    use std::path::Path;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_known_flags() {
        let cli = Cli::try_parse_from(["palace_cli", "--db", "/tmp/p.db", "--owner", "u1"]).unwrap();
        assert_eq!(cli.db.as_deref(), Some(Path::new("/tmp/p.db")));
        assert_eq!(cli.owner.as_deref(), Some("u1"));
        assert!(cli.log_dir.is_none());
    }

    #[test]
    fn no_flags_is_a_plain_probe() {
        let cli = Cli::try_parse_from(["palace_cli"]).unwrap();
        assert!(cli.db.is_none());
        assert!(cli.owner.is_none());
    }

    #[test]
    fn db_and_owner_must_be_given_together() {
        let err = Cli::try_parse_from(["palace_cli", "--db", "/tmp/p.db"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        let err = Cli::try_parse_from(["palace_cli", "--owner", "u1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        let err = Cli::try_parse_from(["palace_cli", "--verbose"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(Cli::try_parse_from(["palace_cli", "--db"]).is_err());
    }
}
