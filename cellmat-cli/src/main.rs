mod aggregate;
mod build;
mod config;
mod export;
mod process;

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use env_logger::Env;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "cellmat";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Build, merge, filter and export feature-by-cell count matrices for single-cell sequencing.")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("Log debug output")
                .action(ArgAction::SetTrue),
        )
        .subcommand(build::cli::create_build_cli())
        .subcommand(aggregate::cli::create_aggregate_cli())
        .subcommand(process::cli::create_process_cli())
        .subcommand(export::cli::create_export_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        //
        // COUNT TAG TABLES
        //
        Some((build::cli::BUILD_CMD, matches)) => {
            build::handlers::run_build(matches)?;
        }

        //
        // MERGE STORES
        //
        Some((aggregate::cli::AGGREGATE_CMD, matches)) => {
            aggregate::handlers::run_aggregate(matches)?;
        }

        //
        // FILTER, NORMALIZE, TRANSFORM
        //
        Some((process::cli::PROCESS_CMD, matches)) => {
            process::handlers::run_process(matches)?;
        }

        //
        // EXPORT
        //
        Some((export::cli::EXPORT_CMD, matches)) => {
            export::handlers::run_export(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_is_consistent() {
        build_parser().debug_assert();
    }
}
