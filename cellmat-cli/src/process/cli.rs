use clap::{Arg, ArgAction, Command, arg, value_parser};

pub const PROCESS_CMD: &str = "process";
pub const DEFAULT_OUT: &str = "processed.cmx";

pub fn create_process_cli() -> Command {
    Command::new(PROCESS_CMD)
        .author("Databio")
        .about("Filter, normalize and log-transform a matrix store, then write the result.")
        .arg(Arg::new("store").required(true).help("Matrix store to process"))
        .arg(arg!(--config <path>).help("TOML file with processing settings"))
        .arg(
            arg!(--"min-features" <n>)
                .value_parser(value_parser!(usize))
                .help("Drop cells with fewer features present"),
        )
        .arg(
            arg!(--"min-cells" <n>)
                .value_parser(value_parser!(usize))
                .help("Drop features present in fewer cells"),
        )
        .arg(
            arg!(--"max-mito" <fraction>)
                .value_parser(value_parser!(f64))
                .help("Drop cells with a larger fraction of mitochondrial counts"),
        )
        .arg(
            arg!(--"norm-count" <total>)
                .value_parser(value_parser!(f64))
                .help("Per-cell total after normalization"),
        )
        .arg(
            arg!(--"no-log")
                .action(ArgAction::SetTrue)
                .help("Skip the log transform"),
        )
        .arg(arg!(--"mito-report" <path>).help("Write per-cell mitochondrial percentages here"))
        .arg(arg!(--output <output>).help("Matrix store to write"))
        .arg(arg!(--mex <dir>).help("Also write a sparse coordinate bundle into this new directory"))
        .arg(arg!(--tsv <path>).help("Also write a dense tab-separated table"))
        .arg(
            arg!(--"feature-ids" <path>)
                .help("Tab-separated `<id>\\t<label>` file supplying feature ids for the bundle"),
        )
        .arg(arg!(--"index-name" <name>).help("Header of the feature column of the table"))
}
