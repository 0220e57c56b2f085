use clap::{Arg, Command, arg};

pub use cellmat_counts::tags::DEFAULT_FEATURE_COLUMN;

pub const BUILD_CMD: &str = "build";
pub const DEFAULT_OUT: &str = "counts.cmx";

pub fn create_build_cli() -> Command {
    Command::new(BUILD_CMD)
        .author("Databio")
        .about("Count distinct UMIs per feature and cell in one or more tag tables and save the merged matrix.")
        .arg(
            Arg::new("tags")
                .required(true)
                .num_args(1..)
                .help("Tab-separated tag tables, optionally gzipped"),
        )
        .arg(arg!(--output <output>).help("Matrix store to write"))
        .arg(arg!(--"feature-column" <column>).help("Column holding the feature label"))
        .arg(
            arg!(--"scratch-dir" <dir>)
                .help("Directory for per-sample stores (default: next to each input)"),
        )
}
