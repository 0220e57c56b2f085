use clap::{Arg, ArgGroup, Command, arg};

pub use cellmat_core::consts::{DEFAULT_FEATURE_TYPE, DEFAULT_INDEX_NAME};

pub const EXPORT_CMD: &str = "export";

pub fn create_export_cli() -> Command {
    Command::new(EXPORT_CMD)
        .author("Databio")
        .about("Export a matrix store to a sparse coordinate bundle and/or a tab-separated table.")
        .arg(Arg::new("store").required(true).help("Matrix store to export"))
        .arg(arg!(--mex <dir>).help("Write a sparse coordinate bundle into this new directory"))
        .arg(arg!(--tsv <path>).help("Write a dense tab-separated table (gzipped if it ends in .gz)"))
        .group(
            ArgGroup::new("outputs")
                .args(["mex", "tsv"])
                .required(true)
                .multiple(true),
        )
        .arg(arg!(--"feature-type" <type>).help("Feature type column of the bundle"))
        .arg(
            arg!(--"feature-ids" <path>)
                .help("Tab-separated `<id>\\t<label>` file supplying feature ids for the bundle"),
        )
        .arg(arg!(--"index-name" <name>).help("Header of the feature column of the table"))
}
