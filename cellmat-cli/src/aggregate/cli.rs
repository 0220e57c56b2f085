use clap::{Arg, Command, arg};

pub const AGGREGATE_CMD: &str = "aggregate";
pub const DEFAULT_OUT: &str = "aggregated.cmx";

pub fn create_aggregate_cli() -> Command {
    Command::new(AGGREGATE_CMD)
        .author("Databio")
        .about("Merge matrix stores into one matrix over the union of their features and cells.")
        .arg(
            Arg::new("stores")
                .required(true)
                .num_args(1..)
                .help("Matrix stores to merge"),
        )
        .arg(arg!(--output <output>).help("Matrix store to write"))
}
