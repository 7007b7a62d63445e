use clap::{Arg, Command, value_parser};

pub(super) fn root_cli() -> Command {
    Command::new("offsetgen")
        .about("Plans the offset ranges to read in the next ingestion cycle")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(add_plan_subcommand())
}

fn add_plan_subcommand() -> Command {
    Command::new("plan")
        .about("Plans one cycle for a Kafka topic and prints the ranges and the next checkpoint")
        .arg(
            Arg::new("topic")
                .long("topic")
                .required(true)
                .help("Topic to plan the cycle for"),
        )
        .arg(
            Arg::new("checkpoint")
                .long("checkpoint")
                .help("Checkpoint returned by the previous cycle, omit on the first run"),
        )
        .arg(
            Arg::new("source-limit")
                .long("source-limit")
                .value_parser(value_parser!(i64).range(0..))
                .help("Maximum number of events to read, capped by OFFSETGEN_MAX_EVENTS_PER_CYCLE"),
        )
}
