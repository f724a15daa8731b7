use clap::{value_parser, Arg, ArgAction, Command};
use easel_session::harness::{run_certification, run_harness, HarnessConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let defaults = HarnessConfig::default();
    let cli = Command::new("easel-harness")
        .version(easel_session::VERSION)
        .about("Scripted editing sessions against an unreliable store")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run one scripted editing session")
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("edits")
                        .long("edits")
                        .default_value("30")
                        .value_parser(value_parser!(u32))
                        .help("Edits typed during the burst"),
                )
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .default_value("0.2")
                        .value_parser(value_parser!(f64))
                        .help("Probability that one save attempt fails"),
                )
                .arg(
                    Arg::new("outage")
                        .long("outage")
                        .default_value("0")
                        .value_parser(value_parser!(u32))
                        .help("Attempts that fail unconditionally before the store heals"),
                )
                .arg(
                    Arg::new("debounce-ms")
                        .long("debounce-ms")
                        .default_value("200")
                        .value_parser(value_parser!(u64))
                        .help("Quiet window between the last edit and its save"),
                )
                .arg(
                    Arg::new("pause-ms")
                        .long("pause-ms")
                        .default_value("20")
                        .value_parser(value_parser!(u64))
                        .help("Pause between consecutive edits"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("certify")
                .about("Run the session across consecutive seeds")
                .arg(
                    Arg::new("seeds")
                        .long("seeds")
                        .default_value("5")
                        .value_parser(value_parser!(u64))
                        .help("Number of consecutive seeds to test"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("First seed in the range"),
                )
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .default_value("0.2")
                        .value_parser(value_parser!(f64))
                        .help("Probability that one save attempt fails"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("run", args)) => {
            let config = HarnessConfig {
                seed: *args.get_one::<u64>("seed").unwrap(),
                edits: *args.get_one::<u32>("edits").unwrap(),
                failure_rate: *args.get_one::<f64>("failure-rate").unwrap(),
                outage_attempts: *args.get_one::<u32>("outage").unwrap(),
                debounce_ms: *args.get_one::<u64>("debounce-ms").unwrap(),
                pause_ms: *args.get_one::<u64>("pause-ms").unwrap(),
            };

            let report = run_harness(config).await;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("certify", args)) => {
            let seeds = *args.get_one::<u64>("seeds").unwrap();
            let base = HarnessConfig {
                seed: *args.get_one::<u64>("seed").unwrap(),
                failure_rate: *args.get_one::<f64>("failure-rate").unwrap(),
                ..defaults
            };

            let report = run_certification(base, seeds).await;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        _ => Ok(()),
    }
}
