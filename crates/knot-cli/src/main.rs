use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use knot_analytics::OwnershipResolver;
use knot_core::{stores_for, KnotConfig, QueryOrchestrator, QueryResponse, StageStatus};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("knot")
        .version(knot_core::VERSION)
        .about("KNOT patent-portfolio query engine")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Dataset directory (defaults to the embedded demo data)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("query")
                .about("Answer a natural-language query")
                .arg(Arg::new("text").required(true).help("Query text"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the full response as JSON"),
                ),
        )
        .subcommand(
            Command::new("parse")
                .about("Show the intent and plan for a query without running it")
                .arg(Arg::new("text").required(true).help("Query text")),
        )
        .subcommand(Command::new("stats").about("Show record counts"))
        .subcommand(Command::new("cycles").about("Report ownership cycles"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<KnotConfig> {
    let path = matches.get_one::<PathBuf>("config");
    let mut config = KnotConfig::load(path.map(PathBuf::as_path)).context("failed to load configuration")?;
    if let Some(dir) = matches.get_one::<PathBuf>("data-dir") {
        config.data_dir = Some(dir.clone());
    }
    Ok(config)
}

fn text_arg(args: &ArgMatches) -> &str {
    args.get_one::<String>("text").map_or("", String::as_str)
}

fn print_report(response: &QueryResponse) {
    let report = match response {
        QueryResponse::Report(report) => report,
        QueryResponse::Suggestion(suggestion) => {
            println!("{}", suggestion.error);
            println!("{}", suggestion.suggestion);
            return;
        }
    };

    println!("{}", report.executive_summary);
    println!();
    println!("Query ID: {}", report.query_id);
    println!("Goal: {}", report.intent.primary_goal);
    println!("Confidence: {:.2}", report.confidence);

    if !report.stage_results.is_empty() {
        println!();
        println!("Stages:");
        for (id, record) in report.stage_results.iter() {
            match (&record.status, &record.error) {
                (StageStatus::Completed, _) => {
                    println!("  {id}: completed ({:.2}, {}ms)", record.confidence, record.elapsed_ms);
                }
                (status, error) => {
                    println!("  {id}: {} ({})", status.as_str(), error.as_deref().unwrap_or("no detail"));
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = load_config(&matches)?;
    let stores = stores_for(&config).context("failed to load record stores")?;

    match matches.subcommand() {
        Some(("query", args)) => {
            let orchestrator = QueryOrchestrator::from_config(&config, &stores);
            let response = orchestrator.answer(text_arg(args)).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_report(&response);
            }
        }
        Some(("parse", args)) => {
            let orchestrator = QueryOrchestrator::from_config(&config, &stores);
            let parsed = orchestrator.parse(text_arg(args))?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Some(("stats", _)) => {
            let stats = stores.stats();
            println!("Patents: {}", stats.patents);
            println!("Companies: {}", stats.companies);
            println!("Ownership edges: {}", stats.ownership_edges);
            println!("Products: {}", stats.products);
            println!("Prior art: {}", stats.prior_art);
        }
        Some(("cycles", _)) => {
            let cycles = OwnershipResolver::new(stores.graph.as_ref()).detect_cycles();
            if cycles.is_empty() {
                println!("No ownership cycles");
            }
            for cycle in cycles {
                println!("{}", cycle.join(" -> "));
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let matches = cli()
            .try_get_matches_from(["knot", "query", "Who owns SensorTech?", "--json", "--log-json"])
            .unwrap();
        assert!(matches.get_flag("log-json"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "query");
        assert_eq!(text_arg(args), "Who owns SensorTech?");
        assert!(args.get_flag("json"));
    }
}
