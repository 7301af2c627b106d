use std::{path::Path, time::Duration};

use anyhow::{bail, Context};
use clap::{Arg, ArgMatches, Command};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::{
    core::reconciler, types::BudgetBreakdown, ExpenseRecord, PlannerConfig, TripPlanner,
    TripRequest,
};

fn command() -> Command {
    let model_args = [
        Arg::new("api-key")
            .short('k')
            .long("api-key")
            .value_name("KEY")
            .help("Model provider API key (or set DEEPSEEK_API_KEY)"),
        Arg::new("base-url")
            .short('u')
            .long("base-url")
            .value_name("URL")
            .help("Chat-completions base URL (or set DEEPSEEK_BASE_URL)"),
        Arg::new("model")
            .short('m')
            .long("model")
            .value_name("MODEL")
            .help("Model name (or set DEEPSEEK_MODEL)"),
        Arg::new("timeout")
            .short('t')
            .long("timeout")
            .value_name("SECONDS")
            .help("Request timeout in seconds (or set REQUEST_TIMEOUT_SECS)"),
    ];

    Command::new("trip-planner")
        .version(env!("CARGO_PKG_VERSION"))
        .about("AI travel planner: itineraries, voice expenses and budget checks")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("itinerary")
                .about("Generate a day-by-day itinerary")
                .arg(
                    Arg::new("destination")
                        .help("Where to go")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("start")
                        .long("start")
                        .value_name("YYYY-MM-DD")
                        .required(true),
                )
                .arg(
                    Arg::new("end")
                        .long("end")
                        .value_name("YYYY-MM-DD")
                        .required(true),
                )
                .arg(
                    Arg::new("budget")
                        .short('b')
                        .long("budget")
                        .value_name("CNY")
                        .required(true),
                )
                .arg(
                    Arg::new("people")
                        .short('p')
                        .long("people")
                        .value_name("COUNT")
                        .default_value("1"),
                )
                .arg(
                    Arg::new("preferences")
                        .long("preferences")
                        .value_name("TEXT"),
                )
                .args(model_args.clone()),
        )
        .subcommand(
            Command::new("expense")
                .about("Parse a spoken expense such as \"打车去西湖30\"")
                .arg(Arg::new("text").required(true).index(1))
                .args(model_args.clone()),
        )
        .subcommand(
            Command::new("insights")
                .about("Travel notes for a destination")
                .arg(Arg::new("destination").required(true).index(1))
                .args(model_args),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare recorded expenses with a budget breakdown")
                .arg(
                    Arg::new("expenses")
                        .long("expenses")
                        .value_name("FILE")
                        .help("JSON array of expense records")
                        .required(true),
                )
                .arg(
                    Arg::new("budget")
                        .long("budget")
                        .value_name("FILE")
                        .help("Budget breakdown, or a whole itinerary containing one")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("stats")
                .about("Totals and averages for recorded expenses")
                .arg(
                    Arg::new("expenses")
                        .long("expenses")
                        .value_name("FILE")
                        .required(true),
                ),
        )
}

/// CLI entry point for the trip-planner tool
pub async fn run() -> anyhow::Result<()> {
    let config = PlannerConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    let matches = command().get_matches();
    match matches.subcommand() {
        Some(("itinerary", sub)) => {
            let planner = planner(config, sub)?;
            let request = TripRequest {
                destination: required(sub, "destination")?.to_string(),
                start_date: required(sub, "start")?.to_string(),
                end_date: required(sub, "end")?.to_string(),
                budget: required(sub, "budget")?
                    .parse()
                    .context("--budget must be a number")?,
                people_count: required(sub, "people")?
                    .parse()
                    .context("--people must be a positive integer")?,
                preferences: sub.get_one::<String>("preferences").cloned(),
            };
            info!("Generating itinerary for {}", request.destination);
            report(&planner.generate_itinerary(&request).await)
        }
        Some(("expense", sub)) => {
            let planner = planner(config, sub)?;
            report(&planner.parse_expense(required(sub, "text")?).await)
        }
        Some(("insights", sub)) => {
            let planner = planner(config, sub)?;
            report(&planner.destination_insights(required(sub, "destination")?).await)
        }
        Some(("compare", sub)) => {
            let expenses = read_expenses(Path::new(required(sub, "expenses")?))?;
            let budget = read_breakdown(Path::new(required(sub, "budget")?))?;
            print_json(&reconciler::compare(&expenses, &budget))
        }
        Some(("stats", sub)) => {
            let expenses = read_expenses(Path::new(required(sub, "expenses")?))?;
            print_json(&reconciler::statistics(&expenses))
        }
        _ => bail!("unknown command"),
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("--{name} is required"))
}

/// Command-line flags win over the environment.
fn planner(mut config: PlannerConfig, matches: &ArgMatches) -> anyhow::Result<TripPlanner> {
    if let Some(api_key) = matches.get_one::<String>("api-key") {
        config.api_key = Some(api_key.clone());
    }
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config.base_url = base_url.clone();
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config.model = model.clone();
    }
    if let Some(timeout) = matches.get_one::<String>("timeout") {
        let seconds: u64 = timeout.parse().context("--timeout must be whole seconds")?;
        config.request_timeout = Duration::from_secs(seconds);
    }

    info!("Using model {} at {}", config.model, config.base_url);
    Ok(TripPlanner::from_config(&config)?)
}

fn report<T: Serialize>(response: &crate::ApiResponse<T>) -> anyhow::Result<()> {
    print_json(response)?;
    if !response.success {
        let message = response.error.as_deref().unwrap_or("operation failed");
        error!("{}", message);
        bail!("{}", message);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Accepts a bare array or an object with an `expenses` array.
fn read_expenses(path: &Path) -> anyhow::Result<Vec<ExpenseRecord>> {
    let value = read_json(path)?;
    let list = match value {
        Value::Object(mut object) => object.remove("expenses").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(list)
        .with_context(|| format!("{} does not hold a list of expenses", path.display()))
}

/// Accepts a bare breakdown or anything with a `budget_breakdown` field.
fn read_breakdown(path: &Path) -> anyhow::Result<BudgetBreakdown> {
    let value = read_json(path)?;
    Ok(match value.get("budget_breakdown") {
        Some(nested) => BudgetBreakdown::from_value(Some(nested)),
        None => BudgetBreakdown::from_value(Some(&value)),
    })
}
