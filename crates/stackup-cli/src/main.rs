use std::process::ExitCode;
use std::time::Duration;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use stackup_aws::CloudFormationService;
use stackup_core::config::{DEFAULT_CHANGESET_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_STACK_TIMEOUT};
use stackup_core::{
    parse_multiline, run, running_in_actions, ActionInputs, ActionsReporter, Reporter,
    TracingReporter, UpdateConfig,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "stackup_cli=info,stackup_core=info,stackup_aws=info";
const VERBOSE_LOG_FILTER: &str = "stackup_cli=debug,stackup_core=debug,stackup_aws=debug";

fn cli() -> Command {
    Command::new("stackup")
        .version(stackup_core::VERSION)
        .about("Update a CloudFormation stack through a change set")
        .arg(
            Arg::new("stack-name")
                .long("stack-name")
                .env("INPUT_STACK-NAME")
                .help("Name of the stack to update"),
        )
        .arg(
            Arg::new("parameter-overrides")
                .long("parameter-overrides")
                .env("INPUT_PARAMETER-OVERRIDES")
                .action(ArgAction::Append)
                .help("KEY=VALUE overrides, newline separated or repeated; other parameters keep their value"),
        )
        .arg(
            Arg::new("capabilities")
                .long("capabilities")
                .env("INPUT_CAPABILITIES")
                .action(ArgAction::Append)
                .help("Capabilities to acknowledge, e.g. CAPABILITY_IAM"),
        )
        .arg(
            Arg::new("role-arn")
                .long("role-arn")
                .env("INPUT_ROLE-ARN")
                .help("IAM role CloudFormation assumes for the update"),
        )
        .arg(
            Arg::new("region")
                .long("region")
                .help("AWS region; defaults to the standard region chain"),
        )
        .arg(
            Arg::new("changeset-timeout")
                .long("changeset-timeout")
                .default_value("1800")
                .value_parser(value_parser!(u64))
                .help("Seconds to wait for the change set to be created (at most 604800)"),
        )
        .arg(
            Arg::new("stack-timeout")
                .long("stack-timeout")
                .default_value("43200")
                .value_parser(value_parser!(u64))
                .help("Seconds to wait for the stack update to complete (at most 604800)"),
        )
        .arg(
            Arg::new("poll-interval")
                .long("poll-interval")
                .default_value("10")
                .value_parser(value_parser!(u64))
                .help("Minimum seconds between status polls when polling locally; CloudFormation waiters use the service's own delays"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
}

fn multiline_values(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .into_iter()
        .flatten()
        .flat_map(|value| parse_multiline(value))
        .collect()
}

fn inputs_from(matches: &ArgMatches) -> ActionInputs {
    ActionInputs {
        stack_name: matches.get_one::<String>("stack-name").cloned().unwrap_or_default(),
        parameter_overrides: multiline_values(matches, "parameter-overrides"),
        capabilities: multiline_values(matches, "capabilities"),
        role_arn: matches.get_one::<String>("role-arn").cloned(),
    }
}

fn seconds(matches: &ArgMatches, id: &str, default: Duration) -> Duration {
    matches
        .get_one::<u64>(id)
        .map_or(default, |secs| Duration::from_secs(*secs))
}

fn config_from(matches: &ArgMatches) -> UpdateConfig {
    UpdateConfig::new()
        .with_changeset_timeout(seconds(matches, "changeset-timeout", DEFAULT_CHANGESET_TIMEOUT))
        .with_stack_timeout(seconds(matches, "stack-timeout", DEFAULT_STACK_TIMEOUT))
        .with_poll_interval(seconds(matches, "poll-interval", DEFAULT_POLL_INTERVAL))
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    // stdout carries workflow commands when running as an Actions step
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"))?;

    let inputs = inputs_from(&matches);
    let config = config_from(&matches);
    tracing::debug!(?config, "wait budgets");
    let reporter: Box<dyn Reporter> = if running_in_actions() {
        Box::new(ActionsReporter)
    } else {
        Box::new(TracingReporter)
    };

    let service = CloudFormationService::from_env(matches.get_one::<String>("region").cloned()).await;

    // failures have already been reported
    match run(&service, reporter.as_ref(), &inputs, config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
