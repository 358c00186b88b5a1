use std::{collections::HashMap, io::Write, path::PathBuf, process::exit, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use itertools::Itertools;
use jenkins_jobs::{
    client::{BuildWatcher, ClientConfig, JobsClient},
    config::{default_config_path, load_config, save_config, CliConfig},
    domain::BuildResult,
    id::BuildNumber,
    logging::{init_logging, LoggingConfig},
    result::{CliError, Result},
};
use tracing_appender::non_blocking::WorkerGuard;

/// Manage Jenkins jobs and builds from the command line
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Alternate path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the path to the configuration file and exit.
    #[arg(short, long)]
    print_config_path: bool,
    /// Log raw HTTP responses to the `responses` folder of the log directory
    #[arg(long)]
    debug: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store server URL and credentials in the configuration file
    Configure {
        url: String,
        user: String,
        token: String,
    },
    /// List all jobs
    List,
    /// Show server-wide information
    Info,
    /// Create a job from an XML definition
    Create { name: String, xml_file: PathBuf },
    /// Replace the XML definition of a job
    Update { name: String, xml_file: PathBuf },
    /// Print the XML definition of a job
    Xml { name: String },
    /// Show job details
    Details { name: String },
    /// Trigger a build
    Build {
        name: String,
        /// Build parameter, repeatable
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// Wait for the build to finish
        #[arg(short, long)]
        wait: bool,
        /// Stream the console log until the build finishes
        #[arg(short, long)]
        follow: bool,
    },
    /// Abort a running build
    Stop { name: String, number: BuildNumber },
    /// Print the console log of a build
    Log {
        name: String,
        number: BuildNumber,
        /// Keep streaming until the build finishes
        #[arg(short, long)]
        follow: bool,
    },
    /// Show build details; defaults to the last build
    BuildDetails { name: String, number: Option<BuildNumber> },
    /// Delete jobs
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Enable a job
    Enable { name: String },
    /// Disable a job
    Disable { name: String },
}

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install panic handler: {e}");
    }

    let args = Args::parse();
    if let Err(e) = run(args) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("error: {e}");
        exit(e.exit_code());
    }
}

fn run(args: Args) -> Result<()> {
    let config_path = args.config.unwrap_or_else(default_config_path);

    if args.print_config_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let config = load_config(&config_path)?.with_env_overrides();
    let _log_guard = initialize_logging(&config)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "jenkins-jobs starting");

    if let Command::Configure { url, user, token } = command {
        let updated = CliConfig { jenkins_url: url, jenkins_user: user, jenkins_token: token, ..config };
        ClientConfig::try_from(updated.clone())?;
        save_config(&config_path, &updated)?;
        println!("Saved configuration to {}", config_path.display());
        return Ok(());
    }

    let client_config = ClientConfig::try_from(config)?.with_debug_logging(args.debug);
    let api = Arc::new(JobsClient::new(client_config)?);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(execute(api, command))
}

fn initialize_logging(config: &CliConfig) -> Result<Option<WorkerGuard>> {
    let logging_config = LoggingConfig::from_env().with_level_setting(config.log_level.as_deref());
    init_logging(logging_config).map_err(|e| CliError::LoggingError(e.to_string()))
}

async fn execute(api: Arc<JobsClient>, command: Command) -> Result<()> {
    match command {
        Command::Configure { .. } => Ok(()),
        Command::List => {
            for job in api.list_all().await? {
                println!("{:<40} {}", job.name, job.color.as_deref().unwrap_or("-"));
            }
            Ok(())
        },
        Command::Info => {
            let info = api.get_all().await?;
            println!("version:   {}", info.version.as_deref().unwrap_or("unknown"));
            println!("mode:      {}", info.mode.as_deref().unwrap_or("-"));
            println!("executors: {}", info.num_executors);
            println!("security:  {}", info.use_security);
            println!("jobs:      {}", info.job_count());
            Ok(())
        },
        Command::Create { name, xml_file } => {
            let xml = std::fs::read_to_string(xml_file)?;
            api.create(&name, &xml).await?;
            println!("Created job {name}");
            Ok(())
        },
        Command::Update { name, xml_file } => {
            let xml = std::fs::read_to_string(xml_file)?;
            api.update_xml(&name, &xml).await?;
            println!("Updated job {name}");
            Ok(())
        },
        Command::Xml { name } => {
            print!("{}", api.get_xml(&name).await?);
            Ok(())
        },
        Command::Details { name } => {
            let details = api.get_details(&name).await?;
            println!("name:        {}", details.name);
            println!("description: {}", details.description.as_deref().unwrap_or(""));
            println!("buildable:   {}", details.buildable);
            println!("in queue:    {}", details.in_queue);
            println!(
                "builds:      {}",
                details.builds.iter().map(|b| format!("#{}", b.number)).join(", ")
            );
            Ok(())
        },
        Command::Build { name, params, wait, follow } => {
            let params = parse_params(&params)?;
            build(api, &name, params, wait, follow).await
        },
        Command::Stop { name, number } => {
            api.stop(&name, number).await?;
            println!("Stop requested for {name} #{number}");
            Ok(())
        },
        Command::Log { name, number, follow } => {
            if follow {
                follow_log(api, &name, number).await?;
            } else {
                print!("{}", api.get_log_text(&name, number).await?);
            }
            Ok(())
        },
        Command::BuildDetails { name, number } => {
            let detail = match number {
                Some(number) => api.get_build_details(&name, number).await?,
                None => api.get_last_build_details(&name).await?,
            };
            println!("number:    #{}", detail.number);
            println!(
                "result:    {}",
                detail.result.map_or("IN PROGRESS".to_string(), |r| r.to_string())
            );
            println!("started:   {}", detail.timestamp.to_rfc3339());
            println!("duration:  {}s", detail.duration().num_seconds());
            Ok(())
        },
        Command::Delete { names } => {
            let report = api.batch_del(&names).await;
            for name in report.deleted() {
                println!("Deleted {name}");
            }
            let mut failed = 0;
            for (name, e) in report.failed() {
                eprintln!("{name}: {e}");
                failed += 1;
            }
            if failed > 0 {
                return Err(CliError::PartialDelete { failed, requested: names.len() });
            }
            Ok(())
        },
        Command::Enable { name } => {
            api.enable(&name).await?;
            println!("Enabled {name}");
            Ok(())
        },
        Command::Disable { name } => {
            api.disable(&name).await?;
            println!("Disabled {name}");
            Ok(())
        },
    }
}

async fn build(
    api: Arc<JobsClient>,
    name: &str,
    params: HashMap<String, String>,
    wait: bool,
    follow: bool,
) -> Result<()> {
    // fallback for servers that omit the queue Location header
    let next = api
        .get_details(name)
        .await?
        .next_build_number
        .unwrap_or_else(|| BuildNumber::new(1));

    let trigger = if params.is_empty() {
        api.build(name).await?
    } else {
        api.build_with_params(name, &params).await?
    };

    let number = match trigger.queue_item {
        Some(item) => {
            println!("Queued {name} (queue item {item})");
            if !(wait || follow) {
                return Ok(());
            }
            let number = BuildWatcher::from_api(api.clone()).wait_for_start(item).await?;
            println!("Started {name} #{number}");
            number
        },
        None => {
            println!("Queued {name} #{next}");
            next
        },
    };

    if follow {
        follow_log(api.clone(), name, number).await?;
    }

    if wait || follow {
        let detail = BuildWatcher::from_api(api).wait_for_completion(name, number).await?;
        println!("{name} #{number}: {}", detail.result.unwrap_or(BuildResult::Unknown));
    }

    Ok(())
}

async fn follow_log(api: Arc<JobsClient>, name: &str, number: BuildNumber) -> Result<()> {
    let watcher = BuildWatcher::from_api(api);
    let mut stdout = std::io::stdout();
    watcher
        .follow_log(name, number, |chunk| {
            let _ = stdout.write_all(chunk.as_bytes());
            let _ = stdout.flush();
        })
        .await?;
    Ok(())
}

fn parse_params(params: &[String]) -> Result<HashMap<String, String>> {
    params
        .iter()
        .map(|p| match p.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(CliError::InvalidParameter(p.clone())),
        })
        .collect()
}
