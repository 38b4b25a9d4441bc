use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::convert::{self, ConvertOptions};
use crate::commands::history::{self, HistoryAction, build_patch};
use crate::commands::{CommandReport, status};
use crate::logging;
use crate::sql2es::history::HistoryQuery;
use crate::sql2es::pipeline::ConversionKind;

#[derive(Debug, Parser)]
#[command(
    name = "sql2es",
    version,
    about = "Convert SQL into Elasticsearch query DSL or curl commands using an LLM"
)]
struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert SQL into an HTTP method/path line followed by the query DSL
    Convert(ConvertArgs),
    /// Convert SQL into a ready-to-run curl command
    Curl(ConvertArgs),
    /// Inspect and edit saved conversions
    #[command(subcommand)]
    History(HistoryCommand),
    /// Show resolved paths and effective configuration
    Status,
}

#[derive(Debug, Args)]
struct ConvertArgs {
    /// SQL text; read from --file or stdin when omitted
    sql: Option<String>,

    /// Read SQL from a file
    #[arg(long, conflicts_with = "sql")]
    file: Option<PathBuf>,

    /// Do not save the conversion to history
    #[arg(long)]
    no_history: bool,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    /// List records, newest first
    List {
        /// Case-insensitive text to look for in SQL and results
        #[arg(long)]
        search: Option<String>,
        /// Only show `dsl` or `curl` records
        #[arg(long = "type")]
        kind: Option<ConversionKind>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one record in full
    Show { id: String },
    /// Edit the result fields of a record
    Edit {
        id: String,
        #[arg(long)]
        es_query: Option<String>,
        #[arg(long)]
        api_path: Option<String>,
        #[arg(long)]
        curl_command: Option<String>,
        /// JSON object with esQuery / apiPath / curlCommand keys
        #[arg(long)]
        patch: Option<String>,
    },
    /// Delete one record
    Delete { id: String },
    /// Delete every record
    Clear,
    /// Print the number of stored records
    Count,
}

impl ConvertArgs {
    fn into_options(self, kind: ConversionKind) -> ConvertOptions {
        ConvertOptions {
            kind,
            sql: self.sql,
            file: self.file,
            save_history: !self.no_history,
        }
    }
}

fn history_action(command: HistoryCommand) -> Result<HistoryAction> {
    Ok(match command {
        HistoryCommand::List {
            search,
            kind,
            offset,
            limit,
        } => HistoryAction::List(HistoryQuery {
            search,
            kind,
            offset,
            limit,
        }),
        HistoryCommand::Show { id } => HistoryAction::Show { id },
        HistoryCommand::Edit {
            id,
            es_query,
            api_path,
            curl_command,
            patch,
        } => HistoryAction::Edit {
            id,
            patch: build_patch(patch.as_deref(), es_query, api_path, curl_command)?,
        },
        HistoryCommand::Delete { id } => HistoryAction::Delete { id },
        HistoryCommand::Clear => HistoryAction::Clear,
        HistoryCommand::Count => HistoryAction::Count,
    })
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match &report.output {
        Some(output) => {
            println!("{output}");
            for detail in &report.details {
                eprintln!("  {detail}");
            }
        }
        None => {
            println!("{}:", report.command);
            for detail in &report.details {
                println!("  {detail}");
            }
        }
    }
    for issue in &report.issues {
        eprintln!("issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let report = match cli.command {
        Command::Convert(args) => convert::run(&args.into_options(ConversionKind::Dsl))?,
        Command::Curl(args) => convert::run(&args.into_options(ConversionKind::Curl))?,
        Command::History(command) => history::run(&history_action(command)?)?,
        Command::Status => status::run()?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} finished with {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
