//! Command-line interface. Running without a subcommand starts the service.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::analysis::{AnalysisEngine, AnalysisRequest};
use crate::config::Config;
use crate::global;
use crate::meeting::{Meeting, MeetingStatus, MeetingStore, SqliteMeetingStore};
use crate::recording::export_transcript;

#[derive(Parser, Debug)]
#[command(name = "scrumscribe")]
#[command(about = "Meeting voice capture and action-item extraction", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Analyze a saved transcript file and print the report
    Analyze(AnalyzeCliArgs),
    /// Export a stored meeting's transcript to a file
    Export(ExportCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct AnalyzeCliArgs {
    /// Path to a transcript text file
    pub transcript: PathBuf,
    /// Meeting title used as analysis context
    #[arg(short, long, default_value = "Ad-hoc meeting")]
    pub title: String,
    /// Override the configured analysis provider (keyword or openai-api)
    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct ExportCliArgs {
    /// Meeting id to export
    pub id: String,
    /// Output directory (defaults to the configured export dir)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Offline analysis of a transcript file, no service required.
pub async fn handle_analyze_command(args: AnalyzeCliArgs, config: &Config) -> Result<()> {
    let transcript = std::fs::read_to_string(&args.transcript)
        .with_context(|| format!("Failed to read transcript file {:?}", args.transcript))?;

    let provider = args
        .provider
        .as_deref()
        .unwrap_or(&config.analysis.provider);
    let engine = AnalysisEngine::with_provider(provider, &config.analysis)?;

    let meeting = Meeting {
        id: "ad-hoc".to_string(),
        title: args.title,
        meeting_type: "ad-hoc".to_string(),
        description: String::new(),
        scheduled_date: String::new(),
        scheduled_time: String::new(),
        project_id: None,
        sprint_id: None,
        status: MeetingStatus::InProgress,
        transcript: String::new(),
        action_items: Vec::new(),
    };

    let report = engine
        .analyze(AnalysisRequest {
            transcript: &transcript,
            meeting: &meeting,
            projects: &[],
            sprints: &[],
        })
        .await?;

    println!("{}", report.summary);
    println!();

    for item in &report.action_items {
        println!(
            "[{}] ({}) {}",
            item.item_type.as_str(),
            item.priority.as_str(),
            item.title
        );
        if let Some(assignee) = &item.assignee {
            println!("    assignee: {}", assignee);
        }
        if let Some(due_date) = &item.due_date {
            println!("    due:      {}", due_date);
        }
    }

    if report.dropped > 0 {
        println!();
        println!("({} suggestions dropped during validation)", report.dropped);
    }

    Ok(())
}

/// Write a stored meeting's transcript to a file.
pub async fn handle_export_command(args: ExportCliArgs, config: &Config) -> Result<()> {
    let store = SqliteMeetingStore::open_default()?;
    let meeting = store
        .get(&args.id)
        .await?
        .with_context(|| format!("Meeting {} not found", args.id))?;

    let dir = match args.out.or_else(|| config.behavior.export_dir.clone()) {
        Some(dir) => dir,
        None => global::exports_dir()?,
    };

    let path = export_transcript(&meeting.transcript, &meeting.title, &dir)?;
    println!("Exported transcript to {}", path.display());
    Ok(())
}
