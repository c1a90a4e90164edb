//! Command-line interface for ip
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use clap::{Parser, Subcommand};

use crate::error::Result;

mod start;
mod sync;
mod trackers;

/// ip - Issue Tracker to Planner Sync
///
/// A CLI that mirrors issues from external issue trackers into GNOME
/// Planner documents as a tree of projects, milestones, and issue tasks.
#[derive(Parser, Debug)]
#[command(name = "ip")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to an .ip.toml config file (defaults to one next to the document)
    #[arg(long, global = true, env = "IP_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch tracker issues and sync them into a planner document
    Sync {
        /// Planner document to update
        file: std::path::PathBuf,

        /// Only sync the tracker with this prefix
        #[arg(long)]
        tracker: Option<String>,

        /// Fetch and classify but do not write the document
        #[arg(long)]
        dry_run: bool,

        /// Write the synced document to a different path
        #[arg(long)]
        output: Option<std::path::PathBuf>,
    },

    /// List tracker declarations in a planner document
    Trackers {
        /// Planner document to inspect
        file: std::path::PathBuf,
    },

    /// Recompute the project start date from scheduled tasks
    Start {
        /// Planner document to inspect
        file: std::path::PathBuf,

        /// Persist the recomputed date back to the document
        #[arg(long)]
        write: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Sync {
                file,
                tracker,
                dry_run,
                output,
            } => sync::run(sync::SyncOptions {
                file,
                tracker,
                dry_run,
                output,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Trackers { file } => trackers::run(trackers::TrackersOptions {
                file,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Start { file, write } => start::run(start::StartOptions {
                file,
                write,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
