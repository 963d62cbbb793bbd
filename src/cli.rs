//! CLI definitions for the mosaic operator tool
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{Parser, Subcommand};

use crate::domain::Environment;

#[derive(Parser)]
#[command(
    name = "mosaic",
    version,
    about = "Operator CLI for the Mosaic WordPress multisite platform",
    long_about = "Migrates the multisite database and media assets between environments,\n\
                  rewrites stored URLs and tenant domains for the destination, and wraps\n\
                  the day-to-day operator chores around the fleet."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Migrate the database (and media) from one environment to another
    Migrate {
        /// Environment you are migrating from
        source: Environment,

        /// Environment you are copying to
        target: Environment,

        /// Restrict the whole migration to one site
        #[arg(long)]
        blog_id: Option<u64>,

        /// Keep production domains instead of collapsing them onto the
        /// platform domain
        #[arg(long)]
        keep_prod_domain: bool,

        /// Skip mirroring the media store after import
        #[arg(long)]
        skip_media: bool,
    },

    /// Export or import the multisite database
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// List all sites in the multisite installation
    Sites {
        /// Environment to list from (default: current kubectl context)
        #[arg(long)]
        env: Option<Environment>,
    },

    /// Display deployment history of the multisite in the current environment
    Releases,

    /// Roll the wordpress release back to a revision (default: previous)
    Rollback {
        /// Revision number to roll back to
        #[arg(long)]
        revision: Option<u32>,
    },

    /// Display current terminal connection details to the cluster
    Status {
        /// Also locate and decode the namespace's WordPress secrets
        #[arg(long)]
        secrets: bool,
    },

    /// Switch the current kubectl context between environments
    Switch {
        /// Environment you are switching to
        target: Environment,
    },

    /// Shell into the first WordPress pod of an environment
    Jump {
        /// Environment you want a shell in
        target: Environment,
    },

    /// Move media assets between a bucket and the local installation
    S3 {
        #[command(subcommand)]
        command: S3Commands,
    },

    /// One-time operator machine setup
    Setup {
        #[command(subcommand)]
        command: SetupCommands,
    },
}

/// Database subcommands
#[derive(Subcommand)]
pub enum DbCommands {
    /// Export the database in .sql format to the current directory
    Export {
        /// Environment you are exporting from
        target: Environment,

        /// Export only one site's table set
        #[arg(long)]
        blog_id: Option<u64>,
    },

    /// Import a .sql dump, rewriting it for the target environment
    Import {
        /// Environment you are importing into
        target: Environment,

        /// Path to the database dump
        file: String,

        /// Site to import a single-site dump into
        #[arg(long)]
        blog_id: Option<u64>,

        /// Also sync media assets and rewrite bucket references
        #[arg(long)]
        s3_sync: bool,
    },
}

/// S3 asset subcommands
#[derive(Subcommand)]
pub enum S3Commands {
    /// Download bucket assets into the local wordpress/wp-content tree
    Download {
        /// Bucket name
        bucket: String,

        /// AWS profile to use
        profile: String,

        /// Restrict to one site's uploads
        #[arg(long)]
        blog_id: Option<u64>,
    },

    /// Upload local wordpress/wp-content/uploads into a bucket
    Upload {
        /// Bucket name
        bucket: String,

        /// AWS profile to use
        profile: String,

        /// Restrict to one site's uploads
        #[arg(long)]
        blog_id: Option<u64>,
    },
}

/// Setup subcommands
#[derive(Subcommand)]
pub enum SetupCommands {
    /// Create AWS CLI profiles from the current namespace's secrets
    CreateProfiles,
}
