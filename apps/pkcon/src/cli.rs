//! Command line interface definition

use clap::{Parser, Subcommand, ValueEnum};
use pkc_client::{Command, SearchKind};
use pkc_types::{ColorChoice, FilterSet, ProgressMode, Role, SigType};
use std::path::PathBuf;

/// pkcon - console client for the package service
#[derive(Parser)]
#[command(name = "pkcon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Console client for the package service")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Filter packages, e.g. "installed;~devel"
    #[arg(long, global = true, value_name = "FILTERS")]
    pub filter: Option<FilterSet>,

    /// Exit once the request is issued instead of waiting for it
    #[arg(long, global = true)]
    pub nowait: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write JSON debug logs to the log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Progress bar control
    #[arg(long, global = true, value_enum)]
    pub progress: Option<ProgressMode>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Service socket to connect to
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SearchBy {
    Name,
    Details,
    Group,
    File,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Install a package by name, or a local package file
    Install {
        /// Package name, package id or path to a package file
        package: String,
    },

    /// Install a repository signing key
    #[command(name = "install-sig")]
    InstallSig {
        /// Signature type (gpg)
        sig_type: SigType,
        key_id: String,
        /// Package id the key was requested for
        package_id: String,
    },

    /// Remove a package
    Remove { package: String },

    /// Update a package, or the whole system when none is given
    Update { package: Option<String> },

    /// Refresh the package cache
    Refresh {
        /// Refresh even if the cache is fresh
        #[arg(long)]
        force: bool,
    },

    /// List packages matching a name exactly
    Resolve { package: String },

    /// Search packages
    Search {
        #[arg(value_enum)]
        by: SearchBy,
        term: String,
    },

    /// List packages providing a codec
    WhatProvides { term: String },

    /// List what a package depends on
    GetDepends { package: String },

    /// List installed packages depending on a package
    GetRequires { package: String },

    GetDescription { package: String },

    GetFiles { package: String },

    GetUpdateDetail { package: String },

    /// List available updates
    GetUpdates,

    GetPackages,

    RepoList,

    RepoEnable { repo_id: String },

    RepoDisable { repo_id: String },

    RepoSetData {
        repo_id: String,
        parameter: String,
        value: String,
    },

    /// Show the most recent transactions
    GetTransactions,

    /// Time since the service last performed an action
    GetTime {
        /// Role, e.g. refresh-cache
        role: Role,
    },

    /// List the roles the service supports
    GetActions,

    GetFilters,

    GetGroups,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Install { package } => Command::Install { package },
            Commands::InstallSig {
                sig_type,
                key_id,
                package_id,
            } => Command::InstallSignature {
                sig_type,
                key_id,
                package_id,
            },
            Commands::Remove { package } => Command::Remove { package },
            Commands::Update { package } => Command::Update { package },
            Commands::Refresh { force } => Command::Refresh { force },
            Commands::Resolve { package } => Command::Resolve { package },
            Commands::Search { by, term } => Command::Search {
                kind: match by {
                    SearchBy::Name => SearchKind::Name,
                    SearchBy::Details => SearchKind::Details,
                    SearchBy::Group => SearchKind::Group,
                    SearchBy::File => SearchKind::File,
                },
                term,
            },
            Commands::WhatProvides { term } => Command::WhatProvides { term },
            Commands::GetDepends { package } => Command::GetDepends { package },
            Commands::GetRequires { package } => Command::GetRequires { package },
            Commands::GetDescription { package } => Command::GetDescription { package },
            Commands::GetFiles { package } => Command::GetFiles { package },
            Commands::GetUpdateDetail { package } => Command::GetUpdateDetail { package },
            Commands::GetUpdates => Command::GetUpdates,
            Commands::GetPackages => Command::GetPackages,
            Commands::RepoList => Command::RepoList,
            Commands::RepoEnable { repo_id } => Command::RepoEnable { repo_id },
            Commands::RepoDisable { repo_id } => Command::RepoDisable { repo_id },
            Commands::RepoSetData {
                repo_id,
                parameter,
                value,
            } => Command::RepoSetData {
                repo_id,
                parameter,
                value,
            },
            Commands::GetTransactions => Command::GetTransactions,
            Commands::GetTime { role } => Command::GetTime { role },
            Commands::GetActions => Command::GetActions,
            Commands::GetFilters => Command::GetFilters,
            Commands::GetGroups => Command::GetGroups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_filter_after_subcommand() {
        let cli = Cli::try_parse_from(["pkcon", "get-packages", "--filter", "installed;~devel"])
            .unwrap();
        assert_eq!(cli.global.filter.unwrap().to_string(), "installed;~devel");
        assert!(matches!(cli.command, Commands::GetPackages));
    }

    #[test]
    fn test_search_and_time_arguments() {
        let cli = Cli::try_parse_from(["pkcon", "search", "details", "editor"]).unwrap();
        assert_eq!(
            Command::from(cli.command),
            Command::Search {
                kind: SearchKind::Details,
                term: "editor".into()
            }
        );

        let cli = Cli::try_parse_from(["pkcon", "get-time", "refresh-cache"]).unwrap();
        assert_eq!(
            Command::from(cli.command),
            Command::GetTime {
                role: Role::RefreshCache
            }
        );

        assert!(Cli::try_parse_from(["pkcon", "get-time", "bogus"]).is_err());
    }
}
