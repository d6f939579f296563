//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use canvass_core::models::{CampaignScope, CampaignSort};

#[derive(Debug, Parser)]
#[command(name = "canvass", version, about = "Canvass campaign-engagement client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(long, env = "CANVASS_EMAIL")]
        email: Option<String>,
    },
    /// Create an account and log in
    Register(RegisterArgs),
    /// Clear the stored session
    Logout,
    /// Show the logged-in user and points balance
    Whoami,
    /// List campaign messages
    Campaigns {
        #[arg(long, value_enum, default_value_t = ScopeArg::National)]
        scope: ScopeArg,
        #[arg(long, value_enum, default_value_t = SortArg::Latest)]
        sort: SortArg,
    },
    /// Like or unlike a campaign message
    Like { id: String },
    /// Share a campaign message
    Share { id: String },
    /// Show points balance and withdrawal history
    Points,
    /// Request a cash withdrawal in cedis
    Withdraw {
        amount: f64,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        network: String,
    },
    /// List regions
    Regions,
    /// List constituencies in a region
    Constituencies { region: String },
    /// Manage the profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProfileCommand {
    /// Change name or phone number
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, env = "CANVASS_EMAIL")]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub constituency: Option<String>,
    /// Profile picture (PNG or JPEG)
    #[arg(long)]
    pub avatar: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    Constituency,
    Region,
    National,
}

impl From<ScopeArg> for CampaignScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Constituency => CampaignScope::Constituency,
            ScopeArg::Region => CampaignScope::Region,
            ScopeArg::National => CampaignScope::National,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Latest,
    Popular,
}

impl From<SortArg> for CampaignSort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Latest => CampaignSort::Latest,
            SortArg::Popular => CampaignSort::Popular,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_withdraw() {
        let cli = Cli::try_parse_from(["canvass", "withdraw", "10.5", "--phone", "0244123456", "--network", "MTN"])
            .expect("parse");
        match cli.command {
            Command::Withdraw { amount, phone, network } => {
                assert_eq!(amount, 10.5);
                assert_eq!(phone, "0244123456");
                assert_eq!(network, "MTN");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_campaign_defaults() {
        let cli = Cli::try_parse_from(["canvass", "campaigns", "--sort", "popular"]).expect("parse");
        match cli.command {
            Command::Campaigns { scope, sort } => {
                assert_eq!(CampaignScope::from(scope), CampaignScope::National);
                assert_eq!(CampaignSort::from(sort), CampaignSort::Popular);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_withdraw_requires_phone() {
        assert!(Cli::try_parse_from(["canvass", "withdraw", "5", "--network", "MTN"]).is_err());
    }
}
