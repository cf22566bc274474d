use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clauseguard_core::analysis::AnalysisType;
use clauseguard_core::listing::{SortKey, StatusFilter};

#[derive(Debug, Parser)]
#[command(name = "clauseguard")]
#[command(about = "Upload contracts and review their risk analysis", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep the session in memory only; nothing is written to the keyring
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        /// Read from the terminal when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Send a password reset email
    ResetPassword {
        email: String,
        /// Origin the reset link should return to
        #[arg(long)]
        origin: Option<String>,
    },
    /// Change the password of the signed-in user
    ChangePassword,
    /// Print the OAuth sign-in URL for an identity provider
    ProviderUrl {
        provider: String,
        #[arg(long, default_value = "http://localhost:3000")]
        origin: String,
    },
    /// Show or change the stored connection settings
    Config {
        /// Backend base URL, e.g. https://api.example.com/api/v1
        #[arg(long)]
        api_base: Option<String>,
        /// Identity provider URL
        #[arg(long)]
        supabase_url: Option<String>,
        /// Identity provider public (anon) key
        #[arg(long)]
        supabase_anon_key: Option<String>,
    },
    /// Contract counts, risk distribution and recent activity
    Dashboard,
    /// List contracts
    List {
        #[arg(long, default_value = "")]
        search: String,
        /// all, uploaded, processing, analyzed or error
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// created_at, name, size or status
        #[arg(long, default_value = "created_at")]
        sort: SortKey,
    },
    /// Upload a PDF, DOCX, DOC or TXT file (10MB max)
    Upload { path: PathBuf },
    /// Analyze a contract and wait for the result
    Analyze {
        id: String,
        /// small_business, individual or comprehensive
        #[arg(long = "type", default_value = "small_business")]
        analysis_type: AnalysisType,
    },
    /// Show a contract's analysis
    Show { id: String },
    /// Delete a contract
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Save the original document
    Download { id: String, dest: PathBuf },
}

impl Commands {
    /// Route the equivalent screen lives at; `None` for commands that work signed out.
    pub fn route(&self) -> Option<String> {
        match self {
            Commands::Login { .. }
            | Commands::Signup { .. }
            | Commands::Logout
            | Commands::ResetPassword { .. }
            | Commands::ProviderUrl { .. }
            | Commands::Config { .. } => None,
            Commands::Whoami | Commands::ChangePassword => Some("/account".into()),
            Commands::Dashboard => Some("/".into()),
            Commands::List { .. } | Commands::Delete { .. } | Commands::Download { .. } => {
                Some("/contracts".into())
            }
            Commands::Upload { .. } => Some("/upload".into()),
            Commands::Analyze { id, .. } | Commands::Show { id } => {
                Some(format!("/contracts/{id}/analysis"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_filters() {
        let cli = Cli::parse_from([
            "clauseguard",
            "list",
            "--status",
            "analyzed",
            "--sort",
            "name",
            "--search",
            "lease",
        ]);
        match cli.command {
            Some(Commands::List {
                search,
                status,
                sort,
            }) => {
                assert_eq!(search, "lease");
                assert!(matches!(status, StatusFilter::Only(_)));
                assert_eq!(sort, SortKey::Name);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn analyze_defaults_to_small_business() {
        let cli = Cli::parse_from(["clauseguard", "--ephemeral", "analyze", "7"]);
        assert!(cli.ephemeral);
        match cli.command {
            Some(Commands::Analyze { id, analysis_type }) => {
                assert_eq!(id, "7");
                assert_eq!(analysis_type, AnalysisType::SmallBusiness);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(Cli::try_parse_from(["clauseguard", "list", "--status", "archived"]).is_err());
    }

    #[test]
    fn config_takes_connection_flags() {
        let cli = Cli::parse_from([
            "clauseguard",
            "config",
            "--api-base",
            "https://api.example.com/api/v1",
        ]);
        let command = cli.command.unwrap();
        assert_eq!(command.route(), None);
        match command {
            Commands::Config {
                api_base,
                supabase_url,
                supabase_anon_key,
            } => {
                assert_eq!(api_base.as_deref(), Some("https://api.example.com/api/v1"));
                assert!(supabase_url.is_none() && supabase_anon_key.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn guarded_commands_map_to_routes() {
        let show = Commands::Show { id: "3".into() };
        assert_eq!(show.route().as_deref(), Some("/contracts/3/analysis"));
        assert_eq!(Commands::Logout.route(), None);
    }
}
