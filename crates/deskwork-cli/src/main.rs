#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;
mod validate;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::Context;
use deskwork_core::config;
use deskwork_core::error::ErrorCode;
use output::{CliError, OutputMode, render_error};
use std::env;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "dw: helpdesk ticket assignment, customers, and reports",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for deskwork crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user (skips env resolution).
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a deskwork project",
        long_about = "Create .deskwork/ with a default config and a migrated database.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    dw init"
    )]
    Init(cmd::init::InitArgs),

    #[command(next_help_heading = "Setup", about = "Manage helpdesk users")]
    User {
        #[command(subcommand)]
        command: cmd::user::UserCommand,
    },

    #[command(
        next_help_heading = "Tickets",
        about = "Create, show, list, and re-status tickets",
        after_help = "EXAMPLES:\n    # Open a ticket\n    \
                      dw ticket create --subject \"Printer offline\" --customer acme\n\n    \
                      # Show it as JSON\n    dw ticket show TKT-00001 --json"
    )]
    Ticket {
        #[command(subcommand)]
        command: cmd::ticket::TicketCommand,
    },

    #[command(
        next_help_heading = "Assignment",
        about = "Start work on a ticket",
        long_about = "Assign the ticket to the acting user and mark it In Progress. \
                      Refused when someone else already holds an open assignment.",
        after_help = "EXAMPLES:\n    dw --user alice start TKT-00001"
    )]
    Start(cmd::lifecycle::TicketArgs),

    #[command(
        next_help_heading = "Assignment",
        about = "Close a ticket you are working",
        after_help = "EXAMPLES:\n    dw --user alice close TKT-00001"
    )]
    Close(cmd::lifecycle::TicketArgs),

    #[command(
        next_help_heading = "Assignment",
        about = "Show the ticket's action button as seen by the acting user"
    )]
    Button(cmd::lifecycle::TicketArgs),

    #[command(
        next_help_heading = "Assignment",
        about = "Show the 'assigned to someone else' alert for a ticket"
    )]
    Alert(cmd::lifecycle::TicketArgs),

    #[command(
        next_help_heading = "Assignment",
        about = "Remove users from a ticket's assignee list",
        long_about = "Remove users from the assignee list and cancel their assignments. \
                      Administrators may remove anyone; others only themselves.",
        after_help = "EXAMPLES:\n    dw --user root unassign TKT-00001 alice"
    )]
    Unassign(cmd::lifecycle::UnassignArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Add a comment to a ticket, or list its comments"
    )]
    Comment(cmd::comment::CommentArgs),

    #[command(next_help_heading = "Customers", about = "Search and maintain customers")]
    Customer {
        #[command(subcommand)]
        command: cmd::customer::CustomerCommand,
    },

    #[command(next_help_heading = "Catalogue", about = "List and register support teams")]
    Team {
        #[command(subcommand)]
        command: cmd::catalog::TeamCommand,
    },

    #[command(
        next_help_heading = "Catalogue",
        about = "Show and maintain products",
        after_help = "EXAMPLES:\n    \
                      dw product save Ledger --team Billing --description \"Accounting suite\""
    )]
    Product {
        #[command(subcommand)]
        command: cmd::catalog::ProductCommand,
    },

    #[command(next_help_heading = "Reports", about = "Ticket and AMC reports")]
    Report {
        #[command(subcommand)]
        command: cmd::report::ReportCommand,
    },

    #[command(
        next_help_heading = "Field Work",
        about = "Record the acting user's location on a ticket",
        after_help = "EXAMPLES:\n    dw --user alice location TKT-00001 --lat 9.9312 --lng 76.2673"
    )]
    Location(cmd::location::LocationArgs),

    #[command(
        next_help_heading = "Field Work",
        about = "Look up a customer's license details"
    )]
    License(cmd::license::LicenseArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    dw completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("DESKWORK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "deskwork=debug,dw=debug,info"
        } else {
            "deskwork=info,dw=info,warn"
        })
    });

    let format = env::var("DESKWORK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = env::current_dir()?;
    let project_root = if matches!(cli.command, Commands::Init(_)) {
        cwd
    } else {
        cmd::find_project_root(&cwd).unwrap_or(cwd)
    };
    let config = match config::resolve_config(&project_root, cli.json) {
        Ok(config) => config,
        Err(err) => {
            let mode = if cli.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            };
            render_error(
                mode,
                &CliError::coded(format!("{err:#}"), ErrorCode::ConfigParseError),
            )?;
            return Err(err);
        }
    };

    let ctx = Context {
        project_root,
        output: OutputMode::from_name(&config.resolved_output),
        config,
        user_flag: cli.user.clone(),
    };
    tracing::debug!(root = %ctx.project_root.display(), output = ?ctx.output, "resolved context");

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, &ctx),
        Commands::User { ref command } => cmd::user::run_user(command, &ctx),
        Commands::Ticket { ref command } => cmd::ticket::run_ticket(command, &ctx),
        Commands::Start(ref args) => cmd::lifecycle::run_start(args, &ctx),
        Commands::Close(ref args) => cmd::lifecycle::run_close(args, &ctx),
        Commands::Button(ref args) => cmd::lifecycle::run_button(args, &ctx),
        Commands::Alert(ref args) => cmd::lifecycle::run_alert(args, &ctx),
        Commands::Unassign(ref args) => cmd::lifecycle::run_unassign(args, &ctx),
        Commands::Comment(ref args) => cmd::comment::run_comment(args, &ctx),
        Commands::Customer { ref command } => cmd::customer::run_customer(command, &ctx),
        Commands::Team { ref command } => cmd::catalog::run_team(command, &ctx),
        Commands::Product { ref command } => cmd::catalog::run_product(command, &ctx),
        Commands::Report { ref command } => cmd::report::run_report(command, &ctx),
        Commands::Location(ref args) => cmd::location::run_location(args, &ctx),
        Commands::License(ref args) => cmd::license::run_license(args, &ctx),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_and_after_subcommand() {
        let cli = Cli::parse_from(["dw", "--json", "start", "T1"]);
        assert!(cli.json);
        let cli = Cli::parse_from(["dw", "start", "T1", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn user_flag_parsed() {
        let cli = Cli::parse_from(["dw", "--user", "alice", "close", "T1"]);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert!(matches!(cli.command, Commands::Close(_)));
    }

    #[test]
    fn unassign_requires_users() {
        assert!(Cli::try_parse_from(["dw", "unassign", "T1"]).is_err());
        assert!(Cli::try_parse_from(["dw", "unassign", "T1", "alice", "bob"]).is_ok());
    }

    #[test]
    fn negative_coordinates_parse() {
        let cli = Cli::parse_from(["dw", "location", "T1", "--lat", "-33.86", "--lng", "151.2"]);
        match cli.command {
            Commands::Location(args) => assert!((args.lat + 33.86).abs() < f64::EPSILON),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["dw", "init"],
            vec!["dw", "user", "add", "alice", "--name", "Alice", "--admin"],
            vec!["dw", "ticket", "create", "--subject", "x"],
            vec!["dw", "ticket", "show", "T1"],
            vec!["dw", "ticket", "list", "--status", "Closed"],
            vec!["dw", "ticket", "status", "T1", "Other"],
            vec!["dw", "start", "T1"],
            vec!["dw", "close", "T1"],
            vec!["dw", "button", "T1"],
            vec!["dw", "alert", "T1"],
            vec!["dw", "unassign", "T1", "alice"],
            vec!["dw", "comment", "T1", "called back"],
            vec!["dw", "comment", "T1"],
            vec!["dw", "customer", "search", "acme", "kochi"],
            vec!["dw", "customer", "show", "acme"],
            vec!["dw", "customer", "save", "acme", "--code", "C-1"],
            vec!["dw", "customer", "alert", "acme"],
            vec!["dw", "customer", "set-alert", "acme", "pays late"],
            vec!["dw", "team", "list"],
            vec!["dw", "team", "add", "Billing"],
            vec!["dw", "product", "show", "Ledger"],
            vec!["dw", "product", "save", "Ledger", "--team", "Billing"],
            vec!["dw", "report", "tickets", "--group-by-assignee"],
            vec!["dw", "report", "amc", "--status", "AMC Expired"],
            vec!["dw", "location", "T1", "--lat", "1", "--lng", "2"],
            vec!["dw", "license", "C-1"],
            vec!["dw", "completions", "bash"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(
                result.is_ok(),
                "Failed to parse: {:?}: {:?}",
                args,
                result.err()
            );
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
