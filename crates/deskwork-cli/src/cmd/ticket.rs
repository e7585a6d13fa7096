//! `dw ticket`: create, inspect, list, and re-status tickets.

use super::Context;
use crate::output::{
    CliError, fail, format_us, or_dash, pretty_kv, pretty_rule, pretty_section, render, render_mode,
};
use crate::validate;
use anyhow::Result;
use clap::{Args, Subcommand};
use deskwork_core::api;
use deskwork_core::comments::list_comments;
use deskwork_core::customer::customer_alert;
use deskwork_core::identity::resolve_actor;
use deskwork_core::lifecycle::{self, AssignmentAlert, ButtonState};
use deskwork_core::model::{CustomerAlert, NewTicket, Ticket, TicketComment, TicketStatus};
use deskwork_core::store::{RecordStore, TicketFilter};
use serde::Serialize;

#[derive(Subcommand, Debug)]
pub enum TicketCommand {
    /// Open a new ticket.
    Create(CreateArgs),
    /// Show one ticket with its comments and the viewer's button state.
    Show(ShowArgs),
    /// List tickets, newest first.
    List(ListArgs),
    /// Overwrite a ticket's status.
    Status(StatusArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub subject: String,

    /// Explicit id; generated as `TKT-#####` when omitted.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub team: Option<String>,

    /// Customer record name.
    #[arg(long)]
    pub customer: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// Initial status.
    #[arg(long, default_value = "Not Assigned")]
    pub status: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub status: Option<String>,

    /// Only tickets whose assignee list contains this user.
    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long)]
    pub customer: Option<String>,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    pub id: String,

    /// New status, e.g. "Not Assigned", "In Progress", "Other".
    pub status: String,
}

#[derive(Debug, Serialize)]
struct TicketView {
    #[serde(flatten)]
    ticket: Ticket,
    comments: Vec<TicketComment>,
    customer_alert: Option<CustomerAlert>,
    button: ButtonState,
    assignment_alert: AssignmentAlert,
}

pub fn run_ticket(command: &TicketCommand, ctx: &Context) -> Result<()> {
    match command {
        TicketCommand::Create(args) => run_create(args, ctx),
        TicketCommand::Show(args) => run_show(args, ctx),
        TicketCommand::List(args) => run_list(args, ctx),
        TicketCommand::Status(args) => run_status(args, ctx),
    }
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn run_create(args: &CreateArgs, ctx: &Context) -> Result<()> {
    validate::validate_subject(&args.subject).map_err(|e| ctx.invalid(&e))?;
    let mut store = ctx.open_store()?;

    let ticket = store
        .create_ticket(&NewTicket {
            id: trimmed(args.id.as_ref()),
            subject: args.subject.trim().to_string(),
            status: TicketStatus::from(args.status.as_str()),
            priority: trimmed(args.priority.as_ref()),
            team: trimmed(args.team.as_ref()),
            customer: trimmed(args.customer.as_ref()),
            phone: trimmed(args.phone.as_ref()),
            created_at_us: None,
        })
        .map_err(|e| ctx.store_failure(&e))?;

    render(ctx.output, &ticket, |t, w| {
        writeln!(w, "✓ Created {}: {}", t.id, t.subject)
    })
}

fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let ticket = store.ticket(args.id.trim()).map_err(|e| ctx.store_failure(&e))?;

    let comments = list_comments(store.connection(), &ticket.id)?;
    let alert = match ticket.customer.as_deref() {
        Some(customer) => customer_alert(&store, customer).unwrap_or_else(|err| {
            tracing::warn!(customer, error = %err, "customer alert lookup failed");
            None
        }),
        None => None,
    };
    let viewer = ctx.viewer();
    let view = TicketView {
        button: api::button_state(&store, &ticket.id, &viewer),
        assignment_alert: api::assignment_alert(&store, &ticket.id, &viewer),
        ticket,
        comments,
        customer_alert: alert,
    };

    render_mode(
        ctx.output,
        &view,
        |v, w| {
            writeln!(
                w,
                "{}\t{}\t{}\t{}",
                v.ticket.id,
                v.ticket.status,
                v.ticket.assignees.join(","),
                v.ticket.subject
            )?;
            for comment in &v.comments {
                writeln!(w, "comment\t{}\t{}", comment.author, comment.body)?;
            }
            Ok(())
        },
        |v, w| {
            let t = &v.ticket;
            pretty_section(w, &format!("{}  {}", t.id, t.subject))?;
            pretty_kv(w, "Status", t.status.as_str())?;
            pretty_kv(w, "Priority", or_dash(t.priority.as_deref()))?;
            pretty_kv(w, "Team", or_dash(t.team.as_deref()))?;
            pretty_kv(w, "Customer", or_dash(t.customer.as_deref()))?;
            pretty_kv(w, "Phone", or_dash(t.phone.as_deref()))?;
            pretty_kv(
                w,
                "Assignees",
                if t.assignees.is_empty() {
                    "-".to_string()
                } else {
                    t.assignees.join(", ")
                },
            )?;
            pretty_kv(w, "Created", format_us(t.created_at_us))?;
            if let Some(start) = t.start_time_us {
                pretty_kv(w, "Started", format_us(start))?;
            }
            if let Some(closed) = t.closed_at_us {
                pretty_kv(w, "Closed", format_us(closed))?;
            }
            if let Some(location) = &t.location {
                pretty_kv(w, "Location", &location.address)?;
            }
            if v.button.show_button {
                pretty_kv(w, "Action", &v.button.label)?;
            } else if !v.button.label.is_empty() {
                pretty_kv(w, "Action", format!("({})", v.button.label))?;
            }
            if v.assignment_alert.is_shown() {
                writeln!(w, "! {}", v.assignment_alert.message)?;
            }
            if let Some(alert) = &v.customer_alert {
                writeln!(w, "! Customer alert: {}", alert.remarks)?;
            }
            if !v.comments.is_empty() {
                writeln!(w)?;
                pretty_section(w, "Comments")?;
                for comment in &v.comments {
                    writeln!(
                        w,
                        "{}  {}: {}",
                        format_us(comment.created_at_us),
                        comment.author,
                        comment.body
                    )?;
                }
            }
            Ok(())
        },
    )
}

fn run_list(args: &ListArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let filter = TicketFilter {
        status: args.status.as_deref().map(TicketStatus::from),
        assignee: trimmed(args.assignee.as_ref()),
        customer: trimmed(args.customer.as_ref()),
        limit: Some(args.limit),
    };
    let tickets = store
        .list_tickets(&filter)
        .map_err(|e| ctx.store_failure(&e))?;

    render_mode(
        ctx.output,
        &tickets,
        |list, w| {
            for t in list {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    t.id,
                    t.status,
                    t.assignees.join(","),
                    t.subject
                )?;
            }
            Ok(())
        },
        |list, w| {
            if list.is_empty() {
                return writeln!(w, "No tickets.");
            }
            writeln!(w, "{:<12}  {:<14}  {:<16}  SUBJECT", "ID", "STATUS", "ASSIGNEES")?;
            pretty_rule(w)?;
            for t in list {
                let assignees = t.assignees.join(",");
                writeln!(
                    w,
                    "{:<12}  {:<14}  {:<16}  {}",
                    t.id,
                    t.status.as_str(),
                    or_dash(Some(assignees.as_str())),
                    t.subject
                )?;
            }
            Ok(())
        },
    )
}

fn run_status(args: &StatusArgs, ctx: &Context) -> Result<()> {
    let user = ctx.require_user()?;
    let status = TicketStatus::from(args.status.as_str());
    if status.as_str().is_empty() {
        return Err(fail(
            ctx.output,
            &CliError::with_details(
                "status must not be empty",
                "pass a status such as \"Not Assigned\"",
                "invalid_status",
            ),
        ));
    }

    let mut store = ctx.open_store()?;
    let actor = resolve_actor(&store, &user).map_err(|e| ctx.store_failure(&e))?;
    let ticket = lifecycle::set_status(&mut store, &args.id, status, &actor)
        .map_err(|e| fail(ctx.output, &CliError::coded(e.to_string(), e.code())))?;

    render(ctx.output, &ticket, |t, w| {
        writeln!(w, "✓ {} is now {}", t.id, t.status)
    })
}
