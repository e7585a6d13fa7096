use super::Context;
use crate::output::{CliError, fail, format_us, or_dash, pretty_rule, render_mode};
use crate::validate;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use deskwork_core::report::{
    AmcFilter, AmcStatus, TicketReportFilter, TicketReportRow, amc_report, ticket_report,
};

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Tickets with their latest assignee and comments.
    Tickets(TicketsArgs),
    /// Customers by maintenance contract end date.
    Amc(AmcArgs),
}

#[derive(Args, Debug)]
pub struct TicketsArgs {
    /// First creation date to include (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<String>,
    /// Last creation date to include (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub customer: Option<String>,
    /// User id behind the most recent assignment.
    #[arg(long)]
    pub assigned_to: Option<String>,
    #[arg(long)]
    pub team: Option<String>,
    /// Emit a header row before each assignee's tickets.
    #[arg(long)]
    pub group_by_assignee: bool,
}

#[derive(Args, Debug)]
pub struct AmcArgs {
    #[arg(long)]
    pub customer: Option<String>,
    /// `All`, `AMC Expired`, or `Upcoming Expiry`.
    #[arg(long, default_value = "All")]
    pub status: String,
    /// English month name; applies to `Upcoming Expiry`.
    #[arg(long)]
    pub month: Option<String>,
    /// Four-digit year; applies to `Upcoming Expiry`.
    #[arg(long)]
    pub year: Option<String>,
    /// Evaluate expiry as of this date instead of today (YYYY-MM-DD).
    #[arg(long)]
    pub today: Option<String>,
}

pub fn run_report(command: &ReportCommand, ctx: &Context) -> Result<()> {
    match command {
        ReportCommand::Tickets(args) => run_tickets(args, ctx),
        ReportCommand::Amc(args) => run_amc(args, ctx),
    }
}

fn date_arg(ctx: &Context, field: &'static str, raw: Option<&String>) -> Result<Option<NaiveDate>> {
    raw.map(|raw| validate::parse_date(field, raw))
        .transpose()
        .map_err(|e| ctx.invalid(&e))
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn run_tickets(args: &TicketsArgs, ctx: &Context) -> Result<()> {
    let filter = TicketReportFilter {
        from_date: date_arg(ctx, "from", args.from.as_ref())?,
        to_date: date_arg(ctx, "to", args.to.as_ref())?,
        status: non_blank(args.status.as_ref()),
        priority: non_blank(args.priority.as_ref()),
        customer: non_blank(args.customer.as_ref()),
        assigned_to: non_blank(args.assigned_to.as_ref()),
        team: non_blank(args.team.as_ref()),
        group_by_assignee: args.group_by_assignee,
    };
    let store = ctx.open_store()?;
    let rows = ticket_report(&store, &filter)?;

    render_mode(
        ctx.output,
        &rows,
        |rows, w| {
            for row in rows {
                match row {
                    TicketReportRow::Header {
                        assigned_to,
                        ticket_count,
                    } => writeln!(w, "# {assigned_to}\t{ticket_count}")?,
                    TicketReportRow::Ticket(line) => writeln!(
                        w,
                        "{}\t{}\t{}\t{}\t{}\t{}",
                        line.sl_no,
                        line.ticket_id,
                        line.status,
                        or_dash(line.assignee.as_deref()),
                        line.subject,
                        line.latest_comment
                    )?,
                }
            }
            Ok(())
        },
        |rows, w| {
            if rows.is_empty() {
                return writeln!(w, "No tickets match.");
            }
            for row in rows {
                match row {
                    TicketReportRow::Header {
                        assigned_to,
                        ticket_count,
                    } => {
                        writeln!(w)?;
                        writeln!(w, "{assigned_to} ({ticket_count})")?;
                        pretty_rule(w)?;
                    }
                    TicketReportRow::Ticket(line) => writeln!(
                        w,
                        "{:>3}  {:<12}  {}  {:<12}  {:<14}  {}",
                        line.sl_no,
                        line.ticket_id,
                        format_us(line.created_at_us),
                        or_dash(line.customer.as_deref()),
                        line.status,
                        line.subject
                    )?,
                }
            }
            Ok(())
        },
    )
}

fn run_amc(args: &AmcArgs, ctx: &Context) -> Result<()> {
    let status: AmcStatus = args.status.parse().map_err(|err: anyhow::Error| {
        fail(
            ctx.output,
            &CliError::with_details(
                err.to_string(),
                "use All, \"AMC Expired\", or \"Upcoming Expiry\"",
                "invalid_amc_status",
            ),
        )
    })?;
    let today = date_arg(ctx, "today", args.today.as_ref())?
        .unwrap_or_else(|| Utc::now().date_naive());
    let filter = AmcFilter {
        customer: non_blank(args.customer.as_ref()),
        status,
        expiry_month: non_blank(args.month.as_ref()),
        expiry_year: non_blank(args.year.as_ref()),
    };
    let store = ctx.open_store()?;
    let rows = amc_report(&store, &filter, today)?;

    render_mode(
        ctx.output,
        &rows,
        |rows, w| {
            for row in rows {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    or_dash(row.customer_code.as_deref()),
                    row.customer_name,
                    row.amc_end_date
                        .map_or_else(|| "-".to_string(), |d| d.to_string()),
                    or_dash(row.phone.as_deref())
                )?;
            }
            Ok(())
        },
        |rows, w| {
            if rows.is_empty() {
                return writeln!(w, "No customers match.");
            }
            writeln!(w, "{:<10}  {:<28}  {:<10}  PHONE", "CODE", "CUSTOMER", "AMC END")?;
            pretty_rule(w)?;
            for row in rows {
                writeln!(
                    w,
                    "{:<10}  {:<28}  {:<10}  {}",
                    or_dash(row.customer_code.as_deref()),
                    row.customer_name,
                    row.amc_end_date
                        .map_or_else(|| "-".to_string(), |d| d.to_string()),
                    or_dash(row.phone.as_deref())
                )?;
            }
            Ok(())
        },
    )
}
