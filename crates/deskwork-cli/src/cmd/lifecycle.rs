//! `dw start`, `dw close`, `dw button`, `dw alert`, and `dw unassign`.

use super::Context;
use crate::output::{CliError, fail, pretty_kv, render};
use anyhow::Result;
use clap::Args;
use deskwork_core::api::{self, ActionResult};
use deskwork_core::identity::resolve_actor;
use deskwork_core::lifecycle::remove_assignees;

#[derive(Args, Debug)]
pub struct TicketArgs {
    /// Ticket id, e.g. `TKT-00001`.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct UnassignArgs {
    pub id: String,

    /// Users to remove from the assignee list.
    #[arg(required = true, value_name = "USER")]
    pub users: Vec<String>,
}

/// Print an action result. Rejections are normal outcomes and exit 0;
/// only failures (unknown ticket, permission, store error) exit non-zero.
fn finish(ctx: &Context, result: &ActionResult) -> Result<()> {
    render(ctx.output, result, |r, w| {
        if r.allowed {
            writeln!(w, "✓ {}", r.message)
        } else {
            writeln!(w, "✗ {}", r.message)
        }
    })?;
    if result.is_failure() {
        anyhow::bail!("{}", result.message);
    }
    Ok(())
}

pub fn run_start(args: &TicketArgs, ctx: &Context) -> Result<()> {
    let user = ctx.require_user()?;
    let mut store = ctx.open_store()?;
    let result = api::start_ticket(&mut store, &args.id, &user);
    finish(ctx, &result)
}

pub fn run_close(args: &TicketArgs, ctx: &Context) -> Result<()> {
    let user = ctx.require_user()?;
    let mut store = ctx.open_store()?;
    let result = api::close_ticket(&mut store, &args.id, &user);
    finish(ctx, &result)
}

pub fn run_button(args: &TicketArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let state = api::button_state(&store, &args.id, &ctx.viewer());
    render(ctx.output, &state, |s, w| {
        if s.show_button {
            writeln!(w, "[{}]", s.label)
        } else if s.label.is_empty() {
            writeln!(w, "(no action)")
        } else {
            writeln!(w, "({})", s.label)
        }
    })
}

pub fn run_alert(args: &TicketArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let alert = api::assignment_alert(&store, &args.id, &ctx.viewer());
    render(ctx.output, &alert, |a, w| {
        if a.is_shown() {
            writeln!(w, "! {}", a.message)
        } else {
            writeln!(w, "No alert.")
        }
    })
}

pub fn run_unassign(args: &UnassignArgs, ctx: &Context) -> Result<()> {
    let user = ctx.require_user()?;
    let mut store = ctx.open_store()?;
    let actor = resolve_actor(&store, &user).map_err(|e| ctx.store_failure(&e))?;

    let users: Vec<String> = args.users.iter().map(|u| u.trim().to_string()).collect();
    let report = remove_assignees(&mut store, &args.id, &users, &actor)
        .map_err(|e| fail(ctx.output, &CliError::coded(e.to_string(), e.code())))?;

    render(ctx.output, &report, |r, w| {
        writeln!(w, "✓ Updated assignees of {}", args.id.trim())?;
        pretty_kv(
            w,
            "Assignees",
            if r.assignees.is_empty() {
                "-".to_string()
            } else {
                r.assignees.join(", ")
            },
        )?;
        pretty_kv(w, "Cancelled", r.cancelled.len().to_string())
    })
}
