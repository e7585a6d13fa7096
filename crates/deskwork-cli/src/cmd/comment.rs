use super::Context;
use crate::output::{CliError, fail, format_us, render};
use anyhow::Result;
use clap::Args;
use deskwork_core::comments::{add_comment, list_comments};
use deskwork_core::identity::resolve_actor;
use deskwork_core::store::StoreError;

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Ticket id.
    pub id: String,

    /// Comment text. Without it, the ticket's comments are listed.
    pub body: Option<String>,
}

pub fn run_comment(args: &CommentArgs, ctx: &Context) -> Result<()> {
    let Some(body) = args.body.as_deref() else {
        return run_list(args, ctx);
    };

    let user = ctx.require_user()?;
    let mut store = ctx.open_store()?;
    let actor = resolve_actor(&store, &user).map_err(|e| ctx.store_failure(&e))?;

    let comment = add_comment(&mut store, &args.id, &actor.id, body).map_err(|err| {
        let cli_error = match err.downcast_ref::<StoreError>() {
            Some(store_err) => CliError::coded(store_err.to_string(), store_err.code()),
            None => CliError::new(format!("{err:#}")),
        };
        fail(ctx.output, &cli_error)
    })?;

    render(ctx.output, &comment, |c, w| {
        writeln!(w, "✓ Comment {} added to {}", c.id, c.ticket_id)
    })
}

fn run_list(args: &CommentArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let comments = list_comments(store.connection(), args.id.trim())?;
    render(ctx.output, &comments, |list, w| {
        if list.is_empty() {
            return writeln!(w, "No comments.");
        }
        for c in list {
            writeln!(w, "{}  {}: {}", format_us(c.created_at_us), c.author, c.body)?;
        }
        Ok(())
    })
}
