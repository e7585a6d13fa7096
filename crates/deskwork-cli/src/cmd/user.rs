use super::Context;
use crate::output::{pretty_kv, render};
use crate::validate;
use anyhow::Result;
use clap::{Args, Subcommand};
use deskwork_core::model::ADMINISTRATOR_ROLE;

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a user or add roles to an existing one.
    Add(UserAddArgs),
}

#[derive(Args, Debug)]
pub struct UserAddArgs {
    /// Login id, e.g. `alice`.
    pub id: String,

    /// Display name shown in assignment messages.
    #[arg(long)]
    pub name: Option<String>,

    /// Role to grant. Repeatable.
    #[arg(long = "role", value_name = "ROLE")]
    pub roles: Vec<String>,

    /// Shorthand for `--role Administrator`.
    #[arg(long)]
    pub admin: bool,
}

pub fn run_user(command: &UserCommand, ctx: &Context) -> Result<()> {
    match command {
        UserCommand::Add(args) => run_add(args, ctx),
    }
}

fn run_add(args: &UserAddArgs, ctx: &Context) -> Result<()> {
    let id = args.id.trim();
    validate::validate_user_id(id).map_err(|e| ctx.invalid(&e))?;

    let mut roles: Vec<String> = args
        .roles
        .iter()
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty())
        .collect();
    if args.admin {
        roles.push(ADMINISTRATOR_ROLE.to_string());
    }

    let mut store = ctx.open_store()?;
    let name = args.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let user = store
        .add_user(id, name, &roles)
        .map_err(|e| ctx.store_failure(&e))?;

    render(ctx.output, &user, |u, w| {
        writeln!(w, "✓ User {}", u.id)?;
        pretty_kv(w, "Name", u.full_name.as_deref().unwrap_or(&u.id))?;
        if !u.roles.is_empty() {
            let roles: Vec<&str> = u.roles.iter().map(String::as_str).collect();
            pretty_kv(w, "Roles", roles.join(", "))?;
        }
        Ok(())
    })
}
