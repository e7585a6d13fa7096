//! `dw team` and `dw product`: the support catalogue tickets are routed by.

use super::Context;
use crate::output::{
    CliError, fail, format_us, or_dash, pretty_kv, pretty_rule, pretty_section, render,
};
use anyhow::Result;
use clap::{Args, Subcommand};
use deskwork_core::catalog::{CatalogError, add_team, list_teams, product_details, save_product};
use deskwork_core::model::Product;
use deskwork_core::store::StoreError;
use std::io::{self, Write};

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// List support teams by name.
    List,
    /// Register a support team.
    Add(TeamAddArgs),
}

#[derive(Args, Debug)]
pub struct TeamAddArgs {
    pub name: String,
}

#[derive(Subcommand, Debug)]
pub enum ProductCommand {
    /// Show a product and the team that supports it.
    Show(ProductShowArgs),
    /// Create or update a product.
    Save(ProductSaveArgs),
}

#[derive(Args, Debug)]
pub struct ProductShowArgs {
    pub name: String,
}

/// Fields left out keep their stored value; an empty value clears it.
#[derive(Args, Debug)]
pub struct ProductSaveArgs {
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Team responsible for the product. Must already exist.
    #[arg(long)]
    pub team: Option<String>,
}

fn catalog_failure(ctx: &Context, err: &CatalogError) -> anyhow::Error {
    fail(ctx.output, &CliError::coded(err.to_string(), err.code()))
}

pub fn run_team(command: &TeamCommand, ctx: &Context) -> Result<()> {
    match command {
        TeamCommand::List => {
            let store = ctx.open_store()?;
            let teams = list_teams(&store);
            render(ctx.output, &teams, |list, w| {
                if list.is_empty() {
                    return writeln!(w, "No teams.");
                }
                for team in list {
                    writeln!(w, "{}", team.name)?;
                }
                Ok(())
            })
        }
        TeamCommand::Add(args) => {
            let mut store = ctx.open_store()?;
            let team = add_team(&mut store, &args.name).map_err(|e| catalog_failure(ctx, &e))?;
            render(ctx.output, &team, |t, w| writeln!(w, "✓ Team {}", t.name))
        }
    }
}

pub fn run_product(command: &ProductCommand, ctx: &Context) -> Result<()> {
    match command {
        ProductCommand::Show(args) => run_show(args, ctx),
        ProductCommand::Save(args) => run_save(args, ctx),
    }
}

fn write_product(product: &Product, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &product.name)?;
    pretty_kv(w, "Team", or_dash(product.team.as_deref()))?;
    pretty_kv(w, "Description", or_dash(product.description.as_deref()))?;
    pretty_kv(w, "Modified", format_us(product.modified_at_us))?;
    pretty_rule(w)
}

fn run_show(args: &ProductShowArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let product = product_details(&store, &args.name).map_err(|e| ctx.store_failure(&e))?;
    render(ctx.output, &product, write_product)
}

fn run_save(args: &ProductSaveArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let name = args.name.trim();
    let mut product = match product_details(&store, name) {
        Ok(existing) => existing,
        Err(StoreError::NotFound { .. }) => Product {
            name: name.to_string(),
            ..Product::default()
        },
        Err(err) => return Err(ctx.store_failure(&err)),
    };
    if let Some(description) = args.description.as_deref() {
        product.description = Some(description.to_string());
    }
    if let Some(team) = args.team.as_deref() {
        product.team = Some(team.to_string());
    }

    let saved = save_product(&mut store, &product).map_err(|e| catalog_failure(ctx, &e))?;
    render(ctx.output, &saved, write_product)
}
