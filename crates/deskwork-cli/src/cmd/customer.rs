//! `dw customer`: search, inspect, and maintain customer records and their
//! alerts.

use super::Context;
use crate::output::{CliError, fail, or_dash, pretty_kv, pretty_rule, pretty_section, render};
use crate::validate;
use anyhow::Result;
use clap::{Args, Subcommand};
use deskwork_core::customer::{
    CustomerError, customer_alert, customer_details, save_customer, search_customers,
    upsert_customer_alert,
};
use deskwork_core::model::Customer;
use deskwork_core::store::StoreError;
use serde::Serialize;

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// Find customers whose code, name, address, or phone match every word.
    Search(SearchArgs),
    /// Show one customer record.
    Show(NameArgs),
    /// Create or update a customer and sync its code and product onto its tickets.
    Save(Box<SaveArgs>),
    /// Show the alert recorded for a customer.
    Alert(NameArgs),
    /// Create or replace the alert for a customer.
    SetAlert(SetAlertArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[arg(required = true, num_args = 1.., value_name = "WORD")]
    pub words: Vec<String>,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    /// Customer record name.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct SetAlertArgs {
    pub name: String,
    pub remarks: String,
}

/// Fields left out keep their stored value when the customer exists.
#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Customer record name (the key).
    pub name: String,
    #[arg(long)]
    pub customer_name: Option<String>,
    #[arg(long)]
    pub code: Option<String>,
    #[arg(long)]
    pub sl_no: Option<String>,
    #[arg(long)]
    pub product: Option<String>,
    #[arg(long)]
    pub address1: Option<String>,
    #[arg(long)]
    pub address2: Option<String>,
    #[arg(long)]
    pub place: Option<String>,
    #[arg(long)]
    pub district: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub contact_person: Option<String>,
    #[arg(long)]
    pub phone1: Option<String>,
    #[arg(long)]
    pub phone2: Option<String>,
    #[arg(long)]
    pub gst_no: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub license_count: Option<i64>,
    /// Date the maintenance contract is paid up to (YYYY-MM-DD).
    #[arg(long)]
    pub amc_last_paid: Option<String>,
}

#[derive(Debug, Serialize)]
struct SaveOutput {
    customer: String,
    tickets_synced: usize,
}

pub fn run_customer(command: &CustomerCommand, ctx: &Context) -> Result<()> {
    match command {
        CustomerCommand::Search(args) => run_search(args, ctx),
        CustomerCommand::Show(args) => run_show(args, ctx),
        CustomerCommand::Save(args) => run_save(args, ctx),
        CustomerCommand::Alert(args) => run_alert(args, ctx),
        CustomerCommand::SetAlert(args) => run_set_alert(args, ctx),
    }
}

fn customer_failure(ctx: &Context, err: &CustomerError) -> anyhow::Error {
    fail(ctx.output, &CliError::coded(err.to_string(), err.code()))
}

fn run_search(args: &SearchArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let customers = search_customers(&store, &args.words.join(" "));
    render(ctx.output, &customers, |list, w| {
        if list.is_empty() {
            return writeln!(w, "No matching customers.");
        }
        for c in list {
            writeln!(
                w,
                "{}\t{}\t{}\t{}",
                or_dash(c.customer_code.as_deref()),
                c.customer_name,
                or_dash(c.place.as_deref()),
                or_dash(c.phone1.as_deref())
            )?;
        }
        Ok(())
    })
}

fn run_show(args: &NameArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let customer = customer_details(&store, &args.name).map_err(|e| ctx.store_failure(&e))?;
    render(ctx.output, &customer, |c, w| {
        pretty_section(w, &c.customer_name)?;
        pretty_kv(w, "Name", &c.name)?;
        pretty_kv(w, "Code", or_dash(c.customer_code.as_deref()))?;
        pretty_kv(w, "Product", or_dash(c.product_name.as_deref()))?;
        pretty_kv(w, "Address", or_dash(c.address1.as_deref()))?;
        if let Some(address2) = c.address2.as_deref() {
            pretty_kv(w, "", address2)?;
        }
        pretty_kv(w, "Place", or_dash(c.place.as_deref()))?;
        pretty_kv(w, "Contact", or_dash(c.contact_person.as_deref()))?;
        pretty_kv(w, "Phone", or_dash(c.phone1.as_deref()))?;
        pretty_kv(w, "Email", or_dash(c.email.as_deref()))?;
        pretty_kv(
            w,
            "AMC paid to",
            c.amc_last_paid
                .map_or_else(|| "-".to_string(), |date| date.to_string()),
        )?;
        pretty_rule(w)
    })
}

fn overlay(target: &mut Option<String>, value: Option<&String>) {
    if let Some(value) = value {
        let value = value.trim();
        *target = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
    }
}

fn run_save(args: &SaveArgs, ctx: &Context) -> Result<()> {
    let amc_last_paid = args
        .amc_last_paid
        .as_deref()
        .map(|raw| validate::parse_date("amc_last_paid", raw))
        .transpose()
        .map_err(|e| ctx.invalid(&e))?;

    let mut store = ctx.open_store()?;
    let name = args.name.trim();
    let mut customer = match customer_details(&store, name) {
        Ok(existing) => existing,
        Err(StoreError::NotFound { .. }) => Customer {
            name: name.to_string(),
            ..Customer::default()
        },
        Err(err) => return Err(ctx.store_failure(&err)),
    };

    if let Some(display) = args.customer_name.as_deref() {
        customer.customer_name = display.trim().to_string();
    }
    overlay(&mut customer.customer_code, args.code.as_ref());
    overlay(&mut customer.sl_no, args.sl_no.as_ref());
    overlay(&mut customer.product_name, args.product.as_ref());
    overlay(&mut customer.address1, args.address1.as_ref());
    overlay(&mut customer.address2, args.address2.as_ref());
    overlay(&mut customer.place, args.place.as_ref());
    overlay(&mut customer.district, args.district.as_ref());
    overlay(&mut customer.state, args.state.as_ref());
    overlay(&mut customer.country, args.country.as_ref());
    overlay(&mut customer.contact_person, args.contact_person.as_ref());
    overlay(&mut customer.phone1, args.phone1.as_ref());
    overlay(&mut customer.phone2, args.phone2.as_ref());
    overlay(&mut customer.gst_no, args.gst_no.as_ref());
    overlay(&mut customer.email, args.email.as_ref());
    if args.license_count.is_some() {
        customer.license_count = args.license_count;
    }
    if amc_last_paid.is_some() {
        customer.amc_last_paid = amc_last_paid;
    }

    let tickets_synced =
        save_customer(&mut store, &customer).map_err(|e| customer_failure(ctx, &e))?;
    let payload = SaveOutput {
        customer: customer.name,
        tickets_synced,
    };
    render(ctx.output, &payload, |p, w| {
        writeln!(
            w,
            "✓ Saved {} ({} ticket(s) synced)",
            p.customer, p.tickets_synced
        )
    })
}

fn run_alert(args: &NameArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let alert = customer_alert(&store, &args.name).map_err(|e| customer_failure(ctx, &e))?;
    render(ctx.output, &alert, |a, w| match a {
        Some(alert) => writeln!(w, "! {}", alert.remarks),
        None => writeln!(w, "No alert."),
    })
}

fn run_set_alert(args: &SetAlertArgs, ctx: &Context) -> Result<()> {
    ctx.require_user()?;
    let mut store = ctx.open_store()?;
    let alert = upsert_customer_alert(&mut store, &args.name, &args.remarks)
        .map_err(|e| customer_failure(ctx, &e))?;
    render(ctx.output, &alert, |a, w| {
        writeln!(w, "✓ Alert set for {}", a.customer)
    })
}
