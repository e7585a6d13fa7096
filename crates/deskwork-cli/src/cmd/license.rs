use super::Context;
use crate::output::{CliError, fail, or_dash, pretty_kv, pretty_section, render};
use anyhow::Result;
use clap::Args;
use deskwork_core::integrations::license::LicenseClient;

#[derive(Args, Debug)]
pub struct LicenseArgs {
    /// Customer code to look up.
    pub customer_code: String,
}

pub fn run_license(args: &LicenseArgs, ctx: &Context) -> Result<()> {
    let client = LicenseClient::new(&ctx.config.project.license);
    let details = client
        .lookup(&args.customer_code)
        .map_err(|err| fail(ctx.output, &CliError::coded(err.to_string(), err.code())))?;

    render(ctx.output, &details, |d, w| {
        pretty_section(w, &format!("{}  {}", d.customer_code, d.customer_name))?;
        pretty_kv(w, "Owner", or_dash(Some(d.owner_name.as_str())))?;
        pretty_kv(w, "Address", or_dash(Some(d.address1.as_str())))?;
        if !d.address2.is_empty() {
            pretty_kv(w, "", &d.address2)?;
        }
        pretty_kv(w, "Contact", or_dash(Some(d.contact_person.as_str())))?;
        pretty_kv(w, "Phone", or_dash(Some(d.phone1.as_str())))?;
        pretty_kv(w, "Email", or_dash(Some(d.email.as_str())))?;
        pretty_kv(w, "License", or_dash(Some(d.license_type.as_str())))?;
        pretty_kv(w, "Subscription", or_dash(Some(d.subscription_exp_date.as_str())))?;
        pretty_kv(
            w,
            "AMC",
            format!(
                "{} to {}",
                or_dash(Some(d.amc_start_date.as_str())),
                or_dash(Some(d.amc_end_date.as_str()))
            ),
        )
    })
}
