use super::Context;
use crate::output::{pretty_kv, render};
use crate::validate;
use anyhow::Result;
use clap::Args;
use deskwork_core::integrations::geocode::NominatimClient;
use deskwork_core::location::capture;

#[derive(Args, Debug)]
pub struct LocationArgs {
    /// Ticket id.
    pub id: String,

    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,
}

/// Record where the acting user is while working `id`.
pub fn run_location(args: &LocationArgs, ctx: &Context) -> Result<()> {
    let user = ctx.require_user()?;
    validate::validate_coordinates(args.lat, args.lng).map_err(|e| ctx.invalid(&e))?;

    let mut store = ctx.open_store()?;
    let geocoder = NominatimClient::new(&ctx.config.project.geocoding);
    let result = capture(&mut store, &geocoder, &args.id, args.lat, args.lng, &user);

    render(ctx.output, &result, |r, w| {
        if r.success {
            writeln!(w, "✓ {}", r.message.as_deref().unwrap_or("Location saved"))?;
            pretty_kv(w, "Address", r.address.as_deref().unwrap_or_default())
        } else {
            writeln!(w, "✗ {}", r.error.as_deref().unwrap_or("Location not saved"))
        }
    })?;
    if !result.success {
        anyhow::bail!("{}", result.error.unwrap_or_default());
    }
    Ok(())
}
