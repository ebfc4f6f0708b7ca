use anyhow::Result;
use owo_colors::OwoColorize;

use super::Context;
use crate::render::Render;

pub fn list(ctx: &Context) -> Result<()> {
    let login = ctx.login()?;
    let invites = ctx.calendar.get_invites(login)?;

    if ctx.json {
        return ctx.print_json(&invites);
    }
    if invites.is_empty() {
        println!("{}", "No pending invites".dimmed());
        return Ok(());
    }

    for invite in &invites {
        // The event may have been removed since the invite was issued.
        match ctx.calendar.get_event(&invite.event_id, login) {
            Ok(event) => println!("{}  {}", invite.render(), event.render()),
            Err(_) => println!("{}  {}", invite.render(), "(event gone)".dimmed()),
        }
    }
    Ok(())
}

pub fn accept(ctx: &Context, id: &str) -> Result<()> {
    ctx.calendar.accept_invite(id, ctx.login()?)?;

    if ctx.json {
        return ctx.print_json(&serde_json::json!({ "accepted": id }));
    }
    println!("{}", format!("  Accepted: {id}").green());
    Ok(())
}

pub fn reject(ctx: &Context, id: &str) -> Result<()> {
    ctx.calendar.reject_invite(id, ctx.login()?)?;

    if ctx.json {
        return ctx.print_json(&serde_json::json!({ "rejected": id }));
    }
    println!("{}", format!("  Rejected: {id}").yellow());
    Ok(())
}
