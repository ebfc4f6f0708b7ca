use anyhow::Result;
use nocal_core::Window;
use owo_colors::OwoColorize;

use super::Context;
use crate::render::{self, Render};

pub fn list(ctx: &Context, from: Option<&str>, to: Option<&str>, sorted: bool) -> Result<()> {
    let login = ctx.login()?;
    let window = if from.is_none() && to.is_none() {
        ctx.config.default_window()?
    } else {
        Window::from_args(from, to, ctx.config.window_days)?
    };

    let events = ctx.calendar.list_occurrences(login, &window, sorted)?;

    if ctx.json {
        return ctx.print_json(&events);
    }
    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }
    print!("{}", render::agenda(&events));
    Ok(())
}

pub fn show(ctx: &Context, id: &str) -> Result<()> {
    let event = ctx.calendar.get_event(id, ctx.login()?)?;

    if ctx.json {
        return ctx.print_json(&event);
    }
    println!("{}", event.render());
    Ok(())
}
