use anyhow::Result;
use nocal_core::{NewEvent, parse_timestamp};
use owo_colors::OwoColorize;

use super::Context;

pub fn run(
    ctx: &Context,
    title: String,
    start: &str,
    members: Vec<String>,
    description: String,
    every: Option<i64>,
) -> Result<()> {
    let login = ctx.login()?;

    let new_event = NewEvent {
        title,
        description,
        timestamp: parse_timestamp(start)?,
        members,
        is_regular: every.is_some(),
        delta: every.unwrap_or(0),
    };
    let title = new_event.title.clone();

    let id = ctx.calendar.create_event(new_event, login)?;

    if ctx.json {
        return ctx.print_json(&serde_json::json!({ "id": id }));
    }
    println!("{}", format!("  Created: {title}").green());
    println!("  {}", id.dimmed());
    Ok(())
}
