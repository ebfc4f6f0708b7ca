use anyhow::Result;
use nocal_core::{EventEdit, parse_timestamp};
use owo_colors::OwoColorize;

use super::Context;
use crate::render::Render;

pub struct EditArgs {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: Option<String>,
    pub members: Option<Vec<String>>,
    pub every: Option<i64>,
    pub detach: bool,
}

pub fn run(ctx: &Context, args: EditArgs) -> Result<()> {
    let login = ctx.login()?;

    let edit = EventEdit {
        id: args.id,
        title: args.title,
        description: args.description,
        timestamp: args.start.as_deref().map(parse_timestamp).transpose()?,
        members: args.members,
        active_members: None,
        is_regular: args.detach.then_some(false),
        delta: args.every,
    };

    let event = ctx.calendar.edit_event(edit, login)?;

    if ctx.json {
        return ctx.print_json(&event);
    }
    let verb = if args.detach { "Detached" } else { "Updated" };
    println!("{}", format!("  {verb}: {}", event.title).green());
    println!("{}", event.render());
    Ok(())
}

pub fn remove(ctx: &Context, id: &str) -> Result<()> {
    ctx.calendar.remove_event(id, ctx.login()?)?;

    if ctx.json {
        return ctx.print_json(&serde_json::json!({ "removed": id }));
    }
    println!("{}", format!("  Removed: {id}").red());
    Ok(())
}
