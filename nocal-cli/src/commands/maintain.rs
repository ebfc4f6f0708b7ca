use anyhow::Result;
use chrono::Utc;
use nocal_core::{BatchReport, advance_due_recurrences, parse_timestamp, prune_orphaned_members};

use super::Context;
use crate::render::Render;

pub fn advance(ctx: &Context, now: Option<&str>) -> Result<()> {
    let now = match now {
        Some(s) => parse_timestamp(s)?,
        None => Utc::now().timestamp(),
    };

    let report = advance_due_recurrences(ctx.calendar.repository(), now)?;
    finish(ctx, "advance", &report)
}

pub fn prune(ctx: &Context) -> Result<()> {
    let report = prune_orphaned_members(ctx.calendar.repository())?;
    finish(ctx, "prune", &report)
}

/// Print the report and fail the process if anything went wrong.
fn finish(ctx: &Context, job: &str, report: &BatchReport) -> Result<()> {
    if ctx.json {
        ctx.print_json(report)?;
    } else {
        println!("{}", report.render());
    }

    if !report.is_success() {
        anyhow::bail!("{job}: {} item(s) failed", report.failures.len());
    }
    Ok(())
}
