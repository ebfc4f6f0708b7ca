use anyhow::Result;
use nocal_core::NocalConfig;
use owo_colors::OwoColorize;

pub fn run(config: &NocalConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let path = NocalConfig::config_path()?;
    println!("{}", format!("# {}", path.display()).dimmed());
    print!("{}", config.to_toml()?);
    Ok(())
}
