pub mod config;
pub mod edit;
pub mod events;
pub mod invites;
pub mod maintain;
pub mod new;

use anyhow::{Context as _, Result};
use nocal_core::{Calendar, FileStore, NocalConfig};
use serde::Serialize;
use tracing::debug;

/// Everything a command needs: the opened calendar, the acting login and
/// the output mode.
pub struct Context {
    pub calendar: Calendar<FileStore>,
    pub config: NocalConfig,
    pub json: bool,
    login: Option<String>,
}

impl Context {
    pub fn open(config: NocalConfig, login: Option<String>, json: bool) -> Result<Self> {
        let store = config.open_store()?;
        let calendar = Calendar::new(store).with_context(|| {
            format!("Could not open calendar data in {}", config.data_path().display())
        })?;
        debug!(data_dir = %config.data_path().display(), "opened calendar");

        Ok(Context {
            calendar,
            config,
            json,
            login: login.filter(|l| !l.is_empty()),
        })
    }

    /// The acting login, required by every non-maintenance command.
    pub fn login(&self) -> Result<&str> {
        self.login.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "No login given.\n\n\
                Pass one with:\n  \
                nocal --as <login> <command>\n\n\
                or set NOCAL_LOGIN."
            )
        })
    }

    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
