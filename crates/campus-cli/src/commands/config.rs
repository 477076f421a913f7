//! `campus config`

use anyhow::Result;
use campus_config::CampusConfig;

pub fn execute(config: &CampusConfig, json: bool) -> Result<()> {
    let rendered = if json {
        config.display_as_json()?
    } else {
        config.display_as_toml()?
    };
    println!("{}", rendered);
    Ok(())
}
