use anyhow::Result;
use roster_config::RosterConfig;
use roster_connectors::{builtin_registry, ConnectorSettings};

/// Print every registered integration slug, one per line
pub fn execute(config: &RosterConfig) -> Result<()> {
    let registry = builtin_registry(&ConnectorSettings::from_config(config))?;
    for slug in registry.known_slugs() {
        println!("{slug}");
    }
    Ok(())
}
