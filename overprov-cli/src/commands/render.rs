use anyhow::Result;
use overprov_core::provision::{oversized_request_gb, ProvisionPlan};
use overprov_core::{OverprovConfig, ScenarioOptions};

/// Placeholder key; the secret is redacted in the output either way
const PLACEHOLDER_KEY: &str = "<admin-key>";

pub fn handle_render_command(config: &OverprovConfig, capacity_gb: u64) -> Result<()> {
    let options = ScenarioOptions::from_config(config)?;
    let requested = oversized_request_gb(capacity_gb, options.margin_gb);

    let plan = ProvisionPlan::build(&options, requested, PLACEHOLDER_KEY)?;
    print!("{}", plan.to_yaml()?);

    Ok(())
}
