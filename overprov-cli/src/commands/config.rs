use crate::output;
use crate::ConfigCommands;
use anyhow::Result;
use overprov_core::OverprovConfig;

pub fn handle_config_command(command: ConfigCommands, config: &OverprovConfig) -> Result<()> {
    match command {
        ConfigCommands::Sample => {
            print!("{}", OverprovConfig::generate_sample());
        }
        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            output::print_success("Configuration is valid");
        }
    }

    Ok(())
}
