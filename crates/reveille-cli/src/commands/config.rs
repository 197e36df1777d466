use clap::Subcommand;
use reveille_core::DeviceConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the device configuration
    Show,
    /// Set the signed-in user identifier
    SetUser {
        /// Email-like user identifier
        user: String,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let path = DeviceConfig::default_path()?;
    match action {
        ConfigAction::Show => {
            let config = DeviceConfig::load_from(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::SetUser { user } => {
            let mut config = DeviceConfig::load_from(&path)?;
            config.user = Some(user);
            config.save_to(&path)?;
            println!("ok");
        }
    }
    Ok(())
}
