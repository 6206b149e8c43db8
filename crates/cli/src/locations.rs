//! `inventa locations` — the registry of places assets are verified in.

use clap::Subcommand;

use crate::data_dir::DataDir;
use crate::CliError;

#[derive(Subcommand)]
pub enum LocationCommands {
    /// List registered locations
    List {
        /// Output JSON array instead of one name per line
        #[arg(long)]
        json: bool,
    },

    /// Register a new location
    #[command(after_help = "\
Examples:
  inventa locations add Almoxarifado
  inventa locations add 'Sala 05'")]
    Add {
        name: String,
    },

    /// Rename a location, moving its verifications along
    #[command(after_help = "\
Examples:
  inventa locations rename 'Sala 01' Recepcao")]
    Rename {
        from: String,
        to: String,
    },

    /// Remove a location and every verification recorded in it
    Remove {
        name: String,
    },
}

pub fn cmd_locations(data_dir: &DataDir, cmd: LocationCommands) -> Result<(), CliError> {
    let (mut store, mut collection) = data_dir.open()?;

    match cmd {
        LocationCommands::List { json } => {
            if json {
                let out = serde_json::to_string_pretty(collection.locations())
                    .map_err(|e| CliError::io(e.to_string()))?;
                println!("{out}");
            } else {
                for location in collection.locations() {
                    println!("{location}");
                }
            }
        }
        LocationCommands::Add { name } => {
            let name = collection.add_location(&name)?;
            store.save_locations(collection.locations())?;
            println!("added location '{name}'");
        }
        LocationCommands::Rename { from, to } => {
            let (from, to) = (from.trim(), to.trim());
            collection.rename_location(from, to)?;
            let moved = store.rename_location(from, to, collection.locations())?;
            println!("renamed '{from}' to '{to}' ({moved} verification(s) moved)");
        }
        LocationCommands::Remove { name } => {
            let name = name.trim();
            collection.remove_location(name)?;
            let removed = store.remove_location(name, collection.locations())?;
            println!("removed location '{name}' ({removed} verification(s) dropped)");
        }
    }

    Ok(())
}
