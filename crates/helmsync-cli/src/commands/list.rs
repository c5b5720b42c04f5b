//! List command - show the releases of a namespace

use helmsync_engine::{EngineOptions, ReleaseInventory, SystemRunner};

use crate::display;
use crate::error::Result;

/// Run the list command
pub fn run(namespace: &str, options: &EngineOptions, output_json: bool) -> Result<()> {
    let runner = SystemRunner::new();
    let snapshot = ReleaseInventory::new(&runner, options).list(namespace)?;

    if output_json {
        let releases: Vec<_> = snapshot.iter().collect();
        println!("{}", serde_json::to_string_pretty(&releases)?);
        return Ok(());
    }

    display::print_inventory(&snapshot);
    Ok(())
}
