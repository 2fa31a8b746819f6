//! Dialects command implementation

use anyhow::Result;
use st_sql::supported_dialects;

/// Execute the dialects command
pub fn execute() -> Result<()> {
    println!("Supported SQL dialects:");
    for dialect in supported_dialects() {
        println!("  - {}", dialect);
    }
    Ok(())
}
