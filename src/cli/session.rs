use anyhow::Result;

use bookshop_search::session::SessionLedger;

/// `session show <id>`
pub fn run_show(id: &str) -> Result<()> {
    let record = SessionLedger::default_location().load(id)?;
    if record.dislikes.is_empty() {
        println!("Session {}: no remembered dislikes", id);
    } else {
        println!("Session {} (updated {}):", id, record.updated_at.format("%Y-%m-%d %H:%M"));
        for dislike in &record.dislikes {
            println!("  - {}", dislike);
        }
    }
    Ok(())
}

/// `session clear <id>`
pub fn run_clear(id: &str) -> Result<()> {
    if SessionLedger::default_location().clear(id)? {
        println!("Session {} cleared", id);
    } else {
        println!("Session {} not found", id);
    }
    Ok(())
}
