use rusqlite::Connection;
use tracing::debug;

use super::DbResult;

/// Run a free-form script that may hold several statements. Execution stops
/// at the first failing statement; statements before it stay applied unless
/// the script wrapped them in its own transaction.
pub fn execute_script(conn: &Connection, script: &str) -> DbResult<()> {
    debug!(bytes = script.len(), "executing script");
    conn.execute_batch(script)?;
    Ok(())
}
