//! Aggregate statistics command.

use super::Server;

impl Server {
    /// Renders the stat counters in the classic keyspace `INFO` format.
    ///
    /// Counters cover only partitions materialized by this process, so
    /// the numbers are approximate after a cold start.
    ///
    /// # Errors
    ///
    /// Surfaces local B-tree failures.
    pub async fn info(&self) -> anyhow::Result<String> {
        let info = self.db.info().await?;
        Ok(format!(
            "db0: keys={},expires={},total_write_commands_processed={}",
            info.keys, info.expires, info.total_write_commands_processed
        ))
    }
}
