use crate::cache::MemoryTier;
use crate::content::{find_tool, WebTool, WEB_TOOLS};
use crate::store::Store;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

const ALL_TOOLS_KEY: &str = "all";
pub const DEFAULT_TOP_TOOLS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolWithUsage {
    #[serde(flatten)]
    pub tool: WebTool,
    pub usage_count: i64,
}

pub struct UsageTracker {
    listing: MemoryTier<Vec<ToolWithUsage>>,
}

impl UsageTracker {
    pub fn new(listing_ttl: Duration) -> Self {
        Self {
            listing: MemoryTier::new(listing_ttl),
        }
    }

    /// Counts one use of a catalog tool. Unknown ids and store failures are
    /// not reported to the caller.
    pub async fn increment(&self, store: Option<&dyn Store>, tool_id: &str) {
        let (Some(_), Some(store)) = (find_tool(tool_id), store) else {
            return;
        };
        match store.increment_usage(tool_id).await {
            Ok(()) => self.listing.invalidate(ALL_TOOLS_KEY),
            Err(err) => tracing::error!("Failed to increment usage for tool {}: {}", tool_id, err),
        }
    }

    pub async fn all_tools(&self, store: Option<&dyn Store>) -> Vec<ToolWithUsage> {
        if let Some(tools) = self.listing.get(ALL_TOOLS_KEY) {
            return tools;
        }
        let Some(store) = store else {
            return with_defaults();
        };
        match store.usage().await {
            Ok(rows) => {
                let counts = rows
                    .into_iter()
                    .map(|row| (row.tool_id, row.usage_count))
                    .collect();
                let tools = merge(&counts);
                self.listing.insert(ALL_TOOLS_KEY, tools.clone());
                tools
            }
            Err(err) => {
                tracing::warn!("Reading tool usage failed: {}", err);
                with_defaults()
            }
        }
    }

    pub async fn top_tools(&self, store: Option<&dyn Store>, limit: usize) -> Vec<ToolWithUsage> {
        let mut tools = self.all_tools(store).await;
        tools.truncate(limit);
        tools
    }

    pub fn prune(&self) -> usize {
        self.listing.prune()
    }

    pub fn reset(&self) {
        self.listing.clear();
    }
}

fn merge(counts: &HashMap<String, i64>) -> Vec<ToolWithUsage> {
    let mut tools: Vec<ToolWithUsage> = WEB_TOOLS
        .iter()
        .map(|tool| ToolWithUsage {
            tool: tool.clone(),
            usage_count: counts.get(tool.id).copied().unwrap_or(0),
        })
        .collect();
    // stable, so equal counts keep catalog order
    tools.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
    tools
}

fn with_defaults() -> Vec<ToolWithUsage> {
    merge(&HashMap::new())
}
