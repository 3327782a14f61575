//! Per-turn tool budgets.
//!
//! A budget counts *requests the model issued*, not work performed: the
//! counter goes up whether the dispatcher answers from cache or actually
//! runs the tool. Counters reset at the start of every user turn; tools
//! without a configured limit are unbudgeted.

use std::collections::HashMap;

/// Tracks how many times each budgeted tool has been requested this turn.
#[derive(Debug, Clone, Default)]
pub struct ToolBudget {
    limits: HashMap<String, u32>,
    counts: HashMap<String, u32>,
}

impl ToolBudget {
    /// Create a budget from a map of tool name → per-turn limit.
    pub fn new(limits: HashMap<String, u32>) -> Self {
        Self {
            limits,
            counts: HashMap::new(),
        }
    }

    /// Whether the named tool has used up its per-turn allowance.
    /// Tools with no configured limit are never exhausted.
    pub fn is_exhausted(&self, tool: &str) -> bool {
        match self.limits.get(tool) {
            Some(&limit) => self.count(tool) >= limit,
            None => false,
        }
    }

    /// Count one request against the named tool.
    pub fn record(&mut self, tool: &str) {
        *self.counts.entry(tool.to_string()).or_insert(0) += 1;
    }

    /// Requests issued for the named tool so far this turn.
    pub fn count(&self, tool: &str) -> u32 {
        self.counts.get(tool).copied().unwrap_or(0)
    }

    /// The configured limit for the named tool, if any.
    pub fn limit(&self, tool: &str) -> Option<u32> {
        self.limits.get(tool).copied()
    }

    /// The message handed back to the model when a budgeted tool is
    /// requested past its limit.
    pub fn refusal_message(&self, tool: &str) -> String {
        match self.limit(tool) {
            Some(limit) => format!(
                "Budget exceeded for {tool} (limit {limit}). Provide the best answer with existing info."
            ),
            None => format!("Budget exceeded for {tool}. Provide the best answer with existing info."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget_with(tool: &str, limit: u32) -> ToolBudget {
        let mut limits = HashMap::new();
        limits.insert(tool.to_string(), limit);
        ToolBudget::new(limits)
    }

    #[test]
    fn exhausts_at_limit() {
        let mut budget = budget_with("web_search", 2);
        assert!(!budget.is_exhausted("web_search"));

        budget.record("web_search");
        assert!(!budget.is_exhausted("web_search"));

        budget.record("web_search");
        assert!(budget.is_exhausted("web_search"));
        assert_eq!(budget.count("web_search"), 2);
    }

    #[test]
    fn unbudgeted_tool_never_exhausts() {
        let mut budget = budget_with("web_search", 1);
        for _ in 0..10 {
            budget.record("create_file");
        }
        assert!(!budget.is_exhausted("create_file"));
        assert_eq!(budget.count("create_file"), 10);
    }

    #[test]
    fn refusal_message_names_tool_and_limit() {
        let budget = budget_with("fetch_url", 3);
        let msg = budget.refusal_message("fetch_url");
        assert!(msg.contains("fetch_url"));
        assert!(msg.contains("limit 3"));
    }

    #[test]
    fn fresh_budget_is_empty() {
        let budget = budget_with("fetch_url", 3);
        assert_eq!(budget.count("fetch_url"), 0);
        assert!(!budget.is_exhausted("fetch_url"));
    }
}
