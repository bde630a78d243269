//! Library handoff input filters.

use baton_core::RunItem;

use crate::handoff::HandoffInputData;

/// Strip every tool call, tool output, handoff call and handoff output from
/// the transcript the next agent sees.
pub fn remove_all_tools(data: HandoffInputData) -> HandoffInputData {
    HandoffInputData {
        input_history: data
            .input_history
            .into_iter()
            .filter(|item| !item.is_tool_related())
            .collect(),
        pre_handoff_items: strip_tool_items(data.pre_handoff_items),
        new_items: strip_tool_items(data.new_items),
    }
}

fn strip_tool_items(items: Vec<RunItem>) -> Vec<RunItem> {
    items
        .into_iter()
        .filter(|item| matches!(item, RunItem::MessageOutput { .. } | RunItem::Reasoning { .. }))
        .collect()
}
