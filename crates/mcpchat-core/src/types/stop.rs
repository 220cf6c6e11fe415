//! Model stop reasons

use serde::{Deserialize, Serialize};

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the assistant turn
    EndTurn,
    /// The model wants one or more tools run
    ToolUse,
    /// Output token budget exhausted
    MaxTokens,
    /// A configured stop sequence was produced
    StopSequence,
    /// Anything newer than this client knows about
    #[serde(other)]
    Unknown,
}

impl StopReason {
    pub fn wants_tools(&self) -> bool {
        matches!(self, StopReason::ToolUse)
    }
}

impl Default for StopReason {
    fn default() -> Self {
        StopReason::EndTurn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_parsing() {
        let r: StopReason = serde_json::from_str("\"tool_use\"").unwrap();
        assert!(r.wants_tools());

        let r: StopReason = serde_json::from_str("\"end_turn\"").unwrap();
        assert_eq!(r, StopReason::EndTurn);

        let r: StopReason = serde_json::from_str("\"refusal\"").unwrap();
        assert_eq!(r, StopReason::Unknown);
    }
}
