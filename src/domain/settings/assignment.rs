//! Customer-service assignment settings (thank-you page)

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    #[default]
    Single,
    RoundRobin,
}

/// One agent in the rotation. `percentage` is a relative weight; the weights of
/// a rotation do not have to add up to 100.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRobinAgent {
    pub cs_agent_id: String,
    pub percentage: u32,
}

impl RoundRobinAgent {
    pub fn new(cs_agent_id: impl Into<String>, percentage: u32) -> Self {
        Self { cs_agent_id: cs_agent_id.into(), percentage }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsAssignmentSettings {
    pub mode: AssignmentMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_agent_id: Option<String>,
    pub round_robin_agents: Vec<RoundRobinAgent>,
}

impl CsAssignmentSettings {
    pub fn single(agent_id: impl Into<String>) -> Self {
        Self { mode: AssignmentMode::Single, single_agent_id: Some(agent_id.into()), round_robin_agents: vec![] }
    }

    pub fn round_robin(agents: Vec<RoundRobinAgent>) -> Self {
        Self { mode: AssignmentMode::RoundRobin, single_agent_id: None, round_robin_agents: agents }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThankYouPage {
    pub cs_assignment: CsAssignmentSettings,
}
