use nycdata_core::control::PermittedEventsRequest;
use nycdata_core::source::RowSource;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{NycMcp, helpers};

/// Parameters for permitted events.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PermittedEventsParams {
    pub borough: Option<String>,
    /// Events starting within the last `days` days.
    pub days: Option<f64>,
    /// Case-insensitive substring of the event type, e.g. "parade".
    pub event_type: Option<String>,
    pub limit: Option<f64>,
}

impl From<PermittedEventsParams> for PermittedEventsRequest {
    fn from(params: PermittedEventsParams) -> Self {
        Self {
            borough: params.borough,
            days: params.days,
            event_type: params.event_type,
            limit: params.limit,
        }
    }
}

#[tool_router(router = tool_router_events, vis = "pub")]
impl<S: RowSource> NycMcp<S> {
    #[tool(description = "Search NYC permitted events (street events, parades, park events) by borough, start window, and event type. Multi-location events are merged into one record.")]
    async fn permitted_events(
        &self,
        Parameters(params): Parameters<PermittedEventsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let envelope = self.control().permitted_events(params.into()).await;
        helpers::envelope_result(&envelope)
    }
}
