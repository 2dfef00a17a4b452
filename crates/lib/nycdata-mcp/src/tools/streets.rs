use nycdata_core::control::StreetClosuresRequest;
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

/// Parameters for DOT street closures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StreetClosuresParams {
    pub borough: Option<String>,
    /// Closures whose work period overlaps the last `days` days.
    pub days: Option<f64>,
    /// Case-insensitive substring of the street the closure is on.
    pub street: Option<String>,
    pub limit: Option<f64>,
}

impl From<StreetClosuresParams> for StreetClosuresRequest {
    fn from(params: StreetClosuresParams) -> Self {
        Self {
            borough: params.borough,
            days: params.days,
            street: params.street,
            limit: params.limit,
        }
    }
}

#[tool_router(router = tool_router_streets, vis = "pub")]
impl<S: RowSource> NycMcp<S> {
    #[tool(description = "Find DOT street closures overlapping a window. Segments with several purposes are merged into one record; meta reports active, finished, and upcoming closures.")]
    async fn street_closures(
        &self,
        Parameters(params): Parameters<StreetClosuresParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let envelope = self.control().street_closures(params.into()).await;
        helpers::envelope_result(&envelope)
    }
}
