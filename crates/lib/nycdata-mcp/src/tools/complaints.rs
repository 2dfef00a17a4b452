use nycdata_core::control::{ComplaintSearchRequest, ComplaintTrendsRequest};
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

/// Parameters for searching 311 service requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ComplaintSearchParams {
    /// Borough name, short code, or 1-5. Omit for citywide.
    pub borough: Option<String>,
    /// Whole days back from today, 1-365. Defaults to 90.
    pub days: Option<f64>,
    /// Case-insensitive substring of the complaint type, e.g. "noise".
    pub complaint_type: Option<String>,
    /// Case-insensitive substring of the descriptor.
    pub descriptor: Option<String>,
    /// One of Open, In Progress, Pending, Assigned, Started, Closed.
    pub status: Option<String>,
    /// Maximum records to return, 1-5000. Defaults to 100.
    pub limit: Option<f64>,
}

impl From<ComplaintSearchParams> for ComplaintSearchRequest {
    fn from(params: ComplaintSearchParams) -> Self {
        Self {
            borough: params.borough,
            days: params.days,
            complaint_type: params.complaint_type,
            descriptor: params.descriptor,
            status: params.status,
            limit: params.limit,
        }
    }
}

/// Parameters for daily 311 complaint counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ComplaintTrendsParams {
    pub borough: Option<String>,
    /// Whole days back from today, 1-365. At least 14 are needed for a trend.
    pub days: Option<f64>,
    pub complaint_type: Option<String>,
    /// How many leading complaint types to report, 1-50. Defaults to 10.
    pub top: Option<f64>,
}

impl From<ComplaintTrendsParams> for ComplaintTrendsRequest {
    fn from(params: ComplaintTrendsParams) -> Self {
        Self {
            borough: params.borough,
            days: params.days,
            complaint_type: params.complaint_type,
            top: params.top,
        }
    }
}

#[tool_router(router = tool_router_complaints, vis = "pub")]
impl<S: RowSource> NycMcp<S> {
    #[tool(description = "Search NYC 311 service requests by borough, time window, complaint type, descriptor, and status. Returns newest first with borough and neighborhood enrichment.")]
    async fn search_complaints(
        &self,
        Parameters(params): Parameters<ComplaintSearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let envelope = self.control().search_complaints(params.into()).await;
        helpers::envelope_result(&envelope)
    }

    #[tool(description = "Daily 311 complaint counts over a window with a last-7-days vs previous-7-days trend and the leading complaint types.")]
    async fn complaint_trends(
        &self,
        Parameters(params): Parameters<ComplaintTrendsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let envelope = self.control().complaint_trends(params.into()).await;
        helpers::envelope_result(&envelope)
    }
}
