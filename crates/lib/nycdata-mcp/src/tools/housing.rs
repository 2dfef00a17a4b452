use nycdata_core::control::HousingViolationsRequest;
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

/// Parameters for HPD housing maintenance code violations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HousingViolationsParams {
    pub borough: Option<String>,
    /// Whole days back from today, 1-365. Defaults to 90.
    pub days: Option<f64>,
    /// Violation class: A (non-hazardous), B (hazardous), C (immediately hazardous), or I.
    pub violation_class: Option<String>,
    /// Open or Close.
    pub status: Option<String>,
    /// Case-insensitive substring of the street name.
    pub street: Option<String>,
    pub limit: Option<f64>,
}

impl From<HousingViolationsParams> for HousingViolationsRequest {
    fn from(params: HousingViolationsParams) -> Self {
        Self {
            borough: params.borough,
            days: params.days,
            violation_class: params.violation_class,
            status: params.status,
            street: params.street,
            limit: params.limit,
        }
    }
}

#[tool_router(router = tool_router_housing, vis = "pub")]
impl<S: RowSource> NycMcp<S> {
    #[tool(description = "Search HPD housing code violations by borough, inspection window, class, status, and street. Includes a class severity mix and hazard index.")]
    async fn housing_violations(
        &self,
        Parameters(params): Parameters<HousingViolationsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let envelope = self.control().housing_violations(params.into()).await;
        helpers::envelope_result(&envelope)
    }
}
