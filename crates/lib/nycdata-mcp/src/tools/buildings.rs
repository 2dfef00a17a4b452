use nycdata_core::control::BuildingProfileRequest;
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

/// Parameters for a PLUTO tax lot lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BuildingProfileParams {
    /// 10-digit borough-block-lot, e.g. "1000010001".
    pub bbl: Option<String>,
}

impl From<BuildingProfileParams> for BuildingProfileRequest {
    fn from(params: BuildingProfileParams) -> Self {
        Self { bbl: params.bbl }
    }
}

#[tool_router(router = tool_router_buildings, vis = "pub")]
impl<S: RowSource> NycMcp<S> {
    #[tool(description = "Look up PLUTO facts for a tax lot by 10-digit BBL: address, building class, floors, residential units, year built, and assessed value.")]
    async fn building_profile(
        &self,
        Parameters(params): Parameters<BuildingProfileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let envelope = self.control().building_profile(params.into()).await;
        helpers::envelope_result(&envelope)
    }
}
