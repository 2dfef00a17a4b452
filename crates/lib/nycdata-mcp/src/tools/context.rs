use nycdata_core::source::RowSource;
use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::NycMcp;

/// Payload listing the MCP commands this server exposes.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub commands: Vec<String>,
}

impl Default for HelpCommands {
    fn default() -> Self {
        Self {
            commands: vec![
                "help - List MCP commands and what they answer.".to_string(),
                "datasets_help - Describe the NYC Open Data datasets behind each tool and the envelope format."
                    .to_string(),
                "search_complaints - Search 311 service requests.".to_string(),
                "complaint_trends - Daily 311 counts with a week-over-week trend.".to_string(),
                "housing_violations - HPD housing code violations with a severity mix."
                    .to_string(),
                "street_closures - DOT street closures overlapping a window.".to_string(),
                "permitted_events - Permitted street events, parades, and park events."
                    .to_string(),
                "building_profile - PLUTO tax lot facts by BBL.".to_string(),
                "service_status - Request rate, cache occupancy, and hard caps.".to_string(),
                "health - Returns 'ok'.".to_string(),
            ],
        }
    }
}

#[tool_router(router = tool_router_context, vis = "pub")]
impl<S: RowSource> NycMcp<S> {
    #[tool(description = "List the MCP commands and what each one answers.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(HelpCommands::default())?]))
    }

    #[tool(description = "Describe the NYC Open Data datasets behind each tool, shared parameters, and the response envelope.")]
    async fn datasets_help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text(
r#"
1.  Datasets (Socrata four-by-four ids on data.cityofnewyork.us):
        - erm2-nwe9  311 Service Requests            -> search_complaints, complaint_trends
        - wvxf-dwi5  HPD Housing Maintenance Code Violations -> housing_violations
        - i6b5-j7bu  DOT Street Closures by Block     -> street_closures
        - tvpp-9vvx  NYC Permitted Event Information  -> permitted_events
        - 64uk-42ks  DCP PLUTO tax lots               -> building_profile
2.  Shared parameters:
        - borough: MANHATTAN, BRONX, BROOKLYN, QUEENS, STATEN ISLAND, a short code
          (MN, BX, BK, QN, SI), or 1-5. Omit for citywide.
        - days: whole days back from today. The window starts at local midnight and
          ends at 23:59:59 today. Hard cap 365.
        - limit: records to return. Hard cap 5000; aggregated queries allow more rows
          upstream but return one record per period/topic.
        Text filters are substring matches, case-insensitive, at most 100 characters.
3.  Every record is normalized: timestamp, period (YYYY-MM-DD), topic, value, geo
    (borough, communityDistrict, ntaCode, ntaName, bbl, lat, lon), and the raw row
    under details. Duplicates are collapsed; meta.deduplication reports how many.
4.  Envelope on success:
        {"success": true, "source": ..., "eventType": ..., "window": {...},
         "count": ..., "records": [...], "meta": {...}, "insights": {...}}
    Envelope on failure:
        {"success": false, "error": {"type": "INVALID_INPUT" | "RATE_LIMIT_EXCEEDED" |
         "UPSTREAM_ERROR" | "TRANSIENT_FAILURE", "message": ...,
         "details": {...}, "guidance": ...}}
5.  Responses are cached briefly (311 and closures: 5 minutes; trends, violations,
    and events: 15 minutes; PLUTO: 1 hour). `meta.cached` tells you whether an
    answer came from cache. Transient upstream failures are retried with backoff.
"#
        )]))
    }
}
