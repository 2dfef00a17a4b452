//! MCP server implementation for nycdata-mcp.
//!
//! This crate wires the open-data control plane into rmcp tool handlers and
//! exposes the MCP-facing API surface for NYC Open Data queries.

mod helpers;
pub mod server;
mod tools;

use nycdata_core::OpenDataControl;
use nycdata_core::source::RowSource;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{
    ErrorData, ServerHandler, handler::server::tool::ToolRouter, tool, tool_handler, tool_router,
};

pub use tools::{
    BuildingProfileParams, ComplaintSearchParams, ComplaintTrendsParams, HousingViolationsParams,
    PermittedEventsParams, StreetClosuresParams,
};

const SERVER_INSTRUCTIONS: &str = r"nycdata-mcp answers questions about New York City using NYC Open Data (Socrata).

Tools:
- `search_complaints`: 311 service requests, newest first.
- `complaint_trends`: daily 311 counts with a week-over-week trend and the leading complaint types.
- `housing_violations`: HPD housing code violations with a class A/B/C severity mix.
- `street_closures`: DOT street closures overlapping a window, with active/finished counts.
- `permitted_events`: permitted street events, parades, and park events.
- `building_profile`: PLUTO tax lot facts for a 10-digit BBL.
- `service_status`: request rate, cache occupancy, and hard caps.

Notes:
- `borough` accepts full names, short codes (MN, BX, BK, QN, SI), or 1-5.
- `days` is a whole number of days back from today (at most 365); windows run midnight to end of day.
- `limit` caps returned records (at most 5000).
- Every tool answers with an envelope: `success`, `source`, `eventType`, `window`, `count`, `records`, `meta`, `insights`.
  Failures carry `error.type`, `error.message`, `error.details`, and `error.guidance`.
- Use `help` and `datasets_help` for details. `health` returns `ok`.";

/// MCP server wrapper around the open-data control plane and tool routers.
pub struct NycMcp<S: RowSource> {
    tool_router: ToolRouter<Self>,
    control: OpenDataControl<S>,
}

impl<S: RowSource> Clone for NycMcp<S> {
    fn clone(&self) -> Self {
        Self {
            tool_router: self.tool_router.clone(),
            control: self.control.clone(),
        }
    }
}

impl<S: RowSource> NycMcp<S> {
    /// Creates a new server over a control plane. Clones share its cache and
    /// rate state.
    #[must_use]
    pub fn new(control: OpenDataControl<S>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_context()
            + Self::tool_router_complaints()
            + Self::tool_router_housing()
            + Self::tool_router_streets()
            + Self::tool_router_events()
            + Self::tool_router_buildings();
        Self {
            tool_router,
            control,
        }
    }

    #[must_use]
    pub const fn control(&self) -> &OpenDataControl<S> {
        &self.control
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl<S: RowSource> NycMcp<S> {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }

    #[tool(description = "Report the advisory request rate, query cache occupancy, cache TTLs, and hard caps on days and limit.")]
    async fn service_status(&self) -> Result<CallToolResult, ErrorData> {
        let status = self.control.service_status().await;
        Ok(CallToolResult::success(vec![Content::json(status)?]))
    }
}

#[tool_handler]
impl<S: RowSource> ServerHandler for NycMcp<S> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
