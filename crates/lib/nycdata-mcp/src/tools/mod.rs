//! MCP tool modules.
//!
//! Tools are grouped by dataset: 311 complaints, HPD housing violations,
//! DOT street closures, permitted events, PLUTO building profiles, and
//! contextual help.

mod buildings;
mod complaints;
mod context;
mod events;
mod housing;
mod streets;

pub use buildings::BuildingProfileParams;
pub use complaints::{ComplaintSearchParams, ComplaintTrendsParams};
pub use events::PermittedEventsParams;
pub use housing::HousingViolationsParams;
pub use streets::StreetClosuresParams;
