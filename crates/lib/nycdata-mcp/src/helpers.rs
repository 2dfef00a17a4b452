use nycdata_model::Envelope;
use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content};

/// Wraps an envelope as a tool result. Failure envelopes are reported as tool
/// errors so clients can tell them apart without parsing the payload.
pub(crate) fn envelope_result(envelope: &Envelope) -> Result<CallToolResult, ErrorData> {
    let content = vec![Content::json(envelope)?];
    if envelope.is_success() {
        Ok(CallToolResult::success(content))
    } else {
        Ok(CallToolResult::error(content))
    }
}

#[cfg(test)]
mod tests {
    use nycdata_core::envelope::{EnvelopeBuilder, error_envelope};
    use nycdata_core::{CoreError, InvalidInput};
    use nycdata_model::schema::SERVICE_REQUESTS_311;

    use super::*;

    #[test]
    fn failures_are_flagged_as_tool_errors() {
        let failure = error_envelope(
            &CoreError::from(InvalidInput::new("borough", "bad borough", "use a borough")),
            None,
        );
        let result = envelope_result(&failure).expect("serializes");
        assert_eq!(result.is_error, Some(true));

        let success = EnvelopeBuilder::new(&SERVICE_REQUESTS_311, "311_complaint").search(Vec::new());
        let result = envelope_result(&success).expect("serializes");
        assert_eq!(result.is_error, Some(false));
    }
}
