// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ForwarderError;
use crate::mmds::SessionOptions;
use serde_json::{Map, Value};

pub const SESSION_ID_KEY: &str = "sessionID";
pub const CODE_SNIPPET_ID_KEY: &str = "codeSnippetID";

/// Overlays the session identifiers onto a JSON log object.
///
/// Every other key keeps its value and position; numbers keep their exact
/// source text. Existing `sessionID` and `codeSnippetID` keys are
/// overwritten in place.
pub fn merge_session_options(
    logs: &[u8],
    options: &SessionOptions,
) -> Result<Vec<u8>, ForwarderError> {
    let mut parsed: Map<String, Value> =
        serde_json::from_slice(logs).map_err(ForwarderError::PayloadParse)?;

    parsed.insert(
        SESSION_ID_KEY.to_string(),
        Value::String(options.session_id.clone()),
    );
    parsed.insert(
        CODE_SNIPPET_ID_KEY.to_string(),
        Value::String(options.code_snippet_id.clone()),
    );

    serde_json::to_vec(&parsed).map_err(ForwarderError::PayloadSerialize)
}
