use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Who is performing a mutation, and which inbound request it belongs to.
///
/// Produced by the boundary layer for every call. `request_id` is passed
/// through verbatim so all audit entries of one user action can be grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequestContext {
    /// User id of the acting principal.
    pub performed_by: String,
    /// Correlation token supplied by the caller, if any.
    pub request_id: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(performed_by: impl Into<String>) -> Self {
        Self {
            performed_by: performed_by.into(),
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}
