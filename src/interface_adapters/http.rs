// Error body shared by every JSON-speaking route.

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable reason, stable enough for clients to display.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
