#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("hex error in {field}: {reason}")]
    Hex { field: &'static str, reason: String },

    #[error("decode error: {reason}")]
    Decode { reason: String },

    #[error("protocol error: {reason}")]
    Protocol { reason: String },

    #[error("publish error on {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("config error: {reason}")]
    Config { reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Decode faults are the fatal class: a log or instruction that passed
    /// filtering but could not be interpreted.
    pub fn is_decode_fault(&self) -> bool {
        matches!(
            self,
            Self::Hex { .. } | Self::Decode { .. } | Self::Protocol { .. }
        )
    }
}
