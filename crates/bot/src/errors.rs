use thiserror::Error;

/// Typed error hierarchy for the bot.
///
/// Library-internal errors use specific variants; application code wraps with
/// `anyhow::Context` for propagation.
#[derive(Error, Debug)]
pub enum BotError {
    // -- Exchange -----------------------------------------------------------
    #[error("exchange error: {reason}")]
    Exchange { reason: String },

    #[error("order rejected: {reason}")]
    OrderRejected { reason: String },

    // -- Data ---------------------------------------------------------------
    #[error("data source unavailable: {name}")]
    DataUnavailable { name: String },

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = BotError::Exchange {
            reason: "HTTP 500".into(),
        };
        assert_eq!(e.to_string(), "exchange error: HTTP 500");

        let e = BotError::OrderRejected {
            reason: "margin is insufficient".into(),
        };
        assert_eq!(e.to_string(), "order rejected: margin is insufficient");

        let e = BotError::DataUnavailable {
            name: "klines".into(),
        };
        assert_eq!(e.to_string(), "data source unavailable: klines");
    }
}
