//! Change events pushed to observers.
//!
//! Every tick produces two events, in this order:
//!
//! ```text
//! {"event":"time","data":"14:03:27"}
//! {"event":"isStock","data":"In stock: 12"}
//! ```
//!
//! The stock payload is either [`OUT_OF_STOCK_MESSAGE`] or `In stock: <N>`;
//! the numeric suffix is never attached to the out-of-stock text.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Stock payload sent while quantity is zero.
pub const OUT_OF_STOCK_MESSAGE: &str = "Product X is out of stock";

/// Kind of a [`ChangeEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    /// Wall-clock heartbeat
    #[serde(rename = "time")]
    Time,
    /// Stock status message
    #[serde(rename = "isStock")]
    Stock,
}

impl EventKind {
    /// Name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Stock => "isStock",
        }
    }
}

/// One immutable notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    #[serde(rename = "event")]
    kind: EventKind,
    #[serde(rename = "data")]
    payload: String,
}

impl ChangeEvent {
    /// Heartbeat carrying the wall-clock time as `HH:MM:SS`.
    #[must_use]
    pub fn time(now: DateTime<FixedOffset>) -> Self {
        Self {
            kind: EventKind::Time,
            payload: now.format("%H:%M:%S").to_string(),
        }
    }

    /// Stock status event carrying a preformatted message.
    #[must_use]
    pub fn stock(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Stock,
            payload: message.into(),
        }
    }

    /// Kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Payload text.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// JSON frame body: `{"event":"<kind>","data":"<payload>"}`.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; unreachable for these plain string fields
    /// but surfaced rather than hidden.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Format the stock status message for a quantity.
///
/// # Examples
///
/// ```
/// use stockwatch_core::stock_message;
///
/// assert_eq!(stock_message(0), "Product X is out of stock");
/// assert_eq!(stock_message(5), "In stock: 5");
/// ```
#[must_use]
pub fn stock_message(quantity: u32) -> String {
    if quantity == 0 {
        OUT_OF_STOCK_MESSAGE.to_string()
    } else {
        format!("In stock: {quantity}")
    }
}
