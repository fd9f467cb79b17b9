use serde::Serialize;

use crate::application::FeedEvent;
use crate::shared::types::YieldUpdate;

pub const YIELD_UPDATE_EVENT: &str = "yield-update";

/// Server-to-client feed frame
#[derive(Debug, Clone, Serialize)]
pub struct FeedMessage<'a> {
    pub event: &'static str,
    pub sequence: u64,
    pub data: &'a [YieldUpdate],
}

impl<'a> From<&'a FeedEvent> for FeedMessage<'a> {
    fn from(event: &'a FeedEvent) -> Self {
        FeedMessage {
            event: YIELD_UPDATE_EVENT,
            sequence: event.sequence,
            data: &event.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_frame_shape() {
        let event = FeedEvent {
            sequence: 7,
            timestamp: Utc::now(),
            records: vec![YieldUpdate {
                symbol: "USDC".to_string(),
                name: "USD Coin".to_string(),
                apy: 4.25,
                tvl: 1.2e9,
                timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
            }],
        };

        let json = serde_json::to_value(FeedMessage::from(&event)).unwrap();
        assert_eq!(json["event"], "yield-update");
        assert_eq!(json["sequence"], 7);
        assert_eq!(json["data"][0]["symbol"], "USDC");
        assert_eq!(json["data"][0]["timestamp"], "2024-05-01T10:30:00Z");
    }
}
