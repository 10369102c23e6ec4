use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Source of the latest known quotes at or before a timestamp.
///
/// `None` means no quote is known for the asset at that time. During order
/// execution that is a hard failure; during mark-to-market the previous
/// mark is simply kept.
pub trait PriceSource {
    fn latest_bid_ask(&self, dt: DateTime<Utc>, asset: &str) -> Option<(Decimal, Decimal)>;

    fn latest_mid(&self, dt: DateTime<Utc>, asset: &str) -> Option<Decimal>;
}

/// Trading-hours collaborator: queued orders execute only while open.
pub trait ExchangeCalendar {
    fn is_open_at(&self, dt: DateTime<Utc>) -> bool;
}

/// A calendar that never closes, for always-on markets and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpenCalendar;

impl ExchangeCalendar for AlwaysOpenCalendar {
    fn is_open_at(&self, _dt: DateTime<Utc>) -> bool {
        true
    }
}
