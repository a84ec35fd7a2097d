//! Order numbers and their daily sequence.
//!
//! Numbers look like `APP-20260314-00042`: a prefix per order kind, the UTC
//! date of issue and a five-digit sequence that restarts every day.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use common::OrderKind;
use serde::{Deserialize, Serialize};

use crate::error::SequenceError;

/// Largest sequence number that fits the five-digit field.
pub const MAX_SEQUENCE: u32 = 99_999;

const DATE_FORMAT: &str = "%Y%m%d";

/// Returns the number prefix used for an order kind.
pub fn prefix_for(kind: OrderKind) -> &'static str {
    match kind {
        OrderKind::Application => "APP",
        OrderKind::Fulfillment => "FUL",
    }
}

/// A validated order number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber {
    raw: String,
    prefix_len: usize,
    date: NaiveDate,
    sequence: u32,
}

impl OrderNumber {
    fn compose(prefix: &str, date: NaiveDate, sequence: u32) -> Self {
        Self {
            raw: format!("{prefix}-{}-{sequence:05}", date.format(DATE_FORMAT)),
            prefix_len: prefix.len(),
            date,
            sequence,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.raw[..self.prefix_len]
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for OrderNumber {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SequenceError::Malformed(s.to_string());
        let mut parts = s.splitn(3, '-');
        let (Some(prefix), Some(date), Some(sequence)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if prefix.is_empty()
            || !prefix.chars().all(|c| c.is_ascii_uppercase())
            || date.len() != 8
            || sequence.len() != 5
            || !sequence.chars().all(|c| c.is_ascii_digit())
        {
            return Err(malformed());
        }
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| malformed())?;
        let sequence: u32 = sequence.parse().map_err(|_| malformed())?;
        if sequence == 0 {
            return Err(malformed());
        }
        Ok(Self::compose(prefix, date, sequence))
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = SequenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.raw
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy)]
struct DailyCounter {
    date: NaiveDate,
    last: u32,
}

/// Issues order numbers, one independent daily counter per prefix.
pub struct SequenceGenerator {
    clock: Arc<dyn Clock>,
    counters: Mutex<HashMap<String, DailyCounter>>,
}

impl SequenceGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Today's UTC date according to the generator's clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// The `<PREFIX>-<YYYYMMDD>-` stem shared by every number issued today.
    pub fn today_stem(&self, prefix: &str) -> String {
        format!("{prefix}-{}-", self.today().format(DATE_FORMAT))
    }

    /// Makes sure numbers issued after this call sort after `last`.
    ///
    /// Numbers from an earlier day are ignored because the sequence restarts.
    pub fn seed(&self, last: &OrderNumber) {
        if last.date() != self.today() {
            return;
        }
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = counters
            .entry(last.prefix().to_string())
            .or_insert(DailyCounter {
                date: last.date(),
                last: 0,
            });
        if counter.date != last.date() {
            *counter = DailyCounter {
                date: last.date(),
                last: 0,
            };
        }
        counter.last = counter.last.max(last.sequence());
    }

    /// Issues the next number for `prefix`.
    pub fn next(&self, prefix: &str) -> Result<OrderNumber, SequenceError> {
        let today = self.today();
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(prefix.to_string()).or_insert(DailyCounter {
            date: today,
            last: 0,
        });
        if counter.date != today {
            *counter = DailyCounter {
                date: today,
                last: 0,
            };
        }
        if counter.last >= MAX_SEQUENCE {
            return Err(SequenceError::SequenceExhausted {
                prefix: prefix.to_string(),
                date: today.format(DATE_FORMAT).to_string(),
            });
        }
        counter.last += 1;
        Ok(OrderNumber::compose(prefix, today, counter.last))
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for SequenceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceGenerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock_at(y: i32, m: u32, d: u32, h: u32) -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    #[test]
    fn test_numbers_are_sequential_per_prefix() {
        let clock = clock_at(2026, 3, 14, 9);
        let generator = SequenceGenerator::new(Arc::new(clock));

        assert_eq!(generator.next("APP").unwrap().as_str(), "APP-20260314-00001");
        assert_eq!(generator.next("APP").unwrap().as_str(), "APP-20260314-00002");
        assert_eq!(generator.next("FUL").unwrap().as_str(), "FUL-20260314-00001");
        assert_eq!(generator.next("APP").unwrap().sequence(), 3);
    }

    #[test]
    fn test_sequence_resets_at_utc_midnight() {
        let clock = clock_at(2026, 3, 14, 23);
        let generator = SequenceGenerator::new(Arc::new(clock.clone()));

        generator.next("APP").unwrap();
        generator.next("APP").unwrap();
        clock.advance(chrono::Duration::hours(2));

        let number = generator.next("APP").unwrap();
        assert_eq!(number.as_str(), "APP-20260315-00001");
    }

    #[test]
    fn test_seed_continues_after_persisted_number() {
        let clock = clock_at(2026, 3, 14, 9);
        let generator = SequenceGenerator::new(Arc::new(clock));

        generator.seed(&"APP-20260314-00041".parse().unwrap());
        generator.seed(&"APP-20260314-00007".parse().unwrap());
        generator.seed(&"FUL-20260313-00500".parse().unwrap());

        assert_eq!(generator.next("APP").unwrap().sequence(), 42);
        assert_eq!(generator.next("FUL").unwrap().sequence(), 1);
    }

    #[test]
    fn test_exhausted_sequence_errors_instead_of_wrapping() {
        let clock = clock_at(2026, 3, 14, 9);
        let generator = SequenceGenerator::new(Arc::new(clock));
        generator.seed(&"APP-20260314-99998".parse().unwrap());

        assert_eq!(generator.next("APP").unwrap().sequence(), 99_999);
        assert!(matches!(
            generator.next("APP"),
            Err(SequenceError::SequenceExhausted { .. })
        ));
        assert!(matches!(
            generator.next("APP"),
            Err(SequenceError::SequenceExhausted { .. })
        ));
    }

    #[test]
    fn test_today_stem() {
        let generator = SequenceGenerator::new(Arc::new(clock_at(2026, 1, 2, 0)));
        assert_eq!(generator.today_stem("FUL"), "FUL-20260102-");
    }

    #[test]
    fn test_parse_order_number() {
        let number: OrderNumber = "FUL-20251231-00420".parse().unwrap();
        assert_eq!(number.prefix(), "FUL");
        assert_eq!(number.date(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(number.sequence(), 420);
        assert_eq!(number.to_string(), "FUL-20251231-00420");
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        for raw in [
            "",
            "APP",
            "APP-20250101",
            "app-20250101-00001",
            "APP-2025011-00001",
            "APP-20251301-00001",
            "APP-20250101-1",
            "APP-20250101-00000",
            "APP-20250101-0000x",
        ] {
            assert!(raw.parse::<OrderNumber>().is_err(), "{raw} should not parse");
        }
    }

    #[test]
    fn test_serde_uses_plain_string() {
        let number: OrderNumber = "APP-20250101-00001".parse().unwrap();
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "\"APP-20250101-00001\"");
        let back: OrderNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, number);
        assert!(serde_json::from_str::<OrderNumber>("\"nope\"").is_err());
    }

    #[test]
    fn test_prefixes_per_kind() {
        assert_eq!(prefix_for(OrderKind::Application), "APP");
        assert_eq!(prefix_for(OrderKind::Fulfillment), "FUL");
    }

    #[test]
    fn test_concurrent_issuers_never_share_a_number() {
        let generator = Arc::new(SequenceGenerator::new(Arc::new(clock_at(2026, 5, 5, 5))));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| generator.next("APP").unwrap().sequence())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
        assert_eq!(all.last(), Some(&800));
    }
}
