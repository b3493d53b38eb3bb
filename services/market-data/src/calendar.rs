//! Synthetic economic calendar
//!
//! There is no free calendar feed, so the dashboard shows a generated week
//! built from the recurring releases that move FX markets.

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::types::{CalendarEvent, Impact};

struct Template {
    currency: &'static str,
    title: &'static str,
    impact: Impact,
    /// 0 = Monday
    weekday: u32,
    hour: u32,
    minute: u32,
    /// Typical value and spread for forecast/previous
    typical: f64,
    spread: f64,
    unit: &'static str,
}

const TEMPLATES: &[Template] = &[
    Template { currency: "EUR", title: "Flash Manufacturing PMI", impact: Impact::Medium, weekday: 0, hour: 8, minute: 0, typical: 47.5, spread: 2.0, unit: "" },
    Template { currency: "EUR", title: "Current Account", impact: Impact::Low, weekday: 0, hour: 9, minute: 0, typical: 30.0, spread: 10.0, unit: "B" },
    Template { currency: "JPY", title: "BoJ Policy Rate", impact: Impact::High, weekday: 1, hour: 3, minute: 0, typical: 0.25, spread: 0.0, unit: "%" },
    Template { currency: "EUR", title: "German ZEW Economic Sentiment", impact: Impact::Medium, weekday: 1, hour: 9, minute: 0, typical: 10.0, spread: 8.0, unit: "" },
    Template { currency: "USD", title: "Retail Sales m/m", impact: Impact::Medium, weekday: 1, hour: 12, minute: 30, typical: 0.3, spread: 0.4, unit: "%" },
    Template { currency: "GBP", title: "CPI y/y", impact: Impact::High, weekday: 2, hour: 6, minute: 0, typical: 2.5, spread: 0.6, unit: "%" },
    Template { currency: "USD", title: "CPI m/m", impact: Impact::High, weekday: 2, hour: 12, minute: 30, typical: 0.2, spread: 0.2, unit: "%" },
    Template { currency: "USD", title: "Crude Oil Inventories", impact: Impact::Low, weekday: 2, hour: 14, minute: 30, typical: -1.0, spread: 3.0, unit: "M" },
    Template { currency: "USD", title: "FOMC Statement", impact: Impact::High, weekday: 2, hour: 18, minute: 0, typical: 4.5, spread: 0.0, unit: "%" },
    Template { currency: "NZD", title: "GDP q/q", impact: Impact::Medium, weekday: 2, hour: 21, minute: 45, typical: 0.4, spread: 0.5, unit: "%" },
    Template { currency: "AUD", title: "Employment Change", impact: Impact::High, weekday: 3, hour: 0, minute: 30, typical: 25.0, spread: 20.0, unit: "K" },
    Template { currency: "CHF", title: "SNB Policy Rate", impact: Impact::Medium, weekday: 3, hour: 7, minute: 30, typical: 1.0, spread: 0.0, unit: "%" },
    Template { currency: "GBP", title: "BoE Official Bank Rate", impact: Impact::High, weekday: 3, hour: 11, minute: 0, typical: 5.0, spread: 0.0, unit: "%" },
    Template { currency: "EUR", title: "ECB Main Refinancing Rate", impact: Impact::High, weekday: 3, hour: 12, minute: 15, typical: 4.0, spread: 0.0, unit: "%" },
    Template { currency: "USD", title: "Unemployment Claims", impact: Impact::Medium, weekday: 3, hour: 12, minute: 30, typical: 220.0, spread: 15.0, unit: "K" },
    Template { currency: "USD", title: "Non-Farm Employment Change", impact: Impact::High, weekday: 4, hour: 12, minute: 30, typical: 180.0, spread: 60.0, unit: "K" },
    Template { currency: "CAD", title: "Employment Change", impact: Impact::High, weekday: 4, hour: 12, minute: 30, typical: 20.0, spread: 25.0, unit: "K" },
    Template { currency: "USD", title: "Prelim UoM Consumer Sentiment", impact: Impact::Low, weekday: 4, hour: 14, minute: 0, typical: 70.0, spread: 5.0, unit: "" },
];

/// Filter applied to a generated week
#[derive(Debug, Clone, Default)]
pub struct CalendarFilter {
    pub currency: Option<String>,
    pub min_impact: Option<Impact>,
}

impl CalendarFilter {
    fn accepts(&self, event: &CalendarEvent) -> bool {
        let currency_ok = self
            .currency
            .as_ref()
            .map(|c| c.eq_ignore_ascii_case(&event.currency))
            .unwrap_or(true);
        let impact_ok = self.min_impact.map(|m| event.impact >= m).unwrap_or(true);
        currency_ok && impact_ok
    }
}

pub struct CalendarGenerator {
    rng: Mutex<StdRng>,
}

impl CalendarGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Events for the Monday-Friday week containing `day`, in time order
    pub fn week(&self, day: NaiveDate, filter: &CalendarFilter) -> Vec<CalendarEvent> {
        let monday = day - Duration::days(day.weekday().num_days_from_monday() as i64);
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut events: Vec<CalendarEvent> = TEMPLATES
            .iter()
            .filter_map(|t| {
                let date = monday + Duration::days(t.weekday as i64);
                let naive = date.and_hms_opt(t.hour, t.minute, 0)?;
                let previous = t.typical + rng.gen_range(-1.0..=1.0) * t.spread;
                let forecast = previous + rng.gen_range(-0.5..=0.5) * t.spread;

                Some(CalendarEvent {
                    time: Utc.from_utc_datetime(&naive),
                    currency: t.currency.to_string(),
                    impact: t.impact,
                    title: t.title.to_string(),
                    forecast: Some(format_value(forecast, t.unit)),
                    previous: Some(format_value(previous, t.unit)),
                })
            })
            .filter(|e| filter.accepts(e))
            .collect();

        events.sort_by_key(|e| e.time);
        events
    }

    pub fn this_week(&self, filter: &CalendarFilter) -> Vec<CalendarEvent> {
        self.week(Utc::now().date_naive(), filter)
    }
}

impl Default for CalendarGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn format_value(value: f64, unit: &str) -> String {
    if value.abs() >= 10.0 {
        format!("{:.1}{}", value, unit)
    } else {
        format!("{:.2}{}", value, unit)
    }
}
