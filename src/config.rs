use std::collections::HashSet;
use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Weekday};
use dotenvy::dotenv;

use crate::application::{
    handlers::followup_scheduler::TemplateSelection,
    services::{business_hours::BusinessHours, pacing::Pacer},
};

pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub database_url: String,
    pub max_batch_size: usize,
    pub pacing_delay_min_ms: u64,
    pub pacing_delay_max_ms: u64,
    pub max_attempts: u32,
    pub business_hours_start: NaiveTime,
    pub business_hours_end: NaiveTime,
    pub allowed_weekdays: HashSet<Weekday>,
    pub business_utc_offset_hours: i32,
    pub followup_max_count: u32,
    pub followup_batch_size: usize,
    pub followup_selection: TemplateSelection,
    pub validation_batch_size: usize,
    pub gateway_timeout_secs: u64,
}

impl Config {
    pub fn try_parse() -> Result<Config, String> {
        let _ = dotenv();

        Ok(Config {
            port: required_parsed("PORT")?,
            scheme: required("SCHEME")?,
            host: required("HOST")?,
            database_url: required("DATABASE_URL")?,
            max_batch_size: parsed_or("MAX_BATCH_SIZE", 50)?,
            pacing_delay_min_ms: parsed_or("PACING_DELAY_MIN_MS", 2_000)?,
            pacing_delay_max_ms: parsed_or("PACING_DELAY_MAX_MS", 8_000)?,
            max_attempts: parsed_or("MAX_ATTEMPTS", 3)?,
            business_hours_start: parse_time("BUSINESS_HOURS_START", "08:00")?,
            business_hours_end: parse_time("BUSINESS_HOURS_END", "20:00")?,
            allowed_weekdays: parse_weekdays("ALLOWED_WEEKDAYS", "mon,tue,wed,thu,fri")?,
            business_utc_offset_hours: parsed_or("BUSINESS_UTC_OFFSET_HOURS", -3)?,
            followup_max_count: parsed_or("FOLLOWUP_MAX_COUNT", 3)?,
            followup_batch_size: parsed_or("FOLLOWUP_BATCH_SIZE", 30)?,
            followup_selection: parse_selection("FOLLOWUP_SELECTION")?,
            validation_batch_size: parsed_or("VALIDATION_BATCH_SIZE", 10)?,
            gateway_timeout_secs: parsed_or("GATEWAY_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn business_hours(&self) -> Result<BusinessHours, String> {
        let utc_offset = FixedOffset::east_opt(self.business_utc_offset_hours * 3600)
            .ok_or_else(|| "BUSINESS_UTC_OFFSET_HOURS is out of range".to_string())?;
        Ok(BusinessHours {
            start: self.business_hours_start,
            end: self.business_hours_end,
            weekdays: self.allowed_weekdays.clone(),
            utc_offset,
        })
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::new(self.pacing_delay_min_ms, self.pacing_delay_max_ms)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}

fn required(key: &str) -> Result<String, String> {
    var(key).map_err(|_| format!("An error occured while getting {key} env param"))
}

fn required_parsed<T: FromStr>(key: &str) -> Result<T, String> {
    required(key)?
        .parse::<T>()
        .map_err(|_| format!("An error occured while parsing {key} env param"))
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|_| format!("An error occured while parsing {key} env param")),
        Err(_) => Ok(default),
    }
}

fn parse_time(key: &str, default: &str) -> Result<NaiveTime, String> {
    let value = var(key).unwrap_or_else(|_| default.to_string());
    NaiveTime::parse_from_str(&value, "%H:%M")
        .map_err(|_| format!("An error occured while parsing {key} env param"))
}

fn parse_weekdays(key: &str, default: &str) -> Result<HashSet<Weekday>, String> {
    let value = var(key).unwrap_or_else(|_| default.to_string());
    value
        .split(',')
        .map(|day| match day.trim().to_lowercase().as_str() {
            "mon" => Ok(Weekday::Mon),
            "tue" => Ok(Weekday::Tue),
            "wed" => Ok(Weekday::Wed),
            "thu" => Ok(Weekday::Thu),
            "fri" => Ok(Weekday::Fri),
            "sat" => Ok(Weekday::Sat),
            "sun" => Ok(Weekday::Sun),
            _ => Err(format!("An error occured while parsing {key} env param")),
        })
        .collect()
}

fn parse_selection(key: &str) -> Result<TemplateSelection, String> {
    let value = var(key).unwrap_or_else(|_| "sequence".to_string());
    TemplateSelection::from_str(&value)
        .ok_or_else(|| format!("An error occured while parsing {key} env param"))
}
