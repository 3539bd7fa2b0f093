//! Recurring voucher schedules and next-run-date computation

use bigdecimal::BigDecimal;
use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::traits::VoucherStorage;
use crate::types::*;

/// How often a recurring voucher runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

/// Last failure recorded against a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRunError {
    pub message: String,
    pub date: NaiveDateTime,
}

/// A schedule bound to one template
///
/// `next_run_date` is the authoritative cursor; it only advances when a run
/// succeeds, so a failed run is retried at the same date until it goes
/// through or the schedule is paused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringVoucher {
    pub id: Uuid,
    pub name: String,
    pub template_id: Uuid,
    pub frequency: Frequency,
    /// Repeat every N periods
    pub interval: u32,
    /// Weekly: day of week to land on (0 = Sunday .. 6 = Saturday)
    pub week_day: Option<u32>,
    /// Monthly/quarterly/yearly: day of month to pin to
    pub day_of_month: Option<u32>,
    /// Yearly: month to pin to (1-12)
    pub month_of_year: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_run_date: NaiveDate,
    pub last_run_date: Option<NaiveDate>,
    pub is_active: bool,
    pub is_paused: bool,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub retry_count: u32,
    pub last_error: Option<LastRunError>,
    /// Stored variable overrides merged over the per-run defaults
    pub variable_values: HashMap<String, String>,
    pub auto_approve: bool,
    pub max_auto_approval_amount: Option<BigDecimal>,
    pub notify_on_success: bool,
    pub notify_on_failure: bool,
    pub notification_recipient: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

impl RecurringVoucher {
    /// Create a new active schedule whose first run is the start date
    pub fn new(
        name: String,
        template_id: Uuid,
        frequency: Frequency,
        interval: u32,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            template_id,
            frequency,
            interval,
            week_day: None,
            day_of_month: None,
            month_of_year: None,
            start_date,
            end_date: None,
            next_run_date: start_date,
            last_run_date: None,
            is_active: true,
            is_paused: false,
            total_runs: 0,
            successful_runs: 0,
            failed_runs: 0,
            retry_count: 0,
            last_error: None,
            variable_values: HashMap::new(),
            auto_approve: false,
            max_auto_approval_amount: None,
            notify_on_success: false,
            notify_on_failure: false,
            notification_recipient: None,
            created_by: String::new(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Whether this schedule should run on the given date
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.is_active
            && !self.is_paused
            && self.next_run_date <= today
            && self.end_date.map_or(true, |end| end >= today)
    }

    /// Compute the run date that follows the given base date
    ///
    /// The base is the last successful run, or the start date before the
    /// first run. Day-of-month pins clamp to the last day of the target
    /// month for monthly, quarterly, and yearly schedules alike.
    pub fn next_run_from(&self, base: NaiveDate) -> VoucherResult<NaiveDate> {
        let out_of_range =
            || VoucherError::Validation(format!("Next run date out of range for '{}'", self.name));

        match self.frequency {
            Frequency::Daily => base
                .checked_add_days(Days::new(u64::from(self.interval)))
                .ok_or_else(out_of_range),
            Frequency::Weekly => {
                let mut next = base
                    .checked_add_days(Days::new(7 * u64::from(self.interval)))
                    .ok_or_else(out_of_range)?;
                if let Some(target) = self.week_day {
                    let current = next.weekday().num_days_from_sunday();
                    let shift = (target + 7 - current) % 7;
                    next = next
                        .checked_add_days(Days::new(u64::from(shift)))
                        .ok_or_else(out_of_range)?;
                }
                Ok(next)
            }
            Frequency::Monthly => {
                let next = base
                    .checked_add_months(Months::new(self.interval))
                    .ok_or_else(out_of_range)?;
                Ok(self.pin_day(next))
            }
            Frequency::Quarterly => {
                let next = base
                    .checked_add_months(Months::new(3 * self.interval))
                    .ok_or_else(out_of_range)?;
                Ok(self.pin_day(next))
            }
            Frequency::Yearly => {
                let mut next = base
                    .checked_add_months(Months::new(12 * self.interval))
                    .ok_or_else(out_of_range)?;
                if let (Some(month), Some(day)) = (self.month_of_year, self.day_of_month) {
                    next = pin_to(next.year(), month, day).unwrap_or(next);
                }
                Ok(next)
            }
        }
    }

    fn pin_day(&self, date: NaiveDate) -> NaiveDate {
        match self.day_of_month {
            Some(day) => pin_to(date.year(), date.month(), day).unwrap_or(date),
            None => date,
        }
    }
}

/// Resolve a year/month/day, clamping the day to the month's last day
fn pin_to(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| last_day_of_month(year, month))
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

/// Per-item outcome of a batch scheduler run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRunOutcome {
    pub recurring_id: Uuid,
    pub success: bool,
    pub voucher_number: Option<String>,
    pub error: Option<String>,
}

/// Manager for recurring schedules and their run bookkeeping
pub struct RecurringManager<S: VoucherStorage> {
    storage: S,
}

impl<S: VoucherStorage> RecurringManager<S> {
    /// Create a new recurring manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Save a new schedule
    pub async fn create_recurring(
        &mut self,
        recurring: RecurringVoucher,
    ) -> VoucherResult<RecurringVoucher> {
        if recurring.interval == 0 {
            return Err(VoucherError::Validation(
                "Recurring interval must be at least 1".to_string(),
            ));
        }
        self.storage.save_recurring(&recurring).await?;
        Ok(recurring)
    }

    /// Get a schedule by id, failing if unknown
    pub async fn get_recurring_required(
        &self,
        recurring_id: Uuid,
    ) -> VoucherResult<RecurringVoucher> {
        self.storage
            .get_recurring(recurring_id)
            .await?
            .ok_or_else(|| VoucherError::RecurringNotFound(recurring_id.to_string()))
    }

    /// Schedules due to run on or before the given date
    pub async fn due(&self, today: NaiveDate) -> VoucherResult<Vec<RecurringVoucher>> {
        self.storage.due_recurring(today).await
    }

    /// Pause a schedule
    pub async fn pause(&mut self, recurring_id: Uuid) -> VoucherResult<RecurringVoucher> {
        let mut recurring = self.get_recurring_required(recurring_id).await?;
        recurring.is_paused = true;
        self.storage.update_recurring(&recurring).await?;
        Ok(recurring)
    }

    /// Resume a paused schedule
    pub async fn resume(&mut self, recurring_id: Uuid) -> VoucherResult<RecurringVoucher> {
        let mut recurring = self.get_recurring_required(recurring_id).await?;
        recurring.is_paused = false;
        self.storage.update_recurring(&recurring).await?;
        Ok(recurring)
    }

    /// Record a successful run: advance the cursor and reset retry state
    pub async fn record_success(
        &mut self,
        mut recurring: RecurringVoucher,
        run_date: NaiveDate,
    ) -> VoucherResult<RecurringVoucher> {
        recurring.total_runs += 1;
        recurring.successful_runs += 1;
        recurring.retry_count = 0;
        recurring.last_error = None;
        recurring.last_run_date = Some(run_date);
        recurring.next_run_date = recurring.next_run_from(run_date)?;
        self.storage.update_recurring(&recurring).await?;
        Ok(recurring)
    }

    /// Record a failed run; the cursor stays put so the run is retried
    pub async fn record_failure(
        &mut self,
        mut recurring: RecurringVoucher,
        message: String,
    ) -> VoucherResult<RecurringVoucher> {
        recurring.total_runs += 1;
        recurring.failed_runs += 1;
        recurring.retry_count += 1;
        recurring.last_error = Some(LastRunError {
            message,
            date: chrono::Utc::now().naive_utc(),
        });
        self.storage.update_recurring(&recurring).await?;
        Ok(recurring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(frequency: Frequency, interval: u32) -> RecurringVoucher {
        RecurringVoucher::new(
            "Test".to_string(),
            Uuid::new_v4(),
            frequency,
            interval,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_daily_advances_by_interval() {
        let mut rec = schedule(Frequency::Daily, 3);
        rec.last_run_date = Some(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let next = rec
            .next_run_from(rec.last_run_date.unwrap())
            .unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 1, 13).unwrap());
    }

    #[test]
    fn test_weekly_lands_on_configured_weekday() {
        let mut rec = schedule(Frequency::Weekly, 1);
        rec.week_day = Some(1); // Monday
        // 2024-01-03 is a Wednesday; a week later is Wed Jan 10, shifted
        // forward to Monday Jan 15.
        let next = rec
            .next_run_from(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
            .unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_weekly_without_weekday_is_plain_seven_days() {
        let rec = schedule(Frequency::Weekly, 2);
        let next = rec
            .next_run_from(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
            .unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 1, 17).unwrap());
    }

    #[test]
    fn test_monthly_day_31_clamps_to_february_end() {
        let mut rec = schedule(Frequency::Monthly, 1);
        rec.day_of_month = Some(31);

        let next = rec
            .next_run_from(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
            .unwrap();
        // 2024 is a leap year.
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let next = rec
            .next_run_from(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap())
            .unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
    }

    #[test]
    fn test_monthly_pin_restores_high_day_after_short_month() {
        let mut rec = schedule(Frequency::Monthly, 1);
        rec.day_of_month = Some(31);
        let next = rec
            .next_run_from(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
            .unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
    }

    #[test]
    fn test_quarterly_day_pin_clamps_like_monthly() {
        // Quarterly uses the same clamped pin as monthly.
        let mut rec = schedule(Frequency::Quarterly, 1);
        rec.day_of_month = Some(31);
        let next = rec
            .next_run_from(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
            .unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
    }

    #[test]
    fn test_yearly_pins_month_and_day() {
        let mut rec = schedule(Frequency::Yearly, 1);
        rec.month_of_year = Some(2);
        rec.day_of_month = Some(29);
        let next = rec
            .next_run_from(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
            .unwrap();
        // 2025 is not a leap year; the pin clamps to Feb 28.
        assert_eq!(next, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn test_due_filter() {
        let mut rec = schedule(Frequency::Daily, 1);
        rec.next_run_date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(rec.is_due(today));

        rec.is_paused = true;
        assert!(!rec.is_due(today));
        rec.is_paused = false;

        rec.end_date = Some(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
        assert!(!rec.is_due(today));

        rec.end_date = None;
        rec.next_run_date = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert!(!rec.is_due(today));
    }
}
