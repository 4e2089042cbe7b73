//! Recurrence arithmetic
//!
//! Computes the follow-up occurrence of a recurring invoice. Monthly and
//! annual invoices recur without an end date; installment plans stop once
//! the installment index would pass the total.

use billtrack_shared::{Invoice, InvoiceStatus, NewInvoice, RecurrenceKind};
use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use time::{Date, Month, OffsetDateTime};

/// Advance `at` by `months` calendar months, keeping the time of day.
///
/// The day is clamped to the length of the target month, so Jan 31 + 1
/// month is Feb 28 (or Feb 29 in leap years). Returns `None` when the
/// result falls outside the representable date range.
pub fn add_months(at: OffsetDateTime, months: u32) -> Option<OffsetDateTime> {
    let date = at.date();
    let shifted = NaiveDate::from_ymd_opt(
        date.year(),
        u32::from(u8::from(date.month())),
        u32::from(date.day()),
    )?
    .checked_add_months(Months::new(months))?;

    let month = Month::try_from(u8::try_from(shifted.month()).ok()?).ok()?;
    let day = u8::try_from(shifted.day()).ok()?;
    let shifted = Date::from_calendar_date(shifted.year(), month, day).ok()?;
    Some(at.replace_date(shifted))
}

/// Build the successor of a paid recurring invoice, if its policy calls for one.
pub fn next_occurrence(invoice: &Invoice) -> Option<NewInvoice> {
    let (due_date, current_installment) = match invoice.recurrence_type {
        RecurrenceKind::None => return None,
        RecurrenceKind::Monthly => (add_months(invoice.due_date, 1)?, invoice.current_installment),
        RecurrenceKind::Annual => (add_months(invoice.due_date, 12)?, invoice.current_installment),
        RecurrenceKind::Installment => {
            let (Some(current), Some(total)) =
                (invoice.current_installment, invoice.total_installments)
            else {
                tracing::warn!(
                    invoice_id = %invoice.id,
                    "Installment invoice without counters, no successor created"
                );
                return None;
            };

            let next = current.checked_add(1)?;
            if next > total {
                return None;
            }
            (add_months(invoice.due_date, 1)?, Some(next))
        }
    };

    Some(NewInvoice {
        payee: invoice.payee.clone(),
        description: invoice.description.clone(),
        amount: invoice.amount,
        due_date,
        status: InvoiceStatus::Unpaid,
        paid_amount: Decimal::ZERO,
        recurrence_type: invoice.recurrence_type,
        total_installments: invoice.total_installments,
        current_installment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use billtrack_shared::UserId;
    use time::macros::datetime;

    fn invoice(recurrence: RecurrenceKind, due: OffsetDateTime) -> Invoice {
        NewInvoice {
            payee: "Landlord".to_string(),
            description: Some("Rent".to_string()),
            amount: Decimal::new(150000, 2),
            due_date: due,
            status: InvoiceStatus::Paid,
            paid_amount: Decimal::new(150000, 2),
            recurrence_type: recurrence,
            total_installments: None,
            current_installment: None,
        }
        .into_invoice(UserId::new(), datetime!(2024-01-01 0:00 UTC))
    }

    #[test]
    fn test_add_months_simple() {
        assert_eq!(
            add_months(datetime!(2024-03-15 10:30 UTC), 1),
            Some(datetime!(2024-04-15 10:30 UTC))
        );
    }

    #[test]
    fn test_add_months_crosses_year() {
        assert_eq!(
            add_months(datetime!(2024-12-05 0:00 UTC), 1),
            Some(datetime!(2025-01-05 0:00 UTC))
        );
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(
            add_months(datetime!(2024-01-31 0:00 UTC), 1),
            Some(datetime!(2024-02-29 0:00 UTC))
        );
        assert_eq!(
            add_months(datetime!(2023-01-31 0:00 UTC), 1),
            Some(datetime!(2023-02-28 0:00 UTC))
        );
    }

    #[test]
    fn test_add_twelve_months_from_leap_day() {
        assert_eq!(
            add_months(datetime!(2024-02-29 0:00 UTC), 12),
            Some(datetime!(2025-02-28 0:00 UTC))
        );
    }

    #[test]
    fn test_no_recurrence_has_no_successor() {
        let paid = invoice(RecurrenceKind::None, datetime!(2024-05-01 0:00 UTC));
        assert!(next_occurrence(&paid).is_none());
    }

    #[test]
    fn test_monthly_successor_resets_payment() {
        let paid = invoice(RecurrenceKind::Monthly, datetime!(2024-05-01 0:00 UTC));
        let next = next_occurrence(&paid).unwrap();

        assert_eq!(next.due_date, datetime!(2024-06-01 0:00 UTC));
        assert_eq!(next.status, InvoiceStatus::Unpaid);
        assert_eq!(next.paid_amount, Decimal::ZERO);
        assert_eq!(next.amount, paid.amount);
        assert_eq!(next.payee, paid.payee);
        assert_eq!(next.recurrence_type, RecurrenceKind::Monthly);
    }

    #[test]
    fn test_annual_successor() {
        let paid = invoice(RecurrenceKind::Annual, datetime!(2024-05-01 0:00 UTC));
        let next = next_occurrence(&paid).unwrap();
        assert_eq!(next.due_date, datetime!(2025-05-01 0:00 UTC));
        assert_eq!(next.recurrence_type, RecurrenceKind::Annual);
    }

    #[test]
    fn test_installment_increments_index() {
        let mut paid = invoice(RecurrenceKind::Installment, datetime!(2024-05-10 0:00 UTC));
        paid.current_installment = Some(2);
        paid.total_installments = Some(3);

        let next = next_occurrence(&paid).unwrap();
        assert_eq!(next.current_installment, Some(3));
        assert_eq!(next.total_installments, Some(3));
        assert_eq!(next.due_date, datetime!(2024-06-10 0:00 UTC));
    }

    #[test]
    fn test_last_installment_has_no_successor() {
        let mut paid = invoice(RecurrenceKind::Installment, datetime!(2024-05-10 0:00 UTC));
        paid.current_installment = Some(3);
        paid.total_installments = Some(3);
        assert!(next_occurrence(&paid).is_none());
    }

    #[test]
    fn test_installment_without_counters_has_no_successor() {
        let mut paid = invoice(RecurrenceKind::Installment, datetime!(2024-05-10 0:00 UTC));
        paid.total_installments = Some(3);
        assert!(next_occurrence(&paid).is_none());
    }
}
