//! Checks applied to a purchase before anything is written to the ledger

use std::fmt::Display;

use chrono::NaiveDate;

use crate::{
    errors::Error,
    money::Cents,
    types::{Transaction, TransactionKind},
};

/// A request to record a purchase (or an income), possibly paid in installments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    /// Income or expense
    pub kind: TransactionKind,
    /// Short description, e.g. the merchant
    pub title: String,
    /// Spending or income category
    pub category: String,
    /// Who made the purchase
    pub purchaser: Option<String>,
    /// Total amount; must be positive
    pub total: Cents,
    /// Number of installments; must be at least 1
    pub installments: u32,
    /// Due date of the first installment
    pub first_due: NaiveDate,
}

/// Thresholds above which a purchase is still accepted, but flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    /// Installment counts above this are flagged with [`ValidationWarning::ManyInstallments`]
    pub max_installments: u32,
    /// Totals above this are flagged with [`ValidationWarning::LargeAmount`]
    pub large_amount: Cents,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_installments: 60,
            large_amount: Cents::from(100_000_000),
        }
    }
}

/// Something unusual about an otherwise valid [`PurchaseRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationWarning {
    /// An income split into more than one installment
    InstallmentsOnIncome,
    /// More installments than [`ValidationLimits::max_installments`]
    ManyInstallments(u32),
    /// A total above [`ValidationLimits::large_amount`]
    LargeAmount(Cents),
}

impl Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::InstallmentsOnIncome => {
                write!(f, "installments are usually only used for expenses")
            }
            ValidationWarning::ManyInstallments(count) => {
                write!(f, "unusually high number of installments ({count})")
            }
            ValidationWarning::LargeAmount(total) => {
                write!(f, "unusually large amount ({})", total.brl())
            }
        }
    }
}

/// Checks a purchase, returning the warnings it raises.
///
/// # Errors
/// [`Error::InvalidArgument`] if the total is not positive, the installment count is zero,
/// or the title or category is blank
pub fn validate_purchase(
    request: &PurchaseRequest,
    limits: &ValidationLimits,
) -> Result<Vec<ValidationWarning>, Error> {
    if request.total <= Cents::ZERO {
        return Err(Error::InvalidArgument(format!(
            "amount must be greater than zero, got {}",
            request.total
        )));
    }
    if request.installments < 1 {
        return Err(Error::InvalidArgument(
            "installment count must be at least 1".into(),
        ));
    }
    if sanitize_text(&request.title).is_empty() {
        return Err(Error::InvalidArgument("title is required".into()));
    }
    if sanitize_text(&request.category).is_empty() {
        return Err(Error::InvalidArgument("category is required".into()));
    }

    let mut warnings = vec![];
    if request.installments > 1 && request.kind == TransactionKind::Income {
        warnings.push(ValidationWarning::InstallmentsOnIncome);
    }
    if request.installments > limits.max_installments {
        warnings.push(ValidationWarning::ManyInstallments(request.installments));
    }
    if request.total > limits.large_amount {
        warnings.push(ValidationWarning::LargeAmount(request.total));
    }
    Ok(warnings)
}

/// Checks a stored transaction, e.g. one read back from a ledger file.
///
/// # Errors
/// [`Error::InvalidArgument`] if the amount is negative, if only some of `parent`,
/// `installment_number` and `total_installments` are set, or if the installment position is
/// not within `1..=total_installments`
pub fn check_record(transaction: &Transaction) -> Result<(), Error> {
    let id = transaction.id();
    if transaction.amount().is_negative() {
        return Err(Error::InvalidArgument(format!(
            "{id} has a negative amount {}",
            transaction.amount()
        )));
    }
    match (
        transaction.parent,
        transaction.installment_number,
        transaction.total_installments,
    ) {
        (None, None, None) => Ok(()),
        (Some(_), Some(number), Some(total)) if (1..=total).contains(&number) => Ok(()),
        (Some(_), Some(number), Some(total)) => Err(Error::InvalidArgument(format!(
            "{id} is installment {number} of {total}"
        ))),
        _ => Err(Error::InvalidArgument(format!(
            "{id} needs all or none of parent, installment_number and total_installments"
        ))),
    }
}

/// Trims surrounding whitespace and strips angle brackets
#[must_use]
pub fn sanitize_text(text: &str) -> String {
    text.trim().replace(['<', '>'], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PurchaseRequest {
        PurchaseRequest {
            kind: TransactionKind::Expense,
            title: "Notebook".into(),
            category: "Eletrônicos".into(),
            purchaser: None,
            total: Cents::from(450000),
            installments: 10,
            first_due: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
        }
    }

    #[test]
    fn test_valid_purchase_has_no_warnings() {
        let warnings = validate_purchase(&request(), &ValidationLimits::default()).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_rejects_non_positive_total() {
        for total in [0, -100] {
            let request = PurchaseRequest {
                total: Cents::from(total),
                ..request()
            };
            assert!(matches!(
                validate_purchase(&request, &ValidationLimits::default()),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_rejects_zero_installments() {
        let request = PurchaseRequest {
            installments: 0,
            ..request()
        };
        assert!(validate_purchase(&request, &ValidationLimits::default()).is_err());
    }

    #[test]
    fn test_rejects_blank_text() {
        let blank_title = PurchaseRequest {
            title: "  <> ".into(),
            ..request()
        };
        assert!(validate_purchase(&blank_title, &ValidationLimits::default()).is_err());
        let blank_category = PurchaseRequest {
            category: String::new(),
            ..request()
        };
        assert!(validate_purchase(&blank_category, &ValidationLimits::default()).is_err());
    }

    #[test]
    fn test_warnings() {
        let request = PurchaseRequest {
            kind: TransactionKind::Income,
            installments: 72,
            total: Cents::from(100_000_001),
            ..request()
        };
        let warnings = validate_purchase(&request, &ValidationLimits::default()).unwrap();
        assert_eq!(
            warnings,
            vec![
                ValidationWarning::InstallmentsOnIncome,
                ValidationWarning::ManyInstallments(72),
                ValidationWarning::LargeAmount(Cents::from(100_000_001)),
            ]
        );
    }

    #[test]
    fn test_custom_limits() {
        let limits = ValidationLimits {
            max_installments: 6,
            ..ValidationLimits::default()
        };
        let warnings = validate_purchase(&request(), &limits).unwrap();
        assert_eq!(warnings, vec![ValidationWarning::ManyInstallments(10)]);
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  <b>Mercado</b> "), "bMercado/b");
        assert_eq!(sanitize_text("Padaria"), "Padaria");
    }

    fn record(amount: i64, group: (Option<u32>, Option<u32>, Option<u32>)) -> Transaction {
        Transaction {
            id: 5.into(),
            kind: TransactionKind::Expense,
            title: "Sofá".into(),
            category: "Casa".into(),
            purchaser: None,
            amount: Cents::from(amount),
            date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            status: crate::types::Status::Pending,
            parent: group.0.map(Into::into),
            installment_number: group.1,
            total_installments: group.2,
        }
    }

    #[test]
    fn test_check_record() {
        assert!(check_record(&record(100, (None, None, None))).is_ok());
        assert!(check_record(&record(0, (Some(5), Some(1), Some(3)))).is_ok());
        assert!(check_record(&record(100, (Some(5), Some(3), Some(3)))).is_ok());
        for bad in [
            record(-500, (None, None, None)),
            record(100, (Some(5), None, None)),
            record(100, (None, Some(1), Some(3))),
            record(100, (Some(5), Some(2), None)),
            record(100, (Some(5), Some(7), Some(3))),
            record(100, (Some(5), Some(0), Some(3))),
            record(100, (Some(5), Some(0), Some(0))),
        ] {
            assert!(matches!(check_record(&bad), Err(Error::InvalidArgument(_))));
        }
    }
}
