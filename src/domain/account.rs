//! Account domain entity.
//!
//! Holds a balance and the debit/credit rules that keep it consistent. All
//! mutation goes through the methods below; the owning call is expected to be
//! the only one touching an instance at a time (serialization across calls is
//! the caller's responsibility, see `services::account_locks`).

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Money;
use crate::error::AppError;
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
    Investment,
    CreditCard,
    Loan,
    Other,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "CHECKING",
            AccountType::Savings => "SAVINGS",
            AccountType::Investment => "INVESTMENT",
            AccountType::CreditCard => "CREDIT_CARD",
            AccountType::Loan => "LOAN",
            AccountType::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CHECKING" => Some(AccountType::Checking),
            "SAVINGS" => Some(AccountType::Savings),
            "INVESTMENT" => Some(AccountType::Investment),
            "CREDIT_CARD" => Some(AccountType::CreditCard),
            "LOAN" => Some(AccountType::Loan),
            "OTHER" => Some(AccountType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Inactive,
    Closed,
    Frozen,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Inactive => "INACTIVE",
            AccountStatus::Closed => "CLOSED",
            AccountStatus::Frozen => "FROZEN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(AccountStatus::Active),
            "INACTIVE" => Some(AccountStatus::Inactive),
            "CLOSED" => Some(AccountStatus::Closed),
            "FROZEN" => Some(AccountStatus::Frozen),
            _ => None,
        }
    }
}

/// Construction parameters for [`Account::new`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: Uuid,
    pub name: String,
    pub kind: AccountType,
    pub currency: String,
    pub balance: Option<Money>,
    pub is_default: bool,
    pub credit_limit: Option<Money>,
    pub interest_rate: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    id: Uuid,
    user_id: Uuid,
    name: String,
    #[serde(rename = "type")]
    kind: AccountType,
    balance: Money,
    currency: String,
    status: AccountStatus,
    is_default: bool,
    credit_limit: Option<Money>,
    interest_rate: Option<BigDecimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(params: NewAccount) -> Result<Self, AppError> {
        let now = Utc::now();
        let account = Self {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            name: validation::sanitize_string(&params.name),
            kind: params.kind,
            balance: params.balance.unwrap_or_else(Money::zero),
            currency: validation::sanitize_string(&params.currency),
            status: AccountStatus::Active,
            is_default: params.is_default,
            credit_limit: params.credit_limit,
            interest_rate: params.interest_rate,
            created_at: now,
            updated_at: now,
        };

        account.validate()?;
        Ok(account)
    }

    /// Rehydrate an account from storage. The row is trusted; invariants were
    /// enforced when the account was created or last mutated.
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        id: Uuid,
        user_id: Uuid,
        name: String,
        kind: AccountType,
        balance: Money,
        currency: String,
        status: AccountStatus,
        is_default: bool,
        credit_limit: Option<Money>,
        interest_rate: Option<BigDecimal>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            name,
            kind,
            balance,
            currency,
            status,
            is_default,
            credit_limit,
            interest_rate,
            created_at,
            updated_at,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        validation::validate_required("name", &self.name)?;
        validation::validate_max_len("name", &self.name, validation::ACCOUNT_NAME_MAX_LEN)?;
        validation::validate_currency_code(&self.currency)?;

        if self.kind == AccountType::CreditCard && self.credit_limit.is_none() {
            return Err(AppError::Validation(
                "Credit limit is required for credit card accounts".to_string(),
            ));
        }

        if let Some(limit) = &self.credit_limit {
            if !limit.is_positive() {
                return Err(AppError::Validation(
                    "Credit limit must be greater than zero".to_string(),
                ));
            }
        }

        if let Some(rate) = &self.interest_rate {
            validation::validate_non_negative("interest_rate", rate)?;
        }

        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AccountType {
        self.kind
    }

    pub fn balance(&self) -> &Money {
        &self.balance
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn credit_limit(&self) -> Option<&Money> {
        self.credit_limit.as_ref()
    }

    pub fn interest_rate(&self) -> Option<&BigDecimal> {
        self.interest_rate.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn is_credit_card(&self) -> bool {
        self.kind == AccountType::CreditCard
    }

    /// Remaining credit on a credit card account; zero for every other type.
    pub fn available_credit(&self) -> Money {
        match (&self.kind, &self.credit_limit) {
            (AccountType::CreditCard, Some(limit)) => limit.minus(&self.balance.abs()),
            _ => Money::zero(),
        }
    }

    /// Reduce the balance. Non-credit accounts may not go negative; credit
    /// card accounts may not exceed their limit in magnitude. Closed accounts
    /// accept no movements.
    pub fn debit(&mut self, amount: &Money) -> Result<(), AppError> {
        if self.status == AccountStatus::Closed {
            return Err(AppError::InvalidState(
                "Cannot debit a closed account".to_string(),
            ));
        }

        if !amount.is_positive() {
            return Err(AppError::Validation(
                "Debit amount must be greater than zero".to_string(),
            ));
        }

        let new_balance = self.balance.minus(amount);

        if self.is_credit_card() {
            if let Some(limit) = &self.credit_limit {
                if new_balance.abs() > *limit {
                    return Err(AppError::CreditLimitExceeded(
                        "Transaction would exceed credit limit".to_string(),
                    ));
                }
            }
        } else if new_balance.is_negative() {
            return Err(AppError::InsufficientFunds("Insufficient funds".to_string()));
        }

        self.balance = new_balance;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Increase the balance. No upper bound.
    pub fn credit(&mut self, amount: &Money) -> Result<(), AppError> {
        if self.status == AccountStatus::Closed {
            return Err(AppError::InvalidState(
                "Cannot credit a closed account".to_string(),
            ));
        }

        if !amount.is_positive() {
            return Err(AppError::Validation(
                "Credit amount must be greater than zero".to_string(),
            ));
        }

        self.balance = self.balance.plus(amount);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn freeze(&mut self) -> Result<(), AppError> {
        if self.status == AccountStatus::Frozen {
            return Err(AppError::InvalidState(
                "Account is already frozen".to_string(),
            ));
        }

        if self.status == AccountStatus::Closed {
            return Err(AppError::InvalidState(
                "Cannot freeze a closed account".to_string(),
            ));
        }

        self.status = AccountStatus::Frozen;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn unfreeze(&mut self) -> Result<(), AppError> {
        if self.status != AccountStatus::Frozen {
            return Err(AppError::InvalidState("Account is not frozen".to_string()));
        }

        self.status = AccountStatus::Active;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), AppError> {
        if self.status == AccountStatus::Closed {
            return Err(AppError::InvalidState(
                "Account is already closed".to_string(),
            ));
        }

        if !self.balance.is_zero() {
            return Err(AppError::InvalidState(
                "Cannot close account with non-zero balance".to_string(),
            ));
        }

        self.status = AccountStatus::Closed;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn activate(&mut self) -> Result<(), AppError> {
        if self.status == AccountStatus::Active {
            return Err(AppError::InvalidState(
                "Account is already active".to_string(),
            ));
        }

        if self.status == AccountStatus::Closed {
            return Err(AppError::InvalidState(
                "Cannot activate a closed account".to_string(),
            ));
        }

        self.status = AccountStatus::Active;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn update_credit_limit(&mut self, new_limit: Money) -> Result<(), AppError> {
        if !self.is_credit_card() {
            return Err(AppError::Validation(
                "Credit limit can only be set for credit card accounts".to_string(),
            ));
        }

        if !new_limit.is_positive() {
            return Err(AppError::Validation(
                "Credit limit must be greater than zero".to_string(),
            ));
        }

        if self.balance.is_negative() && self.balance.abs() > new_limit {
            return Err(AppError::InvalidState(
                "New credit limit is lower than current balance".to_string(),
            ));
        }

        self.credit_limit = Some(new_limit);
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn checking(balance: &str) -> Account {
        Account::new(NewAccount {
            user_id: Uuid::new_v4(),
            name: "Main checking".to_string(),
            kind: AccountType::Checking,
            currency: "USD".to_string(),
            balance: Some(money(balance)),
            is_default: true,
            credit_limit: None,
            interest_rate: None,
        })
        .unwrap()
    }

    fn credit_card(limit: &str) -> Account {
        Account::new(NewAccount {
            user_id: Uuid::new_v4(),
            name: "Visa".to_string(),
            kind: AccountType::CreditCard,
            currency: "USD".to_string(),
            balance: None,
            is_default: false,
            credit_limit: Some(money(limit)),
            interest_rate: Some(BigDecimal::from_str("0.0199").unwrap()),
        })
        .unwrap()
    }

    #[test]
    fn new_account_defaults() {
        let account = checking("0");
        assert_eq!(account.status(), AccountStatus::Active);
        assert!(account.balance().is_zero());
    }

    #[test]
    fn rejects_empty_name() {
        let result = Account::new(NewAccount {
            user_id: Uuid::new_v4(),
            name: "   ".to_string(),
            kind: AccountType::Checking,
            currency: "USD".to_string(),
            balance: None,
            is_default: false,
            credit_limit: None,
            interest_rate: None,
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_bad_currency() {
        for currency in ["US", "usd", "USDC", ""] {
            let result = Account::new(NewAccount {
                user_id: Uuid::new_v4(),
                name: "Checking".to_string(),
                kind: AccountType::Checking,
                currency: currency.to_string(),
                balance: None,
                is_default: false,
                credit_limit: None,
                interest_rate: None,
            });
            assert!(result.is_err(), "currency {:?} should be rejected", currency);
        }
    }

    #[test]
    fn credit_card_requires_limit() {
        let result = Account::new(NewAccount {
            user_id: Uuid::new_v4(),
            name: "Visa".to_string(),
            kind: AccountType::CreditCard,
            currency: "USD".to_string(),
            balance: None,
            is_default: false,
            credit_limit: None,
            interest_rate: None,
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_negative_interest_rate() {
        let result = Account::new(NewAccount {
            user_id: Uuid::new_v4(),
            name: "Savings".to_string(),
            kind: AccountType::Savings,
            currency: "USD".to_string(),
            balance: None,
            is_default: false,
            credit_limit: None,
            interest_rate: Some(BigDecimal::from(-1)),
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn debit_reduces_balance_exactly() {
        let mut account = checking("1000.00");
        account.debit(&money("25.50")).unwrap();
        assert_eq!(account.balance(), &money("974.50"));
    }

    #[test]
    fn debit_rejects_non_positive_amount() {
        let mut account = checking("100.00");
        assert!(matches!(
            account.debit(&Money::zero()),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            account.debit(&money("-5.00")),
            Err(AppError::Validation(_))
        ));
        assert_eq!(account.balance(), &money("100.00"));
    }

    #[test]
    fn debit_beyond_balance_fails_and_leaves_balance_unchanged() {
        let mut account = checking("1000.00");
        let result = account.debit(&money("2000.00"));
        assert!(matches!(result, Err(AppError::InsufficientFunds(_))));
        assert_eq!(account.balance(), &money("1000.00"));
    }

    #[test]
    fn debit_to_exactly_zero_is_allowed() {
        let mut account = checking("50.00");
        account.debit(&money("50.00")).unwrap();
        assert!(account.balance().is_zero());
    }

    #[test]
    fn credit_card_can_go_negative_within_limit() {
        let mut card = credit_card("500.00");
        card.debit(&money("400.00")).unwrap();
        assert_eq!(card.balance(), &money("-400.00"));
        assert_eq!(card.available_credit(), money("100.00"));
    }

    #[test]
    fn credit_card_debit_beyond_limit_fails() {
        let mut card = credit_card("500.00");
        let result = card.debit(&money("600.00"));
        assert!(matches!(result, Err(AppError::CreditLimitExceeded(_))));
        assert!(card.balance().is_zero());
    }

    #[test]
    fn credit_increases_balance() {
        let mut account = checking("10.00");
        account.credit(&money("90.00")).unwrap();
        assert_eq!(account.balance(), &money("100.00"));
    }

    #[test]
    fn freeze_and_unfreeze() {
        let mut account = checking("0");
        account.freeze().unwrap();
        assert_eq!(account.status(), AccountStatus::Frozen);
        assert!(matches!(account.freeze(), Err(AppError::InvalidState(_))));

        account.unfreeze().unwrap();
        assert_eq!(account.status(), AccountStatus::Active);
        assert!(matches!(account.unfreeze(), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn close_requires_zero_balance() {
        let mut funded = checking("10.00");
        assert!(matches!(funded.close(), Err(AppError::InvalidState(_))));

        let mut empty = checking("0");
        empty.close().unwrap();
        assert_eq!(empty.status(), AccountStatus::Closed);
        assert!(matches!(empty.close(), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn closed_account_cannot_be_reopened_or_frozen() {
        let mut account = checking("0");
        account.close().unwrap();
        assert!(matches!(account.activate(), Err(AppError::InvalidState(_))));
        assert!(matches!(account.freeze(), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn closed_account_accepts_no_movements() {
        let mut account = checking("0");
        account.close().unwrap();

        assert!(matches!(
            account.debit(&money("1.00")),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            account.credit(&money("1.00")),
            Err(AppError::InvalidState(_))
        ));
        assert!(account.balance().is_zero());
    }

    #[test]
    fn activate_from_frozen() {
        let mut account = checking("0");
        account.freeze().unwrap();
        account.activate().unwrap();
        assert_eq!(account.status(), AccountStatus::Active);
        assert!(matches!(account.activate(), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn update_credit_limit_guards() {
        let mut checking = checking("0");
        assert!(matches!(
            checking.update_credit_limit(money("100.00")),
            Err(AppError::Validation(_))
        ));

        let mut card = credit_card("500.00");
        card.debit(&money("300.00")).unwrap();

        // lower than outstanding balance magnitude
        assert!(matches!(
            card.update_credit_limit(money("200.00")),
            Err(AppError::InvalidState(_))
        ));

        card.update_credit_limit(money("1000.00")).unwrap();
        assert_eq!(card.credit_limit(), Some(&money("1000.00")));
    }

    #[test]
    fn account_type_round_trips_through_strings() {
        for kind in [
            AccountType::Checking,
            AccountType::Savings,
            AccountType::Investment,
            AccountType::CreditCard,
            AccountType::Loan,
            AccountType::Other,
        ] {
            assert_eq!(AccountType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AccountType::parse("PIGGY_BANK"), None);
    }
}
