//! Read-side aggregations over the ledger.
//!
//! Everything aggregates in exact decimal arithmetic; ratios widen to `f64`
//! only in the response structs so the reports cannot drift from the ledger.
//! All results are cached with short TTLs and invalidated on writes by
//! `TransactionService`.

use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CategoryRef, LedgerTransaction, Money, TransactionType};
use crate::error::AppError;
use crate::ports::{Cache, CategoryRepository, TransactionFilter, TransactionRepository};

const MONTHLY_STATS_TTL_SECS: u64 = 3600;
const CATEGORY_ANALYSIS_TTL_SECS: u64 = 1800;
const TREND_TTL_SECS: u64 = 3600;
const COMPARISON_TTL_SECS: u64 = 1800;
const INSIGHTS_TTL_SECS: u64 = 7200;

const UNKNOWN_CATEGORY: &str = "Unknown category";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub year: i32,
    pub month: u32,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_income: Money,
    pub total_expense: Money,
    pub net_amount: Money,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: CategoryRef,
    pub category_name: String,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    pub transaction_count: i64,
    pub income_percentage: f64,
    pub expense_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAnalysis {
    pub summary: AnalysisSummary,
    pub categories: Vec<CategoryBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAverages {
    pub monthly_income: Money,
    pub monthly_expense: Money,
    pub monthly_net: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub monthly_trend: Vec<TrendPoint>,
    pub averages: TrendAverages,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStat {
    pub amount: Money,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountChange {
    pub amount: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonChanges {
    pub income: ChangeStat,
    pub expense: ChangeStat,
    pub net: ChangeStat,
    pub transaction_count: CountChange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonAnalysis {
    pub current: PeriodTotals,
    pub previous: PeriodTotals,
    pub changes: ComparisonChanges,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekdaySpending {
    pub day: String,
    pub amount: Money,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingPatterns {
    pub most_expensive_weekday: Option<WeekdaySpending>,
    pub average_transaction_value: Money,
    pub weekday_analysis: Vec<WeekdaySpending>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetRecommendations {
    pub recommended_monthly_budget: Money,
    pub emergency_fund_target: Money,
    pub savings_target: Money,
    pub current_savings_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: CategoryRef,
    pub total: Money,
    pub transaction_count: i64,
    pub average: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsPotential {
    pub total_expenses_last_3_months: Money,
    pub potential_monthly_savings: Money,
    pub high_spending_categories: Vec<CategorySpending>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: CategoryRef,
    pub amount: Money,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInsights {
    pub top_expense_categories: Vec<CategoryShare>,
    pub category_distribution: Vec<CategoryShare>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightAlert {
    pub kind: String,
    pub message: String,
    pub severity: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedInsights {
    pub spending_patterns: SpendingPatterns,
    pub budget_recommendations: BudgetRecommendations,
    pub savings_potential: SavingsPotential,
    pub category_insights: CategoryInsights,
    pub alerts: Vec<InsightAlert>,
}

pub struct AnalyticsService {
    transaction_repository: Arc<dyn TransactionRepository>,
    category_repository: Arc<dyn CategoryRepository>,
    cache: Arc<dyn Cache>,
}

impl AnalyticsService {
    pub fn new(
        transaction_repository: Arc<dyn TransactionRepository>,
        category_repository: Arc<dyn CategoryRepository>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            transaction_repository,
            category_repository,
            cache,
        }
    }

    pub async fn monthly_stats(
        &self,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<MonthlyStats, AppError> {
        let cache_key = format!("monthly-stats:{}:{}:{}", user_id, year, month);
        if let Some(cached) = self.cached::<MonthlyStats>(&cache_key).await {
            return Ok(cached);
        }

        let (from, to) = month_range(year, month)?;
        let transactions = self.fetch_period(user_id, from, to).await?;
        let totals = period_totals(&transactions);

        let stats = MonthlyStats {
            year,
            month,
            income: totals.income,
            expense: totals.expense,
            net: totals.net,
            transaction_count: totals.transaction_count,
        };

        self.store(&cache_key, &stats, MONTHLY_STATS_TTL_SECS).await;
        Ok(stats)
    }

    pub async fn category_analysis(
        &self,
        user_id: Uuid,
        year: i32,
        month: Option<u32>,
    ) -> Result<CategoryAnalysis, AppError> {
        let cache_key = format!(
            "category-analysis:{}:{}:{}",
            user_id,
            year,
            month.map_or("all".to_string(), |m| m.to_string())
        );
        if let Some(cached) = self.cached::<CategoryAnalysis>(&cache_key).await {
            return Ok(cached);
        }

        let (from, to) = match month {
            Some(month) => month_range(year, month)?,
            None => year_range(year)?,
        };
        let transactions = self.fetch_period(user_id, from, to).await?;

        struct Group {
            income: Money,
            expense: Money,
            count: i64,
        }

        let mut groups: HashMap<CategoryRef, Group> = HashMap::new();
        for tx in &transactions {
            let group = groups.entry(tx.category()).or_insert_with(|| Group {
                income: Money::zero(),
                expense: Money::zero(),
                count: 0,
            });
            group.count += 1;
            match tx.kind() {
                TransactionType::Income => group.income = group.income.plus(tx.amount()),
                TransactionType::Expense => group.expense = group.expense.plus(tx.amount()),
                TransactionType::Transfer => {}
            }
        }

        let total_income = groups
            .values()
            .fold(Money::zero(), |acc, g| acc.plus(&g.income));
        let total_expense = groups
            .values()
            .fold(Money::zero(), |acc, g| acc.plus(&g.expense));

        let mut categories = Vec::with_capacity(groups.len());
        for (category, group) in groups {
            let category_name = match self.category_repository.resolve(&category).await? {
                Some(found) => found.name().to_string(),
                None => UNKNOWN_CATEGORY.to_string(),
            };

            categories.push(CategoryBreakdown {
                category,
                category_name,
                net: group.income.minus(&group.expense),
                income_percentage: percentage(&group.income, &total_income),
                expense_percentage: percentage(&group.expense, &total_expense),
                transaction_count: group.count,
                income: group.income,
                expense: group.expense,
            });
        }
        categories.sort_by(|a, b| b.expense.cmp(&a.expense));

        let analysis = CategoryAnalysis {
            summary: AnalysisSummary {
                net_amount: total_income.minus(&total_expense),
                total_income,
                total_expense,
                transaction_count: transactions.len() as i64,
            },
            categories,
        };

        self.store(&cache_key, &analysis, CATEGORY_ANALYSIS_TTL_SECS)
            .await;
        Ok(analysis)
    }

    pub async fn trend_analysis(&self, user_id: Uuid) -> Result<TrendAnalysis, AppError> {
        let cache_key = format!("trend-analysis:{}", user_id);
        if let Some(cached) = self.cached::<TrendAnalysis>(&cache_key).await {
            return Ok(cached);
        }

        let now = Utc::now();
        let mut months = Vec::with_capacity(12);
        let mut cursor = (now.year(), now.month());
        for _ in 0..12 {
            months.push(cursor);
            cursor = previous_month(cursor.0, cursor.1);
        }
        months.reverse();

        let mut monthly_trend = Vec::with_capacity(12);
        for (year, month) in months {
            let (from, to) = month_range(year, month)?;
            let transactions = self.fetch_period(user_id, from, to).await?;
            let totals = period_totals(&transactions);

            monthly_trend.push(TrendPoint {
                year,
                month,
                month_name: month_name(month).to_string(),
                income: totals.income,
                expense: totals.expense,
                net: totals.net,
                transaction_count: totals.transaction_count,
            });
        }

        let total_income = monthly_trend
            .iter()
            .fold(Money::zero(), |acc, p| acc.plus(&p.income));
        let total_expense = monthly_trend
            .iter()
            .fold(Money::zero(), |acc, p| acc.plus(&p.expense));
        let total_net = total_income.minus(&total_expense);

        let analysis = TrendAnalysis {
            monthly_trend,
            averages: TrendAverages {
                monthly_income: total_income.divided_by(12),
                monthly_expense: total_expense.divided_by(12),
                monthly_net: total_net.divided_by(12),
            },
        };

        self.store(&cache_key, &analysis, TREND_TTL_SECS).await;
        Ok(analysis)
    }

    pub async fn comparison_analysis(
        &self,
        user_id: Uuid,
        year: i32,
        month: Option<u32>,
    ) -> Result<ComparisonAnalysis, AppError> {
        let cache_key = format!(
            "comparison-analysis:{}:{}:{}",
            user_id,
            year,
            month.map_or("all".to_string(), |m| m.to_string())
        );
        if let Some(cached) = self.cached::<ComparisonAnalysis>(&cache_key).await {
            return Ok(cached);
        }

        let (current_range, previous_range) = match month {
            Some(month) => {
                let (prev_year, prev_month) = previous_month(year, month);
                (month_range(year, month)?, month_range(prev_year, prev_month)?)
            }
            None => (year_range(year)?, year_range(year - 1)?),
        };

        let current_transactions = self
            .fetch_period(user_id, current_range.0, current_range.1)
            .await?;
        let previous_transactions = self
            .fetch_period(user_id, previous_range.0, previous_range.1)
            .await?;

        let current = period_totals(&current_transactions);
        let previous = period_totals(&previous_transactions);

        let changes = ComparisonChanges {
            income: change_stat(&current.income, &previous.income),
            expense: change_stat(&current.expense, &previous.expense),
            net: change_stat(&current.net, &previous.net),
            transaction_count: CountChange {
                amount: current.transaction_count - previous.transaction_count,
                percentage: if previous.transaction_count > 0 {
                    (current.transaction_count - previous.transaction_count) as f64
                        / previous.transaction_count as f64
                        * 100.0
                } else {
                    0.0
                },
            },
        };

        let analysis = ComparisonAnalysis {
            current,
            previous,
            changes,
        };

        self.store(&cache_key, &analysis, COMPARISON_TTL_SECS).await;
        Ok(analysis)
    }

    pub async fn advanced_insights(&self, user_id: Uuid) -> Result<AdvancedInsights, AppError> {
        let cache_key = format!("advanced-insights:{}", user_id);
        if let Some(cached) = self.cached::<AdvancedInsights>(&cache_key).await {
            return Ok(cached);
        }

        let now = Utc::now();
        let from = now - chrono::Months::new(3);
        let transactions = self.fetch_period(user_id, from, now).await?;

        let insights = AdvancedInsights {
            spending_patterns: spending_patterns(&transactions),
            budget_recommendations: budget_recommendations(&transactions),
            savings_potential: savings_potential(&transactions),
            category_insights: category_insights(&transactions),
            alerts: alerts(&transactions, now),
        };

        self.store(&cache_key, &insights, INSIGHTS_TTL_SECS).await;
        Ok(insights)
    }

    async fn fetch_period(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerTransaction>, AppError> {
        let page = self
            .transaction_repository
            .find_by_user(user_id, &TransactionFilter::date_range(from, to))
            .await?;
        Ok(page.transactions)
    }

    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get_json(key).await?;
        serde_json::from_value(value).ok()
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        if let Ok(value) = serde_json::to_value(value) {
            self.cache.set_json(key, &value, ttl_secs).await;
        } else {
            tracing::warn!(key = %key, "Skipping cache write for unserializable value");
        }
    }
}

fn period_totals(transactions: &[LedgerTransaction]) -> PeriodTotals {
    let mut income = Money::zero();
    let mut expense = Money::zero();

    for tx in transactions {
        match tx.kind() {
            TransactionType::Income => income = income.plus(tx.amount()),
            TransactionType::Expense => expense = expense.plus(tx.amount()),
            TransactionType::Transfer => {}
        }
    }

    PeriodTotals {
        net: income.minus(&expense),
        income,
        expense,
        transaction_count: transactions.len() as i64,
    }
}

fn spending_patterns(transactions: &[LedgerTransaction]) -> SpendingPatterns {
    let expenses: Vec<&LedgerTransaction> =
        transactions.iter().filter(|t| t.is_expense()).collect();

    let total_expense = expenses
        .iter()
        .fold(Money::zero(), |acc, t| acc.plus(t.amount()));

    let mut by_weekday: HashMap<Weekday, Money> = HashMap::new();
    for tx in &expenses {
        let entry = by_weekday
            .entry(tx.date().weekday())
            .or_insert_with(Money::zero);
        *entry = entry.plus(tx.amount());
    }

    let weekday_analysis: Vec<WeekdaySpending> = WEEKDAYS
        .iter()
        .filter_map(|weekday| {
            by_weekday.get(weekday).map(|amount| WeekdaySpending {
                day: weekday_name(*weekday).to_string(),
                amount: amount.clone(),
                percentage: percentage(amount, &total_expense),
            })
        })
        .collect();

    let most_expensive_weekday = weekday_analysis
        .iter()
        .max_by(|a, b| a.amount.cmp(&b.amount))
        .cloned();

    let average_transaction_value = if expenses.is_empty() {
        Money::zero()
    } else {
        total_expense.divided_by(expenses.len() as i64)
    };

    SpendingPatterns {
        most_expensive_weekday,
        average_transaction_value,
        weekday_analysis,
    }
}

fn budget_recommendations(transactions: &[LedgerTransaction]) -> BudgetRecommendations {
    let monthly_expense = transactions
        .iter()
        .filter(|t| t.is_expense())
        .fold(Money::zero(), |acc, t| acc.plus(t.amount()))
        .divided_by(3);
    let monthly_income = transactions
        .iter()
        .filter(|t| t.is_income())
        .fold(Money::zero(), |acc, t| acc.plus(t.amount()))
        .divided_by(3);

    let current_savings_rate = if monthly_income.is_positive() {
        monthly_income.minus(&monthly_expense).to_f64() / monthly_income.to_f64() * 100.0
    } else {
        0.0
    };

    BudgetRecommendations {
        // 10% headroom over the observed average
        recommended_monthly_budget: monthly_expense.times(&BigDecimal::from(11)).divided_by(10),
        emergency_fund_target: monthly_expense.times(&BigDecimal::from(6)),
        // 20% of income
        savings_target: monthly_income.divided_by(5),
        current_savings_rate,
    }
}

fn savings_potential(transactions: &[LedgerTransaction]) -> SavingsPotential {
    let mut by_category: HashMap<CategoryRef, (Money, i64)> = HashMap::new();
    let mut total = Money::zero();

    for tx in transactions.iter().filter(|t| t.is_expense()) {
        let entry = by_category
            .entry(tx.category())
            .or_insert_with(|| (Money::zero(), 0));
        entry.0 = entry.0.plus(tx.amount());
        entry.1 += 1;
        total = total.plus(tx.amount());
    }

    let mut high_spending_categories: Vec<CategorySpending> = by_category
        .into_iter()
        .map(|(category, (category_total, count))| CategorySpending {
            category,
            average: category_total.divided_by(count.max(1)),
            total: category_total,
            transaction_count: count,
        })
        .collect();
    high_spending_categories.sort_by(|a, b| b.total.cmp(&a.total));
    high_spending_categories.truncate(3);

    SavingsPotential {
        // assume 10% of spending is recoverable, expressed per month
        potential_monthly_savings: total.divided_by(30),
        total_expenses_last_3_months: total,
        high_spending_categories,
    }
}

fn category_insights(transactions: &[LedgerTransaction]) -> CategoryInsights {
    let mut by_category: HashMap<CategoryRef, Money> = HashMap::new();
    let mut total = Money::zero();

    for tx in transactions.iter().filter(|t| t.is_expense()) {
        let entry = by_category
            .entry(tx.category())
            .or_insert_with(Money::zero);
        *entry = entry.plus(tx.amount());
        total = total.plus(tx.amount());
    }

    let mut category_distribution: Vec<CategoryShare> = by_category
        .into_iter()
        .map(|(category, amount)| CategoryShare {
            category,
            percentage: percentage(&amount, &total),
            amount,
        })
        .collect();
    category_distribution.sort_by(|a, b| b.amount.cmp(&a.amount));

    let top_expense_categories = category_distribution.iter().take(5).cloned().collect();

    CategoryInsights {
        top_expense_categories,
        category_distribution,
    }
}

fn alerts(transactions: &[LedgerTransaction], now: DateTime<Utc>) -> Vec<InsightAlert> {
    let current = (now.year(), now.month());
    let previous = previous_month(current.0, current.1);

    let expense_in = |period: (i32, u32)| {
        transactions
            .iter()
            .filter(|t| {
                t.is_expense() && t.date().year() == period.0 && t.date().month() == period.1
            })
            .fold(Money::zero(), |acc, t| acc.plus(t.amount()))
    };

    let current_expense = expense_in(current);
    let previous_expense = expense_in(previous);

    let mut alerts = Vec::new();

    if current_expense > previous_expense.times(&BigDecimal::from(12)).divided_by(10) {
        alerts.push(InsightAlert {
            kind: "high_spending".to_string(),
            message: "Spending this month is more than 20% above last month".to_string(),
            severity: "warning".to_string(),
            recommendation: "Review recent expenses and look for categories to cut back"
                .to_string(),
        });
    }

    if previous_expense.is_positive()
        && current_expense < previous_expense.times(&BigDecimal::from(9)).divided_by(10)
    {
        alerts.push(InsightAlert {
            kind: "good_savings".to_string(),
            message: "Spending is down at least 10% compared to last month".to_string(),
            severity: "info".to_string(),
            recommendation: "Keep the current pace going".to_string(),
        });
    }

    alerts
}

fn change_stat(current: &Money, previous: &Money) -> ChangeStat {
    let amount = current.minus(previous);
    let percentage = if previous.is_zero() {
        0.0
    } else {
        amount.to_f64() / previous.abs().to_f64() * 100.0
    };

    ChangeStat { amount, percentage }
}

fn percentage(part: &Money, total: &Money) -> f64 {
    if total.is_zero() {
        0.0
    } else {
        part.to_f64() / total.to_f64() * 100.0
    }
}

fn month_range(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let (next_year, next_month) = next_month(year, month);
    let start = start_of_month(year, month)?;
    let end = start_of_month(next_year, next_month)?;
    Ok((start, end))
}

fn year_range(year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    Ok((start_of_month(year, 1)?, start_of_month(year + 1, 1)?))
}

fn start_of_month(year: i32, month: u32) -> Result<DateTime<Utc>, AppError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .ok_or_else(|| AppError::Validation(format!("Invalid year/month: {}-{}", year, month)))
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}
