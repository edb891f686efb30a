//! Business dashboard figures, recomputed from the collections on every call.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use cheheom_shared::types::{Application, ApplicationStatus, Product, Review};

use crate::catalog::{days_until_deadline, fill_rate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Week,
    Month,
    All,
}

impl Period {
    pub fn days(&self) -> u32 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::All => 90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Week => "이번 주",
            Period::Month => "이번 달",
            Period::All => "전체",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessStats {
    pub total_products: usize,
    pub total_applicants: usize,
    pub total_reviews: usize,
    pub average_fill_rate: u32,
    pub total_likes: u32,
    pub review_completion_rate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceStatus {
    Active,
    DeadlineSoon,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPerformance {
    pub product: Product,
    pub applicants: usize,
    pub selected: usize,
    pub reviews: usize,
    pub fill_rate: u32,
    pub review_rate: u32,
    pub likes: u32,
    pub status: PerformanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// `"M/D"` axis label.
    pub name: String,
    pub date: NaiveDate,
    pub applicants: usize,
    pub reviews: usize,
}

fn percent(numerator: usize, denominator: usize) -> u32 {
    if denominator == 0 {
        return 0;
    }
    (numerator as f64 / denominator as f64 * 100.0).round() as u32
}

fn accepted(applications: &[Application]) -> usize {
    applications
        .iter()
        .filter(|a| a.status == ApplicationStatus::Accepted)
        .count()
}

/// Aggregate figures over every product.
///
/// `period` is accepted for the dashboard's filter control but does not narrow the data.
pub fn business_stats(
    products: &[Product],
    applications: &[Application],
    reviews: &[Review],
    _period: Period,
) -> BusinessStats {
    let average_fill_rate = if products.is_empty() {
        0
    } else {
        let sum: f64 = products.iter().map(fill_rate).sum();
        (sum / products.len() as f64).round() as u32
    };

    BusinessStats {
        total_products: products.len(),
        total_applicants: applications.len(),
        total_reviews: reviews.len(),
        average_fill_rate,
        total_likes: products.iter().map(|p| p.like_count).sum(),
        review_completion_rate: percent(reviews.len(), accepted(applications)),
    }
}

pub fn performance_status(days_left: i64) -> PerformanceStatus {
    match days_left {
        d if d <= 0 => PerformanceStatus::Closed,
        1 | 2 => PerformanceStatus::DeadlineSoon,
        _ => PerformanceStatus::Active,
    }
}

pub fn product_performances(
    products: &[Product],
    applications: &[Application],
    reviews: &[Review],
    now: DateTime<Utc>,
) -> Vec<ProductPerformance> {
    products
        .iter()
        .map(|product| {
            let mine: Vec<&Application> = applications
                .iter()
                .filter(|a| a.product_id == product.id)
                .collect();
            let selected = mine
                .iter()
                .filter(|a| a.status == ApplicationStatus::Accepted)
                .count();
            let review_count = reviews.iter().filter(|r| r.product_id == product.id).count();

            ProductPerformance {
                product: product.clone(),
                applicants: mine.len(),
                selected,
                reviews: review_count,
                fill_rate: fill_rate(product).round() as u32,
                review_rate: percent(review_count, selected),
                likes: product.like_count,
                status: performance_status(days_until_deadline(&product.application_deadline, now)),
            }
        })
        .collect()
}

/// Per-day application and review counts for the window ending `today`, oldest first.
pub fn trend_series(
    applications: &[Application],
    reviews: &[Review],
    period: Period,
    today: NaiveDate,
) -> Vec<TrendPoint> {
    let days = i64::from(period.days());
    (0..days)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            TrendPoint {
                name: format!("{}/{}", date.month(), date.day()),
                date,
                applicants: applications
                    .iter()
                    .filter(|a| a.applied_at.date_naive() == date)
                    .count(),
                reviews: reviews
                    .iter()
                    .filter(|r| r.created_at.date_naive() == date)
                    .count(),
            }
        })
        .collect()
}

/// Relative change in percent; 0 when there is no previous value.
pub fn percentage_change(current: i64, previous: i64) -> i64 {
    if previous == 0 {
        return 0;
    }
    ((current - previous) as f64 / previous as f64 * 100.0).round() as i64
}

/// Applications in the window ending `today` against the window just before it, in percent.
pub fn applicant_change(applications: &[Application], period: Period, today: NaiveDate) -> i64 {
    let days = i64::from(period.days());
    let count_between = |newest: NaiveDate| {
        let oldest = newest - Duration::days(days - 1);
        applications
            .iter()
            .filter(|a| (oldest..=newest).contains(&a.applied_at.date_naive()))
            .count() as i64
    };
    percentage_change(count_between(today), count_between(today - Duration::days(days)))
}
