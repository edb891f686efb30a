//! Product listing helpers: deadlines, fill rates and sort orders.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use cheheom_shared::types::Product;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// End date of a `"MM.DD(요일) - MM.DD(요일)"` range, at midnight UTC of `now`'s year.
///
/// Anything unparseable is treated as ending right now.
pub fn parse_deadline(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    parse_end_date(text, now.year())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(now)
}

fn parse_end_date(text: &str, year: i32) -> Option<NaiveDate> {
    let (_, end) = text.split_once("- ")?;
    let (month, rest) = leading_number(end.trim_start())?;
    let rest = rest.strip_prefix('.')?;
    let (day, _) = leading_number(rest)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn leading_number(s: &str) -> Option<(u32, &str)> {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value = s[..digits].parse().ok()?;
    Some((value, &s[digits..]))
}

/// Whole days left until the deadline, rounded up. Zero or less means closed.
pub fn days_until_deadline(text: &str, now: DateTime<Utc>) -> i64 {
    let deadline = parse_deadline(text, now);
    let seconds = (deadline - now).num_seconds() as f64;
    (seconds / SECONDS_PER_DAY).ceil() as i64
}

/// Percentage of required reviewer slots taken. Zero when no slots are required.
pub fn fill_rate(product: &Product) -> f64 {
    if product.required_reviewers == 0 {
        return 0.0;
    }
    f64::from(product.current_applicants) / f64::from(product.required_reviewers) * 100.0
}

/// Distance in kilometres from the display string, e.g. `"1.2km"` or `"350m"`.
pub fn distance_km(product: &Product) -> Option<f64> {
    let text = product.distance.trim();
    if let Some(km) = text.strip_suffix("km") {
        return km.trim().parse().ok();
    }
    if let Some(m) = text.strip_suffix('m') {
        return m.trim().parse::<f64>().ok().map(|m| m / 1000.0);
    }
    text.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    #[default]
    Distance,
    Popular,
    Newest,
    Deadline,
    Filling,
}

impl SortOption {
    pub fn label(&self) -> &'static str {
        match self {
            SortOption::Distance => "거리순",
            SortOption::Popular => "인기순",
            SortOption::Newest => "최신순",
            SortOption::Deadline => "마감임박순",
            SortOption::Filling => "모집률순",
        }
    }
}

fn by_distance(a: &Product, b: &Product) -> Ordering {
    match (distance_km(a), distance_km(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn id_number(product: &Product) -> u64 {
    let digits: String = product.id.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// A sorted copy of `products`; ties fall back to distance.
pub fn sort_products(products: &[Product], sort: SortOption, now: DateTime<Utc>) -> Vec<Product> {
    let mut sorted = products.to_vec();
    match sort {
        SortOption::Distance => sorted.sort_by(by_distance),
        SortOption::Popular => {
            sorted.sort_by(|a, b| b.like_count.cmp(&a.like_count).then_with(|| by_distance(a, b)))
        }
        SortOption::Newest => sorted.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| id_number(b).cmp(&id_number(a)))
                .then_with(|| by_distance(a, b))
        }),
        SortOption::Deadline => sorted.sort_by_cached_key(|p| days_until_deadline(&p.application_deadline, now)),
        SortOption::Filling => sorted.sort_by(|a, b| {
            fill_rate(b)
                .partial_cmp(&fill_rate(a))
                .unwrap_or(Ordering::Equal)
                .then_with(|| by_distance(a, b))
        }),
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn product(id: &str, likes: u32, distance: &str, deadline: &str, applicants: u32, required: u32) -> Product {
        Product {
            id: id.into(),
            name: format!("상품 {id}"),
            seller: "가게".into(),
            category: "한식".into(),
            location: "서울".into(),
            latitude: None,
            longitude: None,
            image: String::new(),
            review_count: 0,
            description: String::new(),
            application_deadline: deadline.into(),
            required_reviewers: required,
            current_applicants: applicants,
            like_count: likes,
            distance: distance.into(),
            badge: None,
            owner_id: None,
            created_at: None,
        }
    }

    #[test]
    fn deadline_uses_end_date_of_range() {
        let now = at(2024, 12, 1, 9);
        assert_eq!(parse_deadline("12.20(금) - 12.25(수)", now), at(2024, 12, 25, 0));
        assert_eq!(parse_deadline("곧 마감", now), now);
        assert_eq!(parse_deadline("12.20(금) - 13.40(수)", now), now);
    }

    #[test]
    fn days_until_rounds_up() {
        let now = at(2024, 12, 23, 9);
        assert_eq!(days_until_deadline("12.20(금) - 12.25(수)", now), 2);
        assert_eq!(days_until_deadline("12.20(금) - 12.24(화)", now), 1);
        assert_eq!(days_until_deadline("12.20(금) - 12.23(월)", now), 0);
        assert_eq!(days_until_deadline("garbage", now), 0);
    }

    #[test]
    fn fill_rate_handles_zero_required() {
        assert_eq!(fill_rate(&product("1", 0, "", "", 5, 10)), 50.0);
        assert_eq!(fill_rate(&product("1", 0, "", "", 5, 0)), 0.0);
    }

    #[test]
    fn distance_parsing() {
        assert_eq!(distance_km(&product("1", 0, "1.2km", "", 0, 1)), Some(1.2));
        assert_eq!(distance_km(&product("1", 0, "350m", "", 0, 1)), Some(0.35));
        assert_eq!(distance_km(&product("1", 0, "", "", 0, 1)), None);
    }

    #[test]
    fn sort_orders() {
        let now = at(2024, 12, 1, 9);
        let products = vec![
            product("1", 5, "2km", "12.01(일) - 12.10(화)", 1, 10),
            product("2", 9, "500m", "12.01(일) - 12.03(화)", 9, 10),
            product("3", 5, "1km", "12.01(일) - 12.20(금)", 5, 10),
        ];
        let ids = |v: Vec<Product>| v.into_iter().map(|p| p.id).collect::<Vec<_>>();

        assert_eq!(ids(sort_products(&products, SortOption::Distance, now)), ["2", "3", "1"]);
        assert_eq!(ids(sort_products(&products, SortOption::Popular, now)), ["2", "3", "1"]);
        assert_eq!(ids(sort_products(&products, SortOption::Newest, now)), ["3", "2", "1"]);
        assert_eq!(ids(sort_products(&products, SortOption::Deadline, now)), ["2", "1", "3"]);
        assert_eq!(ids(sort_products(&products, SortOption::Filling, now)), ["2", "3", "1"]);
    }
}
