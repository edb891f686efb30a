//! Point ledger and point shop.
//!
//! The balance is always the sum of the ledger. The level follows the points
//! earned so far, so spending never demotes. Stored balance and level values
//! are caches rewritten after every ledger change.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cheheom_shared::types::{PointTransaction, TransactionType};

use crate::levels;

pub fn balance(ledger: &[PointTransaction]) -> u32 {
    let (earned, spent) = ledger.iter().fold((0u64, 0u64), |(earned, spent), t| match t.transaction_type {
        TransactionType::Earn => (earned + u64::from(t.amount), spent),
        TransactionType::Spend => (earned, spent + u64::from(t.amount)),
    });
    u32::try_from(earned.saturating_sub(spent)).unwrap_or(u32::MAX)
}

pub fn earned_total(ledger: &[PointTransaction]) -> u32 {
    let total: u64 = ledger
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Earn)
        .map(|t| u64::from(t.amount))
        .sum();
    u32::try_from(total).unwrap_or(u32::MAX)
}

/// Level reached by the points earned so far.
pub fn level(ledger: &[PointTransaction]) -> &'static levels::Level {
    levels::level_of(earned_total(ledger))
}

pub fn earn_entry(amount: u32, description: impl Into<String>, category: Option<&str>, now: DateTime<Utc>) -> PointTransaction {
    PointTransaction {
        id: format!("trans-{}", Uuid::now_v7()),
        transaction_type: TransactionType::Earn,
        amount,
        description: description.into(),
        date: now,
        category: category.map(str::to_string),
    }
}

// --- Shop ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopCategory {
    Priority,
    Coupon,
    Premium,
    Badge,
}

impl ShopCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShopCategory::Priority => "priority",
            ShopCategory::Coupon => "coupon",
            ShopCategory::Premium => "premium",
            ShopCategory::Badge => "badge",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShopCategory::Priority => "우선권",
            ShopCategory::Coupon => "쿠폰",
            ShopCategory::Premium => "프리미엄",
            ShopCategory::Badge => "배지",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointProduct {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: u32,
    pub icon: &'static str,
    pub category: ShopCategory,
    pub benefit: &'static str,
    pub required_level: Option<u32>,
}

const fn item(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    price: u32,
    icon: &'static str,
    category: ShopCategory,
    benefit: &'static str,
    required_level: Option<u32>,
) -> PointProduct {
    PointProduct { id, name, description, price, icon, category, benefit, required_level }
}

pub static POINT_PRODUCTS: [PointProduct; 12] = [
    item("priority-1", "우선 선정권", "체험단 신청 시 우선적으로 선정됩니다", 200, "⭐", ShopCategory::Priority, "1회 사용 가능", None),
    item("priority-2", "프리미엄 선정권", "프리미엄 체험단에 우선 선정됩니다", 500, "👑", ShopCategory::Priority, "1회 사용 가능", Some(3)),
    item("priority-3", "VIP 선정권", "모든 체험단에 최우선 선정됩니다", 1000, "💎", ShopCategory::Priority, "1회 사용 가능", Some(4)),
    item("coupon-1", "5,000원 할인 쿠폰", "제휴 식당에서 5,000원 할인", 300, "🎫", ShopCategory::Coupon, "30일 유효", None),
    item("coupon-2", "10,000원 할인 쿠폰", "제휴 식당에서 10,000원 할인", 550, "🎟️", ShopCategory::Coupon, "30일 유효", None),
    item("coupon-3", "배달비 무료 쿠폰", "배달비 전액 무료 (최대 3,000원)", 200, "🚚", ShopCategory::Coupon, "15일 유효", None),
    item("premium-1", "신메뉴 선 체험권", "신메뉴 출시 전 먼저 체험할 기회", 400, "🆕", ShopCategory::Premium, "1개월간 유효", None),
    item("premium-2", "사업자 직접 초대권", "사업자가 직접 초대하는 VIP 체험단 참여", 800, "💌", ShopCategory::Premium, "1개월간 유효", Some(3)),
    item("premium-3", "월간 무제한 신청권", "한 달 동안 무제한으로 체험단 신청 가능", 1500, "🔓", ShopCategory::Premium, "30일간 유효", Some(4)),
    item("badge-1", "맛집 탐험가 배지", "프로필에 특별 배지 표시", 250, "🗺️", ShopCategory::Badge, "영구 보유", None),
    item("badge-2", "미식가 배지", "프로필에 미식가 배지 표시", 600, "🍽️", ShopCategory::Badge, "영구 보유", Some(3)),
    item("badge-3", "골드 리뷰어 배지", "프로필에 골드 리뷰어 배지 표시", 1200, "🏆", ShopCategory::Badge, "영구 보유", Some(5)),
];

pub fn shop_item(id: &str) -> Option<&'static PointProduct> {
    POINT_PRODUCTS.iter().find(|p| p.id == id)
}

pub fn shop_items_in(category: ShopCategory) -> impl Iterator<Item = &'static PointProduct> {
    POINT_PRODUCTS.iter().filter(move |p| p.category == category)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseRefusal {
    #[error("포인트가 {missing}P 부족합니다")]
    InsufficientPoints { missing: u32 },

    #[error("Lv.{required} 이상 필요")]
    LevelRequired { required: u32 },
}

/// Points are checked before the level requirement.
pub fn can_purchase(product: &PointProduct, level: u32, balance: u32) -> Result<(), PurchaseRefusal> {
    if balance < product.price {
        return Err(PurchaseRefusal::InsufficientPoints { missing: product.price - balance });
    }
    if let Some(required) = product.required_level {
        if level < required {
            return Err(PurchaseRefusal::LevelRequired { required });
        }
    }
    Ok(())
}

/// Check eligibility against the ledger and produce the spend entry to append.
pub fn purchase(
    ledger: &[PointTransaction],
    product: &PointProduct,
    now: DateTime<Utc>,
) -> Result<PointTransaction, PurchaseRefusal> {
    can_purchase(product, level(ledger).level, balance(ledger))?;

    Ok(PointTransaction {
        id: format!("trans-{}", Uuid::now_v7()),
        transaction_type: TransactionType::Spend,
        amount: product.price,
        description: product.name.to_string(),
        date: now,
        category: Some(product.category.as_str().to_string()),
    })
}
