//! Reviewer levels derived from cumulative points.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub level: u32,
    pub name: &'static str,
    pub icon: &'static str,
    pub min_points: u32,
    /// Inclusive upper bound; `None` for the top level.
    pub max_points: Option<u32>,
    pub color: &'static str,
    pub bg_color: &'static str,
    pub benefits: &'static [&'static str],
    pub description: &'static str,
}

impl Level {
    pub fn is_max(&self) -> bool {
        self.max_points.is_none()
    }
}

pub static LEVELS: [Level; 5] = [
    Level {
        level: 1,
        name: "새싹 평가단",
        icon: "🌱",
        min_points: 0,
        max_points: Some(99),
        color: "#a8d5ba",
        bg_color: "#f0f9f4",
        benefits: &["체험단 신청 가능", "리뷰 작성 시 50 포인트"],
        description: "이제 막 시작한 신입 평가단",
    },
    Level {
        level: 2,
        name: "초보 평가단",
        icon: "🌿",
        min_points: 100,
        max_points: Some(299),
        color: "#6b8e6f",
        bg_color: "#e8f5e9",
        benefits: &["리뷰 작성 시 60 포인트 (+20%)", "월 1회 우선 선정 기회", "특별 이벤트 참여 가능"],
        description: "꾸준한 활동으로 성장하는 평가단",
    },
    Level {
        level: 3,
        name: "일반 평가단",
        icon: "🍀",
        min_points: 300,
        max_points: Some(599),
        color: "#4a7c59",
        bg_color: "#d4edda",
        benefits: &[
            "리뷰 작성 시 75 포인트 (+50%)",
            "월 2회 우선 선정 기회",
            "프리미엄 체험단 신청 가능",
            "사업자 직접 초대 우선권",
        ],
        description: "신뢰도 높은 중견 평가단",
    },
    Level {
        level: 4,
        name: "고급 평가단",
        icon: "⭐",
        min_points: 600,
        max_points: Some(999),
        color: "#f5a145",
        bg_color: "#fff3e0",
        benefits: &[
            "리뷰 작성 시 100 포인트 (+100%)",
            "월 4회 우선 선정 기회",
            "VIP 체험단 신청 가능",
            "리뷰 검수 우선 통과",
            "특별 할인 혜택",
        ],
        description: "검증된 전문성을 갖춘 평가단",
    },
    Level {
        level: 5,
        name: "전문 평가단",
        icon: "👑",
        min_points: 1000,
        max_points: None,
        color: "#d4af37",
        bg_color: "#fffbf0",
        benefits: &[
            "리뷰 작성 시 150 포인트 (+200%)",
            "무제한 우선 선정",
            "신메뉴 선 체험 기회",
            "사업자 컨설팅 참여",
            "최상위 등급 전용 혜택",
            "월간 TOP 평가단 이벤트",
        ],
        description: "최고의 신뢰도를 자랑하는 마스터 평가단",
    },
];

const REVIEW_BASE_POINTS: f64 = 50.0;
const PHOTO_BONUS: f64 = 20.0;
const LEVEL_MULTIPLIERS: [f64; 5] = [1.0, 1.2, 1.5, 2.0, 3.0];

/// Highest level whose minimum is reached.
pub fn level_of(points: u32) -> &'static Level {
    LEVELS
        .iter()
        .rev()
        .find(|l| points >= l.min_points)
        .unwrap_or(&LEVELS[0])
}

/// Level metadata by number; unknown numbers map to the first level.
pub fn level_info(level: u32) -> &'static Level {
    LEVELS.iter().find(|l| l.level == level).unwrap_or(&LEVELS[0])
}

/// Progress through the current level, 0 to 100. Always 100 at the top level.
pub fn progress_percent(points: u32) -> u32 {
    let current = level_of(points);
    let Some(max) = current.max_points else {
        return 100;
    };
    let span = f64::from(max - current.min_points + 1);
    let into = f64::from(points - current.min_points);
    ((into / span) * 100.0).round().min(100.0) as u32
}

pub fn points_to_next_level(points: u32) -> u32 {
    match level_of(points).max_points {
        Some(max) => max + 1 - points,
        None => 0,
    }
}

pub fn review_points(level: u32, has_photos: bool) -> u32 {
    let multiplier = level
        .checked_sub(1)
        .and_then(|i| LEVEL_MULTIPLIERS.get(i as usize))
        .copied()
        .unwrap_or(1.0);
    let bonus = if has_photos { PHOTO_BONUS } else { 0.0 };
    (REVIEW_BASE_POINTS * multiplier + bonus).round() as u32
}
