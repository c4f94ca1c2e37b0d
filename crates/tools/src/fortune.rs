//! Fortune tool: a light-hearted daily reading.
//!
//! Draws one label from the category's fixed list, three lucky numbers and a
//! lucky colour. The random source is injectable so tests can seed it.

use async_trait::async_trait;
use haru_core::error::ToolError;
use haru_core::tool::{Tool, ToolResult};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const TOOL_NAME: &str = "getFortune";

const DEFAULT_CATEGORY: &str = "전체";

pub const LUCKY_COLORS: [&str; 7] = ["빨강", "파랑", "노랑", "초록", "보라", "주황", "분홍"];

/// Fortune categories. Unknown labels read from [`FortuneCategory::All`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FortuneCategory {
    All,
    Love,
    Career,
    Health,
    Wealth,
}

impl FortuneCategory {
    /// Parse a Korean or English category label.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "전체" | "종합" | "all" | "overall" | "general" => Some(Self::All),
            "연애" | "사랑" | "love" | "romance" => Some(Self::Love),
            "직업" | "직장" | "career" | "work" | "job" => Some(Self::Career),
            "건강" | "health" => Some(Self::Health),
            "재물" | "금전" | "wealth" | "money" => Some(Self::Wealth),
            _ => None,
        }
    }

    /// The five possible readings for this category.
    pub fn options(self) -> &'static [&'static str; 5] {
        match self {
            Self::All => &["대길", "길", "중길", "소길", "평"],
            Self::Love => &[
                "새로운 만남",
                "기존 관계 발전",
                "소통이 중요",
                "인내가 필요",
                "자신에게 집중",
            ],
            Self::Career => &[
                "승진 기회",
                "새로운 프로젝트",
                "동료와의 협력",
                "실력 향상",
                "안정적 진행",
            ],
            Self::Health => &[
                "활력 충전",
                "운동 시작",
                "휴식 필요",
                "규칙적 생활",
                "스트레스 관리",
            ],
            Self::Wealth => &[
                "투자 기회",
                "절약 필요",
                "부수입 가능",
                "계획적 소비",
                "안정적 관리",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FortuneResult {
    pub period: String,
    /// The category label as requested
    pub category: String,
    pub fortune: String,
    pub lucky_numbers: [u32; 3],
    pub lucky_color: String,
    pub advice: String,
}

pub struct FortuneTool {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl FortuneTool {
    /// A fortune tool seeded from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// A fortune tool drawing from the given source.
    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Draw a reading for `period` in `category`.
    pub fn draw(&self, period: &str, category: &str) -> FortuneResult {
        let options = FortuneCategory::parse(category)
            .unwrap_or(FortuneCategory::All)
            .options();

        let mut guard = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let rng: &mut dyn RngCore = &mut **guard;

        let fortune = options.choose(rng).copied().unwrap_or(options[0]);
        let lucky_numbers = [
            rng.random_range(1..=100),
            rng.random_range(1..=100),
            rng.random_range(1..=100),
        ];
        let lucky_color = LUCKY_COLORS.choose(rng).copied().unwrap_or(LUCKY_COLORS[0]);
        drop(guard);

        FortuneResult {
            period: period.to_string(),
            category: category.to_string(),
            fortune: fortune.to_string(),
            lucky_numbers,
            lucky_color: lucky_color.to_string(),
            advice: format!(
                "{period}은 {fortune}의 기운이 있습니다. 행운의 색깔 {lucky_color}을 활용해보세요!"
            ),
        }
    }
}

impl Default for FortuneTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FortuneTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "오늘의 운세나 특정 기간의 운세를 제공합니다"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "period": {
                    "type": "string",
                    "description": "운세 기간 (오늘, 이번주, 이번달 등)"
                },
                "category": {
                    "type": "string",
                    "description": "운세 카테고리 (전체, 연애, 직업, 건강, 재물 등)"
                }
            },
            "required": ["period"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let period = arguments["period"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'period' argument".into()))?;
        let category = arguments["category"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);

        ToolResult::json(&self.draw(period, category))
    }
}
