//! Date/time tool: the current moment in Korea Standard Time, formatted the
//! way Korean readers expect (`2026. 10. 17. 오후 3:04:05`).

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use haru_core::error::ToolError;
use haru_core::tool::{Tool, ToolResult};
use serde::{Deserialize, Serialize};

pub const TOOL_NAME: &str = "getDateTime";

const KST_OFFSET_SECS: i32 = 9 * 3600;

const WEEKDAYS: [&str; 7] = [
    "일요일", "월요일", "화요일", "수요일", "목요일", "금요일", "토요일",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeInfo {
    pub current_time: String,
    pub date: String,
    pub time: String,
    pub day_of_week: String,
}

/// Format an instant in KST.
pub fn snapshot(instant: DateTime<Utc>) -> DateTimeInfo {
    let local = match FixedOffset::east_opt(KST_OFFSET_SECS) {
        Some(kst) => instant.with_timezone(&kst),
        None => instant.fixed_offset(),
    };

    let date = format!("{}. {}. {}.", local.year(), local.month(), local.day());

    let (is_pm, hour12) = local.hour12();
    let meridiem = if is_pm { "오후" } else { "오전" };
    let time = format!(
        "{meridiem} {hour12}:{:02}:{:02}",
        local.minute(),
        local.second()
    );

    let weekday = WEEKDAYS[local.weekday().num_days_from_sunday() as usize];

    DateTimeInfo {
        current_time: format!("{date} {time}"),
        date,
        time,
        day_of_week: weekday.to_string(),
    }
}

pub struct DateTimeTool {
    clock: fn() -> DateTime<Utc>,
}

impl DateTimeTool {
    pub fn new() -> Self {
        Self { clock: Utc::now }
    }

    /// Use a fixed clock (tests).
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self { clock }
    }
}

impl Default for DateTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "현재 날짜와 시간 정보를 가져옵니다"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        ToolResult::json(&snapshot((self.clock)()))
    }
}
