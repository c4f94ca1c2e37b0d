//! Weather tool backed by OpenWeatherMap.
//!
//! Queries current conditions (and, for "내일"/"tomorrow", the 5-day
//! forecast), normalizes the payload into a [`WeatherResult`] and attaches a
//! short Korean advisory. Missing credentials, unknown cities and transient
//! failures come back as informational results rather than errors, so the
//! model can still explain what went wrong. Only a rejected API key or an
//! unexpected HTTP status aborts the tool call.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use haru_config::WeatherConfig;
use haru_core::error::ToolError;
use haru_core::tool::{Tool, ToolResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::city;

pub const TOOL_NAME: &str = "getWeather";

/// Korea Standard Time, used when the forecast payload carries no offset.
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Forecast entries closest to mid-afternoon represent "tomorrow".
const TARGET_MINUTE_OF_DAY: i64 = 15 * 60;

const NO_KEY_ADVICE: &str = "실제 날씨 정보를 위해서는 OpenWeather API 키가 필요합니다.";
const RETRY_ADVICE: &str = "죄송합니다. 현재 날씨 정보를 가져올 수 없습니다. 잠시 후 다시 시도해주세요.";

/// Why a [`WeatherResult`] carries no measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherErrorCode {
    #[serde(rename = "no credential")]
    NoCredential,
    #[serde(rename = "city not found")]
    CityNotFound,
    #[serde(rename = "connection error")]
    ConnectionError,
}

/// Normalized weather report returned to the model and the browser.
///
/// Measurement fields serialize as `null` when unknown; they are never
/// omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherResult {
    pub location: String,
    pub date: String,
    pub condition: String,
    /// °C, rounded
    pub temperature: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<i64>,
    /// percent
    pub humidity: Option<i64>,
    /// km/h, rounded
    pub wind_speed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub advice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WeatherErrorCode>,
}

impl WeatherResult {
    fn unavailable(
        location: &str,
        date: &str,
        condition: &str,
        advice: String,
        code: WeatherErrorCode,
    ) -> Self {
        Self {
            location: location.to_string(),
            date: date.to_string(),
            condition: condition.to_string(),
            temperature: None,
            feels_like: None,
            humidity: None,
            wind_speed: None,
            icon: None,
            advice,
            source: None,
            error: Some(code),
        }
    }

    pub fn no_credential(location: &str, date: &str) -> Self {
        Self::unavailable(
            location,
            date,
            "정보 제한",
            NO_KEY_ADVICE.to_string(),
            WeatherErrorCode::NoCredential,
        )
    }

    pub fn city_not_found(location: &str, date: &str) -> Self {
        Self::unavailable(
            location,
            date,
            "정보 없음",
            format!("'{location}' 지역의 날씨 정보를 찾을 수 없습니다. 도시 이름을 다시 확인해주세요."),
            WeatherErrorCode::CityNotFound,
        )
    }

    pub fn connection_error(location: &str, date: &str) -> Self {
        Self::unavailable(
            location,
            date,
            "정보 없음",
            RETRY_ADVICE.to_string(),
            WeatherErrorCode::ConnectionError,
        )
    }
}

/// Pick the advisory line for a condition description and temperature.
///
/// Rules are checked in order and the first match wins. Temperature rules
/// are skipped when the temperature is unknown.
pub fn advise(condition: &str, temperature: Option<i64>) -> &'static str {
    let lower = condition.to_lowercase();
    let has = |ko: &str, en: &str| lower.contains(ko) || lower.contains(en);

    if has("비", "rain") {
        return "우산을 꼭 챙기세요! 미끄러운 길을 조심하세요.";
    }
    if has("눈", "snow") {
        return "따뜻하게 입고 나가세요! 눈길 운전 조심하세요.";
    }
    if let Some(t) = temperature {
        if t >= 30 {
            return "매우 더운 날씨예요. 충분한 수분 섭취와 자외선 차단에 신경 쓰세요!";
        }
        if t <= 0 {
            return "매우 추운 날씨예요. 방한용품을 꼭 챙기고 동상에 주의하세요!";
        }
        if t <= 10 {
            return "쌀쌀한 날씨예요. 따뜻한 옷을 입고 나가세요.";
        }
    }
    if has("맑", "clear") {
        return "야외 활동하기 좋은 날씨예요! 햇볕을 즐겨보세요.";
    }
    "적당한 옷차림으로 나가세요!"
}

/// Whether a date qualifier asks for tomorrow's weather.
pub fn wants_tomorrow(date: &str) -> bool {
    date.contains("내일") || date.to_lowercase().contains("tomorrow")
}

// --- OpenWeatherMap payloads ---

/// One set of conditions: the `weather` response or a `forecast` list entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Observation {
    /// Unix timestamp (UTC)
    #[serde(default)]
    pub dt: Option<i64>,
    #[serde(default)]
    pub main: Option<MainReadings>,
    #[serde(default)]
    pub wind: Option<WindReadings>,
    #[serde(default)]
    pub weather: Vec<ConditionReading>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MainReadings {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindReadings {
    /// m/s with `units=metric`
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConditionReading {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Forecast {
    #[serde(default)]
    list: Vec<Observation>,
    #[serde(default)]
    city: Option<ForecastCity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ForecastCity {
    /// Shift in seconds from UTC
    #[serde(default)]
    timezone: Option<i32>,
}

impl Observation {
    fn temp(&self) -> Option<f64> {
        self.main.as_ref().and_then(|m| m.temp)
    }
    fn feels_like(&self) -> Option<f64> {
        self.main.as_ref().and_then(|m| m.feels_like)
    }
    fn humidity(&self) -> Option<f64> {
        self.main.as_ref().and_then(|m| m.humidity)
    }
    fn wind_speed(&self) -> Option<f64> {
        self.wind.as_ref().and_then(|w| w.speed)
    }
    fn description(&self) -> Option<&str> {
        self.weather
            .first()
            .and_then(|w| w.description.as_deref())
            .filter(|d| !d.is_empty())
    }
    fn icon(&self) -> Option<&str> {
        self.weather.first().and_then(|w| w.icon.as_deref())
    }
}

/// Choose the forecast entry that best represents `tomorrow` in the city's
/// local time: the one whose local time is nearest 15:00. Ties go to the
/// earlier entry.
pub fn select_forecast(
    list: &[Observation],
    tomorrow: NaiveDate,
    offset: FixedOffset,
) -> Option<&Observation> {
    list.iter()
        .filter_map(|entry| {
            let local = DateTime::from_timestamp(entry.dt?, 0)?.with_timezone(&offset);
            (local.date_naive() == tomorrow).then(|| {
                let minute = i64::from(local.hour() * 60 + local.minute());
                ((minute - TARGET_MINUTE_OF_DAY).abs(), entry)
            })
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, entry)| entry)
}

/// Build the result from current conditions and an optional forecast entry.
///
/// Each field prefers the forecast entry and falls back to current
/// conditions. Without any condition description the payload is treated as
/// a failed lookup.
pub fn normalize(
    location: &str,
    date: &str,
    current: &Observation,
    chosen: Option<&Observation>,
) -> WeatherResult {
    let pick = |f: fn(&Observation) -> Option<f64>| chosen.and_then(f).or_else(|| f(current));

    let condition = chosen
        .and_then(Observation::description)
        .or_else(|| current.description());
    let Some(condition) = condition else {
        return WeatherResult::connection_error(location, date);
    };

    let temperature = pick(Observation::temp).map(round);
    let icon = chosen
        .and_then(Observation::icon)
        .or_else(|| current.icon())
        .map(str::to_string);

    WeatherResult {
        location: location.to_string(),
        date: date.to_string(),
        condition: condition.to_string(),
        temperature,
        feels_like: pick(Observation::feels_like).map(round),
        humidity: pick(Observation::humidity).map(round),
        wind_speed: pick(Observation::wind_speed).map(|ms| round(ms * 3.6)),
        icon,
        advice: advise(condition, temperature).to_string(),
        source: Some("OpenWeatherMap".into()),
        error: None,
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

// --- Tool ---

type Clock = fn() -> DateTime<Utc>;

enum LookupError {
    NotFound,
    Fatal(ToolError),
    Connection(String),
}

pub struct WeatherTool {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    country_code: String,
    clock: Clock,
}

impl WeatherTool {
    pub fn new(config: &WeatherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            country_code: config.country_code.clone(),
            clock: Utc::now,
        }
    }

    /// Replace the clock used to work out "tomorrow".
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Look up the weather for a location and date qualifier.
    pub async fn lookup(&self, location: &str, date: &str) -> Result<WeatherResult, ToolError> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!(location, "No OpenWeather key configured");
            return Ok(WeatherResult::no_credential(location, date));
        };

        let city = city::resolve(location);
        debug!(location, city = %city, date, "Looking up weather");

        let current: Observation = match self.fetch("weather", &city, api_key).await {
            Ok(obs) => obs,
            Err(LookupError::NotFound) => {
                debug!(city = %city, "Weather service does not know this city");
                return Ok(WeatherResult::city_not_found(location, date));
            }
            Err(LookupError::Fatal(e)) => return Err(e),
            Err(LookupError::Connection(reason)) => {
                warn!(city = %city, reason = %reason, "Weather lookup failed");
                return Ok(WeatherResult::connection_error(location, date));
            }
        };

        if !wants_tomorrow(date) {
            return Ok(normalize(location, date, &current, None));
        }

        let forecast: Option<Forecast> = match self.fetch("forecast", &city, api_key).await {
            Ok(f) => Some(f),
            Err(_) => {
                debug!(city = %city, "Forecast unavailable, using current conditions");
                None
            }
        };

        let chosen = forecast.as_ref().and_then(|f| {
            let offset = f
                .city
                .as_ref()
                .and_then(|c| c.timezone)
                .and_then(FixedOffset::east_opt)
                .or_else(|| FixedOffset::east_opt(KST_OFFSET_SECS))?;
            let tomorrow = (self.clock)()
                .with_timezone(&offset)
                .date_naive()
                .succ_opt()?;
            select_forecast(&f.list, tomorrow, offset)
        });

        Ok(normalize(location, date, &current, chosen))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        city: &str,
        api_key: &str,
    ) -> Result<T, LookupError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let q = format!("{city},{}", self.country_code);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", q.as_str()),
                ("appid", api_key),
                ("units", "metric"),
                ("lang", "kr"),
            ])
            .send()
            .await
            .map_err(|e| LookupError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            200..=299 => {}
            404 => return Err(LookupError::NotFound),
            401 => {
                warn!(endpoint, "OpenWeather rejected the API key");
                return Err(LookupError::Fatal(ToolError::ExecutionFailed {
                    tool_name: TOOL_NAME.into(),
                    reason: "OpenWeather API key is invalid".into(),
                }));
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                warn!(endpoint, status, body = %body, "OpenWeather returned an error");
                return Err(LookupError::Fatal(ToolError::ExecutionFailed {
                    tool_name: TOOL_NAME.into(),
                    reason: format!("weather service returned status {status}"),
                }));
            }
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LookupError::Connection(format!("undecodable response: {e}")))
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "특정 지역의 현재 날씨 정보를 가져옵니다"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "날씨를 확인할 지역 (예: 서울, 부산, 대구, Seoul, Busan)"
                },
                "date": {
                    "type": "string",
                    "description": "날짜 (오늘, 내일 등)"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let location = arguments["location"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'location' argument".into()))?;
        let date = arguments["date"].as_str().unwrap_or("오늘");

        let result = self.lookup(location, date).await?;
        ToolResult::json(&result)
    }
}
