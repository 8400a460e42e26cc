//! 설비 상태 모델.
//!
//! `GET /api/machine-data/` 응답 행과, 그로부터 파생되는 최신 상태 샘플 및
//! 누적 가동/정지 시간 요약.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 설비 데이터 한 행 (서버 응답 그대로)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRecord {
    /// 행 ID
    #[serde(default)]
    pub id: i64,
    /// 가동 여부 (null이면 상태 미확정)
    #[serde(default)]
    pub status: Option<bool>,
    /// 설비 이름
    #[serde(default)]
    pub machine_name: String,
    /// 생산 수량
    #[serde(default)]
    pub production_count: u64,
    /// 생산 시작 시각 (최신 행) 또는 가동 누적 `HH:MM:SS` (이력 행)
    #[serde(default)]
    pub start_production_hour: Option<String>,
    /// 정지 시각 (최신 행) 또는 정지 누적 `HH:MM:SS` (이력 행)
    #[serde(default)]
    pub stop_hour: Option<String>,
    /// 정지 사유 ID
    #[serde(default)]
    pub stopping_reason: Option<i64>,
}

/// 최신 상태 샘플: 폴링 한 번의 결과
///
/// `is_running == false`이면 `since_time`은 정지 시각이고 정지 시간 카운터의
/// 기준점이 된다. `true`이면 생산 시작 시각이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSample {
    /// 가동 여부
    pub is_running: bool,
    /// 샘플 수신 시각
    pub sample_time: DateTime<Utc>,
    /// 상태 전환 시각
    pub since_time: DateTime<Utc>,
}

impl StatusSample {
    /// 이력 목록의 마지막 행에서 샘플 생성
    ///
    /// 목록이 비었거나 마지막 행의 `status`가 null이면 `Ok(None)`,
    /// 표시 상태를 바꾸지 않는다.
    pub fn from_records(
        records: &[MachineRecord],
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, CoreError> {
        let Some(latest) = records.last() else {
            return Ok(None);
        };
        let Some(is_running) = latest.status else {
            return Ok(None);
        };

        let (field, raw) = if is_running {
            ("start_production_hour", latest.start_production_hour.as_deref())
        } else {
            ("stop_hour", latest.stop_hour.as_deref())
        };

        let raw = raw.ok_or_else(|| {
            CoreError::MalformedResponse(format!("최신 행(id={})에 {field} 없음", latest.id))
        })?;
        let since_time = parse_timestamp(raw).ok_or_else(|| {
            CoreError::MalformedResponse(format!("{field} 시각 파싱 실패: {raw}"))
        })?;

        Ok(Some(Self {
            is_running,
            sample_time: now,
            since_time,
        }))
    }
}

/// 이력 전체의 누적 가동/정지 시간
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// 누적 가동 시간 (초)
    pub total_active_secs: u64,
    /// 누적 정지 시간 (초)
    pub total_inactive_secs: u64,
    /// 정지 사유가 기록된 정지 횟수
    pub stops: u32,
}

impl StatusSummary {
    /// 시작/정지 값이 모두 있는 행만 집계
    ///
    /// `HH:MM:SS` 형식이 아닌 값(타임스탬프 등)은 0초로 취급한다.
    /// 합계는 `u64::MAX`에서 멈춘다.
    pub fn from_records(records: &[MachineRecord]) -> Self {
        records
            .iter()
            .filter_map(|r| match (&r.start_production_hour, &r.stop_hour) {
                (Some(start), Some(stop)) => Some((start, stop, r.stopping_reason.is_some())),
                _ => None,
            })
            .fold(Self::default(), |mut acc, (start, stop, stopped)| {
                acc.total_active_secs = acc
                    .total_active_secs
                    .saturating_add(parse_hms(start).unwrap_or(0));
                acc.total_inactive_secs = acc
                    .total_inactive_secs
                    .saturating_add(parse_hms(stop).unwrap_or(0));
                if stopped {
                    acc.stops = acc.stops.saturating_add(1);
                }
                acc
            })
    }
}

/// ISO-8601 타임스탬프 파싱
///
/// 오프셋이 없는 값은 UTC로 간주한다.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `[D ]HH:MM:SS[.f]` 형식 기간 파싱 (초 단위, 소수점 이하 버림)
///
/// 초로 환산해 `u64`를 넘는 값은 `None`.
pub fn parse_hms(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (days, clock) = match raw.split_once(' ') {
        Some((d, rest)) => (d.parse::<u64>().ok()?, rest),
        None => (0, raw),
    };

    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds_raw = parts.next()?;
    if parts.next().is_some() || minutes >= 60 {
        return None;
    }
    let seconds: u64 = seconds_raw.split('.').next()?.parse().ok()?;
    if seconds >= 60 {
        return None;
    }

    days.checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes * 60 + seconds)
}

/// 초 단위 기간을 `DD:HH:MM:SS`로 포맷
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    format!("{days:02}:{hours:02}:{minutes:02}:{seconds:02}")
}
