//! 时间工具函数 — 业务时区转换
//!
//! 存储层只接收 `i64` Unix millis；营业日与统计窗口在这里按业务时区计算。

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use chrono_tz::Tz;

/// 解析时区名称 (IANA)，失败回退到 UTC
pub fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|e| {
        tracing::warn!("Failed to parse timezone '{}': {}, falling back to UTC", name, e);
        Tz::UTC
    })
}

/// Unix millis → 业务时区时间
pub fn millis_to_local(millis: i64, tz: Tz) -> DateTime<Tz> {
    tz.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(|| chrono::Utc::now().with_timezone(&tz))
}

/// Unix millis 所在的营业日 (业务时区)
pub fn business_date(millis: i64, tz: Tz) -> NaiveDate {
    millis_to_local(millis, tz).date_naive()
}

/// 日期开始 (00:00:00) → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    naive
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 往前回溯 `days` 天的时间点 (Unix millis)
pub fn days_before_millis(now_millis: i64, days: i64) -> i64 {
    now_millis - Duration::days(days).num_milliseconds()
}
