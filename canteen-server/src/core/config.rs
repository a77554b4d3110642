use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::db::DATABASE_FILE;
use crate::orders::{ManagerSettings, manager::DEFAULT_MAX_ACTIVE_DELIVERIES};
use crate::realtime::DEFAULT_SESSION_BUFFER;
use crate::utils::time::parse_timezone;

/// 服务配置 - 食堂订单服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 默认日志级别 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | TIMEZONE | Asia/Kolkata | 业务时区 |
/// | MAX_ACTIVE_DELIVERIES | 3 | 每位配送员的并发配送上限 |
/// | NOTIFICATION_RETENTION_DAYS | 30 | 已读通知保留天数 |
/// | RETENTION_SWEEP_INTERVAL_SECS | 3600 | 通知清理间隔 |
/// | AUTO_ASSIGN_INTERVAL_SECS | 60 | 自动分配间隔 (0 = 关闭) |
/// | PUSH_BUFFER | 64 | 每个实时会话的缓冲区大小 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/canteen TIMEZONE=Asia/Kolkata cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志
    pub work_dir: String,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    /// 业务时区 (订单号日期、看板时间窗口)
    pub timezone: Tz,
    /// 每位配送员同时进行中的配送上限
    pub max_active_deliveries: usize,
    /// 已读通知保留天数
    pub notification_retention_days: u64,
    /// 通知清理间隔 (秒)
    pub retention_sweep_interval_secs: u64,
    /// 自动分配间隔 (秒)，0 表示关闭
    pub auto_assign_interval_secs: u64,
    /// 每个实时会话的推送缓冲区
    pub push_buffer: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            timezone: parse_timezone(
                &std::env::var("TIMEZONE").unwrap_or_else(|_| "Asia/Kolkata".into()),
            ),
            max_active_deliveries: env_or("MAX_ACTIVE_DELIVERIES", DEFAULT_MAX_ACTIVE_DELIVERIES)
                .max(1),
            notification_retention_days: env_or("NOTIFICATION_RETENTION_DAYS", 30),
            retention_sweep_interval_secs: env_or("RETENTION_SWEEP_INTERVAL_SECS", 3600),
            auto_assign_interval_secs: env_or("AUTO_ASSIGN_INTERVAL_SECS", 60),
            push_buffer: env_or("PUSH_BUFFER", DEFAULT_SESSION_BUFFER).max(1),
        }
    }

    /// 使用自定义工作目录覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// 数据库文件路径 (work_dir/canteen.redb)
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(DATABASE_FILE)
    }

    /// 日志目录 (work_dir/logs)
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            max_active_deliveries: self.max_active_deliveries,
            tz: self.timezone,
        }
    }

    pub fn notification_retention(&self) -> Duration {
        Duration::from_secs(self.notification_retention_days * 24 * 60 * 60)
    }

    pub fn retention_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention_sweep_interval_secs.max(1))
    }

    /// `None` when the auto-assign worker is disabled
    pub fn auto_assign_interval(&self) -> Option<Duration> {
        (self.auto_assign_interval_secs > 0)
            .then(|| Duration::from_secs(self.auto_assign_interval_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
