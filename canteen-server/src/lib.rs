//! Canteen Server - 办公室食堂订餐核心
//!
//! # 架构概述
//!
//! - **订单** (`orders`): 订单状态机、配送分配、看板统计
//! - **通知** (`notifications`): 持久化通知账本、广播、过期清理
//! - **实时推送** (`realtime`): 按用户 / 配送员 / 管理员池分房间推送
//! - **配送员** (`staff`): 配送员名册与可用状态
//! - **数据库** (`db`): 嵌入式 redb 存储
//!
//! # 模块结构
//!
//! ```text
//! canteen-server/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── db/            # redb 打开与编码
//! ├── orders/        # 订单状态机与分配
//! ├── notifications/ # 通知账本
//! ├── realtime/      # 房间推送
//! ├── staff/         # 配送员名册
//! └── utils/         # 日志、校验、时区
//! ```

pub mod core;
pub mod db;
pub mod notifications;
pub mod orders;
pub mod realtime;
pub mod staff;
pub mod utils;

// Re-export 公共类型
pub use core::{BackgroundTasks, Config, ServerState};
pub use notifications::NotificationLedger;
pub use orders::{OrderStorage, OrdersManager};
pub use realtime::{FanoutRouter, RoomHub};
pub use utils::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// 日志文件保留天数
const LOG_RETENTION_DAYS: u64 = 14;

/// 设置运行环境
///
/// 1. 加载 `.env`
/// 2. 读取配置、创建工作目录
/// 3. 初始化日志 (生产环境写入 work_dir/logs，JSON 格式按配置)
/// 4. 清理过期日志文件
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    let log_dir = config.log_dir();
    let log_dir_str = log_dir.to_string_lossy();
    let file_output = config.is_production().then_some(&*log_dir_str);
    init_logger_with_file(Some(&config.log_level), config.log_json, file_output);

    match cleanup_old_logs(&log_dir_str, LOG_RETENTION_DAYS) {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "Old log files cleaned up"),
        Err(e) => tracing::warn!(error = %e, "Failed to clean up old log files"),
    }

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   ______            __
  / ____/___ _____  / /____  ___  ____
 / /   / __ `/ __ \/ __/ _ \/ _ \/ __ \
/ /___/ /_/ / / / / /_/  __/  __/ / / /
\____/\__,_/_/ /_/\__/\___/\___/_/ /_/
    "#
    );
}
