use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use redb::Database;

use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::open_database;
use crate::notifications::{NotificationLedger, NotificationStorage, RetentionWorker};
use crate::orders::{AutoAssignWorker, OrderStorage, OrdersManager};
use crate::realtime::RoomHub;
use crate::staff::StaffRepository;

/// 服务状态 - 持有所有服务的共享引用
///
/// 所有字段都是廉价克隆的句柄 (内部 Arc)，可以在任务之间自由传递。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Arc<Database> | 嵌入式数据库 (redb) |
/// | staff | StaffRepository | 配送员名册 |
/// | ledger | NotificationLedger | 通知账本 |
/// | hub | RoomHub | 实时推送房间 |
/// | orders | OrdersManager | 订单状态机 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Arc<Database>,
    pub staff: StaffRepository,
    pub ledger: NotificationLedger,
    pub hub: RoomHub,
    pub orders: OrdersManager,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .field("orders", &self.orders)
            .finish_non_exhaustive()
    }
}

impl ServerState {
    /// 初始化服务状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/canteen.redb)
    /// 3. 各存储与服务 (Staff, Notifications, RoomHub, Orders)
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        config
            .ensure_work_dir_structure()
            .with_context(|| format!("Failed to create work directory {}", config.work_dir))?;

        let db_path = config.database_path();
        let db = open_database(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        let staff = StaffRepository::new(db.clone()).context("Failed to open staff tables")?;
        let ledger = NotificationLedger::new(
            NotificationStorage::new(db.clone()).context("Failed to open notification tables")?,
        );
        let storage = OrderStorage::new(db.clone()).context("Failed to open order tables")?;
        let hub = RoomHub::new(config.push_buffer);
        let orders = OrdersManager::new(
            storage,
            staff.clone(),
            ledger.clone(),
            Arc::new(hub.clone()),
            config.manager_settings(),
        );

        tracing::info!(
            database = %db_path.display(),
            timezone = %config.timezone,
            max_active_deliveries = config.max_active_deliveries,
            "Server state initialized"
        );

        Ok(Self {
            config: config.clone(),
            db,
            staff,
            ledger,
            hub,
            orders,
        })
    }

    /// 启动后台任务
    ///
    /// 启动的任务：
    /// - 已读通知清理 (RetentionWorker)
    /// - 自动分配配送员 (AutoAssignWorker，间隔为 0 时不启动)
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let retention = RetentionWorker::new(
            self.ledger.clone(),
            self.config.notification_retention(),
            self.config.retention_sweep_interval(),
            tasks.shutdown_token(),
        );
        tasks.spawn("notification_retention", TaskKind::Periodic, retention.run());

        match self.config.auto_assign_interval() {
            Some(interval) => {
                let worker =
                    AutoAssignWorker::new(self.orders.clone(), interval, tasks.shutdown_token());
                tasks.spawn("auto_assign", TaskKind::Periodic, worker.run());
            }
            None => tracing::info!("Auto-assign worker disabled"),
        }

        tasks.log_summary();
        tasks
    }

    /// 获取工作目录
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }
}
