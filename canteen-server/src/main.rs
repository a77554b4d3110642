use canteen_server::{ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 工作目录, 日志)
    let config = setup_environment()?;

    print_banner();
    tracing::info!(environment = %config.environment, "Canteen server starting...");

    // 2. 初始化服务状态
    let state = ServerState::initialize(&config)?;

    // 3. 启动后台任务
    let tasks = state.start_background_tasks();

    // 4. 等待退出信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;
    tracing::info!(
        sessions = state.hub.session_count(),
        "Canteen server stopped"
    );
    Ok(())
}
