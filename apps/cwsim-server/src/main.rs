//! 检重秤模拟器入口：加载配置，启动控制面与数据面，Ctrl-C 优雅退出。

use cwsim_config::AppConfig;
use cwsim_server::{AppState, DataPlane, build_router};
use cwsim_telemetry::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let control_listener = tokio::net::TcpListener::bind(&config.control_addr).await?;
    let data_listener = tokio::net::TcpListener::bind(&config.data_addr).await?;
    info!(
        control = %config.control_addr,
        data = %config.data_addr,
        scope = ?config.preset_scope,
        preset = %config.default_preset.name,
        "checkweigher simulator starting"
    );

    let state = AppState::from_config(config);
    let data_plane = DataPlane::new(state.transmitter.clone(), &state.config);
    let app = build_router(state);

    tokio::select! {
        result = axum::serve(control_listener, app).with_graceful_shutdown(shutdown_signal()) => result?,
        _ = data_plane.run(data_listener) => {}
    }

    info!("checkweigher simulator stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
