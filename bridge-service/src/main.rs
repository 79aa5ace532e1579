//! SQL Server 管理桥宿主进程
//!
//! 提供桌面客户端所需的全部桥接操作，包括：
//! - 服务器连接与会话管理
//! - 数据库/表的浏览与增删
//! - 行数据的分页查询与编辑
//! - 导入导出与转储恢复

use bridge_service::{create_router, state::AppState};
use common::config::AppConfig;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "bridge-service";

#[tokio::main]
async fn main() {
    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 创建应用状态（凭据与会话文件位于用户主目录）
    let state = AppState::new(config.clone())
        .expect("Failed to initialize application state (check home directory)");

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr).await.expect("绑定地址失败");
    axum::serve(listener, app).await.expect("服务启动失败");
}
