//! 桥接服务路由模块

use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::handlers;
use crate::state::AppState;

/// 创建桥接操作路由
pub fn router() -> Router<AppState> {
    Router::new()
        // Session
        .route("/api/session", get(handlers::load_session))
        .route("/api/session/connect", post(handlers::connect))
        .route("/api/session/disconnect", post(handlers::disconnect))
        .route("/api/session/restore", post(handlers::restore_session))
        // Credentials
        .route(
            "/api/credentials",
            get(handlers::load_credentials).post(handlers::save_credentials),
        )
        .route("/api/credentials/{id}", delete(handlers::delete_credentials))
        // Databases
        .route(
            "/api/databases",
            get(handlers::list_databases).post(handlers::create_database),
        )
        .route("/api/databases/{db}", delete(handlers::delete_database))
        .route("/api/databases/{db}/connect", post(handlers::open_database))
        // Tables
        .route(
            "/api/databases/{db}/tables",
            get(handlers::list_tables).post(handlers::create_table),
        )
        .route(
            "/api/databases/{db}/tables/{table}",
            delete(handlers::delete_table),
        )
        .route(
            "/api/databases/{db}/tables/{table}/structure",
            get(handlers::table_structure),
        )
        .route(
            "/api/databases/{db}/tables/{table}/relations",
            get(handlers::table_relations),
        )
        // Rows
        .route(
            "/api/databases/{db}/tables/{table}/data",
            post(handlers::table_data).delete(handlers::delete_all_rows),
        )
        .route(
            "/api/databases/{db}/tables/{table}/rows",
            post(handlers::insert_row)
                .patch(handlers::update_cell)
                .delete(handlers::delete_row),
        )
        // Transfer
        .route(
            "/api/databases/{db}/tables/{table}/export",
            post(handlers::export_table),
        )
        .route(
            "/api/databases/{db}/tables/{table}/import",
            post(handlers::import_table),
        )
        .route("/api/databases/{db}/dump", post(handlers::create_dump))
        .route("/api/databases/{db}/restore", post(handlers::restore_dump))
        // Health
        .route("/api/health", get(handlers::health_check))
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SQL Server 管理桥 API",
        version = "0.1.0",
        description = "桌面客户端与宿主进程之间的桥接操作"
    ),
    paths(
        handlers::connect,
        handlers::disconnect,
        handlers::load_session,
        handlers::restore_session,
        handlers::save_credentials,
        handlers::load_credentials,
        handlers::delete_credentials,
        handlers::list_databases,
        handlers::create_database,
        handlers::delete_database,
        handlers::open_database,
        handlers::list_tables,
        handlers::create_table,
        handlers::delete_table,
        handlers::table_structure,
        handlers::table_relations,
        handlers::table_data,
        handlers::update_cell,
        handlers::insert_row,
        handlers::delete_row,
        handlers::delete_all_rows,
        handlers::export_table,
        handlers::import_table,
        handlers::create_dump,
        handlers::restore_dump,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectRequest,
        common::models::SessionRecord,
        common::models::SaveCredentialRequest,
        common::models::ConnectionProfile,
        common::models::CreateDatabaseRequest,
        common::models::DatabaseEntry,
        common::models::TableEntry,
        common::models::ColumnDescriptor,
        common::models::ColumnSpec,
        common::models::CreateTableRequest,
        common::models::RelationEntry,
        common::models::TableDataRequest,
        common::models::TableColumn,
        common::models::TablePage,
        common::models::UpdateCellRequest,
        common::models::InsertRowRequest,
        common::models::DeleteRowRequest,
        common::models::ExportRequest,
        common::models::ExportFormat,
        common::models::ExportArtifact,
        common::models::ImportRequest,
        common::models::ImportFormat,
        common::models::ImportResult,
        common::models::DumpRequest,
        common::models::DumpResult,
        common::models::RestoreRequest,
        common::models::RestoreResult,
        common::models::StatementError,
        handlers::HealthResponse,
    )),
    tags(
        (name = "session", description = "连接与会话管理"),
        (name = "credentials", description = "凭据管理"),
        (name = "databases", description = "数据库管理"),
        (name = "tables", description = "表管理"),
        (name = "rows", description = "行数据操作"),
        (name = "transfer", description = "导入导出与转储"),
        (name = "health", description = "健康检查端点")
    )
)]
pub struct ApiDoc;

/// OpenAPI 文档端点
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
