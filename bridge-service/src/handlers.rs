//! Handler 模块
//!
//! One handler per bridge operation; each builds the service it needs,
//! delegates, and wraps the result in the unified envelope.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::models::{
    ColumnDescriptor, ConnectRequest, ConnectionProfile, CreateDatabaseRequest,
    CreateTableRequest, DatabaseEntry, DeleteRowRequest, DumpRequest, DumpResult, ExportArtifact,
    ExportRequest, ImportRequest, ImportResult, InsertRowRequest, RelationEntry, RestoreRequest,
    RestoreResult, SaveCredentialRequest, SessionRecord, TableDataRequest, TableEntry, TablePage,
    UpdateCellRequest,
};
use common::response::ApiResponse;

use crate::service::{
    DatabaseService, RowService, SessionService, TableService, TransferService,
};
use crate::state::AppState;

const SERVICE_NAME: &str = "bridge-service";

type Envelope<T> = Result<Json<ApiResponse<T>>, AppError>;

fn ok<T: Serialize>(data: T) -> Envelope<T> {
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

fn session_service(state: &AppState) -> SessionService {
    SessionService::new(
        state.registry.clone(),
        state.sessions.clone(),
        state.credentials.clone(),
    )
}

// ============== Session ==============

/// 连接 SQL Server 实例
#[utoipa::path(
    post,
    path = "/api/session/connect",
    tag = "session",
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "连接成功", body = ApiResponse<SessionRecord>),
        (status = 502, description = "连接失败")
    )
)]
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> Envelope<SessionRecord> {
    let record = session_service(&state).connect(req).await?;
    ok(record)
}

/// 断开连接并清除会话
#[utoipa::path(
    post,
    path = "/api/session/disconnect",
    tag = "session",
    responses(
        (status = 200, description = "已断开", body = ApiResponse<bool>)
    )
)]
pub async fn disconnect(State(state): State<AppState>) -> Envelope<bool> {
    session_service(&state).disconnect().await?;
    ok(true)
}

/// 读取持久化的会话记录
#[utoipa::path(
    get,
    path = "/api/session",
    tag = "session",
    responses(
        (status = 200, description = "会话记录（可能为空）", body = ApiResponse<Option<SessionRecord>>)
    )
)]
pub async fn load_session(State(state): State<AppState>) -> Envelope<Option<SessionRecord>> {
    let session = session_service(&state).load_session()?;
    ok(session)
}

/// 从会话记录恢复连接（密码需要重新输入）
#[utoipa::path(
    post,
    path = "/api/session/restore",
    tag = "session",
    request_body = SessionRecord,
    responses(
        (status = 200, description = "会话已恢复", body = ApiResponse<SessionRecord>),
        (status = 502, description = "恢复失败，需要重新输入密码")
    )
)]
pub async fn restore_session(
    State(state): State<AppState>,
    Json(record): Json<SessionRecord>,
) -> Envelope<SessionRecord> {
    let record = session_service(&state).restore(record).await?;
    ok(record)
}

// ============== Credentials ==============

/// 保存连接凭据
#[utoipa::path(
    post,
    path = "/api/credentials",
    tag = "credentials",
    request_body = SaveCredentialRequest,
    responses(
        (status = 200, description = "凭据已保存", body = ApiResponse<ConnectionProfile>)
    )
)]
pub async fn save_credentials(
    State(state): State<AppState>,
    Json(req): Json<SaveCredentialRequest>,
) -> Envelope<ConnectionProfile> {
    let profile = session_service(&state).save_credential(req)?;
    ok(profile)
}

/// 列出已保存的连接凭据
#[utoipa::path(
    get,
    path = "/api/credentials",
    tag = "credentials",
    responses(
        (status = 200, description = "凭据列表", body = ApiResponse<Vec<ConnectionProfile>>)
    )
)]
pub async fn load_credentials(State(state): State<AppState>) -> Envelope<Vec<ConnectionProfile>> {
    let profiles = session_service(&state).load_credentials()?;
    ok(profiles)
}

/// 根据 ID 删除连接凭据
#[utoipa::path(
    delete,
    path = "/api/credentials/{id}",
    tag = "credentials",
    params(("id" = String, Path, description = "凭据 ID")),
    responses(
        (status = 200, description = "凭据已删除", body = ApiResponse<bool>)
    )
)]
pub async fn delete_credentials(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Envelope<bool> {
    let removed = session_service(&state).delete_credential(&id)?;
    ok(removed)
}

// ============== Databases ==============

/// 列出用户数据库
#[utoipa::path(
    get,
    path = "/api/databases",
    tag = "databases",
    responses(
        (status = 200, description = "数据库列表", body = ApiResponse<Vec<DatabaseEntry>>),
        (status = 409, description = "没有活动连接")
    )
)]
pub async fn list_databases(State(state): State<AppState>) -> Envelope<Vec<DatabaseEntry>> {
    let databases = DatabaseService::new(state.registry).list().await?;
    ok(databases)
}

/// 创建数据库
#[utoipa::path(
    post,
    path = "/api/databases",
    tag = "databases",
    request_body = CreateDatabaseRequest,
    responses(
        (status = 200, description = "数据库已创建", body = ApiResponse<String>),
        (status = 400, description = "数据库名非法")
    )
)]
pub async fn create_database(
    State(state): State<AppState>,
    Json(req): Json<CreateDatabaseRequest>,
) -> Envelope<String> {
    let message = DatabaseService::new(state.registry).create(&req.name).await?;
    ok(message)
}

/// 删除数据库（系统库受保护）
#[utoipa::path(
    delete,
    path = "/api/databases/{db}",
    tag = "databases",
    params(("db" = String, Path, description = "数据库名")),
    responses(
        (status = 200, description = "数据库已删除", body = ApiResponse<String>),
        (status = 400, description = "系统库不可删除")
    )
)]
pub async fn delete_database(
    State(state): State<AppState>,
    Path(db): Path<String>,
) -> Envelope<String> {
    let message = DatabaseService::new(state.registry).drop(&db).await?;
    ok(message)
}

/// 打开（或复用）指定数据库的连接池
#[utoipa::path(
    post,
    path = "/api/databases/{db}/connect",
    tag = "databases",
    params(("db" = String, Path, description = "数据库名")),
    responses(
        (status = 200, description = "已连接", body = ApiResponse<String>)
    )
)]
pub async fn open_database(
    State(state): State<AppState>,
    Path(db): Path<String>,
) -> Envelope<String> {
    let message = DatabaseService::new(state.registry).open(&db).await?;
    ok(message)
}

// ============== Tables ==============

/// 列出数据库中的表
#[utoipa::path(
    get,
    path = "/api/databases/{db}/tables",
    tag = "tables",
    params(("db" = String, Path, description = "数据库名")),
    responses(
        (status = 200, description = "表列表", body = ApiResponse<Vec<TableEntry>>)
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Path(db): Path<String>,
) -> Envelope<Vec<TableEntry>> {
    let tables = TableService::new(state.registry).list(&db).await?;
    ok(tables)
}

/// 创建表
#[utoipa::path(
    post,
    path = "/api/databases/{db}/tables",
    tag = "tables",
    params(("db" = String, Path, description = "数据库名")),
    request_body = CreateTableRequest,
    responses(
        (status = 200, description = "表已创建", body = ApiResponse<String>)
    )
)]
pub async fn create_table(
    State(state): State<AppState>,
    Path(db): Path<String>,
    Json(req): Json<CreateTableRequest>,
) -> Envelope<String> {
    let message = TableService::new(state.registry).create(&db, req).await?;
    ok(message)
}

/// 删除表
#[utoipa::path(
    delete,
    path = "/api/databases/{db}/tables/{table}",
    tag = "tables",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名（schema.table 或 table）")
    ),
    responses(
        (status = 200, description = "表已删除", body = ApiResponse<String>)
    )
)]
pub async fn delete_table(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
) -> Envelope<String> {
    let message = TableService::new(state.registry).drop(&db, &table).await?;
    ok(message)
}

/// 获取表结构
#[utoipa::path(
    get,
    path = "/api/databases/{db}/tables/{table}/structure",
    tag = "tables",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "列结构", body = ApiResponse<Vec<ColumnDescriptor>>)
    )
)]
pub async fn table_structure(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
) -> Envelope<Vec<ColumnDescriptor>> {
    let columns = TableService::new(state.registry)
        .structure(&db, &table)
        .await?;
    ok(columns)
}

/// 获取表的外键关系
#[utoipa::path(
    get,
    path = "/api/databases/{db}/tables/{table}/relations",
    tag = "tables",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "外键列表", body = ApiResponse<Vec<RelationEntry>>)
    )
)]
pub async fn table_relations(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
) -> Envelope<Vec<RelationEntry>> {
    let relations = TableService::new(state.registry)
        .relations(&db, &table)
        .await?;
    ok(relations)
}

// ============== Rows ==============

/// 分页查询表数据（支持过滤）
#[utoipa::path(
    post,
    path = "/api/databases/{db}/tables/{table}/data",
    tag = "rows",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名")
    ),
    request_body = TableDataRequest,
    responses(
        (status = 200, description = "一页数据", body = ApiResponse<TablePage>)
    )
)]
pub async fn table_data(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<TableDataRequest>,
) -> Envelope<TablePage> {
    let page = RowService::new(state.registry).page(&db, &table, req).await?;
    ok(page)
}

/// 更新单元格
#[utoipa::path(
    patch,
    path = "/api/databases/{db}/tables/{table}/rows",
    tag = "rows",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名")
    ),
    request_body = UpdateCellRequest,
    responses(
        (status = 200, description = "受影响行数", body = ApiResponse<u64>)
    )
)]
pub async fn update_cell(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<UpdateCellRequest>,
) -> Envelope<u64> {
    let affected = RowService::new(state.registry)
        .update_cell(&db, &table, req)
        .await?;
    ok(affected)
}

/// 插入行
#[utoipa::path(
    post,
    path = "/api/databases/{db}/tables/{table}/rows",
    tag = "rows",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名")
    ),
    request_body = InsertRowRequest,
    responses(
        (status = 200, description = "受影响行数", body = ApiResponse<u64>)
    )
)]
pub async fn insert_row(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<InsertRowRequest>,
) -> Envelope<u64> {
    let affected = RowService::new(state.registry)
        .insert(&db, &table, req)
        .await?;
    ok(affected)
}

/// 删除行
#[utoipa::path(
    delete,
    path = "/api/databases/{db}/tables/{table}/rows",
    tag = "rows",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名")
    ),
    request_body = DeleteRowRequest,
    responses(
        (status = 200, description = "受影响行数", body = ApiResponse<u64>)
    )
)]
pub async fn delete_row(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<DeleteRowRequest>,
) -> Envelope<u64> {
    let affected = RowService::new(state.registry)
        .delete(&db, &table, req)
        .await?;
    ok(affected)
}

/// 清空表数据
#[utoipa::path(
    delete,
    path = "/api/databases/{db}/tables/{table}/data",
    tag = "rows",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "受影响行数", body = ApiResponse<u64>)
    )
)]
pub async fn delete_all_rows(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
) -> Envelope<u64> {
    let affected = RowService::new(state.registry)
        .delete_all(&db, &table)
        .await?;
    ok(affected)
}

// ============== Transfer ==============

/// 导出表数据
#[utoipa::path(
    post,
    path = "/api/databases/{db}/tables/{table}/export",
    tag = "transfer",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名")
    ),
    request_body = ExportRequest,
    responses(
        (status = 200, description = "导出产物", body = ApiResponse<ExportArtifact>)
    )
)]
pub async fn export_table(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<ExportRequest>,
) -> Envelope<ExportArtifact> {
    let artifact = TransferService::new(state.registry)
        .export(&db, &table, req.format)
        .await?;
    ok(artifact)
}

/// 导入表数据
#[utoipa::path(
    post,
    path = "/api/databases/{db}/tables/{table}/import",
    tag = "transfer",
    params(
        ("db" = String, Path, description = "数据库名"),
        ("table" = String, Path, description = "表名")
    ),
    request_body = ImportRequest,
    responses(
        (status = 200, description = "导入结果", body = ApiResponse<ImportResult>)
    )
)]
pub async fn import_table(
    State(state): State<AppState>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<ImportRequest>,
) -> Envelope<ImportResult> {
    let result = TransferService::new(state.registry)
        .import(&db, &table, req)
        .await?;
    ok(result)
}

/// 生成数据库转储脚本
#[utoipa::path(
    post,
    path = "/api/databases/{db}/dump",
    tag = "transfer",
    params(("db" = String, Path, description = "数据库名")),
    request_body = DumpRequest,
    responses(
        (status = 200, description = "转储脚本", body = ApiResponse<DumpResult>)
    )
)]
pub async fn create_dump(
    State(state): State<AppState>,
    Path(db): Path<String>,
    Json(req): Json<DumpRequest>,
) -> Envelope<DumpResult> {
    let result = TransferService::new(state.registry)
        .dump(&db, req.include_data)
        .await?;
    ok(result)
}

/// 执行转储脚本（逐条执行，统计成功与失败）
#[utoipa::path(
    post,
    path = "/api/databases/{db}/restore",
    tag = "transfer",
    params(("db" = String, Path, description = "数据库名")),
    request_body = RestoreRequest,
    responses(
        (status = 200, description = "恢复结果", body = ApiResponse<RestoreResult>)
    )
)]
pub async fn restore_dump(
    State(state): State<AppState>,
    Path(db): Path<String>,
    Json(req): Json<RestoreRequest>,
) -> Envelope<RestoreResult> {
    let result = TransferService::new(state.registry)
        .restore(&db, &req.script)
        .await?;
    ok(result)
}

// ============== Health ==============

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        connected: state.registry.is_connected().await,
        pools: state.registry.pool_count().await,
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 是否存在活动连接
    pub connected: bool,
    /// 当前连接池数量
    pub pools: usize,
}
