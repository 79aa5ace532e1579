//! TDS plumbing: connection manager, parameter binding and row decoding.
//!
//! All wire-protocol work is delegated to tiberius; this module adapts its
//! connection type to the bb8 pool and converts between JSON values and TDS
//! column data.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value as JsonValue;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, Row, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use common::errors::{AppError, AppResult};
use common::models::TableColumn;

/// A connected tiberius client over a compat TCP stream.
pub type TdsClient = Client<Compat<TcpStream>>;

/// A bb8 pool of tiberius clients.
pub type TdsPool = bb8::Pool<TdsConnectionManager>;

/// Builds a tiberius config for the given target.
///
/// The server address is `host`, `host:port` or `host,port` (SQL Server
/// tooling convention); the port defaults to 1433. Encryption is required and
/// the server certificate is trusted, matching the desktop tool's connection
/// options.
pub fn build_config(server: &str, username: &str, password: &str, database: &str) -> Config {
    let (host, port) = split_server(server);

    let mut config = Config::new();
    config.host(&host);
    config.port(port.unwrap_or(1433));
    config.database(database);
    config.authentication(AuthMethod::sql_server(username, password));
    config.encryption(EncryptionLevel::Required);
    config.trust_cert();
    config
}

fn split_server(server: &str) -> (String, Option<u16>) {
    for sep in [',', ':'] {
        if let Some((host, port)) = server.rsplit_once(sep) {
            if let Ok(port) = port.trim().parse::<u16>() {
                return (host.trim().to_string(), Some(port));
            }
        }
    }
    (server.trim().to_string(), None)
}

/// bb8 connection manager for tiberius clients.
#[derive(Debug, Clone)]
pub struct TdsConnectionManager {
    config: Config,
}

impl TdsConnectionManager {
    /// Creates a manager that opens connections with the given config.
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl bb8::ManageConnection for TdsConnectionManager {
    type Connection = TdsClient;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let tcp = TcpStream::connect(self.config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        Client::connect(self.config.clone(), tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// An owned statement parameter bindable through tiberius.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            SqlParam::Null => ColumnData::I32(None),
            SqlParam::Bool(v) => ColumnData::Bit(Some(*v)),
            SqlParam::I64(v) => ColumnData::I64(Some(*v)),
            SqlParam::F64(v) => ColumnData::F64(Some(*v)),
            SqlParam::String(v) => ColumnData::String(Some(std::borrow::Cow::Borrowed(v))),
        }
    }
}

/// Converts a JSON value into a bindable parameter.
pub fn json_to_param(value: &JsonValue) -> SqlParam {
    match value {
        JsonValue::Null => SqlParam::Null,
        JsonValue::Bool(b) => SqlParam::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => SqlParam::I64(i),
            None => SqlParam::F64(n.as_f64().unwrap_or(0.0)),
        },
        JsonValue::String(s) => SqlParam::String(s.clone()),
        other => SqlParam::String(other.to_string()),
    }
}

fn run_error(err: bb8::RunError<tiberius::error::Error>) -> AppError {
    match err {
        bb8::RunError::User(e) => AppError::DatabaseConnection(e.to_string()),
        bb8::RunError::TimedOut => {
            AppError::PoolTimeout("no pooled connection became available".to_string())
        }
    }
}

/// Runs a query and collects the first result set.
pub async fn query_rows(pool: &TdsPool, sql: &str, params: &[SqlParam]) -> AppResult<Vec<Row>> {
    let mut conn = pool.get().await.map_err(run_error)?;
    let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
    let stream = conn
        .query(sql, &refs)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
    stream
        .into_first_result()
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))
}

/// Executes a statement and returns the affected-row count.
pub async fn execute(pool: &TdsPool, sql: &str, params: &[SqlParam]) -> AppResult<u64> {
    let mut conn = pool.get().await.map_err(run_error)?;
    let refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
    let result = conn
        .execute(sql, &refs)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
    Ok(result.rows_affected().iter().sum())
}

/// Decodes result rows into column metadata plus JSON row vectors.
pub fn rows_to_table(rows: Vec<Row>) -> (Vec<TableColumn>, Vec<Vec<JsonValue>>) {
    let columns: Vec<TableColumn> = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|col| TableColumn {
                    name: col.name().to_string(),
                    data_type: format!("{:?}", col.column_type()),
                })
                .collect()
        })
        .unwrap_or_default();

    let data = rows
        .into_iter()
        .map(|row| row.into_iter().map(column_data_to_json).collect())
        .collect();

    (columns, data)
}

/// Converts TDS column data to a JSON value.
///
/// Dates and times are rendered as ISO 8601 strings; binary columns as
/// base64; numerics as strings to preserve precision.
pub fn column_data_to_json(col_data: ColumnData<'static>) -> JsonValue {
    match col_data {
        ColumnData::Bit(v) => v.map(JsonValue::Bool).unwrap_or(JsonValue::Null),
        ColumnData::U8(v) => v.map(|n| JsonValue::from(n as i64)).unwrap_or(JsonValue::Null),
        ColumnData::I16(v) => v.map(|n| JsonValue::from(n as i64)).unwrap_or(JsonValue::Null),
        ColumnData::I32(v) => v.map(|n| JsonValue::from(n as i64)).unwrap_or(JsonValue::Null),
        ColumnData::I64(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        ColumnData::F32(v) => v
            .and_then(|n| serde_json::Number::from_f64(n as f64))
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ColumnData::F64(v) => v
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ColumnData::String(v) => v
            .map(|s| JsonValue::String(s.into_owned()))
            .unwrap_or(JsonValue::Null),
        ColumnData::Guid(v) => v
            .map(|g| JsonValue::String(g.to_string()))
            .unwrap_or(JsonValue::Null),
        ColumnData::Binary(v) => v
            .map(|b| JsonValue::String(BASE64.encode(b.as_ref())))
            .unwrap_or(JsonValue::Null),
        ColumnData::Numeric(v) => v
            .map(|n| JsonValue::String(n.to_string()))
            .unwrap_or(JsonValue::Null),
        ColumnData::Xml(v) => v
            .map(|x| JsonValue::String(x.into_owned().into_string()))
            .unwrap_or(JsonValue::Null),
        ColumnData::DateTime(v) => v
            .map(|dt| {
                let naive = chrono::NaiveDateTime::new(
                    chrono::NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()
                        + chrono::Duration::days(dt.days() as i64),
                    chrono::NaiveTime::from_num_seconds_from_midnight_opt(
                        (dt.seconds_fragments() as f64 / 300.0) as u32,
                        0,
                    )
                    .unwrap_or_default(),
                );
                JsonValue::String(format_datetime(naive))
            })
            .unwrap_or(JsonValue::Null),
        ColumnData::SmallDateTime(v) => v
            .map(|dt| {
                let naive = chrono::NaiveDateTime::new(
                    chrono::NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()
                        + chrono::Duration::days(dt.days() as i64),
                    chrono::NaiveTime::from_num_seconds_from_midnight_opt(
                        (dt.seconds_fragments() as u32) * 60,
                        0,
                    )
                    .unwrap_or_default(),
                );
                JsonValue::String(format_datetime(naive))
            })
            .unwrap_or(JsonValue::Null),
        ColumnData::DateTime2(v) => v
            .map(|dt| JsonValue::String(format_datetime(datetime2_to_naive(dt))))
            .unwrap_or(JsonValue::Null),
        ColumnData::DateTimeOffset(v) => v
            .map(|dto| {
                let naive = datetime2_to_naive(dto.datetime2());
                let utc = chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(
                    naive,
                    chrono::Utc,
                );
                JsonValue::String(utc.to_rfc3339())
            })
            .unwrap_or(JsonValue::Null),
        ColumnData::Date(v) => v
            .map(|d| {
                let date = chrono::NaiveDate::from_ymd_opt(1, 1, 1).unwrap()
                    + chrono::Duration::days(d.days() as i64);
                JsonValue::String(date.to_string())
            })
            .unwrap_or(JsonValue::Null),
        ColumnData::Time(v) => v
            .map(|t| {
                let time = chrono::NaiveTime::from_num_seconds_from_midnight_opt(
                    (t.increments() / 10_000_000) as u32,
                    ((t.increments() % 10_000_000) * 100) as u32,
                )
                .unwrap_or_default();
                JsonValue::String(time.to_string())
            })
            .unwrap_or(JsonValue::Null),
    }
}

/// Typed accessor for a string column; NULL reads as an empty string.
pub fn get_string(row: &Row, col: &str) -> AppResult<String> {
    Ok(row
        .try_get::<&str, _>(col)
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
        .unwrap_or_default()
        .to_string())
}

/// Typed accessor for a nullable string column.
pub fn get_opt_string(row: &Row, col: &str) -> AppResult<Option<String>> {
    Ok(row
        .try_get::<&str, _>(col)
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
        .map(str::to_string))
}

/// Typed accessor for a nullable int column.
pub fn get_i32(row: &Row, col: &str) -> AppResult<Option<i32>> {
    row.try_get::<i32, _>(col)
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))
}

/// Typed accessor for a nullable bigint column.
pub fn get_i64(row: &Row, col: &str) -> AppResult<Option<i64>> {
    row.try_get::<i64, _>(col)
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))
}

/// Typed accessor for a nullable tinyint column.
pub fn get_u8(row: &Row, col: &str) -> AppResult<Option<u8>> {
    row.try_get::<u8, _>(col)
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))
}

/// Typed accessor for a datetime column rendered as ISO 8601 text.
pub fn get_datetime_text(row: &Row, col: &str) -> AppResult<String> {
    Ok(row
        .try_get::<chrono::NaiveDateTime, _>(col)
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
        .map(format_datetime)
        .unwrap_or_default())
}

fn datetime2_to_naive(dt: tiberius::time::DateTime2) -> chrono::NaiveDateTime {
    let date = dt.date();
    let time = dt.time();
    chrono::NaiveDateTime::new(
        chrono::NaiveDate::from_ymd_opt(1, 1, 1).unwrap()
            + chrono::Duration::days(date.days() as i64),
        chrono::NaiveTime::from_num_seconds_from_midnight_opt(
            (time.increments() / 10_000_000) as u32,
            ((time.increments() % 10_000_000) * 100) as u32,
        )
        .unwrap_or_default(),
    )
}

fn format_datetime(naive: chrono::NaiveDateTime) -> String {
    naive.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_address_forms() {
        assert_eq!(split_server("localhost"), ("localhost".into(), None));
        assert_eq!(
            split_server("db.internal:1434"),
            ("db.internal".into(), Some(1434))
        );
        assert_eq!(
            split_server("db.internal,1434"),
            ("db.internal".into(), Some(1434))
        );
    }

    #[test]
    fn config_uses_default_port() {
        let config = build_config("localhost", "sa", "pw", "master");
        assert_eq!(config.get_addr(), "localhost:1433");
    }

    #[test]
    fn json_values_bind_by_type() {
        assert_eq!(json_to_param(&json!(null)), SqlParam::Null);
        assert_eq!(json_to_param(&json!(true)), SqlParam::Bool(true));
        assert_eq!(json_to_param(&json!(42)), SqlParam::I64(42));
        assert_eq!(json_to_param(&json!(1.5)), SqlParam::F64(1.5));
        assert_eq!(
            json_to_param(&json!("abc")),
            SqlParam::String("abc".into())
        );
    }

    #[test]
    fn scalar_column_data_decodes() {
        assert_eq!(column_data_to_json(ColumnData::I32(Some(7))), json!(7));
        assert_eq!(column_data_to_json(ColumnData::I32(None)), json!(null));
        assert_eq!(column_data_to_json(ColumnData::Bit(Some(true))), json!(true));
        assert_eq!(
            column_data_to_json(ColumnData::String(Some("x".into()))),
            json!("x")
        );
    }

    #[test]
    fn binary_decodes_to_base64() {
        let value = column_data_to_json(ColumnData::Binary(Some(vec![1u8, 2, 3].into())));
        assert_eq!(value, json!("AQID"));
    }
}
