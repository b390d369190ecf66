use crate::{
    data::{
        device::{DeviceFingerprint, DeviceRecord},
        leave_request::{LeaveRequest, LeaveType, RequestStatus},
    },
    error::{
        CommitTransactionSnafu, GateError, GateResult, GetDatabaseConnectionSnafu,
        InvalidStoredTimeSnafu, MakeQuerySnafu,
    },
    store::LeaveStore,
};
use async_trait::async_trait;
use jiff::Timestamp;
use snafu::ResultExt;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PostgresLeaveStore {
    pool: PgPool,
}

impl PostgresLeaveStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn from_millis(millis: i64) -> GateResult<Timestamp> {
    Timestamp::from_millisecond(millis).context(InvalidStoredTimeSnafu { millis })
}

fn from_optional_millis(millis: Option<i64>) -> GateResult<Option<Timestamp>> {
    millis.map(from_millis).transpose()
}

#[derive(sqlx::FromRow)]
struct LeaveRequestRow {
    id: Uuid,
    student_id: String,
    student_name: String,
    student_class: String,
    student_adm_no: String,
    leave_type: LeaveType,
    reason: String,
    requested_at: i64,
    expected_return_at: i64,
    status: RequestStatus,
    approved_by: Option<String>,
    approved_at: Option<i64>,
    exited_at: Option<i64>,
    exited_confirmed_by: Option<String>,
    returned_at: Option<i64>,
    returned_confirmed_by: Option<String>,
    device_fingerprint: Option<String>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = GateError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            student_id: row.student_id,
            student_name: row.student_name,
            student_class: row.student_class,
            student_adm_no: row.student_adm_no,
            leave_type: row.leave_type,
            reason: row.reason,
            requested_at: from_millis(row.requested_at)?,
            expected_return_at: from_millis(row.expected_return_at)?,
            status: row.status,
            approved_by: row.approved_by,
            approved_at: from_optional_millis(row.approved_at)?,
            exited_at: from_optional_millis(row.exited_at)?,
            exited_confirmed_by: row.exited_confirmed_by,
            returned_at: from_optional_millis(row.returned_at)?,
            returned_confirmed_by: row.returned_confirmed_by,
            device_fingerprint: row.device_fingerprint.map(DeviceFingerprint::from),
        })
    }
}

#[derive(sqlx::FromRow)]
struct DeviceRow {
    adm_no: String,
    device_id: String,
    registered_at: i64,
    last_used_at: i64,
}

impl TryFrom<DeviceRow> for DeviceRecord {
    type Error = GateError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            adm_no: row.adm_no,
            device_id: row.device_id.into(),
            registered_at: from_millis(row.registered_at)?,
            last_used_at: from_millis(row.last_used_at)?,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> GateResult<Vec<T>>
where
    T: TryFrom<R, Error = GateError>,
{
    rows.into_iter().map(T::try_from).collect()
}

async fn upsert_device(record: &DeviceRecord, conn: &mut PgConnection) -> GateResult<()> {
    sqlx::query("INSERT INTO device_registry (adm_no, device_id, registered_at, last_used_at) VALUES ($1, $2, $3, $4) ON CONFLICT (adm_no) DO UPDATE SET last_used_at = excluded.last_used_at")
        .bind(&record.adm_no)
        .bind(record.device_id.as_str())
        .bind(record.registered_at.as_millisecond())
        .bind(record.last_used_at.as_millisecond())
        .execute(conn)
        .await
        .context(MakeQuerySnafu)?;
    Ok(())
}

#[async_trait]
impl LeaveStore for PostgresLeaveStore {
    async fn all_requests(&self) -> GateResult<Vec<LeaveRequest>> {
        let rows = sqlx::query_as::<_, LeaveRequestRow>(
            "SELECT * FROM leave_requests ORDER BY requested_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context(MakeQuerySnafu)?;
        convert_all(rows)
    }

    async fn get_request(&self, id: Uuid) -> GateResult<Option<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequestRow>("SELECT * FROM leave_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context(MakeQuerySnafu)?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn requests_for_device(
        &self,
        device: &DeviceFingerprint,
    ) -> GateResult<Vec<LeaveRequest>> {
        let rows = sqlx::query_as::<_, LeaveRequestRow>(
            "SELECT * FROM leave_requests WHERE device_fingerprint = $1 ORDER BY requested_at DESC",
        )
        .bind(device.as_str())
        .fetch_all(&self.pool)
        .await
        .context(MakeQuerySnafu)?;
        convert_all(rows)
    }

    async fn record_request(
        &self,
        request: &LeaveRequest,
        binding: Option<&DeviceRecord>,
    ) -> GateResult<()> {
        let mut tx = self.pool.begin().await.context(GetDatabaseConnectionSnafu)?;

        if let Some(binding) = binding {
            upsert_device(binding, &mut tx).await?;
        }

        sqlx::query("INSERT INTO leave_requests (id, student_id, student_name, student_class, student_adm_no, leave_type, reason, requested_at, expected_return_at, status, device_fingerprint) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)")
            .bind(request.id)
            .bind(&request.student_id)
            .bind(&request.student_name)
            .bind(&request.student_class)
            .bind(&request.student_adm_no)
            .bind(request.leave_type)
            .bind(&request.reason)
            .bind(request.requested_at.as_millisecond())
            .bind(request.expected_return_at.as_millisecond())
            .bind(request.status)
            .bind(request.device_fingerprint.as_ref().map(DeviceFingerprint::as_str))
            .execute(&mut *tx)
            .await
            .context(MakeQuerySnafu)?;

        tx.commit().await.context(CommitTransactionSnafu)
    }

    async fn update_request(&self, request: &LeaveRequest) -> GateResult<()> {
        sqlx::query("UPDATE leave_requests SET status = $2, approved_by = $3, approved_at = $4, exited_at = $5, exited_confirmed_by = $6, returned_at = $7, returned_confirmed_by = $8 WHERE id = $1")
            .bind(request.id)
            .bind(request.status)
            .bind(request.approved_by.as_deref())
            .bind(request.approved_at.map(|ts| ts.as_millisecond()))
            .bind(request.exited_at.map(|ts| ts.as_millisecond()))
            .bind(request.exited_confirmed_by.as_deref())
            .bind(request.returned_at.map(|ts| ts.as_millisecond()))
            .bind(request.returned_confirmed_by.as_deref())
            .execute(&self.pool)
            .await
            .context(MakeQuerySnafu)?;
        Ok(())
    }

    async fn all_devices(&self) -> GateResult<Vec<DeviceRecord>> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            "SELECT * FROM device_registry ORDER BY registered_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context(MakeQuerySnafu)?;
        convert_all(rows)
    }

    async fn device_by_adm_no(&self, adm_no: &str) -> GateResult<Option<DeviceRecord>> {
        sqlx::query_as::<_, DeviceRow>("SELECT * FROM device_registry WHERE adm_no = $1")
            .bind(adm_no)
            .fetch_optional(&self.pool)
            .await
            .context(MakeQuerySnafu)?
            .map(DeviceRecord::try_from)
            .transpose()
    }

    async fn device_by_fingerprint(
        &self,
        device: &DeviceFingerprint,
    ) -> GateResult<Option<DeviceRecord>> {
        sqlx::query_as::<_, DeviceRow>("SELECT * FROM device_registry WHERE device_id = $1")
            .bind(device.as_str())
            .fetch_optional(&self.pool)
            .await
            .context(MakeQuerySnafu)?
            .map(DeviceRecord::try_from)
            .transpose()
    }

    async fn remove_device(&self, adm_no: &str) -> GateResult<bool> {
        let result = sqlx::query("DELETE FROM device_registry WHERE adm_no = $1")
            .bind(adm_no)
            .execute(&self.pool)
            .await
            .context(MakeQuerySnafu)?;
        Ok(result.rows_affected() > 0)
    }
}
