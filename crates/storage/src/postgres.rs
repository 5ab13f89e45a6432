use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    Booking, BookingChanges, BookingDetails, BookingId, BookingQuery, BookingSlot, MembershipTerm,
    Money, NewBooking, NewPayment, Payment, PaymentId, PaymentStatus, Result, StorageError,
    UserId, Vehicle, VehicleId,
    store::{BookingStore, MembershipStore, PaymentStore, VehicleCatalog},
};

const OVERLAP_CONSTRAINT: &str = "bookings_no_overlap";
const VEHICLE_FK_CONSTRAINT: &str = "bookings_vehicle_fk";

const BOOKING_DETAILS_SELECT: &str = r#"
    SELECT b.booking_id, b.vehicle_id, b.user_id, b.start_at, b.end_at, b.total_price_cents,
           v.model, v.location, v.charge_level, v.rental_price_per_hour_cents
    FROM bookings b
    JOIN vehicles v ON v.vehicle_id = b.vehicle_id
"#;

const PAYMENT_COLUMNS: &str = r#"
    payment_id, user_id, booking_id, amount_cents, payment_method, payment_status,
    discount_cents, final_amount_cents, membership_level, membership_start, membership_end,
    created_at
"#;

/// Connection settings for [`PostgresStore`].
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection.
    pub acquire_timeout: Duration,
    /// Upper bound on each statement, surfaced as [`StorageError::Timeout`].
    pub statement_timeout: Duration,
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(5),
        }
    }
}

/// PostgreSQL-backed rental store.
///
/// Booking overlap is enforced by the `bookings_no_overlap` exclusion
/// constraint, so concurrent writers across processes are serialized by the
/// database.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Opens a connection pool with the given settings.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool, config.statement_timeout))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))?
    }

    fn map_write_error(
        e: sqlx::Error,
        vehicle_id: VehicleId,
        booking_id: Option<BookingId>,
    ) -> StorageError {
        if let sqlx::Error::Database(ref db_err) = e {
            match db_err.constraint() {
                Some(OVERLAP_CONSTRAINT) => {
                    return StorageError::Overlap {
                        vehicle_id,
                        booking_id,
                    };
                }
                Some(VEHICLE_FK_CONSTRAINT) => return StorageError::UnknownVehicle(vehicle_id),
                _ => {}
            }
        }
        StorageError::Database(e)
    }

    fn row_to_booking(row: &PgRow) -> Result<Booking> {
        Ok(Booking {
            id: BookingId::new(row.try_get("booking_id")?),
            vehicle_id: VehicleId::new(row.try_get("vehicle_id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            start: row.try_get("start_at")?,
            end: row.try_get("end_at")?,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
        })
    }

    fn row_to_details(row: PgRow) -> Result<BookingDetails> {
        Ok(BookingDetails {
            booking: Self::row_to_booking(&row)?,
            model: row.try_get("model")?,
            location: row.try_get("location")?,
            charge_level: row.try_get("charge_level")?,
            hourly_rate: Money::from_cents(row.try_get("rental_price_per_hour_cents")?),
        })
    }

    fn row_to_vehicle(row: PgRow) -> Result<Vehicle> {
        Ok(Vehicle {
            id: VehicleId::new(row.try_get("vehicle_id")?),
            model: row.try_get("model")?,
            location: row.try_get("location")?,
            charge_level: row.try_get("charge_level")?,
            cleanliness_status: row.try_get("cleanliness_status")?,
            hourly_rate: Money::from_cents(row.try_get("rental_price_per_hour_cents")?),
        })
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let status: String = row.try_get("payment_status")?;
        let status = PaymentStatus::parse(&status).ok_or_else(|| {
            StorageError::Database(sqlx::Error::Decode(
                format!("unknown payment status {status:?}").into(),
            ))
        })?;

        let level: Option<String> = row.try_get("membership_level")?;
        let start: Option<NaiveDate> = row.try_get("membership_start")?;
        let end: Option<NaiveDate> = row.try_get("membership_end")?;
        let membership = match (level, start, end) {
            (Some(level), Some(start), Some(end)) => Some(MembershipTerm { level, start, end }),
            _ => None,
        };

        Ok(Payment {
            id: PaymentId::new(row.try_get("payment_id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            booking_id: row
                .try_get::<Option<i64>, _>("booking_id")?
                .map(BookingId::new),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            method: row.try_get("payment_method")?,
            status,
            discount: Money::from_cents(row.try_get("discount_cents")?),
            final_amount: Money::from_cents(row.try_get("final_amount_cents")?),
            membership,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl BookingStore for PostgresStore {
    #[tracing::instrument(skip(self, booking), fields(vehicle_id = %booking.vehicle_id))]
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking> {
        self.bounded(async {
            let row = sqlx::query(
                r#"
                INSERT INTO bookings (vehicle_id, user_id, start_at, end_at, total_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING booking_id, vehicle_id, user_id, start_at, end_at, total_price_cents
                "#,
            )
            .bind(booking.vehicle_id.value())
            .bind(booking.user_id.value())
            .bind(booking.start)
            .bind(booking.end)
            .bind(booking.total_price.cents())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(e, booking.vehicle_id, None))?;

            Self::row_to_booking(&row)
        })
        .await
    }

    async fn get_booking(&self, booking_id: BookingId) -> Result<Option<BookingDetails>> {
        self.bounded(async {
            let row = sqlx::query(&format!("{BOOKING_DETAILS_SELECT} WHERE b.booking_id = $1"))
                .bind(booking_id.value())
                .fetch_optional(&self.pool)
                .await?;

            row.map(Self::row_to_details).transpose()
        })
        .await
    }

    #[tracing::instrument(skip(self, changes))]
    async fn update_booking(
        &self,
        booking_id: BookingId,
        changes: BookingChanges,
    ) -> Result<Option<Booking>> {
        self.bounded(async {
            let vehicle_id: Option<i64> =
                sqlx::query_scalar("SELECT vehicle_id FROM bookings WHERE booking_id = $1")
                    .bind(booking_id.value())
                    .fetch_optional(&self.pool)
                    .await?;
            let Some(vehicle_id) = vehicle_id.map(VehicleId::new) else {
                return Ok(None);
            };

            // The exclusion constraint is checked against the row's new
            // version only, so the old interval never conflicts with itself.
            let row = sqlx::query(
                r#"
                UPDATE bookings
                SET start_at = $2, end_at = $3, total_price_cents = $4
                WHERE booking_id = $1
                RETURNING booking_id, vehicle_id, user_id, start_at, end_at, total_price_cents
                "#,
            )
            .bind(booking_id.value())
            .bind(changes.start)
            .bind(changes.end)
            .bind(changes.total_price.cents())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(e, vehicle_id, Some(booking_id)))?;

            row.as_ref().map(Self::row_to_booking).transpose()
        })
        .await
    }

    async fn delete_booking(&self, booking_id: BookingId) -> Result<bool> {
        self.bounded(async {
            let result = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
                .bind(booking_id.value())
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn count_overlapping(
        &self,
        vehicle_id: VehicleId,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude: Option<BookingId>,
    ) -> Result<u64> {
        self.bounded(async {
            let count: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM bookings
                WHERE vehicle_id = $1
                  AND start_at < $3
                  AND end_at > $2
                  AND ($4::BIGINT IS NULL OR booking_id <> $4)
                "#,
            )
            .bind(vehicle_id.value())
            .bind(start)
            .bind(end)
            .bind(exclude.map(BookingId::value))
            .fetch_one(&self.pool)
            .await?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn fetch_bookings(&self, query: &BookingQuery) -> Result<Vec<BookingDetails>> {
        self.bounded(async {
            let rows = sqlx::query(&format!(
                r#"{BOOKING_DETAILS_SELECT}
                WHERE ($1::BIGINT IS NULL OR b.user_id = $1)
                  AND ($2::BIGINT IS NULL OR b.vehicle_id = $2)
                  AND ($3::BIGINT IS NULL OR b.booking_id > $3)
                ORDER BY b.booking_id ASC
                LIMIT $4
                "#
            ))
            .bind(query.user_id.map(UserId::value))
            .bind(query.vehicle_id.map(VehicleId::value))
            .bind(query.after.map(BookingId::value))
            .bind(query.page_size as i64)
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter().map(Self::row_to_details).collect()
        })
        .await
    }

    async fn fetch_slots(&self, query: &BookingQuery) -> Result<Vec<BookingSlot>> {
        self.bounded(async {
            let rows = sqlx::query(
                r#"
                SELECT booking_id, start_at, end_at FROM bookings
                WHERE ($1::BIGINT IS NULL OR user_id = $1)
                  AND ($2::BIGINT IS NULL OR vehicle_id = $2)
                  AND ($3::BIGINT IS NULL OR booking_id > $3)
                ORDER BY booking_id ASC
                LIMIT $4
                "#,
            )
            .bind(query.user_id.map(UserId::value))
            .bind(query.vehicle_id.map(VehicleId::value))
            .bind(query.after.map(BookingId::value))
            .bind(query.page_size as i64)
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter()
                .map(|row| {
                    Ok(BookingSlot {
                        booking_id: BookingId::new(row.try_get("booking_id")?),
                        start: row.try_get("start_at")?,
                        end: row.try_get("end_at")?,
                    })
                })
                .collect()
        })
        .await
    }
}

#[async_trait]
impl PaymentStore for PostgresStore {
    #[tracing::instrument(skip(self, payment), fields(user_id = %payment.user_id))]
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment> {
        self.bounded(async {
            let (level, start, end) = match &payment.membership {
                Some(term) => (Some(term.level.as_str()), Some(term.start), Some(term.end)),
                None => (None, None, None),
            };

            let row = sqlx::query(&format!(
                r#"
                INSERT INTO payments (user_id, booking_id, amount_cents, payment_method,
                    payment_status, discount_cents, final_amount_cents, membership_level,
                    membership_start, membership_end)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING {PAYMENT_COLUMNS}
                "#
            ))
            .bind(payment.user_id.value())
            .bind(payment.booking_id.map(BookingId::value))
            .bind(payment.amount.cents())
            .bind(&payment.method)
            .bind(payment.status.as_str())
            .bind(payment.discount.cents())
            .bind(payment.final_amount.cents())
            .bind(level)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await?;

            Self::row_to_payment(row)
        })
        .await
    }

    async fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>> {
        self.bounded(async {
            let row = sqlx::query(&format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1"
            ))
            .bind(payment_id.value())
            .fetch_optional(&self.pool)
            .await?;

            row.map(Self::row_to_payment).transpose()
        })
        .await
    }

    async fn booking_payments(&self) -> Result<Vec<Payment>> {
        self.bounded(async {
            let rows = sqlx::query(&format!(
                r#"
                SELECT {PAYMENT_COLUMNS} FROM payments
                WHERE booking_id IS NOT NULL
                ORDER BY payment_id ASC
                "#
            ))
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter().map(Self::row_to_payment).collect()
        })
        .await
    }
}

#[async_trait]
impl MembershipStore for PostgresStore {
    async fn membership_level(&self, user_id: UserId) -> Result<Option<String>> {
        self.bounded(async {
            let level = sqlx::query_scalar(
                "SELECT membership_level FROM user_memberships WHERE user_id = $1",
            )
            .bind(user_id.value())
            .fetch_optional(&self.pool)
            .await?;
            Ok(level)
        })
        .await
    }

    async fn discount_percentage(&self, level: &str) -> Result<Option<f64>> {
        self.bounded(async {
            let percentage = sqlx::query_scalar(
                "SELECT discount_percentage FROM discounts WHERE membership_level = $1",
            )
            .bind(level)
            .fetch_optional(&self.pool)
            .await?;
            Ok(percentage)
        })
        .await
    }

    async fn set_membership_level(&self, user_id: UserId, level: &str) -> Result<()> {
        self.bounded(async {
            sqlx::query(
                r#"
                INSERT INTO user_memberships (user_id, membership_level)
                VALUES ($1, $2)
                ON CONFLICT (user_id) DO UPDATE SET membership_level = EXCLUDED.membership_level
                "#,
            )
            .bind(user_id.value())
            .bind(level)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl VehicleCatalog for PostgresStore {
    async fn get_vehicle(&self, vehicle_id: VehicleId) -> Result<Option<Vehicle>> {
        self.bounded(async {
            let row = sqlx::query(
                r#"
                SELECT vehicle_id, model, location, charge_level, cleanliness_status,
                       rental_price_per_hour_cents
                FROM vehicles WHERE vehicle_id = $1
                "#,
            )
            .bind(vehicle_id.value())
            .fetch_optional(&self.pool)
            .await?;

            row.map(Self::row_to_vehicle).transpose()
        })
        .await
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        self.bounded(async {
            let rows = sqlx::query(
                r#"
                SELECT vehicle_id, model, location, charge_level, cleanliness_status,
                       rental_price_per_hour_cents
                FROM vehicles ORDER BY vehicle_id ASC
                "#,
            )
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter().map(Self::row_to_vehicle).collect()
        })
        .await
    }
}
