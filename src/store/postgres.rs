use super::{ExistingRow, ObservationStore};
use crate::error::Result;
use crate::models::{FieldValue, Observation, Station};
use crate::settings::DatabaseSettings;
use crate::utils::constants::{
    COLUMN_GEOMETRY, COLUMN_STATION_ID, COLUMN_STATION_NAME, COLUMN_TIMESTAMP,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use std::time::Duration;
use tracing::debug;

/// PostGIS-backed store. Values are always bound; identifiers are quoted.
pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

impl PostgresStore {
    pub async fn connect(settings: &DatabaseSettings, max_connections: u32) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.name)
            .username(&settings.user)
            .password(&settings.password);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        debug!(host = %settings.host, database = %settings.name, "connected to store");
        Ok(Self::with_pool(pool, &settings.table_name))
    }

    pub fn with_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: quote_ident(table),
        }
    }

    fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = $1 AND {} < $2",
            self.table,
            quote_ident(COLUMN_STATION_NAME),
            quote_ident(COLUMN_TIMESTAMP)
        )
    }

    fn select_sql(&self, fields: &[&str]) -> String {
        let mut columns = vec!["TRUE".to_string()];
        columns.extend(fields.iter().map(|f| format!("({} IS NULL)", quote_ident(f))));

        format!(
            "SELECT {} FROM {} WHERE {} = $1 AND {} = $2 LIMIT 1",
            columns.join(", "),
            self.table,
            quote_ident(COLUMN_STATION_NAME),
            quote_ident(COLUMN_TIMESTAMP)
        )
    }

    fn insert_sql(&self, observation: &Observation) -> String {
        let mut columns = vec![
            quote_ident(COLUMN_STATION_NAME),
            quote_ident(COLUMN_STATION_ID),
            quote_ident(COLUMN_GEOMETRY),
            quote_ident(COLUMN_TIMESTAMP),
        ];
        let mut placeholders = vec![
            "$1".to_string(),
            "$2".to_string(),
            "ST_GeomFromText($3, $4)".to_string(),
            "$5".to_string(),
        ];

        for (i, name) in observation.field_names().enumerate() {
            columns.push(quote_ident(name));
            placeholders.push(format!("${}", i + 6));
        }

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn update_sql(&self, field: &str) -> String {
        let column = quote_ident(field);
        format!(
            "UPDATE {} SET {} = $1 WHERE {} = $2 AND {} = $3 AND {} IS NULL",
            self.table,
            column,
            quote_ident(COLUMN_STATION_NAME),
            quote_ident(COLUMN_TIMESTAMP),
            column
        )
    }
}

#[async_trait]
impl ObservationStore for PostgresStore {
    async fn delete_before(&self, station_name: &str, cutoff: NaiveDateTime) -> Result<u64> {
        let sql = self.delete_sql();
        let result = sqlx::query(&sql)
            .bind(station_name)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_row(
        &self,
        station_name: &str,
        timestamp: NaiveDateTime,
        fields: &[&str],
    ) -> Result<Option<ExistingRow>> {
        let sql = self.select_sql(fields);
        let row = sqlx::query(&sql)
            .bind(station_name)
            .bind(timestamp)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut null_fields = Vec::new();
        for (i, field) in fields.iter().enumerate() {
            if row.try_get::<bool, _>(i + 1)? {
                null_fields.push(*field);
            }
        }
        Ok(Some(ExistingRow::new(null_fields)))
    }

    async fn insert(&self, station: &Station, observation: &Observation) -> Result<()> {
        let sql = self.insert_sql(observation);
        let mut query = sqlx::query(&sql)
            .bind(&station.name)
            .bind(&station.id)
            .bind(station.wkt_point())
            .bind(station.srid())
            .bind(observation.timestamp);

        for (_, value) in &observation.fields {
            query = bind_value(query, *value);
        }

        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn fill_field(
        &self,
        station_name: &str,
        timestamp: NaiveDateTime,
        field: &str,
        value: FieldValue,
    ) -> Result<bool> {
        let sql = self.update_sql(field);
        let result = bind_value(sqlx::query(&sql), value)
            .bind(station_name)
            .bind(timestamp)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn bind_value(query: Query<'_, Postgres, PgArguments>, value: FieldValue) -> Query<'_, Postgres, PgArguments> {
    match value {
        FieldValue::Integer(v) => query.bind(v),
        FieldValue::Float(v) => query.bind(v),
        FieldValue::Null => query.bind(None::<f64>),
    }
}

/// Double-quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn store() -> PostgresStore {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://gis@localhost/gis")
            .unwrap();
        PostgresStore::with_pool(pool, "dwd_poi")
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("temperature"), "\"temperature\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[tokio::test]
    async fn test_insert_sql_binds_every_value() {
        let ts = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let obs = Observation::new(ts)
            .with_field("temperature", FieldValue::Float(21.3))
            .with_field("humidity", FieldValue::Null);

        assert_eq!(
            store().insert_sql(&obs),
            "INSERT INTO \"dwd_poi\" (\"stationsname\", \"stationsid\", \"shape\", \"zeitpunkt\", \
             \"temperature\", \"humidity\") VALUES ($1, $2, ST_GeomFromText($3, $4), $5, $6, $7)"
        );
    }

    #[tokio::test]
    async fn test_select_and_update_sql() {
        let store = store();
        assert_eq!(
            store.select_sql(&["temperature"]),
            "SELECT TRUE, (\"temperature\" IS NULL) FROM \"dwd_poi\" \
             WHERE \"stationsname\" = $1 AND \"zeitpunkt\" = $2 LIMIT 1"
        );
        assert_eq!(
            store.update_sql("temperature"),
            "UPDATE \"dwd_poi\" SET \"temperature\" = $1 WHERE \"stationsname\" = $2 \
             AND \"zeitpunkt\" = $3 AND \"temperature\" IS NULL"
        );
        assert_eq!(
            store.delete_sql(),
            "DELETE FROM \"dwd_poi\" WHERE \"stationsname\" = $1 AND \"zeitpunkt\" < $2"
        );
    }
}
