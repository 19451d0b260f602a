//! sqlite 持久化实现
//! 可替代默认内存实现，进程重启后未发送的数据继续保留
//! 同一复合 key 内按 rowid 保持先进先出

use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::common::error::{ErrorCode, ModuleError};
use crate::entity::reading::{
    ActuatorState, ActuatorStatus, Alarm, ConfigurationItem, ConfigurationSnapshot, SensorReading,
};
use crate::persistence::Persistence;
use crate::{error, warn};

const LOG_TAG: &str = "sqlite_persistence";

pub struct SqlitePersistence {
    conn: Mutex<Connection>,
}

impl SqlitePersistence {
    pub fn open(path: &str) -> Result<Self, ModuleError> {
        let conn = Connection::open(path).map_err(|e| {
            ModuleError::new(
                ErrorCode::PersistenceError,
                format!("cannot open sqlite store {}: {}", path, e),
            )
        })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, ModuleError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            ModuleError::new(
                ErrorCode::PersistenceError,
                format!("cannot open in-memory sqlite store: {}", e),
            )
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, ModuleError> {
        Self::ensure_tables(&conn).map_err(|e| {
            ModuleError::new(
                ErrorCode::PersistenceError,
                format!("cannot create sqlite tables: {}", e),
            )
        })?;
        Ok(SqlitePersistence {
            conn: Mutex::new(conn),
        })
    }

    fn ensure_tables(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sensor_readings (
                 id        INTEGER PRIMARY KEY AUTOINCREMENT,
                 queue_key TEXT NOT NULL,
                 reference TEXT NOT NULL,
                 vals      TEXT NOT NULL,
                 rtc       INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS alarms (
                 id        INTEGER PRIMARY KEY AUTOINCREMENT,
                 queue_key TEXT NOT NULL,
                 reference TEXT NOT NULL,
                 active    INTEGER NOT NULL,
                 rtc       INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS actuator_statuses (
                 id        INTEGER PRIMARY KEY AUTOINCREMENT,
                 queue_key TEXT NOT NULL UNIQUE,
                 reference TEXT NOT NULL,
                 value     TEXT NOT NULL,
                 state     TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS configurations (
                 id        INTEGER PRIMARY KEY AUTOINCREMENT,
                 queue_key TEXT NOT NULL UNIQUE,
                 payload   TEXT NOT NULL
             );",
        )
    }

    fn queue_keys(&self, table: &str) -> Vec<String> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT queue_key FROM {} GROUP BY queue_key ORDER BY MIN(id)",
            table
        );
        let mut statement = match conn.prepare(&sql) {
            Ok(statement) => statement,
            Err(e) => {
                error!(LOG_TAG, "cannot prepare key query on {}: {}", table, e);
                return Vec::new();
            }
        };
        let rows = statement.query_map([], |row| row.get::<usize, String>(0));
        match rows {
            Ok(rows) => rows.filter_map(|row| row.ok()).collect(),
            Err(e) => {
                error!(LOG_TAG, "cannot list keys on {}: {}", table, e);
                Vec::new()
            }
        }
    }

    fn table_count(conn: &Connection, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        conn.query_row(&sql, [], |row| row.get(0)).unwrap_or(0)
    }
}

impl Persistence for SqlitePersistence {
    fn put_sensor_reading(&self, key: &str, reading: SensorReading) {
        let values = match serde_json::to_string(&reading.values) {
            Ok(values) => values,
            Err(e) => {
                error!(LOG_TAG, "cannot serialize reading values: {}", e);
                return;
            }
        };
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "INSERT INTO sensor_readings (queue_key, reference, vals, rtc) VALUES (?1, ?2, ?3, ?4)",
            params![key, reading.reference, values, reading.rtc as i64],
        ) {
            error!(LOG_TAG, "cannot store sensor reading for {}: {}", key, e);
        }
    }

    fn sensor_readings(&self, key: &str, count: usize) -> Vec<SensorReading> {
        let conn = self.conn.lock().unwrap();
        let mut statement = match conn.prepare(
            "SELECT reference, vals, rtc FROM sensor_readings
             WHERE queue_key = ?1 ORDER BY id ASC LIMIT ?2",
        ) {
            Ok(statement) => statement,
            Err(e) => {
                error!(LOG_TAG, "cannot prepare reading query: {}", e);
                return Vec::new();
            }
        };
        let rows = statement.query_map(params![key, count as i64], |row| {
            let reference: String = row.get(0)?;
            let values: String = row.get(1)?;
            let rtc: i64 = row.get(2)?;
            Ok((reference, values, rtc))
        });
        match rows {
            Ok(rows) => rows
                .filter_map(|row| row.ok())
                .filter_map(|(reference, values, rtc)| {
                    let values: Vec<String> = serde_json::from_str(&values).ok()?;
                    Some(SensorReading {
                        reference,
                        values,
                        rtc: rtc as u64,
                    })
                })
                .collect(),
            Err(e) => {
                error!(LOG_TAG, "cannot read sensor readings for {}: {}", key, e);
                Vec::new()
            }
        }
    }

    fn remove_sensor_readings(&self, key: &str, count: usize) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "DELETE FROM sensor_readings WHERE id IN (
                 SELECT id FROM sensor_readings WHERE queue_key = ?1 ORDER BY id ASC LIMIT ?2
             )",
            params![key, count as i64],
        ) {
            error!(LOG_TAG, "cannot remove sensor readings for {}: {}", key, e);
        }
    }

    fn sensor_readings_keys(&self) -> Vec<String> {
        self.queue_keys("sensor_readings")
    }

    fn put_alarm(&self, key: &str, alarm: Alarm) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "INSERT INTO alarms (queue_key, reference, active, rtc) VALUES (?1, ?2, ?3, ?4)",
            params![key, alarm.reference, alarm.active as i64, alarm.rtc as i64],
        ) {
            error!(LOG_TAG, "cannot store alarm for {}: {}", key, e);
        }
    }

    fn alarms(&self, key: &str, count: usize) -> Vec<Alarm> {
        let conn = self.conn.lock().unwrap();
        let mut statement = match conn.prepare(
            "SELECT reference, active, rtc FROM alarms
             WHERE queue_key = ?1 ORDER BY id ASC LIMIT ?2",
        ) {
            Ok(statement) => statement,
            Err(e) => {
                error!(LOG_TAG, "cannot prepare alarm query: {}", e);
                return Vec::new();
            }
        };
        let rows = statement.query_map(params![key, count as i64], |row| {
            Ok(Alarm {
                reference: row.get(0)?,
                active: row.get::<usize, i64>(1)? != 0,
                rtc: row.get::<usize, i64>(2)? as u64,
            })
        });
        match rows {
            Ok(rows) => rows.filter_map(|row| row.ok()).collect(),
            Err(e) => {
                error!(LOG_TAG, "cannot read alarms for {}: {}", key, e);
                Vec::new()
            }
        }
    }

    fn remove_alarms(&self, key: &str, count: usize) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "DELETE FROM alarms WHERE id IN (
                 SELECT id FROM alarms WHERE queue_key = ?1 ORDER BY id ASC LIMIT ?2
             )",
            params![key, count as i64],
        ) {
            error!(LOG_TAG, "cannot remove alarms for {}: {}", key, e);
        }
    }

    fn alarms_keys(&self) -> Vec<String> {
        self.queue_keys("alarms")
    }

    fn put_actuator_status(&self, key: &str, status: ActuatorStatus) {
        let conn = self.conn.lock().unwrap();
        // 覆盖写入时保留原 rowid，key 的顺序仍按首次写入
        if let Err(e) = conn.execute(
            "INSERT INTO actuator_statuses (queue_key, reference, value, state)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(queue_key) DO UPDATE SET
                 reference = excluded.reference,
                 value = excluded.value,
                 state = excluded.state",
            params![key, status.reference, status.value, status.state.as_str()],
        ) {
            error!(LOG_TAG, "cannot store actuator status for {}: {}", key, e);
        }
    }

    fn actuator_status(&self, key: &str) -> Option<ActuatorStatus> {
        let conn = self.conn.lock().unwrap();
        let row = conn.query_row(
            "SELECT reference, value, state FROM actuator_statuses WHERE queue_key = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<usize, String>(0)?,
                    row.get::<usize, String>(1)?,
                    row.get::<usize, String>(2)?,
                ))
            },
        );
        match row {
            Ok((reference, value, state)) => Some(ActuatorStatus {
                reference,
                value,
                state: ActuatorState::from_str(&state)?,
            }),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                error!(LOG_TAG, "cannot read actuator status for {}: {}", key, e);
                None
            }
        }
    }

    fn remove_actuator_status(&self, key: &str) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "DELETE FROM actuator_statuses WHERE queue_key = ?1",
            params![key],
        ) {
            error!(LOG_TAG, "cannot remove actuator status for {}: {}", key, e);
        }
    }

    fn actuator_statuses_keys(&self) -> Vec<String> {
        self.queue_keys("actuator_statuses")
    }

    fn put_configuration(&self, key: &str, configuration: ConfigurationSnapshot) {
        let items: Vec<(String, Vec<String>)> = configuration
            .items
            .into_iter()
            .map(|item| (item.reference, item.values))
            .collect();
        let payload = match serde_json::to_string(&items) {
            Ok(payload) => payload,
            Err(e) => {
                error!(LOG_TAG, "cannot serialize configuration snapshot: {}", e);
                return;
            }
        };
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "INSERT INTO configurations (queue_key, payload) VALUES (?1, ?2)
             ON CONFLICT(queue_key) DO UPDATE SET payload = excluded.payload",
            params![key, payload],
        ) {
            error!(LOG_TAG, "cannot store configuration for {}: {}", key, e);
        }
    }

    fn configuration(&self, key: &str) -> Option<ConfigurationSnapshot> {
        let conn = self.conn.lock().unwrap();
        let row = conn.query_row(
            "SELECT payload FROM configurations WHERE queue_key = ?1",
            params![key],
            |row| row.get::<usize, String>(0),
        );
        match row {
            Ok(payload) => {
                let items: Vec<(String, Vec<String>)> = match serde_json::from_str(&payload) {
                    Ok(items) => items,
                    Err(e) => {
                        warn!(LOG_TAG, "corrupt configuration snapshot for {}: {}", key, e);
                        return None;
                    }
                };
                Some(ConfigurationSnapshot {
                    items: items
                        .into_iter()
                        .map(|(reference, values)| ConfigurationItem { reference, values })
                        .collect(),
                })
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                error!(LOG_TAG, "cannot read configuration for {}: {}", key, e);
                None
            }
        }
    }

    fn remove_configuration(&self, key: &str) {
        let conn = self.conn.lock().unwrap();
        if let Err(e) = conn.execute(
            "DELETE FROM configurations WHERE queue_key = ?1",
            params![key],
        ) {
            error!(LOG_TAG, "cannot remove configuration for {}: {}", key, e);
        }
    }

    fn configurations_keys(&self) -> Vec<String> {
        self.queue_keys("configurations")
    }

    fn is_empty(&self) -> bool {
        let conn = self.conn.lock().unwrap();
        Self::table_count(&conn, "sensor_readings") == 0
            && Self::table_count(&conn, "alarms") == 0
            && Self::table_count(&conn, "actuator_statuses") == 0
            && Self::table_count(&conn, "configurations") == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(value: &str, rtc: u64) -> SensorReading {
        SensorReading {
            reference: "T".to_string(),
            values: vec![value.to_string()],
            rtc,
        }
    }

    // 同一 key 内按写入顺序弹出
    #[test]
    fn test_readings_fifo_within_key() {
        let persistence = SqlitePersistence::open_in_memory().unwrap();
        for (i, value) in ["1", "2", "3"].iter().enumerate() {
            persistence.put_sensor_reading("D1+T", reading(value, i as u64));
        }

        let front = persistence.sensor_readings("D1+T", 2);
        assert_eq!(front.len(), 2);
        assert_eq!(front[0].values, vec!["1"]);
        assert_eq!(front[1].values, vec!["2"]);

        persistence.remove_sensor_readings("D1+T", 2);
        let rest = persistence.sensor_readings("D1+T", 10);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].values, vec!["3"]);
        assert_eq!(rest[0].rtc, 2);
    }

    // key 按首次写入顺序返回
    #[test]
    fn test_keys_in_insertion_order() {
        let persistence = SqlitePersistence::open_in_memory().unwrap();
        persistence.put_alarm(
            "D2+HIGH",
            Alarm {
                reference: "HIGH".to_string(),
                active: true,
                rtc: 1,
            },
        );
        persistence.put_alarm(
            "D1+LOW",
            Alarm {
                reference: "LOW".to_string(),
                active: false,
                rtc: 2,
            },
        );
        assert_eq!(persistence.alarms_keys(), vec!["D2+HIGH", "D1+LOW"]);
    }

    // 执行器状态覆盖写入且保持原有 key 顺序
    #[test]
    fn test_actuator_status_replace_keeps_order() {
        let persistence = SqlitePersistence::open_in_memory().unwrap();
        let mut first = ActuatorStatus::new("1", ActuatorState::Busy);
        first.reference = "SW".to_string();
        let mut second = ActuatorStatus::new("on", ActuatorState::Ready);
        second.reference = "SL".to_string();

        persistence.put_actuator_status("D1+SW", first.clone());
        persistence.put_actuator_status("D1+SL", second);
        first.value = "2".to_string();
        first.state = ActuatorState::Ready;
        persistence.put_actuator_status("D1+SW", first);

        assert_eq!(persistence.actuator_statuses_keys(), vec!["D1+SW", "D1+SL"]);
        let stored = persistence.actuator_status("D1+SW").unwrap();
        assert_eq!(stored.value, "2");
        assert_eq!(stored.state, ActuatorState::Ready);
    }

    #[test]
    fn test_configuration_snapshot_round_trip() {
        let persistence = SqlitePersistence::open_in_memory().unwrap();
        let snapshot = ConfigurationSnapshot {
            items: vec![
                ConfigurationItem::new("CI1", vec!["60".to_string()]),
                ConfigurationItem::new("CI2", vec!["a".to_string(), "b".to_string()]),
            ],
        };
        persistence.put_configuration("D1", snapshot.clone());
        assert_eq!(persistence.configuration("D1"), Some(snapshot));

        persistence.remove_configuration("D1");
        assert!(persistence.configuration("D1").is_none());
        assert!(persistence.is_empty());
    }

    #[test]
    fn test_multi_value_reading_round_trip() {
        let persistence = SqlitePersistence::open_in_memory().unwrap();
        let reading = SensorReading {
            reference: "ACL".to_string(),
            values: vec!["0".to_string(), "-5".to_string(), "10".to_string()],
            rtc: 7,
        };
        persistence.put_sensor_reading("D1+ACL", reading.clone());
        assert_eq!(persistence.sensor_readings("D1+ACL", 1), vec![reading]);
    }
}
