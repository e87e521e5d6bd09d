use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Запись каталога полётов (`$D`).
#[derive(Debug, Clone)]
pub struct FlightDirectoryEntry {
    /// Идентификатор полёта
    pub id: u16,
    /// Размер блока в байтах (= sizeWords × 2 из метаданных)
    pub size: usize,
    /// Абсолютное смещение блока в файле (префиксная сумма от якоря `$L`)
    pub start: usize,
    /// Блок подтверждён пробой смещений
    pub found: bool,
}

/// Фиксированная преамбула полёта. Живёт только пока полёт открыт.
#[derive(Debug, Clone)]
pub struct FlightPrelude {
    pub id: u16,
    /// Конфигурационные слова; слоты 2–4 заполняются только для EDM-типа
    pub cfg: [u16; 5],
    /// Стартовая широта (сотые доли минут), если прочитана и конечна
    pub lat_seed: Option<i32>,
    /// Стартовая долгота, аналогично
    pub lng_seed: Option<i32>,
    /// Байт единицы топлива из преамбулы
    pub fuel_unit: u8,
    /// Мощность двигателя (л.с.)
    pub horsepower: u8,
    /// Интервал записи, секунды
    pub interval_secs: u16,
    /// Дата старта
    pub date: NaiveDate,
    /// Время старта
    pub time: NaiveTime,
    /// Смещение первой бинарной записи
    pub rec_start: usize,
}

impl FlightPrelude {
    pub fn start_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Элемент списка полётов (`listFlights`).
#[derive(Debug, Clone, Serialize)]
pub struct FlightInfo {
    pub id: u16,
    pub size: usize,
    pub start: usize,
    /// MM/DD/YYYY
    pub date: String,
    /// HH:MM:SS
    pub time: String,
    pub interval: u16,
}

/// Декодированная таблица одного полёта.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightTable {
    /// `DATE`, `TIME`, затем токены настроенных каналов
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FlightTable {
    /// Таблица как CSV-текст без дополнительных колонок.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.headers.join(","));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }
}

/// Сводка по полёту (`summarizeFlights`).
#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    pub id: u16,
    pub date: String,
    pub time_off: String,
    pub time_in: String,
    pub samples: usize,
    /// Первое не-NA значение колонки HRS/LHRS
    pub tach_start: f64,
    /// Последнее не-NA значение колонки HRS/LHRS
    pub tach_end: f64,
    /// round1(tach_end − tach_start)
    pub tach_duration: f64,
    /// Часы между первой и последней строкой, один десятичный знак
    pub hobb_duration: f64,
    pub start_lat: Option<String>,
    pub start_lng: Option<String>,
    pub end_lat: Option<String>,
    pub end_lng: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_datetime() {
        let p = FlightPrelude {
            id: 1,
            cfg: [0; 5],
            lat_seed: None,
            lng_seed: None,
            fuel_unit: 0,
            horsepower: 180,
            interval_secs: 6,
            date: NaiveDate::from_ymd_opt(2025, 1, 18).unwrap(),
            time: NaiveTime::from_hms_opt(14, 2, 30).unwrap(),
            rec_start: 0,
        };
        let dt = p.start_datetime();
        assert_eq!(dt.format("%m/%d/%Y %H:%M:%S").to_string(), "01/18/2025 14:02:30");
    }

    #[test]
    fn test_table_to_csv() {
        let t = FlightTable {
            headers: vec!["DATE".into(), "TIME".into(), "E1".into()],
            rows: vec![
                vec!["01/18/2025".into(), "14:02:30".into(), " 1300".into()],
                vec!["01/18/2025".into(), "14:02:36".into(), " 1305".into()],
            ],
        };
        let csv = t.to_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("DATE,TIME,E1"));
        assert_eq!(lines.next(), Some("01/18/2025,14:02:30, 1300"));
        assert_eq!(lines.next(), Some("01/18/2025,14:02:36, 1305"));
        assert_eq!(lines.next(), None);
    }
}
