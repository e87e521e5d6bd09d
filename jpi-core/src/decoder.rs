//! Фасад декодера: каталог полётов, построчное чтение, таблицы и сводки.

use chrono::{Duration, NaiveDateTime};
use log::warn;

use jpi_types::{
    DeviceProfile, FlightDirectoryEntry, FlightInfo, FlightPrelude, FlightSummary, FlightTable,
    JpiError, JpiResult,
};

use crate::{
    composer::{self, RowDraft},
    cursor::DecodeCursor,
    header, mapping, metadata,
    record::RecordReader,
    shaper::ValueShaper,
};

/// Параметры декодирования.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Несовпадение контрольной суммы записи — ошибка, а не журнальная
    /// строка. По умолчанию выключено: снятые файлы иногда дрейфуют.
    pub strict_checksums: bool,
}

/// Накопленная статистика декодирования.
#[derive(Debug, Clone, Default)]
pub struct DecodeStats {
    /// Полных записей, декодированных из потока
    pub records_decoded: u64,
    /// Строк, порождённых mult-повторами
    pub repeats_emitted: u64,
    /// Несовпадений контрольных сумм записей
    pub checksum_mismatches: u64,
}

/// Состояние открытого полёта. Живёт от `open_flight` до следующего.
struct OpenFlight {
    prelude: FlightPrelude,
    end: usize,
    pos: usize,
    reader: RecordReader,
    shaper: ValueShaper,
    prev_cells: Option<Vec<String>>,
}

/// Декодер одного .JPI файла.
///
/// Не потокобезопасен: курсор и поканальное состояние изменяемы.
/// Для параллельного декодирования создавайте по декодеру на файл.
pub struct JpiDecoder {
    buf: Vec<u8>,
    options: DecodeOptions,
    profile: DeviceProfile,
    directory: Vec<FlightDirectoryEntry>,
    stats: DecodeStats,
    open: Option<OpenFlight>,
}

impl JpiDecoder {
    /// Разбирает файл: профиль устройства, каталог полётов, проба
    /// смещений. Сам поток записей при этом не трогается.
    pub fn parse(
        bytes: Vec<u8>,
        options: DecodeOptions,
    ) -> JpiResult<Self> {
        let meta = metadata::scan(&bytes)?;
        Ok(Self {
            buf: bytes,
            options,
            profile: meta.profile,
            directory: meta.directory,
            stats: DecodeStats::default(),
            open: None,
        })
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn directory(&self) -> &[FlightDirectoryEntry] {
        &self.directory
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Список полётов с датой и временем старта.
    ///
    /// Полёты с нечитаемой преамбулой пропускаются с предупреждением.
    pub fn list_flights(&self) -> Vec<FlightInfo> {
        self.directory
            .iter()
            .filter_map(|entry| {
                if !entry.found {
                    warn!("flight {}: skipped, block not located", entry.id);
                    return None;
                }
                let mut cur = self.flight_cursor(entry);
                match header::parse_prelude(&mut cur, &self.profile, entry) {
                    Ok(p) => Some(FlightInfo {
                        id: entry.id,
                        size: entry.size,
                        start: entry.start,
                        date: p.date.format("%m/%d/%Y").to_string(),
                        time: p.time.format("%H:%M:%S").to_string(),
                        interval: p.interval_secs,
                    }),
                    Err(e) => {
                        warn!("flight {}: skipped, {e}", entry.id);
                        None
                    }
                }
            })
            .collect()
    }

    /// Открывает полёт: разбирает преамбулу, сбрасывает поканальное
    /// состояние. Возвращает заголовки колонок.
    pub fn open_flight(
        &mut self,
        id: u16,
    ) -> JpiResult<Vec<String>> {
        self.open = None;
        let entry = self
            .directory
            .iter()
            .find(|e| e.id == id)
            .ok_or(JpiError::FlightNotFound(id))?;
        if !entry.found {
            return Err(JpiError::FlightNotFound(id));
        }

        let end = (entry.start + entry.size).min(self.buf.len());
        let mut cur = self.flight_cursor(entry);
        let prelude = header::parse_prelude(&mut cur, &self.profile, entry)?;

        let channels: Vec<_> = mapping::sensor_table(&self.profile, prelude.fuel_unit)?
            .into_iter()
            .filter(|d| d.is_configured(&prelude.cfg))
            .collect();
        let shaper = ValueShaper::new(
            channels,
            prelude.interval_secs,
            prelude.lat_seed,
            prelude.lng_seed,
        );
        let headers = shaper.headers();
        let reader = RecordReader::new(
            self.profile.edm_type,
            self.profile.checksum_protocol,
            self.options.strict_checksums,
        );

        self.open = Some(OpenFlight {
            pos: prelude.rec_start,
            end,
            prelude,
            reader,
            shaper,
            prev_cells: None,
        });
        Ok(headers)
    }

    /// Одна сырая строка (без пост-проходов), начинающаяся с переданных
    /// даты и времени. `None` — конец потока.
    pub fn read_record(
        &mut self,
        date_time: &str,
    ) -> JpiResult<Option<String>> {
        Ok(self.next_row(date_time)?.map(|d| d.cells.join(",")))
    }

    /// Текущий интервал записи открытого полёта (MARK меняет его на лету).
    pub fn record_interval(&self) -> Option<u16> {
        self.open.as_ref().map(|of| of.shaper.interval())
    }

    /// Полная таблица полёта со всеми пост-проходами.
    pub fn decode_flight(
        &mut self,
        id: u16,
    ) -> JpiResult<FlightTable> {
        let headers = self.open_flight(id)?;
        let Some(of) = self.open.as_ref() else {
            return Err(JpiError::FlightNotFound(id));
        };
        let mut dt: NaiveDateTime = of.prelude.start_datetime();

        let mut drafts = Vec::new();
        loop {
            let stamp = format!("{},{}", dt.format("%m/%d/%Y"), dt.format("%H:%M:%S"));
            let Some(draft) = self.next_row(&stamp)? else {
                break;
            };
            drafts.push(draft);
            // Время следующей записи — от текущего интервала, который
            // MARK этой строки мог уже переключить
            let step = self.record_interval().unwrap_or(0);
            dt += Duration::seconds(i64::from(step));
        }

        let rows = composer::compose(&headers, drafts);
        Ok(FlightTable { headers, rows })
    }

    /// Сводки всех найденных полётов.
    pub fn summarize_flights(&mut self) -> JpiResult<Vec<FlightSummary>> {
        let ids: Vec<u16> = self
            .directory
            .iter()
            .filter(|e| e.found)
            .map(|e| e.id)
            .collect();

        let mut out = Vec::new();
        for id in ids {
            match self.decode_flight(id) {
                Ok(table) => out.push(summarize_table(id, &table)),
                Err(e) => warn!("flight {id}: summary skipped, {e}"),
            }
        }
        Ok(out)
    }

    /// Следующий черновик строки открытого полёта.
    fn next_row(
        &mut self,
        date_time: &str,
    ) -> JpiResult<Option<RowDraft>> {
        let Some(of) = self.open.as_mut() else {
            return Ok(None);
        };

        let mut cur = DecodeCursor::new(&self.buf);
        cur.limit(of.end);
        cur.set_pos(of.pos);

        loop {
            let before = of.reader.mismatches();
            let result = of.reader.next_record(&mut cur);
            of.pos = cur.pos();
            self.stats.checksum_mismatches += of.reader.mismatches() - before;

            let Some(raw) = result? else {
                return Ok(None);
            };

            let (date, time) = split_stamp(date_time);
            if raw.repeat {
                // Повтор без предыдущей записи не воспроизвести
                let Some(prev) = of.prev_cells.clone() else {
                    continue;
                };
                let mut cells = prev;
                cells[0] = date;
                cells[1] = time;
                of.prev_cells = Some(cells.clone());
                self.stats.repeats_emitted += 1;
                return Ok(Some(RowDraft { cells, repeat: true }));
            }

            let mut cells = vec![date, time];
            cells.extend(of.shaper.shape(&raw));
            of.prev_cells = Some(cells.clone());
            self.stats.records_decoded += 1;
            return Ok(Some(RowDraft {
                cells,
                repeat: false,
            }));
        }
    }

    fn flight_cursor(
        &self,
        entry: &FlightDirectoryEntry,
    ) -> DecodeCursor<'_> {
        let mut cur = DecodeCursor::new(&self.buf);
        cur.limit((entry.start + entry.size).min(self.buf.len()));
        cur.set_pos(entry.start);
        cur
    }
}

/// Сводка по готовой таблице.
fn summarize_table(
    id: u16,
    table: &FlightTable,
) -> FlightSummary {
    let col = |name: &str| table.headers.iter().position(|h| h == name);
    let hrs_idx = col("HRS").or_else(|| col("LHRS"));
    let lat_idx = col("LAT");
    let lng_idx = col("LNG");

    let first = table.rows.first();
    let last = table.rows.last();

    let (tach_start, tach_end) = match hrs_idx {
        Some(ci) => {
            let mut present = table
                .rows
                .iter()
                .filter_map(|r| parse_numeric(&r[ci]));
            let start = present.next().unwrap_or(0.0);
            let end = present.last().unwrap_or(start);
            (start, end)
        }
        None => (0.0, 0.0),
    };

    let hobb_duration = match (first, last) {
        (Some(f), Some(l)) => {
            let parse = |r: &[String]| {
                NaiveDateTime::parse_from_str(
                    &format!("{} {}", r[0], r[1]),
                    "%m/%d/%Y %H:%M:%S",
                )
                .ok()
            };
            match (parse(f), parse(l)) {
                (Some(a), Some(b)) => round1((b - a).num_seconds() as f64 / 3600.0),
                _ => 0.0,
            }
        }
        _ => 0.0,
    };

    let coord = |ci: Option<usize>, from_end: bool| -> Option<String> {
        let ci = ci?;
        let mut it = table
            .rows
            .iter()
            .map(|r| r[ci].clone())
            .filter(|c| !c.is_empty() && c != "NA");
        if from_end {
            it.last()
        } else {
            it.next()
        }
    };

    FlightSummary {
        id,
        date: first.map(|r| r[0].clone()).unwrap_or_default(),
        time_off: first.map(|r| r[1].clone()).unwrap_or_default(),
        time_in: last.map(|r| r[1].clone()).unwrap_or_default(),
        samples: table.rows.len(),
        tach_start,
        tach_end,
        tach_duration: round1(tach_end - tach_start),
        hobb_duration,
        start_lat: coord(lat_idx, false),
        start_lng: coord(lng_idx, false),
        end_lat: coord(lat_idx, true),
        end_lng: coord(lng_idx, true),
    }
}

fn parse_numeric(cell: &str) -> Option<f64> {
    let t = cell.trim();
    if t.is_empty() || t == "NA" {
        return None;
    }
    t.parse().ok()
}

fn split_stamp(date_time: &str) -> (String, String) {
    match date_time.split_once(',') {
        Some((d, t)) => (d.to_string(), t.to_string()),
        None => (date_time.to_string(), String::new()),
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_stamp() {
        let (d, t) = split_stamp("01/18/2025,14:02:30");
        assert_eq!(d, "01/18/2025");
        assert_eq!(t, "14:02:30");
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(1.649), 1.6);
        assert_eq!(round1(1.65), 1.7);
        assert_eq!(round1(-0.04), -0.0);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(" 1234.5"), Some(1234.5));
        assert_eq!(parse_numeric("-1.5"), Some(-1.5));
        assert_eq!(parse_numeric("NA"), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[test]
    fn test_summarize_table() {
        let table = FlightTable {
            headers: ["DATE", "TIME", "HRS", "LAT", "LNG"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: vec![
                vec![
                    "01/18/2025".into(),
                    "14:00:00".into(),
                    " 1234.5".into(),
                    "NA".into(),
                    "NA".into(),
                ],
                vec![
                    "01/18/2025".into(),
                    "14:30:00".into(),
                    " 1234.9".into(),
                    "N34.56.78".into(),
                    "W118.30.25".into(),
                ],
                vec![
                    "01/18/2025".into(),
                    "15:00:00".into(),
                    " 1235.2".into(),
                    "N34.56.80".into(),
                    "W118.30.26".into(),
                ],
            ],
        };

        let s = summarize_table(559, &table);
        assert_eq!(s.id, 559);
        assert_eq!(s.date, "01/18/2025");
        assert_eq!(s.time_off, "14:00:00");
        assert_eq!(s.time_in, "15:00:00");
        assert_eq!(s.samples, 3);
        assert_eq!(s.tach_start, 1234.5);
        assert_eq!(s.tach_end, 1235.2);
        assert_eq!(s.tach_duration, 0.7);
        assert_eq!(s.hobb_duration, 1.0);
        assert_eq!(s.start_lat.as_deref(), Some("N34.56.78"));
        assert_eq!(s.end_lng.as_deref(), Some("W118.30.26"));
    }

    #[test]
    fn test_parse_requires_metadata() {
        assert!(JpiDecoder::parse(b"garbage".to_vec(), DecodeOptions::default()).is_err());
    }
}
