//! Преобразование сырых записей в значения колонок.
//!
//! Каждый канал — маленькая машина состояний: накопитель бегущей суммы
//! плюс биты валидности. Вся логика вида «если канал называется LAT»
//! выражена тегированным [`SensorKind`].

use jpi_types::{ChannelState, SensorDescriptor, SensorKind};

use crate::record::RawRecord;

/// Литерал отсутствующего значения.
pub const NA: &str = "NA";

/// Стартовое значение накопителя для обычных каналов.
const DEFAULT_TOTAL: f64 = 240.0;

/// Состояние шейпера в пределах одного полёта.
#[derive(Debug)]
pub struct ValueShaper {
    channels: Vec<SensorDescriptor>,
    states: Vec<ChannelState>,
    first_record: bool,
    interval: u16,
    original_interval: u16,
    mark_idx: Option<usize>,
}

impl ValueShaper {
    /// Создаёт шейпер для настроенных каналов полёта.
    ///
    /// Координатные накопители сеются стартовыми значениями преамбулы,
    /// если те конечны; HP стартует с нуля, остальные — с 240.
    pub fn new(
        channels: Vec<SensorDescriptor>,
        interval: u16,
        lat_seed: Option<i32>,
        lng_seed: Option<i32>,
    ) -> Self {
        let states = channels
            .iter()
            .map(|d| {
                let initial = match d.kind {
                    SensorKind::Latitude => lat_seed.map_or(0.0, f64::from),
                    SensorKind::Longitude => lng_seed.map_or(0.0, f64::from),
                    SensorKind::Mark | SensorKind::Computed => 0.0,
                    _ if d.header == "HP" => 0.0,
                    _ => DEFAULT_TOTAL,
                };
                ChannelState::new(initial)
            })
            .collect();
        let mark_idx = channels.iter().position(|d| d.kind == SensorKind::Mark);

        Self {
            channels,
            states,
            first_record: true,
            interval,
            original_interval: interval,
            mark_idx,
        }
    }

    /// Заголовки колонок: `DATE`, `TIME`, затем токены каналов.
    pub fn headers(&self) -> Vec<String> {
        let mut out = vec!["DATE".to_string(), "TIME".to_string()];
        out.extend(self.channels.iter().map(|d| d.header.to_string()));
        out
    }

    /// Текущий интервал записи (MARK мог переключить его на лету).
    pub fn interval(&self) -> u16 {
        self.interval
    }

    pub fn original_interval(&self) -> u16 {
        self.original_interval
    }

    /// Обновляет состояния каналов записью и возвращает значения колонок.
    pub fn shape(
        &mut self,
        rec: &RawRecord,
    ) -> Vec<String> {
        self.update_states(rec);
        let mark_cell = self.mark_glyph(rec);
        let dif = self.dif_value(rec);

        let mut cells = Vec::with_capacity(self.channels.len());
        for (d, st) in self.channels.iter().zip(&self.states) {
            let valid = st.lo_valid || (d.hi.is_some() && st.hi_valid);
            let cell = match d.kind {
                SensorKind::Integer => {
                    if valid {
                        format_int(st.rounded())
                    } else {
                        NA.to_string()
                    }
                }
                SensorKind::Fixed1 => {
                    if valid {
                        format_fixed1(st.rounded())
                    } else {
                        NA.to_string()
                    }
                }
                SensorKind::Latitude => {
                    if valid {
                        format_coord(st.rounded(), 'N', 'S', 2)
                    } else {
                        NA.to_string()
                    }
                }
                SensorKind::Longitude => {
                    if valid {
                        format_coord(st.rounded(), 'E', 'W', 3)
                    } else {
                        NA.to_string()
                    }
                }
                SensorKind::Mark => mark_cell.clone(),
                SensorKind::Computed => dif.clone(),
            };
            cells.push(cell);
        }

        self.first_record = false;
        cells
    }

    /// Сборка приращений и накопление бегущих сумм.
    fn update_states(
        &mut self,
        rec: &RawRecord,
    ) {
        for (d, st) in self.channels.iter().zip(self.states.iter_mut()) {
            let Some(lo) = d.lo else { continue };
            let Some(db) = rec.get(lo) else { continue };

            st.lo_valid = db.valid;
            st.sign = db.sign;
            let mut int = if db.sign { -db.value } else { db.value };

            if let Some(hi) = d.hi {
                if let Some(hb) = rec.get(hi) {
                    st.hi_valid = hb.valid;
                    if self.first_record && d.header == "HRS" && db.sign {
                        // Самая первая запись: отрицательный стартовый
                        // счётчик моточасов собирается целиком
                        int = -(db.value + hb.value);
                    } else if hb.sign {
                        int -= hb.value;
                    } else {
                        int += hb.value;
                    }
                }
            }

            st.last_raw = int;
            if d.kind != SensorKind::Mark {
                st.total += f64::from(int);
            }
        }
    }

    /// Глиф MARK текущей записи; `[`/`<` переводят интервал на 1 секунду,
    /// `]`/`>` возвращают исходный.
    fn mark_glyph(
        &mut self,
        rec: &RawRecord,
    ) -> String {
        let Some(mi) = self.mark_idx else {
            return String::new();
        };
        let Some(lo) = self.channels[mi].lo else {
            return String::new();
        };
        let Some(db) = rec.get(lo) else {
            return String::new();
        };
        if !db.valid {
            return String::new();
        }

        match self.states[mi].last_raw & 7 {
            1 => "X".to_string(),
            2 => {
                self.interval = 1;
                "[".to_string()
            }
            3 => {
                self.interval = self.original_interval;
                "]".to_string()
            }
            4 => {
                self.interval = 1;
                "<".to_string()
            }
            5 => {
                self.interval = self.original_interval;
                ">".to_string()
            }
            _ => String::new(),
        }
    }

    /// DIF: разброс EGT, валидно наблюдавшихся в текущей записи.
    /// Никогда не переносится из предыдущих записей.
    fn dif_value(
        &self,
        rec: &RawRecord,
    ) -> String {
        let mut min = i64::MAX;
        let mut max = i64::MIN;
        let mut seen = false;

        for (d, st) in self.channels.iter().zip(&self.states) {
            if !d.egt {
                continue;
            }
            let Some(lo) = d.lo else { continue };
            let Some(db) = rec.get(lo) else { continue };
            if !db.valid {
                continue;
            }
            let v = st.rounded();
            min = min.min(v);
            max = max.max(v);
            seen = true;
        }

        if seen {
            format_int(max - min)
        } else {
            NA.to_string()
        }
    }
}

/// Целое поле: ведущий пробел у неотрицательных, минус без разделителя —
/// традиция исходного CSV.
pub fn format_int(v: i64) -> String {
    if v >= 0 {
        format!(" {v}")
    } else {
        v.to_string()
    }
}

/// Поле шкалы 10: один десятичный знак через точку.
pub fn format_fixed1(tenths: i64) -> String {
    let v = tenths as f64 / 10.0;
    if tenths >= 0 {
        format!(" {v:.1}")
    } else {
        format!("{v:.1}")
    }
}

/// Координата из сотых долей минут: `N34.56.78` / `W118.30.25`.
pub fn format_coord(
    total: i64,
    pos: char,
    neg: char,
    deg_width: usize,
) -> String {
    let hemi = if total < 0 { neg } else { pos };
    let t = total.abs();
    let deg = t / 6000;
    let r = t - deg * 6000;
    format!(
        "{hemi}{deg:0width$}.{:02}.{:02}",
        r / 100,
        r % 100,
        width = deg_width
    )
}
