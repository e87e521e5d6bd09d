/// Адрес байта данных в записи: группа 0..15, бит 0..7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteAddr {
    pub group: u8,
    pub bit: u8,
}

impl ByteAddr {
    pub const fn new(
        group: u8,
        bit: u8,
    ) -> Self {
        Self { group, bit }
    }
}

/// Разновидность канала — определяет накопление и форматирование значения.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Целое значение (шкала 1)
    Integer,
    /// Fixed-point с одним десятичным знаком (шкала 10)
    Fixed1,
    /// Широта: N/S + градусы + сотые доли минут
    Latitude,
    /// Долгота: E/W, трёхзначные градусы
    Longitude,
    /// Маркер-глиф; младшие биты переключают интервал записи
    Mark,
    /// Вычисляемый разброс EGT текущей записи (DIF)
    Computed,
}

/// Описание канала для профиля (модель, прошивка).
///
/// Канал попадает в вывод только если `cfgWord[cfg_word] & (1 << cfg_bit)`
/// ненулевой; порядок вставки в таблицу задаёт порядок колонок.
#[derive(Debug, Clone)]
pub struct SensorDescriptor {
    pub name: &'static str,
    /// Короткий токен заголовка колонки (`E1`, `MAP`, `HRS`, ...)
    pub header: &'static str,
    /// Индекс конфигурационного слова (0..4)
    pub cfg_word: usize,
    /// Бит в конфигурационном слове
    pub cfg_bit: u8,
    pub kind: SensorKind,
    /// Младший байт данных; None для вычисляемых каналов
    pub lo: Option<ByteAddr>,
    /// Старший байт данных, если канал двухбайтовый
    pub hi: Option<ByteAddr>,
    /// Канал участвует в вычислении DIF
    pub egt: bool,
}

impl SensorDescriptor {
    pub fn is_configured(
        &self,
        cfg: &[u16; 5],
    ) -> bool {
        cfg[self.cfg_word] & (1 << self.cfg_bit) != 0
    }
}

/// Бегущее состояние канала в пределах одного полёта.
///
/// Сбрасывается при каждом открытии полёта; между записями сохраняется.
#[derive(Debug, Clone)]
pub struct ChannelState {
    /// Накопитель бегущей суммы
    pub total: f64,
    /// Последняя валидность младшего байта
    pub lo_valid: bool,
    /// Последняя валидность старшего байта
    pub hi_valid: bool,
    /// Последний знаковый бит
    pub sign: bool,
    /// Последнее собранное приращение записи
    pub last_raw: i32,
}

impl ChannelState {
    pub fn new(initial: f64) -> Self {
        Self {
            total: initial,
            lo_valid: false,
            hi_valid: false,
            sign: false,
            last_raw: 0,
        }
    }

    /// Округлённое текущее значение канала.
    pub fn rounded(&self) -> i64 {
        self.total.round() as i64
    }
}
