use thiserror::Error;

/// Результат для операций декодера JPI
pub type JpiResult<T> = std::result::Result<T, JpiError>;

/// Типы ошибок декодера .JPI файлов.
#[derive(Debug, Error)]
pub enum JpiError {
    /// Повреждённый или усечённый ASCII-заголовок файла
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// Запрошенный полёт отсутствует в каталоге (или не найден пробой смещений)
    #[error("Flight {0} not found")]
    FlightNotFound(u16),

    /// Модель или прошивка вне таблицы каналов — угадывать раскладку нельзя
    #[error("Unsupported model {model} (firmware {firmware})")]
    UnsupportedModel { model: u32, firmware: u32 },

    /// Несовпадение контрольной суммы записи (только strict-режим)
    #[error("Record checksum mismatch at offset {offset}: expected {expected:02x}, found {found:02x}")]
    ChecksumMismatch {
        offset: usize,
        expected: u8,
        found: u8,
    },

    /// Повреждённая преамбула полёта (усечение, невозможная дата)
    #[error("Corrupt flight header: {0}")]
    CorruptFlightHeader(String),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JpiError {
    /// Удобные конструкторы
    pub fn malformed<S: Into<String>>(s: S) -> Self {
        Self::MalformedMetadata(s.into())
    }

    pub fn corrupt_header<S: Into<String>>(s: S) -> Self {
        Self::CorruptFlightHeader(s.into())
    }
}
