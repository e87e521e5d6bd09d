//! Внутренний цикл декодирования бинарных записей полёта.
//!
//! Запись: два флаговых слова, байт-множитель повтора, контрольные байты
//! групп, знаковые байты, байты данных, контрольная сумма. Поток
//! самосинхронизирующийся: любая аномалия внутри записи просто завершает
//! поток полёта, не ошибка для вызывающего.

use log::debug;

use jpi_types::{ByteAddr, ChecksumProtocol, JpiError, JpiResult};

use crate::cursor::DecodeCursor;

/// Количество байтовых групп записи.
pub const GROUPS: usize = 16;

/// Один декодированный байт данных.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataByte {
    /// Значение с учётом веса потока (×1 или ×256)
    pub value: i32,
    /// Знаковый бит из знакового байта группы-источника
    pub sign: bool,
    /// Байт валиден в этой записи (ненулевой)
    pub valid: bool,
}

/// Сырая запись: байты данных по адресам (группа, бит).
#[derive(Debug)]
pub struct RawRecord {
    pub bytes: [[Option<DataByte>; 8]; GROUPS],
    /// Повтор предыдущей записи (mult-серия)
    pub repeat: bool,
}

impl RawRecord {
    pub fn empty(repeat: bool) -> Self {
        Self {
            bytes: [[None; 8]; GROUPS],
            repeat,
        }
    }

    pub fn get(
        &self,
        addr: ByteAddr,
    ) -> Option<DataByte> {
        self.bytes[addr.group as usize][addr.bit as usize]
    }
}

/// Сдвиг маски знакового бита для позиции данных.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignShift {
    None,
    Div2,
    Div16,
    Mul32,
}

/// Вес байта в потоке и сдвиг знаковой маски для (группа, бит).
///
/// Компактная таблица вместо условной арифметики; семантика исходного
/// потока сохранена.
pub fn stream_scale(
    group: usize,
    bit: u8,
) -> (i32, SignShift) {
    match (group, bit) {
        (5, 2 | 4) => (256, SignShift::Div2),
        (6 | 7, _) => (256, SignShift::None),
        (10, 1 | 2) => (256, SignShift::Mul32),
        (9 | 12, 4 | 5) => (256, SignShift::Div16),
        (9 | 12, 7) => (256, SignShift::None),
        (13 | 14, 4 | 5 | 6) => (256, SignShift::Div16),
        _ => (1, SignShift::None),
    }
}

/// Маска для знакового байта группы-источника.
pub fn sign_mask(
    bit: u8,
    shift: SignShift,
) -> u8 {
    let base = 1u8 << bit;
    match shift {
        SignShift::None => base,
        SignShift::Div2 => base >> 1,
        SignShift::Div16 => base >> 4,
        SignShift::Mul32 => base << 5,
    }
}

/// Группа, чей знаковый байт обслуживает данную группу данных.
///
/// Группы 6 и 7 собственных знаковых байтов не имеют.
pub fn sign_source(group: usize) -> usize {
    match group {
        6 => 0,
        7 => 3,
        _ => group,
    }
}

/// Состояние цикла записей одного полёта.
#[derive(Debug)]
pub struct RecordReader {
    edm_type: bool,
    protocol: ChecksumProtocol,
    strict: bool,
    repeat_count: u32,
    mismatches: u64,
}

impl RecordReader {
    pub fn new(
        edm_type: bool,
        protocol: ChecksumProtocol,
        strict: bool,
    ) -> Self {
        Self {
            edm_type,
            protocol,
            strict,
            repeat_count: 0,
            mismatches: 0,
        }
    }

    /// Несовпадений контрольных сумм с начала полёта.
    pub fn mismatches(&self) -> u64 {
        self.mismatches
    }

    /// Читает следующую запись. `Ok(None)` — конец потока полёта:
    /// конец блока, расхождение флаговых слов или усечение.
    pub fn next_record(
        &mut self,
        cur: &mut DecodeCursor,
    ) -> JpiResult<Option<RawRecord>> {
        let record_start = cur.pos();

        // 1. Флаговые слова: у EDM-типа 16-битные, у legacy — байтовые
        let (flg0, flg1) = if self.edm_type {
            (cur.word(), cur.word())
        } else {
            (cur.byte().map(u16::from), cur.byte().map(u16::from))
        };
        let (Some(flg0), Some(flg1)) = (flg0, flg1) else {
            return Ok(None);
        };
        if flg0 != flg1 {
            return Ok(None);
        }

        // 2. Множитель повтора
        let Some(mult) = cur.byte() else {
            return Ok(None);
        };
        if mult != 0 {
            if self.repeat_count == 0 {
                self.repeat_count = u32::from(mult);
            }
            self.repeat_count -= 1;
            if self.repeat_count > 0 {
                // Перечитаем эту же запись на следующем вызове
                cur.set_pos(record_start);
                return Ok(Some(RawRecord::empty(true)));
            }
            // Последний повтор серии: тело записи (обычно пустое)
            // поглощается, данные не применяются
            self.read_body(cur, flg0, record_start)?;
            return Ok(Some(RawRecord::empty(true)));
        }

        self.read_body(cur, flg0, record_start)
    }

    /// Шаги 3–6: контрольные байты, знаковые байты, данные, контрольная
    /// сумма.
    fn read_body(
        &mut self,
        cur: &mut DecodeCursor,
        flg0: u16,
        record_start: usize,
    ) -> JpiResult<Option<RawRecord>> {
        let mut rec = RawRecord::empty(false);
        let mut control = [0u8; GROUPS];
        let mut present = [false; GROUPS];

        for g in 0..GROUPS {
            if flg0 & (1 << g) != 0 {
                let Some(c) = cur.byte() else {
                    return Ok(None);
                };
                control[g] = c;
                present[g] = true;
            }
        }

        let mut signs = [0u8; GROUPS];
        for g in 0..GROUPS {
            if g == 6 || g == 7 {
                continue;
            }
            if flg0 & (1 << g) != 0 {
                let Some(s) = cur.byte() else {
                    return Ok(None);
                };
                signs[g] = s;
            }
        }

        for g in 0..GROUPS {
            if !present[g] {
                continue;
            }
            for b in 0..8u8 {
                if control[g] & (1 << b) == 0 {
                    continue;
                }
                let (scale, shift) = stream_scale(g, b);
                let mask = sign_mask(b, shift);
                let Some(v) = cur.byte() else {
                    return Ok(None);
                };
                rec.bytes[g][b as usize] = Some(DataByte {
                    value: i32::from(v) * scale,
                    sign: signs[sign_source(g)] & mask != 0,
                    valid: v != 0,
                });
            }
        }

        let payload_end = cur.pos();
        let Some(cs) = cur.byte() else {
            return Ok(None);
        };
        self.verify_checksum(cur.slice(record_start, payload_end), cs, record_start)?;

        Ok(Some(rec))
    }

    fn verify_checksum(
        &mut self,
        payload: &[u8],
        found: u8,
        offset: usize,
    ) -> JpiResult<()> {
        let expected = match self.protocol {
            ChecksumProtocol::Xor => payload.iter().fold(0u8, |acc, b| acc ^ b),
            // Контрольный байт — дополнение суммы: запись в сумме даёт 0
            ChecksumProtocol::Sum => payload
                .iter()
                .fold(0u8, |acc, b| acc.wrapping_add(*b))
                .wrapping_neg(),
        };
        if expected != found {
            self.mismatches += 1;
            if self.strict {
                return Err(JpiError::ChecksumMismatch {
                    offset,
                    expected,
                    found,
                });
            }
            debug!("record checksum mismatch at {offset}: expected {expected:02x}, found {found:02x}");
        }
        Ok(())
    }
}
