//! Сканер ASCII-заголовка файла: `$`-записи, профиль устройства,
//! каталог полётов и проба смещений.
//!
//! Запись имеет вид `$X,поле,поле,…*CS\r\n`, где CS — две hex-цифры,
//! XOR всех байтов между `$` (не включая) и `*` (не включая).

use log::warn;

use jpi_types::{
    ChecksumProtocol, DeviceProfile, FlightDirectoryEntry, FuelUnit, JpiError, JpiResult, TempUnit,
};

use crate::cursor::DecodeCursor;

/// `*` + две цифры контрольной суммы + CRLF.
const RECORD_TERMINATOR_LEN: usize = 5;

/// Защитный предел длины одной записи.
const MAX_RECORD_LEN: usize = 256;

/// Результат сканирования метаданных.
#[derive(Debug)]
pub struct Metadata {
    pub profile: DeviceProfile,
    pub directory: Vec<FlightDirectoryEntry>,
    /// Смещение начала бинарных блоков (байт после терминатора `$L`)
    pub data_anchor: usize,
}

/// Сканирует метаданные с первого вхождения `$U` до `$L`.
pub fn scan(buf: &[u8]) -> JpiResult<Metadata> {
    let start = find_metadata_start(buf)
        .ok_or_else(|| JpiError::malformed("missing $U anchor"))?;

    let mut cur = DecodeCursor::new(buf);
    cur.set_pos(start);

    let mut profile = DeviceProfile::default();
    let mut directory: Vec<FlightDirectoryEntry> = Vec::new();
    let mut data_anchor: Option<usize> = None;

    loop {
        let record = read_record(&mut cur)?;
        let fields: Vec<&str> = record.split(',').map(str::trim).collect();
        // Терминатор пропускается всегда, даже для $L
        cur.skip(RECORD_TERMINATOR_LEN);

        match fields[0] {
            "$A" | "$H" | "$I" | "$T" | "$W" => {}
            "$C" => apply_config(&mut profile, &fields)?,
            "$D" => directory.push(parse_directory_entry(&fields)?),
            "$F" => {
                profile.fuel_unit = FuelUnit::from_u8(field_u32(&fields, 1)? as u8);
            }
            "$P" => {
                let proto = field_u32(&fields, 1)?;
                profile.edm_type = true;
                profile.checksum_protocol = if proto == 2 {
                    ChecksumProtocol::Sum
                } else {
                    ChecksumProtocol::Xor
                };
            }
            "$U" => {
                profile.registration = fields.get(1).unwrap_or(&"").to_string();
            }
            "$L" => {
                data_anchor = Some(cur.pos());
                break;
            }
            _ => break, // $E и неизвестные теги завершают сканирование
        }
    }

    // Без $L смещения блоков не назначены — частичный каталог не возвращаем
    let data_anchor =
        data_anchor.ok_or_else(|| JpiError::malformed("metadata ended before $L"))?;

    let mut off = data_anchor;
    for entry in directory.iter_mut() {
        entry.start = off;
        off += entry.size;
    }
    resolve_offsets(buf, &mut directory);

    Ok(Metadata {
        profile,
        directory,
        data_anchor,
    })
}

/// XOR-сумма записи: все байты после `$` до `*`.
pub fn record_checksum(record: &str) -> u8 {
    record.as_bytes().iter().skip(1).fold(0, |acc, b| acc ^ b)
}

fn find_metadata_start(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"$U")
}

/// Читает запись до `*`, не потребляя сам `*`.
fn read_record(cur: &mut DecodeCursor) -> JpiResult<String> {
    let mut out = Vec::new();
    loop {
        match cur.byte() {
            None => return Err(JpiError::malformed("truncated metadata record")),
            Some(b'*') => {
                cur.set_pos(cur.pos() - 1);
                break;
            }
            Some(b) => {
                out.push(b);
                if out.len() > MAX_RECORD_LEN {
                    return Err(JpiError::malformed("unterminated metadata record"));
                }
            }
        }
    }
    String::from_utf8(out).map_err(|_| JpiError::malformed("non-ASCII metadata record"))
}

/// `$C,model,fw,cfgA,?,cfgB,build`
fn apply_config(
    profile: &mut DeviceProfile,
    fields: &[&str],
) -> JpiResult<()> {
    profile.apply_model(field_u32(fields, 1)?);
    profile.firmware = field_u32(fields, 2)?;

    // Первое конфигурационное значение — hex-ниблы
    let cfg_a = field_hex(fields, 3).unwrap_or(0);
    profile.cfg_high = (cfg_a >> 8) as u8;
    profile.cfg_low = (cfg_a & 0xFF) as u8;
    profile.engine_temp_unit = if cfg_a & 0x1000 != 0 {
        TempUnit::Fahrenheit
    } else {
        TempUnit::Celsius
    };

    let cfg_b = field_hex(fields, 5).unwrap_or(0);
    profile.oat_unit = if cfg_b & 0x2000 != 0 {
        TempUnit::Fahrenheit
    } else {
        TempUnit::Celsius
    };

    // Сборка; нечисловой хвост — бета-маркер
    if let Some(raw) = fields.get(6) {
        let digits = raw.trim_end_matches(|c: char| !c.is_ascii_digit());
        profile.beta = digits.len() != raw.len();
        profile.build = digits.parse().unwrap_or(0);
    }
    Ok(())
}

/// `$D,id,sizeWords`
fn parse_directory_entry(fields: &[&str]) -> JpiResult<FlightDirectoryEntry> {
    let id = field_u32(fields, 1)? as u16;
    let size_words = field_u32(fields, 2)? as usize;
    Ok(FlightDirectoryEntry {
        id,
        size: size_words * 2,
        start: 0,
        found: false,
    })
}

fn field_u32(
    fields: &[&str],
    idx: usize,
) -> JpiResult<u32> {
    fields
        .get(idx)
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| JpiError::malformed(format!("bad field {idx} in {} record", fields[0])))
}

fn field_hex(
    fields: &[&str],
    idx: usize,
) -> Option<u32> {
    fields.get(idx).and_then(|f| u32::from_str_radix(f, 16).ok())
}

/// Проба смещений каталога.
///
/// Слово в начале блока должно совпадать с id полёта. Если совпадение
/// есть по смещению −1, сдвиг распространяется на все последующие блоки —
/// в снятых файлах наблюдается дрейф на один байт.
fn resolve_offsets(
    buf: &[u8],
    directory: &mut [FlightDirectoryEntry],
) {
    let cur = DecodeCursor::new(buf);
    let mut shift: isize = 0;

    for entry in directory.iter_mut() {
        let nominal = (entry.start as isize + shift).max(0) as usize;
        entry.start = nominal;

        if cur.peek_word_at(nominal) == Some(entry.id) {
            entry.found = true;
            continue;
        }
        if nominal > 0 && cur.peek_word_at(nominal - 1) == Some(entry.id) {
            warn!("flight {}: directory offset shifted by -1", entry.id);
            entry.start = nominal - 1;
            entry.found = true;
            shift -= 1;
            continue;
        }
        warn!("flight {}: block not found at expected offset", entry.id);
        entry.found = false;
    }
}
