//! Разбор фиксированной преамбулы полёта.

use chrono::{NaiveDate, NaiveTime};

use jpi_types::{DeviceProfile, FlightDirectoryEntry, FlightPrelude, JpiError, JpiResult};

use crate::cursor::DecodeCursor;

/// Разбирает преамбулу полёта; курсор должен стоять на `entry.start`.
///
/// После возврата курсор стоит на первой бинарной записи (`rec_start`).
pub fn parse_prelude(
    cur: &mut DecodeCursor,
    profile: &DeviceProfile,
    entry: &FlightDirectoryEntry,
) -> JpiResult<FlightPrelude> {
    let id = need_word(cur)?;
    if id != entry.id {
        return Err(JpiError::corrupt_header(format!(
            "flight id mismatch: directory {}, block {id}",
            entry.id
        )));
    }

    let mut cfg = [0u16; 5];
    cfg[0] = need_word(cur)?;
    cfg[1] = need_word(cur)?;
    if profile.edm_type {
        cfg[2] = need_word(cur)?;
        cfg[3] = need_word(cur)?;
        cfg[4] = need_word(cur)?;
    }

    // Стартовые координаты пишут только EDM900 свежих сборок с GPS-каналами
    let mut lat_seed = None;
    let mut lng_seed = None;
    if profile.model == 900 && profile.build >= 1000 && cfg[4] & 0x78 != 0 {
        lat_seed = cur.long();
        lng_seed = cur.long();
    }

    let fuel_unit = need_byte(cur)?;
    let horsepower = need_byte(cur)?;
    let interval_secs = need_word(cur)?;
    let date = unpack_date(need_word(cur)?)?;
    let time = unpack_time(need_word(cur)?)?;

    // Контрольный байт преамбулы потребляется, но не проверяется
    need_byte(cur)?;

    Ok(FlightPrelude {
        id,
        cfg,
        lat_seed,
        lng_seed,
        fuel_unit,
        horsepower,
        interval_secs,
        date,
        time,
        rec_start: cur.pos(),
    })
}

/// Упакованная дата: день — биты 0–4, месяц — 5–8, смещение года — 9–15.
fn unpack_date(w: u16) -> JpiResult<NaiveDate> {
    let day = (w & 0x1F) as u32;
    let month = (w >> 5 & 0x0F) as u32;
    let offset = (w >> 9) as i32;
    let year = if offset >= 75 { 1900 + offset } else { 2000 + offset };
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| JpiError::corrupt_header(format!("impossible packed date {w:#06x}")))
}

/// Упакованное время: секунды в 2-секундных тиках — биты 0–4,
/// минуты — 5–10, часы — 11–15.
fn unpack_time(w: u16) -> JpiResult<NaiveTime> {
    let secs = (w & 0x1F) as u32 * 2;
    let mins = (w >> 5 & 0x3F) as u32;
    let hours = (w >> 11) as u32;
    NaiveTime::from_hms_opt(hours, mins, secs)
        .ok_or_else(|| JpiError::corrupt_header(format!("impossible packed time {w:#06x}")))
}

fn need_word(cur: &mut DecodeCursor) -> JpiResult<u16> {
    cur.word()
        .ok_or_else(|| JpiError::corrupt_header("truncated flight header"))
}

fn need_byte(cur: &mut DecodeCursor) -> JpiResult<u8> {
    cur.byte()
        .ok_or_else(|| JpiError::corrupt_header("truncated flight header"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_date(
        year: i32,
        month: u16,
        day: u16,
    ) -> u16 {
        let offset = (if year >= 2000 { year - 2000 } else { year - 1900 }) as u16;
        offset << 9 | month << 5 | day
    }

    fn pack_time(
        h: u16,
        m: u16,
        s: u16,
    ) -> u16 {
        h << 11 | m << 5 | s / 2
    }

    fn edm900_profile() -> DeviceProfile {
        let mut p = DeviceProfile {
            firmware: 107,
            build: 1100,
            ..Default::default()
        };
        p.apply_model(900);
        p
    }

    fn entry(
        id: u16,
        size: usize,
    ) -> FlightDirectoryEntry {
        FlightDirectoryEntry {
            id,
            size,
            start: 0,
            found: true,
        }
    }

    /// Преамбула EDM-типа с заданным cfg[4] и опциональными сидами.
    fn prelude_bytes(
        id: u16,
        cfg4: u16,
        seeds: Option<[u8; 8]>,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&id.to_be_bytes());
        for w in [0x0013u16, 0x0005, 0x0000, 0x0010, cfg4] {
            out.extend_from_slice(&w.to_be_bytes());
        }
        if let Some(s) = seeds {
            out.extend_from_slice(&s);
        }
        out.push(0); // fuel unit
        out.push(180); // horsepower
        out.extend_from_slice(&6u16.to_be_bytes()); // interval
        out.extend_from_slice(&pack_date(2025, 1, 18).to_be_bytes());
        out.extend_from_slice(&pack_time(14, 2, 30).to_be_bytes());
        out.push(0x5A); // checksum
        out
    }

    #[test]
    fn test_parse_prelude_with_seeds() {
        let mut seeds = [0u8; 8];
        seeds[..4].copy_from_slice(&209_678_i32.to_be_bytes());
        seeds[4..].copy_from_slice(&(-711_025_i32).to_be_bytes());
        let bytes = prelude_bytes(559, 0x009B, Some(seeds));

        let mut cur = DecodeCursor::new(&bytes);
        let p = parse_prelude(&mut cur, &edm900_profile(), &entry(559, bytes.len())).unwrap();

        assert_eq!(p.id, 559);
        assert_eq!(p.cfg, [0x0013, 0x0005, 0x0000, 0x0010, 0x009B]);
        assert_eq!(p.lat_seed, Some(209_678));
        assert_eq!(p.lng_seed, Some(-711_025));
        assert_eq!(p.fuel_unit, 0);
        assert_eq!(p.horsepower, 180);
        assert_eq!(p.interval_secs, 6);
        assert_eq!(p.date.format("%m/%d/%Y").to_string(), "01/18/2025");
        assert_eq!(p.time.format("%H:%M:%S").to_string(), "14:02:30");
        assert_eq!(p.rec_start, bytes.len());
    }

    #[test]
    fn test_no_seeds_without_gps_channels() {
        // cfg[4] без GPS-битов — координаты не читаются
        let bytes = prelude_bytes(12, 0x0000, None);
        let mut cur = DecodeCursor::new(&bytes);
        let p = parse_prelude(&mut cur, &edm900_profile(), &entry(12, bytes.len())).unwrap();
        assert_eq!(p.lat_seed, None);
        assert_eq!(p.lng_seed, None);
        assert_eq!(p.rec_start, bytes.len());
    }

    #[test]
    fn test_no_seeds_for_old_build() {
        let mut profile = edm900_profile();
        profile.build = 900;
        let bytes = prelude_bytes(12, 0x009B, None);
        let mut cur = DecodeCursor::new(&bytes);
        let p = parse_prelude(&mut cur, &profile, &entry(12, bytes.len())).unwrap();
        assert_eq!(p.lat_seed, None);
    }

    #[test]
    fn test_underflow_seed_left_unset() {
        // Образец 0x80000000 — not-a-number, сид не ставится
        let mut seeds = [0u8; 8];
        seeds[..4].copy_from_slice(&[0x80, 0, 0, 0]);
        seeds[4..].copy_from_slice(&(-711_025_i32).to_be_bytes());
        let bytes = prelude_bytes(559, 0x009B, Some(seeds));

        let mut cur = DecodeCursor::new(&bytes);
        let p = parse_prelude(&mut cur, &edm900_profile(), &entry(559, bytes.len())).unwrap();
        assert_eq!(p.lat_seed, None);
        assert_eq!(p.lng_seed, Some(-711_025));
    }

    #[test]
    fn test_id_mismatch() {
        let bytes = prelude_bytes(559, 0, None);
        let mut cur = DecodeCursor::new(&bytes);
        let err = parse_prelude(&mut cur, &edm900_profile(), &entry(560, bytes.len())).unwrap_err();
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = prelude_bytes(559, 0, None);
        let mut cur = DecodeCursor::new(&bytes[..7]);
        assert!(parse_prelude(&mut cur, &edm900_profile(), &entry(559, 7)).is_err());
    }

    #[test]
    fn test_legacy_prelude_skips_cfg_tail() {
        // Не-EDM-тип: только два конфигурационных слова
        let mut profile = DeviceProfile {
            firmware: 107,
            ..Default::default()
        };
        profile.apply_model(800);

        let mut out = Vec::new();
        out.extend_from_slice(&7u16.to_be_bytes());
        out.extend_from_slice(&0x0013u16.to_be_bytes());
        out.extend_from_slice(&0x0005u16.to_be_bytes());
        out.push(1);
        out.push(160);
        out.extend_from_slice(&2u16.to_be_bytes());
        out.extend_from_slice(&pack_date(1999, 12, 31).to_be_bytes());
        out.extend_from_slice(&pack_time(23, 59, 58).to_be_bytes());
        out.push(0);

        let mut cur = DecodeCursor::new(&out);
        let p = parse_prelude(&mut cur, &profile, &entry(7, out.len())).unwrap();
        assert_eq!(p.cfg[2..], [0, 0, 0]);
        assert_eq!(p.date.format("%m/%d/%Y").to_string(), "12/31/1999");
        assert_eq!(p.time.format("%H:%M:%S").to_string(), "23:59:58");
    }

    #[test]
    fn test_year_pivot() {
        assert_eq!(
            unpack_date(pack_date(1975, 1, 1)).unwrap().format("%Y").to_string(),
            "1975"
        );
        assert_eq!(
            unpack_date(pack_date(2074, 1, 1)).unwrap().format("%Y").to_string(),
            "2074"
        );
    }

    #[test]
    fn test_impossible_date() {
        // Месяц 0
        assert!(unpack_date(0x0001).is_err());
        // Час 24 и выше
        assert!(unpack_time(24 << 11).is_err());
    }
}
