//! Таблица каналов профиля EDM900/930 (прошивка ≥ 107).
//!
//! Таблица — данные, а не поток управления: порядок вставки задаёт порядок
//! колонок, адреса байтов согласованы с весовой таблицей потока в
//! [`crate::record`]. Другие прошивки получают свои таблицы, ядро декодера
//! при этом не меняется.

use jpi_types::{ByteAddr, DeviceProfile, JpiError, JpiResult, SensorDescriptor, SensorKind};

/// Минимальная поддерживаемая прошивка профиля EDM900/930.
pub const MIN_FIRMWARE: u32 = 107;

/// Строит список каналов для профиля устройства.
///
/// `fuel_unit` берётся из преамбулы полёта: в галлонах топливные каналы
/// выводятся с одним десятичным знаком, иначе целыми.
pub fn sensor_table(
    profile: &DeviceProfile,
    fuel_unit: u8,
) -> JpiResult<Vec<SensorDescriptor>> {
    if profile.twin || !matches!(profile.model, 900 | 930) || profile.firmware < MIN_FIRMWARE {
        return Err(JpiError::UnsupportedModel {
            model: profile.model,
            firmware: profile.firmware,
        });
    }

    let fuel = if fuel_unit == 0 {
        SensorKind::Fixed1
    } else {
        SensorKind::Integer
    };

    Ok(vec![
        egt("egt1", "E1", 0, 0, addr(0, 0), Some(ByteAddr::new(6, 0))),
        egt("egt2", "E2", 0, 1, addr(0, 1), Some(ByteAddr::new(6, 1))),
        egt("egt3", "E3", 0, 2, addr(0, 2), Some(ByteAddr::new(6, 2))),
        egt("egt4", "E4", 0, 3, addr(0, 3), Some(ByteAddr::new(6, 3))),
        chan("cht1", "C1", 0, 4, SensorKind::Integer, addr(1, 0), None),
        chan("cht2", "C2", 0, 5, SensorKind::Integer, addr(1, 1), None),
        chan("cht3", "C3", 0, 6, SensorKind::Integer, addr(1, 2), None),
        chan("cht4", "C4", 0, 7, SensorKind::Integer, addr(1, 3), None),
        chan("oat", "OAT", 1, 0, SensorKind::Integer, addr(2, 7), None),
        // Вычисляется из EGT текущей записи; включён вместе с ними
        chan("dif", "DIF", 0, 0, SensorKind::Computed, None, None),
        chan("cld", "CLD", 1, 1, SensorKind::Integer, addr(2, 6), None),
        chan("map", "MAP", 2, 0, SensorKind::Fixed1, addr(4, 0), None),
        chan(
            "rpm",
            "RPM",
            2,
            1,
            SensorKind::Integer,
            addr(4, 1),
            Some(ByteAddr::new(5, 2)),
        ),
        chan("hp", "HP", 2, 2, SensorKind::Integer, addr(4, 2), None),
        chan("ff", "FF", 2, 3, fuel, addr(4, 3), None),
        chan("ff2", "FF2", 2, 4, fuel, addr(4, 4), None),
        chan("fp", "FP", 2, 5, SensorKind::Fixed1, addr(4, 5), None),
        chan("oilp", "OILP", 2, 6, SensorKind::Integer, addr(4, 6), None),
        chan("bat", "BAT", 1, 2, SensorKind::Fixed1, addr(2, 0), None),
        chan("amp", "AMP", 1, 3, SensorKind::Integer, addr(2, 1), None),
        chan("oilt", "OILT", 1, 4, SensorKind::Integer, addr(2, 2), None),
        chan("usd", "USD", 3, 0, fuel, addr(8, 0), None),
        chan("usd2", "USD2", 3, 1, fuel, addr(8, 1), None),
        chan("rfl", "RFL", 3, 2, fuel, addr(8, 2), None),
        chan("lfl", "LFL", 3, 3, fuel, addr(8, 3), None),
        chan(
            "hrs",
            "HRS",
            3,
            4,
            SensorKind::Fixed1,
            addr(10, 0),
            Some(ByteAddr::new(10, 1)),
        ),
        chan("spd", "SPD", 4, 0, SensorKind::Integer, addr(9, 0), None),
        chan(
            "alt",
            "ALT",
            4,
            1,
            SensorKind::Integer,
            addr(9, 1),
            Some(ByteAddr::new(9, 7)),
        ),
        chan(
            "lat",
            "LAT",
            4,
            3,
            SensorKind::Latitude,
            addr(9, 2),
            Some(ByteAddr::new(9, 4)),
        ),
        chan(
            "lng",
            "LNG",
            4,
            4,
            SensorKind::Longitude,
            addr(9, 3),
            Some(ByteAddr::new(9, 5)),
        ),
        chan("mark", "MARK", 4, 7, SensorKind::Mark, addr(13, 7), None),
    ])
}

fn addr(
    group: u8,
    bit: u8,
) -> Option<ByteAddr> {
    Some(ByteAddr::new(group, bit))
}

fn chan(
    name: &'static str,
    header: &'static str,
    cfg_word: usize,
    cfg_bit: u8,
    kind: SensorKind,
    lo: Option<ByteAddr>,
    hi: Option<ByteAddr>,
) -> SensorDescriptor {
    SensorDescriptor {
        name,
        header,
        cfg_word,
        cfg_bit,
        kind,
        lo,
        hi,
        egt: false,
    }
}

fn egt(
    name: &'static str,
    header: &'static str,
    cfg_word: usize,
    cfg_bit: u8,
    lo: Option<ByteAddr>,
    hi: Option<ByteAddr>,
) -> SensorDescriptor {
    SensorDescriptor {
        egt: true,
        ..chan(name, header, cfg_word, cfg_bit, SensorKind::Integer, lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edm900() -> DeviceProfile {
        let mut p = DeviceProfile {
            firmware: 107,
            ..Default::default()
        };
        p.apply_model(900);
        p
    }

    #[test]
    fn test_column_order() {
        let table = sensor_table(&edm900(), 0).unwrap();
        let headers: Vec<&str> = table.iter().map(|d| d.header).collect();
        assert_eq!(
            headers,
            [
                "E1", "E2", "E3", "E4", "C1", "C2", "C3", "C4", "OAT", "DIF", "CLD", "MAP",
                "RPM", "HP", "FF", "FF2", "FP", "OILP", "BAT", "AMP", "OILT", "USD", "USD2",
                "RFL", "LFL", "HRS", "SPD", "ALT", "LAT", "LNG", "MARK"
            ]
        );
    }

    #[test]
    fn test_addresses_in_bounds() {
        let table = sensor_table(&edm900(), 0).unwrap();
        for d in &table {
            for a in d.lo.iter().chain(d.hi.iter()) {
                assert!(a.group < 16, "{}: group {}", d.name, a.group);
                assert!(a.bit < 8, "{}: bit {}", d.name, a.bit);
            }
        }
    }

    #[test]
    fn test_computed_has_no_source() {
        let table = sensor_table(&edm900(), 0).unwrap();
        let dif = table.iter().find(|d| d.header == "DIF").unwrap();
        assert_eq!(dif.kind, SensorKind::Computed);
        assert!(dif.lo.is_none() && dif.hi.is_none());
        // DIF включается вместе с E1
        let e1 = table.iter().find(|d| d.header == "E1").unwrap();
        assert_eq!((dif.cfg_word, dif.cfg_bit), (e1.cfg_word, e1.cfg_bit));
    }

    #[test]
    fn test_fuel_unit_switches_kind() {
        let gallons = sensor_table(&edm900(), 0).unwrap();
        let pounds = sensor_table(&edm900(), 1).unwrap();
        for header in ["FF", "FF2", "USD", "USD2", "RFL", "LFL"] {
            let g = gallons.iter().find(|d| d.header == header).unwrap();
            let p = pounds.iter().find(|d| d.header == header).unwrap();
            assert_eq!(g.kind, SensorKind::Fixed1, "{header}");
            assert_eq!(p.kind, SensorKind::Integer, "{header}");
        }
    }

    #[test]
    fn test_two_byte_channels() {
        let table = sensor_table(&edm900(), 0).unwrap();
        for header in ["E1", "E2", "E3", "E4", "RPM", "HRS", "ALT", "LAT", "LNG"] {
            let d = table.iter().find(|d| d.header == header).unwrap();
            assert!(d.hi.is_some(), "{header} должен иметь старший байт");
        }
    }

    #[test]
    fn test_unsupported_profiles() {
        let mut twin = DeviceProfile {
            firmware: 108,
            ..Default::default()
        };
        twin.apply_model(760);
        assert!(sensor_table(&twin, 0).is_err());

        let mut old_fw = edm900();
        old_fw.firmware = 106;
        assert!(sensor_table(&old_fw, 0).is_err());

        let mut unknown = DeviceProfile {
            firmware: 108,
            ..Default::default()
        };
        unknown.apply_model(800);
        assert!(sensor_table(&unknown, 0).is_err());
    }

    #[test]
    fn test_edm930_supported() {
        let mut p = DeviceProfile {
            firmware: 108,
            ..Default::default()
        };
        p.apply_model(930);
        assert_eq!(sensor_table(&p, 0).unwrap().len(), 31);
    }

    #[test]
    fn test_gating_by_cfg_words() {
        let table = sensor_table(&edm900(), 0).unwrap();
        let mut cfg = [0u16; 5];
        cfg[0] = 0x0003; // E1, E2
        cfg[4] = 0x0098; // LAT, LNG, MARK
        let configured: Vec<&str> = table
            .iter()
            .filter(|d| d.is_configured(&cfg))
            .map(|d| d.header)
            .collect();
        assert_eq!(configured, ["E1", "E2", "DIF", "LAT", "LNG", "MARK"]);
    }
}
