/// Единица измерения температуры.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// Единица измерения топлива (запись `$F`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FuelUnit {
    /// Галлоны — топливные каналы выводятся с одним десятичным знаком
    #[default]
    Gallon = 0,
    /// Фунты
    Pound = 1,
    /// Литры
    Litre = 2,
    /// Килограммы
    Kilogram = 3,
}

impl FuelUnit {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => FuelUnit::Gallon,
            1 => FuelUnit::Pound,
            2 => FuelUnit::Litre,
            _ => FuelUnit::Kilogram,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Протокол контрольных сумм бинарных записей.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumProtocol {
    /// XOR всех байтов записи (legacy-протокол)
    #[default]
    Xor,
    /// Сумма по модулю 256: запись вместе с контрольным байтом даёт 0
    Sum,
}

/// Профиль устройства, собранный из ASCII-заголовка (`$C`/`$F`/`$P`/`$U`).
///
/// Создаётся один раз на файл и далее не меняется.
#[derive(Debug, Clone, Default)]
pub struct DeviceProfile {
    /// Код модели (760, 900, 930, ...)
    pub model: u32,
    /// Версия прошивки
    pub firmware: u32,
    /// Номер сборки прошивки
    pub build: u32,
    /// Бета-маркер сборки
    pub beta: bool,
    /// Двухмоторная модель (760/790/960)
    pub twin: bool,
    /// Модель EDM930
    pub edm930: bool,
    /// EDM-тип (модель ≥ 900 либо принудительно по `$P`)
    pub edm_type: bool,
    /// Единица температур двигателя
    pub engine_temp_unit: TempUnit,
    /// Единица наружной температуры
    pub oat_unit: TempUnit,
    /// Единица топлива из `$F`
    pub fuel_unit: FuelUnit,
    /// Протокол контрольных сумм записей
    pub checksum_protocol: ChecksumProtocol,
    /// Регистрация борта / имя пользователя из `$U`
    pub registration: String,
    /// Старший байт первого конфигурационного значения `$C`
    pub cfg_high: u8,
    /// Младший байт первого конфигурационного значения `$C`
    pub cfg_low: u8,
}

impl DeviceProfile {
    /// Выставляет модель и производные от неё флаги.
    pub fn apply_model(
        &mut self,
        model: u32,
    ) {
        self.model = model;
        self.twin = matches!(model, 760 | 790 | 960);
        self.edm930 = model == 930;
        if model >= 900 {
            self.edm_type = true;
        }
    }
}
