use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "decodejpi",
    version = env!("CARGO_PKG_VERSION"),
    about = "Decode J.P. Instruments EDM .JPI flight logs to CSV",
    long_about = None,
)]
pub struct Cli {
    /// Входной .JPI файл
    pub file: PathBuf,
    /// Номера полётов; последним аргументом может идти путь вывода
    /// (CSV-файл для одного полёта, каталог для нескольких)
    pub targets: Vec<String>,
    /// Список полётов в формате JSON
    #[arg(long)]
    pub json: bool,
    /// Сводки полётов в формате JSON
    #[arg(long)]
    pub summary: bool,
    /// Сравнить построенный CSV с эталонным файлом (один полёт)
    #[arg(long, value_name = "FILE")]
    pub golden: Option<PathBuf>,
    /// Строгая проверка контрольных сумм записей
    #[arg(long)]
    pub strict: bool,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Разобранные позиционные цели: номера полётов + путь вывода.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct Targets {
    pub ids: Vec<u16>,
    pub out: Option<PathBuf>,
}

/// Числовые аргументы — номера полётов; единственный нечисловой хвост —
/// путь вывода.
pub fn parse_targets(raw: &[String]) -> Result<Targets, String> {
    let mut targets = Targets::default();
    for (i, arg) in raw.iter().enumerate() {
        match arg.parse::<u16>() {
            Ok(id) => targets.ids.push(id),
            Err(_) => {
                if i + 1 != raw.len() {
                    return Err(format!("'{arg}' is not a flight id"));
                }
                targets.out = Some(PathBuf::from(arg));
            }
        }
    }
    if targets.ids.is_empty() && targets.out.is_some() {
        return Err("output path given without flight ids".to_string());
    }
    Ok(targets)
}
