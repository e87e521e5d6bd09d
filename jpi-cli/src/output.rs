//! Сборка CSV-файлов полётов: колонка INDEX, тахометрическая строка,
//! именование выходных файлов.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use jpi_core::FlightTable;

/// Полный CSV полёта: `INDEX,DATE,TIME,…`, затем тахометрическая строка,
/// затем нумерованные с единицы строки данных.
pub fn compose_csv(table: &FlightTable) -> String {
    let mut out = String::new();
    out.push_str("INDEX,");
    out.push_str(&table.headers.join(","));
    out.push('\n');
    out.push_str(&tach_line(table));
    out.push('\n');
    for (i, row) in table.rows.iter().enumerate() {
        out.push_str(&format!("{},{}\n", i + 1, row.join(",")));
    }
    out
}

/// Тахометрическая сводка по колонке HRS (LHRS у левого двигателя).
pub fn tach_line(table: &FlightTable) -> String {
    let (start, end) = tach_bounds(table);
    format!(
        "Engine - Tach Start = {start:.1},Tach End = {end:.1},Tach Duration = {:.1}",
        ((end - start) * 10.0).round() / 10.0
    )
}

/// Первое и последнее не-NA значение тахометра.
fn tach_bounds(table: &FlightTable) -> (f64, f64) {
    let Some(ci) = table
        .headers
        .iter()
        .position(|h| h == "HRS" || h == "LHRS")
    else {
        return (0.0, 0.0);
    };
    let mut values = table.rows.iter().filter_map(|r| {
        let t = r[ci].trim();
        if t.is_empty() || t == "NA" {
            None
        } else {
            t.parse::<f64>().ok()
        }
    });
    let start = values.next().unwrap_or(0.0);
    let end = values.last().unwrap_or(start);
    (start, end)
}

/// Имя выходного файла вида `<base>.flt<id>.csv`.
pub fn flight_file_name(
    input: &Path,
    id: u16,
) -> String {
    let base = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("flight");
    format!("{base}.flt{id}.csv")
}

pub fn write_csv(
    path: &Path,
    csv: &str,
) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(csv.as_bytes())?;
    writer.flush()?;
    Ok(())
}
