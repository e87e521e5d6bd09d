//! Пост-обработка строк перед выдачей таблицы полёта.
//!
//! Четыре прохода: MARK только по фронту, перенос GPS-колонок в повторах,
//! carry-forward остальных колонок, сглаживание одиночных GPS-пропусков.

use crate::shaper::NA;

/// Черновик строки до пост-обработки (вместе с `DATE`, `TIME`).
#[derive(Debug, Clone)]
pub struct RowDraft {
    pub cells: Vec<String>,
    /// Строка порождена mult-повтором
    pub repeat: bool,
}

/// Колонки, которые переносит только повтор, но не carry-forward.
const GPS_COLUMNS: [&str; 4] = ["LAT", "LNG", "SPD", "ALT"];

/// Применяет пост-проходы к черновикам строк.
pub fn compose(
    headers: &[String],
    drafts: Vec<RowDraft>,
) -> Vec<Vec<String>> {
    let mark_idx = headers.iter().position(|h| h == "MARK");
    let gps_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| GPS_COLUMNS.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();
    let lat_idx = headers.iter().position(|h| h == "LAT");
    let lng_idx = headers.iter().position(|h| h == "LNG");

    // MARK сравнивается с сырым значением предыдущей строки,
    // иначе серия одинаковых глифов даёт фронт через строку
    let raw_marks: Vec<String> = match mark_idx {
        Some(mi) => drafts.iter().map(|d| d.cells[mi].clone()).collect(),
        None => Vec::new(),
    };

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(drafts.len());
    for (i, draft) in drafts.into_iter().enumerate() {
        let mut cells = draft.cells;

        if i > 0 {
            // 1. MARK только по фронту; первая строка хранит свой глиф
            if let Some(mi) = mark_idx {
                if cells[mi] == raw_marks[i - 1] {
                    cells[mi].clear();
                }
            }

            let prev = &rows[i - 1];

            // 2. Повтор переносит GPS-колонки явно
            if draft.repeat {
                for &ci in &gps_idx {
                    if is_absent(&cells[ci]) {
                        cells[ci] = prev[ci].clone();
                    }
                }
            }

            // 3. Carry-forward всех прочих колонок
            for ci in 2..cells.len() {
                if Some(ci) == mark_idx || gps_idx.contains(&ci) {
                    continue;
                }
                if is_absent(&cells[ci]) {
                    cells[ci] = prev[ci].clone();
                }
            }
        }

        rows.push(cells);
    }

    // 4. Одиночный GPS-пропуск между двумя валидными соседями
    for ci in [lat_idx, lng_idx].into_iter().flatten() {
        for i in 1..rows.len().saturating_sub(1) {
            if is_absent(&rows[i][ci])
                && !is_absent(&rows[i - 1][ci])
                && !is_absent(&rows[i + 1][ci])
            {
                rows[i][ci] = rows[i - 1][ci].clone();
            }
        }
    }

    rows
}

fn is_absent(cell: &str) -> bool {
    cell.is_empty() || cell == NA
}
