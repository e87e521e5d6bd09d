//! Декодер бинарных журналов полётов J.P. Instruments EDM (.JPI)
//!
//! Поддерживаются одномоторные EDM900/930; расширение на другие модели —
//! через новые таблицы каналов, ядро декодера при этом не меняется.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use jpi_core::{DecodeOptions, JpiDecoder};
//!
//! let bytes = std::fs::read("U250118.JPI")?;
//! let mut decoder = JpiDecoder::parse(bytes, DecodeOptions::default())?;
//!
//! for flight in decoder.list_flights() {
//!     println!("{} {} {}", flight.id, flight.date, flight.time);
//! }
//!
//! let table = decoder.decode_flight(559)?;
//! print!("{}", table.to_csv());
//! # Ok::<(), jpi_core::JpiError>(())
//! ```

pub mod composer;
pub mod cursor;
pub mod decoder;
pub mod header;
pub mod mapping;
pub mod metadata;
pub mod record;
pub mod shaper;

pub use decoder::*;
pub use jpi_types::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
