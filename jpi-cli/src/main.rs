use std::{error::Error, fs, path::PathBuf};

use clap::Parser;
use jpi_cli::{compose_csv, flight_file_name, parse_targets, write_csv, Cli, Targets};
use jpi_core::{DecodeOptions, JpiDecoder};
use log::{error, info, warn};

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet { "error" } else { "info" };

    env_logger::Builder::new()
        .filter_level(level.parse().unwrap())
        .format_target(false)
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let targets = parse_targets(&cli.targets)?;

    let bytes = fs::read(&cli.file)?;
    let mut decoder = JpiDecoder::parse(
        bytes,
        DecodeOptions {
            strict_checksums: cli.strict,
        },
    )?;

    if targets.ids.is_empty() {
        return list(&mut decoder, &cli);
    }
    if targets.ids.len() == 1 {
        return export_one(&mut decoder, &cli, targets.ids[0], targets.out);
    }
    export_many(&mut decoder, &cli, &targets)
}

/// `decodejpi <file>` — таблица полётов; `--json` и `--summary` дают JSON.
fn list(
    decoder: &mut JpiDecoder,
    cli: &Cli,
) -> Result<(), Box<dyn Error>> {
    if cli.summary {
        let summaries = decoder.summarize_flights()?;
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    let flights = decoder.list_flights();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&flights)?);
        return Ok(());
    }

    let p = decoder.profile();
    info!(
        "{} — EDM{} fw {} ({} flights)",
        p.registration,
        p.model,
        p.firmware,
        flights.len()
    );
    println!("{:>5}  {:>10}  {:>8}  {:>8}  {:>4}", "ID", "DATE", "TIME", "SIZE", "INT");
    for f in &flights {
        println!(
            "{:>5}  {:>10}  {:>8}  {:>8}  {:>4}",
            f.id, f.date, f.time, f.size, f.interval
        );
    }
    Ok(())
}

/// `decodejpi <file> <id> [out.csv]` — CSV одного полёта.
fn export_one(
    decoder: &mut JpiDecoder,
    cli: &Cli,
    id: u16,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let table = decoder.decode_flight(id)?;
    let csv = compose_csv(&table);

    if let Some(golden) = &cli.golden {
        let expected = fs::read(golden)?;
        if expected != csv.as_bytes() {
            return Err(format!("golden mismatch against {}", golden.display()).into());
        }
        info!("golden match: {}", golden.display());
    }

    let path = out.unwrap_or_else(|| PathBuf::from(flight_file_name(&cli.file, id)));
    write_csv(&path, &csv)?;
    info!("flight {id}: {} rows -> {}", table.rows.len(), path.display());
    report_mismatches(decoder);
    Ok(())
}

/// `decodejpi <file> <id> <id>… [outDir]` — по файлу на полёт.
fn export_many(
    decoder: &mut JpiDecoder,
    cli: &Cli,
    targets: &Targets,
) -> Result<(), Box<dyn Error>> {
    // Каталог используется только если существует, иначе пишем в рабочий
    let dir = targets
        .out
        .clone()
        .filter(|d| d.is_dir())
        .unwrap_or_else(|| PathBuf::from("."));
    if let Some(requested) = &targets.out {
        if !requested.is_dir() {
            warn!("{} is not a directory, writing to cwd", requested.display());
        }
    }

    let mut failed = 0usize;
    for &id in &targets.ids {
        match decoder.decode_flight(id) {
            Ok(table) => {
                let path = dir.join(flight_file_name(&cli.file, id));
                write_csv(&path, &compose_csv(&table))?;
                info!("flight {id}: {} rows -> {}", table.rows.len(), path.display());
            }
            Err(e) => {
                error!("flight {id}: {e}");
                failed += 1;
            }
        }
    }
    report_mismatches(decoder);

    if failed > 0 {
        return Err(format!("{failed} flight(s) failed to decode").into());
    }
    Ok(())
}

fn report_mismatches(decoder: &JpiDecoder) {
    let mismatches = decoder.stats().checksum_mismatches;
    if mismatches > 0 {
        warn!("{mismatches} record checksum mismatch(es) tolerated");
    }
}
