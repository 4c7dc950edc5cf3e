use anyhow::{Context, Result};
use cellsim_common::{CellRecord, SimulationConfig, Snapshot};
use cellsim_engine::{run_series, ReplicateResult};
use log::{debug, error, info};
use std::fs::File;
use std::io::Write;
use std::time::Instant;

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Cell Behavior Engine...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SimulationConfig::load(&config_path)?;
    info!(
        "Loaded '{}': {} ticks, {} population(s), {} initial cells, {} replicate(s).",
        config_path,
        config.timing.total_ticks,
        config.populations.len(),
        config.initial_cell_count(),
        config.initial_conditions.replicates
    );
    debug!("Configuration: {:#?}", config);

    // --- Run Replicates ---
    let start_time = Instant::now();
    let results = match run_series(&config) {
        Ok(results) => results,
        Err(e) => {
            error!("Simulation failed: {:#}", e);
            return Err(e);
        }
    };
    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished in {:.3} seconds ({:.3} minutes).",
        total_duration.as_secs_f64(),
        total_duration.as_secs_f64() / 60.0
    );

    // --- Save Recorded Data ---
    let base = &config.output.base_filename;
    if config.output.save_stats {
        let snapshots: Vec<&Snapshot> = results.iter().flat_map(|r| r.snapshots.iter()).collect();
        let format = config.output.format.as_deref().unwrap_or("json");
        write_snapshots(base, format, &snapshots)?;
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if config.output.save_cells {
        write_cells(base, &results)?;
    } else {
        info!("Skipping saving final cells as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

fn write_snapshots(base: &str, format: &str, snapshots: &[&Snapshot]) -> Result<()> {
    match format {
        "bincode" => {
            // Binary format (much more compact)
            let filename = format!("{}_snapshots.bin", base);
            let file = File::create(&filename).with_context(|| format!("creating '{}'", filename))?;
            bincode::serialize_into(file, snapshots).context("serializing snapshots to bincode")?;
            info!("All snapshots saved to {} (binary format)", filename);
        }
        "messagepack" => {
            // MessagePack format (compact and cross-platform)
            let filename = format!("{}_snapshots.msgpack", base);
            let mut file = File::create(&filename).with_context(|| format!("creating '{}'", filename))?;
            rmp_serde::encode::write(&mut file, snapshots).context("serializing snapshots to MessagePack")?;
            info!("All snapshots saved to {} (MessagePack format)", filename);
        }
        other => {
            if other != "json" {
                error!("Unknown output format: {}. Using JSON instead.", other);
            }
            let filename = format!("{}_snapshots.json", base);
            let json_string = serde_json::to_string(snapshots).context("serializing snapshots to JSON")?;
            let mut file = File::create(&filename).with_context(|| format!("creating '{}'", filename))?;
            file.write_all(json_string.as_bytes())
                .with_context(|| format!("writing '{}'", filename))?;
            info!("All snapshots saved to {} ({}MB)", filename, json_string.len() / 1_048_576);
        }
    }
    Ok(())
}

fn write_cells(base: &str, results: &[ReplicateResult]) -> Result<()> {
    let filename = format!("{}_final_cells.csv", base);
    let mut writer = csv::Writer::from_path(&filename).with_context(|| format!("creating '{}'", filename))?;
    writer.write_record([
        "replicate", "id", "parent", "population", "state", "x", "y", "volume", "energy", "age", "divisions", "cycles",
    ])?;
    for result in results {
        for cell in &result.cells {
            writer.write_record(cell_row(result.replicate, cell))?;
        }
    }
    writer.flush()?;
    info!("Final cells saved to {}", filename);
    Ok(())
}

fn cell_row(replicate: u32, cell: &CellRecord) -> Vec<String> {
    let cycles: Vec<String> = cell.cycles.iter().map(|c| c.to_string()).collect();
    vec![
        replicate.to_string(),
        cell.id.to_string(),
        cell.parent.map(|p| p.to_string()).unwrap_or_default(),
        cell.population.to_string(),
        cell.state.to_string(),
        cell.location.0.to_string(),
        cell.location.1.to_string(),
        format!("{:.4}", cell.volume),
        format!("{:.6}", cell.energy),
        cell.age.to_string(),
        cell.divisions.to_string(),
        cycles.join(";"),
    ]
}
