// Entry point and high-level CLI flow.
//
// - Option [1] loads the four startup tables and builds the unified model.
// - Option [2] writes the provincial rollup, leaderboards, complexity levels
//   and a JSON summary, printing a short preview of each.
// - After generating reports, the user can go back to the menu or exit.
use pdi_model::config::Config;
use pdi_model::error::PdiError;
use pdi_model::logging;
use pdi_model::output;
use pdi_model::scope::ScopeDescriptor;
use pdi_model::source::DirSource;
use pdi_model::store::DataStore;
use pdi_model::types::{Direction, ThemeSelection};
use pdi_model::util::{format_int, format_number};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::error;

type Store = DataStore<DirSource>;

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load the startup tables.
fn handle_load(store: &Store) {
    if store.is_loaded() {
        println!("Data already loaded.\n");
        return;
    }
    match store.load() {
        Ok(ds) => {
            println!(
                "Processing dataset... ({} municipalities mapped, {} joined)",
                format_int(ds.mapped_municipalities),
                format_int(ds.model.records.len())
            );
            println!(
                "Note: {} rows skipped for a missing municipality code.",
                format_int(ds.model.skipped_rows)
            );
            println!(
                "Info: {} PDI rows, {} theme columns, {} indicators.\n",
                format_int(ds.pdi_rows),
                ds.model.theme_columns.len(),
                format_int(ds.indicators.len())
            );
        }
        Err(e @ PdiError::LoadFailed(_)) => {
            eprintln!("{}. Restart the program to try again.\n", e);
        }
        Err(e) => {
            error!(error = %e, "startup load failed");
            eprintln!("Failed to load data: {}\n", e);
        }
    }
}

fn export<T: serde::Serialize>(dir: &Path, file: &str, rows: &[T]) -> PathBuf {
    let path = dir.join(file);
    if let Err(e) = output::write_csv(&path, rows) {
        eprintln!("Write error: {}", e);
    }
    path
}

/// Handle option [2]: generate all reports and the JSON summary.
fn handle_generate_reports(store: &Store) -> pdi_model::error::Result<()> {
    if !store.is_loaded() {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
        return Ok(());
    }
    let config = store.config();
    let out_dir = config.output_dir.as_path();
    let national = ScopeDescriptor::national();
    let all = ThemeSelection::All;

    println!("Generating reports...");
    println!("Outputs saved to individual files...\n");

    let rollup = store.provincial_rollup(&national, &all, None)?;
    let r1 = output::province_rows(&rollup);
    let file1 = export(out_dir, "report1_provincial_rollup.csv", &r1);
    println!("Report 1: Provincial Theme and Complexity Rollup");
    println!("({}; {})\n", all.label(), national.describe());
    output::preview_table_rows(&r1, 5);
    println!("(Full table exported to {})\n", file1.display());

    let limit = config.leaderboard_limit;
    let top = store.rank(&national, &all, None, Direction::Top, limit)?;
    let bottom = store.rank(&national, &all, None, Direction::Bottom, limit)?;
    let top = output::leaderboard_rows(&top);
    let bottom = output::leaderboard_rows(&bottom);
    let file2 = export(out_dir, "report2_top_municipalities.csv", &top);
    let file2b = export(out_dir, "report2_bottom_municipalities.csv", &bottom);
    println!("Report 2: Municipality Leaderboards");
    println!("(Composite theme score; scores of 0 are treated as no data)\n");
    output::preview_table_rows(&top, 3);
    output::preview_table_rows(&bottom, 3);
    println!(
        "(Full tables exported to {} and {})\n",
        file2.display(),
        file2b.display()
    );

    let levels = store.complexity_levels(&national)?;
    let r3 = output::level_rows(&levels);
    let file3 = export(out_dir, "report3_complexity_levels.csv", &r3);
    println!("Report 3: PDI Complexity Distribution\n");
    output::preview_table_rows(&r3, 5);
    let pdi_values: Vec<f64> = store.unified_model()?.iter().filter_map(|r| r.pdi).collect();
    let hist = store.histogram_buckets(&pdi_values, config.histogram_bins);
    println!(
        "PDI histogram [{} .. {}]: {:?}",
        format_number(hist.min, 3),
        format_number(hist.max, 3),
        hist.counts
    );
    println!("(Full table exported to {})\n", file3.display());

    let overview = store.overview()?;
    let aggregate = store.aggregate(&national, &config.theme_keys, config.high_threshold)?;
    let summary = output::summary_stats(
        &overview,
        &aggregate,
        rollup.len(),
        config.high_threshold,
    );
    if let Err(e) = output::write_json(&out_dir.join("summary.json"), &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"avg_pdi\": {}, \"high_complexity\": {}}}\n",
        format_number(summary.avg_pdi, 3),
        summary.high_complexity_count
    );
    Ok(())
}

fn main() {
    let config_path =
        std::env::var("PDI_CONFIG").unwrap_or_else(|_| "pdi_config.json".to_string());
    let config = match Config::load(Path::new(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}; using defaults", e);
            Config::default()
        }
    };
    logging::init(&config.log_level);

    let store = DataStore::new(DirSource::new(&config.data_dir), config);

    loop {
        println!("Select an option:");
        println!("[1] Load the data");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            break;
        };
        match choice.as_str() {
            "1" => {
                handle_load(&store);
            }
            "2" => {
                println!();
                if let Err(e) = handle_generate_reports(&store) {
                    eprintln!("Report error: {}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
