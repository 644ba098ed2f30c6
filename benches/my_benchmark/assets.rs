use sortbench_plots::common::data_structures::{Measurement, ResultTable};
use sortbench_plots::parsing::load_results_csv;
use std::path::{Path, PathBuf};

/// Trials recorded per group in the shipped results.
const RECORDED_TRIALS: usize = 5;

pub fn mergesort_results_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/mergesort.csv")
}

pub fn get_mergesort_results() -> ResultTable {
    load_results_csv(&mergesort_results_path(), None).expect("Failed to load merge sort results")
}

/// Repeats the recorded samples so that every group holds `trials` entries.
pub fn get_scaled_results(trials: usize) -> ResultTable {
    let recorded = get_mergesort_results();
    let mut table = ResultTable::new();

    for round in 0..trials / RECORDED_TRIALS {
        for row in recorded.rows() {
            table
                .push(Measurement {
                    trial: round * RECORDED_TRIALS + row.trial,
                    ..row.clone()
                })
                .expect("Scaled trial indices are unique");
        }
    }

    table
}
