use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use log::debug;

use crate::error::EpiError;
use crate::simulation::{SimState, Simulation};

// Checks that the path is a CSV file and creates its parent directories.
fn generate_validate_filepath(path: &Path) -> Result<File, EpiError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            Ok(File::create(path)?)
        }
        _ => Err(EpiError::ReportError(format!(
            "Report output files must be CSVs at this time; got {}",
            path.display()
        ))),
    }
}

/// Writes the result series of `state` to `path`: a `t` column followed by one column per
/// series, one row per time point.
///
/// # Errors
///
/// [`EpiError::ReportError`] if `path` is not a `.csv` file, and any I/O or CSV error.
pub fn write_results_csv(path: &Path, state: &SimState) -> Result<(), EpiError> {
    let file = generate_validate_filepath(path)?;
    let mut writer = Writer::from_writer(file);
    let results = state.results();

    let mut header = vec!["t".to_string()];
    header.extend(results.keys().map(ToString::to_string));
    writer.write_record(&header)?;

    for (i, t) in state.tvec().into_iter().enumerate() {
        let mut row = vec![t.to_string()];
        for (_, values) in results.iter() {
            row.push(values.get(i).map_or_else(String::new, ToString::to_string));
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    debug!("wrote results to {}", path.display());
    Ok(())
}

/// Writes one `<prefix>_<index>.csv` file per simulation into `directory` and returns the paths.
///
/// # Errors
///
/// See [`write_results_csv`].
pub fn write_batch_results<M>(
    directory: &Path,
    prefix: &str,
    sims: &[Simulation<M>],
) -> Result<Vec<PathBuf>, EpiError> {
    sims.iter()
        .enumerate()
        .map(|(index, sim)| {
            let path = directory.join(format!("{prefix}_{index}.csv"));
            write_results_csv(&path, sim.state())?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BaseModel;
    use crate::parameters::SimParameters;
    use tempfile::tempdir;

    fn sim() -> Simulation<BaseModel> {
        let mut pars = SimParameters::default();
        pars.n_days = 2;
        let mut sim = Simulation::new(pars, BaseModel);
        let results = sim.state_mut().results_mut();
        results.add_series("cases", 3);
        results.add_series("deaths", 3);
        results
            .series_mut("cases")
            .unwrap()
            .copy_from_slice(&[1.0, 2.5, 4.0]);
        sim
    }

    #[test]
    fn writes_one_row_per_time_point() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("results.csv");
        write_results_csv(&path, sim().state()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(headers, vec!["t", "cases", "deaths"]);
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|record| record.unwrap().iter().map(ToString::to_string).collect())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["1", "2.5", "0"]);
    }

    #[test]
    fn rejects_non_csv_paths() {
        let temp_dir = tempdir().unwrap();
        let err = write_results_csv(&temp_dir.path().join("results.txt"), sim().state())
            .unwrap_err();
        assert!(matches!(err, EpiError::ReportError(_)));
    }

    #[test]
    fn batch_files_are_numbered() {
        let temp_dir = tempdir().unwrap();
        let sims = vec![sim(), sim()];
        let paths = write_batch_results(temp_dir.path(), "replicate", &sims).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("replicate_1.csv"));
        assert!(paths.iter().all(|p| p.exists()));
    }
}
