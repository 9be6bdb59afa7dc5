use assert_approx_eq::assert_approx_eq;
use epiabm::prelude::*;
use epiabm::report::write_batch_results;
use indexmap::IndexMap;
use tempfile::tempdir;

fn small_pars() -> SimParameters {
    let mut pars = default_parameters();
    pars.seed = 31;
    pars.pop_size = 150;
    pars.n_days = 15;
    pars
}

#[test]
fn replicates_match_single_runs() {
    let template = Simulation::new(small_pars(), WellMixedSir);
    let options = BatchOptions {
        replicates: 3,
        ..BatchOptions::default()
    };
    let sims = multi_run(SimSource::Template(&template), &options)
        .unwrap()
        .into_sims();

    for (index, sim) in sims.iter().enumerate() {
        let single = single_run(
            SimSource::Template(&template),
            &ReplicateOptions {
                index,
                ..ReplicateOptions::default()
            },
        )
        .unwrap();
        assert_eq!(sim.results(), single.results());
        assert_eq!(sim.pars().seed, 31 + index as u64);
    }
    assert!(!template.is_initialized());
}

#[test]
fn thread_count_does_not_change_results() {
    let pars = small_pars();
    let run = |threads| {
        let options = BatchOptions {
            replicates: 4,
            noise: 0.3,
            threads,
            ..BatchOptions::default()
        };
        multi_run(SimSource::Build(pars.clone(), WellMixedSir), &options)
            .unwrap()
            .into_sims()
    };
    let serial = run(Some(1));
    let parallel = run(Some(4));
    for (a, b) in serial.iter().zip(&parallel) {
        assert_eq!(a.results(), b.results());
        assert_eq!(a.get_parameter("beta").unwrap(), b.get_parameter("beta").unwrap());
    }
}

#[test]
fn iterated_parameters_reach_each_replicate() {
    let mut iter_parameters = IndexMap::new();
    iter_parameters.insert(
        "beta".to_string(),
        vec![ParamValue::Float(0.0), ParamValue::Float(0.2)],
    );
    let options = BatchOptions {
        iter_parameters,
        ..BatchOptions::default()
    };
    let sims = multi_run(SimSource::Build(small_pars(), WellMixedSir), &options)
        .unwrap()
        .into_sims();
    assert_eq!(sims.len(), 2);

    // No transmission: only the seeded infections.
    let stats = sims[0].summary_stats().unwrap();
    assert_approx_eq!(stats["cum_infections"], 10.0);
    assert_eq!(sims[1].get_parameter("beta").unwrap(), ParamValue::Float(0.2));
}

#[test]
fn combined_batch_sums_series() {
    let options = BatchOptions {
        replicates: 2,
        ..BatchOptions::default()
    };
    let parts = multi_run(SimSource::Build(small_pars(), WellMixedSir), &options)
        .unwrap()
        .into_sims();
    let combined = multi_run(
        SimSource::Build(small_pars(), WellMixedSir),
        &BatchOptions {
            combine: true,
            ..options
        },
    )
    .unwrap();
    let BatchOutput::Combined(combined) = combined else {
        panic!("expected a combined simulation");
    };

    assert_eq!(combined.n(), 300);
    assert_eq!(combined.pars().pop_size, 300);
    let expected: Vec<f64> = parts[0]
        .results()
        .get("n_infectious")
        .unwrap()
        .iter()
        .zip(parts[1].results().get("n_infectious").unwrap())
        .map(|(a, b)| a + b)
        .collect();
    assert_eq!(combined.results().get("n_infectious").unwrap(), expected.as_slice());
}

#[test]
fn batch_reports_are_written() {
    let sims = multi_run(
        SimSource::Build(small_pars(), WellMixedSir),
        &BatchOptions {
            replicates: 2,
            ..BatchOptions::default()
        },
    )
    .unwrap()
    .into_sims();
    let temp_dir = tempdir().unwrap();
    let paths = write_batch_results(temp_dir.path(), "sir", &sims).unwrap();

    let mut reader = csv::Reader::from_path(&paths[0]).unwrap();
    assert_eq!(reader.records().count(), 16);
}

#[test]
fn unknown_iterated_parameter_is_rejected() {
    let mut iter_parameters = IndexMap::new();
    iter_parameters.insert("gamma".to_string(), vec![ParamValue::Float(0.1)]);
    let err = multi_run(
        SimSource::Build(small_pars(), WellMixedSir),
        &BatchOptions {
            iter_parameters,
            ..BatchOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, EpiError::UnknownOverride(key) if key == "gamma"));
}

#[test]
fn already_run_template_gives_fresh_replicates() {
    let fresh = Simulation::new(small_pars(), WellMixedSir);
    let mut used = fresh.clone();
    used.run().unwrap();
    assert!(used.is_initialized());

    let options = BatchOptions {
        replicates: 2,
        ..BatchOptions::default()
    };
    let from_fresh = multi_run(SimSource::Template(&fresh), &options)
        .unwrap()
        .into_sims();
    let from_used = multi_run(SimSource::Template(&used), &options)
        .unwrap()
        .into_sims();

    for (a, b) in from_fresh.iter().zip(&from_used) {
        assert_eq!(a.results(), b.results());
        assert_eq!(b.n(), 150);
    }
    let susceptible = from_used[0].results().get("n_susceptible").unwrap();
    assert_approx_eq!(susceptible[0], 140.0);

    // Each replicate draws its own population.
    let ages = |sim: &Simulation<WellMixedSir>| -> Vec<ParamValue> {
        sim.state()
            .people()
            .map(|agent| agent.get_parameter("age").unwrap())
            .collect()
    };
    assert_ne!(ages(&from_used[0]), ages(&from_used[1]));
}
