//! End-to-end runs of the estimators on synthetic data.

use orthodr::prelude::*;
use pretty_assertions::assert_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Exp, StandardNormal};

struct Cohort {
    x: DMatrix<f64>,
    times: DVector<f64>,
    failed: Vec<bool>,
}

// Proportional hazards along (1, -1, 0) / sqrt(2) with independent censoring.
fn cohort(seed: u64, n: usize) -> Cohort {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: DMatrix<f64> = DMatrix::from_fn(n, 3, |_, _| StandardNormal.sample(&mut rng));
    let censoring = Exp::new(0.7).unwrap();
    let mut times = DVector::zeros(n);
    let mut failed = Vec::with_capacity(n);
    for i in 0..n {
        let index = (x[(i, 0)] - x[(i, 1)]) / std::f64::consts::SQRT_2;
        let event: f64 = Exp::new(index.exp()).unwrap().sample(&mut rng);
        let censor: f64 = censoring.sample(&mut rng);
        times[i] = event.min(censor);
        failed.push(event <= censor);
    }
    Cohort { x, times, failed }
}

fn survival_data(seed: u64, n: usize) -> SurvivalData {
    let cohort = cohort(seed, n);
    SurvivalData::from_unsorted(&cohort.x, &cohort.times, &cohort.failed).unwrap()
}

#[test]
fn counting_process_scenario_converges() {
    let data = survival_data(2024, 50);
    assert!(data.n_failures() > 10 && data.n_failures() < 40);
    let phit = data.at_risk_means();
    let objective = SurvivalObjective::kernel_hazard(data, phit, 0.5).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let b0 = random_stiefel_point(3, 1, &mut rng).unwrap();
    let config = SolverConfig::default()
        .with_rho(1e-4)
        .with_eta(0.5)
        .with_gamma(0.85)
        .with_epsilon(1e-6)
        .with_tolerances(1e-6, 1e-6, 1e-6)
        .with_max_iterations(500);
    let result = StiefelOptimizer::new(config)
        .solve_with_writer(&objective, b0, std::io::sink())
        .unwrap();

    assert!(result.converged);
    assert!(result.iterations < 500);
    assert!(result.feasibility < 1e-6);
    assert_eq!(result.bw, Some(0.5));
    assert_eq!(result.b.shape(), (3, 1));
}

#[test]
fn every_survival_variant_runs() {
    let data = survival_data(11, 60);
    let phit = data.at_risk_means();
    let objectives: Vec<Box<dyn ObjectiveOracle>> = vec![
        Box::new(SurvivalObjective::kernel_hazard(data.clone(), phit.clone(), 0.8).unwrap()),
        Box::new(SurvivalObjective::nelson_aalen(data.clone(), phit, 0.8).unwrap()),
        Box::new(SurvivalObjective::partial_likelihood(data, 0.8).unwrap()),
    ];
    let b0 = DMatrix::from_column_slice(3, 1, &[0.0, 0.6, 0.8]);
    let solver = StiefelOptimizer::new(SolverConfig::default().with_max_iterations(40));
    for objective in &objectives {
        let initial = objective.value(&b0, &Executor::serial()).unwrap();
        let result = solver
            .solve_with_writer(objective.as_ref(), b0.clone(), std::io::sink())
            .unwrap();
        assert!(result.value.is_finite(), "{}", objective.name());
        assert!(result.feasibility < 1e-6, "{}", objective.name());
        assert!(
            result.history.iter().any(|r| r.objective_value <= initial),
            "{} never improved on {initial}",
            objective.name()
        );
    }
}

#[test]
fn moment_estimators_run_from_the_facade() {
    let mut rng = StdRng::seed_from_u64(99);
    let n = 80;
    let x: DMatrix<f64> = DMatrix::from_fn(n, 4, |_, _| StandardNormal.sample(&mut rng));
    let y = DVector::from_fn(n, |i, _| x[(i, 0)] + 0.5 * x[(i, 3)] + 0.1 * rng.gen::<f64>());
    let b0 = DMatrix::from_column_slice(4, 1, &[0.5, 0.5, 0.5, 0.5]);
    let solver = StiefelOptimizer::new(
        SolverConfig::default()
            .with_max_iterations(30)
            .with_finite_difference(FiniteDifference::Central),
    );

    for objective in [
        MomentObjective::sir(x.clone(), &y, 5, 1.0).unwrap(),
        MomentObjective::save(x.clone(), &y, 5, 1.0).unwrap(),
    ] {
        let result = solver
            .solve_with_writer(&objective, b0.clone(), std::io::sink())
            .unwrap();
        assert!(result.value.is_finite(), "{}", objective.name());
        assert!(result.feasibility < 1e-6);
        assert!(result.history.iter().all(|r| r.tau > 0.0));
    }
}

#[test]
fn user_objective_with_closed_form_gradient() {
    // maximise trace(B^T A B) for A = diag(1, 4, 2, 3)
    let weights = [1.0, 4.0, 2.0, 3.0];
    let objective = GeneralObjective::new(4, move |b: &DMatrix<f64>| {
        -(0..4)
            .map(|i| weights[i] * b.row(i).norm_squared())
            .sum::<f64>()
    })
    .with_gradient(move |b: &DMatrix<f64>| {
        DMatrix::from_fn(4, 2, |i, j| -2.0 * weights[i] * b[(i, j)])
    });
    let b0 = DMatrix::from_fn(4, 2, |i, j| if i == j { 1.0 } else { 0.0 });
    let b0 = (b0 + DMatrix::from_element(4, 2, 0.1)).qr().q();

    let result = StiefelOptimizer::default()
        .solve_with_writer(&objective, b0, std::io::sink())
        .unwrap();
    assert!(result.converged);
    assert!((result.value + 7.0).abs() < 1e-6);
    assert!(result.gradient_evaluations > 0);

    let target = DMatrix::from_fn(4, 2, |i, j| match (i, j) {
        (1, 0) | (3, 1) => 1.0,
        _ => 0.0,
    });
    let distance = subspace_distance(&result.b, &target, SubspaceDistance::Projection).unwrap();
    assert!(distance < 1e-3, "distance {distance}");
}

#[cfg(feature = "serde")]
#[test]
fn results_serialise_to_json() {
    let objective = GeneralObjective::new(3, |b: &DMatrix<f64>| b[(2, 0)].powi(2));
    let b0 = DMatrix::from_column_slice(3, 1, &[0.0, 0.6, 0.8]);
    let result = StiefelOptimizer::default()
        .solve_with_writer(&objective, b0, std::io::sink())
        .unwrap();
    let json = serde_json::to_string(&result.history).unwrap();
    assert!(json.contains("\"armijo_satisfied\""));
    let text = serde_json::to_string(&SolverConfig::default()).unwrap();
    let config: SolverConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(config, SolverConfig::default());
}
