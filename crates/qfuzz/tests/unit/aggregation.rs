//! Feature table assembly.

use std::thread;
use std::time::Duration;

use qfuzz::{
    BackendKind, CancelToken, Config, Error, ErrorKind, HardwareErrorProfile, InvalidInput,
    Operation, Pipeline, Program, ProgramId, Scenario, NOISY,
};

use crate::mock::{MockService, Step};

fn program(id: &str) -> Program {
    Program::new(
        ProgramId::from(id),
        2,
        vec![Operation::new("h", [0]), Operation::new("cx", [0, 1])],
        true,
    )
    .unwrap()
}

fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(NOISY, "noisy_sim", BackendKind::Simulator, 10),
        Scenario::ideal("ideal_sim", 10),
    ]
}

fn by_backend() -> MockService {
    MockService::new(|backend, _| match backend {
        "ideal_sim" => Step::ok(&[("00", 10)]),
        _ => Step::ok(&[("00", 8), ("11", 2)]),
    })
}

fn config() -> Config {
    Config::new().repetitions(2)
}

#[test]
fn reference_scenario_runs_first() {
    let service = by_backend();
    let programs = [program("p0"), program("p1")];
    Pipeline::new(&service, config())
        .run(&programs, &scenarios(), &CancelToken::new(), |_| {})
        .unwrap();

    let log = service.log.lock().unwrap().clone();
    assert_eq!(
        log,
        vec![
            "p0@ideal_sim",
            "p0@ideal_sim",
            "p0@noisy_sim",
            "p0@noisy_sim",
            "p1@ideal_sim",
            "p1@ideal_sim",
            "p1@noisy_sim",
            "p1@noisy_sim",
        ]
    );
}

#[test]
fn one_record_per_pair_with_fidelity_to_reference() {
    let service = by_backend();
    let programs = [program("p0"), program("p1")];
    let mut reports = 0;
    let table = Pipeline::new(&service, config())
        .run(&programs, &scenarios(), &CancelToken::new(), |_| reports += 1)
        .unwrap();

    assert_eq!(reports, 4);
    assert_eq!(table.records.len(), 4);
    assert!(table.failures.is_empty());
    assert!(!table.interrupted);
    assert_eq!(table.scenario_names(), vec!["ideal", "noisy"]);

    for r in table.by_scenario("ideal") {
        assert_eq!(r.fidelity, None);
        assert_eq!(r.entropy, 0.0);
        assert_eq!(r.real_samples, 2);
    }
    for r in table.by_scenario("noisy") {
        let fidelity = r.fidelity.unwrap();
        assert!((fidelity - 0.8).abs() < 1e-12, "fidelity = {fidelity}");
        assert!(r.difference_entropy.is_some());
        assert_eq!(r.reported_time_ms, Some(1.0));
        assert_eq!(r.depth, 3);
        assert_eq!(r.operation_count, 4);
    }
    assert_eq!(table.operation_kinds(), vec!["cx", "h", "measure"]);
}

#[test]
fn partial_pair_still_yields_a_record() {
    // Submissions 0-2 are the reference, 3-4 the noisy pair.
    let service = MockService::new(|backend, i| match (backend, i) {
        (_, 4) => Step::Fail("calibration drift"),
        ("ideal_sim", _) => Step::ok(&[("00", 10)]),
        _ => Step::ok(&[("00", 5), ("11", 5)]),
    });
    let table = Pipeline::new(&service, config().repetitions(3))
        .run(&[program("p0")], &scenarios(), &CancelToken::new(), |_| {})
        .unwrap();

    assert_eq!(table.records.len(), 2);
    let noisy = table.by_scenario("noisy").next().unwrap();
    assert_eq!(noisy.real_samples, 1);
    assert_eq!(noisy.entropy, 1.0);

    assert_eq!(table.failures.len(), 1);
    let failure = &table.failures[0];
    assert_eq!(failure.scenario, "noisy");
    assert_eq!(failure.kind, ErrorKind::ExecutionFailure);
    assert_eq!(failure.completed, 1);
    assert!(failure.message.contains("calibration drift"));
}

#[test]
fn pair_without_histogram_has_no_record() {
    let service = MockService::new(|backend, _| match backend {
        "ideal_sim" => Step::ok(&[("00", 10)]),
        _ => Step::Hang,
    });
    let config = config().timeout(Duration::from_millis(30));
    let table = Pipeline::new(&service, config)
        .run(&[program("p0")], &scenarios(), &CancelToken::new(), |_| {})
        .unwrap();

    assert_eq!(table.records.len(), 1);
    assert_eq!(table.records[0].scenario, "ideal");
    assert_eq!(table.failures.len(), 1);
    assert_eq!(table.failures[0].kind, ErrorKind::Timeout);
    assert_eq!(table.failures[0].completed, 0);
}

#[test]
fn failed_reference_leaves_fidelity_empty() {
    let service = MockService::new(|backend, _| match backend {
        "ideal_sim" => Step::Fail("down"),
        _ => Step::ok(&[("00", 10)]),
    });
    let table = Pipeline::new(&service, config())
        .run(&[program("p0")], &scenarios(), &CancelToken::new(), |_| {})
        .unwrap();

    assert_eq!(table.records.len(), 1);
    assert_eq!(table.records[0].fidelity, None);
}

#[test]
fn cancellation_interrupts_the_run() {
    let service = by_backend();
    let token = CancelToken::new();
    let programs = [program("p0"), program("p1")];
    let table = Pipeline::new(&service, config())
        .run(&programs, &scenarios(), &token, |_| token.cancel())
        .unwrap();

    assert!(table.interrupted);
    assert_eq!(table.records.len(), 1);
    assert_eq!(service.submissions(), 2);
}

#[test]
fn cancelling_the_last_pair_interrupts_the_run() {
    let service = MockService::new(|backend, index| match (backend, index) {
        ("ideal_sim", _) => Step::ok(&[("00", 10)]),
        (_, 2) => Step::ok(&[("00", 9), ("11", 1)]),
        _ => Step::Hang,
    });
    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
        })
    };

    let table = Pipeline::new(&service, config())
        .run(&[program("p0")], &scenarios(), &token, |_| {})
        .unwrap();
    canceller.join().unwrap();

    assert!(table.interrupted);
    assert_eq!(table.records.len(), 2);
    assert_eq!(table.failures.len(), 1);
    assert_eq!(table.failures[0].scenario, NOISY);
    assert_eq!(table.failures[0].kind, ErrorKind::Timeout);
    assert_eq!(table.failures[0].completed, 1);
}

#[test]
fn without_reference_nothing_is_compared() {
    let service = by_backend();
    let table = Pipeline::new(&service, config().no_reference())
        .run(&[program("p0")], &scenarios(), &CancelToken::new(), |_| {})
        .unwrap();

    assert_eq!(table.records.len(), 2);
    assert!(table.records.iter().all(|r| r.fidelity.is_none()));
    // Given order is kept.
    assert_eq!(table.records[0].scenario, "noisy");
}

#[test]
fn calibration_fills_hardware_columns() {
    let service = by_backend();
    let hardware = Scenario::hardware("noisy_sim", 10).with_calibration(Some(HardwareErrorProfile {
        t1: vec![100.0, 200.0],
        t2: vec![50.0],
        readout_error: vec![0.01, 0.03],
        gate_error: Vec::new(),
    }));
    let config = config().hardware_poll_interval(Duration::from_millis(1));
    let table = Pipeline::new(&service, config)
        .run(
            &[program("p0")],
            &[Scenario::ideal("ideal_sim", 10), hardware],
            &CancelToken::new(),
            |_| {},
        )
        .unwrap();

    let hw = table.by_scenario("hardware").next().unwrap();
    assert_eq!(hw.hardware.avg_t1, Some(150.0));
    assert_eq!(hw.hardware.avg_t2, Some(50.0));
    assert!((hw.hardware.avg_readout_error.unwrap() - 0.02).abs() < 1e-12);
    assert_eq!(hw.hardware.avg_gate_error, None);

    let ideal = table.by_scenario("ideal").next().unwrap();
    assert_eq!(ideal.hardware.avg_t1, None);
}

#[test]
fn duplicate_scenario_names_rejected() {
    let service = by_backend();
    let scenarios = [Scenario::ideal("a", 10), Scenario::ideal("b", 10)];
    let err = Pipeline::new(&service, config())
        .run(&[program("p0")], &scenarios, &CancelToken::new(), |_| {})
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(InvalidInput::InvalidConfig(_))));
    assert_eq!(service.submissions(), 0);
}

#[test]
fn no_scenarios_rejected() {
    let service = by_backend();
    let err = Pipeline::new(&service, config())
        .run(&[program("p0")], &[], &CancelToken::new(), |_| {})
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
