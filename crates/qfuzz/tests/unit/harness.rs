//! Harness repetition loop.

use std::time::Duration;

use qfuzz::{
    CancelToken, Cancellation, Error, ErrorKind, Harness, InvalidInput, Operation, PollConfig,
    Program, ProgramId, Scenario,
};

use crate::mock::{MockService, Step};

fn bell() -> Program {
    Program::new(
        ProgramId::from("bell"),
        2,
        vec![Operation::new("h", [0]), Operation::new("cx", [0, 1])],
        true,
    )
    .unwrap()
}

fn fast_poll() -> PollConfig {
    PollConfig {
        simulator_interval: Duration::from_millis(1),
        hardware_interval: Duration::from_millis(1),
    }
}

#[test]
fn all_repetitions_succeed() {
    let service = MockService::always(&[("00", 6), ("11", 4)]);
    let reps = Harness::new(&service, fast_poll())
        .run(&bell(), &Scenario::ideal("sim", 10), 3, &Cancellation::none())
        .unwrap();

    assert_eq!(reps.len(), 3);
    assert_eq!(service.submissions(), 3);
    assert_eq!(reps.reported_times(), vec![1.0, 1.0, 1.0]);
    assert_eq!(reps.real_times().len(), 3);
    assert!(reps.compile_times().iter().all(|t| *t >= 0.0));
    assert_eq!(reps.last_histogram().unwrap().count("11"), 4);
}

#[test]
fn failure_keeps_prior_repetitions() {
    let service = MockService::new(|_, i| {
        if i == 1 {
            Step::Fail("qubit 3 unavailable")
        } else {
            Step::ok(&[("00", 10)])
        }
    });
    let err = Harness::new(&service, fast_poll())
        .run(&bell(), &Scenario::ideal("sim", 10), 3, &Cancellation::none())
        .unwrap_err();

    assert_eq!(err.partial.len(), 1);
    assert_eq!(err.partial.histograms().len(), 1);
    assert_eq!(err.partial.last_histogram().unwrap().count("00"), 10);
    assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
    assert_eq!(service.submissions(), 2, "remaining repetitions must be skipped");
    match err.error {
        Error::ExecutionFailure {
            repetition,
            message,
            ..
        } => {
            assert_eq!(repetition, 2);
            assert_eq!(message, "qubit 3 unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn queued_and_running_are_not_failures() {
    let service = MockService::new(|_, _| Step::Succeed {
        counts: vec![("01", 8)],
        reported_ms: None,
        polls: 4,
    });
    let reps = Harness::new(&service, fast_poll())
        .run(&bell(), &Scenario::hardware("device", 8), 2, &Cancellation::none())
        .unwrap();

    assert_eq!(reps.len(), 2);
    assert!(reps.reported_times().is_empty());
}

#[test]
fn timeout_returns_partial_and_cancels_job() {
    let service = MockService::new(|_, i| match i {
        0 => Step::ok(&[("00", 4)]),
        _ => Step::Hang,
    });
    let err = Harness::new(&service, fast_poll())
        .run(
            &bell(),
            &Scenario::ideal("sim", 4),
            3,
            &Cancellation::with_timeout(Duration::from_millis(40)),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_ne!(err.kind(), ErrorKind::ExecutionFailure);
    assert_eq!(err.partial.len(), 1);
    assert_eq!(*service.cancelled.lock().unwrap(), 1);
}

#[test]
fn status_error_cancels_job() {
    let service = MockService::new(|_, i| match i {
        0 => Step::ok(&[("00", 4)]),
        _ => Step::Unreachable("connection reset"),
    });
    let err = Harness::new(&service, fast_poll())
        .run(&bell(), &Scenario::ideal("sim", 4), 3, &Cancellation::none())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provider);
    assert_eq!(err.partial.len(), 1);
    assert_eq!(service.submissions(), 2);
    assert_eq!(*service.cancelled.lock().unwrap(), 1);
    assert!(err.error.to_string().contains("status"));
}

#[test]
fn cancelled_token_stops_before_submitting() {
    let service = MockService::always(&[("00", 4)]);
    let token = CancelToken::new();
    token.cancel();

    let err = Harness::new(&service, fast_poll())
        .run(
            &bell(),
            &Scenario::ideal("sim", 4),
            3,
            &Cancellation::new(token, None),
        )
        .unwrap_err();

    assert!(matches!(err.error, Error::Timeout { repetition: 1, .. }));
    assert_eq!(service.submissions(), 0);
}

#[test]
fn shot_mismatch_is_invalid_input() {
    let service = MockService::always(&[("00", 3)]);
    let err = Harness::new(&service, fast_poll())
        .run(&bell(), &Scenario::ideal("sim", 4), 1, &Cancellation::none())
        .unwrap_err();

    assert!(matches!(
        err.error,
        Error::InvalidInput(InvalidInput::ShotMismatch {
            expected: 4,
            found: 3
        })
    ));
}

#[test]
fn histogram_width_must_match_slots() {
    let service = MockService::always(&[("0", 2), ("1", 2)]);
    let err = Harness::new(&service, fast_poll())
        .run(&bell(), &Scenario::ideal("sim", 4), 1, &Cancellation::none())
        .unwrap_err();

    assert!(matches!(
        err.error,
        Error::InvalidInput(InvalidInput::WidthMismatch { left: 1, right: 2 })
    ));
}

#[test]
fn malformed_histogram_is_invalid_input() {
    let service = MockService::always(&[("0x", 4)]);
    let err = Harness::new(&service, fast_poll())
        .run(&bell(), &Scenario::ideal("sim", 4), 1, &Cancellation::none())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn zero_repetitions_rejected() {
    let service = MockService::always(&[("00", 4)]);
    let err = Harness::new(&service, fast_poll())
        .run(&bell(), &Scenario::ideal("sim", 4), 0, &Cancellation::none())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(service.submissions(), 0);
}
