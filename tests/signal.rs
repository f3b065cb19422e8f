use approx::assert_relative_eq;
use dcmri::{
    Exchange, FreeRecovery, ModelError, Relax, Signal, Spgr, SteadyState, Tissue, signal_dsc,
    signal_free, signal_lin, signal_spgr, signal_ss, signal_t2w,
};

const INF: f64 = f64::INFINITY;

fn ones(rows: usize, cols: usize) -> Relax {
    Relax::Matrix(vec![vec![1.0; cols]; rows])
}

#[test]
fn dsc_without_repetition_time() {
    assert_eq!(signal_dsc(1.0, 1.0, 1.0, 0.0, 0.0, None).unwrap(), 0.0);
}

#[test]
fn t2w_without_echo_time() {
    assert_eq!(signal_t2w(1.0, 1.0, 0.0, None).unwrap(), 1.0);
    let s = signal_t2w([1.0, 2.0], 1.0, 0.0, Some(&[0.25, 0.5][..])).unwrap();
    assert_relative_eq!(s.as_scalar().unwrap(), 0.75);
}

#[test]
fn lin_is_proportional() {
    assert_eq!(signal_lin(2.0, 3.0).unwrap(), 6.0);
    assert_eq!(
        signal_lin([1.0, 2.0], 3.0).unwrap(),
        Signal::Series(vec![3.0, 6.0])
    );
    assert!(signal_lin(ones(2, 2), 3.0).is_err());
}

#[test]
fn ss_without_excitation_is_zero() {
    let seq = SteadyState::new(1.0, 1.0, 0.0);
    assert_eq!(signal_ss(&seq, 1.0, &Tissue::single()).unwrap(), 0.0);

    // volume fractions need per-compartment rates
    let two = Tissue::compartments([0.5, 0.5]);
    assert!(matches!(signal_ss(&seq, 1.0, &two), Err(ModelError::Shape(_))));

    for fw in [Exchange::Scalar(INF), Exchange::Scalar(0.0), Exchange::from([[0.0, 1.0], [1.0, 0.0]])] {
        let tissue = two.clone().exchange(fw);
        assert_eq!(signal_ss(&seq, [1.0, 1.0], &tissue).unwrap(), 0.0);
        let series = signal_ss(&seq, ones(2, 10), &tissue).unwrap();
        assert_eq!(series.len(), 10);
        assert_eq!(series.norm(), 0.0);
    }
}

#[test]
fn ss_calibrated_on_reference() {
    let seq = SteadyState::new(5.0, 1.0, 45.0);
    let s = signal_ss(&seq, 1.0, &Tissue::single().reference(1.0)).unwrap();
    assert_relative_eq!(s.as_scalar().unwrap(), 5.0, max_relative = 1e-12);

    let tissue = Tissue::compartments([0.5, 0.5])
        .exchange(INF)
        .reference([1.0, 1.0]);
    let s = signal_ss(&seq, [1.0, 1.0], &tissue).unwrap();
    assert_relative_eq!(s.as_scalar().unwrap(), 5.0, max_relative = 1e-12);

    // same holds for finite exchange and time series
    let tissue = Tissue::compartments([0.2, 0.7])
        .exchange([[0.1, 3.0], [3.0, 0.0]])
        .reference([0.8, 1.4]);
    let s = signal_ss(&seq, Relax::from([[0.8, 0.8], [1.4, 1.4]]), &tissue).unwrap();
    for x in s.as_slice() {
        assert_relative_eq!(*x, 5.0, max_relative = 1e-10);
    }
}

#[test]
fn ss_without_calibration_is_zero_at_zero_relaxation() {
    let seq = SteadyState::new(5.0, 0.01, 30.0);
    assert_eq!(signal_ss(&seq, 0.0, &Tissue::single()).unwrap(), 0.0);
}

#[test]
fn ss_shape_errors() {
    let seq = SteadyState::new(5.0, 1.0, 45.0);
    let two = Tissue::compartments([0.5, 0.5]);

    let bad = two.clone().exchange(Exchange::Matrix(vec![vec![1.0, 1.0]]));
    assert!(matches!(signal_ss(&seq, [1.0, 1.0], &bad), Err(ModelError::Shape(_))));

    let bad = two.clone().exchange([[1.0; 3]; 3]);
    assert!(matches!(signal_ss(&seq, [1.0, 1.0], &bad), Err(ModelError::Shape(_))));

    let three = Tissue::compartments([0.1, 0.4, 0.5]);
    assert!(matches!(signal_ss(&seq, [1.0, 1.0], &three), Err(ModelError::Shape(_))));
    assert!(signal_ss(&seq, [1.0, 1.0], &three.exchange(0.0)).is_err());
}

#[test]
fn single_compartment_ignores_exchange() {
    let seq = SteadyState::new(1.0, 0.005, 12.0);
    let plain = signal_ss(&seq, 1.2, &Tissue::single()).unwrap();
    let tissue = Tissue {
        fw: Exchange::Matrix(vec![vec![1.0, 2.0]]),
        j: Some(Relax::Scalar(3.0)),
        ..Tissue::single()
    };
    assert_eq!(signal_ss(&seq, 1.2, &tissue).unwrap(), plain);
}

fn flow_setup() -> (SteadyState, Relax, Relax, Tissue) {
    let seq = SteadyState::new(1.0, 1.0, 10.0);
    let r1 = Relax::Matrix(vec![
        (0..100).map(|k| 1.0 + 0.01 * k as f64).collect(),
        vec![1.0; 100],
    ]);
    (seq, r1, ones(2, 100), Tissue::compartments([0.5, 0.5]))
}

#[test]
fn slow_exchange_limit() {
    let (seq, r1, j, tissue) = flow_setup();
    let tissue = tissue.inflow(j);
    let zero = 1e-9;
    let s1 = signal_ss(&seq, &r1, &tissue.clone().exchange([[0.1, zero], [zero, 1.0]])).unwrap();
    let s2 = signal_ss(&seq, &r1, &tissue.exchange([[0.1, 0.0], [0.0, 1.0]])).unwrap();
    let diff = Signal::Series(s1.as_slice().iter().zip(s2.as_slice()).map(|(a, b)| a - b).collect());
    assert!(diff.norm() < 1e-6 * s2.norm());
}

#[test]
fn fast_exchange_limit() {
    let (seq, r1, j, tissue) = flow_setup();
    let tissue = tissue.inflow(j);
    let big = 1e6;
    let s1 = signal_ss(&seq, &r1, &tissue.clone().exchange([[0.1, big], [big, 1.0]])).unwrap();
    let s2 = signal_ss(&seq, &r1, &tissue.clone().exchange([[0.1, INF], [INF, 1.0]])).unwrap();
    let diff = Signal::Series(s1.as_slice().iter().zip(s2.as_slice()).map(|(a, b)| a - b).collect());
    assert!(diff.norm() < 1e-5 * s2.norm());

    // 1e6 and inf both mean fast exchange, but they are different numbers
    let err = signal_ss(&seq, &r1, &tissue.exchange([[0.1, big], [INF, 1.0]])).unwrap_err();
    assert!(matches!(err, ModelError::Consistency(_)));
}

#[test]
fn spgr_without_excitation_is_zero() {
    let seq = Spgr::new(1.0, 1.0, 1.0, 0.0);
    for prepared in [seq, seq.prepared(0.0)] {
        assert_eq!(signal_spgr(&prepared, 1.0, &Tissue::single()).unwrap(), 0.0);

        let two = Tissue::compartments([0.5, 0.5]);
        assert!(signal_spgr(&prepared, 1.0, &two).is_err());
        assert_eq!(signal_spgr(&prepared, [1.0, 1.0], &two).unwrap(), 0.0);
        let fw = two.clone().exchange([[0.0, 1.0], [1.0, 0.0]]);
        assert_eq!(signal_spgr(&prepared, [1.0, 1.0], &fw).unwrap(), 0.0);
        assert_eq!(signal_spgr(&prepared, ones(2, 10), &two).unwrap().norm(), 0.0);

        let bad = two.clone().exchange(Exchange::Matrix(vec![vec![1.0, 1.0]]));
        assert!(signal_spgr(&prepared, [1.0, 1.0], &bad).is_err());
        let three = Tissue::compartments([0.1, 0.4, 0.5]);
        assert!(signal_spgr(&prepared, [1.0, 1.0], &three).is_err());
    }
}

#[test]
fn spgr_calibrated_on_reference() {
    let seq = Spgr::new(5.0, 1.0, 1.0, 45.0);
    for prepared in [seq, seq.prepared(0.3)] {
        let s = signal_spgr(&prepared, 1.0, &Tissue::single().reference(1.0)).unwrap();
        assert_relative_eq!(s.as_scalar().unwrap(), 5.0, max_relative = 1e-12);
        let tissue = Tissue::compartments([0.5, 0.5]).reference([1.0, 1.0]);
        let s = signal_spgr(&prepared, [1.0, 1.0], &tissue).unwrap();
        assert_relative_eq!(s.as_scalar().unwrap(), 5.0, max_relative = 1e-12);
    }
}

#[test]
fn spgr_converges_to_steady_state() {
    let tissue = Tissue::compartments([0.3, 0.6]).exchange([[0.05, 2.0], [2.0, 0.2]]);
    let r1 = Relax::from([[0.8, 1.5, 3.0], [1.2, 1.2, 1.2]]);
    let ss = signal_ss(&SteadyState::new(1.0, 0.004, 18.0), &r1, &tissue).unwrap();
    let spgr = Spgr::new(1.0, 0.0, 0.004, 18.0).prepared(0.5).dummies(20_000);
    let train = signal_spgr(&spgr, &r1, &tissue).unwrap();
    for (a, b) in train.as_slice().iter().zip(ss.as_slice()) {
        assert_relative_eq!(*a, *b, max_relative = 1e-8);
    }
}

#[test]
fn free_recovery() {
    let seq = FreeRecovery::new(1.0, 0.0, 45.0);
    assert_eq!(signal_free(&seq, 1.0, &Tissue::single()).unwrap(), 0.0);
    let seq = FreeRecovery::new(0.0, 1.0, 45.0);
    assert_eq!(signal_free(&seq, 1.0, &Tissue::single().reference(1.0)).unwrap(), 0.0);

    // fully recovered after a long delay, whatever the exchange
    let seq = FreeRecovery::new(2.0, 1e4, 90.0);
    let tissue = Tissue::compartments([0.4, 0.5]).exchange(1.5);
    let s = signal_free(&seq, [0.9, 1.7], &tissue).unwrap();
    assert_relative_eq!(s.as_scalar().unwrap(), 2.0 * 0.9, max_relative = 1e-12);
}

#[test]
fn volume_rate_mismatch_raises_everywhere() {
    let v = [0.2, 0.3, 0.5];
    let tissue = Tissue::compartments(v);
    let r = [1.0, 1.0];
    assert!(signal_ss(&SteadyState::new(1.0, 1.0, 10.0), r, &tissue).is_err());
    assert!(signal_spgr(&Spgr::new(1.0, 1.0, 1.0, 10.0), r, &tissue).is_err());
    assert!(signal_free(&FreeRecovery::new(1.0, 1.0, 10.0), r, &tissue).is_err());
    assert!(signal_t2w(r, 1.0, 0.01, Some(&v[..])).is_err());
    assert!(signal_dsc(r, r, 1.0, 0.01, 0.01, Some(&v[..])).is_err());
    assert!(signal_dsc([1.0, 1.0, 1.0], 1.0, 1.0, 0.01, 0.01, Some(&v[..])).is_err());
}

#[cfg(feature = "serde")]
#[test]
fn tissue_from_json() {
    let tissue: Tissue = serde_json::from_str(
        r#"{"v": [0.3, 0.7], "fw": {"Matrix": [[0.0, 2.0], [2.0, 0.0]]}, "r10": {"Scalar": 1.0}}"#,
    )
    .unwrap();
    assert_eq!(tissue.j, None);
    let seq: SteadyState = serde_json::from_str(r#"{"s0": 3.0, "tr": 0.005, "fa": 20.0}"#).unwrap();
    let s = signal_ss(&seq, [1.0, 1.0], &tissue).unwrap();
    assert_relative_eq!(s.as_scalar().unwrap(), 3.0, max_relative = 1e-12);
}
