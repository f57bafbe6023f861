use std::f64::consts::FRAC_PI_2;
use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::Array2;
use spin_sim::{
    EventSequence, ExecutionContext, FrequencyDistribution, Precision, Scanner, ScannerConfig,
    SequenceClass, Signal, SpinSystem, TissueMap, TissueVoxel,
};

fn spin_system(rows:usize,cols:usize,n_spins:usize,voxel:TissueVoxel,ctx:ExecutionContext) -> SpinSystem {
    let mut map = TissueMap::new(rows,cols).unwrap();
    map.fill_block((0,rows),(0,cols),voxel).unwrap();
    let mut spins = SpinSystem::new(rows,cols,n_spins,ctx).unwrap();
    spins.set_system(&map).unwrap();
    spins
}

fn simulate(spins:&mut SpinSystem,seq:&EventSequence,config:ScannerConfig) -> Signal {
    let mut scanner = Scanner::new(config,spins).unwrap();
    scanner.set_sequence(seq).unwrap();
    scanner.forward(spins,seq.durations()).unwrap();
    scanner.into_signal()
}

/// 90 degree pulse on event 0 and the ADC on every event
fn fid(n_events:usize,dt:f64) -> EventSequence {
    let mut seq = EventSequence::new(n_events,1,dt,SequenceClass::GreDream).unwrap();
    seq.set_rf(0,0,FRAC_PI_2,0.0).unwrap();
    seq.set_adc_range(0,n_events).unwrap();
    seq
}

#[test]
fn transverse_magnitude_is_conserved_without_relaxation() {
    let voxel = TissueVoxel::new(1.0,1e12,1e12,0.0,1.0);
    let mut spins = spin_system(1,1,1,voxel,ExecutionContext::serial());
    let signal = simulate(&mut spins,&fid(300,1e-3),ScannerConfig::default());
    for e in 0..300 {
        assert_abs_diff_eq!(signal.get(0,e,0).norm(),1.0,epsilon = 1e-9);
    }
}

#[test]
fn every_isochromat_keeps_its_transverse_norm_while_dephasing() {
    let voxel = TissueVoxel::new(1.0,1e12,1e12,40.0,1.0);
    let mut spins = spin_system(1,1,16,voxel,ExecutionContext::default());
    spins.set_off_resonance(&FrequencyDistribution::Lorentzian{r2star:250.0}).unwrap();
    simulate(&mut spins,&fid(500,1e-4),ScannerConfig::default());
    for m in spins.magnetization(0) {
        assert_abs_diff_eq!(m.transverse().norm(),1.0,epsilon = 1e-9);
    }
}

#[test]
fn single_isochromat_decays_with_t2() {
    let (pd,t2,dt) = (0.8,0.05,2e-4);
    let voxel = TissueVoxel::new(pd,1.0,t2,0.0,1.0);
    let mut spins = spin_system(1,1,1,voxel,ExecutionContext::serial());
    let signal = simulate(&mut spins,&fid(400,dt),ScannerConfig::default());
    for e in 0..400 {
        let t = (e + 1) as f64*dt;
        assert_relative_eq!(signal.get(0,e,0).norm(),pd*(-t/t2).exp(),max_relative = 1e-3);
    }
    // receiver phase puts the FID on the real axis
    assert!(signal.get(0,0,0).re > 0.0);
    assert_abs_diff_eq!(signal.get(0,0,0).im,0.0,epsilon = 1e-12);
}

fn ensemble_rms_error(n_spins:usize,r2star:f64,dt:f64,n_events:usize) -> f64 {
    let voxel = TissueVoxel::new(1.0,1e9,1e9,0.0,1.0);
    let mut spins = spin_system(1,1,n_spins,voxel,ExecutionContext::default());
    spins.set_off_resonance(&FrequencyDistribution::Lorentzian{r2star}).unwrap();
    let signal = simulate(&mut spins,&fid(n_events,dt),ScannerConfig::default());
    let sq:f64 = (0..n_events).map(|e|{
        let t = (e + 1) as f64*dt;
        (signal.get(0,e,0).re - (-r2star*t).exp()).powi(2)
    }).sum();
    (sq/n_events as f64).sqrt()
}

#[test]
fn lorentzian_ensemble_converges_to_exponential_decay() {
    let errors:Vec<f64> = [16,32,64,128,256].iter()
        .map(|n| ensemble_rms_error(*n,250.0,8e-5,100))
        .collect();
    for pair in errors.windows(2) {
        assert!(pair[1] < pair[0],"error did not shrink: {:?}",errors);
    }
    assert!(errors[2] < 0.05,"64 spins: {:?}",errors);
    assert!(errors[4] < 0.02,"256 spins: {:?}",errors);
}

#[test]
fn zero_flip_leaves_magnetization_untouched() {
    let voxel = TissueVoxel::new(1.0,0.8,0.07,15.0,1.0);
    let mut reference = fid(20,1e-3);
    reference.set_rf(0,0,0.7,0.3).unwrap();
    let mut with_zero = reference.clone();
    with_zero.set_rf(10,0,0.0,1.3).unwrap();

    let mut a = spin_system(2,2,8,voxel,ExecutionContext::default());
    let mut b = a.clone();
    a.set_off_resonance(&FrequencyDistribution::Lorentzian{r2star:50.0}).unwrap();
    b.set_off_resonance(&FrequencyDistribution::Lorentzian{r2star:50.0}).unwrap();
    let sa = simulate(&mut a,&reference,ScannerConfig::default());
    let sb = simulate(&mut b,&with_zero,ScannerConfig::default());
    assert_eq!(sa,sb);
    for v in 0..4 {
        assert_eq!(a.magnetization(v),b.magnetization(v));
    }
}

#[test]
fn saturated_magnetization_recovers_to_proton_density() {
    let voxel = TissueVoxel::new(0.6,0.5,0.05,0.0,1.0);
    let mut spins = spin_system(2,1,4,voxel,ExecutionContext::default());
    let mut seq = EventSequence::new(2,1,1e-3,SequenceClass::Gre).unwrap();
    seq.set_rf(0,0,FRAC_PI_2,0.0).unwrap();
    seq.set_duration(1,0,10.0).unwrap();
    simulate(&mut spins,&seq,ScannerConfig::default());
    for v in 0..2 {
        let m = spins.voxel_mean(v);
        assert_abs_diff_eq!(m.z,0.6,epsilon = 1e-6);
        assert_abs_diff_eq!(m.transverse().norm(),0.0,epsilon = 1e-6);
    }
}

#[test]
fn signal_shape_is_fixed_and_disabled_events_stay_zero() {
    let voxel = TissueVoxel::new(1.0,1.0,0.1,3.0,1.0);
    let mut spins = spin_system(2,3,5,voxel,ExecutionContext::default());
    let mut seq = EventSequence::new(7,4,1e-3,SequenceClass::Gre).unwrap();
    for rep in 0..4 {
        seq.set_rf(0,rep,0.5,0.0).unwrap();
        seq.set_gradient(1,rep,0.3*rep as f64,-0.5).unwrap();
    }
    seq.set_adc(2,true).unwrap();
    seq.set_adc(5,true).unwrap();
    let config = ScannerConfig{n_coils:3,..ScannerConfig::default()};
    let signal = simulate(&mut spins,&seq,config);
    assert_eq!(signal.shape(),&[3,7,4,2]);
    for coil in 0..3 {
        for event in 0..7 {
            for rep in 0..4 {
                let s = signal.get(coil,event,rep);
                if seq.adc(event) {
                    assert!(s.norm() > 0.0);
                } else {
                    assert_eq!(s.re,0.0);
                    assert_eq!(s.im,0.0);
                }
            }
        }
    }

    let mut empty = EventSequence::new(7,4,1e-3,SequenceClass::Gre).unwrap();
    empty.set_rf(0,0,0.5,0.0).unwrap();
    let silent = simulate(&mut spins,&empty,ScannerConfig::default());
    assert_eq!(silent.shape(),&[1,7,4,2]);
    assert!(silent.data().iter().all(|x| *x == 0.0));
}

#[test]
fn readout_gradient_forms_an_echo_at_the_kspace_center() {
    let voxel = TissueVoxel::new(1.0,1e9,1e9,0.0,1.0);
    let mut spins = spin_system(1,8,1,voxel,ExecutionContext::default());
    let mut seq = EventSequence::new(10,1,1e-4,SequenceClass::Gre).unwrap();
    seq.set_rf(0,0,FRAC_PI_2,0.0).unwrap();
    seq.set_gradient(1,0,0.0,-4.0).unwrap();
    for e in 2..10 {
        seq.set_gradient(e,0,0.0,1.0).unwrap();
        seq.set_adc(e,true).unwrap();
    }
    let signal = simulate(&mut spins,&seq,ScannerConfig::default());
    let traj = seq.kspace_trajectory();
    for e in 2..10 {
        let s = signal.get(0,e,0).norm();
        if traj[[e,0,1]] == 0.0 {
            assert_eq!(e,5);
            assert_abs_diff_eq!(s,8.0,epsilon = 1e-9);
        } else {
            assert_abs_diff_eq!(s,0.0,epsilon = 1e-9);
        }
    }
}

#[test]
fn thread_count_does_not_change_the_result() {
    let voxel = TissueVoxel::new(1.0,0.9,0.08,20.0,0.95);
    let mut seq = fid(50,1e-4);
    seq.set_gradient(3,0,0.5,-0.25).unwrap();
    let run = |threads:Option<usize>| {
        let ctx = ExecutionContext::new(Precision::Double,threads);
        let mut spins = spin_system(4,4,9,voxel,ctx);
        spins.set_off_resonance(&FrequencyDistribution::Lorentzian{r2star:100.0}).unwrap();
        simulate(&mut spins,&seq,ScannerConfig::default())
    };
    assert_eq!(run(Some(1)),run(Some(4)));
    assert_eq!(run(Some(1)),run(None));
}

#[test]
fn single_precision_tracks_double_precision() {
    let voxel = TissueVoxel::new(1.0,0.9,0.08,20.0,1.0);
    let seq = fid(100,1e-4);
    let run = |precision:Precision| {
        let ctx = ExecutionContext::new(precision,None);
        let mut spins = spin_system(2,2,16,voxel,ctx);
        spins.set_off_resonance(&FrequencyDistribution::Lorentzian{r2star:250.0}).unwrap();
        simulate(&mut spins,&seq,ScannerConfig::default())
    };
    let single = run(Precision::Single);
    let double = run(Precision::Double);
    assert_ne!(single,double);
    assert!(single.nrmse(&double).unwrap() < 1e-3);
}

#[test]
fn noise_is_added_only_where_the_adc_samples() {
    let voxel = TissueVoxel::new(1.0,1.0,0.1,0.0,1.0);
    let mut spins = spin_system(1,1,1,voxel,ExecutionContext::default());
    let mut seq = fid(10,1e-3);
    seq.set_adc(0,false).unwrap();
    let config = ScannerConfig{noise_std:0.01,noise_seed:3,..ScannerConfig::default()};
    let noisy = simulate(&mut spins,&seq,config);
    assert_eq!(noisy.get(0,0,0).norm(),0.0);
    let mut spins = spin_system(1,1,1,voxel,ExecutionContext::default());
    let clean = simulate(&mut spins,&seq,ScannerConfig::default());
    let diff = (noisy.get(0,4,0) - clean.get(0,4,0)).norm();
    assert!(diff > 0.0 && diff < 0.1);
}

/// least squares fit of a*exp(-r*t) + c, grid search over r with a and c solved exactly
fn fit_exponential(t:&[f64],y:&[f64]) -> f64 {
    let n = t.len() as f64;
    let sy:f64 = y.iter().sum();
    let mut best = (f64::INFINITY,0.0);
    for i in 0..1100 {
        let r = 50.0 + 0.5*i as f64;
        let e:Vec<f64> = t.iter().map(|t| (-r*t).exp()).collect();
        let se:f64 = e.iter().sum();
        let see:f64 = e.iter().map(|x| x*x).sum();
        let sey:f64 = e.iter().zip(y).map(|(a,b)| a*b).sum();
        let det = see*n - se*se;
        let a = (sey*n - se*sy)/det;
        let c = (see*sy - se*sey)/det;
        let res:f64 = e.iter().zip(y).map(|(e,y)| (a*e + c - y).powi(2)).sum();
        if res < best.0 {
            best = (res,r);
        }
    }
    best.1
}

#[test]
fn fid_on_a_small_grid_decays_at_r2star() {
    let n_events = 135;
    let r2star = 250.0;
    let mut map = TissueMap::new(4,4).unwrap();
    map.set_voxel(2,2,TissueVoxel::new(1.0,1.0,0.1,0.0,1.0)).unwrap();
    let mut spins = SpinSystem::new(4,4,24*24,ExecutionContext::default()).unwrap();
    spins.set_system(&map).unwrap();
    spins.set_off_resonance(&FrequencyDistribution::Lorentzian{r2star}).unwrap();

    let mut seq = EventSequence::new(n_events,1,0.08e-3,SequenceClass::GreDream).unwrap();
    seq.set_rf(3,0,FRAC_PI_2,0.0).unwrap();
    seq.set_adc_range(5,n_events - 2).unwrap();
    let event_time = Array2::from_elem((n_events,1),0.08e-3);

    let mut scanner = Scanner::new(ScannerConfig::default(),&spins).unwrap();
    scanner.set_sequence(&seq).unwrap();
    let signal = scanner.forward(&mut spins,&event_time).unwrap();

    let mut elapsed = 0.0;
    let (mut t,mut y) = (Vec::new(),Vec::new());
    for e in 0..n_events {
        elapsed += event_time[[e,0]];
        if seq.adc(e) {
            t.push(elapsed);
            y.push(signal.get(0,e,0).re);
        }
    }
    assert_eq!(t.len(),128);
    let r = fit_exponential(&t,&y);
    assert!((r - r2star).abs()/r2star < 0.1,"fitted R = {}",r);
}
