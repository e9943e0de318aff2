#![no_main]

use libfuzzer_sys::fuzz_target;
use robustsim_core::noise::{NoiseConfig, NoiseInjector, NoiseModel};
use robustsim_core::prng::XorShift32;

fuzz_target!(|data: &[u8]| {
    if data.len() < 6 {
        return;
    }
    let model = NoiseModel::ALL[usize::from(data[0]) % NoiseModel::ALL.len()];
    let level = f64::from(data[1].max(1)) / 255.0;
    let seed = u32::from_le_bytes([data[2], data[3], data[4], data[5]]);

    let vector: Vec<f64> = data[6..]
        .iter()
        .map(|&b| f64::from(b) / 127.5 - 1.0)
        .collect();

    let injector = NoiseInjector::from_config(&NoiseConfig::known(model, level), 0.5)
        .expect("built-in models resolve");
    let mut rng = XorShift32::new(seed);
    let noisy = injector.apply(&vector, &mut rng);

    assert_eq!(noisy.len(), vector.len());
    assert!(noisy.iter().all(|x| x.is_finite()));
    assert_ne!(rng.state(), 0);
});
