//! Provides an example of how to represent a small hybrid Bayes net by hand.
//!
//! A robot is either parked or driving. Its speed is Gaussian with a mean and spread set by that
//! mode, and its position is its previous position plus its speed.

use jerome_hybrid as j;
use ndarray::array;

fn main() -> j::Result<()> {

    let position = j::symbol('x', 1);
    let speed = j::symbol('v', 1);
    let driving = j::DiscreteKey::binary(j::symbol('d', 1));

    ///////////////////////////////////////////////////
    // Step 1: Define the conditionals, in elimination order

    // position = speed, with standard deviation 0.1
    let p_position = j::GaussianConditional::scalar(position, 10.0, &[(speed, -10.0)], 0.0)?;

    // speed ~ N(0, 0.01²) when parked and N(5, 2²) when driving
    let p_speed = j::GaussianMixture::from_conditionals(
        vec![driving],
        vec![
            j::GaussianConditional::from_mean_and_stddev(speed, array![0.0], 0.01)?,
            j::GaussianConditional::from_mean_and_stddev(speed, array![5.0], 2.0)?,
        ],
    )?;

    let p_driving = j::DiscreteConditional::from_table(driving, vec![], array![0.7, 0.3].into_dyn())?;

    ///////////////////////////////////////////////////
    // Step 2: Build the net
    let bn = j::HybridBayesNetBuilder::new()
        .with_conditional(p_position)
        .with_conditional(p_speed)
        .with_conditional(p_driving)
        .build()?;

    ///////////////////////////////////////////////////
    // Step 3: Compare the modes at an observed state
    let observed = j::VectorValues::new()
        .with(position, array![1.0])
        .with(speed, array![1.0]);

    let errors = bn.error_tree(&observed)?;
    for (assignment, error) in errors.enumerate() {
        println!("{}: error {:.3}", assignment, error);
    }

    println!("log normalization constants: {:?}", bn.at_mixture(1).map(|m| m.log_normalization_constants()));

    ///////////////////////////////////////////////////
    // Step 4: Most likely explanation without observations, and a few samples
    if let Some(prior) = bn.at_discrete(2) {
        println!("most likely mode a priori: {}", prior.argmax(&j::Assignment::new())?);
    }

    // the joint optimum also weighs how narrow each speed branch is
    let map = bn.optimize()?;
    println!("MAP: {} {}", map.discrete(), map.continuous());

    let mut rng = rand::thread_rng();
    for _ in 0..3 {
        let sample = bn.sample(&mut rng)?;
        println!("sample: {} {}", sample.discrete(), sample.continuous());
    }

    Ok(())
}
