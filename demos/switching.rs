//! MAP estimation and pruning on a switching chain.
//!
//! Four states linked by odometry whose mode (stay or move) is unknown. The net is built by the
//! same fixture the scenario tests use.

#[path = "../tests/common/mod.rs"]
mod common;

use jerome_hybrid as j;

fn main() -> j::Result<()> {

    ///////////////////////////////////////////////////
    // Step 1: Build the net
    let bn = common::switching(4);
    for c in bn.iter() {
        println!("{}", c);
    }

    ///////////////////////////////////////////////////
    // Step 2: MAP estimate
    let map = bn.optimize()?;
    println!("\nMAP modes: {}", map.discrete());
    println!("MAP delta: {}", map.continuous());

    ///////////////////////////////////////////////////
    // Step 3: How likely is every mode sequence at the MAP delta?
    let errors = bn.error_tree(map.continuous())?;
    println!();
    for (assignment, error) in errors.enumerate() {
        println!("{} -> error {:.6}, p ∝ {:.6}", assignment, error, (-error).exp());
    }

    ///////////////////////////////////////////////////
    // Step 4: Keep the three most likely sequences
    let pruned = bn.prune(3);
    let after = pruned.optimize()?;
    println!("\nafter pruning to 3 leaves the MAP modes are still {}", after.discrete());

    for a in j::all_assignments(&pruned.discrete_keys()) {
        match pruned.choose(&a) {
            Ok(gbn) => println!("{} kept, solution {}", a, gbn.optimize()?),
            Err(j::HybridError::PrunedAssignment) => println!("{} pruned", a),
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
