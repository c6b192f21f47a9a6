//! `gemsweep tiling`: print the blocking model's output.

use anyhow::Result;

use gemsweep_core::{compute_blocking, Blocking, BlockingParams, Isa};
use gemsweep_sim::binary_name;

pub fn compute(params: &BlockingParams) -> Result<Blocking> {
    Ok(compute_blocking(params)?)
}

pub fn run(params: &BlockingParams, isa: Isa) -> Result<()> {
    let blocking = compute(params)?;
    println!("k_c:        {}", blocking.k_c);
    println!("unroll:     {}", blocking.unroll);
    println!("iterations: {}", blocking.iterations());
    println!("binary:     {}", binary_name(isa, params.mr, params.nr));
    Ok(())
}
