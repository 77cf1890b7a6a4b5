use anyhow::Result;
use bytetrack::utils::linear_sum_assignment::{assign, linear_sum_assignment, UNASSIGNABLE_COST};
use pathfinding::matrix::Matrix;

fn main() -> Result<()> {
    let cost = Matrix::from_rows(vec![
        vec![4.0_f32, 1.0, 3.0],
        vec![2.0, 0.0, 5.0],
        vec![3.0, 2.0, 2.0],
    ])
    .map_err(|e| anyhow::anyhow!("{e:?}"))?;

    let pairs = linear_sum_assignment(&cost)?;
    let total = pairs.iter().map(|p| cost[*p]).sum::<f32>();
    eprintln!("Pairs: {pairs:?}, total cost: {total}");

    let s = UNASSIGNABLE_COST;
    let gated = Matrix::from_rows(vec![vec![s, 0.1], vec![0.3, s], vec![0.2, 0.4]])
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;
    eprintln!("Gated assignment: {:#?}", assign(&gated)?);
    Ok(())
}
