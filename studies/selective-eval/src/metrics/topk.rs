use std::cmp::Ordering;

use ndarray::{ ArrayView1, ArrayView2 };

use crate::error::{ Error, Result };

/// Computes the accuracy over the k top predictions for the specified values
/// of k, as percentages in the order of `topk`.
///
/// Each k is capped at the number of classes. Classes with equal scores keep
/// their column order.
pub fn accuracy(
    output: ArrayView2<'_, f32>,
    target: ArrayView1<'_, usize>,
    topk: &[usize]
) -> Result<Vec<f64>> {
    check_shapes(&output, &target)?;

    let Some(&max_requested) = topk.iter().max() else {
        return Ok(Vec::new());
    };
    let maxk = max_requested.min(output.ncols());
    let batch_size = target.len();

    // rank of the true class inside each row's top-maxk, if it made it
    let ranks: Vec<Option<usize>> = output
        .outer_iter()
        .zip(target.iter())
        .map(|(row, &label)| {
            ranked_classes(row)
                .into_iter()
                .take(maxk)
                .position(|class| class == label)
        })
        .collect();

    Ok(
        topk
            .iter()
            .map(|&k| {
                let k = k.min(maxk);
                let correct = ranks
                    .iter()
                    .filter(|rank| rank.is_some_and(|rank| rank < k))
                    .count();
                ((correct as f64) * 100.0) / (batch_size as f64)
            })
            .collect()
    )
}

/// Class indices ordered by descending score.
pub fn ranked_classes(row: ArrayView1<'_, f32>) -> Vec<usize> {
    let mut classes: Vec<usize> = (0..row.len()).collect();
    classes.sort_by(|&a, &b| descending(row[a], row[b]));
    classes
}

/// Highest scoring class and its score; the first one wins a tie.
pub fn top1(row: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    row.iter()
        .copied()
        .enumerate()
        .fold(None, |best, (class, score)| {
            match best {
                Some((_, best_score)) if descending(score, best_score) != Ordering::Less => best,
                _ => Some((class, score)),
            }
        })
}

fn descending(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}

pub(crate) fn check_shapes(
    output: &ArrayView2<'_, f32>,
    target: &ArrayView1<'_, usize>
) -> Result<()> {
    if output.nrows() != target.len() {
        return Err(Error::ShapeMismatch {
            rows: output.nrows(),
            targets: target.len(),
        });
    }
    Ok(())
}
