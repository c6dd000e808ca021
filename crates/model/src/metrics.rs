//! Hold-out splitting and evaluation metrics for a fitted artifact.

use noshow_types::{Label, Probability};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Splits `items` into `(train, test)` so that each class keeps its share in both parts.
///
/// `class_of` names the class of an item. `test_fraction` is clamped to `[0, 1]`; the test part
/// receives `ceil(len * test_fraction)` items in total, allocated across classes in proportion to
/// their size with leftover slots going to the largest remainders. Items are shuffled within
/// their class before the cut and both parts are shuffled again afterwards, all from one
/// `StdRng` seeded with `seed`.
pub fn stratified_split<T, K, F>(
    items: &[T],
    class_of: F,
    test_fraction: f64,
    seed: u64,
) -> (Vec<T>, Vec<T>)
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    // Classes in order of first appearance keep the output independent of hashing.
    let mut classes: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let key = class_of(item);
        match classes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(item.clone()),
            None => classes.push((key, vec![item.clone()])),
        }
    }

    let total = items.len();
    let test_total =
        (((total as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize).min(total);
    let quotas = class_quotas(
        &classes.iter().map(|(_, m)| m.len()).collect::<Vec<_>>(),
        test_total,
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(total - test_total);
    let mut test = Vec::with_capacity(test_total);
    for ((_, mut members), quota) in classes.into_iter().zip(quotas) {
        members.shuffle(&mut rng);
        let rest = members.split_off(quota);
        test.extend(members);
        train.extend(rest);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    (train, test)
}

/// Largest-remainder allocation of `test_total` slots over classes of the given sizes.
fn class_quotas(sizes: &[usize], test_total: usize) -> Vec<usize> {
    let total: usize = sizes.iter().sum();
    if total == 0 {
        return vec![0; sizes.len()];
    }

    let mut quotas: Vec<usize> = sizes.iter().map(|n| n * test_total / total).collect();
    let mut remainders: Vec<(usize, usize)> = sizes
        .iter()
        .enumerate()
        .map(|(i, n)| (n * test_total % total, i))
        .collect();
    // Larger remainder first, earlier class on ties.
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut left = test_total - quotas.iter().sum::<usize>();
    for (_, i) in remainders {
        if left == 0 {
            break;
        }
        if quotas[i] < sizes[i] {
            quotas[i] += 1;
            left -= 1;
        }
    }
    quotas
}

/// Binary confusion matrix with no-show as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

/// Summary of predictions against known labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    /// `None` when only one class is present in the labels.
    pub roc_auc: Option<f64>,
    pub confusion: ConfusionMatrix,
}

impl Evaluation {
    /// Scores `predictions` (probabilities for the positive class) against `labels`.
    ///
    /// Pairs beyond the shorter of the two slices are ignored.
    pub fn compute(predictions: &[Probability], labels: &[Label]) -> Self {
        let mut confusion = ConfusionMatrix::default();
        for (p, label) in predictions.iter().zip(labels) {
            match (p.label(), label) {
                (Label::Attends, Label::Attends) => confusion.true_negatives += 1,
                (Label::NoShow, Label::Attends) => confusion.false_positives += 1,
                (Label::Attends, Label::NoShow) => confusion.false_negatives += 1,
                (Label::NoShow, Label::NoShow) => confusion.true_positives += 1,
            }
        }
        let total = predictions.len().min(labels.len());
        let correct = confusion.true_negatives + confusion.true_positives;

        Self {
            accuracy: if total == 0 {
                0.0
            } else {
                correct as f64 / total as f64
            },
            roc_auc: roc_auc(predictions, labels),
            confusion,
        }
    }
}

/// Area under the ROC curve via the rank-sum formulation, averaging ranks over ties.
fn roc_auc(predictions: &[Probability], labels: &[Label]) -> Option<f64> {
    let mut scored: Vec<(f64, Label)> = predictions
        .iter()
        .zip(labels)
        .map(|(p, l)| (p.value(), *l))
        .collect();
    let positives = scored.iter().filter(|(_, l)| *l == Label::NoShow).count();
    let negatives = scored.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < scored.len() {
        let mut end = start + 1;
        while end < scored.len() && scored[end].0 == scored[start].0 {
            end += 1;
        }
        // Ranks are 1-based; tied scores share the mean rank of their block.
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        let block_positives = scored[start..end]
            .iter()
            .filter(|(_, l)| *l == Label::NoShow)
            .count();
        positive_rank_sum += mean_rank * block_positives as f64;
        start = end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs(values: &[f64]) -> Vec<Probability> {
        values.iter().map(|v| Probability::new(*v).unwrap()).collect()
    }

    fn parity(n: &u32) -> bool {
        n % 2 == 0
    }

    #[test]
    fn test_split_sizes_and_coverage() {
        let items: Vec<u32> = (0..10).collect();
        let (train, test) = stratified_split(&items, parity, 0.2, 42);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        let mut all: Vec<u32> = train.iter().chain(&test).copied().collect();
        all.sort();
        assert_eq!(all, items);
    }

    #[test]
    fn test_split_is_seeded() {
        let items: Vec<u32> = (0..50).collect();
        assert_eq!(
            stratified_split(&items, parity, 0.3, 7),
            stratified_split(&items, parity, 0.3, 7)
        );
    }

    #[test]
    fn test_split_preserves_class_ratio() {
        // 900 of class 0 and 100 of class 1: a 10% minority like the synthetic labels.
        let items: Vec<(u32, Label)> = (0..1000)
            .map(|i| {
                let label = if i % 10 == 3 {
                    Label::NoShow
                } else {
                    Label::Attends
                };
                (i, label)
            })
            .collect();

        for seed in [1, 42, 1234] {
            let (train, test) = stratified_split(&items, |(_, l)| *l, 0.2, seed);
            assert_eq!(test.len(), 200);
            assert_eq!(train.len(), 800);

            let positives = |part: &[(u32, Label)]| {
                part.iter().filter(|(_, l)| *l == Label::NoShow).count()
            };
            assert_eq!(positives(&test), 20);
            assert_eq!(positives(&train), 80);
        }
    }

    #[test]
    fn test_split_rounds_with_largest_remainder() {
        // 7 of one class, 3 of the other, 30% test: ceil(3.0) = 3 slots, 2.1 and 0.9 exact.
        let items: Vec<u32> = (0..10).collect();
        let (_, test) = stratified_split(&items, |n| *n < 7, 0.3, 5);
        assert_eq!(test.len(), 3);
        assert_eq!(test.iter().filter(|n| **n < 7).count(), 2);
        assert_eq!(class_quotas(&[7, 3], 3), vec![2, 1]);
        assert_eq!(class_quotas(&[], 0), Vec::<usize>::new());
    }

    #[test]
    fn test_split_single_class_still_splits() {
        let items: Vec<u32> = (0..20).collect();
        let (train, test) = stratified_split(&items, |_| (), 0.25, 3);
        assert_eq!((train.len(), test.len()), (15, 5));
    }

    #[test]
    fn test_perfect_ranking_has_unit_auc() {
        let eval = Evaluation::compute(
            &probs(&[0.1, 0.2, 0.8, 0.9]),
            &[Label::Attends, Label::Attends, Label::NoShow, Label::NoShow],
        );
        assert_eq!(eval.roc_auc, Some(1.0));
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.confusion.true_positives, 2);
        assert_eq!(eval.confusion.true_negatives, 2);
    }

    #[test]
    fn test_ties_give_half_credit() {
        let eval = Evaluation::compute(&probs(&[0.4, 0.4]), &[Label::Attends, Label::NoShow]);
        assert_eq!(eval.roc_auc, Some(0.5));
        assert_eq!(eval.confusion.false_negatives, 1);
    }

    #[test]
    fn test_single_class_has_no_auc() {
        let eval = Evaluation::compute(&probs(&[0.4, 0.7]), &[Label::NoShow, Label::NoShow]);
        assert_eq!(eval.roc_auc, None);
        assert_eq!(eval.accuracy, 0.5);
    }
}
