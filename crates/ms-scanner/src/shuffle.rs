//! Uniform shuffle of the registry listing.

use rand::Rng;

/// Builds a uniformly random permutation of `names` in one pass.
///
/// For the i-th name (0-indexed) a slot `r` is drawn uniformly from
/// `[0, i]`; the name occupying `r` moves to the new slot `i` and the new name
/// takes `r`. Every permutation is equally likely.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use ms_scanner::shuffle_names;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let mut shuffled = shuffle_names(["a", "b", "c"].map(String::from), &mut rng);
/// shuffled.sort();
/// assert_eq!(shuffled, ["a", "b", "c"]);
/// ```
pub fn shuffle_names<I, R>(names: I, rng: &mut R) -> Vec<String>
where
    I: IntoIterator<Item = String>,
    R: Rng + ?Sized,
{
    let names = names.into_iter();
    let mut list: Vec<String> = Vec::with_capacity(names.size_hint().0);

    for name in names {
        let i = list.len();
        let r = rng.gen_range(0..=i);
        if r == i {
            list.push(name);
        } else {
            let displaced = std::mem::replace(&mut list[r], name);
            list.push(displaced);
        }
    }

    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("pkg-{i}")).collect()
    }

    #[test]
    fn test_output_is_permutation() {
        let mut rng = StdRng::seed_from_u64(1);
        for n in [0, 1, 2, 17, 500] {
            let input = names(n);
            let mut output = shuffle_names(input.clone(), &mut rng);
            assert_eq!(output.len(), n);
            output.sort();
            let mut expected = input;
            expected.sort();
            assert_eq!(output, expected);
        }
    }

    #[test]
    fn test_position_distribution_is_uniform() {
        const N: usize = 5;
        const TRIALS: usize = 50_000;

        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut counts = [[0usize; N]; N];

        for _ in 0..TRIALS {
            let shuffled = shuffle_names(names(N), &mut rng);
            for (position, name) in shuffled.iter().enumerate() {
                let original = name
                    .strip_prefix("pkg-")
                    .and_then(|i| i.parse::<usize>().ok())
                    .expect("generated name");
                counts[original][position] += 1;
            }
        }

        // 10_000 expected hits per cell; 5% is over five standard deviations.
        let expected = TRIALS / N;
        let tolerance = expected / 20;
        for row in &counts {
            for &count in row {
                assert!(
                    count.abs_diff(expected) < tolerance,
                    "cell count {count} too far from {expected}"
                );
            }
        }
    }

    #[test]
    fn test_position_chi_square() {
        const N: usize = 4;
        const TRIALS: usize = 24_000;

        let mut rng = StdRng::seed_from_u64(42);
        let mut first_slot = [0u32; N];
        for _ in 0..TRIALS {
            let shuffled = shuffle_names(names(N), &mut rng);
            let original = shuffled[0]
                .strip_prefix("pkg-")
                .and_then(|i| i.parse::<usize>().ok())
                .expect("generated name");
            first_slot[original] += 1;
        }

        let expected = f64::from(u32::try_from(TRIALS / N).expect("fits"));
        let chi_square: f64 = first_slot
            .iter()
            .map(|&observed| {
                let diff = f64::from(observed) - expected;
                diff * diff / expected
            })
            .sum();
        // 3 degrees of freedom, p = 0.001.
        assert!(chi_square < 16.27, "chi-square {chi_square}");
    }
}
