//! Prompt-variant selection for A/B experiments.
//!
//! Every call picks uniformly at random from the configured set. There is no session
//! affinity: two calls for the same request identifier may get different variants.

pub mod error;

pub use error::RoutingError;

use rand::Rng;
use rand::seq::SliceRandom;

/// Uniform random chooser over a fixed, non-empty variant set.
#[derive(Debug, Clone)]
pub struct VariantRouter {
    variants: Vec<String>,
}

impl VariantRouter {
    /// Builds a router over `variants`, in the given order. Rejects empty sets and blank ids.
    pub fn new<I, S>(variants: I) -> Result<Self, RoutingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        if variants.is_empty() {
            return Err(RoutingError::EmptyVariantSet);
        }
        if let Some(index) = variants.iter().position(|v| v.trim().is_empty()) {
            return Err(RoutingError::BlankVariant { index });
        }
        Ok(Self { variants })
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Picks a variant using the thread-local RNG.
    pub fn choose(&self) -> &str {
        self.choose_with(&mut rand::thread_rng())
    }

    /// Picks a variant using `rng`.
    pub fn choose_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        // `new` guarantees at least one variant.
        self.variants
            .choose(rng)
            .map(String::as_str)
            .unwrap_or(&self.variants[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_rejects_empty_set() {
        assert_eq!(
            VariantRouter::new(Vec::<String>::new()).unwrap_err(),
            RoutingError::EmptyVariantSet
        );
    }

    #[test]
    fn test_rejects_blank_variant() {
        assert_eq!(
            VariantRouter::new(["v1", " "]).unwrap_err(),
            RoutingError::BlankVariant { index: 1 }
        );
    }

    #[test]
    fn test_single_variant_always_chosen() {
        let router = VariantRouter::new(["v1"]).unwrap();
        for _ in 0..100 {
            assert_eq!(router.choose(), "v1");
        }
    }

    #[test]
    fn test_choice_is_member_of_set() {
        let router = VariantRouter::new(["a", "b", "c"]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let chosen = router.choose_with(&mut rng);
            assert!(router.variants().iter().any(|v| v == chosen));
        }
    }

    #[test]
    fn test_two_variants_split_evenly() {
        let router = VariantRouter::new(["v1", "v2"]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let v1 = (0..10_000)
            .filter(|_| router.choose_with(&mut rng) == "v1")
            .count();

        assert!((4_500..=5_500).contains(&v1), "v1 chosen {v1} times");
    }

    #[test]
    fn test_unseeded_choice_covers_both_variants() {
        let router = VariantRouter::new(["v1", "v2"]).unwrap();
        let v1 = (0..10_000).filter(|_| router.choose() == "v1").count();
        assert!((4_500..=5_500).contains(&v1), "v1 chosen {v1} times");
    }
}
