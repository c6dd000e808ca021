//! Synthetic appointment records.
//!
//! Records are drawn column by column from fixed distributions, then labelled by a rule-based
//! risk score:
//!
//! - a base score uniform in `[0, 1)`
//! - additive deltas applied in a fixed order (see [`adjusted_score`])
//! - `label_no_show = 1` iff the adjusted score is below [`NO_SHOW_THRESHOLD`]
//!
//! The deltas and threshold are compatibility constants: downstream consumers compare against
//! datasets produced with exactly these values.

use crate::record::{domains, AppointmentFeatures, AppointmentRecord};
use crate::{CoreError, CoreResult};
use noshow_types::Label;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Adjusted scores strictly below this value are labelled as no-shows.
pub const NO_SHOW_THRESHOLD: f64 = 0.20;

pub const LONG_LEAD_TIME_DAYS: u64 = 20;
pub const LONG_LEAD_TIME_DELTA: f64 = -0.15;
pub const FRIDAY_AFTERNOON_DELTA: f64 = -0.10;
pub const YOUNG_ADULT_DELTA: f64 = -0.05;
pub const PER_PRIOR_NO_SHOW_DELTA: f64 = -0.05;
pub const SENIOR_DELTA: f64 = 0.10;
pub const HIGH_DROPOUT_SPECIALTY_DELTA: f64 = -0.05;

const LEAD_TIME_SCALE_DAYS: f64 = 10.0;
const PRIOR_NO_SHOW_MEAN: f64 = 0.5;

/// Age bands as (share, lower bound inclusive, upper bound exclusive).
const CHILD_BAND: (f64, u32, u32) = (0.15, 0, 15);
const ADULT_BAND: (f64, u32, u32) = (0.60, 15, 65);
const SENIOR_UPPER: u32 = 95;

/// Applies the rule deltas to `base` in a fixed order.
pub fn adjusted_score(base: f64, features: &AppointmentFeatures) -> f64 {
    let mut score = base;
    if features.lead_time_days > LONG_LEAD_TIME_DAYS {
        score += LONG_LEAD_TIME_DELTA;
    }
    if features.weekday == domains::FRIDAY && features.shift == domains::AFTERNOON {
        score += FRIDAY_AFTERNOON_DELTA;
    }
    if (20..=35).contains(&features.age) {
        score += YOUNG_ADULT_DELTA;
    }
    score += features.prior_no_shows as f64 * PER_PRIOR_NO_SHOW_DELTA;
    if features.age > 65 {
        score += SENIOR_DELTA;
    }
    if features.specialty == domains::MENTAL_HEALTH || features.specialty == domains::DENTAL {
        score += HIGH_DROPOUT_SPECIALTY_DELTA;
    }
    score
}

/// Labels an adjusted score.
pub fn label_for_score(score: f64) -> Label {
    if score < NO_SHOW_THRESHOLD {
        Label::NoShow
    } else {
        Label::Attends
    }
}

/// Exponential draw with the given scale (mean), by inversion.
fn sample_exponential<R: Rng + ?Sized>(rng: &mut R, scale: f64) -> f64 {
    let u: f64 = rng.gen();
    -scale * (1.0 - u).ln()
}

/// Poisson draw by multiplying uniforms until the product falls below `exp(-mean)`.
///
/// Cost grows with `mean`; only small means are drawn here.
fn sample_poisson<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> u64 {
    let limit = (-mean).exp();
    let mut count = 0;
    let mut product: f64 = rng.gen();
    while product > limit {
        count += 1;
        product *= rng.gen::<f64>();
    }
    count
}

/// A generated record together with the base score it was labelled from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: AppointmentRecord,
    pub base_score: f64,
}

struct Distributions {
    sex: WeightedIndex<f64>,
    sector: WeightedIndex<f64>,
    coverage_tier: WeightedIndex<f64>,
    specialty: WeightedIndex<f64>,
    weekday: WeightedIndex<f64>,
    shift: WeightedIndex<f64>,
}

impl Distributions {
    fn new() -> CoreResult<Self> {
        fn weighted(name: &str, domain: &[(&str, f64)]) -> CoreResult<WeightedIndex<f64>> {
            WeightedIndex::new(domain.iter().map(|(_, w)| *w)).map_err(|e| {
                CoreError::InvalidInput(format!("invalid weights for {name}: {e}"))
            })
        }

        Ok(Self {
            sex: weighted("sex", domains::SEX)?,
            sector: weighted("sector", domains::SECTOR)?,
            coverage_tier: weighted("coverage_tier", domains::COVERAGE_TIER)?,
            specialty: weighted("specialty", domains::SPECIALTY)?,
            weekday: weighted("weekday", domains::WEEKDAY)?,
            shift: weighted("shift", domains::SHIFT)?,
        })
    }
}

/// Generates batches of labelled appointment records from a random source.
///
/// Output is fully determined by the random source: two synthesizers built with
/// [`Synthesizer::seeded`] and the same seed produce identical batches.
pub struct Synthesizer<R: Rng = StdRng> {
    rng: R,
    distributions: Distributions,
}

impl Synthesizer<StdRng> {
    /// A reproducible synthesizer.
    pub fn seeded(seed: u64) -> CoreResult<Self> {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// A synthesizer seeded from OS entropy.
    pub fn from_entropy() -> CoreResult<Self> {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> Synthesizer<R> {
    pub fn new(rng: R) -> CoreResult<Self> {
        Ok(Self {
            rng,
            distributions: Distributions::new()?,
        })
    }

    /// Generates `n` records with consecutive ids starting at `start_id`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if `start_id` is zero or the id range would overflow.
    pub fn generate(&mut self, n: usize, start_id: u64) -> CoreResult<Vec<AppointmentRecord>> {
        Ok(self
            .generate_scored(n, start_id)?
            .into_iter()
            .map(|scored| scored.record)
            .collect())
    }

    /// Like [`Synthesizer::generate`], but also returns each record's base score.
    pub fn generate_scored(&mut self, n: usize, start_id: u64) -> CoreResult<Vec<ScoredRecord>> {
        if start_id < 1 {
            return Err(CoreError::InvalidInput("start_id must be at least 1".into()));
        }
        if start_id.checked_add(n as u64).is_none() {
            return Err(CoreError::InvalidInput(format!(
                "cannot assign {n} ids starting at {start_id} without overflowing"
            )));
        }
        if n == 0 {
            return Ok(Vec::new());
        }

        let ages = self.ages(n);
        let sexes = self.categorical(n, domains::SEX, |d| &d.sex);
        let sectors = self.categorical(n, domains::SECTOR, |d| &d.sector);
        let tiers = self.categorical(n, domains::COVERAGE_TIER, |d| &d.coverage_tier);
        let specialties = self.categorical(n, domains::SPECIALTY, |d| &d.specialty);
        let weekdays = self.categorical(n, domains::WEEKDAY, |d| &d.weekday);
        let shifts = self.categorical(n, domains::SHIFT, |d| &d.shift);
        let lead_times: Vec<u64> = (0..n)
            .map(|_| sample_exponential(&mut self.rng, LEAD_TIME_SCALE_DAYS) as u64)
            .collect();
        let prior_no_shows: Vec<u64> = (0..n)
            .map(|_| sample_poisson(&mut self.rng, PRIOR_NO_SHOW_MEAN))
            .collect();
        let base_scores: Vec<f64> = (0..n).map(|_| self.rng.gen_range(0.0..1.0)).collect();

        let records = (0..n)
            .map(|i| {
                let features = AppointmentFeatures {
                    age: ages[i],
                    sex: sexes[i].to_string(),
                    sector: sectors[i].to_string(),
                    coverage_tier: tiers[i].to_string(),
                    specialty: specialties[i].to_string(),
                    weekday: weekdays[i].to_string(),
                    shift: shifts[i].to_string(),
                    lead_time_days: lead_times[i],
                    prior_no_shows: prior_no_shows[i],
                };
                let label_no_show = label_for_score(adjusted_score(base_scores[i], &features));
                ScoredRecord {
                    record: AppointmentRecord {
                        patient_id: start_id + i as u64,
                        features,
                        label_no_show,
                    },
                    base_score: base_scores[i],
                }
            })
            .collect();

        Ok(records)
    }

    /// Draws `n` ages from the child/adult/senior bands, then shuffles them.
    fn ages(&mut self, n: usize) -> Vec<u32> {
        let children = (n as f64 * CHILD_BAND.0) as usize;
        let adults = (n as f64 * ADULT_BAND.0) as usize;
        let seniors = n - children - adults;

        let mut ages = Vec::with_capacity(n);
        for _ in 0..children {
            ages.push(self.rng.gen_range(CHILD_BAND.1..CHILD_BAND.2));
        }
        for _ in 0..adults {
            ages.push(self.rng.gen_range(ADULT_BAND.1..ADULT_BAND.2));
        }
        for _ in 0..seniors {
            ages.push(self.rng.gen_range(ADULT_BAND.2..SENIOR_UPPER));
        }
        ages.shuffle(&mut self.rng);
        ages
    }

    fn categorical(
        &mut self,
        n: usize,
        domain: &'static [(&'static str, f64)],
        pick: impl Fn(&Distributions) -> &WeightedIndex<f64>,
    ) -> Vec<&'static str> {
        let distribution = pick(&self.distributions);
        (0..n)
            .map(|_| domain[distribution.sample(&mut self.rng)].0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn neutral() -> AppointmentFeatures {
        AppointmentFeatures {
            age: 45,
            sex: "Femenino".into(),
            sector: "Norte".into(),
            coverage_tier: "Fonasa B".into(),
            specialty: "Medicina General".into(),
            weekday: "Lunes".into(),
            shift: "Mañana".into(),
            lead_time_days: 5,
            prior_no_shows: 0,
        }
    }

    #[test]
    fn test_neutral_features_have_no_adjustment() {
        assert_eq!(adjusted_score(0.5, &neutral()), 0.5);
    }

    #[test]
    fn test_each_rule_delta() {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-12;

        let mut f = neutral();
        f.lead_time_days = 21;
        assert!(close(adjusted_score(0.5, &f), 0.35));
        f.lead_time_days = 20;
        assert!(close(adjusted_score(0.5, &f), 0.5));

        let mut f = neutral();
        f.weekday = "Viernes".into();
        f.shift = "Tarde".into();
        assert!(close(adjusted_score(0.5, &f), 0.40));
        f.shift = "Mañana".into();
        assert!(close(adjusted_score(0.5, &f), 0.5));

        for (age, expected) in [(19, 0.5), (20, 0.45), (35, 0.45), (36, 0.5), (65, 0.5), (66, 0.6)] {
            let mut f = neutral();
            f.age = age;
            assert!(close(adjusted_score(0.5, &f), expected), "age {age}");
        }

        let mut f = neutral();
        f.prior_no_shows = 3;
        assert!(close(adjusted_score(0.5, &f), 0.35));

        for specialty in ["Dental", "Salud Mental"] {
            let mut f = neutral();
            f.specialty = specialty.into();
            assert!(close(adjusted_score(0.5, &f), 0.45));
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(label_for_score(0.1999), Label::NoShow);
        assert_eq!(label_for_score(0.20), Label::Attends);
        assert_eq!(label_for_score(-0.3), Label::NoShow);
    }

    #[test]
    fn test_same_seed_same_batch() {
        let a = Synthesizer::seeded(42).unwrap().generate(200, 1).unwrap();
        let b = Synthesizer::seeded(42).unwrap().generate(200, 1).unwrap();
        assert_eq!(a, b);
        let c = Synthesizer::seeded(43).unwrap().generate(200, 1).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_records() {
        let mut synth = Synthesizer::seeded(1).unwrap();
        assert!(synth.generate(0, 1).unwrap().is_empty());
    }

    #[test]
    fn test_start_id_must_be_positive() {
        let mut synth = Synthesizer::seeded(1).unwrap();
        assert!(matches!(synth.generate(5, 0), Err(CoreError::InvalidInput(_))));
        assert!(matches!(
            synth.generate(5, u64::MAX - 2),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_age_bands() {
        let records = Synthesizer::seeded(7).unwrap().generate(1000, 1).unwrap();
        let children = records.iter().filter(|r| r.features.age < 15).count();
        let adults = records
            .iter()
            .filter(|r| (15..65).contains(&r.features.age))
            .count();
        let seniors = records.iter().filter(|r| r.features.age >= 65).count();
        assert_eq!((children, adults, seniors), (150, 600, 250));
        assert!(records.iter().all(|r| r.features.age < 95));
    }

    #[test]
    fn test_no_show_rate_is_plausible() {
        let records = Synthesizer::seeded(42).unwrap().generate(10_000, 1).unwrap();
        let rate = records
            .iter()
            .filter(|r| r.label_no_show == Label::NoShow)
            .count() as f64
            / records.len() as f64;
        // The additive deltas push the rate well above the bare 20% threshold share.
        assert!(rate > 0.20 && rate < 0.40, "rate {rate}");
    }

    #[test]
    fn test_sampler_means() {
        let mut rng = StdRng::seed_from_u64(99);
        let n = 20_000;
        let exp_mean: f64 =
            (0..n).map(|_| sample_exponential(&mut rng, 10.0)).sum::<f64>() / n as f64;
        assert!((exp_mean - 10.0).abs() < 0.5, "exponential mean {exp_mean}");
        let poisson_mean =
            (0..n).map(|_| sample_poisson(&mut rng, 0.5)).sum::<u64>() as f64 / n as f64;
        assert!((poisson_mean - 0.5).abs() < 0.03, "poisson mean {poisson_mean}");
    }

    proptest! {
        #[test]
        fn prop_generate_length_and_ids(n in 0usize..300, start_id in 1u64..1_000_000, seed in any::<u64>()) {
            let records = Synthesizer::seeded(seed).unwrap().generate(n, start_id).unwrap();
            prop_assert_eq!(records.len(), n);
            for (i, record) in records.iter().enumerate() {
                prop_assert_eq!(record.patient_id, start_id + i as u64);
            }
        }

        #[test]
        fn prop_label_follows_scoring_rule(n in 1usize..200, seed in any::<u64>()) {
            let scored = Synthesizer::seeded(seed).unwrap().generate_scored(n, 1).unwrap();
            for s in &scored {
                let expected = label_for_score(adjusted_score(s.base_score, &s.record.features));
                prop_assert_eq!(s.record.label_no_show, expected);
                prop_assert!((0.0..1.0).contains(&s.base_score));
                prop_assert!(s.record.features.is_within_domains());
            }
        }
    }
}
