use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Error;

/// A loyalty level unlocked at a minimum number of points
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    /// Points required to enter this tier
    pub minimum_points: u32,
    /// Rank of the tier, used to break ties between equal thresholds
    pub order: u32,
    /// Earn-rate multiplier applied to purchases while in this tier
    #[serde(default)]
    pub multiplier: Option<Multiplier>,
    #[serde(default)]
    pub benefits: String,
}

impl Tier {
    pub fn new(name: impl Into<String>, minimum_points: u32, order: u32) -> Self {
        Self {
            name: name.into(),
            minimum_points,
            order,
            multiplier: None,
            benefits: String::new(),
        }
    }

    pub fn with_multiplier(mut self, numerator: u32, denominator: u32) -> Self {
        self.multiplier = Some(Multiplier {
            numerator,
            denominator,
        });
        self
    }

    pub fn with_benefits(mut self, benefits: impl Into<String>) -> Self {
        self.benefits = benefits.into();
        self
    }

    /// Scale a base number of points by this tier's multiplier
    ///
    /// Tiers without a multiplier earn at 1x. Fractional points are dropped.
    pub fn scale(&self, base_points: u32) -> Result<u32, Error> {
        match &self.multiplier {
            Some(multiplier) => multiplier.apply(base_points),
            None => Ok(base_points),
        }
    }
}

/// Rational earn-rate multiplier, `numerator / denominator`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiplier {
    pub numerator: u32,
    pub denominator: u32,
}

impl Multiplier {
    fn validate(&self, tier: &str) -> Result<(), Error> {
        if self.denominator == 0 {
            return Err(Error::Configuration(
                format!("tier {tier} has a multiplier with a zero denominator").into(),
            ));
        }
        if self.numerator < self.denominator {
            return Err(Error::Configuration(
                format!(
                    "tier {tier} has a multiplier below 1 ({}/{})",
                    self.numerator, self.denominator
                )
                .into(),
            ));
        }
        Ok(())
    }

    fn apply(&self, base_points: u32) -> Result<u32, Error> {
        if self.denominator == 0 {
            return Err(Error::Configuration("multiplier denominator is zero".into()));
        }
        let scaled = base_points as u64 * self.numerator as u64 / self.denominator as u64;
        u32::try_from(scaled).map_err(|_| {
            Error::InvalidInput(format!("{base_points} points overflow once multiplied").into())
        })
    }
}

/// Select the tier a points balance belongs to
///
/// Returns the tier with the greatest `minimum_points` that is still `<= points`. When several
/// tiers share that threshold, the one with the highest `order` wins. Reaching a threshold
/// exactly places the balance in that tier.
pub fn resolve_tier(points: u32, tiers: &[Tier]) -> Result<&Tier, Error> {
    check_resolvable(tiers)?;

    tiers
        .iter()
        .filter(|tier| tier.minimum_points <= points)
        .max_by_key(|tier| (tier.minimum_points, tier.order))
        .ok_or_else(|| Error::Configuration("no tier is reachable".into()))
}

/// Distance from a points balance to the next tier
pub fn points_to_next_tier(points: u32, tiers: &[Tier]) -> Result<TierProgress, Error> {
    let current = resolve_tier(points, tiers)?;
    let next = tiers
        .iter()
        .filter(|tier| tier.minimum_points > points)
        .min_by_key(|tier| (tier.minimum_points, std::cmp::Reverse(tier.order)));

    Ok(TierProgress::between(points, current, next))
}

fn check_resolvable(tiers: &[Tier]) -> Result<(), Error> {
    if tiers.is_empty() {
        return Err(Error::Configuration("tier table is empty".into()));
    }
    if !tiers.iter().any(|tier| tier.minimum_points == 0) {
        return Err(Error::Configuration(
            "tier table has no tier starting at 0 points".into(),
        ));
    }
    Ok(())
}

/// Progress of a balance towards the next tier
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TierProgress {
    pub current: Tier,
    /// `None` when the balance is already in the top tier
    pub next: Option<Tier>,
    pub points_remaining: u32,
    /// Between 0 and 100
    pub progress_percent: u8,
}

impl TierProgress {
    fn between(points: u32, current: &Tier, next: Option<&Tier>) -> Self {
        let Some(next) = next else {
            return Self {
                current: current.clone(),
                next: None,
                points_remaining: 0,
                progress_percent: 100,
            };
        };

        let span = (next.minimum_points - current.minimum_points) as u64;
        let done = (points - current.minimum_points) as u64;
        let progress_percent = (done * 100 / span).min(100) as u8;

        Self {
            current: current.clone(),
            next: Some(next.clone()),
            points_remaining: next.minimum_points - points,
            progress_percent,
        }
    }
}

/// Validated, ordered tier configuration
///
/// Tiers are sorted by `order`, thresholds strictly increase along that order and the first tier
/// starts at 0 points. Resolution against a `TierTable` therefore cannot fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    pub fn new(mut tiers: Vec<Tier>) -> Result<Self, Error> {
        check_resolvable(&tiers)?;

        let mut orders = HashSet::with_capacity(tiers.len());
        for tier in &tiers {
            if !orders.insert(tier.order) {
                return Err(Error::Configuration(
                    format!("tier order {} is used more than once", tier.order).into(),
                ));
            }
            if let Some(multiplier) = &tier.multiplier {
                multiplier.validate(&tier.name)?;
            }
        }

        tiers.sort_by_key(|tier| tier.order);
        for pair in tiers.windows(2) {
            if pair[1].minimum_points <= pair[0].minimum_points {
                return Err(Error::Configuration(
                    format!(
                        "tier {} ({} points) must require more points than tier {} ({} points)",
                        pair[1].name, pair[1].minimum_points, pair[0].name, pair[0].minimum_points
                    )
                    .into(),
                ));
            }
        }

        Ok(Self { tiers })
    }

    /// Bronze / Silver / Gold / Platinum table used when nothing else is configured
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                Tier::new("Bronze", 0, 0).with_benefits("Standard earn rate"),
                Tier::new("Silver", 3000, 1)
                    .with_multiplier(5, 4)
                    .with_benefits("25% bonus points on approved receipts"),
                Tier::new("Gold", 6000, 2)
                    .with_multiplier(3, 2)
                    .with_benefits("50% bonus points on approved receipts"),
                Tier::new("Platinum", 10000, 3)
                    .with_multiplier(2, 1)
                    .with_benefits("Double points on approved receipts"),
            ],
        }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn resolve(&self, points: u32) -> &Tier {
        // Invariants are checked in `new`: the first tier starts at 0 and thresholds increase.
        self.tiers
            .iter()
            .rev()
            .find(|tier| tier.minimum_points <= points)
            .unwrap_or(&self.tiers[0])
    }

    pub fn progress(&self, points: u32) -> TierProgress {
        let position = self
            .tiers
            .iter()
            .rposition(|tier| tier.minimum_points <= points)
            .unwrap_or(0);

        TierProgress::between(points, &self.tiers[position], self.tiers.get(position + 1))
    }

    pub fn get(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.name == name)
    }
}

impl TryFrom<Vec<Tier>> for TierTable {
    type Error = Error;

    fn try_from(tiers: Vec<Tier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<TierTable> for Vec<Tier> {
    fn from(table: TierTable) -> Self {
        table.tiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use speculoos::prelude::*;

    #[fixture]
    fn tiers() -> Vec<Tier> {
        TierTable::standard().into()
    }

    #[rstest]
    #[case(0, "Bronze")]
    #[case(2999, "Bronze")]
    #[case(3000, "Silver")]
    #[case(3001, "Silver")]
    #[case(5999, "Silver")]
    #[case(6000, "Gold")]
    #[case(9999, "Gold")]
    #[case(10000, "Platinum")]
    #[case(u32::MAX, "Platinum")]
    fn test_resolve_tier_boundaries(
        tiers: Vec<Tier>,
        #[case] points: u32,
        #[case] expected: &str,
    ) {
        // GIVEN the standard tier table

        // WHEN resolving the tier for a number of points
        let res = resolve_tier(points, &tiers);

        // THEN the threshold reached exactly belongs to the higher tier
        assert_that!(res)
            .is_ok()
            .matches(|tier| tier.name == expected);
    }

    #[rstest]
    fn test_resolve_tier_greatest_satisfied(tiers: Vec<Tier>) {
        let table = TierTable::new(tiers.clone()).unwrap();

        for points in (0..12_000).step_by(7) {
            let tier = resolve_tier(points, &tiers).unwrap();

            assert_that!(tier.minimum_points).is_less_than_or_equal_to(points);
            assert_that!(tiers
                .iter()
                .any(|other| other.minimum_points > tier.minimum_points
                    && other.minimum_points <= points))
            .is_false();
            // The validated table agrees with the free function
            assert_that!(table.resolve(points)).is_equal_to(tier);
        }
    }

    #[rstest]
    fn test_resolve_tier_unordered_input(mut tiers: Vec<Tier>) {
        tiers.reverse();

        let res = resolve_tier(6500, &tiers);

        assert_that!(res).is_ok().matches(|tier| tier.name == "Gold");
    }

    #[test]
    fn test_resolve_tier_tie_highest_order() {
        let tiers = vec![
            Tier::new("Base", 0, 0),
            Tier::new("Member", 100, 1),
            Tier::new("Founder", 100, 2),
        ];

        let res = resolve_tier(150, &tiers);

        assert_that!(res).is_ok().matches(|tier| tier.name == "Founder");
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![Tier::new("Silver", 3000, 1), Tier::new("Gold", 6000, 2)])]
    fn test_resolve_tier_misconfigured(#[case] tiers: Vec<Tier>) {
        let res = resolve_tier(5000, &tiers);

        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::Configuration(_)));
    }

    #[rstest]
    #[case(0, Some("Silver"), 3000, 0)]
    #[case(1500, Some("Silver"), 1500, 50)]
    #[case(2999, Some("Silver"), 1, 99)]
    #[case(3000, Some("Gold"), 3000, 0)]
    #[case(7000, Some("Platinum"), 3000, 25)]
    #[case(10000, None, 0, 100)]
    #[case(250_000, None, 0, 100)]
    fn test_points_to_next_tier(
        tiers: Vec<Tier>,
        #[case] points: u32,
        #[case] next: Option<&str>,
        #[case] remaining: u32,
        #[case] percent: u8,
    ) {
        let res = points_to_next_tier(points, &tiers).unwrap();

        assert_that!(res.next.as_ref().map(|tier| tier.name.as_str())).is_equal_to(next);
        assert_that!(res.points_remaining).is_equal_to(remaining);
        assert_that!(res.progress_percent).is_equal_to(percent);
        // The validated table agrees with the free function
        let table = TierTable::new(tiers).unwrap();
        assert_that!(table.progress(points)).is_equal_to(res);
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::no_zero(vec![Tier::new("Silver", 3000, 0)])]
    #[case::duplicate_order(vec![Tier::new("Bronze", 0, 0), Tier::new("Silver", 3000, 0)])]
    #[case::not_increasing(vec![Tier::new("Bronze", 0, 0), Tier::new("Silver", 3000, 2), Tier::new("Gold", 2000, 3)])]
    #[case::equal_thresholds(vec![Tier::new("Bronze", 0, 0), Tier::new("Silver", 0, 1)])]
    #[case::multiplier_below_one(vec![Tier::new("Bronze", 0, 0).with_multiplier(1, 2)])]
    #[case::zero_denominator(vec![Tier::new("Bronze", 0, 0).with_multiplier(1, 0)])]
    fn test_tier_table_rejects(#[case] tiers: Vec<Tier>) {
        let res = TierTable::new(tiers);

        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_tier_table_sorts_by_order() {
        let table = TierTable::new(vec![
            Tier::new("Gold", 6000, 2),
            Tier::new("Bronze", 0, 0),
            Tier::new("Silver", 3000, 1),
        ])
        .unwrap();

        let names: Vec<_> = table.tiers().iter().map(|tier| tier.name.as_str()).collect();
        assert_that!(names).is_equal_to(vec!["Bronze", "Silver", "Gold"]);
    }

    #[rstest]
    #[case(None, 101, 101)]
    #[case(Some((5, 4)), 101, 126)]
    #[case(Some((3, 2)), 10, 15)]
    #[case(Some((2, 1)), 7, 14)]
    fn test_scale(#[case] multiplier: Option<(u32, u32)>, #[case] base: u32, #[case] expected: u32) {
        let mut tier = Tier::new("Any", 0, 0);
        if let Some((numerator, denominator)) = multiplier {
            tier = tier.with_multiplier(numerator, denominator);
        }

        assert_that!(tier.scale(base)).is_ok().is_equal_to(expected);
    }

    #[test]
    fn test_scale_overflow() {
        let tier = Tier::new("Any", 0, 0).with_multiplier(2, 1);

        assert_that!(tier.scale(u32::MAX))
            .is_err()
            .matches(|err| matches!(err, Error::InvalidInput(_)));
    }
}
