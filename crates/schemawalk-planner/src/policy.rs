use std::fmt;
use std::str::FromStr;

use schemawalk_common::{EMPTY_VERSION, Error, Version};

/// Traversal rules for the planner.
///
/// Every admissible edge costs `1`, so the planner finds the path with the
/// fewest steps. A cost of `None` forbids the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionPolicy {
    /// Forward-only.
    Upgrade,
    /// Forward-only, but any version may also drop straight to the empty
    /// schema and be rebuilt from there.
    ForceUpgrade,
    /// Backward-only.
    Downgrade,
}

impl DirectionPolicy {
    pub fn upgrade() -> Self {
        Self::Upgrade
    }

    pub fn force_upgrade() -> Self {
        Self::ForceUpgrade
    }

    pub fn downgrade() -> Self {
        Self::Downgrade
    }

    pub fn allows_reset(&self) -> bool {
        matches!(self, Self::ForceUpgrade)
    }

    pub fn is_downgrade(&self) -> bool {
        matches!(self, Self::Downgrade)
    }

    /// Cost of moving from `from` to `to`, or `None` if the move is forbidden.
    pub fn cost(&self, from: Version, to: Version) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        if to == EMPTY_VERSION && self.allows_reset() {
            return Some(1);
        }
        let forward = from < to;
        if forward != self.is_downgrade() {
            Some(1)
        } else {
            None
        }
    }
}

impl fmt::Display for DirectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upgrade => "upgrade",
            Self::ForceUpgrade => "force-upgrade",
            Self::Downgrade => "downgrade",
        };
        f.write_str(name)
    }
}

impl FromStr for DirectionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upgrade" => Ok(Self::Upgrade),
            "force-upgrade" => Ok(Self::ForceUpgrade),
            "downgrade" => Ok(Self::Downgrade),
            other => Err(Error::Config(format!("unknown migration direction: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DirectionPolicy; 3] = [
        DirectionPolicy::Upgrade,
        DirectionPolicy::ForceUpgrade,
        DirectionPolicy::Downgrade,
    ];

    #[test]
    fn self_loops_are_free() {
        for policy in ALL {
            for v in 0..6 {
                assert_eq!(policy.cost(v, v), Some(0), "{policy} {v}");
            }
        }
    }

    #[test]
    fn downgrade_only_moves_backwards() {
        let policy = DirectionPolicy::downgrade();
        for a in 0..6 {
            for b in 0..6 {
                let cost = policy.cost(a, b);
                if a < b {
                    assert_eq!(cost, None, "{a} -> {b}");
                } else if a != b {
                    assert_eq!(cost, Some(1), "{a} -> {b}");
                }
            }
        }
    }

    #[test]
    fn upgrade_only_moves_forwards() {
        let policy = DirectionPolicy::upgrade();
        for a in 0..6 {
            for b in 0..6 {
                let cost = policy.cost(a, b);
                if a < b {
                    assert_eq!(cost, Some(1), "{a} -> {b}");
                } else if a != b {
                    assert_eq!(cost, None, "{a} -> {b}");
                }
            }
        }
    }

    #[test]
    fn force_upgrade_allows_reset_to_empty() {
        let force = DirectionPolicy::force_upgrade();
        let plain = DirectionPolicy::upgrade();
        for a in 1..6 {
            assert_eq!(force.cost(a, 0), Some(1));
            assert_eq!(plain.cost(a, 0), None);
        }
        // the exception only covers the empty version
        assert_eq!(force.cost(4, 2), None);
        assert_eq!(force.cost(2, 4), Some(1));
    }

    #[test]
    fn parses_and_displays_names() {
        for policy in ALL {
            let parsed: DirectionPolicy = policy.to_string().parse().unwrap();
            assert_eq!(parsed, policy);
        }
        assert!("sideways".parse::<DirectionPolicy>().is_err());
    }
}
