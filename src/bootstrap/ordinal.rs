//! Replica ordinal parsing

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Position of a member within its StatefulSet, recovered from its hostname
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReplicaOrdinal {
    base_name: String,
    ordinal: u32,
}

impl ReplicaOrdinal {
    /// Member `ordinal` of the StatefulSet called `base_name`
    pub fn new(base_name: impl Into<String>, ordinal: u32) -> Self {
        Self {
            base_name: base_name.into(),
            ordinal,
        }
    }

    /// Parse a `<base>-<ordinal>` hostname. A domain suffix is ignored.
    ///
    /// The ordinal must leave room for a server id, so `u32::MAX` is rejected.
    pub fn from_hostname(hostname: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidHostname {
            hostname: hostname.to_string(),
        };
        let short = hostname.split('.').next().unwrap_or_default();
        let (base, digits) = short.rsplit_once('-').ok_or_else(invalid)?;
        if base.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let ordinal: u32 = digits.parse().map_err(|_| invalid())?;
        ordinal.checked_add(1).ok_or_else(invalid)?;
        Ok(Self::new(base, ordinal))
    }

    /// StatefulSet name shared by every member
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Zero-based position
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// ZooKeeper server id; ids start at 1
    pub fn server_id(&self) -> u32 {
        self.ordinal.saturating_add(1)
    }
}

impl FromStr for ReplicaOrdinal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hostname(s)
    }
}

impl fmt::Display for ReplicaOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base_name, self.ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::first_member("arcus-zk-0", "arcus-zk", 0)]
    #[case::dashes_in_base("my-cache-zk-12", "my-cache-zk", 12)]
    #[case::fqdn("arcus-zk-2.arcus-zk-headless-svc.ns.svc.cluster.local", "arcus-zk", 2)]
    #[case::leading_zero("zk-07", "zk", 7)]
    fn parses_base_and_ordinal(#[case] hostname: &str, #[case] base: &str, #[case] ordinal: u32) {
        let parsed = ReplicaOrdinal::from_hostname(hostname).unwrap();

        assert_eq!(parsed.base_name(), base);
        assert_eq!(parsed.ordinal(), ordinal);
        assert_eq!(parsed.server_id(), ordinal + 1);
    }

    #[rstest]
    #[case::no_suffix("zookeeper")]
    #[case::trailing_dash("zookeeper-")]
    #[case::no_base("-3")]
    #[case::alpha_suffix("zookeeper-a1")]
    #[case::signed_suffix("zookeeper-+1")]
    #[case::overflow("zk-99999999999")]
    #[case::no_server_id_left("zk-4294967295")]
    #[case::empty("")]
    fn rejects_hostnames_without_ordinal(#[case] hostname: &str) {
        let err = ReplicaOrdinal::from_hostname(hostname).unwrap_err();
        assert!(matches!(err, Error::InvalidHostname { .. }));
    }

    #[test]
    fn largest_ordinal_maps_to_largest_server_id() {
        let parsed = ReplicaOrdinal::from_hostname("zk-4294967294").unwrap();

        assert_eq!(parsed.server_id(), u32::MAX);
        assert_eq!(ReplicaOrdinal::new("zk", u32::MAX).server_id(), u32::MAX);
    }

    #[test]
    fn display_round_trips_short_name() {
        let parsed: ReplicaOrdinal = "arcus-zk-1".parse().unwrap();
        assert_eq!(parsed.to_string(), "arcus-zk-1");
    }
}
