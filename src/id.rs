use std::str::FromStr;

use serde::{Deserialize, Deserializer};

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct BuildNumber {
    value: u32,
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub struct QueueItemId {
    value: u64,
}

impl BuildNumber {
    pub fn new(number: u32) -> Self { Self { value: number } }

    pub fn value(&self) -> u32 { self.value }

    /// The number the server will assign to the build after this one.
    pub fn next(&self) -> Self { Self::new(self.value + 1) }
}

impl QueueItemId {
    pub fn new(id: u64) -> Self { Self { value: id } }

    pub fn value(&self) -> u64 { self.value }

    /// Extracts the queue item id from a trigger response's `Location`
    /// header, e.g. `http://ci/queue/item/42/`.
    pub fn from_location(location: &str) -> Option<Self> {
        let mut segments = location.trim_end_matches('/').rsplit('/');
        let id = segments.next()?.parse().ok()?;
        match (segments.next(), segments.next()) {
            (Some("item"), Some("queue")) => Some(Self::new(id)),
            _ => None,
        }
    }
}

impl From<u32> for BuildNumber {
    fn from(number: u32) -> Self { Self::new(number) }
}

impl FromStr for BuildNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(BuildNumber::new)
    }
}

impl<'de> Deserialize<'de> for BuildNumber {
    fn deserialize<D>(deserializer: D) -> Result<BuildNumber, D::Error>
        where D: Deserializer<'de>,
    {
        let number = u32::deserialize(deserializer)?;
        Ok(BuildNumber::new(number))
    }
}

impl<'de> Deserialize<'de> for QueueItemId {
    fn deserialize<D>(deserializer: D) -> Result<QueueItemId, D::Error>
        where D: Deserializer<'de>,
    {
        let id = u64::deserialize(deserializer)?;
        Ok(QueueItemId::new(id))
    }
}

impl std::fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl std::fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_item_from_location() {
        let id = QueueItemId::from_location("http://ci.example.com/queue/item/42/");
        assert_eq!(id, Some(QueueItemId::new(42)));

        assert_eq!(QueueItemId::from_location("http://ci.example.com/queue/item/7"), Some(QueueItemId::new(7)));
        assert_eq!(QueueItemId::from_location("http://ci.example.com/job/hello/"), None);
        assert_eq!(QueueItemId::from_location(""), None);
    }

    #[test]
    fn test_build_number_parse() {
        assert_eq!("12".parse::<BuildNumber>().unwrap(), BuildNumber::new(12));
        assert!("last".parse::<BuildNumber>().is_err());
        assert_eq!(BuildNumber::new(3).next(), BuildNumber::new(4));
    }
}
