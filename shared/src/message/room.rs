//! Realtime room names

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named group of realtime sessions
///
/// Wire names: `user:<id>`, `delivery:<id>`, `admin-pool`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Room {
    /// Sessions of one end user
    User(String),
    /// Sessions of one delivery staff member
    Delivery(String),
    /// Every admin session
    AdminPool,
}

const ADMIN_POOL: &str = "admin-pool";

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "user:{}", id),
            Room::Delivery(id) => write!(f, "delivery:{}", id),
            Room::AdminPool => f.write_str(ADMIN_POOL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid room name: {0}")]
pub struct InvalidRoom(pub String);

impl FromStr for Room {
    type Err = InvalidRoom;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ADMIN_POOL {
            return Ok(Room::AdminPool);
        }
        match s.split_once(':') {
            Some(("user", id)) if !id.is_empty() => Ok(Room::User(id.to_string())),
            Some(("delivery", id)) if !id.is_empty() => Ok(Room::Delivery(id.to_string())),
            _ => Err(InvalidRoom(s.to_string())),
        }
    }
}

impl Serialize for Room {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Room {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_names() {
        assert_eq!(Room::User("u1".into()).to_string(), "user:u1");
        assert_eq!(Room::Delivery("s1".into()).to_string(), "delivery:s1");
        assert_eq!(Room::AdminPool.to_string(), "admin-pool");
    }

    #[test]
    fn test_room_parse() {
        assert_eq!("user:42".parse::<Room>(), Ok(Room::User("42".into())));
        assert_eq!("admin-pool".parse::<Room>(), Ok(Room::AdminPool));
        assert!("user:".parse::<Room>().is_err());
        assert!("kitchen:1".parse::<Room>().is_err());
    }

    #[test]
    fn test_room_serde_as_string() {
        let json = serde_json::to_string(&Room::Delivery("s-7".into())).unwrap();
        assert_eq!(json, "\"delivery:s-7\"");
        let room: Room = serde_json::from_str(&json).unwrap();
        assert_eq!(room, Room::Delivery("s-7".into()));
    }
}
