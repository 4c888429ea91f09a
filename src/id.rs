//! Entity identifier grammar: `schema:[~user/][series/]name[-revision]`.
//!
//! Builds on nom combinators for the schema/user/name/revision
//! fragments, extended with a `series` fragment. `user` absent means
//! the identifier is promulgated; `revision` absent means the
//! identifier is a query rather than a fully qualified entity.

use std::fmt;
use std::str::FromStr;

use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, digit1};
use nom::combinator::{map_res, opt};
use nom::sequence::{delimited, preceded, terminated, tuple};
use nom::{Err as NomErr, IResult, Needed};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StoreError;
use crate::series::Series;

/// Matches a `kebab-case` name that must not start or end with a dash.
fn kebab_case(input: &str) -> IResult<&str, &str> {
    if input.is_empty() {
        return Err(NomErr::Incomplete(Needed::new(1)));
    }

    let index = input
        .chars()
        .enumerate()
        .find(|&(i, ch)| {
            let alpha_next = input
                .chars()
                .nth(i + 1)
                .map(|ch| ch.is_alphabetic())
                .unwrap_or(false);

            let valid_char = ch.is_ascii_alphanumeric();
            let valid_dash = ch == '-' && i != 0 && alpha_next;

            !(valid_char || valid_dash)
        })
        .map(|(i, _)| i);

    match index {
        Some(i) => {
            let split = input.split_at(i);
            Ok((split.1, split.0))
        }
        None => Ok(("", input)),
    }
}

/// Parses the schema fragment, e.g. `cs:`.
fn parse_schema(input: &str) -> IResult<&str, Option<&str>> {
    opt(terminated(alpha1, tag(":")))(input)
}

/// Parses the user (namespace) fragment, e.g. `~foo-charmers/`.
fn parse_user(input: &str) -> IResult<&str, Option<&str>> {
    opt(delimited(tag("~"), kebab_case, tag("/")))(input)
}

/// Parses an optional `series/` fragment. A series fragment is only
/// present when there is another `/`-delimited segment after it, so
/// this combinator is tried speculatively by the caller and only
/// accepted if it consumed a non-empty kebab-case string followed by a
/// slash.
fn parse_series(input: &str) -> IResult<&str, Option<&str>> {
    opt(terminated(kebab_case, tag("/")))(input)
}

fn parse_name(input: &str) -> IResult<&str, &str> {
    kebab_case(input)
}

fn parse_revision(input: &str) -> IResult<&str, Option<&str>> {
    opt(preceded(tag("-"), digit1))(input)
}

fn parse_entity_id(input: &str) -> IResult<&str, EntityId> {
    let joined = tuple((
        parse_schema,
        parse_user,
        parse_series,
        parse_name,
        parse_revision,
    ));

    map_res(joined, |(schema, user, series, name, revision)| -> Result<EntityId, String> {
        // `kebab_case` never fails, so an empty series fragment (the
        // "no series" case) comes back as `Some("")`, not `None` —
        // normalize that here.
        let series = match series {
            Some(s) if !s.is_empty() => {
                Some(Series::new(s).map_err(|e| e.to_string())?)
            }
            _ => None,
        };

        if name.is_empty() {
            return Err("empty name".to_string());
        }

        Ok(EntityId {
            schema: schema.map(String::from),
            user: user.map(String::from),
            series,
            name: name.to_string(),
            revision: revision
                .map(|r| {
                    r.parse()
                        .map_err(|err| format!("couldn't parse revision: {}", err))
                })
                .transpose()?,
        })
    })(input)
}

/// A parsed entity identifier.
#[derive(Debug, PartialEq, Clone, Eq, PartialOrd, Ord)]
pub struct EntityId {
    pub schema: Option<String>,
    pub user: Option<String>,
    pub series: Option<Series>,
    pub name: String,
    pub revision: Option<u32>,
}

impl EntityId {
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        let (remainder, id) = parse_entity_id(input)
            .map_err(|err| StoreError::InvalidId(format!("couldn't parse `{}`: {:?}", input, err)))?;

        if !remainder.is_empty() {
            return Err(StoreError::InvalidId(format!(
                "extra data at end of identifier `{}`: `{}`",
                input, remainder
            )));
        }

        Ok(id)
    }

    /// `true` when no `user` fragment is present — the identifier
    /// refers to the promulgated alias for its name.
    pub fn is_promulgated(&self) -> bool {
        self.user.is_none()
    }

    /// `true` when `series == "bundle"`.
    pub fn is_bundle(&self) -> bool {
        self.series.as_ref().map(Series::is_bundle).unwrap_or(false)
    }

    /// `true` when `revision` is absent — the identifier is a query,
    /// not a fully qualified entity reference.
    pub fn is_query(&self) -> bool {
        self.revision.is_none()
    }

    pub fn with_user(&self, user: Option<String>) -> Self {
        EntityId {
            user,
            ..self.clone()
        }
    }

    pub fn with_revision(&self, revision: Option<u32>) -> Self {
        EntityId {
            revision,
            ..self.clone()
        }
    }

    pub fn with_series(&self, series: Option<Series>) -> Self {
        EntityId {
            series,
            ..self.clone()
        }
    }

    /// `~user/name`, the base-entity key this identifier's entity
    /// belongs to. Panics if `user` is absent — callers resolving a
    /// promulgated id to its owner must set `user` first.
    pub fn base_url(&self) -> String {
        format!(
            "~{}/{}",
            self.user.as_deref().expect("base_url requires an owned id"),
            self.name
        )
    }
}

impl FromStr for EntityId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}:", schema)?;
        }
        if let Some(user) = &self.user {
            write!(f, "~{}/", user)?;
        }
        if let Some(series) = &self.series {
            write!(f, "{}/", series)?;
        }
        f.write_str(&self.name)?;
        if let Some(rev) = &self.revision {
            write!(f, "-{}", rev)?;
        }
        Ok(())
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<EntityId, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;

        s.parse().map_err(|err: StoreError| Error::custom(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kebab_case() {
        let (remainder, parsed) = kebab_case("foo-foo").unwrap();
        assert_eq!(parsed, "foo-foo");
        assert_eq!(remainder, "");
    }

    #[test]
    fn test_schema() {
        let (remainder, parsed) = parse_schema("cs:~foo/bar-42").unwrap();
        assert_eq!(parsed, Some("cs"));
        assert_eq!(remainder, "~foo/bar-42");
    }

    #[test]
    fn test_user() {
        let (remainder, parsed) = parse_user("~foo/bar-42").unwrap();
        assert_eq!(parsed, Some("foo"));
        assert_eq!(remainder, "bar-42");
    }

    #[test]
    fn test_full_valid_with_series() {
        let id: EntityId = "cs:~foo/trusty/bar-42".parse().unwrap();
        assert_eq!(
            id,
            EntityId {
                schema: Some("cs".to_string()),
                user: Some("foo".to_string()),
                series: Some(Series::new("trusty").unwrap()),
                name: "bar".to_string(),
                revision: Some(42),
            }
        );
    }

    #[test]
    fn test_full_valid_without_series() {
        let id: EntityId = "cs:~foo/bar-42".parse().unwrap();
        assert_eq!(
            id,
            EntityId {
                schema: Some("cs".to_string()),
                user: Some("foo".to_string()),
                series: None,
                name: "bar".to_string(),
                revision: Some(42),
            }
        );
    }

    #[test]
    fn test_bundle_series() {
        let id: EntityId = "cs:~foo/bundle/mediawiki-5".parse().unwrap();
        assert!(id.is_bundle());
        assert_eq!(id.name, "mediawiki");
        assert_eq!(id.revision, Some(5));
    }

    #[test]
    fn test_promulgated_has_no_user() {
        let id: EntityId = "cs:trusty/wordpress-23".parse().unwrap();
        assert!(id.is_promulgated());
        assert_eq!(id.series, Some(Series::new("trusty").unwrap()));
    }

    #[test]
    fn test_query_has_no_revision() {
        let id: EntityId = "wordpress".parse().unwrap();
        assert!(id.is_query());
    }

    #[test]
    fn test_full_bad_rev() {
        let id: Result<EntityId, _> = "cs:~foo/bar-4294967296".parse();
        assert!(id.is_err());
    }

    #[test]
    fn test_partial_round_trip_table() {
        let urls = vec![
            "cs:~foo-foo/trusty/bar-42",
            "cs:~foo/bar",
            "cs:bar-42",
            "cs:bar",
            "~foo/bar-42",
            "~foo/bar",
            "bar-42",
            "bar",
        ];

        for url in urls {
            let parsed: EntityId = url.parse().unwrap();
            assert_eq!(parsed.to_string(), url, "round trip failed for `{}`", url);
        }
    }

    #[test]
    fn test_serialization() {
        let id = EntityId {
            schema: Some("cs".into()),
            user: Some("foo-foo".to_string()),
            series: None,
            name: "bar-bar".to_string(),
            revision: Some(42),
        };

        let serialized = "---\n\"cs:~foo-foo/bar-bar-42\"";
        assert_eq!(&serde_yaml::to_string(&id).unwrap()[..], serialized);

        let parsed: EntityId = serde_yaml::from_str(serialized).unwrap();
        assert_eq!(parsed, id);
    }
}
