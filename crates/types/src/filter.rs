//! Package filters narrowing which packages an operation considers

use pkc_errors::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A single filter; the `Not*` variants are written with a `~` prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Filter {
    #[serde(rename = "installed")]
    Installed,
    #[serde(rename = "~installed")]
    NotInstalled,
    #[serde(rename = "devel")]
    Devel,
    #[serde(rename = "~devel")]
    NotDevel,
    #[serde(rename = "gui")]
    Gui,
    #[serde(rename = "~gui")]
    NotGui,
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "~free")]
    NotFree,
}

impl Filter {
    pub const ALL: [Filter; 8] = [
        Self::Installed,
        Self::NotInstalled,
        Self::Devel,
        Self::NotDevel,
        Self::Gui,
        Self::NotGui,
        Self::Free,
        Self::NotFree,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::NotInstalled => "~installed",
            Self::Devel => "devel",
            Self::NotDevel => "~devel",
            Self::Gui => "gui",
            Self::NotGui => "~gui",
            Self::Free => "free",
            Self::NotFree => "~free",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|filter| filter.as_str() == s)
            .ok_or_else(|| ParseError::UnknownFilter {
                input: s.to_string(),
            })
    }
}

/// Set of filters; empty means "none"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeSet<Filter>);

impl FilterSet {
    /// The empty filter set
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn only(filter: Filter) -> Self {
        Self(BTreeSet::from([filter]))
    }

    #[must_use]
    pub fn installed() -> Self {
        Self::only(Filter::Installed)
    }

    #[must_use]
    pub fn not_installed() -> Self {
        Self::only(Filter::NotInstalled)
    }

    #[must_use]
    pub fn contains(&self, filter: Filter) -> bool {
        self.0.contains(&filter)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Filter> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<T: IntoIterator<Item = Filter>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        let text: Vec<&str> = self.iter().map(Filter::as_str).collect();
        f.write_str(&text.join(";"))
    }
}

impl FromStr for FilterSet {
    type Err = ParseError;

    /// Accepts `;` or `,` separated filters; `none` and the empty string
    /// give the empty set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split([';', ','])
            .map(str::trim)
            .filter(|part| !part.is_empty() && *part != "none")
            .map(str::parse::<Filter>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_set_parse() {
        let filters: FilterSet = "installed;~devel".parse().unwrap();
        assert!(filters.contains(Filter::Installed));
        assert!(filters.contains(Filter::NotDevel));
        assert!(!filters.contains(Filter::Gui));

        let filters: FilterSet = "gui, ~free".parse().unwrap();
        assert_eq!(filters.to_string(), "gui;~free");
    }

    #[test]
    fn test_filter_set_none() {
        assert!("none".parse::<FilterSet>().unwrap().is_empty());
        assert!("".parse::<FilterSet>().unwrap().is_empty());
        assert_eq!(FilterSet::none().to_string(), "none");
    }

    #[test]
    fn test_filter_set_rejects_unknown() {
        let err = "installed;shiny".parse::<FilterSet>().unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownFilter {
                input: "shiny".into()
            }
        );
    }

    #[test]
    fn test_filter_serde_uses_wire_names() {
        let json = serde_json::to_string(&FilterSet::not_installed()).unwrap();
        assert_eq!(json, r#"["~installed"]"#);
    }
}
