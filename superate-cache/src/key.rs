//! Query keys: a logical resource plus filter parameters.

use std::collections::BTreeMap;

use crate::QueryResource;

/// Cache key for one query.
///
/// Parameters are kept sorted, so two keys built with the same parameters in
/// a different order are equal and hash the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    inner: QueryKeyInner,
}

/// Private inner struct - keys are only built through `new`/`with_param`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct QueryKeyInner {
    resource: QueryResource,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(resource: QueryResource) -> Self {
        Self {
            inner: QueryKeyInner {
                resource,
                params: BTreeMap::new(),
            },
        }
    }

    /// Add (or replace) a filter parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.inner.params.insert(name.into(), value.to_string());
        self
    }

    pub fn resource(&self) -> QueryResource {
        self.inner.resource
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.inner.params.get(name).map(String::as_str)
    }

    /// Parameters in name order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parameters as an equality filter for a collection listing.
    pub fn filter(&self) -> Vec<(String, String)> {
        self.inner
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl From<QueryResource> for QueryKey {
    fn from(resource: QueryResource) -> Self {
        Self::new(resource)
    }
}

impl std::fmt::Display for QueryKey {
    /// `subjects` or `subjects?grade=11&institution=i-1`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner.resource)?;
        for (i, (name, value)) in self.inner.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}
