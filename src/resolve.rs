//! Dependency resolution for a generation spec.
//!
//! Before a generator runs, every dependency is mapped to its content key and
//! checked against the key being generated. A match means producing the file
//! would first require producing itself. The walk follows the locators
//! recorded for each annexed dependency, so `a <- b <- a` is caught when
//! retrieving `a` even though `a` does not list itself.
//!
//! Only once every dependency passed the check is the store asked to
//! materialize them, in a single batched call.

use crate::error::GetExecError;
use crate::spec::{self, GenerationSpec};

use std::collections::BTreeMap;
use tracing::debug;

/// What a dependency path maps to in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKey {
    /// Annexed content identified by this key.
    Annexed(String),
    /// Tracked directly by git; cannot be generated, so cannot form a cycle.
    Tracked,
    /// Unknown to the store.
    Unknown,
}

/// Store operations the resolver relies on.
pub trait DependencyStore {
    /// Map a dataset-relative path to its content key.
    fn lookup_key(&mut self, path: &str) -> anyhow::Result<DependencyKey>;

    /// Locators (with scheme) recorded for `key`, in the store's order.
    fn locators(&mut self, key: &str) -> anyhow::Result<Vec<String>>;

    /// Whether the content of `key` is already available locally.
    fn content_present(&mut self, key: &str) -> anyhow::Result<bool>;

    /// Materialize all `paths` locally.
    fn fetch(&mut self, paths: &[String]) -> anyhow::Result<()>;
}

/// Check `spec`'s dependencies for cycles through `requesting_key`, then fetch
/// them all at once. With no dependencies this touches nothing.
pub fn resolve<S>(
    spec: &GenerationSpec,
    requesting_key: &str,
    store: &mut S,
) -> Result<(), GetExecError>
where
    S: DependencyStore + ?Sized,
{
    let dependencies = spec.dependencies();
    if dependencies.is_empty() {
        return Ok(());
    }

    let mut graph = DependencyGraph::new(requesting_key);
    for dependency in dependencies {
        graph.check(dependency, store)?;
    }

    debug!(?dependencies, "fetching dependencies");
    store
        .fetch(dependencies)
        .map_err(|e| GetExecError::FetchFailed {
            dependencies: dependencies.to_vec(),
            reason: format!("{:#}", e),
        })
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mark {
    /// On the current walk stack.
    Temp,
    /// Some route produces this key without needing the requesting key.
    Clear,
    /// Every route needs the requesting key.
    Blocked,
}

/// Transient per-retrieval view of the dependency graph.
struct DependencyGraph<'a> {
    requesting_key: &'a str,
    marks: BTreeMap<String, Mark>,
}

impl<'a> DependencyGraph<'a> {
    fn new(requesting_key: &'a str) -> Self {
        Self {
            requesting_key,
            marks: BTreeMap::new(),
        }
    }

    /// Check one top-level dependency of the spec under resolution.
    fn check<S>(&mut self, dependency: &str, store: &mut S) -> Result<(), GetExecError>
    where
        S: DependencyStore + ?Sized,
    {
        let key = match lookup(dependency, store)? {
            DependencyKey::Annexed(key) => key,
            DependencyKey::Tracked => return Ok(()),
            DependencyKey::Unknown => {
                return Err(GetExecError::FetchFailed {
                    dependencies: vec![dependency.to_string()],
                    reason: "not tracked in this dataset".to_string(),
                });
            }
        };

        if key == self.requesting_key || self.blocked(&key, store)? {
            return Err(GetExecError::CircularDependency {
                key: self.requesting_key.to_string(),
                dependency: dependency.to_string(),
            });
        }
        Ok(())
    }

    /// True if obtaining `key` necessarily goes through the requesting key.
    ///
    /// Content that is already present, or that has no getexec locator, is
    /// clear: fetching it will not trigger a generation.
    fn blocked<S>(&mut self, key: &str, store: &mut S) -> Result<bool, GetExecError>
    where
        S: DependencyStore + ?Sized,
    {
        match self.marks.get(key) {
            Some(Mark::Blocked) => return Ok(true),
            // A cycle not involving the requesting key is not ours to report.
            Some(Mark::Temp) | Some(Mark::Clear) => return Ok(false),
            None => {}
        }

        if store.content_present(key).map_err(|e| store_error(key, e))? {
            self.marks.insert(key.to_string(), Mark::Clear);
            return Ok(false);
        }

        self.marks.insert(key.to_string(), Mark::Temp);

        let specs: Vec<GenerationSpec> = store
            .locators(key)
            .map_err(|e| store_error(key, e))?
            .iter()
            .filter_map(|locator| spec::decode(locator).ok())
            .collect();

        let mut blocked = !specs.is_empty();
        for candidate in &specs {
            if !self.needs_requesting_key(candidate, store)? {
                blocked = false;
                break;
            }
        }

        let mark = if blocked { Mark::Blocked } else { Mark::Clear };
        self.marks.insert(key.to_string(), mark);
        Ok(blocked)
    }

    fn needs_requesting_key<S>(
        &mut self,
        candidate: &GenerationSpec,
        store: &mut S,
    ) -> Result<bool, GetExecError>
    where
        S: DependencyStore + ?Sized,
    {
        for dependency in candidate.dependencies() {
            if let DependencyKey::Annexed(key) = lookup(dependency, store)? {
                if key == self.requesting_key || self.blocked(&key, store)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

fn lookup<S>(dependency: &str, store: &mut S) -> Result<DependencyKey, GetExecError>
where
    S: DependencyStore + ?Sized,
{
    let key = store
        .lookup_key(dependency)
        .map_err(|e| GetExecError::FetchFailed {
            dependencies: vec![dependency.to_string()],
            reason: format!("key lookup failed: {:#}", e),
        })?;
    debug!(dependency, ?key, "resolved dependency");
    Ok(key)
}

fn store_error(key: &str, e: anyhow::Error) -> GetExecError {
    GetExecError::FetchFailed {
        dependencies: vec![key.to_string()],
        reason: format!("{:#}", e),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeStore;
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec(cmd: &[&str], inputs: &[&str]) -> GenerationSpec {
        GenerationSpec::new(
            cmd.iter().map(|s| s.to_string()).collect(),
            inputs.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    fn locator(inputs: &[&str]) -> String {
        spec::encode(&spec(&["gen"], inputs)).unwrap()
    }

    #[test]
    fn empty_dependencies_touch_nothing() {
        let mut store = FakeStore::default();
        resolve(&spec(&["true"], &[]), "KEY", &mut store).unwrap();
        assert!(store.calls.is_empty());
    }

    #[test]
    fn fetches_all_dependencies_in_one_batch() {
        let mut store = FakeStore::default()
            .annexed("a.txt", "KA")
            .tracked("b.txt");
        resolve(&spec(&["cat"], &["a.txt", "b.txt"]), "KEY", &mut store).unwrap();
        assert_eq!(store.fetches(), vec!["fetch a.txt,b.txt"]);
        assert_eq!(store.calls.last().unwrap(), "fetch a.txt,b.txt");
    }

    #[test]
    fn direct_cycle_is_rejected_before_fetch() {
        let mut store = FakeStore::default()
            .annexed("a.txt", "KA")
            .annexed("self.txt", "KEY");
        let err = resolve(&spec(&["cat"], &["a.txt", "self.txt"]), "KEY", &mut store)
            .unwrap_err();
        match err {
            GetExecError::CircularDependency { key, dependency } => {
                assert_eq!(key, "KEY");
                assert_eq!(dependency, "self.txt");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.fetches().is_empty());
    }

    #[test]
    fn cycle_in_later_dependency_still_prevents_any_fetch() {
        let mut store = FakeStore::default()
            .tracked("a.txt")
            .tracked("b.txt")
            .annexed("c.txt", "KEY");
        let err = resolve(&spec(&["cat"], &["a.txt", "b.txt", "c.txt"]), "KEY", &mut store)
            .unwrap_err();
        assert!(matches!(err, GetExecError::CircularDependency { .. }));
        assert!(store.fetches().is_empty());
    }

    #[test]
    fn transitive_cycle_is_rejected() {
        // Retrieving KEY needs b.txt, whose only locator needs KEY again.
        let mut store = FakeStore::default()
            .annexed("b.txt", "KB")
            .annexed("a.txt", "KEY")
            .with_locator("KB", &locator(&["a.txt"]));
        let err = resolve(&spec(&["cat"], &["b.txt"]), "KEY", &mut store).unwrap_err();
        assert!(matches!(
            err,
            GetExecError::CircularDependency { ref dependency, .. } if dependency == "b.txt"
        ));
        assert!(store.fetches().is_empty());
    }

    #[test]
    fn dependency_with_an_acyclic_route_is_clear() {
        let mut store = FakeStore::default()
            .annexed("b.txt", "KB")
            .annexed("a.txt", "KEY")
            .tracked("seed.txt")
            .with_locator("KB", &locator(&["a.txt"]))
            .with_locator("KB", &locator(&["seed.txt"]));
        resolve(&spec(&["cat"], &["b.txt"]), "KEY", &mut store).unwrap();
        assert_eq!(store.fetches(), vec!["fetch b.txt"]);
    }

    #[test]
    fn present_dependency_is_not_walked() {
        let mut store = FakeStore::default()
            .annexed("b.txt", "KB")
            .annexed("a.txt", "KEY")
            .with_locator("KB", &locator(&["a.txt"]));
        store.present.insert("KB".to_string());
        resolve(&spec(&["cat"], &["b.txt"]), "KEY", &mut store).unwrap();
        assert!(!store.calls.iter().any(|c| c == "locators KB"));
    }

    #[test]
    fn unrelated_inner_cycle_is_not_reported() {
        // KB <-> KC loop among themselves but never reach KEY.
        let mut store = FakeStore::default()
            .annexed("b.txt", "KB")
            .annexed("c.txt", "KC")
            .with_locator("KB", &locator(&["c.txt"]))
            .with_locator("KC", &locator(&["b.txt"]));
        resolve(&spec(&["cat"], &["b.txt"]), "KEY", &mut store).unwrap();
        assert_eq!(store.fetches(), vec!["fetch b.txt"]);
    }

    #[test]
    fn unknown_dependency_is_fetch_failure() {
        let mut store = FakeStore::default().tracked("a.txt");
        let err = resolve(&spec(&["cat"], &["a.txt", "missing.txt"]), "KEY", &mut store)
            .unwrap_err();
        assert!(matches!(
            err,
            GetExecError::FetchFailed { ref dependencies, .. } if dependencies == &vec!["missing.txt".to_string()]
        ));
        assert!(store.fetches().is_empty());
    }

    #[test]
    fn fetch_failure_propagates() {
        let mut store = FakeStore::default().tracked("a.txt");
        store.fail_fetch = true;
        let err = resolve(&spec(&["cat"], &["a.txt"]), "KEY", &mut store).unwrap_err();
        assert!(matches!(err, GetExecError::FetchFailed { .. }));
    }
}
