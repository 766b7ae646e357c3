use std::collections::{BTreeSet, HashMap};

use crate::error::ConfigError;
use crate::registry::TaskRegistry;

/// Order `ids` so every task follows its dependencies.
///
/// Kahn's algorithm restricted to the listed tasks; among ready tasks the one
/// listed first goes next. Every dependency must itself be listed.
pub fn execution_order(registry: &TaskRegistry, ids: &[String]) -> Result<Vec<String>, ConfigError> {
    let position: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; ids.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];

    for (i, id) in ids.iter().enumerate() {
        for dep in registry.dependencies_of(id)? {
            let Some(&j) = position.get(dep.as_str()) else {
                return Err(ConfigError::DependencyOutsideRun {
                    task_id: id.clone(),
                    dep: dep.clone(),
                });
            };
            in_degree[i] += 1;
            dependents[j].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..ids.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(ids.len());

    while let Some(i) = ready.pop_first() {
        order.push(ids[i].clone());
        for &k in &dependents[i] {
            in_degree[k] -= 1;
            if in_degree[k] == 0 {
                ready.insert(k);
            }
        }
    }

    if order.len() < ids.len() {
        let stuck: Vec<&str> = ids
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, id)| id.as_str())
            .collect();
        return Err(ConfigError::CircularDependency(stuck.join(", ")));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskSpec;
    use pretty_assertions::assert_eq;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn registry() -> TaskRegistry {
        TaskRegistry::new(vec![
            TaskSpec::new("compile", "tsc"),
            TaskSpec::new("lint", "eslint"),
            TaskSpec::new("test", "jest").with_dependencies(["compile"]),
            TaskSpec::new("package", "npm").with_dependencies(["test", "lint"]),
        ])
        .unwrap()
    }

    #[test]
    fn ties_follow_list_order() {
        let order = execution_order(&registry(), &ids(&["lint", "compile", "test"])).unwrap();
        assert_eq!(order, ids(&["lint", "compile", "test"]));

        let order = execution_order(&registry(), &ids(&["compile", "lint", "test"])).unwrap();
        assert_eq!(order, ids(&["compile", "lint", "test"]));
    }

    #[test]
    fn dependencies_move_ahead_of_dependents() {
        let order =
            execution_order(&registry(), &ids(&["package", "test", "lint", "compile"])).unwrap();
        assert_eq!(order, ids(&["lint", "compile", "test", "package"]));
    }

    #[test]
    fn unlisted_dependency_is_a_config_error() {
        let err = execution_order(&registry(), &ids(&["lint", "test"])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DependencyOutsideRun {
                task_id: "test".into(),
                dep: "compile".into()
            }
        );
    }

    #[test]
    fn unknown_id_is_a_config_error() {
        let err = execution_order(&registry(), &ids(&["deploy"])).unwrap_err();
        assert_eq!(err, ConfigError::TaskNotFound("deploy".into()));
    }

    #[test]
    fn empty_list_plans_nothing() {
        assert!(execution_order(&registry(), &[]).unwrap().is_empty());
    }
}
