//! Dependency ordering for calculated parameters.

use crate::error::{Result, SimaProError};
use std::collections::HashMap;

/// Order in which a set of formulas can be evaluated
///
/// `names[i]` is defined by a formula reading `dependencies[i]`. Names that
/// aren't defined inside the set are ignored here; they must come from an
/// outer scope. Within one dependency level the input order is kept.
pub fn evaluation_order<S: AsRef<str>>(
    names: &[S],
    dependencies: &[Vec<S>],
) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_ref(), i))
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
    let mut indegree: Vec<usize> = vec![0; names.len()];

    for (i, deps) in dependencies.iter().enumerate() {
        let mut seen = Vec::new();
        for dep in deps {
            if let Some(&j) = index.get(dep.as_ref())
                && !seen.contains(&j)
            {
                seen.push(j);
                dependents[j].push(i);
                indegree[i] += 1;
            }
        }
    }

    let mut order = Vec::with_capacity(names.len());
    let mut current: Vec<usize> = (0..names.len()).filter(|&i| indegree[i] == 0).collect();

    while !current.is_empty() {
        let mut next = Vec::new();
        for &n in &current {
            for &m in &dependents[n] {
                indegree[m] -= 1;
                if indegree[m] == 0 {
                    next.push(m);
                }
            }
        }
        next.sort_unstable();
        order.append(&mut current);
        current = next;
    }

    if order.len() != names.len() {
        let parameters = (0..names.len())
            .filter(|&i| indegree[i] > 0)
            .map(|i| names[i].as_ref().to_string())
            .collect();
        return Err(SimaProError::CircularReference { parameters });
    }

    Ok(order)
}
