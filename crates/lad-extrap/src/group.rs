use std::cmp::Ordering;

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::{Dataset, PropValue, Props};

fn compare_keys(lhs: &[PropValue], rhs: &[PropValue]) -> Ordering {
    for (a, b) in lhs.iter().zip(rhs) {
        let ord = a.total_cmp(b);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    lhs.len().cmp(&rhs.len())
}

/// Datasets sharing the same values for a list of grouping properties.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    /// Grouping values, aligned with the requested keys.
    pub key: Vec<PropValue>,
    /// Members in input order.
    pub members: Vec<&'a Dataset>,
}

/// Partitions datasets by their values at `keys`.
///
/// Groups are sorted by key tuple; members keep their input order. Every
/// dataset must carry every key.
pub fn group_by<'a>(datasets: &'a [Dataset], keys: &[&str]) -> Result<Vec<Group<'a>>, LadderError> {
    let mut groups: Vec<Group<'a>> = Vec::new();
    for (index, dataset) in datasets.iter().enumerate() {
        let key = keys
            .iter()
            .map(|name| {
                dataset.props.get(name).cloned().ok_or_else(|| {
                    LadderError::Structure(
                        ErrorInfo::new("missing-group-key", "grouping key is missing on a dataset")
                            .with_context("key", *name)
                            .with_context("dataset", index.to_string()),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        match groups
            .iter_mut()
            .find(|group| compare_keys(&group.key, &key) == Ordering::Equal)
        {
            Some(group) => group.members.push(dataset),
            None => groups.push(Group {
                key,
                members: vec![dataset],
            }),
        }
    }
    groups.sort_by(|a, b| compare_keys(&a.key, &b.key));
    Ok(groups)
}

/// Properties present in every dictionary with identical values.
pub fn intersect_props<'a, I>(dicts: I) -> Props
where
    I: IntoIterator<Item = &'a Props>,
{
    let mut iter = dicts.into_iter();
    let Some(first) = iter.next() else {
        return Props::new();
    };
    let mut common = first.clone();
    for other in iter {
        let stale: Vec<String> = common
            .iter()
            .filter(|(key, value)| other.get(key) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            common.remove(&key);
        }
    }
    common
}

/// Collects one series per group, with the `x_key` property on the x axis.
///
/// Each member contributes its values at its own `x_key`; the combined
/// series is sorted by x with ties kept in input order.
pub fn collect_xy(
    datasets: &[Dataset],
    x_key: &str,
    foreach: &[&str],
) -> Result<Vec<Dataset>, LadderError> {
    let mut out = Vec::new();
    for group in group_by(datasets, foreach)? {
        let mut props = intersect_props(group.members.iter().map(|d| &d.props));
        for (name, value) in foreach.iter().zip(&group.key) {
            props.insert(*name, value.clone());
        }
        props.insert("xlabel", x_key);

        let mut points = Vec::new();
        for member in &group.members {
            let x = member.props.require_float(x_key)?;
            points.extend(member.y.iter().map(|y| (x, *y)));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (x, y) = points.into_iter().unzip();
        out.push(Dataset::new(x, y, props));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ds(size: f64, amplitude: f64) -> Dataset {
        Dataset::new(
            Vec::new(),
            vec![amplitude],
            Props::new().with("L", size).with("filling", 0.875),
        )
    }

    #[test]
    fn groups_are_sorted_by_key() {
        let sets = vec![ds(64.0, 1.0), ds(32.0, 2.0), ds(64.0, 3.0)];
        let groups = group_by(&sets, &["L"]).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, vec![PropValue::Float(32.0)]);
        assert_eq!(groups[1].members.len(), 2);
        assert_eq!(groups[1].members[1].y, vec![3.0]);
    }

    #[test]
    fn intersection_drops_mismatches() {
        let a = Props::new().with("L", 32usize).with("M", 1200usize).with("only_a", 1usize);
        let b = Props::new().with("L", 32usize).with("M", 1600usize);
        let common = intersect_props([&a, &b]);
        assert_eq!(common.len(), 1);
        assert_eq!(common.float("L"), Some(32.0));
    }

    #[test]
    fn collect_xy_orders_by_property() {
        let sets = vec![ds(64.0, 1.0), ds(32.0, 2.0), ds(48.0, 3.0)];
        let collected = collect_xy(&sets, "L", &["filling"]).unwrap();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].x, vec![32.0, 48.0, 64.0]);
        assert_eq!(collected[0].y, vec![2.0, 3.0, 1.0]);
        assert_eq!(collected[0].props.float("filling"), Some(0.875));
        assert!(!collected[0].props.contains("L"));
    }
}
