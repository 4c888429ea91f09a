//! Parsing for `bundle.yaml` and the machine/unit counting algorithm
//! (`bundleData`/`bundleMachineCount`/`bundleUnitCount`).
//!
//! The application/bundle shape mirrors a deployer's `bundle.rs`; the
//! counting algorithm here is new — a deployer builds and deploys
//! bundles, it never tallies machines and units for a catalog entry.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_yaml::from_slice;

use crate::error::StoreError;
use crate::id::EntityId;
use crate::series::Series;

/// A YAML value with no fixed schema, used for application config/options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Annotations {
    pub gui_x: String,
    pub gui_y: String,
}

/// Placement/sizing info for a machine explicitly declared in a
/// bundle's `machines:` map. Counted even when no unit is ever placed
/// onto it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct MachineSpec {
    pub series: Option<String>,
    pub constraints: Option<String>,
}

/// An application within a bundle.
///
/// See the `ApplicationSpec` defined [here][spec] for the canonical
/// upstream definition.
///
/// [spec]: https://github.com/juju/charm/blob/master/bundledata.go
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct Application {
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// URL of the charm this application deploys.
    pub charm: Option<EntityId>,

    #[serde(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub devices: HashMap<String, String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub endpoint_bindings: HashMap<String, String>,

    #[serde(default)]
    pub expose: bool,

    #[serde(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    #[serde(default)]
    pub trust: bool,

    /// Resource name → revision/value, as given in the bundle.
    #[serde(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub resources: HashMap<String, String>,

    /// How many units to deploy.
    #[serde(default, alias = "num_units")]
    pub scale: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub storage: HashMap<String, String>,

    /// Placement directives, one per unit.
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
}

/// Machine and unit totals produced by collapsing a bundle's placement
/// directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BundleCounts {
    pub machine_count: usize,
    pub unit_count: u32,
}

/// A parsed `bundle.yaml` file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Bundle {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(alias = "services")]
    pub applications: HashMap<String, Application>,

    /// Which OS series to use for this bundle. Either this or `series`
    /// must be set.
    pub bundle: Option<Series>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub relations: Vec<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Series>,

    /// Explicitly declared machines, keyed by the id placement
    /// directives reference (e.g. `"1"`).
    #[serde(default)]
    pub machines: HashMap<String, MachineSpec>,
}

impl Bundle {
    pub fn load(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(from_slice(bytes)?)
    }

    /// Collapses every application's placement directives into the
    /// live machine set and sums unit counts.
    ///
    /// A directive's trailing `:`-segment is its target (`lxc:1` and
    /// `1` both target machine `1`; `lxc:new` and `new` both target a
    /// fresh machine); a target containing `/` is a reference to
    /// another unit (`wordpress/0`), resolved in a second pass once
    /// every directly-placed unit has a known host.
    pub fn counts(&self) -> BundleCounts {
        let unit_count: u32 = self.applications.values().map(|a| a.scale).sum();

        let mut live_machines: HashSet<String> = self.machines.keys().cloned().collect();
        let mut unit_hosts: HashMap<String, String> = HashMap::new();
        let mut deferred: Vec<(String, String)> = Vec::new();
        let mut new_machines = 0usize;

        let mut alloc_new = |live: &mut HashSet<String>, counter: &mut usize| -> String {
            *counter += 1;
            let synth = format!("new-{}", counter);
            live.insert(synth.clone());
            synth
        };

        for (app_name, app) in &self.applications {
            for unit_index in 0..app.scale {
                let unit_key = format!("{}/{}", app_name, unit_index);
                let directive = app.to.get(unit_index as usize).map(String::as_str);

                let host = match directive {
                    None => alloc_new(&mut live_machines, &mut new_machines),
                    Some(d) => {
                        let target = d.rsplit(':').next().unwrap_or(d);
                        if target == "new" {
                            alloc_new(&mut live_machines, &mut new_machines)
                        } else if target.contains('/') {
                            deferred.push((unit_key.clone(), target.to_string()));
                            continue;
                        } else {
                            live_machines.insert(target.to_string());
                            target.to_string()
                        }
                    }
                };

                unit_hosts.insert(unit_key, host);
            }
        }

        for (unit_key, referenced) in deferred {
            if let Some(host) = unit_hosts.get(&referenced).cloned() {
                unit_hosts.insert(unit_key, host);
            }
        }

        BundleCounts {
            machine_count: live_machines.len(),
            unit_count,
        }
    }

    /// Filters applications (and relations referencing only survivors)
    /// down to `names`, minus `exceptions`.
    pub fn limit_apps(&mut self, names: &[String], exceptions: &[String]) {
        if names.is_empty() {
            return;
        }

        self.applications
            .retain(|k, _| names.contains(k) && !exceptions.contains(k));

        let apps: HashSet<_> = self.applications.keys().collect();
        self.relations.retain(|rels| {
            rels.iter()
                .map(|r| r.split(':').next().unwrap().to_string())
                .all(|r| apps.contains(&r))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(scale: u32, to: &[&str]) -> Application {
        Application {
            scale,
            to: to.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn machine_count_collapses_new_and_shared_placements() {
        let mut machines = HashMap::new();
        machines.insert("1".to_string(), MachineSpec::default());

        let mut applications = HashMap::new();
        applications.insert(
            "wordpress".to_string(),
            app(6, &["lxc:new", "1", "lxc:1", "kvm:new"]),
        );

        let bundle = Bundle {
            name: None,
            applications,
            bundle: Some(Series::new("trusty").unwrap()),
            description: None,
            relations: vec![],
            series: None,
            machines,
        };

        let counts = bundle.counts();
        assert_eq!(counts.unit_count, 6);
        assert_eq!(counts.machine_count, 5);
    }

    #[test]
    fn absent_placement_allocates_one_machine_per_unit() {
        let mut applications = HashMap::new();
        applications.insert("mysql".to_string(), app(3, &[]));

        let bundle = Bundle {
            name: None,
            applications,
            bundle: Some(Series::new("focal").unwrap()),
            description: None,
            relations: vec![],
            series: None,
            machines: HashMap::new(),
        };

        let counts = bundle.counts();
        assert_eq!(counts.unit_count, 3);
        assert_eq!(counts.machine_count, 3);
    }

    #[test]
    fn unit_reference_reuses_the_referenced_units_host() {
        let mut applications = HashMap::new();
        applications.insert("mysql".to_string(), app(1, &["new"]));
        applications.insert("haproxy".to_string(), app(1, &["mysql/0"]));

        let bundle = Bundle {
            name: None,
            applications,
            bundle: Some(Series::new("focal").unwrap()),
            description: None,
            relations: vec![],
            series: None,
            machines: HashMap::new(),
        };

        let counts = bundle.counts();
        assert_eq!(counts.unit_count, 2);
        assert_eq!(counts.machine_count, 1);
    }

    #[test]
    fn limit_apps_drops_relations_to_removed_applications() {
        let mut applications = HashMap::new();
        applications.insert("wordpress".to_string(), Application::default());
        applications.insert("mysql".to_string(), Application::default());

        let mut bundle = Bundle {
            name: None,
            applications,
            bundle: Some(Series::new("trusty").unwrap()),
            description: None,
            relations: vec![vec!["wordpress:db".to_string(), "mysql:db".to_string()]],
            series: None,
            machines: HashMap::new(),
        };

        bundle.limit_apps(&["wordpress".to_string()], &[]);
        assert_eq!(bundle.applications.len(), 1);
        assert!(bundle.relations.is_empty());
    }
}
