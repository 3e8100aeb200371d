//! Work model assembly.

use rand::RngCore;
use snafu::OptionExt as _;
use tracing::{debug, info, warn};

use crate::{
    catalog::Catalog,
    errors::{AssemblyError, UnknownOverrideFunction},
    model::{ServiceDescriptor, ServiceGraph, WorkModel},
    parameters::{Recipient, Settings},
    selector::WeightedSelector,
};

/// Builds a work model by assigning one function to every service of a graph.
pub struct ModelAssembler<'a> {
    catalog: &'a Catalog,
    settings: &'a Settings,
}

impl<'a> ModelAssembler<'a> {
    /// Creates a new `ModelAssembler`.
    pub fn new(catalog: &'a Catalog, settings: &'a Settings) -> Self {
        Self { catalog, settings }
    }

    /// Assembles the work model for the given service graph.
    ///
    /// Services are processed in graph order. Each service draws a function from the database pool if its name starts
    /// with the databases prefix, or from the service pool otherwise. Overrides are applied afterwards: a sidecar is set
    /// as given, and a forced function replaces the drawn one. Forced functions are always looked up in the service
    /// pool, whatever the kind of the service.
    ///
    /// A selection miss leaves the service without a function, and is reported through [`WorkModel::unassigned`].
    ///
    /// # Errors
    ///
    /// If an override forces a function that is not in the service pool, an error is returned and no work model is
    /// produced.
    pub fn assemble<R>(&self, graph: &ServiceGraph, rng: R) -> Result<WorkModel, AssemblyError>
    where
        R: RngCore,
    {
        info!(services = graph.len(), "Processing service graph.");

        let mut selector = WeightedSelector::new(rng);
        let mut work_model = WorkModel::with_capacity(graph.len());

        for (service, node) in graph.iter() {
            debug!(service, "Processing service.");

            let mut descriptor = ServiceDescriptor::new(node);

            let recipient = if self.settings.is_database(service) {
                Recipient::Database
            } else {
                Recipient::Service
            };
            let pool = self.catalog.pool_for(recipient);
            descriptor.fragment = selector
                .select(pool, service)
                .and_then(|function_id| pool.fragment(function_id))
                .cloned();

            self.apply_override(service, &mut descriptor)?;

            work_model.insert(service, descriptor);
        }

        for (service, _) in self.settings.overrides.iter().filter(|(s, _)| graph.get(s).is_none()) {
            debug!(service = service.as_str(), "Override targets a service that is not in the graph. Ignoring.");
        }

        info!(services = work_model.len(), "Work model created.");

        Ok(work_model)
    }

    fn apply_override(&self, service: &str, descriptor: &mut ServiceDescriptor) -> Result<(), AssemblyError> {
        let Some(over) = self.settings.overrides.get(service) else {
            return Ok(());
        };

        info!(service, "Service has overrides.");

        if let Some(sidecar) = &over.sidecar {
            debug!(service, %sidecar, "Overriding sidecar.");
            descriptor.sidecar = Some(sidecar.clone());
        }

        if let Some(function_id) = &over.function_id {
            debug!(service, function_id = function_id.as_str(), "Overriding internal service.");
            let fragment = self
                .catalog
                .service_pool()
                .fragment(function_id)
                .context(UnknownOverrideFunction { service, function_id })?;

            if descriptor.fragment.is_none() {
                warn!(service, "Override supplied the internal service for a service whose selection missed.");
            }
            descriptor.fragment = Some(fragment.clone());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng as _};
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        catalog::Pool,
        model::ServiceNode,
        parameters::Override,
        selector::tests::{pool, FixedRng},
    };

    fn settings(overrides: &[(&str, Override)]) -> Settings {
        Settings {
            request_method: "rest".to_string(),
            databases_prefix: "db".to_string(),
            overrides: overrides.iter().map(|(s, o)| (s.to_string(), o.clone())).collect(),
        }
    }

    fn graph(names: &[&str]) -> ServiceGraph {
        ServiceGraph::from_services(names.iter().enumerate().map(|(i, name)| {
            let node = ServiceNode {
                external_services: vec![json!({ "seq_len": i, "services": [] })],
            };
            (*name, node)
        }))
    }

    fn function_of<'m>(model: &'m WorkModel, service: &str) -> Option<&'m str> {
        model.get(service)?.fragment.as_ref()?.function_name()
    }

    #[test]
    fn databases_draw_from_database_pool() {
        let catalog = Catalog::from_pools(pool(&[("svc_fn", 1.0)]), pool(&[("db_fn", 1.0)]));
        let settings = settings(&[]);
        let model = ModelAssembler::new(&catalog, &settings)
            .assemble(&graph(&["svcA", "db1", "dbx"]), FixedRng(0))
            .unwrap();

        assert_eq!(function_of(&model, "svcA"), Some("fn_svc_fn"));
        assert_eq!(function_of(&model, "db1"), Some("fn_db_fn"));
        assert_eq!(function_of(&model, "dbx"), Some("fn_db_fn"));
    }

    #[test]
    fn databases_use_service_functions_on_fallback() {
        let catalog = Catalog::from_pools(pool(&[("svc_fn", 1.0)]), Pool::default());
        let settings = settings(&[]);
        let model = ModelAssembler::new(&catalog, &settings)
            .assemble(&graph(&["db1"]), FixedRng(0))
            .unwrap();

        assert_eq!(function_of(&model, "db1"), Some("fn_svc_fn"));
    }

    #[test]
    fn database_split_follows_weights() {
        let catalog = Catalog::from_pools(pool(&[("s", 1.0)]), pool(&[("f1", 0.3), ("f2", 0.7)]));
        let settings = settings(&[]);
        let assembler = ModelAssembler::new(&catalog, &settings);
        let graph = graph(&["svcA", "db1"]);

        let mut rng = StdRng::seed_from_u64(2021);
        let runs = 10_000;
        let mut f1 = 0;
        for _ in 0..runs {
            let model = assembler.assemble(&graph, &mut rng).unwrap();
            if function_of(&model, "db1") == Some("fn_f1") {
                f1 += 1;
            }
        }

        let share = f1 as f64 / runs as f64;
        assert!((share - 0.3).abs() < 0.03, "f1 chosen for db1 {:.3} of the time", share);
    }

    #[test]
    fn sidecar_override() {
        let catalog = Catalog::from_pools(pool(&[("f1", 0.5), ("f2", 0.5)]), Pool::default());
        let settings = settings(&[(
            "svcA",
            Override {
                sidecar: Some(json!("envoy")),
                function_id: None,
            },
        )]);
        let assembler = ModelAssembler::new(&catalog, &settings);

        for seed in 0..20 {
            let model = assembler
                .assemble(&graph(&["svcA", "svcB"]), StdRng::seed_from_u64(seed))
                .unwrap();
            assert_eq!(model.get("svcA").unwrap().sidecar, Some(json!("envoy")));
            assert_eq!(model.get("svcB").unwrap().sidecar, None);
            assert!(model.get("svcA").unwrap().is_assigned());
        }
    }

    #[test]
    fn function_override_beats_draw() {
        // A zero draw always lands on the first function, so the override has to replace it.
        let services = pool(&[("f1", 1.0), ("f2", 1.0)]);
        let expected = services.fragment("f2").unwrap().clone();
        let catalog = Catalog::from_pools(services, pool(&[("d1", 1.0)]));
        let forced = Override {
            sidecar: None,
            function_id: Some("f2".to_string()),
        };
        let settings = settings(&[("svcA", forced.clone()), ("db1", forced)]);

        let model = ModelAssembler::new(&catalog, &settings)
            .assemble(&graph(&["svcA", "db1"]), FixedRng(0))
            .unwrap();

        assert_eq!(model.get("svcA").unwrap().fragment.as_ref(), Some(&expected));
        // Forced functions come from the service pool even for databases.
        assert_eq!(model.get("db1").unwrap().fragment.as_ref(), Some(&expected));
    }

    #[test]
    fn function_override_replaces_runtime_attributes() {
        let mut services = pool(&[("f1", 1.0), ("f2", 1.0)]);
        let mut with_workers = services.fragment("f1").unwrap().clone();
        with_workers.runtime.workers = Some(8);
        services.insert("f1", with_workers, 1.0);

        let catalog = Catalog::from_pools(services, Pool::default());
        let settings = settings(&[(
            "svcA",
            Override {
                sidecar: None,
                function_id: Some("f2".to_string()),
            },
        )]);

        let model = ModelAssembler::new(&catalog, &settings)
            .assemble(&graph(&["svcA"]), FixedRng(0))
            .unwrap();
        let fragment = model.get("svcA").unwrap().fragment.as_ref().unwrap();
        assert_eq!(fragment.function_name(), Some("fn_f2"));
        assert_eq!(fragment.runtime.workers, None);
    }

    #[test]
    fn unknown_override_function_aborts() {
        let catalog = Catalog::from_pools(pool(&[("f1", 1.0)]), pool(&[("d1", 1.0)]));
        // `d1` only exists in the database pool.
        let settings = settings(&[(
            "db1",
            Override {
                sidecar: None,
                function_id: Some("d1".to_string()),
            },
        )]);

        let result = ModelAssembler::new(&catalog, &settings).assemble(&graph(&["svcA", "db1"]), FixedRng(0));
        match result {
            Err(AssemblyError::UnknownOverrideFunction { service, function_id }) => {
                assert_eq!(service, "db1");
                assert_eq!(function_id, "d1");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn selection_miss_leaves_service_unassigned() {
        let catalog = Catalog::from_pools(pool(&[("f1", 1.0)]), pool(&[("d1", 0.0)]));
        let settings = settings(&[]);
        let model = ModelAssembler::new(&catalog, &settings)
            .assemble(&graph(&["svcA", "db1"]), FixedRng(0))
            .unwrap();

        assert_eq!(model.len(), 2);
        assert_eq!(model.unassigned().collect::<Vec<_>>(), vec!["db1"]);
        assert_eq!(
            serde_json::to_value(model.get("db1").unwrap()).unwrap(),
            json!({ "external_services": [{ "seq_len": 1, "services": [] }] })
        );
    }

    #[test]
    fn structured_sidecar_passed_through() {
        let sidecar = json!({ "image": "envoyproxy/envoy:v1.29", "ports": [15001, 15006] });
        let catalog = Catalog::from_pools(pool(&[("f1", 1.0)]), Pool::default());
        let settings = settings(&[(
            "svcA",
            Override {
                sidecar: Some(sidecar.clone()),
                function_id: None,
            },
        )]);

        let model = ModelAssembler::new(&catalog, &settings)
            .assemble(&graph(&["svcA"]), FixedRng(0))
            .unwrap();
        let rendered = serde_json::to_value(model.get("svcA").unwrap()).unwrap();
        assert_eq!(rendered["sidecar"], sidecar);
    }

    #[test]
    fn overrides_for_unknown_services_ignored() {
        let catalog = Catalog::from_pools(pool(&[("f1", 1.0)]), Pool::default());
        let settings = settings(&[(
            "ghost",
            Override {
                sidecar: Some(json!("istio")),
                function_id: Some("missing".to_string()),
            },
        )]);

        let model = ModelAssembler::new(&catalog, &settings)
            .assemble(&graph(&["svcA"]), FixedRng(0))
            .unwrap();
        assert_eq!(model.len(), 1);
        assert!(model.get("ghost").is_none());
    }

    fn arb_graph() -> impl Strategy<Value = Vec<(String, Vec<Value>)>> {
        let edge = (0u32..100, prop::collection::vec("s[0-9]{1,2}", 0..4))
            .prop_map(|(seq_len, services)| json!({ "seq_len": seq_len, "services": services }));
        prop::collection::btree_map("(db|svc)[a-z0-9]{0,6}", prop::collection::vec(edge, 0..4), 0..24)
            .prop_map(|services| services.into_iter().collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn property_services_and_edges_preserved(services in arb_graph(), seed in any::<u64>()) {
            let graph = ServiceGraph::from_services(services.iter().map(|(name, edges)| {
                (name.clone(), ServiceNode { external_services: edges.clone() })
            }));
            let catalog = Catalog::from_pools(pool(&[("f1", 0.2), ("f2", 0.8)]), pool(&[("d1", 0.5), ("d2", 0.5)]));
            let settings = settings(&[]);

            let model = ModelAssembler::new(&catalog, &settings)
                .assemble(&graph, StdRng::seed_from_u64(seed))
                .unwrap();

            let input_names = graph.iter().map(|(name, _)| name).collect::<Vec<_>>();
            let output_names = model.iter().map(|(name, _)| name).collect::<Vec<_>>();
            prop_assert_eq!(input_names, output_names);

            for (name, node) in graph.iter() {
                let descriptor = model.get(name).unwrap();
                prop_assert_eq!(&descriptor.external_services, &node.external_services);
                prop_assert!(descriptor.is_assigned());
            }
        }

        #[test]
        fn property_forced_function_wins(seed in any::<u64>(), is_database in any::<bool>()) {
            let services = pool(&[("f1", 0.9), ("f2", 0.1)]);
            let expected = services.fragment("f2").unwrap().clone();
            let catalog = Catalog::from_pools(services, pool(&[("d1", 1.0)]));
            let name = if is_database { "db1" } else { "svcA" };
            let settings = settings(&[(
                name,
                Override { sidecar: None, function_id: Some("f2".to_string()) },
            )]);

            let model = ModelAssembler::new(&catalog, &settings)
                .assemble(&graph(&[name]), StdRng::seed_from_u64(seed))
                .unwrap();

            prop_assert_eq!(model.get(name).unwrap().fragment.as_ref(), Some(&expected));
        }
    }
}
