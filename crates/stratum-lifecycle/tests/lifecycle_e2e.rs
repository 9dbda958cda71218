//! Full pipeline: dictionary in, constructed and executed components out.

use std::rc::Rc;

use stratum_core::Dictionary;
use stratum_lifecycle::{ComponentFactory, ComponentRegistry, FactoryError, LifecycleError, Phase};
use stratum_test_utils::{
    register_fixtures, CyclicFixture, DependentFixture, MeshFixture, RecordingTracer,
};

fn fixture_registry() -> Rc<ComponentRegistry> {
    let registry = ComponentRegistry::shared();
    register_fixtures(&registry).unwrap();
    registry
}

fn factory(json: &str) -> ComponentFactory {
    ComponentFactory::new(Dictionary::from_json_str(json).unwrap(), fixture_registry())
        .with_context_types(["ContextFixture"])
}

const SCENARIO: &str = r#"{
    "defaultTol": 1e-8,
    "components": {
        "solver": {
            "Type": "DependentFixture",
            "mesh": "linearMesh",
            "tolerance": "defaultTol"
        },
        "ctx": { "Type": "ContextFixture" },
        "linearMesh": { "Type": "MeshFixture", "dim": 3 }
    }
}"#;

#[test]
fn full_lifecycle_round() {
    let cf = factory(SCENARIO);
    cf.create_components().unwrap();

    // context pass ran first despite definition order
    assert_eq!(
        cf.live_register().names(),
        ["ctx", "solver", "linearMesh"]
    );

    let mut data = ();
    cf.construct_all(&mut data).unwrap();

    let register = cf.live_register();
    let solver = register.get("solver").unwrap();
    {
        let guard = solver.component();
        let solver = guard.as_any().downcast_ref::<DependentFixture>().unwrap();
        let mesh = solver.mesh.as_ref().expect("dependency resolved");
        assert_eq!(mesh.name(), "linearMesh");
        // root-dict indirection resolved the named constant
        assert_eq!(solver.tolerance, 1e-8);
    }
    {
        let mesh = register.get("linearMesh").unwrap();
        let guard = mesh.component();
        let mesh = guard.as_any().downcast_ref::<MeshFixture>().unwrap();
        // constructed exactly once even though the solver demanded it first
        assert_eq!(mesh.constructs, 1);
        assert_eq!(mesh.dim, 3);
    }

    register.build_all(&mut data).unwrap();
    register.initialise_all(&mut data).unwrap();
    for component in register.components() {
        component.execute(&mut data, false).unwrap();
        assert!(component.has_executed());
    }

    // a locked component survives destroy_all
    solver.lock();
    register.destroy_all().unwrap();
    assert!(!solver.is_destroyed());
    assert!(register.get("linearMesh").unwrap().is_destroyed());

    solver.unlock();
    register.destroy_all().unwrap();
    assert!(solver.is_destroyed());

    register.delete_all();
    assert!(register.is_empty());
}

#[test]
fn dependency_cycle_terminates() {
    let cf = factory(
        r#"{"components": {
            "a": { "Type": "CyclicFixture", "partner": "b" },
            "b": { "Type": "CyclicFixture", "partner": "a" }
        }}"#,
    );
    cf.create_components().unwrap();
    let mut data = ();
    cf.construct_all(&mut data).unwrap();

    for name in ["a", "b"] {
        let instance = cf.live_register().get(name).unwrap();
        assert!(instance.is_constructed());
        let guard = instance.component();
        let fixture = guard.as_any().downcast_ref::<CyclicFixture>().unwrap();
        assert_eq!(fixture.constructs, 1, "{name} constructed once");
        assert!(fixture.partner.is_some(), "{name} resolved its partner");
    }
}

#[test]
fn failing_build_stops_the_walk_with_context() {
    let cf = factory(
        r#"{"components": {
            "bad": { "Type": "FailingFixture", "failOn": "build" },
            "mesh": { "Type": "MeshFixture" }
        }}"#,
    );
    cf.create_components().unwrap();
    let mut data = ();
    cf.construct_all(&mut data).unwrap();
    let err = cf.live_register().build_all(&mut data).unwrap_err();
    match err {
        LifecycleError::Failed { name, phase, .. } => {
            assert_eq!(name, "bad");
            assert_eq!(phase, Phase::Build);
        }
        other => panic!("unexpected error: {other}"),
    }
    // the walk stopped before the mesh
    assert!(!cf.live_register().get("mesh").unwrap().is_built());
}

#[test]
fn failing_construct_reports_the_component() {
    let cf = factory(
        r#"{"components": {
            "bad": { "Type": "FailingFixture", "failOn": "construct" }
        }}"#,
    );
    cf.create_components().unwrap();
    let mut data = ();
    let err = cf.construct_all(&mut data).unwrap_err();
    match err {
        FactoryError::ConstructFailed { name, reason } => {
            assert_eq!(name, "bad");
            assert!(reason.contains("construct failure"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn tracer_brackets_construction() {
    let tracer = RecordingTracer::new();
    let cf = factory(
        r#"{"components": {"m": { "Type": "MeshFixture" }}}"#,
    )
    .with_tracer(Box::new(tracer.clone()));
    cf.create_components().unwrap();
    let mut data = ();
    cf.construct_all(&mut data).unwrap();
    assert_eq!(tracer.spans(), ["+construct:m", "-construct:m"]);
}
