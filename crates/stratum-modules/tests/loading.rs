//! Manager behaviour over an in-process fake backend: no file is ever
//! opened and no symbol ever dlsym'd.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use stratum_core::Dictionary;
use stratum_hooks::{CastType, EntryPointRegister, Hook};
use stratum_lifecycle::{ComponentFactory, ComponentRegistry, LiveComponentRegister};
use stratum_modules::module::filename_candidates;
use stratum_modules::{
    LibraryBackend, LoadedLibrary, ModuleContext, ModuleError, ModuleKind, ModulesManager,
};
use stratum_test_utils::new_context_fixture;

type RegisterBody = Rc<dyn Fn(&mut ModuleContext) -> Result<(), ModuleError>>;

#[derive(Clone)]
struct FakeModule {
    // the kind-mangled spelling the module's file and symbols carry
    stem: String,
    symbols: Vec<String>,
    deps: Option<String>,
    register: RegisterBody,
    events: Rc<RefCell<Vec<String>>>,
}

impl FakeModule {
    fn plugin(name: &str, deps: Option<&str>, events: &Rc<RefCell<Vec<String>>>) -> Self {
        let mut symbols = vec![format!("{name}_Register")];
        if deps.is_some() {
            symbols.push(format!("{name}_GetDeps"));
        }
        Self {
            stem: name.to_owned(),
            symbols,
            deps: deps.map(str::to_owned),
            register: Rc::new(|_| Ok(())),
            events: events.clone(),
        }
    }

    fn toolbox(name: &str, deps: Option<&str>, events: &Rc<RefCell<Vec<String>>>) -> Self {
        let stem = format!("{name}Toolbox");
        let mut module = Self::plugin(&stem, deps, events);
        module.symbols.push(format!("{stem}_Initialise"));
        module.symbols.push(format!("{stem}_Finalise"));
        module
    }

    fn with_register(
        mut self,
        body: impl Fn(&mut ModuleContext) -> Result<(), ModuleError> + 'static,
    ) -> Self {
        self.register = Rc::new(body);
        self
    }
}

#[derive(Default)]
struct FakeBackend {
    modules: HashMap<String, FakeModule>,
}

impl FakeBackend {
    fn with(mut self, name: &str, module: FakeModule) -> Self {
        self.modules.insert(name.to_owned(), module);
        self
    }
}

impl LibraryBackend for FakeBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn LoadedLibrary>, ModuleError> {
        let file = path.file_name().and_then(|f| f.to_str()).unwrap_or("");
        for module in self.modules.values() {
            if filename_candidates(&module.stem).iter().any(|c| c == file) {
                return Ok(Box::new(FakeLibrary {
                    module: module.clone(),
                }));
            }
        }
        Err(ModuleError::OpenFailed {
            path: path.to_path_buf(),
            reason: "no such file".to_owned(),
        })
    }
}

struct FakeLibrary {
    module: FakeModule,
}

impl LoadedLibrary for FakeLibrary {
    fn has_symbol(&self, symbol: &str) -> bool {
        self.module.symbols.iter().any(|s| s == symbol)
    }

    fn register(&self, symbol: &str, ctx: &mut ModuleContext) -> Result<(), ModuleError> {
        self.module.events.borrow_mut().push(format!("reg:{symbol}"));
        (self.module.register)(ctx)
    }

    fn get_deps(&self, _symbol: &str) -> Option<String> {
        self.module.deps.clone()
    }

    fn initialise(&self, symbol: &str) -> Result<(), ModuleError> {
        self.module.events.borrow_mut().push(format!("init:{symbol}"));
        Ok(())
    }

    fn finalise(&self, symbol: &str) -> Result<(), ModuleError> {
        self.module.events.borrow_mut().push(format!("fini:{symbol}"));
        Ok(())
    }
}

struct Harness {
    registry: Rc<ComponentRegistry>,
    live_register: Rc<LiveComponentRegister>,
    entry_points: Rc<RefCell<EntryPointRegister>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            registry: ComponentRegistry::shared(),
            live_register: LiveComponentRegister::shared(),
            entry_points: Rc::new(RefCell::new(EntryPointRegister::new())),
        }
    }

    fn manager(&self, kind: ModuleKind, backend: FakeBackend) -> ModulesManager {
        let mut manager = ModulesManager::new(
            kind,
            Box::new(backend),
            self.registry.clone(),
            self.live_register.clone(),
            self.entry_points.clone(),
        );
        manager.environment_mut().add_directory("/modules");
        manager
    }
}

#[test]
fn plugin_registers_codelet_and_splices_hooks() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    harness
        .entry_points
        .borrow_mut()
        .declare("Context_Execute", CastType::Void0);

    let fired = Rc::new(RefCell::new(0));
    let fired_in_hook = fired.clone();
    let viscosity = FakeModule::plugin("Viscosity", None, &events).with_register(move |ctx| {
        ctx.submit("ViscosityCodelet", "1.2", new_context_fixture)?;
        let fired = fired_in_hook.clone();
        ctx.entry_points()
            .borrow_mut()
            .get_mut("Context_Execute")
            .unwrap()
            .append(Hook::void0("viscosity", move || {
                *fired.borrow_mut() += 1;
            }));
        Ok(())
    });
    let mut manager = harness.manager(
        ModuleKind::Plugin,
        FakeBackend::default().with("Viscosity", viscosity),
    );

    manager.load_module("Viscosity").unwrap();

    assert!(manager.is_loaded("Viscosity"));
    assert!(harness.registry.contains("ViscosityCodelet"));
    assert!(harness.live_register.contains("ViscosityCodelet"));
    assert_eq!(manager.codelets().len(), 1);
    assert_eq!(
        events.borrow().as_slice(),
        ["reg:Viscosity_Register".to_owned()]
    );

    harness.entry_points.borrow().get("Context_Execute").unwrap().run0();
    assert_eq!(*fired.borrow(), 1);
}

#[test]
fn loading_twice_is_a_no_op() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    let module = FakeModule::plugin("Viscosity", None, &events)
        .with_register(|ctx| ctx.submit("ViscosityCodelet", "0", new_context_fixture).map(|_| ()));
    let mut manager = harness.manager(
        ModuleKind::Plugin,
        FakeBackend::default().with("Viscosity", module),
    );

    manager.load_module("Viscosity").unwrap();
    manager.load_module("Viscosity").unwrap();

    assert_eq!(manager.loaded_names(), ["Viscosity"]);
    assert_eq!(events.borrow().len(), 1);
    assert_eq!(manager.codelets().len(), 1);
}

#[test]
fn toolbox_codelets_stay_off_the_live_register() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    let toolbox = FakeModule::toolbox("Solvers", None, &events)
        .with_register(|ctx| ctx.submit("MultigridSolver", "0", new_context_fixture).map(|_| ()));
    let mut manager = harness.manager(
        ModuleKind::Toolbox,
        FakeBackend::default().with("Solvers", toolbox),
    );

    manager.load_module("Solvers").unwrap();

    assert!(harness.registry.contains("MultigridSolver"));
    assert!(!harness.live_register.contains("MultigridSolver"));
    assert_eq!(manager.codelets().len(), 1);
}

#[test]
fn toolbox_initialise_runs_before_register() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    let seen = events.clone();
    let toolbox = FakeModule::toolbox("Solvers", None, &events).with_register(move |_| {
        // the toolbox must already be up when its Register runs
        assert_eq!(
            seen.borrow().first().map(String::as_str),
            Some("init:SolversToolbox_Initialise")
        );
        Ok(())
    });
    let mut manager = harness.manager(
        ModuleKind::Toolbox,
        FakeBackend::default().with("Solvers", toolbox),
    );

    manager.load_module("Solvers").unwrap();
    assert_eq!(
        events.borrow().as_slice(),
        [
            "init:SolversToolbox_Initialise".to_owned(),
            "reg:SolversToolbox_Register".to_owned()
        ]
    );
}

#[test]
fn toolbox_files_carry_the_kind_suffix() {
    let harness = Harness::new();
    let mut manager = harness.manager(ModuleKind::Toolbox, FakeBackend::default());

    let err = manager.load_module("Nowhere").unwrap_err();
    match err {
        ModuleError::NotFound { name, searched } => {
            assert_eq!(name, "Nowhere");
            assert!(searched
                .iter()
                .all(|p| p.to_string_lossy().contains("NowhereToolboxmodule")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn dependencies_load_first_and_unload_reversed() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    let backend = FakeBackend::default()
        .with("Underworld", FakeModule::toolbox("Underworld", Some("StgFEM PICellerator"), &events))
        .with("StgFEM", FakeModule::toolbox("StgFEM", Some("PICellerator"), &events))
        .with("PICellerator", FakeModule::toolbox("PICellerator", None, &events));
    let mut manager = harness.manager(ModuleKind::Toolbox, backend);

    manager.load_module("Underworld").unwrap();
    assert_eq!(manager.loaded_names(), ["PICellerator", "StgFEM", "Underworld"]);

    manager.unload().unwrap();
    let finalised: Vec<_> = events
        .borrow()
        .iter()
        .filter(|e| e.starts_with("fini:"))
        .cloned()
        .collect();
    assert_eq!(
        finalised,
        [
            "fini:UnderworldToolbox_Finalise",
            "fini:StgFEMToolbox_Finalise",
            "fini:PICelleratorToolbox_Finalise"
        ]
    );
    assert!(manager.loaded_names().is_empty());
}

#[test]
fn dependency_failure_abandons_the_module() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    let backend = FakeBackend::default()
        .with("Underworld", FakeModule::plugin("Underworld", Some("Missing"), &events));
    let mut manager = harness.manager(ModuleKind::Plugin, backend);

    let err = manager.load_module("Underworld").unwrap_err();
    match err {
        ModuleError::DependencyFailed {
            module,
            dependency,
            source,
        } => {
            assert_eq!(module, "Underworld");
            assert_eq!(dependency, "Missing");
            assert!(matches!(*source, ModuleError::NotFound { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!manager.is_loaded("Underworld"));
}

#[test]
fn wrong_kind_is_rejected() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    // a file named like a plugin whose exports are toolbox-shaped
    let mut imposter = FakeModule::plugin("Solvers", None, &events);
    imposter.symbols.push("Solvers_Initialise".to_owned());
    imposter.symbols.push("Solvers_Finalise".to_owned());
    let backend = FakeBackend::default().with("Solvers", imposter);
    let mut manager = harness.manager(ModuleKind::Plugin, backend);

    let err = manager.load_module("Solvers").unwrap_err();
    match err {
        ModuleError::WrongKind {
            name,
            expected,
            found,
        } => {
            assert_eq!(name, "Solvers");
            assert_eq!(expected, ModuleKind::Plugin);
            assert_eq!(found, ModuleKind::Toolbox);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn underscore_prefixed_symbols_resolve() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    let mut legacy = FakeModule::plugin("Legacy", None, &events);
    legacy.symbols = vec!["_Legacy_Register".to_owned()];
    let mut manager =
        harness.manager(ModuleKind::Plugin, FakeBackend::default().with("Legacy", legacy));

    manager.load_module("Legacy").unwrap();
    assert_eq!(
        events.borrow().as_slice(),
        ["reg:_Legacy_Register".to_owned()]
    );
}

#[test]
fn load_reads_the_plugin_list_and_filters_by_context() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    let backend = FakeBackend::default()
        .with("EpochOutput", FakeModule::plugin("EpochOutput", None, &events))
        .with("Tracers", FakeModule::plugin("Tracers", None, &events))
        .with("Dump", FakeModule::plugin("Dump", None, &events));
    let mut manager = harness.manager(ModuleKind::Plugin, backend);

    let dict = Dictionary::from_json_str(
        r#"{
            "LD_LIBRARY_PATH": ["/opt/plugins"],
            "plugins": [
                "EpochOutput",
                { "Type": "Tracers", "Context": "backgroundContext" },
                { "Type": "Dump", "Context": "mainContext" }
            ]
        }"#,
    )
    .unwrap();
    manager.load(&dict, "mainContext").unwrap();

    assert_eq!(manager.loaded_names(), ["EpochOutput", "Dump"]);
    assert_eq!(
        manager.environment().directories()[0],
        PathBuf::from("/opt/plugins")
    );
}

#[test]
fn malformed_list_entry_is_an_error() {
    let harness = Harness::new();
    let mut manager = harness.manager(ModuleKind::Plugin, FakeBackend::default());

    let dict = Dictionary::from_json_str(r#"{"plugins": [42]}"#).unwrap();
    let err = manager.load(&dict, "context").unwrap_err();
    assert!(matches!(err, ModuleError::BadEntry { index: 0, .. }));
}

#[test]
fn missing_module_reports_every_searched_path() {
    let harness = Harness::new();
    let mut manager = harness.manager(ModuleKind::Plugin, FakeBackend::default());

    let err = manager.load_module("Nowhere").unwrap_err();
    match err {
        ModuleError::NotFound { name, searched } => {
            assert_eq!(name, "Nowhere");
            // two filename candidates per search directory
            assert_eq!(searched.len(), 2);
            assert!(searched.iter().all(|p| p.starts_with("/modules")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn construct_codelets_drives_the_factory() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let harness = Harness::new();
    let module = FakeModule::plugin("EpochOutput", None, &events)
        .with_register(|ctx| ctx.submit("EpochReporter", "0", new_context_fixture).map(|_| ()));
    let mut manager = harness.manager(
        ModuleKind::Plugin,
        FakeBackend::default().with("EpochOutput", module),
    );
    manager.load_module("EpochOutput").unwrap();

    let cf = ComponentFactory::new(Dictionary::new(), harness.registry.clone())
        .with_live_register(harness.live_register.clone());
    manager.construct_codelets(&cf, &mut ()).unwrap();

    let codelet = harness.live_register.get("EpochReporter").unwrap();
    assert!(codelet.is_constructed());
}
