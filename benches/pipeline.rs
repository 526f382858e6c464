//! Benchmarks for icesheet

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use icesheet::params::file::parse_relaxed;
use icesheet::prelude::*;

/// Sample parameter file for benchmarking
const PARAM_FILE: &str = r#"{
  // pipeline
  "modules_preproc": ["synthetic"],
  "modules_process": ["time"],
  "modules_postproc": ["print_info"],
  # clock
  "time_start": 1880,
  "time_end": 2020,
  "time_save": 10,
  "time_step_max": 0.5,
  # geometry
  "synthetic_nx": 200,
  "synthetic_ny": 120,
  "synthetic_dx": 50.0,
  "print_info_stdout": false
}"#;

fn noop_pipeline(size: usize) -> Pipeline {
    let modules = (0..size)
        .map(|i| {
            let name = format!("noop{i}");
            ResolvedModule {
                name: name.clone(),
                declared: Some(Category::Process),
                origin: ModuleOrigin::Builtin(Category::Process),
                module: Box::new(NoopModule::new(name, Category::Process)),
            }
        })
        .collect();
    Pipeline::with_options(modules, ExecutionOptions::new().with_record_timings(false))
}

fn benchmark_dispatch(c: &mut Criterion) {
    let params = ParameterSet::default();

    let mut group = c.benchmark_group("update_dispatch");
    for size in [1, 10, 50].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut pipeline = noop_pipeline(size);
            let mut state = State::default();
            pipeline.initialize(&params, &mut state).unwrap();
            b.iter(|| pipeline.update(black_box(&params), &mut state).unwrap())
        });
    }
    group.finish();
}

fn benchmark_param_file(c: &mut Criterion) {
    c.bench_function("parse_param_file", |b| {
        b.iter(|| parse_relaxed(black_box(PARAM_FILE), "params.json").unwrap())
    });
}

fn benchmark_resolution(c: &mut Criterion) {
    let resolver = ModuleResolver::new(ModuleRegistry::with_builtins());
    let validator = ModuleValidator::new();
    let lists = ModuleLists {
        preproc: vec!["synthetic".to_string()],
        process: Vec::new(),
        postproc: vec!["print_info".to_string()],
    };

    c.bench_function("resolve_validate_expand", |b| {
        b.iter(|| {
            let resolved = resolver.resolve_lists(black_box(&lists)).unwrap();
            validator.check(&resolved).unwrap();
            DependencyExpander::default()
                .expand(&resolver, &validator, resolved)
                .unwrap()
        })
    });
}

fn benchmark_builtin_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("builtin_run");
    group.sample_size(20);
    group.bench_function("synthetic_time_print_info", |b| {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("params.json"), PARAM_FILE).unwrap();
        let args = vec![
            "--working_dir".to_string(),
            temp.path().display().to_string(),
            "--print_params".to_string(),
            "false".to_string(),
        ];
        b.iter(|| {
            let mut simulation = Simulation::setup(&args).unwrap();
            simulation.run().unwrap()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_dispatch,
    benchmark_param_file,
    benchmark_resolution,
    benchmark_builtin_run
);
criterion_main!(benches);
