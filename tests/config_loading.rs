use std::path::PathBuf;
use stratevo::config::{ConfigManager, ConstraintRule, FitnessFunction};
use stratevo::StratevoError;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("stratevo-{}-{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_toml_sections() {
    let path = temp_file(
        "sections.toml",
        r#"
[evolution]
population_size = 80
generation_limit = 40
fitness_function = "risk_minimization"
seed = 7

[[evolution.constraints]]
metric = "margin"
rule = { operator = "between", value = [20.0, 45.0] }

[simulation]
sensitivity_change_pct = 5.0
optimistic_multiplier = 1.3
"#,
    );

    let manager = ConfigManager::new();
    manager.load_from_file(&path).unwrap();
    let config = manager.get();

    assert_eq!(config.evolution.population_size, 80);
    assert_eq!(config.evolution.generation_limit, 40);
    assert_eq!(config.evolution.fitness_function, FitnessFunction::RiskMinimization);
    assert_eq!(config.evolution.seed, Some(7));
    assert_eq!(config.evolution.constraints[0].rule, ConstraintRule::Between(20.0, 45.0));
    // untouched fields keep their defaults
    assert_eq!(config.evolution.tournament_size, 5);
    assert_eq!(config.evolution.genes.len(), 11);
    assert_eq!(config.simulation.sensitivity_change_pct, 5.0);
    assert_eq!(config.simulation.pessimistic_multiplier, 0.8);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_invalid_file_keeps_previous_config() {
    let path = temp_file(
        "invalid.toml",
        r#"
[evolution]
population_size = 1
"#,
    );

    let manager = ConfigManager::new();
    let result = manager.load_from_file(&path);
    assert!(matches!(result, Err(StratevoError::Configuration(_))));
    assert_eq!(manager.get().evolution.population_size, 50);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_save_and_reload() {
    let manager = ConfigManager::new();
    manager
        .update(|config| {
            config.evolution.population_size = 64;
            config.evolution.mutation_rate = 0.2;
        })
        .unwrap();

    let path = std::env::temp_dir().join(format!("stratevo-{}-saved.toml", std::process::id()));
    manager.save_to_file(&path).unwrap();

    let reloaded = ConfigManager::new();
    reloaded.load_from_file(&path).unwrap();
    let config = reloaded.get();
    assert_eq!(config.evolution.population_size, 64);
    assert_eq!(config.evolution.mutation_rate, 0.2);
    assert_eq!(config.evolution.genes, manager.get().evolution.genes);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_update_rejects_invalid_edit() {
    let manager = ConfigManager::new();
    let result = manager.update(|config| config.evolution.crossover_rate = 2.0);
    assert!(result.is_err());
    assert_eq!(manager.get().evolution.crossover_rate, 0.7);
}

#[test]
fn test_layered_file_source() {
    let path = temp_file(
        "layered.toml",
        r#"
[evolution]
population_size = 24
elitism_rate = 0.25
"#,
    );

    let manager = ConfigManager::new();
    manager.load_layered(Some(&path)).unwrap();
    let config = manager.get();
    assert_eq!(config.evolution.population_size, 24);
    assert_eq!(config.evolution.elitism_rate, 0.25);
    assert_eq!(config.evolution.elite_count(), 6);

    std::fs::remove_file(path).ok();
}
