#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::fixtures::{copy_fixture, module_file};
use modgen::generator::{build_code_from_template, build_variables_header, BuildOutcome};
use modgen::settings::GeneratorSettings;
use std::fs;
use std::path::PathBuf;

#[test]
fn test_build_writes_next_to_template_and_skips_identical_output() {
    let tmp = copy_fixture("modules");
    let config = module_file(tmp.path(), "solver/optimizer/CMAES", "CMAES.config");
    let settings = GeneratorSettings::default();

    for suffix in [".hpp.base", ".cpp.base"] {
        let template = module_file(tmp.path(), "solver/optimizer/CMAES", &format!("CMAES{suffix}"));
        let output = template.with_file_name(format!("CMAES{}", suffix.trim_end_matches(".base")));

        assert_eq!(
            build_code_from_template(&config, &template, None, &settings).unwrap(),
            BuildOutcome::Written
        );
        let modified = fs::metadata(&output).unwrap().modified().unwrap();
        assert_eq!(
            build_code_from_template(&config, &template, None, &settings).unwrap(),
            BuildOutcome::Unchanged
        );
        assert_eq!(fs::metadata(&output).unwrap().modified().unwrap(), modified);
    }
}

#[test]
fn test_descriptor_change_rewrites_output() {
    let tmp = copy_fixture("modules");
    let config = module_file(tmp.path(), "solver/optimizer/CMAES", "CMAES.config");
    let template = module_file(tmp.path(), "solver/optimizer/CMAES", "CMAES.hpp.base");
    let settings = GeneratorSettings::default();

    build_code_from_template(&config, &template, None, &settings).unwrap();
    let before = fs::read_to_string(template.with_file_name("CMAES.hpp")).unwrap();

    let edited = fs::read_to_string(&config)
        .unwrap()
        .replace("\"Population Size\"]", "\"Sample Count\"]");
    fs::write(&config, edited).unwrap();

    assert_eq!(
        build_code_from_template(&config, &template, None, &settings).unwrap(),
        BuildOutcome::Written
    );
    let after = fs::read_to_string(template.with_file_name("CMAES.hpp")).unwrap();
    assert_ne!(before, after);
    assert!(after.contains("int _sampleCount;"));
    assert!(!after.contains("_populationSize"));
}

#[test]
fn test_failed_render_leaves_existing_output_untouched() {
    let tmp = copy_fixture("modules");
    let config = module_file(tmp.path(), "solver/optimizer/CMAES", "CMAES.config");
    let template = module_file(tmp.path(), "solver/optimizer/CMAES", "CMAES.hpp.base");
    let settings = GeneratorSettings::default();

    build_code_from_template(&config, &template, None, &settings).unwrap();
    let output = template.with_file_name("CMAES.hpp");
    let good = fs::read(&output).unwrap();

    let broken = fs::read_to_string(&template)
        .unwrap()
        .replace("@endIncludeGuard", "");
    fs::write(&template, broken).unwrap();

    assert!(build_code_from_template(&config, &template, None, &settings).is_err());
    assert_eq!(fs::read(&output).unwrap(), good);
    assert!(!template.with_file_name("CMAES.hpp.tmp").exists());
}

#[test]
fn test_variables_header_from_fixture_modules() {
    let tmp = copy_fixture("modules");
    let configs: Vec<PathBuf> = [
        ("solver/optimizer/CMAES", "CMAES.config"),
        ("distribution/univariate/normal", "normal.config"),
        ("problem/optimization", "optimization.config"),
    ]
    .iter()
    .map(|(module_type, file)| module_file(tmp.path(), module_type, file))
    .collect();
    let template = module_file(tmp.path(), "variable", "variable.hpp.base");
    let output = tmp.path().join("generated").join("variable.hpp");
    let settings = GeneratorSettings::default();

    assert_eq!(
        build_variables_header(&configs, &template, Some(&output), &settings).unwrap(),
        BuildOutcome::Written
    );
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("#ifndef _KORALI_VARIABLE_\n#define _KORALI_VARIABLE_\n"));
    assert!(text.contains("@brief [Module: CMAES] Lower bound for the variable's value."));
    assert!(text.contains("  double _lowerBound;\n"));
    assert!(text.contains("  double _upperBound;\n"));
    assert!(text.contains("  std::string _name;\n"));
    let lower = text.find("_lowerBound;").unwrap();
    let upper = text.find("_upperBound;").unwrap();
    assert!(lower < upper);

    assert_eq!(
        build_variables_header(&configs, &template, Some(&output), &settings).unwrap(),
        BuildOutcome::Unchanged
    );
}
