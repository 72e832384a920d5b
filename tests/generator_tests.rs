#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::fixtures::{copy_fixture, module_file};
use modgen::error::GeneratorError;
use modgen::generator::render_code_from_template;
use modgen::schema::load_module;
use modgen::settings::{resolve_settings, GeneratorSettings};
use std::fs;

fn render(root: &std::path::Path, module_type: &str, name: &str, suffix: &str) -> String {
    let config = module_file(root, module_type, &format!("{name}.config"));
    let template = module_file(root, module_type, &format!("{name}{suffix}"));
    let settings = resolve_settings(None, &config).unwrap();
    render_code_from_template(&config, &template, None, &settings)
        .unwrap()
        .contents
}

#[test]
fn test_load_module_derives_identity_from_path_and_template() {
    let tmp = copy_fixture("modules");
    let config = module_file(tmp.path(), "solver/optimizer/CMAES", "CMAES.config");
    let module = load_module(&config, None, &GeneratorSettings::default()).unwrap();

    assert_eq!(module.name, "CMAES");
    assert_eq!(module.class_name, "CMAES");
    assert_eq!(module.parent_class_name, "Optimizer");
    assert_eq!(module.module_type, "solver/optimizer/CMAES");
    assert_eq!(module.relative_path, "modules/solver/optimizer/CMAES");
    assert_eq!(module.namespace, vec!["korali", "solver", "optimizer"]);
    assert_eq!(module.include_guard, "_KORALI_SOLVER_OPTIMIZER_CMAES_");
    assert_eq!(module.category_key().as_deref(), Some("Solver"));
}

#[test]
fn test_load_module_scrapes_namespaces_and_qualified_parent() {
    let tmp = copy_fixture("modules");
    let config = module_file(tmp.path(), "problem/optimization", "optimization.config");
    let module = load_module(&config, None, &GeneratorSettings::default()).unwrap();

    assert_eq!(module.class_name, "Optimization");
    assert_eq!(module.parent_class_name, "Problem");
    assert_eq!(module.namespace, vec!["korali", "problem"]);
    assert_eq!(module.compatible_solvers(), ["solver/optimizer".to_string()]);
}

#[test]
fn test_cmaes_header() {
    let tmp = copy_fixture("modules");
    let text = render(tmp.path(), "solver/optimizer/CMAES", "CMAES", ".hpp.base");

    assert!(text.starts_with("/** \\namespace korali"));
    assert!(text.contains("#ifndef _KORALI_SOLVER_OPTIMIZER_CMAES_\n#define _KORALI_SOLVER_OPTIMIZER_CMAES_\n"));
    assert!(text.contains("namespace korali\n{\nnamespace solver\n{\nnamespace optimizer\n{\n"));
    assert!(text.contains("* @brief Class declaration for module: CMAES."));
    assert!(text.contains("  int _populationSize;\n"));
    assert!(text.contains("  std::string _muType;\n"));
    assert!(text.contains("  korali::distribution::univariate::Normal* _normalGenerator;\n"));
    assert!(text.contains("  double _maxValue;\n"));
    assert!(text.contains("@brief [Termination Criterion]"));
    assert!(text.contains("  bool checkTermination() override;\n"));
    assert!(!text.contains("runOperation"));
    assert!(!text.contains("getPropertyPointer"));
    // Variable settings live on the shared variable record
    assert!(!text.contains("_lowerBound"));
    // Hand-written members survive after the injected block
    let injected = text.find("int _populationSize;").unwrap();
    let handwritten = text.find("void updateDistribution();").unwrap();
    assert!(injected < handwritten);
    assert!(!text.contains("@start") && !text.contains("@end"));
}

#[test]
fn test_cmaes_source_in_place() {
    let tmp = copy_fixture("modules");
    let text = render(tmp.path(), "solver/optimizer/CMAES", "CMAES", ".cpp.base");

    assert!(!text.contains("@moduleAutoCode"));
    assert!(text.contains("void CMAES::setConfiguration(knlohmann::json& js)"));
    assert!(text.contains("if (isDefined(js, \"Mu\", \"Type\"))"));
    assert!(text.contains("[\"Solver\"][\"Mu\"][\"Type\"] required by CMAES."));
    assert!(text.contains("\"Logarithmic\""));
    assert!(text.contains("bool CMAES::checkTermination()"));
    assert!(text.contains("bool parentFinished = Optimizer::checkTermination();"));
    assert!(text.contains("_k->_currentGeneration > 1 && (+_bestEverValue > _maxValue)"));
    assert!(text.contains("[\"Variables\"][%zu][\"Lower Bound\"]"));
    assert!(text.contains("_type = \"solver/optimizer/CMAES\";"));

    // Generated members land between the hand-written code and the closing namespace
    let handwritten = text.find("void CMAES::runGeneration()").unwrap();
    let generated = text.find("void CMAES::setConfiguration").unwrap();
    let closing = text.find("} //optimizer").unwrap();
    assert!(handwritten < generated && generated < closing);
}

#[test]
fn test_conditional_variables_module() {
    let tmp = copy_fixture("modules");
    let header = render(tmp.path(), "distribution/univariate/normal", "normal", ".hpp.base");
    assert!(header.contains("class Normal : public Univariate"));
    assert!(header.contains("  double _mean;\n"));
    assert!(header.contains("  std::string _meanConditional;\n"));
    assert!(header.contains("  std::string _standardDeviationConditional;\n"));
    assert!(header.contains("  double* getPropertyPointer(const std::string& property) override;\n"));

    let source = render(tmp.path(), "distribution/univariate/normal", "normal", ".cpp.base");
    assert!(source.contains("double Normal::getDensity(const double x) const"));
    assert!(source.contains(
        "double* korali::distribution::univariate::Normal::getPropertyPointer(const std::string& property)"
    ));
    assert!(source.contains("_hasConditionalVariables = true;"));
    assert!(source.contains("Univariate::setConfiguration(js);"));
}

#[test]
fn test_problem_source_checks_compatible_solvers() {
    let tmp = copy_fixture("modules");
    let source = render(tmp.path(), "problem/optimization", "optimization", ".cpp.base");

    assert!(source.contains("void korali::problem::Optimization::setConfiguration(knlohmann::json& js)"));
    assert!(source.contains("bool detectedCompatibleSolver = false;"));
    assert!(source.contains("\"solver/optimizer\""));
    assert!(source.contains("is not compatible with problem of type: problem/optimization"));
    assert!(source.contains(
        "bool korali::problem::Optimization::runOperation(std::string operation, korali::Sample& sample)"
    ));
    assert!(source.contains("evaluate(sample);"));
    assert!(source.contains("Operation %s not recognized for module Optimization."));
}

#[test]
fn test_settings_file_changes_dialect() {
    let tmp = copy_fixture("modules");
    fs::write(
        tmp.path().join("modgen.toml"),
        "[dialect]\nerror_macro = \"FRAMEWORK_FATAL\"\njson_type = \"nlohmann::json\"\n",
    )
    .unwrap();

    let text = render(tmp.path(), "solver/optimizer/CMAES", "CMAES", ".cpp.base");
    assert!(text.contains("FRAMEWORK_FATAL(\" + No value provided for mandatory setting"));
    assert!(text.contains("void CMAES::setConfiguration(nlohmann::json& js)"));
    assert!(!text.contains("KORALI_LOG_ERROR"));
}

#[test]
fn test_rendering_is_deterministic() {
    let tmp = copy_fixture("modules");
    let first = render(tmp.path(), "solver/optimizer/CMAES", "CMAES", ".cpp.base");
    let second = render(tmp.path(), "solver/optimizer/CMAES", "CMAES", ".cpp.base");
    assert_eq!(first, second);
}

#[test]
fn test_template_must_sit_next_to_descriptor() {
    let tmp = copy_fixture("modules");
    let config = module_file(tmp.path(), "solver/optimizer/CMAES", "CMAES.config");
    let template = module_file(tmp.path(), "problem/optimization", "optimization.hpp.base");
    let err = render_code_from_template(&config, &template, None, &GeneratorSettings::default())
        .unwrap_err();
    assert!(matches!(err, GeneratorError::NotAdjacent { .. }));
}

#[test]
fn test_descriptor_extension_is_checked() {
    let tmp = copy_fixture("modules");
    let template = module_file(tmp.path(), "solver/optimizer/CMAES", "CMAES.hpp.base");
    let err = render_code_from_template(&template, &template, None, &GeneratorSettings::default())
        .unwrap_err();
    assert!(matches!(err, GeneratorError::WrongExtension { .. }));
}
